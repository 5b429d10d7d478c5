//! Command-line configuration.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use matmul_comm::{GrpcOptions, ServerAddr, WorkerIdentity};

use crate::Error;
use crate::sweep::SweepPlan;

#[derive(Debug, Parser)]
#[command(name = "matrix-mul")]
#[command(about = "Dense integer matrix multiplication benchmark")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Multiply on one thread.
    Sequential {
        #[command(flatten)]
        sweep: SweepArgs,
        /// Products timed per size.
        #[arg(long, default_value_t = 1)]
        runs: usize,
    },
    /// Multiply with several threads sharing one result matrix.
    Threaded {
        #[command(flatten)]
        sweep: SweepArgs,
        /// Thread counts to try for every size.
        #[arg(long, value_delimiter = ',', default_values_t = [2, 5, 10, 15])]
        threads: Vec<usize>,
        /// Products timed per size and thread count.
        #[arg(long, default_value_t = 1)]
        runs: usize,
    },
    /// Multiply across workers that only exchange messages.
    Distributed {
        #[command(flatten)]
        sweep: SweepArgs,
        #[command(flatten)]
        world: WorldArgs,
    },
    /// Check stored results against a fresh sequential product.
    Verify {
        #[command(flatten)]
        sweep: SweepArgs,
    },
}

#[derive(Debug, Args)]
pub struct SweepArgs {
    /// Matrix dimensions, processed in order.
    #[arg(long, value_delimiter = ',', default_values_t = [100, 500, 1000, 1500, 2000, 2500])]
    pub sizes: Vec<usize>,
    /// Directory holding inputs, results and the timing log.
    #[arg(long, default_value = "files_txt")]
    pub data_dir: PathBuf,
    /// Seed for generated inputs.
    #[arg(long)]
    pub seed: Option<u64>,
}

impl SweepArgs {
    pub fn into_plan(self) -> Result<SweepPlan, Error> {
        SweepPlan::new(self.sizes, self.data_dir, self.seed)
    }
}

#[derive(Debug, Args)]
pub struct WorldArgs {
    /// Run this many workers inside this process.
    #[arg(long, conflicts_with_all = ["rank", "peers"])]
    pub local: Option<usize>,
    /// This worker's rank.
    #[arg(long, env = "MATMUL_RANK")]
    pub rank: Option<usize>,
    /// Mailbox address of every worker, ordered by rank.
    #[arg(long, env = "MATMUL_PEERS", value_delimiter = ',')]
    pub peers: Vec<String>,
    /// Seconds to keep retrying the first connection to a peer.
    #[arg(long, default_value_t = 30)]
    pub connect_timeout_secs: u64,
    /// Fail a row or reduction receive after this many seconds instead of
    /// waiting forever. Waiting for the next round to start is not bounded.
    #[arg(long, env = "MATMUL_RECV_TIMEOUT_SECS")]
    pub recv_timeout_secs: Option<u64>,
}

/// How the workers of a distributed run find each other.
#[derive(Debug, Clone)]
pub enum WorldConfig {
    Local {
        workers: usize,
    },
    Cluster {
        identity: WorkerIdentity,
        peers: Vec<ServerAddr>,
        options: GrpcOptions,
    },
}

impl WorldArgs {
    pub fn into_world(self) -> Result<WorldConfig, Error> {
        if let Some(workers) = self.local {
            if workers == 0 {
                return Err(Error::Config("at least one worker is needed".to_string()));
            }
            return Ok(WorldConfig::Local { workers });
        }

        let rank = self.rank.ok_or_else(|| {
            Error::Config("--rank (or MATMUL_RANK) is required without --local".to_string())
        })?;
        let peers: Vec<ServerAddr> = self
            .peers
            .into_iter()
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .map(ServerAddr::from)
            .collect();
        if peers.is_empty() {
            return Err(Error::Config(
                "--peers (or MATMUL_PEERS) is required without --local".to_string(),
            ));
        }

        let identity = WorkerIdentity::new(rank, peers.len())
            .map_err(|e| Error::Config(e.to_string()))?;
        let options = GrpcOptions {
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            recv_timeout: self.recv_timeout_secs.map(Duration::from_secs),
        };

        Ok(WorldConfig::Cluster {
            identity,
            peers,
            options,
        })
    }
}
