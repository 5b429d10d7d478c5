//! Launch plans for a fixed world of matrix-mul workers.
//!
//! Every worker process learns its rank and the mailbox address of every
//! peer from its environment. A [`LaunchPlan`] assigns consecutive ports on
//! one host and produces that environment for each rank.

use thiserror::Error;
use tokio::process::{Child, Command};
use tokio::task::JoinSet;
use tracing::{error, info};

pub const RANK_VAR: &str = "MATMUL_RANK";
pub const PEERS_VAR: &str = "MATMUL_PEERS";

#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("a world needs at least one worker")]
    NoWorkers,

    #[error("{workers} workers do not fit above port {base_port}")]
    PortRange { workers: usize, base_port: u16 },

    #[error("failed to start rank {rank}: {source}")]
    Spawn {
        rank: usize,
        #[source]
        source: std::io::Error,
    },

    #[error("rank {rank} exited with {status}")]
    WorkerFailed { rank: usize, status: String },

    #[error("worker supervision task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

#[derive(Debug, Clone)]
pub struct LaunchPlan {
    peers: Vec<String>,
}

impl LaunchPlan {
    /// Rank `r` listens on `host:(base_port + r)`.
    pub fn new(workers: usize, host: &str, base_port: u16) -> Result<Self, LaunchError> {
        if workers == 0 {
            return Err(LaunchError::NoWorkers);
        }
        let last = base_port as usize + workers - 1;
        if last > u16::MAX as usize {
            return Err(LaunchError::PortRange { workers, base_port });
        }

        let peers = (0..workers)
            .map(|rank| format!("{}:{}", host, base_port as usize + rank))
            .collect();
        Ok(Self { peers })
    }

    pub fn workers(&self) -> usize {
        self.peers.len()
    }

    pub fn peers(&self) -> &[String] {
        &self.peers
    }

    /// Environment variables that hand `rank` its place in the world.
    pub fn env_for(&self, rank: usize) -> Vec<(&'static str, String)> {
        vec![
            (RANK_VAR, rank.to_string()),
            (PEERS_VAR, self.peers.join(",")),
        ]
    }
}

/// Starts one `program args` child per rank and waits for all of them.
///
/// The first child to fail, or to fail to start, stops the launch: every
/// other child is killed and that error is returned.
pub async fn supervise(
    plan: &LaunchPlan,
    program: &str,
    args: &[String],
) -> Result<(), LaunchError> {
    let mut children = JoinSet::new();
    for rank in 0..plan.workers() {
        let child = Command::new(program)
            .args(args)
            .envs(plan.env_for(rank))
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| LaunchError::Spawn { rank, source })?;
        info!(rank, peer = %plan.peers()[rank], "worker started");
        children.spawn(wait_for(rank, child));
    }

    while let Some(joined) = children.join_next().await {
        if let Err(e) = joined? {
            error!(error = %e, "stopping remaining workers");
            // Aborted tasks drop their children, which kills them.
            children.shutdown().await;
            return Err(e);
        }
    }

    info!(workers = plan.workers(), "all workers finished");
    Ok(())
}

async fn wait_for(rank: usize, mut child: Child) -> Result<(), LaunchError> {
    let status = child
        .wait()
        .await
        .map_err(|source| LaunchError::Spawn { rank, source })?;
    if status.success() {
        Ok(())
    } else {
        Err(LaunchError::WorkerFailed {
            rank,
            status: status.to_string(),
        })
    }
}
