use clap::Parser;
use matmul_comm::GrpcCommunicator;
use matrix_mul::config::{Cli, Command, WorldConfig};
use matrix_mul::report::TimingReport;
use matrix_mul::sweep::{
    Verdict, run_distributed, run_local_world, run_sequential, run_threaded, verify,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    match cli.command {
        Command::Sequential { sweep, runs } => {
            let plan = sweep.into_plan()?;
            let report = tokio::task::spawn_blocking(move || run_sequential(&plan, runs)).await??;
            print_report(&report);
        }
        Command::Threaded {
            sweep,
            threads,
            runs,
        } => {
            let plan = sweep.into_plan()?;
            let report =
                tokio::task::spawn_blocking(move || run_threaded(&plan, &threads, runs))
                    .await??;
            print_report(&report);
        }
        Command::Distributed { sweep, world } => {
            let plan = sweep.into_plan()?;
            match world.into_world()? {
                WorldConfig::Local { workers } => {
                    let report = run_local_world(workers, &plan).await?;
                    print_report(&report);
                }
                WorldConfig::Cluster {
                    identity,
                    peers,
                    options,
                } => {
                    let comm = GrpcCommunicator::bind(identity, peers, options).await?;
                    if let Some(report) = run_distributed(&comm, &plan).await? {
                        print_report(&report);
                    }
                }
            }
        }
        Command::Verify { sweep } => {
            let plan = sweep.into_plan()?;
            for (n, verdict) in verify(&plan)? {
                match verdict {
                    Verdict::Match => println!("{0}x{0}: ok", n),
                    Verdict::Missing => println!("{0}x{0}: no result", n),
                }
            }
        }
    }

    Ok(())
}

fn print_report(report: &TimingReport) {
    print!("{}", report.render());
}
