use clap::Parser;

use matmul_launch::{LaunchPlan, supervise};

/// Start a fixed world of cooperating matrix-mul workers on this host.
#[derive(Parser)]
#[command(name = "matmul-launch")]
#[command(version)]
struct Cli {
    /// Number of worker processes.
    #[arg(short = 'n', long)]
    workers: usize,
    /// Host every worker's mailbox binds to.
    #[arg(long, default_value = "127.0.0.1")]
    host: String,
    /// Mailbox port of rank 0; rank r uses base_port + r.
    #[arg(long, default_value_t = 50051)]
    base_port: u16,
    /// Worker program and its arguments.
    #[arg(trailing_var_arg = true, required = true)]
    command: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    let plan = LaunchPlan::new(cli.workers, &cli.host, cli.base_port)?;
    let (program, args) = cli
        .command
        .split_first()
        .ok_or("missing worker program")?;

    supervise(&plan, program, args).await?;
    Ok(())
}
