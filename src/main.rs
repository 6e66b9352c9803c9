use apirouter::cli::{run_cli, Cli};
use clap::Parser;

fn main() -> anyhow::Result<()> {
    apirouter::logging::init_logging()?;
    run_cli(Cli::parse())
}
