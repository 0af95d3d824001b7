use clap::Parser;

use primerlab_lib::cli::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    primerlab_lib::run(Cli::parse()).await
}
