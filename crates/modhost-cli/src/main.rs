//! modhost entry point - the composition root.

use clap::Parser;

use modhost_cli::{Cli, run};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    run(cli).await
}
