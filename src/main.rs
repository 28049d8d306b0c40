use anyhow::Result;
use clap::Parser;
use suffragium::cli::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    suffragium::logging::init(cli.verbose);
    cli.run().await
}
