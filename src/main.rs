use batteries_api::cli::Cli;
use clap::Parser;
use std::process;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize logging
    cli.init_logging();

    if let Err(e) = batteries_api::run(cli).await {
        log::error!("{}", e);
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}
