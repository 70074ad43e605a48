/// Cadence CLI
///
/// Runs, checks and inspects bodies written in the pausable body language.
use cadence_core::cli;

#[tokio::main]
async fn main() {
    if let Err(e) = cli::run_cli().await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
