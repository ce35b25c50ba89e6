use clap::Parser;
use docket::cli::commands::Cli;
use docket::cli::handlers;

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = handlers::dispatch(cli) {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}

/// Log to stderr so stdout stays clean for `--json`. `DOCKET_LOG` takes an
/// EnvFilter directive and wins over `--verbose`.
fn init_logging(verbose: bool) {
    let level = if verbose { "docket=debug" } else { "warn" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_env("DOCKET_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(env_filter)
        .with_target(false)
        .init();
}
