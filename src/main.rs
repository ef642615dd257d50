use clap::Parser;
use itinera::cli::commands::{Cli, Commands};
use itinera::cli::handlers;

fn main() {
    // stdout carries documents; diagnostics go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        // Init runs before config loading so a broken itinera.toml can be replaced
        Commands::Init(args) => handlers::cmd_init(args),
        _ => handlers::dispatch(cli),
    };
    if let Err(e) = result {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}
