use clap::Parser;
use tracing_subscriber::EnvFilter;
use flowscope::cli::{self, Commands};
use flowscope::errors::FlowscopeError;

#[tokio::main]
async fn main() {
    let cli = cli::Cli::parse();

    // Initialize logging
    let log_level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level));

    if cli.log_json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(false)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_ansi(!cli.no_color)
            .init();
    }

    if cli.no_color {
        console::set_colors_enabled(false);
    }

    let result = match cli.command {
        Commands::Run(args) => cli::run::handle_run(args, cli.quiet).await,
        Commands::Sequence(args) => cli::sequence::handle_sequence(args, cli.quiet).await,
        Commands::Tasks(args) => cli::tasks::handle_tasks(args).await,
        Commands::Serve(args) => cli::serve::handle_serve(args).await,
        Commands::Validate(args) => cli::validate::handle_validate(args).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        let exit_code = match &e {
            FlowscopeError::Config(_) | FlowscopeError::Yaml(_) => 2,
            FlowscopeError::UnknownTask(_) => 3,
            _ => 1,
        };
        std::process::exit(exit_code);
    }
}
