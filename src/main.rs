use std::process::ExitCode;

use clap::Parser;

use trackgraph::cli::{self, Cli, EXIT_ERROR};
use trackgraph::observability::init_logging;

fn main() -> ExitCode {
    let args = Cli::parse();

    let config = match cli::effective_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::from(EXIT_ERROR);
        }
    };
    init_logging(&config.logging.filter);

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    match cli::run(&args.command, &config, &mut out) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!(error = %e, client_error = e.is_client_error(), "command failed");
            eprintln!("error: {e}");
            ExitCode::from(EXIT_ERROR)
        }
    }
}
