//! keyward CLI Application

// CLI binary needs to output to stdout/stderr - this is intentional
#![allow(clippy::print_stdout, clippy::print_stderr)]

use keyward::cli::{self, CliError, EXIT_CLI, exit_code_for, render_error};
use keyward::commands;
use keyward::tracing::{TracingConfig, init_tracing};

fn main() {
    // NOTE: Using eprintln! in panic hook is intentional - tracing infrastructure
    // may be corrupted during a panic, so we use the most reliable output method.
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("Application panicked: {panic_info}");
        eprintln!("Internal error occurred. Run with -L debug for more information.");
    }));

    let cli = cli::parse();

    if let Err(e) = init_tracing(TracingConfig {
        format: cli.log_format,
        level: cli.level.into(),
        filter: None,
    }) {
        eprintln!("{e:?}");
        std::process::exit(EXIT_CLI);
    }

    let json = cli.json;
    let result = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt.block_on(commands::execute(cli.command, &cli.source, json)),
        Err(e) => Err(CliError::other(format!("Failed to create tokio runtime: {e}"))),
    };

    match result {
        Ok(()) => std::process::exit(cli::EXIT_OK),
        Err(err) => {
            render_error(&err, json);
            std::process::exit(exit_code_for(&err));
        }
    }
}
