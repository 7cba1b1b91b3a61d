//! LAN Speed Tester - Main CLI Application
//!
//! `lst serve` runs the payload server; `lst measure` drives concurrent
//! downloads and uploads against it and prints per-trial and summary
//! throughput.

use clap::Parser;
use lan_speed_tester::{
    app::App,
    cli::{Cli, Command},
    error::{AppError, ErrorReporter},
};
use std::process;

#[tokio::main]
async fn main() {
    // Set up better panic handling
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("Application panic: {}", panic_info);
        eprintln!("Please report this issue with the command line you ran.");
        process::exit(AppError::internal("panic").exit_code());
    }));

    let cli = Cli::parse();
    let reporter = ErrorReporter::new(cli.use_colors(), cli.global.verbose);
    let mode = match cli.command {
        Command::Serve(_) => "serve",
        Command::Measure(_) => "measure",
        Command::Env(_) => "env",
    };

    if let Err(e) = App::new(cli).run().await {
        reporter.report_error(&e);
        print_error_suggestions(&e, mode);
        process::exit(e.exit_code());
    }
}

/// Print helpful suggestions for common errors
fn print_error_suggestions(error: &AppError, mode: &str) {
    match error {
        AppError::Config(_) | AppError::Validation(_) | AppError::Parse(_) => {
            eprintln!();
            eprintln!("Configuration help:");
            eprintln!("  - Check your .env file format");
            eprintln!("  - SERVER_URL must start with http:// or https://");
            eprintln!("  - Trials and concurrency must be at least 1");
            eprintln!("  - Run 'lst {} --help' for accepted values", mode);
        }
        AppError::Network(_) | AppError::HttpRequest(_) => {
            eprintln!();
            eprintln!("Network troubleshooting:");
            eprintln!("  - Make sure 'lst serve' is running on the target host");
            eprintln!("  - Verify the server URL and port");
            eprintln!("  - Check firewall rules between the two hosts");
        }
        AppError::Timeout(_) => {
            eprintln!();
            eprintln!("Timeout help:");
            eprintln!("  - Increase the deadline with --timeout");
            eprintln!("  - Reduce --payload-size or --concurrency");
        }
        AppError::Io(_) if mode == "serve" => {
            eprintln!();
            eprintln!("Server help:");
            eprintln!("  - Another process may already use the port; try --port");
            eprintln!("  - Ports below 1024 usually need elevated privileges");
        }
        _ => {}
    }
}
