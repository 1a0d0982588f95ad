//! Dual-Stack Speed Test - command-line entry point

use clap::Parser;
use dualstack_speedtest::{
    app::App,
    cli::Cli,
    config::{display_config_summary, load_config, EnvManager},
    error::{AppError, Result},
    output::OutputCoordinator,
    PKG_NAME, VERSION,
};
use std::process;

#[tokio::main]
async fn main() {
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("Application panic: {}", panic_info);
        process::exit(1);
    }));

    let cli = Cli::parse();
    let use_color = cli.use_colors();

    if let Err(e) = run_application(cli).await {
        eprintln!("{}", e.format_for_console(use_color));
        print_error_suggestions(&e);
        process::exit(e.exit_code());
    }
}

async fn run_application(cli: Cli) -> Result<()> {
    cli.validate().map_err(AppError::validation)?;

    if cli.env_help {
        println!("{}", EnvManager::display_env_help());
        return Ok(());
    }
    if let Some(path) = &cli.init_env {
        EnvManager::save_example_env_file(path)?;
        println!("Example configuration written to {}", path.display());
        return Ok(());
    }

    let config = load_config(cli)?;

    if config.debug {
        eprintln!("{} v{}", PKG_NAME, dualstack_speedtest::build_info::LONG_VERSION);
        eprintln!("{}", display_config_summary(&config));
        for warning in EnvManager::validate_current_env() {
            eprintln!("{}", warning);
        }
        eprintln!();
    } else if !config.is_quiet() {
        println!("{} v{}", PKG_NAME, VERSION);
    }

    let output = OutputCoordinator::from_config(&config);
    let report = App::new(config).await?.run().await?;

    println!("{}", output.render(&report)?);
    Ok(())
}

/// Print helpful suggestions for common errors
fn print_error_suggestions(error: &AppError) {
    match error {
        AppError::Config(_) | AppError::Validation(_) => {
            eprintln!();
            eprintln!("Configuration help:");
            eprintln!("  - Run with --env-help to list the SPEEDTEST_* variables");
            eprintln!("  - Endpoints must start with http:// or https://");
            eprintln!("  - --source and --interface cannot be combined");
        }
        AppError::Network(_) | AppError::DnsResolution(_) | AppError::Timeout(_) => {
            eprintln!();
            eprintln!("Network troubleshooting:");
            eprintln!("  - Check your internet connection");
            eprintln!("  - Verify the API endpoints with -e, --ipv4-endpoint and --ipv6-endpoint");
            eprintln!("  - Increase the API timeout with --timeout");
        }
        AppError::Api(_) => {
            eprintln!();
            eprintln!("The registration API rejected a request; try again later.");
        }
        _ => {}
    }
}
