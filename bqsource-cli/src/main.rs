// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! bqsource CLI entry point

use clap::Parser;
use colored::Colorize;

mod cli;
use cli::{Cli, Commands};

fn main() {
    // Parse command line arguments first to get log level
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        log::LevelFilter::Debug
    } else if let Some(level) = cli.log_level {
        level.to_level_filter()
    } else {
        // Default to Warn (can still be overridden by RUST_LOG env var)
        log::LevelFilter::Warn
    };

    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .init();

    let result = match cli.command {
        Commands::Version => {
            println!("{} {}", "bqsource".bold().green(), bqsource::VERSION);
            println!("BigQuery time-series data source");
            Ok(())
        }

        Commands::Query {
            batch,
            settings,
            format,
            timeout,
        } => cli::handle_query(batch, settings, format, timeout),

        Commands::Health { settings } => cli::handle_health(settings),

        Commands::Settings { settings } => cli::handle_settings(settings),
    };

    if let Err(e) = result {
        eprintln!("{}", format!("Error: {}", e).red());
        std::process::exit(1);
    }
}
