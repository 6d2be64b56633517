//! copyspec CLI - copy file trees with filters and Unix permission control

use clap::Parser;
use copyspec::config::{CliArgs, CopyConfig};
use copyspec::core::CopyEngine;
use copyspec::error::Result;
use tracing_subscriber::EnvFilter;

fn main() {
    // Parse CLI arguments
    let args = CliArgs::parse();

    // Initialize logging; RUST_LOG wins over -v/-q
    let default_level = match (args.quiet, args.verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, 2) => "debug",
        (false, _) => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .init();

    // Handle result
    if let Err(e) = run(args) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(args: CliArgs) -> Result<()> {
    // Build configuration
    let config = CopyConfig::from_cli(&args)?;

    // Print configuration if verbose
    if args.verbose > 0 && !args.quiet {
        print_config(&config);
    }

    let engine = CopyEngine::new(config)?;

    if args.dry_run && !args.quiet {
        println!("=== Dry Run Mode ===");
        println!("No files will be copied.");
        println!();
    }

    let result = engine.execute()?;

    // Print results
    if !args.quiet {
        result.print_summary();
    }

    if !result.is_success() {
        std::process::exit(1);
    }

    Ok(())
}

fn print_config(config: &CopyConfig) {
    let mode = |mode: Option<u32>| match mode {
        Some(mode) => format!("{:03o}", mode),
        None => "source".to_string(),
    };

    println!("=== Configuration ===");
    println!("Sources:     {:?}", config.sources);
    println!("Destination: {:?}", config.destination);
    println!("Into:        {}", config.into.as_deref().unwrap_or("/"));
    println!("File mode:   {}", mode(config.file_mode));
    println!("Dir mode:    {}", mode(config.dir_mode));
    println!("Duplicates:  {:?}", config.duplicates.unwrap_or_default());
    println!("Charset:     {}", config.charset.name());
    println!("Filters:     {}", config.filters.len() + usize::from(!config.expand.is_empty()));
    println!("Threads:     {}", if config.threads == 0 { num_cpus::get() } else { config.threads });
    println!("Buffer:      {}", humansize::format_size(config.buffer_size as u64, humansize::BINARY));
    println!();
}
