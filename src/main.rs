// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Photosort contributors

//! Photosort: Local AI Photo Classifier & Sorter
//!
//! CLI entry point. All pipeline logic lives in the library modules;
//! this file wires validated settings, the inference client, and the
//! disposition loop together.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use photosort::batch::{process_all, ResultSet};
use photosort::classify::VisionClassifier;
use photosort::config::AppConfig;
use photosort::disposition::{apply, decide, Applied};
use photosort::lmstudio::LmStudioClient;
use photosort::report::write_report;
use photosort::scanner::scan_images;
use photosort::settings::{OutputMode, Settings};
use photosort::threshold::resolve_threshold;
use photosort::{PhotosortError, Result};

/// Photosort CLI - Local AI Photo Classifier & Sorter
#[derive(Parser, Debug)]
#[command(name = "photosort")]
#[command(version = "0.3.0")]
#[command(about = "Local AI-powered photo classifier and sorter", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file (JSON format)
    #[arg(short, long, default_value = "photosort.json", global = true)]
    config: PathBuf,

    /// Enable verbose logging (debug level)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable trace logging (most verbose)
    #[arg(long, global = true)]
    trace: bool,

    /// Suppress non-essential output (quiet mode)
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Classify photos in a directory and organize them
    Sort {
        /// Directory containing the photos
        dir: PathBuf,

        /// Comma-separated category list (e.g. "Family, Vacation, Pets")
        #[arg(short = 'C', long)]
        categories: String,

        /// Comma-separated priority categories (must be a subset of --categories)
        #[arg(short, long, default_value = "")]
        priority: String,

        /// Confidence threshold in [0,1]; omit to derive one from the scores
        #[arg(short, long)]
        threshold: Option<String>,

        /// Ambiguity mode: single (top category only) or multi
        #[arg(long)]
        ambiguity: Option<String>,

        /// Output mode: move, copy, tag, or report
        #[arg(short, long)]
        mode: Option<String>,

        /// Do not descend into subfolders
        #[arg(long)]
        no_subfolders: bool,

        /// Show what would happen without touching any files
        #[arg(long)]
        dry_run: bool,

        /// Model to use (overrides config)
        #[arg(long)]
        model: Option<String>,

        /// Skip the server health check on startup
        #[arg(long)]
        skip_health_check: bool,
    },

    /// Show inference server status and available models
    Status {
        /// Highlight a specific model
        #[arg(short, long)]
        model: Option<String>,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Show current configuration
    Show,

    /// Generate default configuration file
    Generate {
        /// Output file path
        #[arg(short, long, default_value = "photosort.json")]
        output: PathBuf,
    },

    /// Validate configuration file
    Validate,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.trace {
        "trace"
    } else if cli.verbose {
        "debug"
    } else if cli.quiet {
        "warn"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let config = AppConfig::load(&cli.config)?;

    match cli.command {
        Commands::Sort {
            dir,
            categories,
            priority,
            threshold,
            ambiguity,
            mode,
            no_subfolders,
            dry_run,
            model,
            skip_health_check,
        } => {
            let scan_subfolders = if no_subfolders {
                false
            } else {
                config.defaults.scan_subfolders
            };

            let settings = Settings::from_input(
                &dir,
                &categories,
                &priority,
                threshold.as_deref().unwrap_or(""),
                ambiguity.as_deref().unwrap_or(&config.defaults.ambiguity_mode),
                mode.as_deref().unwrap_or(&config.defaults.output_mode),
                scan_subfolders,
            )?;

            run_sort(config, settings, model, dry_run, skip_health_check).await
        }
        Commands::Status { model } => run_status(config, model).await,
        Commands::Config { action } => run_config_command(config, action, &cli.config),
    }
}

/// Tally of applied dispositions for the end-of-run summary
#[derive(Debug, Default)]
struct Summary {
    assigned: usize,
    uncertain: usize,
    tagged: usize,
    skipped: usize,
    failed: usize,
}

impl Summary {
    fn record(&mut self, applied: Applied) {
        match applied {
            Applied::Assigned => self.assigned += 1,
            Applied::Uncertain => self.uncertain += 1,
            Applied::Tagged => self.tagged += 1,
            Applied::Skipped => self.skipped += 1,
            Applied::Failed => self.failed += 1,
        }
    }
}

/// Run the full classification-and-disposition pipeline
async fn run_sort(
    config: AppConfig,
    settings: Settings,
    model_override: Option<String>,
    dry_run: bool,
    skip_health_check: bool,
) -> Result<()> {
    info!("Photo directory: {:?}", settings.photo_dir);
    info!("Categories: {}", settings.categories.join(", "));
    if settings.has_priority() {
        info!("Priority: {}", settings.priority.join(", "));
    }
    match settings.threshold {
        Some(t) => info!("Threshold: {:.2}", t),
        None => info!("Threshold: adaptive"),
    }
    info!(
        "Ambiguity: {}, output: {}, subfolders: {}",
        settings.ambiguity_mode, settings.output_mode, settings.scan_subfolders
    );

    if dry_run {
        warn!("DRY RUN MODE - files will not be modified");
    }

    // One client per run, passed by reference from here on
    let client = LmStudioClient::new(&config.server.url, config.server.timeout_secs);

    if !skip_health_check {
        info!("Checking LM Studio availability...");
        client.health_check().await?;
        info!("LM Studio is running");
    } else {
        warn!("Skipping LM Studio health check");
    }

    let requested = model_override.as_deref().or(config.model.as_deref());
    let model = client.resolve_model(requested).await?;
    info!("Using model '{}'", model);

    let images = scan_images(&settings.photo_dir, settings.scan_subfolders)?;
    if images.is_empty() {
        return Err(PhotosortError::Validation(format!(
            "No image files found in directory or its subfolders: {}",
            settings.photo_dir.display()
        )));
    }

    let classifier = VisionClassifier::new(&client, model, &settings);
    let results = process_all(&images, &classifier).await;

    // Resolved lazily, once, only now that all scores are in
    let threshold = resolve_threshold(&settings, &results);

    if settings.output_mode == OutputMode::Report {
        let path = write_report(
            &results,
            threshold,
            &settings.photo_dir,
            &config.defaults.report_name,
        )?;
        info!("Report generated: {:?}", path);
        return Ok(());
    }

    let summary = run_dispositions(&results, &settings, threshold, dry_run);
    info!(
        "Done: {} assigned, {} uncertain, {} tagged, {} skipped, {} failed",
        summary.assigned, summary.uncertain, summary.tagged, summary.skipped, summary.failed
    );

    Ok(())
}

/// Decide and actuate a disposition for every image. Per-image failures
/// are absorbed inside `apply`; the loop always finishes.
fn run_dispositions(
    results: &ResultSet,
    settings: &Settings,
    threshold: f64,
    dry_run: bool,
) -> Summary {
    let mut summary = Summary::default();

    for (image, result) in results.iter() {
        let disposition = decide(image, result, settings, threshold);
        summary.record(apply(&disposition, settings, dry_run));
    }

    summary
}

/// Show server health and model availability
async fn run_status(config: AppConfig, model: Option<String>) -> Result<()> {
    let client = LmStudioClient::new(&config.server.url, config.server.timeout_secs);

    println!("Photosort v0.3.0 Status");
    println!("=======================");

    match client.health_check().await {
        Ok(()) => println!("LM Studio: Running ({})", client.base_url()),
        Err(e) => {
            println!("LM Studio: Error - {}", e);
            return Ok(());
        }
    }

    match client.list_models().await {
        Ok(models) if models.is_empty() => println!("\nNo models loaded"),
        Ok(models) => {
            let configured = model.as_deref().or(config.model.as_deref());
            println!("\nAvailable models:");
            for m in &models {
                let marker = if configured.is_some_and(|c| m == c || m.starts_with(c)) {
                    "→"
                } else {
                    " "
                };
                println!("  {} {}", marker, m);
            }
        }
        Err(e) => println!("  Error listing models: {}", e),
    }

    Ok(())
}

/// Run config commands
fn run_config_command(config: AppConfig, action: ConfigCommands, config_path: &Path) -> Result<()> {
    match action {
        ConfigCommands::Show => {
            let json = serde_json::to_string_pretty(&config)?;
            println!("{}", json);
        }
        ConfigCommands::Generate { output } => {
            let default_config = AppConfig::default();
            default_config.save(&output)?;
            println!("Generated config at {:?}", output);
        }
        ConfigCommands::Validate => {
            println!("Configuration at {:?} is valid", config_path);
            println!("  Server: {}", config.server.url);
            println!("  Model: {}", config.model.as_deref().unwrap_or("(first available)"));
            println!("  Default output mode: {}", config.defaults.output_mode);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_sort_command() {
        let cli = Cli::try_parse_from([
            "photosort",
            "sort",
            "/tmp/photos",
            "--categories",
            "Family, Pets",
            "--mode",
            "move",
            "--dry-run",
        ])
        .unwrap();

        match cli.command {
            Commands::Sort { dir, categories, mode, dry_run, threshold, .. } => {
                assert_eq!(dir, PathBuf::from("/tmp/photos"));
                assert_eq!(categories, "Family, Pets");
                assert_eq!(mode.as_deref(), Some("move"));
                assert!(dry_run);
                assert!(threshold.is_none());
            }
            _ => panic!("Expected Sort command"),
        }
    }

    #[test]
    fn test_cli_requires_categories() {
        assert!(Cli::try_parse_from(["photosort", "sort", "/tmp/photos"]).is_err());
    }

    #[test]
    fn test_cli_status_command() {
        let cli = Cli::try_parse_from(["photosort", "status", "--model", "qwen2-vl"]).unwrap();
        match cli.command {
            Commands::Status { model } => assert_eq!(model.as_deref(), Some("qwen2-vl")),
            _ => panic!("Expected Status command"),
        }
    }
}
