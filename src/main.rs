//! Biblio Sorter - AI-assisted bibliography organization tool
//!
//! A CLI tool that renames and files a folder of PDFs into a category
//! hierarchy, using a chat-completions API to guess title and author from
//! each filename. Moves are journaled so interrupted runs can resume.

use anyhow::Result;
use biblio_sorter::{Cli, Config, OpenRouterExtractor, ProcessingStatus, Processor, ResumeMode};
use biblio_sorter::{Error as SorterError, interactive};
use chrono::Local;
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing::{Level, error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

// CLI Output Module
mod cli_output {
    //! Unified colors and formatting for command-line output.

    use crossterm::{
        ExecutableCommand,
        style::{Color, Print, Stylize, style},
    };
    use std::io::stdout;

    /// CLI theme colors
    pub struct CliTheme;

    impl CliTheme {
        pub const SUCCESS: Color = Color::Green;
        pub const WARNING: Color = Color::Yellow;
        pub const ERROR: Color = Color::Red;
        pub const HINT: Color = Color::DarkGrey;
        pub const ACCENT: Color = Color::Cyan;
    }

    pub fn print_separator() {
        let _ = stdout().execute(Print(&format!("{}\n", "─".repeat(60))));
    }

    pub fn print_title(title: &str) {
        let width = 60usize;
        let padding = width.saturating_sub(title.len()) / 2;
        let left_pad = " ".repeat(padding.saturating_sub(1));

        let _ = stdout().execute(Print(&format!(
            "{}{}\n\n",
            left_pad,
            title.bold().stylize(),
        )));
    }

    pub fn print_warning(msg: &str) {
        let _ = stdout().execute(Print(style("⚠ ").with(CliTheme::WARNING).bold()));
        let _ = stdout().execute(Print(format!("{}\n", msg)));
    }

    pub fn print_error(msg: &str) {
        let _ = stdout().execute(Print(style("✗ ").with(CliTheme::ERROR).bold()));
        let _ = stdout().execute(Print(format!("{}\n", msg)));
    }

    pub fn print_key_value(key: &str, value: &str, value_color: Option<Color>) {
        let key_styled = style(key).with(CliTheme::HINT);
        let value_styled = match value_color {
            Some(color) => style(value).with(color),
            None => style(value).bold(),
        };
        let _ = stdout().execute(Print("  "));
        let _ = stdout().execute(Print(key_styled));
        let _ = stdout().execute(Print(": "));
        let _ = stdout().execute(Print(value_styled));
        let _ = stdout().execute(Print("\n"));
    }

    pub fn print_stat(key: &str, value: &str, color: Color) {
        let key_styled = style(key).with(CliTheme::HINT);
        let value_styled = style(value).with(color).bold();
        let _ = stdout().execute(Print("  "));
        let _ = stdout().execute(Print(key_styled));
        let _ = stdout().execute(Print(": "));
        let _ = stdout().execute(Print(value_styled));
        let _ = stdout().execute(Print("\n"));
    }

    pub fn print_result(status_icon: &str, status_color: Color, source: &str, dest_or_msg: &str) {
        let icon_styled = style(status_icon).with(status_color).bold();
        let source_styled = style(source).italic();
        let msg_styled = style(dest_or_msg).with(CliTheme::HINT);

        let _ = stdout().execute(Print("  "));
        let _ = stdout().execute(Print(icon_styled));
        let _ = stdout().execute(Print(" "));
        let _ = stdout().execute(Print(source_styled));
        let _ = stdout().execute(Print(" "));
        let _ = stdout().execute(Print(msg_styled));
        let _ = stdout().execute(Print("\n"));
    }

    pub fn print_log_path(path: &str) {
        let _ = stdout().execute(Print("\n"));
        let _ = stdout().execute(Print(style("  Log file: ").with(CliTheme::HINT)));
        let _ = stdout().execute(Print(format!("{}\n", path)));
    }

    pub fn print_blank() {
        let _ = stdout().execute(Print("\n"));
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.print_sample_config {
        print!("{}", Config::sample_config());
        return Ok(());
    }

    let exe_dir = get_executable_dir()?;
    let log_path = get_log_path(&exe_dir, &cli);
    let _guard = setup_logging(&cli, &log_path)?;

    info!(version = env!("CARGO_PKG_VERSION"), "Biblio Sorter starting");

    let config = load_config(&cli)?;

    if cli.verbose {
        info!(?config, "Configuration loaded");
    }
    info!(log_file = %log_path.display(), "Log file location");

    // Preconditions: bad source folder or missing credential abort before
    // any file is touched
    if !config.source_dir.is_dir() {
        let err = SorterError::SourceDir {
            path: config.source_dir.clone(),
        };
        error!(%err, "Precondition failed");
        anyhow::bail!(err);
    }

    let api_key = match cli.api_key.clone() {
        Some(key) => key,
        None => match interactive::prompt_api_key()? {
            Some(key) => key,
            None => {
                error!("No API key provided");
                anyhow::bail!(SorterError::MissingApiKey);
            }
        },
    };

    let extractor =
        OpenRouterExtractor::new(&config, api_key).map_err(|e| anyhow::anyhow!(e))?;
    let mut processor = Processor::new(config.clone(), Box::new(extractor))?;

    match processor.run() {
        Ok(results) => {
            use cli_output::*;

            print_separator();
            print_title("Organization Complete");
            print_separator();

            let stats = processor.stats().clone();
            print_blank();
            print_stat("Applied", &stats.applied.to_string(), CliTheme::SUCCESS);
            if stats.planned > 0 {
                print_stat("Planned", &stats.planned.to_string(), CliTheme::ACCENT);
            }
            print_stat("Skipped", &stats.skipped.to_string(), CliTheme::WARNING);
            print_stat("Resumed", &stats.resumed.to_string(), CliTheme::ACCENT);
            print_stat("Failed", &stats.failed.to_string(), CliTheme::ERROR);
            print_stat("Cache hits", &stats.cache_hits.to_string(), CliTheme::ACCENT);
            print_blank();

            if cli.verbose {
                print_separator();
                for result in &results {
                    let dest = result
                        .destination
                        .as_ref()
                        .map(|p| p.display().to_string())
                        .unwrap_or_default();
                    match result.status {
                        ProcessingStatus::Applied => print_result(
                            "✓",
                            CliTheme::SUCCESS,
                            &result.source.display().to_string(),
                            &format!("→ {}", dest),
                        ),
                        ProcessingStatus::SkippedExists => print_result(
                            "⊘",
                            CliTheme::WARNING,
                            &result.source.display().to_string(),
                            "identical file already at destination",
                        ),
                        ProcessingStatus::Resumed => print_result(
                            "≡",
                            CliTheme::ACCENT,
                            &result.source.display().to_string(),
                            "already settled in journal",
                        ),
                        ProcessingStatus::Failed => print_result(
                            "✗",
                            CliTheme::ERROR,
                            &result.source.display().to_string(),
                            result.error.as_deref().unwrap_or("unknown error"),
                        ),
                        ProcessingStatus::DryRun => print_result(
                            "~",
                            CliTheme::ACCENT,
                            &result.source.display().to_string(),
                            &format!("→ {}", dest),
                        ),
                    }
                }
            }

            // Failed entries are always listed individually, with reasons
            let failed_items: Vec<_> = results
                .iter()
                .filter(|r| r.status == ProcessingStatus::Failed)
                .collect();

            if !failed_items.is_empty() {
                print_separator();
                print_error(&format!("{} file(s) failed:", failed_items.len()));
                print_blank();
                for result in &failed_items {
                    print_key_value(
                        &result.source.display().to_string(),
                        result.error.as_deref().unwrap_or("unknown error"),
                        Some(CliTheme::ERROR),
                    );
                }
            }

            if stats.malformed_journal_lines > 0 {
                print_separator();
                print_warning(&format!(
                    "{} malformed journal line(s) were skipped during resume",
                    stats.malformed_journal_lines
                ));
            }

            if config.dry_run {
                print_separator();
                print_warning("Dry run - no files were moved");
            }

            print_separator();
            print_log_path(&log_path.display().to_string());

            info!(log_file = %log_path.display(), "Processing complete. Log saved to");

            // Per-file failures are reported above, never fatal
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "Processing failed");
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

/// Get the directory where the executable is located
fn get_executable_dir() -> Result<PathBuf> {
    let exe_path = std::env::current_exe()?;
    Ok(exe_path
        .parent()
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|| PathBuf::from(".")))
}

/// Determine the log file path based on config file or timestamp
fn get_log_path(exe_dir: &Path, cli: &Cli) -> PathBuf {
    let log_dir = exe_dir.join("Log");
    let timestamp = Local::now().format("%Y%m%d_%H%M%S");

    if let Some(config_name) = cli.config_name() {
        let config_log_dir = log_dir.join(&config_name);
        let log_filename = format!("{}_{}.log", config_name, timestamp);
        config_log_dir.join(log_filename)
    } else {
        let log_filename = format!("Run_{}.log", timestamp);
        log_dir.join(log_filename)
    }
}

/// Load configuration from file or CLI arguments, prompting for anything
/// still missing
fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = if let Some(ref config_path) = cli.config {
        info!(config_file = %config_path.display(), "Loading configuration from file");
        let file_config = Config::load_from_file(config_path)?;
        cli.merge_with_config(file_config)
    } else {
        cli.to_config()
    };

    if config.source_dir.as_os_str().is_empty() {
        config.source_dir = interactive::prompt_source_dir()?;
    }

    // Resume choice was neither given on the CLI nor set in a config file
    if cli.resume.is_none() && cli.config.is_none() {
        config.resume = interactive::prompt_resume_mode()?;
    }

    if config.resume == ResumeMode::Plan && config.plan_file.is_none() {
        config.plan_file = Some(interactive::prompt_plan_file()?);
    }

    Ok(config)
}

/// Setup logging (file + console)
fn setup_logging(cli: &Cli, log_path: &Path) -> Result<Option<WorkerGuard>> {
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let env_filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    if let Some(parent) = log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let file = std::fs::OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(log_path)?;

    let (non_blocking, guard) = tracing_appender::non_blocking(file);

    let subscriber = tracing_subscriber::registry().with(env_filter);

    if cli.json_log {
        subscriber
            .with(
                fmt::layer()
                    .json()
                    .with_ansi(false)
                    .with_writer(non_blocking),
            )
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    } else {
        subscriber
            .with(fmt::layer().with_ansi(false).with_writer(non_blocking))
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    Ok(Some(guard))
}
