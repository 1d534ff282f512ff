//! mergelens command-line tool.
//!
//! Provides subcommands for merging three versions of a file, previewing the
//! merge of two refs of a local repository, and generating / validating
//! configuration files.

mod report;
mod style;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use mergelens_core::config::AppConfig;
use mergelens_core::conflict::MarkerLabels;
use mergelens_core::git::LocalRepoSource;
use mergelens_core::preview::PreviewSettings;
use mergelens_core::{ConflictFileData, MergePreviewer, Merger};

const DEFAULT_CONFIG: &str = "./mergelens.toml";

// ---------------------------------------------------------------------------
// CLI argument definitions
// ---------------------------------------------------------------------------

/// mergelens command-line tool.
#[derive(Parser, Debug)]
#[command(
    name = "mergelens",
    version,
    about = "Three-way merge files and preview branch merges"
)]
struct Cli {
    /// Path to the TOML configuration file. Defaults apply when omitted.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log engine decisions to stderr.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Three-way merge one file. Omitting a version treats the file as
    /// absent at that revision.
    Merge(MergeArgs),

    /// Preview merging HEAD into BASE in a local git repository.
    Preview(PreviewArgs),

    /// Generate a default configuration file.
    Init {
        /// Output path for the generated config file.
        #[arg(short, long, default_value = DEFAULT_CONFIG)]
        output: PathBuf,
    },

    /// Validate a configuration file.
    Validate,
}

#[derive(Args, Debug)]
struct MergeArgs {
    /// Common ancestor version.
    #[arg(long)]
    ancestor: Option<PathBuf>,

    /// Version on the branch being merged into.
    #[arg(long)]
    base: Option<PathBuf>,

    /// Version on the branch being merged.
    #[arg(long)]
    head: Option<PathBuf>,

    /// Print the result as JSON instead of marked-up text.
    #[arg(long)]
    json: bool,

    /// Write the merged text here instead of stdout.
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct PreviewArgs {
    /// Path inside the repository.
    #[arg(long, default_value = ".")]
    repo: PathBuf,

    /// Branch, tag, or SHA being merged into.
    #[arg(long)]
    base: String,

    /// Branch, tag, or SHA being merged.
    #[arg(long)]
    head: String,

    /// Print the preview as JSON instead of a table.
    #[arg(long)]
    json: bool,
}

/// How a successful command ended.
#[derive(Debug, PartialEq, Eq)]
enum Outcome {
    Clean,
    Conflicts,
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Minimal logging for CLI
    let level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(level))
        .with_target(false)
        .with_writer(std::io::stderr)
        .without_time()
        .init();

    match run(cli).await {
        Ok(Outcome::Clean) => ExitCode::SUCCESS,
        Ok(Outcome::Conflicts) => ExitCode::from(1),
        Err(e) => {
            eprintln!("{}", style::error(&format!("Error: {:#}", e)));
            ExitCode::from(2)
        }
    }
}

async fn run(cli: Cli) -> Result<Outcome> {
    match cli.command {
        Commands::Init { output } => cmd_init(&output).map(|()| Outcome::Clean),
        Commands::Validate => {
            let path = cli.config.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG));
            cmd_validate(&path).map(|()| Outcome::Clean)
        }
        Commands::Merge(args) => {
            let config = load_config(cli.config.as_deref())?;
            cmd_merge(&config, args)
        }
        Commands::Preview(args) => {
            let config = load_config(cli.config.as_deref())?;
            cmd_preview(&config, args).await
        }
    }
}

// ---------------------------------------------------------------------------
// Config helpers
// ---------------------------------------------------------------------------

fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    match path {
        Some(path) => AppConfig::load_and_resolve(path)
            .with_context(|| format!("failed to load configuration from {}", path.display())),
        None => Ok(AppConfig::default()),
    }
}

/// Read one version of a file; an omitted path means the file is absent.
fn read_version(path: Option<&Path>) -> Result<Option<String>> {
    let Some(path) = path else {
        return Ok(None);
    };
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    Ok(Some(content))
}

// ---------------------------------------------------------------------------
// Subcommand implementations
// ---------------------------------------------------------------------------

fn cmd_merge(config: &AppConfig, args: MergeArgs) -> Result<Outcome> {
    let ancestor = read_version(args.ancestor.as_deref())?;
    let base = read_version(args.base.as_deref())?;
    let head = read_version(args.head.as_deref())?;

    let merger = Merger::with_limits(config.merge.max_diff_cost);
    let result = merger.merge_file(ancestor.as_deref(), base.as_deref(), head.as_deref());
    debug!(
        hunks = result.hunks.len(),
        conflicts = result.conflict_count(),
        "merge finished"
    );
    let has_conflicts = result.has_conflicts;
    let conflicts = result.conflict_count();

    if args.json {
        let name = [&args.head, &args.base, &args.ancestor]
            .into_iter()
            .flatten()
            .next()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "-".into());
        let data = ConflictFileData::new(name, result);
        println!("{}", serde_json::to_string_pretty(&data)?);
    } else if result.is_deletion() {
        eprintln!("{}", style::dim("merged result: file deleted"));
    } else {
        let text = result.render(&marker_labels(&args));
        match &args.output {
            Some(path) => std::fs::write(path, &text)
                .with_context(|| format!("failed to write {}", path.display()))?,
            None => println!("{}", text),
        }
    }

    if has_conflicts {
        eprintln!(
            "{}",
            style::warn(&format!(
                "{} conflict{} remaining",
                conflicts,
                if conflicts == 1 { "" } else { "s" }
            ))
        );
        Ok(Outcome::Conflicts)
    } else {
        Ok(Outcome::Clean)
    }
}

/// Label markers with the file each side came from, like `git merge-file`.
fn marker_labels(args: &MergeArgs) -> MarkerLabels {
    let defaults = MarkerLabels::default();
    let label = |path: &Option<PathBuf>, fallback: String| {
        path.as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or(fallback)
    };
    MarkerLabels {
        base: label(&args.base, defaults.base),
        ancestor: label(&args.ancestor, defaults.ancestor),
        head: label(&args.head, defaults.head),
    }
}

async fn cmd_preview(config: &AppConfig, args: PreviewArgs) -> Result<Outcome> {
    let source = LocalRepoSource::open(&args.repo)
        .with_context(|| format!("failed to open repository at {}", args.repo.display()))?;
    let previewer = MergePreviewer::new(Arc::new(source), PreviewSettings::from(&config.merge));
    let preview = previewer
        .preview(&args.base, &args.head)
        .await
        .context("merge preview failed")?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&preview)?);
    } else {
        println!();
        println!(
            "{}",
            style::header(&format!(
                "Merging {} into {} (merge base {})",
                preview.head_branch,
                preview.base_branch,
                short_sha(&preview.merge_base_sha)
            ))
        );
        println!();
        if preview.files.is_empty() {
            println!("{}", style::dim("No changed files."));
        } else {
            println!("{}", report::preview_table(&preview));
        }
        println!();
        let summary = report::summary(&preview);
        if preview.conflicted_count() > 0 {
            println!("{}", style::warn(&summary));
        } else {
            println!("{}", style::success(&summary));
        }
    }

    Ok(if preview.conflicted_count() > 0 {
        Outcome::Conflicts
    } else {
        Outcome::Clean
    })
}

fn short_sha(sha: &str) -> &str {
    sha.get(..10).unwrap_or(sha)
}

fn cmd_init(output: &Path) -> Result<()> {
    if output.exists() {
        anyhow::bail!(
            "file already exists: {}. Use a different path or remove the existing file.",
            output.display()
        );
    }

    std::fs::write(output, AppConfig::template()).context("failed to write config file")?;

    println!("{}", style::success(&format!("Default configuration written to {}", output.display())));
    println!();
    println!("Next steps:");
    println!("  1. Set the token variable named by github.token_env (GITHUB_TOKEN by default)");
    println!(
        "  2. Validate with: mergelens validate --config {}",
        output.display()
    );
    println!(
        "  3. Start the server: mergelens-server --config {}",
        output.display()
    );

    Ok(())
}

fn cmd_validate(config_path: &Path) -> Result<()> {
    println!("Validating configuration: {}", config_path.display());
    println!();

    let mut config =
        AppConfig::load_from_file(config_path).context("failed to parse configuration")?;
    println!("  [OK] TOML structure is valid");

    config.resolve_env_vars();
    println!("  [OK] Environment variable references processed");

    match config.validate() {
        Ok(()) => println!("  [OK] All values are valid"),
        Err(e) => {
            println!("  [FAIL] Validation error: {}", e);
            anyhow::bail!("configuration validation failed");
        }
    }

    println!();
    println!("Configuration summary:");
    println!("  Listen          : {}", config.server.listen);
    println!("  Log level       : {}", config.server.log_level);
    println!("  GitHub API      : {}", config.github.api_url);
    println!(
        "  GitHub token    : {} ({})",
        if config.github.token.is_some() { "set" } else { "NOT SET" },
        config.github.token_env
    );
    println!("  Max files       : {}", config.merge.max_files);
    println!("  Max concurrency : {}", config.merge.max_concurrency);
    println!("  Max diff cost   : {}", config.merge.max_diff_cost);
    println!("  Max file lines  : {}", config.merge.max_file_lines);
    println!("  Fetch timeout   : {}s", config.merge.fetch_timeout_secs);

    Ok(())
}
