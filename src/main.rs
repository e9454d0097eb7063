mod batch;
mod config;
mod credentials;
mod diagnostics;
mod error;
#[cfg(test)]
mod fake_api;
mod github;
mod hosting;
mod report;
mod resolver;
mod rewrite;
mod scanner;
mod types;
mod version;

use std::io::{BufRead as _, IsTerminal as _, Write as _};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{ArgAction, Parser};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::error::Error;
use crate::github::GitHubClient;
use crate::hosting::HostingApi;
use crate::report::heading;
use crate::types::Policy;

/// Exit code when the workflow contains no action references.
const EXIT_NO_ACTIONS: u8 = 1;
/// Exit code for command-line usage errors.
const EXIT_USAGE: u8 = 1;
/// Exit code when a dry run found changes to make.
const EXIT_WOULD_CHANGE: u8 = 2;
/// Exit code for runtime errors.
const EXIT_ERROR: u8 = 3;

/// Command-line arguments.
#[derive(Parser)]
#[command(
    name = "actpin",
    version,
    about = "Pin GitHub Actions references to immutable commit ids",
    after_help = "Example: actpin --policy same-major --yes .github/workflows/ci.yml"
)]
struct Cli {
    /// Preview planned updates and exit without writing (exit code 2 if anything would change)
    #[arg(long, conflicts_with = "yes")]
    dry_run: bool,
    /// Expand moving major tags (v4 or 4) to the full version in the trailing comment
    #[arg(long)]
    expand_major: bool,
    /// Update policy: latest (default), same-major, requested
    #[arg(long, value_name = "POLICY")]
    policy: Option<String>,
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
    /// Workflow file to update
    workflow_file: PathBuf,
    /// Apply changes without the confirmation prompt
    #[arg(short, long, visible_alias = "write")]
    yes: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            // Clap exits 2 on usage errors; 2 is reserved for dry runs with changes.
            return if e.use_stderr() { ExitCode::from(EXIT_USAGE) } else { ExitCode::SUCCESS };
        },
    };
    init_logging(cli.verbose);

    return match run(&cli).await {
        Ok(code) => code,
        Err(e) => {
            diagnostics::print_error(&e);
            ExitCode::from(EXIT_ERROR)
        },
    };
}

/// Install the stderr subscriber. `RUST_LOG` wins over `-v`.
fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| return EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(verbose >= 2)
        .init();
    debug!("actpin started with verbosity level: {verbose}");
}

/// Scan, resolve, preview and optionally write one workflow file.
///
/// # Errors
///
/// Returns config, credential, I/O and client construction errors. Per-action
/// lookup failures are reported inline and never abort the run.
async fn run(cli: &Cli) -> Result<ExitCode, Error> {
    let config = Config::load(Path::new("."))?;
    let policy = cli.policy.as_deref().map(str::parse::<Policy>).transpose()?;
    let options = config.options(policy, cli.expand_major);
    info!("policy {}, expand_major {}", options.policy, options.expand_major);

    let path = &cli.workflow_file;
    if !path.is_file() {
        return Err(Error::FileNotFound { path: path.clone() });
    }
    let styled = std::io::stdout().is_terminal();

    println!("\n{} {}\n", heading("Scanning workflow", styled), path.display());
    let content = std::fs::read_to_string(path)?;

    let actions = scanner::discover_actions(&content);
    if actions.is_empty() {
        println!("{} No GitHub Actions references found in {}", heading("No actions:", styled), path.display());
        return Ok(ExitCode::from(EXIT_NO_ACTIONS));
    }

    println!("{}\n", heading("Discovered actions:", styled));
    for action in &actions {
        println!("  - {action}");
    }
    println!();

    let occurrences = scanner::extract(&content);
    if occurrences.is_empty() {
        println!(
            "{} No `uses: owner/repo@ref` references to pin in {}",
            heading("Nothing to do:", styled),
            path.display()
        );
        return Ok(ExitCode::from(EXIT_NO_ACTIONS));
    }
    println!("{}\n", heading("Resolving latest versions and commits...", styled));
    let token = credentials::github_token()?;
    let api: Arc<dyn HostingApi> = Arc::new(GitHubClient::new(token)?);
    let batch = batch::resolve_all(api, &occurrences, options).await;
    for line in batch.progress.iter().flatten() {
        println!("{line}");
    }

    let updated = rewrite::apply(&content, &occurrences, &batch.resolutions);

    println!("\n{}\n", heading("Planned updates:", styled));
    print!("{}", report::render_plan(&report::plan_changes(&occurrences, &batch.resolutions)));
    let failed = report::failures(&occurrences, &batch.resolutions);
    if !failed.is_empty() {
        eprintln!("\n{}\n", heading("Failed lookups (left unchanged):", styled));
        eprint!("{}", report::render_failures(&failed));
    }

    if cli.dry_run {
        if updated == content {
            return Ok(ExitCode::SUCCESS);
        }
        return Ok(ExitCode::from(EXIT_WOULD_CHANGE));
    }

    if updated == content {
        println!("\n{} All actions are already pinned to the latest versions.", heading("Up to date:", styled));
        return Ok(ExitCode::SUCCESS);
    }

    println!();
    if !cli.yes && !confirm(&format!("{} [y/N] ", heading("Apply changes?", styled)))? {
        println!("\n{}", heading("No changes applied.", styled));
        return Ok(ExitCode::SUCCESS);
    }

    std::fs::write(path, &updated)?;
    println!("\n{} {}\n", heading("Updated file", styled), path.display());
    println!("{}\n", heading("Pinned actions:", styled));
    print!("{}", report::render_pinned(&occurrences, &batch.resolutions));
    return Ok(ExitCode::SUCCESS);
}

/// Ask a yes/no question on stdin. Anything but `y`/`yes` is a no,
/// including end of input.
///
/// # Errors
///
/// Returns `Error::Io` if the terminal cannot be written or read.
fn confirm(prompt: &str) -> Result<bool, Error> {
    print!("{prompt}");
    std::io::stdout().flush()?;
    let mut answer = String::new();
    let _ = std::io::stdin().lock().read_line(&mut answer)?;
    let answer = answer.trim().to_lowercase();
    return Ok(answer == "y" || answer == "yes");
}
