//! CLI for scaffold: create projects from templates and keep them in sync.

use anyhow::{Context, Result, bail};
use clap::{ArgAction, Parser, Subcommand};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use sfhelper_manifest::{MANIFEST_FILE, Manifest, MergeOutcome, SCRATCH_DIR};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

pub mod fetch;
pub mod sync;

pub use fetch::{FetchError, Fetcher, TemplateFetcher, TemplateSource};

const PROJECT_TEMPLATE_ENV: &str = "SCAFFOLD_PROJECT_TEMPLATE";
const COMPONENT_TEMPLATE_ENV: &str = "SCAFFOLD_COMPONENT_TEMPLATE";

#[derive(Parser)]
#[command(name = "scaffold-cli")]
#[command(version, about = "Create projects from templates and keep them in sync", long_about = None)]
#[command(arg_required_else_help = true)]
pub struct Cli {
    /// Log more (-v for progress, -vv for debug output)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Run as if started in this directory
    #[arg(long, global = true, value_name = "DIR")]
    pub cwd: Option<PathBuf>,

    /// Template used for projects
    #[arg(long, global = true, value_name = "REF", env = PROJECT_TEMPLATE_ENV)]
    pub project_template: Option<String>,

    /// Template used for components (with -c)
    #[arg(long, global = true, value_name = "REF", env = COMPONENT_TEMPLATE_ENV)]
    pub component_template: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a new project or component from a template
    Init {
        /// Name of the new project, also used as its directory name
        app_name: String,

        /// Use the component template instead of the project template
        #[arg(short, long)]
        component: bool,

        /// Overwrite an existing directory without asking
        #[arg(short, long)]
        yes: bool,
    },

    /// Pull the latest template into the current project
    Update {
        /// Update from the component template
        #[arg(short, long)]
        component: bool,
    },
}

/// Main entry point for the CLI.
pub fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(outcome) => {
            outcome.report();
            outcome.exit_code()
        }
        Err(err) => {
            eprintln!("{} {err:#}", style("error:").red().bold());
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: Cli) -> Result<Outcome> {
    let cwd = match cli.cwd {
        Some(dir) => dir,
        None => std::env::current_dir().context("Failed to read the current directory")?,
    };
    let fetcher = TemplateFetcher::new()?;

    match cli.command {
        Commands::Init {
            app_name,
            component,
            yes,
        } => {
            let kind = TemplateKind::select(component);
            let options = InitOptions {
                app_name,
                kind,
                template: kind.pick(cli.project_template, cli.component_template),
            };
            let confirm = TerminalConfirm { assume_yes: yes };
            init_project(&cwd, &options, &fetcher, &confirm)
        }
        Commands::Update { component } => {
            let kind = TemplateKind::select(component);
            let options = UpdateOptions {
                kind,
                template: kind.pick(cli.project_template, cli.component_template),
            };
            update_project(&cwd, &options, &fetcher)
        }
    }
}

// ============================================================================
// Outcomes and options
// ============================================================================

/// How a command finished, when it did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// `init` created a project in this directory.
    Created { kind: TemplateKind, dir: PathBuf },
    /// `update` rewrote the project from the template.
    Updated {
        kind: TemplateKind,
        synced: Vec<&'static str>,
    },
    /// `update` found nothing to change.
    UpToDate,
    /// The user declined to overwrite an existing directory.
    Cancelled,
}

impl Outcome {
    pub fn exit_code(&self) -> ExitCode {
        match self {
            Outcome::Cancelled => ExitCode::FAILURE,
            _ => ExitCode::SUCCESS,
        }
    }

    fn report(&self) {
        match self {
            Outcome::Created { kind, dir } => {
                println!(
                    "{} {} initialized in {}",
                    style("✔").green(),
                    kind.label(),
                    dir.display()
                );
            }
            Outcome::Updated { kind, synced } => {
                println!("{} {} updated from the template", style("✔").green(), kind.label());
                for path in synced {
                    println!("  {} {}", style("synced").dim(), path);
                }
                println!(
                    "{}",
                    style("Dependencies were replaced; reinstall them before building.").yellow()
                );
            }
            Outcome::UpToDate => {
                println!("{}", style("Already on the latest template, nothing to update.").green());
            }
            Outcome::Cancelled => {
                println!("{}", style("Cancelled, nothing was changed.").yellow());
            }
        }
    }
}

/// Which template a command works from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateKind {
    Project,
    Component,
}

impl TemplateKind {
    pub fn select(component: bool) -> Self {
        if component {
            TemplateKind::Component
        } else {
            TemplateKind::Project
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            TemplateKind::Project => "project",
            TemplateKind::Component => "component",
        }
    }

    fn pick(self, project: Option<String>, component: Option<String>) -> Option<String> {
        match self {
            TemplateKind::Project => project,
            TemplateKind::Component => component,
        }
    }

    fn missing_template_hint(self) -> String {
        let (flag, env) = match self {
            TemplateKind::Project => ("--project-template", PROJECT_TEMPLATE_ENV),
            TemplateKind::Component => ("--component-template", COMPONENT_TEMPLATE_ENV),
        };
        format!(
            "No {} template configured. Pass {flag} <REF> or set {env}",
            self.label()
        )
    }
}

#[derive(Debug, Clone)]
pub struct InitOptions {
    pub app_name: String,
    pub kind: TemplateKind,
    /// Template reference; see [`TemplateSource::parse`].
    pub template: Option<String>,
}

#[derive(Debug, Clone)]
pub struct UpdateOptions {
    pub kind: TemplateKind,
    pub template: Option<String>,
}

// ============================================================================
// Prompting
// ============================================================================

/// Asks the user a yes/no question.
pub trait Confirm {
    fn confirm(&self, question: &str) -> Result<bool>;
}

/// Prompts on the terminal. Without a terminal the answer is "no" unless
/// `assume_yes` is set.
pub struct TerminalConfirm {
    pub assume_yes: bool,
}

impl Confirm for TerminalConfirm {
    fn confirm(&self, question: &str) -> Result<bool> {
        if self.assume_yes {
            return Ok(true);
        }
        if !console::user_attended() {
            debug!("no terminal attached, declining: {question}");
            return Ok(false);
        }
        dialoguer::Confirm::new()
            .with_prompt(question)
            .default(false)
            .interact()
            .context("Failed to read confirmation")
    }
}

// ============================================================================
// Commands
// ============================================================================

/// Create `cwd/<app_name>` from the template and stamp its manifest with the
/// app name.
pub fn init_project(
    cwd: &Path,
    options: &InitOptions,
    fetcher: &dyn Fetcher,
    confirm: &dyn Confirm,
) -> Result<Outcome> {
    let name = options.app_name.as_str();
    let kind = options.kind;
    sfhelper_manifest::validate_app_name(name)?;

    let enclosing = cwd.join(MANIFEST_FILE);
    if enclosing.exists() {
        bail!(
            "{} already exists; refusing to initialize inside another project",
            enclosing.display()
        );
    }

    let reference = options
        .template
        .as_deref()
        .ok_or_else(|| anyhow::anyhow!(kind.missing_template_hint()))?;
    let source = TemplateSource::parse(reference, cwd)?;

    let target = cwd.join(name);
    if target.exists() {
        if !target.is_dir() {
            bail!("{} exists and is not a directory", target.display());
        }
        let question = format!(
            "{} {} directory already exists. Overwrite it?",
            name,
            kind.label()
        );
        if !confirm.confirm(&question)? {
            return Ok(Outcome::Cancelled);
        }
        sync::empty_dir(&target)
            .with_context(|| format!("Failed to empty {}", target.display()))?;
    }

    info!(%source, target = %target.display(), "initializing {}", kind.label());
    with_spinner(&format!("Fetching {} template", kind.label()), || {
        fetcher.fetch(&source, &target)
    })
    .with_context(|| format!("Failed to fetch the {} template from {source}", kind.label()))?;

    let manifest_path = target.join(MANIFEST_FILE);
    let mut manifest = Manifest::read(&manifest_path)?;
    manifest.rename(name);
    manifest.write(&manifest_path)?;

    Ok(Outcome::Created { kind, dir: target })
}

/// Fetch the template into the scratch directory, merge its manifest into
/// the project's, and copy the synced files over.
pub fn update_project(cwd: &Path, options: &UpdateOptions, fetcher: &dyn Fetcher) -> Result<Outcome> {
    let kind = options.kind;
    let local_path = cwd.join(MANIFEST_FILE);
    if !local_path.is_file() {
        bail!(
            "No {MANIFEST_FILE} found in {}; run update from the {} root",
            cwd.display(),
            kind.label()
        );
    }
    let local = Manifest::read(&local_path)?;

    let reference = options
        .template
        .as_deref()
        .ok_or_else(|| anyhow::anyhow!(kind.missing_template_hint()))?;
    let source = TemplateSource::parse(reference, cwd)?;

    let scratch_path = cwd.join(SCRATCH_DIR);
    if scratch_path.symlink_metadata().is_ok() {
        debug!(path = %scratch_path.display(), "removing leftover scratch directory");
        sync::remove_path(&scratch_path)
            .with_context(|| format!("Failed to remove {}", scratch_path.display()))?;
    }
    // Removed on drop, so failures below do not leave it behind.
    let scratch = tempfile::Builder::new()
        .prefix(SCRATCH_DIR)
        .rand_bytes(0)
        .tempdir_in(cwd)
        .with_context(|| format!("Failed to create {}", scratch_path.display()))?;

    info!(%source, "updating {}", kind.label());
    with_spinner(&format!("Fetching {} template", kind.label()), || {
        fetcher.fetch(&source, scratch.path())
    })
    .with_context(|| format!("Failed to fetch the {} template from {source}", kind.label()))?;

    let remote = Manifest::read(&scratch.path().join(MANIFEST_FILE))?;
    match sfhelper_manifest::merge_manifests(&local, &remote) {
        MergeOutcome::UpToDate => return Ok(Outcome::UpToDate),
        MergeOutcome::Merged(merged) => merged.write(&local_path)?,
    }
    info!("rewrote {}", local_path.display());

    let synced = sync::sync_files(scratch.path(), cwd)?;
    scratch
        .close()
        .with_context(|| format!("Failed to remove {}", scratch_path.display()))?;
    sync::remove_stale(cwd)?;

    Ok(Outcome::Updated { kind, synced })
}

fn with_spinner<T, E>(message: &str, f: impl FnOnce() -> Result<T, E>) -> Result<T, E> {
    let spinner = ProgressBar::new_spinner().with_message(message.to_string());
    if let Ok(template) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
        spinner.set_style(template);
    }
    spinner.enable_steady_tick(Duration::from_millis(100));
    let result = f();
    spinner.finish_and_clear();
    result
}
