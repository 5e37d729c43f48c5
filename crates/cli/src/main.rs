// wrsync - world-record sync from the record spreadsheets to the wiki guide pages

mod exit_codes;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration as StdDuration;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use exit_codes::*;
use wrsync_cli::{Pipeline, RunOptions};
use wrsync_config::{get_secret, get_secret_or_file, BaselineBackend, PathSettings, Secret, Settings};
use wrsync_core::{
    BaselineStore, Duration, Feed, Outcome, Record, RunReport, SyncError, SyncResult, TabularSource,
};
use wrsync_io::{FileRowsSource, JsonBaselineStore, JsonReportSink, SqliteBaselineStore};
use wrsync_patch::{patch, PatchOutcome, SkipReason, SlotDescriptor};
use wrsync_recon::{Engine, RuleSet};
use wrsync_remote::{SheetRange, SheetsClient, WikiClient, WikiConfig};

/// Set by SIGINT; the pipeline checks it between entities.
static STOP: AtomicBool = AtomicBool::new(false);

/// Build long version string with commit hash and target
fn long_version() -> &'static str {
    concat!(
        env!("CARGO_PKG_VERSION"),
        "\ncommit: ",
        env!("GIT_COMMIT_HASH"),
        "\ntarget: ",
        env!("TARGET"),
    )
}

#[derive(Parser)]
#[command(name = "wrsync")]
#[command(author, version, long_version = long_version())]
#[command(about = "Sync world records from the record spreadsheets to the wiki guide pages")]
#[command(after_help = "\
Examples:
  wrsync run                          Fetch both feeds, publish improvements
  wrsync run --feed rta --dry-run     Show what would change, touch nothing
  wrsync run --rows-dir captured/     Use saved sheet responses instead of the API
  wrsync extract ss --rows-dir captured/
  wrsync patch page.wiki --feed rta --time 6:52.00 --link https://youtu.be/x
  wrsync rules validate my_rules.toml

Exit codes:
  0   success (including nothing to update)
  3   config invalid         4   rule table invalid     5   missing credential
  10  run aborted            11  some entries failed    12  interrupted
  20  source unavailable     21  feed returned no rows
  30  page has no record slot                         31  slot unparsable")]
struct Cli {
    /// Config file (default: <config dir>/wrsync/config.toml)
    #[arg(long, global = true, env = "WRSYNC_CONFIG")]
    config: Option<PathBuf>,

    /// More logging (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch, reconcile and publish
    Run {
        /// Which feed(s) to sync
        #[arg(long, value_enum, default_value = "all")]
        feed: FeedArg,

        /// Compute patches and report them without editing or committing
        #[arg(long)]
        dry_run: bool,

        /// Read ss_rows.json / rta_rows.json from this directory instead of the Sheets API
        #[arg(long, value_name = "DIR")]
        rows_dir: Option<PathBuf>,

        /// Print the run report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the canonical records of one feed
    Extract {
        #[arg(value_enum)]
        feed: FeedName,

        /// Read <feed>_rows.json from this directory instead of the Sheets API
        #[arg(long, value_name = "DIR")]
        rows_dir: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Patch a locally saved page with one record
    Patch {
        /// Page wikitext
        page: PathBuf,

        #[arg(long, value_enum)]
        feed: FeedName,

        /// Record time (e.g. 9.52, 1:08.36)
        #[arg(long)]
        time: String,

        #[arg(long)]
        link: String,

        /// 1-based variant within the page's slot
        #[arg(long)]
        variant: Option<u8>,

        /// Entity id (default: file stem)
        #[arg(long)]
        entity: Option<String>,

        /// Write the patched page here instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Rule table commands
    Rules {
        #[command(subcommand)]
        command: RulesCommands,
    },
}

#[derive(Subcommand)]
enum RulesCommands {
    /// Parse and compile a rule table (default: the configured or built-in one)
    Validate {
        path: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum FeedArg {
    Ss,
    Rta,
    All,
}

#[derive(Clone, Copy, ValueEnum)]
enum FeedName {
    Ss,
    Rta,
}

impl From<FeedName> for Feed {
    fn from(f: FeedName) -> Self {
        match f {
            FeedName::Ss => Feed::Ss,
            FeedName::Rta => Feed::Rta,
        }
    }
}

struct CliError {
    code: u8,
    message: String,
    hint: Option<String>,
}

impl CliError {
    fn new(code: u8, message: impl Into<String>) -> Self {
        Self { code, message: message.into(), hint: None }
    }

    fn args(message: impl Into<String>) -> Self {
        Self::new(EXIT_USAGE, message)
    }

    fn config(message: impl Into<String>) -> Self {
        Self::new(EXIT_CONFIG, message)
    }

    fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl From<SyncError> for CliError {
    fn from(e: SyncError) -> Self {
        Self::new(sync_exit_code(&e), e.to_string())
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    let result = match cli.command {
        Commands::Run { feed, dry_run, rows_dir, json } => {
            cmd_run(cli.config.as_deref(), feed, dry_run, rows_dir, json)
        }
        Commands::Extract { feed, rows_dir, json } => cmd_extract(cli.config.as_deref(), feed.into(), rows_dir, json),
        Commands::Patch { page, feed, time, link, variant, entity, output } => {
            cmd_patch(&page, feed.into(), &time, &link, variant, entity, output)
        }
        Commands::Rules { command: RulesCommands::Validate { path } } => {
            cmd_rules_validate(cli.config.as_deref(), path)
        }
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

/// `RUST_LOG` wins; otherwise `-v`/`-q` pick the default level.
fn init_logging(verbose: u8, quiet: bool) {
    let default = match (quiet, verbose) {
        (true, _) => "warn",
        (false, 0) => "info",
        (false, 1) => "debug",
        (false, _) => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

// ============================================================================
// run
// ============================================================================

fn cmd_run(
    config: Option<&Path>,
    feed: FeedArg,
    dry_run: bool,
    rows_dir: Option<PathBuf>,
    json: bool,
) -> Result<(), CliError> {
    let settings = load_settings(config)?;
    let engine = load_engine(&settings, None)?;

    let feeds = match feed {
        FeedArg::Ss => vec![Feed::Ss],
        FeedArg::Rta => vec![Feed::Rta],
        FeedArg::All => settings.enabled_feeds(),
    };
    if feeds.is_empty() {
        return Err(CliError::config("no feed enabled").with_hint("enable [feeds.ss] or [feeds.rta] in the config"));
    }

    let source = open_source(&settings, rows_dir)?;
    let baselines = open_baselines(&settings.paths);
    let reports = JsonReportSink::new(&settings.paths.report_dir);
    install_stop_handler();

    let pipeline = Pipeline::new(&engine, source.as_ref(), baselines.as_ref(), &STOP).with_reports(&reports);
    let options = RunOptions { feeds, dry_run };
    let report = pipeline.run(&options, || connect_wiki(&settings, dry_run));

    if json {
        let out = serde_json::to_string_pretty(&report)
            .map_err(|e| CliError::new(EXIT_ERROR, format!("cannot serialize report: {e}")))?;
        println!("{out}");
    } else {
        print_report(&report);
    }

    run_exit(&report)
}

/// Map a finished report to the process result.
fn run_exit(report: &RunReport) -> Result<(), CliError> {
    if STOP.load(Ordering::SeqCst) {
        return Err(CliError::new(EXIT_INTERRUPTED, "interrupted; confirmed records were committed"));
    }
    if let Some(error) = &report.error {
        return Err(CliError::new(EXIT_RUN_ABORTED, error.clone()));
    }
    let failed = report.failed();
    if failed > 0 {
        return Err(CliError::new(EXIT_RUN_PARTIAL, format!("{failed} entries failed"))
            .with_hint("see the run report for reasons"));
    }
    Ok(())
}

fn print_report(report: &RunReport) {
    if report.nothing_to_update {
        println!("nothing to update");
        return;
    }
    for entry in &report.entries {
        if matches!(entry.outcome, Outcome::SkippedUnchanged) {
            continue;
        }
        println!("{:<4} {:<50} {}", entry.feed.as_str(), entry.entity, entry.outcome);
    }
    let dry = report.count(|o| matches!(o, Outcome::DryRun { .. }));
    if report.dry_run {
        println!("{dry} would be updated, {} failed (dry run)", report.failed());
    } else {
        println!("{} updated, {} failed", report.updated(), report.failed());
    }
}

fn connect_wiki(settings: &Settings, dry_run: bool) -> SyncResult<WikiClient> {
    let wiki = WikiClient::new(WikiConfig {
        api_url: settings.wiki.api_url.clone(),
        title_prefix: settings.wiki.title_prefix.clone(),
        request_delay: StdDuration::from_millis(settings.wiki.request_delay_ms),
        user_agent: settings.wiki.user_agent.clone(),
    });
    if dry_run {
        // Page reads are anonymous.
        return Ok(wiki);
    }

    settings.require_live().map_err(|e| SyncError::Fatal(e.to_string()))?;
    let password = get_secret(Secret::WikiPassword)
        .value
        .ok_or_else(|| SyncError::Fatal(format!("{} is not set", Secret::WikiPassword.env_var())))?;
    wiki.login(&settings.wiki.username, &password)
        .map_err(|e| SyncError::Fatal(format!("wiki login: {e}")))?;
    Ok(wiki)
}

#[cfg(unix)]
extern "C" fn on_sigint(_: libc::c_int) {
    STOP.store(true, Ordering::SeqCst);
    // SAFETY: signal() is async-signal-safe.
    unsafe {
        libc::signal(libc::SIGINT, libc::SIG_DFL);
    }
}

/// First Ctrl-C asks the pipeline to stop after the current entity; a second one kills.
#[cfg(unix)]
fn install_stop_handler() {
    // SAFETY: the handler only stores to an atomic and resets itself.
    unsafe {
        libc::signal(libc::SIGINT, on_sigint as extern "C" fn(libc::c_int) as libc::sighandler_t);
    }
}

#[cfg(not(unix))]
fn install_stop_handler() {}

// ============================================================================
// extract
// ============================================================================

fn cmd_extract(config: Option<&Path>, feed: Feed, rows_dir: Option<PathBuf>, json: bool) -> Result<(), CliError> {
    let settings = load_settings(config)?;
    let engine = load_engine(&settings, None)?;
    let source = open_source(&settings, rows_dir)?;

    let rows = source.fetch_rows(feed)?;
    let (records, issues) = engine.extract(feed, &rows)?;

    if json {
        let out = serde_json::to_string_pretty(&records)
            .map_err(|e| CliError::new(EXIT_ERROR, format!("cannot serialize records: {e}")))?;
        println!("{out}");
    } else {
        for r in &records {
            println!("{:<50} {:>12}  {}", r.key().to_string(), r.time.display(), r.link);
        }
    }
    for issue in &issues {
        eprintln!("warning: row {} ({}): {}", issue.row, issue.label, issue.error);
    }
    eprintln!("{} records, {} row issues", records.len(), issues.len());
    Ok(())
}

// ============================================================================
// patch
// ============================================================================

fn cmd_patch(
    page: &Path,
    feed: Feed,
    time: &str,
    link: &str,
    variant: Option<u8>,
    entity: Option<String>,
    output: Option<PathBuf>,
) -> Result<(), CliError> {
    let text = std::fs::read_to_string(page)
        .map_err(|e| CliError::args(format!("cannot read {}: {e}", page.display())))?;
    let time = Duration::parse(time).map_err(|e| CliError::args(e.to_string()))?;
    let entity = entity.unwrap_or_else(|| {
        page.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default()
    });
    let records = [Record::new(time, link, entity).with_variant(variant)];

    let descriptor = SlotDescriptor::detect(&text, feed, &records)?;
    match patch(&text, &descriptor, &records)? {
        PatchOutcome::Patched { text, summary } => {
            match output {
                Some(path) => std::fs::write(&path, text)
                    .map_err(|e| CliError::new(EXIT_ERROR, format!("cannot write {}: {e}", path.display())))?,
                None => print!("{text}"),
            }
            eprintln!("summary: {summary}");
        }
        PatchOutcome::Skip(SkipReason::AlreadyCurrent) => eprintln!("page already shows this record"),
        PatchOutcome::Skip(SkipReason::NotImproved) => eprintln!("page already shows an equal or faster time"),
    }
    Ok(())
}

// ============================================================================
// rules
// ============================================================================

fn cmd_rules_validate(config: Option<&Path>, path: Option<PathBuf>) -> Result<(), CliError> {
    let settings = load_settings(config)?;
    let shown = path
        .as_deref()
        .or(settings.paths.rules.as_deref())
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "built-in rules".to_string());
    let rules = read_rules(&settings, path.as_deref())?;
    let count = rules.rules.len();
    Engine::new(rules).map_err(|e| CliError::new(EXIT_RULES, e.to_string()))?;
    println!("{shown}: ok ({count} rules)");
    Ok(())
}

// ============================================================================
// Wiring
// ============================================================================

fn load_settings(path: Option<&Path>) -> Result<Settings, CliError> {
    Settings::load(path).map_err(|e| {
        CliError::config(e.to_string()).with_hint(format!("default location: {}", Settings::config_path().display()))
    })
}

fn read_rules(settings: &Settings, path: Option<&Path>) -> Result<RuleSet, CliError> {
    let mut rules = match path.or(settings.paths.rules.as_deref()) {
        Some(p) => RuleSet::from_path(p),
        None => RuleSet::default_rules(),
    }
    .map_err(|e| CliError::new(EXIT_RULES, e.to_string()))?;
    if let Some(reconcile) = &settings.reconcile {
        rules.reconcile = reconcile.clone();
    }
    Ok(rules)
}

fn load_engine(settings: &Settings, path: Option<&Path>) -> Result<Engine, CliError> {
    let rules = read_rules(settings, path)?;
    Engine::new(rules).map_err(|e| CliError::new(EXIT_RULES, e.to_string()))
}

fn open_source(settings: &Settings, rows_dir: Option<PathBuf>) -> Result<Box<dyn TabularSource>, CliError> {
    if let Some(dir) = rows_dir {
        log::info!("reading rows from {}", dir.display());
        return Ok(Box::new(FileRowsSource::new(dir)));
    }

    let lookup = get_secret_or_file(Secret::SheetsToken, settings.sheets.token_file.as_deref());
    let token = lookup.value.ok_or_else(|| {
        CliError::new(EXIT_MISSING_SECRET, "no Sheets access token").with_hint(format!(
            "set {} or sheets.token_file, or pass --rows-dir",
            Secret::SheetsToken.env_var()
        ))
    })?;
    log::debug!("sheets token from {}", lookup.source.as_str());

    let range = |feed: Feed| {
        let source = settings.sheets.source(feed);
        SheetRange::new(source.spreadsheet_id.clone(), source.range.clone())
    };
    Ok(Box::new(SheetsClient::new(&settings.sheets.api_base, token, range(Feed::Ss), range(Feed::Rta))))
}

fn open_baselines(paths: &PathSettings) -> Box<dyn BaselineStore> {
    match paths.baseline_backend {
        BaselineBackend::Json => Box::new(JsonBaselineStore::new(&paths.baseline_dir)),
        BaselineBackend::Sqlite => Box::new(SqliteBaselineStore::new(paths.baseline_dir.join("baseline.db"))),
    }
}
