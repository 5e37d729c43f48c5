// Run pipeline against in-memory collaborators.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::sync::atomic::AtomicBool;

use wrsync_cli::{Pipeline, RunOptions};
use wrsync_core::{
    Baseline, BaselineStore, DocumentStore, Duration, Feed, Outcome, Page, RawRows, Record, RecordKey, ReportSink,
    RunReport, Stage, SyncError, SyncResult, TabularSource,
};
use wrsync_recon::{Engine, RuleSet};

// ============================================================================
// Fakes
// ============================================================================

struct MemSource {
    ss: Vec<Vec<String>>,
}

impl TabularSource for MemSource {
    fn fetch_rows(&self, feed: Feed) -> SyncResult<RawRows> {
        match feed {
            Feed::Ss => Ok(RawRows::Flat(self.ss.clone())),
            Feed::Rta => Err(SyncError::SourceUnavailable { feed: "rta".into(), reason: "offline".into() }),
        }
    }
}

#[derive(Default)]
struct MemBaselines {
    saved: RefCell<BTreeMap<Feed, Baseline>>,
    saves: Cell<usize>,
}

impl BaselineStore for MemBaselines {
    fn load(&self, feed: Feed) -> SyncResult<Baseline> {
        Ok(self.saved.borrow().get(&feed).cloned().unwrap_or_else(|| Baseline::empty(feed)))
    }

    fn save(&self, baseline: &Baseline) -> SyncResult<()> {
        self.saves.set(self.saves.get() + 1);
        self.saved.borrow_mut().insert(baseline.feed(), baseline.clone());
        Ok(())
    }
}

#[derive(Default)]
struct MemWiki {
    pages: RefCell<BTreeMap<String, String>>,
    /// Errors returned by `put_text`, per entity.
    refuse: BTreeMap<String, SyncError>,
    edits: RefCell<Vec<(String, String)>>,
}

impl MemWiki {
    fn with_page(self, entity: &str, ss_record: &str) -> Self {
        let text = format!("{{{{speedrun_infobox\n|ss_record={ss_record}\n}}}}\n");
        self.pages.borrow_mut().insert(entity.to_string(), text);
        self
    }

    fn refusing(mut self, entity: &str, err: SyncError) -> Self {
        self.refuse.insert(entity.to_string(), err);
        self
    }

    fn text(&self, entity: &str) -> String {
        self.pages.borrow().get(entity).cloned().unwrap_or_default()
    }
}

impl DocumentStore for MemWiki {
    fn get_text(&self, entity_id: &str) -> SyncResult<Page> {
        let text = self
            .pages
            .borrow()
            .get(entity_id)
            .cloned()
            .ok_or_else(|| SyncError::PageNotFound { entity_id: entity_id.to_string() })?;
        Ok(Page { text, version: "v1".into() })
    }

    fn put_text(&self, entity_id: &str, text: &str, version: &str, summary: &str) -> SyncResult<()> {
        assert_eq!(version, "v1");
        if let Some(err) = self.refuse.get(entity_id) {
            return Err(err.clone());
        }
        self.pages.borrow_mut().insert(entity_id.to_string(), text.to_string());
        self.edits.borrow_mut().push((entity_id.to_string(), summary.to_string()));
        Ok(())
    }
}

#[derive(Default)]
struct MemReports {
    written: RefCell<Vec<RunReport>>,
}

impl ReportSink for MemReports {
    fn write(&self, report: &RunReport) -> SyncResult<()> {
        self.written.borrow_mut().push(report.clone());
        Ok(())
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn engine() -> Engine {
    Engine::new(RuleSet::default_rules().unwrap()).unwrap()
}

/// Flat single-star row: label, blank, hyperlink formula, in-game cell.
fn row(label: &str, link: &str, sheet_time: &str) -> Vec<String> {
    vec![
        label.to_string(),
        String::new(),
        format!("=HYPERLINK(\"{link}\";\"{sheet_time}\")"),
        String::new(),
    ]
}

fn rec(entity: &str, time: &str, link: &str) -> Record {
    Record::new(Duration::parse(time).unwrap(), link, entity)
}

fn ss_only() -> RunOptions {
    RunOptions { feeds: vec![Feed::Ss], dry_run: false }
}

fn committed(baselines: &MemBaselines, entity: &str) -> Option<Record> {
    baselines
        .saved
        .borrow()
        .get(&Feed::Ss)
        .and_then(|b| b.get(&RecordKey::new(entity, None)).cloned())
}

// ============================================================================
// Tests
// ============================================================================

#[test]
fn improved_record_is_published_then_committed() {
    let engine = engine();
    let source = MemSource { ss: vec![row("Chain Chomp's Gate", "https://y/new", "9\"\"52")] };
    let baselines = MemBaselines::default();
    baselines
        .save(&Baseline::from_records(Feed::Ss, [rec("Chain Chomp's Gate", "9.80", "https://y/old")]))
        .unwrap();
    let wiki = MemWiki::default().with_page("Chain Chomp's Gate", "[https://y/old 9.80]");
    let reports = MemReports::default();
    let stop = AtomicBool::new(false);

    let report = Pipeline::new(&engine, &source, &baselines, &stop)
        .with_reports(&reports)
        .run(&ss_only(), || Ok(&wiki));

    assert!(report.error.is_none());
    assert_eq!(report.updated(), 1);
    let edits = wiki.edits.borrow();
    assert_eq!(edits.len(), 1);
    assert!(edits[0].1.contains("'9.80' to '9.52'"), "summary: {}", edits[0].1);
    assert!(wiki.text("Chain Chomp's Gate").contains("|ss_record=[https://y/new 9.52]"));

    let base = committed(&baselines, "Chain Chomp's Gate").unwrap();
    assert_eq!(base.time, Duration::parse("9.52").unwrap());
    assert_eq!(base.link, "https://y/new");
    assert_eq!(reports.written.borrow().len(), 1);
}

#[test]
fn nothing_to_update_never_connects() {
    let engine = engine();
    let source = MemSource { ss: vec![row("Chain Chomp's Gate", "https://y/a", "9\"\"52")] };
    let baselines = MemBaselines::default();
    baselines
        .save(&Baseline::from_records(Feed::Ss, [rec("Chain Chomp's Gate", "9.52", "https://y/a")]))
        .unwrap();
    let stop = AtomicBool::new(false);

    let connected = Cell::new(false);
    let report = Pipeline::new(&engine, &source, &baselines, &stop).run(&ss_only(), || {
        connected.set(true);
        Ok(MemWiki::default())
    });

    assert!(report.nothing_to_update);
    assert!(!connected.get());
    assert_eq!(baselines.saves.get(), 1);
    assert!(report
        .entries
        .iter()
        .all(|e| e.stage == Stage::Reconcile && e.outcome == Outcome::SkippedUnchanged));
}

#[test]
fn dry_run_reports_patch_but_commits_nothing() {
    let engine = engine();
    let source = MemSource { ss: vec![row("Chain Chomp's Gate", "https://y/new", "9\"\"52")] };
    let baselines = MemBaselines::default();
    let wiki = MemWiki::default().with_page("Chain Chomp's Gate", "[https://y/old 9.80]");
    let stop = AtomicBool::new(false);

    let options = RunOptions { feeds: vec![Feed::Ss], dry_run: true };
    let report = Pipeline::new(&engine, &source, &baselines, &stop).run(&options, || Ok(&wiki));

    assert!(report.dry_run);
    assert!(matches!(&report.entries[0].outcome, Outcome::DryRun { summary } if summary.contains("'9.52'")));
    assert!(wiki.edits.borrow().is_empty());
    assert_eq!(baselines.saves.get(), 0);
}

#[test]
fn entity_failure_skips_only_that_entity() {
    let engine = engine();
    let source = MemSource {
        ss: vec![
            row("Alpha", "https://y/a", "10\"\"00"),
            row("Bravo", "https://y/b", "11\"\"00"),
            row("Charlie", "https://y/c", "12\"\"00"),
        ],
    };
    let baselines = MemBaselines::default();
    let wiki = MemWiki::default()
        .with_page("Alpha", "[https://y/old 10.50]")
        .with_page("Bravo", "[https://y/old 11.50]")
        .with_page("Charlie", "[https://y/old 12.50]")
        .refusing("Bravo", SyncError::PublishConflict { entity_id: "Bravo".into() });
    let stop = AtomicBool::new(false);

    let report = Pipeline::new(&engine, &source, &baselines, &stop).run(&ss_only(), || Ok(&wiki));

    assert!(report.error.is_none());
    assert_eq!(report.updated(), 2);
    assert_eq!(report.failed(), 1);
    assert!(committed(&baselines, "Alpha").is_some());
    assert!(committed(&baselines, "Bravo").is_none());
    assert!(committed(&baselines, "Charlie").is_some());
}

#[test]
fn fatal_error_aborts_batch_and_commits_what_was_published() {
    let engine = engine();
    let source = MemSource {
        ss: vec![
            row("Alpha", "https://y/a", "10\"\"00"),
            row("Bravo", "https://y/b", "11\"\"00"),
            row("Charlie", "https://y/c", "12\"\"00"),
        ],
    };
    let baselines = MemBaselines::default();
    let wiki = MemWiki::default()
        .with_page("Alpha", "[https://y/old 10.50]")
        .with_page("Bravo", "[https://y/old 11.50]")
        .with_page("Charlie", "[https://y/old 12.50]")
        .refusing("Bravo", SyncError::Fatal("session expired".into()));
    let stop = AtomicBool::new(false);

    let report = Pipeline::new(&engine, &source, &baselines, &stop).run(&ss_only(), || Ok(&wiki));

    assert!(report.error.as_deref().is_some_and(|e| e.contains("session expired")));
    assert_eq!(wiki.edits.borrow().len(), 1);
    assert!(committed(&baselines, "Alpha").is_some());
    assert!(committed(&baselines, "Bravo").is_none());
    assert!(committed(&baselines, "Charlie").is_none());

    let charlie: Vec<_> = report.entries.iter().filter(|e| e.entity.starts_with("Charlie")).collect();
    assert_eq!(charlie.len(), 1);
    assert_eq!(charlie[0].stage, Stage::Publish);
    assert!(matches!(&charlie[0].outcome, Outcome::Failed { reason } if reason.contains("session expired")));
    assert_eq!(report.failed(), 2);
}

#[test]
fn connect_failure_reports_every_accepted_record() {
    let engine = engine();
    let source = MemSource {
        ss: vec![row("Alpha", "https://y/a", "10\"\"00"), row("Bravo", "https://y/b", "11\"\"00")],
    };
    let baselines = MemBaselines::default();
    let stop = AtomicBool::new(false);

    let report = Pipeline::new(&engine, &source, &baselines, &stop)
        .run(&ss_only(), || Err::<MemWiki, _>(SyncError::Fatal("login failed".into())));

    assert_eq!(report.error.as_deref(), Some("fatal: login failed"));
    for entity in ["Alpha", "Bravo"] {
        let entry = report.entries.iter().find(|e| e.entity == entity).unwrap();
        assert_eq!(entry.stage, Stage::Publish);
        assert_eq!(entry.outcome, Outcome::failed("fatal: login failed"));
    }
    assert_eq!(report.failed(), 2);
    assert_eq!(baselines.saves.get(), 0);
}

#[test]
fn link_only_update_is_published_and_committed() {
    let engine = engine();
    let source = MemSource { ss: vec![row("Alpha", "https://y/L2", "10\"\"00")] };
    let baselines = MemBaselines::default();
    baselines
        .save(&Baseline::from_records(Feed::Ss, [rec("Alpha", "10.00", "https://y/L1")]))
        .unwrap();
    let wiki = MemWiki::default().with_page("Alpha", "[https://y/L1 10.00]");
    let stop = AtomicBool::new(false);

    let report = Pipeline::new(&engine, &source, &baselines, &stop).run(&ss_only(), || Ok(&wiki));

    assert!(report.error.is_none());
    assert_eq!(report.updated(), 1);
    assert_eq!(wiki.edits.borrow().len(), 1);
    assert!(wiki.text("Alpha").contains("|ss_record=[https://y/L2 10.00]"));

    let base = committed(&baselines, "Alpha").unwrap();
    assert_eq!(base.time, Duration::parse("10.00").unwrap());
    assert_eq!(base.link, "https://y/L2");
}

#[test]
fn page_showing_faster_record_is_neither_edited_nor_committed() {
    let engine = engine();
    let source = MemSource { ss: vec![row("Alpha", "https://y/a", "10\"\"00")] };
    let baselines = MemBaselines::default();
    // Someone already put a faster time on the page by hand.
    let wiki = MemWiki::default().with_page("Alpha", "[https://y/manual 9.90]");
    let stop = AtomicBool::new(false);

    let report = Pipeline::new(&engine, &source, &baselines, &stop).run(&ss_only(), || Ok(&wiki));

    assert_eq!(report.entries[0].outcome, Outcome::SkippedSlower);
    assert!(wiki.edits.borrow().is_empty());
    assert!(committed(&baselines, "Alpha").is_none());
    assert_eq!(baselines.saves.get(), 0);
}

#[test]
fn source_failure_aborts_before_connecting() {
    let engine = engine();
    let source = MemSource { ss: vec![row("Alpha", "https://y/a", "10\"\"00")] };
    let baselines = MemBaselines::default();
    let stop = AtomicBool::new(false);

    let connected = Cell::new(false);
    let report = Pipeline::new(&engine, &source, &baselines, &stop).run(&RunOptions::default(), || {
        connected.set(true);
        Ok(MemWiki::default())
    });

    assert!(report.error.as_deref().is_some_and(|e| e.contains("source 'rta' unavailable")));
    assert!(!connected.get());
    assert_eq!(baselines.saves.get(), 0);
}

#[test]
fn stop_flag_interrupts_run() {
    let engine = engine();
    let source = MemSource { ss: vec![row("Alpha", "https://y/a", "10\"\"00")] };
    let baselines = MemBaselines::default();
    let stop = AtomicBool::new(true);

    let report = Pipeline::new(&engine, &source, &baselines, &stop).run(&ss_only(), || Ok(MemWiki::default()));

    assert_eq!(report.error.as_deref(), Some("run interrupted"));
    assert!(report.entries.is_empty());
}
