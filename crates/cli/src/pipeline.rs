//! One sync run.
//!
//! 1. Plan every requested feed: load its baseline, fetch rows, extract,
//!    canonicalize, reconcile. Any feed-level failure stops the run here.
//! 2. If no feed has accepted records, stop ("nothing to update") without
//!    connecting to the document store.
//! 3. Publish accepted records one entity at a time: read the page, locate
//!    the slot, patch, write. Entity-level failures are reported and the
//!    batch continues; run-level failures stop the loop and every accepted
//!    record not yet attempted is reported as failed with the run error.
//! 4. Finalize: commit to each baseline only the records whose page is
//!    confirmed to show them, and save.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use chrono::Utc;

use wrsync_core::{
    Baseline, BaselineStore, DocumentStore, ErrorLevel, Feed, Outcome, Record, RecordKey, ReportEntry, ReportSink,
    RunReport, Stage, SyncError, SyncResult, TabularSource,
};
use wrsync_patch::{patch_replacing, PatchOutcome, SkipReason, SlotDescriptor};
use wrsync_recon::{Accepted, Discard, Engine, FeedPlan};

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub feeds: Vec<Feed>,
    /// Compute patches and report them; publish and commit nothing.
    pub dry_run: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self { feeds: Feed::ALL.to_vec(), dry_run: false }
    }
}

/// A feed's plan together with the baseline it was reconciled against.
#[derive(Debug)]
pub struct Planned {
    pub plan: FeedPlan,
    pub baseline: Baseline,
}

/// Records confirmed live on their page, per feed, awaiting commit.
#[derive(Debug, Default)]
pub struct Commits {
    by_feed: BTreeMap<Feed, Vec<Record>>,
}

impl Commits {
    pub fn add(&mut self, feed: Feed, records: impl IntoIterator<Item = Record>) {
        self.by_feed.entry(feed).or_default().extend(records);
    }

    pub fn get(&self, feed: Feed) -> &[Record] {
        self.by_feed.get(&feed).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.by_feed.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub struct Pipeline<'a> {
    engine: &'a Engine,
    source: &'a dyn TabularSource,
    baselines: &'a dyn BaselineStore,
    reports: Option<&'a dyn ReportSink>,
    stop: &'a AtomicBool,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        engine: &'a Engine,
        source: &'a dyn TabularSource,
        baselines: &'a dyn BaselineStore,
        stop: &'a AtomicBool,
    ) -> Self {
        Self { engine, source, baselines, reports: None, stop }
    }

    pub fn with_reports(mut self, reports: &'a dyn ReportSink) -> Self {
        self.reports = Some(reports);
        self
    }

    /// Run the whole sync. `connect` is only called when there is something
    /// to publish.
    pub fn run<D, C>(&self, options: &RunOptions, connect: C) -> RunReport
    where
        D: DocumentStore,
        C: FnOnce() -> SyncResult<D>,
    {
        let started = Instant::now();
        let mut report = RunReport {
            started_at: Utc::now().to_rfc3339(),
            dry_run: options.dry_run,
            ..RunReport::default()
        };

        let planned = match self.plan(&options.feeds) {
            Ok(planned) => planned,
            Err(e) => {
                log::error!("run aborted before publishing: {e}");
                report.error = Some(e.to_string());
                return self.finish(report, started);
            }
        };
        for p in &planned {
            record_plan(&p.plan, &mut report);
        }

        if planned.iter().all(|p| !p.plan.has_updates()) {
            log::info!("nothing to update");
            report.nothing_to_update = true;
            return self.finish(report, started);
        }

        let mut commits = Commits::default();
        let published = connect().and_then(|docs| self.publish(&planned, &docs, options.dry_run, &mut report, &mut commits));
        if let Err(e) = published {
            log::error!("run aborted: {e}");
            record_unattempted(&planned, &mut report, &e);
            report.error = Some(e.to_string());
        }

        if options.dry_run {
            log::info!("dry run: baseline left untouched");
        } else {
            self.finalize(planned, &commits, &mut report);
        }
        self.finish(report, started)
    }

    /// Fetch, extract and reconcile each feed.
    pub fn plan(&self, feeds: &[Feed]) -> SyncResult<Vec<Planned>> {
        let mut planned = Vec::with_capacity(feeds.len());
        for &feed in feeds {
            self.check_stop()?;
            let baseline = self.baselines.load(feed)?;
            let rows = self.source.fetch_rows(feed)?;
            let plan = self.engine.plan(feed, &rows, &baseline)?;
            planned.push(Planned { plan, baseline });
        }
        Ok(planned)
    }

    /// Publish every accepted record, grouped per entity so that all
    /// variants of one page land in a single edit.
    pub fn publish<D: DocumentStore>(
        &self,
        planned: &[Planned],
        docs: &D,
        dry_run: bool,
        report: &mut RunReport,
        commits: &mut Commits,
    ) -> SyncResult<()> {
        for p in planned {
            let feed = p.plan.feed;
            for (entity_id, group) in group_by_entity(&p.plan.outcome.accepted) {
                self.check_stop()?;
                let records: Vec<Record> = group.iter().map(|a| a.record.clone()).collect();

                let previous: Vec<Option<Record>> = group.iter().map(|a| a.previous.clone()).collect();

                let outcome = match publish_entity(docs, feed, entity_id, &records, &previous, dry_run) {
                    Ok(outcome) => outcome,
                    Err(e) if e.level() == ErrorLevel::Run => {
                        push_all(report, &records, feed, Outcome::failed(&e));
                        return Err(e);
                    }
                    Err(e) => {
                        log::warn!("{feed}: '{entity_id}' failed: {e}");
                        Outcome::failed(&e)
                    }
                };

                // Commit only what the page is confirmed to display.
                let live = matches!(outcome, Outcome::Updated { .. } | Outcome::SkippedUnchanged);
                if live && !dry_run {
                    commits.add(feed, records.iter().cloned());
                }
                push_all(report, &records, feed, outcome);
            }
        }
        Ok(())
    }

    /// Commit confirmed records and save each touched baseline.
    pub fn finalize(&self, planned: Vec<Planned>, commits: &Commits, report: &mut RunReport) {
        for Planned { plan, mut baseline } in planned {
            let records = commits.get(plan.feed);
            if records.is_empty() {
                continue;
            }
            let n = baseline.commit(records);
            match self.baselines.save(&baseline) {
                Ok(()) => log::info!("{}: committed {n} records to baseline", plan.feed),
                Err(e) => {
                    log::error!("{}: baseline not saved: {e}", plan.feed);
                    report.error.get_or_insert_with(|| e.to_string());
                }
            }
        }
    }

    fn check_stop(&self) -> SyncResult<()> {
        if self.stop.load(Ordering::SeqCst) {
            Err(SyncError::Interrupted)
        } else {
            Ok(())
        }
    }

    fn finish(&self, mut report: RunReport, started: Instant) -> RunReport {
        report.duration_ms = started.elapsed().as_millis() as u64;
        log::info!(
            "run finished in {} ms: {} updated, {} failed",
            report.duration_ms,
            report.updated(),
            report.failed()
        );
        if let Some(sink) = self.reports {
            if let Err(e) = sink.write(&report) {
                log::error!("{e}");
            }
        }
        report
    }
}

fn publish_entity<D: DocumentStore>(
    docs: &D,
    feed: Feed,
    entity_id: &str,
    records: &[Record],
    previous: &[Option<Record>],
    dry_run: bool,
) -> SyncResult<Outcome> {
    let page = docs.get_text(entity_id)?;
    let descriptor = SlotDescriptor::detect(&page.text, feed, records)?;
    match patch_replacing(&page.text, &descriptor, records, previous)? {
        PatchOutcome::Patched { text, summary } => {
            if dry_run {
                log::info!("{feed}: would edit '{entity_id}': {summary}");
                return Ok(Outcome::DryRun { summary });
            }
            docs.put_text(entity_id, &text, &page.version, &summary)?;
            Ok(Outcome::Updated { summary })
        }
        PatchOutcome::Skip(SkipReason::AlreadyCurrent) => {
            log::info!("{feed}: '{entity_id}' already shows this record");
            Ok(Outcome::SkippedUnchanged)
        }
        PatchOutcome::Skip(SkipReason::NotImproved) => {
            log::info!("{feed}: '{entity_id}' shows a different equal or faster record; not committed");
            Ok(Outcome::SkippedSlower)
        }
    }
}

/// Accepted records grouped by entity, in order of first appearance.
fn group_by_entity(accepted: &[Accepted]) -> Vec<(&str, Vec<&Accepted>)> {
    let mut groups: Vec<(&str, Vec<&Accepted>)> = Vec::new();
    for a in accepted {
        let id = a.record.entity_id.as_str();
        match groups.iter_mut().find(|(g, _)| *g == id) {
            Some((_, members)) => members.push(a),
            None => groups.push((id, vec![a])),
        }
    }
    groups
}

/// Report entries for everything decided before publishing.
fn record_plan(plan: &FeedPlan, report: &mut RunReport) {
    for issue in &plan.issues {
        report.push(ReportEntry {
            entity: issue.label.clone(),
            feed: plan.feed,
            stage: Stage::Extract,
            outcome: Outcome::failed(&issue.error),
        });
    }
    for key in &plan.outcome.unchanged {
        report.push(ReportEntry::for_key(key, plan.feed, Stage::Reconcile, Outcome::SkippedUnchanged));
    }
    for (key, discard) in &plan.outcome.discarded {
        let outcome = match discard {
            Discard::Slower => Outcome::SkippedSlower,
            Discard::Excluded => Outcome::SkippedUnchanged,
        };
        report.push(ReportEntry::for_key(key, plan.feed, Stage::Reconcile, outcome));
    }
}

/// After a run-level fault: a failed entry for each accepted record that
/// has no publish entry yet.
fn record_unattempted(planned: &[Planned], report: &mut RunReport, error: &SyncError) {
    for p in planned {
        let feed = p.plan.feed;
        for a in &p.plan.outcome.accepted {
            let key = a.record.key();
            let entity = key.to_string();
            let attempted = report
                .entries
                .iter()
                .any(|e| e.stage == Stage::Publish && e.feed == feed && e.entity == entity);
            if !attempted {
                report.push(ReportEntry::for_key(&key, feed, Stage::Publish, Outcome::failed(error)));
            }
        }
    }
}

fn push_all(report: &mut RunReport, records: &[Record], feed: Feed, outcome: Outcome) {
    for record in records {
        let key: RecordKey = record.key();
        report.push(ReportEntry::for_key(&key, feed, Stage::Publish, outcome.clone()));
    }
}
