//! Scheduler: the dispatch loop tying the crawl together
//!
//! This module handles:
//! - Startup: opening the store, resuming or seeding the frontier,
//!   preloading the visit ledger
//! - The control loop: pop, admit, dispatch under a bounded worker pool
//! - Worker tasks: politeness wait, fetch, extract, report back
//! - Draining, cancellation with a bounded grace period, and the
//!   shutdown flush of the frontier

use crate::config::Config;
use crate::crawler::extractor::extract_page;
use crate::crawler::fetcher::{build_http_client, fetch_url, FetchOutcome};
use crate::frontier::{FrontierEntry, FrontierError, PriorityFrontier};
use crate::ledger::VisitLedger;
use crate::politeness::{host_key, PolitenessController};
use crate::storage::{RunStatus, SqliteStore, Store};
use crate::SaunterError;
use reqwest::Client;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, OwnedSemaphorePermit, Semaphore};
use tokio_util::sync::CancellationToken;
use url::Url;

/// Priority assigned to configured seed addresses
pub const SEED_PRIORITY: u32 = 1;

/// Priority assigned to links discovered on fetched pages
pub const DISCOVERED_PRIORITY: u32 = 2;

/// Completed fetches between progress log lines
const PROGRESS_INTERVAL: u64 = 10;

/// Completed fetches between frontier checkpoints
const CHECKPOINT_INTERVAL: u64 = 50;

/// Lifecycle of the dispatch loop
///
/// `Running` pops and dispatches; `Draining` stops popping and only
/// receives outstanding worker reports; `Stopped` flushes and exits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SchedulerState {
    Running,
    Draining,
    Stopped,
}

/// What a worker sends back after one fetch attempt
///
/// Every dispatched address produces exactly one report, success or not.
#[derive(Debug)]
struct WorkerReport {
    address: String,
    status: i32,
    title: Option<String>,
    text: Option<String>,
    links: Vec<String>,
}

/// Scheduler owning the crawl state and the dispatch loop
///
/// The control loop is the sole writer of the frontier and the store;
/// workers only touch the shared ledger and politeness handles and report
/// everything else back over a channel.
pub struct Scheduler {
    config: Config,
    store: SqliteStore,
    frontier: PriorityFrontier,
    ledger: Arc<VisitLedger>,
    politeness: Arc<PolitenessController>,
    client: Client,
    permits: Arc<Semaphore>,
    cancel: CancellationToken,
    run_id: i64,
    state: SchedulerState,
    in_flight: usize,
    dispatched: HashMap<String, u32>,
    pages_completed: u64,
    started_at: Instant,
}

impl Scheduler {
    /// Creates a scheduler, opening the store and preparing the frontier
    ///
    /// Resumes from the persisted frontier when one exists; otherwise seeds
    /// from the configuration and flushes the seeds immediately so even an
    /// early interrupt leaves a resumable store behind.
    ///
    /// # Arguments
    ///
    /// * `config` - The crawler configuration
    /// * `config_hash` - Hash of the configuration, recorded with the run
    /// * `fresh` - Discard all previous crawl state before starting
    /// * `cancel` - Token that stops dispatch when cancelled
    pub fn new(
        config: Config,
        config_hash: &str,
        fresh: bool,
        cancel: CancellationToken,
    ) -> Result<Self, SaunterError> {
        let mut store = SqliteStore::new(Path::new(&config.crawler.database_path))?;

        if fresh {
            tracing::info!("Fresh crawl requested, discarding previous crawl state");
            store.clear_frontier()?;
            store.clear_visits()?;
        }

        // A run row still marked running means the previous process died
        // without finishing its shutdown
        if let Some(previous) = store.get_latest_run()? {
            if previous.status == RunStatus::Running {
                tracing::info!(
                    "Previous run {} never finished, marking it interrupted",
                    previous.id
                );
                store.finish_run(previous.id, RunStatus::Interrupted)?;
            }
            if previous.config_hash != config_hash {
                tracing::warn!(
                    "Configuration changed since run {} (stored hash differs)",
                    previous.id
                );
            }
        }
        let run_id = store.create_run(config_hash)?;

        let mut frontier = PriorityFrontier::new();
        let persisted = store.load_frontier()?;
        let seeded = persisted.is_empty();
        if seeded {
            tracing::info!(
                "Seeding frontier with {} configured seeds",
                config.crawler.seeds.len()
            );
            for seed in &config.crawler.seeds {
                frontier.add(seed, SEED_PRIORITY);
            }
        } else {
            tracing::info!(
                "Resuming with {} addresses from the stored frontier",
                persisted.len()
            );
            for (address, priority) in persisted {
                frontier.add(&address, priority);
            }
        }

        let client = build_http_client(
            &config.user_agent,
            Duration::from_secs(config.crawler.fetch_timeout_secs),
        )?;
        let politeness = Arc::new(PolitenessController::new(Duration::from_millis(
            config.crawler.request_delay_ms,
        )));
        let permits = Arc::new(Semaphore::new(config.crawler.max_workers));

        let mut scheduler = Self {
            config,
            store,
            frontier,
            ledger: Arc::new(VisitLedger::new()),
            politeness,
            client,
            permits,
            cancel,
            run_id,
            state: SchedulerState::Running,
            in_flight: 0,
            dispatched: HashMap::new(),
            pages_completed: 0,
            started_at: Instant::now(),
        };

        if seeded {
            scheduler.flush_frontier()?;
        }

        Ok(scheduler)
    }

    /// Runs the crawl to completion, drain, or cancellation
    ///
    /// One iteration while running: check the page cap, pop the most urgent
    /// address, admit it through the ledger, then dispatch a worker once a
    /// permit frees up. Worker reports are consumed at every wait point so
    /// the loop never deadlocks against its own pool.
    pub async fn run(&mut self) -> Result<(), SaunterError> {
        // Resumption: addresses visited in previous runs are already spent
        let visited = self.store.load_visited_addresses()?;
        if !visited.is_empty() {
            tracing::info!("Preloading {} previously visited addresses", visited.len());
        }
        self.ledger.preload(visited).await;

        // Capacity max_workers: every in-flight worker can park its one
        // report without blocking
        let (report_tx, mut report_rx) =
            mpsc::channel::<WorkerReport>(self.config.crawler.max_workers);
        let cancel = self.cancel.clone();

        self.started_at = Instant::now();
        tracing::info!(
            "Starting crawl run {} ({} workers, limit {} pages)",
            self.run_id,
            self.config.crawler.max_workers,
            self.config.crawler.max_urls
        );

        while self.state != SchedulerState::Stopped {
            match self.state {
                SchedulerState::Running => {
                    if cancel.is_cancelled() {
                        tracing::info!("Cancellation requested, stopping dispatch");
                        self.drain_with_grace(&mut report_rx).await?;
                        self.state = SchedulerState::Stopped;
                        continue;
                    }

                    if self.ledger.count().await >= self.config.crawler.max_urls {
                        tracing::info!(
                            "Page limit of {} reached, draining in-flight fetches",
                            self.config.crawler.max_urls
                        );
                        self.state = SchedulerState::Draining;
                        continue;
                    }

                    if self.frontier.is_empty() {
                        if self.in_flight == 0 {
                            self.state = SchedulerState::Draining;
                            continue;
                        }
                        // Workers may still discover links; wait for one
                        tokio::select! {
                            maybe_report = report_rx.recv() => {
                                if let Some(report) = maybe_report {
                                    self.in_flight -= 1;
                                    self.handle_report(report).await?;
                                }
                            }
                            _ = cancel.cancelled() => {}
                        }
                        continue;
                    }

                    let entry = match self.frontier.pop() {
                        Ok(entry) => entry,
                        Err(FrontierError::Empty) => continue,
                        Err(err @ FrontierError::IndexCorrupt { .. }) => {
                            tracing::error!("Frontier index corrupt, aborting: {}", err);
                            if let Err(flush_err) = self.flush_frontier() {
                                tracing::warn!("Shutdown flush failed: {}", flush_err);
                            }
                            if let Err(run_err) =
                                self.store.finish_run(self.run_id, RunStatus::Failed)
                            {
                                tracing::warn!("Could not mark run failed: {}", run_err);
                            }
                            return Err(err.into());
                        }
                    };

                    // The ledger is the sole dedup gate; everything popped
                    // but not admitted has already been fetched
                    if !self.ledger.try_admit(&entry.address).await {
                        tracing::debug!("Skipping already-visited address {}", entry.address);
                        continue;
                    }

                    // Backpressure: block on a permit, but keep consuming
                    // reports and watching for cancellation meanwhile
                    let mut acquired = None;
                    while acquired.is_none() {
                        tokio::select! {
                            permit = Arc::clone(&self.permits).acquire_owned() => {
                                match permit {
                                    Ok(permit) => acquired = Some(permit),
                                    // The pool is never closed while running
                                    Err(_) => {
                                        cancel.cancel();
                                        break;
                                    }
                                }
                            }
                            maybe_report = report_rx.recv() => {
                                if let Some(report) = maybe_report {
                                    self.in_flight -= 1;
                                    self.handle_report(report).await?;
                                }
                            }
                            _ = cancel.cancelled() => break,
                        }
                    }

                    match acquired {
                        Some(permit) => {
                            self.spawn_worker(entry, permit, report_tx.clone());
                            self.in_flight += 1;
                        }
                        None => {
                            // Cancelled while waiting: hand the address back
                            // so the shutdown flush records it. Its admission
                            // was process-local and dies with us.
                            self.frontier.add(&entry.address, entry.priority);
                        }
                    }
                }

                SchedulerState::Draining => {
                    self.drain(&mut report_rx).await?;
                    self.state = SchedulerState::Stopped;
                }

                SchedulerState::Stopped => {}
            }
        }

        self.flush_frontier()?;
        let status = if self.cancel.is_cancelled() {
            RunStatus::Interrupted
        } else {
            RunStatus::Completed
        };
        self.store.finish_run(self.run_id, status)?;

        tracing::info!(
            "Crawl finished ({}): {} pages fetched in {:.1?}, {} addresses still queued",
            status.to_db_string(),
            self.pages_completed,
            self.started_at.elapsed(),
            self.frontier.size()
        );

        Ok(())
    }

    /// Spawns one worker task for an admitted address
    ///
    /// The permit rides inside the task and releases when it finishes, so
    /// the pool bound holds without the control loop tracking handles. The
    /// entry stays remembered until its report arrives, so a worker
    /// abandoned at shutdown can have its address handed back.
    fn spawn_worker(
        &mut self,
        entry: FrontierEntry,
        permit: OwnedSemaphorePermit,
        report_tx: mpsc::Sender<WorkerReport>,
    ) {
        self.dispatched.insert(entry.address.clone(), entry.priority);

        let client = self.client.clone();
        let politeness = Arc::clone(&self.politeness);

        tokio::spawn(async move {
            let _permit = permit;
            let report = fetch_and_extract(&client, &politeness, &entry.address).await;
            // Send only fails when the control loop has abandoned us
            let _ = report_tx.send(report).await;
        });
    }

    /// Applies one worker report: persist the record, enqueue discoveries
    async fn handle_report(&mut self, report: WorkerReport) -> Result<(), SaunterError> {
        self.dispatched.remove(&report.address);
        self.pages_completed += 1;

        self.store.save_visit_record(
            &report.address,
            report.title.as_deref(),
            report.text.as_deref(),
            &report.links,
            report.status,
        )?;
        tracing::debug!(
            "Recorded visit of {} (status {}, {} links)",
            report.address,
            report.status,
            report.links.len()
        );

        // Discovered links enter at the lower priority; visited ones are
        // dropped early to keep the frontier small. Admission remains the
        // gate either way.
        for link in &report.links {
            if !self.ledger.contains(link).await {
                self.frontier.add(link, DISCOVERED_PRIORITY);
            }
        }

        if self.pages_completed % PROGRESS_INTERVAL == 0 {
            let rate = self.pages_completed as f64 / self.started_at.elapsed().as_secs_f64();
            tracing::info!(
                "Progress: {} pages fetched, {} queued, {} in flight, {:.2} pages/sec",
                self.pages_completed,
                self.frontier.size(),
                self.in_flight,
                rate
            );
        }
        if self.pages_completed % CHECKPOINT_INTERVAL == 0 {
            self.flush_frontier()?;
        }

        Ok(())
    }

    /// Receives reports until no workers remain in flight
    ///
    /// Links discovered while draining still enter the frontier, so the
    /// final flush records them. Cancellation mid-drain switches to the
    /// bounded grace wait.
    async fn drain(
        &mut self,
        report_rx: &mut mpsc::Receiver<WorkerReport>,
    ) -> Result<(), SaunterError> {
        let cancel = self.cancel.clone();

        while self.in_flight > 0 {
            tokio::select! {
                maybe_report = report_rx.recv() => {
                    match maybe_report {
                        Some(report) => {
                            self.in_flight -= 1;
                            self.handle_report(report).await?;
                        }
                        None => break,
                    }
                }
                _ = cancel.cancelled() => {
                    return self.drain_with_grace(report_rx).await;
                }
            }
        }

        Ok(())
    }

    /// Gives in-flight workers a bounded grace period, then abandons them
    ///
    /// Abandoned workers die with the process without ever producing a
    /// visit record, so their addresses go back into the frontier and the
    /// shutdown flush keeps them for the next run. Nothing is lost beyond
    /// the wasted request.
    async fn drain_with_grace(
        &mut self,
        report_rx: &mut mpsc::Receiver<WorkerReport>,
    ) -> Result<(), SaunterError> {
        if self.in_flight == 0 {
            return Ok(());
        }

        let grace = Duration::from_secs(self.config.crawler.shutdown_grace_secs);
        tracing::info!(
            "Waiting up to {:?} for {} in-flight fetches",
            grace,
            self.in_flight
        );

        let deadline = Instant::now() + grace;
        while self.in_flight > 0 {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            match tokio::time::timeout(remaining, report_rx.recv()).await {
                Ok(Some(report)) => {
                    self.in_flight -= 1;
                    self.handle_report(report).await?;
                }
                Ok(None) => break,
                Err(_) => break,
            }
        }

        if self.in_flight > 0 {
            tracing::warn!(
                "Abandoning {} in-flight fetches after the grace period",
                self.in_flight
            );
            // None of these produced a visit record; hand their addresses
            // back so the shutdown flush records them for the next run.
            for (address, priority) in std::mem::take(&mut self.dispatched) {
                self.frontier.add(&address, priority);
            }
        }

        Ok(())
    }

    /// Rewrites the persisted frontier from the live in-memory entries
    ///
    /// Clear-then-upsert in dispatch order, so a resumed run pops in the
    /// same order this one would have.
    fn flush_frontier(&mut self) -> Result<(), SaunterError> {
        self.store.clear_frontier()?;
        for (address, priority) in self.frontier.live_entries() {
            self.store.upsert_frontier_entry(&address, priority)?;
        }
        tracing::debug!("Flushed {} frontier entries", self.frontier.size());
        Ok(())
    }
}

/// One worker's whole job: wait out politeness, fetch, extract, report
///
/// Never fails; every outcome folds into the report, with -1 standing in
/// for fetches that produced no HTTP status at all.
async fn fetch_and_extract(
    client: &Client,
    politeness: &PolitenessController,
    address: &str,
) -> WorkerReport {
    let base = match Url::parse(address) {
        Ok(url) => url,
        Err(e) => {
            // Frontier addresses come from validated seeds or resolved
            // links, so this path should stay cold
            tracing::warn!("Unparseable address {}: {}", address, e);
            return WorkerReport {
                address: address.to_string(),
                status: -1,
                title: None,
                text: None,
                links: Vec::new(),
            };
        }
    };

    if let Some(host) = host_key(&base) {
        politeness.wait_for(&host).await;
    }

    tracing::info!("Crawling: {}", address);
    let outcome = fetch_url(client, address).await;
    let status = outcome.record_status();

    match outcome {
        FetchOutcome::Success { body, .. } => {
            let page = extract_page(&body, &base);
            WorkerReport {
                address: address.to_string(),
                status,
                title: page.title,
                text: page.text,
                links: page.links,
            }
        }
        FetchOutcome::HttpError { status: code } => {
            tracing::warn!("HTTP {} for {}", code, address);
            WorkerReport {
                address: address.to_string(),
                status,
                title: None,
                text: None,
                links: Vec::new(),
            }
        }
        FetchOutcome::Transport { error } => {
            tracing::warn!("Fetch failed for {}: {}", address, error);
            WorkerReport {
                address: address.to_string(),
                status,
                title: None,
                text: None,
                links: Vec::new(),
            }
        }
    }
}

/// Runs a complete crawl with the given configuration
///
/// # Arguments
///
/// * `config` - The crawler configuration
/// * `config_hash` - Hash of the configuration file contents
/// * `fresh` - Discard all previous crawl state before starting
/// * `cancel` - Cancellation token wired to the interrupt handler
///
/// # Returns
///
/// * `Ok(())` - Crawl completed, drained, or was cancelled gracefully
/// * `Err(SaunterError)` - Startup or persistence failure
pub async fn run_crawl(
    config: Config,
    config_hash: &str,
    fresh: bool,
    cancel: CancellationToken,
) -> Result<(), SaunterError> {
    let mut scheduler = Scheduler::new(config, config_hash, fresh, cancel)?;
    scheduler.run().await
}
