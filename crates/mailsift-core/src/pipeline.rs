//! The resumable batch pipeline.
//!
//! Drives a run end to end: `LIST -> FETCH_DETAILS -> CLASSIFY -> GROUP ->
//! MUTATE -> CHECKPOINT`, looping until the query is exhausted, a processed
//! limit is reached, the run is interrupted, or a fatal store error
//! surfaces. Execution is single-task and page-at-a-time; the only await
//! points are the store calls and the throttle/backoff sleeps.
//!
//! Progress is checkpointed into the [`StateStore`] after every page and
//! before the throttle sleep, so an interruption during the sleep loses at
//! most one page. Mutations already submitted are never rolled back -
//! at-least-once delivery is the contract.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::engine::DecisionEngine;
use crate::escalate::{age_hours, escalate};
use crate::model::{Action, ProcessingResult};
use crate::state::StateStore;
use crate::store::{Capabilities, Capability, MessageStore};
use crate::taxonomy::Tier;
use crate::{Error, Result};

/// Default maximum ids requested per listing page.
pub const DEFAULT_PAGE_SIZE: usize = 500;

/// Default detail-fetch sub-batch size.
pub const DEFAULT_FETCH_CHUNK_SIZE: usize = 20;

/// Default maximum actions per mutation call.
pub const DEFAULT_MUTATE_CHUNK_SIZE: usize = 1000;

/// Default pause between pages.
pub const DEFAULT_THROTTLE: Duration = Duration::from_secs(1);

/// System label representing the star/flag state.
pub const STARRED_LABEL: &str = "STARRED";

/// System label whose removal archives a message.
pub const INBOX_LABEL: &str = "INBOX";

/// Bounded exponential backoff for rate-limited store calls.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Delay before the first retry; doubles per attempt.
    pub base_delay: Duration,
    /// Attempts before the operation is declared fatal.
    pub max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_secs(10),
            max_attempts: 5,
        }
    }
}

impl RetryPolicy {
    /// Delay to sleep after the given 1-based attempt.
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let doublings = attempt.saturating_sub(1).min(16);
        self.base_delay.saturating_mul(1 << doublings)
    }
}

/// Whether a stored cursor may be trusted for a query.
///
/// A cursor is only safe when the query's predicate is stable under the
/// run's own mutations. A run that removes messages from its own result set
/// (say, labeling everything that matches "unlabeled") shifts the page
/// sequence underneath any saved cursor, which would skip or duplicate
/// items on resume.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorMode {
    /// The run's mutations do not change query membership: resume from a
    /// stored cursor and persist new ones.
    Stable,
    /// The run's mutations shrink the result set: always list from the
    /// first page and never persist a cursor.
    Mutating,
}

/// A query plus its explicit cursor policy.
#[derive(Debug, Clone)]
pub struct QuerySpec {
    /// Store-specific query string.
    pub query: String,
    /// Cursor resumption policy for this query shape.
    pub cursor_mode: CursorMode,
}

impl QuerySpec {
    /// A query whose result set is unaffected by the run's mutations.
    #[must_use]
    pub fn stable(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            cursor_mode: CursorMode::Stable,
        }
    }

    /// A query whose result set shrinks as the run mutates messages.
    #[must_use]
    pub fn mutating(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            cursor_mode: CursorMode::Mutating,
        }
    }
}

/// Tunables for a pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Maximum ids per listing page.
    pub page_size: usize,
    /// Detail-fetch sub-batch size.
    pub fetch_chunk_size: usize,
    /// Maximum actions per mutation call.
    pub mutate_chunk_size: usize,
    /// Pause between pages.
    pub throttle: Duration,
    /// Stop after this many messages (run stays resumable).
    pub limit: Option<u64>,
    /// Run the escalator against message age during classification.
    pub escalate_by_age: bool,
    /// Decide everything, submit nothing.
    pub dry_run: bool,
    /// Label to strip when a message classifies to a different label.
    pub remove_source_label: Option<String>,
    /// Backoff policy for rate-limited store calls.
    pub retry: RetryPolicy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            fetch_chunk_size: DEFAULT_FETCH_CHUNK_SIZE,
            mutate_chunk_size: DEFAULT_MUTATE_CHUNK_SIZE,
            throttle: DEFAULT_THROTTLE,
            limit: None,
            escalate_by_age: false,
            dry_run: false,
            remove_source_label: None,
            retry: RetryPolicy::default(),
        }
    }
}

/// Mutable bookkeeping for one run.
struct RunState {
    result: ProcessingResult,
    history: BTreeMap<String, u64>,
    total: u64,
    processed_this_run: u64,
    /// Cursor that lists the next unprocessed page; saved on interruption
    /// or error so the in-flight page is reprocessed rather than skipped.
    cursor: Option<String>,
    ensured_categories: HashSet<String>,
}

/// The batch orchestrator.
pub struct Pipeline {
    engine: DecisionEngine,
    config: PipelineConfig,
    interrupt: Arc<AtomicBool>,
}

impl Pipeline {
    /// Create a pipeline over a decision engine.
    #[must_use]
    pub fn new(engine: DecisionEngine, config: PipelineConfig) -> Self {
        Self {
            engine,
            config,
            interrupt: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Shared flag that requests a cooperative stop.
    ///
    /// Setting it (typically from a signal handler) makes the run checkpoint
    /// and exit at the next stage boundary; it is never observed mid-call.
    #[must_use]
    pub fn interrupt_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.interrupt)
    }

    fn interrupted(&self) -> bool {
        self.interrupt.load(Ordering::Relaxed)
    }

    /// Run the pipeline to completion against a store.
    ///
    /// Returns the run summary. Partial progress is always checkpointed,
    /// including on the error path.
    ///
    /// # Errors
    ///
    /// Returns an error when a listing or detail fetch fails fatally, or
    /// when a mutation stays rate-limited past the retry ceiling. The state
    /// file is saved before the error propagates.
    pub async fn run<S>(
        &self,
        store: &mut S,
        query: &QuerySpec,
        state: &mut StateStore,
    ) -> Result<ProcessingResult>
    where
        S: MessageStore + ?Sized,
    {
        let cursor = match query.cursor_mode {
            CursorMode::Stable => state.record().next_cursor.clone(),
            CursorMode::Mutating => {
                if state.is_resumable() {
                    debug!("ignoring stored cursor: query predicate is mutating");
                }
                None
            }
        };

        let mut run = RunState {
            result: ProcessingResult::default(),
            history: state.record().history.clone(),
            total: state.record().total_processed,
            processed_this_run: 0,
            cursor,
            ensured_categories: HashSet::new(),
        };

        info!(query = %query.query, dry_run = self.config.dry_run, "starting run");

        match self.drive(store, query, state, &mut run).await {
            Ok(()) => Ok(run.result),
            Err(e) => {
                self.checkpoint(state, query, &run, store.id());
                Err(e)
            }
        }
    }

    /// The page loop. Checkpoints on every normal exit; the caller
    /// checkpoints on the error path.
    async fn drive<S>(
        &self,
        store: &mut S,
        query: &QuerySpec,
        state: &mut StateStore,
        run: &mut RunState,
    ) -> Result<()>
    where
        S: MessageStore + ?Sized,
    {
        loop {
            if self.interrupted() {
                warn!("interrupt requested; saving state");
                self.checkpoint(state, query, run, store.id());
                return Ok(());
            }

            if let Some(limit) = self.config.limit
                && run.processed_this_run >= limit
            {
                info!(limit, "processed limit reached; run stays resumable");
                self.checkpoint(state, query, run, store.id());
                return Ok(());
            }

            // LIST
            let page_size = self.page_size_for(run.processed_this_run);
            let page = self
                .list_page(store, &query.query, page_size, run.cursor.as_deref())
                .await?;

            if page.ids.is_empty() {
                info!("no more messages matching query");
                run.cursor = None;
                self.checkpoint(state, query, run, store.id());
                return Ok(());
            }

            // FETCH_DETAILS
            let details = self.fetch_details(store, &page.ids, run).await?;

            // CLASSIFY
            let actions = self.classify_page(store.capabilities(), &page.ids, &details, run);

            // GROUP + MUTATE
            self.mutate(store, actions, run).await?;

            // CHECKPOINT, then throttle: an interruption during the sleep
            // loses at most this page's next-cursor advance.
            run.cursor = page.next_cursor;
            self.checkpoint(state, query, run, store.id());

            info!(
                page = page.ids.len(),
                total_this_run = run.processed_this_run,
                "page complete"
            );

            if run.cursor.is_none() {
                return Ok(());
            }
            tokio::time::sleep(self.config.throttle).await;
        }
    }

    fn page_size_for(&self, processed_this_run: u64) -> usize {
        self.config.limit.map_or(self.config.page_size, |limit| {
            let remaining = usize::try_from(limit.saturating_sub(processed_this_run))
                .unwrap_or(self.config.page_size);
            remaining.clamp(1, self.config.page_size)
        })
    }

    async fn list_page<S>(
        &self,
        store: &mut S,
        query: &str,
        limit: usize,
        cursor: Option<&str>,
    ) -> Result<crate::store::ListPage>
    where
        S: MessageStore + ?Sized,
    {
        let mut attempt = 1;
        loop {
            match store.list(query, limit, cursor).await {
                Ok(page) => return Ok(page),
                Err(e) if e.is_retryable() => {
                    if attempt >= self.config.retry.max_attempts {
                        return Err(Error::RetriesExhausted {
                            operation: "list".into(),
                            attempts: attempt,
                        });
                    }
                    let delay = self.config.retry.delay_for(attempt);
                    warn!(attempt, ?delay, "list rate limited; backing off");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Fetch metadata for a page in sub-batches.
    ///
    /// A rate-limited sub-batch is retried whole; any id missing from a
    /// sub-batch result (or a sub-batch failing non-retryably) falls back to
    /// individual fetches. Items that still fail are recorded and skipped -
    /// a bad message never sinks its sub-batch.
    async fn fetch_details<S>(
        &self,
        store: &mut S,
        ids: &[String],
        run: &mut RunState,
    ) -> Result<HashMap<String, crate::model::EmailMessage>>
    where
        S: MessageStore + ?Sized,
    {
        let mut details = HashMap::with_capacity(ids.len());

        for chunk in ids.chunks(self.config.fetch_chunk_size.max(1)) {
            let mut attempt = 1;
            let fetched = loop {
                match store.batch_get_details(chunk).await {
                    Ok(map) => break Some(map),
                    Err(e) if e.is_retryable() => {
                        if attempt >= self.config.retry.max_attempts {
                            return Err(Error::RetriesExhausted {
                                operation: "batch fetch".into(),
                                attempts: attempt,
                            });
                        }
                        let delay = self.config.retry.delay_for(attempt);
                        warn!(attempt, ?delay, "batch fetch rate limited; backing off");
                        tokio::time::sleep(delay).await;
                        attempt += 1;
                    }
                    Err(e) => {
                        warn!("batch fetch failed, retrying items individually: {e}");
                        break None;
                    }
                }
            };

            let fetched = fetched.unwrap_or_default();
            let missing: Vec<&String> = chunk.iter().filter(|id| !fetched.contains_key(*id)).collect();
            details.extend(fetched);

            for id in missing {
                match store.get_details(id).await {
                    Ok(Some(msg)) => {
                        details.insert(id.clone(), msg);
                    }
                    Ok(None) => debug!(%id, "message vanished between list and fetch"),
                    Err(e) => {
                        warn!(%id, "fetch failed: {e}");
                        run.result.record_error(format!("fetch {id}: {e}"));
                        run.result.error_count += 1;
                    }
                }
            }
        }

        Ok(details)
    }

    /// Run the decision engine over a page and build the resulting actions.
    fn classify_page(
        &self,
        capabilities: Capabilities,
        ids: &[String],
        details: &HashMap<String, crate::model::EmailMessage>,
        run: &mut RunState,
    ) -> Vec<Action> {
        let mut actions = Vec::with_capacity(details.len());

        for id in ids {
            let Some(msg) = details.get(id) else {
                continue;
            };

            let cat = self.engine.categorize(&msg.sender, &msg.subject);
            let mut tier = cat.tier;

            if self.config.escalate_by_age {
                let esc = escalate(tier, age_hours(msg.date), cat.time_sensitive);
                if esc.should_escalate {
                    debug!(
                        sender = %msg.sender,
                        from = esc.original_tier.as_number(),
                        to = esc.escalated_tier.as_number(),
                        reason = esc.reason,
                        "escalating"
                    );
                    tier = esc.escalated_tier;
                }
            }

            *run.history.entry(cat.label.clone()).or_insert(0) += 1;
            run.result.add_label_stat(&cat.label);
            run.result.processed_count += 1;
            run.processed_this_run += 1;
            run.total += 1;

            debug!(%id, label = %cat.label, tier = tier.as_number(), vip = cat.is_vip, "classified");

            actions.push(self.build_action(capabilities, id, &cat.label, tier));
        }

        actions
    }

    /// Translate a categorization into label/star/archive mutations,
    /// honoring the store's capabilities.
    ///
    /// Star and archive are expressed through the `STARRED`/`INBOX` system
    /// labels as well as the action flags, so the grouping key (the label
    /// sets) fully determines the mutation.
    fn build_action(
        &self,
        capabilities: Capabilities,
        id: &str,
        label: &str,
        tier: Tier,
    ) -> Action {
        let policy = tier.policy();
        let mut action = Action::new(id);
        action.add_labels.push(label.to_string());

        if policy.star && capabilities.contains(Capability::Star) {
            action.star = true;
            action.add_labels.push(STARRED_LABEL.to_string());
        }
        if !policy.keep_in_inbox && capabilities.contains(Capability::Archive) {
            action.archive = true;
            action.remove_labels.push(INBOX_LABEL.to_string());
        }
        if capabilities.contains(Capability::Folders) {
            action.target_folder = policy.folder.map(ToString::to_string);
        }
        if let Some(source) = &self.config.remove_source_label
            && source != label
        {
            action.remove_labels.push(source.clone());
        }

        action
    }

    /// Group actions by identical mutation and submit chunk by chunk.
    ///
    /// Rate-limited chunks back off and retry up to the ceiling, then the
    /// run aborts. Non-retryable chunk failures are recorded and the run
    /// continues - the whole chunk fails together, per the at-least-once
    /// contract.
    #[allow(clippy::cast_possible_truncation)]
    async fn mutate<S>(&self, store: &mut S, actions: Vec<Action>, run: &mut RunState) -> Result<()>
    where
        S: MessageStore + ?Sized,
    {
        let mut groups: BTreeMap<(Vec<String>, Vec<String>), Vec<Action>> = BTreeMap::new();
        for action in actions {
            groups.entry(action.group_key()).or_default().push(action);
        }

        for ((add_labels, _), bucket) in groups {
            if self.config.dry_run {
                run.result.success_count += bucket.len() as u64;
                continue;
            }

            self.ensure_categories(store, &add_labels, run).await;

            for chunk in bucket.chunks(self.config.mutate_chunk_size.max(1)) {
                let mut attempt = 1;
                loop {
                    match store.apply_batch(chunk).await {
                        Ok(()) => {
                            run.result.success_count += chunk.len() as u64;
                            break;
                        }
                        Err(e) if e.is_retryable() => {
                            if attempt >= self.config.retry.max_attempts {
                                return Err(Error::RetriesExhausted {
                                    operation: "apply".into(),
                                    attempts: attempt,
                                });
                            }
                            let delay = self.config.retry.delay_for(attempt);
                            warn!(attempt, ?delay, "apply rate limited; backing off");
                            tokio::time::sleep(delay).await;
                            attempt += 1;
                        }
                        Err(e) => {
                            warn!("mutation chunk failed: {e}");
                            run.result.error_count += chunk.len() as u64;
                            run.result.record_error(format!(
                                "apply chunk of {}: {e}",
                                chunk.len()
                            ));
                            break;
                        }
                    }
                }
            }
        }

        Ok(())
    }

    /// Create user categories once per run before they are applied.
    async fn ensure_categories<S>(&self, store: &mut S, labels: &[String], run: &mut RunState)
    where
        S: MessageStore + ?Sized,
    {
        for label in labels {
            if label == STARRED_LABEL || run.ensured_categories.contains(label) {
                continue;
            }
            match store.ensure_category(label).await {
                Ok(_) => {
                    run.ensured_categories.insert(label.clone());
                }
                Err(e) => {
                    warn!(%label, "ensure category failed: {e}");
                    run.result.record_error(format!("ensure {label}: {e}"));
                }
            }
        }
    }

    /// Best-effort state save. A failed checkpoint risks reprocessing on the
    /// next run, which at-least-once semantics accept.
    fn checkpoint(&self, state: &mut StateStore, query: &QuerySpec, run: &RunState, store_id: &str) {
        let cursor = match query.cursor_mode {
            CursorMode::Stable => run.cursor.clone(),
            CursorMode::Mutating => None,
        };
        if let Err(e) = state.save(cursor, run.total, run.history.clone(), store_id) {
            warn!("failed to save state: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.page_size, DEFAULT_PAGE_SIZE);
        assert_eq!(config.fetch_chunk_size, DEFAULT_FETCH_CHUNK_SIZE);
        assert_eq!(config.mutate_chunk_size, DEFAULT_MUTATE_CHUNK_SIZE);
        assert!(!config.dry_run);
        assert!(config.limit.is_none());
    }

    #[test]
    fn test_retry_delay_doubles() {
        let policy = RetryPolicy {
            base_delay: Duration::from_secs(10),
            max_attempts: 5,
        };
        assert_eq!(policy.delay_for(1), Duration::from_secs(10));
        assert_eq!(policy.delay_for(2), Duration::from_secs(20));
        assert_eq!(policy.delay_for(3), Duration::from_secs(40));
    }

    #[test]
    fn test_query_spec_constructors() {
        assert_eq!(QuerySpec::stable("q").cursor_mode, CursorMode::Stable);
        assert_eq!(QuerySpec::mutating("q").cursor_mode, CursorMode::Mutating);
    }
}
