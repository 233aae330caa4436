//! Trace Replay Task
//!
//! Feeds trace events into a cache the way a read-through client would:
//! a `set` admits the key, a `get` looks it up and admits it on a miss.
//! Other operations are counted and skipped. In [`CapacityMode::Bytes`]
//! each admission is charged the event's key plus value size.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::{PolicyKind, SharedCache};
use crate::error::{CacheError, Result};
use crate::models::{ExperimentReport, ReplaySummary};
use crate::trace::{CapacityMode, TraceEvent, TraceOp};

// == Replay ==
/// Replays `events` against `cache` on the calling thread.
///
/// Entries heavier than the whole cache are counted as rejected and
/// skipped. A zero-capacity cache can admit nothing, so its first
/// rejection fails the replay with [`CacheError::Rejected`].
pub fn replay(
    cache: &SharedCache,
    events: &[TraceEvent],
    mode: CapacityMode,
) -> Result<ReplaySummary> {
    let mut summary = ReplaySummary::default();

    for event in events {
        summary.events += 1;
        match &event.op {
            TraceOp::Set => admit(cache, event, mode, &mut summary)?,
            TraceOp::Get => {
                if !cache.get(&event.key) {
                    admit(cache, event, mode, &mut summary)?;
                }
            }
            TraceOp::Other(op) => {
                debug!(op = %op, key = %event.key, "Skipping unsupported trace operation");
                summary.skipped += 1;
            }
        }
    }

    Ok(summary)
}

fn admit(
    cache: &SharedCache,
    event: &TraceEvent,
    mode: CapacityMode,
    summary: &mut ReplaySummary,
) -> Result<()> {
    let weight = event.weight(mode);
    if cache.set_weighted(event.timestamp, &event.key, weight) {
        return Ok(());
    }
    if cache.max_storage() == 0 {
        return Err(CacheError::Rejected(event.key.clone()));
    }
    debug!(key = %event.key, weight, "Entry exceeds cache capacity");
    summary.rejected += 1;
    Ok(())
}

/// Spawns a replay on tokio's blocking pool.
///
/// Several policies can replay the same shared trace in parallel; each
/// holds its own cache lock only for one operation at a time.
///
/// # Example
/// ```ignore
/// let cache: SharedCache = PolicyKind::Lru.build(1000, 0, None)?.into();
/// let handle = spawn_replay_task(cache.clone(), events.clone(), CapacityMode::Entries);
/// let summary = handle.await??;
/// ```
pub fn spawn_replay_task(
    cache: SharedCache,
    events: Arc<Vec<TraceEvent>>,
    mode: CapacityMode,
) -> JoinHandle<Result<ReplaySummary>> {
    tokio::task::spawn_blocking(move || {
        let policy = cache.kind();
        info!(%policy, %mode, events = events.len(), "Starting trace replay");

        let summary = replay(&cache, &events, mode)?;

        let stats = cache.stats();
        info!(
            %policy,
            hits = stats.hits,
            misses = stats.misses,
            evictions = stats.evictions,
            skipped = summary.skipped,
            rejected = summary.rejected,
            "Trace replay finished"
        );
        Ok(summary)
    })
}

// == Run Experiment ==
/// Builds a fresh cache, replays the trace into it and reports the result.
pub async fn run_experiment(
    policy: PolicyKind,
    max_capacity: usize,
    sample_size: usize,
    seed: Option<u64>,
    mode: CapacityMode,
    events: Arc<Vec<TraceEvent>>,
) -> Result<ExperimentReport> {
    let cache: SharedCache = policy.build(max_capacity, sample_size, seed)?.into();

    let summary = spawn_replay_task(cache.clone(), events, mode)
        .await
        .map_err(|e| CacheError::TaskFailed(e.to_string()))??;

    Ok(ExperimentReport::new(
        policy,
        max_capacity,
        sample_size,
        mode,
        summary,
        cache.stats(),
    ))
}
