//! The per-target driver and its bounded worker pool.
//!
//! Each target is an independent, idempotent task: resolve sources, run the
//! K=1 kernel on the transpose, emit one shard.  Tasks run on a rayon pool
//! bounded by `min(max_workers, pending)`.  A failed task is logged and
//! marked; the caller aggregates failures and exits non-zero at the end so
//! one bad shard never destroys sibling output.

use std::time::Instant;

use chrono::NaiveDate;
use rayon::prelude::*;
use tracing::{error, info};

use reach_anchor::AnchorSite;
use reach_core::{Mode, UNREACH_U16};
use reach_kernel::{k_best_multi_source, SearchParams};

use crate::context::GraphContext;
use crate::error::{DanchorError, DanchorResult};
use crate::shard::{write_shard, ShardRow, ShardStats};
use crate::targets::{matching_sites, TargetSpec};

/// P95 budget over reachable seconds; a shard beyond it almost always means
/// a misconfigured cutoff.
pub const P95_BUDGET_S: u16 = 7_200;

#[derive(Debug, Clone)]
pub struct DriverParams {
    pub cutoff_min: u32,
    pub overflow_min: u32,
    /// Threads inside each kernel invocation.
    pub kernel_threads: usize,
    /// Worker-pool bound across targets.
    pub max_workers: usize,
    /// Recompute shards even when fresh.
    pub force: bool,
    /// Newest input mtime (anchors, extract); shards at least this new are
    /// skipped unless forced.
    pub deps_mtime: Option<i64>,
    pub snapshot: NaiveDate,
}

/// Outcome of one shard task.
#[derive(Debug, Clone)]
pub struct ShardOutcome {
    pub target: String,
    pub stats: ShardStats,
    pub skipped: bool,
    pub failed: Option<String>,
    pub elapsed_s: f64,
}

impl ShardOutcome {
    pub fn ok(&self) -> bool {
        self.failed.is_none()
    }
}

/// Compute every target shard.  Returns one outcome per target, in input
/// order; the run as a whole failed if any outcome did.
pub fn compute_all(
    ctx: &GraphContext,
    sites: &[AnchorSite],
    specs: &[TargetSpec],
    mode: Mode,
    params: &DriverParams,
) -> DanchorResult<Vec<ShardOutcome>> {
    if specs.is_empty() {
        return Err(DanchorError::NoTargets);
    }
    let workers = params.max_workers.clamp(1, specs.len());
    info!(
        targets = specs.len(),
        workers,
        mode = %mode,
        "computing D_anchor shards"
    );

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .build()
        .expect("worker pool");

    let outcomes: Vec<ShardOutcome> = pool.install(|| {
        specs
            .par_iter()
            .map(|spec| one_target(ctx, sites, spec, mode, params))
            .collect()
    });

    for o in outcomes.iter().filter(|o| !o.ok()) {
        error!(target = %o.target, reason = o.failed.as_deref(), "shard failed");
    }
    Ok(outcomes)
}

fn one_target(
    ctx: &GraphContext,
    sites: &[AnchorSite],
    spec: &TargetSpec,
    mode: Mode,
    params: &DriverParams,
) -> ShardOutcome {
    let started = Instant::now();
    let mut outcome = ShardOutcome {
        target: spec.label().to_owned(),
        stats: ShardStats::default(),
        skipped: false,
        failed: None,
        elapsed_s: 0.0,
    };

    if !params.force && is_fresh(spec, params.deps_mtime) {
        outcome.skipped = true;
        info!(target = %outcome.target, "shard up to date, skipping");
        return outcome;
    }

    match run_target(ctx, sites, spec, mode, params) {
        Ok(stats) => outcome.stats = stats,
        Err(e) => outcome.failed = Some(e.to_string()),
    }
    outcome.elapsed_s = started.elapsed().as_secs_f64();
    if outcome.ok() {
        info!(
            target = %outcome.target,
            rows = outcome.stats.rows,
            p95_s = outcome.stats.p95_s,
            elapsed_s = outcome.elapsed_s,
            "shard written"
        );
    }
    outcome
}

fn is_fresh(spec: &TargetSpec, deps_mtime: Option<i64>) -> bool {
    let (Some(deps), Ok(meta)) = (deps_mtime, std::fs::metadata(&spec.out_path)) else {
        return false;
    };
    let out_mtime = meta
        .modified()
        .ok()
        .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
        .map(|d| d.as_secs() as i64);
    out_mtime.is_some_and(|m| m >= deps)
}

fn run_target(
    ctx: &GraphContext,
    sites: &[AnchorSite],
    spec: &TargetSpec,
    mode: Mode,
    params: &DriverParams,
) -> DanchorResult<ShardStats> {
    // Sources: CSR nodes of the sites carrying this target.
    let site_set = matching_sites(sites, &spec.kind);
    let sources: Vec<i32> = {
        let wanted: rustc_hash::FxHashSet<usize> = site_set.into_iter().collect();
        ctx.projection
            .site_index
            .iter()
            .enumerate()
            .filter(|(_, si)| wanted.contains(si))
            .map(|(p, _)| ctx.projection.anchor_nodes[p] as i32)
            .collect()
    };

    // A target with no instances still emits a well-typed empty shard.
    if sources.is_empty() {
        write_shard(&spec.out_path, &spec.kind, mode, &[], params.snapshot)?;
        return Ok(ShardStats::default());
    }

    // Candidate anchors live in the components the sources touch.
    let candidates = ctx.anchors_in_source_components(&sources);

    let search = SearchParams::new(1, params.cutoff_min * 60, params.overflow_min * 60)
        .with_threads(params.kernel_threads);
    let labels = k_best_multi_source(ctx.rev_csr(), &sources, Some(&candidates), &search);

    // Emit anchors on target-reachable components, ascending by anchor id.
    let candidate_set: rustc_hash::FxHashSet<i32> = candidates.into_iter().collect();
    let mut rows: Vec<ShardRow> = ctx
        .projection
        .anchor_nodes
        .iter()
        .zip(&ctx.projection.anchor_ids)
        .filter(|(node, _)| candidate_set.contains(&(**node as i32)))
        .map(|(&node, &anchor_id)| {
            let seconds = labels
                .best_seconds(node as usize)
                .filter(|&s| s != UNREACH_U16);
            ShardRow { anchor_id, seconds }
        })
        .collect();
    rows.sort_unstable_by_key(|r| r.anchor_id);

    let stats = ShardStats::of(&rows);
    if let Some(p95) = stats.p95_s {
        if p95 > P95_BUDGET_S {
            return Err(DanchorError::BudgetExceeded {
                target: spec.label().to_owned(),
                p95,
                budget: P95_BUDGET_S,
            });
        }
    }

    write_shard(&spec.out_path, &spec.kind, mode, &rows, params.snapshot)?;
    Ok(stats)
}
