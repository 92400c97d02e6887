//! Compute D_anchor shards: anchor→nearest-target seconds for category or
//! brand targets, one Hive partition per target.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use reach_anchor::{read_sites_parquet, AnchorProjection};
use reach_cli::{init_logging, parse_or_exit, run_stage, StageError};
use reach_core::{config, Mode};
use reach_danchor::{
    assign_category_ids, brand_spec, categories_in_sites, category_specs, compute_all,
    read_allowlist, write_labels_json, DriverParams, GraphContext, TargetSpec,
};
use reach_graph::{file_mtime, load_or_build};

#[derive(Parser)]
#[command(
    name = "compute-d-anchor",
    about = "Compute anchor→nearest-target seconds per category or brand"
)]
struct Args {
    #[arg(long)]
    pbf: PathBuf,

    /// Anchor sites parquet.
    #[arg(long)]
    anchors: PathBuf,

    #[arg(long)]
    mode: Mode,

    /// Category label to compute; repeatable.  Without --category/--brand,
    /// all categories present in the anchor table are computed.
    #[arg(long, conflicts_with = "brand")]
    category: Vec<String>,

    /// Brand id to compute; repeatable.
    #[arg(long)]
    brand: Vec<String>,

    /// Category allowlist file (one label per line, # comments).
    #[arg(long)]
    allowlist: Option<PathBuf>,

    /// Primary cutoff in minutes.
    #[arg(long, default_value_t = 30)]
    cutoff: u32,

    /// Overflow cutoff in minutes.
    #[arg(long = "overflow-cutoff", default_value_t = 90)]
    overflow_cutoff: u32,

    /// Threads inside each kernel run.
    #[arg(long, default_value_t = 1)]
    threads: usize,

    /// Worker-pool bound across targets.
    #[arg(long = "max-workers", default_value_t = 4)]
    max_workers: usize,

    /// Recompute shards even when fresh.
    #[arg(long)]
    force: bool,

    /// Output root; defaults to the per-kind directory (env-overridable).
    #[arg(long = "out-dir")]
    out_dir: Option<PathBuf>,

    #[arg(long = "cache-root", default_value = "data/osm/cache_csr")]
    cache_root: PathBuf,
}

fn main() -> ExitCode {
    init_logging();
    let args = match parse_or_exit::<Args>() {
        Ok(args) => args,
        Err(code) => return code,
    };
    run_stage(|| stage(args))
}

fn stage(args: Args) -> Result<String, StageError> {
    if !args.anchors.is_file() {
        return Err(StageError::input(format!(
            "anchor table not found: {}",
            args.anchors.display()
        )));
    }
    if !args.pbf.is_file() {
        return Err(StageError::input(format!(
            "OSM extract not found: {}",
            args.pbf.display()
        )));
    }

    let sites = read_sites_parquet(&args.anchors)
        .map_err(|e| StageError::input(format!("{}: {e}", args.anchors.display())))?;
    let graph = load_or_build(&args.pbf, args.mode, &[8], &args.cache_root)?;
    let ctx = GraphContext::build(&graph, AnchorProjection::build(&sites, &graph));

    // ── Resolve targets and output layout ─────────────────────────────────
    let specs: Vec<TargetSpec> = if !args.brand.is_empty() {
        let out_root = args
            .out_dir
            .clone()
            .unwrap_or_else(config::danchor_brand_dir);
        args.brand
            .iter()
            .map(|b| brand_spec(b, &out_root, args.mode))
            .collect()
    } else {
        let out_root = args
            .out_dir
            .clone()
            .unwrap_or_else(config::danchor_category_dir);

        let mut labels: Vec<String> = if !args.category.is_empty() {
            args.category.clone()
        } else if let Some(allow) = &args.allowlist {
            read_allowlist(allow)
                .map_err(|e| StageError::input(format!("{}: {e}", allow.display())))?
        } else {
            categories_in_sites(&sites)
        };
        // Keep only labels the anchor table can actually seed.
        let present = categories_in_sites(&sites);
        labels.retain(|l| present.iter().any(|p| p.eq_ignore_ascii_case(l)));
        if labels.is_empty() {
            return Err(StageError::input(
                "no requested category is present in the anchor table",
            ));
        }

        let ids = assign_category_ids(&labels);
        write_labels_json(&out_root, &ids)?;
        category_specs(&ids, &out_root, args.mode)
    };

    let deps_mtime = Some(file_mtime(&args.pbf)?.max(file_mtime(&args.anchors)?));
    let params = DriverParams {
        cutoff_min: args.cutoff,
        overflow_min: args.overflow_cutoff,
        kernel_threads: args.threads.max(1),
        max_workers: args.max_workers.max(1),
        force: args.force,
        deps_mtime,
        snapshot: chrono::Utc::now().date_naive(),
    };

    let outcomes = compute_all(&ctx, &sites, &specs, args.mode, &params)?;

    // ── Aggregate the run for the exit summary ────────────────────────────
    let failed: Vec<&str> = outcomes
        .iter()
        .filter(|o| !o.ok())
        .map(|o| o.target.as_str())
        .collect();
    let rows: usize = outcomes.iter().map(|o| o.stats.rows).sum();
    let unreach: usize = outcomes.iter().map(|o| o.stats.unreachable).sum();
    let skipped = outcomes.iter().filter(|o| o.skipped).count();
    let p95 = outcomes.iter().filter_map(|o| o.stats.p95_s).max();
    let p50 = outcomes.iter().filter_map(|o| o.stats.p50_s).max();

    let summary = format!(
        "mode={} shards={} skipped={skipped} rows={rows} p50_s={} p95_s={} unreachable={:.4}",
        args.mode,
        outcomes.len(),
        p50.map_or("nan".to_owned(), |v| v.to_string()),
        p95.map_or("nan".to_owned(), |v| v.to_string()),
        if rows == 0 {
            0.0
        } else {
            unreach as f64 / rows as f64
        },
    );

    if failed.is_empty() {
        Ok(summary)
    } else {
        Err(StageError::runtime(format!(
            "{summary} failed_shards={}",
            failed.join(",")
        )))
    }
}
