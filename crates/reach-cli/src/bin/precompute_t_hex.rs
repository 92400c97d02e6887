//! Precompute per-hex K-best anchor times (T_hex).
//!
//! Runs the K-best multi-source kernel from every anchor node, aggregates
//! node labels to hexes at each requested resolution, and writes the
//! long-form artifact (plus the wide tile form when asked).

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::info;

use reach_anchor::{build_anchor_sites, read_poi_parquet, read_sites_parquet, AnchorProjection};
use reach_cli::{init_logging, parse_or_exit, run_stage, seconds_summary, snapshot_ts, StageError};
use reach_core::{Mode, NODATA_U16, UNREACH_U16};
use reach_graph::{load_or_build, SnapIndex};
use reach_hex::{aggregate, write_long_parquet, write_wide_parquet, HexRow};
use reach_kernel::{k_best_multi_source, Csr, SearchParams};

#[derive(Parser)]
#[command(name = "precompute-t-hex", about = "Precompute hex→anchor K-best seconds")]
struct Args {
    #[arg(long)]
    pbf: PathBuf,

    /// Canonical POI parquet (used when --anchors is absent).
    #[arg(long)]
    pois: Option<PathBuf>,

    /// Prebuilt anchor sites parquet; skips inline anchor building.
    #[arg(long)]
    anchors: Option<PathBuf>,

    #[arg(long)]
    mode: Mode,

    /// H3 resolutions to aggregate at.
    #[arg(long, num_args = 1.., default_values_t = [7u8, 8])]
    res: Vec<u8>,

    /// Primary cutoff in minutes.
    #[arg(long, default_value_t = 30)]
    cutoff: u32,

    /// Overflow cutoff in minutes.
    #[arg(long = "overflow-cutoff", default_value_t = 90)]
    overflow_cutoff: u32,

    /// Anchors retained per hex.
    #[arg(long = "k-best", default_value_t = 20)]
    k_best: usize,

    /// Fill sparse hexes from their ring-1 neighbors.
    #[arg(long = "borrow-neighbors")]
    borrow_neighbors: bool,

    /// Kernel source partitions.
    #[arg(long, default_value_t = 1)]
    threads: usize,

    /// Long-form output parquet.
    #[arg(long = "out-times")]
    out_times: PathBuf,

    /// Optional wide (tile) form output parquet.
    #[arg(long = "out-wide")]
    out_wide: Option<PathBuf>,

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
    if !args.pbf.is_file() {
        return Err(StageError::input(format!(
            "OSM extract not found: {}",
            args.pbf.display()
        )));
    }
    let graph = load_or_build(&args.pbf, args.mode, &args.res, &args.cache_root)?;

    // ── Anchor sites: prebuilt table, or inline from POIs ─────────────────
    let sites = match (&args.anchors, &args.pois) {
        (Some(path), _) => read_sites_parquet(path)
            .map_err(|e| StageError::input(format!("{}: {e}", path.display())))?,
        (None, Some(pois_path)) => {
            let pois = read_poi_parquet(pois_path)
                .map_err(|e| StageError::input(format!("{}: {e}", pois_path.display())))?;
            let snap = SnapIndex::build(&graph.lats, &graph.lons);
            build_anchor_sites(&pois, &graph, &snap, args.mode)?.0
        }
        (None, None) => {
            return Err(StageError::input("one of --anchors or --pois is required"));
        }
    };
    if sites.is_empty() {
        return Err(StageError::input("anchor table is empty"));
    }

    let projection = AnchorProjection::build(&sites, &graph);
    if projection.is_empty() {
        return Err(StageError::runtime("no anchor site maps to a graph node"));
    }

    // Dense node→anchor map for the aggregator.
    let mut node_anchor = vec![-1i32; graph.node_count()];
    for (&node, &aid) in projection.anchor_nodes.iter().zip(&projection.anchor_ids) {
        node_anchor[node as usize] = aid.0 as i32;
    }
    let sources: Vec<i32> = projection.anchor_nodes.iter().map(|&n| n as i32).collect();

    // ── Kernel: node→anchor leg ───────────────────────────────────────────
    // Driving is directed: seeding anchors on the transpose measures
    // node→anchor.  Walking is symmetric, so the forward CSR serves as-is.
    let params = SearchParams::new(args.k_best, args.cutoff * 60, args.overflow_cutoff * 60)
        .with_threads(args.threads.max(1));
    let labels = match args.mode {
        Mode::Drive => {
            let rev = graph.reverse();
            k_best_multi_source(
                Csr::new(&rev.indptr, &rev.indices, &rev.w_sec),
                &sources,
                None,
                &params,
            )
        }
        Mode::Walk => k_best_multi_source(
            Csr::new(&graph.indptr, &graph.indices, &graph.w_sec),
            &sources,
            None,
            &params,
        ),
    };

    // ── Aggregate per resolution ──────────────────────────────────────────
    let mut all_rows: Vec<HexRow> = Vec::new();
    for &res in &args.res {
        let cells = graph
            .h3_column(res)
            .ok_or_else(|| StageError::runtime(format!("graph cache lacks H3 r{res}")))?;
        let rows = aggregate(&labels, &node_anchor, cells, res, args.borrow_neighbors)?;
        info!(res, hexes = rows.len(), "aggregated");
        all_rows.extend(rows);
    }

    let ts = snapshot_ts();
    let written = write_long_parquet(&args.out_times, &all_rows, args.mode, &ts)?;
    if let Some(wide) = &args.out_wide {
        write_wide_parquet(wide, &all_rows, args.k_best, args.mode, &ts)?;
    }

    // ── Exit summary over the best slot per hex ───────────────────────────
    let mut a0: Vec<u16> = all_rows
        .iter()
        .filter_map(|r| r.slots.first())
        .map(|s| s.seconds)
        .filter(|&s| s != UNREACH_U16 && s != NODATA_U16)
        .collect();
    a0.sort_unstable();
    let empty = all_rows.iter().filter(|r| r.k == 0).count();
    Ok(format!(
        "mode={} rows={written} hexes={} {} unreachable_hexes={:.4}",
        args.mode,
        all_rows.len(),
        seconds_summary(&a0),
        if all_rows.is_empty() {
            0.0
        } else {
            empty as f64 / all_rows.len() as f64
        },
    ))
}
