//! Build anchor sites for one `(state, mode)` and persist the sites table
//! plus the id-map sidecar.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use reach_anchor::{build_anchor_sites, read_poi_parquet, write_id_map_parquet, write_sites_parquet};
use reach_cli::{init_logging, parse_or_exit, run_stage, StageError};
use reach_core::Mode;
use reach_graph::{load_or_build, SnapIndex};

#[derive(Parser)]
#[command(name = "build-anchors", about = "Build anchor sites from canonical POIs")]
struct Args {
    /// State slug (naming only; inputs are explicit paths).
    #[arg(long)]
    state: String,

    #[arg(long)]
    mode: Mode,

    /// Canonical POI parquet.
    #[arg(long)]
    pois: PathBuf,

    /// OSM extract.
    #[arg(long)]
    pbf: PathBuf,

    #[arg(long = "out-sites")]
    out_sites: PathBuf,

    #[arg(long = "out-map")]
    out_map: PathBuf,

    /// H3 resolutions to ensure in the graph cache.
    #[arg(long, num_args = 1.., default_values_t = [7u8, 8])]
    res: Vec<u8>,

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
    if !args.pois.is_file() {
        return Err(StageError::input(format!(
            "POI table not found: {}",
            args.pois.display()
        )));
    }
    if !args.pbf.is_file() {
        return Err(StageError::input(format!(
            "OSM extract not found: {}",
            args.pbf.display()
        )));
    }

    let pois = read_poi_parquet(&args.pois)
        .map_err(|e| StageError::input(format!("{}: {e}", args.pois.display())))?;
    let graph = load_or_build(&args.pbf, args.mode, &args.res, &args.cache_root)?;
    let snap = SnapIndex::build(&graph.lats, &graph.lons);

    let (sites, report) = build_anchor_sites(&pois, &graph, &snap, args.mode)?;
    write_sites_parquet(&args.out_sites, &sites)?;
    write_id_map_parquet(&args.out_map, &sites)?;

    Ok(format!(
        "state={} mode={} sites={} pois_snapped={} pois_dropped={} snap_p50_m={:.0} snap_p95_m={:.0}",
        args.state,
        args.mode,
        sites.len(),
        report.pois_snapped,
        report.pois_dropped_radius,
        report.snap_p50_m,
        report.snap_p95_m,
    ))
}
