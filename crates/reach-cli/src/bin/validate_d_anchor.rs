//! Validate a D_anchor output tree: every shard's anchor ids belong to the
//! anchor table, reachable times stay within the P95 budget, and the
//! unreachable fraction stays under one percent.

use std::collections::HashSet;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use arrow::array::{Array, UInt16Array, UInt32Array};
use clap::Parser;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;

use reach_anchor::read_sites_parquet;
use reach_cli::{init_logging, parse_or_exit, percentile_u16, run_stage, StageError};
use reach_core::Mode;
use reach_danchor::P95_BUDGET_S;

/// Largest tolerable fraction of UNREACH rows in a well-formed shard.
const MAX_UNREACH_FRACTION: f64 = 0.01;

#[derive(Parser)]
#[command(name = "validate-d-anchor", about = "Validate a D_anchor shard tree")]
struct Args {
    /// Output root holding `mode=<code>/…` partitions.
    #[arg(long)]
    dir: PathBuf,

    /// Anchor sites parquet the shards must agree with.
    #[arg(long)]
    anchors: PathBuf,

    #[arg(long)]
    mode: Mode,
}

fn main() -> ExitCode {
    init_logging();
    let args = match parse_or_exit::<Args>() {
        Ok(args) => args,
        Err(code) => return code,
    };
    run_stage(|| stage(args))
}

fn shard_files(mode_dir: &Path) -> Result<Vec<PathBuf>, StageError> {
    let mut out = Vec::new();
    for partition in fs::read_dir(mode_dir).map_err(|e| {
        StageError::input(format!("{}: {e}", mode_dir.display()))
    })? {
        let partition = partition.map_err(|e| StageError::runtime(e.to_string()))?;
        if !partition.path().is_dir() {
            continue;
        }
        for entry in fs::read_dir(partition.path()).map_err(|e| {
            StageError::runtime(format!("{}: {e}", partition.path().display()))
        })? {
            let path = entry.map_err(|e| StageError::runtime(e.to_string()))?.path();
            if path.extension().is_some_and(|e| e == "parquet") {
                out.push(path);
            }
        }
    }
    out.sort();
    Ok(out)
}

fn stage(args: Args) -> Result<String, StageError> {
    let sites = read_sites_parquet(&args.anchors)
        .map_err(|e| StageError::input(format!("{}: {e}", args.anchors.display())))?;
    let known: HashSet<u32> = sites.iter().map(|s| s.anchor_int_id.0).collect();

    let mode_dir = args.dir.join(format!("mode={}", args.mode.code()));
    let shards = shard_files(&mode_dir)?;
    if shards.is_empty() {
        return Err(StageError::input(format!(
            "no shards under {}",
            mode_dir.display()
        )));
    }

    let mut total_rows = 0usize;
    let mut total_unreach = 0usize;
    for shard in &shards {
        let file = File::open(shard).map_err(|e| {
            StageError::runtime(format!("{}: {e}", shard.display()))
        })?;
        let reader = ParquetRecordBatchReaderBuilder::try_new(file)
            .map_err(|e| StageError::runtime(format!("{}: {e}", shard.display())))?
            .build()
            .map_err(|e| StageError::runtime(e.to_string()))?;

        let mut reachable: Vec<u16> = Vec::new();
        let mut rows = 0usize;
        let mut unreach = 0usize;
        for batch in reader {
            let batch = batch.map_err(|e| StageError::runtime(e.to_string()))?;
            let anchors = batch
                .column_by_name("anchor_id")
                .and_then(|c| c.as_any().downcast_ref::<UInt32Array>())
                .ok_or_else(|| {
                    StageError::runtime(format!("{}: missing anchor_id", shard.display()))
                })?;
            let seconds = batch
                .column_by_name("seconds_u16")
                .and_then(|c| c.as_any().downcast_ref::<UInt16Array>())
                .ok_or_else(|| {
                    StageError::runtime(format!("{}: missing seconds_u16", shard.display()))
                })?;

            for i in 0..batch.num_rows() {
                rows += 1;
                if !known.contains(&anchors.value(i)) {
                    return Err(StageError::runtime(format!(
                        "{}: orphan anchor_id {}",
                        shard.display(),
                        anchors.value(i)
                    )));
                }
                if seconds.is_null(i) {
                    unreach += 1;
                } else {
                    reachable.push(seconds.value(i));
                }
            }
        }

        reachable.sort_unstable();
        if let Some(p95) = percentile_u16(&reachable, 0.95) {
            if p95 > P95_BUDGET_S {
                return Err(StageError::runtime(format!(
                    "{}: p95 {}s over the {}s budget",
                    shard.display(),
                    p95,
                    P95_BUDGET_S
                )));
            }
        }
        if rows > 0 && (unreach as f64 / rows as f64) >= MAX_UNREACH_FRACTION {
            return Err(StageError::runtime(format!(
                "{}: unreachable fraction {:.3} at or over {MAX_UNREACH_FRACTION}",
                shard.display(),
                unreach as f64 / rows as f64
            )));
        }
        total_rows += rows;
        total_unreach += unreach;
    }

    Ok(format!(
        "shards={} rows={total_rows} unreachable={:.4} violations=0",
        shards.len(),
        if total_rows == 0 {
            0.0
        } else {
            total_unreach as f64 / total_rows as f64
        },
    ))
}
