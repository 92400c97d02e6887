//! Validate a wide-form T_hex artifact against its row invariants:
//! ascending slot times, distinct anchors, honest `k` counts, and the
//! cross-resolution parent-vs-child bound when both resolutions are
//! present.

use std::collections::HashMap;
use std::fs::File;
use std::path::PathBuf;
use std::process::ExitCode;

use arrow::array::{Int32Array, UInt16Array, UInt64Array, UInt8Array};
use clap::Parser;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;

use reach_cli::{init_logging, parse_or_exit, run_stage, StageError};
use reach_core::UNREACH_U16;
use reach_graph::h3::parent_cell;
use reach_hex::FLAG_BORROWED;

#[derive(Parser)]
#[command(name = "validate-t-hex", about = "Validate a wide-form T_hex parquet")]
struct Args {
    /// Wide-form T_hex parquet.
    #[arg(long)]
    wide: PathBuf,
}

struct WideRow {
    h3_id: u64,
    res: i32,
    k: u8,
    slots: Vec<(i32, u16, u8)>, // (anchor_id, seconds, flags)
}

fn main() -> ExitCode {
    init_logging();
    let args = match parse_or_exit::<Args>() {
        Ok(args) => args,
        Err(code) => return code,
    };
    run_stage(|| stage(args))
}

fn typed_col<'a, A: 'static>(
    batch: &'a arrow::record_batch::RecordBatch,
    name: &str,
) -> Result<&'a A, StageError> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<A>())
        .ok_or_else(|| StageError::input(format!("missing or mistyped column {name:?}")))
}

fn read_rows(path: &PathBuf) -> Result<Vec<WideRow>, StageError> {
    let file = File::open(path)
        .map_err(|e| StageError::input(format!("{}: {e}", path.display())))?;
    let reader = ParquetRecordBatchReaderBuilder::try_new(file)
        .map_err(|e| StageError::input(format!("{}: {e}", path.display())))?
        .build()
        .map_err(|e| StageError::input(e.to_string()))?;

    let mut rows = Vec::new();
    for batch in reader {
        let batch = batch.map_err(|e| StageError::input(e.to_string()))?;
        let k_cols = batch
            .schema_ref()
            .fields()
            .iter()
            .filter(|f| f.name().starts_with('a') && f.name().ends_with("_id"))
            .count();

        let h3_id: &UInt64Array = typed_col(&batch, "h3_id")?;
        let res: &Int32Array = typed_col(&batch, "res")?;
        let k: &UInt8Array = typed_col(&batch, "k")?;
        let ids: Vec<&Int32Array> = (0..k_cols)
            .map(|i| typed_col(&batch, &format!("a{i}_id")))
            .collect::<Result<_, _>>()?;
        let secs: Vec<&UInt16Array> = (0..k_cols)
            .map(|i| typed_col(&batch, &format!("a{i}_s")))
            .collect::<Result<_, _>>()?;
        let flags: Vec<&UInt8Array> = (0..k_cols)
            .map(|i| typed_col(&batch, &format!("a{i}_flags")))
            .collect::<Result<_, _>>()?;

        for row in 0..batch.num_rows() {
            rows.push(WideRow {
                h3_id: h3_id.value(row),
                res: res.value(row),
                k: k.value(row),
                slots: (0..k_cols)
                    .map(|i| (ids[i].value(row), secs[i].value(row), flags[i].value(row)))
                    .collect(),
            });
        }
    }
    Ok(rows)
}

fn stage(args: Args) -> Result<String, StageError> {
    let rows = read_rows(&args.wide)?;
    if rows.is_empty() {
        return Err(StageError::input("no rows to validate"));
    }

    // ── Per-row invariants ────────────────────────────────────────────────
    for row in &rows {
        let occupied: Vec<&(i32, u16, u8)> =
            row.slots.iter().take_while(|s| s.0 >= 0).collect();

        if occupied.len() != row.k as usize {
            return Err(StageError::runtime(format!(
                "hex {:#x} r{}: k={} but {} occupied slots",
                row.h3_id,
                row.res,
                row.k,
                occupied.len()
            )));
        }
        for s in row.slots.iter().skip(occupied.len()) {
            if s.0 >= 0 {
                return Err(StageError::runtime(format!(
                    "hex {:#x} r{}: occupied slot after a sentinel",
                    row.h3_id, row.res
                )));
            }
        }
        for pair in occupied.windows(2) {
            if pair[1].1 < pair[0].1 {
                return Err(StageError::runtime(format!(
                    "hex {:#x} r{}: slot times not ascending",
                    row.h3_id, row.res
                )));
            }
        }
        let mut seen: Vec<i32> = occupied.iter().map(|s| s.0).collect();
        seen.sort_unstable();
        seen.dedup();
        if seen.len() != occupied.len() {
            return Err(StageError::runtime(format!(
                "hex {:#x} r{}: duplicate anchor in slots",
                row.h3_id, row.res
            )));
        }
        if occupied.iter().any(|s| s.1 == UNREACH_U16) {
            return Err(StageError::runtime(format!(
                "hex {:#x} r{}: occupied slot carries the UNREACH sentinel",
                row.h3_id, row.res
            )));
        }
    }

    // ── Parent vs min-child, when both resolutions are present ────────────
    let have_r7 = rows.iter().any(|r| r.res == 7);
    let have_r8 = rows.iter().any(|r| r.res == 8);
    let mut p5_checked = 0usize;
    if have_r7 && have_r8 {
        // (parent cell, anchor) → min non-borrowed child seconds.
        let mut min_child: HashMap<(u64, i32), u16> = HashMap::new();
        for row in rows.iter().filter(|r| r.res == 8) {
            let parent = parent_cell(row.h3_id, 7)
                .map_err(|e| StageError::runtime(e.to_string()))?;
            for s in row.slots.iter().take_while(|s| s.0 >= 0) {
                if s.2 & FLAG_BORROWED != 0 {
                    continue;
                }
                min_child
                    .entry((parent, s.0))
                    .and_modify(|m| *m = (*m).min(s.1))
                    .or_insert(s.1);
            }
        }
        for row in rows.iter().filter(|r| r.res == 7) {
            for s in row.slots.iter().take_while(|s| s.0 >= 0) {
                if s.2 & FLAG_BORROWED != 0 {
                    continue;
                }
                if let Some(&child) = min_child.get(&(row.h3_id, s.0)) {
                    p5_checked += 1;
                    if s.1 < child {
                        return Err(StageError::runtime(format!(
                            "hex {:#x} anchor {}: r7 time {} beats min r8 child {}",
                            row.h3_id, s.0, s.1, child
                        )));
                    }
                }
            }
        }
    }

    Ok(format!(
        "rows={} parent_child_pairs={p5_checked} violations=0",
        rows.len()
    ))
}
