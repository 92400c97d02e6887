//! T_hex parquet writers.
//!
//! Long form is one `(hex, anchor)` pair per row — the canonical artifact.
//! Wide form pivots the K slots into `a{i}_id` / `a{i}_s` / `a{i}_flags`
//! columns for the tile layer, which binds properties by those names.

use std::fs::{self, File};
use std::path::Path;
use std::sync::Arc;

use arrow::array::{
    ArrayRef, Int32Array, StringArray, UInt16Array, UInt64Array, UInt8Array,
};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use parquet::basic::{Compression, ZstdLevel};
use parquet::file::properties::WriterProperties;

use reach_core::Mode;

use crate::error::HexResult;
use crate::row::HexRow;

fn zstd_props() -> WriterProperties {
    WriterProperties::builder()
        .set_compression(Compression::ZSTD(ZstdLevel::default()))
        .set_statistics_enabled(parquet::file::properties::EnabledStatistics::Chunk)
        .build()
}

fn write_atomic(path: &Path, schema: Arc<Schema>, batch: RecordBatch) -> HexResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("parquet.tmp");
    {
        let file = File::create(&tmp)?;
        let mut writer = ArrowWriter::try_new(file, schema, Some(zstd_props()))?;
        writer.write(&batch)?;
        writer.close()?;
    }
    fs::rename(&tmp, path)?;
    Ok(())
}

/// Write rows (across all resolutions) in long form.
pub fn write_long_parquet(
    path: &Path,
    rows: &[HexRow],
    mode: Mode,
    snapshot_ts: &str,
) -> HexResult<usize> {
    let schema = Arc::new(Schema::new(vec![
        Field::new("h3_id", DataType::UInt64, false),
        Field::new("res", DataType::Int32, false),
        Field::new("anchor_int_id", DataType::Int32, false),
        Field::new("time_s", DataType::UInt16, false),
        Field::new("mode", DataType::Utf8, false),
        Field::new("snapshot_ts", DataType::Utf8, false),
    ]));

    let mut h3_id = Vec::new();
    let mut res = Vec::new();
    let mut anchor = Vec::new();
    let mut time_s = Vec::new();
    for row in rows {
        for slot in row.slots.iter().filter(|s| s.is_occupied()) {
            h3_id.push(row.h3_id);
            res.push(row.res as i32);
            anchor.push(slot.anchor_id);
            time_s.push(slot.seconds);
        }
    }
    let n = h3_id.len();

    let batch = RecordBatch::try_new(
        Arc::clone(&schema),
        vec![
            Arc::new(UInt64Array::from(h3_id)),
            Arc::new(Int32Array::from(res)),
            Arc::new(Int32Array::from(anchor)),
            Arc::new(UInt16Array::from(time_s)),
            Arc::new(StringArray::from_iter_values(
                std::iter::repeat_n(mode.as_str(), n),
            )),
            Arc::new(StringArray::from_iter_values(
                std::iter::repeat_n(snapshot_ts, n),
            )),
        ],
    )?;
    write_atomic(path, schema, batch)?;
    Ok(n)
}

/// Write rows in wide (tile-serving) form.  All rows must share the same K.
pub fn write_wide_parquet(
    path: &Path,
    rows: &[HexRow],
    k: usize,
    mode: Mode,
    snapshot_ts: &str,
) -> HexResult<usize> {
    let mut fields = vec![
        Field::new("h3_id", DataType::UInt64, false),
        Field::new("res", DataType::Int32, false),
        Field::new("k", DataType::UInt8, false),
    ];
    for i in 0..k {
        fields.push(Field::new(format!("a{i}_id"), DataType::Int32, false));
        fields.push(Field::new(format!("a{i}_s"), DataType::UInt16, false));
        fields.push(Field::new(format!("a{i}_flags"), DataType::UInt8, false));
    }
    fields.push(Field::new("prov", DataType::UInt8, false));
    fields.push(Field::new("mode", DataType::Utf8, false));
    fields.push(Field::new("snapshot_ts", DataType::Utf8, false));
    let schema = Arc::new(Schema::new(fields));

    let n = rows.len();
    let mut columns: Vec<ArrayRef> = vec![
        Arc::new(UInt64Array::from_iter_values(rows.iter().map(|r| r.h3_id))),
        Arc::new(Int32Array::from_iter_values(rows.iter().map(|r| r.res as i32))),
        Arc::new(UInt8Array::from_iter_values(rows.iter().map(|r| r.k))),
    ];
    for i in 0..k {
        columns.push(Arc::new(Int32Array::from_iter_values(
            rows.iter().map(|r| r.slots[i].anchor_id),
        )));
        columns.push(Arc::new(UInt16Array::from_iter_values(
            rows.iter().map(|r| r.slots[i].seconds),
        )));
        columns.push(Arc::new(UInt8Array::from_iter_values(
            rows.iter().map(|r| r.slots[i].flags),
        )));
    }
    columns.push(Arc::new(UInt8Array::from_iter_values(
        rows.iter().map(|r| r.prov),
    )));
    columns.push(Arc::new(StringArray::from_iter_values(std::iter::repeat_n(
        mode.as_str(),
        n,
    ))));
    columns.push(Arc::new(StringArray::from_iter_values(std::iter::repeat_n(
        snapshot_ts,
        n,
    ))));

    let batch = RecordBatch::try_new(Arc::clone(&schema), columns)?;
    write_atomic(path, schema, batch)?;
    Ok(n)
}
