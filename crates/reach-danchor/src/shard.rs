//! Shard rows and the Hive parquet writer.

use std::fs::{self, File};
use std::path::Path;
use std::sync::Arc;

use arrow::array::{Date32Array, StringArray, UInt16Array, UInt32Array, UInt8Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use chrono::NaiveDate;
use parquet::arrow::ArrowWriter;
use parquet::basic::{Compression, ZstdLevel};
use parquet::file::properties::WriterProperties;

use reach_core::{AnchorId, Mode};

use crate::error::DanchorResult;
use crate::targets::TargetKind;

/// One `(anchor, target)` result row.  `seconds = None` encodes UNREACH.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShardRow {
    pub anchor_id: AnchorId,
    pub seconds: Option<u16>,
}

/// Reachability statistics of one shard, for validation and the exit
/// summary.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShardStats {
    pub rows: usize,
    pub unreachable: usize,
    pub p50_s: Option<u16>,
    pub p95_s: Option<u16>,
}

impl ShardStats {
    pub fn of(rows: &[ShardRow]) -> Self {
        let mut reachable: Vec<u16> = rows.iter().filter_map(|r| r.seconds).collect();
        reachable.sort_unstable();
        let pct = |q: f64| -> Option<u16> {
            (!reachable.is_empty())
                .then(|| reachable[((reachable.len() - 1) as f64 * q).round() as usize])
        };
        Self {
            rows: rows.len(),
            unreachable: rows.len() - reachable.len(),
            p50_s: pct(0.50),
            p95_s: pct(0.95),
        }
    }

    pub fn unreachable_fraction(&self) -> f64 {
        if self.rows == 0 {
            0.0
        } else {
            self.unreachable as f64 / self.rows as f64
        }
    }
}

fn schema_for(kind: &TargetKind) -> Arc<Schema> {
    let target_field = match kind {
        TargetKind::Category { .. } => Field::new("category_id", DataType::UInt32, false),
        TargetKind::Brand { .. } => Field::new("brand_id", DataType::Utf8, false),
    };
    Arc::new(Schema::new(vec![
        Field::new("anchor_id", DataType::UInt32, false),
        target_field,
        Field::new("mode", DataType::UInt8, false),
        Field::new("seconds_u16", DataType::UInt16, true),
        Field::new("snapshot_ts", DataType::Date32, false),
    ]))
}

fn date32(date: NaiveDate) -> i32 {
    (date - NaiveDate::from_ymd_opt(1970, 1, 1).expect("epoch")).num_days() as i32
}

/// Write one shard atomically.  `rows` must already be ascending by anchor
/// id; an empty slice produces an empty but fully-typed file.
pub fn write_shard(
    path: &Path,
    kind: &TargetKind,
    mode: Mode,
    rows: &[ShardRow],
    snapshot: NaiveDate,
) -> DanchorResult<()> {
    debug_assert!(rows.windows(2).all(|w| w[0].anchor_id < w[1].anchor_id));

    let schema = schema_for(kind);
    let n = rows.len();

    let target_column: Arc<dyn arrow::array::Array> = match kind {
        TargetKind::Category { id, .. } => {
            Arc::new(UInt32Array::from_iter_values(std::iter::repeat_n(*id, n)))
        }
        TargetKind::Brand { id } => Arc::new(StringArray::from_iter_values(std::iter::repeat_n(
            id.as_str(),
            n,
        ))),
    };

    let batch = RecordBatch::try_new(
        Arc::clone(&schema),
        vec![
            Arc::new(UInt32Array::from_iter_values(
                rows.iter().map(|r| r.anchor_id.0),
            )),
            target_column,
            Arc::new(UInt8Array::from_iter_values(std::iter::repeat_n(
                mode.code(),
                n,
            ))),
            Arc::new(UInt16Array::from_iter(rows.iter().map(|r| r.seconds))),
            Arc::new(Date32Array::from_iter_values(std::iter::repeat_n(
                date32(snapshot),
                n,
            ))),
        ],
    )?;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("parquet.tmp");
    {
        let file = File::create(&tmp)?;
        let props = WriterProperties::builder()
            .set_compression(Compression::ZSTD(ZstdLevel::default()))
            .set_statistics_enabled(parquet::file::properties::EnabledStatistics::Chunk)
            .build();
        let mut writer = ArrowWriter::try_new(file, schema, Some(props))?;
        writer.write(&batch)?;
        writer.close()?;
    }
    fs::rename(&tmp, path)?;
    Ok(())
}
