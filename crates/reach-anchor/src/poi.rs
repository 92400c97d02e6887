//! Canonical POI table reader.
//!
//! The table is parquet with point coordinates as `lon`/`lat` float64
//! columns.  `brand_id`, `category`, `subcat`, and `trauma_level` are
//! optional per-row and per-file; a POI with neither brand nor category is
//! not anchorable and is skipped downstream.

use std::fs::File;
use std::path::Path;

use arrow::array::{Array, Float64Array, StringArray};
use arrow::record_batch::RecordBatch;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;

use crate::error::{AnchorError, AnchorResult};

/// One row of the canonical POI table.
#[derive(Debug, Clone)]
pub struct PoiRecord {
    pub poi_id: String,
    pub brand_id: Option<String>,
    pub category: Option<String>,
    pub subcat: Option<String>,
    pub trauma_level: Option<String>,
    pub lon: f64,
    pub lat: f64,
}

impl PoiRecord {
    /// Anchorable POIs carry a brand, a category, or both.
    pub fn is_anchorable(&self) -> bool {
        self.brand_id.as_deref().is_some_and(|s| !s.is_empty())
            || self.category.as_deref().is_some_and(|s| !s.is_empty())
    }
}

/// Read the whole POI table.  Rows with null coordinates are dropped.
pub fn read_poi_parquet(path: &Path) -> AnchorResult<Vec<PoiRecord>> {
    let file = File::open(path)?;
    let reader = ParquetRecordBatchReaderBuilder::try_new(file)?.build()?;

    let mut out = Vec::new();
    for batch in reader {
        let batch = batch?;
        read_batch(&batch, &mut out)?;
    }
    Ok(out)
}

fn float_col<'a>(batch: &'a RecordBatch, name: &str) -> AnchorResult<&'a Float64Array> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<Float64Array>())
        .ok_or_else(|| AnchorError::PoiTable(format!("missing float64 column {name:?}")))
}

fn string_col<'a>(batch: &'a RecordBatch, name: &str) -> Option<&'a StringArray> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<StringArray>())
}

fn read_batch(batch: &RecordBatch, out: &mut Vec<PoiRecord>) -> AnchorResult<()> {
    let lon = float_col(batch, "lon")?;
    let lat = float_col(batch, "lat")?;
    let poi_id = string_col(batch, "poi_id")
        .ok_or_else(|| AnchorError::PoiTable("missing column poi_id".into()))?;
    let brand = string_col(batch, "brand_id");
    let category = string_col(batch, "category");
    let subcat = string_col(batch, "subcat");
    let trauma = string_col(batch, "trauma_level");

    let opt = |col: Option<&StringArray>, i: usize| -> Option<String> {
        col.and_then(|c| (!c.is_null(i)).then(|| c.value(i).trim().to_owned()))
            .filter(|s| !s.is_empty())
    };

    for i in 0..batch.num_rows() {
        if lon.is_null(i) || lat.is_null(i) || poi_id.is_null(i) {
            continue;
        }
        out.push(PoiRecord {
            poi_id: poi_id.value(i).to_owned(),
            brand_id: opt(brand, i),
            category: opt(category, i),
            subcat: opt(subcat, i),
            trauma_level: opt(trauma, i),
            lon: lon.value(i),
            lat: lat.value(i),
        });
    }
    Ok(())
}
