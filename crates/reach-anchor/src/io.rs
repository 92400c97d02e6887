//! Anchor site parquet IO.
//!
//! Two files per `(state, mode)`: the sites table itself and a small
//! `(anchor_int_id, site_id)` sidecar so external consumers can resolve the
//! dense ids without touching list columns.  Writes are `.tmp`-then-rename.

use std::fs::{self, File};
use std::path::Path;
use std::sync::Arc;

use arrow::array::{
    Array, Float64Array, Int64Array, ListArray, ListBuilder, StringArray, StringBuilder,
    UInt32Array,
};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use parquet::basic::{Compression, ZstdLevel};
use parquet::file::properties::WriterProperties;

use reach_core::AnchorId;

use crate::error::{AnchorError, AnchorResult};
use crate::site::AnchorSite;

fn zstd_props() -> WriterProperties {
    WriterProperties::builder()
        .set_compression(Compression::ZSTD(ZstdLevel::default()))
        .build()
}

fn string_list_field(name: &str) -> Field {
    Field::new(
        name,
        DataType::List(Arc::new(Field::new("item", DataType::Utf8, true))),
        false,
    )
}

fn sites_schema() -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new("site_id", DataType::Utf8, false),
        Field::new("node_id", DataType::Int64, false),
        Field::new("lon", DataType::Float64, false),
        Field::new("lat", DataType::Float64, false),
        string_list_field("poi_ids"),
        string_list_field("brands"),
        string_list_field("categories"),
        Field::new("anchor_int_id", DataType::UInt32, false),
    ]))
}

fn string_list(values: impl Iterator<Item = Vec<String>>) -> ListArray {
    let mut builder = ListBuilder::new(StringBuilder::new());
    for row in values {
        for v in row {
            builder.values().append_value(v);
        }
        builder.append(true);
    }
    builder.finish()
}

/// Write the sites table atomically.
pub fn write_sites_parquet(path: &Path, sites: &[AnchorSite]) -> AnchorResult<()> {
    let schema = sites_schema();

    let batch = RecordBatch::try_new(
        Arc::clone(&schema),
        vec![
            Arc::new(StringArray::from_iter_values(
                sites.iter().map(|s| s.site_id.as_str()),
            )),
            Arc::new(Int64Array::from_iter_values(
                sites.iter().map(|s| s.node_osm_id),
            )),
            Arc::new(Float64Array::from_iter_values(sites.iter().map(|s| s.lon))),
            Arc::new(Float64Array::from_iter_values(sites.iter().map(|s| s.lat))),
            Arc::new(string_list(sites.iter().map(|s| s.poi_ids.clone()))),
            Arc::new(string_list(sites.iter().map(|s| s.brands.clone()))),
            Arc::new(string_list(sites.iter().map(|s| s.categories.clone()))),
            Arc::new(UInt32Array::from_iter_values(
                sites.iter().map(|s| s.anchor_int_id.0),
            )),
        ],
    )?;

    write_batch_atomic(path, schema, batch)
}

/// Write the `(anchor_int_id, site_id)` sidecar atomically.
pub fn write_id_map_parquet(path: &Path, sites: &[AnchorSite]) -> AnchorResult<()> {
    let schema = Arc::new(Schema::new(vec![
        Field::new("anchor_int_id", DataType::UInt32, false),
        Field::new("site_id", DataType::Utf8, false),
    ]));
    let batch = RecordBatch::try_new(
        Arc::clone(&schema),
        vec![
            Arc::new(UInt32Array::from_iter_values(
                sites.iter().map(|s| s.anchor_int_id.0),
            )),
            Arc::new(StringArray::from_iter_values(
                sites.iter().map(|s| s.site_id.as_str()),
            )),
        ],
    )?;
    write_batch_atomic(path, schema, batch)
}

fn write_batch_atomic(path: &Path, schema: Arc<Schema>, batch: RecordBatch) -> AnchorResult<()> {
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

fn typed_col<'a, A: 'static>(batch: &'a RecordBatch, name: &str) -> AnchorResult<&'a A> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<A>())
        .ok_or_else(|| AnchorError::PoiTable(format!("sites: missing or mistyped column {name:?}")))
}

fn row_strings(list: &ListArray, i: usize) -> Vec<String> {
    let values = list.value(i);
    let Some(strings) = values.as_any().downcast_ref::<StringArray>() else {
        return Vec::new();
    };
    (0..strings.len())
        .filter(|&j| !strings.is_null(j))
        .map(|j| strings.value(j).to_owned())
        .collect()
}

/// Read a sites table written by [`write_sites_parquet`].
pub fn read_sites_parquet(path: &Path) -> AnchorResult<Vec<AnchorSite>> {
    let file = File::open(path)?;
    let reader = ParquetRecordBatchReaderBuilder::try_new(file)?.build()?;

    let mut sites = Vec::new();
    for batch in reader {
        let batch = batch?;
        let site_id: &StringArray = typed_col(&batch, "site_id")?;
        let node_id: &Int64Array = typed_col(&batch, "node_id")?;
        let lon: &Float64Array = typed_col(&batch, "lon")?;
        let lat: &Float64Array = typed_col(&batch, "lat")?;
        let anchor_id: &UInt32Array = typed_col(&batch, "anchor_int_id")?;
        let poi_ids: &ListArray = typed_col(&batch, "poi_ids")?;
        let brands: &ListArray = typed_col(&batch, "brands")?;
        let categories: &ListArray = typed_col(&batch, "categories")?;

        for i in 0..batch.num_rows() {
            sites.push(AnchorSite {
                site_id: site_id.value(i).to_owned(),
                node_osm_id: node_id.value(i),
                lon: lon.value(i),
                lat: lat.value(i),
                poi_ids: row_strings(poi_ids, i),
                brands: row_strings(brands, i),
                categories: row_strings(categories, i),
                anchor_int_id: AnchorId(anchor_id.value(i)),
            });
        }
    }
    Ok(sites)
}
