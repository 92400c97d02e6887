//! Target resolution: which shards to compute and where they land.
//!
//! A target is one category label or one brand id.  Matching against a
//! site's category/brand lists lowercases ASCII bytes only — no Unicode
//! folding — so the hot path never allocates beyond the query itself.

use std::collections::BTreeMap;
use std::fs;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use tracing::info;

use reach_anchor::AnchorSite;
use reach_core::Mode;

use crate::error::DanchorResult;

/// What a shard is keyed by.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetKind {
    /// Category label; partitioned by its dense numeric id.
    Category { label: String, id: u32 },
    /// Brand id; partitioned by the id string itself.
    Brand { id: String },
}

/// One shard to compute.
#[derive(Debug, Clone)]
pub struct TargetSpec {
    pub kind: TargetKind,
    /// `<out_root>/mode=<code>/<kind>_id=<value>/part-000.parquet`
    pub out_path: PathBuf,
}

impl TargetSpec {
    pub fn label(&self) -> &str {
        match &self.kind {
            TargetKind::Category { label, .. } => label,
            TargetKind::Brand { id } => id,
        }
    }
}

fn eq_fold(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b)
}

/// Site indices whose category (or brand) list contains the target.
pub fn matching_sites(sites: &[AnchorSite], kind: &TargetKind) -> Vec<usize> {
    sites
        .iter()
        .enumerate()
        .filter(|(_, site)| match kind {
            TargetKind::Category { label, .. } => {
                site.categories.iter().any(|c| eq_fold(c, label))
            }
            TargetKind::Brand { id } => site.brands.iter().any(|b| eq_fold(b, id)),
        })
        .map(|(i, _)| i)
        .collect()
}

/// All distinct category labels present in the anchor table, sorted.
pub fn categories_in_sites(sites: &[AnchorSite]) -> Vec<String> {
    let mut labels: Vec<String> = sites
        .iter()
        .flat_map(|s| s.categories.iter().cloned())
        .collect();
    labels.sort();
    labels.dedup();
    labels
}

/// Read an allowlist file: one label per line, `#` comments, blanks ignored.
pub fn read_allowlist(path: &Path) -> DanchorResult<Vec<String>> {
    let reader = BufReader::new(fs::File::open(path)?);
    let mut out = Vec::new();
    for line in reader.lines() {
        let line = line?;
        let trimmed = line.trim();
        if !trimmed.is_empty() && !trimmed.starts_with('#') {
            out.push(trimmed.to_owned());
        }
    }
    Ok(out)
}

/// Assign dense category ids: 1..N over the sorted distinct labels.
///
/// The assignment is a pure function of the label set, so reruns partition
/// identically (required for byte-identical shard reruns).
pub fn assign_category_ids(labels: &[String]) -> BTreeMap<String, u32> {
    let mut sorted: Vec<&String> = labels.iter().collect();
    sorted.sort();
    sorted.dedup();
    sorted
        .into_iter()
        .enumerate()
        .map(|(i, label)| (label.clone(), i as u32 + 1))
        .collect()
}

/// Build category shard specs under the Hive layout.
pub fn category_specs(
    labels: &BTreeMap<String, u32>,
    out_root: &Path,
    mode: Mode,
) -> Vec<TargetSpec> {
    labels
        .iter()
        .map(|(label, &id)| TargetSpec {
            kind: TargetKind::Category {
                label: label.clone(),
                id,
            },
            out_path: out_root
                .join(format!("mode={}", mode.code()))
                .join(format!("category_id={id}"))
                .join("part-000.parquet"),
        })
        .collect()
}

/// Build a single brand shard spec.
pub fn brand_spec(brand_id: &str, out_root: &Path, mode: Mode) -> TargetSpec {
    TargetSpec {
        kind: TargetKind::Brand {
            id: brand_id.to_owned(),
        },
        out_path: out_root
            .join(format!("mode={}", mode.code()))
            .join(format!("brand_id={brand_id}"))
            .join("part-000.parquet"),
    }
}

/// Write the `category_labels.json` sidecar mapping id → display label.
pub fn write_labels_json(out_root: &Path, labels: &BTreeMap<String, u32>) -> DanchorResult<()> {
    let pretty: BTreeMap<String, String> = labels
        .iter()
        .map(|(label, id)| (id.to_string(), prettify(label)))
        .collect();
    fs::create_dir_all(out_root)?;
    let path = out_root.join("category_labels.json");
    let tmp = out_root.join("category_labels.json.tmp");
    fs::write(&tmp, serde_json::to_vec_pretty(&pretty).expect("label map serializes"))?;
    fs::rename(&tmp, &path)?;
    info!(labels = labels.len(), path = %path.display(), "wrote category label map");
    Ok(())
}

/// `trauma_level_1_adult` → `Trauma Level 1 Adult`.
fn prettify(label: &str) -> String {
    label
        .split('_')
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
