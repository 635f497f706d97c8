//! Date grouping.
//!
//! Buckets scanned files by capture date (derived from modification time),
//! computes per-bucket aggregate sizes, and selects preview exemplars for
//! the caller's plan-confirmation step.

use std::collections::BTreeMap;
use std::fs;
use std::time::SystemTime;
use chrono::{DateTime, Local, NaiveDate};
use crate::model::{Category, DateBucket, FileRecord, Preview};

/// Sentinel bucket key for files whose modification time could not be read.
pub const UNKNOWN_DATE_KEY: &str = "UNKNOWN-DATE";

/// Derive the calendar-day key for a modification time, in local time.
pub fn date_key(modified: Option<SystemTime>) -> String {
    match modified {
        Some(time) => DateTime::<Local>::from(time).format("%Y-%m-%d").to_string(),
        None => UNKNOWN_DATE_KEY.to_string(),
    }
}

/// Render a date key in Brazilian display form (`dd/mm/yyyy`).
///
/// The sentinel renders as `Data Desconhecida`; a malformed key is
/// returned unchanged.
pub fn format_date_br(key: &str) -> String {
    if key == UNKNOWN_DATE_KEY {
        return "Data Desconhecida".to_string();
    }
    match NaiveDate::parse_from_str(key, "%Y-%m-%d") {
        Ok(date) => date.format("%d/%m/%Y").to_string(),
        Err(_) => key.to_string(),
    }
}

/// Group files into date buckets, keyed ascending by date key.
///
/// ISO-formatted keys sort chronologically under the map's string order,
/// with the unknown-date sentinel after all real dates. Aggregate sizes
/// re-stat each path and count only files that still exist; files deleted
/// mid-scan stay in the list but drop out of the sum.
pub fn group(files: &[FileRecord]) -> BTreeMap<String, DateBucket> {
    let mut grouped: BTreeMap<String, Vec<FileRecord>> = BTreeMap::new();
    for record in files {
        grouped
            .entry(date_key(record.modified))
            .or_default()
            .push(record.clone());
    }

    grouped
        .into_iter()
        .map(|(key, files)| {
            let total_size = live_size(&files);
            let previews = select_previews(&files);
            (
                key.clone(),
                DateBucket {
                    date_key: key,
                    files,
                    total_size,
                    previews,
                },
            )
        })
        .collect()
}

fn live_size(files: &[FileRecord]) -> u64 {
    files
        .iter()
        .filter_map(|record| fs::metadata(&record.path).ok())
        .map(|metadata| metadata.len())
        .sum()
}

/// Pick the bucket's preview exemplars: the earliest- and latest-modified
/// photo, or a single video placeholder when the day has no photos.
fn select_previews(files: &[FileRecord]) -> Vec<Preview> {
    let mut photos: Vec<&FileRecord> = files
        .iter()
        .filter(|record| record.category == Category::Photo)
        .collect();
    photos.sort_by_key(|record| record.modified);

    if let Some(first) = photos.first() {
        let mut previews = vec![Preview::Photo(first.path.clone())];
        if photos.len() > 1 {
            if let Some(last) = photos.last() {
                previews.push(Preview::Photo(last.path.clone()));
            }
        }
        return previews;
    }

    files
        .iter()
        .find(|record| record.category == Category::Video)
        .map(|record| vec![Preview::Video(record.path.clone())])
        .unwrap_or_default()
}
