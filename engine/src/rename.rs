//! Rename planning.
//!
//! Generates the deterministic example name shown during plan confirmation
//! and the final per-file names used by the copy run. Numbering state is
//! scoped per date bucket, never global: the copy run owns one counter per
//! date key and advances it once per attempted file, across all categories,
//! regardless of the file's eventual outcome.

use std::sync::OnceLock;
use regex::Regex;
use crate::model::{Category, DateBucket, RenameRule};

/// Stem used when a sequential number has to be generated without a prefix.
const GENERATED_STEM: &str = "arquivo";

fn digit_run_regex() -> &'static Regex {
    static DIGIT_RUN: OnceLock<Regex> = OnceLock::new();
    DIGIT_RUN.get_or_init(|| Regex::new(r"\d+").expect("digit-run pattern is valid"))
}

/// First contiguous digit run in a file stem, if any.
fn first_digit_run(stem: &str) -> Option<&str> {
    digit_run_regex().find(stem).map(|m| m.as_str())
}

/// Split a base name into stem and extension (extension keeps its dot).
///
/// A leading dot is part of the stem, so `.DS_Store` has no extension.
fn split_name(file_name: &str) -> (&str, &str) {
    match file_name.rfind('.') {
        Some(idx) if idx > 0 => file_name.split_at(idx),
        _ => (file_name, ""),
    }
}

/// Compute the destination name for one file.
///
/// `counter` is the bucket's current sequential value (starting at 1); the
/// caller advances it after every attempted file. With renaming disabled the
/// original base name is preserved unchanged, extension case included.
pub fn final_name(file_name: &str, rule: &RenameRule, counter: u32) -> String {
    if !rule.enabled {
        return file_name.to_string();
    }

    let (stem, ext) = split_name(file_name);
    let ext = ext.to_lowercase();
    let digits = first_digit_run(stem);
    let keeps_original = rule.keep_original_numbering && digits.is_some();

    let num = match digits {
        Some(run) if rule.keep_original_numbering => format!("{:0>4}", run),
        _ => format!("{:04}", counter),
    };

    match rule.prefix.as_deref().filter(|p| !p.is_empty()) {
        Some(prefix) => format!("{}_{}{}", prefix, num, ext),
        None if keeps_original => format!("{}{}", stem, ext),
        None => format!("{}_{}{}", GENERATED_STEM, num, ext),
    }
}

/// Deterministic example name for a bucket under a candidate rule.
///
/// Uses the bucket's first photo or video (falling back to its first file)
/// with the counter at its initial value, mirroring what the first copied
/// file would be called. None for an empty bucket.
pub fn example_name(bucket: &DateBucket, rule: &RenameRule) -> Option<String> {
    let exemplar = bucket
        .files
        .iter()
        .find(|record| matches!(record.category, Category::Photo | Category::Video))
        .or_else(|| bucket.files.first())?;
    Some(final_name(&exemplar.file_name(), rule, 1))
}
