//! File classification by extension.
//!
//! Maps a file name to a [`Category`] using static extension tables.
//! Matching is a case-insensitive suffix check, first match wins in the
//! order Photo, Video, Metadata; everything else is Other.

use crate::model::Category;

/// Photo extensions, including camera raw formats.
pub const PHOTO_EXTENSIONS: &[&str] = &[
    ".JPG", ".JPEG", ".ARW", ".RAW", ".CR2", ".CR3", ".NEF", ".DNG", ".RAF", ".ORF", ".HEIC",
    ".TIFF",
];

/// Video extensions, including broadcast and cinema container formats.
pub const VIDEO_EXTENSIONS: &[&str] = &[
    ".MP4", ".MOV", ".AVI", ".MTS", ".M2TS", ".MXF", ".BRAW", ".R3D", ".MPEG", ".WMV", ".FLV",
];

/// Sidecar metadata extensions. Collected only when the caller enables
/// metadata inclusion; classification itself always recognises them.
pub const METADATA_EXTENSIONS: &[&str] = &[".XML", ".XMP"];

/// Classify a file name into its category.
///
/// Total function: never fails, unlisted extensions map to Other.
pub fn classify(file_name: &str) -> Category {
    let upper = file_name.to_uppercase();
    if PHOTO_EXTENSIONS.iter().any(|ext| upper.ends_with(ext)) {
        Category::Photo
    } else if VIDEO_EXTENSIONS.iter().any(|ext| upper.ends_with(ext)) {
        Category::Video
    } else if METADATA_EXTENSIONS.iter().any(|ext| upper.ends_with(ext)) {
        Category::Metadata
    } else {
        Category::Other
    }
}
