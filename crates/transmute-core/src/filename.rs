//! Download filename derivation.
//!
//! A converted artifact is saved under the original file's base name with the
//! conversion's target extension: `report.docx` converted to `.pdf` is saved as
//! `report.pdf`.

/// Name used when the original filename is unknown or empty.
pub const FALLBACK_BASENAME: &str = "download";

/// Compose the local filename for a converted artifact.
///
/// Only the final path component of `original_filename` is used. The last
/// extension segment is stripped unless the only dot is the leading one (so
/// `.bashrc` keeps its name). `target_extension` may be given with or without
/// its leading dot; an empty extension appends nothing.
pub fn derive_download_filename(original_filename: Option<&str>, target_extension: &str) -> String {
    let name = original_filename
        .map(|n| n.rsplit(['/', '\\']).next().unwrap_or(n))
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .unwrap_or(FALLBACK_BASENAME);

    let stem = match name.rfind('.') {
        Some(idx) if idx > 0 => &name[..idx],
        _ => name,
    };

    let extension = target_extension.trim().trim_start_matches('.');
    if extension.is_empty() {
        stem.to_string()
    } else {
        format!("{}.{}", stem, extension)
    }
}
