//! Shared helpers for the `transmute` command-line client.

use transmute_core::models::{FileMetadata, FileRecord};

/// Truncate a string to `max_len` characters, appending "..." if truncated.
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Human-readable byte size.
pub fn format_size(bytes: u64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;
    let b = bytes as f64;
    if b >= MB {
        format!("{:.2} MB", b / MB)
    } else if b >= KB {
        format!("{:.1} KB", b / KB)
    } else {
        format!("{} B", bytes)
    }
}

/// Table lines for the completed-conversion history, one row per conversion.
pub fn history_rows(records: &[FileRecord]) -> Vec<String> {
    let mut rows = vec![format!(
        "{:<36} {:<30} {:<36} {:<8} {:>12} {:<20}",
        "File ID", "Original Filename", "Conversion ID", "Format", "Size", "Uploaded At"
    )];
    for record in records {
        for conversion in record.completed_conversions() {
            rows.push(format!(
                "{:<36} {:<30} {:<36} {:<8} {:>12} {:<20}",
                truncate_string(&record.id, 36),
                truncate_string(&record.original_filename, 30),
                truncate_string(&conversion.id, 36),
                truncate_string(conversion.extension.trim_start_matches('.'), 8),
                format_size(record.size_bytes),
                record.created_at.format("%Y-%m-%d %H:%M:%S"),
            ));
        }
    }
    rows
}

/// Table lines for the list of every upload.
pub fn file_rows(files: &[FileMetadata]) -> Vec<String> {
    let mut rows = vec![format!(
        "{:<36} {:<30} {:<10} {:>12} {:<20}",
        "ID", "Original Filename", "Type", "Size", "Uploaded At"
    )];
    for file in files {
        let uploaded = file
            .created_at
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| "-".to_string());
        rows.push(format!(
            "{:<36} {:<30} {:<10} {:>12} {:<20}",
            truncate_string(&file.id, 36),
            truncate_string(&file.original_filename, 30),
            truncate_string(&file.media_type, 10),
            format_size(file.size_bytes),
            uploaded,
        ));
    }
    rows
}

/// Initialize tracing for the CLI.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use transmute_core::models::{ConversionRecord, ConversionStatus};

    #[test]
    fn truncate_string_short() {
        assert_eq!(truncate_string("hello", 10), "hello");
        assert_eq!(truncate_string("", 5), "");
    }

    #[test]
    fn truncate_string_long() {
        assert_eq!(truncate_string("hello world", 8), "hello...");
        assert_eq!(truncate_string("abc", 2), "...");
    }

    #[test]
    fn truncate_string_counts_characters() {
        assert_eq!(truncate_string("résumé.docx", 9), "résumé...");
    }

    #[test]
    fn format_size_units() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(2048), "2.0 KB");
        assert_eq!(format_size(3 * 1024 * 1024), "3.00 MB");
    }

    #[test]
    fn history_rows_list_completed_conversions_only() {
        let record = FileRecord {
            id: "f-1".to_string(),
            original_filename: "report.docx".to_string(),
            media_type: "docx".to_string(),
            extension: ".docx".to_string(),
            size_bytes: 2048,
            sha256_checksum: None,
            created_at: Utc.with_ymd_and_hms(2024, 1, 2, 10, 0, 0).unwrap(),
            conversions: vec![
                ConversionRecord::new("c-1", ".pdf"),
                ConversionRecord::new("c-2", ".odt").with_status(ConversionStatus::Pending),
            ],
        };

        let rows = history_rows(&[record]);

        assert_eq!(rows.len(), 2);
        assert!(rows[1].contains("c-1"));
        assert!(rows[1].contains("pdf"));
        assert!(rows[1].contains("2024-01-02 10:00:00"));
        assert!(!rows.iter().any(|r| r.contains("c-2")));
    }

    #[test]
    fn file_rows_without_timestamp() {
        let file = FileMetadata {
            id: "f-9".to_string(),
            original_filename: "clip.mp4".to_string(),
            media_type: "mp4".to_string(),
            extension: ".mp4".to_string(),
            size_bytes: 10,
            sha256_checksum: None,
            created_at: None,
        };

        let rows = file_rows(&[file]);

        assert_eq!(rows.len(), 2);
        assert!(rows[1].contains("clip.mp4"));
        assert!(rows[1].trim_end().ends_with('-'));
    }
}
