use chrono::Utc;

/// Owner segment used when the caller does not identify itself
pub const ANONYMOUS_OWNER: &str = "anonymous";

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Replaces every character outside `[A-Za-z0-9_.-]` with `_`.
///
/// Multi-byte characters become a single `_` each. Path separators are
/// replaced too, so the result is always a single path segment.
pub fn sanitize_filename(filename: &str) -> String {
    filename
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '.' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Picks the storage path for an upload.
///
/// A non-empty caller supplied path wins verbatim. Otherwise the path is
/// `{owner}/{millis}-{sanitized filename}`.
pub fn resolve_storage_path(
    requested: Option<&str>,
    original_name: &str,
    user_id: Option<&str>,
) -> String {
    if let Some(path) = requested.filter(|p| !p.is_empty()) {
        return path.to_string();
    }
    derive_storage_path(original_name, user_id, Utc::now().timestamp_millis())
}

pub fn derive_storage_path(original_name: &str, user_id: Option<&str>, timestamp_ms: i64) -> String {
    let owner = user_id
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .unwrap_or(ANONYMOUS_OWNER);
    format!("{}/{}-{}", owner, timestamp_ms, sanitize_filename(original_name))
}

/// Converts a byte count to megabytes without rounding
pub fn bytes_to_mb(bytes: u64) -> f64 {
    bytes as f64 / BYTES_PER_MB
}

/// Megabytes rounded to two decimals, as reported to callers
pub fn round_mb(mb: f64) -> f64 {
    (mb * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("report.pdf"), "report.pdf");
        assert_eq!(sanitize_filename("my file (1).pdf"), "my_file__1_.pdf");
        assert_eq!(sanitize_filename("a-b_c.PDF"), "a-b_c.PDF");
        assert_eq!(sanitize_filename("../../etc/passwd"), ".._.._etc_passwd");
        assert_eq!(sanitize_filename("şirket raporu.pdf"), "_irket_raporu.pdf");
        assert_eq!(sanitize_filename(""), "");
    }

    #[test]
    fn test_explicit_path_is_used_verbatim() {
        let path = resolve_storage_path(Some("custom/dir/My File.pdf"), "ignored.pdf", Some("u1"));
        assert_eq!(path, "custom/dir/My File.pdf");
    }

    #[test]
    fn test_empty_explicit_path_is_ignored() {
        let path = resolve_storage_path(Some(""), "doc.pdf", None);
        assert!(path.starts_with("anonymous/"));
        assert!(path.ends_with("-doc.pdf"));
    }

    #[test]
    fn test_derive_storage_path() {
        assert_eq!(
            derive_storage_path("Q3 report.pdf", Some("user-42"), 1_700_000_000_000),
            "user-42/1700000000000-Q3_report.pdf"
        );
        assert_eq!(
            derive_storage_path("a.pdf", Some("   "), 5),
            "anonymous/5-a.pdf"
        );
        assert_eq!(derive_storage_path("a.pdf", None, 5), "anonymous/5-a.pdf");
        assert_eq!(
            derive_storage_path("a.pdf", Some(" bob "), 5),
            "bob/5-a.pdf"
        );
    }

    #[test]
    fn test_megabyte_conversion() {
        assert_eq!(bytes_to_mb(1024 * 1024), 1.0);
        assert_eq!(round_mb(bytes_to_mb(2 * 1024 * 1024)), 2.0);
        assert_eq!(round_mb(bytes_to_mb(1_500_000)), 1.43);
        assert_eq!(round_mb(bytes_to_mb(0)), 0.0);
    }
}
