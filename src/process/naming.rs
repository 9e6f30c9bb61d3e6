use std::path::Path;

/// Fallback extension when the upload arrives without a file name.
pub const DEFAULT_EXTENSION: &str = ".csv";

/// `{test}_Date_From|{from}_Date_To|{to}.csv`
///
/// The `|` characters are literal; they are legal in file names on Unix and
/// inside a quoted `Content-Disposition` value, but not on Windows.
pub fn scan_file_name(test_token: &str, from_date: &str, to_date: &str) -> String {
    format!("{test_token}_Date_From|{from_date}_Date_To|{to_date}.csv")
}

/// `{code}_{from}_{to}{ext}` where `ext` already carries its leading dot.
pub fn fixed_file_name(test_code: &str, from_date: &str, to_date: &str, extension: &str) -> String {
    format!("{test_code}_{from_date}_{to_date}{extension}")
}

/// Extension of the uploaded file name, dot included and case preserved.
pub fn original_extension(file_name: Option<&str>) -> String {
    match file_name {
        None => DEFAULT_EXTENSION.to_string(),
        Some(name) => Path::new(name)
            .extension()
            .map(|ext| format!(".{}", ext.to_string_lossy()))
            .unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scan_name_shape() {
        assert_eq!(
            scan_file_name("hiv_vl", "05JAN2023", "31JAN2023"),
            "hiv_vl_Date_From|05JAN2023_Date_To|31JAN2023.csv"
        );
    }

    #[test]
    fn scan_name_is_deterministic() {
        let a = scan_file_name("unknown_test", "unknown_start", "unknown_end");
        let b = scan_file_name("unknown_test", "unknown_start", "unknown_end");
        assert_eq!(a, b);
        assert_eq!(a, "unknown_test_Date_From|unknown_start_Date_To|unknown_end.csv");
    }

    #[test]
    fn fixed_name_shape() {
        assert_eq!(
            fixed_file_name("T123", "05JAN2023", "31JAN2023", ".CSV"),
            "T123_05JAN2023_31JAN2023.CSV"
        );
    }

    #[test]
    fn extension_preserves_case() {
        assert_eq!(original_extension(Some("data.CSV")), ".CSV");
        assert_eq!(original_extension(Some("dir/report.final.csv")), ".csv");
        assert_eq!(original_extension(Some("export.txt")), ".txt");
    }

    #[test]
    fn extension_edge_cases() {
        assert_eq!(original_extension(Some("README")), "");
        assert_eq!(original_extension(Some(".hidden")), "");
        assert_eq!(original_extension(None), ".csv");
    }
}
