use chrono::{Datelike, NaiveDate};
use tracing::warn;

/// Substituted when a date label was found but its value cell is empty.
pub const UNKNOWN_DATE: &str = "unknown_date";

pub const DEFAULT_DATE_FORMATS: &[&str] = &[
    "%d/%m/%Y", "%d/%m/%y", "%m/%d/%Y", "%m/%d/%y", "%Y-%m-%d", "%d-%m-%Y", "%d-%m-%y",
    "%d %b %Y", "%d %B %Y",
];

pub const DEFAULT_STRICT_DATE_FORMATS: &[&str] = &["%d/%m/%Y", "%Y-%m-%d"];

/// Parses free-form dates against an ordered format list and re-emits them
/// as `DDMONYYYY` (e.g. `05JAN2023`).
#[derive(Debug, Clone)]
pub struct DateNormalizer {
    formats: Vec<String>,
}

impl DateNormalizer {
    pub fn new<I, S>(formats: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            formats: formats.into_iter().map(Into::into).collect(),
        }
    }

    pub fn formats(&self) -> &[String] {
        &self.formats
    }

    /// First format that accepts `raw` (after trimming) wins.
    pub fn parse(&self, raw: &str) -> Option<NaiveDate> {
        let s = raw.trim();
        self.formats.iter().find_map(|fmt| parse_with(s, fmt))
    }

    /// Canonical form, or `None` if no format matches.
    pub fn normalize_strict(&self, raw: &str) -> Option<String> {
        self.parse(raw).map(format_canonical)
    }

    /// Canonical form, falling back to the raw text with `/`, `-` and spaces
    /// turned into `_`. Never fails; blank input gives [`UNKNOWN_DATE`].
    pub fn normalize(&self, raw: &str) -> String {
        let s = raw.trim();
        if s.is_empty() {
            return UNKNOWN_DATE.to_string();
        }
        match self.normalize_strict(s) {
            Some(canonical) => canonical,
            None => {
                warn!(raw = s, "no date format matched; using sanitized text");
                s.replace(['/', '-', ' '], "_")
            }
        }
    }
}

impl Default for DateNormalizer {
    fn default() -> Self {
        Self::new(DEFAULT_DATE_FORMATS.iter().copied())
    }
}

/// `%Y` only accepts four-digit years so that `05/01/23` is left for `%y`.
/// `%y` pivots at 69: `69`..`99` are 19xx, `00`..`68` are 20xx.
fn parse_with(s: &str, fmt: &str) -> Option<NaiveDate> {
    let date = NaiveDate::parse_from_str(s, fmt).ok()?;
    if fmt.contains("%Y") && !(1000..=9999).contains(&date.year()) {
        return None;
    }
    if fmt.contains("%y") && date.year() == 2069 {
        return date.with_year(1969);
    }
    Some(date)
}

pub fn format_canonical(date: NaiveDate) -> String {
    date.format("%d%b%Y").to_string().to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn supported_shapes_normalize_to_same_date() {
        let dn = DateNormalizer::default();
        for raw in [
            "05/01/2023",
            "05/01/23",
            "05-01-2023",
            "05-01-23",
            "2023-01-05",
            "05 Jan 2023",
            "05 January 2023",
            "5/1/2023",
            "  05/01/2023 ",
        ] {
            assert_eq!(dn.normalize(raw), "05JAN2023", "input {raw:?}");
        }
    }

    #[test]
    fn day_first_wins_over_month_first() {
        let dn = DateNormalizer::default();
        assert_eq!(dn.normalize("03/04/2023"), "03APR2023");
    }

    #[test]
    fn month_first_used_when_day_first_is_invalid() {
        let dn = DateNormalizer::default();
        assert_eq!(dn.normalize("01/25/2023"), "25JAN2023");
        assert_eq!(dn.normalize("12/31/99"), "31DEC1999");
    }

    #[test]
    fn two_digit_years_pivot_at_69() {
        let dn = DateNormalizer::default();
        assert_eq!(dn.normalize("05/01/69"), "05JAN1969");
        assert_eq!(dn.normalize("05-01-69"), "05JAN1969");
        assert_eq!(dn.normalize("05/01/68"), "05JAN2068");
        assert_eq!(dn.normalize("05/01/70"), "05JAN1970");
    }

    #[test]
    fn unmatched_text_is_sanitized() {
        let dn = DateNormalizer::default();
        assert_eq!(dn.normalize("Q1 2023/24"), "Q1_2023_24");
        assert_eq!(dn.normalize("32-13-2023"), "32_13_2023");
    }

    #[test]
    fn blank_gives_placeholder() {
        let dn = DateNormalizer::default();
        assert_eq!(dn.normalize("   "), UNKNOWN_DATE);
    }

    #[test]
    fn strict_list_rejects_other_shapes() {
        let dn = DateNormalizer::new(DEFAULT_STRICT_DATE_FORMATS.iter().copied());
        assert_eq!(dn.normalize_strict("05/01/2023").as_deref(), Some("05JAN2023"));
        assert_eq!(dn.normalize_strict("2023-01-05").as_deref(), Some("05JAN2023"));
        assert_eq!(dn.normalize_strict("05 Jan 2023"), None);
        assert_eq!(dn.normalize_strict("05/01/23"), None);
    }

    #[test]
    fn format_order_is_respected() {
        let month_first = DateNormalizer::new(["%m/%d/%Y", "%d/%m/%Y"]);
        assert_eq!(month_first.normalize("03/04/2023"), "04MAR2023");
    }

    #[test]
    fn canonical_format() {
        let d = NaiveDate::from_ymd_opt(2024, 12, 9).unwrap();
        assert_eq!(format_canonical(d), "09DEC2024");
    }
}
