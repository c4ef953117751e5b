//! Shared price/description normalization used by every vendor parser
//! (spec §4.3 "Required parsing behaviors"). Kept separate from
//! `crate::money` because these helpers are text-shape concerns
//! (whitespace, OCR character confusions in prose) rather than numeric
//! parsing.

/// Collapse whitespace runs, replace OCR's `|` -> `I` confusion, and strip
/// stray underscores left behind by faded dot-matrix receipts.
pub fn clean_description(raw: &str) -> String {
    let replaced: String = raw.chars().map(|c| if c == '|' { 'I' } else { c }).collect();
    let no_underscores = replaced.replace('_', "");

    no_underscores.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Try each vendor-supplied format in order and return the first date that
/// parses. Parsers accept vendor-specific formats (spec §4.3 item 2); when
/// none match, the caller attaches a `date_parse_failed` warning.
pub fn parse_date_any(text: &str, formats: &[&str]) -> Option<chrono::NaiveDate> {
    formats
        .iter()
        .find_map(|fmt| chrono::NaiveDate::parse_from_str(text.trim(), fmt).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapses_whitespace_runs() {
        assert_eq!(clean_description("HOT   ROD    40CT"), "HOT ROD 40CT");
    }

    #[test]
    fn replaces_pipe_with_capital_i() {
        assert_eq!(clean_description("M|LK 2L"), "MILK 2L");
    }

    #[test]
    fn strips_stray_underscores() {
        assert_eq!(clean_description("BREAD_WHITE__"), "BREADWHITE");
    }

    #[test]
    fn parses_first_matching_format() {
        let formats = ["%m/%d/%Y", "%Y-%m-%d"];
        assert_eq!(
            parse_date_any("2024-03-05", &formats),
            chrono::NaiveDate::from_ymd_opt(2024, 3, 5)
        );
        assert_eq!(
            parse_date_any("03/05/2024", &formats),
            chrono::NaiveDate::from_ymd_opt(2024, 3, 5)
        );
        assert_eq!(parse_date_any("not a date", &formats), None);
    }
}
