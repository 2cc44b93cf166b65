//! Value Coercion
//! Best-effort conversion of raw cells to numbers and dates.
//! A failed conversion yields `None` instead of an error.

use super::CellValue;
use chrono::{NaiveDate, NaiveDateTime};

const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d.%m.%Y"];
const DATETIME_FORMATS: [&str; 3] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%d %H:%M"];

/// Parse a text value as a finite number.
pub fn parse_number(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Parse a text value as a calendar date. Datetimes are truncated.
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    let trimmed = text.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(trimmed, fmt).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(trimmed, fmt).ok())
                .map(|dt| dt.date())
        })
}

pub fn to_number(cell: &CellValue) -> Option<f64> {
    match cell {
        CellValue::Number(v) if v.is_finite() => Some(*v),
        CellValue::Text(s) => parse_number(s),
        _ => None,
    }
}

pub fn to_date(cell: &CellValue) -> Option<NaiveDate> {
    match cell {
        CellValue::Date(d) => Some(*d),
        CellValue::Text(s) => parse_date(s),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_coerce_or_drop() {
        let cells = [
            CellValue::Text("12".into()),
            CellValue::Text("abc".into()),
            CellValue::Text(" 7.5 ".into()),
            CellValue::Empty,
            CellValue::Number(3.0),
            CellValue::Text("NaN".into()),
        ];
        let coerced: Vec<Option<f64>> = cells.iter().map(to_number).collect();
        assert_eq!(
            coerced,
            vec![Some(12.0), None, Some(7.5), None, Some(3.0), None]
        );
    }

    #[test]
    fn dates_parse_common_layouts() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 9);
        assert_eq!(parse_date("2024-03-09"), expected);
        assert_eq!(parse_date("2024/03/09"), expected);
        assert_eq!(parse_date("03/09/2024"), expected);
        assert_eq!(parse_date("09.03.2024"), expected);
        assert_eq!(parse_date("2024-03-09T10:15:00"), expected);
        assert_eq!(parse_date("not a date"), None);
    }

    #[test]
    fn numbers_are_not_dates() {
        assert_eq!(to_date(&CellValue::Number(45000.0)), None);
        assert_eq!(to_number(&CellValue::Date(NaiveDate::default())), None);
    }
}
