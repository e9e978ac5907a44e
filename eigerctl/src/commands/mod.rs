pub mod catalog;
pub mod outbox;
pub mod plan;

use chrono::NaiveDate;

pub(crate) fn parse_date(value: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|err| format!("invalid date {value:?} (expected YYYY-MM-DD): {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_date_requires_iso_format() {
        assert_eq!(
            parse_date("2024-03-04").unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 4).unwrap()
        );
        assert!(parse_date("04/03/2024").is_err());
    }
}
