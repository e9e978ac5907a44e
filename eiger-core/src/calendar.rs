//! Date arithmetic behind training plans.
//!
//! Week numbers are plan sequence numbers seeded from the ISO week of the
//! plan's start date. They are never wrapped at year end, so week 54 of a
//! plan anchored in 2024 resolves to a date in 2025.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Weekday {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl Weekday {
    pub const ALL: [Weekday; 7] = [
        Weekday::Monday,
        Weekday::Tuesday,
        Weekday::Wednesday,
        Weekday::Thursday,
        Weekday::Friday,
        Weekday::Saturday,
        Weekday::Sunday,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Weekday::Monday => "monday",
            Weekday::Tuesday => "tuesday",
            Weekday::Wednesday => "wednesday",
            Weekday::Thursday => "thursday",
            Weekday::Friday => "friday",
            Weekday::Saturday => "saturday",
            Weekday::Sunday => "sunday",
        }
    }

    /// Monday is 0, Sunday is 6.
    pub fn days_from_monday(&self) -> u32 {
        match self {
            Weekday::Monday => 0,
            Weekday::Tuesday => 1,
            Weekday::Wednesday => 2,
            Weekday::Thursday => 3,
            Weekday::Friday => 4,
            Weekday::Saturday => 5,
            Weekday::Sunday => 6,
        }
    }

    pub fn of(date: NaiveDate) -> Self {
        date.weekday().into()
    }
}

impl From<chrono::Weekday> for Weekday {
    fn from(value: chrono::Weekday) -> Self {
        match value {
            chrono::Weekday::Mon => Weekday::Monday,
            chrono::Weekday::Tue => Weekday::Tuesday,
            chrono::Weekday::Wed => Weekday::Wednesday,
            chrono::Weekday::Thu => Weekday::Thursday,
            chrono::Weekday::Fri => Weekday::Friday,
            chrono::Weekday::Sat => Weekday::Saturday,
            chrono::Weekday::Sun => Weekday::Sunday,
        }
    }
}

impl From<Weekday> for chrono::Weekday {
    fn from(value: Weekday) -> Self {
        match value {
            Weekday::Monday => chrono::Weekday::Mon,
            Weekday::Tuesday => chrono::Weekday::Tue,
            Weekday::Wednesday => chrono::Weekday::Wed,
            Weekday::Thursday => chrono::Weekday::Thu,
            Weekday::Friday => chrono::Weekday::Fri,
            Weekday::Saturday => chrono::Weekday::Sat,
            Weekday::Sunday => chrono::Weekday::Sun,
        }
    }
}

impl fmt::Display for Weekday {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Weekday {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "monday" | "mon" => Ok(Weekday::Monday),
            "tuesday" | "tue" => Ok(Weekday::Tuesday),
            "wednesday" | "wed" => Ok(Weekday::Wednesday),
            "thursday" | "thu" => Ok(Weekday::Thursday),
            "friday" | "fri" => Ok(Weekday::Friday),
            "saturday" | "sat" => Ok(Weekday::Saturday),
            "sunday" | "sun" => Ok(Weekday::Sunday),
            other => Err(format!("unknown weekday: {other}")),
        }
    }
}

/// Concrete date of `weekday` in plan week `week_number`.
///
/// The first occurrence of `weekday` on or after January 1 of
/// `reference_year` anchors week 1; later weeks add whole weeks. Dates past
/// the representable range saturate.
pub fn resolve_date(week_number: u32, weekday: Weekday, reference_year: i32) -> NaiveDate {
    let Some(first_of_year) = NaiveDate::from_ymd_opt(reference_year, 1, 1) else {
        return if reference_year < 0 {
            NaiveDate::MIN
        } else {
            NaiveDate::MAX
        };
    };
    let first_weekday = Weekday::of(first_of_year).days_from_monday();
    let forward = (weekday.days_from_monday() + 7 - first_weekday) % 7;
    let days = i64::from(forward) + (i64::from(week_number) - 1) * 7;
    first_of_year
        .checked_add_signed(Duration::days(days))
        .unwrap_or(NaiveDate::MAX)
}

pub fn iso_week_number(date: NaiveDate) -> u32 {
    date.iso_week().week()
}

/// ISO week-numbering year; differs from the calendar year around January 1.
pub fn iso_year(date: NaiveDate) -> i32 {
    date.iso_week().year()
}

/// Monday..Sunday of the calendar week holding `date`.
pub fn week_window(date: NaiveDate) -> [NaiveDate; 7] {
    let monday = date - Duration::days(i64::from(Weekday::of(date).days_from_monday()));
    let mut window = [monday; 7];
    for (offset, slot) in window.iter_mut().enumerate() {
        *slot = monday + Duration::days(offset as i64);
    }
    window
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn resolves_first_weeks_of_2024() {
        assert_eq!(resolve_date(1, Weekday::Monday, 2024), date(2024, 1, 1));
        assert_eq!(resolve_date(1, Weekday::Wednesday, 2024), date(2024, 1, 3));
        assert_eq!(resolve_date(2, Weekday::Monday, 2024), date(2024, 1, 8));
        assert_eq!(resolve_date(1, Weekday::Sunday, 2024), date(2024, 1, 7));
    }

    #[test]
    fn anchor_wraps_forward_from_new_year() {
        // 2025-01-01 is a Wednesday.
        assert_eq!(resolve_date(1, Weekday::Wednesday, 2025), date(2025, 1, 1));
        assert_eq!(resolve_date(1, Weekday::Tuesday, 2025), date(2025, 1, 7));
        assert_eq!(resolve_date(1, Weekday::Monday, 2025), date(2025, 1, 6));
    }

    #[test]
    fn resolved_weekday_matches_for_every_year() {
        for year in 2019..=2031 {
            for week in 1..=60 {
                for weekday in Weekday::ALL {
                    let resolved = resolve_date(week, weekday, year);
                    assert_eq!(Weekday::of(resolved), weekday);
                    assert_eq!(resolved, resolve_date(week, weekday, year));
                    let next = resolve_date(week + 1, weekday, year);
                    assert_eq!((next - resolved).num_days(), 7);
                }
            }
        }
    }

    #[test]
    fn week_numbers_continue_past_year_end() {
        let last = resolve_date(52, Weekday::Friday, 2024);
        let beyond = resolve_date(54, Weekday::Friday, 2024);
        assert_eq!((beyond - last).num_days(), 14);
        assert_eq!(beyond.year(), 2025);
    }

    #[test]
    fn iso_helpers_follow_iso_calendar() {
        assert_eq!(iso_week_number(date(2024, 1, 1)), 1);
        assert_eq!(iso_week_number(date(2024, 12, 30)), 1);
        assert_eq!(iso_year(date(2024, 12, 30)), 2025);
        assert_eq!(iso_year(date(2021, 1, 1)), 2020);
    }

    #[test]
    fn week_window_starts_on_monday() {
        let window = week_window(date(2024, 1, 10));
        assert_eq!(window[0], date(2024, 1, 8));
        assert_eq!(window[6], date(2024, 1, 14));
    }

    #[test]
    fn weekday_parsing_is_case_insensitive() {
        assert_eq!("Monday".parse::<Weekday>().unwrap(), Weekday::Monday);
        assert_eq!(" sun ".parse::<Weekday>().unwrap(), Weekday::Sunday);
        assert!("funday".parse::<Weekday>().is_err());
    }
}
