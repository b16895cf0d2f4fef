//! Display formatting helpers.

use chrono::{DateTime, Datelike, Local, NaiveDate, NaiveDateTime, TimeZone, Timelike};

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// Formats a stored creation timestamp as `M/D/YYYY h:MMam|pm` in local time.
///
/// Unparsable input is returned unchanged.
pub fn format_post_date(raw: &str) -> String {
    match parse_timestamp(raw.trim()) {
        Some(local) => {
            let (is_pm, hour) = local.hour12();
            format!(
                "{}/{}/{} {}:{:02}{}",
                local.month(),
                local.day(),
                local.year(),
                hour,
                local.minute(),
                if is_pm { "pm" } else { "am" }
            )
        }
        None => raw.to_string(),
    }
}

fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    if let Ok(with_offset) = DateTime::parse_from_rfc3339(raw) {
        return Some(with_offset.with_timezone(&Local).naive_local());
    }
    if let Some(naive) = NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
    {
        return Some(naive);
    }
    // Date-only values denote UTC midnight.
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()?;
    let utc_midnight = chrono::Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0)?);
    Some(utc_midnight.with_timezone(&Local).naive_local())
}

/// Up to two uppercase initials from a display name.
pub fn initials(name: &str) -> String {
    name.split(' ')
        .filter_map(|part| part.chars().next())
        .take(2)
        .flat_map(char::to_uppercase)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_afternoon_timestamp() {
        assert_eq!(format_post_date("2024-03-05T14:30:00"), "3/5/2024 2:30pm");
    }

    #[test]
    fn formats_midnight_and_noon() {
        assert_eq!(format_post_date("2024-12-25T00:05:00"), "12/25/2024 12:05am");
        assert_eq!(format_post_date("2024-07-04T12:00:00.000"), "7/4/2024 12:00pm");
    }

    fn local_display(instant: DateTime<chrono::Utc>) -> String {
        instant.with_timezone(&Local).format("%-m/%-d/%Y %-I:%M%P").to_string()
    }

    #[test]
    fn offset_timestamps_convert_to_local_time() {
        let instant = chrono::Utc.with_ymd_and_hms(2024, 3, 5, 14, 30, 0).unwrap();
        assert_eq!(format_post_date("2024-03-05T14:30:00Z"), local_display(instant));
        assert_eq!(format_post_date("2024-03-05T16:30:00+02:00"), local_display(instant));
    }

    #[test]
    fn date_only_is_utc_midnight() {
        let midnight = chrono::Utc.with_ymd_and_hms(2024, 3, 5, 0, 0, 0).unwrap();
        assert_eq!(format_post_date("2024-03-05"), local_display(midnight));
    }

    #[test]
    fn unparsable_timestamp_is_returned_verbatim() {
        assert_eq!(format_post_date("not-a-date"), "not-a-date");
        assert_eq!(format_post_date(""), "");
    }

    #[test]
    fn initials_take_first_two_words() {
        assert_eq!(initials("gustavus adolphus college"), "GA");
        assert_eq!(initials("Ann"), "A");
        assert_eq!(initials("  double  space"), "DS");
    }
}
