//! Cron schedules and their time window.

use jiff::Zoned;
use jiff::civil::{self, Date, DateTime};
use serde::Serialize;

use crate::{Error, Result};

/// Number of fields in a server-side crontab.
pub const CRONTAB_FIELDS: usize = 7;

/// Wire format of schedule times.
pub const SCHEDULE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y/%m/%d %H:%M:%S",
    "%Y%m%d %H:%M:%S",
];

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%Y/%m/%d", "%Y%m%d"];

/// End of the schedule window when none is given.
pub fn max_datetime() -> DateTime {
    civil::date(9999, 12, 31).at(23, 59, 59, 0)
}

/// Parses a date or date-time string.
///
/// Dates without a time start at midnight.
pub fn parse_datetime(value: &str) -> Result<DateTime> {
    let value = value.trim();

    for format in DATETIME_FORMATS {
        if let Ok(datetime) = DateTime::strptime(format, value) {
            return Ok(datetime);
        }
    }
    for format in DATE_FORMATS {
        if let Ok(date) = Date::strptime(format, value) {
            return Ok(date.at(0, 0, 0, 0));
        }
    }

    Err(Error::parameter(format!(
        "can not parse datetime {value}, expected YYYY-MM-DD or YYYY-MM-DD HH:MM:SS"
    )))
}

/// Formats a time the way the server expects it.
pub fn format_schedule_time(datetime: DateTime) -> String {
    datetime.strftime(SCHEDULE_TIME_FORMAT).to_string()
}

/// Validates a crontab and returns it trimmed.
pub fn parse_crontab(crontab: &str) -> Result<String> {
    let crontab = crontab.trim();
    let separators = crontab.chars().filter(|c| *c == ' ').count();
    if separators != CRONTAB_FIELDS - 1 {
        return Err(Error::parameter(format!(
            "invalid schedule, expect crontab with {CRONTAB_FIELDS} fields but got {crontab:?}"
        )));
    }
    Ok(crontab.to_owned())
}

/// A crontab with an optional time window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schedule {
    pub crontab: String,
    pub start_time: Option<DateTime>,
    pub end_time: Option<DateTime>,
}

/// The `scheduleJson` document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleDescriptor {
    pub start_time: String,
    pub end_time: String,
    pub crontab: String,
    pub timezone_id: String,
}

impl Schedule {
    /// Builds the descriptor, starting now and ending at [`max_datetime`]
    /// unless set.
    pub fn descriptor(&self, timezone: &str) -> ScheduleDescriptor {
        let start_time = self
            .start_time
            .unwrap_or_else(|| Zoned::now().datetime());
        let end_time = self.end_time.unwrap_or_else(max_datetime);

        ScheduleDescriptor {
            start_time: format_schedule_time(start_time),
            end_time: format_schedule_time(end_time),
            crontab: self.crontab.clone(),
            timezone_id: timezone.to_owned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::ErrorKind;

    #[test]
    fn test_parse_datetime_formats() {
        let expected = civil::date(2021, 1, 1).at(1, 2, 3, 0);
        assert_eq!(parse_datetime("2021-01-01 01:02:03").expect("space"), expected);
        assert_eq!(parse_datetime("2021-01-01T01:02:03").expect("iso"), expected);
        assert_eq!(parse_datetime("2021/01/01 01:02:03").expect("slash"), expected);
        assert_eq!(
            parse_datetime("2021-01-01").expect("date"),
            civil::date(2021, 1, 1).at(0, 0, 0, 0)
        );
    }

    #[test]
    fn test_parse_datetime_rejects_garbage() {
        let error = parse_datetime("yesterday").expect_err("garbage");
        assert_eq!(error.kind(), ErrorKind::Parameter);
    }

    #[test]
    fn test_crontab_field_count() {
        assert_eq!(
            parse_crontab(" 0 0 0 * * ? * ").expect("valid"),
            "0 0 0 * * ? *"
        );
        parse_crontab("0 0 0 * * ?").expect_err("six fields");
        parse_crontab("0 0 0 * * ? * *").expect_err("eight fields");
    }

    #[test]
    fn test_descriptor_defaults_end_time() {
        let schedule = Schedule {
            crontab: "0 0 0 * * ? *".to_owned(),
            start_time: Some(civil::date(2021, 1, 1).at(0, 0, 0, 0)),
            end_time: None,
        };

        let value = serde_json::to_value(schedule.descriptor("Asia/Shanghai")).expect("json");
        assert_eq!(
            value,
            json!({
                "startTime": "2021-01-01 00:00:00",
                "endTime": "9999-12-31 23:59:59",
                "crontab": "0 0 0 * * ? *",
                "timezoneId": "Asia/Shanghai",
            })
        );
    }

    #[test]
    fn test_descriptor_defaults_start_time_to_now() {
        let schedule = Schedule {
            crontab: "0 0 0 * * ? *".to_owned(),
            start_time: None,
            end_time: None,
        };

        let descriptor = schedule.descriptor("UTC");
        let start = parse_datetime(&descriptor.start_time).expect("formatted");
        assert!(start < max_datetime());
    }
}
