use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

/// Appointment details accumulated over the course of a call. Each field is
/// filled in independently as the caller provides it; `date`, `time` and
/// `duration` are required before a booking can be attempted, `staff` stays
/// "Any" unless the caller names someone.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AppointmentDetails {
    /// Calendar day, "YYYY-MM-DD".
    pub date: Option<String>,
    /// Wall-clock time, "HH:MM" 24-hour.
    pub time: Option<String>,
    /// Free-form duration like "60 minutes".
    pub duration: Option<String>,
    /// Staff name, or "Any" for no preference.
    pub staff: Option<String>,
}

impl AppointmentDetails {
    /// Merge newer fields over older ones. A field the update omits never
    /// erases a previously known value.
    pub fn merge(&mut self, update: &AppointmentDetails) {
        if update.date.is_some() {
            self.date = update.date.clone();
        }
        if update.time.is_some() {
            self.time = update.time.clone();
        }
        if update.duration.is_some() {
            self.duration = update.duration.clone();
        }
        if update.staff.is_some() {
            self.staff = update.staff.clone();
        }
    }

    pub fn is_complete(&self) -> bool {
        self.date.is_some() && self.time.is_some() && self.duration.is_some()
    }

    pub fn staff_preference(&self) -> &str {
        self.staff.as_deref().unwrap_or("Any")
    }

    /// Absolute start timestamp from `date` + `time`.
    pub fn start_datetime(&self) -> anyhow::Result<NaiveDateTime> {
        let date = self
            .date
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("appointment date not provided"))?;
        let time = self
            .time
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("appointment time not provided"))?;

        let date = NaiveDate::parse_from_str(date, "%Y-%m-%d")?;
        let time = NaiveTime::parse_from_str(time, "%H:%M")?;
        Ok(date.and_time(time))
    }

    /// Parse a duration like "60 minutes" into whole minutes.
    pub fn duration_minutes(&self) -> anyhow::Result<i64> {
        let duration = self
            .duration
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("appointment duration not provided"))?;

        duration
            .split_whitespace()
            .next()
            .and_then(|n| n.parse().ok())
            .filter(|m| *m > 0)
            .ok_or_else(|| anyhow::anyhow!("invalid duration: {duration}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_details() -> AppointmentDetails {
        AppointmentDetails {
            date: Some("2025-03-27".to_string()),
            time: Some("17:00".to_string()),
            duration: Some("60 minutes".to_string()),
            staff: Some("Any".to_string()),
        }
    }

    #[test]
    fn test_merge_fills_missing_fields() {
        let mut details = AppointmentDetails::default();
        details.merge(&AppointmentDetails {
            date: Some("2025-03-27".to_string()),
            ..Default::default()
        });
        details.merge(&AppointmentDetails {
            time: Some("17:00".to_string()),
            ..Default::default()
        });

        assert_eq!(details.date.as_deref(), Some("2025-03-27"));
        assert_eq!(details.time.as_deref(), Some("17:00"));
        assert!(details.duration.is_none());
    }

    #[test]
    fn test_merge_is_monotonic() {
        let mut details = full_details();
        // An update that omits everything must not erase known fields.
        details.merge(&AppointmentDetails::default());
        assert_eq!(details, full_details());
    }

    #[test]
    fn test_merge_overwrites_changed_value() {
        let mut details = full_details();
        details.merge(&AppointmentDetails {
            time: Some("18:00".to_string()),
            ..Default::default()
        });
        assert_eq!(details.time.as_deref(), Some("18:00"));
        assert_eq!(details.date.as_deref(), Some("2025-03-27"));
    }

    #[test]
    fn test_is_complete() {
        assert!(full_details().is_complete());

        let mut partial = full_details();
        partial.duration = None;
        assert!(!partial.is_complete());

        // Staff is not required.
        let mut no_staff = full_details();
        no_staff.staff = None;
        assert!(no_staff.is_complete());
    }

    #[test]
    fn test_start_datetime() {
        let start = full_details().start_datetime().unwrap();
        assert_eq!(start.format("%Y-%m-%d %H:%M").to_string(), "2025-03-27 17:00");
    }

    #[test]
    fn test_start_datetime_missing_time() {
        let mut details = full_details();
        details.time = None;
        assert!(details.start_datetime().is_err());
    }

    #[test]
    fn test_duration_minutes() {
        assert_eq!(full_details().duration_minutes().unwrap(), 60);

        let mut details = full_details();
        details.duration = Some("90 minutes".to_string());
        assert_eq!(details.duration_minutes().unwrap(), 90);
    }

    #[test]
    fn test_duration_minutes_invalid() {
        let mut details = full_details();
        details.duration = Some("a while".to_string());
        assert!(details.duration_minutes().is_err());

        details.duration = Some("0 minutes".to_string());
        assert!(details.duration_minutes().is_err());
    }
}
