use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, SubsecRound, Utc};

/// Wall clock of the business. Invoice dates are stored as local time of a
/// fixed UTC offset (Colombia, UTC-5, by default).
#[derive(Debug, Clone, Copy)]
pub struct BusinessClock {
    offset: FixedOffset,
}

impl BusinessClock {
    pub fn new(utc_offset_hours: i32) -> Result<Self, anyhow::Error> {
        let offset = FixedOffset::east_opt(utc_offset_hours * 3600)
            .ok_or_else(|| anyhow::anyhow!("Invalid UTC offset: {} hours", utc_offset_hours))?;
        Ok(Self { offset })
    }

    /// Local time for `instant`, truncated to whole seconds.
    pub fn local_at(&self, instant: DateTime<Utc>) -> NaiveDateTime {
        instant.with_timezone(&self.offset).naive_local().trunc_subsecs(0)
    }

    pub fn now(&self) -> NaiveDateTime {
        self.local_at(Utc::now())
    }

    pub fn today_at(&self, instant: DateTime<Utc>) -> NaiveDate {
        self.local_at(instant).date()
    }

    /// First and last millisecond of `date`, inclusive.
    pub fn day_range(date: NaiveDate) -> (NaiveDateTime, NaiveDateTime) {
        let start = date.and_time(NaiveTime::MIN);
        let end = start + Duration::days(1) - Duration::milliseconds(1);
        (start, end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn local_time_applies_offset() {
        let clock = BusinessClock::new(-5).unwrap();
        let instant = Utc.with_ymd_and_hms(2024, 3, 1, 3, 30, 0).unwrap();

        let local = clock.local_at(instant);

        assert_eq!(local.to_string(), "2024-02-29 22:30:00");
        assert_eq!(clock.today_at(instant), NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
    }

    #[test]
    fn day_range_covers_whole_day() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        let (start, end) = BusinessClock::day_range(date);

        assert_eq!(start.format("%Y-%m-%dT%H:%M:%S%.3f").to_string(), "2024-01-15T00:00:00.000");
        assert_eq!(end.format("%Y-%m-%dT%H:%M:%S%.3f").to_string(), "2024-01-15T23:59:59.999");
    }

    #[test]
    fn out_of_range_offset_is_rejected() {
        assert!(BusinessClock::new(30).is_err());
    }
}
