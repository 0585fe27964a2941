use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// Wall-clock date split the way procedural shaders consume it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CivilDate {
    pub year: i32,
    /// Zero-based month (January is 0).
    pub month0: u32,
    /// Day of month, one-based.
    pub day: u32,
    /// Seconds since midnight, with millisecond precision.
    pub seconds_of_day: f32,
}

impl CivilDate {
    /// Current UTC date.
    #[must_use]
    pub fn now_utc() -> Self {
        let since_epoch = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or(Duration::ZERO);
        Self::from_unix(since_epoch)
    }

    #[must_use]
    pub fn from_unix(since_epoch: Duration) -> Self {
        let secs = since_epoch.as_secs();
        let days = (secs / 86_400) as i64;
        let secs_of_day = (secs % 86_400) as u32;
        let (year, month, day) = civil_from_days(days);

        let hours = secs_of_day / 3600;
        let minutes = (secs_of_day % 3600) / 60;
        let seconds = secs_of_day % 60;
        let millis = since_epoch.subsec_millis();

        Self {
            year,
            month0: month - 1,
            day,
            seconds_of_day: (hours * 3600 + minutes * 60 + seconds) as f32
                + millis as f32 / 1000.0,
        }
    }
}

/// Proleptic Gregorian (year, month, day) for a day count since 1970-01-01.
fn civil_from_days(days: i64) -> (i32, u32, u32) {
    let z = days + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z.rem_euclid(146_097);
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = (doy - (153 * mp + 2) / 5 + 1) as u32;
    let month = (if mp < 10 { mp + 3 } else { mp - 9 }) as u32;
    let year = yoe + era * 400 + i64::from(month <= 2);
    (year as i32, month, day)
}

/// Seconds elapsed since `start`, truncated to whole milliseconds.
#[must_use]
pub fn elapsed_millis_as_secs(start: Instant) -> f32 {
    start.elapsed().as_millis() as f32 / 1000.0
}
