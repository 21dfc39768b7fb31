use chrono::{DateTime, Duration, Local, Months, NaiveDate, NaiveTime, Utc};

const MILLIS_PER_DAY: i64 = 86_400_000;

/// Source of the current instant and the caller's calendar day
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    /// Current calendar day in the caller's local time zone
    fn today(&self) -> NaiveDate {
        self.now().with_timezone(&Local).date_naive()
    }
}

/// Wall clock, local time zone
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock frozen at a given instant. Its calendar day is the UTC day, so
/// results do not depend on the host time zone.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }

    fn today(&self) -> NaiveDate {
        self.0.date_naive()
    }
}

/// Earliest date accepted for an expiration: the day after `today`
pub fn minimum_allowed_date(today: NaiveDate) -> NaiveDate {
    today + Duration::days(1)
}

/// Whole days from `now` until `target`, rounded up. Negative once the
/// target has passed.
pub fn days_until(target: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    let diff = (target - now).num_milliseconds();
    // ceil for both signs
    -(-diff).div_euclid(MILLIS_PER_DAY)
}

/// Adds calendar months, clamping the day to the end of shorter months.
/// Saturates at the latest representable date on overflow.
pub fn add_months(base: DateTime<Utc>, months: u32) -> DateTime<Utc> {
    base.checked_add_months(Months::new(months))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Instant stored for a date-only input: midnight UTC of that day
pub fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

/// Parses an ISO `YYYY-MM-DD` date input
pub fn parse_date_input(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok()
}

/// Plain date string used to pre-fill date inputs
pub fn format_date_input(instant: DateTime<Utc>) -> String {
    instant.format("%Y-%m-%d").to_string()
}

/// `dd/mm/yyyy`, as shown next to alerts
pub fn format_display_date(instant: DateTime<Utc>) -> String {
    instant.format("%d/%m/%Y").to_string()
}
