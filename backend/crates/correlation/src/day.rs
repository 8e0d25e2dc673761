use chrono::{DateTime, FixedOffset, NaiveDate, Utc};

/// The calendar day before `now`, as seen in `offset`.
pub fn yesterday_in(now: DateTime<Utc>, offset: FixedOffset) -> NaiveDate {
    let today = now.with_timezone(&offset).date_naive();
    today.pred_opt().unwrap_or(today)
}
