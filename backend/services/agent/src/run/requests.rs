use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use ctxwatch_common::error::CtxError;
use ctxwatch_correlation::{yesterday_in, RunOptions};
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
pub struct RunQuery {
    /// `YYYY-MM-DD`; defaults to yesterday in the reporting offset.
    pub day: Option<String>,
    #[serde(default)]
    pub dry_run: bool,
}

impl RunQuery {
    pub fn target_day(&self, now: DateTime<Utc>, offset: FixedOffset) -> Result<NaiveDate, CtxError> {
        match self.day.as_deref().map(str::trim) {
            None | Some("") => Ok(yesterday_in(now, offset)),
            Some(raw) => NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| {
                CtxError::Validation(format!("day must be YYYY-MM-DD, got '{raw}'"))
            }),
        }
    }

    pub fn options(&self) -> RunOptions {
        RunOptions {
            dry_run: self.dry_run,
        }
    }
}
