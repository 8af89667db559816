use chrono::NaiveDate;
use thiserror::Error;

/// Failure classes for a synchronizer run. The first four abort the run;
/// the last two are recorded and skipped so the remaining teams still land.
#[derive(Error, Debug)]
pub enum SyncError {
    /// The event reference had no usable trailing path segment.
    #[error("no event code in reference {0:?}")]
    MalformedReference(String),

    /// The statistics API returned an empty result set for the code.
    #[error("no event found for sku {0}")]
    EventNotFound(String),

    /// The run started before registration data stabilizes. The roster the
    /// API serves before this window is truncated, so continuing would
    /// silently sync a partial field.
    #[error("roster locked until {cutoff}; {days_remaining} day(s) remaining")]
    RosterNotOpen {
        cutoff: NaiveDate,
        days_remaining: i64,
    },

    /// Network or payload failure from either remote API.
    #[error("remote query failed: {0}")]
    RemoteQuery(String),

    /// No identity record for the team; its row is left untouched.
    #[error("no team record for {0}")]
    UnknownTeam(String),

    /// A single row update failed; later rows still run.
    #[error("row {row} update failed: {message}")]
    RowUpdate { row: u32, message: String },
}

impl From<reqwest::Error> for SyncError {
    fn from(err: reqwest::Error) -> Self {
        SyncError::RemoteQuery(err.to_string())
    }
}

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        SyncError::RemoteQuery(format!("bad payload: {err}"))
    }
}
