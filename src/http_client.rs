use std::time::Duration;

use once_cell::sync::OnceCell;
use reqwest::blocking::Client;

use crate::error::SyncError;

// Sheets writes are the slowest calls in a run; give them headroom.
const REQUEST_TIMEOUT_SECS: u64 = 15;

static CLIENT: OnceCell<Client> = OnceCell::new();

/// Shared blocking client for both remote APIs.
pub fn http_client() -> Result<&'static Client, SyncError> {
    CLIENT.get_or_try_init(|| {
        Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|err| SyncError::RemoteQuery(format!("failed to build http client: {err}")))
    })
}
