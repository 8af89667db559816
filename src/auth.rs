use serde::Deserialize;

use crate::error::SyncError;
use crate::http_client::http_client;

pub const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// OAuth material for the spreadsheet account, read from the environment.
/// The refresh token comes out of a one-time consent flow.
#[derive(Debug, Clone)]
pub struct SheetCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: String,
}

/// One refresh-token exchange per run. The bearer token it returns is
/// short-lived but outlives a full write pass.
pub fn fetch_access_token(credentials: &SheetCredentials) -> Result<String, SyncError> {
    let client = http_client()?;
    let params = [
        ("grant_type", "refresh_token"),
        ("client_id", credentials.client_id.as_str()),
        ("client_secret", credentials.client_secret.as_str()),
        ("refresh_token", credentials.refresh_token.as_str()),
    ];
    let resp = client.post(TOKEN_URL).form(&params).send()?;
    let status = resp.status();
    let body = resp.text()?;
    if !status.is_success() {
        return Err(SyncError::RemoteQuery(format!(
            "token exchange returned {status}"
        )));
    }
    parse_token_json(&body)
}

pub fn parse_token_json(raw: &str) -> Result<String, SyncError> {
    let parsed: TokenResponse = serde_json::from_str(raw.trim())?;
    if parsed.access_token.is_empty() {
        return Err(SyncError::RemoteQuery(
            "token response had no access_token".to_string(),
        ));
    }
    Ok(parsed.access_token)
}
