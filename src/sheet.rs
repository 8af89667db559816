use std::thread;
use std::time::Duration;

use serde::Deserialize;
use serde_json::{Value, json};

use crate::error::SyncError;
use crate::http_client::http_client;
use crate::pipeline::Progress;
use crate::profile::TeamProfile;

pub const SHEETS_BASE_URL: &str = "https://sheets.googleapis.com/v4/spreadsheets";
pub const SHEET_TAB: &str = "Sheet1";

// Row 1 is the header; the first team lands on row 2.
const FIRST_TEAM_ROW: u32 = 2;

pub type ValueGrid = Vec<Vec<String>>;

/// The two spreadsheet calls the synchronizer makes. [`SheetsClient`] talks
/// to the Sheets REST API; tests substitute a recording fake.
pub trait SheetApi {
    fn read_values(&self, range: &str) -> Result<ValueGrid, SyncError>;
    fn update_row(&self, range: &str, row: &[String]) -> Result<u32, SyncError>;
}

pub struct SheetsClient {
    spreadsheet_id: String,
    access_token: String,
}

impl SheetsClient {
    pub fn new(spreadsheet_id: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            spreadsheet_id: spreadsheet_id.into(),
            access_token: access_token.into(),
        }
    }
}

impl SheetApi for SheetsClient {
    fn read_values(&self, range: &str) -> Result<ValueGrid, SyncError> {
        let client = http_client()?;
        let url = format!("{SHEETS_BASE_URL}/{}/values/{}", self.spreadsheet_id, range);
        let resp = client.get(&url).bearer_auth(&self.access_token).send()?;
        let status = resp.status();
        let body = resp.text()?;
        if !status.is_success() {
            return Err(SyncError::RemoteQuery(format!(
                "values read returned {status}"
            )));
        }
        parse_value_grid_json(&body)
    }

    fn update_row(&self, range: &str, row: &[String]) -> Result<u32, SyncError> {
        let client = http_client()?;
        let url = format!("{SHEETS_BASE_URL}/{}/values/{}", self.spreadsheet_id, range);
        // USER_ENTERED so the sheet stores numbers, not quoted strings.
        let resp = client
            .put(&url)
            .query(&[("valueInputOption", "USER_ENTERED")])
            .bearer_auth(&self.access_token)
            .json(&json!({ "values": [row] }))
            .send()?;
        let status = resp.status();
        let body = resp.text()?;
        if !status.is_success() {
            return Err(SyncError::RemoteQuery(format!(
                "values update returned {status}"
            )));
        }
        parse_update_response_json(&body)
    }
}

pub fn sheet_row(roster_index: usize) -> u32 {
    roster_index as u32 + FIRST_TEAM_ROW
}

/// A1 range for one team's stat block, columns F through S.
pub fn row_range(roster_index: usize) -> String {
    let row = sheet_row(roster_index);
    format!("{SHEET_TAB}!F{row}:S{row}")
}

/// Whole ratings keep a trailing `.0` (`15.0`, never `15`); fractional
/// values print shortest round-trip.
pub fn fmt_rating(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 {
        format!("{value:.1}")
    } else {
        value.to_string()
    }
}

/// Column order matches the sheet header: OPR, DPR, CCWM, AP, SP, TRSP,
/// season-rating rank, season rating, average rank, driver skills,
/// programming skills, combined skills, best match score, events attended.
pub fn profile_row(profile: &TeamProfile) -> [String; 14] {
    [
        fmt_rating(profile.opr),
        fmt_rating(profile.dpr),
        fmt_rating(profile.ccwm),
        profile.ap.to_string(),
        profile.sp.to_string(),
        profile.trsp.to_string(),
        profile.vrating_rank.to_string(),
        fmt_rating(profile.vrating),
        profile.avg_rank.to_string(),
        profile.skills_driver.to_string(),
        profile.skills_programming.to_string(),
        profile.skills_combined.to_string(),
        profile.max_match_score.to_string(),
        profile.event_count.to_string(),
    ]
}

/// Team numbers out of column A, header row skipped.
pub fn roster_from_grid(grid: &ValueGrid) -> Vec<String> {
    grid.iter()
        .skip(1)
        .filter_map(|row| row.first())
        .map(|cell| cell.trim().to_string())
        .filter(|cell| !cell.is_empty())
        .collect()
}

/// Writes each profile to the row its roster index maps to. A failed update
/// is recorded and the loop moves on; a roster index with no profile leaves
/// that row untouched.
pub fn write_profiles(
    sheet: &dyn SheetApi,
    profiles: &[(usize, TeamProfile)],
    write_delay: Duration,
    progress: &mut dyn Progress,
) -> Vec<SyncError> {
    let mut failures = Vec::new();
    for (index, profile) in profiles {
        let row = sheet_row(*index);
        match sheet.update_row(&row_range(*index), &profile_row(profile)) {
            Ok(updated_cells) => progress.row_written(row, &profile.number, updated_cells),
            Err(err) => {
                let message = err.to_string();
                progress.row_failed(row, &profile.number, &message);
                failures.push(SyncError::RowUpdate { row, message });
            }
        }
        // The write quota is per-minute; one request a second stays inside it.
        thread::sleep(write_delay);
    }
    failures
}

#[derive(Debug, Deserialize)]
struct ValuesResponse {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

pub fn parse_value_grid_json(raw: &str) -> Result<ValueGrid, SyncError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(Vec::new());
    }
    let resp: ValuesResponse = serde_json::from_str(trimmed)?;
    Ok(resp
        .values
        .into_iter()
        .map(|row| row.iter().map(cell_to_string).collect())
        .collect())
}

fn cell_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[derive(Debug, Deserialize)]
struct UpdateResponse {
    #[serde(rename = "updatedCells", default)]
    updated_cells: u32,
}

pub fn parse_update_response_json(raw: &str) -> Result<u32, SyncError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(0);
    }
    let resp: UpdateResponse = serde_json::from_str(trimmed)?;
    Ok(resp.updated_cells)
}
