use std::time::{Duration, Instant};

use chrono::{Local, NaiveDate};

use crate::error::SyncError;
use crate::event::{self, Eligibility};
use crate::profile::{self, TeamProfile};
use crate::sheet::{self, SheetApi};
use crate::vexdb::{EventRecord, StatSource};

pub const DEFAULT_WRITE_DELAY: Duration = Duration::from_secs(1);

/// Milestones a run reports as it goes. Every hook has a no-op default, so
/// callers implement only what they surface.
pub trait Progress {
    fn event_loaded(&mut self, _event: &EventRecord, _season: &str) {}
    fn eligibility_checked(
        &mut self,
        _today: NaiveDate,
        _event_date: NaiveDate,
        _check: &Eligibility,
    ) {
    }
    fn roster_loaded(&mut self, _teams: usize) {}
    fn team_aggregated(&mut self, _number: &str, _elapsed: Duration) {}
    fn team_dropped(&mut self, _number: &str) {}
    fn sheet_rows_found(&mut self, _teams: usize) {}
    fn row_written(&mut self, _row: u32, _number: &str, _updated_cells: u32) {}
    fn row_failed(&mut self, _row: u32, _number: &str, _message: &str) {}
}

/// Progress sink that drops everything.
pub struct NullProgress;

impl Progress for NullProgress {}

/// Caller-supplied knobs for one run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub event_ref: String,
    pub season_override: Option<String>,
    pub write_delay: Duration,
}

impl RunConfig {
    pub fn new(event_ref: impl Into<String>) -> Self {
        Self {
            event_ref: event_ref.into(),
            season_override: None,
            write_delay: DEFAULT_WRITE_DELAY,
        }
    }
}

/// What one run did, for the caller's closing report.
#[derive(Debug)]
pub struct SyncSummary {
    pub event_name: String,
    pub sku: String,
    pub season: String,
    pub roster_size: usize,
    pub dropped_teams: Vec<String>,
    pub rows_written: usize,
    pub row_failures: Vec<SyncError>,
    pub elapsed: Duration,
}

impl SyncSummary {
    /// False when any team was dropped or any row failed to land.
    pub fn clean(&self) -> bool {
        self.dropped_teams.is_empty() && self.row_failures.is_empty()
    }
}

/// Full pipeline against the real clock.
pub fn run(
    config: &RunConfig,
    source: &dyn StatSource,
    sheet: &dyn SheetApi,
    progress: &mut dyn Progress,
) -> Result<SyncSummary, SyncError> {
    run_at(config, source, sheet, progress, Local::now().date_naive())
}

/// Same pipeline with the calendar date pinned, so tests can sit on either
/// side of the eligibility cutoff.
pub fn run_at(
    config: &RunConfig,
    source: &dyn StatSource,
    sheet: &dyn SheetApi,
    progress: &mut dyn Progress,
    today: NaiveDate,
) -> Result<SyncSummary, SyncError> {
    let started = Instant::now();

    let event = event::resolve_event(
        source,
        &config.event_ref,
        config.season_override.as_deref(),
        today,
        progress,
    )?;

    let mut profiles: Vec<(usize, TeamProfile)> = Vec::new();
    let mut dropped = Vec::new();
    for (index, number) in event.roster.iter().enumerate() {
        let team_started = Instant::now();
        match profile::aggregate_team(source, number, &event.season) {
            Ok(profile) => {
                progress.team_aggregated(number, team_started.elapsed());
                profiles.push((index, profile));
            }
            Err(SyncError::UnknownTeam(_)) => {
                progress.team_dropped(number);
                dropped.push(number.clone());
            }
            Err(other) => return Err(other),
        }
    }

    // The sheet's roster column is only reported; the API roster decides
    // which row each team gets.
    let grid = sheet.read_values(sheet::SHEET_TAB)?;
    progress.sheet_rows_found(sheet::roster_from_grid(&grid).len());

    let row_failures = sheet::write_profiles(sheet, &profiles, config.write_delay, progress);
    let rows_written = profiles.len() - row_failures.len();

    Ok(SyncSummary {
        event_name: event.name,
        sku: event.sku,
        season: event.season,
        roster_size: event.roster.len(),
        dropped_teams: dropped,
        rows_written,
        row_failures,
        elapsed: started.elapsed(),
    })
}
