use std::cell::RefCell;
use std::collections::HashMap;
use std::time::Duration;

use chrono::NaiveDate;

use vexsheet::error::SyncError;
use vexsheet::event::Eligibility;
use vexsheet::pipeline::{NullProgress, Progress, RunConfig, run_at};
use vexsheet::sheet::{SheetApi, ValueGrid};
use vexsheet::vexdb::{
    EventRecord, RankingRecord, SeasonRankingRecord, SkillsKind, SkillsRecord, StatSource,
    TeamRecord,
};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn config(event_ref: &str) -> RunConfig {
    RunConfig {
        event_ref: event_ref.to_string(),
        season_override: None,
        write_delay: Duration::ZERO,
    }
}

fn fake_event(start: &str) -> EventRecord {
    EventRecord {
        sku: "RE-VRC-17-4583".to_string(),
        name: "WPI Winter Classic".to_string(),
        season: "In The Zone".to_string(),
        start: start.to_string(),
        venue: "Worcester Polytechnic Institute".to_string(),
        address: "100 Institute Road".to_string(),
        city: "Worcester".to_string(),
        region: "Massachusetts".to_string(),
        postcode: "01609".to_string(),
        country: "United States".to_string(),
    }
}

fn fake_team(number: &str) -> TeamRecord {
    TeamRecord {
        number: number.to_string(),
        team_name: "WarBots".to_string(),
        organisation: "Warren High School Robotics".to_string(),
        city: "Downey".to_string(),
        region: "California".to_string(),
        country: "United States".to_string(),
    }
}

#[derive(Default)]
struct FakeVexDb {
    event: Option<EventRecord>,
    roster: Vec<String>,
    teams: HashMap<String, TeamRecord>,
    attended: HashMap<String, u32>,
    rankings: HashMap<String, Vec<RankingRecord>>,
    season_rankings: HashMap<String, SeasonRankingRecord>,
    skills: HashMap<String, Vec<SkillsRecord>>,
    fail_rankings_for: Option<String>,
    seasons_queried: RefCell<Vec<String>>,
}

impl StatSource for FakeVexDb {
    fn event_by_sku(&self, _sku: &str) -> Result<Option<EventRecord>, SyncError> {
        Ok(self.event.clone())
    }

    fn event_roster(&self, _sku: &str) -> Result<Vec<String>, SyncError> {
        Ok(self.roster.clone())
    }

    fn team(&self, number: &str) -> Result<Option<TeamRecord>, SyncError> {
        Ok(self.teams.get(number).cloned())
    }

    fn events_attended(&self, number: &str, season: &str) -> Result<u32, SyncError> {
        self.seasons_queried.borrow_mut().push(season.to_string());
        Ok(self.attended.get(number).copied().unwrap_or(0))
    }

    fn rankings(&self, number: &str, _season: &str) -> Result<Vec<RankingRecord>, SyncError> {
        if self.fail_rankings_for.as_deref() == Some(number) {
            return Err(SyncError::RemoteQuery("get_rankings timed out".to_string()));
        }
        Ok(self.rankings.get(number).cloned().unwrap_or_default())
    }

    fn season_ranking(
        &self,
        number: &str,
        _season: &str,
    ) -> Result<Option<SeasonRankingRecord>, SyncError> {
        Ok(self.season_rankings.get(number).copied())
    }

    fn skills_runs(&self, number: &str, _season: &str) -> Result<Vec<SkillsRecord>, SyncError> {
        Ok(self.skills.get(number).cloned().unwrap_or_default())
    }
}

// 90241A has a full season, 1200F has no team record, 12345A is a rookie
// with an identity but no results yet.
fn fake_db() -> FakeVexDb {
    let mut db = FakeVexDb {
        event: Some(fake_event("2018-03-03T00:00:00.000Z")),
        roster: vec![
            "90241A".to_string(),
            "1200F".to_string(),
            "12345A".to_string(),
        ],
        ..Default::default()
    };
    db.teams.insert("90241A".to_string(), fake_team("90241A"));
    db.teams.insert("12345A".to_string(), fake_team("12345A"));
    db.attended.insert("90241A".to_string(), 2);
    db.rankings.insert(
        "90241A".to_string(),
        vec![
            RankingRecord {
                rank: 3,
                ap: 40,
                sp: 100,
                trsp: 104,
                max_score: 90,
                opr: 10.0,
                dpr: 8.0,
                ccwm: 2.0,
            },
            RankingRecord {
                rank: 5,
                ap: 24,
                sp: 60,
                trsp: 64,
                max_score: 95,
                opr: 20.0,
                dpr: 6.0,
                ccwm: 4.0,
            },
        ],
    );
    db.season_rankings.insert(
        "90241A".to_string(),
        SeasonRankingRecord {
            vrating_rank: 13,
            vrating: 8.5,
        },
    );
    db.skills.insert(
        "90241A".to_string(),
        vec![
            SkillsRecord {
                kind: SkillsKind::Driver,
                score: 42,
            },
            SkillsRecord {
                kind: SkillsKind::Programming,
                score: 23,
            },
            SkillsRecord {
                kind: SkillsKind::Combined,
                score: 61,
            },
        ],
    );
    db
}

#[derive(Default)]
struct RecordingSheet {
    grid: ValueGrid,
    fail_ranges: Vec<String>,
    writes: RefCell<Vec<(String, Vec<String>)>>,
}

impl SheetApi for RecordingSheet {
    fn read_values(&self, _range: &str) -> Result<ValueGrid, SyncError> {
        Ok(self.grid.clone())
    }

    fn update_row(&self, range: &str, row: &[String]) -> Result<u32, SyncError> {
        if self.fail_ranges.iter().any(|failing| failing == range) {
            return Err(SyncError::RemoteQuery("backend returned 500".to_string()));
        }
        self.writes
            .borrow_mut()
            .push((range.to_string(), row.to_vec()));
        Ok(row.len() as u32)
    }
}

fn sheet_with_grid() -> RecordingSheet {
    RecordingSheet {
        grid: vec![
            vec!["Team".to_string(), "Team Name".to_string()],
            vec!["90241A".to_string()],
            vec!["1200F".to_string()],
            vec!["12345A".to_string()],
        ],
        ..Default::default()
    }
}

#[derive(Default)]
struct CapturingProgress {
    lines: Vec<String>,
}

impl Progress for CapturingProgress {
    fn event_loaded(&mut self, event: &EventRecord, season: &str) {
        self.lines.push(format!("event {} {}", event.sku, season));
    }

    fn eligibility_checked(
        &mut self,
        _today: NaiveDate,
        _event_date: NaiveDate,
        check: &Eligibility,
    ) {
        self.lines.push(format!("eligible {}", check.eligible));
    }

    fn roster_loaded(&mut self, teams: usize) {
        self.lines.push(format!("roster {teams}"));
    }

    fn team_aggregated(&mut self, number: &str, _elapsed: Duration) {
        self.lines.push(format!("agg {number}"));
    }

    fn team_dropped(&mut self, number: &str) {
        self.lines.push(format!("drop {number}"));
    }

    fn sheet_rows_found(&mut self, teams: usize) {
        self.lines.push(format!("sheet {teams}"));
    }

    fn row_written(&mut self, row: u32, number: &str, updated_cells: u32) {
        self.lines.push(format!("row {row} {number} {updated_cells}"));
    }

    fn row_failed(&mut self, row: u32, number: &str, _message: &str) {
        self.lines.push(format!("fail {row} {number}"));
    }
}

fn string_row(cells: &[&str]) -> Vec<String> {
    cells.iter().map(|cell| cell.to_string()).collect()
}

#[test]
fn full_run_writes_each_profile_to_its_roster_row() {
    let db = fake_db();
    let sheet = sheet_with_grid();
    let link =
        "https://www.robotevents.com/robot-competitions/vex-robotics-competition/RE-VRC-17-4583.html";

    let summary = run_at(
        &config(link),
        &db,
        &sheet,
        &mut NullProgress,
        date(2018, 2, 20),
    )
    .expect("run should succeed");

    assert_eq!(summary.event_name, "WPI Winter Classic");
    assert_eq!(summary.sku, "RE-VRC-17-4583");
    assert_eq!(summary.season, "In The Zone");
    assert_eq!(summary.roster_size, 3);
    assert_eq!(summary.rows_written, 2);
    assert_eq!(summary.dropped_teams, vec!["1200F"]);
    assert!(summary.row_failures.is_empty());
    // A dropped team leaves a stale row behind, so the run is not clean.
    assert!(!summary.clean());

    let writes = sheet.writes.borrow();
    assert_eq!(writes.len(), 2);

    let (range, row) = &writes[0];
    assert_eq!(range, "Sheet1!F2:S2");
    assert_eq!(
        row,
        &string_row(&[
            "15.0", "7.0", "3.0", "32", "80", "84", "13", "8.5", "4", "42", "23", "61", "95", "2",
        ])
    );

    // 1200F's row (F3:S3) is untouched; the rookie lands on its own row.
    let (range, row) = &writes[1];
    assert_eq!(range, "Sheet1!F4:S4");
    assert_eq!(
        row,
        &string_row(&[
            "0.0", "0.0", "0.0", "0", "0", "0", "0", "0.0", "0", "0", "0", "0", "0", "0",
        ])
    );
}

#[test]
fn progress_reports_follow_the_run() {
    let db = fake_db();
    let sheet = sheet_with_grid();
    let mut progress = CapturingProgress::default();

    run_at(
        &config("RE-VRC-17-4583"),
        &db,
        &sheet,
        &mut progress,
        date(2018, 2, 20),
    )
    .expect("run should succeed");

    assert_eq!(
        progress.lines,
        vec![
            "event RE-VRC-17-4583 In The Zone",
            "eligible true",
            "roster 3",
            "agg 90241A",
            "drop 1200F",
            "agg 12345A",
            "sheet 3",
            "row 2 90241A 14",
            "row 4 12345A 14",
        ]
    );
}

#[test]
fn run_is_rejected_before_the_window_opens() {
    let mut db = fake_db();
    db.event = Some(fake_event("2018-03-01T00:00:00.000Z"));
    let sheet = sheet_with_grid();

    let err = run_at(
        &config("RE-VRC-17-4583"),
        &db,
        &sheet,
        &mut NullProgress,
        date(2018, 1, 31),
    )
    .unwrap_err();

    match err {
        SyncError::RosterNotOpen {
            cutoff,
            days_remaining,
        } => {
            assert_eq!(cutoff, date(2018, 2, 1));
            assert_eq!(days_remaining, 1);
        }
        other => panic!("expected RosterNotOpen, got {other}"),
    }
    assert!(sheet.writes.borrow().is_empty());
}

#[test]
fn unknown_event_code_is_fatal() {
    let db = FakeVexDb::default();
    let sheet = RecordingSheet::default();

    let err = run_at(
        &config("RE-VRC-17-0000"),
        &db,
        &sheet,
        &mut NullProgress,
        date(2018, 2, 20),
    )
    .unwrap_err();

    assert!(matches!(err, SyncError::EventNotFound(sku) if sku == "RE-VRC-17-0000"));
}

#[test]
fn malformed_reference_is_fatal() {
    let db = FakeVexDb::default();
    let sheet = RecordingSheet::default();

    let err = run_at(
        &config("/"),
        &db,
        &sheet,
        &mut NullProgress,
        date(2018, 2, 20),
    )
    .unwrap_err();

    assert!(matches!(err, SyncError::MalformedReference(_)));
}

#[test]
fn one_failed_row_does_not_stop_the_rest() {
    let mut db = fake_db();
    db.roster = vec!["90241A".to_string(), "12345A".to_string()];
    let mut sheet = sheet_with_grid();
    sheet.fail_ranges = vec!["Sheet1!F2:S2".to_string()];

    let summary = run_at(
        &config("RE-VRC-17-4583"),
        &db,
        &sheet,
        &mut NullProgress,
        date(2018, 2, 20),
    )
    .expect("run should still complete");

    assert_eq!(summary.rows_written, 1);
    assert_eq!(summary.row_failures.len(), 1);
    assert!(matches!(
        summary.row_failures[0],
        SyncError::RowUpdate { row: 2, .. }
    ));
    assert!(summary.dropped_teams.is_empty());
    assert!(!summary.clean());

    let writes = sheet.writes.borrow();
    assert_eq!(writes.len(), 1);
    assert_eq!(writes[0].0, "Sheet1!F3:S3");
}

#[test]
fn season_override_reaches_every_query() {
    let db = fake_db();
    let sheet = sheet_with_grid();
    let mut cfg = config("RE-VRC-17-4583");
    cfg.season_override = Some("Turning Point".to_string());

    let summary = run_at(&cfg, &db, &sheet, &mut NullProgress, date(2018, 2, 20))
        .expect("run should succeed");

    assert_eq!(summary.season, "Turning Point");
    let seasons = db.seasons_queried.borrow();
    assert!(!seasons.is_empty());
    assert!(seasons.iter().all(|season| season == "Turning Point"));
}

#[test]
fn remote_failure_mid_roster_aborts_the_run() {
    let mut db = fake_db();
    db.fail_rankings_for = Some("90241A".to_string());
    let sheet = sheet_with_grid();

    let err = run_at(
        &config("RE-VRC-17-4583"),
        &db,
        &sheet,
        &mut NullProgress,
        date(2018, 2, 20),
    )
    .unwrap_err();

    assert!(matches!(err, SyncError::RemoteQuery(_)));
    assert!(sheet.writes.borrow().is_empty());
}
