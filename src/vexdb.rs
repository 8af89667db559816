use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::SyncError;
use crate::http_client::http_client;

pub const VEXDB_BASE_URL: &str = "https://api.vexdb.io/v1";

/// Read-only view of the statistics backend, narrowed to the queries one
/// run needs. [`VexDb`] is the HTTP implementation; tests script their own.
pub trait StatSource {
    fn event_by_sku(&self, sku: &str) -> Result<Option<EventRecord>, SyncError>;
    fn event_roster(&self, sku: &str) -> Result<Vec<String>, SyncError>;
    fn team(&self, number: &str) -> Result<Option<TeamRecord>, SyncError>;
    fn events_attended(&self, number: &str, season: &str) -> Result<u32, SyncError>;
    fn rankings(&self, number: &str, season: &str) -> Result<Vec<RankingRecord>, SyncError>;
    fn season_ranking(
        &self,
        number: &str,
        season: &str,
    ) -> Result<Option<SeasonRankingRecord>, SyncError>;
    fn skills_runs(&self, number: &str, season: &str) -> Result<Vec<SkillsRecord>, SyncError>;
}

#[derive(Debug, Clone)]
pub struct EventRecord {
    pub sku: String,
    pub name: String,
    pub season: String,
    pub start: String,
    pub venue: String,
    pub address: String,
    pub city: String,
    pub region: String,
    pub postcode: String,
    pub country: String,
}

#[derive(Debug, Clone)]
pub struct TeamRecord {
    pub number: String,
    pub team_name: String,
    pub organisation: String,
    pub city: String,
    pub region: String,
    pub country: String,
}

#[derive(Debug, Clone, Copy)]
pub struct RankingRecord {
    pub rank: i64,
    pub ap: i64,
    pub sp: i64,
    pub trsp: i64,
    pub max_score: i64,
    pub opr: f64,
    pub dpr: f64,
    pub ccwm: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct SeasonRankingRecord {
    pub vrating_rank: i64,
    pub vrating: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkillsKind {
    Driver,
    Programming,
    Combined,
}

#[derive(Debug, Clone, Copy)]
pub struct SkillsRecord {
    pub kind: SkillsKind,
    pub score: i64,
}

#[derive(Debug, Clone)]
pub struct VexDb;

impl VexDb {
    pub fn new() -> Self {
        Self
    }

    fn get(&self, endpoint: &str, params: &[(&str, &str)]) -> Result<String, SyncError> {
        let client = http_client()?;
        let url = format!("{VEXDB_BASE_URL}/{endpoint}");
        let resp = client.get(&url).query(params).send()?;
        let status = resp.status();
        let body = resp.text()?;
        if !status.is_success() {
            return Err(SyncError::RemoteQuery(format!("{endpoint} returned {status}")));
        }
        Ok(body)
    }
}

impl StatSource for VexDb {
    fn event_by_sku(&self, sku: &str) -> Result<Option<EventRecord>, SyncError> {
        let body = self.get("get_events", &[("sku", sku)])?;
        parse_event_json(&body)
    }

    fn event_roster(&self, sku: &str) -> Result<Vec<String>, SyncError> {
        let body = self.get("get_teams", &[("sku", sku)])?;
        parse_roster_json(&body)
    }

    fn team(&self, number: &str) -> Result<Option<TeamRecord>, SyncError> {
        let body = self.get("get_teams", &[("team", number)])?;
        parse_team_json(&body)
    }

    fn events_attended(&self, number: &str, season: &str) -> Result<u32, SyncError> {
        let body = self.get("get_events", &[("team", number), ("season", season)])?;
        parse_event_count_json(&body)
    }

    fn rankings(&self, number: &str, season: &str) -> Result<Vec<RankingRecord>, SyncError> {
        let body = self.get("get_rankings", &[("team", number), ("season", season)])?;
        parse_rankings_json(&body)
    }

    fn season_ranking(
        &self,
        number: &str,
        season: &str,
    ) -> Result<Option<SeasonRankingRecord>, SyncError> {
        let body = self.get("get_season_rankings", &[("team", number), ("season", season)])?;
        parse_season_ranking_json(&body)
    }

    fn skills_runs(&self, number: &str, season: &str) -> Result<Vec<SkillsRecord>, SyncError> {
        let body = self.get("get_skills", &[("team", number), ("season", season)])?;
        parse_skills_json(&body)
    }
}

#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: DeserializeOwned"))]
struct Envelope<T> {
    #[serde(default)]
    result: Vec<T>,
}

fn parse_envelope<T: DeserializeOwned>(raw: &str) -> Result<Vec<T>, SyncError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(Vec::new());
    }
    let envelope: Envelope<T> = serde_json::from_str(trimmed)?;
    Ok(envelope.result)
}

#[derive(Debug, Deserialize)]
struct EventRow {
    #[serde(default)]
    sku: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    season: String,
    #[serde(default)]
    start: String,
    #[serde(default)]
    loc_venue: String,
    #[serde(default)]
    loc_address1: String,
    #[serde(default)]
    loc_city: String,
    #[serde(default)]
    loc_region: String,
    #[serde(default)]
    loc_postcode: String,
    #[serde(default)]
    loc_country: String,
}

pub fn parse_event_json(raw: &str) -> Result<Option<EventRecord>, SyncError> {
    let rows: Vec<EventRow> = parse_envelope(raw)?;
    let Some(row) = rows.into_iter().next() else {
        return Ok(None);
    };
    Ok(Some(EventRecord {
        sku: row.sku,
        name: row.name,
        season: row.season,
        start: row.start,
        venue: row.loc_venue,
        address: row.loc_address1,
        city: row.loc_city,
        region: row.loc_region,
        postcode: row.loc_postcode,
        country: row.loc_country,
    }))
}

#[derive(Debug, Deserialize)]
struct RosterRow {
    #[serde(default)]
    number: String,
}

// Result order is kept as-is; it decides which sheet row each team gets.
pub fn parse_roster_json(raw: &str) -> Result<Vec<String>, SyncError> {
    let rows: Vec<RosterRow> = parse_envelope(raw)?;
    Ok(rows
        .into_iter()
        .map(|row| row.number)
        .filter(|number| !number.trim().is_empty())
        .collect())
}

#[derive(Debug, Deserialize)]
struct TeamRow {
    #[serde(default)]
    number: String,
    #[serde(default)]
    team_name: String,
    #[serde(default)]
    organisation: String,
    #[serde(default)]
    city: String,
    #[serde(default)]
    region: String,
    #[serde(default)]
    country: String,
}

pub fn parse_team_json(raw: &str) -> Result<Option<TeamRecord>, SyncError> {
    let rows: Vec<TeamRow> = parse_envelope(raw)?;
    let Some(row) = rows.into_iter().next() else {
        return Ok(None);
    };
    Ok(Some(TeamRecord {
        number: row.number,
        team_name: row.team_name,
        organisation: row.organisation,
        city: row.city,
        region: row.region,
        country: row.country,
    }))
}

pub fn parse_event_count_json(raw: &str) -> Result<u32, SyncError> {
    let rows: Vec<Value> = parse_envelope(raw)?;
    Ok(rows.len() as u32)
}

#[derive(Debug, Deserialize)]
struct RankingRow {
    #[serde(default)]
    rank: i64,
    #[serde(default)]
    ap: i64,
    #[serde(default)]
    sp: i64,
    #[serde(default)]
    trsp: i64,
    #[serde(default)]
    max_score: i64,
    #[serde(default)]
    opr: f64,
    #[serde(default)]
    dpr: f64,
    #[serde(default)]
    ccwm: f64,
}

pub fn parse_rankings_json(raw: &str) -> Result<Vec<RankingRecord>, SyncError> {
    let rows: Vec<RankingRow> = parse_envelope(raw)?;
    Ok(rows
        .into_iter()
        .map(|row| RankingRecord {
            rank: row.rank,
            ap: row.ap,
            sp: row.sp,
            trsp: row.trsp,
            max_score: row.max_score,
            opr: row.opr,
            dpr: row.dpr,
            ccwm: row.ccwm,
        })
        .collect())
}

#[derive(Debug, Deserialize)]
struct SeasonRankingRow {
    #[serde(default)]
    vrating_rank: i64,
    #[serde(default)]
    vrating: f64,
}

pub fn parse_season_ranking_json(raw: &str) -> Result<Option<SeasonRankingRecord>, SyncError> {
    let rows: Vec<SeasonRankingRow> = parse_envelope(raw)?;
    Ok(rows.into_iter().next().map(|row| SeasonRankingRecord {
        vrating_rank: row.vrating_rank,
        vrating: row.vrating,
    }))
}

#[derive(Debug, Deserialize)]
struct SkillsRow {
    #[serde(rename = "type", default)]
    kind: i64,
    #[serde(default)]
    score: i64,
}

pub fn parse_skills_json(raw: &str) -> Result<Vec<SkillsRecord>, SyncError> {
    let rows: Vec<SkillsRow> = parse_envelope(raw)?;
    Ok(rows
        .into_iter()
        .filter_map(|row| {
            let kind = skills_kind(row.kind)?;
            Some(SkillsRecord {
                kind,
                score: row.score,
            })
        })
        .collect())
}

fn skills_kind(code: i64) -> Option<SkillsKind> {
    match code {
        0 => Some(SkillsKind::Driver),
        1 => Some(SkillsKind::Programming),
        2 => Some(SkillsKind::Combined),
        _ => None,
    }
}
