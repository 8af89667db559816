use chrono::{Duration, NaiveDate};

use crate::error::SyncError;
use crate::pipeline::Progress;
use crate::vexdb::StatSource;

/// Registration keeps churning until four weeks out, and the statistics API
/// serves a truncated team list before then.
pub const ROSTER_WINDOW_DAYS: i64 = 28;

/// A resolved competition event, ready to aggregate against.
#[derive(Debug, Clone)]
pub struct VexEvent {
    pub sku: String,
    pub name: String,
    pub season: String,
    pub date: NaiveDate,
    pub roster: Vec<String>,
    pub location: EventLocation,
}

#[derive(Debug, Clone)]
pub struct EventLocation {
    pub venue: String,
    pub address: String,
    pub city: String,
    pub region: String,
    pub postcode: String,
    pub country: String,
}

#[derive(Debug, Clone, Copy)]
pub struct Eligibility {
    pub eligible: bool,
    pub cutoff: NaiveDate,
    pub days_remaining: i64,
}

/// Pulls the event code out of a robotevents link: the trailing path
/// segment, minus any `.html` suffix. A bare code passes through unchanged.
pub fn extract_sku(reference: &str) -> Result<String, SyncError> {
    let trimmed = reference.trim();
    let path = trimmed
        .split(['?', '#'])
        .next()
        .unwrap_or(trimmed)
        .trim_end_matches('/');
    let segment = path.rsplit('/').next().unwrap_or(path);
    let sku = segment.strip_suffix(".html").unwrap_or(segment).trim();
    if sku.is_empty() {
        return Err(SyncError::MalformedReference(reference.to_string()));
    }
    Ok(sku.to_string())
}

pub fn eligibility_cutoff(event_date: NaiveDate) -> NaiveDate {
    event_date - Duration::days(ROSTER_WINDOW_DAYS)
}

/// A run is eligible once today is on or past the cutoff; before that,
/// `days_remaining` says how long the caller has to wait.
pub fn check_eligibility(event_date: NaiveDate, today: NaiveDate) -> Eligibility {
    let cutoff = eligibility_cutoff(event_date);
    Eligibility {
        eligible: today >= cutoff,
        cutoff,
        days_remaining: (cutoff - today).num_days().max(0),
    }
}

pub fn parse_start_date(raw: &str) -> Result<NaiveDate, SyncError> {
    let date_part = raw.split('T').next().unwrap_or(raw).trim();
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
        .map_err(|_| SyncError::RemoteQuery(format!("unparseable event start date {raw:?}")))
}

/// Turns an event reference into a [`VexEvent`]: code extraction, metadata
/// lookup, the eligibility check, then the roster fetch. Season defaults to
/// the one the event record carries unless the caller overrides it.
pub fn resolve_event(
    source: &dyn StatSource,
    reference: &str,
    season_override: Option<&str>,
    today: NaiveDate,
    progress: &mut dyn Progress,
) -> Result<VexEvent, SyncError> {
    let sku = extract_sku(reference)?;
    let record = source
        .event_by_sku(&sku)?
        .ok_or_else(|| SyncError::EventNotFound(sku.clone()))?;

    let season = match season_override.map(str::trim) {
        Some(s) if !s.is_empty() => s.to_string(),
        _ => record.season.clone(),
    };
    progress.event_loaded(&record, &season);

    let date = parse_start_date(&record.start)?;
    let check = check_eligibility(date, today);
    progress.eligibility_checked(today, date, &check);
    if !check.eligible {
        return Err(SyncError::RosterNotOpen {
            cutoff: check.cutoff,
            days_remaining: check.days_remaining,
        });
    }

    let roster = source.event_roster(&sku)?;
    progress.roster_loaded(roster.len());

    Ok(VexEvent {
        sku,
        name: record.name,
        season,
        date,
        roster,
        location: EventLocation {
            venue: record.venue,
            address: record.address,
            city: record.city,
            region: record.region,
            postcode: record.postcode,
            country: record.country,
        },
    })
}
