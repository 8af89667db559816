use crate::error::SyncError;
use crate::vexdb::{RankingRecord, SkillsKind, SkillsRecord, StatSource};

/// One team's season statistics, shaped for a single sheet row.
#[derive(Debug, Clone, PartialEq)]
pub struct TeamProfile {
    pub number: String,
    pub opr: f64,
    pub dpr: f64,
    pub ccwm: f64,
    pub ap: i64,
    pub sp: i64,
    pub trsp: i64,
    pub vrating_rank: i64,
    pub vrating: f64,
    pub avg_rank: i64,
    pub skills_driver: i64,
    pub skills_programming: i64,
    pub skills_combined: i64,
    pub max_match_score: i64,
    pub event_count: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RankingAverages {
    pub opr: f64,
    pub dpr: f64,
    pub ccwm: f64,
    pub ap: i64,
    pub sp: i64,
    pub trsp: i64,
    pub rank: i64,
    pub max_match_score: i64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SkillsPeaks {
    pub driver: i64,
    pub programming: i64,
    pub combined: i64,
}

/// Means divide by the attended-event count, not by however many ranking
/// rows came back; a team ranked at 3 of its 5 attended events still
/// averages over 5. Whole-number fields keep truncated-integer division.
/// The one exception is `max_match_score`, which takes the maximum.
/// No attended events means a clean default row.
pub fn reduce_rankings(rankings: &[RankingRecord], event_count: u32) -> RankingAverages {
    if event_count == 0 {
        return RankingAverages::default();
    }

    let mut out = RankingAverages::default();
    for ranking in rankings {
        out.opr += ranking.opr;
        out.dpr += ranking.dpr;
        out.ccwm += ranking.ccwm;
        out.ap += ranking.ap;
        out.sp += ranking.sp;
        out.trsp += ranking.trsp;
        out.rank += ranking.rank;
        out.max_match_score = out.max_match_score.max(ranking.max_score);
    }

    let divisor = f64::from(event_count);
    out.opr /= divisor;
    out.dpr /= divisor;
    out.ccwm /= divisor;

    let divisor = i64::from(event_count);
    out.ap /= divisor;
    out.sp /= divisor;
    out.trsp /= divisor;
    out.rank /= divisor;

    out
}

/// Best score per skills category across the season.
pub fn reduce_skills(runs: &[SkillsRecord]) -> SkillsPeaks {
    let mut out = SkillsPeaks::default();
    for run in runs {
        let slot = match run.kind {
            SkillsKind::Driver => &mut out.driver,
            SkillsKind::Programming => &mut out.programming,
            SkillsKind::Combined => &mut out.combined,
        };
        *slot = (*slot).max(run.score);
    }
    out
}

/// Folds every per-team query into one profile. A missing identity record
/// is the caller's signal to drop the team; any transport failure bubbles
/// up unchanged.
pub fn aggregate_team(
    source: &dyn StatSource,
    number: &str,
    season: &str,
) -> Result<TeamProfile, SyncError> {
    let record = source
        .team(number)?
        .ok_or_else(|| SyncError::UnknownTeam(number.to_string()))?;

    let event_count = source.events_attended(number, season)?;
    let rankings = source.rankings(number, season)?;
    let season_ranking = source.season_ranking(number, season)?;
    let skills = source.skills_runs(number, season)?;

    let averages = reduce_rankings(&rankings, event_count);
    let peaks = reduce_skills(&skills);
    let (vrating_rank, vrating) = match season_ranking {
        Some(ranking) => (ranking.vrating_rank, ranking.vrating),
        None => (0, 0.0),
    };

    let number = if record.number.trim().is_empty() {
        number.to_string()
    } else {
        record.number
    };

    Ok(TeamProfile {
        number,
        opr: averages.opr,
        dpr: averages.dpr,
        ccwm: averages.ccwm,
        ap: averages.ap,
        sp: averages.sp,
        trsp: averages.trsp,
        vrating_rank,
        vrating,
        avg_rank: averages.rank,
        skills_driver: peaks.driver,
        skills_programming: peaks.programming,
        skills_combined: peaks.combined,
        max_match_score: averages.max_match_score,
        event_count,
    })
}
