use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use chrono::NaiveDate;

use vexsheet::auth::{self, SheetCredentials};
use vexsheet::event::Eligibility;
use vexsheet::pipeline::{self, Progress, RunConfig};
use vexsheet::sheet::SheetsClient;
use vexsheet::vexdb::{EventRecord, VexDb};

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");

    if std::env::args().any(|arg| arg == "--help" || arg == "-h") {
        print_usage();
        return Ok(());
    }

    let Some(event_ref) = parse_event_arg() else {
        print_usage();
        return Err(anyhow!("no event link given"));
    };

    let config = RunConfig {
        event_ref,
        season_override: parse_flag_arg("--season").or_else(|| non_empty_env("VEX_SEASON")),
        write_delay: Duration::from_millis(write_delay_ms()),
    };

    let spreadsheet_id = parse_flag_arg("--sheet")
        .or_else(|| non_empty_env("SPREADSHEET_ID"))
        .context("no spreadsheet id; pass --sheet or set SPREADSHEET_ID")?;
    let credentials = credentials_from_env()?;

    let access_token = auth::fetch_access_token(&credentials)?;
    let source = VexDb::new();
    let sheet = SheetsClient::new(spreadsheet_id, access_token);

    let summary = pipeline::run(&config, &source, &sheet, &mut ConsoleProgress)?;

    println!();
    println!("Sync complete for {} ({})", summary.event_name, summary.sku);
    println!("Season: {}", summary.season);
    println!(
        "Rows written: {}/{} in {:.1}s",
        summary.rows_written,
        summary.roster_size,
        summary.elapsed.as_secs_f64()
    );
    if !summary.dropped_teams.is_empty() {
        println!(
            "Dropped (no team record): {}",
            summary.dropped_teams.join(", ")
        );
    }
    if !summary.row_failures.is_empty() {
        println!("Failed rows: {}", summary.row_failures.len());
        for failure in summary.row_failures.iter().take(6) {
            println!("  - {failure}");
        }
    }

    if !summary.clean() {
        return Err(anyhow!(
            "completed with {} dropped team(s) and {} failed row(s)",
            summary.dropped_teams.len(),
            summary.row_failures.len()
        ));
    }
    Ok(())
}

struct ConsoleProgress;

impl Progress for ConsoleProgress {
    fn event_loaded(&mut self, event: &EventRecord, season: &str) {
        println!("Event: {} ({})", event.name, event.sku);
        println!("Season: {season}");
        println!("Venue: {}", event.venue);
        println!(
            "Location: {}, {} {} {}, {}",
            event.address, event.city, event.region, event.postcode, event.country
        );
    }

    fn eligibility_checked(
        &mut self,
        today: NaiveDate,
        event_date: NaiveDate,
        check: &Eligibility,
    ) {
        println!("Event date: {event_date} (today {today})");
        if check.eligible {
            println!("Roster opened {}", check.cutoff);
        } else {
            println!(
                "Roster locked until {} ({} day(s) remaining)",
                check.cutoff, check.days_remaining
            );
        }
    }

    fn roster_loaded(&mut self, teams: usize) {
        println!("Teams registered: {teams}");
    }

    fn team_aggregated(&mut self, number: &str, elapsed: Duration) {
        println!("  {:<10} {}ms", number, elapsed.as_millis());
    }

    fn team_dropped(&mut self, number: &str) {
        println!("  {number:<10} skipped: no team record");
    }

    fn sheet_rows_found(&mut self, teams: usize) {
        println!("Sheet rows with team numbers: {teams}");
    }

    fn row_written(&mut self, row: u32, number: &str, updated_cells: u32) {
        println!("  row {row:<4} {number:<10} {updated_cells} cells");
    }

    fn row_failed(&mut self, row: u32, number: &str, message: &str) {
        println!("  row {row:<4} {number:<10} FAILED: {message}");
    }
}

fn print_usage() {
    println!(
        "usage: vexsheet <event-link> [--season <name>] [--sheet <spreadsheet-id>] [--write-delay-ms <n>]"
    );
    println!("env: SPREADSHEET_ID, VEX_SEASON, SHEET_WRITE_DELAY_MS,");
    println!("     GOOGLE_CLIENT_ID, GOOGLE_CLIENT_SECRET, GOOGLE_REFRESH_TOKEN");
}

fn parse_event_arg() -> Option<String> {
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let mut skip_next = false;
    for arg in &args {
        if skip_next {
            skip_next = false;
            continue;
        }
        if matches!(arg.as_str(), "--season" | "--sheet" | "--write-delay-ms") {
            skip_next = true;
            continue;
        }
        if arg.starts_with("--") {
            continue;
        }
        let trimmed = arg.trim();
        if !trimmed.is_empty() {
            return Some(trimmed.to_string());
        }
    }
    None
}

fn parse_flag_arg(flag: &str) -> Option<String> {
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let prefix = format!("{flag}=");
    for (idx, arg) in args.iter().enumerate() {
        if let Some(value) = arg.strip_prefix(&prefix) {
            let trimmed = value.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
        if arg == flag
            && let Some(next) = args.get(idx + 1)
            && !next.trim().is_empty()
        {
            return Some(next.trim().to_string());
        }
    }
    None
}

fn write_delay_ms() -> u64 {
    parse_flag_arg("--write-delay-ms")
        .or_else(|| std::env::var("SHEET_WRITE_DELAY_MS").ok())
        .and_then(|val| val.parse::<u64>().ok())
        .unwrap_or(1000)
        .min(60_000)
}

fn credentials_from_env() -> Result<SheetCredentials> {
    Ok(SheetCredentials {
        client_id: required_env("GOOGLE_CLIENT_ID")?,
        client_secret: required_env("GOOGLE_CLIENT_SECRET")?,
        refresh_token: required_env("GOOGLE_REFRESH_TOKEN")?,
    })
}

fn required_env(key: &str) -> Result<String> {
    let value = std::env::var(key).unwrap_or_default();
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(anyhow!("{key} is not set"));
    }
    Ok(trimmed.to_string())
}

fn non_empty_env(key: &str) -> Option<String> {
    let value = std::env::var(key).ok()?;
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
