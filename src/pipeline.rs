use chrono::{DateTime, Utc};

use crate::events::classify_event;
use crate::identity::{load_identity_feed, IdentityMap, PlayerKey};
use crate::log_line::parse_log_line;
use crate::sessions::{
    estimate_sessions, parse_connect_log, reconstruct_sessions, PlaytimeDocument,
};
use crate::stats::merge::{merge_run, validate_against_store, ValidationReport};
use crate::stats::model::PlayerStatsDocument;
use crate::stats::StatsAccumulator;

#[derive(Debug, Clone, Copy, Default)]
pub struct AnalysisInputs<'a> {
    pub event_log: Option<&'a str>,
    pub connect_log: Option<&'a str>,
    pub identity_feed: Option<&'a str>,
    pub previous_stats: Option<&'a str>,
    pub previous_playtime: Option<&'a str>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseSummary {
    pub total_lines: usize,
    pub parsed_lines: usize,
    pub skipped_lines: usize,
    pub classified_events: usize,
    pub ignored_bodies: usize,
    pub unresolved_names: usize,
    pub earliest_event: Option<DateTime<Utc>>,
    pub latest_event: Option<DateTime<Utc>>,
}

#[derive(Debug)]
pub struct AnalysisOutcome {
    pub stats: PlayerStatsDocument,
    pub playtime: PlaytimeDocument,
    pub summary: ParseSummary,
}

struct RunState {
    stats: PlayerStatsDocument,
    playtime: PlaytimeDocument,
    summary: ParseSummary,
    previous_stats: Option<PlayerStatsDocument>,
}

pub fn run_analysis(inputs: &AnalysisInputs) -> Result<AnalysisOutcome, String> {
    let state = compute_run_state(inputs)?;

    Ok(AnalysisOutcome {
        stats: state.stats,
        playtime: state.playtime,
        summary: state.summary,
    })
}

// Dry-run comparison against the last-persisted store; computes the same
// fresh state as `run_analysis` but writes nothing.
pub fn validate_run(inputs: &AnalysisInputs) -> Result<ValidationReport, String> {
    let state = compute_run_state(inputs)?;
    let persisted = state.previous_stats.unwrap_or_default();

    Ok(validate_against_store(&state.stats, &persisted))
}

fn compute_run_state(inputs: &AnalysisInputs) -> Result<RunState, String> {
    let event_log = inputs
        .event_log
        .ok_or_else(|| "Event log input is required; nothing can be computed without it".to_string())?;

    let previous_stats = match inputs.previous_stats {
        Some(raw_json) => Some(PlayerStatsDocument::from_json(raw_json)?),
        None => None,
    };
    let previous_playtime = match inputs.previous_playtime {
        Some(raw_json) => Some(PlaytimeDocument::from_json(raw_json)?),
        None => None,
    };

    let mut accumulator = StatsAccumulator::new();
    let mut summary = ParseSummary::default();

    for line in event_log.lines() {
        summary.total_lines += 1;

        let Some(parsed_line) = parse_log_line(line) else {
            summary.skipped_lines += 1;
            continue;
        };
        summary.parsed_lines += 1;

        match classify_event(parsed_line.body) {
            Some(event) => {
                summary.classified_events += 1;
                accumulator.consume(parsed_line.instant, event);
            }
            None => summary.ignored_bodies += 1,
        }
    }

    if summary.skipped_lines > 0 {
        tracing::debug!(
            skipped_lines = summary.skipped_lines,
            total_lines = summary.total_lines,
            "Skipped lines outside the log envelope"
        );
    }

    let reconstruction = match inputs.connect_log {
        Some(connect_log) => reconstruct_sessions(&parse_connect_log(connect_log)),
        None => {
            tracing::warn!(
                "No connect log provided; estimating playtime from activity clustering"
            );
            estimate_sessions(&accumulator.activity())
        }
    };

    let mut identity_map = IdentityMap::new();
    match inputs.identity_feed {
        Some(feed) => {
            load_identity_feed(&mut identity_map, feed);
        }
        None => {
            tracing::warn!(
                "No identifier feed provided; name resolution limited to log-observed identities"
            );
        }
    }
    for (key, record) in accumulator.records() {
        if let PlayerKey::Durable(player_id) = key {
            identity_map.insert(&record.name, player_id);
        }
    }
    for (player_id, record) in &reconstruction.records {
        identity_map.insert(&record.name, player_id);
    }
    if let Some(previous) = &previous_playtime {
        for (player_id, record) in &previous.players {
            identity_map.insert(&record.name, player_id);
        }
    }

    summary.earliest_event = accumulator.earliest_event();
    summary.latest_event = accumulator.latest_event();

    let stats = merge_run(accumulator.into_records(), &identity_map, &reconstruction);
    summary.unresolved_names = stats.unresolved_keys().len();

    let tracking_since = previous_playtime
        .as_ref()
        .and_then(|document| document.tracking_since)
        .or(summary.earliest_event);
    let peaks = previous_playtime
        .as_ref()
        .and_then(|document| document.peaks.clone());

    let playtime = PlaytimeDocument {
        tracking_since,
        estimated: reconstruction.estimated,
        players: reconstruction.records,
        peaks,
    };

    Ok(RunState {
        stats,
        playtime,
        summary,
        previous_stats,
    })
}
