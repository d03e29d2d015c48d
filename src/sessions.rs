use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::events::leading_steam_id;
use crate::log_line::parse_log_timestamp;

const SESSION_GAP_MINUTES: i64 = 30;
const FALLBACK_PADDING_MINUTES: i64 = 15;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionAction {
    Connected,
    Disconnected,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionEvent {
    pub action: SessionAction,
    pub name: String,
    pub player_id: String,
    pub instant: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Session {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Session {
    pub fn duration_ms(&self) -> i64 {
        (self.end - self.start).num_milliseconds()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaytimeRecord {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub total_ms: i64,
    #[serde(default)]
    pub sessions: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_seen: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_login: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_seen: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaytimeDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tracking_since: Option<DateTime<Utc>>,
    #[serde(default)]
    pub estimated: bool,
    #[serde(default)]
    pub players: BTreeMap<String, PlaytimeRecord>,
    // Written by a separate live-tracking collaborator; threaded through
    // verbatim, never computed or validated here.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub peaks: Option<serde_json::Value>,
}

impl PlaytimeDocument {
    pub fn from_json(raw_json: &str) -> Result<Self, String> {
        serde_json::from_str(raw_json)
            .map_err(|error| format!("Failed to parse playtime document: {error}"))
    }

    pub fn to_json(&self) -> Result<String, String> {
        serde_json::to_string_pretty(self)
            .map_err(|error| format!("Failed to serialize playtime document: {error}"))
    }
}

#[derive(Debug, Clone, Default)]
pub struct PlayerActivity {
    pub name: String,
    pub instants: Vec<DateTime<Utc>>,
}

#[derive(Debug, Default)]
pub struct SessionReconstruction {
    pub records: BTreeMap<String, PlaytimeRecord>,
    pub sessions: BTreeMap<String, Vec<Session>>,
    pub connects: BTreeMap<String, u32>,
    pub disconnects: BTreeMap<String, u32>,
    pub estimated: bool,
}

pub fn parse_connect_line(line: &str) -> Option<SessionEvent> {
    let trimmed_line = line.trim_start_matches('\u{feff}').trim();
    let rest = trimmed_line.strip_prefix("Player ")?;

    let (action, rest) = if let Some(rest) = rest.strip_prefix("Connected ") {
        (SessionAction::Connected, rest)
    } else if let Some(rest) = rest.strip_prefix("Disconnected ") {
        (SessionAction::Disconnected, rest)
    } else {
        return None;
    };

    let (name_section, id_section) = rest.split_once(" NetID(")?;
    let player_id = leading_steam_id(id_section)?;

    let timestamp_open = id_section.rfind('(')?;
    let raw_timestamp = id_section[timestamp_open + 1..].trim_end();
    let raw_timestamp = raw_timestamp.strip_suffix(')').unwrap_or(raw_timestamp);
    let instant = parse_log_timestamp(raw_timestamp)?;

    let name = name_section.trim();
    if name.is_empty() {
        return None;
    }

    Some(SessionEvent {
        action,
        name: name.to_string(),
        player_id,
        instant,
    })
}

pub fn parse_connect_log(connect_log: &str) -> Vec<SessionEvent> {
    connect_log.lines().filter_map(parse_connect_line).collect()
}

// Pairs connect/disconnect events in file order. Unmatched disconnects still
// count; a still-open session closes at the instant of the last event in the
// whole feed, never at processing time.
pub fn reconstruct_sessions(events: &[SessionEvent]) -> SessionReconstruction {
    let mut reconstruction = SessionReconstruction::default();
    let last_feed_instant = events.last().map(|event| event.instant);
    let mut open_starts: BTreeMap<String, DateTime<Utc>> = BTreeMap::new();

    for event in events {
        let record = reconstruction
            .records
            .entry(event.player_id.clone())
            .or_default();
        record.name = event.name.clone();
        record.first_seen = Some(match record.first_seen {
            Some(first_seen) => first_seen.min(event.instant),
            None => event.instant,
        });
        record.last_seen = Some(match record.last_seen {
            Some(last_seen) => last_seen.max(event.instant),
            None => event.instant,
        });

        match event.action {
            SessionAction::Connected => {
                *reconstruction
                    .connects
                    .entry(event.player_id.clone())
                    .or_insert(0) += 1;
                record.last_login = Some(match record.last_login {
                    Some(last_login) => last_login.max(event.instant),
                    None => event.instant,
                });
                open_starts.insert(event.player_id.clone(), event.instant);
            }
            SessionAction::Disconnected => {
                *reconstruction
                    .disconnects
                    .entry(event.player_id.clone())
                    .or_insert(0) += 1;
                if let Some(start) = open_starts.remove(&event.player_id) {
                    if event.instant > start {
                        reconstruction
                            .sessions
                            .entry(event.player_id.clone())
                            .or_default()
                            .push(Session {
                                start,
                                end: event.instant,
                            });
                    }
                }
            }
        }
    }

    if let Some(feed_end) = last_feed_instant {
        for (player_id, start) in open_starts {
            if feed_end > start {
                reconstruction
                    .sessions
                    .entry(player_id)
                    .or_default()
                    .push(Session {
                        start,
                        end: feed_end,
                    });
            }
        }
    }

    apply_session_totals(&mut reconstruction);
    reconstruction
}

// Best-effort estimate when no connect log exists: activity instants are
// clustered with a 30-minute gap threshold and each cluster is padded by a
// fixed 15 minutes of assumed surrounding activity.
pub fn estimate_sessions(activity: &BTreeMap<String, PlayerActivity>) -> SessionReconstruction {
    let gap_threshold = Duration::minutes(SESSION_GAP_MINUTES);
    let padding = Duration::minutes(FALLBACK_PADDING_MINUTES);

    let mut reconstruction = SessionReconstruction {
        estimated: true,
        ..SessionReconstruction::default()
    };

    for (player_id, trace) in activity {
        if trace.instants.is_empty() {
            continue;
        }

        let mut instants = trace.instants.clone();
        instants.sort_unstable();

        let mut clusters: Vec<(DateTime<Utc>, DateTime<Utc>)> = Vec::new();
        let mut cluster_start = instants[0];
        let mut previous = instants[0];
        for &instant in &instants[1..] {
            if instant - previous > gap_threshold {
                clusters.push((cluster_start, previous));
                cluster_start = instant;
            }
            previous = instant;
        }
        clusters.push((cluster_start, previous));

        let sessions = clusters
            .iter()
            .map(|&(start, end)| Session {
                start,
                end: end + padding,
            })
            .collect::<Vec<Session>>();

        let record = PlaytimeRecord {
            name: trace.name.clone(),
            total_ms: 0,
            sessions: 0,
            first_seen: instants.first().copied(),
            last_login: clusters.last().map(|&(start, _)| start),
            last_seen: instants.last().copied(),
        };

        reconstruction.records.insert(player_id.clone(), record);
        reconstruction.sessions.insert(player_id.clone(), sessions);
    }

    apply_session_totals(&mut reconstruction);
    reconstruction
}

fn apply_session_totals(reconstruction: &mut SessionReconstruction) {
    for (player_id, sessions) in &reconstruction.sessions {
        let Some(record) = reconstruction.records.get_mut(player_id) else {
            continue;
        };

        record.total_ms = sessions.iter().map(Session::duration_ms).sum();
        record.sessions = sessions.len() as u32;
    }
}
