use std::collections::BTreeMap;

use crate::identity::{IdentityMap, PlayerKey};
use crate::sessions::SessionReconstruction;

use super::model::{unresolved_key_for, PlayerRecord, PlayerStatsDocument, UNRESOLVED_KEY_PREFIX};

// Validation compares the canonical document keys that drift in practice.
const TRACKED_FIELDS: &[&str] = &["deaths", "builds", "raidsOut", "containersLooted"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDiff {
    pub field: &'static str,
    pub previous: u32,
    pub current: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationFinding {
    Missing {
        key: String,
        name: String,
    },
    Diff {
        key: String,
        name: String,
        fields: Vec<FieldDiff>,
    },
}

#[derive(Debug, Default)]
pub struct ValidationReport {
    pub unresolved: Vec<String>,
    pub findings: Vec<ValidationFinding>,
}

impl ValidationReport {
    pub fn discrepancy_count(&self) -> usize {
        self.findings.len()
    }
}

// Reconciles the aggregated event view with the session reconstruction:
// resolved provisionals fold into their durable targets, connect/disconnect
// counters overlay by assignment (so re-merging the same inputs is a no-op),
// and names that never resolved persist under the synthetic prefix.
pub fn merge_run(
    records: BTreeMap<PlayerKey, PlayerRecord>,
    identity_map: &IdentityMap,
    reconstruction: &SessionReconstruction,
) -> PlayerStatsDocument {
    let mut players: BTreeMap<String, PlayerRecord> = BTreeMap::new();
    let mut provisionals: Vec<PlayerRecord> = Vec::new();

    for (key, record) in records {
        match key {
            PlayerKey::Durable(player_id) => {
                players.insert(player_id, record);
            }
            PlayerKey::Provisional(_) => provisionals.push(record),
        }
    }

    for record in provisionals {
        match identity_map.resolve(&record.name) {
            Some(player_id) => {
                let target = players
                    .entry(player_id.to_string())
                    .or_insert_with(|| PlayerRecord::named(&record.name));
                target.absorb(record);
            }
            None => {
                tracing::warn!(
                    name = %record.name,
                    "Player name never resolved to a durable identifier"
                );
                players.insert(unresolved_key_for(&record.name), record);
            }
        }
    }

    for (player_id, playtime_record) in &reconstruction.records {
        let record = players
            .entry(player_id.clone())
            .or_insert_with(|| PlayerRecord::named(&playtime_record.name));
        record.connects = reconstruction
            .connects
            .get(player_id)
            .copied()
            .unwrap_or(0);
        record.disconnects = reconstruction
            .disconnects
            .get(player_id)
            .copied()
            .unwrap_or(0);
    }

    PlayerStatsDocument { players }
}

pub fn validate_against_store(
    fresh: &PlayerStatsDocument,
    persisted: &PlayerStatsDocument,
) -> ValidationReport {
    let mut report = ValidationReport {
        unresolved: persisted
            .unresolved_keys()
            .into_iter()
            .map(str::to_string)
            .collect(),
        findings: Vec::new(),
    };

    for (key, record) in &fresh.players {
        if key.starts_with(UNRESOLVED_KEY_PREFIX) {
            continue;
        }

        let Some(previous) = persisted.players.get(key) else {
            report.findings.push(ValidationFinding::Missing {
                key: key.clone(),
                name: record.name.clone(),
            });
            continue;
        };

        let fields = TRACKED_FIELDS
            .iter()
            .filter_map(|&field| {
                let previous_value = tracked_value(previous, field);
                let current_value = tracked_value(record, field);
                (previous_value != current_value).then_some(FieldDiff {
                    field,
                    previous: previous_value,
                    current: current_value,
                })
            })
            .collect::<Vec<FieldDiff>>();

        if !fields.is_empty() {
            report.findings.push(ValidationFinding::Diff {
                key: key.clone(),
                name: record.name.clone(),
                fields,
            });
        }
    }

    report
}

fn tracked_value(record: &PlayerRecord, field: &str) -> u32 {
    match field {
        "deaths" => record.deaths,
        "builds" => record.builds,
        "raidsOut" => record.raids_out,
        "containersLooted" => record.containers_looted,
        _ => 0,
    }
}
