use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::events::CheatFlagKind;

// Names that never resolved to a durable identifier are persisted under this
// prefix so no observed event is silently dropped.
pub const UNRESOLVED_KEY_PREFIX: &str = "unresolved:";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheatFlag {
    #[serde(rename = "type")]
    pub kind: CheatFlagKind,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerRecord {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub name_history: Vec<String>,
    #[serde(default)]
    pub deaths: u32,
    #[serde(default)]
    pub builds: u32,
    #[serde(default)]
    pub raids_out: u32,
    #[serde(default)]
    pub raids_in: u32,
    #[serde(default)]
    pub destroyed_out: u32,
    #[serde(default)]
    pub destroyed_in: u32,
    #[serde(default)]
    pub containers_looted: u32,
    #[serde(default)]
    pub connects: u32,
    #[serde(default)]
    pub disconnects: u32,
    #[serde(default)]
    pub admin_access: u32,
    #[serde(default)]
    pub build_items: BTreeMap<String, u32>,
    #[serde(default)]
    pub damage_taken: BTreeMap<String, u32>,
    #[serde(default)]
    pub cheat_flags: Vec<CheatFlag>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_event: Option<DateTime<Utc>>,
}

impl PlayerRecord {
    pub(crate) fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    // The latest observed display name wins; the previous one goes into the
    // history, which is append-only and never deduplicated.
    pub(crate) fn rename(&mut self, new_name: &str) {
        if self.name == new_name {
            return;
        }

        if !self.name.is_empty() {
            self.name_history.push(std::mem::take(&mut self.name));
        }
        self.name = new_name.to_string();
    }

    pub(crate) fn touch(&mut self, instant: DateTime<Utc>) {
        match self.last_event {
            Some(last_event) if last_event >= instant => {}
            _ => self.last_event = Some(instant),
        }
    }

    // Folds a provisional accumulation into this record: counters sum, the
    // tally maps merge, and lastEvent advances only if strictly later.
    pub(crate) fn absorb(&mut self, other: PlayerRecord) {
        self.deaths += other.deaths;
        self.builds += other.builds;
        self.raids_out += other.raids_out;
        self.raids_in += other.raids_in;
        self.destroyed_out += other.destroyed_out;
        self.destroyed_in += other.destroyed_in;
        self.containers_looted += other.containers_looted;
        self.connects += other.connects;
        self.disconnects += other.disconnects;
        self.admin_access += other.admin_access;

        for (item, count) in other.build_items {
            *self.build_items.entry(item).or_insert(0) += count;
        }
        for (source, count) in other.damage_taken {
            *self.damage_taken.entry(source).or_insert(0) += count;
        }
        self.cheat_flags.extend(other.cheat_flags);

        if let Some(instant) = other.last_event {
            self.touch(instant);
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerStatsDocument {
    #[serde(default)]
    pub players: BTreeMap<String, PlayerRecord>,
}

impl PlayerStatsDocument {
    pub fn from_json(raw_json: &str) -> Result<Self, String> {
        serde_json::from_str(raw_json)
            .map_err(|error| format!("Failed to parse player stats document: {error}"))
    }

    pub fn to_json(&self) -> Result<String, String> {
        serde_json::to_string_pretty(self)
            .map_err(|error| format!("Failed to serialize player stats document: {error}"))
    }

    pub fn unresolved_keys(&self) -> Vec<&str> {
        self.players
            .keys()
            .filter(|key| key.starts_with(UNRESOLVED_KEY_PREFIX))
            .map(String::as_str)
            .collect()
    }
}

pub fn unresolved_key_for(name: &str) -> String {
    format!("{UNRESOLVED_KEY_PREFIX}{name}")
}

#[cfg(test)]
mod tests {
    use super::{unresolved_key_for, CheatFlag, PlayerRecord, PlayerStatsDocument};
    use crate::events::CheatFlagKind;
    use chrono::{TimeZone, Utc};

    #[test]
    fn rename_appends_previous_names_without_deduplication() {
        let mut record = PlayerRecord::named("Bob");
        record.rename("Bobby");
        record.rename("Bob");
        record.rename("Bobby");

        assert_eq!(record.name, "Bobby");
        assert_eq!(record.name_history, vec!["Bob", "Bobby", "Bob"]);
    }

    #[test]
    fn touch_never_regresses() {
        let earlier = Utc.with_ymd_and_hms(2024, 6, 5, 10, 0, 0).unwrap();
        let later = Utc.with_ymd_and_hms(2024, 6, 5, 12, 0, 0).unwrap();

        let mut record = PlayerRecord::named("Bob");
        record.touch(later);
        record.touch(earlier);

        assert_eq!(record.last_event, Some(later));
    }

    #[test]
    fn absorb_sums_counters_and_merges_tallies() {
        let instant = Utc.with_ymd_and_hms(2024, 6, 5, 12, 0, 0).unwrap();

        let mut target = PlayerRecord::named("Bob");
        target.deaths = 2;
        target.damage_taken.insert("Runner".to_string(), 3);
        target.touch(instant);

        let mut provisional = PlayerRecord::named("bob");
        provisional.deaths = 1;
        provisional.admin_access = 1;
        provisional.damage_taken.insert("Runner".to_string(), 2);
        provisional.damage_taken.insert("Wolf".to_string(), 1);
        provisional.touch(instant);

        target.absorb(provisional);

        assert_eq!(target.deaths, 3);
        assert_eq!(target.admin_access, 1);
        assert_eq!(target.damage_taken.get("Runner").copied(), Some(5));
        assert_eq!(target.damage_taken.get("Wolf").copied(), Some(1));
        assert_eq!(
            target.last_event,
            Some(instant),
            "Equal instants must not regress lastEvent"
        );
    }

    #[test]
    fn documents_roundtrip_with_camel_case_keys() {
        let instant = Utc.with_ymd_and_hms(2024, 6, 5, 14, 30, 0).unwrap();

        let mut record = PlayerRecord::named("Bob");
        record.raids_out = 4;
        record.containers_looted = 2;
        record.build_items.insert("Wall Wood".to_string(), 7);
        record.cheat_flags.push(CheatFlag {
            kind: CheatFlagKind::Speed,
            timestamp: instant,
        });
        record.touch(instant);

        let mut document = PlayerStatsDocument::default();
        document
            .players
            .insert("76561198000000001".to_string(), record);

        let raw_json = document.to_json().expect("Expected document to serialize");
        assert!(raw_json.contains("\"raidsOut\": 4"));
        assert!(raw_json.contains("\"containersLooted\": 2"));
        assert!(raw_json.contains("\"nameHistory\""));
        assert!(raw_json.contains("\"type\": \"speed\""));

        let reloaded =
            PlayerStatsDocument::from_json(&raw_json).expect("Expected document to re-parse");
        assert_eq!(
            reloaded.players.get("76561198000000001"),
            document.players.get("76561198000000001")
        );
    }

    #[test]
    fn partial_documents_read_with_defaults() {
        let raw_json = r#"{"players":{"76561198000000001":{"name":"Bob","deaths":3}}}"#;

        let document =
            PlayerStatsDocument::from_json(raw_json).expect("Expected partial document to parse");
        let record = document
            .players
            .get("76561198000000001")
            .expect("Expected Bob's record");

        assert_eq!(record.deaths, 3);
        assert_eq!(record.builds, 0);
        assert!(record.build_items.is_empty());
        assert!(record.last_event.is_none());
    }

    #[test]
    fn unresolved_keys_are_marked_by_prefix() {
        let mut document = PlayerStatsDocument::default();
        document
            .players
            .insert(unresolved_key_for("Ghost"), PlayerRecord::named("Ghost"));
        document
            .players
            .insert("76561198000000001".to_string(), PlayerRecord::named("Bob"));

        assert_eq!(document.unresolved_keys(), vec!["unresolved:Ghost"]);
    }
}
