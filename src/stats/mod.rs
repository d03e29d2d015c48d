pub mod merge;
pub mod model;

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};

use crate::events::GameEvent;
use crate::identity::PlayerKey;
use crate::sessions::PlayerActivity;
use model::{CheatFlag, PlayerRecord};

// One mutable accumulator owned by the run. Identifier-carrying events pin
// records to durable keys; name-only events resolve against the current names
// of known durable records, falling back to a provisional name-keyed record.
#[derive(Debug, Default)]
pub struct StatsAccumulator {
    records: BTreeMap<PlayerKey, PlayerRecord>,
    name_index: HashMap<String, String>,
    activity: BTreeMap<String, Vec<DateTime<Utc>>>,
    earliest_event: Option<DateTime<Utc>>,
    latest_event: Option<DateTime<Utc>>,
}

impl StatsAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn consume(&mut self, instant: DateTime<Utc>, event: GameEvent) {
        self.observe_instant(instant);

        match event {
            GameEvent::Death { name } => {
                let record = self.record_for_name(&name);
                record.deaths += 1;
                record.touch(instant);
            }
            GameEvent::Build {
                name,
                player_id,
                item,
            } => {
                let record = self.record_for_id(&player_id, &name);
                record.builds += 1;
                *record.build_items.entry(item).or_insert(0) += 1;
                record.touch(instant);
                self.record_activity(&player_id, instant);
            }
            GameEvent::Damage { name, source } => {
                let record = self.record_for_name(&name);
                *record
                    .damage_taken
                    .entry(source.label().to_string())
                    .or_insert(0) += 1;
                record.touch(instant);
            }
            GameEvent::Loot {
                name, player_id, ..
            } => {
                let record = self.record_for_id(&player_id, &name);
                record.containers_looted += 1;
                record.touch(instant);
                self.record_activity(&player_id, instant);
            }
            GameEvent::Raid {
                attacker_name,
                attacker_id,
                owner_id,
                destroyed,
            } => {
                if let Some(attacker_id) = attacker_id {
                    let record = self.record_for_id(&attacker_id, &attacker_name);
                    record.raids_out += 1;
                    if destroyed {
                        record.destroyed_out += 1;
                    }
                    record.touch(instant);
                    self.record_activity(&attacker_id, instant);
                }

                // An owner never seen before in this log is not retroactively
                // created from a raid event.
                if let Some(record) = self.records.get_mut(&PlayerKey::Durable(owner_id)) {
                    record.raids_in += 1;
                    if destroyed {
                        record.destroyed_in += 1;
                    }
                    record.touch(instant);
                }
            }
            GameEvent::AdminAccess { name } => {
                let record = self.record_for_name(&name);
                record.admin_access += 1;
                record.touch(instant);
            }
            GameEvent::CheatFlag {
                name,
                player_id,
                kind,
            } => {
                let record = self.record_for_id(&player_id, &name);
                record.cheat_flags.push(CheatFlag {
                    kind,
                    timestamp: instant,
                });
                record.touch(instant);
            }
        }
    }

    pub fn records(&self) -> &BTreeMap<PlayerKey, PlayerRecord> {
        &self.records
    }

    pub(crate) fn into_records(self) -> BTreeMap<PlayerKey, PlayerRecord> {
        self.records
    }

    pub fn earliest_event(&self) -> Option<DateTime<Utc>> {
        self.earliest_event
    }

    pub fn latest_event(&self) -> Option<DateTime<Utc>> {
        self.latest_event
    }

    // Activity instants for the fallback playtime estimator: builds, loots
    // and outgoing raids only.
    pub fn activity(&self) -> BTreeMap<String, PlayerActivity> {
        self.activity
            .iter()
            .map(|(player_id, instants)| {
                let name = self
                    .records
                    .get(&PlayerKey::Durable(player_id.clone()))
                    .map(|record| record.name.clone())
                    .unwrap_or_default();

                (
                    player_id.clone(),
                    PlayerActivity {
                        name,
                        instants: instants.clone(),
                    },
                )
            })
            .collect()
    }

    fn record_for_id(&mut self, player_id: &str, name: &str) -> &mut PlayerRecord {
        let key = PlayerKey::Durable(player_id.to_string());

        if let Some(existing) = self.records.get(&key) {
            if existing.name != name && !existing.name.is_empty() {
                self.name_index.remove(&existing.name.trim().to_lowercase());
            }
        }
        self.name_index
            .insert(name.trim().to_lowercase(), player_id.to_string());

        let record = self.records.entry(key).or_default();
        record.rename(name);
        record
    }

    fn record_for_name(&mut self, name: &str) -> &mut PlayerRecord {
        if let Some(player_id) = self.name_index.get(&name.trim().to_lowercase()).cloned() {
            return self.records.entry(PlayerKey::Durable(player_id)).or_default();
        }

        self.records
            .entry(PlayerKey::provisional(name))
            .or_insert_with(|| PlayerRecord::named(name.trim()))
    }

    fn record_activity(&mut self, player_id: &str, instant: DateTime<Utc>) {
        self.activity
            .entry(player_id.to_string())
            .or_default()
            .push(instant);
    }

    fn observe_instant(&mut self, instant: DateTime<Utc>) {
        self.earliest_event = Some(match self.earliest_event {
            Some(earliest) => earliest.min(instant),
            None => instant,
        });
        self.latest_event = Some(match self.latest_event {
            Some(latest) => latest.max(instant),
            None => instant,
        });
    }
}
