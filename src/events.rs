use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};

use crate::damage::{classify_damage_source, DamageSource};

const STEAM_ID_DIGITS: usize = 17;
const ITEM_STRUCTURAL_PREFIX: &str = "Construction_";
const ITEM_STRUCTURAL_SUFFIX: &str = "_C";
const SPEED_ANOMALY_PREFIX: &str = "Speed anomaly detected";
const TELEPORT_ANOMALY_PREFIX: &str = "Teleport anomaly detected";
const DESTROYED_MARKER: &str = "(Destroyed)";

// Building damage attributed to these tokens is upkeep decay, not a raid.
const RAID_ENVIRONMENT_ACTORS: &[&str] = &["decay"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheatFlagKind {
    Speed,
    Teleport,
}

#[derive(Debug, Clone, PartialEq)]
pub enum GameEvent {
    Death {
        name: String,
    },
    Build {
        name: String,
        player_id: String,
        item: String,
    },
    Damage {
        name: String,
        source: DamageSource,
    },
    Loot {
        name: String,
        player_id: String,
        owner_id: String,
    },
    Raid {
        attacker_name: String,
        attacker_id: Option<String>,
        owner_id: String,
        destroyed: bool,
    },
    AdminAccess {
        name: String,
    },
    CheatFlag {
        name: String,
        player_id: String,
        kind: CheatFlagKind,
    },
}

pub(crate) struct EventRule {
    pub(crate) name: &'static str,
    pub(crate) parse: fn(&str) -> Option<GameEvent>,
}

lazy_static! {
    // First match wins; later rules are never attempted once one matches.
    pub(crate) static ref EVENT_RULES: Vec<EventRule> = vec![
        EventRule { name: "death", parse: parse_death },
        EventRule { name: "build", parse: parse_build },
        EventRule { name: "damage", parse: parse_damage },
        EventRule { name: "loot", parse: parse_loot },
        EventRule { name: "raid", parse: parse_raid },
        EventRule { name: "admin_access", parse: parse_admin_access },
        EventRule { name: "cheat_flag", parse: parse_cheat_flag },
    ];
}

pub fn classify_event(body: &str) -> Option<GameEvent> {
    EVENT_RULES.iter().find_map(|rule| (rule.parse)(body))
}

fn parse_death(body: &str) -> Option<GameEvent> {
    let rest = body.strip_prefix("Player died (")?;
    let name = rest.strip_suffix(')').unwrap_or(rest).trim();
    if name.is_empty() {
        return None;
    }

    Some(GameEvent::Death {
        name: name.to_string(),
    })
}

fn parse_build(body: &str) -> Option<GameEvent> {
    let (actor_section, raw_item) = body.split_once(" finished building ")?;
    let (name, player_id) = extract_actor_identity(actor_section)?;

    let mut item = simplify_item_name(raw_item);
    if item.is_empty() {
        item = raw_item.trim().to_string();
    }
    if item.is_empty() {
        return None;
    }

    Some(GameEvent::Build {
        name,
        player_id,
        item,
    })
}

fn parse_damage(body: &str) -> Option<GameEvent> {
    let (name_section, rest) = body.split_once(" took ")?;
    let (raw_amount, raw_source) = rest.split_once(" damage from ")?;

    let amount = raw_amount.trim().parse::<f64>().ok()?;
    if amount <= 0.0 {
        return None;
    }

    let name = name_section.trim();
    let source = raw_source.trim();
    if name.is_empty() || source.is_empty() {
        return None;
    }

    Some(GameEvent::Damage {
        name: name.to_string(),
        source: classify_damage_source(source),
    })
}

fn parse_loot(body: &str) -> Option<GameEvent> {
    let (actor_section, rest) = body.split_once(" looted a container ")?;
    let (name, player_id) = extract_actor_identity(actor_section)?;

    let (_, owner_section) = rest.split_once(" owner by ")?;
    let owner_id = leading_steam_id(owner_section)?;
    if owner_id == player_id {
        return None;
    }

    Some(GameEvent::Loot {
        name,
        player_id,
        owner_id,
    })
}

fn parse_raid(body: &str) -> Option<GameEvent> {
    let rest = body.strip_prefix("Building (")?;
    let (_, rest) = rest.split_once(") owned by (")?;
    let (owner_section, rest) = rest.split_once(')')?;
    let owner_id = leading_steam_id(owner_section)?;

    let rest = rest.trim_start().strip_prefix("damaged (")?;
    let (_, rest) = rest.split_once(')')?;
    let attacker_section = rest.trim_start().strip_prefix("by ")?;

    let (attacker_section, destroyed) = match attacker_section.strip_suffix(DESTROYED_MARKER) {
        Some(stripped) => (stripped.trim_end(), true),
        None => (attacker_section.trim_end(), false),
    };

    let (attacker_name, attacker_id) = match extract_actor_identity(attacker_section) {
        Some((name, player_id)) => (name, Some(player_id)),
        None => (attacker_section.trim().to_string(), None),
    };
    if attacker_name.is_empty() {
        return None;
    }
    if is_environment_raid_actor(&attacker_name) {
        return None;
    }
    if attacker_id.as_deref() == Some(owner_id.as_str()) {
        return None;
    }

    Some(GameEvent::Raid {
        attacker_name,
        attacker_id,
        owner_id,
        destroyed,
    })
}

fn parse_admin_access(body: &str) -> Option<GameEvent> {
    let name = body.strip_suffix(" gained admin access!")?.trim();
    if name.is_empty() {
        return None;
    }

    Some(GameEvent::AdminAccess {
        name: name.to_string(),
    })
}

fn parse_cheat_flag(body: &str) -> Option<GameEvent> {
    let (kind, rest) = if let Some(rest) = body.strip_prefix(SPEED_ANOMALY_PREFIX) {
        (CheatFlagKind::Speed, rest)
    } else if let Some(rest) = body.strip_prefix(TELEPORT_ANOMALY_PREFIX) {
        (CheatFlagKind::Teleport, rest)
    } else {
        return None;
    };

    // The upstream writer sometimes truncates the closing parenthesis, so
    // only the opening shape is required.
    let (_, identity_section) = rest.split_once('(')?;
    let (name_section, id_section) = identity_section.split_once(" - ")?;
    let player_id = leading_steam_id(id_section)?;

    let name = name_section.trim();
    if name.is_empty() {
        return None;
    }

    Some(GameEvent::CheatFlag {
        name: name.to_string(),
        player_id,
        kind,
    })
}

fn is_environment_raid_actor(attacker_name: &str) -> bool {
    let lowered_name = attacker_name.to_lowercase();
    if RAID_ENVIRONMENT_ACTORS
        .iter()
        .any(|actor| lowered_name.contains(actor))
    {
        return true;
    }

    classify_damage_source(attacker_name) != DamageSource::Player
}

fn extract_actor_identity(raw_actor: &str) -> Option<(String, String)> {
    let (name_section, id_section) = raw_actor.split_once('(')?;
    let player_id = leading_steam_id(id_section)?;

    let name = name_section.trim();
    if name.is_empty() {
        return None;
    }

    Some((name.to_string(), player_id))
}

pub(crate) fn leading_steam_id(raw: &str) -> Option<String> {
    let digits = raw
        .trim_start()
        .chars()
        .take_while(|character| character.is_ascii_digit())
        .collect::<String>();

    if digits.len() != STEAM_ID_DIGITS {
        return None;
    }

    Some(digits)
}

fn simplify_item_name(raw_item: &str) -> String {
    let mut item = raw_item.trim();
    item = item.strip_prefix(ITEM_STRUCTURAL_PREFIX).unwrap_or(item);

    if let Some((head, tail)) = item.rsplit_once('_') {
        if !tail.is_empty() && tail.chars().all(|character| character.is_ascii_digit()) {
            item = head;
        }
    }

    item = item.strip_suffix(ITEM_STRUCTURAL_SUFFIX).unwrap_or(item);
    item.replace('_', " ").trim().to_string()
}
