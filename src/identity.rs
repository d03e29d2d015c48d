use std::collections::HashMap;

use crate::events::leading_steam_id;

const FEED_ENTRY_SEPARATOR: &str = "_+_|";

// A player is either pinned to a durable platform identifier or, until
// resolution succeeds, tracked under the lower-cased display name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum PlayerKey {
    Durable(String),
    Provisional(String),
}

impl PlayerKey {
    pub fn provisional(name: &str) -> Self {
        PlayerKey::Provisional(name.trim().to_lowercase())
    }
}

#[derive(Debug, Default)]
pub struct IdentityMap {
    by_name: HashMap<String, String>,
}

impl IdentityMap {
    pub fn new() -> Self {
        Self::default()
    }

    // Earlier-established mappings win; later sources never overwrite.
    pub fn insert(&mut self, name: &str, player_id: &str) {
        let name_key = name.trim().to_lowercase();
        if name_key.is_empty() || player_id.is_empty() {
            return;
        }

        self.by_name
            .entry(name_key)
            .or_insert_with(|| player_id.to_string());
    }

    pub fn resolve(&self, name: &str) -> Option<&str> {
        self.by_name
            .get(&name.trim().to_lowercase())
            .map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct IdentityFeedSummary {
    pub parsed_entries: usize,
    pub skipped_entries: usize,
}

pub fn load_identity_feed(identity_map: &mut IdentityMap, feed: &str) -> IdentityFeedSummary {
    let mut summary = IdentityFeedSummary::default();

    for line in feed.lines() {
        let trimmed_line = line.trim_start_matches('\u{feff}').trim();
        if trimmed_line.is_empty() {
            continue;
        }

        match parse_identity_feed_line(trimmed_line) {
            Some((name, player_id)) => {
                identity_map.insert(&name, &player_id);
                summary.parsed_entries += 1;
            }
            None => summary.skipped_entries += 1,
        }
    }

    if summary.skipped_entries > 0 {
        tracing::debug!(
            skipped_entries = summary.skipped_entries,
            "Skipped malformed identity feed entries"
        );
    }

    summary
}

fn parse_identity_feed_line(line: &str) -> Option<(String, String)> {
    let (id_section, rest) = line.split_once(FEED_ENTRY_SEPARATOR)?;
    let player_id = leading_steam_id(id_section)?;

    let (_, name_section) = rest.split_once('@')?;
    let name = name_section.trim();
    if name.is_empty() {
        return None;
    }

    Some((name.to_string(), player_id))
}
