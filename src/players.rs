use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::arcsets::YearlyDataset;

/// One row of `map.json`: a country's code, display name and arc anchor
/// coordinates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CountryEntry {
    pub id: u32,
    pub code: String,
    pub name: String,
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone, Default)]
pub struct CountryIndex {
    by_code: HashMap<String, CountryEntry>,
    name_to_code: HashMap<String, String>,
}

impl CountryIndex {
    pub fn new(entries: Vec<CountryEntry>) -> Self {
        let mut by_code = HashMap::with_capacity(entries.len());
        let mut name_to_code = HashMap::with_capacity(entries.len());
        for entry in entries {
            name_to_code.insert(entry.name.clone(), entry.code.clone());
            by_code.insert(entry.code.clone(), entry);
        }
        Self {
            by_code,
            name_to_code,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.by_code.is_empty()
    }

    pub fn name_of(&self, code: &str) -> Option<&str> {
        self.by_code.get(code).map(|e| e.name.as_str())
    }

    pub fn code_of(&self, name: &str) -> Option<&str> {
        self.name_to_code.get(name).map(|c| c.as_str())
    }

    pub fn coords(&self, code: &str) -> Option<(f64, f64)> {
        self.by_code.get(code).map(|e| (e.lat, e.lng))
    }

    /// Coordinate lookup with the legacy fallback: when a code is missing
    /// from the map, scan cached arc endpoints for one that references it.
    pub fn coords_or_scan(
        &self,
        code: &str,
        years: &[Arc<YearlyDataset>],
    ) -> Option<(f64, f64)> {
        if let Some(coords) = self.coords(code) {
            return Some(coords);
        }
        for dataset in years {
            for arc in &dataset.arcs {
                if arc.from == code {
                    return Some((arc.start_lat, arc.start_lng));
                }
                if arc.to == code {
                    return Some((arc.end_lat, arc.end_lng));
                }
            }
        }
        None
    }

    pub fn sorted_codes(&self) -> Vec<String> {
        let mut codes: Vec<String> = self.by_code.keys().cloned().collect();
        codes.sort();
        codes
    }
}

/// A canonical transfer from the curated player directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryTransfer {
    pub year: u16,
    pub from: String,
    pub to: String,
    pub from_club: Option<String>,
    pub to_club: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerIdentity {
    pub id: String,
    pub name: String,
    pub birth_date: Option<NaiveDate>,
    pub position: Option<String>,
    pub transfers_id: Option<String>,
    pub country_flags: HashMap<String, String>,
    pub transfers: Vec<DirectoryTransfer>,
}

impl PlayerIdentity {
    /// Placeholder identity synthesized from a free-text name found in
    /// yearly arc data, used when no curated directory exists.
    pub fn placeholder(name: &str) -> Self {
        Self {
            id: format!("placeholder_{}", name.replace(char::is_whitespace, "_")),
            name: name.to_string(),
            birth_date: None,
            position: None,
            transfers_id: None,
            country_flags: HashMap::new(),
            transfers: Vec::new(),
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.id.starts_with("placeholder_")
    }

    /// Canonical transfer history sorted ascending by year, or `None` when
    /// the directory holds no transfers for this player.
    pub fn canonical_transfers(&self) -> Option<Vec<DirectoryTransfer>> {
        if self.transfers.is_empty() {
            return None;
        }
        let mut transfers = self.transfers.clone();
        transfers.sort_by_key(|t| t.year);
        Some(transfers)
    }
}

pub const SEARCH_RESULT_LIMIT: usize = 10;

#[derive(Debug, Clone, Default)]
pub struct PlayerDirectory {
    players: HashMap<String, PlayerIdentity>,
}

impl PlayerDirectory {
    pub fn new(players: HashMap<String, PlayerIdentity>) -> Self {
        Self { players }
    }

    /// Fallback construction when `players.json` is unavailable: synthesize
    /// placeholder identities from every player name seen in yearly data.
    pub fn synthesize_from_years(years: &[Arc<YearlyDataset>]) -> Self {
        let mut players = HashMap::new();
        for dataset in years {
            for arc in &dataset.arcs {
                for name in &arc.players {
                    let identity = PlayerIdentity::placeholder(name);
                    players.entry(identity.id.clone()).or_insert(identity);
                }
            }
        }
        Self { players }
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&PlayerIdentity> {
        self.players.get(id)
    }

    pub fn merge(&mut self, other: PlayerDirectory) {
        for (id, identity) in other.players {
            self.players.entry(id).or_insert(identity);
        }
    }

    /// Any flag URL the directory knows for a country code, regardless of
    /// which player's flag map it came from.
    pub fn flag_for(&self, code: &str) -> Option<String> {
        self.players
            .values()
            .find_map(|p| p.country_flags.get(code).cloned())
    }

    /// Accent- and case-insensitive substring search over display names,
    /// capped for the autocomplete popup. Results come back sorted by name
    /// so the popup is stable across keystrokes.
    pub fn search(&self, term: &str) -> Vec<&PlayerIdentity> {
        let needle = fold_for_search(term);
        if needle.len() < 2 {
            return Vec::new();
        }
        let mut hits: Vec<&PlayerIdentity> = self
            .players
            .values()
            .filter(|p| fold_for_search(&p.name).contains(&needle))
            .collect();
        hits.sort_by(|a, b| a.name.cmp(&b.name));
        hits.truncate(SEARCH_RESULT_LIMIT);
        hits
    }
}

/// Lowercase and strip the diacritics common in player names so that
/// "Jose" finds "José".
pub fn fold_for_search(raw: &str) -> String {
    raw.chars()
        .flat_map(|c| c.to_lowercase())
        .map(|c| match c {
            'á' | 'à' | 'â' | 'ã' | 'ä' | 'å' => 'a',
            'é' | 'è' | 'ê' | 'ë' => 'e',
            'í' | 'ì' | 'î' | 'ï' => 'i',
            'ó' | 'ò' | 'ô' | 'õ' | 'ö' => 'o',
            'ú' | 'ù' | 'û' | 'ü' => 'u',
            'ç' => 'c',
            'ñ' => 'n',
            'ý' | 'ÿ' => 'y',
            other => other,
        })
        .collect()
}

/// Strip a trailing parenthesised position from a directory display name,
/// e.g. "R. Costa (CM)" -> "R. Costa".
pub fn clean_display_name(raw: &str) -> String {
    let trimmed = raw.trim_end();
    if let Some(open) = trimmed.rfind('(') {
        if trimmed.ends_with(')') && open > 0 {
            return trimmed[..open].trim_end().to_string();
        }
    }
    trimmed.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(id: &str, name: &str) -> PlayerIdentity {
        PlayerIdentity {
            id: id.to_string(),
            name: name.to_string(),
            birth_date: None,
            position: None,
            transfers_id: None,
            country_flags: HashMap::new(),
            transfers: Vec::new(),
        }
    }

    #[test]
    fn search_folds_accents_and_caps_results() {
        let mut players = HashMap::new();
        for i in 0..20 {
            let p = identity(&format!("p{i}"), &format!("José Silva {i}"));
            players.insert(p.id.clone(), p);
        }
        let directory = PlayerDirectory::new(players);
        let hits = directory.search("jose si");
        assert_eq!(hits.len(), SEARCH_RESULT_LIMIT);
    }

    #[test]
    fn search_rejects_short_terms() {
        let mut players = HashMap::new();
        let p = identity("p1", "Bo");
        players.insert(p.id.clone(), p);
        let directory = PlayerDirectory::new(players);
        assert!(directory.search("b").is_empty());
    }

    #[test]
    fn display_name_cleanup() {
        assert_eq!(clean_display_name("R. Costa (CM)"), "R. Costa");
        assert_eq!(clean_display_name("Eusébio"), "Eusébio");
    }
}
