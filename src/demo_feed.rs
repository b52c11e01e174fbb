use std::collections::HashMap;

use anyhow::Result;
use rand::Rng;

use crate::arcsets::{TransferArc, YearlyDataset};
use crate::career::fallback_flag_url;
use crate::players::{CountryEntry, CountryIndex, DirectoryTransfer, PlayerDirectory, PlayerIdentity};
use crate::year_cache::ArcSource;

// Enough of the transfer market to make every filter path reachable
// offline: codes, names and arc anchor coordinates.
const COUNTRIES: &[(&str, &str, f64, f64)] = &[
    ("POR", "Portugal", 39.4, -8.2),
    ("ESP", "Spain", 40.4, -3.7),
    ("FRA", "France", 46.2, 2.2),
    ("ITA", "Italy", 41.9, 12.6),
    ("ENG", "England", 52.4, -1.5),
    ("GER", "Germany", 51.2, 10.5),
    ("NED", "Netherlands", 52.1, 5.3),
    ("BEL", "Belgium", 50.5, 4.5),
    ("BRA", "Brazil", -14.2, -51.9),
    ("ARG", "Argentina", -38.4, -63.6),
    ("URU", "Uruguay", -32.5, -55.8),
    ("MEX", "Mexico", 23.6, -102.5),
    ("USA", "United States", 37.1, -95.7),
    ("JPN", "Japan", 36.2, 138.3),
    ("TUR", "Turkey", 38.9, 35.2),
    ("SAU", "Saudi Arabia", 23.9, 45.1),
];

const FIRST_NAMES: &[&str] = &[
    "João", "Diego", "Marco", "Pierre", "James", "Lukas", "Sven", "Thiago", "Mateo", "Kenji",
    "Emre", "Rafael",
];

const LAST_NAMES: &[&str] = &[
    "Silva", "Costa", "Rossi", "Dubois", "Smith", "Müller", "Vries", "Santos", "García", "Tanaka",
    "Yilmaz", "Pereira",
];

/// Offline stand-in for the HTTP source, so the binary runs without any
/// data server. Selected with `DATA_SOURCE=demo`.
pub struct DemoArcSource;

impl DemoArcSource {
    fn coords(code: &str) -> Option<(f64, f64)> {
        COUNTRIES
            .iter()
            .find(|(c, _, _, _)| *c == code)
            .map(|(_, _, lat, lng)| (*lat, *lng))
    }
}

impl ArcSource for DemoArcSource {
    fn fetch_year(&self, year: u16) -> Result<YearlyDataset> {
        let mut rng = rand::thread_rng();
        let arc_count = rng.gen_range(12..=28);
        let mut arcs = Vec::with_capacity(arc_count);
        for _ in 0..arc_count {
            let from_idx = rng.gen_range(0..COUNTRIES.len());
            let mut to_idx = rng.gen_range(0..COUNTRIES.len());
            if to_idx == from_idx {
                to_idx = (to_idx + 1) % COUNTRIES.len();
            }
            let (from, _, start_lat, start_lng) = COUNTRIES[from_idx];
            let (to, _, end_lat, end_lng) = COUNTRIES[to_idx];

            let count = rng.gen_range(1..=14) as u32;
            let players = (0..count.min(5))
                .map(|_| {
                    format!(
                        "{} {}",
                        FIRST_NAMES[rng.gen_range(0..FIRST_NAMES.len())],
                        LAST_NAMES[rng.gen_range(0..LAST_NAMES.len())]
                    )
                })
                .collect();

            arcs.push(TransferArc {
                from: from.to_string(),
                to: to.to_string(),
                start_lat,
                start_lng,
                end_lat,
                end_lng,
                count,
                players,
            });
        }
        Ok(YearlyDataset { year, arcs })
    }

    fn fetch_country_index(&self) -> Result<CountryIndex> {
        let entries = COUNTRIES
            .iter()
            .enumerate()
            .map(|(i, (code, name, lat, lng))| CountryEntry {
                id: i as u32 + 1,
                code: code.to_string(),
                name: name.to_string(),
                lat: *lat,
                lng: *lng,
            })
            .collect();
        Ok(CountryIndex::new(entries))
    }

    fn fetch_player_directory(&self) -> Result<PlayerDirectory> {
        let mut players = HashMap::new();
        for identity in seed_players() {
            players.insert(identity.id.clone(), identity);
        }
        Ok(PlayerDirectory::new(players))
    }
}

fn seed_players() -> Vec<PlayerIdentity> {
    vec![
        // Overlapping-season duplicate: the 1996 POR->ESP leg collapses
        // into the 1995 one.
        canonical_player(
            "demo-1",
            "João Figueira",
            &[
                (1993, "POR", "POR", "Sporting B", "Sporting"),
                (1995, "POR", "ESP", "Sporting", "Real Oviedo"),
                (1996, "POR", "ESP", "Sporting", "Real Oviedo"),
                (1999, "ESP", "ITA", "Real Oviedo", "Parma"),
                (2003, "ITA", "POR", "Parma", "Benfica"),
            ],
        ),
        canonical_player(
            "demo-2",
            "Mateo Ferreyra",
            &[
                (2004, "ARG", "BRA", "Newell's", "Santos"),
                (2007, "BRA", "ESP", "Santos", "Sevilla"),
                (2012, "ESP", "ENG", "Sevilla", "Everton"),
                (2016, "ENG", "USA", "Everton", "LA Galaxy"),
            ],
        ),
        canonical_player(
            "demo-3",
            "Kenji Watanabe",
            &[
                (2010, "JPN", "NED", "Kashima", "Heerenveen"),
                (2014, "NED", "GER", "Heerenveen", "Schalke"),
                (2019, "GER", "JPN", "Schalke", "Vissel Kobe"),
            ],
        ),
    ]
}

fn canonical_player(
    id: &str,
    name: &str,
    transfers: &[(u16, &str, &str, &str, &str)],
) -> PlayerIdentity {
    let mut country_flags = HashMap::new();
    for (_, from, to, _, _) in transfers {
        country_flags
            .entry(from.to_string())
            .or_insert_with(|| fallback_flag_url(from));
        country_flags
            .entry(to.to_string())
            .or_insert_with(|| fallback_flag_url(to));
    }
    PlayerIdentity {
        id: id.to_string(),
        name: name.to_string(),
        birth_date: None,
        position: None,
        transfers_id: Some(id.to_string()),
        country_flags,
        transfers: transfers
            .iter()
            .map(|(year, from, to, from_club, to_club)| DirectoryTransfer {
                year: *year,
                from: from.to_string(),
                to: to.to_string(),
                from_club: Some(from_club.to_string()),
                to_club: Some(to_club.to_string()),
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demo_year_arcs_resolve_against_demo_index() {
        let source = DemoArcSource;
        let index = source.fetch_country_index().expect("index");
        let dataset = source.fetch_year(2000).expect("year");
        assert!(!dataset.arcs.is_empty());
        for arc in &dataset.arcs {
            assert!(index.coords(&arc.from).is_some());
            assert!(index.coords(&arc.to).is_some());
            assert_ne!(arc.from, arc.to);
        }
        assert_eq!(DemoArcSource::coords("POR"), Some((39.4, -8.2)));
    }
}
