use std::collections::HashMap;
use std::env;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use once_cell::sync::OnceCell;
use reqwest::blocking::Client;
use serde::Deserialize;

use crate::arcsets::{TransferArc, YearlyDataset};
use crate::players::{
    clean_display_name, CountryEntry, CountryIndex, DirectoryTransfer, PlayerDirectory,
    PlayerIdentity,
};
use crate::year_cache::ArcSource;

const REQUEST_TIMEOUT_SECS: u64 = 10;
const DEFAULT_BASE_URL: &str = "http://localhost:8080/files";

static CLIENT: OnceCell<Client> = OnceCell::new();

fn http_client() -> Result<&'static Client> {
    CLIENT.get_or_try_init(|| {
        Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .context("failed to build http client")
    })
}

/// Fetches yearly arc files, the country map and the player directory over
/// HTTP. The base URL comes from `DATA_BASE_URL`.
pub struct HttpArcSource {
    base_url: String,
}

impl HttpArcSource {
    pub fn from_env() -> Self {
        let base_url = env::var("DATA_BASE_URL")
            .ok()
            .map(|v| v.trim().trim_end_matches('/').to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        Self { base_url }
    }

    fn fetch_body(&self, path: &str) -> Result<String> {
        let client = http_client()?;
        let url = format!("{}/{}", self.base_url, path);
        let resp = client
            .get(&url)
            .send()
            .with_context(|| format!("request failed: {url}"))?;
        let status = resp.status();
        let body = resp.text().context("failed reading body")?;
        if !status.is_success() {
            return Err(anyhow::anyhow!("http {status}: {url}"));
        }
        Ok(body)
    }
}

impl ArcSource for HttpArcSource {
    fn fetch_year(&self, year: u16) -> Result<YearlyDataset> {
        let body = self.fetch_body(&format!("arcs/lines_{year}.json"))?;
        let arcs = parse_lines_json(&body).with_context(|| format!("lines_{year}.json"))?;
        Ok(YearlyDataset { year, arcs })
    }

    fn fetch_country_index(&self) -> Result<CountryIndex> {
        let body = self.fetch_body("map.json")?;
        parse_map_json(&body).context("map.json")
    }

    fn fetch_player_directory(&self) -> Result<PlayerDirectory> {
        let body = self.fetch_body("players.json")?;
        parse_players_json(&body).context("players.json")
    }
}

#[derive(Debug, Deserialize)]
struct LinesFile {
    #[serde(default)]
    arcs: Vec<TransferArc>,
}

pub fn parse_lines_json(raw: &str) -> Result<Vec<TransferArc>> {
    let file: LinesFile = serde_json::from_str(raw).context("invalid lines json")?;
    Ok(file.arcs)
}

#[derive(Debug, Deserialize)]
struct MapFile {
    #[serde(default)]
    coordinates: Vec<MapRow>,
}

#[derive(Debug, Deserialize)]
struct MapRow {
    id: u32,
    // `text` carries the country code in the map file.
    text: String,
    country: String,
    lat: f64,
    #[serde(alias = "long")]
    lng: f64,
}

pub fn parse_map_json(raw: &str) -> Result<CountryIndex> {
    let file: MapFile = serde_json::from_str(raw).context("invalid map json")?;
    let entries = file
        .coordinates
        .into_iter()
        .map(|row| CountryEntry {
            id: row.id,
            code: row.text,
            name: row.country,
            lat: row.lat,
            lng: row.lng,
        })
        .collect();
    Ok(CountryIndex::new(entries))
}

#[derive(Debug, Deserialize)]
struct PlayersFile {
    #[serde(default)]
    players: HashMap<String, RawPlayer>,
}

#[derive(Debug, Deserialize)]
struct RawPlayer {
    display_name: Option<String>,
    name: Option<String>,
    #[serde(rename = "birthDate")]
    birth_date: Option<String>,
    position: Option<String>,
    transfers_id: Option<NumOrStr>,
    #[serde(default)]
    country_flags: HashMap<String, String>,
    #[serde(default)]
    transfers: Vec<RawTransfer>,
}

#[derive(Debug, Deserialize)]
struct RawTransfer {
    year: Option<NumOrStr>,
    #[serde(alias = "from")]
    from_country: Option<String>,
    #[serde(alias = "to")]
    to_country: Option<String>,
    from_club_name: Option<String>,
    to_club_name: Option<String>,
}

// Directory exports are inconsistent about numeric fields; accept both.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum NumOrStr {
    Num(i64),
    Str(String),
}

impl NumOrStr {
    fn as_year(&self) -> Option<u16> {
        match self {
            NumOrStr::Num(n) => u16::try_from(*n).ok(),
            NumOrStr::Str(s) => s.trim().parse().ok(),
        }
    }

    fn into_string(self) -> String {
        match self {
            NumOrStr::Num(n) => n.to_string(),
            NumOrStr::Str(s) => s,
        }
    }
}

pub fn parse_players_json(raw: &str) -> Result<PlayerDirectory> {
    let file: PlayersFile = serde_json::from_str(raw).context("invalid players json")?;
    let mut players = HashMap::with_capacity(file.players.len());
    for (id, raw_player) in file.players {
        let display = raw_player
            .display_name
            .or(raw_player.name)
            .unwrap_or_else(|| id.clone());
        let transfers = raw_player
            .transfers
            .into_iter()
            .filter_map(|t| {
                Some(DirectoryTransfer {
                    year: t.year?.as_year()?,
                    from: t.from_country?,
                    to: t.to_country?,
                    from_club: t.from_club_name,
                    to_club: t.to_club_name,
                })
            })
            .collect();
        let identity = PlayerIdentity {
            id: id.clone(),
            name: clean_display_name(&display),
            birth_date: raw_player
                .birth_date
                .as_deref()
                .and_then(parse_birth_date),
            position: raw_player.position.filter(|p| !p.trim().is_empty()),
            transfers_id: raw_player.transfers_id.map(NumOrStr::into_string),
            country_flags: raw_player.country_flags,
            transfers,
        };
        players.insert(id, identity);
    }
    Ok(PlayerDirectory::new(players))
}

fn parse_birth_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(trimmed, "%d/%m/%Y"))
        .ok()
}
