use std::fmt;

use serde::{Deserialize, Serialize};

use crate::state::FilterState;

pub const MIN_YEAR: u16 = 1950;
pub const MAX_YEAR: u16 = 2025;

/// Orange used for unfiltered arcs and incoming transfers.
pub const ARC_DEFAULT: Rgba = Rgba::opaque(0xF7, 0x6B, 0x15);
/// Blue used for outgoing transfers in single-country and pair views.
pub const ARC_EXIT: Rgba = Rgba::opaque(0x2D, 0xA6, 0xE0);
/// Green used for player-filtered and career arcs.
pub const ARC_PLAYER: Rgba = Rgba::opaque(0x25, 0xE0, 0x09);

pub const GLOW_ALPHA: f32 = 0.25;

const SCALE_INCOMING: f32 = 0.3;
const SCALE_OUTGOING: f32 = 0.5;
const SCALE_UNFILTERED: f32 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: f32,
}

impl Rgba {
    pub const fn opaque(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    pub fn with_alpha(self, a: f32) -> Self {
        Self { a, ..self }
    }

    pub fn parse_hex(raw: &str) -> Option<Self> {
        let hex = raw.strip_prefix('#')?;
        if hex.len() != 6 {
            return None;
        }
        let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
        let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
        let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
        Some(Self::opaque(r, g, b))
    }
}

impl fmt::Display for Rgba {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.a >= 1.0 {
            write!(f, "#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
        } else {
            write!(f, "rgba({}, {}, {}, {})", self.r, self.g, self.b, self.a)
        }
    }
}

/// One aggregated country-to-country transfer flow for a single year, as it
/// appears in `lines_<year>.json`. Immutable after parse.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferArc {
    pub from: String,
    pub to: String,
    #[serde(rename = "startLat")]
    pub start_lat: f64,
    #[serde(rename = "startLong")]
    pub start_lng: f64,
    #[serde(rename = "endLat")]
    pub end_lat: f64,
    #[serde(rename = "endLong")]
    pub end_lng: f64,
    #[serde(default)]
    pub count: u32,
    #[serde(default)]
    pub players: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YearlyDataset {
    pub year: u16,
    pub arcs: Vec<TransferArc>,
}

/// Arc descriptor handed to the render sink. Derived on every filter or year
/// change, never persisted. Identity for hover comparison comes from `key`,
/// not from allocation identity.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderableArc {
    pub start_lat: f64,
    pub start_lng: f64,
    pub end_lat: f64,
    pub end_lng: f64,
    pub color: Rgba,
    pub scale: f32,
    pub stroke: f32,
    pub from: String,
    pub to: String,
    pub count: u32,
    pub players: Vec<String>,
    pub year: Option<u16>,
    pub from_club: Option<String>,
    pub to_club: Option<String>,
}

impl RenderableArc {
    pub fn key(&self) -> String {
        match self.year {
            Some(year) => format!("{}-{}-{}", self.from, self.to, year),
            None => format!("{}-{}", self.from, self.to),
        }
    }
}

pub fn primary_stroke(count: u32) -> f32 {
    (count as f32 / 10.0 * 0.25).max(0.05)
}

pub fn glow_stroke(count: u32) -> f32 {
    (count as f32 / 10.0 * 0.30).max(0.06)
}

struct Staged<'a> {
    arc: &'a TransferArc,
    color: Option<Rgba>,
    scale: Option<f32>,
}

/// The filter engine. Combines every active filter dimension into the arc
/// set for one year. Pure over its inputs; later stages override the
/// coloring of earlier ones.
///
/// Direction flags only constrain the set when at least one country is
/// selected; with no selection they are ignored and the pair/player filters
/// decide on their own.
pub fn compute_visible_arcs(dataset: &YearlyDataset, filter: &FilterState) -> Vec<RenderableArc> {
    if !filter.filters_applied {
        return dataset
            .arcs
            .iter()
            .map(|arc| finalize(arc, Some(ARC_DEFAULT), Some(SCALE_UNFILTERED)))
            .collect();
    }

    if filter.selected_country_codes.is_empty()
        && !filter.country_pair_active
        && !filter.player_filter_active
    {
        // Nothing selected shows nothing, not everything.
        return Vec::new();
    }

    let mut staged: Vec<Staged<'_>> = dataset
        .arcs
        .iter()
        .map(|arc| Staged {
            arc,
            color: None,
            scale: None,
        })
        .collect();

    if !filter.selected_country_codes.is_empty() {
        staged.retain(|s| {
            let transfer_in =
                filter.selected_country_codes.contains(&s.arc.to) && filter.show_transfers_in;
            let transfer_out =
                filter.selected_country_codes.contains(&s.arc.from) && filter.show_transfers_out;
            transfer_in || transfer_out
        });
    }

    if filter.country_pair_active {
        if filter.bidirectional {
            let source = filter.source_country_code.as_deref().unwrap_or_default();
            let dest = filter.dest_country_code.as_deref().unwrap_or_default();
            staged.retain(|s| {
                (s.arc.from == source && s.arc.to == dest)
                    || (s.arc.from == dest && s.arc.to == source)
            });
            for s in &mut staged {
                let outgoing_from_source = s.arc.from == source;
                s.color = Some(if outgoing_from_source {
                    ARC_EXIT
                } else {
                    ARC_DEFAULT
                });
                s.scale = Some(if outgoing_from_source {
                    SCALE_OUTGOING
                } else {
                    SCALE_INCOMING
                });
            }
        } else {
            staged.retain(|s| {
                let source_ok = filter
                    .source_country_code
                    .as_deref()
                    .is_none_or(|code| s.arc.from == code);
                let dest_ok = filter
                    .dest_country_code
                    .as_deref()
                    .is_none_or(|code| s.arc.to == code);
                source_ok && dest_ok
            });
        }
    }

    if filter.player_filter_active {
        if let Some(name) = filter.player_name.as_deref() {
            let needle = name.to_lowercase();
            staged.retain(|s| {
                s.arc
                    .players
                    .iter()
                    .any(|p| p.to_lowercase().contains(&needle))
            });
            for s in &mut staged {
                s.color = Some(ARC_PLAYER);
            }
        }
    }

    if filter.selected_country_codes.len() == 1
        && !filter.country_pair_active
        && !filter.player_filter_active
    {
        let code = filter
            .selected_country_codes
            .iter()
            .next()
            .cloned()
            .unwrap_or_default();
        for s in &mut staged {
            let incoming = s.arc.to == code;
            s.color = Some(if incoming { ARC_DEFAULT } else { ARC_EXIT });
            s.scale = Some(if incoming {
                SCALE_INCOMING
            } else {
                SCALE_OUTGOING
            });
        }
    }

    staged
        .into_iter()
        .map(|s| finalize(s.arc, s.color, s.scale))
        .collect()
}

fn finalize(arc: &TransferArc, color: Option<Rgba>, scale: Option<f32>) -> RenderableArc {
    let color = color.unwrap_or(ARC_DEFAULT);
    let scale = scale.unwrap_or(if color == ARC_DEFAULT {
        SCALE_INCOMING
    } else {
        SCALE_OUTGOING
    });
    RenderableArc {
        start_lat: arc.start_lat,
        start_lng: arc.start_lng,
        end_lat: arc.end_lat,
        end_lng: arc.end_lng,
        color,
        scale,
        stroke: primary_stroke(arc.count),
        from: arc.from.clone(),
        to: arc.to.clone(),
        count: arc.count,
        players: arc.players.clone(),
        year: None,
        from_club: None,
        to_club: None,
    }
}
