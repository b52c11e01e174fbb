use crate::arcsets::{glow_stroke, RenderableArc, GLOW_ALPHA};

/// The external 3D pipeline, seen from here as a pair of arc-list setters.
/// Implementations redraw on every call; arc lists are handed over by
/// value and recomputed rather than mutated in place.
pub trait RenderSink {
    fn set_arcs(&mut self, arcs: Vec<RenderableArc>);
    fn set_glow_arcs(&mut self, arcs: Vec<RenderableArc>);
}

/// Wider, translucent copy of an arc sharing its endpoints.
pub fn glow_copy(arc: &RenderableArc, stroke: f32) -> RenderableArc {
    RenderableArc {
        stroke,
        color: arc.color.with_alpha(GLOW_ALPHA),
        ..arc.clone()
    }
}

/// Glow layer for a year-browse arc set; stroke widens with player count
/// but never below the glow minimum.
pub fn build_glow_arcs(arcs: &[RenderableArc]) -> Vec<RenderableArc> {
    arcs.iter()
        .map(|arc| glow_copy(arc, glow_stroke(arc.count)))
        .collect()
}

/// Sink that keeps the last lists it was handed. Used by tests and by the
/// terminal UI, which draws from the recorded lists each frame.
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub arcs: Vec<RenderableArc>,
    pub glow_arcs: Vec<RenderableArc>,
    pub draws: usize,
}

impl RenderSink for RecordingSink {
    fn set_arcs(&mut self, arcs: Vec<RenderableArc>) {
        self.arcs = arcs;
        self.draws += 1;
    }

    fn set_glow_arcs(&mut self, arcs: Vec<RenderableArc>) {
        self.glow_arcs = arcs;
    }
}
