use globe_transfers::arcsets::{
    compute_visible_arcs, RenderableArc, TransferArc, YearlyDataset, ARC_DEFAULT, ARC_EXIT,
    ARC_PLAYER,
};
use globe_transfers::render::build_glow_arcs;
use globe_transfers::state::FilterState;

fn arc(from: &str, to: &str, count: u32, players: &[&str]) -> TransferArc {
    TransferArc {
        from: from.to_string(),
        to: to.to_string(),
        start_lat: 10.0,
        start_lng: 20.0,
        end_lat: 30.0,
        end_lng: 40.0,
        count,
        players: players.iter().map(|p| p.to_string()).collect(),
    }
}

fn dataset(arcs: Vec<TransferArc>) -> YearlyDataset {
    YearlyDataset { year: 2000, arcs }
}

fn applied() -> FilterState {
    FilterState {
        filters_applied: true,
        ..FilterState::default()
    }
}

fn sample() -> YearlyDataset {
    dataset(vec![
        arc("POR", "ESP", 4, &["Rui Costa"]),
        arc("ESP", "POR", 2, &["Juan Lopez"]),
        arc("FRA", "ITA", 9, &["Michel Blanc"]),
    ])
}

#[test]
fn unapplied_filters_pass_everything_through() {
    let data = sample();
    let arcs = compute_visible_arcs(&data, &FilterState::default());
    assert_eq!(arcs.len(), 3);
    for a in &arcs {
        assert_eq!(a.color, ARC_DEFAULT);
        assert_eq!(a.scale, 0.5);
    }
}

#[test]
fn identical_inputs_yield_identical_outputs() {
    let data = sample();
    let mut filter = applied();
    filter.selected_country_codes.insert("POR".to_string());

    let first = compute_visible_arcs(&data, &filter);
    let second = compute_visible_arcs(&data, &filter);
    assert_eq!(first, second);
}

#[test]
fn nothing_selected_shows_nothing() {
    let data = sample();
    let filter = applied();
    assert!(compute_visible_arcs(&data, &filter).is_empty());
}

#[test]
fn direction_flags_alone_do_not_resurrect_arcs() {
    let data = sample();
    let mut filter = applied();
    filter.show_transfers_in = false;
    assert!(compute_visible_arcs(&data, &filter).is_empty());
}

#[test]
fn portugal_both_directions_keeps_two_arcs_colored_by_direction() {
    let data = sample();
    let mut filter = applied();
    filter.selected_country_codes.insert("POR".to_string());

    let arcs = compute_visible_arcs(&data, &filter);
    assert_eq!(arcs.len(), 2);

    // POR -> ESP is outgoing from the selected country.
    assert_eq!(arcs[0].from, "POR");
    assert_eq!(arcs[0].color, ARC_EXIT);
    assert_eq!(arcs[0].scale, 0.5);

    // ESP -> POR is incoming.
    assert_eq!(arcs[1].to, "POR");
    assert_eq!(arcs[1].color, ARC_DEFAULT);
    assert_eq!(arcs[1].scale, 0.3);
}

#[test]
fn single_country_result_partitions_into_two_color_classes() {
    let data = dataset(vec![
        arc("POR", "ESP", 1, &[]),
        arc("POR", "FRA", 1, &[]),
        arc("ITA", "POR", 1, &[]),
        arc("ESP", "POR", 1, &[]),
    ]);
    let mut filter = applied();
    filter.selected_country_codes.insert("POR".to_string());

    let arcs = compute_visible_arcs(&data, &filter);
    assert_eq!(arcs.len(), 4);
    for a in &arcs {
        if a.to == "POR" {
            assert_eq!(a.color, ARC_DEFAULT);
        } else {
            assert_eq!(a.color, ARC_EXIT);
        }
    }
    let incoming = arcs.iter().filter(|a| a.color == ARC_DEFAULT).count();
    assert_eq!(incoming, 2);
}

#[test]
fn direction_filter_drops_the_unwanted_side() {
    let data = sample();
    let mut filter = applied();
    filter.selected_country_codes.insert("POR".to_string());
    filter.show_transfers_in = false;

    let arcs = compute_visible_arcs(&data, &filter);
    assert_eq!(arcs.len(), 1);
    assert_eq!(arcs[0].from, "POR");
}

#[test]
fn bidirectional_pair_keeps_both_directions_and_scales_them() {
    let data = dataset(vec![
        arc("POR", "ESP", 3, &[]),
        arc("ESP", "POR", 5, &[]),
        arc("POR", "FRA", 2, &[]),
    ]);
    let mut filter = applied();
    filter.country_pair_active = true;
    filter.bidirectional = true;
    filter.source_country_code = Some("POR".to_string());
    filter.dest_country_code = Some("ESP".to_string());

    let arcs = compute_visible_arcs(&data, &filter);
    assert_eq!(arcs.len(), 2);

    let outgoing = arcs.iter().find(|a| a.from == "POR").expect("outgoing arc");
    assert_eq!(outgoing.color, ARC_EXIT);
    assert_eq!(outgoing.scale, 0.5);

    let incoming = arcs.iter().find(|a| a.from == "ESP").expect("incoming arc");
    assert_eq!(incoming.color, ARC_DEFAULT);
    assert_eq!(incoming.scale, 0.3);
}

#[test]
fn one_sided_pair_matches_only_the_set_side() {
    let data = sample();
    let mut filter = applied();
    filter.country_pair_active = true;
    filter.bidirectional = false;
    filter.source_country_code = Some("FRA".to_string());

    let arcs = compute_visible_arcs(&data, &filter);
    assert_eq!(arcs.len(), 1);
    assert_eq!(arcs[0].from, "FRA");
    assert_eq!(arcs[0].to, "ITA");
}

#[test]
fn player_filter_is_case_insensitive_substring_and_recolors() {
    let data = sample();
    let mut filter = applied();
    filter.player_filter_active = true;
    filter.player_name = Some("rui".to_string());

    let arcs = compute_visible_arcs(&data, &filter);
    assert_eq!(arcs.len(), 1);
    assert_eq!(arcs[0].from, "POR");
    assert_eq!(arcs[0].color, ARC_PLAYER);
}

#[test]
fn player_recolor_overrides_pair_coloring() {
    let data = dataset(vec![
        arc("POR", "ESP", 3, &["Rui Costa"]),
        arc("ESP", "POR", 5, &["Juan Lopez"]),
    ]);
    let mut filter = applied();
    filter.country_pair_active = true;
    filter.bidirectional = true;
    filter.source_country_code = Some("POR".to_string());
    filter.dest_country_code = Some("ESP".to_string());
    filter.player_filter_active = true;
    filter.player_name = Some("Costa".to_string());

    let arcs = compute_visible_arcs(&data, &filter);
    assert_eq!(arcs.len(), 1);
    assert_eq!(arcs[0].color, ARC_PLAYER);
}

#[test]
fn stroke_grows_with_count_and_glow_is_translucent() {
    let data = dataset(vec![arc("POR", "ESP", 1, &[]), arc("ESP", "POR", 12, &[])]);
    let mut filter = applied();
    filter.selected_country_codes.insert("POR".to_string());

    let arcs = compute_visible_arcs(&data, &filter);
    let thin = arcs.iter().find(|a| a.count == 1).expect("thin arc");
    let thick = arcs.iter().find(|a| a.count == 12).expect("thick arc");
    assert_eq!(thin.stroke, 0.05);
    assert!(thick.stroke > thin.stroke);

    let glow = build_glow_arcs(&arcs);
    assert_eq!(glow.len(), arcs.len());
    for (g, a) in glow.iter().zip(&arcs) {
        assert!(g.stroke > a.stroke);
        assert_eq!(g.color.a, 0.25);
        assert_eq!(g.color.r, a.color.r);
        assert_eq!(g.key(), a.key());
    }
}

#[test]
fn hover_keys_are_stable_across_recomputation() {
    let data = sample();
    let mut filter = applied();
    filter.selected_country_codes.insert("POR".to_string());

    let first: Vec<String> = compute_visible_arcs(&data, &filter)
        .iter()
        .map(RenderableArc::key)
        .collect();
    let second: Vec<String> = compute_visible_arcs(&data, &filter)
        .iter()
        .map(RenderableArc::key)
        .collect();
    assert_eq!(first, second);
}
