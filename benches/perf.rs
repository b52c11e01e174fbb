use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;

use globe_transfers::arcsets::{compute_visible_arcs, TransferArc, YearlyDataset};
use globe_transfers::career::{dedup_career_path, CareerTransfer};
use globe_transfers::state::FilterState;

const CODES: &[&str] = &[
    "POR", "ESP", "FRA", "ITA", "ENG", "GER", "NED", "BEL", "BRA", "ARG", "URU", "MEX",
];

fn big_dataset(arc_count: usize) -> YearlyDataset {
    let arcs = (0..arc_count)
        .map(|i| TransferArc {
            from: CODES[i % CODES.len()].to_string(),
            to: CODES[(i + 3) % CODES.len()].to_string(),
            start_lat: 10.0,
            start_lng: 20.0,
            end_lat: 30.0,
            end_lng: 40.0,
            count: (i % 15) as u32 + 1,
            players: vec![format!("Player {i}"), format!("Player {}", i + 1)],
        })
        .collect();
    YearlyDataset { year: 2000, arcs }
}

fn long_career(legs: usize) -> Vec<CareerTransfer> {
    (0..legs)
        .map(|i| CareerTransfer {
            year: 1950 + (i % 70) as u16,
            from: CODES[i % CODES.len()].to_string(),
            to: CODES[(i + 1) % CODES.len()].to_string(),
            from_club: Some(format!("Club {}", i % 9)),
            to_club: Some(format!("Club {}", (i + 1) % 9)),
        })
        .collect()
}

fn bench_filter_single_country(c: &mut Criterion) {
    let dataset = big_dataset(2_000);
    let mut filter = FilterState::default();
    filter.filters_applied = true;
    filter.selected_country_codes.insert("POR".to_string());

    c.bench_function("filter_single_country_2k_arcs", |b| {
        b.iter(|| {
            let arcs = compute_visible_arcs(black_box(&dataset), black_box(&filter));
            black_box(arcs.len());
        })
    });
}

fn bench_filter_player_substring(c: &mut Criterion) {
    let dataset = big_dataset(2_000);
    let mut filter = FilterState::default();
    filter.filters_applied = true;
    filter.player_filter_active = true;
    filter.player_name = Some("player 19".to_string());

    c.bench_function("filter_player_substring_2k_arcs", |b| {
        b.iter(|| {
            let arcs = compute_visible_arcs(black_box(&dataset), black_box(&filter));
            black_box(arcs.len());
        })
    });
}

fn bench_career_dedup(c: &mut Criterion) {
    let career = long_career(600);

    c.bench_function("career_dedup_600_legs", |b| {
        b.iter(|| {
            let path = dedup_career_path(black_box(career.clone()));
            black_box(path.len());
        })
    });
}

criterion_group!(
    benches,
    bench_filter_single_country,
    bench_filter_player_substring,
    bench_career_dedup
);
criterion_main!(benches);
