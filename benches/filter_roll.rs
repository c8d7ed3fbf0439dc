use criterion::{BatchSize, Criterion, criterion_group, criterion_main};
use rand::{SeedableRng, rngs::StdRng};
use table_roller::{
    data::Record,
    filter::parse_filters,
    normalize::{RawTable, normalize_tables},
    state::AppState,
};

fn generate_state(rows: usize) -> AppState {
    let records = (0..rows)
        .map(|i| {
            let cost = if i % 10 == 0 {
                "Free".to_string()
            } else {
                format!("{} CP", (i % 40) * 25)
            };
            [
                ("Name", format!("Perk {i}")),
                ("Cost", cost),
                ("Tier", ((i % 5) + 1).to_string()),
            ]
            .into_iter()
            .collect::<Record>()
        })
        .collect();
    let tables = vec![
        RawTable {
            name: "Chapter 1: Perks".to_string(),
            records,
        },
    ];
    AppState::from_groups(normalize_tables(tables))
        .toggle_all()
        .set_mapping("Cost", "Price", Some(0))
}

fn bench_filter_roll(c: &mut Criterion) {
    let state = generate_state(20_000);
    let filters = parse_filters(&[
        "price:Price <= 500".to_string(),
        "Tier >= 2".to_string(),
        "Name contains 1".to_string(),
    ])
    .expect("parse filters");

    let mut group = c.benchmark_group("filter_roll");
    group.bench_function("filter_only", |b| {
        b.iter(|| state.candidates(&filters, &[]))
    });
    group.bench_function("roll_one", |b| {
        b.iter_batched(
            || StdRng::seed_from_u64(42),
            |mut rng| state.roll(&filters, &[], 1, &mut rng),
            BatchSize::SmallInput,
        )
    });
    group.bench_function("roll_many_50", |b| {
        b.iter_batched(
            || StdRng::seed_from_u64(42),
            |mut rng| state.roll(&filters, &[], 50, &mut rng),
            BatchSize::SmallInput,
        )
    });
    group.finish();
}

criterion_group!(benches, bench_filter_roll);
criterion_main!(benches);
