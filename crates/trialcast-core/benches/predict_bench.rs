//! Benchmarks for the prediction path using the shipped artifacts.

#![allow(clippy::unwrap_used)]

use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use std::path::Path;
use trialcast_core::{
    ArtifactBundle, Condition, FeatureEncoder, Gender, Location, Phase, SponsorType, TrialRecord,
};

fn bundle() -> ArtifactBundle {
    let root = Path::new(env!("CARGO_MANIFEST_DIR")).join("../..");
    ArtifactBundle::load_dir(&root).unwrap()
}

fn record() -> TrialRecord {
    TrialRecord::new(
        Phase::Three,
        SponsorType::Industry,
        Gender::All,
        Condition::Hypertension,
        Location::UnitedStates,
        500,
        365,
    )
    .unwrap()
}

fn bench_transform(c: &mut Criterion) {
    let bundle = bundle();
    let row = record().to_row();
    c.bench_function("preprocessor_transform", |b| {
        b.iter(|| bundle.preprocessor().transform(black_box(&row)));
    });
}

fn bench_predict(c: &mut Criterion) {
    let bundle = bundle();
    let adapter = bundle.adapter();
    let record = record();
    c.bench_function("adapter_predict", |b| {
        b.iter(|| adapter.predict(black_box(&record)));
    });
}

criterion_group!(benches, bench_transform, bench_predict);
criterion_main!(benches);
