use criterion::{criterion_group, criterion_main, Criterion};
use osmpbf_stream::{decode_parallel, DecodedBatch, DecoderOptions, Entity};
use std::env;

criterion_group!(benches, bench_count);
criterion_main!(benches);

fn bench_count(c: &mut Criterion) {
    let file = env!(
        "OSMPBF_BENCH_FILE",
        "Must specify OSMPBF_BENCH_FILE env var when compiling this benchmark"
    );

    #[cfg(feature = "rust-zlib")]
    println!("Using rust-zlib (miniz_oxide)");
    #[cfg(feature = "zlib")]
    println!("Using zlib");
    #[cfg(feature = "zlib-ng")]
    println!("Using zlib-ng");

    let bytes = std::fs::read(file).unwrap();

    c.bench_function(format!("Benchmarking using {file}").as_str(), |b| {
        b.iter(|| {
            let mut counts = (0u64, 0u64, 0u64);
            let batches = decode_parallel(&bytes, &DecoderOptions::default()).unwrap();
            for batch in batches {
                let entities = match batch {
                    DecodedBatch::Header(batch) | DecodedBatch::Data(batch) => batch.into_entities(),
                    DecodedBatch::RawData(_) => continue,
                };
                for entity in entities {
                    match entity {
                        Entity::Node(_) => counts.0 += 1,
                        Entity::Way(_) => counts.1 += 1,
                        Entity::Relation(_) => counts.2 += 1,
                        Entity::Header(_) => {}
                    }
                }
            }
            counts
        })
    });
}
