use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use immo_price::dataset::Amenities;
use immo_price::{
    EncodeMode, EncodingVocabulary, FeatureAssembler, ListingAttributes, ListingRecord,
    PropertyType,
};

const CITIES: [&str; 6] = ["Casablanca", "Rabat", "Marrakech", "Tanger", "Fes", "Agadir"];

/// Synthetic listings spread over a few cities and neighborhoods.
fn synthetic_records(n: usize) -> Vec<ListingRecord> {
    (0..n)
        .map(|i| {
            let surface = 40.0 + (i * 13 % 260) as f64;
            ListingRecord {
                price: surface * (6_000.0 + (i % 6) as f64 * 2_000.0),
                surface,
                bedrooms: Some((i % 5) as u32),
                bathrooms: Some((i % 3) as u32),
                floor: if i % 7 == 0 { None } else { Some((i % 6) as i32) },
                city: CITIES[i % CITIES.len()].to_string(),
                neighborhood: format!("quartier-{}", i % 40),
                property_type: PropertyType::ALL[i % PropertyType::ALL.len()],
                amenities: Amenities {
                    terrace: i % 2 == 0,
                    garage: i % 3 == 0,
                    elevator: i % 4 == 0,
                    pool: i % 9 == 0,
                    security: i % 5 == 0,
                },
            }
        })
        .collect()
}

fn bench_assemble_single(c: &mut Criterion) {
    let records = synthetic_records(2_000);
    let vocabulary = EncodingVocabulary::fit_all(&records).expect("fit vocabulary");
    let assembler = FeatureAssembler::new(&vocabulary);
    let attributes = ListingAttributes::from(&records[17]);

    c.bench_function("assemble_single", |b| {
        b.iter(|| {
            let v = assembler
                .assemble(black_box(&attributes), EncodeMode::Inference)
                .expect("assemble");
            black_box(v);
        });
    });
}

fn bench_assemble_rows(c: &mut Criterion) {
    let records = synthetic_records(10_000);
    let vocabulary = EncodingVocabulary::fit_all(&records).expect("fit vocabulary");
    let assembler = FeatureAssembler::new(&vocabulary);

    for n in [100usize, 1_000, 10_000].iter() {
        let indices: Vec<usize> = (0..*n).collect();
        c.bench_with_input(BenchmarkId::new("assemble_rows", n), n, |b, _| {
            b.iter(|| {
                let m = assembler
                    .assemble_rows(&records, black_box(&indices), EncodeMode::Training)
                    .expect("assemble rows");
                black_box(m);
            });
        });
    }
}

fn bench_fit_vocabulary(c: &mut Criterion) {
    let records = synthetic_records(10_000);
    c.bench_function("fit_vocabulary_10k", |b| {
        b.iter(|| {
            let v = EncodingVocabulary::fit_all(black_box(&records)).expect("fit vocabulary");
            black_box(v);
        });
    });
}

criterion_group!(
    benches,
    bench_assemble_single,
    bench_assemble_rows,
    bench_fit_vocabulary
);
criterion_main!(benches);
