//! Codec, optimizer and container throughput
//!
//! Run with: cargo bench --bench codecs

use biometal_cram::codec::{CodecOptimizer, Encoding};
use biometal_cram::cram::{encode_container, CramRecord, ReadFeature, WriterOptions};
use biometal_cram::io::{BitReader, BitWriter};
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::hint::black_box;

const VALUES: usize = 100_000;

/// Geometric-ish column: mostly small values with a long tail.
fn column() -> Vec<i64> {
    let mut state = 0x2545_f491_4f6c_dd1du64;
    (0..VALUES)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            ((state % 1024) | 1024).trailing_zeros() as i64 + (state % 7) as i64
        })
        .collect()
}

fn bench_codecs(c: &mut Criterion) {
    let values = column();
    let encodings = [
        ("golomb", Encoding::golomb(0, 5).unwrap()),
        ("golomb_rice", Encoding::golomb_rice(0, 2).unwrap()),
        ("gamma", Encoding::gamma(1)),
        ("subexp", Encoding::subexp(0, 2).unwrap()),
        ("beta", Encoding::beta(0, 5).unwrap()),
        ("unary", Encoding::unary(0)),
    ];

    let mut group = c.benchmark_group("codec");
    group.throughput(Throughput::Elements(VALUES as u64));
    for (name, encoding) in &encodings {
        group.bench_with_input(BenchmarkId::new("encode", name), &values, |b, values| {
            b.iter(|| {
                let mut writer = BitWriter::new(Vec::with_capacity(VALUES));
                for &v in values {
                    encoding.encode(&mut writer, v).unwrap();
                }
                black_box(writer.into_inner().unwrap().len())
            })
        });

        let mut writer = BitWriter::new(Vec::new());
        for &v in &values {
            encoding.encode(&mut writer, v).unwrap();
        }
        let encoded = writer.into_inner().unwrap();
        group.bench_with_input(BenchmarkId::new("decode", name), &encoded, |b, encoded| {
            b.iter(|| {
                let mut reader = BitReader::new(encoded.as_slice());
                let mut sum = 0i64;
                for _ in 0..VALUES {
                    sum += encoding.decode(&mut reader).unwrap();
                }
                black_box(sum)
            })
        });
    }
    group.finish();
}

fn bench_optimizer(c: &mut Criterion) {
    let values = column();
    c.bench_function("optimizer/select", |b| {
        b.iter(|| {
            let mut optimizer = CodecOptimizer::new();
            for &v in &values {
                optimizer.add(v);
            }
            black_box(optimizer.select().unwrap().total_bits)
        })
    });
}

fn bench_container(c: &mut Criterion) {
    let records: Vec<CramRecord> = (0..20_000)
        .map(|i| CramRecord {
            bam_flags: 0x63,
            reference_id: 0,
            read_length: 150,
            alignment_start: 1 + i * 20,
            read_group: 0,
            read_name: format!("read.{}", i).into_bytes(),
            features: vec![ReadFeature::Substitution { position: 1 + i % 150, code: (i % 4) as u8 }],
            mapping_quality: 60,
            quality_scores: Some(vec![30; 150]),
            ..Default::default()
        })
        .collect();

    let mut group = c.benchmark_group("container");
    group.sample_size(10);
    group.throughput(Throughput::Elements(records.len() as u64));
    for parallel in [false, true] {
        let options = WriterOptions::default().with_parallel(parallel).with_records_per_slice(2_000);
        group.bench_with_input(BenchmarkId::new("encode", parallel), &records, |b, records| {
            b.iter(|| black_box(encode_container(records, 0, &options).unwrap().header.length))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_codecs, bench_optimizer, bench_container);
criterion_main!(benches);
