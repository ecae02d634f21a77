// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Benchmarks for the quantization codec.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use quant_codec::{dequantize, quantize, QuantizationParams};

fn bench_quantize(c: &mut Criterion) {
    let p = QuantizationParams::new(0.024, -128);
    c.bench_function("quantize_1k", |b| {
        b.iter(|| {
            for i in 0..1024 {
                black_box(quantize(black_box(i as f32 * 0.01), p));
            }
        })
    });
}

fn bench_dequantize(c: &mut Criterion) {
    let p = QuantizationParams::new(0.024, -128);
    c.bench_function("dequantize_full_range", |b| {
        b.iter(|| {
            for q in i8::MIN..=i8::MAX {
                black_box(dequantize(black_box(q), p));
            }
        })
    });
}

criterion_group!(benches, bench_quantize, bench_dequantize);
criterion_main!(benches);
