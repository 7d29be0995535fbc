//
// Copyright 2017-2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! Benchmarks for telnetcodec performance

use bytes::{Bytes, BytesMut};
use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use krcc_telnetcodec::{TelnetCodec, TelnetFrame, consts};
use std::hint::black_box;
use tokio_util::codec::{Decoder, Encoder};

/// Controller output shaped like a save capture: text lines with framing bytes.
fn capture(size: usize) -> Vec<u8> {
    let line = b".PROGRAM main()\r\n  JMOVE #home\r\n\x17\x05\x02D";
    line.iter().copied().cycle().take(size).collect()
}

fn bench_decode_data_sizes(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode_data_sizes");

    for size in [64, 512, 4096, 32768].iter() {
        group.throughput(Throughput::Bytes(*size as u64));
        let input = capture(*size);

        group.bench_with_input(BenchmarkId::from_parameter(size), &input, |b, input| {
            let mut codec = TelnetCodec::new();
            b.iter(|| {
                let mut buffer = BytesMut::from(&input[..]);
                while let Some(frame) = codec.decode(&mut buffer).unwrap() {
                    black_box(frame);
                }
            });
        });
    }

    group.finish();
}

fn bench_decode_negotiation(c: &mut Criterion) {
    let input = [
        consts::IAC,
        consts::WILL,
        consts::option::ECHO,
        consts::IAC,
        consts::DO,
        consts::option::TTYPE,
        consts::IAC,
        consts::SB,
        consts::option::TTYPE,
        consts::ttype::SEND,
        consts::IAC,
        consts::SE,
    ];

    c.bench_function("decode_login_negotiation", |b| {
        let mut codec = TelnetCodec::new();
        b.iter(|| {
            let mut buffer = BytesMut::from(&input[..]);
            while let Some(frame) = codec.decode(&mut buffer).unwrap() {
                black_box(frame);
            }
        });
    });
}

fn bench_encode_block(c: &mut Criterion) {
    let block = Bytes::from(capture(480));

    c.bench_function("encode_transfer_block", |b| {
        let mut codec = TelnetCodec::new();
        let mut buffer = BytesMut::with_capacity(1024);
        b.iter(|| {
            buffer.clear();
            codec
                .encode(black_box(TelnetFrame::Data(block.clone())), &mut buffer)
                .unwrap();
        });
    });
}

criterion_group!(decoding_benches, bench_decode_data_sizes, bench_decode_negotiation);

criterion_group!(encoding_benches, bench_encode_block);

criterion_main!(decoding_benches, encoding_benches);
