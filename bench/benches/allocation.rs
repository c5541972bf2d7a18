/*
* Copyright 2019 Comcast Cable Communications Management, LLC
*
* Licensed under the Apache License, Version 2.0 (the "License");
* you may not use this file except in compliance with the License.
* You may obtain a copy of the License at
*
* http://www.apache.org/licenses/LICENSE-2.0
*
* Unless required by applicable law or agreed to in writing, software
* distributed under the License is distributed on an "AS IS" BASIS,
* WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
* See the License for the specific language governing permissions and
* limitations under the License.
*
* SPDX-License-Identifier: Apache-2.0
*/

use criterion::{criterion_group, criterion_main, Criterion};
use pieng::ipam::{self, overlaps, split};
use pieng::testils::criterion::BencherExt;
use pieng::testils::proptest::*;
use pieng::{Address, Block};
use proptest::strategy::{Just, Strategy};
use std::collections::BTreeSet;
use std::str::FromStr;

const BATCH_SIZE: usize = 100;

fn parent() -> Block {
    Block::from_str("10.0.0.0/16").unwrap()
}

fn taken_hosts() -> impl Strategy<Value = (Block, BTreeSet<Address>)> {
    Just(Block::from_str("10.0.0.0/20").unwrap()).prop_flat_map(|block| {
        (
            Just(block),
            addresses_in(block, 1000..3000)
                .prop_map(|v| v.into_iter().collect::<BTreeSet<_>>()),
        )
    })
}

fn siblings() -> impl Strategy<Value = Vec<Block>> {
    children_of(parent(), 10, 100..500)
}

// every candidate of the split checked against every sibling
fn scan_next_free_block(parent: &Block, siblings: &[Block], mask: u8) -> Option<Block> {
    split(parent, mask)
        .ok()?
        .find(|c| siblings.iter().all(|s| !overlaps(c, s)))
}

fn next_free_host(c: &mut Criterion) {
    c.bench_function("allocation::next_free_host", |b| {
        b.iter_generated(BATCH_SIZE, taken_hosts(), |(block, taken)| {
            ipam::next_free_host(&block, &taken)
        })
    });
}

fn next_free_block_vs_scan(c: &mut Criterion) {
    let mut group = c.benchmark_group("allocation::next_free_block_vs_scan");

    group.bench_function("allocation::next_free_block", |b| {
        b.iter_generated(BATCH_SIZE, siblings(), |siblings| {
            ipam::next_free_block(&parent(), &siblings, 26)
        })
    });

    group.bench_function("allocation::scan", |b| {
        b.iter_generated(BATCH_SIZE, siblings(), |siblings| {
            scan_next_free_block(&parent(), &siblings, 26)
        })
    });

    group.finish()
}

fn available_blocks(c: &mut Criterion) {
    let mut group = c.benchmark_group("allocation::available_blocks");

    for &mask in &[20u8, 24, 28] {
        group.bench_function(format!("allocation::available_blocks_{}", mask), |b| {
            b.iter_generated(BATCH_SIZE, siblings(), |siblings| {
                ipam::available_blocks(&parent(), &siblings, mask)
            })
        });
    }

    group.finish()
}

fn bench_config() -> Criterion {
    Criterion::default().with_plots()
}

criterion_group! {
    name = benches;
    config=bench_config();
    targets=next_free_host,
            next_free_block_vs_scan,
            available_blocks,
}

criterion_main!(benches);
