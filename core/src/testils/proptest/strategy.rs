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

//! Proptest strategies.

use crate::net::{Address, Block, Family};
use proptest::arbitrary::any;
use proptest::collection::vec;
use proptest::prop_oneof;
use proptest::strategy::{Just, Strategy};
use std::net::{Ipv4Addr, Ipv6Addr};
use std::ops::Range;

/// Returns a strategy to generate IPv4 addresses.
pub fn v4_address() -> impl Strategy<Value = Address> {
    any::<Ipv4Addr>().prop_map(Address::from)
}

/// Returns a strategy to generate IPv6 addresses.
pub fn v6_address() -> impl Strategy<Value = Address> {
    any::<Ipv6Addr>().prop_map(Address::from)
}

/// Returns a strategy to generate IPv4 blocks of any size.
pub fn v4_block() -> impl Strategy<Value = Block> {
    v4_block_min_mask(0)
}

/// Returns a strategy to generate IPv4 blocks with a prefix length of at
/// least `min`.
///
/// Handy for blocks small enough to enumerate.
pub fn v4_block_min_mask(min: u8) -> impl Strategy<Value = Block> {
    (v4_address(), min..=Family::V4.bits()).prop_map(|(address, mask)| truncated(address, mask))
}

/// Returns a strategy to generate IPv6 blocks of any size.
pub fn v6_block() -> impl Strategy<Value = Block> {
    (v6_address(), 0..=Family::V6.bits()).prop_map(|(address, mask)| truncated(address, mask))
}

/// Returns a strategy to generate blocks of either family.
pub fn any_block() -> impl Strategy<Value = Block> {
    prop_oneof![v4_block(), v6_block()]
}

/// Returns a strategy to generate a splittable block paired with a child
/// mask between one and `max_depth` bits longer than the block's own.
///
/// `max_depth` bounds the number of children to `2 ^ max_depth`.
pub fn block_and_child_mask(max_depth: u8) -> impl Strategy<Value = (Block, u8)> {
    any_block()
        .prop_filter("host blocks can't be split", |b| {
            b.mask() < b.family().bits()
        })
        .prop_flat_map(move |b| {
            let deepest = b
                .mask()
                .saturating_add(max_depth.max(1))
                .min(b.family().bits());
            (Just(b), b.mask() + 1..=deepest)
        })
}

/// Returns a strategy to generate addresses inside `block`.
pub fn addresses_in(block: Block, len: Range<usize>) -> impl Strategy<Value = Vec<Address>> {
    let first = block.first().value();
    let hostmask = block.hostmask();
    vec(any::<u128>(), len).prop_map(move |offsets| {
        offsets
            .into_iter()
            .map(|offset| Address::new(block.family(), first | (offset & hostmask)).unwrap())
            .collect()
    })
}

/// Returns a strategy to generate child blocks of `parent` at most
/// `max_depth` bits longer than it. The children may overlap each other.
pub fn children_of(
    parent: Block,
    max_depth: u8,
    len: Range<usize>,
) -> impl Strategy<Value = Vec<Block>> {
    let deepest = parent
        .mask()
        .saturating_add(max_depth)
        .min(parent.family().bits());
    (
        addresses_in(parent, len.clone()),
        vec(parent.mask()..=deepest, len),
    )
        .prop_map(|(addresses, masks)| {
            addresses
                .into_iter()
                .zip(masks)
                .map(|(address, mask)| truncated(address, mask))
                .collect()
        })
}

fn truncated(address: Address, mask: u8) -> Block {
    Block::truncate(address, mask).unwrap()
}
