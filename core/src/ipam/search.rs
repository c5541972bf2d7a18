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

//! First-fit search for free hosts and free child blocks.
//!
//! All searches walk candidates in ascending address order, so identical
//! inputs always produce identical answers. They run against a snapshot the
//! caller read moments earlier; the answer is a candidate to commit, not a
//! reservation.

use super::algebra::{contains, overlaps};
use crate::ensure;
use crate::error::{IpamError, Result};
use crate::net::{Address, Block, Family, MaskSet};
use std::collections::{BTreeMap, BTreeSet};

/// Returns the lowest usable address of `block` not in `taken`.
///
/// Addresses in `taken` outside the block are ignored.
pub fn next_free_host(block: &Block, taken: &BTreeSet<Address>) -> Result<Address> {
    let (first, last) = block.usable();
    let exhausted = || IpamError::Exhausted {
        what: "host".to_owned(),
        block: *block,
    };

    let mut cursor = first;
    for &used in taken.range(first..=last) {
        if used != cursor {
            break;
        }
        cursor = cursor
            .checked_add(1)
            .filter(|next| *next <= last)
            .ok_or_else(exhausted)?;
    }

    Ok(cursor)
}

/// Lists every usable address of a small block.
///
/// Refuses blocks with more than `cap` usable addresses instead of
/// allocating without bound.
pub fn enumerate_hosts(block: &Block, cap: usize) -> Result<Vec<Address>> {
    check_host_cap(block, cap)?;
    Ok(block.usable_addresses().collect())
}

/// A usable address of a block and the host holding it, if any.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HostSlot {
    /// The slot's address.
    pub address: Address,
    /// Label of the host occupying the slot.
    pub label: Option<String>,
}

impl HostSlot {
    /// Whether a host occupies the slot.
    pub fn used(&self) -> bool {
        self.label.is_some()
    }
}

/// Lists every usable address of a small block with its occupant.
pub fn host_slots(
    block: &Block,
    hosts: &BTreeMap<Address, String>,
    cap: usize,
) -> Result<Vec<HostSlot>> {
    check_host_cap(block, cap)?;
    Ok(block
        .usable_addresses()
        .map(|address| HostSlot {
            address,
            label: hosts.get(&address).cloned(),
        })
        .collect())
}

fn check_host_cap(block: &Block, cap: usize) -> Result<()> {
    let cap = cap as u128;
    match block.usable_count() {
        Some(count) if count <= cap => Ok(()),
        _ => Err(IpamError::TooLarge {
            block: *block,
            cap,
            what: "usable addresses",
        }),
    }
}

/// Refuses to enumerate children more than `max_depth` bits longer than
/// `parent`. `None` places no limit.
pub fn check_split_depth(parent: &Block, mask: u8, max_depth: Option<u8>) -> Result<()> {
    if let Some(depth) = max_depth {
        ensure!(
            mask.saturating_sub(parent.mask()) <= depth,
            IpamError::TooLarge {
                block: *parent,
                cap: 1u128.checked_shl(u32::from(depth)).unwrap_or(u128::MAX),
                what: "candidate blocks"
            }
        );
    }
    Ok(())
}

/// Validates a child prefix length against its parent.
pub fn check_child_mask(parent: &Block, mask: u8) -> Result<()> {
    ensure!(
        mask <= parent.family().bits(),
        IpamError::InvalidMask {
            mask,
            family: parent.family()
        }
    );
    ensure!(
        mask >= parent.mask(),
        IpamError::MaskTooShort {
            requested: mask,
            parent: parent.mask()
        }
    );
    Ok(())
}

fn check_family(parent: &Block, other: &Block) -> Result<()> {
    ensure!(
        parent.family() == other.family(),
        IpamError::FamilyMismatch {
            expected: parent.family(),
            found: other.family()
        }
    );
    Ok(())
}

/// Returns the lowest block of prefix length `mask` inside `parent` that
/// overlaps none of `siblings`.
pub fn next_free_block(parent: &Block, siblings: &[Block], mask: u8) -> Result<Block> {
    free_blocks(parent, siblings, mask)?
        .next()
        .ok_or_else(|| IpamError::Exhausted {
            what: format!("/{}", mask),
            block: *parent,
        })
}

/// Returns every block of prefix length `mask` inside `parent` that
/// overlaps none of `siblings`, in ascending order.
///
/// The caller bounds `mask - parent.mask()`, see
/// [`IpamConfig::max_split_depth`](crate::config::IpamConfig::max_split_depth).
pub fn available_blocks(parent: &Block, siblings: &[Block], mask: u8) -> Result<Vec<Block>> {
    Ok(free_blocks(parent, siblings, mask)?.collect())
}

/// Lazy form of [`available_blocks`].
pub fn free_blocks(parent: &Block, siblings: &[Block], mask: u8) -> Result<FreeBlocks> {
    check_child_mask(parent, mask)?;
    for sibling in siblings {
        check_family(parent, sibling)?;
    }
    Ok(FreeBlocks::new(parent, siblings, mask))
}

/// Free child blocks of one size, ascending.
///
/// Candidates are the same as splitting the parent, but runs of candidates
/// covered by one sibling are skipped in a single step.
#[derive(Clone, Debug)]
pub struct FreeBlocks {
    family: Family,
    mask: u8,
    hostmask: u128,
    next: Option<u128>,
    end: u128,
    // sibling first addresses, ascending
    firsts: Vec<u128>,
    // highest sibling last address among firsts[..=i]
    reach: Vec<u128>,
}

impl FreeBlocks {
    fn new(parent: &Block, siblings: &[Block], mask: u8) -> Self {
        let mut ranges = siblings
            .iter()
            .map(|s| (s.first().value(), s.last().value()))
            .collect::<Vec<_>>();
        ranges.sort_unstable();

        let mut reach = Vec::with_capacity(ranges.len());
        for &(_, last) in ranges.iter() {
            let highest = reach.last().map_or(last, |&r: &u128| r.max(last));
            reach.push(highest);
        }

        FreeBlocks {
            family: parent.family(),
            mask,
            hostmask: Block::from_raw(parent.first(), mask).hostmask(),
            next: Some(parent.first().value()),
            end: parent.last().value(),
            firsts: ranges.into_iter().map(|(first, _)| first).collect(),
            reach,
        }
    }

    #[inline]
    fn after(&self, addr: u128) -> Option<u128> {
        (addr | self.hostmask)
            .checked_add(1)
            .filter(|&next| next <= self.end)
    }
}

impl Iterator for FreeBlocks {
    type Item = Block;

    fn next(&mut self) -> Option<Block> {
        loop {
            let base = self.next?;
            let last = base | self.hostmask;

            // any sibling starting at or before `last` that reaches `base`
            let idx = self.firsts.partition_point(|&first| first <= last);
            if idx > 0 && self.reach[idx - 1] >= base {
                self.next = self.after(self.reach[idx - 1]);
                continue;
            }

            self.next = self.after(last);
            return Some(Block::from_raw(
                Address::from_raw(self.family, base),
                self.mask,
            ));
        }
    }
}

/// Validates an operator-proposed child block against its parent and the
/// parent's existing children.
pub fn validate_candidate(parent: &Block, siblings: &[Block], candidate: &Block) -> Result<()> {
    check_family(parent, candidate)?;
    ensure!(
        contains(parent, candidate),
        IpamError::NotContained {
            candidate: *candidate,
            parent: *parent
        }
    );

    for sibling in siblings {
        check_family(parent, sibling)?;
        ensure!(
            !overlaps(candidate, sibling),
            IpamError::Overlap {
                candidate: *candidate,
                existing: *sibling
            }
        );
    }

    Ok(())
}

/// Validates an operator-proposed host address against its block and the
/// block's taken addresses.
pub fn validate_host(block: &Block, taken: &BTreeSet<Address>, address: Address) -> Result<()> {
    check_family(block, &Block::host(address))?;

    let (first, last) = block.usable();
    ensure!(
        first <= address && address <= last,
        IpamError::HostOutOfRange {
            address,
            block: *block
        }
    );
    ensure!(
        !taken.contains(&address),
        IpamError::Overlap {
            candidate: Block::host(address),
            existing: Block::host(address)
        }
    );

    Ok(())
}

/// Picks the child mask to list when the operator names none.
///
/// Prefers the shortest mask among existing children, then the parent's
/// preferred mask, then halving the parent.
pub fn default_child_mask(parent: &Block, siblings: &[Block], masks: &MaskSet) -> u8 {
    siblings
        .iter()
        .map(Block::mask)
        .min()
        .or_else(|| masks.first())
        .unwrap_or_else(|| (parent.mask() + 1).min(parent.family().bits()))
}
