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

//! Overlap, containment and splitting of blocks.

use crate::ensure;
use crate::error::{IpamError, Result};
use crate::net::{Address, Block, Family};

/// Checks whether the ranges of two blocks share at least one address.
///
/// Symmetric, and a block always overlaps itself. Blocks of different
/// families live in different address spaces and never overlap.
#[inline]
pub fn overlaps(a: &Block, b: &Block) -> bool {
    a.family() == b.family() && !(a.last() < b.first() || b.last() < a.first())
}

/// Checks whether `child` lies entirely within `parent`.
#[inline]
pub fn contains(parent: &Block, child: &Block) -> bool {
    parent.contains_address(child.first()) && parent.contains_address(child.last())
}

/// Enumerates every block of prefix length `mask` inside `parent`, in
/// ascending address order.
///
/// When `mask` is not longer than the parent's own mask the only result is
/// `parent` itself. The sequence is lazy, but a caller collecting it is
/// responsible for keeping `mask - parent.mask()` small.
pub fn split(parent: &Block, mask: u8) -> Result<Subnets> {
    ensure!(
        mask <= parent.family().bits(),
        IpamError::InvalidMask {
            mask,
            family: parent.family()
        }
    );
    Ok(Subnets::new(parent, mask))
}

/// Number of blocks [`split`] yields, or `None` when it does not fit in a
/// `u128`.
pub fn split_count(parent: &Block, mask: u8) -> Option<u128> {
    if mask <= parent.mask() {
        Some(1)
    } else {
        1u128.checked_shl(u32::from(mask - parent.mask()))
    }
}

/// Lazy sequence of equally sized blocks covering a parent block.
#[derive(Clone, Debug)]
pub struct Subnets {
    family: Family,
    mask: u8,
    hostmask: u128,
    next: Option<u128>,
    end: u128,
}

impl Subnets {
    fn new(parent: &Block, mask: u8) -> Self {
        // a mask that can't get smaller passes the parent through
        let child = if mask <= parent.mask() {
            *parent
        } else {
            Block::from_raw(parent.first(), mask)
        };

        Subnets {
            family: parent.family(),
            mask: child.mask(),
            hostmask: child.hostmask(),
            next: Some(parent.first().value()),
            end: parent.last().value(),
        }
    }
}

impl Iterator for Subnets {
    type Item = Block;

    fn next(&mut self) -> Option<Block> {
        let base = self.next?;
        let last = base | self.hostmask;
        self.next = if last >= self.end {
            None
        } else {
            Some(last + 1)
        };
        Some(Block::from_raw(
            Address::from_raw(self.family, base),
            self.mask,
        ))
    }
}
