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

//! Error types for allocation.

use crate::net::{AddrParseError, Address, Block, Family};
use crate::store::{NetworkId, StoreError};
use thiserror::Error;

/// Result type for allocation operations.
pub type Result<T> = std::result::Result<T, IpamError>;

/// Allocation engine errors.
///
/// Only [`IpamError::Conflict`] is routinely retryable. Everything else is
/// either bad input or genuine exhaustion and should be surfaced as is.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum IpamError {
    /// Bad textual input.
    #[error(transparent)]
    MalformedAddress(#[from] AddrParseError),

    /// A prefix length outside the family's width.
    #[error("/{mask} is not a valid {family} prefix length")]
    InvalidMask {
        /// The requested prefix length.
        mask: u8,
        /// The family it was requested for.
        family: Family,
    },

    /// Two operands belong to different address families.
    #[error("{expected} operand expected, got {found}")]
    FamilyMismatch {
        /// Family of the parent block.
        expected: Family,
        /// Family of the offending operand.
        found: Family,
    },

    /// Requested child mask is shorter than the parent's.
    #[error("mask /{requested} is shorter than parent mask /{parent}")]
    MaskTooShort {
        /// The requested child mask.
        requested: u8,
        /// The parent's mask.
        parent: u8,
    },

    /// Requested child mask is not in the parent's permitted set.
    #[error("mask /{mask} is not permitted under {network}")]
    MaskNotPermitted {
        /// The requested child mask.
        mask: u8,
        /// The parent block.
        network: Block,
    },

    /// Explicit candidate is not enclosed by its claimed parent.
    #[error("{candidate} is not within {parent}")]
    NotContained {
        /// The proposed block.
        candidate: Block,
        /// The claimed parent.
        parent: Block,
    },

    /// Explicit host address is outside the block's usable range.
    #[error("{address} is not a usable host address of {block}")]
    HostOutOfRange {
        /// The proposed host address.
        address: Address,
        /// The owning block.
        block: Block,
    },

    /// Explicit candidate collides with an existing sibling or host.
    #[error("{candidate} overlaps existing allocation {existing}")]
    Overlap {
        /// The proposed block, or host block for a host.
        candidate: Block,
        /// The allocation it collides with.
        existing: Block,
    },

    /// No free host or block of the requested size is left.
    #[error("no free {what} left in {block}")]
    Exhausted {
        /// What was requested, e.g. `host` or `/26`.
        what: String,
        /// The block that was searched.
        block: Block,
    },

    /// Enumeration request exceeds the configured cap.
    #[error("{block} holds more than {cap} {what}")]
    TooLarge {
        /// The block that would be enumerated.
        block: Block,
        /// The configured cap.
        cap: u128,
        /// What would be enumerated.
        what: &'static str,
    },

    /// Commit-time uniqueness violation. Re-run the search against a fresh
    /// snapshot.
    #[error("{0} already allocated, please retry")]
    Conflict(String),

    /// The network does not exist.
    #[error("network {0} not found")]
    NetworkNotFound(NetworkId),

    /// Any other storage failure.
    #[error("storage failure: {0}")]
    Store(String),
}

impl IpamError {
    /// Whether re-running the full read-compute-commit sequence may
    /// succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, IpamError::Conflict(_))
    }
}

impl From<StoreError> for IpamError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Conflict(what) => IpamError::Conflict(what),
            StoreError::NotFound(id) => IpamError::NetworkNotFound(id),
            other => IpamError::Store(other.to_string()),
        }
    }
}
