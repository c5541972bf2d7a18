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

//! Address and block types shared by both address families.
//!
//! Every address is held as a family-tagged `u128`, so the same arithmetic
//! serves 32-bit and 128-bit address spaces. Only the width of the masks
//! and the textual form depend on the family.

mod addr;
mod cidr;
mod mask_set;

pub use self::addr::{Address, Family};
pub use self::cidr::{mask, Addresses, Block};
pub use self::mask_set::{MaskSet, MaskSetParseError};

use thiserror::Error;

/// Error returned when parsing a malformed address or block.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum AddrParseError {
    /// The text is not a dotted-decimal or colon-hex address.
    #[error("Failed to parse address: {0}")]
    Malformed(String),

    /// The prefix length is not a number within the family's width, or
    /// the netmask is not contiguous.
    #[error("Invalid prefix length: {0}")]
    InvalidPrefixLength(String),

    /// The base address has host bits set under the prefix length.
    #[error("{address}/{mask} has host bits set")]
    Misaligned {
        /// The offending base address.
        address: Address,
        /// The prefix length it was paired with.
        mask: u8,
    },
}
