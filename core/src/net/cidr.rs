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

use super::{AddrParseError, Address, Family};
use crate::ensure;
use std::fmt;
use std::str::FromStr;

/// [CIDR] block of IPv4 or IPv6 addresses.
///
/// The base address is always the first address of the range; blocks with
/// host bits set are rejected on construction unless explicitly truncated
/// with [`Block::truncate`].
///
/// [CIDR]: https://tools.ietf.org/html/rfc4632#section-3.1
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct Block {
    base: Address,
    mask: u8,
}

impl Block {
    /// Creates a block from an aligned base address and a prefix length.
    pub fn new(base: Address, mask: u8) -> Result<Self, AddrParseError> {
        check_length(base.family(), mask)?;
        let block = Block { base, mask };
        ensure!(
            block.first() == base,
            AddrParseError::Misaligned {
                address: base,
                mask
            }
        );
        Ok(block)
    }

    /// Creates the block of the given prefix length that contains
    /// `address`, clearing its host bits.
    pub fn truncate(address: Address, mask: u8) -> Result<Self, AddrParseError> {
        let family = address.family();
        check_length(family, mask)?;
        Ok(Block {
            base: Address::from_raw(family, address.value() & netmask_bits(family, mask)),
            mask,
        })
    }

    /// The base must already be aligned to the mask.
    #[inline]
    pub(crate) const fn from_raw(base: Address, mask: u8) -> Self {
        Block { base, mask }
    }

    /// The single-address block of `address`, i.e. a /32 or a /128.
    pub fn host(address: Address) -> Self {
        Block {
            base: address,
            mask: address.family().bits(),
        }
    }

    /// Creates a block from an aligned base address and a contiguous
    /// netmask of the same family.
    pub fn with_netmask(base: Address, netmask: Address) -> Result<Self, AddrParseError> {
        ensure!(
            base.family() == netmask.family(),
            AddrParseError::InvalidPrefixLength(netmask.to_string())
        );
        let length = netmask_length(netmask)?;
        Block::new(base, length)
    }

    /// The address family of the block.
    #[inline]
    pub fn family(&self) -> Family {
        self.base.family()
    }

    /// The base address.
    #[inline]
    pub fn base(&self) -> Address {
        self.base
    }

    /// The prefix length.
    #[inline]
    pub fn mask(&self) -> u8 {
        self.mask
    }

    /// Number of host bits, i.e. the family width minus the prefix length.
    #[inline]
    pub fn host_bits(&self) -> u8 {
        self.family().bits() - self.mask
    }

    /// Bit pattern with all network bits set.
    #[inline]
    pub fn netmask(&self) -> u128 {
        netmask_bits(self.family(), self.mask)
    }

    /// Bit pattern with all host bits set.
    #[inline]
    pub fn hostmask(&self) -> u128 {
        hostmask_bits(self.family(), self.mask)
    }

    /// First address of the range, `base & netmask`.
    #[inline]
    pub fn first(&self) -> Address {
        Address::from_raw(self.family(), self.base.value() & self.netmask())
    }

    /// Last address of the range, `first | hostmask`.
    #[inline]
    pub fn last(&self) -> Address {
        Address::from_raw(self.family(), self.first().value() | self.hostmask())
    }

    /// Number of addresses in the block, or `None` for the IPv6 /0 whose
    /// count does not fit in a `u128`.
    #[inline]
    pub fn size(&self) -> Option<u128> {
        1u128.checked_shl(u32::from(self.host_bits()))
    }

    /// Range of addresses eligible for host assignment.
    ///
    /// IPv4 blocks holding more than two addresses give up their network
    /// and broadcast addresses. IPv6 blocks and IPv4 /31 and /32 blocks
    /// are usable end to end.
    pub fn usable(&self) -> (Address, Address) {
        let (first, last) = (self.first(), self.last());
        if self.family() == Family::V4 && self.mask < 31 {
            (
                Address::from_raw(Family::V4, first.value() + 1),
                Address::from_raw(Family::V4, last.value() - 1),
            )
        } else {
            (first, last)
        }
    }

    /// Number of usable addresses, or `None` when it does not fit in a
    /// `u128`.
    pub fn usable_count(&self) -> Option<u128> {
        let (first, last) = self.usable();
        (last.value() - first.value()).checked_add(1)
    }

    /// Checks whether an address falls within the block's range.
    #[inline]
    pub fn contains_address(&self, address: Address) -> bool {
        address.family() == self.family()
            && address.value() & self.netmask() == self.first().value()
    }

    /// Iterates through every address of the block in ascending order.
    pub fn addresses(&self) -> Addresses {
        Addresses::new(self.family(), self.first().value(), self.last().value())
    }

    /// Iterates through the usable addresses of the block in ascending
    /// order.
    pub fn usable_addresses(&self) -> Addresses {
        let (first, last) = self.usable();
        Addresses::new(self.family(), first.value(), last.value())
    }
}

/// Returns the prefix length of a block's text form, e.g. `24` for
/// `10.0.0.0/24`.
pub fn mask(cidr: &str) -> Result<u8, AddrParseError> {
    Block::from_str(cidr).map(|block| block.mask())
}

#[inline]
fn check_length(family: Family, mask: u8) -> Result<(), AddrParseError> {
    ensure!(
        mask <= family.bits(),
        AddrParseError::InvalidPrefixLength(format!("{} exceeds /{}", mask, family.bits()))
    );
    Ok(())
}

#[inline]
fn hostmask_bits(family: Family, mask: u8) -> u128 {
    match u32::from(family.bits() - mask) {
        128 => u128::MAX,
        host_bits => (1u128 << host_bits) - 1,
    }
}

#[inline]
fn netmask_bits(family: Family, mask: u8) -> u128 {
    !hostmask_bits(family, mask) & family.max_value()
}

#[inline]
fn netmask_length(netmask: Address) -> Result<u8, AddrParseError> {
    // left-aligns the mask so both families are checked the same way
    let mask = netmask.value() << (128 - u32::from(netmask.family().bits()));
    let length = mask.leading_ones();
    if length + mask.trailing_zeros() >= 128 {
        Ok(length as u8)
    } else {
        Err(AddrParseError::InvalidPrefixLength(netmask.to_string()))
    }
}

/// Iterator over a contiguous range of addresses.
#[derive(Clone, Debug)]
pub struct Addresses {
    family: Family,
    next: Option<u128>,
    end: u128,
}

impl Addresses {
    fn new(family: Family, start: u128, end: u128) -> Self {
        Addresses {
            family,
            next: if start <= end { Some(start) } else { None },
            end,
        }
    }
}

impl Iterator for Addresses {
    type Item = Address;

    fn next(&mut self) -> Option<Address> {
        let next = self.next?;
        self.next = if next == self.end {
            None
        } else {
            Some(next + 1)
        };
        Some(Address::from_raw(self.family, next))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match self.next {
            None => (0, Some(0)),
            Some(next) => match (self.end - next).checked_add(1) {
                Some(n) if n <= usize::MAX as u128 => (n as usize, Some(n as usize)),
                _ => (usize::MAX, None),
            },
        }
    }
}

impl FromStr for Block {
    type Err = AddrParseError;

    fn from_str(s: &str) -> Result<Self, AddrParseError> {
        match s.split('/').collect::<Vec<&str>>().as_slice() {
            [addr, len_or_netmask] => {
                let address = Address::from_str(addr)?;

                if !len_or_netmask.is_empty() && len_or_netmask.bytes().all(|b| b.is_ascii_digit())
                {
                    let len = len_or_netmask
                        .parse::<u8>()
                        .map_err(|_| AddrParseError::InvalidPrefixLength(len_or_netmask.to_string()))?;
                    Block::new(address, len)
                } else {
                    let netmask = Address::from_str(len_or_netmask)
                        .map_err(|_| AddrParseError::InvalidPrefixLength(len_or_netmask.to_string()))?;
                    Block::with_netmask(address, netmask)
                }
            }
            _ => Err(AddrParseError::Malformed(format!("No `/` found in '{}'", s))),
        }
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.base, self.mask)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testils::proptest::*;
    use proptest::prelude::*;

    fn addr(s: &str) -> Address {
        Address::from_str(s).unwrap()
    }

    fn block(s: &str) -> Block {
        Block::from_str(s).unwrap()
    }

    #[test]
    fn parse_bad_cidr() {
        assert!(Block::from_str("not-a-cidr").is_err());
        assert!(Block::from_str("10.0.0.0").is_err());
        assert!(Block::from_str("10.0.0.0/").is_err());
        assert!(Block::from_str("10.0.0.0/+8").is_err());
        assert!(Block::from_str("10.0.0.0/8/8").is_err());
    }

    #[test]
    fn cidr_length_error() {
        let e = Block::new(addr("10.0.0.0"), 99).unwrap_err();
        assert_eq!("Invalid prefix length: 99 exceeds /32", e.to_string());

        let e = Block::from_str("2001:db8::/129").unwrap_err();
        assert_eq!("Invalid prefix length: 129 exceeds /128", e.to_string());

        let e = Block::from_str("10.0.0.0/300").unwrap_err();
        assert_eq!("Invalid prefix length: 300", e.to_string());
    }

    #[test]
    fn cidr_parse_error_with_netmask() {
        let bad = Block::with_netmask(addr("127.0.0.0"), addr("255.0.255.0"));
        assert_eq!(
            Err(AddrParseError::InvalidPrefixLength("255.0.255.0".to_owned())),
            bad
        );

        let mixed = Block::with_netmask(addr("127.0.0.0"), addr("ffff::"));
        assert!(mixed.is_err());
    }

    #[test]
    fn parse_with_netmask() {
        assert_eq!(block("10.1.0.0/20"), block("10.1.0.0/255.255.240.0"));
        assert_eq!(block("0.0.0.0/0"), block("0.0.0.0/0.0.0.0"));
        assert_eq!(block("2001:db8::/32"), block("2001:db8::/ffff:ffff::"));
    }

    #[test]
    fn misaligned_base_is_rejected() {
        assert_eq!(
            Err(AddrParseError::Misaligned {
                address: addr("10.0.0.5"),
                mask: 24
            }),
            Block::from_str("10.0.0.5/24")
        );
        assert_eq!(
            block("10.0.0.0/24"),
            Block::truncate(addr("10.0.0.5"), 24).unwrap()
        );
        assert_eq!(
            block("2001:db8:4000::/34"),
            Block::truncate(addr("2001:db8:7fff::1"), 34).unwrap()
        );
    }

    #[test]
    fn hostmask() {
        let cidr = block("10.1.0.0/20");
        assert_eq!(addr("0.0.15.255").value(), cidr.hostmask());
    }

    #[test]
    fn netmask() {
        let cidr = block("10.1.0.0/20");
        assert_eq!(addr("255.255.240.0").value(), cidr.netmask());

        let cidr = block("2001:db8::/32");
        assert_eq!(addr("ffff:ffff::").value(), cidr.netmask());
    }

    #[test]
    fn first_and_last() {
        let cidr = block("10.1.0.0/20");
        assert_eq!(addr("10.1.0.0"), cidr.first());
        assert_eq!(addr("10.1.15.255"), cidr.last());

        let cidr = block("2001:db8::/32");
        assert_eq!(addr("2001:db8::"), cidr.first());
        assert_eq!(addr("2001:db8:ffff:ffff:ffff:ffff:ffff:ffff"), cidr.last());

        let all = block("::/0");
        assert_eq!(addr("::"), all.first());
        assert_eq!(addr("ffff:ffff:ffff:ffff:ffff:ffff:ffff:ffff"), all.last());
    }

    #[test]
    fn sizes() {
        assert_eq!(Some(256), block("10.1.0.0/24").size());
        assert_eq!(Some(1), block("10.1.0.1/32").size());
        assert_eq!(Some(1 << 32), block("0.0.0.0/0").size());
        assert_eq!(Some(1 << 127), block("::/1").size());
        assert_eq!(None, block("::/0").size());
    }

    #[test]
    fn usable_excludes_network_and_broadcast() {
        let v4 = block("10.0.0.0/30");
        assert_eq!((addr("10.0.0.1"), addr("10.0.0.2")), v4.usable());
        assert_eq!(Some(2), v4.usable_count());
        assert_eq!(
            vec![addr("10.0.0.1"), addr("10.0.0.2")],
            v4.usable_addresses().collect::<Vec<_>>()
        );
    }

    #[test]
    fn usable_point_to_point_and_host_blocks() {
        let p2p = block("10.0.0.4/31");
        assert_eq!(
            vec![addr("10.0.0.4"), addr("10.0.0.5")],
            p2p.usable_addresses().collect::<Vec<_>>()
        );

        let host = block("10.0.0.9/32");
        assert_eq!(
            vec![addr("10.0.0.9")],
            host.usable_addresses().collect::<Vec<_>>()
        );
    }

    #[test]
    fn usable_v6_has_no_exclusion() {
        let v6 = block("2001:db8::/126");
        assert_eq!((addr("2001:db8::"), addr("2001:db8::3")), v6.usable());
        assert_eq!(None, block("::/0").usable_count());
    }

    #[test]
    fn iter_addresses() {
        let cidr = block("10.1.0.8/30");
        let mut iter = cidr.addresses();
        assert_eq!((4, Some(4)), iter.size_hint());
        assert_eq!(Some(addr("10.1.0.8")), iter.next());
        assert_eq!(Some(addr("10.1.0.9")), iter.next());
        assert_eq!(Some(addr("10.1.0.10")), iter.next());
        assert_eq!(Some(addr("10.1.0.11")), iter.next());
        assert_eq!(None, iter.next());
    }

    #[test]
    fn iter_stops_at_end_of_space() {
        let cidr = block("255.255.255.254/31");
        assert_eq!(2, cidr.addresses().count());
    }

    #[test]
    fn cidr_contains_address() {
        let cidr = block("10.0.0.0/25");
        assert!(cidr.contains_address(addr("10.0.0.0")));
        assert!(cidr.contains_address(addr("10.0.0.127")));
        assert!(!cidr.contains_address(addr("10.0.0.128")));
        assert!(!cidr.contains_address(addr("::a00:0")));
    }

    #[test]
    fn mask_of_text() {
        assert_eq!(Ok(26), mask("10.0.0.64/26"));
        assert!(mask("10.0.0.64").is_err());
    }

    proptest! {
        #[test]
        fn parse_cidr(
            a in 0..=255u8,
            b in 0..=255u8,
            c in 0..=255u8,
            d in 0..=255u8,
            length in 0..=32u8
        ) {
            let base = Address::from(std::net::Ipv4Addr::new(a, b, c, d));
            let cidr = Block::truncate(base, length).unwrap();
            let text = cidr.to_string();
            prop_assert_eq!(cidr, Block::from_str(&text).unwrap());
        }

        #[test]
        fn block_text_round_trips(cidr in any_block()) {
            prop_assert_eq!(cidr, Block::from_str(&cidr.to_string()).unwrap());
        }

        #[test]
        fn range_bounds_are_aligned(cidr in any_block()) {
            prop_assert_eq!(cidr.base(), cidr.first());
            prop_assert_eq!(0, cidr.first().value() & cidr.hostmask());
            prop_assert_eq!(cidr.hostmask(), cidr.last().value() & cidr.hostmask());
            prop_assert!(cidr.contains_address(cidr.first()));
            prop_assert!(cidr.contains_address(cidr.last()));
        }
    }
}
