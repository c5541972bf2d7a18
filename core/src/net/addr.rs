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

use super::AddrParseError;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

/// Address family, i.e. the width class of an address.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub enum Family {
    /// 32-bit IPv4 addresses.
    V4,
    /// 128-bit IPv6 addresses.
    V6,
}

impl Family {
    /// Width of the address space in bits.
    #[inline]
    pub const fn bits(self) -> u8 {
        match self {
            Family::V4 => 32,
            Family::V6 => 128,
        }
    }

    /// Largest integer value an address of this family can hold.
    #[inline]
    pub const fn max_value(self) -> u128 {
        match self {
            Family::V4 => u32::MAX as u128,
            Family::V6 => u128::MAX,
        }
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Family::V4 => write!(f, "IPv4"),
            Family::V6 => write!(f, "IPv6"),
        }
    }
}

/// An IPv4 or IPv6 address as a family-tagged integer.
///
/// Ordering compares the family first, so addresses of the two families
/// never interleave in sorted collections. Arithmetic across families is
/// never performed.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct Address {
    family: Family,
    value: u128,
}

impl Address {
    /// Creates an address from its integer value.
    pub fn new(family: Family, value: u128) -> Result<Self, AddrParseError> {
        if value > family.max_value() {
            Err(AddrParseError::Malformed(format!(
                "{:#x} does not fit in {}",
                value, family
            )))
        } else {
            Ok(Address { family, value })
        }
    }

    /// The value must already fit the family.
    #[inline]
    pub(crate) const fn from_raw(family: Family, value: u128) -> Self {
        Address { family, value }
    }

    /// The address family.
    #[inline]
    pub fn family(&self) -> Family {
        self.family
    }

    /// The integer value of the address.
    #[inline]
    pub fn value(&self) -> u128 {
        self.value
    }

    /// Returns the address `n` positions higher, or `None` past the end
    /// of the address space.
    #[inline]
    pub fn checked_add(self, n: u128) -> Option<Self> {
        self.value
            .checked_add(n)
            .filter(|&v| v <= self.family.max_value())
            .map(|v| Address::from_raw(self.family, v))
    }

    /// Returns the address `n` positions lower, or `None` below zero.
    #[inline]
    pub fn checked_sub(self, n: u128) -> Option<Self> {
        self.value
            .checked_sub(n)
            .map(|v| Address::from_raw(self.family, v))
    }
}

impl From<Ipv4Addr> for Address {
    fn from(ip: Ipv4Addr) -> Self {
        Address::from_raw(Family::V4, u128::from(u32::from(ip)))
    }
}

impl From<Ipv6Addr> for Address {
    fn from(ip: Ipv6Addr) -> Self {
        Address::from_raw(Family::V6, u128::from(ip))
    }
}

impl From<IpAddr> for Address {
    fn from(ip: IpAddr) -> Self {
        match ip {
            IpAddr::V4(ip) => ip.into(),
            IpAddr::V6(ip) => ip.into(),
        }
    }
}

impl From<Address> for IpAddr {
    fn from(address: Address) -> Self {
        match address.family {
            Family::V4 => IpAddr::V4(Ipv4Addr::from(address.value as u32)),
            Family::V6 => IpAddr::V6(Ipv6Addr::from(address.value)),
        }
    }
}

impl FromStr for Address {
    type Err = AddrParseError;

    /// The family follows from the syntax: colon-hex is IPv6, dotted
    /// decimal is IPv4. Surrounding whitespace is not tolerated.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        IpAddr::from_str(s)
            .map(Address::from)
            .map_err(|_| AddrParseError::Malformed(s.to_owned()))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&IpAddr::from(*self), f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn parse_infers_family_from_syntax() {
        let v4 = Address::from_str("10.0.0.1").unwrap();
        assert_eq!(Family::V4, v4.family());
        assert_eq!(0x0a00_0001, v4.value());

        let v6 = Address::from_str("2001:db8::1").unwrap();
        assert_eq!(Family::V6, v6.family());
        assert_eq!(0x2001_0db8_0000_0000_0000_0000_0000_0001, v6.value());
    }

    #[test]
    fn parse_rejects_malformed() {
        for bad in &[
            "",
            "not-an-ip",
            "10.0.0",
            "10.0.0.256",
            " 10.0.0.1",
            "10.0.0.1 ",
            "2001:db8:::1",
            "10.0.0.1/24",
        ] {
            assert_eq!(
                Err(AddrParseError::Malformed((*bad).to_owned())),
                Address::from_str(bad),
                "{:?}",
                bad
            );
        }
    }

    #[test]
    fn format_is_canonical() {
        let v6 = Address::from_str("2001:0db8:0000:0000:0000:0000:0000:0001").unwrap();
        assert_eq!("2001:db8::1", v6.to_string());

        let v4 = Address::from_str("192.168.0.10").unwrap();
        assert_eq!("192.168.0.10", v4.to_string());
    }

    #[test]
    fn new_rejects_values_wider_than_family() {
        assert!(Address::new(Family::V4, u128::from(u32::MAX)).is_ok());
        assert!(Address::new(Family::V4, u128::from(u32::MAX) + 1).is_err());
        assert!(Address::new(Family::V6, u128::MAX).is_ok());
    }

    #[test]
    fn checked_arithmetic_stays_in_family() {
        let top = Address::from_str("255.255.255.255").unwrap();
        assert_eq!(None, top.checked_add(1));
        assert_eq!(
            Some(Address::from_str("255.255.255.254").unwrap()),
            top.checked_sub(1)
        );

        let zero = Address::from_str("::").unwrap();
        assert_eq!(None, zero.checked_sub(1));
        assert_eq!(Some(Address::from_str("::1").unwrap()), zero.checked_add(1));
    }

    #[test]
    fn families_never_interleave_when_sorted() {
        let mut addrs = vec![
            Address::from_str("::1").unwrap(),
            Address::from_str("10.0.0.1").unwrap(),
            Address::from_str("::").unwrap(),
            Address::from_str("0.0.0.0").unwrap(),
        ];
        addrs.sort();
        let families = addrs.iter().map(Address::family).collect::<Vec<_>>();
        assert_eq!(
            vec![Family::V4, Family::V4, Family::V6, Family::V6],
            families
        );
    }

    proptest! {
        #[test]
        fn v4_text_round_trips(ip in any::<Ipv4Addr>()) {
            let text = ip.to_string();
            let address = Address::from_str(&text).unwrap();
            prop_assert_eq!(Family::V4, address.family());
            prop_assert_eq!(text, address.to_string());
        }

        #[test]
        fn v6_text_round_trips(ip in any::<Ipv6Addr>()) {
            let address = Address::from(ip);
            let reparsed = Address::from_str(&address.to_string()).unwrap();
            prop_assert_eq!(address, reparsed);
            prop_assert_eq!(ip.to_string(), address.to_string());
        }

        #[test]
        fn value_fits_family(address: Address) {
            prop_assert!(address.value() <= address.family().max_value());
            prop_assert_eq!(Some(address), Address::new(address.family(), address.value()).ok());
        }

        #[test]
        fn arithmetic_stops_at_family_edges(family: Family) {
            let top = Address::new(family, family.max_value()).unwrap();
            prop_assert_eq!(None, top.checked_add(1));
            prop_assert_eq!(None, Address::new(family, 0).unwrap().checked_sub(1));
            if let Some(past) = family.max_value().checked_add(1) {
                prop_assert!(Address::new(family, past).is_err());
            }
        }
    }
}
