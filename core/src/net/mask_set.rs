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

use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use std::iter::FromIterator;
use std::str::FromStr;
use thiserror::Error;

static ARRAY_LITERAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\{\s*(\d+\s*(,\s*\d+\s*)*)?\}$").unwrap());

/// Error returned when parsing a malformed mask set literal.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("Failed to parse '{0}' as mask set.")]
pub struct MaskSetParseError(String);

/// The set of prefix lengths a network permits for its children.
///
/// The text form is the smallint array literal the network table stores,
/// e.g. `{24,26}`. Order is preserved and the first entry is the
/// network's preferred child mask. An empty set places no restriction.
#[derive(Clone, Debug, Default, Hash, PartialEq, Eq)]
pub struct MaskSet(Vec<u8>);

impl MaskSet {
    /// Creates an empty mask set.
    pub fn new() -> Self {
        MaskSet(vec![])
    }

    /// Returns `true` when no mask is listed.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of listed masks.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// The preferred, i.e. first listed, mask.
    pub fn first(&self) -> Option<u8> {
        self.0.first().copied()
    }

    /// Iterates through the masks in listed order.
    pub fn iter(&self) -> impl Iterator<Item = u8> + '_ {
        self.0.iter().copied()
    }

    /// Checks whether children of the given mask are permitted.
    pub fn permits(&self, mask: u8) -> bool {
        self.0.is_empty() || self.0.contains(&mask)
    }
}

impl FromIterator<u8> for MaskSet {
    fn from_iter<I: IntoIterator<Item = u8>>(iter: I) -> Self {
        let mut masks = vec![];
        for mask in iter {
            if !masks.contains(&mask) {
                masks.push(mask);
            }
        }
        MaskSet(masks)
    }
}

impl FromStr for MaskSet {
    type Err = MaskSetParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if !ARRAY_LITERAL.is_match(s) {
            return Err(MaskSetParseError(s.to_owned()));
        }

        s.trim_matches(|c| c == '{' || c == '}')
            .split(',')
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .map(|m| m.parse::<u8>().map_err(|_| MaskSetParseError(s.to_owned())))
            .collect()
    }
}

impl fmt::Display for MaskSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let masks = self
            .0
            .iter()
            .map(u8::to_string)
            .collect::<Vec<_>>()
            .join(",");
        write!(f, "{{{}}}", masks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_array_literal() {
        let set = MaskSet::from_str("{24,26}").unwrap();
        assert_eq!(vec![24, 26], set.iter().collect::<Vec<_>>());
        assert_eq!(Some(24), set.first());
        assert_eq!("{24,26}", set.to_string());

        let spaced = MaskSet::from_str("{ 24 , 26 }").unwrap();
        assert_eq!(set, spaced);
    }

    #[test]
    fn empty_set_permits_everything() {
        let set = MaskSet::from_str("{}").unwrap();
        assert!(set.is_empty());
        assert_eq!(None, set.first());
        assert!(set.permits(0));
        assert!(set.permits(128));
        assert_eq!("{}", set.to_string());
        assert_eq!(MaskSet::new(), set);
    }

    #[test]
    fn permits_only_listed_masks() {
        let set = MaskSet::from_str("{27,28}").unwrap();
        assert!(set.permits(27));
        assert!(set.permits(28));
        assert!(!set.permits(26));
    }

    #[test]
    fn duplicates_are_dropped_in_order() {
        let set = vec![28, 24, 28, 26].into_iter().collect::<MaskSet>();
        assert_eq!(3, set.len());
        assert_eq!("{28,24,26}", set.to_string());
    }

    #[test]
    fn parse_rejects_malformed() {
        for bad in &["", "24,26", "{24,,26}", "{24,x}", "{-1}", "{256}", "{24,26"] {
            assert_eq!(
                Err(MaskSetParseError((*bad).to_owned())),
                MaskSet::from_str(bad),
                "{:?}",
                bad
            );
        }
    }
}
