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

//! Toml-based configuration of the allocation service.
//!
//! # Example
//!
//! ```
//! host_enumeration_cap = 4096
//! max_split_depth = 16
//! commit_attempts = 3
//!
//! [probe]
//!     ports = [22, 80, 443, 23]
//!     timeout = 1
//! ```
//!
//! Every field is optional.

use crate::net::{Address, Block, MaskSet};
use anyhow::Context;
use serde::{de, Deserialize, Deserializer};
use std::fmt;
use std::fs;
use std::str::FromStr;
use std::time::Duration;

// make `Address` serde deserializable.
impl<'de> Deserialize<'de> for Address {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Address::from_str(&s).map_err(de::Error::custom)
    }
}

// make `Block` serde deserializable.
impl<'de> Deserialize<'de> for Block {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Block::from_str(&s).map_err(de::Error::custom)
    }
}

// make `MaskSet` serde deserializable, from either the array literal
// `"{24,26}"` or a toml array `[24, 26]`.
impl<'de> Deserialize<'de> for MaskSet {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Literal(String),
            List(Vec<u8>),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Literal(s) => MaskSet::from_str(&s).map_err(de::Error::custom),
            Repr::List(masks) => Ok(masks.into_iter().collect()),
        }
    }
}

/// Deserializes a duration from seconds expressed as `u64`.
pub fn duration_from_secs<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let secs = u64::deserialize(deserializer)?;
    Ok(Duration::from_secs(secs))
}

/// Allocation service settings.
#[derive(Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IpamConfig {
    /// The most usable addresses a block may hold for its slots to be
    /// listed one by one. Defaults to `4096`.
    #[serde(default = "default_host_enumeration_cap")]
    pub host_enumeration_cap: usize,

    /// When set, listing available subnets is refused when the requested
    /// mask is more than this many bits longer than the parent's, since
    /// that many bits imply `2 ^ depth` candidates. Unset by default.
    #[serde(default)]
    pub max_split_depth: Option<u8>,

    /// How many times callers run the read-compute-commit sequence before
    /// giving up on a conflict. Defaults to `3`.
    #[serde(default = "default_commit_attempts")]
    pub commit_attempts: usize,

    /// Liveness probe settings.
    #[serde(default)]
    pub probe: ProbeConfig,
}

fn default_host_enumeration_cap() -> usize {
    4096
}

fn default_commit_attempts() -> usize {
    3
}

impl Default for IpamConfig {
    fn default() -> Self {
        IpamConfig {
            host_enumeration_cap: default_host_enumeration_cap(),
            max_split_depth: None,
            commit_attempts: default_commit_attempts(),
            probe: ProbeConfig::default(),
        }
    }
}

impl fmt::Debug for IpamConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut d = f.debug_struct("ipam");
        d.field("host_enumeration_cap", &self.host_enumeration_cap);
        if let Some(depth) = &self.max_split_depth {
            d.field("max_split_depth", depth);
        }
        d.field("commit_attempts", &self.commit_attempts)
            .field("probe", &self.probe)
            .finish()
    }
}

/// Liveness probe settings.
#[derive(Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProbeConfig {
    /// TCP ports tried in order. Defaults to `[22, 80, 443, 23]`.
    #[serde(default = "default_probe_ports")]
    pub ports: Vec<u16>,

    /// Per port connect timeout in seconds, `0` for none. Defaults to `1`.
    #[serde(
        default = "default_probe_timeout",
        deserialize_with = "duration_from_secs"
    )]
    pub timeout: Duration,
}

fn default_probe_ports() -> Vec<u16> {
    vec![22, 80, 443, 23]
}

fn default_probe_timeout() -> Duration {
    Duration::from_secs(1)
}

impl Default for ProbeConfig {
    fn default() -> Self {
        ProbeConfig {
            ports: default_probe_ports(),
            timeout: default_probe_timeout(),
        }
    }
}

impl fmt::Debug for ProbeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("probe")
            .field("ports", &self.ports)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Loads the service config from a TOML file, or the defaults when no
/// file is given.
///
/// # Example
///
/// ```
/// home$ pieng -f pieng.toml next-host 10.0.0.0/24
/// ```
pub fn load_config(path: Option<&str>) -> anyhow::Result<IpamConfig> {
    match path {
        None => Ok(IpamConfig::default()),
        Some(path) => {
            let content =
                fs::read_to_string(path).with_context(|| format!("failed to read {}", path))?;
            toml::from_str(&content).with_context(|| format!("failed to parse {}", path))
        }
    }
}
