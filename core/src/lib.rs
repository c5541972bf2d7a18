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

//! Address-space allocation for IP address management.
//!
//! Blocks and hosts of both address families are handled by one set of
//! algorithms over family-tagged `u128` values. The search functions in
//! [`ipam`] are pure; uniqueness is enforced when a candidate is
//! committed to a [`NetworkStore`], and a lost race surfaces as the
//! retryable [`IpamError::Conflict`].

mod macros;

pub mod config;
pub mod error;
pub mod ipam;
pub mod net;
pub mod probe;
pub mod service;
pub mod store;
#[cfg(any(test, feature = "testils"))]
pub mod testils;

pub use self::config::{load_config, IpamConfig};
pub use self::error::{IpamError, Result};
pub use self::net::{Address, Block, Family, MaskSet};
pub use self::probe::Probe;
pub use self::service::{Ipam, SubnetRequest};
pub use self::store::{MemoryStore, NetworkStore};
