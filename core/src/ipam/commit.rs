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

//! Optimistic commit of search results.
//!
//! A candidate computed from a snapshot is only a guess. Committing it
//! either succeeds or fails with [`IpamError::Conflict`] because another
//! writer took the space first. Recovery means reading a fresh snapshot
//! and searching again, never re-submitting the stale candidate.

use crate::error::{IpamError, Result};
use crate::store::{Host, Network, NetworkStore, NewNetwork};
use tracing::debug;

/// Persists a host candidate.
pub fn commit_host<S: NetworkStore + ?Sized>(store: &S, host: Host) -> Result<Host> {
    store.insert_host(host).map_err(|e| {
        let e = IpamError::from(e);
        if e.is_retryable() {
            debug!(error = %e, "host commit lost a race.");
        }
        e
    })
}

/// Persists a network candidate.
pub fn commit_network<S: NetworkStore + ?Sized>(store: &S, new: NewNetwork) -> Result<Network> {
    store.insert_network(new).map_err(|e| {
        let e = IpamError::from(e);
        if e.is_retryable() {
            debug!(error = %e, "network commit lost a race.");
        }
        e
    })
}

/// Runs a full read-compute-commit closure, re-running it while it fails
/// with a conflict.
///
/// `op` receives the zero-based attempt number. At most `attempts` runs
/// are made; the last error is returned when all of them conflict. Any
/// other error is returned at once.
pub fn retry_on_conflict<T, F>(attempts: usize, mut op: F) -> Result<T>
where
    F: FnMut(usize) -> Result<T>,
{
    let mut attempt = 0;
    loop {
        match op(attempt) {
            Err(e) if e.is_retryable() && attempt + 1 < attempts => {
                debug!(attempt, error = %e, "retrying.");
                attempt += 1;
            }
            result => return result,
        }
    }
}
