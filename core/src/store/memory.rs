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

use super::{
    Host, Network, NetworkId, NetworkStore, NetworkUpdate, NewNetwork, StoreError, StoreResult,
};
use crate::ipam::{contains, overlaps};
use crate::net::Address;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use tracing::debug;

#[derive(Debug, Default)]
struct Tables {
    last_id: u64,
    networks: BTreeMap<NetworkId, Network>,
    hosts: BTreeMap<Address, Host>,
}

impl Tables {
    fn network(&self, id: NetworkId) -> StoreResult<&Network> {
        self.networks.get(&id).ok_or(StoreError::NotFound(id))
    }

    fn siblings<'a>(&'a self, parent: Option<NetworkId>) -> impl Iterator<Item = &'a Network> {
        self.networks.values().filter(move |n| n.parent == parent)
    }
}

/// An in-process [`NetworkStore`].
///
/// Every write takes the table lock for its whole check-then-insert, so
/// the uniqueness rules hold under any number of concurrent writers.
/// Reads return owned snapshots and never block each other.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        MemoryStore::default()
    }

    /// Changes the descriptive metadata of a network, returning the
    /// updated record.
    pub fn update_network(&self, id: NetworkId, update: NetworkUpdate) -> StoreResult<Network> {
        let mut tables = self.tables.write();
        let network = tables
            .networks
            .get_mut(&id)
            .ok_or(StoreError::NotFound(id))?;
        update.apply(network);
        Ok(network.clone())
    }

    /// Relabels a host, returning the updated record.
    pub fn update_host(&self, address: Address, description: &str) -> StoreResult<Host> {
        let mut tables = self.tables.write();
        let host = tables
            .hosts
            .get_mut(&address)
            .ok_or_else(|| StoreError::Constraint(format!("no host holds {}", address)))?;
        host.description = description.to_owned();
        Ok(host.clone())
    }

    /// Removes a host, returning it.
    pub fn remove_host(&self, address: Address) -> StoreResult<Host> {
        self.tables
            .write()
            .hosts
            .remove(&address)
            .ok_or_else(|| StoreError::Constraint(format!("no host holds {}", address)))
    }

    /// Removes a network that holds neither child networks nor hosts.
    pub fn remove_network(&self, id: NetworkId) -> StoreResult<Network> {
        let mut tables = self.tables.write();
        tables.network(id)?;

        if tables.siblings(Some(id)).next().is_some() {
            return Err(StoreError::Constraint(format!(
                "network {} still has child networks",
                id
            )));
        }
        if tables.hosts.values().any(|h| h.network == id) {
            return Err(StoreError::Constraint(format!(
                "network {} still has hosts",
                id
            )));
        }

        tables.networks.remove(&id).ok_or(StoreError::NotFound(id))
    }

    /// Number of stored networks.
    pub fn network_count(&self) -> usize {
        self.tables.read().networks.len()
    }

    /// Number of stored hosts.
    pub fn host_count(&self) -> usize {
        self.tables.read().hosts.len()
    }
}

impl NetworkStore for MemoryStore {
    fn network(&self, id: NetworkId) -> StoreResult<Network> {
        self.tables.read().network(id).map(Clone::clone)
    }

    fn children(&self, id: NetworkId) -> StoreResult<Vec<Network>> {
        let tables = self.tables.read();
        tables.network(id)?;
        let mut children = tables.siblings(Some(id)).cloned().collect::<Vec<_>>();
        children.sort_by_key(|n| n.block);
        Ok(children)
    }

    fn hosts(&self, id: NetworkId) -> StoreResult<Vec<Host>> {
        let tables = self.tables.read();
        tables.network(id)?;
        Ok(tables
            .hosts
            .values()
            .filter(|h| h.network == id)
            .cloned()
            .collect())
    }

    fn insert_network(&self, new: NewNetwork) -> StoreResult<Network> {
        let mut tables = self.tables.write();

        if let Some(parent) = new.parent {
            let parent = tables.network(parent)?;
            if !contains(&parent.block, &new.block) {
                debug!(block = %new.block, parent = %parent.block, "network outside parent.");
                return Err(StoreError::Constraint(format!(
                    "{} is not within {}",
                    new.block, parent.block
                )));
            }
        }

        if let Some(existing) = tables
            .siblings(new.parent)
            .find(|n| overlaps(&n.block, &new.block))
        {
            debug!(block = %new.block, existing = %existing.block, "network overlaps sibling.");
            return Err(StoreError::Conflict(new.block.to_string()));
        }

        tables.last_id += 1;
        let network = Network {
            id: NetworkId(tables.last_id),
            parent: new.parent,
            block: new.block,
            description: new.description,
            owner: new.owner,
            account: new.account,
            service: new.service,
            subdivide: new.subdivide,
            valid_masks: new.valid_masks,
        };
        tables.networks.insert(network.id, network.clone());

        Ok(network)
    }

    fn insert_host(&self, host: Host) -> StoreResult<Host> {
        let mut tables = self.tables.write();

        let block = tables.network(host.network)?.block;
        let (first, last) = block.usable();
        if host.address.family() != block.family() || host.address < first || host.address > last
        {
            debug!(address = %host.address, %block, "host outside usable range.");
            return Err(StoreError::Constraint(format!(
                "{} is not a usable address of {}",
                host.address, block
            )));
        }

        if tables.hosts.contains_key(&host.address) {
            debug!(address = %host.address, "host address taken.");
            return Err(StoreError::Conflict(host.address.to_string()));
        }

        tables.hosts.insert(host.address, host.clone());
        Ok(host)
    }
}
