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

//! Operator-facing operations over a store.
//!
//! Every operation reads a fresh snapshot, runs the engine on it and makes
//! exactly one commit attempt. Wrap calls in
//! [`retry_on_conflict`](crate::ipam::retry_on_conflict) to retry lost
//! races.

use crate::config::IpamConfig;
use crate::ensure;
use crate::error::{IpamError, Result};
use crate::ipam::{self, HostSlot};
use crate::net::{Address, Block};
use crate::store::{Host, Network, NetworkId, NetworkStore, NewNetwork};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info};

const AUTO_LABEL: &str = "auto";

/// How a new subnet is chosen.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SubnetRequest {
    /// The lowest free block of this prefix length.
    Mask(u8),
    /// Exactly this block.
    Explicit(Block),
}

/// The allocation service.
#[derive(Debug)]
pub struct Ipam<S> {
    store: S,
    config: IpamConfig,
}

impl<S: NetworkStore> Ipam<S> {
    /// Creates the service over a store.
    pub fn new(store: S, config: IpamConfig) -> Self {
        Ipam { store, config }
    }

    /// The underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// The active configuration.
    pub fn config(&self) -> &IpamConfig {
        &self.config
    }

    fn sibling_blocks(&self, id: NetworkId) -> Result<Vec<Block>> {
        Ok(self
            .store
            .children(id)?
            .into_iter()
            .map(|n| n.block)
            .collect())
    }

    fn taken(&self, id: NetworkId) -> Result<BTreeSet<Address>> {
        Ok(self
            .store
            .hosts(id)?
            .into_iter()
            .map(|h| h.address)
            .collect())
    }

    fn host_labels(&self, id: NetworkId) -> Result<BTreeMap<Address, String>> {
        Ok(self
            .store
            .hosts(id)?
            .into_iter()
            .map(|h| (h.address, h.description))
            .collect())
    }

    /// Lists the free child blocks of a network.
    ///
    /// Without a mask, lists at the shortest existing child mask, else at
    /// the network's preferred mask, else one bit below the network.
    pub fn available_subnets(&self, id: NetworkId, mask: Option<u8>) -> Result<Vec<Block>> {
        let network = self.store.network(id)?;
        let siblings = self.sibling_blocks(id)?;
        let mask = mask.unwrap_or_else(|| {
            ipam::default_child_mask(&network.block, &siblings, &network.valid_masks)
        });

        ipam::check_child_mask(&network.block, mask)?;
        ipam::check_split_depth(&network.block, mask, self.config.max_split_depth)?;

        debug!(network = %network.block, mask, siblings = siblings.len(), "listing subnets.");
        ipam::available_blocks(&network.block, &siblings, mask)
    }

    /// Allocates the lowest free host address of a network.
    pub fn allocate_host(&self, id: NetworkId, label: &str) -> Result<Host> {
        let network = self.store.network(id)?;
        let taken = self.taken(id)?;

        let address = ipam::next_free_host(&network.block, &taken)?;
        let host = ipam::commit_host(&self.store, new_host(address, id, label))?;

        info!(address = %host.address, network = %network.block, "allocated host.");
        Ok(host)
    }

    /// Allocates an operator-chosen host address.
    pub fn add_host(&self, id: NetworkId, address: Address, label: &str) -> Result<Host> {
        let network = self.store.network(id)?;
        let taken = self.taken(id)?;

        ipam::validate_host(&network.block, &taken, address)?;
        let host = ipam::commit_host(&self.store, new_host(address, id, label))?;

        info!(address = %host.address, network = %network.block, "added host.");
        Ok(host)
    }

    /// Allocates a child network.
    pub fn allocate_subnet(
        &self,
        id: NetworkId,
        request: SubnetRequest,
        description: &str,
        subdivide: bool,
    ) -> Result<Network> {
        let parent = self.store.network(id)?;
        let siblings = self.sibling_blocks(id)?;

        let block = match request {
            SubnetRequest::Mask(mask) => {
                check_permitted(&parent, mask)?;
                ipam::next_free_block(&parent.block, &siblings, mask)?
            }
            SubnetRequest::Explicit(candidate) => {
                check_permitted(&parent, candidate.mask())?;
                ipam::validate_candidate(&parent.block, &siblings, &candidate)?;
                candidate
            }
        };

        let new = NewNetwork {
            parent: Some(id),
            block,
            description: label_or_auto(description),
            owner: String::new(),
            account: String::new(),
            service: String::new(),
            subdivide,
            valid_masks: Default::default(),
        };
        let network = ipam::commit_network(&self.store, new)?;

        info!(block = %network.block, parent = %parent.block, "allocated subnet.");
        Ok(network)
    }

    /// Lists every usable address of a small network with its occupant.
    pub fn host_slots(&self, id: NetworkId) -> Result<Vec<HostSlot>> {
        let network = self.store.network(id)?;
        let hosts = self.host_labels(id)?;
        ipam::host_slots(&network.block, &hosts, self.config.host_enumeration_cap)
    }
}

fn check_permitted(parent: &Network, mask: u8) -> Result<()> {
    ensure!(
        parent.valid_masks.permits(mask),
        IpamError::MaskNotPermitted {
            mask,
            network: parent.block
        }
    );
    Ok(())
}

fn label_or_auto(label: &str) -> String {
    if label.trim().is_empty() {
        AUTO_LABEL.to_owned()
    } else {
        label.to_owned()
    }
}

fn new_host(address: Address, network: NetworkId, label: &str) -> Host {
    Host {
        address,
        network,
        description: label_or_auto(label),
    }
}
