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

//! The persistence seam.
//!
//! The engine never owns the network tree or the host table. A store
//! serves snapshots of both and is the single place where uniqueness is
//! finally enforced: an insert that loses a race must fail with
//! [`StoreError::Conflict`], never succeed twice.

mod memory;

pub use self::memory::MemoryStore;

use crate::net::{Address, Block, MaskSet};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Identifier of a stored network.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct NetworkId(pub u64);

impl fmt::Display for NetworkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A stored network block and its descriptive metadata.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Network {
    /// Store-assigned identifier.
    pub id: NetworkId,
    /// The enclosing network, `None` for a root.
    pub parent: Option<NetworkId>,
    /// The address range. Immutable once stored.
    pub block: Block,
    /// Operator description.
    pub description: String,
    /// Team or person responsible for the network.
    pub owner: String,
    /// Billing or cloud account the network belongs to.
    pub account: String,
    /// Service the network is dedicated to.
    pub service: String,
    /// Whether the network is meant to hold child networks rather than
    /// hosts.
    pub subdivide: bool,
    /// Child masks the network permits.
    pub valid_masks: MaskSet,
}

/// A network about to be inserted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewNetwork {
    /// The enclosing network, `None` for a root.
    pub parent: Option<NetworkId>,
    /// The address range to claim.
    pub block: Block,
    /// Operator description.
    pub description: String,
    /// Team or person responsible for the network.
    pub owner: String,
    /// Billing or cloud account the network belongs to.
    pub account: String,
    /// Service the network is dedicated to.
    pub service: String,
    /// Whether the network will hold child networks rather than hosts.
    pub subdivide: bool,
    /// Child masks the network will permit.
    pub valid_masks: MaskSet,
}

impl NewNetwork {
    /// A root network with no description and no mask restriction.
    pub fn root(block: Block) -> Self {
        NewNetwork {
            parent: None,
            block,
            description: String::new(),
            owner: String::new(),
            account: String::new(),
            service: String::new(),
            subdivide: true,
            valid_masks: MaskSet::new(),
        }
    }

    /// A child of `parent` with no mask restriction.
    pub fn child(parent: NetworkId, block: Block, description: &str) -> Self {
        NewNetwork {
            parent: Some(parent),
            block,
            description: description.to_owned(),
            owner: String::new(),
            account: String::new(),
            service: String::new(),
            subdivide: false,
            valid_masks: MaskSet::new(),
        }
    }
}

/// Descriptive metadata changes to a stored network. `None` leaves a
/// field as it is. The block itself can never change.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NetworkUpdate {
    /// New operator description.
    pub description: Option<String>,
    /// New owner.
    pub owner: Option<String>,
    /// New account.
    pub account: Option<String>,
    /// New service.
    pub service: Option<String>,
    /// New subdivide flag.
    pub subdivide: Option<bool>,
    /// New set of permitted child masks.
    pub valid_masks: Option<MaskSet>,
}

impl NetworkUpdate {
    /// Applies the changes to `network`.
    pub fn apply(self, network: &mut Network) {
        if let Some(description) = self.description {
            network.description = description;
        }
        if let Some(owner) = self.owner {
            network.owner = owner;
        }
        if let Some(account) = self.account {
            network.account = account;
        }
        if let Some(service) = self.service {
            network.service = service;
        }
        if let Some(subdivide) = self.subdivide {
            network.subdivide = subdivide;
        }
        if let Some(valid_masks) = self.valid_masks {
            network.valid_masks = valid_masks;
        }
    }
}

/// A host address allocated inside a network.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Host {
    /// The allocated address. Immutable once stored.
    pub address: Address,
    /// The network holding the address.
    pub network: NetworkId,
    /// Operator label.
    pub description: String,
}

/// Storage failures, by class.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    /// A uniqueness constraint rejected the insert. Another writer got
    /// there first.
    #[error("{0} already exists")]
    Conflict(String),

    /// The referenced network does not exist.
    #[error("network {0} does not exist")]
    NotFound(NetworkId),

    /// Any other integrity rule rejected the write.
    #[error("constraint violated: {0}")]
    Constraint(String),

    /// The backend itself failed.
    #[error("backend failure: {0}")]
    Backend(String),
}

/// Result type for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// A network tree and host table the allocation engine reads snapshots
/// from and commits candidates to.
///
/// Implementations must reject, with [`StoreError::Conflict`]:
///
/// * a host whose address is already held by any host,
/// * a network overlapping an existing network under the same parent.
pub trait NetworkStore {
    /// Looks up one network.
    fn network(&self, id: NetworkId) -> StoreResult<Network>;

    /// The direct children of a network, in ascending block order.
    fn children(&self, id: NetworkId) -> StoreResult<Vec<Network>>;

    /// The hosts of a network, in ascending address order.
    fn hosts(&self, id: NetworkId) -> StoreResult<Vec<Host>>;

    /// Inserts a network, assigning its identifier.
    fn insert_network(&self, new: NewNetwork) -> StoreResult<Network>;

    /// Inserts a host.
    fn insert_host(&self, host: Host) -> StoreResult<Host>;
}

impl<S: NetworkStore + ?Sized> NetworkStore for &S {
    fn network(&self, id: NetworkId) -> StoreResult<Network> {
        (**self).network(id)
    }

    fn children(&self, id: NetworkId) -> StoreResult<Vec<Network>> {
        (**self).children(id)
    }

    fn hosts(&self, id: NetworkId) -> StoreResult<Vec<Host>> {
        (**self).hosts(id)
    }

    fn insert_network(&self, new: NewNetwork) -> StoreResult<Network> {
        (**self).insert_network(new)
    }

    fn insert_host(&self, host: Host) -> StoreResult<Host> {
        (**self).insert_host(host)
    }
}

impl<S: NetworkStore + ?Sized> NetworkStore for Arc<S> {
    fn network(&self, id: NetworkId) -> StoreResult<Network> {
        (**self).network(id)
    }

    fn children(&self, id: NetworkId) -> StoreResult<Vec<Network>> {
        (**self).children(id)
    }

    fn hosts(&self, id: NetworkId) -> StoreResult<Vec<Host>> {
        (**self).hosts(id)
    }

    fn insert_network(&self, new: NewNetwork) -> StoreResult<Network> {
        (**self).insert_network(new)
    }

    fn insert_host(&self, host: Host) -> StoreResult<Host> {
        (**self).insert_host(host)
    }
}
