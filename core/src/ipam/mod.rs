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

//! The allocation engine.
//!
//! [`algebra`] and [`search`] are pure functions over blocks and address
//! sets. They own no state, never log and never retry, so they are safe
//! to call from any number of threads at once. [`commit`] is the thin
//! layer that hands their answers to a [`NetworkStore`] and classifies
//! what comes back.
//!
//! [`NetworkStore`]: crate::store::NetworkStore

pub mod algebra;
pub mod commit;
pub mod search;

pub use self::algebra::{contains, overlaps, split, split_count, Subnets};
pub use self::commit::{commit_host, commit_network, retry_on_conflict};
pub use self::search::{
    available_blocks, check_child_mask, check_split_depth, default_child_mask, enumerate_hosts, free_blocks,
    host_slots, next_free_block, next_free_host, validate_candidate, validate_host, FreeBlocks,
    HostSlot,
};
