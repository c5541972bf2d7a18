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

use proptest::collection::vec;
use proptest::strategy::{Strategy, ValueTree};
use proptest::test_runner::{Config, TestRunner};

/// Random value generator, which, given proptest strategies, generates
/// values outside of a `proptest!` block, e.g. benchmark inputs.
#[derive(Default)]
pub struct Rvg {
    runner: TestRunner,
}

impl Rvg {
    /// Creates a generator seeded from the OS.
    pub fn new() -> Self {
        Rvg {
            runner: TestRunner::new(Config::default()),
        }
    }

    /// Creates a generator with the same seed on every run, so benchmark
    /// inputs are comparable.
    pub fn deterministic() -> Self {
        Rvg {
            runner: TestRunner::deterministic(),
        }
    }

    /// Generates one value.
    ///
    /// # Example
    ///
    /// ```
    /// let mut gen = Rvg::new();
    /// let block = gen.generate(v6_block());
    /// ```
    pub fn generate<S: Strategy>(&mut self, strategy: S) -> S::Value {
        strategy
            .new_tree(&mut self.runner)
            .expect("No value can be generated")
            .current()
    }

    /// Generates `len` values.
    ///
    /// # Example
    ///
    /// ```
    /// let mut gen = Rvg::deterministic();
    /// let blocks = gen.generate_vec(&v4_block_min_mask(24), 10);
    /// ```
    pub fn generate_vec<S: Strategy>(&mut self, strategy: &S, len: usize) -> Vec<S::Value> {
        vec(strategy, len..=len)
            .new_tree(&mut self.runner)
            .expect("No value can be generated")
            .current()
    }
}
