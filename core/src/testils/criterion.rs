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

//! Criterion helpers.

use super::Rvg;
use criterion::{black_box, Bencher};
use proptest::strategy::Strategy;
use std::cmp;
use std::time::{Duration, Instant};

/// Extends criterion's `Bencher` with proptest generated inputs.
pub trait BencherExt {
    /// Times `routine` over inputs drawn from `strategy`.
    ///
    /// Inputs are generated `batch_size` at a time with a deterministic
    /// seed, outside of the measured section.
    fn iter_generated<R, S, O>(&mut self, batch_size: usize, strategy: S, routine: R)
    where
        R: FnMut(S::Value) -> O,
        S: Strategy;
}

impl BencherExt for Bencher<'_> {
    fn iter_generated<R, S, O>(&mut self, batch_size: usize, strategy: S, mut routine: R)
    where
        R: FnMut(S::Value) -> O,
        S: Strategy,
    {
        self.iter_custom(|iters| {
            let mut gen = Rvg::deterministic();
            let mut elapsed = Duration::from_secs(0);
            let mut remaining = iters;

            while remaining > 0 {
                let len = cmp::min(batch_size as u64, remaining) as usize;
                let inputs = black_box(gen.generate_vec(&strategy, len));

                let start = Instant::now();
                let outputs = inputs.into_iter().map(&mut routine).collect::<Vec<_>>();
                elapsed += start.elapsed();

                black_box(outputs);
                remaining -= len as u64;
            }

            elapsed
        })
    }
}
