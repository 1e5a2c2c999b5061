// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (C) 2024 Jonathan Lee
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License version 3
// as published by the Free Software Foundation.
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.
// See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see https://www.gnu.org/licenses/.

use crate::fulfillment::types::ChartVars;
use crate::kg::{svs_exist_for_places, KnowledgeGraph};
use std::collections::BTreeSet;
use tracing::debug;

/// Existence-check bookkeeping for one top-level detected variable: the
/// chart-vars groupings it expanded into plus its peer extensions.
#[derive(Debug)]
pub(crate) struct SvExistenceState {
    pub sv: String,
    pub chart_vars_list: Vec<ChartVars>,
    pub extended_svs: Vec<String>,
}

/// Batches every variable involved in a populate pass into one existence
/// call, instead of one call per grouping.
#[derive(Debug)]
pub(crate) struct ExistenceCheckTracker {
    states: Vec<SvExistenceState>,
    exist: BTreeSet<String>,
}

impl ExistenceCheckTracker {
    pub fn new(states: Vec<SvExistenceState>) -> Self {
        Self {
            states,
            exist: BTreeSet::new(),
        }
    }

    pub async fn perform_existence_check<K: KnowledgeGraph + ?Sized>(
        &mut self,
        kg: &K,
        places: &[String],
    ) {
        let mut all_svs: BTreeSet<String> = BTreeSet::new();
        for state in &self.states {
            for cv in &state.chart_vars_list {
                all_svs.extend(cv.svs.iter().cloned());
            }
            all_svs.extend(state.extended_svs.iter().cloned());
        }
        let all_svs: Vec<String> = all_svs.into_iter().collect();
        self.exist = svs_exist_for_places(kg, places, &all_svs).await;
        if self.exist.is_empty() {
            debug!(?places, "Existence check found no data for any candidate");
        }
    }

    /// Filters to existing variables, preserving the input order.
    pub fn existing(&self, svs: &[String]) -> Vec<String> {
        svs.iter()
            .filter(|sv| self.exist.contains(*sv))
            .cloned()
            .collect()
    }

    pub fn states(&self) -> &[SvExistenceState] {
        &self.states
    }
}
