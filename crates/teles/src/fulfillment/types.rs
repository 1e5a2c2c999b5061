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

use crate::config::ResolverConfig;
use crate::detection::{ContainedInPlaceType, Place, RankingType};
use crate::utterance::{ChartOrigin, Utterance};

/// State for a single populate pass. The block-id counter lives here and is
/// threaded through every handler call; no counter outlives one pass.
#[derive(Debug)]
pub(crate) struct PopulateState<'a> {
    pub uttr: &'a mut Utterance,
    pub place_type: Option<ContainedInPlaceType>,
    pub ranking_types: Vec<RankingType>,
    pub block_id: u32,
}

impl<'a> PopulateState<'a> {
    pub fn new(uttr: &'a mut Utterance) -> Self {
        Self {
            uttr,
            place_type: None,
            ranking_types: Vec::new(),
            block_id: 0,
        }
    }
}

/// A named grouping of stat variables rendered as one visual block. Two
/// chart specs sharing a block id land in the same block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ChartVars {
    pub svs: Vec<String>,
    pub block_id: u32,
    pub include_percapita: bool,
    pub title: Option<String>,
}

impl ChartVars {
    pub fn new(svs: Vec<String>, block_id: u32) -> Self {
        Self {
            svs,
            block_id,
            include_percapita: true,
            title: None,
        }
    }
}

/// Per-intent callbacks invoked by the generic populate driver. Callbacks
/// are synchronous; all collaborator traffic happens in the driver before
/// they run.
pub(crate) trait IntentHandler: Sync {
    /// Emit chart spec(s) for an existence-checked variable grouping.
    /// Returning false drops the grouping (e.g. unsupported shape).
    fn on_chart_vars(
        &self,
        state: &mut PopulateState<'_>,
        chart_vars: ChartVars,
        place: &Place,
        origin: ChartOrigin,
        cfg: &ResolverConfig,
    ) -> bool;

    /// Last resort when no variable produced a chart for this place:
    /// synthesize a default or report failure.
    fn on_fallback(
        &self,
        state: &mut PopulateState<'_>,
        place: &Place,
        cfg: &ResolverConfig,
    ) -> bool;
}
