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
use crate::detection::Place;
use crate::fulfillment::base;
use crate::fulfillment::types::{ChartVars, IntentHandler, PopulateState};
use crate::kg::KnowledgeGraph;
use crate::utterance::{ChartOrigin, ChartType, Utterance};

pub(crate) async fn populate<K: KnowledgeGraph + ?Sized>(
    kg: &K,
    cfg: &ResolverConfig,
    uttr: &mut Utterance,
) -> bool {
    let mut state = PopulateState::new(uttr);
    base::populate_charts(kg, cfg, &mut state, &SimpleHandler).await
}

struct SimpleHandler;

impl IntentHandler for SimpleHandler {
    fn on_chart_vars(
        &self,
        state: &mut PopulateState<'_>,
        chart_vars: ChartVars,
        place: &Place,
        origin: ChartOrigin,
        cfg: &ResolverConfig,
    ) -> bool {
        base::add_chart_to_utterance(
            state,
            cfg,
            ChartType::Timeline,
            chart_vars,
            vec![place.clone()],
            origin,
        )
    }

    fn on_fallback(
        &self,
        state: &mut PopulateState<'_>,
        place: &Place,
        cfg: &ResolverConfig,
    ) -> bool {
        // Nothing measurable was asked for; show a place overview instead.
        state.block_id += 1;
        let chart_vars = ChartVars {
            svs: Vec::new(),
            block_id: state.block_id,
            include_percapita: false,
            title: None,
        };
        base::add_chart_to_utterance(
            state,
            cfg,
            ChartType::PlaceOverview,
            chart_vars,
            vec![place.clone()],
            ChartOrigin::Primary,
        )
    }
}
