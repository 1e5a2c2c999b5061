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
use crate::detection::{Classification, ClassificationType, ContainedInPlaceType, Place};
use crate::fulfillment::base;
use crate::fulfillment::context;
use crate::fulfillment::types::{ChartVars, IntentHandler, PopulateState};
use crate::kg::KnowledgeGraph;
use crate::utterance::{ChartOrigin, ChartType, Utterance};
use tracing::warn;

const FALLBACK_SV: &str = "Count_Person";

pub(crate) async fn populate<K: KnowledgeGraph + ?Sized>(
    kg: &K,
    cfg: &ResolverConfig,
    uttr: &mut Utterance,
) -> bool {
    let classifications = context::classifications_of_type_from_context(
        uttr,
        ClassificationType::ContainedIn,
        cfg.context_lookback,
    );
    for classification in classifications {
        let Classification::ContainedIn { place_type } = classification else {
            continue;
        };
        let mut state = PopulateState::new(uttr);
        state.place_type = Some(place_type);
        if base::populate_charts(kg, cfg, &mut state, &ContainedInHandler).await {
            return true;
        }
    }
    // No usable classification anywhere in context; try the default child
    // type rather than giving up outright.
    let mut state = PopulateState::new(uttr);
    state.place_type = Some(ContainedInPlaceType::County);
    base::populate_charts(kg, cfg, &mut state, &ContainedInHandler).await
}

struct ContainedInHandler;

impl IntentHandler for ContainedInHandler {
    fn on_chart_vars(
        &self,
        state: &mut PopulateState<'_>,
        chart_vars: ChartVars,
        place: &Place,
        origin: ChartOrigin,
        cfg: &ResolverConfig,
    ) -> bool {
        if state.place_type.is_none() {
            return false;
        }
        if chart_vars.svs.len() > 1 {
            warn!(
                svs = ?chart_vars.svs,
                "Peer-group charts are unsupported for contained-in queries; dropping"
            );
            return false;
        }
        if chart_vars.svs.is_empty() {
            return false;
        }
        base::add_chart_to_utterance(
            state,
            cfg,
            ChartType::Map,
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
        state.block_id += 1;
        let chart_vars = ChartVars::new(vec![FALLBACK_SV.to_string()], state.block_id);
        self.on_chart_vars(state, chart_vars, place, ChartOrigin::Primary, cfg)
    }
}
