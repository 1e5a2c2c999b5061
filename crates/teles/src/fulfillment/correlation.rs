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

//! Correlation pairs the turn's main variables against a related variable
//! drawn from the same turn's secondary candidates or from context, and
//! renders one scatter per pair over child places. Unlike the other intents
//! there is no default child place type; without a contained-in
//! classification somewhere in context the intent fails.

use crate::config::ResolverConfig;
use crate::detection::{Classification, ClassificationType, Place};
use crate::fulfillment::base;
use crate::fulfillment::context;
use crate::fulfillment::types::{ChartVars, PopulateState};
use crate::kg::{svs_exist_for_places, KnowledgeGraph};
use crate::utterance::{ChartOrigin, ChartType, Utterance};
use crate::variable;
use tracing::{debug, info};

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
    if classifications.is_empty() {
        info!("Correlation requires a child place type; none found in context");
        return false;
    }

    let main_svs: Vec<String> = uttr
        .svs
        .iter()
        .filter(|sv| variable::is_sv(sv))
        .cloned()
        .collect();
    if main_svs.is_empty() {
        info!("Correlation requires plain variables in the current turn");
        return false;
    }
    let related_svs = related_candidates(uttr, &main_svs, cfg.context_lookback);
    if related_svs.is_empty() {
        info!("No related-variable candidates for correlation");
        return false;
    }

    let places = {
        let mut places = uttr.places.clone();
        places.extend(context::places_from_context(uttr, cfg.context_lookback));
        places
    };

    for classification in classifications {
        let Classification::ContainedIn { place_type } = classification else {
            continue;
        };
        for place in &places {
            let mut state = PopulateState::new(uttr);
            state.place_type = Some(place_type);
            if add_charts(kg, cfg, &mut state, place, &main_svs, &related_svs).await {
                return true;
            }
        }
    }
    false
}

/// Related-variable candidates in preference order: the turn's own
/// secondary candidates first, then variables from prior turns. Main
/// variables never pair with themselves.
fn related_candidates(uttr: &Utterance, main_svs: &[String], lookback: usize) -> Vec<String> {
    let mut related: Vec<String> = Vec::new();
    for group in &uttr.multi_svs {
        for sv in group {
            if variable::is_sv(sv) && !main_svs.contains(sv) && !related.contains(sv) {
                related.push(sv.clone());
            }
        }
    }
    for group in context::svs_from_context(uttr, lookback) {
        for sv in group {
            if variable::is_sv(&sv) && !main_svs.contains(&sv) && !related.contains(&sv) {
                related.push(sv);
            }
        }
    }
    related
}

async fn add_charts<K: KnowledgeGraph + ?Sized>(
    kg: &K,
    cfg: &ResolverConfig,
    state: &mut PopulateState<'_>,
    place: &Place,
    main_svs: &[String],
    related_svs: &[String],
) -> bool {
    let place_type = match state.place_type {
        Some(pt) => pt,
        None => return false,
    };
    let places_to_check =
        base::sample_child_places(kg, cfg, &place.dcid, place_type.as_str()).await;
    if places_to_check.is_empty() {
        return false;
    }

    let (existing_main, existing_related) = futures::join!(
        svs_exist_for_places(kg, &places_to_check, main_svs),
        svs_exist_for_places(kg, &places_to_check, related_svs),
    );

    // First related variable with data wins; one scatter per main variable.
    let Some(related) = related_svs.iter().find(|sv| existing_related.contains(*sv)) else {
        debug!(place = %place.dcid, "No related variable has data for the child places");
        return false;
    };

    let mut found = false;
    for main in main_svs {
        if !existing_main.contains(main) || main == related {
            continue;
        }
        state.block_id += 1;
        let chart_vars = ChartVars::new(vec![main.clone(), related.clone()], state.block_id);
        found |= base::add_chart_to_utterance(
            state,
            cfg,
            ChartType::Scatter,
            chart_vars,
            vec![place.clone()],
            ChartOrigin::Primary,
        );
    }
    found
}
