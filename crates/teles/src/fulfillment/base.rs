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

//! The generic populate driver shared by the simple, contained-in and
//! ranking intents. Tries the turn's own places and variables first, then
//! context, then the intent's fallback; per place-and-variable it expands
//! topics and variable groups into chart groupings, existence-checks them
//! in one batch and hands survivors to the intent callbacks.

use crate::config::ResolverConfig;
use crate::detection::Place;
use crate::fulfillment::context;
use crate::fulfillment::existence::{ExistenceCheckTracker, SvExistenceState};
use crate::fulfillment::types::{ChartVars, IntentHandler, PopulateState};
use crate::kg::KnowledgeGraph;
use crate::topic;
use crate::utterance::{ChartAttrs, ChartOrigin, ChartSpec, ChartType};
use crate::variable;
use itertools::Itertools;
use std::collections::{BTreeSet, HashSet};
use tracing::{debug, info};

pub(crate) async fn populate_charts<K: KnowledgeGraph + ?Sized>(
    kg: &K,
    cfg: &ResolverConfig,
    state: &mut PopulateState<'_>,
    handler: &dyn IntentHandler,
) -> bool {
    let places = state.uttr.places.clone();
    for place in &places {
        if populate_charts_for_place(kg, cfg, state, handler, place).await {
            return true;
        }
    }
    let context_places = context::places_from_context(state.uttr, cfg.context_lookback);
    for place in &context_places {
        if populate_charts_for_place(kg, cfg, state, handler, place).await {
            return true;
        }
    }
    false
}

async fn populate_charts_for_place<K: KnowledgeGraph + ?Sized>(
    kg: &K,
    cfg: &ResolverConfig,
    state: &mut PopulateState<'_>,
    handler: &dyn IntentHandler,
    place: &Place,
) -> bool {
    let svs = state.uttr.svs.clone();
    if !svs.is_empty() && add_charts(kg, cfg, state, handler, place, &svs).await {
        return true;
    }
    for context_svs in context::svs_from_context(state.uttr, cfg.context_lookback) {
        if add_charts(kg, cfg, state, handler, place, &context_svs).await {
            return true;
        }
    }
    debug!(place = %place.dcid, "No variables produced charts; invoking fallback");
    handler.on_fallback(state, place, cfg)
}

/// Sampled child places used for existence checks when a child place-type
/// is in play. Falls back to the place itself when the graph knows no
/// children.
pub(crate) async fn sample_child_places<K: KnowledgeGraph + ?Sized>(
    kg: &K,
    cfg: &ResolverConfig,
    place_dcid: &str,
    child_type: &str,
) -> Vec<String> {
    // Cities are numerous everywhere; a fixed sample works as well as a
    // lookup.
    if child_type == "City" {
        return vec!["geoId/0667000".to_string()];
    }
    match kg.child_places(place_dcid, child_type).await {
        Ok(children) if !children.is_empty() => children
            .into_iter()
            .take(cfg.child_place_sample_size)
            .collect(),
        _ => vec![place_dcid.to_string()],
    }
}

async fn add_charts<K: KnowledgeGraph + ?Sized>(
    kg: &K,
    cfg: &ResolverConfig,
    state: &mut PopulateState<'_>,
    handler: &dyn IntentHandler,
    place: &Place,
    svs: &[String],
) -> bool {
    info!(place = %place.name, ?svs, "Populating charts");

    let places_to_check = match state.place_type {
        Some(pt) => sample_child_places(kg, cfg, &place.dcid, pt.as_str()).await,
        None => vec![place.dcid.clone()],
    };
    if places_to_check.is_empty() {
        return false;
    }

    // Expand every candidate into chart groupings up front so the
    // existence check goes out as one batch.
    let mut exist_states: Vec<SvExistenceState> = Vec::new();
    for (rank, sv) in svs.iter().enumerate() {
        exist_states.push(SvExistenceState {
            sv: sv.clone(),
            chart_vars_list: build_chart_vars(kg, cfg, state, sv, rank).await,
            extended_svs: Vec::new(),
        });
    }

    let plain_svs: Vec<String> = svs.iter().filter(|sv| variable::is_sv(sv)).cloned().collect();
    let sv2extensions =
        variable::extend_svs(kg, &plain_svs, cfg.extension_pre_existence_limit).await;
    for exist_state in &mut exist_states {
        if let Some(ext) = sv2extensions.get(&exist_state.sv) {
            exist_state.extended_svs = ext.clone();
        }
    }

    let mut tracker = ExistenceCheckTracker::new(exist_states);
    tracker.perform_existence_check(kg, &places_to_check).await;

    // The same peer set can be reachable from several inputs; render it once.
    let mut emitted_extensions: HashSet<String> = HashSet::new();

    let mut found = false;
    for exist_state in tracker.states() {
        for chart_vars in &exist_state.chart_vars_list {
            let existing = tracker.existing(&chart_vars.svs);
            if existing.is_empty() {
                continue;
            }
            let mut cv = chart_vars.clone();
            cv.svs = existing;
            if handler.on_chart_vars(state, cv, place, ChartOrigin::Primary, cfg) {
                found = true;
            }
        }

        let existing_ext = tracker.existing(&exist_state.extended_svs);
        if existing_ext.len() > 1 && emitted_extensions.insert(peer_set_key(&existing_ext)) {
            state.block_id += 1;
            let cv = ChartVars::new(existing_ext, state.block_id);
            if handler.on_chart_vars(state, cv, place, ChartOrigin::Secondary, cfg) {
                found = true;
            }
        }
    }

    debug!(place = %place.name, found, "Populate pass finished for place");
    found
}

/// Expands one detected candidate into chart groupings: a plain variable is
/// its own grouping; a topic becomes one block of loose members plus one
/// block per curated peer group; a variable group becomes its children.
pub(crate) async fn build_chart_vars<K: KnowledgeGraph + ?Sized>(
    kg: &K,
    cfg: &ResolverConfig,
    state: &mut PopulateState<'_>,
    sv: &str,
    rank: usize,
) -> Vec<ChartVars> {
    if variable::is_sv(sv) {
        state.block_id += 1;
        return vec![ChartVars::new(vec![sv.to_string()], state.block_id)];
    }
    if variable::is_topic(sv) {
        let members = topic::get_topic_vars(sv, rank);
        let peer_groups = topic::get_topic_peers(&members);

        let mut just_svs: Vec<String> = Vec::new();
        let mut svpgs: Vec<(String, Vec<String>)> = Vec::new();
        for member in members {
            match peer_groups.get(&member) {
                Some(peers) if !peers.is_empty() => {
                    svpgs.push((topic::svpg_name(&member), peers.clone()));
                }
                _ => just_svs.push(member),
            }
        }

        let mut charts = Vec::new();
        state.block_id += 1;
        for member in just_svs {
            charts.push(ChartVars {
                svs: vec![member],
                block_id: state.block_id,
                include_percapita: false,
                title: None,
            });
        }
        for (title, peers) in svpgs {
            state.block_id += 1;
            charts.push(ChartVars {
                svs: peers,
                block_id: state.block_id,
                include_percapita: false,
                title: Some(title),
            });
        }
        return charts;
    }
    if variable::is_svg(sv) {
        let group_ids = vec![sv.to_string()];
        if let Ok(infos) = kg.variable_group_info(&group_ids).await {
            if let Some(info) = infos.iter().find(|i| i.dcid == sv) {
                let children: Vec<String> = info
                    .child_variables
                    .iter()
                    .map(|c| c.dcid.clone())
                    .take(cfg.extension_pre_existence_limit)
                    .collect();
                if !children.is_empty() {
                    state.block_id += 1;
                    return vec![ChartVars::new(children, state.block_id)];
                }
            }
        }
    }
    Vec::new()
}

/// Translates one chart grouping into chart spec(s) on the utterance.
/// Timeline groupings beyond the per-chart cap are paginated into
/// consecutive specs sharing the grouping's block id.
pub(crate) fn add_chart_to_utterance(
    state: &mut PopulateState<'_>,
    cfg: &ResolverConfig,
    chart_type: ChartType,
    chart_vars: ChartVars,
    places: Vec<Place>,
    origin: ChartOrigin,
) -> bool {
    let attrs = ChartAttrs {
        origin,
        block_id: chart_vars.block_id,
        place_type: state.place_type,
        ranking_types: state.ranking_types.clone(),
        include_percapita: chart_vars.include_percapita,
        title: chart_vars.title.clone(),
    };

    if chart_type == ChartType::Timeline && chart_vars.svs.len() > cfg.max_vars_per_chart {
        for chunk in chart_vars.svs.chunks(cfg.max_vars_per_chart) {
            state.uttr.chart_candidates.push(ChartSpec {
                chart_type,
                svs: chunk.to_vec(),
                places: places.clone(),
                attrs: attrs.clone(),
            });
        }
        return true;
    }

    state.uttr.chart_candidates.push(ChartSpec {
        chart_type,
        svs: chart_vars.svs,
        places,
        attrs,
    });
    true
}

/// Canonical key of a peer set, independent of member order.
pub(crate) fn peer_set_key(svs: &[String]) -> String {
    let set: BTreeSet<&String> = svs.iter().collect();
    set.into_iter().join(",")
}
