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

//! Top-level turn fulfilment: fold a detection result and the prior turn
//! into a new utterance, dispatch to the intent populator, and rank the
//! produced candidates.

use crate::config::ResolverConfig;
use crate::detection::{ClassificationType, Detection};
use crate::fulfillment::context;
use crate::fulfillment::{contained_in, correlation, ranking, simple};
use crate::kg::KnowledgeGraph;
use crate::utterance::Utterance;
use tracing::{debug, info};

/// Builds and populates the utterance for one conversational turn.
///
/// Detection scores below the configured threshold are dropped before any
/// chart work. An `Unknown` intent inherits the most recent known intent
/// from context, defaulting to simple.
pub async fn fulfill<K: KnowledgeGraph + ?Sized>(
    kg: &K,
    cfg: &ResolverConfig,
    detection: &Detection,
    prev: Option<Utterance>,
) -> Utterance {
    let svs: Vec<String> = detection
        .variables_detected
        .variables
        .iter()
        .filter(|v| v.score > cfg.sv_score_threshold)
        .map(|v| v.dcid.clone())
        .collect();
    debug!(
        detected = detection.variables_detected.variables.len(),
        kept = svs.len(),
        "Filtered detected variables by score"
    );

    let mut uttr = Utterance {
        query: detection.original_query.clone(),
        query_type: detection.query_type,
        classifications: detection.classifications.clone(),
        svs,
        multi_svs: detection.variables_detected.multi_variable_candidates.clone(),
        prev: prev.map(Box::new),
        ..Default::default()
    };
    if let Some(main_place) = &detection.places_detected.main_place {
        uttr.places.push(main_place.clone());
    }
    if uttr.query_type == ClassificationType::Unknown {
        uttr.query_type = context::query_type_from_context(&uttr, cfg.context_lookback);
        debug!(query_type = ?uttr.query_type, "Intent inherited from context");
    }

    let populated = match uttr.query_type {
        ClassificationType::ContainedIn => contained_in::populate(kg, cfg, &mut uttr).await,
        ClassificationType::Ranking => ranking::populate(kg, cfg, &mut uttr).await,
        ClassificationType::Correlation => correlation::populate(kg, cfg, &mut uttr).await,
        ClassificationType::Simple
        | ClassificationType::Comparison
        | ClassificationType::Unknown => simple::populate(kg, cfg, &mut uttr).await,
    };
    info!(
        query = %uttr.query,
        query_type = ?uttr.query_type,
        populated,
        candidates = uttr.chart_candidates.len(),
        "Fulfilment finished"
    );

    rank_charts(&mut uttr);
    uttr
}

/// Orders chart candidates into the ranked list. Candidates currently carry
/// no comparable score, so population order is preserved; this is the seam
/// where a scoring model plugs in.
fn rank_charts(uttr: &mut Utterance) {
    uttr.ranked_charts = uttr.chart_candidates.clone();
}
