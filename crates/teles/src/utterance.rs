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

use crate::detection::{
    Classification, ClassificationType, ContainedInPlaceType, Place, RankingType,
};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// How far back the conversational context goes. Context traversal is
/// bounded by this constant so a resolution pass terminates regardless of
/// session length.
pub const CONTEXT_LOOKBACK_LIMIT: usize = 5;

/// Primary charts answer what was directly asked; secondary charts come
/// from peer-group expansion of the primary variables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChartOrigin {
    Primary,
    Secondary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChartType {
    Timeline,
    Bar,
    Map,
    Ranking,
    PlaceOverview,
    Scatter,
}

/// Typed chart attributes, interpreted per chart type by the page-config
/// builder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartAttrs {
    pub origin: ChartOrigin,
    pub block_id: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub place_type: Option<ContainedInPlaceType>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ranking_types: Vec<RankingType>,
    pub include_percapita: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

/// One fully-qualified chart candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSpec {
    pub chart_type: ChartType,
    pub svs: Vec<String>,
    pub places: Vec<Place>,
    pub attrs: ChartAttrs,
}

impl ChartSpec {
    /// Structural invariants per chart type. Violations are dropped (and
    /// logged) by the page-config builder, they never panic.
    pub fn is_valid(&self) -> bool {
        match self.chart_type {
            ChartType::Map | ChartType::Ranking => {
                self.places.len() == 1 && self.svs.len() == 1 && self.attrs.place_type.is_some()
            }
            ChartType::Scatter => self.svs.len() == 2,
            _ => true,
        }
    }
}

/// All resolved state of one conversational turn. Prior turns hang off
/// `prev` as read-only history; later turns never mutate them.
#[derive(Debug, Clone, Default)]
pub struct Utterance {
    pub query: String,
    pub query_type: ClassificationType,
    pub places: Vec<Place>,
    pub classifications: Vec<Classification>,
    /// Variables surviving the detection score threshold, in rank order.
    pub svs: Vec<String>,
    /// Multi-variable candidate sets from the current turn's detection.
    pub multi_svs: Vec<Vec<String>>,
    pub prev: Option<Box<Utterance>>,
    pub chart_candidates: Vec<ChartSpec>,
    pub ranked_charts: Vec<ChartSpec>,
}

/// Serialized form of one turn, shipped to the client as session state and
/// echoed back on the next turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavedUtterance {
    pub query: String,
    pub query_type: ClassificationType,
    pub places: Vec<Place>,
    pub classifications: Vec<Classification>,
    pub svs: Vec<String>,
    pub ranked_charts: Vec<ChartSpec>,
}

/// Flattens an utterance chain for persistence, latest turn first, bounded
/// by the lookback limit.
pub fn save_utterance(uttr: &Utterance) -> Vec<SavedUtterance> {
    let mut saved = Vec::new();
    let mut cur = Some(uttr);
    while let Some(u) = cur {
        if saved.len() >= CONTEXT_LOOKBACK_LIMIT {
            break;
        }
        saved.push(SavedUtterance {
            query: u.query.clone(),
            query_type: u.query_type,
            places: u.places.clone(),
            classifications: u.classifications.clone(),
            svs: u.svs.clone(),
            ranked_charts: u.ranked_charts.clone(),
        });
        cur = u.prev.as_deref();
    }
    saved
}

/// Rebuilds the utterance chain saved by [`save_utterance`] and returns the
/// latest turn. Oversized context is truncated to the lookback limit.
pub fn load_utterance(mut saved: Vec<SavedUtterance>) -> Option<Utterance> {
    if saved.len() > CONTEXT_LOOKBACK_LIMIT {
        warn!(
            count = saved.len(),
            "Too many past utterances; truncating to lookback limit"
        );
        saved.truncate(CONTEXT_LOOKBACK_LIMIT);
    }
    let mut prev: Option<Box<Utterance>> = None;
    for s in saved.into_iter().rev() {
        prev = Some(Box::new(Utterance {
            query: s.query,
            query_type: s.query_type,
            places: s.places,
            classifications: s.classifications,
            svs: s.svs,
            multi_svs: Vec::new(),
            prev,
            chart_candidates: Vec::new(),
            ranked_charts: s.ranked_charts,
        }));
    }
    prev.map(|b| *b)
}
