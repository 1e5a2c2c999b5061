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

use crate::error::KgError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::error;

/// One child variable of a variable group, with its parsed-form definition
/// string when the graph has one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChildVariable {
    pub dcid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub definition: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariableGroupInfo {
    pub dcid: String,
    #[serde(default)]
    pub child_variables: Vec<ChildVariable>,
}

/// The knowledge-graph collaborator. All calls are batched: callers hand
/// over every id they care about in one call rather than looping.
///
/// A failed or empty response is treated by the pipeline as "no data" for
/// the candidates involved, never as fatal; implementations should reserve
/// `Err` for transport-level failures.
#[async_trait::async_trait]
pub trait KnowledgeGraph: Send + Sync {
    /// Outgoing property values for each dcid.
    async fn property_values(
        &self,
        dcids: &[String],
        property: &str,
    ) -> Result<BTreeMap<String, Vec<String>>, KgError>;

    /// Incoming property values for each dcid (nodes pointing *at* it).
    async fn property_values_in(
        &self,
        dcids: &[String],
        property: &str,
    ) -> Result<BTreeMap<String, Vec<String>>, KgError>;

    /// Child-variable listings for the given variable groups.
    async fn variable_group_info(
        &self,
        group_dcids: &[String],
    ) -> Result<Vec<VariableGroupInfo>, KgError>;

    /// For each variable, the subset of `places` with observation data.
    async fn observation_existence(
        &self,
        variables: &[String],
        places: &[String],
    ) -> Result<BTreeMap<String, BTreeSet<String>>, KgError>;

    /// Places of `child_type` contained in `place`.
    async fn child_places(&self, place: &str, child_type: &str) -> Result<Vec<String>, KgError>;
}

/// Existence check over a set of places: a variable survives if it has data
/// for at least one of the given (typically sampled) places. Collaborator
/// failure degrades to "nothing exists".
pub(crate) async fn svs_exist_for_places<K: KnowledgeGraph + ?Sized>(
    kg: &K,
    places: &[String],
    svs: &[String],
) -> BTreeSet<String> {
    if svs.is_empty() || places.is_empty() {
        return BTreeSet::new();
    }
    match kg.observation_existence(svs, places).await {
        Ok(existence) => svs
            .iter()
            .filter(|sv| existence.get(*sv).is_some_and(|p| !p.is_empty()))
            .cloned()
            .collect(),
        Err(e) => {
            error!(error = %e, "Existence check failed; treating all variables as missing");
            BTreeSet::new()
        }
    }
}
