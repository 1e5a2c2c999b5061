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

pub mod config;
pub mod detection;
pub mod error;
pub mod fulfillment;
pub mod kg;
pub mod page_config;
pub mod subject_page;
pub mod topic;
pub mod utterance;
pub mod variable;

pub use config::ResolverConfig;
pub use detection::{
    Classification, ClassificationType, ContainedInPlaceType, Detection, Place, PlaceDetection,
    RankingType, ScoredVariable, VariableDetection,
};
pub use error::{ConfigError, KgError, PageConfigError, ResolverError, Result};
pub use kg::{ChildVariable, KnowledgeGraph, VariableGroupInfo};
pub use subject_page::SubjectPageConfig;
pub use utterance::{
    ChartAttrs, ChartOrigin, ChartSpec, ChartType, SavedUtterance, Utterance,
    CONTEXT_LOOKBACK_LIMIT,
};

/// Ties the pipeline together for one conversation: resolve a detection
/// into an utterance, build the page, and round-trip session state.
pub struct ChartResolver<K: KnowledgeGraph> {
    kg: K,
    config: ResolverConfig,
}

impl<K: KnowledgeGraph> ChartResolver<K> {
    pub fn new(kg: K) -> Result<Self> {
        Self::with_config(kg, ResolverConfig::default())
    }

    pub fn with_config(kg: K, config: ResolverConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { kg, config })
    }

    /// Resolves one conversational turn against the prior turn's state.
    pub async fn resolve(&self, detection: &Detection, prev: Option<Utterance>) -> Utterance {
        fulfillment::fulfill(&self.kg, &self.config, detection, prev).await
    }

    /// Builds the renderable page for a resolved utterance.
    pub async fn build_page_config(&self, uttr: &Utterance) -> Result<SubjectPageConfig> {
        page_config::build_page_config(&self.kg, uttr).await
    }

    /// Serializes the utterance chain for the caller to hold as session
    /// state.
    pub fn save_context(&self, uttr: &Utterance) -> Result<String> {
        let saved = utterance::save_utterance(uttr);
        Ok(serde_json::to_string(&saved)?)
    }

    /// Restores the utterance chain saved by [`Self::save_context`].
    pub fn load_context(&self, raw: &str) -> Result<Option<Utterance>> {
        let saved: Vec<SavedUtterance> = serde_json::from_str(raw)?;
        Ok(utterance::load_utterance(saved))
    }
}
