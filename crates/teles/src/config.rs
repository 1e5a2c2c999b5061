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

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Detected variables scoring at or below this are dropped before resolution.
    pub sv_score_threshold: f64,
    /// How many prior turns are consulted for places/variables/intent.
    pub context_lookback: usize,
    /// Timeline charts are paginated at this many variables.
    pub max_vars_per_chart: usize,
    /// How many child places are sampled for existence checks.
    pub child_place_sample_size: usize,
    /// Peer-group extensions kept before the existence check.
    pub extension_pre_existence_limit: usize,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            sv_score_threshold: 0.5,
            context_lookback: 5,
            max_vars_per_chart: 5,
            child_place_sample_size: 5,
            extension_pre_existence_limit: 50,
        }
    }
}

impl ResolverConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.sv_score_threshold) {
            return Err(ConfigError::ValidationFailed {
                reason: "sv_score_threshold must be between 0.0 and 1.0".to_string(),
            });
        }
        if self.context_lookback == 0 {
            return Err(ConfigError::ValidationFailed {
                reason: "context_lookback must be greater than 0".to_string(),
            });
        }
        if self.max_vars_per_chart == 0 {
            return Err(ConfigError::ValidationFailed {
                reason: "max_vars_per_chart must be greater than 0".to_string(),
            });
        }
        if self.child_place_sample_size == 0 {
            return Err(ConfigError::ValidationFailed {
                reason: "child_place_sample_size must be greater than 0".to_string(),
            });
        }
        Ok(())
    }
}
