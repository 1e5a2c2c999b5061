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

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Place {
    pub dcid: String,
    pub name: String,
    pub place_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
}

impl Place {
    pub fn new(dcid: &str, name: &str, place_type: &str) -> Self {
        Self {
            dcid: dcid.to_string(),
            name: name.to_string(),
            place_type: place_type.to_string(),
            country: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ClassificationType {
    #[default]
    Unknown,
    Simple,
    ContainedIn,
    Ranking,
    Correlation,
    Comparison,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RankingType {
    High,
    Low,
    Best,
    Worst,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContainedInPlaceType {
    Country,
    State,
    Province,
    County,
    District,
    City,
    Town,
    Zip,
    Place,
}

impl ContainedInPlaceType {
    /// Knowledge-graph type name for this child place type.
    pub fn as_str(&self) -> &'static str {
        match self {
            ContainedInPlaceType::Country => "Country",
            ContainedInPlaceType::State => "State",
            ContainedInPlaceType::Province => "Province",
            ContainedInPlaceType::County => "County",
            ContainedInPlaceType::District => "District",
            ContainedInPlaceType::City => "City",
            ContainedInPlaceType::Town => "Town",
            ContainedInPlaceType::Zip => "CensusZipCodeTabulationArea",
            ContainedInPlaceType::Place => "Place",
        }
    }
}

/// One detected classification. Each variant carries exactly the payload
/// that belongs to its tag; there is no shared attribute bag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "attributes")]
pub enum Classification {
    Simple,
    ContainedIn { place_type: ContainedInPlaceType },
    Ranking { types: Vec<RankingType> },
    Correlation,
    Comparison,
    Unknown,
}

impl Classification {
    pub fn classification_type(&self) -> ClassificationType {
        match self {
            Classification::Simple => ClassificationType::Simple,
            Classification::ContainedIn { .. } => ClassificationType::ContainedIn,
            Classification::Ranking { .. } => ClassificationType::Ranking,
            Classification::Correlation => ClassificationType::Correlation,
            Classification::Comparison => ClassificationType::Comparison,
            Classification::Unknown => ClassificationType::Unknown,
        }
    }
}

/// A detected stat variable with its model confidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredVariable {
    pub dcid: String,
    pub score: f64,
}

impl ScoredVariable {
    pub fn new(dcid: &str, score: f64) -> Self {
        Self {
            dcid: dcid.to_string(),
            score,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlaceDetection {
    pub main_place: Option<Place>,
    #[serde(default)]
    pub places: Vec<Place>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VariableDetection {
    pub variables: Vec<ScoredVariable>,
    /// Multi-variable candidates from delimiter-based splitting of the query.
    #[serde(default)]
    pub multi_variable_candidates: Vec<Vec<String>>,
}

/// The output of the external place/variable/intent detectors, consumed as
/// the input of a resolution pass.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Detection {
    pub original_query: String,
    #[serde(default)]
    pub cleaned_query: String,
    pub query_type: ClassificationType,
    #[serde(default)]
    pub places_detected: PlaceDetection,
    #[serde(default)]
    pub variables_detected: VariableDetection,
    #[serde(default)]
    pub classifications: Vec<Classification>,
}
