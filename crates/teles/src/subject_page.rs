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

//! The renderer-facing page model. A page is metadata plus one category of
//! blocks; each block holds one column of tiles, and every tile references
//! stat-var specs through string keys in the category-level registry.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const DEFAULT_RANKING_COUNT: u32 = 10;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubjectPageConfig {
    pub metadata: PageMetadata,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub categories: Vec<Category>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageMetadata {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub place_dcids: Vec<String>,
    /// Child place type per containing place, for map/ranking/scatter pages.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub contained_place_types: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Category {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub blocks: Vec<Block>,
    /// Keyed stat-var specs referenced by the tiles in this category.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub stat_var_spec: BTreeMap<String, StatVarSpec>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Block {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub title: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub columns: Vec<Column>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Column {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tiles: Vec<Tile>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TileType {
    #[default]
    Line,
    Bar,
    Map,
    Ranking,
    Scatter,
    PlaceOverview,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Tile {
    pub tile_type: TileType,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub title: String,
    /// Keys into the category's stat-var spec registry.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stat_var_key: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub comparison_places: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ranking_tile_spec: Option<RankingTileSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scatter_tile_spec: Option<ScatterTileSpec>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankingTileSpec {
    pub ranking_count: u32,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub show_highest: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub show_lowest: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScatterTileSpec {
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub highlight_top_right: bool,
}

/// One chartable quantity: a stat variable plus optional denominator
/// scaling. Tiles share specs through the category registry rather than
/// repeating them inline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatVarSpec {
    pub stat_var: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub denom: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scaling: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}
