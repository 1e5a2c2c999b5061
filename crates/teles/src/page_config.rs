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

//! Turns an utterance's ranked charts into a renderer-facing page. The
//! walk is order-preserving and deterministic: the same utterance always
//! yields the same page, byte for byte once serialized.

use crate::detection::RankingType;
use crate::error::{PageConfigError, Result};
use crate::kg::KnowledgeGraph;
use crate::subject_page::{
    Block, Category, Column, PageMetadata, RankingTileSpec, ScatterTileSpec, StatVarSpec,
    SubjectPageConfig, Tile, TileType, DEFAULT_RANKING_COUNT,
};
use crate::utterance::{ChartSpec, ChartType, Utterance};
use crate::variable;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, error};

const PER_CAPITA_DENOM: &str = "Count_Person";
const PER_CAPITA_SCALING: u32 = 100;
const PER_CAPITA_UNIT: &str = "%";
const MULTI_VAR_TITLE: &str = "Compare with Other Variables";
const BAR_KEY_SUFFIX: &str = "_multiple_place_bar_block";
const SCATTER_KEY_SUFFIX: &str = "_scatter";

/// Builds the page for an utterance's ranked charts. Fails only when there
/// is nothing to build from; individually malformed charts are logged and
/// skipped.
pub async fn build_page_config<K: KnowledgeGraph + ?Sized>(
    kg: &K,
    uttr: &Utterance,
) -> Result<SubjectPageConfig> {
    if uttr.ranked_charts.is_empty() {
        return Err(PageConfigError::NoRankedCharts.into());
    }
    let first = &uttr.ranked_charts[0];
    let main_place = first
        .places
        .first()
        .ok_or(PageConfigError::MissingMainPlace)?;

    let mut metadata = PageMetadata {
        place_dcids: vec![main_place.dcid.clone()],
        contained_place_types: BTreeMap::new(),
    };
    if matches!(
        first.chart_type,
        ChartType::Map | ChartType::Ranking | ChartType::Scatter
    ) {
        if let Some(pt) = first.attrs.place_type {
            metadata
                .contained_place_types
                .insert(main_place.place_type.clone(), pt.as_str().to_string());
        }
    }

    let all_svs: Vec<String> = uttr
        .ranked_charts
        .iter()
        .flat_map(|c| c.svs.iter().cloned())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let sv_names = variable::get_sv_names(kg, &all_svs).await;

    let mut builder = PageBuilder::default();
    for chart in &uttr.ranked_charts {
        if !chart.is_valid() {
            error!(
                chart_type = ?chart.chart_type,
                svs = ?chart.svs,
                "Chart candidate violates its structural invariant; dropping"
            );
            continue;
        }
        builder.start_block(chart.attrs.block_id);
        match chart.chart_type {
            ChartType::PlaceOverview => builder.add_place_overview(chart),
            ChartType::Timeline => builder.add_timeline(chart, &sv_names),
            ChartType::Bar => builder.add_bar(chart, &sv_names),
            ChartType::Map => builder.add_map(chart, &sv_names),
            ChartType::Ranking => builder.add_ranking(chart, &sv_names),
            ChartType::Scatter => builder.add_scatter(chart, &sv_names),
        }
    }
    let category = builder.finish();
    debug!(
        blocks = category.blocks.len(),
        stat_var_specs = category.stat_var_spec.len(),
        "Page built"
    );

    Ok(SubjectPageConfig {
        metadata,
        categories: vec![category],
    })
}

/// Accumulates blocks in ranked-chart order, flushing whenever the block id
/// changes. Each block holds one column.
#[derive(Default)]
struct PageBuilder {
    blocks: Vec<Block>,
    block: Block,
    column: Column,
    block_id: Option<u32>,
    stat_var_spec: BTreeMap<String, StatVarSpec>,
}

impl PageBuilder {
    fn start_block(&mut self, block_id: u32) {
        if self.block_id != Some(block_id) {
            self.flush();
            self.block_id = Some(block_id);
        }
    }

    fn flush(&mut self) {
        if self.column.tiles.is_empty() {
            self.block = Block::default();
        } else {
            let mut block = std::mem::take(&mut self.block);
            block.columns.push(std::mem::take(&mut self.column));
            self.blocks.push(block);
        }
        self.block_id = None;
    }

    fn finish(mut self) -> Category {
        self.flush();
        Category {
            blocks: self.blocks,
            stat_var_spec: self.stat_var_spec,
        }
    }

    fn register(&mut self, key: &str, spec: StatVarSpec) {
        // Re-registering an identical key is an idempotent overwrite.
        self.stat_var_spec.insert(key.to_string(), spec);
    }

    fn register_plain(&mut self, sv: &str, name: &str) {
        self.register(
            sv,
            StatVarSpec {
                stat_var: sv.to_string(),
                name: name.to_string(),
                ..Default::default()
            },
        );
    }

    fn register_percapita(&mut self, key: &str, sv: &str, name: &str) {
        self.register(
            key,
            StatVarSpec {
                stat_var: sv.to_string(),
                name: name.to_string(),
                denom: Some(PER_CAPITA_DENOM.to_string()),
                scaling: Some(PER_CAPITA_SCALING),
                unit: Some(PER_CAPITA_UNIT.to_string()),
            },
        );
    }

    fn add_place_overview(&mut self, chart: &ChartSpec) {
        if let Some(place) = chart.places.first() {
            self.block.title = place.name.clone();
        }
        self.column.tiles.push(Tile {
            tile_type: TileType::PlaceOverview,
            ..Default::default()
        });
    }

    fn add_timeline(&mut self, chart: &ChartSpec, sv_names: &BTreeMap<String, String>) {
        if chart.svs.len() == 1 {
            let sv = &chart.svs[0];
            let name = display_name(sv_names, sv);
            self.register_plain(sv, &name);
            self.column.tiles.push(Tile {
                tile_type: TileType::Line,
                title: name.clone(),
                stat_var_key: vec![sv.clone()],
                ..Default::default()
            });
            if chart.attrs.include_percapita && variable::is_percapita_relevant(sv) {
                let pc_key = format!("{sv}_pc");
                self.register_percapita(&pc_key, sv, &name);
                self.column.tiles.push(Tile {
                    tile_type: TileType::Line,
                    title: format!("{name} - Per Capita"),
                    stat_var_key: vec![pc_key],
                    ..Default::default()
                });
            }
            return;
        }

        let title = chart
            .attrs
            .title
            .clone()
            .unwrap_or_else(|| MULTI_VAR_TITLE.to_string());
        let mut keys = Vec::new();
        let mut pc_keys = Vec::new();
        for sv in &chart.svs {
            let name = display_name(sv_names, sv);
            self.register_plain(sv, &name);
            keys.push(sv.clone());
            if chart.attrs.include_percapita && variable::is_percapita_relevant(sv) {
                let pc_key = format!("{sv}_pc");
                self.register_percapita(&pc_key, sv, &name);
                pc_keys.push(pc_key);
            }
        }
        self.column.tiles.push(Tile {
            tile_type: TileType::Line,
            title: title.clone(),
            stat_var_key: keys,
            ..Default::default()
        });
        if !pc_keys.is_empty() {
            self.column.tiles.push(Tile {
                tile_type: TileType::Line,
                title: format!("{title} - Per Capita"),
                stat_var_key: pc_keys,
                ..Default::default()
            });
        }
    }

    fn add_bar(&mut self, chart: &ChartSpec, sv_names: &BTreeMap<String, String>) {
        let comparison_places: Vec<String> =
            chart.places.iter().map(|p| p.dcid.clone()).collect();
        let title = chart
            .attrs
            .title
            .clone()
            .unwrap_or_else(|| "Total".to_string());

        let mut keys = Vec::new();
        let mut pc_keys = Vec::new();
        for sv in &chart.svs {
            let name = display_name(sv_names, sv);
            // Bar keys are suffixed so the same variable can also appear in
            // a timeline block without colliding.
            let key = format!("{sv}{BAR_KEY_SUFFIX}");
            self.register(
                &key,
                StatVarSpec {
                    stat_var: sv.clone(),
                    name: name.clone(),
                    ..Default::default()
                },
            );
            keys.push(key);
            if chart.attrs.include_percapita && variable::is_percapita_relevant(sv) {
                let pc_key = format!("{sv}{BAR_KEY_SUFFIX}_pc");
                self.register_percapita(&pc_key, sv, &name);
                pc_keys.push(pc_key);
            }
        }
        self.column.tiles.push(Tile {
            tile_type: TileType::Bar,
            title,
            stat_var_key: keys,
            comparison_places: comparison_places.clone(),
            ..Default::default()
        });
        if !pc_keys.is_empty() {
            self.column.tiles.push(Tile {
                tile_type: TileType::Bar,
                title: "Per Capita".to_string(),
                stat_var_key: pc_keys,
                comparison_places,
                ..Default::default()
            });
        }
    }

    fn add_map(&mut self, chart: &ChartSpec, sv_names: &BTreeMap<String, String>) {
        let sv = &chart.svs[0];
        let name = display_name(sv_names, sv);
        self.register_plain(sv, &name);
        self.column.tiles.push(Tile {
            tile_type: TileType::Map,
            title: name.clone(),
            stat_var_key: vec![sv.clone()],
            ..Default::default()
        });
        if chart.attrs.include_percapita && variable::is_percapita_relevant(sv) {
            let pc_key = format!("{sv}_pc");
            self.register_percapita(&pc_key, sv, &name);
            self.column.tiles.push(Tile {
                tile_type: TileType::Map,
                title: format!("{name} - Per Capita"),
                stat_var_key: vec![pc_key],
                ..Default::default()
            });
        }
    }

    fn add_ranking(&mut self, chart: &ChartSpec, sv_names: &BTreeMap<String, String>) {
        let sv = &chart.svs[0];
        let name = display_name(sv_names, sv);
        let place_name = chart
            .places
            .first()
            .map(|p| p.name.clone())
            .unwrap_or_default();
        let spec = ranking_tile_spec(sv, &chart.attrs.ranking_types);

        self.register_plain(sv, &name);
        self.column.tiles.push(Tile {
            tile_type: TileType::Ranking,
            title: format!("{name} in {place_name}"),
            stat_var_key: vec![sv.clone()],
            ranking_tile_spec: Some(spec.clone()),
            ..Default::default()
        });
        if chart.attrs.include_percapita && variable::is_percapita_relevant(sv) {
            let pc_key = format!("{sv}_pc");
            self.register_percapita(&pc_key, sv, &name);
            self.column.tiles.push(Tile {
                tile_type: TileType::Ranking,
                title: format!("Per Capita {name} in {place_name}"),
                stat_var_key: vec![pc_key],
                ranking_tile_spec: Some(spec),
                ..Default::default()
            });
        }
    }

    fn add_scatter(&mut self, chart: &ChartSpec, sv_names: &BTreeMap<String, String>) {
        let mut keys = Vec::new();
        let mut names = Vec::new();

        let already_pc: Vec<bool> = chart
            .svs
            .iter()
            .map(|sv| variable::is_sv_percapita_by_name(&display_name(sv_names, sv)))
            .collect();
        // When exactly one axis is already a percentage-like measure, the
        // other is coerced to per capita so the axes are comparable.
        let coerce = already_pc.iter().filter(|b| **b).count() == 1;

        for (sv, is_pc) in chart.svs.iter().zip(&already_pc) {
            let name = display_name(sv_names, sv);
            let key = format!("{sv}{SCATTER_KEY_SUFFIX}");
            if coerce && !is_pc {
                let pc_name = format!("{name} Per Capita");
                self.register_percapita(&key, sv, &pc_name);
                names.push(pc_name);
            } else {
                self.register(
                    &key,
                    StatVarSpec {
                        stat_var: sv.clone(),
                        name: name.clone(),
                        ..Default::default()
                    },
                );
                names.push(name);
            }
            keys.push(key);
        }

        self.column.tiles.push(Tile {
            tile_type: TileType::Scatter,
            title: format!("{} vs. {}", names[0], names[1]),
            stat_var_key: keys,
            scatter_tile_spec: Some(ScatterTileSpec {
                highlight_top_right: true,
            }),
            ..Default::default()
        });
    }
}

fn display_name(sv_names: &BTreeMap<String, String>, sv: &str) -> String {
    sv_names.get(sv).cloned().unwrap_or_else(|| sv.to_string())
}

/// Ranking direction flags. Directions accumulate rather than compete: a
/// query asking for both ends gets both lists. Best/Worst resolve to a
/// concrete end for every variable; for crime-related variables BEST means
/// fewest and WORST means most, so those two invert before the plain
/// HIGH/LOW mapping.
fn ranking_tile_spec(sv: &str, ranking_types: &[RankingType]) -> RankingTileSpec {
    let inverted = sv.contains("CriminalActivities");
    let mut spec = RankingTileSpec {
        ranking_count: DEFAULT_RANKING_COUNT,
        show_highest: false,
        show_lowest: false,
    };
    for rt in ranking_types {
        match rt {
            RankingType::High => spec.show_highest = true,
            RankingType::Low => spec.show_lowest = true,
            RankingType::Best => {
                if inverted {
                    spec.show_lowest = true;
                } else {
                    spec.show_highest = true;
                }
            }
            RankingType::Worst => {
                if inverted {
                    spec.show_highest = true;
                } else {
                    spec.show_lowest = true;
                }
            }
        }
    }
    spec
}
