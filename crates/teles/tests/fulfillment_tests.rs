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

use std::collections::{BTreeMap, BTreeSet};

use teles::kg::{ChildVariable, VariableGroupInfo};
use teles::{
    Classification, ClassificationType, ContainedInPlaceType, Detection, KgError, KnowledgeGraph,
    Place, PlaceDetection, RankingType, ResolverConfig, ScoredVariable, ChartOrigin, ChartType,
    Utterance, VariableDetection,
};

/// In-memory knowledge graph keyed on static tables.
#[derive(Default)]
struct MockKg {
    properties: BTreeMap<(String, String), Vec<String>>,
    properties_in: BTreeMap<(String, String), Vec<String>>,
    groups: BTreeMap<String, Vec<ChildVariable>>,
    existence: BTreeMap<String, BTreeSet<String>>,
    children: BTreeMap<(String, String), Vec<String>>,
}

impl MockKg {
    fn with_property(mut self, dcid: &str, property: &str, values: &[&str]) -> Self {
        self.properties.insert(
            (dcid.to_string(), property.to_string()),
            values.iter().map(|v| v.to_string()).collect(),
        );
        self
    }

    fn with_group(mut self, dcid: &str, children: &[(&str, Option<&str>)]) -> Self {
        self.groups.insert(
            dcid.to_string(),
            children
                .iter()
                .map(|(d, def)| ChildVariable {
                    dcid: d.to_string(),
                    definition: def.map(|s| s.to_string()),
                })
                .collect(),
        );
        self
    }

    fn with_data(mut self, sv: &str, places: &[&str]) -> Self {
        self.existence
            .entry(sv.to_string())
            .or_default()
            .extend(places.iter().map(|p| p.to_string()));
        self
    }

    fn with_children(mut self, place: &str, child_type: &str, children: &[&str]) -> Self {
        self.children.insert(
            (place.to_string(), child_type.to_string()),
            children.iter().map(|c| c.to_string()).collect(),
        );
        self
    }
}

#[async_trait::async_trait]
impl KnowledgeGraph for MockKg {
    async fn property_values(
        &self,
        dcids: &[String],
        property: &str,
    ) -> Result<BTreeMap<String, Vec<String>>, KgError> {
        Ok(dcids
            .iter()
            .filter_map(|d| {
                self.properties
                    .get(&(d.clone(), property.to_string()))
                    .map(|v| (d.clone(), v.clone()))
            })
            .collect())
    }

    async fn property_values_in(
        &self,
        dcids: &[String],
        property: &str,
    ) -> Result<BTreeMap<String, Vec<String>>, KgError> {
        Ok(dcids
            .iter()
            .filter_map(|d| {
                self.properties_in
                    .get(&(d.clone(), property.to_string()))
                    .map(|v| (d.clone(), v.clone()))
            })
            .collect())
    }

    async fn variable_group_info(
        &self,
        group_dcids: &[String],
    ) -> Result<Vec<VariableGroupInfo>, KgError> {
        Ok(group_dcids
            .iter()
            .filter_map(|g| {
                self.groups.get(g).map(|children| VariableGroupInfo {
                    dcid: g.clone(),
                    child_variables: children.clone(),
                })
            })
            .collect())
    }

    async fn observation_existence(
        &self,
        variables: &[String],
        places: &[String],
    ) -> Result<BTreeMap<String, BTreeSet<String>>, KgError> {
        Ok(variables
            .iter()
            .map(|v| {
                let have: BTreeSet<String> = self
                    .existence
                    .get(v)
                    .map(|s| places.iter().filter(|p| s.contains(*p)).cloned().collect())
                    .unwrap_or_default();
                (v.clone(), have)
            })
            .collect())
    }

    async fn child_places(&self, place: &str, child_type: &str) -> Result<Vec<String>, KgError> {
        Ok(self
            .children
            .get(&(place.to_string(), child_type.to_string()))
            .cloned()
            .unwrap_or_default())
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter("teles=debug")
        .try_init();
}

fn california() -> Place {
    Place::new("geoId/06", "California", "State")
}

fn detection(
    query: &str,
    query_type: ClassificationType,
    place: Option<Place>,
    variables: &[(&str, f64)],
) -> Detection {
    Detection {
        original_query: query.to_string(),
        cleaned_query: query.to_lowercase(),
        query_type,
        places_detected: PlaceDetection {
            main_place: place,
            places: Vec::new(),
        },
        variables_detected: VariableDetection {
            variables: variables
                .iter()
                .map(|(dcid, score)| ScoredVariable::new(dcid, *score))
                .collect(),
            multi_variable_candidates: Vec::new(),
        },
        classifications: Vec::new(),
    }
}

#[tokio::test]
async fn simple_query_yields_one_timeline_per_surviving_variable() {
    init_tracing();
    let kg = MockKg::default()
        .with_data("Count_Person_Male", &["geoId/06"])
        .with_data("Count_Person_Female", &["geoId/06"]);
    let det = detection(
        "male vs female population of california",
        ClassificationType::Simple,
        Some(california()),
        &[
            ("Count_Person_Male", 0.6),
            ("Count_Person_Female", 0.51),
            ("Count_Person_Foo", 0.4),
        ],
    );

    let uttr = teles::fulfillment::fulfill(&kg, &ResolverConfig::default(), &det, None).await;

    // The below-threshold variable never reaches chart work.
    assert_eq!(
        uttr.svs,
        vec!["Count_Person_Male".to_string(), "Count_Person_Female".to_string()]
    );
    assert_eq!(uttr.chart_candidates.len(), 2);
    for (i, chart) in uttr.chart_candidates.iter().enumerate() {
        assert_eq!(chart.chart_type, ChartType::Timeline);
        assert_eq!(chart.attrs.block_id, (i + 1) as u32);
        assert_eq!(chart.attrs.origin, ChartOrigin::Primary);
        assert!(chart.attrs.include_percapita);
        assert_eq!(chart.places[0].dcid, "geoId/06");
    }
    assert_eq!(uttr.chart_candidates[0].svs, vec!["Count_Person_Male"]);
    assert_eq!(uttr.chart_candidates[1].svs, vec!["Count_Person_Female"]);
    // Ranking is a stable pass-through.
    assert_eq!(uttr.ranked_charts, uttr.chart_candidates);
}

#[tokio::test]
async fn peer_extension_emits_secondary_comparison_chart() {
    init_tracing();
    let kg = MockKg::default()
        .with_property("Count_Person_Male", "memberOf", &["dc/g/Person_Gender"])
        .with_group(
            "dc/g/Person_Gender",
            &[
                (
                    "Count_Person_Male",
                    Some("pt=Person,mp=count,st=measuredValue,gender=Male"),
                ),
                (
                    "Count_Person_Female",
                    Some("pt=Person,mp=count,st=measuredValue,gender=Female"),
                ),
            ],
        )
        .with_data("Count_Person_Male", &["geoId/06"])
        .with_data("Count_Person_Female", &["geoId/06"]);
    let det = detection(
        "male population of california",
        ClassificationType::Simple,
        Some(california()),
        &[("Count_Person_Male", 0.9)],
    );

    let uttr = teles::fulfillment::fulfill(&kg, &ResolverConfig::default(), &det, None).await;

    assert_eq!(uttr.chart_candidates.len(), 2);
    let primary = &uttr.chart_candidates[0];
    assert_eq!(primary.svs, vec!["Count_Person_Male"]);
    assert_eq!(primary.attrs.origin, ChartOrigin::Primary);
    assert_eq!(primary.attrs.block_id, 1);

    let secondary = &uttr.chart_candidates[1];
    assert_eq!(
        secondary.svs,
        vec!["Count_Person_Male".to_string(), "Count_Person_Female".to_string()]
    );
    assert_eq!(secondary.attrs.origin, ChartOrigin::Secondary);
    assert_eq!(secondary.attrs.block_id, 2);
}

#[tokio::test]
async fn oversized_variable_group_paginates_timelines_within_one_block() {
    init_tracing();
    let children: Vec<(&str, Option<&str>)> = vec![
        ("Count_Worker_A", None),
        ("Count_Worker_B", None),
        ("Count_Worker_C", None),
        ("Count_Worker_D", None),
        ("Count_Worker_E", None),
        ("Count_Worker_F", None),
        ("Count_Worker_G", None),
    ];
    let mut kg = MockKg::default().with_group("dc/g/Person_Industry", &children);
    for (dcid, _) in &children {
        kg = kg.with_data(dcid, &["geoId/06"]);
    }
    let det = detection(
        "workers by industry in california",
        ClassificationType::Simple,
        Some(california()),
        &[("dc/g/Person_Industry", 0.9)],
    );

    let uttr = teles::fulfillment::fulfill(&kg, &ResolverConfig::default(), &det, None).await;

    assert_eq!(uttr.chart_candidates.len(), 2);
    assert_eq!(uttr.chart_candidates[0].svs.len(), 5);
    assert_eq!(uttr.chart_candidates[1].svs.len(), 2);
    // Pagination partitions the variables without reordering, and both
    // pages stay in the same visual block.
    let rejoined: Vec<String> = uttr
        .chart_candidates
        .iter()
        .flat_map(|c| c.svs.iter().cloned())
        .collect();
    let expected: Vec<String> = children.iter().map(|(d, _)| d.to_string()).collect();
    assert_eq!(rejoined, expected);
    assert_eq!(
        uttr.chart_candidates[0].attrs.block_id,
        uttr.chart_candidates[1].attrs.block_id
    );
}

#[tokio::test]
async fn contained_in_query_yields_map_chart() {
    init_tracing();
    let kg = MockKg::default()
        .with_children("geoId/06", "County", &["geoId/06001", "geoId/06003"])
        .with_data("Count_Farm", &["geoId/06001"]);
    let mut det = detection(
        "farms by county in california",
        ClassificationType::ContainedIn,
        Some(california()),
        &[("Count_Farm", 0.9)],
    );
    det.classifications = vec![Classification::ContainedIn {
        place_type: ContainedInPlaceType::County,
    }];

    let uttr = teles::fulfillment::fulfill(&kg, &ResolverConfig::default(), &det, None).await;

    assert_eq!(uttr.chart_candidates.len(), 1);
    let chart = &uttr.chart_candidates[0];
    assert_eq!(chart.chart_type, ChartType::Map);
    assert_eq!(chart.svs, vec!["Count_Farm"]);
    assert_eq!(chart.attrs.place_type, Some(ContainedInPlaceType::County));
    assert_eq!(chart.attrs.block_id, 1);
    assert!(chart.is_valid());
}

#[tokio::test]
async fn ranking_query_carries_directions_and_child_type() {
    init_tracing();
    let kg = MockKg::default()
        .with_children("geoId/06", "County", &["geoId/06001"])
        .with_data("Count_Farm", &["geoId/06001"]);
    let mut det = detection(
        "counties in california with the fewest farms",
        ClassificationType::Ranking,
        Some(california()),
        &[("Count_Farm", 0.9)],
    );
    det.classifications = vec![
        Classification::Ranking {
            types: vec![RankingType::Low],
        },
        Classification::ContainedIn {
            place_type: ContainedInPlaceType::County,
        },
    ];

    let uttr = teles::fulfillment::fulfill(&kg, &ResolverConfig::default(), &det, None).await;

    assert_eq!(uttr.chart_candidates.len(), 1);
    let chart = &uttr.chart_candidates[0];
    assert_eq!(chart.chart_type, ChartType::Ranking);
    assert_eq!(chart.attrs.ranking_types, vec![RankingType::Low]);
    assert_eq!(chart.attrs.place_type, Some(ContainedInPlaceType::County));
    assert!(chart.is_valid());
}

#[tokio::test]
async fn correlation_pairs_main_variable_with_secondary_candidate() {
    init_tracing();
    let kg = MockKg::default()
        .with_children("geoId/06", "County", &["geoId/06001"])
        .with_data("Count_Farm", &["geoId/06001"])
        .with_data("Area_Farm", &["geoId/06001"]);
    let mut det = detection(
        "farm count vs farm area across california counties",
        ClassificationType::Correlation,
        Some(california()),
        &[("Count_Farm", 0.9)],
    );
    det.classifications = vec![Classification::ContainedIn {
        place_type: ContainedInPlaceType::County,
    }];
    det.variables_detected.multi_variable_candidates =
        vec![vec!["Count_Farm".to_string(), "Area_Farm".to_string()]];

    let uttr = teles::fulfillment::fulfill(&kg, &ResolverConfig::default(), &det, None).await;

    assert_eq!(uttr.chart_candidates.len(), 1);
    let chart = &uttr.chart_candidates[0];
    assert_eq!(chart.chart_type, ChartType::Scatter);
    assert_eq!(
        chart.svs,
        vec!["Count_Farm".to_string(), "Area_Farm".to_string()]
    );
    assert!(chart.is_valid());
}

#[tokio::test]
async fn correlation_without_child_place_type_yields_nothing() {
    init_tracing();
    let kg = MockKg::default()
        .with_data("Count_Farm", &["geoId/06"])
        .with_data("Area_Farm", &["geoId/06"]);
    let mut det = detection(
        "farm count vs farm area",
        ClassificationType::Correlation,
        Some(california()),
        &[("Count_Farm", 0.9)],
    );
    det.variables_detected.multi_variable_candidates =
        vec![vec!["Count_Farm".to_string(), "Area_Farm".to_string()]];

    let uttr = teles::fulfillment::fulfill(&kg, &ResolverConfig::default(), &det, None).await;
    assert!(uttr.chart_candidates.is_empty());
}

#[tokio::test]
async fn place_and_variables_inherited_from_context() {
    init_tracing();
    let kg = MockKg::default().with_data("Count_Person", &["geoId/06"]);
    let prev = Utterance {
        query: "population of california".to_string(),
        query_type: ClassificationType::Simple,
        places: vec![california()],
        svs: vec!["Count_Person".to_string()],
        ..Default::default()
    };
    // Bare follow-up: no place, no variable, unknown intent.
    let det = detection("how has that changed", ClassificationType::Unknown, None, &[]);

    let uttr =
        teles::fulfillment::fulfill(&kg, &ResolverConfig::default(), &det, Some(prev)).await;

    assert_eq!(uttr.query_type, ClassificationType::Simple);
    assert_eq!(uttr.chart_candidates.len(), 1);
    let chart = &uttr.chart_candidates[0];
    assert_eq!(chart.chart_type, ChartType::Timeline);
    assert_eq!(chart.svs, vec!["Count_Person"]);
    assert_eq!(chart.places[0].dcid, "geoId/06");
}

#[tokio::test]
async fn simple_fallback_is_place_overview() {
    init_tracing();
    // Variable detected, but no data anywhere.
    let kg = MockKg::default();
    let det = detection(
        "tell me about california",
        ClassificationType::Simple,
        Some(california()),
        &[("Count_Person", 0.9)],
    );

    let uttr = teles::fulfillment::fulfill(&kg, &ResolverConfig::default(), &det, None).await;

    assert_eq!(uttr.chart_candidates.len(), 1);
    assert_eq!(
        uttr.chart_candidates[0].chart_type,
        ChartType::PlaceOverview
    );
    assert!(uttr.chart_candidates[0].svs.is_empty());
}

#[tokio::test]
async fn topic_expands_into_member_and_peer_group_blocks() {
    init_tracing();
    let kg = MockKg::default()
        .with_data("Count_Farm", &["geoId/06"])
        .with_data("Area_Farm", &["geoId/06"])
        .with_data("Amount_FarmInventory_Rice", &["geoId/06"])
        .with_data("Amount_FarmInventory_Cotton", &["geoId/06"]);
    let det = detection(
        "agriculture in california",
        ClassificationType::Simple,
        Some(california()),
        &[("dc/topic/Agriculture", 0.9)],
    );

    let uttr = teles::fulfillment::fulfill(&kg, &ResolverConfig::default(), &det, None).await;

    // Loose members share one block; the peer group gets its own titled one.
    let loose: Vec<_> = uttr
        .chart_candidates
        .iter()
        .filter(|c| c.svs.len() == 1)
        .collect();
    assert_eq!(loose.len(), 2);
    assert_eq!(loose[0].attrs.block_id, loose[1].attrs.block_id);
    assert!(!loose[0].attrs.include_percapita);

    let peer_group = uttr
        .chart_candidates
        .iter()
        .find(|c| c.svs.len() > 1)
        .unwrap();
    assert_eq!(peer_group.attrs.title.as_deref(), Some("Farm Produce by Type"));
    assert_eq!(
        peer_group.svs,
        vec![
            "Amount_FarmInventory_Cotton".to_string(),
            "Amount_FarmInventory_Rice".to_string(),
        ]
    );
}
