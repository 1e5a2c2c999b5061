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

//! Curated topic tables. A detected "variable" may be a topic dcid that
//! stands for a bundle of stat variables and peer groups; these tables map
//! them to concrete members without a graph round trip.

use once_cell::sync::Lazy;
use std::collections::BTreeMap;

/// Topics ranked at or beyond this in the detection are not expanded.
pub const TOPIC_RANK_LIMIT: usize = 3;

const SVPG_PREFIX: &str = "dc/svpg/";

pub fn is_svpg(dcid: &str) -> bool {
    dcid.starts_with(SVPG_PREFIX)
}

static TOPIC_MEMBERS: Lazy<BTreeMap<&'static str, Vec<&'static str>>> = Lazy::new(|| {
    BTreeMap::from([
        (
            "dc/topic/Agriculture",
            vec![
                "Area_Farm",
                "Count_Farm",
                "Income_Farm",
                "dc/svpg/AmountOfFarmInventoryByType",
            ],
        ),
        (
            "dc/topic/Income",
            vec!["dc/svpg/IndividualIncome", "dc/svpg/HouseholdIncome"],
        ),
        ("dc/topic/Jobs", vec!["dc/svpg/JobsPeerGroup"]),
        (
            "dc/topic/MedicalConditions",
            vec!["dc/svpg/MedicalConditionsPeerGroup"],
        ),
    ])
});

static SVPG_MEMBERS: Lazy<BTreeMap<&'static str, Vec<&'static str>>> = Lazy::new(|| {
    BTreeMap::from([
        (
            "dc/svpg/AmountOfFarmInventoryByType",
            vec![
                "Amount_FarmInventory_BarleyForGrain",
                "Amount_FarmInventory_CornForSilageOrGreenchop",
                "Amount_FarmInventory_Cotton",
                "Amount_FarmInventory_Forage",
                "Amount_FarmInventory_OatsForGrain",
                "Amount_FarmInventory_Rice",
                "Amount_FarmInventory_SorghumForGrain",
                "Amount_FarmInventory_WheatForGrain",
            ],
        ),
        (
            "dc/svpg/IndividualIncome",
            vec!["Median_Income_Person", "Median_Earnings_Person"],
        ),
        (
            "dc/svpg/HouseholdIncome",
            vec!["Median_Income_Household", "Mean_Income_Household"],
        ),
        (
            "dc/svpg/JobsPeerGroup",
            vec![
                "Count_Worker_NAICSAccommodationFoodServices",
                "Count_Worker_NAICSAgricultureForestryFishingHunting",
                "Count_Worker_NAICSConstruction",
                "Count_Worker_NAICSEducationalServices",
                "Count_Worker_NAICSHealthCareSocialAssistance",
                "Count_Worker_NAICSFinanceInsurance",
                "Count_Worker_NAICSInformation",
            ],
        ),
        (
            "dc/svpg/MedicalConditionsPeerGroup",
            vec![
                "Percent_Person_WithArthritis",
                "Percent_Person_WithAsthma",
                "Percent_Person_WithDiabetes",
                "Percent_Person_WithHighBloodPressure",
                "Percent_Person_WithHighCholesterol",
                "Percent_Person_WithStroke",
            ],
        ),
    ])
});

static SVPG_NAMES: Lazy<BTreeMap<&'static str, &'static str>> = Lazy::new(|| {
    BTreeMap::from([
        (
            "dc/svpg/AmountOfFarmInventoryByType",
            "Farm Produce by Type",
        ),
        ("dc/svpg/IndividualIncome", "Individual Income"),
        ("dc/svpg/HouseholdIncome", "Household Income"),
        ("dc/svpg/JobsPeerGroup", "Categories of Jobs"),
        (
            "dc/svpg/MedicalConditionsPeerGroup",
            "Medical Conditions",
        ),
    ])
});

/// Member variables (and peer-group ids) of a topic. Topics ranked too low
/// in the detection expand to nothing.
pub fn get_topic_vars(topic: &str, rank: usize) -> Vec<String> {
    if rank >= TOPIC_RANK_LIMIT {
        return Vec::new();
    }
    TOPIC_MEMBERS
        .get(topic)
        .map(|members| members.iter().map(|m| m.to_string()).collect())
        .unwrap_or_default()
}

/// For each member, its peer variables when the member is a peer group.
pub fn get_topic_peers(members: &[String]) -> BTreeMap<String, Vec<String>> {
    members
        .iter()
        .map(|m| {
            let peers = if is_svpg(m) {
                SVPG_MEMBERS
                    .get(m.as_str())
                    .map(|svs| svs.iter().map(|s| s.to_string()).collect())
                    .unwrap_or_default()
            } else {
                Vec::new()
            };
            (m.clone(), peers)
        })
        .collect()
}

pub fn svpg_name(svpg: &str) -> String {
    SVPG_NAMES
        .get(svpg)
        .map(|n| n.to_string())
        .unwrap_or_else(|| svpg.rsplit('/').next().unwrap_or(svpg).to_string())
}
