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

use crate::kg::{ChildVariable, KnowledgeGraph, VariableGroupInfo};
use once_cell::sync::Lazy;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

const SVG_PREFIX: &str = "dc/g/";
const TOPIC_PREFIX: &str = "dc/topic/";

pub fn is_topic(dcid: &str) -> bool {
    dcid.starts_with(TOPIC_PREFIX)
}

pub fn is_svg(dcid: &str) -> bool {
    dcid.starts_with(SVG_PREFIX)
}

pub fn is_sv(dcid: &str) -> bool {
    !is_topic(dcid) && !is_svg(dcid)
}

/// Parsed form of a stat-variable definition.
///
/// The definition grammar is an external contract of the knowledge graph
/// (versioned there, not here): comma-delimited `key=value` pairs, with
/// reserved keys `pt` (population type), `mp` (measured property), `st`
/// (stat type) and `md` (measurement denominator); every other key is a
/// constraining property with its fixed value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedSv {
    pub mp: String,
    pub st: String,
    pub pt: String,
    pub md: String,
    pub pvs: BTreeMap<String, String>,
}

pub fn parse_sv(definition: &str) -> Option<ParsedSv> {
    let mut res = ParsedSv::default();
    for part in definition.split(',') {
        let (k, v) = part.split_once('=')?;
        match k {
            "pt" => res.pt = v.to_string(),
            "mp" => res.mp = v.to_string(),
            "st" => res.st = v.to_string(),
            "md" => res.md = v.to_string(),
            _ => {
                res.pvs.insert(k.to_string(), v.to_string());
            }
        }
    }
    Some(res)
}

/// Parsed form of a variable-group dcid: `dc/g/` followed by `_`-joined
/// tokens. The first token is the population type; `Prop-Value` tokens fix
/// a constraint; a bare `Prop` token is the property the group varies on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedSvg {
    pub pt: String,
    pub pvs: BTreeMap<String, String>,
    /// The extra, unconstrained property, when the group has one.
    pub p: String,
}

fn lower_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

pub fn parse_svg(svg_dcid: &str) -> ParsedSvg {
    let mut res = ParsedSvg::default();
    let Some(body) = svg_dcid.strip_prefix(SVG_PREFIX) else {
        return res;
    };
    let parts: Vec<&str> = body.split('_').collect();
    if parts.len() == 1 {
        return res;
    }
    res.pt = parts[0].to_string();
    for part in &parts[1..] {
        if let Some((p, v)) = part.split_once('-') {
            res.pvs.insert(lower_first(p), v.to_string());
        } else {
            res.p = lower_first(part);
        }
    }
    res
}

/// Whether a group member is a sibling of `sv`: same measured property,
/// stat type, population type, denominator and constraint count.
fn is_compatible(sv: &ParsedSv, candidate: &ChildVariable) -> bool {
    let Some(def) = candidate.definition.as_deref() else {
        return false;
    };
    let Some(parsed) = parse_sv(def) else {
        return false;
    };
    parsed.mp == sv.mp
        && parsed.st == sv.st
        && parsed.pt == sv.pt
        && parsed.md == sv.md
        && parsed.pvs.len() == sv.pvs.len()
}

/// Keeps the main sv first and at most `limit` sorted peers after it.
fn limit_extended_svs(sv: &str, ext_svs: BTreeSet<String>, limit: usize) -> Vec<String> {
    let mut res = vec![sv.to_string()];
    res.extend(ext_svs.into_iter().filter(|s| s != sv).take(limit));
    res
}

fn first_value<'a>(map: &'a BTreeMap<String, Vec<String>>, key: &str) -> Option<&'a String> {
    map.get(key).and_then(|v| v.first())
}

/// Peer-group discovery: maps each input variable to its sibling variables
/// (possibly none). Lookups are batched; a variable that cannot be parsed
/// or whose group yields nothing informative maps to an empty list.
///
/// A group whose constraints equal the variable's own has no varying
/// property, so its children differ by stat type or denominator and are
/// not siblings; the walk then goes up one `specializationOf` level and
/// across to sibling groups. A group with an extra property directly
/// enumerates the peers.
pub async fn extend_svs<K: KnowledgeGraph + ?Sized>(
    kg: &K,
    svs: &[String],
    limit: usize,
) -> BTreeMap<String, Vec<String>> {
    if svs.is_empty() {
        return BTreeMap::new();
    }
    let Ok(sv2svgs) = kg.property_values(svs, "memberOf").await else {
        return BTreeMap::new();
    };
    let sv2svg: BTreeMap<String, String> = sv2svgs
        .iter()
        .filter_map(|(sv, svgs)| svgs.first().map(|g| (sv.clone(), g.clone())))
        .collect();
    if sv2svg.is_empty() {
        return BTreeMap::new();
    }

    let group_ids: Vec<String> = sv2svg.values().cloned().collect::<BTreeSet<_>>().into_iter().collect();
    let Ok(group_infos) = kg.variable_group_info(&group_ids).await else {
        return BTreeMap::new();
    };
    let svg2children: BTreeMap<String, &VariableGroupInfo> =
        group_infos.iter().map(|g| (g.dcid.clone(), g)).collect();

    let mut res: BTreeMap<String, Vec<String>> = BTreeMap::new();
    // A peer already found through another input maps to the same list.
    let mut reverse_map: BTreeMap<String, Vec<String>> = BTreeMap::new();

    for sv in svs {
        let Some(svg) = sv2svg.get(sv) else {
            res.insert(sv.clone(), Vec::new());
            continue;
        };
        if let Some(prior) = reverse_map.get(sv) {
            res.insert(sv.clone(), prior.clone());
            continue;
        }
        let mut peers: Vec<String> = Vec::new();
        let svg_obj = parse_svg(svg);
        let sv_obj = svg2children
            .get(svg)
            .and_then(|g| g.child_variables.iter().find(|c| &c.dcid == sv))
            .and_then(|c| c.definition.as_deref())
            .and_then(parse_sv);
        let Some(sv_obj) = sv_obj else {
            debug!(sv, "No parseable definition; skipping extension");
            res.insert(sv.clone(), Vec::new());
            continue;
        };

        if svg_obj.pvs.len() == sv_obj.pvs.len() {
            // No direct siblings in this group; look for indirect ones via
            // the group's own siblings.
            let svg_ids = vec![svg.clone()];
            let parent = match kg.property_values(&svg_ids, "specializationOf").await {
                Ok(m) => first_value(&m, svg).cloned(),
                Err(_) => None,
            };
            let Some(parent) = parent else {
                res.insert(sv.clone(), Vec::new());
                continue;
            };
            let parent_ids = vec![parent.clone()];
            let siblings = match kg.property_values_in(&parent_ids, "specializationOf").await {
                Ok(m) => m.get(&parent).cloned().unwrap_or_default(),
                Err(_) => Vec::new(),
            };
            if siblings.is_empty() {
                res.insert(sv.clone(), Vec::new());
                continue;
            }
            if let Ok(sibling_infos) = kg.variable_group_info(&siblings).await {
                for info in &sibling_infos {
                    for child in &info.child_variables {
                        if is_compatible(&sv_obj, child) {
                            peers.push(child.dcid.clone());
                        }
                    }
                }
            }
        } else if let Some(group) = svg2children.get(svg) {
            for child in &group.child_variables {
                if is_compatible(&sv_obj, child) {
                    peers.push(child.dcid.clone());
                }
            }
        }

        for peer in &peers {
            if peer != sv {
                reverse_map.insert(peer.clone(), peers.clone());
            }
        }
        res.insert(sv.clone(), peers);
    }

    res.into_iter()
        .map(|(sv, peers)| {
            let limited = limit_extended_svs(&sv, peers.into_iter().collect(), limit);
            (sv, limited)
        })
        .collect()
}

//
// Display names and per-capita handling.
//

/// Curated display names, consulted before the graph's name property. The
/// graph names for these are either absent or too raw to chart.
static SV_NAME_OVERRIDES: Lazy<BTreeMap<&'static str, &'static str>> = Lazy::new(|| {
    BTreeMap::from([
        ("Count_Person", "Population"),
        ("Count_Student", "Number of Students"),
        ("Count_Teacher", "Number of Teachers"),
        (
            "Percent_Student_AsAFractionOf_Count_Teacher",
            "Student-Teacher Ratio",
        ),
        ("Median_Income_Person", "Individual Median Income"),
        ("Median_Income_Household", "Household Median Income"),
        ("Median_Earnings_Person", "Individual Median Earnings"),
    ])
});

fn curated_sv_name(sv: &str) -> Option<&'static str> {
    SV_NAME_OVERRIDES.get(sv).copied()
}

const NAME_PREFIXES: [&str; 7] = [
    "Population of People Working in the ",
    "Population of People Working in ",
    "Population of People ",
    "Population Working in the ",
    "Population Working in ",
    "Number of the ",
    "Number of ",
];
const NAME_SUFFIXES: [&str; 1] = [" Workers"];

pub fn clean_sv_name(name: &str) -> String {
    let mut name = name;
    for p in NAME_PREFIXES {
        if let Some(stripped) = name.strip_prefix(p) {
            name = stripped;
        }
    }
    for s in NAME_SUFFIXES {
        if let Some(stripped) = name.strip_suffix(s) {
            name = stripped;
        }
    }
    name.to_string()
}

/// Display names for the given variables: curated overrides first, then
/// one batched name-property call (cleaned up), then the dcid itself.
pub async fn get_sv_names<K: KnowledgeGraph + ?Sized>(
    kg: &K,
    svs: &[String],
) -> BTreeMap<String, String> {
    let raw = kg.property_values(svs, "name").await.unwrap_or_default();
    svs.iter()
        .map(|sv| {
            let name = match curated_sv_name(sv) {
                Some(curated) => curated.to_string(),
                None => raw
                    .get(sv)
                    .and_then(|names| names.first())
                    .map(|n| clean_sv_name(n))
                    .unwrap_or_else(|| sv.clone()),
            };
            (sv.clone(), name)
        })
        .collect()
}

/// Variables that are inherently ratios, rates or medians; a per-capita
/// variant of these is meaningless and never generated.
const SV_PARTIAL_DCID_NO_PC: [&str; 34] = [
    "Temperature",
    "Precipitation",
    "BarometricPressure",
    "CloudCover",
    "PrecipitableWater",
    "Rainfall",
    "Snowfall",
    "Visibility",
    "WindSpeed",
    "ConsecutiveDryDays",
    "Percent",
    "Area_",
    "Median_",
    "LifeExpectancy_",
    "AsFractionOf",
    "AsAFractionOfCount",
    "UnemploymentRate_",
    "Mean_Income_",
    "GenderIncomeInequality_",
    "FertilityRate_",
    "GrowthRate_",
    "sdg/",
    "FemaNaturalHazardRiskIndex_",
    "FemaCommunityResilience_",
    "FemaSocialVulnerability_",
    "MothersAge_",
    "IntervalSinceLastBirth_",
    "BirthWeight_",
    "Covid19MobilityTrend_",
    "Average_",
    "Cancer_Risk",
    "IncrementalCount_",
    "HouseholdSize_",
    "LmpGestationalAge_",
];

pub fn is_percapita_relevant(sv_dcid: &str) -> bool {
    !SV_PARTIAL_DCID_NO_PC
        .iter()
        .any(|phrase| sv_dcid.contains(phrase))
}

/// Whether a display name already denotes a percentage-like measure. Names
/// are used here because older prevalence dcids predate the naming scheme.
pub fn is_sv_percapita_by_name(sv_name: &str) -> bool {
    sv_name.contains("Percentage") || sv_name.contains("Prevalence")
}
