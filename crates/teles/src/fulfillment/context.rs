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

//! Lookback walkers over the utterance chain. Every walk is bounded by the
//! configured lookback limit; turns beyond it are invisible, never stale
//! fallbacks.

use crate::detection::{Classification, ClassificationType, Place};
use crate::utterance::Utterance;

/// Places mentioned in prior turns, most recent turn first.
pub(crate) fn places_from_context(uttr: &Utterance, lookback: usize) -> Vec<Place> {
    let mut places = Vec::new();
    let mut prev = uttr.prev.as_deref();
    let mut count = 0;
    while let Some(p) = prev {
        if count >= lookback {
            break;
        }
        places.extend(p.places.iter().cloned());
        prev = p.prev.as_deref();
        count += 1;
    }
    places
}

/// Variable lists from prior turns, most recent turn first. Each turn's
/// variables stay grouped so the caller can try them as a unit.
pub(crate) fn svs_from_context(uttr: &Utterance, lookback: usize) -> Vec<Vec<String>> {
    let mut svs = Vec::new();
    let mut prev = uttr.prev.as_deref();
    let mut count = 0;
    while let Some(p) = prev {
        if count >= lookback {
            break;
        }
        if !p.svs.is_empty() {
            svs.push(p.svs.clone());
        }
        prev = p.prev.as_deref();
        count += 1;
    }
    svs
}

/// Most recent known intent from prior turns, defaulting to Simple.
pub(crate) fn query_type_from_context(uttr: &Utterance, lookback: usize) -> ClassificationType {
    let mut prev = uttr.prev.as_deref();
    let mut count = 0;
    while let Some(p) = prev {
        if count >= lookback {
            break;
        }
        if p.query_type != ClassificationType::Unknown {
            return p.query_type;
        }
        prev = p.prev.as_deref();
        count += 1;
    }
    ClassificationType::Simple
}

/// Classifications of one type, current turn first, then prior turns.
pub(crate) fn classifications_of_type_from_context(
    uttr: &Utterance,
    ctype: ClassificationType,
    lookback: usize,
) -> Vec<Classification> {
    let mut result: Vec<Classification> = uttr
        .classifications
        .iter()
        .filter(|c| c.classification_type() == ctype)
        .cloned()
        .collect();
    let mut prev = uttr.prev.as_deref();
    let mut count = 0;
    while let Some(p) = prev {
        if count >= lookback {
            break;
        }
        result.extend(
            p.classifications
                .iter()
                .filter(|c| c.classification_type() == ctype)
                .cloned(),
        );
        prev = p.prev.as_deref();
        count += 1;
    }
    result
}
