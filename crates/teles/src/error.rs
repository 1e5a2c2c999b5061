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

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ResolverError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Knowledge graph error: {0}")]
    Kg(#[from] KgError),
    #[error("Page config error: {0}")]
    PageConfig(#[from] PageConfigError),
    #[error("Serialisation error: {0}")]
    Serialisation(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid configuration: {reason}")]
    ValidationFailed { reason: String },
}

#[derive(Error, Debug)]
pub enum KgError {
    #[error("Knowledge graph request failed: {reason}")]
    RequestFailed { reason: String },
    #[error("Malformed knowledge graph response: {details}")]
    MalformedResponse { details: String },
    #[error("Knowledge graph unavailable")]
    Unavailable,
}

#[derive(Error, Debug)]
pub enum PageConfigError {
    #[error("No ranked charts to build a page from")]
    NoRankedCharts,
    #[error("Chart without places cannot anchor a page")]
    MissingMainPlace,
}

pub type Result<T> = std::result::Result<T, ResolverError>;
