// Copyright 2025 Chris Custine
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Building data providers.
//!
//! A provider hands the session an ordered list of buildings once per
//! session. Where the data comes from (a built-in table, a JSON file, a
//! network backend) is the provider's business.

mod campus;

pub use campus::campus_buildings;

use std::future::Future;
use std::path::{Path, PathBuf};

use log::{info, warn};
use thiserror::Error;

use crate::geo::{Building, LngLat};

/// Errors that can occur while loading building data.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid building data: {0}")]
    Json(#[from] serde_json::Error),

    #[error("backend request failed: {0}")]
    Backend(String),

    #[error("duplicate building id: {0}")]
    DuplicateId(String),
}

/// Source of the session's building list.
pub trait DataProvider {
    /// Load the ordered building list.
    fn get_buildings(&self) -> impl Future<Output = Result<Vec<Building>, ProviderError>> + Send;

    /// Load the list for a user at `position`.
    ///
    /// Providers that can order by proximity server-side override this; the
    /// default ignores the position.
    fn get_buildings_near(
        &self,
        position: LngLat,
    ) -> impl Future<Output = Result<Vec<Building>, ProviderError>> + Send {
        let _ = position;
        self.get_buildings()
    }
}

/// Reject lists that break the id join key; warn about bad coordinates.
///
/// Buildings with malformed coordinates stay in the list (they still show in
/// the sidebar) but will not get a marker.
pub fn validate(buildings: &[Building]) -> Result<(), ProviderError> {
    let mut seen = std::collections::HashSet::new();
    for b in buildings {
        if !seen.insert(b.id.as_str()) {
            return Err(ProviderError::DuplicateId(b.id.clone()));
        }
        if !b.has_valid_coords() {
            warn!("Building {} has malformed coordinate {}", b.id, b.coords);
        }
    }
    Ok(())
}

/// Serves a fixed in-memory list.
#[derive(Debug, Clone)]
pub struct StaticProvider {
    buildings: Vec<Building>,
}

impl StaticProvider {
    #[must_use]
    pub fn new(buildings: Vec<Building>) -> Self {
        Self { buildings }
    }

    /// The built-in NUM campus table.
    #[must_use]
    pub fn campus() -> Self {
        Self::new(campus_buildings())
    }
}

impl DataProvider for StaticProvider {
    async fn get_buildings(&self) -> Result<Vec<Building>, ProviderError> {
        validate(&self.buildings)?;
        Ok(self.buildings.clone())
    }
}

/// Loads a JSON array of buildings from disk.
#[derive(Debug, Clone)]
pub struct JsonFileProvider {
    path: PathBuf,
}

impl JsonFileProvider {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl DataProvider for JsonFileProvider {
    async fn get_buildings(&self) -> Result<Vec<Building>, ProviderError> {
        let text = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|source| ProviderError::Io {
                path: self.path.clone(),
                source,
            })?;
        let buildings: Vec<Building> = serde_json::from_str(&text)?;
        validate(&buildings)?;
        info!("Loaded {} buildings from {}", buildings.len(), self.path.display());
        Ok(buildings)
    }
}
