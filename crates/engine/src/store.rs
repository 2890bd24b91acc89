// Copyright 2025 itscheems
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

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::Order;

const SNAPSHOT_VERSION: u32 = 1;

/// Error types for snapshot persistence
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Snapshot I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Failed to encode snapshot: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("Corrupt snapshot: {0}")]
    Corrupt(String),
}

#[derive(Debug, Serialize, Deserialize)]
struct SnapshotFile {
    version: u32,
    orders: Vec<Order>,
}

/// Persistence of active orders across restarts
///
/// Saves NEW and PARTIALLY_FILLED orders at graceful shutdown and loads
/// them before the engine accepts new orders. The store never matches and
/// never mutates order state; it is not consulted on the matching path.
pub struct OrderStore {
    path: PathBuf,
}

impl OrderStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Persist the active subset of `orders`
    ///
    /// Writes to a temporary file and renames over the target, so readers
    /// only ever observe a complete snapshot. An empty book writes an
    /// empty snapshot; a stale earlier file must not outlive it.
    pub fn save(&self, orders: &[Order]) -> Result<(), StoreError> {
        let snapshot = SnapshotFile {
            version: SNAPSHOT_VERSION,
            orders: orders.iter().filter(|o| o.is_active()).cloned().collect(),
        };

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }

        let payload = serde_json::to_vec_pretty(&snapshot)?;
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, payload)?;
        fs::rename(&tmp, &self.path)?;

        Ok(())
    }

    /// Load persisted orders
    ///
    /// A missing file is an empty book. Undecodable content or an
    /// unsupported version is `Corrupt`; the caller decides whether to
    /// start empty.
    pub fn load(&self) -> Result<Vec<Order>, StoreError> {
        let payload = match fs::read(&self.path) {
            Ok(payload) => payload,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let snapshot: SnapshotFile = serde_json::from_slice(&payload)
            .map_err(|e| StoreError::Corrupt(e.to_string()))?;

        if snapshot.version != SNAPSHOT_VERSION {
            return Err(StoreError::Corrupt(format!(
                "unsupported snapshot version {}",
                snapshot.version
            )));
        }

        Ok(snapshot.orders)
    }

    /// Remove the persisted snapshot (tests, manual resets)
    pub fn clear(&self) -> Result<(), StoreError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
