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

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};

use thiserror::Error;

use crate::types::Trade;

/// Error types for ledger storage operations
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Failed to write ledger record: {0}")]
    Write(#[from] std::io::Error),
    #[error("Failed to encode ledger record: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Ledger storage trait - the durable trail of executed trades
///
/// The ledger is strictly append-only: records are never modified once
/// written, and append order is the engine's trade emission order.
///
/// This abstraction allows different backing stores:
/// - Newline-delimited JSON file (production)
/// - In-memory Vec (testing)
pub trait LedgerStorage: Send {
    /// Append one trade record
    ///
    /// The record is durable only after the next `sync`.
    fn append(&mut self, trade: &Trade) -> Result<(), LedgerError>;

    /// Push any buffered records out to the OS
    fn sync(&mut self) -> Result<(), LedgerError>;

    /// Number of records appended over this storage's lifetime
    fn record_count(&self) -> usize;
}

/// File-backed ledger: one JSON object per line, append-only
///
/// Appending never rewrites existing content, so the ledger can grow
/// indefinitely without read-modify-write cycles.
pub struct FileLedger {
    writer: BufWriter<File>,
    records: usize,
}

impl FileLedger {
    /// Open (or create) the ledger file at `path` for appending
    ///
    /// Parent directories are created on demand.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, LedgerError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new().create(true).append(true).open(path)?;

        Ok(Self {
            writer: BufWriter::new(file),
            records: 0,
        })
    }
}

impl LedgerStorage for FileLedger {
    fn append(&mut self, trade: &Trade) -> Result<(), LedgerError> {
        serde_json::to_writer(&mut self.writer, trade)?;
        self.writer.write_all(b"\n")?;
        self.records += 1;
        Ok(())
    }

    fn sync(&mut self) -> Result<(), LedgerError> {
        self.writer.flush()?;
        Ok(())
    }

    fn record_count(&self) -> usize {
        self.records
    }
}

/// In-memory ledger for tests and benchmarks
///
/// Clones share the same backing store, so a test can keep a handle while
/// the trade writer owns the boxed storage.
#[derive(Clone, Default)]
pub struct MemoryLedger {
    trades: Arc<Mutex<Vec<Trade>>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// All records appended so far, in append order
    pub fn trades(&self) -> Vec<Trade> {
        self.trades.lock().unwrap().clone()
    }
}

impl LedgerStorage for MemoryLedger {
    fn append(&mut self, trade: &Trade) -> Result<(), LedgerError> {
        self.trades.lock().unwrap().push(trade.clone());
        Ok(())
    }

    fn sync(&mut self) -> Result<(), LedgerError> {
        Ok(())
    }

    fn record_count(&self) -> usize {
        self.trades.lock().unwrap().len()
    }
}
