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

use crate::types::{OrderResponse, PlaceOrder};
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};

/// Error types for client operations
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Network error: {0}")]
    Network(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Server closed the connection")]
    Disconnected,
}

/// Client for the exchange engine's newline-delimited JSON protocol
///
/// Each request is one JSON line; the engine answers with exactly one
/// response line per parsed request. The connection stays open across
/// requests until either side disconnects.
pub struct Client {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

impl Client {
    /// Connect to an engine at `addr` (e.g. `"127.0.0.1:9000"`)
    pub async fn connect(addr: impl tokio::net::ToSocketAddrs) -> Result<Self, ClientError> {
        let stream = TcpStream::connect(addr).await?;
        let (read_half, write_half) = stream.into_split();

        Ok(Self {
            reader: BufReader::new(read_half),
            writer: write_half,
        })
    }

    /// Place an order and wait for the engine's response
    pub async fn place_order(&mut self, order: &PlaceOrder) -> Result<OrderResponse, ClientError> {
        let mut line = serde_json::to_string(order)?;
        line.push('\n');
        self.send_line(&line).await
    }

    /// Send a raw request line and wait for one response line
    ///
    /// Exposed so tests can exercise the engine's handling of malformed
    /// payloads. `line` must end with the `\n` delimiter.
    pub async fn send_line(&mut self, line: &str) -> Result<OrderResponse, ClientError> {
        self.writer.write_all(line.as_bytes()).await?;
        self.writer.flush().await?;

        let mut response = String::new();
        let read = self.reader.read_line(&mut response).await?;
        if read == 0 {
            return Err(ClientError::Disconnected);
        }

        Ok(serde_json::from_str(response.trim_end())?)
    }
}
