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

//! TCP front door for the exchange engine
//!
//! Speaks newline-delimited JSON: one request object per line in, exactly
//! one response object per parsed request line out. The handler is
//! stateless per request - it decodes, forwards to the matching loop via
//! the ingress queue, and encodes whatever comes back.

use std::net::SocketAddr;

use anyhow::{Context, Result};
use crucible_sdk::types::OrderResponse;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::queue::{OrderCommand, QueueError, QueueSender};
use crate::types::{OrderRequest, unix_seconds};

/// Order entry server
pub struct Server {
    sender: QueueSender,
}

impl Server {
    pub fn new(sender: QueueSender) -> Self {
        Self { sender }
    }

    /// Bind `addr` and serve until the task is cancelled
    pub async fn serve(&self, addr: SocketAddr) -> Result<()> {
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind {addr}"))?;

        info!(%addr, "Order entry listening");
        self.serve_on(listener).await
    }

    /// Serve on an already-bound listener (tests bind an ephemeral port)
    pub async fn serve_on(&self, listener: TcpListener) -> Result<()> {
        loop {
            let (stream, peer) = listener
                .accept()
                .await
                .context("Failed to accept connection")?;

            debug!(%peer, "Client connected");
            let sender = self.sender.clone();
            tokio::spawn(handle_connection(stream, peer, sender));
        }
    }
}

/// Per-connection loop: read lines until the client disconnects
async fn handle_connection(stream: TcpStream, peer: SocketAddr, sender: QueueSender) {
    let (read_half, mut write_half) = stream.into_split();
    let mut lines = BufReader::new(read_half).lines();

    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                if line.trim().is_empty() {
                    continue;
                }

                let response = dispatch(&line, &sender).await;
                let mut payload = match serde_json::to_string(&response) {
                    Ok(payload) => payload,
                    Err(e) => {
                        warn!(%peer, error = %e, "Failed to encode response");
                        continue;
                    }
                };
                payload.push('\n');

                if write_half.write_all(payload.as_bytes()).await.is_err() {
                    break;
                }
            }
            Ok(None) => break,
            Err(e) => {
                debug!(%peer, error = %e, "Read error");
                break;
            }
        }
    }

    debug!(%peer, "Client disconnected");
}

/// Decode one request line and run it through the matching loop
///
/// Decode failures and queue conditions never reach the engine; they
/// render the rejection shape right here.
async fn dispatch(line: &str, sender: &QueueSender) -> OrderResponse {
    let request: OrderRequest = match serde_json::from_str(line) {
        Ok(request) => request,
        Err(e) => {
            return OrderResponse::rejected(0, unix_seconds(), format!("Invalid JSON: {e}"));
        }
    };

    let quantity_echo = request.quantity_echo();
    let (respond_to, response) = oneshot::channel();

    match sender.try_enqueue(OrderCommand {
        request,
        respond_to,
    }) {
        Ok(()) => match response.await {
            Ok(response) => response,
            // The matching loop dropped the command mid-shutdown.
            Err(_) => OrderResponse::rejected(
                quantity_echo,
                unix_seconds(),
                "Exchange engine is shutting down",
            ),
        },
        Err(QueueError::Full) => OrderResponse::rejected(
            quantity_echo,
            unix_seconds(),
            "Exchange engine is overloaded",
        ),
        Err(_) => OrderResponse::rejected(
            quantity_echo,
            unix_seconds(),
            "Exchange engine is not available",
        ),
    }
}
