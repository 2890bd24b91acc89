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

use std::time::Duration;

use crossbeam::channel::{
    Receiver, RecvTimeoutError, Sender, TryRecvError, TrySendError, bounded,
};
use crucible_sdk::types::OrderResponse;
use thiserror::Error;
use tokio::sync::oneshot;

use crate::types::OrderRequest;

/// One decoded client request plus the channel its response travels back on
///
/// The wire contract is exactly one response per parsed request, so the
/// response channel rides along with the request instead of living in any
/// shared session state.
#[derive(Debug)]
pub struct OrderCommand {
    pub request: OrderRequest,
    pub respond_to: oneshot::Sender<OrderResponse>,
}

/// Ingress queue between connection handlers and the matching loop
///
/// The queue is the boundary between the multi-connection front door and
/// the single-threaded matching loop, and defines the total order in which
/// requests are matched.
///
/// Properties:
/// - Multiple producers (one per client connection task)
/// - Single consumer (matching loop)
/// - Bounded capacity for backpressure
/// - Explicit failure semantics when full
///
/// When the queue is full the front door rejects the request as
/// overloaded; the queue itself never retries or prioritizes.
pub struct IngressQueue {
    sender: Sender<OrderCommand>,
    receiver: Receiver<OrderCommand>,
}

impl IngressQueue {
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = bounded(capacity);
        Self { sender, receiver }
    }

    /// Split the queue into sender and receiver ends
    ///
    /// The sender can be cloned across connection tasks. The receiver must
    /// remain unique to the matching loop.
    pub fn split(self) -> (QueueSender, QueueReceiver) {
        (
            QueueSender {
                sender: self.sender,
            },
            QueueReceiver {
                receiver: self.receiver,
            },
        )
    }
}

/// Sender end of the ingress queue (one clone per connection task)
#[derive(Clone)]
pub struct QueueSender {
    sender: Sender<OrderCommand>,
}

impl QueueSender {
    /// Try to enqueue an order command (non-blocking)
    ///
    /// `Full` means the matching loop is saturated and the request should
    /// be rejected as overloaded.
    pub fn try_enqueue(&self, cmd: OrderCommand) -> Result<(), QueueError> {
        self.sender.try_send(cmd).map_err(|e| match e {
            TrySendError::Full(_) => QueueError::Full,
            TrySendError::Disconnected(_) => QueueError::Disconnected,
        })
    }

    pub fn is_full(&self) -> bool {
        self.sender.is_full()
    }
}

/// Receiver end of the ingress queue (owned by the matching loop)
pub struct QueueReceiver {
    receiver: Receiver<OrderCommand>,
}

impl QueueReceiver {
    /// Receive the next command, waiting at most `timeout`
    ///
    /// The bounded wait lets the matching loop re-check its shutdown flag
    /// at a steady cadence.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<OrderCommand, QueueError> {
        self.receiver.recv_timeout(timeout).map_err(|e| match e {
            RecvTimeoutError::Timeout => QueueError::Timeout,
            RecvTimeoutError::Disconnected => QueueError::Disconnected,
        })
    }

    /// Try to receive a command without waiting
    pub fn try_recv(&self) -> Result<OrderCommand, QueueError> {
        self.receiver.try_recv().map_err(|e| match e {
            TryRecvError::Empty => QueueError::Empty,
            TryRecvError::Disconnected => QueueError::Disconnected,
        })
    }
}

/// Errors that can occur when interacting with the ingress queue
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("Queue is full")]
    Full,
    #[error("Queue is empty")]
    Empty,
    #[error("Queue receive timed out")]
    Timeout,
    #[error("Queue disconnected")]
    Disconnected,
}
