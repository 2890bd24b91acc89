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

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, info, warn};

use super::Engine;
use crate::queue::{OrderCommand, QueueError, QueueReceiver};

/// The single matching actor
///
/// Runs the engine on one dedicated OS thread. All `place_order`
/// invocations execute here to completion, one at a time, so the order
/// book needs no locking and every request observes exactly the state the
/// previous one left. Responses travel back to the connection tasks over
/// the oneshot channel carried by each command.
///
/// Shutdown drains whatever is still queued, stops the engine (which
/// flushes the trade writer and saves the order snapshot), and joins.
pub struct EngineActor {
    thread_handle: Option<JoinHandle<()>>,
    shutdown: Arc<AtomicBool>,
}

impl EngineActor {
    /// Move the engine onto its matching thread and start consuming
    pub fn spawn(mut engine: Engine, receiver: QueueReceiver) -> Self {
        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_clone = shutdown.clone();

        let thread_handle = thread::Builder::new()
            .name("matching-loop".to_string())
            .spawn(move || {
                info!("Matching loop started");
                Self::run_matching_loop(&mut engine, &receiver, &shutdown_clone);
                engine.stop();
                info!("Matching loop stopped");
            })
            .expect("Failed to spawn matching engine thread");

        Self {
            thread_handle: Some(thread_handle),
            shutdown,
        }
    }

    fn run_matching_loop(engine: &mut Engine, receiver: &QueueReceiver, shutdown: &AtomicBool) {
        loop {
            if shutdown.load(Ordering::Relaxed) {
                // Answer everything already accepted into the queue before
                // the engine goes down.
                while let Ok(cmd) = receiver.try_recv() {
                    Self::answer(engine, cmd);
                }
                break;
            }

            match receiver.recv_timeout(Duration::from_millis(100)) {
                Ok(cmd) => Self::answer(engine, cmd),
                Err(QueueError::Timeout) => continue,
                Err(_) => {
                    warn!("Ingress queue disconnected");
                    break;
                }
            }
        }
    }

    fn answer(engine: &mut Engine, cmd: OrderCommand) {
        let response = engine.place_order(cmd.request);
        if cmd.respond_to.send(response).is_err() {
            debug!("Client went away before its response was sent");
        }
    }

    /// Signal shutdown and join the matching thread
    pub fn shutdown(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);

        if let Some(handle) = self.thread_handle.take()
            && handle.join().is_err()
        {
            warn!("Matching engine thread panicked");
        }
    }
}

impl Drop for EngineActor {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        if let Some(handle) = self.thread_handle.take()
            && let Err(e) = handle.join()
        {
            let _ = Err::<(), _>(e);
        }
    }
}
