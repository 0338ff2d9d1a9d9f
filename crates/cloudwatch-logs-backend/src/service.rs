// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error};

use crate::flusher::{EngineState, FlushEngine};
use crate::record::LogCall;

#[derive(Debug)]
pub enum BackendCommand {
    Append(LogCall),
    Flush(oneshot::Sender<EngineState>),
    Close(oneshot::Sender<EngineState>),
}

/// Cloneable sender side of a [`BackendService`].
#[derive(Clone, Debug)]
pub struct BackendHandle {
    tx: mpsc::UnboundedSender<BackendCommand>,
}

impl BackendHandle {
    pub fn append(&self, call: LogCall) -> Result<(), mpsc::error::SendError<BackendCommand>> {
        self.tx.send(BackendCommand::Append(call))
    }

    /// Waits until every call appended before this one has been written.
    pub async fn flush(&self) -> Result<EngineState, String> {
        let (response_tx, response_rx) = oneshot::channel();
        self.tx
            .send(BackendCommand::Flush(response_tx))
            .map_err(|e| format!("Failed to send flush command: {e}"))?;

        response_rx
            .await
            .map_err(|e| format!("Failed to receive flush response: {e}"))
    }

    /// Flushes the remaining records and stops the service.
    pub async fn close(&self) -> Result<EngineState, String> {
        let (response_tx, response_rx) = oneshot::channel();
        self.tx
            .send(BackendCommand::Close(response_tx))
            .map_err(|e| format!("Failed to send close command: {e}"))?;

        response_rx
            .await
            .map_err(|e| format!("Failed to receive close response: {e}"))
    }
}

/// Owns a [`FlushEngine`] and applies commands from any number of handles in
/// arrival order.
pub struct BackendService {
    engine: FlushEngine,
    rx: mpsc::UnboundedReceiver<BackendCommand>,
}

impl BackendService {
    #[must_use]
    pub fn new(engine: FlushEngine) -> (Self, BackendHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { engine, rx }, BackendHandle { tx })
    }

    pub async fn run(mut self) {
        debug!("CLOUDWATCH | Backend service started");

        while let Some(command) = self.rx.recv().await {
            match command {
                BackendCommand::Append(call) => self.engine.append(call).await,

                BackendCommand::Flush(response_tx) => {
                    self.engine.flush().await;
                    if response_tx.send(self.engine.state()).is_err() {
                        error!("CLOUDWATCH | Failed to send flush response, receiver dropped");
                    }
                }

                BackendCommand::Close(response_tx) => {
                    self.engine.close().await;
                    if response_tx.send(self.engine.state()).is_err() {
                        error!("CLOUDWATCH | Failed to send close response, receiver dropped");
                    }
                    debug!("CLOUDWATCH | Backend service closed");
                    return;
                }
            }
        }

        // Every handle was dropped without an explicit close
        self.engine.close().await;
        debug!("CLOUDWATCH | Backend service stopped");
    }
}
