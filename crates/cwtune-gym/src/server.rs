//! Bridge WebSocket server
//!
//! Hosts a simulator behind the bridge protocol so agents can drive it.

use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{debug, error, info, warn};

use cwtune_core::bridge::{methods, ResetResponse, SpacesResponse, StepParams};
use cwtune_core::{BridgeError, BridgeMessage, Observation, Result, StepOutcome};

/// Simulator side of the bridge
#[async_trait]
pub trait SimulatorHandler: Send + Sync {
    async fn spaces(&self) -> Result<SpacesResponse>;

    async fn reset(&self) -> Result<Observation>;

    async fn step(&self, action: Vec<u32>) -> Result<StepOutcome>;

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

/// Bridge server for a single simulator
pub struct BridgeServer {
    listener: TcpListener,
    handler: Arc<dyn SimulatorHandler>,
}

impl BridgeServer {
    /// Bind the listening socket
    pub async fn bind(
        bind_addr: SocketAddr,
        handler: impl SimulatorHandler + 'static,
    ) -> Result<Self> {
        let listener = TcpListener::bind(bind_addr).await?;
        Ok(Self {
            listener,
            handler: Arc::new(handler),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept agents until the listener fails
    pub async fn run(self) -> Result<()> {
        info!("Simulator bridge listening on {}", self.local_addr()?);

        while let Ok((stream, addr)) = self.listener.accept().await {
            let handler = self.handler.clone();

            tokio::spawn(async move {
                if let Err(e) = handle_connection(stream, addr, handler).await {
                    error!("Connection error: {}", e);
                }
            });
        }

        Ok(())
    }
}

async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    handler: Arc<dyn SimulatorHandler>,
) -> Result<()> {
    let ws_stream = accept_async(stream)
        .await
        .map_err(|e| cwtune_core::CwTuneError::Connection(e.to_string()))?;
    let (mut write, mut read) = ws_stream.split();

    info!("Agent connected from {}", addr);

    while let Some(msg) = read.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                let response = match serde_json::from_str::<BridgeMessage>(&text) {
                    Ok(request) => dispatch(handler.as_ref(), request).await,
                    Err(e) => {
                        warn!("Failed to parse message from {}: {}", addr, e);
                        BridgeMessage::error_response("", BridgeError::parse_error())
                    }
                };

                let json = serde_json::to_string(&response)?;
                if write.send(Message::Text(json)).await.is_err() {
                    break;
                }
            }
            Ok(Message::Close(_)) => {
                info!("Agent {} disconnected", addr);
                break;
            }
            Err(e) => {
                error!("Error from {}: {}", addr, e);
                break;
            }
            _ => {}
        }
    }

    Ok(())
}

/// Route one request to the handler and build its response
pub async fn dispatch(handler: &dyn SimulatorHandler, request: BridgeMessage) -> BridgeMessage {
    let id = request.id.clone().unwrap_or_default();
    let Some(method) = request.method.as_deref() else {
        return BridgeMessage::error_response(id, BridgeError::invalid_params("Missing method"));
    };
    debug!("Bridge request {}: {}", id, method);

    let result = match method {
        methods::SPACES => handler
            .spaces()
            .await
            .and_then(|spaces| Ok(serde_json::to_value(spaces)?)),
        methods::RESET => handler.reset().await.and_then(|observation| {
            Ok(serde_json::to_value(ResetResponse { observation })?)
        }),
        methods::STEP => {
            let params = request.params.unwrap_or(serde_json::Value::Null);
            match serde_json::from_value::<StepParams>(params) {
                Ok(params) => handler
                    .step(params.action)
                    .await
                    .and_then(|outcome| Ok(serde_json::to_value(outcome)?)),
                Err(e) => {
                    return BridgeMessage::error_response(
                        id,
                        BridgeError::invalid_params(e.to_string()),
                    )
                }
            }
        }
        methods::CLOSE => handler.close().await.map(|()| serde_json::json!({})),
        _ => return BridgeMessage::error_response(id, BridgeError::method_not_found()),
    };

    match result {
        Ok(value) => BridgeMessage::response(id, value),
        Err(e) => BridgeMessage::error_response(id, BridgeError::internal_error(e.to_string())),
    }
}
