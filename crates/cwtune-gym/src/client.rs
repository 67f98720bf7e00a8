//! Bridge WebSocket client

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::{
    connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream,
};
use tracing::{debug, info, warn};

use cwtune_core::bridge::methods;
use cwtune_core::{BridgeMessage, CwTuneError, Result};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Request/response client for a simulator bridge.
///
/// One call is in flight at a time; the client waits for the response whose
/// id matches the request before returning.
pub struct BridgeClient {
    url: String,
    stream: Option<WsStream>,
}

impl BridgeClient {
    /// Connect to the bridge, retrying while the simulator starts up
    pub async fn connect(url: impl Into<String>, timeout: Duration, retries: u32) -> Result<Self> {
        let url = url.into();
        let mut attempt = 0;

        loop {
            attempt += 1;
            debug!("Connecting to simulator bridge {} (attempt {})", url, attempt);

            let err = match tokio::time::timeout(timeout, connect_async(url.as_str())).await {
                Ok(Ok((stream, _))) => {
                    info!("Connected to simulator bridge: {}", url);
                    return Ok(Self {
                        url,
                        stream: Some(stream),
                    });
                }
                Ok(Err(e)) => CwTuneError::Connection(format!("{url}: {e}")),
                Err(_) => CwTuneError::Timeout(format!("connecting to {url}")),
            };

            if attempt > retries {
                return Err(err);
            }

            warn!("Simulator bridge not ready: {}. Retrying...", err);
            tokio::time::sleep(timeout.min(Duration::from_millis(500))).await;
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    /// Send a request and wait for its response
    pub async fn call(
        &mut self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<serde_json::Value> {
        let stream = self
            .stream
            .as_mut()
            .ok_or_else(|| CwTuneError::Connection("Not connected".to_string()))?;

        let id = uuid::Uuid::new_v4().to_string();
        let request = BridgeMessage::request(&id, method, params);
        let json = serde_json::to_string(&request)?;

        stream
            .send(Message::Text(json))
            .await
            .map_err(|e| CwTuneError::Connection(e.to_string()))?;

        loop {
            match stream.next().await {
                Some(Ok(Message::Text(text))) => {
                    let response: BridgeMessage = serde_json::from_str(&text)?;

                    if response.id.as_deref() != Some(id.as_str()) {
                        warn!("Dropping bridge message with unexpected id {:?}", response.id);
                        continue;
                    }

                    if let Some(error) = response.error {
                        return Err(CwTuneError::Simulator(format!("{method}: {error}")));
                    }

                    return Ok(response.result.unwrap_or(serde_json::Value::Null));
                }
                Some(Ok(Message::Close(_))) | None => {
                    self.stream = None;
                    return Err(CwTuneError::Connection(
                        "Simulator bridge closed the connection".to_string(),
                    ));
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    self.stream = None;
                    return Err(CwTuneError::Connection(e.to_string()));
                }
            }
        }
    }

    /// Call a method and decode its result
    pub async fn call_as<T: serde::de::DeserializeOwned>(
        &mut self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<T> {
        let value = self.call(method, params).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Ask the simulator to stop and close the socket
    pub async fn close(&mut self) -> Result<()> {
        if self.stream.is_none() {
            return Ok(());
        }

        if let Err(e) = self.call(methods::CLOSE, serde_json::json!({})).await {
            warn!("Simulator did not acknowledge close: {}", e);
        }

        if let Some(mut stream) = self.stream.take() {
            if let Err(e) = stream.close(None).await {
                debug!("WebSocket close failed: {}", e);
            }
        }

        info!("Disconnected from simulator bridge");
        Ok(())
    }
}
