//! Engine HTTP client — one JSON POST per domain action.
//!
//! The wire contract is deliberately small: every action is a POST with a
//! JSON body against one path on the engine's HTTP surface. A 2xx reply
//! carries either the action's JSON result or, for side-effect-only
//! actions, the fixed ack `{"status": "ok"}`. A non-2xx reply surfaces its
//! body text verbatim; the coordinator never interprets it.

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper_util::rt::TokioIo;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::net::TcpStream;
use tracing::debug;

use mlgrid_core::Endpoint;

use crate::error::{EngineError, EngineResult};

/// JSON-over-HTTP client bound to one engine endpoint.
pub struct EngineClient {
    endpoint: Endpoint,
}

impl EngineClient {
    pub fn new(endpoint: Endpoint) -> Self {
        Self { endpoint }
    }

    /// POST `body` to `path` and decode the JSON reply.
    pub async fn post<B, R>(&self, path: &str, body: &B) -> EngineResult<R>
    where
        B: Serialize,
        R: DeserializeOwned,
    {
        let bytes = self.post_raw(path, body).await?;
        serde_json::from_slice(&bytes)
            .map_err(|error| EngineError::InvalidResponse(error.to_string()))
    }

    /// POST `body` to `path` and validate the engine ack.
    ///
    /// Side-effect-only endpoints reply with `{"status": "ok"}`; anything
    /// else on a 2xx is a broken contract, not a silent success.
    pub async fn post_for_ack<B>(&self, path: &str, body: &B) -> EngineResult<()>
    where
        B: Serialize,
    {
        let bytes = self.post_raw(path, body).await?;
        let value: serde_json::Value = serde_json::from_slice(&bytes)
            .map_err(|error| EngineError::InvalidResponse(error.to_string()))?;

        match value.get("status").and_then(|status| status.as_str()) {
            Some("ok") => Ok(()),
            _ => Err(EngineError::InvalidResponse(format!(
                "expected ack {{\"status\": \"ok\"}}, got: {value}"
            ))),
        }
    }

    async fn post_raw<B: Serialize>(&self, path: &str, body: &B) -> EngineResult<Bytes> {
        let payload = serde_json::to_vec(body)
            .map_err(|error| EngineError::InvalidResponse(error.to_string()))?;
        let address = self.endpoint.to_string();

        let stream = TcpStream::connect(&address)
            .await
            .map_err(|error| EngineError::Transport(error.to_string()))?;
        let io = TokioIo::new(stream);
        let (mut sender, conn) = hyper::client::conn::http1::handshake(io)
            .await
            .map_err(|error| EngineError::Transport(error.to_string()))?;

        // Drive the connection in the background.
        tokio::spawn(async move {
            let _ = conn.await;
        });

        let request = http::Request::builder()
            .method("POST")
            .uri(path)
            .header("host", &address)
            .header("content-type", "application/json")
            .header("user-agent", "mlgrid/0.1")
            .body(Full::new(Bytes::from(payload)))
            .map_err(|error| EngineError::Transport(error.to_string()))?;

        debug!(endpoint = %self.endpoint, %path, "posting to engine");
        let response = sender
            .send_request(request)
            .await
            .map_err(|error| EngineError::Transport(error.to_string()))?;

        let status = response.status();
        let body = response
            .into_body()
            .collect()
            .await
            .map_err(|error| EngineError::Transport(error.to_string()))?
            .to_bytes();

        if !status.is_success() {
            return Err(EngineError::Remote {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&body).into_owned(),
            });
        }
        Ok(body)
    }
}
