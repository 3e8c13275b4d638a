//! Scripted transport for exercising the pipeline without a network.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use http::{header, Method, Request, Response, StatusCode};
use parking_lot::Mutex;
use tokio::sync::Notify;

use super::transport::{Transport, TransportError};

#[derive(Debug, Clone)]
pub(crate) struct RecordedCall {
    pub method: Method,
    pub uri: String,
    pub authorization: Option<String>,
    pub body: Vec<u8>,
}

impl RecordedCall {
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).unwrap_or(serde_json::Value::Null)
    }
}

struct Step {
    result: Result<Response<Vec<u8>>, TransportError>,
    gate: Option<Arc<Notify>>,
}

/// Answers calls in order from a script and records every call it sees.
#[derive(Default)]
pub(crate) struct ScriptedTransport {
    steps: Mutex<VecDeque<Step>>,
    calls: Mutex<Vec<RecordedCall>>,
}

fn response(status: u16, body: &str) -> Response<Vec<u8>> {
    Response::builder()
        .status(StatusCode::from_u16(status).unwrap())
        .header(header::CONTENT_TYPE, "application/json")
        .body(body.as_bytes().to_vec())
        .unwrap()
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(self, status: u16, body: &str) -> Self {
        self.steps.lock().push_back(Step {
            result: Ok(response(status, body)),
            gate: None,
        });
        self
    }

    /// Respond only once `gate` is notified.
    pub fn respond_after(self, gate: Arc<Notify>, status: u16, body: &str) -> Self {
        self.steps.lock().push_back(Step {
            result: Ok(response(status, body)),
            gate: Some(gate),
        });
        self
    }

    pub fn fail(self, error: TransportError) -> Self {
        self.steps.lock().push_back(Step {
            result: Err(error),
            gate: None,
        });
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn calls_to(&self, path: &str) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|c| c.uri.ends_with(path))
            .count()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn execute(&self, request: Request<Vec<u8>>) -> Result<Response<Vec<u8>>, TransportError> {
        self.calls.lock().push(RecordedCall {
            method: request.method().clone(),
            uri: request.uri().to_string(),
            authorization: request
                .headers()
                .get(header::AUTHORIZATION)
                .and_then(|v| v.to_str().ok())
                .map(|s| s.to_string()),
            body: request.body().clone(),
        });

        let step = self.steps.lock().pop_front();
        let Some(step) = step else {
            return Err(TransportError::Other("no scripted response left".to_string()));
        };
        if let Some(gate) = step.gate {
            gate.notified().await;
        }
        step.result
    }
}
