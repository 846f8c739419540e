//! Scripted in-process transport for unit tests.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use serde_json::Value;

use super::{ApiError, ApiRequest, ApiResponse, RequestBody, Transport};

#[derive(Debug, Clone)]
pub(crate) struct RecordedCall {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub bearer: Option<String>,
    pub body: RequestBody,
}

impl RecordedCall {
    pub fn json_body(&self) -> Option<&Value> {
        match &self.body {
            RequestBody::Json(value) => Some(value),
            _ => None,
        }
    }
}

pub(crate) enum Reply {
    Response(u16, String),
    NoResponse,
}

impl Reply {
    pub fn json(status: u16, body: Value) -> Self {
        Reply::Response(status, body.to_string())
    }

    pub fn status(status: u16) -> Self {
        Reply::Response(status, String::new())
    }
}

type Handler = dyn Fn(&RecordedCall) -> Reply + Send + Sync;

pub(crate) struct FakeTransport {
    handler: Box<Handler>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl FakeTransport {
    pub fn new(handler: impl Fn(&RecordedCall) -> Reply + Send + Sync + 'static) -> Arc<Self> {
        Arc::new(Self {
            handler: Box::new(handler),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().expect("calls lock").clone()
    }

    pub fn calls_to(&self, path: &str) -> Vec<RecordedCall> {
        self.calls().into_iter().filter(|c| c.path == path).collect()
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn send(
        &self,
        request: &ApiRequest,
        bearer: Option<&str>,
    ) -> Result<ApiResponse, ApiError> {
        let call = RecordedCall {
            method: request.method.clone(),
            path: request.path.clone(),
            query: request.query.clone(),
            bearer: bearer.map(str::to_string),
            body: request.body.clone(),
        };
        self.calls.lock().expect("calls lock").push(call.clone());

        // Let other in-flight requests interleave, like a real round trip
        tokio::task::yield_now().await;

        match (self.handler)(&call) {
            Reply::Response(status, body) => {
                let status = StatusCode::from_u16(status).expect("valid status");
                Ok(ApiResponse::new(status, body))
            }
            Reply::NoResponse => Err(ApiError::Transport("connection refused".into())),
        }
    }
}
