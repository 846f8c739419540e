//! Replayable request values and the HTTP transport that dispatches them.
//!
//! Requests are plain data so the session client can send the same request a
//! second time after refreshing its access token. Multipart bodies are rebuilt
//! from their fields for every attempt.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, multipart, Client, Method, StatusCode, Url};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tracing::debug;

use super::ApiError;

/// Whether a request participates in the session's bearer/refresh policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    /// Attach the stored access token and refresh on 401.
    Session,
    /// Never attach a token and never refresh (login, register, refresh).
    Anonymous,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormValue {
    Text(String),
    File {
        file_name: String,
        mime: Option<String>,
        bytes: Vec<u8>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Empty,
    Json(Value),
    Multipart(Vec<(String, FormValue)>),
}

/// A request against the blog API, relative to the configured base URL.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: RequestBody,
    pub auth: AuthMode,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: RequestBody::Empty,
            auth: AuthMode::Session,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn anonymous(mut self) -> Self {
        self.auth = AuthMode::Anonymous;
        self
    }

    pub fn query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    /// Add a query parameter only when a value is present.
    pub fn query_opt<V: ToString>(self, key: &str, value: Option<V>) -> Self {
        match value {
            Some(value) => self.query(key, value),
            None => self,
        }
    }

    pub fn json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self, ApiError> {
        self.body = RequestBody::Json(serde_json::to_value(body)?);
        Ok(self)
    }

    pub fn multipart(mut self, fields: Vec<(String, FormValue)>) -> Self {
        self.body = RequestBody::Multipart(fields);
        self
    }
}

/// A response that has been fully read from the wire.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub body: Vec<u8>,
}

impl ApiResponse {
    pub fn new(status: StatusCode, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ApiError> {
        serde_json::from_slice(&self.body).map_err(|e| {
            ApiError::InvalidResponse(format!("Failed to parse JSON response: {}", e))
        })
    }

    /// Turn a non-success status into the matching [`ApiError`].
    pub fn error_for_status(self) -> Result<Self, ApiError> {
        if self.status.is_success() {
            Ok(self)
        } else {
            Err(ApiError::from_status(self.status, &self.text()))
        }
    }
}

/// Sends one request and reads the whole response.
///
/// Implementations report "no response received" as an error and every
/// received response, whatever its status, as `Ok`.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &ApiRequest, bearer: Option<&str>)
        -> Result<ApiResponse, ApiError>;
}

/// HTTP request timeout in seconds used when none is configured.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// `reqwest`-backed transport.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: Url,
}

impl HttpTransport {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        let client = Client::builder().timeout(timeout).build()?;
        Self::with_client(client, base_url)
    }

    /// Build on an existing client, sharing its connection pool.
    pub fn with_client(client: Client, base_url: &str) -> Result<Self, ApiError> {
        // Url::join drops the last segment unless the base ends with '/'
        let normalized = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{}/", base_url)
        };
        let base_url = Url::parse(&normalized)
            .map_err(|e| ApiError::InvalidRequest(format!("Invalid API URL {}: {}", base_url, e)))?;
        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn url_for(&self, path: &str) -> Result<Url, ApiError> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| ApiError::InvalidRequest(format!("Invalid path {}: {}", path, e)))
    }

    fn auth_headers(bearer: Option<&str>) -> Result<header::HeaderMap, ApiError> {
        let mut headers = header::HeaderMap::new();
        headers.insert(header::ACCEPT, header::HeaderValue::from_static("application/json"));
        if let Some(token) = bearer {
            let value = header::HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|_| ApiError::InvalidRequest("Access token is not a valid header value".into()))?;
            headers.insert(header::AUTHORIZATION, value);
        }
        Ok(headers)
    }

    fn build_form(fields: &[(String, FormValue)]) -> Result<multipart::Form, ApiError> {
        let mut form = multipart::Form::new();
        for (name, value) in fields {
            form = match value {
                FormValue::Text(text) => form.text(name.clone(), text.clone()),
                FormValue::File {
                    file_name,
                    mime,
                    bytes,
                } => {
                    let mut part = multipart::Part::bytes(bytes.clone()).file_name(file_name.clone());
                    if let Some(mime) = mime {
                        part = part.mime_str(mime).map_err(|e| {
                            ApiError::InvalidRequest(format!("Invalid content type {}: {}", mime, e))
                        })?;
                    }
                    form.part(name.clone(), part)
                }
            };
        }
        Ok(form)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(
        &self,
        request: &ApiRequest,
        bearer: Option<&str>,
    ) -> Result<ApiResponse, ApiError> {
        let url = self.url_for(&request.path)?;
        debug!(method = %request.method, url = %url, authenticated = bearer.is_some(), "Sending request");

        let mut builder = self
            .client
            .request(request.method.clone(), url)
            .headers(Self::auth_headers(bearer)?);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        builder = match &request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.json(value),
            RequestBody::Multipart(fields) => builder.multipart(Self::build_form(fields)?),
        };

        let response = builder.send().await?;
        let status = response.status();
        let body = response.bytes().await?;
        debug!(status = status.as_u16(), bytes = body.len(), "Received response");

        Ok(ApiResponse::new(status, body.to_vec()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_for_joins_relative_paths() {
        let transport = HttpTransport::new("http://127.0.0.1:8000/api", Duration::from_secs(5))
            .expect("transport");
        assert_eq!(
            transport.url_for("posts/3/").expect("url").as_str(),
            "http://127.0.0.1:8000/api/posts/3/"
        );
        assert_eq!(
            transport.url_for("/token/refresh/").expect("url").as_str(),
            "http://127.0.0.1:8000/api/token/refresh/"
        );
    }

    #[test]
    fn test_invalid_base_url_is_rejected() {
        assert!(matches!(
            HttpTransport::new("not a url", Duration::from_secs(5)),
            Err(ApiError::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_auth_headers_only_carry_bearer_when_present() {
        let headers = HttpTransport::auth_headers(None).expect("headers");
        assert!(headers.get(header::AUTHORIZATION).is_none());

        let headers = HttpTransport::auth_headers(Some("abc")).expect("headers");
        assert_eq!(headers.get(header::AUTHORIZATION).unwrap(), "Bearer abc");
    }

    #[test]
    fn test_request_builder() {
        let request = ApiRequest::get("posts/")
            .query("page", 2)
            .query_opt("tag", None::<&str>)
            .query_opt("search", Some("rust"));
        assert_eq!(request.method, Method::GET);
        assert_eq!(request.auth, AuthMode::Session);
        assert_eq!(
            request.query,
            vec![
                ("page".to_string(), "2".to_string()),
                ("search".to_string(), "rust".to_string())
            ]
        );

        let login = ApiRequest::post("login/").anonymous();
        assert_eq!(login.auth, AuthMode::Anonymous);
    }

    #[test]
    fn test_error_for_status() {
        let ok = ApiResponse::new(StatusCode::CREATED, r#"{"liked": true}"#);
        assert!(ok.error_for_status().is_ok());

        let missing = ApiResponse::new(StatusCode::NOT_FOUND, r#"{"error": "Post not found"}"#);
        assert!(matches!(missing.error_for_status(), Err(ApiError::NotFound(_))));
    }
}
