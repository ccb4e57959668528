use std::fs;
use std::time::Duration;

use log::{debug, info};
use reqwest::blocking::{Client, RequestBuilder as HttpRequestBuilder, Response};
use reqwest::Identity;
use serde::Serialize;
use serde_json::Value;

use crate::config::ClientCredential;
use crate::encryption;
use crate::error::{ClientError, Result};

/// Column width for the query-string line in [`RequestBuilder::preview`].
const PREVIEW_WRAP_WIDTH: usize = 80;

/// Fluent builder for a single sandbox API request.
///
/// Accumulates endpoint, headers, query parameters, and body, then lets the
/// caller either render a preview of the outgoing request or perform a
/// blocking send over mutual TLS. Configuration steps return `Result<Self>`
/// so a chain aborts at the first invalid call:
///
/// ```no_run
/// # use ssg_sandbox_client::{ClientCredential, RequestBuilder};
/// let credential = ClientCredential::new("cert.pem", "key.pem");
/// let response = RequestBuilder::new()
///     .with_endpoint("https://api.ssg-wsg.sg", "courses/runs/10026")?
///     .with_header("accept", "application/json")?
///     .with_param("includeExpired", true)?
///     .get(&credential)?;
/// # Ok::<(), ssg_sandbox_client::ClientError>(())
/// ```
///
/// Each send borrows the builder, so a configured builder can be previewed
/// and then sent without rebuilding.
#[derive(Debug, Clone, Default)]
pub struct RequestBuilder {
    endpoint: Option<String>,
    headers: Vec<(String, String)>,
    params: Vec<(String, Value)>,
    body: Option<String>,
    timeout: Option<Duration>,
}

impl RequestBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the target endpoint from a base URL and an optional path suffix.
    ///
    /// The base must start with `http://` or `https://`. Slashes are
    /// normalized so the stored endpoint has exactly one slash at the join
    /// and none at the tail. Calling again overwrites the endpoint.
    pub fn with_endpoint(mut self, base: &str, direct_argument: &str) -> Result<Self> {
        if base.is_empty() {
            return Err(ClientError::EndpointError("endpoint must not be empty".to_string()));
        }
        if !base.starts_with("http://") && !base.starts_with("https://") {
            return Err(ClientError::EndpointError(format!(
                "endpoint must start with http:// or https://, got '{}'",
                base
            )));
        }

        let mut endpoint = base.trim_end_matches('/').to_string();
        let suffix = direct_argument.trim_start_matches('/');
        if !suffix.is_empty() {
            endpoint.push('/');
            endpoint.push_str(suffix);
        }
        self.endpoint = Some(endpoint.trim_end_matches('/').to_string());
        Ok(self)
    }

    /// Insert or overwrite a header. Insertion order is preserved for the
    /// preview rendering.
    pub fn with_header(mut self, key: &str, value: &str) -> Result<Self> {
        if key.is_empty() {
            return Err(ClientError::HeaderError("header name must not be empty".to_string()));
        }
        if value.is_empty() {
            return Err(ClientError::HeaderError(format!(
                "header '{}' must have a non-empty value",
                key
            )));
        }
        match self.headers.iter_mut().find(|(k, _)| k == key) {
            Some(entry) => entry.1 = value.to_string(),
            None => self.headers.push((key.to_string(), value.to_string())),
        }
        Ok(self)
    }

    /// Insert or overwrite a query parameter. The value may be anything
    /// JSON-serializable; serialization is attempted immediately and a
    /// failure rejects the call.
    pub fn with_param<T: Serialize>(mut self, key: &str, value: T) -> Result<Self> {
        if key.is_empty() {
            return Err(ClientError::ParameterError(
                "parameter name must not be empty".to_string(),
            ));
        }
        let value = serde_json::to_value(value).map_err(|e| {
            ClientError::ParameterError(format!("parameter '{}' is not serializable: {}", key, e))
        })?;
        match self.params.iter_mut().find(|(k, _)| k == key) {
            Some(entry) => entry.1 = value,
            None => self.params.push((key.to_string(), value)),
        }
        Ok(self)
    }

    /// Set the request body. The input must serialize to a JSON object and is
    /// snapshotted to a string immediately, so later mutation of the source
    /// value does not affect the stored body.
    pub fn with_body<T: Serialize>(mut self, body: &T) -> Result<Self> {
        let value = serde_json::to_value(body)
            .map_err(|e| ClientError::BodyError(format!("body is not serializable: {}", e)))?;
        if !value.is_object() {
            return Err(ClientError::BodyError(format!(
                "body must be a JSON object, got {}",
                json_type_name(&value)
            )));
        }
        self.body = Some(value.to_string());
        Ok(self)
    }

    /// Pin the request to a specific API version via the `x-api-version`
    /// header.
    ///
    /// Avoid unless an endpoint demands it: a pinned version silently keeps
    /// the request on a surface the API may have deprecated. Omitting the
    /// header gets the current version.
    pub fn with_api_version(self, version: &str) -> Result<Self> {
        self.with_header("x-api-version", version)
    }

    /// Override the HTTP client timeout for the send calls (default 30s).
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn endpoint(&self) -> Option<&str> {
        self.endpoint.as_deref()
    }

    pub fn body(&self) -> Option<&str> {
        self.body.as_deref()
    }

    /// Render a human-readable preview of the request as it will go out on
    /// the wire: request line with the query string appended (wrapped at
    /// column 80), every header, and the body pretty-printed with 4-space
    /// indentation.
    ///
    /// The body is always shown in the clear, including for requests that
    /// will be sent through [`RequestBuilder::post_encrypted`]; the display
    /// layer shows the ciphertext separately when it matters.
    pub fn preview(&self, method: &str) -> String {
        let mut request_line = format!(
            "{} {}",
            method,
            self.endpoint.as_deref().unwrap_or("<no endpoint>")
        );
        if !self.params.is_empty() {
            request_line.push('?');
            request_line.push_str(&self.query_string());
        }

        let mut out = wrap_line(&request_line, PREVIEW_WRAP_WIDTH);
        out.push_str("\n\nHeaders:\n");
        for (name, value) in &self.headers {
            out.push_str(name);
            out.push_str(": ");
            out.push_str(value);
            out.push('\n');
        }

        if let Some(body) = &self.body {
            out.push_str("\nBody:\n");
            match serde_json::from_str::<Value>(body) {
                Ok(value) => out.push_str(&pretty_json(&value)),
                // The stored body is always valid JSON; this arm is for
                // robustness of the preview only.
                Err(_) => out.push_str(body),
            }
            out.push('\n');
        }
        out
    }

    fn query_string(&self) -> String {
        self.params
            .iter()
            .map(|(key, value)| format!("{}={}", key, query_value(value)))
            .collect::<Vec<_>>()
            .join("&")
    }

    fn require_endpoint(&self) -> Result<&str> {
        self.endpoint
            .as_deref()
            .ok_or_else(|| ClientError::EndpointError("no endpoint configured".to_string()))
    }

    fn require_body(&self) -> Result<&str> {
        self.body
            .as_deref()
            .ok_or_else(|| ClientError::BodyError("no body configured".to_string()))
    }

    fn http_client(&self, credential: &ClientCredential) -> Result<Client> {
        let identity = load_identity(credential)?;
        let client = Client::builder()
            .timeout(self.timeout.unwrap_or(crate::config::ApiContext::DEFAULT_TIMEOUT))
            .identity(identity)
            .build()?;
        Ok(client)
    }

    fn apply(&self, mut request: HttpRequestBuilder) -> HttpRequestBuilder {
        for (name, value) in &self.headers {
            request = request.header(name, value);
        }
        if !self.params.is_empty() {
            let pairs: Vec<(&str, String)> = self
                .params
                .iter()
                .map(|(key, value)| (key.as_str(), query_value(value)))
                .collect();
            request = request.query(&pairs);
        }
        request
    }

    /// Send a GET with the accumulated headers and query parameters over
    /// mutual TLS. No body is sent.
    pub fn get(&self, credential: &ClientCredential) -> Result<Response> {
        let endpoint = self.require_endpoint()?;
        let client = self.http_client(credential)?;
        info!("GET {}", endpoint);
        let response = self.apply(client.get(endpoint)).send()?;
        debug!("GET {} -> {}", endpoint, response.status());
        Ok(response)
    }

    /// Send the stored JSON body as-is via POST over mutual TLS.
    pub fn post(&self, credential: &ClientCredential) -> Result<Response> {
        let endpoint = self.require_endpoint()?;
        let body = self.require_body()?.to_string();
        let client = self.http_client(credential)?;
        info!("POST {} ({} byte body)", endpoint, body.len());
        let response = self
            .apply(client.post(endpoint))
            .header("content-type", "application/json")
            .body(body)
            .send()?;
        debug!("POST {} -> {}", endpoint, response.status());
        Ok(response)
    }

    /// Encrypt the stored body with the credential's AES key and POST the
    /// resulting base64 ciphertext as a single JSON string literal.
    ///
    /// The target API expects an opaque pre-encrypted string on sensitive
    /// endpoints, not structured JSON; the response body comes back in the
    /// same form and can be decoded with [`crate::encryption::decrypt`].
    pub fn post_encrypted(&self, credential: &ClientCredential) -> Result<Response> {
        let endpoint = self.require_endpoint()?;
        let body = self.require_body()?;
        let key = credential.require_encryption_key()?;
        let ciphertext = encryption::encrypt(key, body)?;
        let payload = serde_json::to_string(&ciphertext)?;
        let client = self.http_client(credential)?;
        info!(
            "POST {} ({} byte body encrypted to {} byte payload)",
            endpoint,
            body.len(),
            payload.len()
        );
        let response = self
            .apply(client.post(endpoint))
            .header("content-type", "application/json")
            .body(payload)
            .send()?;
        debug!("POST {} -> {}", endpoint, response.status());
        Ok(response)
    }
}

/// Build the mutual-TLS client identity from the credential's PEM pair.
/// reqwest wants certificate and key in one PEM buffer, so the two files are
/// concatenated.
fn load_identity(credential: &ClientCredential) -> Result<Identity> {
    let mut pem = fs::read(&credential.cert_path).map_err(|e| {
        ClientError::CredentialError(format!(
            "cannot read certificate {}: {}",
            credential.cert_path.display(),
            e
        ))
    })?;
    let key = fs::read(&credential.key_path).map_err(|e| {
        ClientError::CredentialError(format!(
            "cannot read private key {}: {}",
            credential.key_path.display(),
            e
        ))
    })?;
    pem.push(b'\n');
    pem.extend_from_slice(&key);
    Identity::from_pem(&pem)
        .map_err(|e| ClientError::CredentialError(format!("invalid certificate/key pair: {}", e)))
}

/// Render a query value the way it appears on the wire: strings bare,
/// everything else in JSON form.
fn query_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Hard-wrap `line` at `width` characters. Query strings have no natural
/// break points, so the wrap is a plain chunking on char boundaries.
fn wrap_line(line: &str, width: usize) -> String {
    let chars: Vec<char> = line.chars().collect();
    chars
        .chunks(width)
        .map(|chunk| chunk.iter().collect::<String>())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Serialize with 4-space indentation for the preview body section.
fn pretty_json(value: &Value) -> String {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    // Serializing a serde_json::Value cannot fail.
    value
        .serialize(&mut serializer)
        .expect("serializing a Value is infallible");
    String::from_utf8(buf).expect("serde_json emits UTF-8")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;

    #[test]
    fn test_endpoint_normalization() {
        let builder = RequestBuilder::new()
            .with_endpoint("https://api.example.com/", "/v1/foo/")
            .unwrap();
        assert_eq!(builder.endpoint(), Some("https://api.example.com/v1/foo"));
    }

    #[test]
    fn test_endpoint_without_suffix() {
        let builder = RequestBuilder::new()
            .with_endpoint("https://api.example.com///", "")
            .unwrap();
        assert_eq!(builder.endpoint(), Some("https://api.example.com"));
    }

    #[test]
    fn test_endpoint_overwrites() {
        let builder = RequestBuilder::new()
            .with_endpoint("https://first.example.com", "")
            .unwrap()
            .with_endpoint("https://second.example.com", "v2")
            .unwrap();
        assert_eq!(builder.endpoint(), Some("https://second.example.com/v2"));
    }

    #[test]
    fn test_endpoint_rejects_bad_scheme() {
        let err = RequestBuilder::new()
            .with_endpoint("ftp://bad", "")
            .unwrap_err();
        assert!(matches!(err, ClientError::EndpointError(_)));

        let err = RequestBuilder::new().with_endpoint("", "").unwrap_err();
        assert!(matches!(err, ClientError::EndpointError(_)));
    }

    #[test]
    fn test_header_rejects_empty() {
        let err = RequestBuilder::new().with_header("", "v").unwrap_err();
        assert!(matches!(err, ClientError::HeaderError(_)));

        let err = RequestBuilder::new().with_header("accept", "").unwrap_err();
        assert!(matches!(err, ClientError::HeaderError(_)));
    }

    #[test]
    fn test_header_overwrite_keeps_position() {
        let builder = RequestBuilder::new()
            .with_header("accept", "application/json")
            .unwrap()
            .with_header("x-api-version", "v1")
            .unwrap()
            .with_header("accept", "text/plain")
            .unwrap();
        assert_eq!(
            builder.headers,
            vec![
                ("accept".to_string(), "text/plain".to_string()),
                ("x-api-version".to_string(), "v1".to_string()),
            ]
        );
    }

    #[test]
    fn test_param_rejects_empty_key_and_bad_value() {
        let err = RequestBuilder::new().with_param("", 1).unwrap_err();
        assert!(matches!(err, ClientError::ParameterError(_)));

        // A map with non-string keys is not JSON-serializable.
        let mut bad = HashMap::new();
        bad.insert(vec![1u8], "value");
        let err = RequestBuilder::new().with_param("k", &bad).unwrap_err();
        assert!(matches!(err, ClientError::ParameterError(_)));
    }

    #[test]
    fn test_body_rejects_non_object() {
        let err = RequestBuilder::new().with_body(&vec![1, 2, 3]).unwrap_err();
        assert!(matches!(err, ClientError::BodyError(_)));

        let err = RequestBuilder::new().with_body(&"just a string").unwrap_err();
        assert!(matches!(err, ClientError::BodyError(_)));
    }

    #[test]
    fn test_body_snapshot_isolation() {
        let mut source = HashMap::new();
        source.insert("uen", "T08GB0001A");
        let builder = RequestBuilder::new().with_body(&source).unwrap();

        source.insert("uen", "MUTATED");
        source.insert("extra", "field");

        let stored: Value = serde_json::from_str(builder.body().unwrap()).unwrap();
        assert_eq!(stored, json!({ "uen": "T08GB0001A" }));
    }

    #[test]
    fn test_api_version_is_header_sugar() {
        let builder = RequestBuilder::new().with_api_version("v2").unwrap();
        assert_eq!(
            builder.headers,
            vec![("x-api-version".to_string(), "v2".to_string())]
        );
    }

    #[test]
    fn test_preview_completeness() {
        let body = json!({ "course": { "run": { "id": "10026" } } });
        let builder = RequestBuilder::new()
            .with_endpoint("https://api.example.com", "courses/runs")
            .unwrap()
            .with_header("accept", "application/json")
            .unwrap()
            .with_header("x-api-version", "v1")
            .unwrap()
            .with_param("pageSize", 20)
            .unwrap()
            .with_body(&body)
            .unwrap();

        let preview = builder.preview("POST");
        assert!(preview.contains("POST https://api.example.com/courses/runs?pageSize=20"));
        assert!(preview.contains("accept: application/json"));
        assert!(preview.contains("x-api-version: v1"));

        let body_section = preview.split("Body:\n").nth(1).unwrap();
        let reparsed: Value = serde_json::from_str(body_section).unwrap();
        assert_eq!(reparsed, body);
    }

    #[test]
    fn test_preview_wraps_long_query_line() {
        let mut builder = RequestBuilder::new()
            .with_endpoint("https://api.example.com", "search")
            .unwrap();
        for i in 0..20 {
            builder = builder.with_param(&format!("filter{}", i), i).unwrap();
        }
        let preview = builder.preview("GET");
        let request_lines: Vec<&str> = preview.split("\n\nHeaders:").next().unwrap().lines().collect();
        assert!(request_lines.len() > 1);
        for line in request_lines {
            assert!(line.chars().count() <= PREVIEW_WRAP_WIDTH);
        }
    }

    #[test]
    fn test_string_params_render_bare() {
        let builder = RequestBuilder::new()
            .with_endpoint("https://api.example.com", "")
            .unwrap()
            .with_param("uen", "T08GB0001A")
            .unwrap()
            .with_param("includeExpired", false)
            .unwrap();
        assert_eq!(builder.query_string(), "uen=T08GB0001A&includeExpired=false");
    }

    #[test]
    fn test_send_requires_endpoint() {
        let credential = ClientCredential::new("cert.pem", "key.pem");
        let err = RequestBuilder::new().get(&credential).unwrap_err();
        assert!(matches!(err, ClientError::EndpointError(_)));
    }

    #[test]
    fn test_post_requires_body() {
        let credential = ClientCredential::new("cert.pem", "key.pem");
        let err = RequestBuilder::new()
            .with_endpoint("https://api.example.com", "")
            .unwrap()
            .post(&credential)
            .unwrap_err();
        assert!(matches!(err, ClientError::BodyError(_)));
    }

    #[test]
    fn test_send_requires_readable_credentials() {
        let credential = ClientCredential::new("/nonexistent/cert.pem", "/nonexistent/key.pem");
        let err = RequestBuilder::new()
            .with_endpoint("https://api.example.com", "")
            .unwrap()
            .get(&credential)
            .unwrap_err();
        assert!(matches!(err, ClientError::CredentialError(_)));
    }

    #[test]
    fn test_post_encrypted_requires_key() {
        let credential = ClientCredential::new("cert.pem", "key.pem");
        let err = RequestBuilder::new()
            .with_endpoint("https://api.example.com", "")
            .unwrap()
            .with_body(&json!({ "nric": "S0000001I" }))
            .unwrap()
            .post_encrypted(&credential)
            .unwrap_err();
        assert!(matches!(err, ClientError::CredentialError(_)));
    }
}
