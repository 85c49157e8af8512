//! HTTP transport implementation using reqwest.
//!
//! This adapter implements the `HttpTransport` port. It resolves request
//! paths against the configured API root and sends them exactly as the
//! client core built them.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use photox_application::ports::{HttpTransport, TransportError};
use photox_domain::{ApiRequest, ApiResponse, FormValue, HttpMethod, MultipartForm, RequestBody};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Method, Url};
use tracing::debug;

use crate::config::ClientSettings;

/// HTTP transport backed by `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
    base_url: String,
    timeout_ms: u64,
}

impl ReqwestTransport {
    /// Creates a transport from the client settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is invalid or the client cannot be
    /// created.
    pub fn new(settings: &ClientSettings) -> Result<Self, TransportError> {
        let client = Client::builder()
            .user_agent(settings.user_agent.as_str())
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .map_err(|e| TransportError::Other(e.to_string()))?;

        Self::with_client(client, &settings.base_url, settings.timeout_ms)
    }

    /// Creates a transport around an existing reqwest client.
    ///
    /// # Errors
    ///
    /// Returns `TransportError::InvalidUrl` if `base_url` is not an
    /// absolute URL.
    pub fn with_client(
        client: Client,
        base_url: &str,
        timeout_ms: u64,
    ) -> Result<Self, TransportError> {
        Url::parse(base_url).map_err(|e| TransportError::InvalidUrl(format!("{e}: {base_url}")))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout_ms,
        })
    }

    /// Returns the API root.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Resolves the request path and appends its query parameters.
    ///
    /// Absolute URLs (pagination links) are used verbatim.
    fn resolve(&self, request: &ApiRequest) -> Result<Url, TransportError> {
        let raw = if request.is_absolute() {
            request.path.clone()
        } else {
            format!("{}{}", self.base_url, request.path)
        };
        let mut url =
            Url::parse(&raw).map_err(|e| TransportError::InvalidUrl(format!("{e}: {raw}")))?;

        if !request.query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (name, value) in &request.query {
                pairs.append_pair(name, value);
            }
        }
        Ok(url)
    }

    const fn to_reqwest_method(method: HttpMethod) -> Method {
        match method {
            HttpMethod::Get => Method::GET,
            HttpMethod::Post => Method::POST,
            HttpMethod::Put => Method::PUT,
            HttpMethod::Delete => Method::DELETE,
        }
    }

    fn build_form(form: &MultipartForm) -> Result<Form, TransportError> {
        let mut multipart = Form::new();
        for part in form.parts() {
            multipart = match &part.value {
                FormValue::Text(value) => multipart.text(part.name.clone(), value.clone()),
                FormValue::File {
                    file_name,
                    content_type,
                    bytes,
                } => {
                    let mime: mime::Mime = content_type.parse().map_err(|e| {
                        TransportError::InvalidBody(format!("{content_type}: {e}"))
                    })?;
                    let file = Part::bytes(bytes.clone())
                        .file_name(file_name.clone())
                        .mime_str(mime.as_ref())
                        .map_err(|e| TransportError::InvalidBody(e.to_string()))?;
                    multipart.part(part.name.clone(), file)
                }
            };
        }
        Ok(multipart)
    }

    fn map_error(error: &reqwest::Error, timeout_ms: u64) -> TransportError {
        if error.is_timeout() {
            return TransportError::Timeout { timeout_ms };
        }
        if error.is_connect() {
            return TransportError::ConnectionFailed(error.to_string());
        }
        if error.is_builder() {
            return TransportError::InvalidUrl(error.to_string());
        }
        TransportError::Other(error.to_string())
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, TransportError> {
        let url = self.resolve(request)?;
        let start = Instant::now();

        let mut builder = self
            .client
            .request(Self::to_reqwest_method(request.method), url.clone())
            .timeout(Duration::from_millis(self.timeout_ms));

        let multipart = matches!(request.body, RequestBody::Multipart(_));
        for (name, value) in &request.headers {
            // The boundary-carrying content type comes from the form.
            if multipart && name.eq_ignore_ascii_case("content-type") {
                continue;
            }
            builder = builder.header(name.as_str(), value.as_str());
        }

        builder = match &request.body {
            RequestBody::None => builder,
            RequestBody::Json(value) => builder.json(value),
            RequestBody::Multipart(form) => builder.multipart(Self::build_form(form)?),
        };

        let response = builder
            .send()
            .await
            .map_err(|e| Self::map_error(&e, self.timeout_ms))?;

        let status = response.status().as_u16();
        let headers: HashMap<String, String> = response
            .headers()
            .iter()
            .map(|(k, v)| {
                (
                    k.as_str().to_ascii_lowercase(),
                    v.to_str().unwrap_or("<binary>").to_string(),
                )
            })
            .collect();

        let body = response
            .bytes()
            .await
            .map_err(|e| TransportError::Other(format!("failed to read body: {e}")))?
            .to_vec();
        let duration = start.elapsed();

        debug!(
            method = %request.method,
            %url,
            status,
            elapsed_ms = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX),
            "HTTP exchange complete"
        );

        Ok(ApiResponse::new(status, headers, body, duration))
    }
}
