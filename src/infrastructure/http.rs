use crate::config::Configuration;
use crate::domain::ports::{Method, Transport, TransportRequest, TransportResponse};
use crate::error::{PaymentError, Result, TransportError};
use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE, USER_AGENT};
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// `Transport` over HTTPS, with bearer authentication.
#[derive(Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    access_token: String,
}

impl HttpTransport {
    pub fn new(base_url: impl Into<String>, access_token: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| PaymentError::Transport(TransportError::new(e.to_string())))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            access_token: access_token.into(),
        })
    }

    /// Targets the host of the configured mode.
    pub fn from_configuration(configuration: &Configuration) -> Result<Self> {
        Self::new(configuration.base_url(), configuration.access_token.clone())
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }
}

fn http_method(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Post => reqwest::Method::POST,
        Method::Patch => reqwest::Method::PATCH,
        Method::Delete => reqwest::Method::DELETE,
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn request(
        &self,
        request: TransportRequest,
    ) -> std::result::Result<TransportResponse, TransportError> {
        let mut builder = self
            .client
            .request(http_method(request.method), self.url(&request.path))
            .bearer_auth(&self.access_token)
            .header(ACCEPT, "application/acknowledgement+json, application/problem+json")
            .header(USER_AGENT, &request.user_agent);

        if let Some(body) = &request.body {
            builder = builder
                .header(CONTENT_TYPE, "application/json;version=3.1")
                .json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| TransportError::new(e.to_string()))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| TransportError::new(e.to_string()))?;

        if !status.is_success() {
            return Err(TransportError::with_response(status.as_u16(), body));
        }

        Ok(TransportResponse {
            status: status.as_u16(),
            body,
        })
    }
}
