// Copyright 2023 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

use super::errors::Error;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

/// Default request timeout in seconds
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Status and body of an HTTP response, whatever the status
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// The HTTP GET primitive the verification server is reached through
#[async_trait::async_trait]
pub trait ApiTransport: Send + Sync {
    /// GET `url` with the given query parameters.  Only failures to obtain a
    /// response are errors; non-2xx responses are returned as such.
    async fn get(&self, url: &str, query: &[(&str, &str)]) -> Result<ApiResponse, Error>;
}

pub struct ReqwestTransport {
    http_client: Client,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self, Error> {
        Self::with_timeout(Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS))
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, Error> {
        let http_client = Client::builder().timeout(timeout).build()?;

        Ok(Self { http_client })
    }
}

#[async_trait::async_trait]
impl ApiTransport for ReqwestTransport {
    async fn get(&self, url: &str, query: &[(&str, &str)]) -> Result<ApiResponse, Error> {
        debug!(%url, "GET");

        let response = self.http_client.get(url).query(query).send().await?;

        let status = response.status().as_u16();
        let body = response.text().await?;

        debug!(%url, status, "response received");

        Ok(ApiResponse { status, body })
    }
}

#[cfg(any(test, feature = "test-utils"))]
pub mod mock {
    use super::{ApiResponse, ApiTransport, Error};
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Recorded request: URL and query parameters
    pub type Call = (String, Vec<(String, String)>);

    /// Serves canned responses keyed by URL and records every request
    #[derive(Default)]
    pub struct MockTransport {
        routes: Mutex<HashMap<String, Result<ApiResponse, Error>>>,
        calls: Mutex<Vec<Call>>,
    }

    impl MockTransport {
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        #[must_use]
        pub fn with_response(self, url: &str, status: u16, body: &str) -> Self {
            self.routes.lock().unwrap().insert(
                url.to_string(),
                Ok(ApiResponse {
                    status,
                    body: body.to_string(),
                }),
            );
            self
        }

        #[must_use]
        pub fn with_failure(self, url: &str, message: &str) -> Self {
            self.routes
                .lock()
                .unwrap()
                .insert(url.to_string(), Err(Error::Transport(message.to_string())));
            self
        }

        pub fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait::async_trait]
    impl ApiTransport for MockTransport {
        async fn get(&self, url: &str, query: &[(&str, &str)]) -> Result<ApiResponse, Error> {
            self.calls.lock().unwrap().push((
                url.to_string(),
                query
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
            ));

            self.routes
                .lock()
                .unwrap()
                .get(url)
                .cloned()
                .unwrap_or_else(|| Err(Error::Transport(format!("connection refused: {url}"))))
        }
    }
}
