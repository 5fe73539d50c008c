// Copyright 2023 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

use super::errors::Error;
use super::transport::ApiTransport;
use crate::attest::{NonceMode, VerifyMode};
use crate::token::{Scheme, Statement};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

/// GET `{server_url}/api/{scheme}/{entrypoint}` and return the body of a
/// successful response.  A non-2xx status, or a JSON body carrying an
/// `Error` field, is an upstream failure reported with the server's message.
pub(crate) async fn get_api(
    transport: &dyn ApiTransport,
    server_url: &str,
    scheme: Scheme,
    entrypoint: &str,
    query: &[(&str, &str)],
) -> Result<String, Error> {
    let base = server_url.trim().trim_end_matches('/');

    if base.is_empty() {
        return Err(Error::Configuration(
            "no verification server URL configured".to_string(),
        ));
    }

    let url = format!("{base}/api/{}/{entrypoint}", scheme.api_name());

    let response = transport.get(&url, query).await?;

    let server_error = serde_json::from_str::<Value>(&response.body)
        .ok()
        .and_then(|j| j.get("Error").map(render));

    if !response.is_success() {
        let message =
            server_error.unwrap_or_else(|| format!("server responded with HTTP {}", response.status));
        warn!(%url, status = response.status, %message, "verification server error");
        return Err(Error::Upstream(message));
    }

    if let Some(message) = server_error {
        warn!(%url, %message, "verification server error");
        return Err(Error::Upstream(message));
    }

    if response.body.is_empty() {
        return Err(Error::MalformedResponse(format!("{url} returned an empty body")));
    }

    Ok(response.body)
}

fn render(v: &Value) -> String {
    match v.as_str() {
        Some(s) => s.to_string(),
        None => v.to_string(),
    }
}

/// Delegates verification of a token to the remote verification server
#[derive(Clone)]
pub struct RemoteCheckClient {
    transport: Arc<dyn ApiTransport>,
}

impl RemoteCheckClient {
    pub fn new(transport: Arc<dyn ApiTransport>) -> Self {
        Self { transport }
    }

    /// Have the server verify `token` and map its verdict onto a statement.
    /// `verify_mode` and `nonce_mode` tell the server how the token was
    /// obtained and whether it issued the nonce.
    pub async fn check(
        &self,
        token: &str,
        scheme: Scheme,
        verify_mode: VerifyMode,
        nonce_mode: NonceMode,
        server_url: &str,
    ) -> Result<Statement, Error> {
        let body = get_api(
            self.transport.as_ref(),
            server_url,
            scheme,
            "check",
            &[
                ("token", token),
                ("mode", verify_mode.as_str()),
                ("nonce", nonce_mode.as_str()),
            ],
        )
        .await?;

        let verdict: Value = serde_json::from_str(&body)
            .map_err(|e| Error::MalformedResponse(format!("verdict is not JSON: {e}")))?;

        if let Some(e) = verdict.get("error") {
            return Err(Error::Upstream(render(e)));
        }

        if scheme == Scheme::PlayIntegrity && verdict.get("deviceIntegrity").is_none() {
            return Err(Error::MalformedResponse(
                "verdict has no deviceIntegrity".to_string(),
            ));
        }

        let statement = Statement::parse(scheme, &verdict)
            .map_err(|e| Error::MalformedResponse(e.to_string()))?;

        debug!(%scheme, "remote verdict decoded");

        Ok(statement)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::mock::MockTransport;

    const SERVER: &str = "https://verifier.example";
    const CHECK_SN: &str = "https://verifier.example/api/safetynet/check";
    const CHECK_PI: &str = "https://verifier.example/api/playintegrity/check";
    const TEST_JSON_SAFETYNET: &str = include_str!("../../testdata/safetynet-statement.json");

    fn client(t: MockTransport) -> (RemoteCheckClient, Arc<MockTransport>) {
        let t = Arc::new(t);
        (RemoteCheckClient::new(t.clone()), t)
    }

    #[tokio::test]
    async fn check_ok() {
        let (c, t) = client(MockTransport::new().with_response(CHECK_SN, 200, TEST_JSON_SAFETYNET));

        let s = c
            .check(
                "tok",
                Scheme::SafetyNet,
                VerifyMode::RemoteServer,
                NonceMode::Remote,
                &format!("{SERVER}/"),
            )
            .await
            .expect("remote check");

        assert_eq!(s.nonce(), Some("abc"));

        let calls = t.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, CHECK_SN);
        assert_eq!(
            calls[0].1,
            vec![
                ("token".to_string(), "tok".to_string()),
                ("mode".to_string(), "server".to_string()),
                ("nonce".to_string(), "server".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn server_error_field() {
        let (c, _) = client(MockTransport::new().with_response(
            CHECK_PI,
            200,
            r#"{"error": "nonce not found"}"#,
        ));

        let r = c
            .check(
                "tok",
                Scheme::PlayIntegrity,
                VerifyMode::RemoteProvider,
                NonceMode::Local,
                SERVER,
            )
            .await;

        assert_eq!(r, Err(Error::Upstream("nonce not found".to_string())));
    }

    #[tokio::test]
    async fn non_success_status_carries_message() {
        let (c, _) = client(MockTransport::new().with_response(
            CHECK_SN,
            500,
            r#"{"Error": "decoding failed"}"#,
        ));

        let r = c
            .check(
                "tok",
                Scheme::SafetyNet,
                VerifyMode::RemoteServer,
                NonceMode::Local,
                SERVER,
            )
            .await;

        assert_eq!(r, Err(Error::Upstream("decoding failed".to_string())));
    }

    #[tokio::test]
    async fn play_integrity_without_device_integrity() {
        let (c, _) = client(MockTransport::new().with_response(
            CHECK_PI,
            200,
            r#"{"requestDetails": {"nonce": "n"}}"#,
        ));

        let r = c
            .check(
                "tok",
                Scheme::PlayIntegrity,
                VerifyMode::RemoteServer,
                NonceMode::Local,
                SERVER,
            )
            .await;

        assert!(matches!(r, Err(Error::MalformedResponse(_))));
    }

    #[tokio::test]
    async fn safetynet_missing_field() {
        let (c, _) = client(MockTransport::new().with_response(
            CHECK_SN,
            200,
            r#"{"nonce": "abc"}"#,
        ));

        let r = c
            .check(
                "tok",
                Scheme::SafetyNet,
                VerifyMode::RemoteServer,
                NonceMode::Local,
                SERVER,
            )
            .await;

        assert!(matches!(r, Err(Error::MalformedResponse(_))));
    }

    #[tokio::test]
    async fn missing_server_url() {
        let (c, t) = client(MockTransport::new());

        let r = c
            .check(
                "tok",
                Scheme::SafetyNet,
                VerifyMode::RemoteServer,
                NonceMode::Local,
                "  ",
            )
            .await;

        assert!(matches!(r, Err(Error::Configuration(_))));
        assert!(t.calls().is_empty());
    }

    #[tokio::test]
    async fn transport_failure() {
        let (c, _) = client(MockTransport::new().with_failure(CHECK_SN, "timed out"));

        let r = c
            .check(
                "tok",
                Scheme::SafetyNet,
                VerifyMode::RemoteServer,
                NonceMode::Local,
                SERVER,
            )
            .await;

        assert_eq!(r, Err(Error::Transport("timed out".to_string())));
    }
}
