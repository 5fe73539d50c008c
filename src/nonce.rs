// Copyright 2023 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

//! Anti-replay nonces, generated locally or issued by the verification
//! server.

use crate::attest::NonceMode;
use crate::remote::{self, ApiTransport};
use crate::token::base64;
use crate::token::Scheme;
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

pub const DEFAULT_NONCE_LENGTH: usize = 50;

/// A nonce in the form it is handed to the attestation provider
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Nonce(String);

impl Nonce {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl From<String> for Nonce {
    fn from(s: String) -> Self {
        Nonce(s)
    }
}

impl From<&str> for Nonce {
    fn from(s: &str) -> Self {
        Nonce(s.to_string())
    }
}

impl fmt::Display for Nonce {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub struct NonceGenerator {
    transport: Arc<dyn ApiTransport>,
    length: usize,
}

impl NonceGenerator {
    pub fn new(transport: Arc<dyn ApiTransport>) -> Self {
        Self {
            transport,
            length: DEFAULT_NONCE_LENGTH,
        }
    }

    /// Number of random characters in locally generated Play Integrity nonces
    pub fn with_length(mut self, length: usize) -> Self {
        self.length = length;
        self
    }

    /// Produce a fresh nonce for `scheme`.  Remote nonces require
    /// `server_url`; the server's response body is the nonce, verbatim.
    pub async fn generate(
        &self,
        scheme: Scheme,
        mode: NonceMode,
        server_url: Option<&str>,
    ) -> Result<Nonce, remote::Error> {
        match mode {
            NonceMode::Local => Ok(self.local(scheme)),
            NonceMode::Remote => {
                let url = server_url.unwrap_or_default();
                let body =
                    remote::get_api(self.transport.as_ref(), url, scheme, "nonce", &[]).await?;

                debug!(%scheme, len = body.len(), "nonce issued by server");

                Ok(Nonce(body))
            }
        }
    }

    /// Generate a nonce without any I/O
    pub fn local(&self, scheme: Scheme) -> Nonce {
        match scheme {
            Scheme::PlayIntegrity => {
                let raw: String = rand::thread_rng()
                    .sample_iter(&Alphanumeric)
                    .take(self.length)
                    .map(char::from)
                    .collect();

                Nonce(base64::encode_url(raw.as_bytes()))
            }
            Scheme::SafetyNet => Nonce(uuid::Uuid::new_v4().to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::mock::MockTransport;
    use std::collections::HashSet;

    const NONCE_PI: &str = "https://verifier.example/api/playintegrity/nonce";
    const NONCE_SN: &str = "https://verifier.example/api/safetynet/nonce";

    fn generator(t: MockTransport) -> NonceGenerator {
        NonceGenerator::new(Arc::new(t))
    }

    #[test]
    fn local_nonces_are_unique() {
        let g = generator(MockTransport::new());

        for scheme in [Scheme::PlayIntegrity, Scheme::SafetyNet] {
            let nonces: HashSet<Nonce> = (0..1000).map(|_| g.local(scheme)).collect();

            assert_eq!(nonces.len(), 1000);
        }
    }

    #[test]
    fn local_play_integrity_shape() {
        let g = generator(MockTransport::new());

        let n = g.local(Scheme::PlayIntegrity);

        let raw = base64::decode_any(n.as_str()).expect("URL-safe base64");
        assert_eq!(raw.len(), DEFAULT_NONCE_LENGTH);
        assert!(raw.iter().all(u8::is_ascii_alphanumeric));
        assert!(!n.as_str().contains(['+', '/']));

        let short = generator(MockTransport::new())
            .with_length(16)
            .local(Scheme::PlayIntegrity);
        assert_eq!(base64::decode_any(short.as_str()).unwrap().len(), 16);
    }

    #[test]
    fn local_safetynet_is_uuid() {
        let g = generator(MockTransport::new());

        let n = g.local(Scheme::SafetyNet);

        assert!(uuid::Uuid::parse_str(n.as_str()).is_ok());
    }

    #[tokio::test]
    async fn remote_nonce_verbatim() {
        let g = generator(MockTransport::new().with_response(NONCE_SN, 200, "c2VydmVyLW5vbmNl"));

        let n = g
            .generate(
                Scheme::SafetyNet,
                NonceMode::Remote,
                Some("https://verifier.example"),
            )
            .await
            .unwrap();

        assert_eq!(n.as_str(), "c2VydmVyLW5vbmNl");
    }

    #[tokio::test]
    async fn remote_nonce_needs_url() {
        let g = generator(MockTransport::new());

        for url in [None, Some("")] {
            let r = g.generate(Scheme::PlayIntegrity, NonceMode::Remote, url).await;

            assert!(matches!(r, Err(remote::Error::Configuration(_))));
        }
    }

    #[tokio::test]
    async fn remote_nonce_server_errors() {
        let g = generator(
            MockTransport::new()
                .with_response(NONCE_PI, 503, "")
                .with_response(NONCE_SN, 200, r#"{"Error": "rate limited"}"#),
        );
        let url = Some("https://verifier.example");

        let r = g.generate(Scheme::PlayIntegrity, NonceMode::Remote, url).await;
        assert_eq!(
            r,
            Err(remote::Error::Upstream(
                "server responded with HTTP 503".to_string()
            ))
        );

        let r = g.generate(Scheme::SafetyNet, NonceMode::Remote, url).await;
        assert_eq!(r, Err(remote::Error::Upstream("rate limited".to_string())));
    }

    #[tokio::test]
    async fn local_mode_does_no_io() {
        let t = Arc::new(MockTransport::new());
        let g = NonceGenerator::new(t.clone());

        g.generate(Scheme::SafetyNet, NonceMode::Local, Some("https://verifier.example"))
            .await
            .unwrap();

        assert!(t.calls().is_empty());
    }
}
