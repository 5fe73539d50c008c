// Copyright 2023-2025 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

use super::mode::VerifyMode;
use super::provider::TokenProvider;
use super::request::AttestationRequest;
use super::state::{AttestationState, StateHolder};
use crate::errors::Error;
use crate::nonce::{Nonce, NonceGenerator};
use crate::policy::{PolicyVerifier, PolicyWarning, RateLimiter};
use crate::remote::{ApiTransport, RemoteCheckClient};
use crate::store::RefValues;
use crate::token::{EnvelopeCodec, Scheme, Statement};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Drives attestation requests for one scheme: nonce, token, verification,
/// and publication of the outcome.
pub struct Orchestrator {
    scheme: Scheme,
    provider: Arc<dyn TokenProvider>,
    nonces: NonceGenerator,
    remote: RemoteCheckClient,
    limiter: RateLimiter,
    codec: Option<EnvelopeCodec>,
    policy: Option<PolicyVerifier>,
    state: StateHolder<Statement>,
}

impl Orchestrator {
    /// Locally verified statements are appraised against the default
    /// reference values until [`Orchestrator::with_policy`] replaces them.
    pub fn new(
        scheme: Scheme,
        provider: Arc<dyn TokenProvider>,
        transport: Arc<dyn ApiTransport>,
        limiter: RateLimiter,
    ) -> Self {
        Self {
            scheme,
            provider,
            nonces: NonceGenerator::new(transport.clone()),
            remote: RemoteCheckClient::new(transport),
            limiter,
            codec: None,
            policy: Some(PolicyVerifier::new(RefValues::default())),
            state: StateHolder::new(),
        }
    }

    /// Key material for local verification; without it only the remote
    /// verification modes can succeed
    pub fn with_codec(mut self, codec: EnvelopeCodec) -> Self {
        self.codec = Some(codec);
        self
    }

    /// Semantic checks applied to locally verified statements
    pub fn with_policy(mut self, policy: PolicyVerifier) -> Self {
        self.policy = Some(policy);
        self
    }

    /// Accept any authentic statement without appraising it.  Successes then
    /// carry [`PolicyWarning::PolicyNotApplied`].
    pub fn without_policy(mut self) -> Self {
        self.policy = None;
        self
    }

    pub fn with_nonce_length(mut self, length: usize) -> Self {
        self.nonces = self.nonces.with_length(length);
        self
    }

    pub fn scheme(&self) -> Scheme {
        self.scheme
    }

    /// Read-only view of the request state
    pub fn subscribe(&self) -> watch::Receiver<AttestationState<Statement>> {
        self.state.subscribe()
    }

    /// Serve one request to completion and return its terminal state, which
    /// is also published to subscribers
    pub async fn run(&self, request: &AttestationRequest) -> AttestationState<Statement> {
        self.state.begin();

        let terminal: AttestationState<Statement> = match self.attest(request).await {
            Ok((statement, warnings)) => {
                info!(scheme = %self.scheme, warnings = warnings.len(), "attestation succeeded");
                AttestationState::success(statement, warnings)
            }
            Err(e) => {
                warn!(scheme = %self.scheme, kind = ?e.kind(), error = ?e, "attestation failed");
                AttestationState::from_error(&e)
            }
        };

        self.state.finish(terminal.clone());

        terminal
    }

    async fn attest(
        &self,
        request: &AttestationRequest,
    ) -> Result<(Statement, Vec<PolicyWarning>), Error> {
        request.validate(self.scheme)?;

        if request.verify_mode == VerifyMode::Local && self.codec.is_none() {
            return Err(Error::Configuration(format!(
                "no key material configured for local {} verification",
                self.scheme
            )));
        }

        self.limiter.check_now()?;

        let nonce = self
            .nonces
            .generate(self.scheme, request.nonce_mode, request.server_url())
            .await
            .map_err(Error::Nonce)?;
        debug!(scheme = %self.scheme, mode = %request.nonce_mode, "nonce ready");

        let token = self.provider.request_token(self.scheme, &nonce).await?;
        debug!(scheme = %self.scheme, len = token.len(), "token received");

        match request.verify_mode {
            VerifyMode::Local => self.verify_locally(token, nonce).await,
            VerifyMode::RemoteProvider | VerifyMode::RemoteServer => {
                let server_url = request.server_url().unwrap_or_default();
                let statement = self
                    .remote
                    .check(
                        &token,
                        self.scheme,
                        request.verify_mode,
                        request.nonce_mode,
                        server_url,
                    )
                    .await?;
                Ok((statement, vec![]))
            }
        }
    }

    async fn verify_locally(
        &self,
        token: String,
        nonce: Nonce,
    ) -> Result<(Statement, Vec<PolicyWarning>), Error> {
        let codec = self
            .codec
            .clone()
            .ok_or_else(|| Error::Configuration("no key material configured".to_string()))?;
        let policy = self.policy.clone();
        let scheme = self.scheme;

        tokio::task::spawn_blocking(move || -> Result<(Statement, Vec<PolicyWarning>), Error> {
            let payload = codec.decode(&token, scheme).map_err(Error::Decode)?;

            let statement =
                Statement::parse(scheme, &payload.claims).map_err(Error::from_token)?;

            let warnings = match policy {
                Some(p) => p.verify(&statement, &nonce)?.warnings,
                None => {
                    warn!(scheme = %scheme, "statement accepted without appraisal");
                    vec![PolicyWarning::PolicyNotApplied]
                }
            };

            Ok((statement, warnings))
        })
        .await
        .map_err(|e| Error::Internal(e.to_string()))?
    }
}
