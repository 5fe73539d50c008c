// Copyright 2023 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

use crate::nonce::Nonce;
use crate::token::Scheme;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

#[derive(thiserror::Error, Debug, PartialEq, Eq, Clone)]
pub enum ProviderError {
    /// The provider could not be reached at all
    #[error("attestation provider unavailable: {0}")]
    Unavailable(String),
    /// The provider ran and refused to produce a token
    #[error("{0}")]
    Failed(String),
}

/// The platform service that binds a nonce into an attestation token
#[async_trait::async_trait]
pub trait TokenProvider: Send + Sync {
    /// Obtain a compact-serialized token for `nonce`
    async fn request_token(&self, scheme: Scheme, nonce: &Nonce) -> Result<String, ProviderError>;
}

/// Runs an external program as the provider: it is invoked as
/// `program [args..] <scheme> <nonce>` and prints the token on stdout.
#[derive(Debug, Clone)]
pub struct CommandTokenProvider {
    program: String,
    args: Vec<String>,
}

impl CommandTokenProvider {
    pub fn new(program: &str) -> Self {
        Self {
            program: program.to_string(),
            args: vec![],
        }
    }

    pub fn with_args(mut self, args: &[&str]) -> Self {
        self.args = args.iter().map(|a| a.to_string()).collect();
        self
    }
}

#[async_trait::async_trait]
impl TokenProvider for CommandTokenProvider {
    async fn request_token(&self, scheme: Scheme, nonce: &Nonce) -> Result<String, ProviderError> {
        debug!(program = %self.program, %scheme, "requesting token");

        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(scheme.api_name())
            .arg(nonce.as_str())
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| ProviderError::Unavailable(format!("{}: {e}", self.program)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let message = if stderr.is_empty() {
                format!("{} exited with {}", self.program, output.status)
            } else {
                stderr
            };
            return Err(ProviderError::Failed(message));
        }

        let token = String::from_utf8(output.stdout)
            .map_err(|e| ProviderError::Failed(format!("token is not UTF-8: {e}")))?
            .trim()
            .to_string();

        if token.is_empty() {
            return Err(ProviderError::Failed(format!(
                "{} produced no token",
                self.program
            )));
        }

        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn command_receives_scheme_and_nonce() {
        let p = CommandTokenProvider::new("sh").with_args(&[
            "-c",
            r#"printf "tok.%s.%s\n" "$1" "$2""#,
            "provider",
        ]);

        let t = p
            .request_token(Scheme::SafetyNet, &Nonce::from("n0"))
            .await
            .unwrap();

        assert_eq!(t, "tok.safetynet.n0");
    }

    #[tokio::test]
    async fn failing_command_reports_stderr() {
        let p = CommandTokenProvider::new("sh").with_args(&[
            "-c",
            "echo 'services outdated' >&2; exit 3",
            "provider",
        ]);

        let r = p
            .request_token(Scheme::PlayIntegrity, &Nonce::from("n0"))
            .await;

        assert_eq!(r, Err(ProviderError::Failed("services outdated".to_string())));
    }

    #[tokio::test]
    async fn missing_program() {
        let p = CommandTokenProvider::new("/nonexistent/attestation-provider");

        let r = p
            .request_token(Scheme::PlayIntegrity, &Nonce::from("n0"))
            .await;

        assert!(matches!(r, Err(ProviderError::Unavailable(_))));
    }
}
