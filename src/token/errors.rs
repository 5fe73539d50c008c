// Copyright 2023 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

#[derive(thiserror::Error, PartialEq, Eq, Clone)]
pub enum Error {
    #[error("Syntax error: {0}")]
    Syntax(String),
    #[error("Decryption failed: {0}")]
    Decrypt(String),
    #[error("Signature verification failed: {0}")]
    Signature(String),
    #[error("Certificate error: {0}")]
    Certificate(String),
    #[error("Key error: {0}")]
    Key(String),
    #[error("Unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),
    #[error("Missing claim: {0}")]
    MissingClaim(String),
    #[error("Claim type mismatch: {0}")]
    TypeMismatch(String),
}

impl Error {
    /// True for errors raised while mapping an already verified payload into
    /// a statement, as opposed to envelope-level failures.
    pub fn is_claims_error(&self) -> bool {
        matches!(self, Error::MissingClaim(_) | Error::TypeMismatch(_))
    }
}

impl std::fmt::Debug for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Syntax(e)
            | Error::Decrypt(e)
            | Error::Signature(e)
            | Error::Certificate(e)
            | Error::Key(e)
            | Error::UnsupportedAlgorithm(e)
            | Error::MissingClaim(e)
            | Error::TypeMismatch(e) => {
                write!(f, "{}", e)
            }
        }
    }
}
