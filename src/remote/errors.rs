// Copyright 2023 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

#[derive(thiserror::Error, PartialEq, Eq, Clone)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Configuration(String),
    #[error("Transport error: {0}")]
    Transport(String),
    /// Message reported by the verification server, verbatim
    #[error("{0}")]
    Upstream(String),
    #[error("Malformed response: {0}")]
    MalformedResponse(String),
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Transport(e.to_string())
    }
}

impl std::fmt::Debug for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Configuration(e)
            | Error::Transport(e)
            | Error::Upstream(e)
            | Error::MalformedResponse(e) => {
                write!(f, "{}", e)
            }
        }
    }
}
