// Copyright 2023 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

//! The attestation request lifecycle: from a validated request, through
//! nonce and token acquisition, to a verified statement published as the
//! terminal [`AttestationState`].

pub use self::mode::{NonceMode, VerifyMode};
pub use self::orchestrator::Orchestrator;
pub use self::provider::{CommandTokenProvider, ProviderError, TokenProvider};
pub use self::request::AttestationRequest;
pub use self::state::{AttestationState, StateHolder};

mod mode;
mod orchestrator;
mod provider;
mod request;
mod state;
