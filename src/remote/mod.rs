// Copyright 2023 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

//! Client side of the remote verification server: nonce issuance and token
//! checks under `{server}/api/{scheme}/`.

pub use self::client::RemoteCheckClient;
pub(crate) use self::client::get_api;
pub use self::errors::Error;
#[cfg(any(test, feature = "test-utils"))]
pub use self::transport::mock;
pub use self::transport::{ApiResponse, ApiTransport, ReqwestTransport};

mod client;
mod errors;
mod transport;
