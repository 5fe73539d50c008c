// Copyright 2023 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

//! Stores for the material verification depends on: pinned keys and trust
//! roots, the reference values statements are appraised against, and the
//! request history the rate limiter consults.

pub use self::errors::Error;
pub use self::file_requesthistorystore::FileRequestHistoryStore;
pub use self::irequesthistorystore::IRequestHistoryStore;
pub use self::itrustanchorstore::ITrustAnchorStore;
pub use self::memo_requesthistorystore::MemoRequestHistoryStore;
pub use self::memo_trustanchorstore::MemoTrustAnchorStore;
pub use self::refvalues::*;
pub use self::trustanchor::{PinnedKeys, TrustAnchors};

mod errors;
mod file_requesthistorystore;
mod irequesthistorystore;
mod itrustanchorstore;
mod memo_requesthistorystore;
mod memo_trustanchorstore;
mod refvalues;
mod trustanchor;
