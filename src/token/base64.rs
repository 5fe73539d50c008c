// SPDX-License-Identifier: Apache-2.0

use base64::{self, engine::general_purpose, Engine as _};

use super::errors::Error;

/// decodes bytes from a base64url-encoded (unpadded) string
pub fn decode_str(v: &str) -> Result<Vec<u8>, Error> {
    general_purpose::URL_SAFE_NO_PAD
        .decode(v)
        .map_err(|e| Error::Syntax(e.to_string()))
}

/// decodes bytes from a standard, padded base64 string (keys, x5c entries)
pub fn decode_std(v: &str) -> Result<Vec<u8>, Error> {
    general_purpose::STANDARD
        .decode(v.trim())
        .map_err(|e| Error::Syntax(e.to_string()))
}

/// encodes bytes using the padded base64url alphabet
pub fn encode_url(v: &[u8]) -> String {
    general_purpose::URL_SAFE.encode(v)
}

/// encodes bytes using the standard, padded alphabet
pub fn encode_std(v: &[u8]) -> String {
    general_purpose::STANDARD.encode(v)
}

/// tries every common base64 flavour, used for values whose producer does not
/// pin an alphabet (e.g. echoed nonces)
pub fn decode_any(v: &str) -> Option<Vec<u8>> {
    [
        &general_purpose::STANDARD,
        &general_purpose::URL_SAFE,
        &general_purpose::STANDARD_NO_PAD,
        &general_purpose::URL_SAFE_NO_PAD,
    ]
    .iter()
    .find_map(|engine| engine.decode(v).ok())
}
