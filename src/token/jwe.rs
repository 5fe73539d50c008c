// Copyright 2023-2025 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

//! Compact JWE decryption (RFC 7516) restricted to the algorithms attestation
//! services actually emit: AES key wrap (or direct) key management combined
//! with AES-GCM content encryption.

use super::base64;
use super::errors::Error;
use openssl::aes::{unwrap_key, AesKey};
use openssl::symm::{decrypt_aead, Cipher};
use serde::Deserialize;

const JWE_SEGMENTS: usize = 5;
const GCM_IV_LEN: usize = 12;
const GCM_TAG_LEN: usize = 16;
const KEY_WRAP_OVERHEAD: usize = 8;

#[derive(Debug, Deserialize)]
struct ProtectedHeader {
    alg: String,
    enc: String,
    zip: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KeyManagement {
    Direct,
    AesKeyWrap(usize),
}

impl KeyManagement {
    fn from_alg(alg: &str) -> Result<Self, Error> {
        match alg {
            "dir" => Ok(KeyManagement::Direct),
            "A128KW" => Ok(KeyManagement::AesKeyWrap(16)),
            "A192KW" => Ok(KeyManagement::AesKeyWrap(24)),
            "A256KW" => Ok(KeyManagement::AesKeyWrap(32)),
            x => Err(Error::UnsupportedAlgorithm(format!("JWE alg {x}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ContentEncryption {
    A128Gcm,
    A192Gcm,
    A256Gcm,
}

impl ContentEncryption {
    fn from_enc(enc: &str) -> Result<Self, Error> {
        match enc {
            "A128GCM" => Ok(ContentEncryption::A128Gcm),
            "A192GCM" => Ok(ContentEncryption::A192Gcm),
            "A256GCM" => Ok(ContentEncryption::A256Gcm),
            x => Err(Error::UnsupportedAlgorithm(format!("JWE enc {x}"))),
        }
    }

    fn cipher(&self) -> Cipher {
        match self {
            ContentEncryption::A128Gcm => Cipher::aes_128_gcm(),
            ContentEncryption::A192Gcm => Cipher::aes_192_gcm(),
            ContentEncryption::A256Gcm => Cipher::aes_256_gcm(),
        }
    }

    fn key_len(&self) -> usize {
        match self {
            ContentEncryption::A128Gcm => 16,
            ContentEncryption::A192Gcm => 24,
            ContentEncryption::A256Gcm => 32,
        }
    }
}

/// A structurally valid, still encrypted, compact JWE
#[derive(Debug)]
pub struct Jwe<'a> {
    /// The base64url protected header exactly as received; it is the AAD
    protected: &'a str,
    key_management: KeyManagement,
    content_encryption: ContentEncryption,
    encrypted_key: Vec<u8>,
    iv: Vec<u8>,
    ciphertext: Vec<u8>,
    tag: Vec<u8>,
}

impl<'a> Jwe<'a> {
    /// Split and decode a compact JWE.  Only the protected header is
    /// interpreted, everything else stays opaque until [`Jwe::decrypt`].
    pub fn parse(compact: &'a str) -> Result<Jwe<'a>, Error> {
        let segments: Vec<&str> = compact.trim().split('.').collect();

        if segments.len() != JWE_SEGMENTS {
            return Err(Error::Syntax(format!(
                "expecting {JWE_SEGMENTS} JWE segments, got {}",
                segments.len()
            )));
        }

        let raw_header = base64::decode_str(segments[0])?;
        let header: ProtectedHeader = serde_json::from_slice(&raw_header)
            .map_err(|e| Error::Syntax(format!("JWE protected header: {e}")))?;

        if let Some(zip) = header.zip {
            return Err(Error::UnsupportedAlgorithm(format!("JWE zip {zip}")));
        }

        let jwe = Jwe {
            protected: segments[0],
            key_management: KeyManagement::from_alg(&header.alg)?,
            content_encryption: ContentEncryption::from_enc(&header.enc)?,
            encrypted_key: base64::decode_str(segments[1])?,
            iv: base64::decode_str(segments[2])?,
            ciphertext: base64::decode_str(segments[3])?,
            tag: base64::decode_str(segments[4])?,
        };

        if jwe.iv.len() != GCM_IV_LEN {
            return Err(Error::Syntax(format!(
                "expecting a {GCM_IV_LEN} bytes IV, got {}",
                jwe.iv.len()
            )));
        }

        if jwe.tag.len() != GCM_TAG_LEN {
            return Err(Error::Syntax(format!(
                "expecting a {GCM_TAG_LEN} bytes authentication tag, got {}",
                jwe.tag.len()
            )));
        }

        Ok(jwe)
    }

    /// Recover the plaintext using the given symmetric key.  The key is
    /// either the key-wrapping key or, for `dir`, the content key itself.
    pub fn decrypt(&self, key: &[u8]) -> Result<Vec<u8>, Error> {
        let cek = match self.key_management {
            KeyManagement::Direct => {
                if !self.encrypted_key.is_empty() {
                    return Err(Error::Syntax(
                        "encrypted key MUST be empty with direct encryption".to_string(),
                    ));
                }
                key.to_vec()
            }
            KeyManagement::AesKeyWrap(kek_len) => {
                unwrap_content_key(key, kek_len, &self.encrypted_key)?
            }
        };

        if cek.len() != self.content_encryption.key_len() {
            return Err(Error::Decrypt(format!(
                "content encryption key is {} bytes, {:?} expects {}",
                cek.len(),
                self.content_encryption,
                self.content_encryption.key_len()
            )));
        }

        decrypt_aead(
            self.content_encryption.cipher(),
            &cek,
            Some(&self.iv),
            self.protected.as_bytes(),
            &self.ciphertext,
            &self.tag,
        )
        .map_err(|e| Error::Decrypt(format!("AES-GCM: {e}")))
    }
}

fn unwrap_content_key(kek: &[u8], kek_len: usize, wrapped: &[u8]) -> Result<Vec<u8>, Error> {
    if kek.len() != kek_len {
        return Err(Error::Key(format!(
            "key-wrapping key is {} bytes, algorithm expects {kek_len}",
            kek.len()
        )));
    }

    // RFC 3394 output is a whole number of 64-bit blocks, at least two
    if wrapped.len() < 3 * KEY_WRAP_OVERHEAD || wrapped.len() % KEY_WRAP_OVERHEAD != 0 {
        return Err(Error::Syntax(format!(
            "malformed wrapped key ({} bytes)",
            wrapped.len()
        )));
    }

    let aes = AesKey::new_decrypt(kek)
        .map_err(|_| Error::Key("invalid AES key-wrapping key".to_string()))?;

    let mut cek = vec![0u8; wrapped.len() - KEY_WRAP_OVERHEAD];

    unwrap_key(&aes, None, &mut cek, wrapped)
        .map_err(|_| Error::Decrypt("AES key unwrap failed".to_string()))?;

    Ok(cek)
}

/// Decrypt a compact JWE in one go
pub fn decrypt(compact: &str, key: &[u8]) -> Result<Vec<u8>, Error> {
    Jwe::parse(compact)?.decrypt(key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil;
    use hex_literal::hex;

    const TEST_KEK: [u8; 32] =
        hex!("000102030405060708090A0B0C0D0E0F101112131415161718191A1B1C1D1E1F");
    const TEST_OTHER_KEK: [u8; 32] =
        hex!("1F1E1D1C1B1A191817161514131211100F0E0D0C0B0A09080706050403020100");

    #[test]
    fn decrypt_ok() {
        let jwe = testutil::encrypt_a256kw(b"inner.jws.value", &TEST_KEK);

        let pt = decrypt(&jwe, &TEST_KEK).expect("decrypting JWE");

        assert_eq!(pt, b"inner.jws.value");
    }

    #[test]
    fn decrypt_with_wrong_key_fails() {
        let jwe = testutil::encrypt_a256kw(b"inner.jws.value", &TEST_KEK);

        let r = decrypt(&jwe, &TEST_OTHER_KEK);

        assert!(matches!(r, Err(Error::Decrypt(_))));
    }

    #[test]
    fn decrypt_with_short_key_fails() {
        let jwe = testutil::encrypt_a256kw(b"inner.jws.value", &TEST_KEK);

        let r = decrypt(&jwe, &TEST_KEK[..16]);

        assert!(matches!(r, Err(Error::Key(_))));
    }

    #[test]
    fn decrypt_direct() {
        let jwe = testutil::encrypt_dir(b"inner.jws.value", &TEST_KEK);

        let pt = decrypt(&jwe, &TEST_KEK).expect("decrypting JWE");

        assert_eq!(pt, b"inner.jws.value");
    }

    #[test]
    fn direct_key_must_match_content_encryption() {
        let jwe = testutil::encrypt_dir(b"inner.jws.value", &TEST_KEK);

        let r = decrypt(&jwe, &TEST_KEK[..16]);

        assert!(matches!(r, Err(Error::Decrypt(_))));
    }

    #[test]
    fn decrypt_a128kw() {
        let jwe = testutil::encrypt_a128kw(b"inner.jws.value", &TEST_KEK[..16]);

        let pt = decrypt(&jwe, &TEST_KEK[..16]).expect("decrypting JWE");

        assert_eq!(pt, b"inner.jws.value");
    }

    #[test]
    fn a128kw_rejects_256_bit_kek() {
        let jwe = testutil::encrypt_a128kw(b"inner.jws.value", &TEST_KEK[..16]);

        let r = decrypt(&jwe, &TEST_KEK);

        assert!(matches!(r, Err(Error::Key(_))));
    }

    #[test]
    fn tampered_ciphertext_fails() {
        let jwe = testutil::encrypt_a256kw(b"inner.jws.value", &TEST_KEK);
        let tampered = testutil::tamper_segment(&jwe, 3);

        let r = decrypt(&tampered, &TEST_KEK);

        assert!(matches!(r, Err(Error::Decrypt(_))));
    }

    #[test]
    fn reject_bad_structure() {
        for bad in ["", "a.b.c", "a.b.c.d.e.f", "not a jwe at all", "....."] {
            assert!(Jwe::parse(bad).is_err(), "{bad:?} must not parse");
        }
    }

    #[test]
    fn reject_unsupported_algorithms() {
        let header = base64::encode_url(br#"{"alg":"RSA-OAEP","enc":"A256GCM"}"#);
        let header = header.trim_end_matches('=');
        let compact = format!("{header}.AAAA.AAAAAAAAAAAAAAAA.AAAA.AAAAAAAAAAAAAAAAAAAAAA");

        let r = Jwe::parse(&compact);

        assert!(matches!(r, Err(Error::UnsupportedAlgorithm(_))));
    }

    #[test]
    fn reject_compressed_payload() {
        let header = base64::encode_url(br#"{"alg":"A256KW","enc":"A256GCM","zip":"DEF"}"#);
        let header = header.trim_end_matches('=');
        let compact = format!("{header}.AAAA.AAAAAAAAAAAAAAAA.AAAA.AAAAAAAAAAAAAAAAAAAAAA");

        let r = Jwe::parse(&compact);

        assert!(matches!(r, Err(Error::UnsupportedAlgorithm(_))));
    }
}
