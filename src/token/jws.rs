// Copyright 2023-2025 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

//! Compact JWS signature verification, either against a pinned public key or
//! against the leaf of the `x5c` chain carried in the protected header.

use super::base64;
use super::errors::Error;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use openssl::error::ErrorStack;
use openssl::hash::MessageDigest;
use openssl::nid::Nid;
use openssl::pkey::{Id, PKey, PKeyRef, Public};
use openssl::stack::Stack;
use openssl::x509::store::X509StoreBuilder;
use openssl::x509::{X509Ref, X509StoreContext, X509VerifyResult, X509};
use serde_json::Value;
use tracing::debug;

const EC_ALGS: &[Algorithm] = &[Algorithm::ES256, Algorithm::ES384];
const RSA_ALGS: &[Algorithm] = &[
    Algorithm::RS256,
    Algorithm::RS384,
    Algorithm::RS512,
    Algorithm::PS256,
    Algorithm::PS384,
    Algorithm::PS512,
];

/// Verify a compact JWS using a pinned public key given as DER-encoded
/// SubjectPublicKeyInfo, and return its JSON payload.
pub fn verify_with_spki(compact: &str, spki_der: &[u8]) -> Result<Value, Error> {
    let pkey = PKey::public_key_from_der(spki_der)
        .map_err(|e| Error::Key(format!("decoding verification key: {e}")))?;

    verify_with_key(compact, &pkey)
}

/// Verify a compact JWS with the supplied public key.  The accepted `alg`
/// values are derived from the key type, so a header can never steer the
/// verifier towards a different algorithm family.
pub fn verify_with_key(compact: &str, pkey: &PKeyRef<Public>) -> Result<Value, Error> {
    let header =
        decode_header(compact).map_err(|e| Error::Syntax(format!("JWS header: {e}")))?;

    let (algs, key) = decoding_key(pkey)?;

    if !algs.contains(&header.alg) {
        return Err(Error::UnsupportedAlgorithm(format!(
            "JWS alg {:?} with {:?} key",
            header.alg,
            pkey.id()
        )));
    }

    let mut validation = Validation::new(header.alg);
    validation.required_spec_claims.clear();
    validation.validate_exp = false;
    validation.validate_aud = false;

    let data = decode::<Value>(compact, &key, &validation).map_err(map_jwt_error)?;

    Ok(data.claims)
}

/// Verify a compact JWS using the certificate chain embedded in its `x5c`
/// header.  Besides the signature, the chain must lead to one of `roots` and
/// the leaf must be issued to `hostname`.  On success the payload and the
/// leaf certificate are returned.
pub fn verify_embedded(
    compact: &str,
    roots: &[X509],
    hostname: &str,
) -> Result<(Value, X509), Error> {
    let header =
        decode_header(compact).map_err(|e| Error::Syntax(format!("JWS header: {e}")))?;

    let x5c = header
        .x5c
        .ok_or_else(|| Error::Certificate("no x5c certificate chain in JWS header".to_string()))?;

    let certs = x5c
        .iter()
        .map(|c| {
            let der = base64::decode_std(c)?;
            X509::from_der(&der).map_err(cert_error)
        })
        .collect::<Result<Vec<X509>, Error>>()?;

    let (leaf, intermediates) = certs
        .split_first()
        .ok_or_else(|| Error::Certificate("empty x5c certificate chain".to_string()))?;

    if let Ok(fp) = leaf.digest(MessageDigest::sha256()) {
        debug!(leaf = %hex::encode(&*fp), chain_len = certs.len(), "verifying embedded chain");
    }

    let pkey = leaf.public_key().map_err(cert_error)?;
    let claims = verify_with_key(compact, &pkey)?;

    verify_chain(leaf, intermediates, roots)?;
    verify_hostname(leaf, hostname)?;

    Ok((claims, leaf.clone()))
}

fn decoding_key(pkey: &PKeyRef<Public>) -> Result<(&'static [Algorithm], DecodingKey), Error> {
    let pem = pkey
        .public_key_to_pem()
        .map_err(|e| Error::Key(format!("encoding public key: {e}")))?;

    let r = match pkey.id() {
        Id::EC => (EC_ALGS, DecodingKey::from_ec_pem(&pem)),
        Id::RSA => (RSA_ALGS, DecodingKey::from_rsa_pem(&pem)),
        other => return Err(Error::Key(format!("unsupported key type {other:?}"))),
    };

    let key = r.1.map_err(|e| Error::Key(e.to_string()))?;

    Ok((r.0, key))
}

fn map_jwt_error(e: jsonwebtoken::errors::Error) -> Error {
    match e.kind() {
        ErrorKind::InvalidSignature => Error::Signature("signature does not verify".to_string()),
        ErrorKind::InvalidEcdsaKey | ErrorKind::InvalidRsaKey(_) | ErrorKind::InvalidKeyFormat => {
            Error::Key(e.to_string())
        }
        ErrorKind::InvalidAlgorithm | ErrorKind::InvalidAlgorithmName => {
            Error::UnsupportedAlgorithm(e.to_string())
        }
        _ => Error::Syntax(e.to_string()),
    }
}

fn cert_error(e: ErrorStack) -> Error {
    Error::Certificate(e.to_string())
}

fn verify_chain(leaf: &X509Ref, intermediates: &[X509], roots: &[X509]) -> Result<(), Error> {
    if roots.is_empty() {
        return Err(Error::Certificate("no trust roots configured".to_string()));
    }

    let mut chain = Stack::new().map_err(cert_error)?;
    for crt in intermediates {
        chain.push(crt.clone()).map_err(cert_error)?;
    }

    let mut store = X509StoreBuilder::new().map_err(cert_error)?;
    for root in roots {
        store.add_cert(root.clone()).map_err(cert_error)?;
    }
    let store = store.build();

    let mut ctx = X509StoreContext::new().map_err(cert_error)?;

    let res = ctx
        .init(&store, leaf, &chain, |c| {
            c.verify_cert()?;
            Ok(c.error())
        })
        .map_err(cert_error)?;

    if res != X509VerifyResult::OK {
        return Err(Error::Certificate(format!(
            "certificate chain not trusted: {res}"
        )));
    }

    Ok(())
}

fn verify_hostname(leaf: &X509Ref, hostname: &str) -> Result<(), Error> {
    let san_match = leaf
        .subject_alt_names()
        .map(|names| {
            names
                .iter()
                .filter_map(|n| n.dnsname())
                .any(|n| n.eq_ignore_ascii_case(hostname))
        })
        .unwrap_or(false);

    if san_match {
        return Ok(());
    }

    let cn = match leaf.subject_name().entries_by_nid(Nid::COMMONNAME).next() {
        Some(entry) => Some(entry.data().as_utf8().map_err(cert_error)?.to_string()),
        None => None,
    };

    match cn {
        Some(cn) if cn.eq_ignore_ascii_case(hostname) => Ok(()),
        _ => Err(Error::Certificate(format!(
            "certificate is not issued for {hostname}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{self, CertFixture, SigningKey};
    use serde_json::json;

    const HOSTNAME: &str = "attest.android.com";

    #[test]
    fn verify_pinned_ok() {
        let key = SigningKey::ec();
        let jws = key.sign(&json!({"hello": "world"}), None);

        let claims = verify_with_spki(&jws, &key.spki_der()).expect("verifying JWS");

        assert_eq!(claims, json!({"hello": "world"}));
    }

    #[test]
    fn verify_pinned_wrong_key() {
        let jws = SigningKey::ec().sign(&json!({"hello": "world"}), None);
        let other = SigningKey::ec();

        let r = verify_with_spki(&jws, &other.spki_der());

        assert!(matches!(r, Err(Error::Signature(_))));
    }

    #[test]
    fn verify_pinned_tampered_signature() {
        let key = SigningKey::ec();
        let jws = key.sign(&json!({"hello": "world"}), None);
        let tampered = testutil::tamper_segment(&jws, 2);

        let r = verify_with_spki(&tampered, &key.spki_der());

        assert!(matches!(r, Err(Error::Signature(_))));
    }

    #[test]
    fn reject_algorithm_not_matching_key() {
        let rsa = SigningKey::rsa();
        let jws = rsa.sign(&json!({"a": 1}), None);
        let ec = SigningKey::ec();

        let r = verify_with_spki(&jws, &ec.spki_der());

        assert!(matches!(r, Err(Error::UnsupportedAlgorithm(_))));
    }

    #[test]
    fn reject_bad_structure() {
        let key = SigningKey::ec();
        for bad in ["", "abc", "a.b", "a.b.c.d", "e30.e30"] {
            assert!(verify_with_spki(bad, &key.spki_der()).is_err(), "{bad:?}");
        }
    }

    #[test]
    fn verify_embedded_ok() {
        let f = CertFixture::new(HOSTNAME);
        let jws = f.sign(&json!({"nonce": "abc"}));

        let (claims, leaf) =
            verify_embedded(&jws, &[f.root.clone()], HOSTNAME).expect("verifying x5c JWS");

        assert_eq!(claims["nonce"], "abc");
        assert_eq!(leaf.to_der().unwrap(), f.leaf.to_der().unwrap());
    }

    #[test]
    fn verify_embedded_rsa_leaf_ok() {
        let f = CertFixture::new_rsa(HOSTNAME);
        let jws = f.sign(&json!({"nonce": "abc"}));

        let r = verify_embedded(&jws, &[f.root.clone()], HOSTNAME);

        assert!(r.is_ok());
    }

    #[test]
    fn verify_embedded_tampered_signature() {
        let f = CertFixture::new(HOSTNAME);
        let jws = f.sign(&json!({"nonce": "abc"}));
        let tampered = testutil::tamper_segment(&jws, 2);

        let r = verify_embedded(&tampered, &[f.root.clone()], HOSTNAME);

        assert!(matches!(r, Err(Error::Signature(_))));
    }

    #[test]
    fn verify_embedded_untrusted_root() {
        let f = CertFixture::new(HOSTNAME);
        let unrelated = CertFixture::new(HOSTNAME);
        let jws = f.sign(&json!({"nonce": "abc"}));

        let r = verify_embedded(&jws, &[unrelated.root.clone()], HOSTNAME);

        assert!(matches!(r, Err(Error::Certificate(_))));
    }

    #[test]
    fn verify_embedded_no_roots() {
        let f = CertFixture::new(HOSTNAME);
        let jws = f.sign(&json!({"nonce": "abc"}));

        let r = verify_embedded(&jws, &[], HOSTNAME);

        assert!(matches!(r, Err(Error::Certificate(_))));
    }

    #[test]
    fn verify_embedded_wrong_hostname() {
        let f = CertFixture::new("attest.example.org");
        let jws = f.sign(&json!({"nonce": "abc"}));

        let r = verify_embedded(&jws, &[f.root.clone()], HOSTNAME);

        assert!(matches!(r, Err(Error::Certificate(_))));
    }

    #[test]
    fn verify_embedded_missing_x5c() {
        let key = SigningKey::ec();
        let jws = key.sign(&json!({"nonce": "abc"}), None);
        let f = CertFixture::new(HOSTNAME);

        let r = verify_embedded(&jws, &[f.root.clone()], HOSTNAME);

        assert!(matches!(r, Err(Error::Certificate(_))));
    }
}
