// Copyright 2023-2025 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

//! Runtime-generated keys, certificates and tokens used across the unit
//! tests.  Nothing here is compiled outside of `cfg(test)`.

use crate::store::PinnedKeys;
use ::base64::{engine::general_purpose, Engine as _};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use openssl::aes::{wrap_key, AesKey};
use openssl::asn1::Asn1Time;
use openssl::bn::BigNum;
use openssl::ec::{EcGroup, EcKey};
use openssl::hash::MessageDigest;
use openssl::nid::Nid;
use openssl::pkey::{PKey, Private};
use openssl::rsa::Rsa;
use openssl::symm::{encrypt_aead, Cipher};
use openssl::x509::extension::{BasicConstraints, KeyUsage};
use openssl::x509::{X509Builder, X509NameBuilder, X509};
use serde_json::Value;

pub struct SigningKey {
    pkey: PKey<Private>,
    alg: Algorithm,
}

impl SigningKey {
    pub fn ec() -> Self {
        let group = EcGroup::from_curve_name(Nid::X9_62_PRIME256V1).unwrap();
        let ec = EcKey::generate(&group).unwrap();

        SigningKey {
            pkey: PKey::from_ec_key(ec).unwrap(),
            alg: Algorithm::ES256,
        }
    }

    pub fn rsa() -> Self {
        let rsa = Rsa::generate(2048).unwrap();

        SigningKey {
            pkey: PKey::from_rsa(rsa).unwrap(),
            alg: Algorithm::RS256,
        }
    }

    fn encoding_key(&self) -> EncodingKey {
        match self.alg {
            Algorithm::ES256 => {
                let pem = self.pkey.private_key_to_pem_pkcs8().unwrap();
                EncodingKey::from_ec_pem(&pem).unwrap()
            }
            _ => {
                let pem = self.pkey.rsa().unwrap().private_key_to_pem().unwrap();
                EncodingKey::from_rsa_pem(&pem).unwrap()
            }
        }
    }

    /// Produce a compact JWS over `claims`, optionally carrying an `x5c`
    pub fn sign(&self, claims: &Value, x5c: Option<Vec<String>>) -> String {
        let mut header = Header::new(self.alg);
        header.x5c = x5c;

        encode(&header, claims, &self.encoding_key()).unwrap()
    }

    /// DER-encoded SubjectPublicKeyInfo
    pub fn spki_der(&self) -> Vec<u8> {
        self.pkey.public_key_to_der().unwrap()
    }
}

/// A throwaway CA and a leaf issued by it for the given host
pub struct CertFixture {
    pub root: X509,
    pub leaf: X509,
    leaf_key: SigningKey,
}

impl CertFixture {
    pub fn new(hostname: &str) -> Self {
        Self::with_leaf_key(hostname, SigningKey::ec())
    }

    pub fn new_rsa(hostname: &str) -> Self {
        Self::with_leaf_key(hostname, SigningKey::rsa())
    }

    fn with_leaf_key(hostname: &str, leaf_key: SigningKey) -> Self {
        let root_key = SigningKey::ec();
        let root = build_cert("Test Attestation Root", &root_key, None, true);
        let leaf = build_cert(hostname, &leaf_key, Some((&root, &root_key)), false);

        CertFixture {
            root,
            leaf,
            leaf_key,
        }
    }

    /// Sign `claims` with the leaf key, embedding the leaf in `x5c`
    pub fn sign(&self, claims: &Value) -> String {
        let der = self.leaf.to_der().unwrap();
        let x5c = vec![general_purpose::STANDARD.encode(der)];

        self.leaf_key.sign(claims, Some(x5c))
    }

    pub fn root_pem(&self) -> String {
        String::from_utf8(self.root.to_pem().unwrap()).unwrap()
    }
}

fn build_cert(
    cn: &str,
    subject: &SigningKey,
    issuer: Option<(&X509, &SigningKey)>,
    ca: bool,
) -> X509 {
    let mut name = X509NameBuilder::new().unwrap();
    name.append_entry_by_nid(Nid::COMMONNAME, cn).unwrap();
    let name = name.build();

    let serial = BigNum::from_u32(rand::random::<u32>() >> 1)
        .unwrap()
        .to_asn1_integer()
        .unwrap();

    let mut b = X509Builder::new().unwrap();
    b.set_version(2).unwrap();
    b.set_serial_number(&serial).unwrap();
    b.set_subject_name(&name).unwrap();
    b.set_pubkey(&subject.pkey).unwrap();
    b.set_not_before(&Asn1Time::days_from_now(0).unwrap())
        .unwrap();
    b.set_not_after(&Asn1Time::days_from_now(30).unwrap())
        .unwrap();

    if ca {
        b.append_extension(BasicConstraints::new().critical().ca().build().unwrap())
            .unwrap();
        b.append_extension(
            KeyUsage::new()
                .critical()
                .key_cert_sign()
                .crl_sign()
                .build()
                .unwrap(),
        )
        .unwrap();
    } else {
        b.append_extension(BasicConstraints::new().build().unwrap())
            .unwrap();
        b.append_extension(
            KeyUsage::new()
                .critical()
                .digital_signature()
                .build()
                .unwrap(),
        )
        .unwrap();
    }

    let signer = match issuer {
        Some((crt, key)) => {
            b.set_issuer_name(crt.subject_name()).unwrap();
            key
        }
        None => {
            b.set_issuer_name(&name).unwrap();
            subject
        }
    };

    b.sign(&signer.pkey, MessageDigest::sha256()).unwrap();

    b.build()
}

/// Encrypt `plaintext` into a compact A256KW/A256GCM JWE
pub fn encrypt_a256kw(plaintext: &[u8], kek: &[u8]) -> String {
    encrypt_wrapped("A256KW", "A256GCM", Cipher::aes_256_gcm(), plaintext, kek)
}

/// Compact JWE using A128KW with A128GCM
pub fn encrypt_a128kw(plaintext: &[u8], kek: &[u8]) -> String {
    encrypt_wrapped("A128KW", "A128GCM", Cipher::aes_128_gcm(), plaintext, kek)
}

/// Compact JWE using `dir` with A256GCM: `cek` is the content key and the
/// encrypted key segment is empty
pub fn encrypt_dir(plaintext: &[u8], cek: &[u8]) -> String {
    seal_gcm(r#"{"alg":"dir","enc":"A256GCM"}"#, Cipher::aes_256_gcm(), cek, &[], plaintext)
}

fn encrypt_wrapped(alg: &str, enc: &str, cipher: Cipher, plaintext: &[u8], kek: &[u8]) -> String {
    let mut cek = vec![0u8; cipher.key_len()];
    openssl::rand::rand_bytes(&mut cek).unwrap();

    let aes = AesKey::new_encrypt(kek).ok().expect("AES key-wrapping key");
    let mut wrapped = vec![0u8; cek.len() + 8];
    wrap_key(&aes, None, &mut wrapped, &cek)
        .ok()
        .expect("wrapping CEK");

    let header = format!(r#"{{"alg":"{alg}","enc":"{enc}"}}"#);

    seal_gcm(&header, cipher, &cek, &wrapped, plaintext)
}

fn seal_gcm(header: &str, cipher: Cipher, cek: &[u8], encrypted_key: &[u8], plaintext: &[u8]) -> String {
    let b64 = general_purpose::URL_SAFE_NO_PAD;
    let protected = b64.encode(header);

    let mut iv = [0u8; 12];
    openssl::rand::rand_bytes(&mut iv).unwrap();

    let mut tag = [0u8; 16];
    let ct = encrypt_aead(
        cipher,
        cek,
        Some(&iv),
        protected.as_bytes(),
        plaintext,
        &mut tag,
    )
    .unwrap();

    format!(
        "{protected}.{}.{}.{}.{}",
        b64.encode(encrypted_key),
        b64.encode(iv),
        b64.encode(ct),
        b64.encode(tag)
    )
}

/// Flip one character in the middle of segment `idx` of a compact token
pub fn tamper_segment(token: &str, idx: usize) -> String {
    let mut segments: Vec<String> = token.split('.').map(str::to_owned).collect();

    let seg = &segments[idx];
    let mid = seg.len() / 2;
    let replacement = if &seg[mid..mid + 1] == "A" { "B" } else { "A" };

    let mut tampered = seg.clone();
    tampered.replace_range(mid..mid + 1, replacement);
    segments[idx] = tampered;

    segments.join(".")
}

/// Keys a Play Integrity backend would share with the relying party
pub struct PlayIntegrityFixture {
    pub decryption_key: [u8; 32],
    pub signing_key: SigningKey,
}

impl PlayIntegrityFixture {
    pub fn new() -> Self {
        let mut decryption_key = [0u8; 32];
        openssl::rand::rand_bytes(&mut decryption_key).unwrap();

        PlayIntegrityFixture {
            decryption_key,
            signing_key: SigningKey::ec(),
        }
    }

    /// Sign then encrypt `claims`, the way the integrity service does
    pub fn seal(&self, claims: &Value) -> String {
        let jws = self.signing_key.sign(claims, None);

        encrypt_a256kw(jws.as_bytes(), &self.decryption_key)
    }

    pub fn pinned_keys(&self) -> PinnedKeys {
        PinnedKeys {
            decryption_key: self.decryption_key.to_vec(),
            verification_key: self.signing_key.spki_der(),
        }
    }
}
