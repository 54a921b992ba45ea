//! Hash calculation and signature verification primitives built on implementations from the
//! [Rust Crypto](https://github.com/RustCrypto) project.
//!
//! Signatures are verified over a digest that the caller computed with [`calculate_hash`], so a
//! certificate's to-be-signed bytes are hashed once no matter how many candidate issuers are
//! tried.

use alloc::vec::Vec;

use flagset::flags;
use p256::ecdsa::signature::hazmat::PrehashVerifier;
use rsa::{Pkcs1v15Sign, RsaPublicKey};
use sha1::Sha1;
use sha2::{Digest, Sha224, Sha256, Sha384, Sha512};

use crate::x509::pk::EcCurve;

flags! {
    /// Hash algorithms that may appear in a certificate or CRL signature algorithm.
    #[derive(PartialOrd, Ord, Hash)]
    pub enum MdAlg: u8 {
        /// SHA-1
        Sha1,
        /// SHA-224
        Sha224,
        /// SHA-256
        Sha256,
        /// SHA-384
        Sha384,
        /// SHA-512
        Sha512,
    }
}

impl MdAlg {
    /// Digest length in bytes.
    pub fn output_size(&self) -> usize {
        match self {
            MdAlg::Sha1 => 20,
            MdAlg::Sha224 => 28,
            MdAlg::Sha256 => 32,
            MdAlg::Sha384 => 48,
            MdAlg::Sha512 => 64,
        }
    }
}

/// Computes the `md` digest of `buffer_to_hash`.
pub fn calculate_hash(md: MdAlg, buffer_to_hash: &[u8]) -> Vec<u8> {
    match md {
        MdAlg::Sha1 => Sha1::digest(buffer_to_hash).to_vec(),
        MdAlg::Sha224 => Sha224::digest(buffer_to_hash).to_vec(),
        MdAlg::Sha256 => Sha256::digest(buffer_to_hash).to_vec(),
        MdAlg::Sha384 => Sha384::digest(buffer_to_hash).to_vec(),
        MdAlg::Sha512 => Sha512::digest(buffer_to_hash).to_vec(),
    }
}

fn pkcs1v15_scheme(md: MdAlg) -> Pkcs1v15Sign {
    match md {
        MdAlg::Sha1 => Pkcs1v15Sign::new::<Sha1>(),
        MdAlg::Sha224 => Pkcs1v15Sign::new::<Sha224>(),
        MdAlg::Sha256 => Pkcs1v15Sign::new::<Sha256>(),
        MdAlg::Sha384 => Pkcs1v15Sign::new::<Sha384>(),
        MdAlg::Sha512 => Pkcs1v15Sign::new::<Sha512>(),
    }
}

/// Verifies an RSASSA-PKCS1-v1_5 `signature` over `hash`, a digest computed with `md`.
pub fn verify_rsa_pkcs1v15(key: &RsaPublicKey, md: MdAlg, hash: &[u8], signature: &[u8]) -> bool {
    if hash.len() != md.output_size() {
        return false;
    }
    key.verify(pkcs1v15_scheme(md), hash, signature).is_ok()
}

/// Verifies a DER-encoded ECDSA `signature` over `hash` using the SEC1-encoded `point` on
/// `curve`.
///
/// Only secp256r1 and secp384r1 are implemented; signatures by keys on other curves never
/// verify.
pub fn verify_ecdsa(curve: EcCurve, point: &[u8], hash: &[u8], signature: &[u8]) -> bool {
    match curve {
        EcCurve::Secp256r1 => {
            let Ok(vk) = p256::ecdsa::VerifyingKey::from_sec1_bytes(point) else {
                return false;
            };
            let Ok(sig) = p256::ecdsa::Signature::from_der(signature) else {
                return false;
            };
            vk.verify_prehash(hash, &sig).is_ok()
        }
        EcCurve::Secp384r1 => {
            let Ok(vk) = p384::ecdsa::VerifyingKey::from_sec1_bytes(point) else {
                return false;
            };
            let Ok(sig) = p384::ecdsa::Signature::from_der(signature) else {
                return false;
            };
            vk.verify_prehash(hash, &sig).is_ok()
        }
        _ => false,
    }
}

#[test]
fn hash_sizes() {
    for md in [
        MdAlg::Sha1,
        MdAlg::Sha224,
        MdAlg::Sha256,
        MdAlg::Sha384,
        MdAlg::Sha512,
    ] {
        assert_eq!(calculate_hash(md, b"abc").len(), md.output_size());
    }
    assert_eq!(
        calculate_hash(MdAlg::Sha256, b"abc"),
        hex_literal::hex!("ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad")
    );
}

#[test]
fn ecdsa_rejects_garbage() {
    let hash = calculate_hash(MdAlg::Sha256, b"abc");
    assert!(!verify_ecdsa(EcCurve::Secp256r1, &[4, 1, 2], &hash, &[0x30, 0]));
    assert!(!verify_ecdsa(EcCurve::Secp256k1, &[], &hash, &[]));
}
