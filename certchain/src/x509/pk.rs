//! Public keys decoded from a certificate's SubjectPublicKeyInfo

use alloc::vec::Vec;

use der::{asn1::ObjectIdentifier, Decode};
use flagset::flags;
use log::debug;
use rsa::{pkcs8::DecodePublicKey, traits::PublicKeyParts, RsaPublicKey};
use spki::SubjectPublicKeyInfoRef;

use crate::asn1::oids::{curve_from_oid, PKIXALG_ECDH, PKIXALG_EC_PUBLIC_KEY, PKIXALG_RSA_ENCRYPTION};
use crate::util::crypto::{verify_ecdsa, verify_rsa_pkcs1v15, MdAlg};
use crate::util::error::{Error, ParseCause, ParsePhase, Result};

flags! {
    /// Public key algorithms, as named by a signature algorithm or carried by a key.
    #[derive(PartialOrd, Ord, Hash)]
    pub enum PkAlg: u8 {
        /// RSA (PKCS #1 v1.5)
        Rsa,
        /// Generic elliptic curve key (id-ecPublicKey)
        Eckey,
        /// Elliptic curve key restricted to key agreement (id-ecDH)
        EckeyDh,
        /// ECDSA signature
        Ecdsa,
        /// RSASSA-PSS signature
        RsassaPss,
    }
}

flags! {
    /// Named elliptic curves.
    #[derive(PartialOrd, Ord, Hash)]
    pub enum EcCurve: u16 {
        /// secp192r1
        Secp192r1,
        /// secp224r1
        Secp224r1,
        /// secp256r1 (P-256)
        Secp256r1,
        /// secp384r1 (P-384)
        Secp384r1,
        /// secp521r1 (P-521)
        Secp521r1,
        /// brainpoolP256r1
        Bp256r1,
        /// brainpoolP384r1
        Bp384r1,
        /// brainpoolP512r1
        Bp512r1,
        /// secp192k1
        Secp192k1,
        /// secp224k1
        Secp224k1,
        /// secp256k1
        Secp256k1,
    }
}

impl EcCurve {
    /// Size of the curve's field in bits.
    pub fn bits(&self) -> u32 {
        match self {
            EcCurve::Secp192r1 | EcCurve::Secp192k1 => 192,
            EcCurve::Secp224r1 | EcCurve::Secp224k1 => 224,
            EcCurve::Secp256r1 | EcCurve::Bp256r1 | EcCurve::Secp256k1 => 256,
            EcCurve::Secp384r1 | EcCurve::Bp384r1 => 384,
            EcCurve::Bp512r1 => 512,
            EcCurve::Secp521r1 => 521,
        }
    }

    fn field_len(&self) -> usize {
        (self.bits() as usize + 7) / 8
    }
}

/// Outcome of one signature check.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SigCheck {
    /// The signature verified
    Good,
    /// The signature did not verify, or the key cannot produce this kind of signature
    Bad,
    /// The operation budget ran out; call again to continue
    InProgress,
}

/// A decoded subject public key.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum PublicKey {
    /// RSA public key
    Rsa(RsaPublicKey),
    /// Elliptic curve public key
    Ec {
        /// [`PkAlg::Eckey`] or [`PkAlg::EckeyDh`]
        kind: PkAlg,
        /// Named curve from the algorithm parameters
        curve: EcCurve,
        /// SEC1-encoded point
        point: Vec<u8>,
    },
}

fn pk_error(cause: ParseCause) -> Error {
    Error::parse(ParsePhase::PublicKey, cause)
}

impl PublicKey {
    /// Decodes a DER-encoded SubjectPublicKeyInfo.
    pub fn from_spki_der(enc_spki: &[u8]) -> Result<Self> {
        let spki = SubjectPublicKeyInfoRef::from_der(enc_spki)
            .map_err(|_| pk_error(ParseCause::InvalidValue))?;

        if spki.algorithm.oid == PKIXALG_RSA_ENCRYPTION {
            let rsa = RsaPublicKey::from_public_key_der(enc_spki)
                .map_err(|_| pk_error(ParseCause::InvalidValue))?;
            return Ok(PublicKey::Rsa(rsa));
        }

        let kind = if spki.algorithm.oid == PKIXALG_EC_PUBLIC_KEY {
            PkAlg::Eckey
        } else if spki.algorithm.oid == PKIXALG_ECDH {
            PkAlg::EckeyDh
        } else {
            return Err(pk_error(ParseCause::UnknownOid));
        };

        let params = spki
            .algorithm
            .parameters
            .ok_or_else(|| pk_error(ParseCause::InvalidValue))?;
        let named_curve = params
            .decode_as::<ObjectIdentifier>()
            .map_err(|_| pk_error(ParseCause::UnexpectedTag))?;
        let curve =
            curve_from_oid(named_curve.as_bytes()).ok_or_else(|| pk_error(ParseCause::UnknownOid))?;

        let point = spki
            .subject_public_key
            .as_bytes()
            .ok_or_else(|| pk_error(ParseCause::InvalidValue))?;
        let flen = curve.field_len();
        let well_formed = match point.first() {
            Some(0x04) => point.len() == 1 + 2 * flen,
            Some(0x02) | Some(0x03) => point.len() == 1 + flen,
            _ => false,
        };
        if !well_formed {
            return Err(pk_error(ParseCause::InvalidValue));
        }

        Ok(PublicKey::Ec {
            kind,
            curve,
            point: point.to_vec(),
        })
    }

    /// Algorithm of the key itself.
    pub fn pk_type(&self) -> PkAlg {
        match self {
            PublicKey::Rsa(_) => PkAlg::Rsa,
            PublicKey::Ec { kind, .. } => *kind,
        }
    }

    /// True if this key can be used with `alg`.
    ///
    /// RSA keys serve RSA and RSASSA-PSS, generic EC keys serve ECDSA and key agreement, and
    /// id-ecDH keys serve key agreement only.
    pub fn can_do(&self, alg: PkAlg) -> bool {
        match self.pk_type() {
            PkAlg::Rsa => matches!(alg, PkAlg::Rsa | PkAlg::RsassaPss),
            PkAlg::Eckey => matches!(alg, PkAlg::Eckey | PkAlg::EckeyDh | PkAlg::Ecdsa),
            PkAlg::EckeyDh => matches!(alg, PkAlg::Eckey | PkAlg::EckeyDh),
            _ => false,
        }
    }

    /// Key size in bits: the RSA modulus length or the curve size.
    pub fn bit_len(&self) -> usize {
        match self {
            PublicKey::Rsa(rsa) => rsa.n().bits(),
            PublicKey::Ec { curve, .. } => curve.bits() as usize,
        }
    }

    /// Named curve of an EC key.
    pub fn curve(&self) -> Option<EcCurve> {
        match self {
            PublicKey::Rsa(_) => None,
            PublicKey::Ec { curve, .. } => Some(*curve),
        }
    }

    /// Verifies `signature` over `hash` (computed with `md`) as a `sig_pk` signature.
    pub fn verify(&self, sig_pk: PkAlg, md: MdAlg, hash: &[u8], signature: &[u8]) -> bool {
        if !self.can_do(sig_pk) {
            return false;
        }
        match (self, sig_pk) {
            (PublicKey::Rsa(rsa), PkAlg::Rsa) => verify_rsa_pkcs1v15(rsa, md, hash, signature),
            (PublicKey::Ec { curve, point, .. }, PkAlg::Ecdsa) => {
                verify_ecdsa(*curve, point, hash, signature)
            }
            _ => false,
        }
    }

    /// Like [`PublicKey::verify`], but ECDSA checks are metered.
    ///
    /// Each call adds `max_ops` to `progress`. Until `progress` reaches the curve size in bits
    /// the call returns [`SigCheck::InProgress`]; the call that reaches it performs the
    /// verification and clears `progress`. A `max_ops` of 0 never suspends.
    ///
    /// The meter only paces calls. Suspended calls do no cryptographic work and the final call
    /// runs the whole ECDSA verification, so `max_ops` does not bound the time any single call
    /// takes.
    pub fn verify_restartable(
        &self,
        sig_pk: PkAlg,
        md: MdAlg,
        hash: &[u8],
        signature: &[u8],
        max_ops: u32,
        progress: &mut u32,
    ) -> SigCheck {
        if let (PublicKey::Ec { curve, .. }, PkAlg::Ecdsa) = (self, sig_pk) {
            if max_ops > 0 && self.can_do(sig_pk) {
                *progress = progress.saturating_add(max_ops);
                if *progress < curve.bits() {
                    debug!(
                        "ECDSA verification suspended after {} of {} operations",
                        progress,
                        curve.bits()
                    );
                    return SigCheck::InProgress;
                }
                *progress = 0;
            }
        }
        if self.verify(sig_pk, md, hash, signature) {
            SigCheck::Good
        } else {
            SigCheck::Bad
        }
    }
}

#[test]
fn ec_key_from_spki() {
    use crate::asn1::reader::{DerReader, TAG_SEQUENCE};

    let enc = include_bytes!("../../tests/examples/root_ec.der");
    // Certificate > TBSCertificate > 7th element is the SubjectPublicKeyInfo
    let mut r = DerReader::new(enc, ParsePhase::Format);
    let mut cert = r.get_tag(TAG_SEQUENCE).unwrap();
    let mut tbs = cert.get_tag(TAG_SEQUENCE).unwrap();
    for _ in 0..6 {
        tbs.read_tlv().unwrap();
    }
    let spki = tbs.get_tlv(TAG_SEQUENCE).unwrap();
    let pk = PublicKey::from_spki_der(spki.encoded).unwrap();
    assert_eq!(pk.pk_type(), PkAlg::Eckey);
    assert_eq!(pk.curve(), Some(EcCurve::Secp256r1));
    assert_eq!(pk.bit_len(), 256);
    assert!(pk.can_do(PkAlg::Ecdsa));
    assert!(!pk.can_do(PkAlg::Rsa));

    let mut progress = 0;
    assert_eq!(
        pk.verify_restartable(PkAlg::Ecdsa, MdAlg::Sha256, &[0; 32], &[0x30, 0], 100, &mut progress),
        SigCheck::InProgress
    );
    assert_eq!(progress, 100);
    assert_eq!(
        pk.verify_restartable(PkAlg::Ecdsa, MdAlg::Sha256, &[0; 32], &[0x30, 0], 100, &mut progress),
        SigCheck::InProgress
    );
    assert_eq!(
        pk.verify_restartable(PkAlg::Ecdsa, MdAlg::Sha256, &[0; 32], &[0x30, 0], 100, &mut progress),
        SigCheck::Bad
    );
    assert_eq!(progress, 0);

    // a budget covering the curve completes in one call
    assert_eq!(
        pk.verify_restartable(PkAlg::Ecdsa, MdAlg::Sha256, &[0; 32], &[0x30, 0], 256, &mut progress),
        SigCheck::Bad
    );
    assert_eq!(progress, 0);
}

#[test]
fn unknown_key_algorithm() {
    use hex_literal::hex;
    // SEQUENCE { SEQUENCE { OID 1.3.101.112 (Ed25519) }, BIT STRING 00 }
    let enc = hex!("300B 3005 06032B6570 03020000");
    assert_eq!(
        PublicKey::from_spki_der(&enc),
        Err(Error::parse(ParsePhase::PublicKey, ParseCause::UnknownOid))
    );
}
