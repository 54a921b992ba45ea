//! Cryptographic-strength profiles applied to every signature and key seen during verification

use flagset::FlagSet;
use serde::{Deserialize, Serialize};

use crate::util::crypto::MdAlg;
use crate::util::error::{Error, Result};
use crate::x509::pk::{EcCurve, PkAlg, PublicKey};

/// [`Profile`] lists the hash algorithms, public key algorithms and elliptic curves that are
/// acceptable, and the minimum RSA modulus size.
///
/// Profiles serialize to JSON with each set as its bit mask, e.g.,
/// `{"allowed_mds":30,"allowed_pks":31,"allowed_curves":2047,"rsa_min_bitlen":2048}`.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    /// Acceptable signature hash algorithms
    pub allowed_mds: FlagSet<MdAlg>,
    /// Acceptable signature and key algorithms
    pub allowed_pks: FlagSet<PkAlg>,
    /// Acceptable named curves for EC keys
    pub allowed_curves: FlagSet<EcCurve>,
    /// Minimum RSA modulus size in bits
    pub rsa_min_bitlen: usize,
}

cfg_if::cfg_if! {
    if #[cfg(feature = "default_allow_sha1")] {
        fn default_mds() -> FlagSet<MdAlg> {
            MdAlg::Sha1 | MdAlg::Sha224 | MdAlg::Sha256 | MdAlg::Sha384 | MdAlg::Sha512
        }
    } else {
        fn default_mds() -> FlagSet<MdAlg> {
            MdAlg::Sha224 | MdAlg::Sha256 | MdAlg::Sha384 | MdAlg::Sha512
        }
    }
}

impl Default for Profile {
    fn default() -> Self {
        Profile::default_profile()
    }
}

impl Profile {
    /// SHA-2 hashes (and SHA-1 with the `default_allow_sha1` feature), any key algorithm, any
    /// curve, RSA keys of at least 2048 bits.
    pub fn default_profile() -> Self {
        Profile {
            allowed_mds: default_mds(),
            allowed_pks: FlagSet::full(),
            allowed_curves: FlagSet::full(),
            rsa_min_bitlen: 2048,
        }
    }

    /// SHA-256 and above, any key algorithm, curves at or above the 128-bit security level,
    /// RSA keys of at least 2048 bits.
    pub fn next() -> Self {
        Profile {
            allowed_mds: MdAlg::Sha256 | MdAlg::Sha384 | MdAlg::Sha512,
            allowed_pks: FlagSet::full(),
            allowed_curves: EcCurve::Secp256r1
                | EcCurve::Secp384r1
                | EcCurve::Secp521r1
                | EcCurve::Bp256r1
                | EcCurve::Bp384r1
                | EcCurve::Bp512r1
                | EcCurve::Secp256k1,
            rsa_min_bitlen: 2048,
        }
    }

    /// NSA Suite B: SHA-256 or SHA-384 with ECDSA on P-256 or P-384. No RSA.
    pub fn suiteb() -> Self {
        Profile {
            allowed_mds: MdAlg::Sha256 | MdAlg::Sha384,
            allowed_pks: PkAlg::Ecdsa | PkAlg::Eckey,
            allowed_curves: EcCurve::Secp256r1 | EcCurve::Secp384r1,
            rsa_min_bitlen: 0,
        }
    }

    /// Looks up a named profile: `default`, `next` or `suiteb`.
    pub fn by_name(name: &str) -> Result<Self> {
        match name {
            "default" => Ok(Profile::default_profile()),
            "next" => Ok(Profile::next()),
            "suiteb" => Ok(Profile::suiteb()),
            _ => Err(Error::BadInputData),
        }
    }

    /// True if `md` is an acceptable signature hash.
    pub fn check_md(&self, md: MdAlg) -> bool {
        self.allowed_mds.contains(md)
    }

    /// True if `pk` is an acceptable signature or key algorithm.
    pub fn check_pk(&self, pk: PkAlg) -> bool {
        self.allowed_pks.contains(pk)
    }

    /// True if the strength of `key` is acceptable: RSA keys by modulus size, EC keys by curve.
    pub fn check_key(&self, key: &PublicKey) -> bool {
        match key.pk_type() {
            PkAlg::Rsa | PkAlg::RsassaPss => key.bit_len() >= self.rsa_min_bitlen,
            PkAlg::Eckey | PkAlg::EckeyDh | PkAlg::Ecdsa => match key.curve() {
                Some(curve) => self.allowed_curves.contains(curve),
                None => false,
            },
        }
    }
}

#[test]
fn named_profiles() {
    let default = Profile::default();
    assert_eq!(default, Profile::by_name("default").unwrap());
    assert!(default.check_md(MdAlg::Sha256));
    #[cfg(not(feature = "default_allow_sha1"))]
    assert!(!default.check_md(MdAlg::Sha1));
    assert!(default.check_pk(PkAlg::Rsa));
    assert!(default.check_pk(PkAlg::RsassaPss));

    let next = Profile::by_name("next").unwrap();
    assert!(!next.check_md(MdAlg::Sha224));
    assert!(!next.allowed_curves.contains(EcCurve::Secp224r1));
    assert!(next.allowed_curves.contains(EcCurve::Secp256k1));

    let suiteb = Profile::by_name("suiteb").unwrap();
    assert!(!suiteb.check_pk(PkAlg::Rsa));
    assert!(suiteb.check_pk(PkAlg::Ecdsa));
    assert!(!suiteb.check_md(MdAlg::Sha512));

    assert_eq!(Profile::by_name("strict"), Err(Error::BadInputData));
}

#[test]
fn key_strength() {
    use crate::x509::frame::parse_frame;

    let key_of = |enc: &[u8]| {
        let frame = parse_frame(enc).unwrap();
        PublicKey::from_spki_der(frame.pubkey_raw.slice(enc)).unwrap()
    };
    let rsa2048 = key_of(include_bytes!("../../tests/examples/root_rsa.der"));
    let rsa1024 = key_of(include_bytes!("../../tests/examples/ee_rsa1024.der"));
    let p256 = key_of(include_bytes!("../../tests/examples/root_ec.der"));
    let k1 = key_of(include_bytes!("../../tests/examples/root_k1.der"));

    let default = Profile::default_profile();
    assert!(default.check_key(&rsa2048));
    assert!(!default.check_key(&rsa1024));
    assert!(default.check_key(&k1));

    let suiteb = Profile::suiteb();
    assert!(suiteb.check_key(&p256));
    assert!(!suiteb.check_key(&k1));
    // suiteb rejects RSA through the algorithm check, not the key size
    assert!(suiteb.check_key(&rsa1024));
}

#[test]
fn profile_json() {
    let p = Profile::suiteb();
    let json = serde_json::to_string(&p).unwrap();
    let back: Profile = serde_json::from_str(&json).unwrap();
    assert_eq!(p, back);
}
