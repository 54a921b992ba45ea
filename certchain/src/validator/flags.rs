//! Verification findings, accumulated per certificate and merged into one result

use alloc::string::String;

use flagset::{flags, FlagSet};

flags! {
    /// One independent finding about a certificate or the CRLs consulted for it. The bit values
    /// are stable and may be relied on by callers that store or exchange the integer form.
    #[derive(PartialOrd, Ord, Hash)]
    pub enum VerifyFlag: u32 {
        /// The certificate validity has expired
        Expired = 0x01,
        /// The certificate has been revoked
        Revoked = 0x02,
        /// The certificate does not match the expected host name
        CnMismatch = 0x04,
        /// The certificate is not correctly signed by a trusted CA
        NotTrusted = 0x08,
        /// The CRL is not correctly signed by the trusted CA
        BadCrlNotTrusted = 0x10,
        /// The CRL is expired
        BadCrlExpired = 0x20,
        /// Certificate was missing
        Missing = 0x40,
        /// Certificate verification was skipped
        SkipVerify = 0x80,
        /// Other reason, for use by verification callbacks
        Other = 0x0100,
        /// The certificate validity starts in the future
        Future = 0x0200,
        /// The CRL is from the future
        BadCrlFuture = 0x0400,
        /// Usage does not match the keyUsage extension
        KeyUsage = 0x0800,
        /// Usage does not match the extendedKeyUsage extension
        ExtKeyUsage = 0x1000,
        /// Usage does not match the nsCertType extension
        NsCertType = 0x2000,
        /// The certificate is signed with an unacceptable hash
        BadMd = 0x4000,
        /// The certificate is signed with an unacceptable public key algorithm
        BadPk = 0x8000,
        /// The certificate is signed with an unacceptable key
        BadKey = 0x010000,
        /// The CRL is signed with an unacceptable hash
        BadCrlBadMd = 0x020000,
        /// The CRL is signed with an unacceptable public key algorithm
        BadCrlBadPk = 0x040000,
        /// The CRL is signed with an unacceptable key
        BadCrlBadKey = 0x080000,
    }
}

/// Set of [`VerifyFlag`] values. Empty means no finding.
pub type VerifyFlags = FlagSet<VerifyFlag>;

const VERIFY_STRINGS: &[(VerifyFlag, &str)] = &[
    (VerifyFlag::Expired, "The certificate validity has expired"),
    (VerifyFlag::Revoked, "The certificate has been revoked (is on a CRL)"),
    (
        VerifyFlag::CnMismatch,
        "The certificate Common Name (CN) does not match with the expected CN",
    ),
    (
        VerifyFlag::NotTrusted,
        "The certificate is not correctly signed by the trusted CA",
    ),
    (
        VerifyFlag::BadCrlNotTrusted,
        "The CRL is not correctly signed by the trusted CA",
    ),
    (VerifyFlag::BadCrlExpired, "The CRL is expired"),
    (VerifyFlag::Missing, "Certificate was missing"),
    (VerifyFlag::SkipVerify, "Certificate verification was skipped"),
    (
        VerifyFlag::Other,
        "Other reason (can be used by verify callback)",
    ),
    (
        VerifyFlag::Future,
        "The certificate validity starts in the future",
    ),
    (VerifyFlag::BadCrlFuture, "The CRL is from the future"),
    (
        VerifyFlag::KeyUsage,
        "Usage does not match the keyUsage extension",
    ),
    (
        VerifyFlag::ExtKeyUsage,
        "Usage does not match the extendedKeyUsage extension",
    ),
    (
        VerifyFlag::NsCertType,
        "Usage does not match the nsCertType extension",
    ),
    (
        VerifyFlag::BadMd,
        "The certificate is signed with an unacceptable hash.",
    ),
    (
        VerifyFlag::BadPk,
        "The certificate is signed with an unacceptable PK alg (eg RSA vs ECDSA).",
    ),
    (
        VerifyFlag::BadKey,
        "The certificate is signed with an unacceptable key (eg bad curve, RSA too short).",
    ),
    (
        VerifyFlag::BadCrlBadMd,
        "The CRL is signed with an unacceptable hash.",
    ),
    (
        VerifyFlag::BadCrlBadPk,
        "The CRL is signed with an unacceptable PK alg (eg RSA vs ECDSA).",
    ),
    (
        VerifyFlag::BadCrlBadKey,
        "The CRL is signed with an unacceptable key (eg bad curve, RSA too short).",
    ),
];

/// Converts the integer form of a flag set. Unknown bits are dropped.
pub fn flags_from_bits(bits: u32) -> VerifyFlags {
    FlagSet::new_truncated(bits)
}

/// Describes every finding in `bits`, one `prefix`-ed line per flag, in flag order. Bits that are
/// not a known flag add a single "Unknown reason" line.
pub fn verify_info(prefix: &str, bits: u32) -> String {
    let mut out = String::new();
    let mut remaining = bits;
    for (flag, text) in VERIFY_STRINGS {
        let bit = FlagSet::from(*flag).bits();
        if remaining & bit == 0 {
            continue;
        }
        out.push_str(prefix);
        out.push_str(text);
        out.push('\n');
        remaining ^= bit;
    }
    if remaining != 0 {
        out.push_str(prefix);
        out.push_str("Unknown reason (this should not happen)\n");
    }
    out
}

#[test]
fn flag_values() {
    assert_eq!(FlagSet::from(VerifyFlag::NotTrusted).bits(), 0x08);
    assert_eq!(FlagSet::from(VerifyFlag::BadCrlBadKey).bits(), 0x80000);
    let f = VerifyFlag::Expired | VerifyFlag::BadMd;
    assert_eq!(f.bits(), 0x4001);
    assert_eq!(flags_from_bits(0x4001), f);
    assert_eq!(flags_from_bits(0x8000_0001), VerifyFlag::Expired);
}

#[test]
fn info_strings() {
    assert_eq!(verify_info("! ", 0), "");
    assert_eq!(
        verify_info("! ", (VerifyFlag::Expired | VerifyFlag::NotTrusted).bits()),
        "! The certificate validity has expired\n\
         ! The certificate is not correctly signed by the trusted CA\n"
    );
    assert_eq!(
        verify_info("", 0x0100_0000 | 0x02),
        "The certificate has been revoked (is on a CRL)\n\
         Unknown reason (this should not happen)\n"
    );
}
