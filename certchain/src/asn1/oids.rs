//! Object identifiers recognized by the certificate and CRL decoders, and the mappings from their
//! encoded form to the algorithm, curve and extension enums used elsewhere in the crate.

use const_oid::db::rfc5280;
use der::asn1::ObjectIdentifier;

use crate::util::crypto::MdAlg;
use crate::x509::frame::ExtType;
use crate::x509::pk::{EcCurve, PkAlg};

// -------------------------------------------------------------------------------------------------
// Public key algorithms
// -------------------------------------------------------------------------------------------------

/// rsaEncryption OBJECT IDENTIFIER ::= {
///     iso(1) member-body(2) us(840) rsadsi(113549) pkcs(1)
///     pkcs-1(1) 1 }
pub const PKIXALG_RSA_ENCRYPTION: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.1");

/// id-ecPublicKey OBJECT IDENTIFIER ::= {
///     iso(1) member-body(2) us(840) ansi-X9-62(10045) keyType(2) 1 }
pub const PKIXALG_EC_PUBLIC_KEY: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.10045.2.1");

/// id-ecDH OBJECT IDENTIFIER ::= {
///     iso(1) identified-organization(3) certicom(132) schemes(1)
///     ecdh(12) }
pub const PKIXALG_ECDH: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.132.1.12");

// -------------------------------------------------------------------------------------------------
// Signature algorithms
// -------------------------------------------------------------------------------------------------

/// sha1WithRSAEncryption
pub const PKIXALG_SHA1_WITH_RSA_ENCRYPTION: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.5");
/// sha224WithRSAEncryption
pub const PKIXALG_SHA224_WITH_RSA_ENCRYPTION: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.14");
/// sha256WithRSAEncryption
pub const PKIXALG_SHA256_WITH_RSA_ENCRYPTION: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.11");
/// sha384WithRSAEncryption
pub const PKIXALG_SHA384_WITH_RSA_ENCRYPTION: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.12");
/// sha512WithRSAEncryption
pub const PKIXALG_SHA512_WITH_RSA_ENCRYPTION: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.13");

/// ecdsa-with-SHA1 OBJECT IDENTIFIER ::= {
///     iso(1) member-body(2) us(840) ansi-X9-62(10045) signatures(4) 1 }
pub const PKIXALG_ECDSA_WITH_SHA1: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.10045.4.1");
/// ecdsa-with-SHA224 OBJECT IDENTIFIER ::= {
///     iso(1) member-body(2) us(840) ansi-X9-62(10045) signatures(4)
///     ecdsa-with-SHA2(3) 1 }
pub const PKIXALG_ECDSA_WITH_SHA224: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.10045.4.3.1");
/// ecdsa-with-SHA256
pub const PKIXALG_ECDSA_WITH_SHA256: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.10045.4.3.2");
/// ecdsa-with-SHA384
pub const PKIXALG_ECDSA_WITH_SHA384: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.10045.4.3.3");
/// ecdsa-with-SHA512
pub const PKIXALG_ECDSA_WITH_SHA512: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.10045.4.3.4");

// -------------------------------------------------------------------------------------------------
// Named curves
// -------------------------------------------------------------------------------------------------

/// secp192r1 OBJECT IDENTIFIER ::= {
///     iso(1) member-body(2) us(840) ansi-X9-62(10045) curves(3)
///     prime(1) 1 }
pub const PKIXALG_SECP192R1: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.10045.3.1.1");
/// secp224r1 OBJECT IDENTIFIER ::= {
///     iso(1) identified-organization(3) certicom(132) curve(0) 33 }
pub const PKIXALG_SECP224R1: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.132.0.33");
/// secp256r1 OBJECT IDENTIFIER ::= {
///     iso(1) member-body(2) us(840) ansi-X9-62(10045) curves(3)
///     prime(1) 7 }
pub const PKIXALG_SECP256R1: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.10045.3.1.7");
/// secp384r1 OBJECT IDENTIFIER ::= {
///     iso(1) identified-organization(3) certicom(132) curve(0) 34 }
pub const PKIXALG_SECP384R1: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.132.0.34");
/// secp521r1 OBJECT IDENTIFIER ::= {
///     iso(1) identified-organization(3) certicom(132) curve(0) 35 }
pub const PKIXALG_SECP521R1: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.132.0.35");
/// secp192k1
pub const PKIXALG_SECP192K1: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.132.0.31");
/// secp224k1
pub const PKIXALG_SECP224K1: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.132.0.32");
/// secp256k1
pub const PKIXALG_SECP256K1: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.132.0.10");
/// brainpoolP256r1 (RFC 5639)
pub const PKIXALG_BRAINPOOL_P256R1: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.3.36.3.3.2.8.1.1.7");
/// brainpoolP384r1 (RFC 5639)
pub const PKIXALG_BRAINPOOL_P384R1: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.3.36.3.3.2.8.1.1.11");
/// brainpoolP512r1 (RFC 5639)
pub const PKIXALG_BRAINPOOL_P512R1: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.3.36.3.3.2.8.1.1.13");

// -------------------------------------------------------------------------------------------------
// Certificate extensions and purposes
// -------------------------------------------------------------------------------------------------

/// id-ce-keyUsage
pub const PKIX_CE_KEY_USAGE: ObjectIdentifier = rfc5280::ID_CE_KEY_USAGE;
/// id-ce-subjectAltName
pub const PKIX_CE_SUBJECT_ALT_NAME: ObjectIdentifier = rfc5280::ID_CE_SUBJECT_ALT_NAME;
/// id-ce-basicConstraints
pub const PKIX_CE_BASIC_CONSTRAINTS: ObjectIdentifier = rfc5280::ID_CE_BASIC_CONSTRAINTS;
/// id-ce-certificatePolicies
pub const PKIX_CE_CERTIFICATE_POLICIES: ObjectIdentifier = rfc5280::ID_CE_CERTIFICATE_POLICIES;
/// id-ce-extKeyUsage
pub const PKIX_CE_EXT_KEY_USAGE: ObjectIdentifier = rfc5280::ID_CE_EXT_KEY_USAGE;
/// anyExtendedKeyUsage OBJECT IDENTIFIER ::= { id-ce-extKeyUsage 0 }
pub const PKIX_CE_ANY_EXTENDED_KEY_USAGE: ObjectIdentifier = rfc5280::ANY_EXTENDED_KEY_USAGE;
/// anyPolicy OBJECT IDENTIFIER ::= { id-ce-certificatePolicies 0 }
pub const PKIX_CE_ANY_POLICY: ObjectIdentifier = rfc5280::ANY_POLICY;
/// Netscape certificate type
pub const NETSCAPE_CERT_TYPE: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("2.16.840.1.113730.1.1");

/// id-kp-serverAuth
pub const PKIX_KP_SERVER_AUTH: ObjectIdentifier = rfc5280::ID_KP_SERVER_AUTH;
/// id-kp-clientAuth
pub const PKIX_KP_CLIENT_AUTH: ObjectIdentifier = rfc5280::ID_KP_CLIENT_AUTH;
/// id-kp-codeSigning
pub const PKIX_KP_CODE_SIGNING: ObjectIdentifier = rfc5280::ID_KP_CODE_SIGNING;
/// id-kp-emailProtection
pub const PKIX_KP_EMAIL_PROTECTION: ObjectIdentifier = rfc5280::ID_KP_EMAIL_PROTECTION;

/// id-at-commonName
pub const PKIX_AT_COMMON_NAME: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.3");

// -------------------------------------------------------------------------------------------------
// Lookups over encoded OID value octets
// -------------------------------------------------------------------------------------------------

const SIG_ALGS: &[(ObjectIdentifier, MdAlg, PkAlg)] = &[
    (PKIXALG_SHA1_WITH_RSA_ENCRYPTION, MdAlg::Sha1, PkAlg::Rsa),
    (PKIXALG_SHA224_WITH_RSA_ENCRYPTION, MdAlg::Sha224, PkAlg::Rsa),
    (PKIXALG_SHA256_WITH_RSA_ENCRYPTION, MdAlg::Sha256, PkAlg::Rsa),
    (PKIXALG_SHA384_WITH_RSA_ENCRYPTION, MdAlg::Sha384, PkAlg::Rsa),
    (PKIXALG_SHA512_WITH_RSA_ENCRYPTION, MdAlg::Sha512, PkAlg::Rsa),
    (PKIXALG_ECDSA_WITH_SHA1, MdAlg::Sha1, PkAlg::Ecdsa),
    (PKIXALG_ECDSA_WITH_SHA224, MdAlg::Sha224, PkAlg::Ecdsa),
    (PKIXALG_ECDSA_WITH_SHA256, MdAlg::Sha256, PkAlg::Ecdsa),
    (PKIXALG_ECDSA_WITH_SHA384, MdAlg::Sha384, PkAlg::Ecdsa),
    (PKIXALG_ECDSA_WITH_SHA512, MdAlg::Sha512, PkAlg::Ecdsa),
];

const CURVES: &[(ObjectIdentifier, EcCurve)] = &[
    (PKIXALG_SECP192R1, EcCurve::Secp192r1),
    (PKIXALG_SECP224R1, EcCurve::Secp224r1),
    (PKIXALG_SECP256R1, EcCurve::Secp256r1),
    (PKIXALG_SECP384R1, EcCurve::Secp384r1),
    (PKIXALG_SECP521R1, EcCurve::Secp521r1),
    (PKIXALG_BRAINPOOL_P256R1, EcCurve::Bp256r1),
    (PKIXALG_BRAINPOOL_P384R1, EcCurve::Bp384r1),
    (PKIXALG_BRAINPOOL_P512R1, EcCurve::Bp512r1),
    (PKIXALG_SECP192K1, EcCurve::Secp192k1),
    (PKIXALG_SECP224K1, EcCurve::Secp224k1),
    (PKIXALG_SECP256K1, EcCurve::Secp256k1),
];

const EXTENSIONS: &[(ObjectIdentifier, ExtType)] = &[
    (PKIX_CE_BASIC_CONSTRAINTS, ExtType::BasicConstraints),
    (PKIX_CE_KEY_USAGE, ExtType::KeyUsage),
    (PKIX_CE_EXT_KEY_USAGE, ExtType::ExtendedKeyUsage),
    (PKIX_CE_SUBJECT_ALT_NAME, ExtType::SubjectAltName),
    (NETSCAPE_CERT_TYPE, ExtType::NsCertType),
    (PKIX_CE_CERTIFICATE_POLICIES, ExtType::CertificatePolicies),
];

/// Maps the encoded value of a signature algorithm OID to its hash and public key algorithms.
pub fn sig_alg_from_oid(oid: &[u8]) -> Option<(MdAlg, PkAlg)> {
    SIG_ALGS
        .iter()
        .find(|(o, _, _)| o.as_bytes() == oid)
        .map(|(_, md, pk)| (*md, *pk))
}

/// Returns the signature algorithm OID for a hash and public key algorithm pair.
pub fn oid_from_sig_alg(md: MdAlg, pk: PkAlg) -> Option<ObjectIdentifier> {
    SIG_ALGS
        .iter()
        .find(|(_, m, p)| *m == md && *p == pk)
        .map(|(o, _, _)| *o)
}

/// Maps the encoded value of a named curve OID to an [`EcCurve`].
pub fn curve_from_oid(oid: &[u8]) -> Option<EcCurve> {
    CURVES
        .iter()
        .find(|(o, _)| o.as_bytes() == oid)
        .map(|(_, c)| *c)
}

/// Maps the encoded value of an extension OID to one of the extension types the frame decoder
/// understands.
pub fn ext_type_from_oid(oid: &[u8]) -> Option<ExtType> {
    EXTENSIONS
        .iter()
        .find(|(o, _)| o.as_bytes() == oid)
        .map(|(_, e)| *e)
}

#[test]
fn oid_lookups() {
    use hex_literal::hex;

    assert_eq!(
        sig_alg_from_oid(&hex!("2A864886F70D01010B")),
        Some((MdAlg::Sha256, PkAlg::Rsa))
    );
    assert_eq!(
        sig_alg_from_oid(PKIXALG_ECDSA_WITH_SHA384.as_bytes()),
        Some((MdAlg::Sha384, PkAlg::Ecdsa))
    );
    // RSASSA-PSS is not a supported signature algorithm
    assert_eq!(sig_alg_from_oid(&hex!("2A864886F70D01010A")), None);
    assert_eq!(
        oid_from_sig_alg(MdAlg::Sha1, PkAlg::Rsa),
        Some(PKIXALG_SHA1_WITH_RSA_ENCRYPTION)
    );
    assert_eq!(oid_from_sig_alg(MdAlg::Sha256, PkAlg::EckeyDh), None);

    assert_eq!(
        curve_from_oid(&hex!("2A8648CE3D030107")),
        Some(EcCurve::Secp256r1)
    );
    assert_eq!(curve_from_oid(PKIXALG_SECP256K1.as_bytes()), Some(EcCurve::Secp256k1));
    assert_eq!(curve_from_oid(PKIXALG_RSA_ENCRYPTION.as_bytes()), None);

    assert_eq!(ext_type_from_oid(&hex!("551D13")), Some(ExtType::BasicConstraints));
    // subjectKeyIdentifier is skipped by the frame decoder
    assert_eq!(ext_type_from_oid(&hex!("551D0E")), None);
}
