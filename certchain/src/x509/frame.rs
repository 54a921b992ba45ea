//! Structural skeleton of a certificate, extracted without allocating
//!
//! A [`Frame`] is a flat, copyable view of the fields that path building and verification need:
//! decoded scalars (version, validity, basic constraints, key usage) plus [`RawRange`] offsets
//! into the certificate's own buffer for everything that is expanded later on demand (names,
//! the public key, subject alternative names, extended key usage, policies). It is always
//! reconstructible from the raw certificate and is never the source of truth.

use der::{
    asn1::{GeneralizedTime, UtcTime},
    DateTime, Decode,
};
use flagset::{flags, FlagSet};

use crate::asn1::oids::{ext_type_from_oid, sig_alg_from_oid};
use crate::asn1::reader::*;
use crate::util::crypto::MdAlg;
use crate::util::error::{ParseCause, ParsePhase, Result};
use crate::validator::name::validate_name;
use crate::x509::pk::PkAlg;

/// Offset and length of a sub-range of a certificate's raw buffer.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub struct RawRange {
    /// Offset of the first byte
    pub offset: usize,
    /// Number of bytes
    pub len: usize,
}

impl RawRange {
    /// Creates a range.
    pub const fn new(offset: usize, len: usize) -> Self {
        RawRange { offset, len }
    }

    /// True if the range covers no bytes.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the bytes of `buf` covered by this range, or an empty slice if the range does
    /// not fit.
    pub fn slice<'a>(&self, buf: &'a [u8]) -> &'a [u8] {
        buf.get(self.offset..self.offset + self.len).unwrap_or(&[])
    }
}

flags! {
    /// Extensions understood by the frame decoder.
    pub enum ExtType: u32 {
        /// keyUsage
        KeyUsage = 0x0004,
        /// certificatePolicies
        CertificatePolicies = 0x0008,
        /// subjectAltName
        SubjectAltName = 0x0020,
        /// basicConstraints
        BasicConstraints = 0x0100,
        /// extKeyUsage
        ExtendedKeyUsage = 0x0800,
        /// Netscape certificate type
        NsCertType = 0x10000,
    }
}

/// keyUsage digitalSignature bit
pub const KU_DIGITAL_SIGNATURE: u32 = 0x80;
/// keyUsage nonRepudiation bit
pub const KU_NON_REPUDIATION: u32 = 0x40;
/// keyUsage keyEncipherment bit
pub const KU_KEY_ENCIPHERMENT: u32 = 0x20;
/// keyUsage dataEncipherment bit
pub const KU_DATA_ENCIPHERMENT: u32 = 0x10;
/// keyUsage keyAgreement bit
pub const KU_KEY_AGREEMENT: u32 = 0x08;
/// keyUsage keyCertSign bit
pub const KU_KEY_CERT_SIGN: u32 = 0x04;
/// keyUsage cRLSign bit
pub const KU_CRL_SIGN: u32 = 0x02;
/// keyUsage encipherOnly bit
pub const KU_ENCIPHER_ONLY: u32 = 0x01;
/// keyUsage decipherOnly bit
pub const KU_DECIPHER_ONLY: u32 = 0x8000;

/// Netscape certificate type: SSL client
pub const NS_CERT_TYPE_SSL_CLIENT: u8 = 0x80;
/// Netscape certificate type: SSL server
pub const NS_CERT_TYPE_SSL_SERVER: u8 = 0x40;
/// Netscape certificate type: email
pub const NS_CERT_TYPE_EMAIL: u8 = 0x20;
/// Netscape certificate type: object signing
pub const NS_CERT_TYPE_OBJECT_SIGNING: u8 = 0x10;
/// Netscape certificate type: reserved
pub const NS_CERT_TYPE_RESERVED: u8 = 0x08;
/// Netscape certificate type: SSL CA
pub const NS_CERT_TYPE_SSL_CA: u8 = 0x04;
/// Netscape certificate type: email CA
pub const NS_CERT_TYPE_EMAIL_CA: u8 = 0x02;
/// Netscape certificate type: object signing CA
pub const NS_CERT_TYPE_OBJECT_SIGNING_CA: u8 = 0x01;

/// Decoded skeleton of one certificate. Every [`RawRange`] refers to the certificate's raw
/// buffer.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Frame {
    /// The Certificate TLV
    pub raw: RawRange,
    /// The TBSCertificate TLV, the bytes covered by the signature
    pub tbs: RawRange,
    /// 1, 2 or 3
    pub version: u8,
    /// Value octets of the serial number
    pub serial: RawRange,
    /// The inner signature AlgorithmIdentifier TLV
    pub sig_alg: RawRange,
    /// Hash algorithm of the signature
    pub sig_md: MdAlg,
    /// Public key algorithm of the signature
    pub sig_pk: PkAlg,
    /// The issuer Name TLV
    pub issuer_raw: RawRange,
    /// The subject Name TLV
    pub subject_raw: RawRange,
    /// notBefore
    pub valid_from: DateTime,
    /// notAfter
    pub valid_to: DateTime,
    /// The SubjectPublicKeyInfo TLV
    pub pubkey_raw: RawRange,
    /// Value octets of issuerUniqueID, if present
    pub issuer_id: RawRange,
    /// Value octets of subjectUniqueID, if present
    pub subject_id: RawRange,
    /// Contents of the [3] extensions wrapper
    pub v3_ext: RawRange,
    /// extnValue contents of subjectAltName
    pub subject_alt_raw: RawRange,
    /// extnValue contents of extKeyUsage
    pub ext_key_usage_raw: RawRange,
    /// extnValue contents of certificatePolicies
    pub crt_policies_raw: RawRange,
    /// Signature value octets
    pub sig: RawRange,
    /// Extensions seen
    pub ext_types: FlagSet<ExtType>,
    /// basicConstraints cA
    pub ca_istrue: bool,
    /// basicConstraints pathLenConstraint plus one; 0 means unconstrained
    pub max_pathlen: i32,
    /// keyUsage bits, see the `KU_` constants
    pub key_usage: u32,
    /// Netscape certificate type bits, see the `NS_CERT_TYPE_` constants
    pub ns_cert_type: u8,
}

impl Frame {
    /// True if the certificate carries extension `ext`.
    pub fn has_ext(&self, ext: ExtType) -> bool {
        self.ext_types.contains(ext)
    }

    /// True if the keyUsage extension is absent or permits `usage`.
    ///
    /// Every requested bit other than encipherOnly and decipherOnly must be asserted. Those two
    /// may be asserted only if requested.
    pub fn check_key_usage(&self, usage: u32) -> bool {
        if !self.has_ext(ExtType::KeyUsage) {
            return true;
        }
        let may_mask = KU_ENCIPHER_ONLY | KU_DECIPHER_ONLY;
        let usage_must = usage & !may_mask;
        if self.key_usage & !may_mask & usage_must != usage_must {
            return false;
        }
        let usage_may = usage & may_mask;
        (self.key_usage & may_mask) | usage_may == usage_may
    }
}

fn parse_version(p: &mut DerReader<'_>) -> Result<u8> {
    p.set_phase(ParsePhase::Version);
    let version = match p.get_optional(TAG_CONTEXT_SPECIFIC | TAG_CONSTRUCTED)? {
        None => 0,
        Some(mut explicit) => {
            let v = explicit.get_int()?;
            explicit.finish()?;
            v
        }
    };
    match version {
        0..=2 => Ok(version as u8 + 1),
        _ => Err(p.error(ParseCause::InvalidValue)),
    }
}

/// Decodes the contents of an AlgorithmIdentifier naming a signature algorithm. Parameters must
/// be absent or NULL.
pub(crate) fn parse_sig_alg(mut alg: DerReader<'_>) -> Result<(MdAlg, PkAlg)> {
    let oid = alg.get_oid()?;
    if !alg.is_empty() {
        let params = alg.read_tlv()?;
        if params.tag != TAG_NULL || !params.value.is_empty() {
            return Err(alg.error(ParseCause::InvalidValue));
        }
        alg.finish()?;
    }
    sig_alg_from_oid(oid).ok_or_else(|| alg.error(ParseCause::UnknownOid))
}

/// Reads a UTCTime or GeneralizedTime.
pub(crate) fn parse_time(p: &mut DerReader<'_>) -> Result<DateTime> {
    let tlv = match p.peek_tag() {
        Some(TAG_UTC_TIME) | Some(TAG_GENERALIZED_TIME) => p.read_tlv()?,
        Some(_) => return Err(p.error(ParseCause::UnexpectedTag)),
        None => return Err(p.error(ParseCause::OutOfData)),
    };
    let decoded = if tlv.tag == TAG_UTC_TIME {
        UtcTime::from_der(tlv.encoded).map(|t| t.to_date_time())
    } else {
        GeneralizedTime::from_der(tlv.encoded).map(|t| t.to_date_time())
    };
    decoded.map_err(|_| p.error(ParseCause::InvalidValue))
}

fn parse_uid(p: &mut DerReader<'_>, n: u8) -> Result<RawRange> {
    match p.peek_tag() {
        Some(t) if t == TAG_CONTEXT_SPECIFIC | n || t == TAG_CONTEXT_SPECIFIC | TAG_CONSTRUCTED | n => {
            Ok(p.read_tlv()?.value_range())
        }
        _ => Ok(RawRange::default()),
    }
}

fn parse_basic_constraints(octet: &mut DerReader<'_>) -> Result<(bool, i32)> {
    let mut bc = octet.get_tag(TAG_SEQUENCE)?;
    if bc.is_empty() {
        return Ok((false, 0));
    }
    let ca = if bc.peek_tag() == Some(TAG_INTEGER) {
        bc.get_int()? != 0
    } else {
        bc.get_bool()?
    };
    if bc.is_empty() {
        return Ok((ca, 0));
    }
    let pathlen = bc.get_int()?;
    bc.finish()?;
    let max_pathlen = pathlen
        .checked_add(1)
        .ok_or_else(|| bc.error(ParseCause::InvalidValue))?;
    Ok((ca, max_pathlen))
}

fn parse_extension(frame: &mut Frame, mut ext: DerReader<'_>) -> Result<()> {
    let oid = ext.get_oid()?;
    let critical = if ext.peek_tag() == Some(TAG_BOOLEAN) {
        ext.get_bool()?
    } else {
        false
    };
    let mut octet = ext.get_tag(TAG_OCTET_STRING)?;
    ext.finish()?;

    let ext_type = match ext_type_from_oid(oid) {
        Some(t) => t,
        None if critical => {
            return Err(ext.error(ParseCause::UnsupportedCriticalExtension));
        }
        None => return Ok(()),
    };

    if frame.ext_types.contains(ext_type) {
        return Err(ext.error(ParseCause::DuplicateExtension));
    }
    frame.ext_types |= ext_type;

    match ext_type {
        ExtType::BasicConstraints => {
            let (ca, max_pathlen) = parse_basic_constraints(&mut octet)?;
            octet.finish()?;
            frame.ca_istrue = ca;
            frame.max_pathlen = max_pathlen;
        }
        ExtType::KeyUsage => {
            let bs = octet.get_bitstring()?;
            octet.finish()?;
            if bs.bytes.is_empty() {
                return Err(octet.error(ParseCause::InvalidLength));
            }
            frame.key_usage = bs
                .bytes
                .iter()
                .take(4)
                .enumerate()
                .fold(0, |ku, (i, b)| ku | (u32::from(*b) << (8 * i)));
        }
        ExtType::SubjectAltName => {
            frame.subject_alt_raw = octet.range();
            octet.traverse_sequence_of(
                TagFilter::class(TAG_CONTEXT_SPECIFIC),
                TagFilter::class(TAG_CONTEXT_SPECIFIC),
                |_, _| Ok(()),
            )?;
        }
        ExtType::ExtendedKeyUsage => {
            frame.ext_key_usage_raw = octet.range();
            if octet.is_empty() {
                return Err(octet.error(ParseCause::InvalidLength));
            }
            octet.traverse_sequence_of(TagFilter::exact(TAG_OID), TagFilter::ANY, |_, _| Ok(()))?;
        }
        ExtType::CertificatePolicies => {
            frame.crt_policies_raw = octet.range();
            octet.traverse_sequence_of(
                TagFilter::exact(TAG_SEQUENCE),
                TagFilter::exact(TAG_SEQUENCE),
                |_, mut policy_info| policy_info.get_oid().map(|_| ()),
            )?;
        }
        ExtType::NsCertType => {
            let bs = octet.get_bitstring()?;
            octet.finish()?;
            if bs.bytes.len() != 1 {
                return Err(octet.error(ParseCause::InvalidLength));
            }
            frame.ns_cert_type = bs.bytes[0];
        }
    }
    Ok(())
}

/// Extracts the [`Frame`] of the Certificate at the start of `buf`.
///
/// Bytes following the Certificate are ignored; `frame.raw` tells how many bytes it occupies.
pub fn parse_frame(buf: &[u8]) -> Result<Frame> {
    let mut outer = DerReader::new(buf, ParsePhase::Format);
    let cert = outer.get_tlv(TAG_SEQUENCE)?;
    let mut body = outer.nested(&cert);

    // breadth first: skip over the TBSCertificate, check the outer signature, then descend
    let tbs = body.get_tlv(TAG_SEQUENCE)?;
    body.set_phase(ParsePhase::Algorithm);
    let outer_sig_alg = body.get_tlv(TAG_SEQUENCE)?;
    body.set_phase(ParsePhase::Signature);
    let sig = body.get_bitstring_null()?;
    body.set_phase(ParsePhase::Format);
    body.finish()?;

    let mut p = body.nested(&tbs);
    let version = parse_version(&mut p)?;

    p.set_phase(ParsePhase::Serial);
    let serial = match p.peek_tag() {
        Some(TAG_INTEGER) | Some(0x82) => p.read_tlv()?.value_range(),
        Some(_) => return Err(p.error(ParseCause::UnexpectedTag)),
        None => return Err(p.error(ParseCause::OutOfData)),
    };

    p.set_phase(ParsePhase::Algorithm);
    let inner_sig_alg = p.get_tlv(TAG_SEQUENCE)?;
    let (sig_md, sig_pk) = parse_sig_alg(p.nested(&inner_sig_alg))?;
    if inner_sig_alg.encoded != outer_sig_alg.encoded {
        return Err(p.error(ParseCause::SigMismatch));
    }

    p.set_phase(ParsePhase::Name);
    let issuer = p.get_tlv(TAG_SEQUENCE)?;
    validate_name(issuer.encoded)?;

    p.set_phase(ParsePhase::Date);
    let mut validity = p.get_tag(TAG_SEQUENCE)?;
    let valid_from = parse_time(&mut validity)?;
    let valid_to = parse_time(&mut validity)?;
    validity.finish()?;

    p.set_phase(ParsePhase::Name);
    let subject = p.get_tlv(TAG_SEQUENCE)?;
    validate_name(subject.encoded)?;

    p.set_phase(ParsePhase::PublicKey);
    let pubkey = p.get_tlv(TAG_SEQUENCE)?;

    let mut frame = Frame {
        raw: cert.range(),
        tbs: tbs.range(),
        version,
        serial,
        sig_alg: inner_sig_alg.range(),
        sig_md,
        sig_pk,
        issuer_raw: issuer.range(),
        subject_raw: subject.range(),
        valid_from,
        valid_to,
        pubkey_raw: pubkey.range(),
        issuer_id: RawRange::default(),
        subject_id: RawRange::default(),
        v3_ext: RawRange::default(),
        subject_alt_raw: RawRange::default(),
        ext_key_usage_raw: RawRange::default(),
        crt_policies_raw: RawRange::default(),
        sig: RawRange::new(sig.offset, sig.bytes.len()),
        ext_types: FlagSet::default(),
        ca_istrue: false,
        max_pathlen: 0,
        key_usage: 0,
        ns_cert_type: 0,
    };

    p.set_phase(ParsePhase::Format);
    if version >= 2 {
        frame.issuer_id = parse_uid(&mut p, 1)?;
        frame.subject_id = parse_uid(&mut p, 2)?;
    }

    let extensions_allowed = version == 3 || cfg!(feature = "allow_extensions_non_v3");
    if extensions_allowed && !p.is_empty() {
        p.set_phase(ParsePhase::Extensions);
        let wrapper = p.get_tlv(TAG_CONTEXT_SPECIFIC | TAG_CONSTRUCTED | 3)?;
        if wrapper.value.is_empty() {
            return Err(p.error(ParseCause::OutOfData));
        }
        frame.v3_ext = wrapper.value_range();
        let mut exts = p.nested(&wrapper);
        exts.traverse_sequence_of(TagFilter::exact(TAG_SEQUENCE), TagFilter::ANY, |_, ext| {
            parse_extension(&mut frame, ext)
        })?;
    }

    p.set_phase(ParsePhase::Format);
    p.finish()?;
    Ok(frame)
}

#[test]
fn frame_of_end_entity() {
    let enc = include_bytes!("../../tests/examples/ee_rsa.der");
    let frame = parse_frame(enc).unwrap();
    assert_eq!(frame.raw, RawRange::new(0, enc.len()));
    assert_eq!(frame.version, 3);
    assert_eq!(frame.serial.slice(enc), &[0x10, 0x01]);
    assert_eq!(frame.sig_md, MdAlg::Sha256);
    assert_eq!(frame.sig_pk, PkAlg::Rsa);
    assert!(!frame.ca_istrue);
    assert_eq!(frame.max_pathlen, 0);
    assert_eq!(frame.key_usage, KU_DIGITAL_SIGNATURE | KU_KEY_ENCIPHERMENT);
    assert_eq!(frame.ns_cert_type, NS_CERT_TYPE_SSL_SERVER);
    assert!(frame.has_ext(ExtType::BasicConstraints));
    assert!(frame.has_ext(ExtType::SubjectAltName));
    assert!(frame.has_ext(ExtType::ExtendedKeyUsage));
    assert!(frame.has_ext(ExtType::CertificatePolicies));
    assert!(frame.issuer_id.is_empty());
    assert_eq!(frame.sig.len, 256);
    assert_eq!(frame.tbs.offset, 4);
    assert_eq!(frame.valid_from.year(), 2020);
    assert_eq!(frame.valid_to.year(), 2099);
}

#[test]
fn frame_of_constrained_ca() {
    let enc = include_bytes!("../../tests/examples/int_rsa.der");
    let frame = parse_frame(enc).unwrap();
    assert!(frame.ca_istrue);
    assert_eq!(frame.max_pathlen, 1);
    assert_eq!(frame.key_usage, KU_KEY_CERT_SIGN | KU_CRL_SIGN);
    assert!(!frame.has_ext(ExtType::SubjectAltName));
    assert!(frame.check_key_usage(KU_KEY_CERT_SIGN));
    assert!(frame.check_key_usage(KU_KEY_CERT_SIGN | KU_CRL_SIGN));
    assert!(!frame.check_key_usage(KU_DIGITAL_SIGNATURE));
    assert!(!frame.check_key_usage(KU_CRL_SIGN | KU_DIGITAL_SIGNATURE));
}

#[test]
fn key_usage_may_bits() {
    let mut frame = parse_frame(include_bytes!("../../tests/examples/ee_rsa.der")).unwrap();
    assert!(frame.check_key_usage(KU_DIGITAL_SIGNATURE));
    assert!(frame.check_key_usage(KU_DIGITAL_SIGNATURE | KU_ENCIPHER_ONLY));

    frame.key_usage |= KU_DECIPHER_ONLY;
    assert!(!frame.check_key_usage(KU_DIGITAL_SIGNATURE));
    assert!(frame.check_key_usage(KU_DIGITAL_SIGNATURE | KU_DECIPHER_ONLY));

    frame.ext_types = FlagSet::default();
    assert!(frame.check_key_usage(KU_KEY_CERT_SIGN));
}

#[test]
fn trailing_bytes_ignored() {
    let mut enc = include_bytes!("../../tests/examples/root_rsa.der").to_vec();
    let len = enc.len();
    enc.extend_from_slice(&[0xde, 0xad]);
    assert_eq!(parse_frame(&enc).unwrap().raw.len, len);
}

#[test]
fn v1_frame() {
    let enc = include_bytes!("../../tests/examples/v1_root.der");
    let frame = parse_frame(enc).unwrap();
    assert_eq!(frame.version, 1);
    assert!(frame.ext_types.is_empty());
    assert!(frame.v3_ext.is_empty());
}

#[test]
fn extension_value_with_trailing_bytes() {
    use crate::util::error::Error;

    let enc = include_bytes!("../../tests/examples/int_rsa.der");
    let decode = |ext: &[u8]| {
        let mut frame = parse_frame(enc).unwrap();
        frame.ext_types = FlagSet::default();
        parse_extension(&mut frame, DerReader::new(ext, ParsePhase::Extensions)).map(|_| frame)
    };
    let mismatch = Err(Error::parse(ParsePhase::Extensions, ParseCause::LengthMismatch));

    // basicConstraints
    let frame = decode(&[0x06, 0x03, 0x55, 0x1d, 0x13, 0x04, 0x02, 0x30, 0x00]).unwrap();
    assert!(!frame.ca_istrue);
    assert_eq!(
        decode(&[0x06, 0x03, 0x55, 0x1d, 0x13, 0x04, 0x04, 0x30, 0x00, 0x05, 0x00]).map(|_| ()),
        mismatch
    );
    assert_eq!(
        decode(&[
            0x06, 0x03, 0x55, 0x1d, 0x13, 0x04, 0x07, 0x30, 0x03, 0x01, 0x01, 0xff, 0x05, 0x00
        ])
        .map(|_| ()),
        mismatch
    );

    // keyUsage
    let frame = decode(&[0x06, 0x03, 0x55, 0x1d, 0x0f, 0x04, 0x04, 0x03, 0x02, 0x05, 0xa0]).unwrap();
    assert_eq!(frame.key_usage, 0xa0);
    assert_eq!(
        decode(&[0x06, 0x03, 0x55, 0x1d, 0x0f, 0x04, 0x06, 0x03, 0x02, 0x05, 0xa0, 0x05, 0x00])
            .map(|_| ()),
        mismatch
    );

    // nsCertType
    let ns_oid = [0x06u8, 0x09, 0x60, 0x86, 0x48, 0x01, 0x86, 0xf8, 0x42, 0x01, 0x01];
    let frame = decode(&[&ns_oid[..], &[0x04, 0x04, 0x03, 0x02, 0x06, 0x40][..]].concat()).unwrap();
    assert_eq!(frame.ns_cert_type, NS_CERT_TYPE_SSL_SERVER);
    assert_eq!(
        decode(&[&ns_oid[..], &[0x04, 0x06, 0x03, 0x02, 0x06, 0x40, 0x05, 0x00][..]].concat())
            .map(|_| ()),
        mismatch
    );
}
