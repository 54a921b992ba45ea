//! CRL decoding and the revocation check performed for each child/issuer pair of a chain
//!
//! Only complete, direct CRLs are understood: delta CRLs, indirect CRLs and issuing distribution
//! points are not interpreted. CRL and entry extensions are checked for structure and otherwise
//! ignored.

use alloc::vec::Vec;

use der::DateTime;
use log::{debug, info};

use crate::asn1::reader::*;
use crate::util::crypto::{calculate_hash, MdAlg};
use crate::util::error::{Error, ParseCause, ParsePhase, Result};
use crate::util::time_of_interest::TimeOfInterest;
use crate::validator::flags::{VerifyFlag, VerifyFlags};
use crate::validator::name::{names_match, validate_name};
use crate::validator::profile::Profile;
use crate::x509::certificate::CachedCert;
use crate::x509::frame::{parse_sig_alg, parse_time, RawRange, KU_CRL_SIGN};
use crate::x509::pk::PkAlg;

const PEM_LABEL: &str = "X509 CRL";
const PEM_BEGIN: &str = "-----BEGIN X509 CRL-----";

/// One revokedCertificates entry.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CrlEntry {
    /// Value octets of the serial number
    pub serial: Vec<u8>,
    /// Date from which the certificate is revoked
    pub revocation_date: DateTime,
}

/// A decoded CertificateList.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Crl {
    raw: Vec<u8>,
    tbs: RawRange,
    issuer_raw: RawRange,
    sig: RawRange,
    /// 1 or 2
    pub version: u8,
    /// Signature hash algorithm
    pub sig_md: MdAlg,
    /// Signature public key algorithm
    pub sig_pk: PkAlg,
    /// thisUpdate
    pub this_update: DateTime,
    /// nextUpdate, if present
    pub next_update: Option<DateTime>,
    /// Revoked certificates, in encoding order
    pub entries: Vec<CrlEntry>,
}

fn skip_extensions(p: &mut DerReader<'_>, tag: u8) -> Result<()> {
    let mut wrapper = match p.get_optional(tag)? {
        Some(w) => w,
        None => return Ok(()),
    };
    // [0] EXPLICIT wraps the SEQUENCE for crlExtensions; entry extensions are bare
    let mut exts = if tag == TAG_SEQUENCE {
        wrapper
    } else {
        let inner = wrapper.get_tag(TAG_SEQUENCE)?;
        wrapper.finish()?;
        inner
    };
    while !exts.is_empty() {
        let mut ext = exts.get_tag(TAG_SEQUENCE)?;
        ext.get_oid()?;
        if ext.peek_tag() == Some(TAG_BOOLEAN) {
            ext.get_bool()?;
        }
        ext.get_tlv(TAG_OCTET_STRING)?;
        ext.finish()?;
    }
    Ok(())
}

fn parse_entry(mut entry: DerReader<'_>, version: u8) -> Result<CrlEntry> {
    let serial = match entry.peek_tag() {
        Some(TAG_INTEGER) => entry.read_tlv()?.value.to_vec(),
        Some(_) => return Err(entry.error(ParseCause::UnexpectedTag)),
        None => return Err(entry.error(ParseCause::OutOfData)),
    };
    let revocation_date = parse_time(&mut entry)?;
    if version == 2 {
        skip_extensions(&mut entry, TAG_SEQUENCE)?;
    }
    entry.finish()?;
    Ok(CrlEntry {
        serial,
        revocation_date,
    })
}

impl Crl {
    /// Decodes the DER CertificateList at the start of `buf`; trailing bytes are ignored.
    pub fn from_der(buf: &[u8]) -> Result<Self> {
        let mut outer = DerReader::new(buf, ParsePhase::Crl);
        let list = outer.get_tlv(TAG_SEQUENCE)?;
        let raw = list.encoded.to_vec();

        let mut whole = DerReader::new(&raw, ParsePhase::Crl);
        let mut body = whole.get_tag(TAG_SEQUENCE)?;
        let tbs = body.get_tlv(TAG_SEQUENCE)?;
        let outer_sig_alg = body.get_tlv(TAG_SEQUENCE)?;
        let sig = body.get_bitstring_null()?;
        body.finish()?;

        let mut p = body.nested(&tbs);
        let version = match p.peek_tag() {
            Some(TAG_INTEGER) => {
                let v = p.get_int()?;
                if v != 1 {
                    return Err(p.error(ParseCause::InvalidValue));
                }
                2
            }
            _ => 1,
        };

        let inner_sig_alg = p.get_tlv(TAG_SEQUENCE)?;
        let (sig_md, sig_pk) = parse_sig_alg(p.nested(&inner_sig_alg))?;
        if inner_sig_alg.encoded != outer_sig_alg.encoded {
            return Err(p.error(ParseCause::SigMismatch));
        }

        let issuer = p.get_tlv(TAG_SEQUENCE)?;
        validate_name(issuer.encoded)?;

        let this_update = parse_time(&mut p)?;
        let next_update = match p.peek_tag() {
            Some(TAG_UTC_TIME) | Some(TAG_GENERALIZED_TIME) => Some(parse_time(&mut p)?),
            _ => None,
        };

        let mut entries = Vec::new();
        if let Some(mut revoked) = p.get_optional(TAG_SEQUENCE)? {
            while !revoked.is_empty() {
                let entry = revoked.get_tag(TAG_SEQUENCE)?;
                entries.push(parse_entry(entry, version)?);
            }
        }

        if version == 2 {
            skip_extensions(&mut p, TAG_CONTEXT_SPECIFIC | TAG_CONSTRUCTED)?;
        }
        p.finish()?;

        let (tbs, issuer_raw) = (tbs.range(), issuer.range());
        let sig = RawRange::new(sig.offset, sig.bytes.len());
        Ok(Crl {
            raw,
            tbs,
            issuer_raw,
            sig,
            version,
            sig_md,
            sig_pk,
            this_update,
            next_update,
            entries,
        })
    }

    /// The DER encoding of the CRL.
    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    /// The encoded TBSCertList.
    pub fn tbs(&self) -> &[u8] {
        self.tbs.slice(&self.raw)
    }

    /// The encoded issuer Name.
    pub fn issuer_raw(&self) -> &[u8] {
        self.issuer_raw.slice(&self.raw)
    }

    /// The signature value.
    pub fn signature(&self) -> &[u8] {
        self.sig.slice(&self.raw)
    }

    /// True if `serial` (INTEGER value octets) is listed with a revocation date before `toi`.
    pub fn is_serial_revoked(&self, serial: &[u8], toi: &TimeOfInterest) -> bool {
        self.entries
            .iter()
            .any(|e| e.serial == serial && toi.is_past(&e.revocation_date))
    }
}

/// Decodes either one DER CRL or every `X509 CRL` block of a PEM bundle. Any block that fails to
/// decode fails the whole call.
pub fn parse_crls(buf: &[u8]) -> Result<Vec<Crl>> {
    let text = match core::str::from_utf8(buf) {
        Ok(t) if t.contains(PEM_BEGIN) => t,
        _ => return Ok(alloc::vec![Crl::from_der(buf)?]),
    };

    let mut crls = Vec::new();
    let mut rest = text;
    while let Some(begin) = rest.find(PEM_BEGIN) {
        let end_marker = "-----END X509 CRL-----";
        let end = match rest[begin..].find(end_marker) {
            Some(e) => begin + e + end_marker.len(),
            None => return Err(Error::BadInputData),
        };
        let (label, der) = pem_rfc7468::decode_vec(rest[begin..end].as_bytes())?;
        if label != PEM_LABEL {
            return Err(Error::BadInputData);
        }
        crls.push(Crl::from_der(&der)?);
        rest = &rest[end..];
    }
    Ok(crls)
}

/// True if `cert` is listed on `crl` with a revocation date in the past.
pub fn is_revoked(cert: &CachedCert<'_>, crl: &Crl) -> Result<bool> {
    let toi = TimeOfInterest::now()?;
    Ok(crl.is_serial_revoked(cert.serial()?, &toi))
}

/// Checks the certificate with serial number `serial` against every CRL in `crls` issued by
/// `ca`.
///
/// Each matching CRL must be signed by `ca`, whose keyUsage (if present) must permit CRL
/// signing, with algorithms and a key acceptable under `profile`. Problems with a CRL are
/// reported with the `BadCrl*` flags; a revoked serial with [`VerifyFlag::Revoked`].
pub fn verify_crl(
    serial: &[u8],
    ca: &CachedCert<'_>,
    crls: &[Crl],
    profile: &Profile,
    toi: &TimeOfInterest,
) -> VerifyFlags {
    let mut flags = VerifyFlags::default();

    let ca_frame = match ca.get_frame() {
        Ok(f) => f,
        Err(_) => return VerifyFlag::BadCrlNotTrusted.into(),
    };
    let ca_subject = ca_frame.subject_raw.slice(ca.raw());
    let can_sign = ca_frame.check_key_usage(KU_CRL_SIGN);

    let pk = match ca.pk() {
        Ok(pk) => pk,
        Err(_) => return VerifyFlag::BadCrlNotTrusted.into(),
    };

    for crl in crls {
        if !names_match(crl.issuer_raw(), ca_subject) {
            continue;
        }

        if !can_sign {
            info!("CRL issuer lacks the cRLSign key usage");
            flags |= VerifyFlag::BadCrlNotTrusted;
            break;
        }

        if !profile.check_md(crl.sig_md) {
            flags |= VerifyFlag::BadCrlBadMd;
        }
        if !profile.check_pk(crl.sig_pk) {
            flags |= VerifyFlag::BadCrlBadPk;
        }

        let hash = calculate_hash(crl.sig_md, crl.tbs());

        if !profile.check_key(&pk) {
            flags |= VerifyFlag::BadKey;
        }

        if !pk.verify(crl.sig_pk, crl.sig_md, &hash, crl.signature()) {
            info!("CRL signature did not verify");
            flags |= VerifyFlag::BadCrlNotTrusted;
            break;
        }

        // a CRL without nextUpdate never counts as current
        match &crl.next_update {
            Some(next) if !toi.is_past(next) => {}
            _ => flags |= VerifyFlag::BadCrlExpired,
        }
        if toi.is_future(&crl.this_update) {
            flags |= VerifyFlag::BadCrlFuture;
        }

        if crl.is_serial_revoked(serial, toi) {
            debug!("Serial {:02x?} is revoked", serial);
            flags |= VerifyFlag::Revoked;
            break;
        }
    }

    flags
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    const CRL_INT: &[u8] = include_bytes!("../../tests/examples/crl_int.der");
    const CRL_INT_EXPIRED: &[u8] = include_bytes!("../../tests/examples/crl_int_expired.der");
    const CRL_INT_FUTURE: &[u8] = include_bytes!("../../tests/examples/crl_int_future.der");
    const CRL_INT_LATER: &[u8] = include_bytes!("../../tests/examples/crl_int_revoked_later.der");
    const INT: &[u8] = include_bytes!("../../tests/examples/int_rsa.der");
    const ROOT: &[u8] = include_bytes!("../../tests/examples/root_rsa.der");
    const EE: &[u8] = include_bytes!("../../tests/examples/ee_rsa.der");

    #[test]
    fn decode_crl() {
        let crl = Crl::from_der(CRL_INT).unwrap();
        assert_eq!(crl.version, 2);
        assert_eq!(crl.sig_md, MdAlg::Sha256);
        assert_eq!(crl.sig_pk, PkAlg::Rsa);
        assert_eq!(crl.entries.len(), 1);
        assert_eq!(crl.entries[0].serial, hex!("1001"));
        assert_eq!(
            crl.this_update,
            DateTime::new(2024, 1, 1, 0, 0, 0).unwrap()
        );
        assert_eq!(
            crl.next_update,
            Some(DateTime::new(2099, 1, 1, 0, 0, 0).unwrap())
        );
        assert_eq!(crl.signature().len(), 256);
        assert_eq!(crl.raw(), CRL_INT);

        let empty = Crl::from_der(CRL_INT_EXPIRED).unwrap();
        assert!(empty.entries.is_empty());

        let mut truncated = CRL_INT.to_vec();
        truncated.truncate(100);
        assert!(Crl::from_der(&truncated).is_err());
    }

    #[test]
    fn revocation_date_matters() {
        let ee = CachedCert::from_der_nocopy(EE).unwrap();
        let crl = Crl::from_der(CRL_INT).unwrap();
        let later = Crl::from_der(CRL_INT_LATER).unwrap();
        assert!(is_revoked(&ee, &crl).unwrap());
        assert!(!is_revoked(&ee, &later).unwrap());

        let in_2023 = TimeOfInterest::from_unix_secs(1_690_000_000).unwrap();
        assert!(!crl.is_serial_revoked(ee.serial().unwrap(), &in_2023));
    }

    #[test]
    fn crl_checks() {
        let now = TimeOfInterest::now().unwrap();
        let profile = Profile::default();
        let int = CachedCert::from_der_nocopy(INT).unwrap();
        let root = CachedCert::from_der_nocopy(ROOT).unwrap();
        let serial = hex!("1001");

        let crls = [Crl::from_der(CRL_INT).unwrap()];
        assert_eq!(
            verify_crl(&serial, &int, &crls, &profile, &now),
            VerifyFlag::Revoked
        );
        // CRLs from other issuers are ignored
        assert!(verify_crl(&serial, &root, &crls, &profile, &now).is_empty());

        let crls = [
            Crl::from_der(CRL_INT_EXPIRED).unwrap(),
            Crl::from_der(CRL_INT_FUTURE).unwrap(),
        ];
        assert_eq!(
            verify_crl(&serial, &int, &crls, &profile, &now),
            VerifyFlag::BadCrlExpired | VerifyFlag::BadCrlFuture
        );

        let mut no_sha256 = Profile::default();
        no_sha256.allowed_mds = MdAlg::Sha384.into();
        let crls = [Crl::from_der(CRL_INT_LATER).unwrap()];
        assert_eq!(
            verify_crl(&serial, &int, &crls, &no_sha256, &now),
            VerifyFlag::BadCrlBadMd
        );
    }

    #[test]
    fn pem_crls() {
        let pem = pem_rfc7468::encode_string(PEM_LABEL, pem_rfc7468::LineEnding::LF, CRL_INT)
            .unwrap();
        let bundle = [pem.as_str(), pem.as_str()].concat();
        assert_eq!(parse_crls(bundle.as_bytes()).unwrap().len(), 2);
        assert_eq!(parse_crls(CRL_INT).unwrap().len(), 1);
        assert!(parse_crls(b"-----BEGIN X509 CRL-----\nAAAA\n-----END X509 CRL-----\n").is_err());
    }
}
