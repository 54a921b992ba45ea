//! Certificates held as raw DER plus a lazily populated cache, and ordered chains of them

use alloc::borrow::Cow;
use alloc::string::String;
use alloc::vec::Vec;
use core::ops::Index;
use core::slice::Iter;

use der::{asn1::ObjectIdentifier, Decode};
use log::debug;
use x509_cert::name::Name;

use crate::util::error::{Error, Result};
use crate::x509::cache::{CertCache, FrameGuard, PkGuard};
use crate::x509::extensions::{crt_policies, ext_key_usage, subject_alt_names, SequenceItem};
use crate::x509::frame::{parse_frame, Frame, RawRange};
use crate::x509::pk::PublicKey;

const PEM_BEGIN: &str = "-----BEGIN CERTIFICATE-----";
const PEM_END: &str = "-----END CERTIFICATE-----";

/// [`CachedCert`] pairs the immutable DER encoding of one certificate with a [`CertCache`] of
/// its decoded [`Frame`] and [`PublicKey`]. The encoding is either owned or borrowed from the
/// caller for `'a`.
#[derive(Clone, Debug)]
pub struct CachedCert<'a> {
    raw: Cow<'a, [u8]>,
    pk_raw: RawRange,
    cache: CertCache,
    /// Optional locator, e.g., the name of the file the certificate was read from
    pub locator: Option<String>,
}

impl<'a> CachedCert<'a> {
    fn from_cow(buf: Cow<'a, [u8]>) -> Result<Self> {
        let frame = parse_frame(&buf)?;
        // the key must decode now even though it is not cached until first use
        PublicKey::from_spki_der(frame.pubkey_raw.slice(&buf))?;
        let raw = match buf {
            Cow::Borrowed(b) => Cow::Borrowed(frame.raw.slice(b)),
            Cow::Owned(mut v) => {
                v.truncate(frame.raw.len);
                Cow::Owned(v)
            }
        };
        Ok(CachedCert {
            raw,
            pk_raw: frame.pubkey_raw,
            cache: CertCache::new(),
            locator: None,
        })
    }

    /// Parses the certificate at the start of `buf`, copying it.
    pub fn from_der(buf: &[u8]) -> Result<Self> {
        Self::from_cow(Cow::Owned(buf.to_vec()))
    }

    /// Parses the certificate at the start of `buf` without copying it.
    pub fn from_der_nocopy(buf: &'a [u8]) -> Result<Self> {
        Self::from_cow(Cow::Borrowed(buf))
    }

    /// The cache of this certificate.
    pub fn cache(&self) -> &CertCache {
        &self.cache
    }

    /// Returns a guard on the decoded frame.
    pub fn frame(&self) -> Result<FrameGuard<'_>> {
        self.cache.acquire_frame(&self.raw)
    }

    /// Returns a guard on the decoded public key.
    pub fn pk(&self) -> Result<PkGuard<'_>> {
        self.cache.acquire_pk(self.pk_raw.slice(&self.raw))
    }

    /// Returns a copy of the decoded frame.
    pub fn get_frame(&self) -> Result<Frame> {
        Ok(*self.frame()?)
    }

    /// Returns a copy of the decoded public key.
    pub fn get_pk(&self) -> Result<PublicKey> {
        Ok(self.pk()?.clone())
    }

    /// Drops everything cached for this certificate.
    pub fn flush_cache(&self) -> Result<()> {
        self.cache.flush_all()
    }

    fn view(&self, range: impl FnOnce(&Frame) -> RawRange) -> Result<&[u8]> {
        let r = range(&*self.frame()?);
        Ok(r.slice(&self.raw))
    }

    /// The DER encoding of the certificate.
    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    /// The encoded TBSCertificate.
    pub fn tbs(&self) -> Result<&[u8]> {
        self.view(|f| f.tbs)
    }

    /// Value octets of the serial number.
    pub fn serial(&self) -> Result<&[u8]> {
        self.view(|f| f.serial)
    }

    /// The encoded subject Name.
    pub fn subject_raw(&self) -> Result<&[u8]> {
        self.view(|f| f.subject_raw)
    }

    /// The encoded issuer Name.
    pub fn issuer_raw(&self) -> Result<&[u8]> {
        self.view(|f| f.issuer_raw)
    }

    /// The encoded SubjectPublicKeyInfo.
    pub fn pk_raw(&self) -> &[u8] {
        self.pk_raw.slice(&self.raw)
    }

    /// The signature value.
    pub fn signature(&self) -> Result<&[u8]> {
        self.view(|f| f.sig)
    }

    /// Decodes the subject Name.
    pub fn get_subject(&self) -> Result<Name> {
        Ok(Name::from_der(self.subject_raw()?)?)
    }

    /// Decodes the issuer Name.
    pub fn get_issuer(&self) -> Result<Name> {
        Ok(Name::from_der(self.issuer_raw()?)?)
    }

    /// Returns the subjectAltName entries.
    pub fn get_subject_alt_names(&self) -> Result<Vec<SequenceItem>> {
        let frame = self.get_frame()?;
        subject_alt_names(&self.raw, &frame)
    }

    /// Returns the extKeyUsage purposes.
    pub fn get_ext_key_usage(&self) -> Result<Vec<ObjectIdentifier>> {
        let frame = self.get_frame()?;
        ext_key_usage(&self.raw, &frame)
    }

    /// Returns the certificatePolicies identifiers.
    pub fn get_crt_policies(&self) -> Result<Vec<ObjectIdentifier>> {
        let frame = self.get_frame()?;
        crt_policies(&self.raw, &frame)
    }
}

/// An ordered list of certificates, in the order they were added. As the input to verification,
/// the first certificate is the end entity and the rest are candidate intermediates; as a trust
/// store, every certificate is a trust anchor.
#[derive(Clone, Debug, Default)]
pub struct CertificateChain<'a> {
    certs: Vec<CachedCert<'a>>,
}

impl<'a> CertificateChain<'a> {
    /// Creates an empty chain.
    pub fn new() -> Self {
        CertificateChain::default()
    }

    /// Appends an already parsed certificate.
    pub fn push(&mut self, cert: CachedCert<'a>) {
        self.certs.push(cert);
    }

    /// Parses one DER certificate from `buf`, copying it, and appends it. The chain is unchanged
    /// on failure.
    pub fn parse_der(&mut self, buf: &[u8]) -> Result<()> {
        let cert = CachedCert::from_der(buf)?;
        self.certs.push(cert);
        Ok(())
    }

    /// Parses one DER certificate from `buf`, borrowing it, and appends it. The chain is
    /// unchanged on failure.
    pub fn parse_der_nocopy(&mut self, buf: &'a [u8]) -> Result<()> {
        let cert = CachedCert::from_der_nocopy(buf)?;
        self.certs.push(cert);
        Ok(())
    }

    /// Parses either a single DER certificate or a bundle of PEM certificates.
    ///
    /// For a PEM bundle every `CERTIFICATE` block is tried; blocks that fail to decode or parse
    /// are skipped. Returns the number of skipped blocks if at least one certificate was added,
    /// otherwise the error of the first failed block.
    pub fn parse(&mut self, buf: &[u8]) -> Result<usize> {
        let text = match core::str::from_utf8(buf) {
            Ok(t) if t.contains(PEM_BEGIN) => t,
            _ => return self.parse_der(buf).map(|_| 0),
        };

        let mut added = 0;
        let mut failed = 0;
        let mut first_error = None;
        let mut rest = text;
        while let Some(begin) = rest.find(PEM_BEGIN) {
            let end = match rest[begin..].find(PEM_END) {
                Some(e) => begin + e + PEM_END.len(),
                None => break,
            };
            let block = &rest[begin..end];
            rest = &rest[end..];

            let r = pem_rfc7468::decode_vec(block.as_bytes())
                .map_err(Error::from)
                .and_then(|(_, der)| self.parse_der(&der));
            match r {
                Ok(()) => added += 1,
                Err(e) => {
                    debug!("Skipped PEM certificate block: {}", e);
                    failed += 1;
                    if first_error.is_none() {
                        first_error = Some(e);
                    }
                }
            }
        }

        if added > 0 {
            Ok(failed)
        } else {
            Err(first_error.unwrap_or(Error::CertUnknownFormat))
        }
    }

    /// Number of certificates.
    pub fn len(&self) -> usize {
        self.certs.len()
    }

    /// True if the chain holds no certificates.
    pub fn is_empty(&self) -> bool {
        self.certs.is_empty()
    }

    /// Certificate at `index`.
    pub fn get(&self, index: usize) -> Option<&CachedCert<'a>> {
        self.certs.get(index)
    }

    /// Iterates the certificates in order.
    pub fn iter(&self) -> Iter<'_, CachedCert<'a>> {
        self.certs.iter()
    }

    /// The certificates as a slice.
    pub fn as_slice(&self) -> &[CachedCert<'a>] {
        &self.certs
    }

    /// Sets the locator of the most recently added `count` certificates.
    pub(crate) fn set_locator(&mut self, count: usize, locator: &str) {
        let start = self.certs.len().saturating_sub(count);
        for cert in &mut self.certs[start..] {
            cert.locator = Some(locator.into());
        }
    }
}

impl<'a> Index<usize> for CertificateChain<'a> {
    type Output = CachedCert<'a>;

    fn index(&self, index: usize) -> &CachedCert<'a> {
        &self.certs[index]
    }
}

impl<'a, 'b> IntoIterator for &'b CertificateChain<'a> {
    type Item = &'b CachedCert<'a>;
    type IntoIter = Iter<'b, CachedCert<'a>>;

    fn into_iter(self) -> Self::IntoIter {
        self.certs.iter()
    }
}

#[test]
fn cached_cert_accessors() {
    use crate::x509::pk::PkAlg;
    use hex_literal::hex;

    let enc = include_bytes!("../../tests/examples/ee_rsa.der");
    let cert = CachedCert::from_der_nocopy(enc).unwrap();
    assert!(!cert.cache().has_frame().unwrap());
    assert!(!cert.cache().has_pk().unwrap());

    assert_eq!(cert.raw(), &enc[..]);
    assert_eq!(cert.serial().unwrap(), hex!("1001"));
    assert_eq!(cert.signature().unwrap().len(), 256);
    assert_eq!(cert.tbs().unwrap()[0], 0x30);
    assert!(cert.cache().has_frame().unwrap());

    let subject = cert.get_subject().unwrap();
    assert!(subject.to_string().contains("CN=ee.example.com"));
    let issuer = cert.get_issuer().unwrap();
    assert!(issuer.to_string().contains("Intermediate"));

    assert_eq!(cert.get_subject_alt_names().unwrap().len(), 4);
    assert_eq!(cert.get_ext_key_usage().unwrap().len(), 1);
    assert_eq!(cert.get_crt_policies().unwrap().len(), 2);

    let pk = cert.get_pk().unwrap();
    assert_eq!(pk.pk_type(), PkAlg::Rsa);
    assert_eq!(pk.bit_len(), 2048);
    assert!(cert.cache().has_pk().unwrap());

    cert.flush_cache().unwrap();
    assert!(!cert.cache().has_frame().unwrap());
    assert_eq!(cert.get_frame().unwrap().version, 3);
}

#[test]
fn chain_parse_der() {
    let mut chain = CertificateChain::new();
    let mut enc = include_bytes!("../../tests/examples/root_rsa.der").to_vec();
    let len = enc.len();
    enc.extend_from_slice(b"trailing");
    chain.parse_der(&enc).unwrap();
    assert_eq!(chain[0].raw().len(), len);

    assert!(chain.parse_der(&enc[..len - 1]).is_err());
    assert!(chain
        .parse_der(include_bytes!("../../tests/examples/ee_dup_ext.der"))
        .is_err());
    assert_eq!(chain.len(), 1);

    chain
        .parse_der_nocopy(include_bytes!("../../tests/examples/int_rsa.der"))
        .unwrap();
    assert_eq!(chain.len(), 2);
    assert_eq!(chain.iter().count(), 2);
}

#[test]
fn chain_parse_pem() {
    let mut chain = CertificateChain::new();
    let pem = include_bytes!("../../tests/examples/root_rsa.pem");
    assert_eq!(chain.parse(pem).unwrap(), 0);
    assert_eq!(chain.len(), 1);
    assert_eq!(
        chain[0].raw(),
        &include_bytes!("../../tests/examples/root_rsa.der")[..]
    );

    // one good block, one that does not decode
    let mut bundle = String::from_utf8(pem.to_vec()).unwrap();
    bundle.push_str("-----BEGIN CERTIFICATE-----\nAAAA\n-----END CERTIFICATE-----\n");
    assert_eq!(chain.parse(bundle.as_bytes()).unwrap(), 1);
    assert_eq!(chain.len(), 2);

    let bad = "-----BEGIN CERTIFICATE-----\nMAA=\n-----END CERTIFICATE-----\n";
    assert!(chain.parse(bad.as_bytes()).is_err());
    assert_eq!(chain.len(), 2);

    assert!(chain.parse(b"junk").is_err());
    assert_eq!(chain.len(), 2);
}
