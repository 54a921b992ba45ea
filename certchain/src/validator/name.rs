//! Distinguished name comparison and host name matching over raw DER names

use crate::asn1::oids::PKIX_AT_COMMON_NAME;
use crate::asn1::reader::*;
use crate::util::error::{ParseCause, ParsePhase, Result};
use crate::x509::frame::{ExtType, Frame};

/// One AttributeTypeAndValue of a Name.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Ava<'a> {
    /// Encoded attribute type OID
    pub oid: &'a [u8],
    /// Tag of the attribute value
    pub tag: u8,
    /// Value octets
    pub value: &'a [u8],
    /// True if another attribute of the same RelativeDistinguishedName follows
    pub next_merged: bool,
}

/// Walks the attributes of a DER-encoded Name in order.
pub struct AvaIter<'a> {
    rdns: DerReader<'a>,
    set: DerReader<'a>,
}

impl<'a> AvaIter<'a> {
    /// Starts a walk over `raw`, a complete Name TLV.
    pub fn new(raw: &'a [u8]) -> Result<Self> {
        let mut r = DerReader::new(raw, ParsePhase::Name);
        let rdns = r.get_tag(TAG_SEQUENCE)?;
        r.finish()?;
        Ok(AvaIter {
            rdns,
            set: DerReader::new(&[], ParsePhase::Name),
        })
    }

    /// Returns the next attribute, `None` at the end of the name.
    pub fn next_ava(&mut self) -> Result<Option<Ava<'a>>> {
        if self.set.is_empty() {
            if self.rdns.is_empty() {
                return Ok(None);
            }
            self.set = self.rdns.get_tag(TAG_SET)?;
            if self.set.is_empty() {
                return Err(self.set.error(ParseCause::InvalidLength));
            }
        }
        let mut atv = self.set.get_tag(TAG_SEQUENCE)?;
        let oid = atv.get_oid()?;
        let value = atv.read_tlv()?;
        atv.finish()?;
        Ok(Some(Ava {
            oid,
            tag: value.tag,
            value: value.value,
            next_merged: !self.set.is_empty(),
        }))
    }
}

/// Checks that `raw` is a well-formed Name.
pub fn validate_name(raw: &[u8]) -> Result<()> {
    let mut it = AvaIter::new(raw)?;
    while it.next_ava()?.is_some() {}
    Ok(())
}

fn string_eq(a: &Ava<'_>, b: &Ava<'_>) -> bool {
    if a.tag == b.tag && a.value == b.value {
        return true;
    }
    let textual = |t| t == TAG_UTF8_STRING || t == TAG_PRINTABLE_STRING;
    textual(a.tag) && textual(b.tag) && a.value.eq_ignore_ascii_case(b.value)
}

/// Compares two raw Names.
///
/// Names are equal when they hold the same attribute types in the same RDN structure and each
/// pair of values is either byte-identical with the same tag, or UTF8String/PrintableString
/// values that match ignoring ASCII case.
pub fn name_cmp_raw(a: &[u8], b: &[u8]) -> Result<bool> {
    let mut ia = AvaIter::new(a)?;
    let mut ib = AvaIter::new(b)?;
    loop {
        match (ia.next_ava()?, ib.next_ava()?) {
            (None, None) => return Ok(true),
            (Some(x), Some(y)) => {
                if x.oid != y.oid || !string_eq(&x, &y) || x.next_merged != y.next_merged {
                    return Ok(false);
                }
            }
            _ => return Ok(false),
        }
    }
}

/// True if both raw Names decode and compare equal.
pub fn names_match(a: &[u8], b: &[u8]) -> bool {
    matches!(name_cmp_raw(a, b), Ok(true))
}

/// True if `pattern` is a `*.` wildcard that covers `host`: the text after `*` must equal,
/// ignoring ASCII case, the part of `host` from its first dot onwards.
pub fn check_wildcard(host: &[u8], pattern: &[u8]) -> bool {
    if pattern.len() < 3 || pattern[0] != b'*' || pattern[1] != b'.' {
        return false;
    }
    match host.iter().position(|c| *c == b'.') {
        Some(idx) if idx > 0 => pattern[1..].eq_ignore_ascii_case(&host[idx..]),
        _ => false,
    }
}

/// True if `candidate`, a CN or dNSName value, matches `host` exactly (ignoring ASCII case) or as
/// a wildcard.
pub fn check_cn(candidate: &[u8], host: &[u8]) -> bool {
    candidate.eq_ignore_ascii_case(host) || check_wildcard(host, candidate)
}

/// Matches `host` against a certificate's names.
///
/// When the certificate has a subjectAltName extension only its dNSName entries are consulted;
/// otherwise the commonName attributes of the subject are.
pub fn verify_name(raw: &[u8], frame: &Frame, host: &str) -> Result<bool> {
    let host = host.as_bytes();
    if frame.has_ext(ExtType::SubjectAltName) {
        let mut found = false;
        let mut san = DerReader::with_base(
            frame.subject_alt_raw.slice(raw),
            frame.subject_alt_raw.offset,
            ParsePhase::Extensions,
        );
        san.traverse_sequence_of(
            TagFilter::class(TAG_CONTEXT_SPECIFIC),
            TagFilter::new(0x1F, 2),
            |_, dns_name| {
                found |= check_cn(dns_name.remaining(), host);
                Ok(())
            },
        )?;
        Ok(found)
    } else {
        let mut it = AvaIter::new(frame.subject_raw.slice(raw))?;
        while let Some(ava) = it.next_ava()? {
            if ava.oid == PKIX_AT_COMMON_NAME.as_bytes() && check_cn(ava.value, host) {
                return Ok(true);
            }
        }
        Ok(false)
    }
}
