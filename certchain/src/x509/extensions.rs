//! On-demand expansion of the extension ranges recorded in a [`Frame`]

use alloc::vec::Vec;

use der::asn1::ObjectIdentifier;

use crate::asn1::reader::*;
use crate::util::error::{Error, ParseCause, ParsePhase, Result};
use crate::x509::frame::{ExtType, Frame, RawRange};

/// One element of a SEQUENCE OF, e.g., a GeneralName from subjectAltName.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SequenceItem {
    /// Tag of the element
    pub tag: u8,
    /// Value octets of the element
    pub value: Vec<u8>,
}

impl SequenceItem {
    /// GeneralName dNSName tag
    pub const DNS_NAME: u8 = TAG_CONTEXT_SPECIFIC | 2;
    /// GeneralName rfc822Name tag
    pub const RFC822_NAME: u8 = TAG_CONTEXT_SPECIFIC | 1;
    /// GeneralName iPAddress tag
    pub const IP_ADDRESS: u8 = TAG_CONTEXT_SPECIFIC | 7;
}

fn ext_reader<'a>(raw: &'a [u8], range: RawRange) -> DerReader<'a> {
    DerReader::with_base(range.slice(raw), range.offset, ParsePhase::Extensions)
}

fn to_oid(encoded: &[u8]) -> Result<ObjectIdentifier> {
    ObjectIdentifier::from_bytes(encoded)
        .map_err(|_| Error::parse(ParsePhase::Extensions, ParseCause::InvalidValue))
}

/// Returns the GeneralName entries of the subjectAltName extension. Empty if the extension is
/// absent.
pub fn subject_alt_names(raw: &[u8], frame: &Frame) -> Result<Vec<SequenceItem>> {
    let mut names = Vec::new();
    if !frame.has_ext(ExtType::SubjectAltName) {
        return Ok(names);
    }
    ext_reader(raw, frame.subject_alt_raw).traverse_sequence_of(
        TagFilter::class(TAG_CONTEXT_SPECIFIC),
        TagFilter::ANY,
        |tag, value| {
            names.push(SequenceItem {
                tag,
                value: value.remaining().to_vec(),
            });
            Ok(())
        },
    )?;
    Ok(names)
}

/// Returns the KeyPurposeIds of the extKeyUsage extension. Empty if the extension is absent.
pub fn ext_key_usage(raw: &[u8], frame: &Frame) -> Result<Vec<ObjectIdentifier>> {
    let mut purposes = Vec::new();
    if !frame.has_ext(ExtType::ExtendedKeyUsage) {
        return Ok(purposes);
    }
    ext_reader(raw, frame.ext_key_usage_raw).traverse_sequence_of(
        TagFilter::exact(TAG_OID),
        TagFilter::ANY,
        |_, value| {
            purposes.push(to_oid(value.remaining())?);
            Ok(())
        },
    )?;
    Ok(purposes)
}

/// Returns the policy identifiers of the certificatePolicies extension, skipping any policy
/// qualifiers. Empty if the extension is absent.
pub fn crt_policies(raw: &[u8], frame: &Frame) -> Result<Vec<ObjectIdentifier>> {
    let mut policies = Vec::new();
    if !frame.has_ext(ExtType::CertificatePolicies) {
        return Ok(policies);
    }
    ext_reader(raw, frame.crt_policies_raw).traverse_sequence_of(
        TagFilter::exact(TAG_SEQUENCE),
        TagFilter::exact(TAG_SEQUENCE),
        |_, mut policy_info| {
            let oid = policy_info.get_oid()?;
            if !policy_info.is_empty() {
                policy_info.get_tlv(TAG_SEQUENCE)?;
                policy_info.finish()?;
            }
            policies.push(to_oid(oid)?);
            Ok(())
        },
    )?;
    Ok(policies)
}
