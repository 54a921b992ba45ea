//! Tag/length-checked cursor over DER-encoded data.
//!
//! [`DerReader`] walks a byte range the way the certificate and CRL decoders need it: it never
//! copies, it tracks absolute offsets so that callers can record [`RawRange`] values into the
//! buffer that owns the bytes, and every failure is reported as a [`ParseCause`] tagged with the
//! [`ParsePhase`] the reader was created for. Tag and length octets are decoded by the `der`
//! crate's [`Header`], so only definite, minimally encoded lengths are accepted.

use der::{Decode, Header, Reader, SliceReader};

use crate::util::error::{Error, ParseCause, ParsePhase, Result};
use crate::x509::frame::RawRange;

/// `BOOLEAN`
pub const TAG_BOOLEAN: u8 = 0x01;
/// `INTEGER`
pub const TAG_INTEGER: u8 = 0x02;
/// `BIT STRING`
pub const TAG_BIT_STRING: u8 = 0x03;
/// `OCTET STRING`
pub const TAG_OCTET_STRING: u8 = 0x04;
/// `NULL`
pub const TAG_NULL: u8 = 0x05;
/// `OBJECT IDENTIFIER`
pub const TAG_OID: u8 = 0x06;
/// `UTF8String`
pub const TAG_UTF8_STRING: u8 = 0x0C;
/// `PrintableString`
pub const TAG_PRINTABLE_STRING: u8 = 0x13;
/// `UTCTime`
pub const TAG_UTC_TIME: u8 = 0x17;
/// `GeneralizedTime`
pub const TAG_GENERALIZED_TIME: u8 = 0x18;
/// Constructed bit
pub const TAG_CONSTRUCTED: u8 = 0x20;
/// `SEQUENCE` / `SEQUENCE OF` (constructed)
pub const TAG_SEQUENCE: u8 = 0x30;
/// `SET` / `SET OF` (constructed)
pub const TAG_SET: u8 = 0x31;
/// Context-specific class bits
pub const TAG_CONTEXT_SPECIFIC: u8 = 0x80;
/// Mask selecting the class bits of a tag octet
pub const TAG_CLASS_MASK: u8 = 0xC0;

/// Predicate over a tag octet: matches when `tag & mask == value`.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct TagFilter {
    mask: u8,
    value: u8,
}

impl TagFilter {
    /// Matches every tag.
    pub const ANY: TagFilter = TagFilter { mask: 0, value: 0 };

    /// Matches tags for which `tag & mask == value`.
    pub const fn new(mask: u8, value: u8) -> Self {
        TagFilter { mask, value }
    }

    /// Matches exactly `tag`.
    pub const fn exact(tag: u8) -> Self {
        TagFilter {
            mask: 0xFF,
            value: tag,
        }
    }

    /// Matches any tag of the class given by `class` (e.g., [`TAG_CONTEXT_SPECIFIC`]).
    pub const fn class(class: u8) -> Self {
        TagFilter {
            mask: TAG_CLASS_MASK,
            value: class,
        }
    }

    /// True if `tag` passes the filter.
    pub fn matches(&self, tag: u8) -> bool {
        tag & self.mask == self.value
    }
}

/// One decoded tag-length-value element.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Tlv<'a> {
    /// Tag octet
    pub tag: u8,
    /// Absolute offset of the tag octet
    pub offset: usize,
    /// Number of tag and length octets
    pub header_len: usize,
    /// Value octets
    pub value: &'a [u8],
    /// Tag, length and value octets
    pub encoded: &'a [u8],
}

impl<'a> Tlv<'a> {
    /// Range covering the whole element, header included.
    pub fn range(&self) -> RawRange {
        RawRange::new(self.offset, self.header_len + self.value.len())
    }

    /// Range covering the value octets only.
    pub fn value_range(&self) -> RawRange {
        RawRange::new(self.offset + self.header_len, self.value.len())
    }
}

/// Contents of a BIT STRING.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct BitStringView<'a> {
    /// Number of unused bits in the final octet
    pub unused_bits: u8,
    /// Octets following the unused-bits octet
    pub bytes: &'a [u8],
    /// Absolute offset of `bytes`
    pub offset: usize,
}

/// Cursor over a DER-encoded byte range.
#[derive(Clone, Debug)]
pub struct DerReader<'a> {
    bytes: &'a [u8],
    pos: usize,
    base: usize,
    phase: ParsePhase,
}

impl<'a> DerReader<'a> {
    /// Creates a reader over `bytes`, whose first byte is at absolute offset 0.
    pub fn new(bytes: &'a [u8], phase: ParsePhase) -> Self {
        Self::with_base(bytes, 0, phase)
    }

    /// Creates a reader over `bytes`, whose first byte is at absolute offset `base`.
    pub fn with_base(bytes: &'a [u8], base: usize, phase: ParsePhase) -> Self {
        DerReader {
            bytes,
            pos: 0,
            base,
            phase,
        }
    }

    /// Changes the phase reported by subsequent failures.
    pub fn set_phase(&mut self, phase: ParsePhase) {
        self.phase = phase;
    }

    /// Phase reported by failures.
    pub fn phase(&self) -> ParsePhase {
        self.phase
    }

    /// Error for `cause` in the current phase.
    pub fn error(&self, cause: ParseCause) -> Error {
        Error::parse(self.phase, cause)
    }

    /// Absolute offset of the next unread byte.
    pub fn offset(&self) -> usize {
        self.base + self.pos
    }

    /// Unread bytes.
    pub fn remaining(&self) -> &'a [u8] {
        &self.bytes[self.pos..]
    }

    /// Range covering the unread bytes.
    pub fn range(&self) -> RawRange {
        RawRange::new(self.offset(), self.bytes.len() - self.pos)
    }

    /// True once every byte has been consumed.
    pub fn is_empty(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    /// Tag octet of the next element, if any.
    pub fn peek_tag(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    /// Fails with [`ParseCause::LengthMismatch`] unless every byte has been consumed.
    pub fn finish(&self) -> Result<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self.error(ParseCause::LengthMismatch))
        }
    }

    /// Reads the next element, whatever its tag.
    pub fn read_tlv(&mut self) -> Result<Tlv<'a>> {
        let rest = self.remaining();
        if rest.is_empty() {
            return Err(self.error(ParseCause::OutOfData));
        }
        let tag = rest[0];
        let mut hdr_reader = SliceReader::new(rest).map_err(|_| self.error(ParseCause::InvalidLength))?;
        let header = Header::decode(&mut hdr_reader).map_err(|e| self.der_error(e))?;
        let header_len = usize::try_from(hdr_reader.position())
            .map_err(|_| self.error(ParseCause::InvalidLength))?;
        let value_len =
            usize::try_from(header.length).map_err(|_| self.error(ParseCause::InvalidLength))?;
        let end = header_len
            .checked_add(value_len)
            .ok_or_else(|| self.error(ParseCause::InvalidLength))?;
        if end > rest.len() {
            return Err(self.error(ParseCause::OutOfData));
        }
        let tlv = Tlv {
            tag,
            offset: self.offset(),
            header_len,
            value: &rest[header_len..end],
            encoded: &rest[..end],
        };
        self.pos += end;
        Ok(tlv)
    }

    /// Reads the next element, which must carry `tag`. Nothing is consumed on a tag mismatch.
    pub fn get_tlv(&mut self, tag: u8) -> Result<Tlv<'a>> {
        match self.peek_tag() {
            None => Err(self.error(ParseCause::OutOfData)),
            Some(t) if t != tag => Err(self.error(ParseCause::UnexpectedTag)),
            Some(_) => self.read_tlv(),
        }
    }

    /// Reads the next element, which must carry `tag`, and returns a reader over its value.
    pub fn get_tag(&mut self, tag: u8) -> Result<DerReader<'a>> {
        let tlv = self.get_tlv(tag)?;
        Ok(self.nested(&tlv))
    }

    /// Like [`DerReader::get_tag`], but returns `None` without consuming anything when the
    /// input is exhausted or the next tag differs.
    pub fn get_optional(&mut self, tag: u8) -> Result<Option<DerReader<'a>>> {
        if self.peek_tag() == Some(tag) {
            self.get_tag(tag).map(Some)
        } else {
            Ok(None)
        }
    }

    /// Returns a reader over the value of `tlv`, inheriting this reader's phase.
    pub fn nested(&self, tlv: &Tlv<'a>) -> DerReader<'a> {
        DerReader::with_base(tlv.value, tlv.offset + tlv.header_len, self.phase)
    }

    /// Reads a BOOLEAN. Any non-zero octet is true.
    pub fn get_bool(&mut self) -> Result<bool> {
        let tlv = self.get_tlv(TAG_BOOLEAN)?;
        if tlv.value.len() != 1 {
            return Err(self.error(ParseCause::InvalidLength));
        }
        Ok(tlv.value[0] != 0)
    }

    /// Reads a non-negative INTEGER that fits in an `i32`.
    pub fn get_int(&mut self) -> Result<i32> {
        let tlv = self.get_tlv(TAG_INTEGER)?;
        let mut v = tlv.value;
        if v.is_empty() || v[0] & 0x80 != 0 {
            return Err(self.error(ParseCause::InvalidLength));
        }
        while v.len() > 1 && v[0] == 0 {
            v = &v[1..];
        }
        if v.len() > 4 || (v.len() == 4 && v[0] & 0x80 != 0) {
            return Err(self.error(ParseCause::InvalidLength));
        }
        Ok(v.iter().fold(0i32, |acc, b| (acc << 8) | i32::from(*b)))
    }

    /// Reads a BIT STRING.
    pub fn get_bitstring(&mut self) -> Result<BitStringView<'a>> {
        let tlv = self.get_tlv(TAG_BIT_STRING)?;
        if tlv.value.is_empty() {
            return Err(self.error(ParseCause::InvalidLength));
        }
        let unused_bits = tlv.value[0];
        if unused_bits > 7 {
            return Err(self.error(ParseCause::InvalidLength));
        }
        Ok(BitStringView {
            unused_bits,
            bytes: &tlv.value[1..],
            offset: tlv.offset + tlv.header_len + 1,
        })
    }

    /// Reads a non-empty BIT STRING with no unused bits, as used for signatures.
    pub fn get_bitstring_null(&mut self) -> Result<BitStringView<'a>> {
        let bs = self.get_bitstring()?;
        if bs.unused_bits != 0 || bs.bytes.is_empty() {
            return Err(self.error(ParseCause::InvalidValue));
        }
        Ok(bs)
    }

    /// Reads an OBJECT IDENTIFIER and returns its encoded value octets.
    pub fn get_oid(&mut self) -> Result<&'a [u8]> {
        Ok(self.get_tlv(TAG_OID)?.value)
    }

    /// Reads a SEQUENCE that must extend exactly to the end of this reader, and hands every
    /// element to `f`.
    ///
    /// Every element tag must pass `must`; elements whose tag fails `may` are skipped without
    /// calling `f`.
    pub fn traverse_sequence_of<F>(&mut self, must: TagFilter, may: TagFilter, mut f: F) -> Result<()>
    where
        F: FnMut(u8, DerReader<'a>) -> Result<()>,
    {
        let mut seq = self.get_tag(TAG_SEQUENCE)?;
        self.finish()?;
        while let Some(tag) = seq.peek_tag() {
            if !must.matches(tag) {
                return Err(seq.error(ParseCause::UnexpectedTag));
            }
            let tlv = seq.read_tlv()?;
            if may.matches(tag) {
                f(tag, seq.nested(&tlv))?;
            }
        }
        Ok(())
    }

    fn der_error(&self, err: der::Error) -> Error {
        match err.kind() {
            der::ErrorKind::Incomplete { .. } => self.error(ParseCause::OutOfData),
            der::ErrorKind::TagUnknown { .. }
            | der::ErrorKind::TagNumberInvalid
            | der::ErrorKind::TagModeUnknown => self.error(ParseCause::UnexpectedTag),
            _ => self.error(ParseCause::InvalidLength),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn primitives() {
        // SEQUENCE { BOOLEAN TRUE, INTEGER 300, BIT STRING 06 40, OID 2.5.29.19 }
        let enc = hex!("300F 0101FF 0202012C 03020640 0603551D13");
        let mut r = DerReader::new(&enc, ParsePhase::Extensions);
        let mut seq = r.get_tag(TAG_SEQUENCE).unwrap();
        assert!(r.finish().is_ok());
        assert_eq!(seq.offset(), 2);
        assert!(seq.get_bool().unwrap());
        assert_eq!(seq.get_int().unwrap(), 300);
        let bs = seq.get_bitstring().unwrap();
        assert_eq!(bs.unused_bits, 6);
        assert_eq!(bs.bytes, &[0x40]);
        assert_eq!(bs.offset, 11);
        assert_eq!(seq.get_oid().unwrap(), &hex!("551D13"));
        assert!(seq.is_empty());
    }

    #[test]
    fn tag_mismatch_does_not_consume() {
        let enc = hex!("020100");
        let mut r = DerReader::new(&enc, ParsePhase::Version);
        assert_eq!(
            r.get_bool(),
            Err(Error::parse(ParsePhase::Version, ParseCause::UnexpectedTag))
        );
        assert!(r.get_optional(TAG_BOOLEAN).unwrap().is_none());
        assert_eq!(r.get_int().unwrap(), 0);
        assert_eq!(
            r.get_int(),
            Err(Error::parse(ParsePhase::Version, ParseCause::OutOfData))
        );
    }

    #[test]
    fn integer_limits() {
        let negative = hex!("020180");
        assert!(DerReader::new(&negative, ParsePhase::Serial).get_int().is_err());
        let wide = hex!("02050100000000");
        assert!(DerReader::new(&wide, ParsePhase::Serial).get_int().is_err());
        let padded = hex!("0203007FFF");
        assert_eq!(
            DerReader::new(&padded, ParsePhase::Serial).get_int().unwrap(),
            0x7FFF
        );
    }

    #[test]
    fn truncated_value() {
        let enc = hex!("0405AABB");
        let mut r = DerReader::new(&enc, ParsePhase::Format);
        assert_eq!(
            r.read_tlv(),
            Err(Error::parse(ParsePhase::Format, ParseCause::OutOfData))
        );
    }

    #[test]
    fn traverse_filters() {
        // SEQUENCE { [2] "a", [1] "b", [2] "c" }
        let enc = hex!("3009 820161 810162 820163");
        let mut seen = vec![];
        let mut r = DerReader::new(&enc, ParsePhase::Extensions);
        r.traverse_sequence_of(
            TagFilter::class(TAG_CONTEXT_SPECIFIC),
            TagFilter::exact(0x82),
            |tag, v| {
                seen.push((tag, v.remaining().to_vec(), v.offset()));
                Ok(())
            },
        )
        .unwrap();
        assert_eq!(seen, vec![(0x82, b"a".to_vec(), 4), (0x82, b"c".to_vec(), 10)]);

        let mut r = DerReader::new(&enc, ParsePhase::Extensions);
        assert_eq!(
            r.traverse_sequence_of(TagFilter::exact(TAG_OID), TagFilter::ANY, |_, _| Ok(())),
            Err(Error::parse(ParsePhase::Extensions, ParseCause::UnexpectedTag))
        );

        // trailing bytes after the SEQUENCE
        let enc = hex!("3000 00");
        let mut r = DerReader::new(&enc, ParsePhase::Extensions);
        assert_eq!(
            r.traverse_sequence_of(TagFilter::ANY, TagFilter::ANY, |_, _| Ok(())),
            Err(Error::parse(ParsePhase::Extensions, ParseCause::LengthMismatch))
        );
    }
}
