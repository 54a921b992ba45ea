//! DER cursor and object identifiers used by the certificate and CRL decoders

pub mod oids;
pub mod reader;

pub use crate::asn1::oids::*;
pub use crate::asn1::reader::*;
