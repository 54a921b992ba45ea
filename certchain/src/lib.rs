#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]
#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

pub mod asn1;
pub mod util;
pub mod validator;
pub mod x509;

#[cfg(feature = "revocation")]
pub mod revocation;

#[cfg(feature = "fs")]
pub mod builder;

extern crate alloc;

pub use crate::asn1::*;

// order of pub use statements below is intended to assure the list emitted by cargo doc on the main
// index.html page is in alphabetical order.
#[cfg(feature = "fs")]
pub use crate::builder::*;

#[cfg(feature = "revocation")]
pub use crate::revocation::*;

pub use crate::{util::*, validator::*, x509::*};
