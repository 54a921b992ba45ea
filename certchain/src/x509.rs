//! On-demand certificate parsing: frames, extension expansion, public keys and per-certificate
//! caches

pub mod cache;
pub mod certificate;
pub mod extensions;
pub mod frame;
pub mod pk;

pub use crate::{
    x509::cache::*, x509::certificate::*, x509::extensions::*, x509::frame::*, x509::pk::*,
};
