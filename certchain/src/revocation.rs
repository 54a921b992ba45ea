//! Certificate revocation lists
//!
//! CRLs are decoded with [`Crl::from_der`] or [`parse_crls`] and passed to verification, which
//! consults every CRL whose issuer matches the issuer of each certificate in the chain.
//! Revocation support is available when the `revocation` feature gate is used (the default).
//!
//! ```no_run
//! use certchain::{parse_crls, verify, CertificateChain};
//!
//! let mut chain = CertificateChain::new();
//! chain.parse(&std::fs::read("ee.pem").unwrap()).unwrap();
//! let mut trust_ca = CertificateChain::new();
//! trust_ca.parse(&std::fs::read("root.der").unwrap()).unwrap();
//! let crls = parse_crls(&std::fs::read("ca.crl").unwrap()).unwrap();
//!
//! let flags = verify(&chain, &trust_ca, &crls, None, None).unwrap();
//! println!("{}", certchain::verify_info("! ", flags.bits()));
//! ```

pub mod crl;

pub use crate::revocation::crl::*;
