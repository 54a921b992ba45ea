//! Issuer search over the trust anchors and the rest of the supplied chain
//!
//! A candidate is eligible as the parent of a child certificate when its subject equals the
//! child's issuer, it is a CA permitted to sign certificates (locally trusted v1 and v2
//! certificates are exempt) and its path length constraint is not exceeded. Trust anchors must
//! additionally have produced the child's signature. Among eligible candidates the first one that
//! is valid at the time of interest wins; if none is, the first eligible candidate is returned.
//! This lets a trust store hold several generations of the same CA, e.g., across a key rollover.

use alloc::vec::Vec;

use log::debug;

use crate::util::crypto::{calculate_hash, MdAlg};
use crate::util::error::{Error, Result};
use crate::util::time_of_interest::TimeOfInterest;
use crate::validator::chain::RestartContext;
use crate::validator::name::names_match;
use crate::x509::certificate::{CachedCert, CertificateChain};
use crate::x509::frame::{Frame, KU_KEY_CERT_SIGN};
use crate::x509::pk::{PkAlg, SigCheck};

/// Position of a certificate in one of the two lists given to verification.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum CertRef {
    /// Index into the supplied chain; 0 is the end entity
    Chain(usize),
    /// Index into the trust anchors
    Trusted(usize),
}

/// The fields of a child certificate that a parent search needs.
#[derive(Clone, Debug)]
pub struct ChildSig<'c> {
    /// Encoded issuer Name
    pub issuer_raw: &'c [u8],
    /// Signature hash algorithm
    pub sig_md: MdAlg,
    /// Signature public key algorithm
    pub sig_pk: PkAlg,
    /// Digest of the TBSCertificate
    pub hash: Vec<u8>,
    /// Signature value
    pub sig: &'c [u8],
}

impl<'c> ChildSig<'c> {
    /// Collects the signature information of the certificate `raw` whose frame is `frame`.
    pub fn new(raw: &'c [u8], frame: &Frame) -> Self {
        ChildSig {
            issuer_raw: frame.issuer_raw.slice(raw),
            sig_md: frame.sig_md,
            sig_pk: frame.sig_pk,
            hash: calculate_hash(frame.sig_md, frame.tbs.slice(raw)),
            sig: frame.sig.slice(raw),
        }
    }
}

/// A parent returned by [`find_parent`].
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct FoundParent {
    /// The parent
    pub cert: CertRef,
    /// True if the parent is a trust anchor
    pub is_trusted: bool,
    /// True if the child's signature verified under the parent's key
    pub signature_is_good: bool,
}

/// Where a suspended parent search resumes: the candidate whose signature check was interrupted
/// and the fallback chosen before it.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ParentSearch {
    /// True while searching the trust anchors
    pub parent_is_trusted: bool,
    /// Index within the searched list of the interrupted candidate
    pub candidate: usize,
    /// Index and signature status of the first eligible candidate outside its validity period
    pub fallback: Option<(usize, bool)>,
}

/// Outcome of a step that may be suspended.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Search<T> {
    /// The step completed
    Done(T),
    /// A signature check ran out of budget; the payload tells where to resume
    InProgress(ParentSearch),
}

/// The list searched by [`find_parent_in`].
pub struct Pool<'p, 'a> {
    certs: &'p [CachedCert<'a>],
    base: usize,
    trusted: bool,
}

impl<'p, 'a> Pool<'p, 'a> {
    /// All trust anchors.
    pub fn trusted(trust_ca: &'p CertificateChain<'a>) -> Self {
        Pool {
            certs: trust_ca.as_slice(),
            base: 0,
            trusted: true,
        }
    }

    /// The certificates following `child` in the supplied chain.
    pub fn rest_of(chain: &'p CertificateChain<'a>, child: CertRef) -> Self {
        let base = match child {
            CertRef::Chain(i) => i + 1,
            CertRef::Trusted(_) => chain.len(),
        };
        Pool {
            certs: chain.as_slice().get(base..).unwrap_or(&[]),
            base,
            trusted: false,
        }
    }

    fn cert_ref(&self, index: usize) -> CertRef {
        if self.trusted {
            CertRef::Trusted(self.base + index)
        } else {
            CertRef::Chain(self.base + index)
        }
    }
}

/// True if `parent` may have issued the certificate described by `child_sig`, judged by name,
/// basicConstraints and keyUsage. `top` is true for trust anchors.
pub fn check_parent(child_sig: &ChildSig<'_>, parent_raw: &[u8], parent: &Frame, top: bool) -> bool {
    if !names_match(child_sig.issuer_raw, parent.subject_raw.slice(parent_raw)) {
        return false;
    }

    let need_ca_bit = !(top && parent.version < 3);
    if need_ca_bit && !parent.ca_istrue {
        return false;
    }
    !(need_ca_bit && !parent.check_key_usage(KU_KEY_CERT_SIGN))
}

/// Checks the child's signature with the parent's key. With a restart context, ECDSA checks are
/// metered and may return [`SigCheck::InProgress`].
pub fn check_signature(
    child_sig: &ChildSig<'_>,
    parent: &CachedCert<'_>,
    rs: Option<&mut RestartContext>,
) -> Result<SigCheck> {
    let pk = parent.pk().map_err(|e| {
        debug!("Failed to obtain public key of candidate issuer: {}", e);
        Error::Fatal
    })?;
    if !pk.can_do(child_sig.sig_pk) {
        return Ok(SigCheck::Bad);
    }
    match rs {
        Some(rs) if child_sig.sig_pk == PkAlg::Ecdsa => Ok(pk.verify_restartable(
            child_sig.sig_pk,
            child_sig.sig_md,
            &child_sig.hash,
            child_sig.sig,
            rs.max_ops(),
            &mut rs.pk_progress,
        )),
        _ => {
            if pk.verify(child_sig.sig_pk, child_sig.sig_md, &child_sig.hash, child_sig.sig) {
                Ok(SigCheck::Good)
            } else {
                Ok(SigCheck::Bad)
            }
        }
    }
}

/// Searches one list for the parent of `child_sig`.
///
/// `path_cnt` is the number of certificates below the child's parent-to-be, `self_cnt` the
/// number of self-issued intermediates among them. `resume` continues an interrupted search.
#[allow(clippy::too_many_arguments)]
pub fn find_parent_in(
    child_sig: &ChildSig<'_>,
    pool: &Pool<'_, '_>,
    path_cnt: usize,
    self_cnt: usize,
    toi: &TimeOfInterest,
    mut rs: Option<&mut RestartContext>,
    resume: Option<ParentSearch>,
) -> Result<Search<Option<(CertRef, bool)>>> {
    let (start, mut fallback) = match resume {
        Some(saved) => (saved.candidate, saved.fallback),
        None => (0, None),
    };

    for (i, candidate) in pool.certs.iter().enumerate().skip(start) {
        let parent = candidate.get_frame().map_err(|_| Error::Fatal)?;
        let parent_valid = toi.is_past(&parent.valid_from) && toi.is_future(&parent.valid_to);

        if !check_parent(child_sig, candidate.raw(), &parent, pool.trusted) {
            continue;
        }
        // max_pathlen is stored plus one
        if parent.max_pathlen > 0 && (parent.max_pathlen as usize) < 1 + path_cnt - self_cnt {
            debug!(
                "Skipped candidate issuer {:?}: path length constraint exceeded",
                pool.cert_ref(i)
            );
            continue;
        }

        let signature_is_good = match check_signature(child_sig, candidate, rs.as_deref_mut())? {
            SigCheck::Good => true,
            SigCheck::Bad => false,
            SigCheck::InProgress => {
                return Ok(Search::InProgress(ParentSearch {
                    parent_is_trusted: pool.trusted,
                    candidate: i,
                    fallback,
                }));
            }
        };
        if pool.trusted && !signature_is_good {
            debug!("Skipped trust anchor {:?}: signature did not verify", pool.cert_ref(i));
            continue;
        }

        if !parent_valid {
            if fallback.is_none() {
                fallback = Some((i, signature_is_good));
            }
            continue;
        }

        return Ok(Search::Done(Some((pool.cert_ref(i), signature_is_good))));
    }

    Ok(Search::Done(
        fallback.map(|(i, good)| (pool.cert_ref(i), good)),
    ))
}

/// Searches the trust anchors, then the certificates following `child` in the supplied chain,
/// for the parent of `child_sig`.
#[allow(clippy::too_many_arguments)]
pub fn find_parent(
    child_sig: &ChildSig<'_>,
    child: CertRef,
    chain: &CertificateChain<'_>,
    trust_ca: &CertificateChain<'_>,
    path_cnt: usize,
    self_cnt: usize,
    toi: &TimeOfInterest,
    mut rs: Option<&mut RestartContext>,
    resume: Option<ParentSearch>,
) -> Result<Search<Option<FoundParent>>> {
    let mut parent_is_trusted = resume.map_or(true, |saved| saved.parent_is_trusted);
    let mut resume = resume;

    loop {
        let pool = if parent_is_trusted {
            Pool::trusted(trust_ca)
        } else {
            Pool::rest_of(chain, child)
        };

        let found = match find_parent_in(
            child_sig,
            &pool,
            path_cnt,
            self_cnt,
            toi,
            rs.as_deref_mut(),
            resume.take(),
        )? {
            Search::InProgress(saved) => return Ok(Search::InProgress(saved)),
            Search::Done(found) => found,
        };

        match found {
            Some((cert, signature_is_good)) => {
                return Ok(Search::Done(Some(FoundParent {
                    cert,
                    is_trusted: parent_is_trusted,
                    signature_is_good,
                })));
            }
            None if parent_is_trusted => parent_is_trusted = false,
            None => return Ok(Search::Done(None)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain_of(certs: &[&'static [u8]]) -> CertificateChain<'static> {
        let mut chain = CertificateChain::new();
        for c in certs {
            chain.parse_der_nocopy(c).unwrap();
        }
        chain
    }

    fn sig_of<'c>(cert: &'c CachedCert<'_>) -> ChildSig<'c> {
        let frame = cert.get_frame().unwrap();
        ChildSig::new(cert.raw(), &frame)
    }

    const ROOT: &[u8] = include_bytes!("../../tests/examples/root_rsa.der");
    const ROOT_EXPIRED: &[u8] = include_bytes!("../../tests/examples/root_rsa_expired.der");
    const ROOT_OTHER_KEY: &[u8] = include_bytes!("../../tests/examples/root_rsa_other_key.der");
    const INT: &[u8] = include_bytes!("../../tests/examples/int_rsa.der");
    const EE: &[u8] = include_bytes!("../../tests/examples/ee_rsa.der");
    const EE_CN_ONLY: &[u8] = include_bytes!("../../tests/examples/ee_cn_only.der");

    #[test]
    fn valid_anchor_preferred_over_expired() {
        let now = TimeOfInterest::now().unwrap();
        let chain = chain_of(&[EE_CN_ONLY]);
        let child = sig_of(&chain[0]);

        for (tas, expected) in [
            (chain_of(&[ROOT_EXPIRED, ROOT]), CertRef::Trusted(1)),
            (chain_of(&[ROOT, ROOT_EXPIRED]), CertRef::Trusted(0)),
        ] {
            let found = find_parent(&child, CertRef::Chain(0), &chain, &tas, 0, 0, &now, None, None)
                .unwrap();
            assert_eq!(
                found,
                Search::Done(Some(FoundParent {
                    cert: expected,
                    is_trusted: true,
                    signature_is_good: true,
                }))
            );
        }
    }

    #[test]
    fn expired_anchor_is_fallback() {
        let now = TimeOfInterest::now().unwrap();
        let chain = chain_of(&[EE_CN_ONLY]);
        let child = sig_of(&chain[0]);
        let tas = chain_of(&[ROOT_OTHER_KEY, ROOT_EXPIRED]);
        let found = find_parent(&child, CertRef::Chain(0), &chain, &tas, 0, 0, &now, None, None)
            .unwrap();
        // the other-key root has the right name but did not sign the child
        assert_eq!(
            found,
            Search::Done(Some(FoundParent {
                cert: CertRef::Trusted(1),
                is_trusted: true,
                signature_is_good: true,
            }))
        );

        // at a time when the expired root was valid it wins outright
        let then = TimeOfInterest::from_unix_secs(1_500_000_000).unwrap();
        let tas = chain_of(&[ROOT_EXPIRED]);
        let r = find_parent_in(&child, &Pool::trusted(&tas), 0, 0, &then, None, None).unwrap();
        assert_eq!(r, Search::Done(Some((CertRef::Trusted(0), true))));
    }

    #[test]
    fn untrusted_parent_from_chain() {
        let now = TimeOfInterest::now().unwrap();
        let chain = chain_of(&[EE, INT]);
        let child = sig_of(&chain[0]);
        let tas = chain_of(&[ROOT]);
        let found = find_parent(&child, CertRef::Chain(0), &chain, &tas, 0, 0, &now, None, None)
            .unwrap();
        assert_eq!(
            found,
            Search::Done(Some(FoundParent {
                cert: CertRef::Chain(1),
                is_trusted: false,
                signature_is_good: true,
            }))
        );

        // no candidates at all
        let lone = chain_of(&[EE]);
        let found = find_parent(&child, CertRef::Chain(0), &lone, &tas, 0, 0, &now, None, None)
            .unwrap();
        assert_eq!(found, Search::Done(None));
    }

    #[test]
    fn parent_checks() {
        let ee = chain_of(&[EE_CN_ONLY]);
        let child = sig_of(&ee[0]);
        let root = chain_of(&[ROOT, EE]);
        let root_frame = root[0].get_frame().unwrap();
        assert!(check_parent(&child, root[0].raw(), &root_frame, false));

        // an end entity is never a parent, even with a matching name
        let mut not_ca = root_frame;
        not_ca.ca_istrue = false;
        assert!(!check_parent(&child, root[0].raw(), &not_ca, false));
        assert!(!check_parent(&child, root[0].raw(), &not_ca, true));
        // unless it is a locally trusted v1 or v2 certificate
        not_ca.version = 1;
        assert!(check_parent(&child, root[0].raw(), &not_ca, true));

        let mut no_cert_sign = root_frame;
        no_cert_sign.key_usage = crate::x509::frame::KU_CRL_SIGN;
        assert!(!check_parent(&child, root[0].raw(), &no_cert_sign, false));

        let ee_frame = root[1].get_frame().unwrap();
        assert!(!check_parent(&child, root[1].raw(), &ee_frame, false));
    }
}
