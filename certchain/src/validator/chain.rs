//! Certification path building and verification
//!
//! Verification starts at the end entity (`chain[0]`) and repeatedly asks [`find_parent`] for
//! the issuer of the current certificate until a trust anchor is reached or no issuer can be
//! found. Findings are recorded as [`VerifyFlags`] on each certificate of the [`VerifyChain`]
//! rather than returned as errors; only structural problems abort with an [`Error`].
//!
//! ECDSA signature checks may be metered with a [`RestartContext`]. When a check runs out of
//! budget, [`verify_restartable`] returns [`Verification::InProgress`] and the caller calls it
//! again with the same arguments to continue.

use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;

use der::asn1::ObjectIdentifier;
use log::{debug, error};

use crate::asn1::oids::PKIX_CE_ANY_EXTENDED_KEY_USAGE;
use crate::util::error::{Error, Result};
use crate::util::logging::{log_message, LogLevels};
use crate::util::time_of_interest::TimeOfInterest;
use crate::validator::flags::{VerifyFlag, VerifyFlags};
use crate::validator::name::{names_match, verify_name};
use crate::validator::parent::{find_parent, CertRef, ChildSig, ParentSearch, Search};
use crate::validator::profile::Profile;
use crate::validator::settings::ChainSettings;
use crate::x509::certificate::{CachedCert, CertificateChain};
use crate::x509::frame::ExtType;

#[cfg(feature = "revocation")]
pub use crate::revocation::crl::Crl;

/// Stand-in for the CRL type when the `revocation` feature is disabled; no value of it exists,
/// so the CRL list passed to verification is always empty.
#[cfg(not(feature = "revocation"))]
#[derive(Debug)]
pub enum Crl {}

/// Callback invoked for each certificate of a built chain with its depth (0 is the end entity)
/// and its flags, which it may change. An error aborts verification.
pub type VerifyCallback<'f> =
    dyn FnMut(&CachedCert<'_>, usize, &mut VerifyFlags) -> Result<()> + 'f;

/// One certificate of a [`VerifyChain`] and the findings recorded for it.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct VerifyChainItem {
    /// The certificate
    pub cert: CertRef,
    /// Findings for this certificate
    pub flags: VerifyFlags,
}

/// The path built by one verification, end entity first.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct VerifyChain {
    /// Certificates from the end entity up to the last one examined
    pub items: Vec<VerifyChainItem>,
}

impl VerifyChain {
    fn with_capacity(max_intermediate_ca: usize) -> Self {
        VerifyChain {
            items: Vec::with_capacity(max_intermediate_ca + 2),
        }
    }

    /// Number of certificates in the path.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// True if nothing has been added yet.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    fn flag_current(&mut self, flags: VerifyFlags) {
        if let Some(item) = self.items.last_mut() {
            item.flags |= flags;
        }
    }
}

#[derive(Clone, Debug)]
struct ChainResume {
    ver_chain: VerifyChain,
    self_cnt: usize,
    search: ParentSearch,
}

/// Caller-owned state of a restartable verification.
///
/// `max_ops` is the budget available to each call; an ECDSA verification costs the size of its
/// curve in bits. A budget of 0 never suspends. Dropping the context abandons a suspended
/// verification.
///
/// The budget decides how many calls a verification takes, not how long each call runs: the
/// call that exhausts it performs the complete signature check.
#[derive(Clone, Debug, Default)]
pub struct RestartContext {
    max_ops: u32,
    pub(crate) pk_progress: u32,
    state: Option<ChainResume>,
}

impl RestartContext {
    /// Creates a context with the given per-call budget.
    pub fn new(max_ops: u32) -> Self {
        RestartContext {
            max_ops,
            ..Default::default()
        }
    }

    /// Per-call operation budget.
    pub fn max_ops(&self) -> u32 {
        self.max_ops
    }

    /// True if a verification is suspended in this context.
    pub fn is_in_progress(&self) -> bool {
        self.state.is_some() || self.pk_progress != 0
    }

    /// Forgets any suspended verification. The budget is kept.
    pub fn reset(&mut self) {
        self.pk_progress = 0;
        self.state = None;
    }
}

/// Outcome of a restartable verification.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Verification {
    /// The chain was built and examined; an empty set means success
    Complete(VerifyFlags),
    /// A signature check ran out of budget; call again with the same arguments
    InProgress,
}

impl Verification {
    /// The flags of a completed verification.
    pub fn flags(&self) -> Option<VerifyFlags> {
        match self {
            Verification::Complete(flags) => Some(*flags),
            Verification::InProgress => None,
        }
    }
}

struct ChainContext<'c> {
    chain: &'c CertificateChain<'c>,
    trust_ca: &'c CertificateChain<'c>,
    crls: &'c [Crl],
    profile: &'c Profile,
    toi: TimeOfInterest,
    max_intermediate_ca: usize,
}

impl<'c> ChainContext<'c> {
    fn cert(&self, r: CertRef) -> Result<&'c CachedCert<'c>> {
        let cert = match r {
            CertRef::Chain(i) => self.chain.get(i),
            CertRef::Trusted(i) => self.trust_ca.get(i),
        };
        cert.ok_or(Error::BadInputData)
    }
}

cfg_if::cfg_if! {
    if #[cfg(feature = "revocation")] {
        fn revocation_flags(ctx: &ChainContext<'_>, serial: &[u8], ca: &CachedCert<'_>) -> VerifyFlags {
            crate::revocation::crl::verify_crl(serial, ca, ctx.crls, ctx.profile, &ctx.toi)
        }
    } else {
        fn revocation_flags(_ctx: &ChainContext<'_>, _serial: &[u8], _ca: &CachedCert<'_>) -> VerifyFlags {
            VerifyFlags::default()
        }
    }
}

/// Builds and checks the path. `Ok(None)` means suspended, with the state saved in `rs`.
fn verify_chain(
    ctx: &ChainContext<'_>,
    mut rs: Option<&mut RestartContext>,
) -> Result<Option<VerifyChain>> {
    let mut ver_chain;
    let mut self_cnt;
    let mut child;
    let mut child_is_trusted = false;
    let mut resume = None;

    match rs.as_deref_mut().and_then(|rs| rs.state.take()) {
        Some(saved) => {
            debug!("Resuming parent search at {:?}", saved.search);
            ver_chain = saved.ver_chain;
            self_cnt = saved.self_cnt;
            resume = Some(saved.search);
            child = ver_chain.items.last().map(|i| i.cert).ok_or(Error::Fatal)?;
        }
        None => {
            ver_chain = VerifyChain::with_capacity(ctx.max_intermediate_ca);
            self_cnt = 0;
            child = CertRef::Chain(0);
        }
    }

    loop {
        // a resumed child is already in the chain
        if resume.is_none() {
            ver_chain.items.push(VerifyChainItem {
                cert: child,
                flags: VerifyFlags::default(),
            });
        }

        let child_cert = ctx.cert(child)?;
        let frame = child_cert.get_frame().map_err(|_| Error::Fatal)?;
        let raw = child_cert.raw();
        let mut flags = VerifyFlags::default();

        if ctx.toi.is_past(&frame.valid_to) {
            flags |= VerifyFlag::Expired;
        }
        if ctx.toi.is_future(&frame.valid_from) {
            flags |= VerifyFlag::Future;
        }

        // stop at trust anchors, but not at locally trusted end entities
        if child_is_trusted {
            ver_chain.flag_current(flags);
            return Ok(Some(ver_chain));
        }

        let self_issued = names_match(frame.issuer_raw.slice(raw), frame.subject_raw.slice(raw));

        if !ctx.profile.check_md(frame.sig_md) {
            flags |= VerifyFlag::BadMd;
        }
        if !ctx.profile.check_pk(frame.sig_pk) {
            flags |= VerifyFlag::BadPk;
        }

        if ver_chain.len() == 1 && self_issued && ctx.trust_ca.iter().any(|ta| ta.raw() == raw) {
            debug!("End entity is a trust anchor");
            ver_chain.flag_current(flags);
            return Ok(Some(ver_chain));
        }
        ver_chain.flag_current(flags);

        let child_serial = frame.serial.slice(raw);
        let child_sig = ChildSig::new(raw, &frame);

        let search = find_parent(
            &child_sig,
            child,
            ctx.chain,
            ctx.trust_ca,
            ver_chain.len() - 1,
            self_cnt,
            &ctx.toi,
            rs.as_deref_mut(),
            resume.take(),
        )?;
        let parent = match search {
            Search::Done(parent) => parent,
            Search::InProgress(search) => {
                let rs = rs.as_deref_mut().ok_or(Error::Fatal)?;
                rs.state = Some(ChainResume {
                    ver_chain,
                    self_cnt,
                    search,
                });
                return Ok(None);
            }
        };

        let parent = match parent {
            Some(parent) => parent,
            None => {
                debug!("No issuer found for {:?}", child);
                ver_chain.flag_current(VerifyFlag::NotTrusted.into());
                return Ok(Some(ver_chain));
            }
        };

        // self-issued intermediates do not count against path length constraints
        if ver_chain.len() != 1 && self_issued {
            self_cnt += 1;
        }

        if !parent.is_trusted && ver_chain.len() > ctx.max_intermediate_ca {
            error!(
                "Chain exceeds the limit of {} intermediate CA certificates",
                ctx.max_intermediate_ca
            );
            return Err(Error::Fatal);
        }

        let mut flags = VerifyFlags::default();
        if !parent.signature_is_good {
            flags |= VerifyFlag::NotTrusted;
        }

        let parent_cert = ctx.cert(parent.cert)?;
        {
            let parent_pk = parent_cert.pk().map_err(|_| Error::Fatal)?;
            if !ctx.profile.check_key(&parent_pk) {
                flags |= VerifyFlag::BadKey;
            }
        }

        flags |= revocation_flags(ctx, child_serial, parent_cert);
        ver_chain.flag_current(flags);

        child = parent.cert;
        child_is_trusted = parent.is_trusted;
    }
}

fn merge_flags(
    ctx: &ChainContext<'_>,
    ver_chain: &VerifyChain,
    mut callback: Option<&mut VerifyCallback<'_>>,
) -> Result<VerifyFlags> {
    let mut flags = VerifyFlags::default();
    for (depth, item) in ver_chain.items.iter().enumerate().rev() {
        let mut cur_flags = item.flags;
        if let Some(cb) = callback.as_deref_mut() {
            cb(ctx.cert(item.cert)?, depth, &mut cur_flags)?;
        }
        flags |= cur_flags;
    }
    Ok(flags)
}

fn verify_inner(
    ctx: &ChainContext<'_>,
    expected_cn: Option<&str>,
    callback: Option<&mut VerifyCallback<'_>>,
    mut rs: Option<&mut RestartContext>,
) -> Result<Verification> {
    let ee = ctx.cert(CertRef::Chain(0))?;
    let mut ee_flags = VerifyFlags::default();

    if let Some(cn) = expected_cn {
        let frame = ee.get_frame()?;
        if !verify_name(ee.raw(), &frame, cn).map_err(|_| Error::Fatal)? {
            ee_flags |= VerifyFlag::CnMismatch;
        }
    }

    {
        let pk = ee.pk().map_err(|_| Error::Fatal)?;
        if !ctx.profile.check_pk(pk.pk_type()) {
            ee_flags |= VerifyFlag::BadPk;
        }
        if !ctx.profile.check_key(&pk) {
            ee_flags |= VerifyFlag::BadKey;
        }
    }

    let mut ver_chain = match verify_chain(ctx, rs.as_deref_mut())? {
        Some(ver_chain) => ver_chain,
        None => return Ok(Verification::InProgress),
    };
    if let Some(ee_item) = ver_chain.items.first_mut() {
        ee_item.flags |= ee_flags;
    }

    let flags = merge_flags(ctx, &ver_chain, callback)?;
    let level = if flags.is_empty() {
        LogLevels::Debug
    } else {
        LogLevels::Info
    };
    log_message(
        &level,
        &format!(
            "Verified path of {} certificates at {}; flags: {:#x}",
            ver_chain.len(),
            ctx.toi,
            flags.bits()
        ),
    );
    Ok(Verification::Complete(flags))
}

/// Verifies `chain` against `trust_ca` with everything but the certificates, CRLs and callback
/// taken from `settings`.
///
/// `chain[0]` is the end entity; the remaining certificates are untrusted candidate issuers,
/// searched after the trust anchors. Returns [`Verification::Complete`] with the merged flags
/// once the path has been examined, or [`Verification::InProgress`] if `rs` is given and an
/// ECDSA check ran out of budget. `rs` is reset on every other return.
pub fn verify_with_settings(
    chain: &CertificateChain<'_>,
    trust_ca: &CertificateChain<'_>,
    crls: &[Crl],
    settings: &ChainSettings,
    callback: Option<&mut VerifyCallback<'_>>,
    mut rs: Option<&mut RestartContext>,
) -> Result<Verification> {
    if chain.is_empty() {
        return Err(Error::BadInputData);
    }
    let ctx = ChainContext {
        chain,
        trust_ca,
        crls,
        profile: &settings.profile,
        toi: settings.time_of_interest()?,
        max_intermediate_ca: settings.max_intermediate_ca,
    };

    let result = verify_inner(&ctx, settings.expected_cn.as_deref(), callback, rs.as_deref_mut());
    if !matches!(result, Ok(Verification::InProgress)) {
        if let Some(rs) = rs {
            rs.reset();
        }
    }
    match result {
        // a callback must not make a failed verification look like a soft failure
        Err(Error::VerifyFailed) => Err(Error::Fatal),
        r => r,
    }
}

fn settings_for(profile: &Profile, cn: Option<&str>) -> ChainSettings {
    ChainSettings {
        expected_cn: cn.map(String::from),
        ..ChainSettings::with_profile(profile.clone())
    }
}

/// Verifies `chain` against `trust_ca` under `profile`, optionally checking that the end entity
/// matches the host name `cn`. An empty result means the chain is trusted.
pub fn verify_with_profile(
    chain: &CertificateChain<'_>,
    trust_ca: &CertificateChain<'_>,
    crls: &[Crl],
    profile: &Profile,
    cn: Option<&str>,
    callback: Option<&mut VerifyCallback<'_>>,
) -> Result<VerifyFlags> {
    let settings = settings_for(profile, cn);
    match verify_with_settings(chain, trust_ca, crls, &settings, callback, None)? {
        Verification::Complete(flags) => Ok(flags),
        Verification::InProgress => Err(Error::Fatal),
    }
}

/// [`verify_with_profile`] with the default profile.
pub fn verify(
    chain: &CertificateChain<'_>,
    trust_ca: &CertificateChain<'_>,
    crls: &[Crl],
    cn: Option<&str>,
    callback: Option<&mut VerifyCallback<'_>>,
) -> Result<VerifyFlags> {
    verify_with_profile(chain, trust_ca, crls, &Profile::default_profile(), cn, callback)
}

/// [`verify_with_profile`] with metered ECDSA checks; see [`RestartContext`].
pub fn verify_restartable(
    chain: &CertificateChain<'_>,
    trust_ca: &CertificateChain<'_>,
    crls: &[Crl],
    profile: &Profile,
    cn: Option<&str>,
    callback: Option<&mut VerifyCallback<'_>>,
    rs: &mut RestartContext,
) -> Result<Verification> {
    let settings = settings_for(profile, cn);
    verify_with_settings(chain, trust_ca, crls, &settings, callback, Some(rs))
}

/// Fails with [`Error::KeyUsageMismatch`] unless the keyUsage extension of `cert`, if present,
/// permits every bit of `usage`. encipherOnly and decipherOnly may only be set if requested.
pub fn check_key_usage(cert: &CachedCert<'_>, usage: u32) -> Result<()> {
    if cert.frame()?.check_key_usage(usage) {
        Ok(())
    } else {
        Err(Error::KeyUsageMismatch)
    }
}

/// Fails with [`Error::ExtKeyUsageMismatch`] unless `cert` has no extendedKeyUsage extension or
/// it lists `usage` or anyExtendedKeyUsage.
pub fn check_extended_key_usage(cert: &CachedCert<'_>, usage: &ObjectIdentifier) -> Result<()> {
    if !cert.frame()?.has_ext(ExtType::ExtendedKeyUsage) {
        return Ok(());
    }
    let permitted = cert
        .get_ext_key_usage()?
        .iter()
        .any(|eku| eku == usage || *eku == PKIX_CE_ANY_EXTENDED_KEY_USAGE);
    if permitted {
        Ok(())
    } else {
        Err(Error::ExtKeyUsageMismatch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asn1::oids::{PKIX_KP_CLIENT_AUTH, PKIX_KP_SERVER_AUTH};
    use crate::x509::frame::{KU_DIGITAL_SIGNATURE, KU_KEY_CERT_SIGN, KU_KEY_ENCIPHERMENT};

    fn chain_of(certs: &[&'static [u8]]) -> CertificateChain<'static> {
        let mut chain = CertificateChain::new();
        for c in certs {
            chain.parse_der_nocopy(c).unwrap();
        }
        chain
    }

    const ROOT: &[u8] = include_bytes!("../../tests/examples/root_rsa.der");
    const INT: &[u8] = include_bytes!("../../tests/examples/int_rsa.der");
    const EE: &[u8] = include_bytes!("../../tests/examples/ee_rsa.der");
    const EE_CN_ONLY: &[u8] = include_bytes!("../../tests/examples/ee_cn_only.der");

    #[test]
    fn path_items() {
        let chain = chain_of(&[EE, INT]);
        let tas = chain_of(&[ROOT]);
        let settings = ChainSettings::default();
        let ctx = ChainContext {
            chain: &chain,
            trust_ca: &tas,
            crls: &[],
            profile: &settings.profile,
            toi: settings.time_of_interest().unwrap(),
            max_intermediate_ca: settings.max_intermediate_ca,
        };
        let vc = verify_chain(&ctx, None).unwrap().unwrap();
        let certs: Vec<CertRef> = vc.items.iter().map(|i| i.cert).collect();
        assert_eq!(
            certs,
            [CertRef::Chain(0), CertRef::Chain(1), CertRef::Trusted(0)]
        );
        assert!(vc.items.iter().all(|i| i.flags.is_empty()));
    }

    #[test]
    fn trust_anchor_verifies_against_itself() {
        let chain = chain_of(&[ROOT]);
        let tas = chain_of(&[ROOT]);
        assert!(verify(&chain, &tas, &[], None, None).unwrap().is_empty());
    }

    #[test]
    fn empty_chain_is_rejected() {
        let tas = chain_of(&[ROOT]);
        assert_eq!(
            verify(&CertificateChain::new(), &tas, &[], None, None),
            Err(Error::BadInputData)
        );
    }

    #[test]
    fn usage_checks() {
        let ee = CachedCert::from_der_nocopy(EE).unwrap();
        let root = CachedCert::from_der_nocopy(ROOT).unwrap();
        let no_ext = CachedCert::from_der_nocopy(EE_CN_ONLY).unwrap();

        assert!(check_key_usage(&root, KU_KEY_CERT_SIGN).is_ok());
        assert_eq!(
            check_key_usage(&root, KU_DIGITAL_SIGNATURE),
            Err(Error::KeyUsageMismatch)
        );
        assert!(check_key_usage(&ee, KU_DIGITAL_SIGNATURE | KU_KEY_ENCIPHERMENT).is_ok());

        assert!(check_extended_key_usage(&ee, &PKIX_KP_SERVER_AUTH).is_ok());
        assert_eq!(
            check_extended_key_usage(&ee, &PKIX_KP_CLIENT_AUTH),
            Err(Error::ExtKeyUsageMismatch)
        );
        assert!(check_extended_key_usage(&no_ext, &PKIX_KP_CLIENT_AUTH).is_ok());
    }
}
