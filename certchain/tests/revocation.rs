#![cfg(feature = "revocation")]

use certchain::{
    verify, verify_with_settings, CertificateChain, ChainSettings, Crl, TimeOfInterest,
    VerifyFlag,
};

const ROOT: &[u8] = include_bytes!("examples/root_rsa.der");

fn chain_of(certs: &[&[u8]]) -> CertificateChain<'static> {
    let mut chain = CertificateChain::new();
    for cert in certs {
        chain.parse_der(cert).unwrap();
    }
    chain
}

fn pem_chain() -> CertificateChain<'static> {
    let mut chain = CertificateChain::new();
    chain.parse(include_bytes!("examples/chain.pem")).unwrap();
    chain
}

fn crl(enc: &[u8]) -> Crl {
    Crl::from_der(enc).unwrap()
}

#[test]
fn revoked_end_entity() {
    let crls = [crl(include_bytes!("examples/crl_int.der"))];
    let flags = verify(&pem_chain(), &chain_of(&[ROOT]), &crls, None, None).unwrap();
    assert_eq!(flags, VerifyFlag::Revoked);

    // CRLs from unrelated issuers are ignored
    let cn_only = chain_of(&[include_bytes!("examples/ee_cn_only.der")]);
    assert!(verify(&cn_only, &chain_of(&[ROOT]), &crls, None, None)
        .unwrap()
        .is_empty());
}

#[test]
fn not_revoked() {
    let tas = chain_of(&[ROOT]);
    let crls = [crl(include_bytes!("examples/crl_int_not_revoked.der"))];
    assert!(verify(&pem_chain(), &tas, &crls, None, None)
        .unwrap()
        .is_empty());

    // listed, but only from a later date
    let crls = [crl(include_bytes!("examples/crl_int_revoked_later.der"))];
    assert!(verify(&pem_chain(), &tas, &crls, None, None)
        .unwrap()
        .is_empty());

    // the revocation date has passed by 2096-01-01
    let mut settings = ChainSettings::default();
    settings.time_of_interest = Some(TimeOfInterest::from_unix_secs(3_976_214_400).unwrap());
    let r = verify_with_settings(&pem_chain(), &tas, &crls, &settings, None, None).unwrap();
    assert_eq!(r.flags(), Some(VerifyFlag::Revoked.into()));
}

#[test]
fn every_matching_crl_is_consulted() {
    let crls = [
        crl(include_bytes!("examples/crl_int_not_revoked.der")),
        crl(include_bytes!("examples/crl_int.der")),
    ];
    let flags = verify(&pem_chain(), &chain_of(&[ROOT]), &crls, None, None).unwrap();
    assert_eq!(flags, VerifyFlag::Revoked);
}

#[test]
fn crl_validity() {
    let tas = chain_of(&[ROOT]);
    let crls = [crl(include_bytes!("examples/crl_int_expired.der"))];
    assert_eq!(
        verify(&pem_chain(), &tas, &crls, None, None).unwrap(),
        VerifyFlag::BadCrlExpired
    );
    let crls = [crl(include_bytes!("examples/crl_int_future.der"))];
    assert_eq!(
        verify(&pem_chain(), &tas, &crls, None, None).unwrap(),
        VerifyFlag::BadCrlFuture
    );
}

#[test]
fn untrusted_crls() {
    let tas = chain_of(&[ROOT]);

    // the issuer of the CRL may not sign CRLs
    let chain = chain_of(&[
        include_bytes!("examples/ee_under_no_crl_sign.der"),
        include_bytes!("examples/int_no_crl_sign.der"),
    ]);
    let crls = [crl(include_bytes!("examples/crl_no_crl_sign.der"))];
    assert_eq!(
        verify(&chain, &tas, &crls, None, None).unwrap(),
        VerifyFlag::BadCrlNotTrusted
    );
    assert!(verify(&chain, &tas, &[], None, None).unwrap().is_empty());

    let crls = [crl(include_bytes!("examples/crl_root_badsig.der"))];
    let cn_only = chain_of(&[include_bytes!("examples/ee_cn_only.der")]);
    assert_eq!(
        verify(&cn_only, &tas, &crls, None, None).unwrap(),
        VerifyFlag::BadCrlNotTrusted
    );
    // checked for the intermediate, which the root issued
    assert_eq!(
        verify(&pem_chain(), &tas, &crls, None, None).unwrap(),
        VerifyFlag::BadCrlNotTrusted
    );
}

#[test]
fn crl_accessors() {
    let c = crl(include_bytes!("examples/crl_int.der"));
    assert_eq!(c.version, 2);
    assert_eq!(c.entries.len(), 1);
    assert_eq!(c.entries[0].serial, vec![0x10, 0x01]);
    assert!(c.next_update.is_some());
    assert_eq!(c.raw(), &include_bytes!("examples/crl_int.der")[..]);
    assert_eq!(c.issuer_raw(), pem_chain()[1].subject_raw().unwrap());
}
