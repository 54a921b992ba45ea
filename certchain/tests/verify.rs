use certchain::{
    verify, verify_with_profile, verify_with_settings, CachedCert, CertificateChain,
    ChainSettings, Error, Profile, TimeOfInterest, Verification, VerifyCallback, VerifyFlag,
    VerifyFlags,
};

const ROOT: &[u8] = include_bytes!("examples/root_rsa.der");
const ROOT_EXPIRED: &[u8] = include_bytes!("examples/root_rsa_expired.der");
const ROOT_OTHER_KEY: &[u8] = include_bytes!("examples/root_rsa_other_key.der");
const INT: &[u8] = include_bytes!("examples/int_rsa.der");
const INT2: &[u8] = include_bytes!("examples/int2_rsa.der");
const EE: &[u8] = include_bytes!("examples/ee_rsa.der");

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

#[test]
fn trusted_chain() {
    let flags = verify(&pem_chain(), &chain_of(&[ROOT]), &[], None, None).unwrap();
    assert!(flags.is_empty());

    // anchors that cannot have issued anything in the chain are skipped
    let tas = chain_of(&[include_bytes!("examples/root_ec.der"), ROOT]);
    assert!(verify(&pem_chain(), &tas, &[], None, None).unwrap().is_empty());
}

#[test]
fn bad_signature() {
    let chain = chain_of(&[include_bytes!("examples/ee_rsa_badsig.der"), INT]);
    let flags = verify(&chain, &chain_of(&[ROOT]), &[], None, None).unwrap();
    assert_eq!(flags, VerifyFlag::NotTrusted);
}

#[test]
fn missing_issuer() {
    let flags = verify(&chain_of(&[EE]), &chain_of(&[ROOT]), &[], None, None).unwrap();
    assert_eq!(flags, VerifyFlag::NotTrusted);

    let tas = chain_of(&[include_bytes!("examples/root_ec.der")]);
    let flags = verify(&pem_chain(), &tas, &[], None, None).unwrap();
    assert_eq!(flags, VerifyFlag::NotTrusted);
}

#[test]
fn anchor_with_wrong_key() {
    // same name, but the signature of the intermediate does not verify
    let flags = verify(&pem_chain(), &chain_of(&[ROOT_OTHER_KEY]), &[], None, None).unwrap();
    assert_eq!(flags, VerifyFlag::NotTrusted);
}

#[test]
fn anchor_rollover() {
    let ee = chain_of(&[include_bytes!("examples/ee_cn_only.der")]);

    let tas = chain_of(&[ROOT_EXPIRED, ROOT]);
    assert!(verify(&ee, &tas, &[], None, None).unwrap().is_empty());

    // an expired anchor is still used when there is nothing better
    let tas = chain_of(&[ROOT_EXPIRED]);
    let mut depths = Vec::new();
    let cb: &mut VerifyCallback<'_> =
        &mut |_cert: &CachedCert<'_>, depth: usize, flags: &mut VerifyFlags| {
            depths.push((depth, *flags));
            Ok(())
        };
    let flags = verify(&ee, &tas, &[], None, Some(cb)).unwrap();
    assert_eq!(flags, VerifyFlag::Expired);
    assert_eq!(
        depths,
        vec![
            (1, VerifyFlag::Expired.into()),
            (0, VerifyFlags::default())
        ]
    );
}

#[test]
fn path_length_constraint() {
    // the intermediate allows no further intermediates below it
    let chain = chain_of(&[include_bytes!("examples/ee_sub.der"), INT2, INT]);
    let flags = verify(&chain, &chain_of(&[ROOT]), &[], None, None).unwrap();
    assert_eq!(flags, VerifyFlag::NotTrusted);
}

#[test]
fn v1_anchor() {
    let ee = chain_of(&[include_bytes!("examples/ee_under_v1.der")]);
    let v1: &[u8] = include_bytes!("examples/v1_root.der");
    assert!(verify(&ee, &chain_of(&[v1]), &[], None, None)
        .unwrap()
        .is_empty());

    // an untrusted v1 certificate cannot act as a CA
    let chain = chain_of(&[include_bytes!("examples/ee_under_v1.der"), v1]);
    let flags = verify(&chain, &chain_of(&[ROOT]), &[], None, None).unwrap();
    assert_eq!(flags, VerifyFlag::NotTrusted);
}

#[test]
fn end_entity_is_anchor() {
    let root = chain_of(&[ROOT]);
    assert!(verify(&root, &root, &[], None, None).unwrap().is_empty());

    // self-signed but not trusted
    let ec = chain_of(&[include_bytes!("examples/root_ec.der")]);
    let flags = verify(&ec, &root, &[], None, None).unwrap();
    assert_eq!(flags, VerifyFlag::NotTrusted);
}

#[test]
fn validity_period() {
    let tas = chain_of(&[ROOT]);
    let expired = chain_of(&[include_bytes!("examples/ee_expired.der")]);
    assert_eq!(
        verify(&expired, &tas, &[], None, None).unwrap(),
        VerifyFlag::Expired
    );
    let future = chain_of(&[include_bytes!("examples/ee_future.der")]);
    assert_eq!(
        verify(&future, &tas, &[], None, None).unwrap(),
        VerifyFlag::Future
    );
}

#[test]
fn host_names() {
    let tas = chain_of(&[ROOT]);
    let chain = pem_chain();
    for cn in ["www.example.org", "a.example.com", "A.EXAMPLE.COM"] {
        assert!(
            verify(&chain, &tas, &[], Some(cn), None).unwrap().is_empty(),
            "{}",
            cn
        );
    }
    for cn in ["example.com", "a.b.example.com", "ee.example.net"] {
        assert_eq!(
            verify(&chain, &tas, &[], Some(cn), None).unwrap(),
            VerifyFlag::CnMismatch,
            "{}",
            cn
        );
    }

    // without subjectAltName the common name is used
    let cn_only = chain_of(&[include_bytes!("examples/ee_cn_only.der")]);
    assert!(verify(&cn_only, &tas, &[], Some("host.example.net"), None)
        .unwrap()
        .is_empty());
    assert_eq!(
        verify(&cn_only, &tas, &[], Some("other.example.net"), None).unwrap(),
        VerifyFlag::CnMismatch
    );
}

#[test]
fn callback_sees_path_top_down() {
    let mut seen = Vec::new();
    let cb: &mut VerifyCallback<'_> =
        &mut |cert: &CachedCert<'_>, depth: usize, _flags: &mut VerifyFlags| {
            seen.push((depth, cert.serial()?.to_vec()));
            Ok(())
        };
    let flags = verify(&pem_chain(), &chain_of(&[ROOT]), &[], None, Some(cb)).unwrap();
    assert!(flags.is_empty());
    assert_eq!(
        seen,
        vec![(2, vec![0x01]), (1, vec![0x10]), (0, vec![0x10, 0x01])]
    );
}

#[test]
fn callback_overrides_flags() {
    let chain = chain_of(&[include_bytes!("examples/ee_rsa_badsig.der"), INT]);
    let tas = chain_of(&[ROOT]);

    let cb: &mut VerifyCallback<'_> =
        &mut |_cert: &CachedCert<'_>, _depth: usize, flags: &mut VerifyFlags| {
            *flags -= VerifyFlag::NotTrusted;
            Ok(())
        };
    assert!(verify(&chain, &tas, &[], None, Some(cb)).unwrap().is_empty());

    let cb: &mut VerifyCallback<'_> =
        &mut |_cert: &CachedCert<'_>, depth: usize, flags: &mut VerifyFlags| {
            if depth == 1 {
                *flags |= VerifyFlag::Other;
            }
            Ok(())
        };
    assert_eq!(
        verify(&pem_chain(), &tas, &[], None, Some(cb)).unwrap(),
        VerifyFlag::Other
    );
}

#[test]
fn callback_errors() {
    let tas = chain_of(&[ROOT]);

    // a callback rejecting the path with VerifyFailed is reported as fatal
    let cb: &mut VerifyCallback<'_> =
        &mut |_cert: &CachedCert<'_>, _depth: usize, _flags: &mut VerifyFlags| {
            Err(Error::VerifyFailed)
        };
    assert_eq!(
        verify(&pem_chain(), &tas, &[], None, Some(cb)),
        Err(Error::Fatal)
    );

    let cb: &mut VerifyCallback<'_> =
        &mut |_cert: &CachedCert<'_>, _depth: usize, _flags: &mut VerifyFlags| {
            Err(Error::BadInputData)
        };
    assert_eq!(
        verify(&pem_chain(), &tas, &[], None, Some(cb)),
        Err(Error::BadInputData)
    );
}

#[test]
fn empty_chain() {
    assert_eq!(
        verify(&CertificateChain::new(), &chain_of(&[ROOT]), &[], None, None),
        Err(Error::BadInputData)
    );
}

#[test]
fn profiles() {
    let tas = chain_of(&[ROOT]);

    let sha1 = chain_of(&[include_bytes!("examples/ee_sha1.der")]);
    let flags = verify(&sha1, &tas, &[], None, None).unwrap();
    if cfg!(feature = "default_allow_sha1") {
        assert!(flags.is_empty());
    } else {
        assert_eq!(flags, VerifyFlag::BadMd);
    }
    assert_eq!(
        verify_with_profile(&sha1, &tas, &[], &Profile::next(), None, None).unwrap(),
        VerifyFlag::BadMd
    );

    let small = chain_of(&[include_bytes!("examples/ee_rsa1024.der")]);
    assert_eq!(
        verify(&small, &tas, &[], None, None).unwrap(),
        VerifyFlag::BadKey
    );

    // RSA is not part of Suite B
    let flags =
        verify_with_profile(&pem_chain(), &tas, &[], &Profile::suiteb(), None, None).unwrap();
    assert_eq!(flags, VerifyFlag::BadPk);
}

#[test]
fn ec_chains() {
    let ec = chain_of(&[include_bytes!("examples/ee_ec.der")]);
    let ec_root = chain_of(&[include_bytes!("examples/root_ec.der")]);
    let p384 = chain_of(&[include_bytes!("examples/ee_p384.der")]);
    let p384_root = chain_of(&[include_bytes!("examples/root_p384.der")]);

    for profile in [Profile::default_profile(), Profile::next(), Profile::suiteb()] {
        assert!(verify_with_profile(&ec, &ec_root, &[], &profile, None, None)
            .unwrap()
            .is_empty());
        assert!(verify_with_profile(&p384, &p384_root, &[], &profile, None, None)
            .unwrap()
            .is_empty());
    }

    // secp256k1 is not an acceptable curve
    let k1 = chain_of(&[include_bytes!("examples/root_k1.der")]);
    assert_eq!(
        verify_with_profile(&k1, &k1, &[], &Profile::suiteb(), None, None).unwrap(),
        VerifyFlag::BadKey
    );
}

#[test]
fn settings() {
    let tas = chain_of(&[ROOT]);

    let mut settings = ChainSettings::default();
    // 2016-01-01, before any of the certificates became valid
    settings.time_of_interest = Some(TimeOfInterest::from_unix_secs(1_451_606_400).unwrap());
    let r = verify_with_settings(&pem_chain(), &tas, &[], &settings, None, None).unwrap();
    assert_eq!(r, Verification::Complete(VerifyFlag::Future.into()));

    // 2012-01-01, while the expired anchor and certificate were valid
    settings.time_of_interest = Some(TimeOfInterest::from_unix_secs(1_325_376_000).unwrap());
    let old = chain_of(&[include_bytes!("examples/ee_expired.der")]);
    let r = verify_with_settings(&old, &chain_of(&[ROOT_EXPIRED]), &[], &settings, None, None)
        .unwrap();
    assert_eq!(r.flags(), Some(VerifyFlags::default()));

    let mut settings = ChainSettings::default();
    settings.expected_cn = Some("www.example.org".to_string());
    settings.max_intermediate_ca = 1;
    let r = verify_with_settings(&pem_chain(), &tas, &[], &settings, None, None).unwrap();
    assert!(r.flags().unwrap().is_empty());

    settings.max_intermediate_ca = 0;
    assert_eq!(
        verify_with_settings(&pem_chain(), &tas, &[], &settings, None, None),
        Err(Error::Fatal)
    );
}

#[test]
fn concurrent_verification() {
    let chain = pem_chain();
    let tas = chain_of(&[ROOT]);
    std::thread::scope(|s| {
        let handles: Vec<_> = (0..4)
            .map(|_| s.spawn(|| verify(&chain, &tas, &[], Some("www.example.org"), None)))
            .collect();
        for h in handles {
            assert!(h.join().unwrap().unwrap().is_empty());
        }
    });
}
