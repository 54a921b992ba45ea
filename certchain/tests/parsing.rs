use certchain::{CachedCert, CertificateChain, Error, ParseCause, ParsePhase};

fn parse_err(enc: &[u8]) -> Error {
    match CachedCert::from_der(enc) {
        Ok(_) => panic!("malformed certificate was accepted"),
        Err(e) => e,
    }
}

#[test]
fn malformed_certificates() {
    assert_eq!(
        parse_err(include_bytes!("examples/ee_bad_version.der")),
        Error::parse(ParsePhase::Version, ParseCause::InvalidValue)
    );
    assert_eq!(
        parse_err(include_bytes!("examples/ee_sig_mismatch.der")),
        Error::parse(ParsePhase::Algorithm, ParseCause::SigMismatch)
    );
    assert_eq!(
        parse_err(include_bytes!("examples/ee_dup_ext.der")),
        Error::parse(ParsePhase::Extensions, ParseCause::DuplicateExtension)
    );

    let enc = include_bytes!("examples/ee_rsa.der");
    assert!(matches!(
        parse_err(&enc[..enc.len() - 1]),
        Error::Parse { .. } | Error::Asn1Error(_)
    ));
}

#[test]
fn extension_value_length_mismatch() {
    let mismatch = Error::parse(ParsePhase::Extensions, ParseCause::LengthMismatch);
    assert_eq!(parse_err(include_bytes!("examples/ee_bc_trailing.der")), mismatch);
    assert_eq!(parse_err(include_bytes!("examples/ee_ku_trailing.der")), mismatch);
    assert_eq!(parse_err(include_bytes!("examples/ee_ns_trailing.der")), mismatch);
}

#[test]
fn unsupported_critical_extension() {
    let e = parse_err(include_bytes!("examples/ee_unknown_critical.der"));
    assert_eq!(
        e,
        Error::parse(ParsePhase::Extensions, ParseCause::UnsupportedCriticalExtension)
    );
}

#[test]
fn v1_certificate() {
    let cert = CachedCert::from_der(include_bytes!("examples/v1_root.der")).unwrap();
    let frame = cert.get_frame().unwrap();
    assert_eq!(frame.version, 1);
    assert!(frame.ext_types.is_empty());
    // a v1 certificate is never a CA
    assert!(!frame.ca_istrue);
}

#[test]
fn extensions_in_v2_certificate() {
    let enc = include_bytes!("examples/v2_with_ext.der");
    if cfg!(feature = "allow_extensions_non_v3") {
        let frame = CachedCert::from_der(enc).unwrap().get_frame().unwrap();
        assert_eq!(frame.version, 2);
        assert!(frame.ca_istrue);
    } else {
        assert_eq!(
            parse_err(enc),
            Error::parse(ParsePhase::Format, ParseCause::LengthMismatch)
        );
    }
}

#[test]
fn pem_chain() {
    let mut chain = CertificateChain::new();
    assert_eq!(chain.parse(include_bytes!("examples/chain.pem")).unwrap(), 0);
    assert_eq!(chain.len(), 2);

    let ee = &chain[0];
    assert_eq!(ee.raw(), &include_bytes!("examples/ee_rsa.der")[..]);
    assert_eq!(ee.issuer_raw().unwrap(), chain[1].subject_raw().unwrap());
    assert!(ee
        .get_subject()
        .unwrap()
        .to_string()
        .contains("O=CertChain Tests"));

    let int = chain[1].get_frame().unwrap();
    assert!(int.ca_istrue);
    assert_eq!(int.max_pathlen, 1);
}

#[test]
fn bundle_with_bad_block() {
    let mut chain = CertificateChain::new();
    assert_eq!(chain.parse(include_bytes!("examples/bundle.pem")).unwrap(), 1);
    assert_eq!(chain.len(), 2);
    assert_eq!(chain[0].raw(), &include_bytes!("examples/root_rsa.der")[..]);
    assert_eq!(chain[1].raw(), &include_bytes!("examples/int_rsa.der")[..]);
}

#[test]
fn cache_is_filled_on_demand() {
    let chain_data = include_bytes!("examples/chain.pem");
    let mut chain = CertificateChain::new();
    chain.parse(chain_data).unwrap();
    for cert in chain.iter() {
        cert.flush_cache().unwrap();
        assert!(!cert.cache().has_frame().unwrap());
        assert!(!cert.cache().has_pk().unwrap());
    }

    // reading a field decodes the frame but not the key
    chain[0].serial().unwrap();
    assert!(chain[0].cache().has_frame().unwrap());
    assert!(!chain[0].cache().has_pk().unwrap());
    assert!(!chain[1].cache().has_frame().unwrap());

    let pk = chain[1].get_pk().unwrap();
    assert_eq!(pk.bit_len(), 2048);
    assert!(chain[1].cache().has_pk().unwrap());
}
