//! Loads the inputs named by [`ChaintoolArgs`] and runs the verification

use log::{debug, info};

use certchain::*;

use crate::args::ChaintoolArgs;

/// Outcome of a verification run as reported to the user.
pub enum Outcome {
    /// Path verified with no findings
    Succeeded,
    /// Path built, but with findings
    Failed(VerifyFlags),
}

fn load_certs(chain: &mut CertificateChain<'_>, files: &[String]) -> Result<()> {
    for f in files {
        let failed = chain.parse_file(f)?;
        if failed > 0 {
            info!("Skipped {} unparseable PEM blocks in {}", failed, f);
        }
    }
    Ok(())
}

fn load_trust_anchors(args: &ChaintoolArgs) -> Result<CertificateChain<'static>> {
    let mut trust_ca = CertificateChain::new();
    if let Some(folder) = &args.ta_folder {
        let failed = trust_ca.parse_path(folder)?;
        if failed > 0 {
            info!("Ignored {} files or blocks in {}", failed, folder);
        }
    }
    load_certs(&mut trust_ca, &args.trust_anchor)?;
    if trust_ca.is_empty() {
        info!("No trust anchors were loaded");
    } else {
        debug!("Loaded {} trust anchors", trust_ca.len());
    }
    Ok(trust_ca)
}

cfg_if::cfg_if! {
    if #[cfg(feature = "revocation")] {
        fn load_crls(args: &ChaintoolArgs) -> Result<Vec<Crl>> {
            let mut crls = Vec::new();
            for f in &args.crl {
                crls.extend(parse_crl_file(f)?);
            }
            debug!("Loaded {} CRLs", crls.len());
            Ok(crls)
        }
    } else {
        fn load_crls(_args: &ChaintoolArgs) -> Result<Vec<Crl>> {
            Ok(Vec::new())
        }
    }
}

/// Merges the settings file, if any, with the overrides given on the command line.
pub fn settings_from_args(args: &ChaintoolArgs) -> Result<ChainSettings> {
    let mut settings = match &args.settings {
        Some(f) => read_settings(f)?,
        None => ChainSettings::default(),
    };
    if let Some(name) = &args.profile {
        settings.profile = Profile::by_name(name)?;
    }
    if let Some(cn) = &args.cn {
        settings.expected_cn = Some(cn.clone());
    }
    if let Some(toi) = args.time_of_interest {
        settings.time_of_interest = Some(TimeOfInterest::from_unix_secs(toi)?);
    }
    Ok(settings)
}

/// Verifies the end entity named in `args`.
pub fn verify_end_entity(args: &ChaintoolArgs) -> Result<Outcome> {
    let settings = settings_from_args(args)?;

    let mut chain = CertificateChain::new();
    chain.parse_file(&args.end_entity)?;
    load_certs(&mut chain, &args.chain)?;
    let trust_ca = load_trust_anchors(args)?;
    let crls = load_crls(args)?;

    let flags = match args.max_ops {
        Some(max_ops) => {
            let mut rs = RestartContext::new(max_ops);
            let mut suspended = 0;
            let flags = loop {
                match verify_with_settings(&chain, &trust_ca, &crls, &settings, None, Some(&mut rs))? {
                    Verification::Complete(flags) => break flags,
                    Verification::InProgress => suspended += 1,
                }
            };
            info!("Verification was suspended {} times", suspended);
            flags
        }
        None => match verify_with_settings(&chain, &trust_ca, &crls, &settings, None, None)? {
            Verification::Complete(flags) => flags,
            Verification::InProgress => return Err(Error::Fatal),
        },
    };

    if flags.is_empty() {
        Ok(Outcome::Succeeded)
    } else {
        Ok(Outcome::Failed(flags))
    }
}
