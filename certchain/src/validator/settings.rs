//! Settings that govern one verification, loadable from JSON

use alloc::string::{String, ToString};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::util::error::{Error, Result};
use crate::util::time_of_interest::TimeOfInterest;
use crate::validator::profile::Profile;

/// Maximum number of intermediate CA certificates in a chain unless configured otherwise.
pub const MAX_INTERMEDIATE_CA: usize = 8;

fn default_max_intermediate_ca() -> usize {
    MAX_INTERMEDIATE_CA
}

/// [`ChainSettings`] bundles the inputs to verification other than the certificates and CRLs.
///
/// Every field is optional in JSON form, e.g. `{"profile": {...}, "time_of_interest": 1700000000}`.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainSettings {
    /// Cryptographic-strength profile
    pub profile: Profile,
    /// Time used for every validity check; the current time when absent
    pub time_of_interest: Option<TimeOfInterest>,
    /// Maximum number of intermediate CA certificates between the end entity and the trust anchor
    #[serde(default = "default_max_intermediate_ca")]
    pub max_intermediate_ca: usize,
    /// Host name the end entity certificate must match
    pub expected_cn: Option<String>,
}

impl Default for ChainSettings {
    fn default() -> Self {
        ChainSettings {
            profile: Profile::default_profile(),
            time_of_interest: None,
            max_intermediate_ca: MAX_INTERMEDIATE_CA,
            expected_cn: None,
        }
    }
}

impl ChainSettings {
    /// Settings with the given profile and everything else defaulted.
    pub fn with_profile(profile: Profile) -> Self {
        ChainSettings {
            profile,
            ..Default::default()
        }
    }

    /// The configured time of interest, or the current time.
    pub fn time_of_interest(&self) -> Result<TimeOfInterest> {
        match self.time_of_interest {
            Some(toi) => Ok(toi),
            None => TimeOfInterest::now(),
        }
    }
}

/// Reads [`ChainSettings`] from the JSON file at `fname`.
pub fn read_settings(fname: impl AsRef<Path>) -> Result<ChainSettings> {
    let json = std::fs::read(fname.as_ref())?;
    serde_json::from_slice(&json).map_err(|e| Error::Settings(e.to_string()))
}

#[test]
fn default_settings() {
    let cs = ChainSettings::default();
    assert_eq!(cs.max_intermediate_ca, 8);
    assert_eq!(cs.profile, Profile::default_profile());
    assert!(cs.expected_cn.is_none());
    let now = TimeOfInterest::now().unwrap();
    assert!(cs.time_of_interest().unwrap() >= now);
}

#[test]
fn settings_from_json() {
    let cs: ChainSettings =
        serde_json::from_str(r#"{"time_of_interest": 1700000000, "expected_cn": "a.example.com"}"#)
            .unwrap();
    assert_eq!(cs.time_of_interest().unwrap().as_unix_secs(), 1_700_000_000);
    assert_eq!(cs.max_intermediate_ca, MAX_INTERMEDIATE_CA);
    assert_eq!(cs.expected_cn.as_deref(), Some("a.example.com"));

    let mut cs = ChainSettings::with_profile(Profile::suiteb());
    cs.max_intermediate_ca = 2;
    let json = serde_json::to_string(&cs).unwrap();
    let back: ChainSettings = serde_json::from_str(&json).unwrap();
    assert_eq!(back, cs);
}

#[test]
fn settings_file() {
    use std::io::Write;

    let mut f = tempfile::NamedTempFile::new().unwrap();
    f.write_all(br#"{"max_intermediate_ca": 1}"#).unwrap();
    assert_eq!(read_settings(f.path()).unwrap().max_intermediate_ca, 1);

    let mut bad = tempfile::NamedTempFile::new().unwrap();
    bad.write_all(b"{not json").unwrap();
    assert!(matches!(read_settings(bad.path()), Err(Error::Settings(_))));

    assert_eq!(
        read_settings("does/not/exist.json"),
        Err(Error::StdIoError(std::io::ErrorKind::NotFound))
    );
}
