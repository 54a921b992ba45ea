//! Arguments for the chaintool utility

use clap::Parser;

/// Builds and verifies a certification path for one end entity certificate
#[derive(Parser, Debug, Default)]
#[command(arg_required_else_help(true))]
#[clap(author, version, about, long_about = None)]
pub struct ChaintoolArgs {
    /// Full path and filename of the end entity certificate to verify (DER or PEM). Further
    /// certificates in a PEM file are treated as untrusted intermediate CA certificates.
    #[clap(short, long, help_heading = "INPUTS")]
    pub end_entity: String,

    /// Full path and filename of a DER or PEM file with untrusted intermediate CA certificates.
    /// May be repeated.
    #[clap(short, long, help_heading = "INPUTS")]
    pub chain: Vec<String>,

    /// Full path of folder containing trust anchors (DER or PEM). Subfolders are not traversed.
    #[clap(short, long, help_heading = "INPUTS")]
    pub ta_folder: Option<String>,

    /// Full path and filename of a trust anchor (DER or PEM). May be repeated.
    #[clap(short = 'a', long, help_heading = "INPUTS")]
    pub trust_anchor: Vec<String>,

    /// Full path and filename of a DER or PEM file with CRLs. May be repeated.
    #[cfg(feature = "revocation")]
    #[clap(short = 'r', long, help_heading = "INPUTS")]
    pub crl: Vec<String>,

    /// Full path and filename of a JSON file with verification settings. Options given on the
    /// command line take precedence over its contents.
    #[clap(short, long, help_heading = "VERIFICATION")]
    pub settings: Option<String>,

    /// Cryptographic-strength profile: default, next or suiteb.
    #[clap(short, long, help_heading = "VERIFICATION")]
    pub profile: Option<String>,

    /// Host name the end entity certificate must match.
    #[clap(long, help_heading = "VERIFICATION")]
    pub cn: Option<String>,

    /// Time to use for verification expressed as the number of seconds since Unix epoch
    /// (defaults to current system time).
    #[clap(short = 'i', long, help_heading = "VERIFICATION")]
    pub time_of_interest: Option<u64>,

    /// Number of operations an ECDSA check may perform per call. When given, verification is
    /// run as a sequence of restartable calls and the number of suspensions is logged.
    #[clap(short, long, help_heading = "VERIFICATION")]
    pub max_ops: Option<u32>,

    /// Full path and filename of YAML-formatted configuration file for log4rs logging mechanism.
    /// See <https://docs.rs/log4rs/latest/log4rs/> for details.
    #[clap(short, long, help_heading = "COMMON OPTIONS")]
    pub logging_config: Option<String>,
}
