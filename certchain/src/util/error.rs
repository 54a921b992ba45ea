//! Error types

use alloc::string::String;
use core::fmt;

/// Result type
pub type Result<T> = core::result::Result<T, Error>;

/// Structure being decoded when a parse error was raised.
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord)]
pub enum ParsePhase {
    /// Outer Certificate or TBSCertificate framing
    Format,
    /// The explicitly tagged version field
    Version,
    /// The serial number
    Serial,
    /// An AlgorithmIdentifier, including the signature algorithm lookup
    Algorithm,
    /// An issuer or subject Name
    Name,
    /// The Validity dates
    Date,
    /// The signature BIT STRING
    Signature,
    /// The SubjectPublicKeyInfo or the key it carries
    PublicKey,
    /// The extensions block or one of the supported extensions
    Extensions,
    /// A CertificateList
    Crl,
}

/// Reason a parse error was raised.
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord)]
pub enum ParseCause {
    /// A tag other than the expected one was found
    UnexpectedTag,
    /// A length field could not be decoded or exceeds the enclosing structure
    InvalidLength,
    /// A structure did not consume exactly the bytes its length announced
    LengthMismatch,
    /// The input ended before the structure was complete
    OutOfData,
    /// A field was well formed but carried a value outside its permitted range
    InvalidValue,
    /// An OBJECT IDENTIFIER did not map to a supported algorithm, curve or key type
    UnknownOid,
    /// The inner and outer signature AlgorithmIdentifiers differ
    SigMismatch,
    /// The same extension type appeared more than once
    DuplicateExtension,
    /// An unrecognized extension was marked critical
    UnsupportedCriticalExtension,
}

/// Error type
#[derive(Clone, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub enum Error {
    /// A certificate, name, key or CRL could not be decoded
    Parse {
        /// structure being decoded
        phase: ParsePhase,
        /// what went wrong
        cause: ParseCause,
    },
    /// Input was neither a DER certificate nor a PEM bundle containing one
    CertUnknownFormat,
    /// A PEM block could not be decoded
    Pem(pem_rfc7468::Error),
    /// Asn1Error is used to propagate error information from the der and x509-cert crates.
    Asn1Error(der::Error),
    /// A caller-supplied argument was unusable
    BadInputData,
    /// The requested algorithm or feature is not available in this build
    FeatureUnavailable,
    /// Verification produced a non-empty flag set
    VerifyFailed,
    /// Chain building could not be completed, e.g., too many intermediate CA certificates
    Fatal,
    /// The certificate's keyUsage extension does not permit the requested usage
    KeyUsageMismatch,
    /// The certificate's extendedKeyUsage extension does not permit the requested purpose
    ExtKeyUsageMismatch,
    /// A cache lock was poisoned by a panicking thread
    Poisoned,
    /// Error encapsulates an error derived from [std::io::ErrorKind]
    StdIoError(std::io::ErrorKind),
    /// A settings file could not be read
    Settings(String),
}

impl Error {
    /// Shorthand for a [`Error::Parse`] value.
    pub const fn parse(phase: ParsePhase, cause: ParseCause) -> Self {
        Error::Parse { phase, cause }
    }
}

impl From<der::Error> for Error {
    fn from(err: der::Error) -> Error {
        Error::Asn1Error(err)
    }
}

impl From<pem_rfc7468::Error> for Error {
    fn from(err: pem_rfc7468::Error) -> Error {
        Error::Pem(err)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Error {
        Error::StdIoError(err.kind())
    }
}

impl fmt::Display for ParsePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParsePhase::Format => write!(f, "Format"),
            ParsePhase::Version => write!(f, "Version"),
            ParsePhase::Serial => write!(f, "Serial"),
            ParsePhase::Algorithm => write!(f, "Algorithm"),
            ParsePhase::Name => write!(f, "Name"),
            ParsePhase::Date => write!(f, "Date"),
            ParsePhase::Signature => write!(f, "Signature"),
            ParsePhase::PublicKey => write!(f, "PublicKey"),
            ParsePhase::Extensions => write!(f, "Extensions"),
            ParsePhase::Crl => write!(f, "Crl"),
        }
    }
}

impl fmt::Display for ParseCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseCause::UnexpectedTag => write!(f, "UnexpectedTag"),
            ParseCause::InvalidLength => write!(f, "InvalidLength"),
            ParseCause::LengthMismatch => write!(f, "LengthMismatch"),
            ParseCause::OutOfData => write!(f, "OutOfData"),
            ParseCause::InvalidValue => write!(f, "InvalidValue"),
            ParseCause::UnknownOid => write!(f, "UnknownOid"),
            ParseCause::SigMismatch => write!(f, "SigMismatch"),
            ParseCause::DuplicateExtension => write!(f, "DuplicateExtension"),
            ParseCause::UnsupportedCriticalExtension => write!(f, "UnsupportedCriticalExtension"),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Parse { phase, cause } => write!(f, "ParseError: {} ({})", phase, cause),
            Error::CertUnknownFormat => write!(f, "CertUnknownFormat"),
            Error::Pem(err) => write!(f, "PemError: {}", err),
            Error::Asn1Error(err) => write!(f, "Asn1Error: {}", err),
            Error::BadInputData => write!(f, "BadInputData"),
            Error::FeatureUnavailable => write!(f, "FeatureUnavailable"),
            Error::VerifyFailed => write!(f, "VerifyFailed"),
            Error::Fatal => write!(f, "Fatal"),
            Error::KeyUsageMismatch => write!(f, "KeyUsageMismatch"),
            Error::ExtKeyUsageMismatch => write!(f, "ExtKeyUsageMismatch"),
            Error::Poisoned => write!(f, "Poisoned"),
            Error::StdIoError(err) => write!(f, "StdError: {:?}", err),
            Error::Settings(err) => write!(f, "SettingsError: {}", err),
        }
    }
}

#[test]
fn error_test() {
    use alloc::format;

    let s = format!(
        "{}",
        Error::parse(ParsePhase::Extensions, ParseCause::DuplicateExtension)
    );
    assert_eq!(s, "ParseError: Extensions (DuplicateExtension)");
    assert_ne!(
        Error::parse(ParsePhase::Name, ParseCause::LengthMismatch),
        Error::parse(ParsePhase::Date, ParseCause::LengthMismatch)
    );

    let _s = format!("{}", ParsePhase::Format);
    let _s = format!("{}", ParsePhase::Version);
    let _s = format!("{}", ParsePhase::Serial);
    let _s = format!("{}", ParsePhase::Algorithm);
    let _s = format!("{}", ParsePhase::Signature);
    let _s = format!("{}", ParsePhase::PublicKey);
    let _s = format!("{}", ParsePhase::Crl);
    let _s = format!("{}", ParseCause::UnexpectedTag);
    let _s = format!("{}", ParseCause::InvalidLength);
    let _s = format!("{}", ParseCause::OutOfData);
    let _s = format!("{}", ParseCause::InvalidValue);
    let _s = format!("{}", ParseCause::UnknownOid);
    let _s = format!("{}", ParseCause::SigMismatch);
    let _s = format!("{}", ParseCause::UnsupportedCriticalExtension);

    let _s = format!("{}", Error::CertUnknownFormat);
    let _s = format!("{}", Error::Pem(pem_rfc7468::Error::PreEncapsulationBoundary));
    let _s = format!("{}", Error::Asn1Error(der::ErrorKind::Failed.into()));
    let _s = format!("{}", Error::BadInputData);
    let _s = format!("{}", Error::FeatureUnavailable);
    let _s = format!("{}", Error::VerifyFailed);
    let _s = format!("{}", Error::Fatal);
    let _s = format!("{}", Error::KeyUsageMismatch);
    let _s = format!("{}", Error::ExtKeyUsageMismatch);
    let _s = format!("{}", Error::Poisoned);
    let _s = format!("{}", Error::StdIoError(std::io::ErrorKind::NotFound));
    let _s = format!("{}", Error::Settings("bad".into()));
}
