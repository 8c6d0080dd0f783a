//! use csrkit::error::CsrKitError;

use thiserror::Error;

/// Represents errors that can occur while building, signing or encoding
/// certificate requests and certificates.
///
/// Every operation fails closed: when an error is returned no partial
/// template, extension list or PEM bundle is handed back.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CsrKitError {
    /// The certificate specification cannot produce a valid request.
    #[error("invalid certificate spec: {0}")]
    InvalidSpec(String),

    /// A key algorithm, key size, curve or signature algorithm is not supported.
    #[error("unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// One or more key usages were not recognised. All offenders are listed.
    #[error("unknown key usages: [{}]", .0.join(" "))]
    UnknownUsage(Vec<String>),

    /// Signing failed, the key cannot sign, or the signed result did not parse.
    #[error("signing failed: {0}")]
    SigningFailure(String),

    /// ASN.1 or PEM serialization failed.
    #[error("failed to encode data: {0}")]
    EncodingFailure(String),

    /// Externally supplied DER or PEM data could not be decoded.
    #[error("failed to decode data: {0}")]
    DecodingError(String),

    /// The supplied certificates do not form exactly one chain.
    #[error("certificate chain is malformed or broken: {0}")]
    MalformedChain(String),
}

pub type Result<T> = std::result::Result<T, CsrKitError>;

impl From<der::Error> for CsrKitError {
    /// Converts a `der::Error` into a `CsrKitError`.
    fn from(err: der::Error) -> Self {
        CsrKitError::EncodingFailure(err.to_string())
    }
}

impl From<rsa::Error> for CsrKitError {
    fn from(err: rsa::Error) -> Self {
        CsrKitError::SigningFailure(err.to_string())
    }
}

impl From<pem::PemError> for CsrKitError {
    fn from(err: pem::PemError) -> Self {
        CsrKitError::DecodingError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_usage_lists_every_offender() {
        let err = CsrKitError::UnknownUsage(vec!["bogus1".to_string(), "bogus2".to_string()]);
        assert_eq!(err.to_string(), "unknown key usages: [bogus1 bogus2]");
    }
}
