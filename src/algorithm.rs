//! Selection of public-key and signature algorithms.
//!
//! The mapping from a key to the signature algorithm used with it is a pure
//! function of the key algorithm and its size or curve:
//!
//! | key | signature |
//! | --- | --- |
//! | RSA >= 4096 bits | SHA-512 with RSA |
//! | RSA >= 3072 bits | SHA-384 with RSA |
//! | RSA >= 2048 bits | SHA-256 with RSA |
//! | ECDSA P-521 | ECDSA with SHA-512 |
//! | ECDSA P-384 | ECDSA with SHA-384 |
//! | ECDSA P-256 | ECDSA with SHA-256 |
//! | Ed25519 | pure Ed25519 |

use core::fmt;
use core::str::FromStr;

use const_oid::ObjectIdentifier;
use der::{Any, AnyRef};
use x509_cert::spki::AlgorithmIdentifierOwned;

use crate::cert::params::CertificateSpec;
use crate::error::{CsrKitError, Result};
use crate::oid;

/// Smallest RSA key size accepted, and the size assumed when none is given.
pub const MIN_RSA_KEY_SIZE: usize = 2048;

/// Public-key algorithm families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyAlgorithm {
    Rsa,
    Ecdsa,
    Ed25519,
}

impl FromStr for KeyAlgorithm {
    type Err = CsrKitError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "RSA" => Ok(KeyAlgorithm::Rsa),
            "ECDSA" => Ok(KeyAlgorithm::Ecdsa),
            "Ed25519" => Ok(KeyAlgorithm::Ed25519),
            other => Err(CsrKitError::UnsupportedAlgorithm(format!(
                "unsupported algorithm specified: {other}. should be either 'ecdsa', 'ed25519' or 'rsa'"
            ))),
        }
    }
}

impl fmt::Display for KeyAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            KeyAlgorithm::Rsa => "RSA",
            KeyAlgorithm::Ecdsa => "ECDSA",
            KeyAlgorithm::Ed25519 => "Ed25519",
        })
    }
}

/// NIST curves supported for ECDSA keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EcdsaCurve {
    P256,
    P384,
    P521,
}

impl EcdsaCurve {
    /// Maps a declared ECDSA key size to its curve. A size of 0 means P-256.
    pub fn from_key_size(size: usize) -> Result<Self> {
        match size {
            0 | 256 => Ok(EcdsaCurve::P256),
            384 => Ok(EcdsaCurve::P384),
            521 => Ok(EcdsaCurve::P521),
            other => Err(CsrKitError::UnsupportedAlgorithm(format!(
                "unsupported ecdsa keysize specified: {other}"
            ))),
        }
    }

    pub fn oid(&self) -> ObjectIdentifier {
        match self {
            EcdsaCurve::P256 => oid::EC_SECP_256_R1,
            EcdsaCurve::P384 => oid::EC_SECP_384_R1,
            EcdsaCurve::P521 => oid::EC_SECP_521_R1,
        }
    }

    pub fn from_oid(curve: &ObjectIdentifier) -> Option<Self> {
        match *curve {
            oid::EC_SECP_256_R1 => Some(EcdsaCurve::P256),
            oid::EC_SECP_384_R1 => Some(EcdsaCurve::P384),
            oid::EC_SECP_521_R1 => Some(EcdsaCurve::P521),
            _ => None,
        }
    }
}

/// The algorithm-specific argument used to pick a signature algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyParameter {
    /// RSA modulus size in bits.
    RsaBits(usize),
    /// ECDSA curve.
    Curve(EcdsaCurve),
    /// No argument, as for Ed25519.
    None,
}

/// Represents the supported signature algorithms for certificates and requests.
///
/// This enum provides a mapping to the corresponding OIDs for each algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignatureAlgorithm {
    /// SHA-256 with RSA encryption (PKCS#1 v1.5).
    Sha256WithRSA,
    /// SHA-384 with RSA encryption (PKCS#1 v1.5).
    Sha384WithRSA,
    /// SHA-512 with RSA encryption (PKCS#1 v1.5).
    Sha512WithRSA,
    /// SHA-256 with ECDSA.
    Sha256WithECDSA,
    /// SHA-384 with ECDSA.
    Sha384WithECDSA,
    /// SHA-512 with ECDSA.
    Sha512WithECDSA,
    /// Ed25519 over the whole message.
    PureEd25519,
}

impl SignatureAlgorithm {
    pub fn oid(&self) -> ObjectIdentifier {
        match self {
            SignatureAlgorithm::Sha256WithRSA => oid::SHA256_WITH_RSA,
            SignatureAlgorithm::Sha384WithRSA => oid::SHA384_WITH_RSA,
            SignatureAlgorithm::Sha512WithRSA => oid::SHA512_WITH_RSA,
            SignatureAlgorithm::Sha256WithECDSA => oid::ECDSA_WITH_SHA256,
            SignatureAlgorithm::Sha384WithECDSA => oid::ECDSA_WITH_SHA384,
            SignatureAlgorithm::Sha512WithECDSA => oid::ECDSA_WITH_SHA512,
            SignatureAlgorithm::PureEd25519 => oid::ED25519,
        }
    }

    pub fn from_oid(algorithm: &ObjectIdentifier) -> Result<Self> {
        match *algorithm {
            oid::SHA256_WITH_RSA => Ok(SignatureAlgorithm::Sha256WithRSA),
            oid::SHA384_WITH_RSA => Ok(SignatureAlgorithm::Sha384WithRSA),
            oid::SHA512_WITH_RSA => Ok(SignatureAlgorithm::Sha512WithRSA),
            oid::ECDSA_WITH_SHA256 => Ok(SignatureAlgorithm::Sha256WithECDSA),
            oid::ECDSA_WITH_SHA384 => Ok(SignatureAlgorithm::Sha384WithECDSA),
            oid::ECDSA_WITH_SHA512 => Ok(SignatureAlgorithm::Sha512WithECDSA),
            oid::ED25519 => Ok(SignatureAlgorithm::PureEd25519),
            other => Err(CsrKitError::UnsupportedAlgorithm(format!(
                "unsupported signature algorithm oid: {other}"
            ))),
        }
    }

    /// The key family able to produce signatures of this kind.
    pub fn key_algorithm(&self) -> KeyAlgorithm {
        match self {
            SignatureAlgorithm::Sha256WithRSA
            | SignatureAlgorithm::Sha384WithRSA
            | SignatureAlgorithm::Sha512WithRSA => KeyAlgorithm::Rsa,
            SignatureAlgorithm::Sha256WithECDSA
            | SignatureAlgorithm::Sha384WithECDSA
            | SignatureAlgorithm::Sha512WithECDSA => KeyAlgorithm::Ecdsa,
            SignatureAlgorithm::PureEd25519 => KeyAlgorithm::Ed25519,
        }
    }
}

impl From<SignatureAlgorithm> for AlgorithmIdentifierOwned {
    /// Converts a `SignatureAlgorithm` into an `AlgorithmIdentifierOwned`.
    ///
    /// RSA algorithm identifiers carry explicit NULL parameters, ECDSA and
    /// Ed25519 identifiers carry none.
    fn from(value: SignatureAlgorithm) -> Self {
        let parameters = match value.key_algorithm() {
            KeyAlgorithm::Rsa => Some(Any::from(AnyRef::NULL)),
            KeyAlgorithm::Ecdsa | KeyAlgorithm::Ed25519 => None,
        };
        AlgorithmIdentifierOwned {
            oid: value.oid(),
            parameters,
        }
    }
}

impl FromStr for SignatureAlgorithm {
    type Err = CsrKitError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "SHA256WithRSA" => Ok(SignatureAlgorithm::Sha256WithRSA),
            "SHA384WithRSA" => Ok(SignatureAlgorithm::Sha384WithRSA),
            "SHA512WithRSA" => Ok(SignatureAlgorithm::Sha512WithRSA),
            "ECDSAWithSHA256" => Ok(SignatureAlgorithm::Sha256WithECDSA),
            "ECDSAWithSHA384" => Ok(SignatureAlgorithm::Sha384WithECDSA),
            "ECDSAWithSHA512" => Ok(SignatureAlgorithm::Sha512WithECDSA),
            "PureEd25519" => Ok(SignatureAlgorithm::PureEd25519),
            other => Err(CsrKitError::UnsupportedAlgorithm(format!(
                "unsupported signature algorithm: {other}"
            ))),
        }
    }
}

impl fmt::Display for SignatureAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SignatureAlgorithm::Sha256WithRSA => "SHA256WithRSA",
            SignatureAlgorithm::Sha384WithRSA => "SHA384WithRSA",
            SignatureAlgorithm::Sha512WithRSA => "SHA512WithRSA",
            SignatureAlgorithm::Sha256WithECDSA => "ECDSAWithSHA256",
            SignatureAlgorithm::Sha384WithECDSA => "ECDSAWithSHA384",
            SignatureAlgorithm::Sha512WithECDSA => "ECDSAWithSHA512",
            SignatureAlgorithm::PureEd25519 => "PureEd25519",
        })
    }
}

/// Returns the signature algorithm to use with a key of the given algorithm.
///
/// `parameter` must be [`KeyParameter::RsaBits`] for RSA and
/// [`KeyParameter::Curve`] for ECDSA; it is ignored for Ed25519.
pub fn signature_algorithm_from_public_key(
    algorithm: KeyAlgorithm,
    parameter: KeyParameter,
) -> Result<SignatureAlgorithm> {
    match (algorithm, parameter) {
        (KeyAlgorithm::Rsa, KeyParameter::RsaBits(size)) => match size {
            s if s >= 4096 => Ok(SignatureAlgorithm::Sha512WithRSA),
            s if s >= 3072 => Ok(SignatureAlgorithm::Sha384WithRSA),
            s if s >= MIN_RSA_KEY_SIZE => Ok(SignatureAlgorithm::Sha256WithRSA),
            s => Err(CsrKitError::UnsupportedAlgorithm(format!(
                "invalid size {s} for RSA key on signing certificate"
            ))),
        },
        (KeyAlgorithm::Rsa, other) => Err(CsrKitError::UnsupportedAlgorithm(format!(
            "expected to get an integer key size for RSA key but got {other:?}"
        ))),
        (KeyAlgorithm::Ecdsa, KeyParameter::Curve(curve)) => Ok(match curve {
            EcdsaCurve::P521 => SignatureAlgorithm::Sha512WithECDSA,
            EcdsaCurve::P384 => SignatureAlgorithm::Sha384WithECDSA,
            EcdsaCurve::P256 => SignatureAlgorithm::Sha256WithECDSA,
        }),
        (KeyAlgorithm::Ecdsa, other) => Err(CsrKitError::UnsupportedAlgorithm(format!(
            "expected to get an ECDSA curve for ECDSA key but got {other:?}"
        ))),
        (KeyAlgorithm::Ed25519, _) => Ok(SignatureAlgorithm::PureEd25519),
    }
}

/// Determines the public-key and signature algorithms for a certificate spec.
///
/// An explicit signature algorithm in the spec is returned as-is: it is not
/// checked against the key algorithm. A mismatch surfaces later, when the
/// signer refuses to produce that kind of signature.
pub fn signature_algorithm_for_spec(
    spec: &CertificateSpec,
) -> Result<(KeyAlgorithm, SignatureAlgorithm)> {
    let (algorithm, size) = match &spec.private_key {
        Some(private_key) => (
            match private_key.algorithm.as_deref() {
                None | Some("") => KeyAlgorithm::Rsa,
                Some(name) => name.parse()?,
            },
            private_key.size,
        ),
        None => (KeyAlgorithm::Rsa, 0),
    };

    if let Some(name) = spec.signature_algorithm.as_deref().filter(|s| !s.is_empty()) {
        return Ok((algorithm, name.parse()?));
    }

    let parameter = match algorithm {
        KeyAlgorithm::Rsa if size == 0 => KeyParameter::RsaBits(MIN_RSA_KEY_SIZE),
        KeyAlgorithm::Rsa => KeyParameter::RsaBits(size),
        KeyAlgorithm::Ecdsa => KeyParameter::Curve(EcdsaCurve::from_key_size(size)?),
        KeyAlgorithm::Ed25519 => KeyParameter::None,
    };

    Ok((algorithm, signature_algorithm_from_public_key(algorithm, parameter)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cert::params::PrivateKeySpec;

    fn spec_with_key(algorithm: Option<&str>, size: usize) -> CertificateSpec {
        CertificateSpec::builder()
            .common_name("example.com")
            .private_key(PrivateKeySpec {
                algorithm: algorithm.map(str::to_string),
                size,
            })
            .build()
    }

    #[test]
    fn rsa_size_boundaries() {
        let cases = [
            (2047, None),
            (2048, Some(SignatureAlgorithm::Sha256WithRSA)),
            (3071, Some(SignatureAlgorithm::Sha256WithRSA)),
            (3072, Some(SignatureAlgorithm::Sha384WithRSA)),
            (4095, Some(SignatureAlgorithm::Sha384WithRSA)),
            (4096, Some(SignatureAlgorithm::Sha512WithRSA)),
            (8192, Some(SignatureAlgorithm::Sha512WithRSA)),
        ];
        for (size, expected) in cases {
            let got =
                signature_algorithm_from_public_key(KeyAlgorithm::Rsa, KeyParameter::RsaBits(size));
            match expected {
                Some(alg) => assert_eq!(got.unwrap(), alg, "size {size}"),
                None => assert!(
                    matches!(got, Err(CsrKitError::UnsupportedAlgorithm(_))),
                    "size {size} should be rejected"
                ),
            }
        }
    }

    #[test]
    fn ecdsa_curves() {
        let cases = [
            (EcdsaCurve::P256, SignatureAlgorithm::Sha256WithECDSA),
            (EcdsaCurve::P384, SignatureAlgorithm::Sha384WithECDSA),
            (EcdsaCurve::P521, SignatureAlgorithm::Sha512WithECDSA),
        ];
        for (curve, expected) in cases {
            assert_eq!(
                signature_algorithm_from_public_key(KeyAlgorithm::Ecdsa, KeyParameter::Curve(curve))
                    .unwrap(),
                expected
            );
        }
    }

    #[test]
    fn ed25519_ignores_parameter() {
        for parameter in [
            KeyParameter::None,
            KeyParameter::RsaBits(1024),
            KeyParameter::Curve(EcdsaCurve::P384),
        ] {
            assert_eq!(
                signature_algorithm_from_public_key(KeyAlgorithm::Ed25519, parameter).unwrap(),
                SignatureAlgorithm::PureEd25519
            );
        }
    }

    #[test]
    fn mismatched_parameter_is_rejected() {
        assert!(
            signature_algorithm_from_public_key(
                KeyAlgorithm::Rsa,
                KeyParameter::Curve(EcdsaCurve::P256)
            )
            .is_err()
        );
        assert!(
            signature_algorithm_from_public_key(KeyAlgorithm::Ecdsa, KeyParameter::RsaBits(2048))
                .is_err()
        );
    }

    #[test]
    fn spec_defaults_to_rsa_2048() {
        let spec = CertificateSpec::builder().common_name("example.com").build();
        assert_eq!(
            signature_algorithm_for_spec(&spec).unwrap(),
            (KeyAlgorithm::Rsa, SignatureAlgorithm::Sha256WithRSA)
        );
        assert_eq!(
            signature_algorithm_for_spec(&spec_with_key(Some("RSA"), 0)).unwrap(),
            (KeyAlgorithm::Rsa, SignatureAlgorithm::Sha256WithRSA)
        );
    }

    #[test]
    fn spec_ecdsa_sizes() {
        let cases = [
            (0, Some(SignatureAlgorithm::Sha256WithECDSA)),
            (256, Some(SignatureAlgorithm::Sha256WithECDSA)),
            (384, Some(SignatureAlgorithm::Sha384WithECDSA)),
            (521, Some(SignatureAlgorithm::Sha512WithECDSA)),
            (512, None),
        ];
        for (size, expected) in cases {
            let got = signature_algorithm_for_spec(&spec_with_key(Some("ECDSA"), size));
            match expected {
                Some(alg) => assert_eq!(got.unwrap(), (KeyAlgorithm::Ecdsa, alg)),
                None => assert!(matches!(got, Err(CsrKitError::UnsupportedAlgorithm(_)))),
            }
        }
    }

    #[test]
    fn spec_rejects_unknown_key_algorithm() {
        let err = signature_algorithm_for_spec(&spec_with_key(Some("DSA"), 0)).unwrap_err();
        assert!(matches!(err, CsrKitError::UnsupportedAlgorithm(_)));
    }

    #[test]
    fn explicit_signature_algorithm_is_used_verbatim() {
        let mut spec = spec_with_key(Some("ECDSA"), 256);
        spec.signature_algorithm = Some("SHA512WithRSA".to_string());
        assert_eq!(
            signature_algorithm_for_spec(&spec).unwrap(),
            (KeyAlgorithm::Ecdsa, SignatureAlgorithm::Sha512WithRSA)
        );

        spec.signature_algorithm = Some("MD5WithRSA".to_string());
        assert!(matches!(
            signature_algorithm_for_spec(&spec),
            Err(CsrKitError::UnsupportedAlgorithm(_))
        ));
    }

    #[test]
    fn names_round_trip() {
        for alg in [
            SignatureAlgorithm::Sha256WithRSA,
            SignatureAlgorithm::Sha384WithECDSA,
            SignatureAlgorithm::PureEd25519,
        ] {
            assert_eq!(alg.to_string().parse::<SignatureAlgorithm>().unwrap(), alg);
            assert_eq!(SignatureAlgorithm::from_oid(&alg.oid()).unwrap(), alg);
        }
    }
}
