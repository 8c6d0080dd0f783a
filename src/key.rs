use der::asn1::BitString;
use der::{Any, Decode, Encode};
use ecdsa::signature::hazmat::{PrehashSigner, PrehashVerifier};
use ecdsa::signature::{SignatureEncoding, Signer as _, Verifier as _};
use ed25519_dalek::{SigningKey as Ed25519SigningKey, VerifyingKey as Ed25519VerifyingKey};
use p256::ecdsa::{SigningKey as P256SigningKey, VerifyingKey as P256VerifyingKey};
use p384::ecdsa::{SigningKey as P384SigningKey, VerifyingKey as P384VerifyingKey};
use p521::ecdsa::{SigningKey as P521SigningKey, VerifyingKey as P521VerifyingKey};
use rsa::pkcs8::{DecodePublicKey, EncodePublicKey};
use rsa::traits::PublicKeyParts;
use rsa::{RsaPrivateKey, RsaPublicKey};
use sha2::{Digest, Sha256, Sha384, Sha512};
use x509_cert::spki::{AlgorithmIdentifierOwned, SubjectPublicKeyInfoOwned};

use crate::algorithm::{EcdsaCurve, KeyAlgorithm, KeyParameter, SignatureAlgorithm};
use crate::error::{CsrKitError, Result};
use crate::oid;

/// A key able to sign certificates and certificate requests.
///
/// Implementations must be usable from several threads at once; signing
/// never mutates the key.
pub trait Signer: Send + Sync {
    /// The public half of the signing key.
    fn public_key(&self) -> PublicKey;

    /// Signs `message` with `algorithm`, returning the signature bytes as
    /// they appear in an X.509 `signatureValue`.
    fn sign(&self, message: &[u8], algorithm: SignatureAlgorithm) -> Result<Vec<u8>>;
}

/// Key material handed to an issuing operation.
///
/// Issuers accept anything that may or may not be able to sign and query the
/// capability at runtime, returning a typed error for keys that cannot.
pub trait KeyMaterial {
    fn as_signer(&self) -> Option<&dyn Signer>;
}

/// Supported key pairs.
pub enum KeyPair {
    Rsa {
        private: Box<RsaPrivateKey>,
        public: RsaPublicKey,
    },
    EcdsaP256 {
        signing_key: P256SigningKey,
        verifying_key: P256VerifyingKey,
    },
    EcdsaP384 {
        signing_key: P384SigningKey,
        verifying_key: P384VerifyingKey,
    },
    EcdsaP521 {
        signing_key: P521SigningKey,
        verifying_key: P521VerifyingKey,
    },
    Ed25519 {
        signing_key: Ed25519SigningKey,
    },
}

impl KeyPair {
    /// Generate an RSA key pair with the specified number of bits.
    pub fn generate_rsa(bits: usize) -> Result<Self> {
        let mut rng = rand_core::OsRng;
        let private = RsaPrivateKey::new(&mut rng, bits)?;
        let public = RsaPublicKey::from(&private);
        Ok(KeyPair::Rsa {
            private: Box::new(private),
            public,
        })
    }

    /// Generate an ECDSA P-256 key pair.
    pub fn generate_ecdsa_p256() -> Self {
        let signing_key = P256SigningKey::random(&mut rand_core::OsRng);
        let verifying_key = signing_key.verifying_key().to_owned();
        KeyPair::EcdsaP256 {
            signing_key,
            verifying_key,
        }
    }

    /// Generate an ECDSA P-384 key pair.
    pub fn generate_ecdsa_p384() -> Self {
        let signing_key = P384SigningKey::random(&mut rand_core::OsRng);
        let verifying_key = signing_key.verifying_key().to_owned();
        KeyPair::EcdsaP384 {
            signing_key,
            verifying_key,
        }
    }

    /// Generate an ECDSA P-521 key pair.
    pub fn generate_ecdsa_p521() -> Self {
        let signing_key = P521SigningKey::random(&mut rand_core::OsRng);
        let verifying_key = P521VerifyingKey::from(&signing_key);
        KeyPair::EcdsaP521 {
            signing_key,
            verifying_key,
        }
    }

    /// Generate an Ed25519 key pair.
    pub fn generate_ed25519() -> Self {
        let signing_key = Ed25519SigningKey::generate(&mut rand_core::OsRng);
        KeyPair::Ed25519 { signing_key }
    }

    pub fn algorithm(&self) -> KeyAlgorithm {
        match self {
            KeyPair::Rsa { .. } => KeyAlgorithm::Rsa,
            KeyPair::EcdsaP256 { .. } | KeyPair::EcdsaP384 { .. } | KeyPair::EcdsaP521 { .. } => {
                KeyAlgorithm::Ecdsa
            }
            KeyPair::Ed25519 { .. } => KeyAlgorithm::Ed25519,
        }
    }
}

impl Signer for KeyPair {
    fn public_key(&self) -> PublicKey {
        PublicKey::from_key_pair(self)
    }

    fn sign(&self, message: &[u8], algorithm: SignatureAlgorithm) -> Result<Vec<u8>> {
        if algorithm.key_algorithm() != self.algorithm() {
            return Err(CsrKitError::SigningFailure(format!(
                "requested signature algorithm {algorithm} does not match {} private key",
                self.algorithm()
            )));
        }

        match self {
            KeyPair::Rsa { private, .. } => match algorithm {
                SignatureAlgorithm::Sha384WithRSA => rsa_sign::<Sha384>(private, message),
                SignatureAlgorithm::Sha512WithRSA => rsa_sign::<Sha512>(private, message),
                _ => rsa_sign::<Sha256>(private, message),
            },
            KeyPair::EcdsaP256 { signing_key, .. } => {
                let signature: p256::ecdsa::Signature = signing_key
                    .sign_prehash(&prehash(algorithm, EcdsaCurve::P256, message))
                    .map_err(signing_error)?;
                Ok(signature.to_der().as_bytes().to_vec())
            }
            KeyPair::EcdsaP384 { signing_key, .. } => {
                let signature: p384::ecdsa::Signature = signing_key
                    .sign_prehash(&prehash(algorithm, EcdsaCurve::P384, message))
                    .map_err(signing_error)?;
                Ok(signature.to_der().as_bytes().to_vec())
            }
            KeyPair::EcdsaP521 { signing_key, .. } => {
                let signature: p521::ecdsa::Signature = signing_key
                    .sign_prehash(&prehash(algorithm, EcdsaCurve::P521, message))
                    .map_err(signing_error)?;
                Ok(signature.to_der().as_bytes().to_vec())
            }
            KeyPair::Ed25519 { signing_key } => {
                let signature = signing_key.try_sign(message).map_err(signing_error)?;
                Ok(signature.to_bytes().to_vec())
            }
        }
    }
}

impl KeyMaterial for KeyPair {
    fn as_signer(&self) -> Option<&dyn Signer> {
        Some(self)
    }
}

fn rsa_sign<D>(private: &RsaPrivateKey, message: &[u8]) -> Result<Vec<u8>>
where
    D: Digest + const_oid::AssociatedOid,
{
    let signing_key = rsa::pkcs1v15::SigningKey::<D>::new(private.clone());
    let signature = signing_key.try_sign(message).map_err(signing_error)?;
    Ok(signature.to_vec())
}

fn rsa_verify<D>(public: &RsaPublicKey, message: &[u8], signature: &[u8]) -> Result<()>
where
    D: Digest + const_oid::AssociatedOid,
{
    let verifying_key = rsa::pkcs1v15::VerifyingKey::<D>::new(public.clone());
    let signature = rsa::pkcs1v15::Signature::try_from(signature).map_err(verify_error)?;
    verifying_key.verify(message, &signature).map_err(verify_error)
}

/// Hashes `message` with the digest of an ECDSA signature algorithm.
///
/// ecdsa refuses prehashes shorter than half the field size, so a short
/// digest (SHA-256 on P-521) is left padded with zeroes. Padding keeps the
/// integer value, and with it the signature, unchanged.
fn prehash(algorithm: SignatureAlgorithm, curve: EcdsaCurve, message: &[u8]) -> Vec<u8> {
    let digest = match algorithm {
        SignatureAlgorithm::Sha384WithECDSA => Sha384::digest(message).to_vec(),
        SignatureAlgorithm::Sha512WithECDSA => Sha512::digest(message).to_vec(),
        _ => Sha256::digest(message).to_vec(),
    };
    let field_len = match curve {
        EcdsaCurve::P256 => 32,
        EcdsaCurve::P384 => 48,
        EcdsaCurve::P521 => 66,
    };
    let min_len = field_len / 2;
    if digest.len() >= min_len {
        return digest;
    }
    let mut padded = vec![0u8; min_len - digest.len()];
    padded.extend_from_slice(&digest);
    padded
}

fn signing_error(err: ecdsa::signature::Error) -> CsrKitError {
    CsrKitError::SigningFailure(err.to_string())
}

fn decoding_error(err: impl core::fmt::Display) -> CsrKitError {
    CsrKitError::DecodingError(err.to_string())
}

fn verify_error(err: ecdsa::signature::Error) -> CsrKitError {
    CsrKitError::SigningFailure(format!("signature verification failed: {err}"))
}

/// The public half of a supported key.
#[derive(Clone)]
pub enum PublicKey {
    Rsa(RsaPublicKey),
    EcdsaP256(P256VerifyingKey),
    EcdsaP384(P384VerifyingKey),
    EcdsaP521(P521VerifyingKey),
    Ed25519(Ed25519VerifyingKey),
}

impl PublicKey {
    pub fn from_key_pair(key_pair: &KeyPair) -> Self {
        match key_pair {
            KeyPair::Rsa { public, .. } => PublicKey::Rsa(public.clone()),
            KeyPair::EcdsaP256 { verifying_key, .. } => PublicKey::EcdsaP256(verifying_key.clone()),
            KeyPair::EcdsaP384 { verifying_key, .. } => PublicKey::EcdsaP384(verifying_key.clone()),
            KeyPair::EcdsaP521 { verifying_key, .. } => {
                PublicKey::EcdsaP521(verifying_key.clone())
            }
            KeyPair::Ed25519 { signing_key } => PublicKey::Ed25519(signing_key.verifying_key()),
        }
    }

    pub fn algorithm(&self) -> KeyAlgorithm {
        match self {
            PublicKey::Rsa(_) => KeyAlgorithm::Rsa,
            PublicKey::EcdsaP256(_) | PublicKey::EcdsaP384(_) | PublicKey::EcdsaP521(_) => {
                KeyAlgorithm::Ecdsa
            }
            PublicKey::Ed25519(_) => KeyAlgorithm::Ed25519,
        }
    }

    /// The size or curve used to pick a signature algorithm for this key.
    pub fn parameter(&self) -> KeyParameter {
        match self {
            // size() is in bytes
            PublicKey::Rsa(public) => KeyParameter::RsaBits(public.size() * 8),
            PublicKey::EcdsaP256(_) => KeyParameter::Curve(EcdsaCurve::P256),
            PublicKey::EcdsaP384(_) => KeyParameter::Curve(EcdsaCurve::P384),
            PublicKey::EcdsaP521(_) => KeyParameter::Curve(EcdsaCurve::P521),
            PublicKey::Ed25519(_) => KeyParameter::None,
        }
    }

    /// Encodes the key as an X.509 `SubjectPublicKeyInfo`.
    pub fn to_spki(&self) -> Result<SubjectPublicKeyInfoOwned> {
        let ec_spki = |curve: EcdsaCurve, point: &[u8]| -> Result<SubjectPublicKeyInfoOwned> {
            Ok(SubjectPublicKeyInfoOwned {
                algorithm: AlgorithmIdentifierOwned {
                    oid: oid::EC_PUBLIC_KEY,
                    parameters: Some(Any::encode_from(&curve.oid())?),
                },
                subject_public_key: BitString::from_bytes(point)?,
            })
        };

        match self {
            PublicKey::Rsa(public) => {
                let document = public
                    .to_public_key_der()
                    .map_err(|e| CsrKitError::EncodingFailure(e.to_string()))?;
                Ok(SubjectPublicKeyInfoOwned::from_der(document.as_bytes())?)
            }
            PublicKey::EcdsaP256(key) => {
                ec_spki(EcdsaCurve::P256, key.to_encoded_point(false).as_bytes())
            }
            PublicKey::EcdsaP384(key) => {
                ec_spki(EcdsaCurve::P384, key.to_encoded_point(false).as_bytes())
            }
            PublicKey::EcdsaP521(key) => {
                ec_spki(EcdsaCurve::P521, key.to_encoded_point(false).as_bytes())
            }
            PublicKey::Ed25519(key) => Ok(SubjectPublicKeyInfoOwned {
                algorithm: AlgorithmIdentifierOwned {
                    oid: oid::ED25519,
                    parameters: None,
                },
                subject_public_key: BitString::from_bytes(key.as_bytes())?,
            }),
        }
    }

    /// Decodes a key from an X.509 `SubjectPublicKeyInfo`.
    pub fn from_spki(spki: &SubjectPublicKeyInfoOwned) -> Result<Self> {
        let key_bytes = spki.subject_public_key.raw_bytes();

        match spki.algorithm.oid {
            oid::RSA_ENCRYPTION => {
                let der = spki.to_der()?;
                let public =
                    RsaPublicKey::from_public_key_der(&der).map_err(decoding_error)?;
                Ok(PublicKey::Rsa(public))
            }
            oid::EC_PUBLIC_KEY => {
                let curve = spki
                    .algorithm
                    .parameters
                    .as_ref()
                    .and_then(|p| p.decode_as::<const_oid::ObjectIdentifier>().ok())
                    .and_then(|curve| EcdsaCurve::from_oid(&curve))
                    .ok_or_else(|| {
                        CsrKitError::UnsupportedAlgorithm(
                            "unknown / unsupported curve on ECDSA public key".to_string(),
                        )
                    })?;
                match curve {
                    EcdsaCurve::P256 => P256VerifyingKey::from_sec1_bytes(key_bytes)
                        .map(PublicKey::EcdsaP256)
                        .map_err(decoding_error),
                    EcdsaCurve::P384 => P384VerifyingKey::from_sec1_bytes(key_bytes)
                        .map(PublicKey::EcdsaP384)
                        .map_err(decoding_error),
                    EcdsaCurve::P521 => P521VerifyingKey::from_sec1_bytes(key_bytes)
                        .map(PublicKey::EcdsaP521)
                        .map_err(decoding_error),
                }
            }
            oid::ED25519 => {
                let bytes: &[u8; 32] = key_bytes.try_into().map_err(|_| {
                    CsrKitError::DecodingError("Ed25519 public key must be 32 bytes".to_string())
                })?;
                Ed25519VerifyingKey::from_bytes(bytes)
                    .map(PublicKey::Ed25519)
                    .map_err(decoding_error)
            }
            other => Err(CsrKitError::UnsupportedAlgorithm(format!(
                "unknown public key algorithm: {other}"
            ))),
        }
    }

    /// Verifies `signature` over `message` made with `algorithm`.
    pub fn verify(
        &self,
        message: &[u8],
        signature: &[u8],
        algorithm: SignatureAlgorithm,
    ) -> Result<()> {
        if algorithm.key_algorithm() != self.algorithm() {
            return Err(CsrKitError::SigningFailure(format!(
                "signature algorithm {algorithm} cannot be verified with {} public key",
                self.algorithm()
            )));
        }

        match self {
            PublicKey::Rsa(public) => match algorithm {
                SignatureAlgorithm::Sha384WithRSA => rsa_verify::<Sha384>(public, message, signature),
                SignatureAlgorithm::Sha512WithRSA => rsa_verify::<Sha512>(public, message, signature),
                _ => rsa_verify::<Sha256>(public, message, signature),
            },
            PublicKey::EcdsaP256(key) => {
                let signature = p256::ecdsa::Signature::from_der(signature).map_err(verify_error)?;
                key.verify_prehash(&prehash(algorithm, EcdsaCurve::P256, message), &signature)
                    .map_err(verify_error)
            }
            PublicKey::EcdsaP384(key) => {
                let signature = p384::ecdsa::Signature::from_der(signature).map_err(verify_error)?;
                key.verify_prehash(&prehash(algorithm, EcdsaCurve::P384, message), &signature)
                    .map_err(verify_error)
            }
            PublicKey::EcdsaP521(key) => {
                let signature = p521::ecdsa::Signature::from_der(signature).map_err(verify_error)?;
                key.verify_prehash(&prehash(algorithm, EcdsaCurve::P521, message), &signature)
                    .map_err(verify_error)
            }
            PublicKey::Ed25519(key) => {
                let signature =
                    ed25519_dalek::Signature::from_slice(signature).map_err(verify_error)?;
                key.verify(message, &signature).map_err(verify_error)
            }
        }
    }
}

impl core::fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PublicKey")
            .field("algorithm", &self.algorithm())
            .field("parameter", &self.parameter())
            .finish()
    }
}

impl PartialEq for PublicKey {
    fn eq(&self, other: &Self) -> bool {
        match (self.to_spki(), other.to_spki()) {
            (Ok(a), Ok(b)) => a == b,
            _ => false,
        }
    }
}

/// A bare public key can never sign.
impl KeyMaterial for PublicKey {
    fn as_signer(&self) -> Option<&dyn Signer> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_signature_algorithms_for(key: &KeyPair) -> Vec<SignatureAlgorithm> {
        match key.algorithm() {
            KeyAlgorithm::Rsa => vec![
                SignatureAlgorithm::Sha256WithRSA,
                SignatureAlgorithm::Sha384WithRSA,
                SignatureAlgorithm::Sha512WithRSA,
            ],
            KeyAlgorithm::Ecdsa => vec![
                SignatureAlgorithm::Sha256WithECDSA,
                SignatureAlgorithm::Sha384WithECDSA,
                SignatureAlgorithm::Sha512WithECDSA,
            ],
            KeyAlgorithm::Ed25519 => vec![SignatureAlgorithm::PureEd25519],
        }
    }

    #[test]
    fn sign_and_verify_every_key_type() {
        let keys = [
            KeyPair::generate_rsa(2048).unwrap(),
            KeyPair::generate_ecdsa_p256(),
            KeyPair::generate_ecdsa_p384(),
            KeyPair::generate_ecdsa_p521(),
            KeyPair::generate_ed25519(),
        ];
        for key in &keys {
            let public = key.public_key();
            for alg in all_signature_algorithms_for(key) {
                let signature = key.sign(b"to be signed", alg).unwrap();
                public.verify(b"to be signed", &signature, alg).unwrap();
                assert!(public.verify(b"tampered", &signature, alg).is_err());
            }
        }
    }

    #[test]
    fn short_digest_is_padded_for_p521() {
        let digest = prehash(SignatureAlgorithm::Sha256WithECDSA, EcdsaCurve::P521, b"data");
        assert_eq!(digest.len(), 33);
        assert_eq!(digest[0], 0);
        assert_eq!(&digest[1..], Sha256::digest(b"data").as_slice());

        let digest = prehash(SignatureAlgorithm::Sha256WithECDSA, EcdsaCurve::P256, b"data");
        assert_eq!(digest.len(), 32);
    }

    #[test]
    fn p521_signs_with_sha256() {
        let key = KeyPair::generate_ecdsa_p521();
        let signature = key.sign(b"to be signed", SignatureAlgorithm::Sha256WithECDSA).unwrap();
        key.public_key()
            .verify(b"to be signed", &signature, SignatureAlgorithm::Sha256WithECDSA)
            .unwrap();
    }

    #[test]
    fn sign_rejects_foreign_algorithm() {
        let key = KeyPair::generate_ecdsa_p256();
        let err = key
            .sign(b"data", SignatureAlgorithm::Sha256WithRSA)
            .unwrap_err();
        assert!(matches!(err, CsrKitError::SigningFailure(_)));
    }

    #[test]
    fn spki_round_trip() {
        for key in [
            KeyPair::generate_ecdsa_p256(),
            KeyPair::generate_ecdsa_p384(),
            KeyPair::generate_ecdsa_p521(),
            KeyPair::generate_ed25519(),
        ] {
            let public = key.public_key();
            let spki = public.to_spki().unwrap();
            let decoded = PublicKey::from_spki(&spki).unwrap();
            assert_eq!(decoded, public);
            assert_eq!(decoded.parameter(), public.parameter());
        }
    }

    #[test]
    fn rsa_parameter_is_in_bits() {
        let key = KeyPair::generate_rsa(2048).unwrap();
        assert_eq!(key.public_key().parameter(), KeyParameter::RsaBits(2048));
    }

    #[test]
    fn public_key_is_not_a_signer() {
        let key = KeyPair::generate_ed25519();
        assert!(key.public_key().as_signer().is_none());
        assert!(key.as_signer().is_some());
    }
}
