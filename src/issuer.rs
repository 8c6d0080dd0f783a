use der::Encode;
use der::asn1::BitString;
use log::debug;
use sha1::{Digest, Sha1};
use x509_cert::certificate::CertificateInner;
use x509_cert::name::Name;

use crate::algorithm::signature_algorithm_from_public_key;
use crate::cert::extensions::{AuthorityKeyIdentifier, SubjectKeyIdentifier, ToAndFromX509Extension};
use crate::cert::params::{ExtensionParam, find_extension};
use crate::cert::{Certificate, PemBundle, parse_single_certificate_chain};
use crate::error::{CsrKitError, Result};
use crate::key::{KeyMaterial, PublicKey, Signer};
use crate::tbs_certificate::CertificateTemplate;

/// Represents an entity capable of issuing certificates.
///
/// This trait provides the issuer details that end up in issued certificates.
pub trait Issuer {
    /// Returns the distinguished name of the issuer.
    fn issuer_name(&self) -> Name;

    /// Returns the issuer's subject key identifier, if it has one.
    fn key_identifier(&self) -> Option<Vec<u8>>;
}

impl Issuer for Certificate {
    fn issuer_name(&self) -> Name {
        // The name of the issuer is the subject of the certificate
        self.subject().clone()
    }

    fn key_identifier(&self) -> Option<Vec<u8>> {
        self.subject_key_identifier()
    }
}

/// A template acts as its own issuer when self-signing.
impl Issuer for CertificateTemplate {
    fn issuer_name(&self) -> Name {
        self.subject.clone()
    }

    fn key_identifier(&self) -> Option<Vec<u8>> {
        find_extension(&self.extensions, &SubjectKeyIdentifier::OID)
            .and_then(|ext| ext.to_extension::<SubjectKeyIdentifier>().ok())
            .map(|ski| ski.0)
    }
}

/// SHA-1 of the subject public key bits (RFC 5280 section 4.2.1.2, method 1).
pub fn key_identifier(public_key: &PublicKey) -> Result<Vec<u8>> {
    let spki = public_key.to_spki()?;
    Ok(Sha1::digest(spki.subject_public_key.raw_bytes()).to_vec())
}

/// Signs `template` as `issuer` with `signer_key`.
///
/// `signer_key` must be able to sign; a bare public key is rejected. The
/// signature algorithm follows from the signer's own public key, never from
/// the issuer certificate. Returns the PEM encoding together with the
/// re-parsed certificate.
pub fn sign_certificate(
    template: &CertificateTemplate,
    issuer: &dyn Issuer,
    public_key: &PublicKey,
    signer_key: &dyn KeyMaterial,
) -> Result<(String, Certificate)> {
    let signer = signer_key.as_signer().ok_or_else(|| {
        CsrKitError::SigningFailure("didn't get an expected Signer in call to sign_certificate".to_string())
    })?;
    sign_with(template, issuer, public_key, signer)
}

fn sign_with(
    template: &CertificateTemplate,
    issuer: &dyn Issuer,
    public_key: &PublicKey,
    signer: &dyn Signer,
) -> Result<(String, Certificate)> {
    let signer_public_key = signer.public_key();
    let signature_algorithm =
        signature_algorithm_from_public_key(signer_public_key.algorithm(), signer_public_key.parameter())?;

    let mut template = template.clone();
    template.public_key = public_key.clone();

    let mut extensions = template.extensions.clone();
    if template.is_ca() && find_extension(&extensions, &SubjectKeyIdentifier::OID).is_none() {
        let ski = SubjectKeyIdentifier(key_identifier(public_key)?);
        extensions.push(ExtensionParam::from_extension(&ski, false)?);
    }

    let issuer_name = issuer.issuer_name();
    if issuer_name != template.subject
        && find_extension(&extensions, &AuthorityKeyIdentifier::OID).is_none()
    {
        if let Some(key_identifier) = issuer.key_identifier() {
            let aki = AuthorityKeyIdentifier { key_identifier };
            extensions.push(ExtensionParam::from_extension(&aki, false)?);
        }
    }

    let tbs_certificate =
        template.to_tbs_certificate_inner(&issuer_name, signature_algorithm, &extensions)?;
    let signature = signer.sign(&tbs_certificate.to_der()?, signature_algorithm)?;

    let cert_inner = CertificateInner {
        tbs_certificate,
        signature_algorithm: signature_algorithm.into(),
        signature: BitString::from_bytes(&signature)?,
    };
    let der = cert_inner
        .to_der()
        .map_err(|e| CsrKitError::SigningFailure(format!("error creating x509 certificate: {e}")))?;
    let cert = Certificate::from_der(&der)
        .map_err(|e| CsrKitError::SigningFailure(format!("error decoding DER certificate bytes: {e}")))?;

    debug!(
        "signed certificate with {signature_algorithm}, {} extensions",
        extensions.len()
    );
    Ok((cert.to_pem(), cert))
}

/// Signs `template` with the first of `ca_certs` and bundles the result with
/// the whole CA chain.
pub fn sign_csr_template(
    ca_certs: &[Certificate],
    ca_signer: &dyn Signer,
    template: &CertificateTemplate,
) -> Result<PemBundle> {
    let Some(issuing_ca) = ca_certs.first() else {
        return Err(CsrKitError::MalformedChain(
            "no CA certificates given to sign CSR template".to_string(),
        ));
    };

    let (_, cert) = sign_with(template, issuing_ca, &template.public_key, ca_signer)?;

    let mut chain = ca_certs.to_vec();
    chain.push(cert);
    parse_single_certificate_chain(&chain)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithm::SignatureAlgorithm;
    use crate::cert::extensions::KeyUsage;
    use crate::cert::params::CertificateSpec;
    use crate::key::KeyPair;

    fn self_signed_ca(key: &KeyPair, cn: &str) -> Certificate {
        let spec = CertificateSpec::builder().common_name(cn).is_ca(true).build();
        let template = CertificateTemplate::from_spec(&spec, key.public_key()).unwrap();
        sign_certificate(&template, &template, &key.public_key(), key).unwrap().1
    }

    #[test]
    fn public_key_cannot_sign() {
        let key = KeyPair::generate_ecdsa_p256();
        let spec = CertificateSpec::builder().common_name("x").build();
        let template = CertificateTemplate::from_spec(&spec, key.public_key()).unwrap();
        let err = sign_certificate(&template, &template, &key.public_key(), &key.public_key()).unwrap_err();
        assert!(matches!(err, CsrKitError::SigningFailure(_)));
    }

    #[test]
    fn signature_algorithm_follows_signer_key() {
        let ca_key = KeyPair::generate_ecdsa_p384();
        let ca = self_signed_ca(&ca_key, "ca");
        assert_eq!(ca.signature_algorithm().unwrap(), SignatureAlgorithm::Sha384WithECDSA);

        let leaf_key = KeyPair::generate_ed25519();
        let spec = CertificateSpec::builder().common_name("leaf").build();
        let template = CertificateTemplate::from_spec(&spec, leaf_key.public_key()).unwrap();
        let (pem, leaf) = sign_certificate(&template, &ca, &leaf_key.public_key(), &ca_key).unwrap();
        assert_eq!(leaf.signature_algorithm().unwrap(), SignatureAlgorithm::Sha384WithECDSA);
        assert_eq!(leaf.public_key().unwrap(), leaf_key.public_key());
        assert_eq!(pem, leaf.to_pem());
    }

    #[test]
    fn key_identifiers() {
        let ca_key = KeyPair::generate_ecdsa_p256();
        let ca = self_signed_ca(&ca_key, "ca");
        let ski = ca.subject_key_identifier().unwrap();
        assert_eq!(ski, key_identifier(&ca_key.public_key()).unwrap());
        // self-signed: no authority key identifier
        assert!(ca.extension::<AuthorityKeyIdentifier>().unwrap().is_none());

        let leaf_key = KeyPair::generate_ecdsa_p256();
        let spec = CertificateSpec::builder().common_name("leaf").build();
        let template = CertificateTemplate::from_spec(&spec, leaf_key.public_key()).unwrap();
        let (_, leaf) = sign_certificate(&template, &ca, &leaf_key.public_key(), &ca_key).unwrap();
        assert!(leaf.subject_key_identifier().is_none());
        let aki = leaf.extension::<AuthorityKeyIdentifier>().unwrap().unwrap();
        assert_eq!(aki.key_identifier, ski);
    }

    #[test]
    fn signed_certificate_matches_template() {
        let ca_key = KeyPair::generate_ecdsa_p256();
        let ca = self_signed_ca(&ca_key, "ca");
        let ca_usage = ca.extension::<KeyUsage>().unwrap().unwrap();
        assert!(ca_usage.0.contains(crate::cert::extensions::KeyUsages::KeyCertSign));

        let leaf_key = KeyPair::generate_ecdsa_p256();
        let spec = CertificateSpec::builder()
            .common_name("example.com")
            .dns_names(vec!["example.com".to_string(), "www.example.com".to_string()])
            .usages(vec!["server auth".to_string(), "digital signature".to_string()])
            .build();
        let template = CertificateTemplate::from_spec(&spec, leaf_key.public_key()).unwrap();
        let (_, leaf) = sign_certificate(&template, &ca, &leaf_key.public_key(), &ca_key).unwrap();

        assert_eq!(leaf.subject(), &template.subject);
        assert_eq!(leaf.issuer(), ca.subject());
        assert_eq!(leaf.serial_number(), template.serial_number.as_slice());
        for ext in &template.extensions {
            assert_eq!(find_extension(&leaf.extensions(), &ext.oid), Some(ext));
        }
    }

    #[test]
    fn csr_template_requires_ca_chain() {
        let key = KeyPair::generate_ecdsa_p256();
        let spec = CertificateSpec::builder().common_name("x").build();
        let template = CertificateTemplate::from_spec(&spec, key.public_key()).unwrap();
        assert!(matches!(
            sign_csr_template(&[], &key, &template),
            Err(CsrKitError::MalformedChain(_))
        ));
    }

    #[test]
    fn csr_template_bundle() {
        let ca_key = KeyPair::generate_ecdsa_p256();
        let ca = self_signed_ca(&ca_key, "ca");

        let leaf_key = KeyPair::generate_ecdsa_p256();
        let spec = CertificateSpec::builder().common_name("leaf").build();
        let template = CertificateTemplate::from_spec(&spec, leaf_key.public_key()).unwrap();
        let bundle = sign_csr_template(&[ca.clone()], &ca_key, &template).unwrap();

        assert_eq!(bundle.ca_pem, ca.to_pem());
        let chain = Certificate::from_pem_chain(&bundle.chain_pem).unwrap();
        assert_eq!(chain.len(), 1);
        assert_eq!(chain[0].subject(), &template.subject);
        assert!(chain[0].check_signature_from(&ca).is_ok());
    }
}
