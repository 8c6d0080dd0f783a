//! Certificate signing requests.
//!
//! [`build_request`] turns a [`CertificateSpec`] into an
//! [`UnsignedRequestTemplate`]; [`encode_csr`] signs that template with the
//! requester's key and returns the PKCS#10 DER.

use bon::Builder;
use der::asn1::{BitString, SetOfVec};
use der::{Any, Decode, Encode};
use log::debug;
use x509_cert::attr::Attribute;
use x509_cert::name::Name;
use x509_cert::request::{CertReq, CertReqInfo, Version};

use crate::algorithm::{KeyAlgorithm, SignatureAlgorithm, signature_algorithm_for_spec};
use crate::cert::extensions::{
    GeneralNames, OtherName, ip_addresses_from_strings, marshal_basic_constraints, marshal_sans,
    name_constraints_extension, usage_extensions,
};
use crate::cert::params::{CertificateSpec, ExtensionParam};
use crate::cert::subject::{common_name, is_subject_empty, subject_for_spec};
use crate::error::{CsrKitError, Result};
use crate::key::{PublicKey, Signer};
use crate::oid;

/// Toggles for the optional parts of a request.
///
/// # Fields
/// * `encode_basic_constraints_in_request` - Add a Basic Constraints extension carrying the CA flag.
/// * `encode_name_constraints` - Add the spec's name constraints.
/// * `encode_other_names` - Add the spec's `otherName` SANs.
/// * `use_literal_subject` - Use the spec's literal subject when it has one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Builder)]
pub struct CsrOptions {
    #[builder(default)]
    pub encode_basic_constraints_in_request: bool,
    #[builder(default)]
    pub encode_name_constraints: bool,
    #[builder(default)]
    pub encode_other_names: bool,
    #[builder(default)]
    pub use_literal_subject: bool,
}

/// A certificate request that has not been signed yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsignedRequestTemplate {
    /// Always 0, the only version PKCS#10 defines.
    pub version: u8,
    /// DER-encoded subject RDNSequence.
    pub raw_subject: Vec<u8>,
    pub extensions: Vec<ExtensionParam>,
    pub public_key_algorithm: KeyAlgorithm,
    pub signature_algorithm: SignatureAlgorithm,
}

fn general_names_for_spec(spec: &CertificateSpec, options: &CsrOptions) -> Result<GeneralNames> {
    let mut sans = GeneralNames {
        rfc822_names: spec.email_addresses.clone(),
        dns_names: spec.dns_names.clone(),
        uris: spec.uris.clone(),
        ip_addresses: ip_addresses_from_strings(&spec.ip_addresses)?,
        other_names: Vec::new(),
    };

    if options.encode_other_names {
        for other_name in &spec.other_names {
            sans.other_names
                .push(OtherName::utf8(&other_name.oid, &other_name.utf8_value)?);
        }
    }
    Ok(sans)
}

/// Builds the unsigned request for `spec`.
///
/// Nothing is returned unless every step succeeds.
pub fn build_request(spec: &CertificateSpec, options: &CsrOptions) -> Result<UnsignedRequestTemplate> {
    let subject = subject_for_spec(spec, options.use_literal_subject)?;
    let cn = if options.use_literal_subject && spec.literal_subject.as_deref().is_some_and(|s| !s.is_empty()) {
        common_name(&subject).unwrap_or_default()
    } else {
        spec.common_name.clone()
    };

    let sans = general_names_for_spec(spec, options)?;
    if cn.is_empty() && sans.is_empty() {
        return Err(CsrKitError::InvalidSpec(
            "no common name (from the commonName field or from a literalSubject), DNS name, URI SAN, Email SAN, IP or OtherName SAN specified on certificate".to_string(),
        ));
    }

    let (public_key_algorithm, signature_algorithm) = signature_algorithm_for_spec(spec)?;
    let raw_subject = subject.to_der()?;

    let mut extensions = Vec::new();
    if !sans.is_empty() {
        extensions.push(marshal_sans(&sans, !is_subject_empty(&subject))?);
    }

    if spec.encode_usages_in_request.unwrap_or(true) {
        extensions.extend(usage_extensions(spec)?);
    }

    if options.encode_basic_constraints_in_request {
        extensions.push(marshal_basic_constraints(spec.is_ca, None)?);
    }

    if options.encode_name_constraints {
        if let Some(name_constraints) = &spec.name_constraints {
            extensions.extend(name_constraints_extension(name_constraints)?);
        }
    }

    debug!(
        "built {public_key_algorithm} request for {cn:?} with {} extensions, signing with {signature_algorithm}",
        extensions.len()
    );

    Ok(UnsignedRequestTemplate {
        version: 0,
        raw_subject,
        extensions,
        public_key_algorithm,
        signature_algorithm,
    })
}

/// Signs the request template with `signer` and returns the DER CSR.
///
/// The extensions travel in a PKCS#9 `extensionRequest` attribute.
pub fn encode_csr(template: UnsignedRequestTemplate, signer: &dyn Signer) -> Result<Vec<u8>> {
    let subject = Name::from_der(&template.raw_subject)?;

    let mut attributes = Vec::new();
    if !template.extensions.is_empty() {
        let extensions = template
            .extensions
            .iter()
            .map(ExtensionParam::to_x509_extension)
            .collect::<Result<Vec<_>>>()?;
        attributes.push(Attribute {
            oid: oid::EXTENSION_REQUEST,
            values: SetOfVec::try_from(vec![Any::encode_from(&extensions)?])?,
        });
    }

    let info = CertReqInfo {
        version: Version::V1,
        subject,
        public_key: signer.public_key().to_spki()?,
        attributes: SetOfVec::try_from(attributes)?,
    };

    let signature = signer
        .sign(&info.to_der()?, template.signature_algorithm)
        .map_err(|e| CsrKitError::SigningFailure(format!("error creating x509 certificate request: {e}")))?;

    let request = CertReq {
        info,
        algorithm: template.signature_algorithm.into(),
        signature: BitString::from_bytes(&signature)?,
    };
    Ok(request.to_der()?)
}

/// Decodes a DER CSR and checks its self-signature.
pub fn decode_csr(der: &[u8]) -> Result<CertReq> {
    let request = CertReq::from_der(der)
        .map_err(|e| CsrKitError::DecodingError(format!("error decoding certificate request: {e}")))?;

    let algorithm = SignatureAlgorithm::from_oid(&request.algorithm.oid)?;
    let signature = request.signature.as_bytes().ok_or_else(|| {
        CsrKitError::DecodingError("certificate request signature has unused bits".to_string())
    })?;
    PublicKey::from_spki(&request.info.public_key)?.verify(&request.info.to_der()?, signature, algorithm)?;
    Ok(request)
}

/// The extensions listed in a CSR's `extensionRequest` attribute.
pub fn requested_extensions(request: &CertReq) -> Result<Vec<ExtensionParam>> {
    let mut extensions = Vec::new();
    for attribute in request.info.attributes.iter() {
        if attribute.oid != oid::EXTENSION_REQUEST {
            continue;
        }
        for value in attribute.values.iter() {
            let decoded = x509_cert::ext::Extensions::from_der(&value.to_der()?)
                .map_err(|e| CsrKitError::DecodingError(format!("invalid extensionRequest attribute: {e}")))?;
            extensions.extend(decoded.iter().map(ExtensionParam::from_x509_extension));
        }
    }
    Ok(extensions)
}
