use std::time::SystemTime;

use bon::Builder;
use der::Decode;
use der::asn1::{GeneralizedTime, UtcTime};
use rand::Rng;
use time::{Duration, OffsetDateTime};
use x509_cert::Version;
use x509_cert::certificate::TbsCertificateInner;
use x509_cert::name::Name;
use x509_cert::serial_number::SerialNumber;
use x509_cert::time::Time;

use crate::algorithm::SignatureAlgorithm;
use crate::cert::extensions::{BasicConstraints, ToAndFromX509Extension, marshal_basic_constraints};
use crate::cert::params::{
    CertificateSpec, DEFAULT_CERTIFICATE_DURATION, ExtensionParam, Validity, find_extension,
};
use crate::error::Result;
use crate::key::PublicKey;
use crate::request::{CsrOptions, build_request, decode_csr, requested_extensions};

/// A random positive 128-bit serial number.
pub fn random_serial_number() -> Vec<u8> {
    let mut serial: [u8; 16] = rand::rng().random();
    serial[0] &= 0x7f;
    if serial[0] == 0 {
        serial[0] = 1;
    }
    serial.to_vec()
}

/// The certificate to issue, before an issuer and a signature are chosen.
///
/// # Fields
/// * `serial_number` - Big-endian serial; random when not set.
/// * `subject` - The subject name.
/// * `validity` - Validity period; 90 days from now when not set.
/// * `public_key` - The subject public key.
/// * `extensions` - Extensions copied into the certificate as-is.
#[derive(Debug, Clone, Builder)]
pub struct CertificateTemplate {
    #[builder(default = random_serial_number())]
    pub serial_number: Vec<u8>,
    pub subject: Name,
    #[builder(default = Validity::for_duration(DEFAULT_CERTIFICATE_DURATION))]
    pub validity: Validity,
    pub public_key: PublicKey,
    #[builder(default)]
    pub extensions: Vec<ExtensionParam>,
}

impl CertificateTemplate {
    /// Builds a template carrying the same subject and extensions a request
    /// for `spec` would, with usages always encoded and a Basic Constraints
    /// extension always present.
    pub fn from_spec(spec: &CertificateSpec, public_key: PublicKey) -> Result<Self> {
        let mut spec = spec.clone();
        spec.encode_usages_in_request = Some(true);
        let options = CsrOptions::builder()
            .encode_basic_constraints_in_request(true)
            .encode_name_constraints(true)
            .encode_other_names(true)
            .use_literal_subject(true)
            .build();

        let request = build_request(&spec, &options)?;
        let subject = Name::from_der(&request.raw_subject)?;

        Ok(Self::builder()
            .subject(subject)
            .validity(Validity::for_duration(
                spec.duration.unwrap_or(DEFAULT_CERTIFICATE_DURATION),
            ))
            .public_key(public_key)
            .extensions(request.extensions)
            .build())
    }

    /// Builds a template from a signed DER CSR.
    ///
    /// The CSR signature is checked first. Subject, public key and the
    /// requested extensions are taken from the CSR; a non-CA Basic
    /// Constraints extension is added when the CSR asks for none.
    pub fn from_csr_der(der: &[u8], duration: Duration) -> Result<Self> {
        let request = decode_csr(der)?;
        let mut extensions = requested_extensions(&request)?;
        if find_extension(&extensions, &BasicConstraints::OID).is_none() {
            extensions.push(marshal_basic_constraints(false, None)?);
        }

        Ok(Self::builder()
            .subject(request.info.subject.clone())
            .validity(Validity::for_duration(duration))
            .public_key(PublicKey::from_spki(&request.info.public_key)?)
            .extensions(extensions)
            .build())
    }

    /// True when the template's Basic Constraints mark a CA.
    pub fn is_ca(&self) -> bool {
        find_extension(&self.extensions, &BasicConstraints::OID)
            .and_then(|ext| ext.to_extension::<BasicConstraints>().ok())
            .is_some_and(|bc| bc.is_ca)
    }

    /// Converts the template into a `TbsCertificateInner` for DER encoding.
    pub fn to_tbs_certificate_inner(
        &self,
        issuer: &Name,
        signature_algorithm: SignatureAlgorithm,
        extensions: &[ExtensionParam],
    ) -> Result<TbsCertificateInner> {
        let extensions = extensions
            .iter()
            .map(ExtensionParam::to_x509_extension)
            .collect::<Result<Vec<_>>>()?;

        Ok(TbsCertificateInner {
            version: Version::V3,
            serial_number: SerialNumber::new(&self.serial_number)?,
            signature: signature_algorithm.into(),
            issuer: issuer.clone(),
            validity: x509_cert::time::Validity {
                not_before: to_x509_time(self.validity.not_before)?,
                not_after: to_x509_time(self.validity.not_after)?,
            },
            subject: self.subject.clone(),
            subject_public_key_info: self.public_key.to_spki()?,
            issuer_unique_id: None,
            subject_unique_id: None,
            extensions: if extensions.is_empty() {
                None
            } else {
                Some(extensions)
            },
        })
    }
}

/// UTCTime through 2049, GeneralizedTime from 2050 on (RFC 5280 section 4.1.2.5).
fn to_x509_time(time: OffsetDateTime) -> Result<Time> {
    let system_time = SystemTime::from(time);
    if time.year() < 2050 {
        Ok(Time::UtcTime(UtcTime::from_system_time(system_time)?))
    } else {
        Ok(Time::GeneralTime(GeneralizedTime::from_system_time(system_time)?))
    }
}
