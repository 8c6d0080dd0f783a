use bon::Builder;
use const_oid::ObjectIdentifier;
use der::asn1::OctetString;
use time::Duration;
use time::OffsetDateTime;

use super::extensions::ToAndFromX509Extension;
use crate::error::{CsrKitError, Result};

/// Default lifetime of a certificate issued from a spec without a duration.
pub const DEFAULT_CERTIFICATE_DURATION: Duration = Duration::days(90);

/// Declarative description of the certificate or request to produce.
///
/// This is the fully resolved input handed over by the layer that watches
/// certificate resources. It is never modified by this crate.
///
/// # Fields
/// * `literal_subject` - An RFC 4514 subject used verbatim when literal subjects are enabled.
/// * `subject` - Structured subject fields.
/// * `common_name` - The common name (CN).
/// * `dns_names`, `ip_addresses`, `email_addresses`, `uris`, `other_names` - SAN entries.
/// * `usages` - Key usages and extended key usages by name.
/// * `is_ca` - Indicates if the certificate is a CA.
/// * `private_key` - Key algorithm and size the subject key uses.
/// * `signature_algorithm` - Explicit signature algorithm name, used without cross-checking.
/// * `name_constraints` - Name constraints to place on a CA.
/// * `encode_usages_in_request` - Whether usages are encoded into the request; defaults to true.
/// * `duration` - Requested certificate lifetime.
#[derive(Clone, Debug, Default, Builder)]
pub struct CertificateSpec {
    #[builder(into)]
    pub literal_subject: Option<String>,
    pub subject: Option<X509Subject>,
    #[builder(default, into)]
    pub common_name: String,
    #[builder(default)]
    pub dns_names: Vec<String>,
    #[builder(default)]
    pub ip_addresses: Vec<String>,
    #[builder(default)]
    pub email_addresses: Vec<String>,
    #[builder(default)]
    pub uris: Vec<String>,
    #[builder(default)]
    pub other_names: Vec<OtherNameSpec>,
    #[builder(default)]
    pub usages: Vec<String>,
    #[builder(default)]
    pub is_ca: bool,
    pub private_key: Option<PrivateKeySpec>,
    #[builder(into)]
    pub signature_algorithm: Option<String>,
    pub name_constraints: Option<NameConstraintsSpec>,
    pub encode_usages_in_request: Option<bool>,
    pub duration: Option<Duration>,
}

/// Structured subject fields.
///
/// Multi-valued fields become a single multi-valued RDN each.
#[derive(Clone, Debug, Default, Builder, PartialEq, Eq)]
pub struct X509Subject {
    #[builder(default)]
    pub countries: Vec<String>,
    #[builder(default)]
    pub organizations: Vec<String>,
    #[builder(default)]
    pub organizational_units: Vec<String>,
    #[builder(default)]
    pub localities: Vec<String>,
    #[builder(default)]
    pub provinces: Vec<String>,
    #[builder(default)]
    pub street_addresses: Vec<String>,
    #[builder(default)]
    pub postal_codes: Vec<String>,
    #[builder(default, into)]
    pub serial_number: String,
}

/// Private key algorithm and size the subject key is expected to use.
///
/// `algorithm` is one of `RSA`, `ECDSA` or `Ed25519` (RSA when absent);
/// `size` is the RSA modulus length or the ECDSA curve size (0 means default).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PrivateKeySpec {
    pub algorithm: Option<String>,
    pub size: usize,
}

/// A SAN of type `otherName` carrying a UTF-8 string value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OtherNameSpec {
    /// Dotted-decimal type identifier.
    pub oid: String,
    pub utf8_value: String,
}

/// Name constraints requested for a CA certificate.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NameConstraintsSpec {
    pub critical: bool,
    pub permitted: Option<NameConstraintItems>,
    pub excluded: Option<NameConstraintItems>,
}

/// One side (permitted or excluded) of a name constraint.
///
/// `ip_ranges` are CIDR strings such as `10.0.0.0/8`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NameConstraintItems {
    pub dns_domains: Vec<String>,
    pub ip_ranges: Vec<String>,
    pub email_addresses: Vec<String>,
    pub uri_domains: Vec<String>,
}

/// Certificate validity period.
///
/// This struct represents the `notBefore` and `notAfter` fields in a certificate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Validity {
    pub not_before: OffsetDateTime,
    pub not_after: OffsetDateTime,
}

impl Validity {
    /// Creates a validity period starting now for the given number of days.
    pub fn for_days(days: i64) -> Self {
        Self::for_duration(Duration::days(days))
    }

    /// Creates a validity period starting now and lasting `duration`.
    pub fn for_duration(duration: Duration) -> Self {
        let now = OffsetDateTime::now_utc();
        Self {
            not_before: now,
            not_after: now + duration,
        }
    }
}

/// Represents an X.509 extension.
///
/// This struct contains the OID, criticality, and value of an extension.
///
/// # Fields
/// * `oid` - The object identifier of the extension.
/// * `critical` - Indicates if the extension is critical.
/// * `value` - The DER-encoded value of the extension.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExtensionParam {
    pub oid: ObjectIdentifier,
    pub critical: bool,
    /// DER-encoded extension value
    pub value: Vec<u8>,
}

impl ExtensionParam {
    /// Creates an `ExtensionParam` from a specific extension.
    ///
    /// # Arguments
    /// * `extension` - The extension to encode.
    /// * `critical` - Indicates if the extension is critical.
    pub fn from_extension<E: ToAndFromX509Extension>(extension: &E, critical: bool) -> Result<Self> {
        Ok(Self {
            oid: E::OID,
            critical,
            value: extension.to_x509_extension_value()?,
        })
    }

    /// Decodes an `ExtensionParam` into a specific extension.
    pub fn to_extension<E: ToAndFromX509Extension>(&self) -> Result<E> {
        if self.oid != E::OID {
            return Err(CsrKitError::DecodingError(format!(
                "extension {} is not {}",
                self.oid,
                E::OID
            )));
        }
        E::from_x509_extension_value(&self.value)
    }

    pub fn to_x509_extension(&self) -> Result<x509_cert::ext::Extension> {
        Ok(x509_cert::ext::Extension {
            extn_id: self.oid,
            critical: self.critical,
            extn_value: OctetString::new(self.value.clone())?,
        })
    }

    pub fn from_x509_extension(ext: &x509_cert::ext::Extension) -> Self {
        Self {
            oid: ext.extn_id,
            critical: ext.critical,
            value: ext.extn_value.as_bytes().to_vec(),
        }
    }
}

/// Looks up an extension by OID.
pub fn find_extension<'a>(
    extensions: &'a [ExtensionParam],
    oid: &ObjectIdentifier,
) -> Option<&'a ExtensionParam> {
    extensions.iter().find(|ext| ext.oid == *oid)
}
