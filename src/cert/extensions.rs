use core::fmt;
use core::str::FromStr;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use const_oid::AssociatedOid;
use der::{
    Any, Decode, Encode, Tag,
    asn1::{Ia5String, OctetString},
    oid::ObjectIdentifier,
};
use x509_cert::ext::pkix::constraints::name::GeneralSubtree;
use x509_cert::ext::pkix::name::GeneralName;

pub use der::flagset::FlagSet;
use x509_cert::ext::pkix::KeyUsage as X509KeyUsage;
pub use x509_cert::ext::pkix::KeyUsages;

use super::params::{CertificateSpec, ExtensionParam, NameConstraintsSpec};
use crate::error::{CsrKitError, Result};
use crate::oid;

/// Trait for converting to and from X.509 extensions.
///
/// This trait provides methods to encode and decode X.509 extension values.
///
/// # Example
/// ```
/// use csrkit::cert::extensions::{GeneralNames, ToAndFromX509Extension};
/// let san = GeneralNames {
///     dns_names: vec!["example.com".to_string()],
///     ..Default::default()
/// };
/// let encoded = san.to_x509_extension_value().unwrap();
/// let decoded = GeneralNames::from_x509_extension_value(&encoded).unwrap();
/// assert_eq!(san, decoded);
/// ```
pub trait ToAndFromX509Extension {
    /// The Object Identifier (OID) for the extension.
    const OID: ObjectIdentifier;

    /// Encodes the extension into a DER-encoded byte vector.
    fn to_x509_extension_value(&self) -> Result<Vec<u8>>;

    /// Decodes the extension from a DER-encoded byte slice.
    fn from_x509_extension_value(extension: &[u8]) -> Result<Self>
    where
        Self: Sized;
}

/// A SAN entry of type `otherName`.
///
/// `value` holds the universal value (a UTF8String for names built from a
/// spec); it is wrapped in an explicit, constructed `[0]` tag when encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OtherName {
    pub type_id: ObjectIdentifier,
    pub value: Any,
}

impl OtherName {
    /// Builds an other-name from a dotted OID string and a UTF-8 value.
    pub fn utf8(type_id: &str, value: &str) -> Result<Self> {
        let type_id = ObjectIdentifier::new(type_id).map_err(|e| {
            CsrKitError::InvalidSpec(format!("failed to parse OID {type_id:?}: {e}"))
        })?;
        Ok(Self {
            type_id,
            value: Any::new(Tag::Utf8String, value.as_bytes())?,
        })
    }
}

/// The canonical set of Subject Alternative Names.
///
/// Encoding emits the entries grouped by type in a fixed order (DNS, email,
/// IP, URI, other), so encoding the same set twice yields identical bytes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GeneralNames {
    pub rfc822_names: Vec<String>,
    pub dns_names: Vec<String>,
    pub uris: Vec<String>,
    pub ip_addresses: Vec<IpAddr>,
    pub other_names: Vec<OtherName>,
}

impl GeneralNames {
    /// True when no SAN of any type is present.
    pub fn is_empty(&self) -> bool {
        self.rfc822_names.is_empty()
            && self.dns_names.is_empty()
            && self.uris.is_empty()
            && self.ip_addresses.is_empty()
            && self.other_names.is_empty()
    }

    fn to_general_names(&self) -> Result<Vec<GeneralName>> {
        let ia5 = |name: &String| {
            Ia5String::new(name).map_err(|e| {
                CsrKitError::InvalidSpec(format!("{name:?} is not a valid IA5 string: {e}"))
            })
        };

        let mut names = Vec::new();
        for name in &self.dns_names {
            names.push(GeneralName::DnsName(ia5(name)?));
        }
        for email in &self.rfc822_names {
            names.push(GeneralName::Rfc822Name(ia5(email)?));
        }
        for ip in &self.ip_addresses {
            names.push(GeneralName::IpAddress(OctetString::new(ip_to_bytes(ip))?));
        }
        for uri in &self.uris {
            names.push(GeneralName::UniformResourceIdentifier(ia5(uri)?));
        }
        for other in &self.other_names {
            names.push(GeneralName::OtherName(
                x509_cert::ext::pkix::name::OtherName {
                    type_id: other.type_id,
                    value: other.value.clone(),
                },
            ));
        }
        Ok(names)
    }
}

impl ToAndFromX509Extension for GeneralNames {
    const OID: ObjectIdentifier = x509_cert::ext::pkix::SubjectAltName::OID;

    fn to_x509_extension_value(&self) -> Result<Vec<u8>> {
        let san = x509_cert::ext::pkix::SubjectAltName(self.to_general_names()?);
        Ok(san.to_der()?)
    }

    fn from_x509_extension_value(extension: &[u8]) -> Result<Self> {
        let san = x509_cert::ext::pkix::SubjectAltName::from_der(extension)
            .map_err(|e| CsrKitError::DecodingError(e.to_string()))?;
        let mut names = GeneralNames::default();
        for name in san.0 {
            match name {
                GeneralName::DnsName(dns) => names.dns_names.push(dns.to_string()),
                GeneralName::Rfc822Name(email) => names.rfc822_names.push(email.to_string()),
                GeneralName::UniformResourceIdentifier(uri) => names.uris.push(uri.to_string()),
                GeneralName::IpAddress(ip) => names.ip_addresses.push(ip_from_bytes(ip.as_bytes())?),
                GeneralName::OtherName(other) => names.other_names.push(OtherName {
                    type_id: other.type_id,
                    value: other.value,
                }),
                _ => {
                    return Err(CsrKitError::DecodingError(
                        "Unsupported general name type".to_string(),
                    ));
                }
            }
        }
        Ok(names)
    }
}

/// Builds the SAN extension.
///
/// The extension is critical only when the certificate subject is empty
/// (RFC 5280 section 4.2.1.6).
pub fn marshal_sans(names: &GeneralNames, has_subject: bool) -> Result<ExtensionParam> {
    ExtensionParam::from_extension(names, !has_subject)
}

/// Parses IP address strings. Zone-qualified IPv6 addresses are rejected.
pub fn ip_addresses_from_strings(addresses: &[String]) -> Result<Vec<IpAddr>> {
    addresses
        .iter()
        .map(|address| {
            IpAddr::from_str(address).map_err(|_| {
                CsrKitError::InvalidSpec(format!("failed to parse IP address {address:?}"))
            })
        })
        .collect()
}

/// IPv4 and IPv4-mapped IPv6 addresses take their 4-byte form.
fn ip_to_bytes(ip: &IpAddr) -> Vec<u8> {
    match ip {
        IpAddr::V4(v4) => v4.octets().to_vec(),
        IpAddr::V6(v6) => match v6.to_ipv4_mapped() {
            Some(v4) => v4.octets().to_vec(),
            None => v6.octets().to_vec(),
        },
    }
}

fn ip_from_bytes(bytes: &[u8]) -> Result<IpAddr> {
    if let Ok(octets) = <[u8; 4]>::try_from(bytes) {
        return Ok(IpAddr::V4(Ipv4Addr::from(octets)));
    }
    if let Ok(octets) = <[u8; 16]>::try_from(bytes) {
        return Ok(IpAddr::V6(Ipv6Addr::from(octets)));
    }
    Err(CsrKitError::DecodingError(format!(
        "invalid IP address length {}",
        bytes.len()
    )))
}

/// Represents the Basic Constraints extension.
///
/// This extension indicates whether the certificate is a CA certificate and its path length.
///
/// # Fields
/// * `is_ca` - Indicates if the certificate is a CA.
/// * `max_path_length` - The maximum number of intermediate CAs allowed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BasicConstraints {
    pub is_ca: bool,
    pub max_path_length: Option<u8>,
}

impl ToAndFromX509Extension for BasicConstraints {
    const OID: ObjectIdentifier = x509_cert::ext::pkix::BasicConstraints::OID;

    fn to_x509_extension_value(&self) -> Result<Vec<u8>> {
        let bc = x509_cert::ext::pkix::BasicConstraints {
            ca: self.is_ca,
            path_len_constraint: self.max_path_length,
        };

        Ok(bc.to_der()?)
    }

    fn from_x509_extension_value(der_bytes: &[u8]) -> Result<Self> {
        let bc = x509_cert::ext::pkix::BasicConstraints::from_der(der_bytes)
            .map_err(|e| CsrKitError::DecodingError(e.to_string()))?;
        Ok(Self {
            is_ca: bc.ca,
            max_path_length: bc.path_len_constraint,
        })
    }
}

/// Builds the (critical) Basic Constraints extension.
pub fn marshal_basic_constraints(is_ca: bool, max_path_length: Option<u8>) -> Result<ExtensionParam> {
    ExtensionParam::from_extension(
        &BasicConstraints {
            is_ca,
            max_path_length,
        },
        true,
    )
}

/// Represents the Key Usage extension.
///
/// This extension defines the purpose of the key contained in the certificate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyUsage(pub FlagSet<KeyUsages>);

impl ToAndFromX509Extension for KeyUsage {
    const OID: ObjectIdentifier = <X509KeyUsage as AssociatedOid>::OID;

    fn to_x509_extension_value(&self) -> Result<Vec<u8>> {
        Ok(X509KeyUsage(self.0).to_der()?)
    }

    fn from_x509_extension_value(extension: &[u8]) -> Result<Self> {
        let ku = X509KeyUsage::from_der(extension)
            .map_err(|e| CsrKitError::DecodingError(e.to_string()))?;
        Ok(Self(ku.0))
    }
}

/// Represents the Extended Key Usage extension.
///
/// This extension indicates purposes for which the public key may be used.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtendedKeyUsage {
    pub usage: Vec<ExtendedKeyUsageOption>,
}

impl ToAndFromX509Extension for ExtendedKeyUsage {
    const OID: ObjectIdentifier = x509_cert::ext::pkix::ExtendedKeyUsage::OID;

    fn to_x509_extension_value(&self) -> Result<Vec<u8>> {
        let oids: Vec<ObjectIdentifier> = self.usage.iter().map(|v| (*v).into()).collect();
        let eku = x509_cert::ext::pkix::ExtendedKeyUsage(oids);
        Ok(eku.to_der()?)
    }

    fn from_x509_extension_value(extension: &[u8]) -> Result<Self> {
        let eku = x509_cert::ext::pkix::ExtendedKeyUsage::from_der(extension)
            .map_err(|e| CsrKitError::DecodingError(e.to_string()))?;
        let usage = eku
            .0
            .iter()
            .map(|v| {
                ExtendedKeyUsageOption::from_oid(v).ok_or_else(|| {
                    CsrKitError::DecodingError(format!("Unsupported extended key usage {v}"))
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { usage })
    }
}

/// Represents an option for the Extended Key Usage extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ExtendedKeyUsageOption {
    Any,
    ServerAuth,
    ClientAuth,
    CodeSigning,
    EmailProtection,
    IpsecEndSystem,
    IpsecTunnel,
    IpsecUser,
    TimeStamping,
    OcspSigning,
    MicrosoftServerGatedCrypto,
    NetscapeServerGatedCrypto,
}

impl ExtendedKeyUsageOption {
    const ALL: [ExtendedKeyUsageOption; 12] = [
        ExtendedKeyUsageOption::Any,
        ExtendedKeyUsageOption::ServerAuth,
        ExtendedKeyUsageOption::ClientAuth,
        ExtendedKeyUsageOption::CodeSigning,
        ExtendedKeyUsageOption::EmailProtection,
        ExtendedKeyUsageOption::IpsecEndSystem,
        ExtendedKeyUsageOption::IpsecTunnel,
        ExtendedKeyUsageOption::IpsecUser,
        ExtendedKeyUsageOption::TimeStamping,
        ExtendedKeyUsageOption::OcspSigning,
        ExtendedKeyUsageOption::MicrosoftServerGatedCrypto,
        ExtendedKeyUsageOption::NetscapeServerGatedCrypto,
    ];

    pub fn from_oid(oid: &ObjectIdentifier) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|option| ObjectIdentifier::from(*option) == *oid)
    }
}

impl From<ExtendedKeyUsageOption> for ObjectIdentifier {
    fn from(value: ExtendedKeyUsageOption) -> Self {
        match value {
            ExtendedKeyUsageOption::Any => oid::KP_ANY,
            ExtendedKeyUsageOption::ServerAuth => oid::KP_SERVER_AUTH,
            ExtendedKeyUsageOption::ClientAuth => oid::KP_CLIENT_AUTH,
            ExtendedKeyUsageOption::CodeSigning => oid::KP_CODE_SIGNING,
            ExtendedKeyUsageOption::EmailProtection => oid::KP_EMAIL_PROTECTION,
            ExtendedKeyUsageOption::IpsecEndSystem => oid::KP_IPSEC_END_SYSTEM,
            ExtendedKeyUsageOption::IpsecTunnel => oid::KP_IPSEC_TUNNEL,
            ExtendedKeyUsageOption::IpsecUser => oid::KP_IPSEC_USER,
            ExtendedKeyUsageOption::TimeStamping => oid::KP_TIME_STAMPING,
            ExtendedKeyUsageOption::OcspSigning => oid::KP_OCSP_SIGNING,
            ExtendedKeyUsageOption::MicrosoftServerGatedCrypto => oid::KP_MICROSOFT_SGC,
            ExtendedKeyUsageOption::NetscapeServerGatedCrypto => oid::KP_NETSCAPE_SGC,
        }
    }
}

/// Usages applied when a spec names none.
pub const DEFAULT_KEY_USAGES: [&str; 2] = ["digital signature", "key encipherment"];

/// Maps a usage name to a Key Usage bit.
pub fn key_usage_type(usage: &str) -> Option<KeyUsages> {
    match usage {
        "signing" | "digital signature" => Some(KeyUsages::DigitalSignature),
        "content commitment" => Some(KeyUsages::NonRepudiation),
        "key encipherment" => Some(KeyUsages::KeyEncipherment),
        "key agreement" => Some(KeyUsages::KeyAgreement),
        "data encipherment" => Some(KeyUsages::DataEncipherment),
        "cert sign" => Some(KeyUsages::KeyCertSign),
        "crl sign" => Some(KeyUsages::CRLSign),
        "encipher only" => Some(KeyUsages::EncipherOnly),
        "decipher only" => Some(KeyUsages::DecipherOnly),
        _ => None,
    }
}

/// Maps a usage name to an Extended Key Usage purpose.
pub fn ext_key_usage_type(usage: &str) -> Option<ExtendedKeyUsageOption> {
    match usage {
        "any" => Some(ExtendedKeyUsageOption::Any),
        "server auth" => Some(ExtendedKeyUsageOption::ServerAuth),
        "client auth" => Some(ExtendedKeyUsageOption::ClientAuth),
        "code signing" => Some(ExtendedKeyUsageOption::CodeSigning),
        "email protection" | "s/mime" => Some(ExtendedKeyUsageOption::EmailProtection),
        "ipsec end system" => Some(ExtendedKeyUsageOption::IpsecEndSystem),
        "ipsec tunnel" => Some(ExtendedKeyUsageOption::IpsecTunnel),
        "ipsec user" => Some(ExtendedKeyUsageOption::IpsecUser),
        "timestamping" => Some(ExtendedKeyUsageOption::TimeStamping),
        "ocsp signing" => Some(ExtendedKeyUsageOption::OcspSigning),
        "microsoft sgc" => Some(ExtendedKeyUsageOption::MicrosoftServerGatedCrypto),
        "netscape sgc" => Some(ExtendedKeyUsageOption::NetscapeServerGatedCrypto),
        _ => None,
    }
}

/// Resolves usage names into Key Usage bits and Extended Key Usage purposes.
///
/// CA certificates always get the certificate-signing bit. An empty usage
/// list means [`DEFAULT_KEY_USAGES`]. Every unrecognised name is collected
/// and reported together in a single [`CsrKitError::UnknownUsage`].
pub fn key_usages_for_certificate(
    usages: &[String],
    is_ca: bool,
) -> Result<(FlagSet<KeyUsages>, Vec<ExtendedKeyUsageOption>)> {
    let mut key_usage_flags: FlagSet<KeyUsages> = FlagSet::default();
    let mut extended = Vec::new();
    let mut unknown = Vec::new();

    if is_ca {
        key_usage_flags |= KeyUsages::KeyCertSign;
    }

    let defaults: Vec<String>;
    let usages = if usages.is_empty() {
        defaults = DEFAULT_KEY_USAGES.iter().map(|u| u.to_string()).collect();
        &defaults
    } else {
        usages
    };

    for usage in usages {
        if let Some(bit) = key_usage_type(usage) {
            key_usage_flags |= bit;
        } else if let Some(eku) = ext_key_usage_type(usage) {
            extended.push(eku);
        } else {
            unknown.push(usage.clone());
        }
    }

    if !unknown.is_empty() {
        return Err(CsrKitError::UnknownUsage(unknown));
    }
    Ok((key_usage_flags, extended))
}

/// Builds the Key Usage (critical) and Extended Key Usage extensions for a spec.
///
/// Key Usage is emitted only when at least one bit is set, Extended Key Usage
/// only when at least one purpose was named.
pub fn usage_extensions(spec: &CertificateSpec) -> Result<Vec<ExtensionParam>> {
    let (key_usage_flags, extended) = key_usages_for_certificate(&spec.usages, spec.is_ca)?;

    let mut extensions = Vec::new();
    if !key_usage_flags.is_empty() {
        extensions.push(ExtensionParam::from_extension(&KeyUsage(key_usage_flags), true)?);
    }
    if !extended.is_empty() {
        extensions.push(ExtensionParam::from_extension(
            &ExtendedKeyUsage { usage: extended },
            false,
        )?);
    }
    Ok(extensions)
}

/// An IP network used in name constraints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IpRange {
    /// Network address with host bits cleared.
    pub network: IpAddr,
    pub prefix_len: u8,
}

impl IpRange {
    fn max_prefix(ip: &IpAddr) -> u8 {
        match ip {
            IpAddr::V4(_) => 32,
            IpAddr::V6(_) => 128,
        }
    }

    fn mask(prefix_len: u8, width: u8) -> Vec<u8> {
        (0..width / 8)
            .map(|i| {
                let bits = prefix_len.saturating_sub(i * 8).min(8);
                (0xffu16 << (8 - bits)) as u8
            })
            .collect()
    }

    /// The address followed by the netmask, as used by `iPAddress` constraints.
    pub fn to_bytes(&self) -> Vec<u8> {
        let width = Self::max_prefix(&self.network);
        let mut bytes = ip_to_bytes(&self.network);
        if bytes.len() * 8 != width as usize {
            // IPv4-mapped IPv6 network; keep the 16-byte form
            if let IpAddr::V6(v6) = self.network {
                bytes = v6.octets().to_vec();
            }
        }
        bytes.extend(Self::mask(self.prefix_len, width));
        bytes
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let (address, mask) = bytes.split_at(bytes.len() / 2);
        let network = ip_from_bytes(address)?;
        let prefix_len = mask.iter().map(|b| b.count_ones()).sum::<u32>() as u8;
        if Self::mask(prefix_len, Self::max_prefix(&network)) != mask {
            return Err(CsrKitError::DecodingError(
                "non-contiguous netmask in IP constraint".to_string(),
            ));
        }
        Ok(Self {
            network,
            prefix_len,
        })
    }
}

impl FromStr for IpRange {
    type Err = CsrKitError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || CsrKitError::InvalidSpec(format!("invalid CIDR address: {s}"));
        let (address, prefix) = s.split_once('/').ok_or_else(invalid)?;
        let address = IpAddr::from_str(address).map_err(|_| invalid())?;
        let prefix_len: u8 = prefix.parse().map_err(|_| invalid())?;
        if prefix.starts_with('+') || prefix_len > Self::max_prefix(&address) {
            return Err(invalid());
        }

        let network = match address {
            IpAddr::V4(v4) => {
                let mask = u32::MAX.checked_shl(32 - prefix_len as u32).unwrap_or(0);
                IpAddr::V4(Ipv4Addr::from(u32::from(v4) & mask))
            }
            IpAddr::V6(v6) => {
                let mask = u128::MAX.checked_shl(128 - prefix_len as u32).unwrap_or(0);
                IpAddr::V6(Ipv6Addr::from(u128::from(v6) & mask))
            }
        };
        Ok(Self {
            network,
            prefix_len,
        })
    }
}

impl fmt::Display for IpRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.network, self.prefix_len)
    }
}

/// Parses a list of CIDR strings.
pub fn parse_cidrs(cidrs: &[String]) -> Result<Vec<IpRange>> {
    cidrs.iter().map(|cidr| cidr.parse()).collect()
}

/// Represents the Name Constraints extension.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NameConstraints {
    pub permitted_dns_domains: Vec<String>,
    pub excluded_dns_domains: Vec<String>,
    pub permitted_ip_ranges: Vec<IpRange>,
    pub excluded_ip_ranges: Vec<IpRange>,
    pub permitted_email_addresses: Vec<String>,
    pub excluded_email_addresses: Vec<String>,
    pub permitted_uri_domains: Vec<String>,
    pub excluded_uri_domains: Vec<String>,
}

impl NameConstraints {
    /// Resolves the requested constraints, parsing every IP range.
    pub fn from_spec(spec: &NameConstraintsSpec) -> Result<Self> {
        let mut constraints = NameConstraints::default();
        if let Some(permitted) = &spec.permitted {
            constraints.permitted_dns_domains = permitted.dns_domains.clone();
            constraints.permitted_ip_ranges = parse_cidrs(&permitted.ip_ranges)?;
            constraints.permitted_email_addresses = permitted.email_addresses.clone();
            constraints.permitted_uri_domains = permitted.uri_domains.clone();
        }
        if let Some(excluded) = &spec.excluded {
            constraints.excluded_dns_domains = excluded.dns_domains.clone();
            constraints.excluded_ip_ranges = parse_cidrs(&excluded.ip_ranges)?;
            constraints.excluded_email_addresses = excluded.email_addresses.clone();
            constraints.excluded_uri_domains = excluded.uri_domains.clone();
        }
        Ok(constraints)
    }

    pub fn is_empty(&self) -> bool {
        self.permitted_dns_domains.is_empty()
            && self.excluded_dns_domains.is_empty()
            && self.permitted_ip_ranges.is_empty()
            && self.excluded_ip_ranges.is_empty()
            && self.permitted_email_addresses.is_empty()
            && self.excluded_email_addresses.is_empty()
            && self.permitted_uri_domains.is_empty()
            && self.excluded_uri_domains.is_empty()
    }
}

fn subtrees(
    dns_domains: &[String],
    ip_ranges: &[IpRange],
    email_addresses: &[String],
    uri_domains: &[String],
) -> Result<Option<Vec<GeneralSubtree>>> {
    let ia5 = |value: &String| {
        Ia5String::new(value).map_err(|e| {
            CsrKitError::InvalidSpec(format!("{value:?} is not a valid IA5 string: {e}"))
        })
    };

    let mut bases = Vec::new();
    for domain in dns_domains {
        bases.push(GeneralName::DnsName(ia5(domain)?));
    }
    for range in ip_ranges {
        bases.push(GeneralName::IpAddress(OctetString::new(range.to_bytes())?));
    }
    for email in email_addresses {
        bases.push(GeneralName::Rfc822Name(ia5(email)?));
    }
    for domain in uri_domains {
        bases.push(GeneralName::UniformResourceIdentifier(ia5(domain)?));
    }

    if bases.is_empty() {
        return Ok(None);
    }
    Ok(Some(
        bases
            .into_iter()
            .map(|base| GeneralSubtree {
                base,
                minimum: 0,
                maximum: None,
            })
            .collect(),
    ))
}

impl ToAndFromX509Extension for NameConstraints {
    const OID: ObjectIdentifier = x509_cert::ext::pkix::NameConstraints::OID;

    fn to_x509_extension_value(&self) -> Result<Vec<u8>> {
        let nc = x509_cert::ext::pkix::NameConstraints {
            permitted_subtrees: subtrees(
                &self.permitted_dns_domains,
                &self.permitted_ip_ranges,
                &self.permitted_email_addresses,
                &self.permitted_uri_domains,
            )?,
            excluded_subtrees: subtrees(
                &self.excluded_dns_domains,
                &self.excluded_ip_ranges,
                &self.excluded_email_addresses,
                &self.excluded_uri_domains,
            )?,
        };
        Ok(nc.to_der()?)
    }

    fn from_x509_extension_value(extension: &[u8]) -> Result<Self> {
        let nc = x509_cert::ext::pkix::NameConstraints::from_der(extension)
            .map_err(|e| CsrKitError::DecodingError(e.to_string()))?;

        let mut constraints = NameConstraints::default();
        for (trees, permitted) in [(nc.permitted_subtrees, true), (nc.excluded_subtrees, false)] {
            for subtree in trees.unwrap_or_default() {
                match (subtree.base, permitted) {
                    (GeneralName::DnsName(d), true) => constraints.permitted_dns_domains.push(d.to_string()),
                    (GeneralName::DnsName(d), false) => constraints.excluded_dns_domains.push(d.to_string()),
                    (GeneralName::IpAddress(ip), true) => constraints
                        .permitted_ip_ranges
                        .push(IpRange::from_bytes(ip.as_bytes())?),
                    (GeneralName::IpAddress(ip), false) => constraints
                        .excluded_ip_ranges
                        .push(IpRange::from_bytes(ip.as_bytes())?),
                    (GeneralName::Rfc822Name(e), true) => {
                        constraints.permitted_email_addresses.push(e.to_string())
                    }
                    (GeneralName::Rfc822Name(e), false) => {
                        constraints.excluded_email_addresses.push(e.to_string())
                    }
                    (GeneralName::UniformResourceIdentifier(u), true) => {
                        constraints.permitted_uri_domains.push(u.to_string())
                    }
                    (GeneralName::UniformResourceIdentifier(u), false) => {
                        constraints.excluded_uri_domains.push(u.to_string())
                    }
                    _ => {
                        return Err(CsrKitError::DecodingError(
                            "Unsupported name constraint type".to_string(),
                        ));
                    }
                }
            }
        }
        Ok(constraints)
    }
}

/// Builds the Name Constraints extension for a spec, or `None` when the
/// merged constraints are empty.
pub fn name_constraints_extension(spec: &NameConstraintsSpec) -> Result<Option<ExtensionParam>> {
    let constraints = NameConstraints::from_spec(spec)?;
    if constraints.is_empty() {
        return Ok(None);
    }
    ExtensionParam::from_extension(&constraints, spec.critical).map(Some)
}

/// Represents the Subject Key Identifier extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectKeyIdentifier(pub Vec<u8>);

impl ToAndFromX509Extension for SubjectKeyIdentifier {
    const OID: ObjectIdentifier = x509_cert::ext::pkix::SubjectKeyIdentifier::OID;

    fn to_x509_extension_value(&self) -> Result<Vec<u8>> {
        let ski = x509_cert::ext::pkix::SubjectKeyIdentifier(OctetString::new(self.0.as_slice())?);
        Ok(ski.to_der()?)
    }

    fn from_x509_extension_value(extension: &[u8]) -> Result<Self> {
        let ski = x509_cert::ext::pkix::SubjectKeyIdentifier::from_der(extension)
            .map_err(|e| CsrKitError::DecodingError(e.to_string()))?;
        Ok(Self(ski.0.as_bytes().to_vec()))
    }
}

/// Represents the Authority Key Identifier (AKI) extension.
///
/// Only the key identifier form is produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorityKeyIdentifier {
    pub key_identifier: Vec<u8>,
}

impl ToAndFromX509Extension for AuthorityKeyIdentifier {
    const OID: ObjectIdentifier = x509_cert::ext::pkix::AuthorityKeyIdentifier::OID;

    fn to_x509_extension_value(&self) -> Result<Vec<u8>> {
        let aki = x509_cert::ext::pkix::AuthorityKeyIdentifier {
            key_identifier: Some(OctetString::new(self.key_identifier.as_slice())?),
            authority_cert_issuer: None,
            authority_cert_serial_number: None,
        };

        Ok(aki.to_der()?)
    }

    fn from_x509_extension_value(extension: &[u8]) -> Result<Self> {
        let aki = x509_cert::ext::pkix::AuthorityKeyIdentifier::from_der(extension)
            .map_err(|e| CsrKitError::DecodingError(e.to_string()))?;

        Ok(Self {
            key_identifier: aki
                .key_identifier
                .map(|id| id.as_bytes().to_vec())
                .unwrap_or_default(),
        })
    }
}
