pub mod extensions;
pub mod params;
pub mod subject;

use der::{Decode, Encode};
use extensions::{BasicConstraints, KeyUsage, KeyUsages, SubjectKeyIdentifier, ToAndFromX509Extension};
use log::{debug, trace};
use params::{ExtensionParam, find_extension};
use x509_cert::certificate::CertificateInner;
use x509_cert::name::Name;

use crate::algorithm::SignatureAlgorithm;
use crate::error::{CsrKitError, Result};
use crate::key::PublicKey;
use crate::pem_utils::{CERTIFICATE_LABEL, der_to_pem, pem_blocks_to_der, pem_to_der};

/// Represents a parsed X.509 certificate.
///
/// The DER bytes the certificate was decoded from are kept alongside the
/// decoded form, so re-encoding always yields exactly the signed bytes.
#[derive(Debug, Clone)]
pub struct Certificate {
    /// The inner representation of the certificate.
    pub inner: CertificateInner,
    raw: Vec<u8>,
}

impl PartialEq for Certificate {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl Eq for Certificate {}

impl Certificate {
    /// Decodes a DER certificate.
    pub fn from_der(der: &[u8]) -> Result<Self> {
        let inner = CertificateInner::from_der(der)
            .map_err(|e| CsrKitError::DecodingError(format!("error decoding DER certificate bytes: {e}")))?;
        Ok(Self {
            inner,
            raw: der.to_vec(),
        })
    }

    /// Decodes a single PEM `CERTIFICATE` block.
    pub fn from_pem(pem: &str) -> Result<Self> {
        Self::from_der(&pem_to_der(pem, CERTIFICATE_LABEL)?)
    }

    /// Decodes every `CERTIFICATE` block in a PEM bundle, in order.
    pub fn from_pem_chain(pem: &str) -> Result<Vec<Self>> {
        pem_blocks_to_der(pem, CERTIFICATE_LABEL)?
            .iter()
            .map(|der| Self::from_der(der))
            .collect()
    }

    /// The DER encoding of the certificate.
    pub fn as_der(&self) -> &[u8] {
        &self.raw
    }

    /// Encodes the certificate into PEM format.
    pub fn to_pem(&self) -> String {
        der_to_pem(&self.raw, CERTIFICATE_LABEL)
    }

    pub fn subject(&self) -> &Name {
        &self.inner.tbs_certificate.subject
    }

    pub fn issuer(&self) -> &Name {
        &self.inner.tbs_certificate.issuer
    }

    pub fn serial_number(&self) -> &[u8] {
        self.inner.tbs_certificate.serial_number.as_bytes()
    }

    /// The subject public key.
    pub fn public_key(&self) -> Result<PublicKey> {
        PublicKey::from_spki(&self.inner.tbs_certificate.subject_public_key_info)
    }

    pub fn signature_algorithm(&self) -> Result<SignatureAlgorithm> {
        SignatureAlgorithm::from_oid(&self.inner.signature_algorithm.oid)
    }

    /// All extensions, in certificate order.
    pub fn extensions(&self) -> Vec<ExtensionParam> {
        self.inner
            .tbs_certificate
            .extensions
            .as_deref()
            .unwrap_or_default()
            .iter()
            .map(ExtensionParam::from_x509_extension)
            .collect()
    }

    /// Decodes the extension of type `E`, if the certificate carries one.
    pub fn extension<E: ToAndFromX509Extension>(&self) -> Result<Option<E>> {
        find_extension(&self.extensions(), &E::OID)
            .map(|ext| ext.to_extension())
            .transpose()
    }

    /// True when Basic Constraints mark the certificate as a CA.
    pub fn is_ca(&self) -> bool {
        matches!(self.extension::<BasicConstraints>(), Ok(Some(bc)) if bc.is_ca)
    }

    pub fn subject_key_identifier(&self) -> Option<Vec<u8>> {
        self.extension::<SubjectKeyIdentifier>().ok().flatten().map(|ski| ski.0)
    }

    /// Checks that `parent` issued this certificate.
    ///
    /// The parent must be a CA whose Key Usage, when present, allows
    /// certificate signing, and its key must verify this certificate's
    /// signature.
    pub fn check_signature_from(&self, parent: &Certificate) -> Result<()> {
        if !parent.is_ca() {
            return Err(CsrKitError::MalformedChain(
                "parent certificate is not a CA".to_string(),
            ));
        }
        if let Some(KeyUsage(flags)) = parent.extension::<KeyUsage>()? {
            if !flags.contains(KeyUsages::KeyCertSign) {
                return Err(CsrKitError::MalformedChain(
                    "parent certificate may not sign certificates".to_string(),
                ));
            }
        }

        let tbs = self.inner.tbs_certificate.to_der()?;
        let signature = self.inner.signature.as_bytes().ok_or_else(|| {
            CsrKitError::DecodingError("certificate signature has unused bits".to_string())
        })?;
        parent
            .public_key()?
            .verify(&tbs, signature, self.signature_algorithm()?)
    }

    /// True when the certificate's signature verifies against its own key.
    pub fn is_self_signed(&self) -> bool {
        self.check_signature_from(self).is_ok()
    }
}

/// Encodes a single certificate as one PEM `CERTIFICATE` block.
pub fn encode_x509(cert: &Certificate) -> String {
    cert.to_pem()
}

/// Encodes certificates into a PEM chain.
///
/// `None` entries and self-signed certificates are skipped (RFC 5246
/// section 7.4.2); the remaining certificates keep the order they were
/// given in. The order is not checked, so a misordered input yields a
/// chain TLS peers may reject.
pub fn encode_x509_chain<'a, I, T>(certs: I) -> String
where
    I: IntoIterator<Item = T>,
    T: Into<Option<&'a Certificate>>,
{
    let mut pem = String::new();
    for cert in certs.into_iter().filter_map(|cert| -> Option<&'a Certificate> { cert.into() }) {
        if cert.is_self_signed() {
            trace!("omitting self-signed certificate from chain");
            continue;
        }
        pem.push_str(&cert.to_pem());
    }
    pem
}

/// A certificate chain ready to hand out.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PemBundle {
    /// The certificate at the top of the chain.
    pub ca_pem: String,
    /// The chain, leaf first.
    pub chain_pem: String,
}

/// Orders an unordered set of certificates into a single chain.
///
/// Duplicates are dropped. Certificates are linked to their issuer when
/// the issuer's subject matches and the signature verifies. The input must
/// form exactly one connected chain.
pub fn parse_single_certificate_chain(certs: &[Certificate]) -> Result<PemBundle> {
    let mut unique: Vec<&Certificate> = Vec::new();
    for cert in certs {
        if !unique.contains(&cert) {
            unique.push(cert);
        }
    }
    if unique.is_empty() {
        return Err(CsrKitError::MalformedChain("no certificates given".to_string()));
    }

    let issued_by = |child: &Certificate, parent: &Certificate| {
        child != parent && child.issuer() == parent.subject() && child.check_signature_from(parent).is_ok()
    };

    let issuers: Vec<Option<usize>> = unique
        .iter()
        .map(|child| unique.iter().position(|parent| issued_by(*child, *parent)))
        .collect();

    let leaves: Vec<usize> = (0..unique.len())
        .filter(|i| !issuers.iter().any(|issuer| *issuer == Some(*i)))
        .collect();
    let &[leaf] = leaves.as_slice() else {
        return Err(CsrKitError::MalformedChain(format!(
            "expected a single chain but found {} leaf certificates",
            leaves.len()
        )));
    };

    let mut ordered = vec![leaf];
    let mut current = leaf;
    while let Some(next) = issuers[current] {
        if ordered.contains(&next) {
            return Err(CsrKitError::MalformedChain("certificate chain contains a loop".to_string()));
        }
        ordered.push(next);
        current = next;
    }
    if ordered.len() != unique.len() {
        return Err(CsrKitError::MalformedChain(
            "certificates do not form a single chain".to_string(),
        ));
    }

    let chain: Vec<&Certificate> = ordered.iter().map(|i| unique[*i]).collect();
    let top = chain[chain.len() - 1];
    let chain_pem = if chain.len() == 1 {
        top.to_pem()
    } else {
        encode_x509_chain(chain.iter().copied())
    };

    debug!("assembled certificate chain of {} certificates", chain.len());
    Ok(PemBundle {
        ca_pem: encode_x509(top),
        chain_pem,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cert::params::CertificateSpec;
    use crate::issuer::{sign_certificate, Issuer};
    use crate::key::{KeyPair, Signer};
    use crate::tbs_certificate::CertificateTemplate;

    fn ca_spec(cn: &str) -> CertificateSpec {
        CertificateSpec::builder().common_name(cn).is_ca(true).build()
    }

    fn issue(spec: &CertificateSpec, subject_key: &KeyPair, issuer: &dyn Issuer, issuer_key: &KeyPair) -> Certificate {
        let template = CertificateTemplate::from_spec(spec, subject_key.public_key()).unwrap();
        sign_certificate(&template, issuer, &subject_key.public_key(), issuer_key)
            .unwrap()
            .1
    }

    fn three_level_chain() -> (Certificate, Certificate, Certificate) {
        let root_key = KeyPair::generate_ecdsa_p256();
        let root_template = CertificateTemplate::from_spec(&ca_spec("root"), root_key.public_key()).unwrap();
        let root = sign_certificate(&root_template, &root_template, &root_key.public_key(), &root_key)
            .unwrap()
            .1;

        let intermediate_key = KeyPair::generate_ecdsa_p256();
        let intermediate = issue(&ca_spec("intermediate"), &intermediate_key, &root, &root_key);

        let leaf_key = KeyPair::generate_ecdsa_p256();
        let leaf_spec = CertificateSpec::builder()
            .common_name("leaf.example.com")
            .dns_names(vec!["leaf.example.com".to_string()])
            .build();
        let leaf = issue(&leaf_spec, &leaf_key, &intermediate, &intermediate_key);
        (leaf, intermediate, root)
    }

    #[test]
    fn pem_round_trip() {
        let (leaf, _, _) = three_level_chain();
        let parsed = Certificate::from_pem(&encode_x509(&leaf)).unwrap();
        assert_eq!(parsed, leaf);
        assert_eq!(parsed.as_der(), leaf.as_der());
    }

    #[test]
    fn signature_checks() {
        let (leaf, intermediate, root) = three_level_chain();
        assert!(root.is_self_signed());
        assert!(!intermediate.is_self_signed());
        assert!(leaf.check_signature_from(&intermediate).is_ok());
        assert!(intermediate.check_signature_from(&root).is_ok());
        assert!(leaf.check_signature_from(&root).is_err());
        // a leaf is never a valid parent
        assert!(matches!(
            leaf.check_signature_from(&leaf),
            Err(CsrKitError::MalformedChain(_))
        ));
    }

    #[test]
    fn chain_omits_self_signed_root() {
        let (leaf, intermediate, root) = three_level_chain();
        let pem = encode_x509_chain([&leaf, &intermediate, &root]);
        assert_eq!(pem, format!("{}{}", leaf.to_pem(), intermediate.to_pem()));
    }

    #[test]
    fn chain_skips_none_and_keeps_order() {
        let (leaf, intermediate, _) = three_level_chain();
        let pem = encode_x509_chain([Some(&intermediate), None, Some(&leaf)]);
        assert_eq!(pem, format!("{}{}", intermediate.to_pem(), leaf.to_pem()));
        assert_eq!(encode_x509_chain(Vec::<Option<&Certificate>>::new()), "");
    }

    #[test]
    fn single_chain_is_ordered() {
        let (leaf, intermediate, root) = three_level_chain();
        let bundle =
            parse_single_certificate_chain(&[root.clone(), leaf.clone(), intermediate.clone(), leaf.clone()])
                .unwrap();
        assert_eq!(bundle.ca_pem, root.to_pem());
        assert_eq!(bundle.chain_pem, format!("{}{}", leaf.to_pem(), intermediate.to_pem()));
    }

    #[test]
    fn single_self_signed_certificate_is_its_own_chain() {
        let (_, _, root) = three_level_chain();
        let bundle = parse_single_certificate_chain(&[root.clone()]).unwrap();
        assert_eq!(bundle.ca_pem, root.to_pem());
        assert_eq!(bundle.chain_pem, root.to_pem());
    }

    #[test]
    fn broken_chain_is_rejected() {
        let (leaf, _, root) = three_level_chain();
        assert!(matches!(
            parse_single_certificate_chain(&[leaf, root]),
            Err(CsrKitError::MalformedChain(_))
        ));
        assert!(matches!(
            parse_single_certificate_chain(&[]),
            Err(CsrKitError::MalformedChain(_))
        ));
    }

    #[test]
    fn pem_chain_decoding() {
        let (leaf, intermediate, _) = three_level_chain();
        let pem = encode_x509_chain([&leaf, &intermediate]);
        assert_eq!(Certificate::from_pem_chain(&pem).unwrap(), vec![leaf, intermediate]);
    }
}
