use core::str::FromStr;

use const_oid::ObjectIdentifier;
use der::{Any, Tag, Tagged, asn1::PrintableStringRef, asn1::SetOfVec};
use x509_cert::attr::AttributeTypeAndValue;
use x509_cert::name::{Name, RdnSequence, RelativeDistinguishedName};

use super::params::CertificateSpec;
use crate::error::{CsrKitError, Result};
use crate::oid;

/// PrintableString when every character allows it, UTF8String otherwise.
fn attribute_value(value: &str) -> Result<Any> {
    let tag = if PrintableStringRef::new(value).is_ok() {
        Tag::PrintableString
    } else {
        Tag::Utf8String
    };
    Ok(Any::new(tag, value.as_bytes())?)
}

fn push_rdn(rdns: &mut Vec<RelativeDistinguishedName>, oid: ObjectIdentifier, values: &[String]) -> Result<()> {
    if values.is_empty() {
        return Ok(());
    }
    let attributes = values
        .iter()
        .map(|value| {
            Ok(AttributeTypeAndValue {
                oid,
                value: attribute_value(value)?,
            })
        })
        .collect::<Result<Vec<_>>>()?;
    rdns.push(rdn(attributes)?);
    Ok(())
}

fn rdn(attributes: Vec<AttributeTypeAndValue>) -> Result<RelativeDistinguishedName> {
    let set = SetOfVec::try_from(attributes)
        .map_err(|e| CsrKitError::InvalidSpec(format!("invalid subject attribute: {e}")))?;
    Ok(RelativeDistinguishedName(set))
}

/// Builds the subject from the structured fields and the common name.
///
/// Attributes appear in the order C, ST, L, STREET, POSTALCODE, O, OU, CN,
/// SERIALNUMBER; each multi-valued field becomes a single RDN.
pub fn structured_subject(spec: &CertificateSpec) -> Result<Name> {
    let subject = spec.subject.clone().unwrap_or_default();
    let single = |value: &String| -> Vec<String> {
        if value.is_empty() {
            Vec::new()
        } else {
            vec![value.clone()]
        }
    };

    let mut rdns = Vec::new();
    push_rdn(&mut rdns, oid::COUNTRY_NAME, &subject.countries)?;
    push_rdn(&mut rdns, oid::STATE_OR_PROVINCE_NAME, &subject.provinces)?;
    push_rdn(&mut rdns, oid::LOCALITY_NAME, &subject.localities)?;
    push_rdn(&mut rdns, oid::STREET_ADDRESS, &subject.street_addresses)?;
    push_rdn(&mut rdns, oid::POSTAL_CODE, &subject.postal_codes)?;
    push_rdn(&mut rdns, oid::ORGANIZATION_NAME, &subject.organizations)?;
    push_rdn(&mut rdns, oid::ORGANIZATIONAL_UNIT_NAME, &subject.organizational_units)?;
    push_rdn(&mut rdns, oid::COMMON_NAME, &single(&spec.common_name))?;
    push_rdn(&mut rdns, oid::SERIAL_NUMBER, &single(&subject.serial_number))?;
    Ok(RdnSequence(rdns))
}

/// Parses an RFC 4514 distinguished name into its DER form.
///
/// The string lists the most specific RDN first; the encoded sequence is
/// in the reverse order. Text values get the same string types as the
/// structured subject; hex-encoded (`#...`) values are kept as given.
pub fn literal_subject(literal: &str) -> Result<Name> {
    let parsed = RdnSequence::from_str(literal)
        .map_err(|e| CsrKitError::InvalidSpec(format!("failed to parse literal subject {literal:?}: {e}")))?;

    let rdns = parsed
        .0
        .iter()
        .map(|parsed_rdn| {
            let attributes = parsed_rdn
                .0
                .iter()
                .map(|attr| {
                    let value = match attr.value.tag() {
                        Tag::Utf8String | Tag::PrintableString => {
                            let text = core::str::from_utf8(attr.value.value()).map_err(|e| {
                                CsrKitError::InvalidSpec(format!("literal subject value is not UTF-8: {e}"))
                            })?;
                            attribute_value(text)?
                        }
                        _ => attr.value.clone(),
                    };
                    Ok(AttributeTypeAndValue { oid: attr.oid, value })
                })
                .collect::<Result<Vec<_>>>()?;
            rdn(attributes)
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(RdnSequence(rdns))
}

/// Chooses the subject for a spec: the literal subject when enabled and
/// non-empty, the structured subject otherwise.
pub fn subject_for_spec(spec: &CertificateSpec, use_literal_subject: bool) -> Result<Name> {
    match spec.literal_subject.as_deref() {
        Some(literal) if use_literal_subject && !literal.is_empty() => literal_subject(literal),
        _ => structured_subject(spec),
    }
}

/// Returns the value of the first common name attribute, if any.
pub fn common_name(name: &Name) -> Option<String> {
    name.0
        .iter()
        .flat_map(|rdn| rdn.0.iter())
        .find(|attr| attr.oid == oid::COMMON_NAME)
        .and_then(|attr| match attr.value.tag() {
            Tag::Utf8String | Tag::PrintableString | Tag::Ia5String => {
                core::str::from_utf8(attr.value.value()).ok().map(str::to_owned)
            }
            _ => None,
        })
}

/// True when the name holds no RDN at all.
pub fn is_subject_empty(name: &Name) -> bool {
    name.0.is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cert::params::X509Subject;

    fn oids(name: &Name) -> Vec<ObjectIdentifier> {
        name.0.iter().map(|rdn| rdn.0.get(0).unwrap().oid).collect()
    }

    #[test]
    fn structured_subject_order() {
        let spec = CertificateSpec::builder()
            .common_name("example.com")
            .subject(
                X509Subject::builder()
                    .serial_number("1234")
                    .organizational_units(vec!["ops".to_string()])
                    .organizations(vec!["Example".to_string()])
                    .countries(vec!["GB".to_string()])
                    .localities(vec!["London".to_string()])
                    .build(),
            )
            .build();
        let name = structured_subject(&spec).unwrap();
        assert_eq!(
            oids(&name),
            vec![
                oid::COUNTRY_NAME,
                oid::LOCALITY_NAME,
                oid::ORGANIZATION_NAME,
                oid::ORGANIZATIONAL_UNIT_NAME,
                oid::COMMON_NAME,
                oid::SERIAL_NUMBER,
            ]
        );
        assert_eq!(common_name(&name).as_deref(), Some("example.com"));
    }

    #[test]
    fn multi_valued_field_is_one_rdn() {
        let spec = CertificateSpec::builder()
            .subject(
                X509Subject::builder()
                    .organizations(vec!["A".to_string(), "B".to_string()])
                    .build(),
            )
            .build();
        let name = structured_subject(&spec).unwrap();
        assert_eq!(name.0.len(), 1);
        assert_eq!(name.0[0].0.len(), 2);
    }

    #[test]
    fn string_types() {
        let spec = CertificateSpec::builder().common_name("caf\u{e9}").build();
        let name = structured_subject(&spec).unwrap();
        assert_eq!(name.0[0].0.get(0).unwrap().value.tag(), Tag::Utf8String);

        let spec = CertificateSpec::builder().common_name("plain name").build();
        let name = structured_subject(&spec).unwrap();
        assert_eq!(name.0[0].0.get(0).unwrap().value.tag(), Tag::PrintableString);
    }

    #[test]
    fn empty_subject() {
        let spec = CertificateSpec::default();
        assert!(is_subject_empty(&structured_subject(&spec).unwrap()));
    }

    #[test]
    fn literal_subject_is_reversed() {
        let name = literal_subject("CN=foo,O=Example,C=GB").unwrap();
        assert_eq!(
            oids(&name),
            vec![oid::COUNTRY_NAME, oid::ORGANIZATION_NAME, oid::COMMON_NAME]
        );
        assert_eq!(common_name(&name).as_deref(), Some("foo"));
    }

    #[test]
    fn literal_and_structured_subjects_encode_alike() {
        use der::Encode;

        let spec = CertificateSpec::builder()
            .common_name("example.com")
            .subject(
                X509Subject::builder()
                    .countries(vec!["US".to_string()])
                    .provinces(vec!["California".to_string()])
                    .localities(vec!["San Francisco".to_string()])
                    .street_addresses(vec!["1 Main Street".to_string()])
                    .postal_codes(vec!["94105".to_string()])
                    .organizations(vec!["Example Corp".to_string()])
                    .serial_number("42")
                    .build(),
            )
            .build();
        let structured = structured_subject(&spec).unwrap();
        let literal = literal_subject(
            "SERIALNUMBER=42,CN=example.com,O=Example Corp,POSTALCODE=94105,STREET=1 Main Street,L=San Francisco,ST=California,C=US",
        )
        .unwrap();
        for rdn in literal.0.iter() {
            assert_eq!(rdn.0.get(0).unwrap().value.tag(), Tag::PrintableString);
        }
        assert_eq!(literal.to_der().unwrap(), structured.to_der().unwrap());

        let name = literal_subject("CN=caf\u{e9}").unwrap();
        assert_eq!(name.0[0].0.get(0).unwrap().value.tag(), Tag::Utf8String);
        assert_eq!(common_name(&name).as_deref(), Some("caf\u{e9}"));
    }

    #[test]
    fn literal_subject_only_when_enabled() {
        let spec = CertificateSpec::builder()
            .common_name("structured")
            .literal_subject("CN=literal")
            .build();
        let name = subject_for_spec(&spec, false).unwrap();
        assert_eq!(common_name(&name).as_deref(), Some("structured"));
        let name = subject_for_spec(&spec, true).unwrap();
        assert_eq!(common_name(&name).as_deref(), Some("literal"));

        let spec = CertificateSpec::builder()
            .common_name("structured")
            .literal_subject("")
            .build();
        let name = subject_for_spec(&spec, true).unwrap();
        assert_eq!(common_name(&name).as_deref(), Some("structured"));
    }

    #[test]
    fn malformed_literal_subject() {
        assert!(matches!(
            literal_subject("this is not a DN"),
            Err(CsrKitError::InvalidSpec(_))
        ));
    }
}
