use botan::Certificate as BotanCertificate;

use csrkit::cert::params::{CertificateSpec, X509Subject};
use csrkit::issuer::sign_certificate;
use csrkit::key::{KeyPair, Signer};
use csrkit::tbs_certificate::CertificateTemplate;

fn default_spec() -> CertificateSpec {
    CertificateSpec::builder()
        .common_name("crabs.crabs")
        .subject(
            X509Subject::builder()
                .organizations(vec!["Crab widgits SE".to_string()])
                .build(),
        )
        .dns_names(vec!["crabs.crabs".to_string()])
        .is_ca(true)
        .build()
}

fn self_signed_der(key_pair: &KeyPair) -> Vec<u8> {
    let template = CertificateTemplate::from_spec(&default_spec(), key_pair.public_key()).unwrap();
    let (_, cert) = sign_certificate(&template, &template, &key_pair.public_key(), key_pair).unwrap();
    cert.as_der().to_vec()
}

fn check_cert(cert_der: &[u8]) {
    // Use botan crate to parse the DER and assert it succeeds
    BotanCertificate::load(cert_der).expect("Botan failed to parse certificate");
}

#[test]
#[ignore]
fn test_botan_ecdsa_p256() {
    check_cert(&self_signed_der(&KeyPair::generate_ecdsa_p256()));
}

#[test]
#[ignore]
fn test_botan_ed25519() {
    check_cert(&self_signed_der(&KeyPair::generate_ed25519()));
}

#[test]
#[ignore]
fn test_botan_ecdsa_p384() {
    check_cert(&self_signed_der(&KeyPair::generate_ecdsa_p384()));
}

#[test]
#[ignore]
fn test_botan_ecdsa_p521() {
    check_cert(&self_signed_der(&KeyPair::generate_ecdsa_p521()));
}

#[test]
#[ignore]
fn test_botan_rsa() {
    check_cert(&self_signed_der(&KeyPair::generate_rsa(2048).unwrap()));
}
