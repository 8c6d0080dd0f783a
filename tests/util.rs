use csrkit::cert::Certificate;
use csrkit::cert::params::CertificateSpec;
use csrkit::issuer::sign_certificate;
use csrkit::key::{KeyPair, Signer};
use csrkit::tbs_certificate::CertificateTemplate;

pub struct CertificateWithPrivateKey {
    pub cert: Certificate,
    pub key: KeyPair,
}

pub fn generate_ca_cert() -> CertificateWithPrivateKey {
    let ca_key = KeyPair::generate_ecdsa_p256();

    let spec = CertificateSpec::builder()
        .common_name("myca.local")
        .is_ca(true)
        .build();
    let template = CertificateTemplate::from_spec(&spec, ca_key.public_key()).unwrap();
    let (_, cert) = sign_certificate(&template, &template, &ca_key.public_key(), &ca_key).unwrap();

    CertificateWithPrivateKey { cert, key: ca_key }
}

pub fn generate_intermediate_cert(root: &CertificateWithPrivateKey) -> CertificateWithPrivateKey {
    let key = KeyPair::generate_ecdsa_p256();

    let spec = CertificateSpec::builder()
        .common_name("intermediate.myca.local")
        .is_ca(true)
        .build();
    let template = CertificateTemplate::from_spec(&spec, key.public_key()).unwrap();
    let (_, cert) = sign_certificate(&template, &root.cert, &key.public_key(), &root.key).unwrap();

    CertificateWithPrivateKey { cert, key }
}

pub fn server_spec(common_name: &str) -> CertificateSpec {
    CertificateSpec::builder()
        .common_name(common_name)
        .dns_names(vec![common_name.to_string()])
        .usages(vec![
            "digital signature".to_string(),
            "key encipherment".to_string(),
            "server auth".to_string(),
        ])
        .build()
}
