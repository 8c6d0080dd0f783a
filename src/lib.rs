//! # CsrKit - Certificate Requests and Issuance from Declarative Specs
//!
//! CsrKit turns a declarative certificate specification into signed X.509
//! artifacts: PKCS#10 certificate signing requests, certificates signed by a
//! CA key, and PEM chains ready to hand out. It is built entirely with
//! rustcrypto libraries (openssl and botan are only used in tests).
//!
//! ## Supported Key Types
//!
//! - **RSA**: 2048 bits and up, signed with SHA-256, SHA-384 or SHA-512 depending on the modulus size
//! - **ECDSA**: P-256, P-384, and P-521 curves
//! - **Ed25519**: Edwards curve digital signature algorithm
//!
//! ## Key Features
//!
//! - **Automatic algorithm selection**: the signature algorithm follows the key algorithm and size
//! - **Subject Alternative Names**: DNS names, email addresses, IP addresses, URIs and `otherName` values
//! - **Usages**: Key Usage and Extended Key Usage from names such as `"server auth"`,
//!   with every unknown name reported at once
//! - **Name Constraints** and **Basic Constraints** for CA certificates
//! - **Literal subjects**: RFC 4514 strings used verbatim instead of structured fields
//! - **Chains**: PEM encoding of chains without self-signed roots
//!
//! ## Quick Start
//!
//! ### Building and Signing a Request
//!
//! ```rust,no_run
//! use csrkit::{
//!     cert::params::{CertificateSpec, PrivateKeySpec},
//!     key::KeyPair,
//!     pem_utils::{CERTIFICATE_REQUEST_LABEL, der_to_pem},
//!     request::{CsrOptions, build_request, encode_csr},
//! };
//!
//! # fn main() -> Result<(), csrkit::error::CsrKitError> {
//! let spec = CertificateSpec::builder()
//!     .common_name("example.com")
//!     .dns_names(vec!["example.com".to_string(), "www.example.com".to_string()])
//!     .private_key(PrivateKeySpec {
//!         algorithm: Some("ECDSA".to_string()),
//!         size: 256,
//!     })
//!     .build();
//!
//! let template = build_request(&spec, &CsrOptions::default())?;
//! let key_pair = KeyPair::generate_ecdsa_p256();
//! let csr = encode_csr(template, &key_pair)?;
//!
//! println!("{}", der_to_pem(&csr, CERTIFICATE_REQUEST_LABEL));
//! # Ok(())
//! # }
//! ```
//!
//! ### Issuing a Certificate Chain
//!
//! ```rust,no_run
//! use csrkit::{
//!     cert::params::CertificateSpec,
//!     issuer::{sign_certificate, sign_csr_template},
//!     key::{KeyPair, Signer},
//!     tbs_certificate::CertificateTemplate,
//! };
//!
//! # fn main() -> Result<(), csrkit::error::CsrKitError> {
//! // A self-signed CA acts as its own issuer
//! let ca_key = KeyPair::generate_ecdsa_p256();
//! let ca_spec = CertificateSpec::builder()
//!     .common_name("Example CA")
//!     .is_ca(true)
//!     .build();
//! let ca_template = CertificateTemplate::from_spec(&ca_spec, ca_key.public_key())?;
//! let (_, ca_cert) = sign_certificate(&ca_template, &ca_template, &ca_key.public_key(), &ca_key)?;
//!
//! // Issue a server certificate and bundle it with the CA
//! let server_key = KeyPair::generate_ecdsa_p256();
//! let server_spec = CertificateSpec::builder()
//!     .common_name("server.example.com")
//!     .dns_names(vec!["server.example.com".to_string()])
//!     .usages(vec!["server auth".to_string(), "digital signature".to_string()])
//!     .build();
//! let server_template = CertificateTemplate::from_spec(&server_spec, server_key.public_key())?;
//! let bundle = sign_csr_template(&[ca_cert], &ca_key, &server_template)?;
//!
//! println!("CA:\n{}\nChain:\n{}", bundle.ca_pem, bundle.chain_pem);
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! Every operation either succeeds completely or returns a [`error::CsrKitError`];
//! no partial request, extension list or bundle is ever produced.
//!
//! ```rust
//! use csrkit::{cert::params::CertificateSpec, error::CsrKitError, request::{CsrOptions, build_request}};
//!
//! let spec = CertificateSpec::builder()
//!     .common_name("example.com")
//!     .usages(vec!["signing".to_string(), "bogus1".to_string(), "bogus2".to_string()])
//!     .build();
//!
//! match build_request(&spec, &CsrOptions::default()) {
//!     Err(CsrKitError::UnknownUsage(usages)) => assert_eq!(usages, ["bogus1", "bogus2"]),
//!     other => panic!("unexpected result: {other:?}"),
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`algorithm`]: Key and signature algorithm selection
//! - [`key`]: Key generation, signing and verification
//! - [`cert`]: Parsed certificates, extensions, subjects and PEM chains
//! - [`request`]: Certificate signing request construction
//! - [`tbs_certificate`]: Certificate templates built from specs or CSRs
//! - [`issuer`]: Certificate signing against an issuer
//! - [`pem_utils`]: PEM encoding helpers
//! - [`oid`]: Object identifiers
//! - [`error`]: Error types

pub mod algorithm;
pub mod cert;
pub mod error;
pub mod issuer;
pub mod key;
pub mod oid;
pub mod pem_utils;
pub mod request;
pub mod tbs_certificate;
