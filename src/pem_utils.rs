use crate::error::{CsrKitError, Result};

/// PEM label of an X.509 certificate.
pub const CERTIFICATE_LABEL: &str = "CERTIFICATE";
/// PEM label of a PKCS#10 certificate signing request.
pub const CERTIFICATE_REQUEST_LABEL: &str = "CERTIFICATE REQUEST";

/// Convert DER‑encoded data into a PEM‑encoded string with the provided label.
///
/// Lines end with `\n` regardless of platform.
pub fn der_to_pem(der: &[u8], label: &str) -> String {
    let pem = pem::Pem::new(label, der);
    pem::encode_config(&pem, pem::EncodeConfig::new().set_line_ending(pem::LineEnding::LF))
}

/// Convert a single PEM block to DER‑encoded bytes, checking its label.
pub fn pem_to_der(pem_str: &str, label: &str) -> Result<Vec<u8>> {
    let pem = pem::parse(pem_str)?;
    check_label(&pem, label)?;
    Ok(pem.into_contents())
}

/// Decode every PEM block in `pem_str`, in order. All blocks must carry `label`.
pub fn pem_blocks_to_der(pem_str: &str, label: &str) -> Result<Vec<Vec<u8>>> {
    pem::parse_many(pem_str)?
        .into_iter()
        .map(|pem| {
            check_label(&pem, label)?;
            Ok(pem.into_contents())
        })
        .collect()
}

fn check_label(pem: &pem::Pem, label: &str) -> Result<()> {
    if pem.tag() != label {
        return Err(CsrKitError::DecodingError(format!(
            "unexpected PEM block {:?}, expected {label:?}",
            pem.tag()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pem_uses_lf_line_endings() {
        let encoded = der_to_pem(&[0x30, 0x00], CERTIFICATE_LABEL);
        assert_eq!(encoded, "-----BEGIN CERTIFICATE-----\nMAA=\n-----END CERTIFICATE-----\n");
        assert!(!encoded.contains('\r'));
    }

    #[test]
    fn label_is_checked() {
        let encoded = der_to_pem(&[0x30, 0x00], CERTIFICATE_REQUEST_LABEL);
        assert_eq!(
            pem_to_der(&encoded, CERTIFICATE_REQUEST_LABEL).unwrap(),
            vec![0x30, 0x00]
        );
        assert!(matches!(
            pem_to_der(&encoded, CERTIFICATE_LABEL),
            Err(CsrKitError::DecodingError(_))
        ));
    }

    #[test]
    fn multiple_blocks_keep_their_order() {
        let bundle = format!(
            "{}{}",
            der_to_pem(&[0x30, 0x00], CERTIFICATE_LABEL),
            der_to_pem(&[0x05, 0x00], CERTIFICATE_LABEL)
        );
        let blocks = pem_blocks_to_der(&bundle, CERTIFICATE_LABEL).unwrap();
        assert_eq!(blocks, vec![vec![0x30, 0x00], vec![0x05, 0x00]]);
    }
}
