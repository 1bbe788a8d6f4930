//! Certificate key, CSR and certificate helpers

use chrono::{DateTime, Utc};
use rcgen::{
    CertificateParams, KeyPair, RsaKeySize, PKCS_ECDSA_P256_SHA256, PKCS_ECDSA_P384_SHA384,
    PKCS_RSA_SHA256,
};
use tracing::debug;

use crate::error::AcmeError;
use crate::KeyType;

/// Generate a certificate private key
///
/// The returned key pair serializes to PKCS#8 PEM with
/// [`KeyPair::serialize_pem`].
pub fn generate_private_key(key_type: KeyType) -> Result<KeyPair, AcmeError> {
    debug!(key_type = %key_type, "Generating certificate key");

    let key = match key_type {
        KeyType::Ec256 => KeyPair::generate_for(&PKCS_ECDSA_P256_SHA256),
        KeyType::Ec384 => KeyPair::generate_for(&PKCS_ECDSA_P384_SHA384),
        KeyType::Rsa2048 => KeyPair::generate_rsa_for(&PKCS_RSA_SHA256, RsaKeySize::_2048),
        KeyType::Rsa3072 => KeyPair::generate_rsa_for(&PKCS_RSA_SHA256, RsaKeySize::_3072),
        KeyType::Rsa4096 => KeyPair::generate_rsa_for(&PKCS_RSA_SHA256, RsaKeySize::_4096),
    };

    key.map_err(|e| AcmeError::KeyGeneration(format!("Failed to generate {} key: {}", key_type, e)))
}

/// Create a DER-encoded CSR listing every domain as a subject alternative name
pub fn create_csr(key: &KeyPair, domains: &[String]) -> Result<Vec<u8>, AcmeError> {
    let params = CertificateParams::new(domains.to_vec())
        .map_err(|e| AcmeError::KeyGeneration(format!("Failed to create CSR params: {}", e)))?;

    let csr = params
        .serialize_request(key)
        .map_err(|e| AcmeError::KeyGeneration(format!("Failed to serialize CSR: {}", e)))?;

    Ok(csr.der().to_vec())
}

/// Parse the expiry date of the first certificate of a PEM chain
pub fn parse_certificate_expiry(cert_pem: &str) -> Result<DateTime<Utc>, AcmeError> {
    use x509_parser::prelude::*;

    let (_, pem) = pem::parse_x509_pem(cert_pem.as_bytes())
        .map_err(|e| AcmeError::CertificateParse(format!("Failed to parse PEM: {}", e)))?;

    let (_, cert) = X509Certificate::from_der(&pem.contents)
        .map_err(|e| AcmeError::CertificateParse(format!("Failed to parse certificate: {}", e)))?;

    let timestamp = cert.validity().not_after.timestamp();

    DateTime::from_timestamp(timestamp, 0)
        .ok_or_else(|| AcmeError::CertificateParse("Invalid expiry timestamp".to_string()))
}
