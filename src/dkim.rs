//! DKIM key material for newly registered domains.
//!
//! A fresh RSA key pair is generated per domain. The private half is kept
//! in PKCS#1 PEM form for the signer; the public half is published as
//! `v=DKIM1; k=rsa; p=<base64 SubjectPublicKeyInfo>` under
//! `<selector>._domainkey.<host>`.

use crate::config::MIN_DKIM_KEY_BITS;
use crate::error::KeyError;
use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use rsa::RsaPrivateKey;
use rsa::pkcs1::{EncodeRsaPrivateKey, LineEnding};
use rsa::pkcs8::EncodePublicKey;
use tracing::debug;

/// Output of [`KeyGenerator::generate`].
#[derive(Debug, Clone)]
pub struct DkimKeyPair {
    /// PKCS#1 PEM encoded private key
    pub private_key_pem: String,
    /// TXT record value publishing the public key
    pub record_value: String,
}

/// Source of fresh DKIM key material, called on a blocking thread.
pub trait DkimKeySource: Send + Sync + 'static {
    fn generate(&self) -> Result<DkimKeyPair, KeyError>;
}

#[derive(Debug, Clone, Copy)]
pub struct KeyGenerator {
    bits: usize,
}

impl KeyGenerator {
    pub fn new(bits: usize) -> Result<Self, KeyError> {
        if bits < MIN_DKIM_KEY_BITS {
            return Err(KeyError::TooShort(bits));
        }
        Ok(Self { bits })
    }

    pub fn bits(&self) -> usize {
        self.bits
    }
}

impl DkimKeySource for KeyGenerator {
    /// Generates an RSA key pair and the matching DKIM record value.
    ///
    /// This is CPU bound; async callers should run it on a blocking thread.
    fn generate(&self) -> Result<DkimKeyPair, KeyError> {
        let mut rng = rand::thread_rng();
        let private_key = RsaPrivateKey::new(&mut rng, self.bits)?;

        let public_der = private_key
            .to_public_key()
            .to_public_key_der()
            .map_err(|e| KeyError::Encoding(e.to_string()))?;

        let private_key_pem = private_key
            .to_pkcs1_pem(LineEnding::LF)
            .map_err(|e| KeyError::Encoding(e.to_string()))?
            .to_string();

        debug!(bits = self.bits, "generated DKIM key pair");

        Ok(DkimKeyPair {
            private_key_pem,
            record_value: dkim_record(public_der.as_bytes()),
        })
    }
}

fn dkim_record(public_key_der: &[u8]) -> String {
    format!("v=DKIM1; k=rsa; p={}", BASE64.encode(public_key_der))
}
