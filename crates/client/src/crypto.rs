use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use rsa::pkcs8::DecodePublicKey;
use rsa::{Pkcs1v15Encrypt, RsaPublicKey};

use crate::error::{ClientError, Result};

/// Public half of the server's login keypair. The server decrypts with the
/// matching private key, so this value has to stay in lockstep with the
/// deployment; `KBCTL_PUBLIC_KEY` points at a PEM file to override it.
const DEFAULT_PUBLIC_KEY_PEM: &str = "-----BEGIN PUBLIC KEY-----
MIIBIjANBgkqhkiG9w0BAQEFAAOCAQ8AMIIBCgKCAQEArq9XTUSeYr2+N1h3Afl/
z8Dse/2yD0ZGrKwx+EEEcdsBLca9Ynmx3nIB5obmLlSfmskLpBo0UACBmB5rEjBp
2Q2f3AG3Hjd4B+gNCG6BDaawuDlgANIhGnaTLrIqWrrcm4EMzJOnAOI1fgzJRsOO
UEfaS318Eq9OVO3apEyCCt0lOQK6PuksduOjVxtltDav+guVAA068NrPYmRNabVK
RNLJpL8w4D44sfth5RvZ3q9t+6RTArpEtc5sh5ChzvqPOzKGMXW83C95TxmXqpbK
6olN4RevSfVjEAgCydH6HN6OhtOQEcnrU97r9H0iZOWwbw3pVrZiUkuRD1R56Wzs
2wIDAQAB
-----END PUBLIC KEY-----";

pub const PUBLIC_KEY_ENV: &str = "KBCTL_PUBLIC_KEY";

fn load_public_key() -> Result<RsaPublicKey> {
    let pem = match std::env::var(PUBLIC_KEY_ENV) {
        Ok(path) => std::fs::read_to_string(&path)
            .map_err(|e| ClientError::Key(format!("cannot read {path}: {e}")))?,
        Err(_) => DEFAULT_PUBLIC_KEY_PEM.to_owned(),
    };
    RsaPublicKey::from_public_key_pem(&pem)
        .map_err(|e| ClientError::Key(format!("malformed public key: {e}")))
}

/// Encodes a plaintext password the way the server expects it:
/// base64 of the UTF-8 text, RSA/PKCS1v1.5 over that base64 text, then
/// base64 of the ciphertext.
pub fn encrypt_password(plain: &str) -> Result<String> {
    let key = load_public_key()?;
    let staged = BASE64.encode(plain.as_bytes());
    let mut rng = rand::thread_rng();
    let ciphertext = key
        .encrypt(&mut rng, Pkcs1v15Encrypt, staged.as_bytes())
        .map_err(|e| ClientError::Key(format!("encryption failed: {e}")))?;
    Ok(BASE64.encode(ciphertext))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_key_parses() {
        assert!(load_public_key().is_ok());
    }

    #[test]
    fn ciphertext_is_base64_and_key_sized() {
        let out = encrypt_password("secret").unwrap();
        let raw = BASE64.decode(out.as_bytes()).unwrap();
        // 2048-bit modulus
        assert_eq!(raw.len(), 256);
    }

    #[test]
    fn encryption_is_randomized() {
        let a = encrypt_password("secret").unwrap();
        let b = encrypt_password("secret").unwrap();
        assert_ne!(a, b);
    }
}
