//! Time-based one-time passwords (RFC 6238, HMAC-SHA1).

use crate::error::{JumplineError, Result};
use crate::secrets::OtpOptions;
use data_encoding::BASE32_NOPAD;
use hmac::{Hmac, Mac};
use sha1::Sha1;
use std::time::{SystemTime, UNIX_EPOCH};

type HmacSha1 = Hmac<Sha1>;

/// Decode a base32 secret, tolerating lowercase, spaces and `=` padding.
pub fn decode_secret(secret: &str) -> Result<Vec<u8>> {
    let normalized: String = secret
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '=')
        .map(|c| c.to_ascii_uppercase())
        .collect();
    BASE32_NOPAD
        .decode(normalized.as_bytes())
        .map_err(|e| JumplineError::Otp(format!("invalid base32 secret: {}", e)))
}

/// Compute the code for `key` at `unix_time`.
pub fn totp(key: &[u8], digits: u32, time_step: u64, unix_time: u64) -> Result<String> {
    if time_step == 0 {
        return Err(JumplineError::Otp("TIME_STEP must be positive".into()));
    }
    if !(1..=9).contains(&digits) {
        return Err(JumplineError::Otp(format!("LENGTH {} is out of range", digits)));
    }

    let counter = unix_time / time_step;
    let mut mac = HmacSha1::new_from_slice(key).map_err(|e| JumplineError::Otp(e.to_string()))?;
    mac.update(&counter.to_be_bytes());
    let digest = mac.finalize().into_bytes();

    let offset = usize::from(digest[digest.len() - 1] & 0x0f);
    let binary = u32::from_be_bytes([
        digest[offset] & 0x7f,
        digest[offset + 1],
        digest[offset + 2],
        digest[offset + 3],
    ]);
    let code = binary % 10u32.pow(digits);
    Ok(format!("{:0width$}", code, width = digits as usize))
}

/// Code for the current time.
pub fn generate(options: &OtpOptions) -> Result<String> {
    let key = decode_secret(&options.secret)?;
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| JumplineError::Otp(e.to_string()))?
        .as_secs();
    totp(&key, options.length, options.time_step, now)
}

#[cfg(test)]
mod tests {
    use super::*;

    // RFC 6238 appendix B, SHA-1 seed "12345678901234567890".
    const SEED: &[u8] = b"12345678901234567890";
    const SEED_B32: &str = "GEZDGNBVGY3TQOJQGEZDGNBVGY3TQOJQ";

    #[test]
    fn test_rfc6238_vectors() {
        assert_eq!(totp(SEED, 8, 30, 59).unwrap(), "94287082");
        assert_eq!(totp(SEED, 8, 30, 1111111109).unwrap(), "07081804");
        assert_eq!(totp(SEED, 8, 30, 1234567890).unwrap(), "89005924");
        assert_eq!(totp(SEED, 8, 30, 20000000000).unwrap(), "65353130");
    }

    #[test]
    fn test_six_digits_keep_leading_zeros() {
        assert_eq!(totp(SEED, 6, 30, 1111111109).unwrap(), "081804");
    }

    #[test]
    fn test_decode_secret_variants() {
        assert_eq!(decode_secret(SEED_B32).unwrap(), SEED);
        assert_eq!(decode_secret("gezd gnbv gy3t qojq gezd gnbv gy3t qojq").unwrap(), SEED);
        assert_eq!(decode_secret("GEZDGNBV======").unwrap(), b"12345");
        assert!(decode_secret("not base32!").is_err());
    }

    #[test]
    fn test_invalid_parameters() {
        assert!(totp(SEED, 6, 0, 59).is_err());
        assert!(totp(SEED, 12, 30, 59).is_err());
    }

    #[test]
    fn test_generate_has_requested_length() {
        let options = OtpOptions {
            secret: SEED_B32.into(),
            length: 6,
            time_step: 30,
        };
        let code = generate(&options).unwrap();
        assert_eq!(code.len(), 6);
        assert!(code.chars().all(|c| c.is_ascii_digit()));
    }
}
