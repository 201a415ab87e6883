use bcrypt::{hash, verify};
use chrono::{DateTime, Duration, Utc};
use rand::Rng;

use tutorhub_common::AppError;

const OTP_HASH_COST: u32 = 8;

/// A freshly issued one-time password. Only the hash is persisted.
#[derive(Debug, Clone)]
pub struct IssuedOtp {
    pub code: String,
    pub hash: String,
    pub expires_at: DateTime<Utc>,
}

pub struct OtpService;

impl OtpService {
    pub fn issue(ttl_minutes: i64) -> Result<IssuedOtp, AppError> {
        let code = format!("{:06}", rand::thread_rng().gen_range(0..1_000_000));
        let hash = hash(&code, OTP_HASH_COST)
            .map_err(|e| AppError::Internal(format!("Failed to hash OTP: {}", e)))?;

        Ok(IssuedOtp {
            code,
            hash,
            expires_at: Utc::now() + Duration::minutes(ttl_minutes),
        })
    }

    /// Checks a submitted code against the stored hash and expiry.
    pub fn verify(
        code: &str,
        stored_hash: Option<&str>,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<(), AppError> {
        let (Some(stored_hash), Some(expires_at)) = (stored_hash, expires_at) else {
            return Err(AppError::Authentication("No OTP has been requested".to_string()));
        };

        if Utc::now() > expires_at {
            return Err(AppError::Authentication("OTP has expired".to_string()));
        }

        let matches = verify(code.trim(), stored_hash)
            .map_err(|e| AppError::Internal(format!("Failed to verify OTP: {}", e)))?;
        if !matches {
            return Err(AppError::Authentication("Invalid OTP".to_string()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issued_otp_verifies_until_expiry() {
        let otp = OtpService::issue(10).unwrap();
        assert_eq!(otp.code.len(), 6);
        assert!(otp.code.chars().all(|c| c.is_ascii_digit()));

        OtpService::verify(&otp.code, Some(&otp.hash), Some(otp.expires_at)).unwrap();

        let wrong = if otp.code == "000000" { "111111" } else { "000000" };
        let err = OtpService::verify(wrong, Some(&otp.hash), Some(otp.expires_at)).unwrap_err();
        assert!(matches!(err, AppError::Authentication(_)));

        let expired = Utc::now() - Duration::minutes(1);
        let err = OtpService::verify(&otp.code, Some(&otp.hash), Some(expired)).unwrap_err();
        assert!(matches!(err, AppError::Authentication(msg) if msg.contains("expired")));
    }

    #[test]
    fn test_missing_otp_rejected() {
        let err = OtpService::verify("123456", None, None).unwrap_err();
        assert!(matches!(err, AppError::Authentication(_)));
    }
}
