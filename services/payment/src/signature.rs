use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Lowercase hex HMAC-SHA256 of `order_id|payment_id`, keyed by the gateway secret.
pub fn expected_signature(secret: &str, order_id: &str, payment_id: &str) -> Option<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(order_id.as_bytes());
    mac.update(b"|");
    mac.update(payment_id.as_bytes());
    Some(hex::encode(mac.finalize().into_bytes()))
}

/// Compares the submitted signature with the expected one byte for byte in
/// constant time. Case differences count as mismatches.
pub fn verify_signature(secret: &str, order_id: &str, payment_id: &str, signature: &str) -> bool {
    let Some(expected) = expected_signature(secret, order_id, payment_id) else {
        return false;
    };
    if expected.len() != signature.len() {
        return false;
    }
    expected.as_bytes().ct_eq(signature.as_bytes()).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "rzp_test_secret";

    #[test]
    fn test_signature_matches_reference_hmac() {
        let mut mac = HmacSha256::new_from_slice(SECRET.as_bytes()).unwrap();
        mac.update(b"order_1|pay_1");
        let reference = hex::encode(mac.finalize().into_bytes());

        assert_eq!(expected_signature(SECRET, "order_1", "pay_1"), Some(reference.clone()));
        assert_eq!(reference.len(), 64);
        assert!(verify_signature(SECRET, "order_1", "pay_1", &reference));
    }

    #[test]
    fn test_every_single_character_mutation_is_rejected() {
        let signature = expected_signature(SECRET, "order_1", "pay_1").unwrap();

        for (index, original) in signature.char_indices() {
            for replacement in "0123456789abcdefABCDEF".chars() {
                if replacement == original {
                    continue;
                }
                let mut mutated = signature.clone();
                mutated.replace_range(index..index + 1, &replacement.to_string());
                assert!(
                    !verify_signature(SECRET, "order_1", "pay_1", &mutated),
                    "mutation at {} to {} accepted",
                    index,
                    replacement
                );
            }
        }
    }

    #[test]
    fn test_signature_is_bound_to_ids_and_secret() {
        let signature = expected_signature(SECRET, "order_1", "pay_1").unwrap();

        assert!(!verify_signature(SECRET, "order_2", "pay_1", &signature));
        assert!(!verify_signature(SECRET, "order_1", "pay_2", &signature));
        assert!(!verify_signature("other_secret", "order_1", "pay_1", &signature));
        assert!(!verify_signature(SECRET, "order_1", "pay_1", &signature[..63]));
        assert!(!verify_signature(SECRET, "order_1", "pay_1", ""));
    }
}
