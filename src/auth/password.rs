use rand::seq::SliceRandom;
use rand::Rng;

pub fn hash_password(password: &str, cost: u32) -> Result<String, bcrypt::BcryptError> {
    bcrypt::hash(password, cost)
}

pub fn verify_password(password: &str, hash: &str) -> bool {
    bcrypt::verify(password, hash).unwrap_or(false)
}

const UPPER: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const LOWER: &[u8] = b"abcdefghijklmnopqrstuvwxyz";
const DIGITS: &[u8] = b"0123456789";
const SYMBOLS: &[u8] = b"!@#$%^&*";

/// Generate a one-time password with at least one character from each
/// category. Returned to the caller exactly once, never stored in plaintext.
pub fn generate_password(length: usize) -> String {
    let mut rng = rand::thread_rng();
    let all: Vec<u8> = [UPPER, LOWER, DIGITS, SYMBOLS].concat();

    let mut chars: Vec<u8> = vec![
        UPPER[rng.gen_range(0..UPPER.len())],
        LOWER[rng.gen_range(0..LOWER.len())],
        DIGITS[rng.gen_range(0..DIGITS.len())],
        SYMBOLS[rng.gen_range(0..SYMBOLS.len())],
    ];
    while chars.len() < length.max(4) {
        chars.push(all[rng.gen_range(0..all.len())]);
    }
    chars.shuffle(&mut rng);

    String::from_utf8(chars).expect("password alphabet is ASCII")
}

#[cfg(test)]
mod tests {
    use super::*;

    // Minimum legal bcrypt cost keeps the tests fast.
    const TEST_COST: u32 = 4;

    #[test]
    fn hash_and_verify_round_trip() {
        let hash = hash_password("demo123", TEST_COST).unwrap();
        assert!(verify_password("demo123", &hash));
        assert!(!verify_password("wrong", &hash));
    }

    #[test]
    fn verify_tolerates_garbage_hashes() {
        assert!(!verify_password("demo123", "not-a-bcrypt-hash"));
        assert!(!verify_password("demo123", ""));
    }

    #[test]
    fn generated_password_covers_all_categories() {
        let password = generate_password(12);
        assert_eq!(password.len(), 12);
        assert!(password.bytes().any(|b| UPPER.contains(&b)));
        assert!(password.bytes().any(|b| LOWER.contains(&b)));
        assert!(password.bytes().any(|b| DIGITS.contains(&b)));
        assert!(password.bytes().any(|b| SYMBOLS.contains(&b)));
    }

    #[test]
    fn generated_password_never_shorter_than_categories() {
        assert_eq!(generate_password(0).len(), 4);
    }
}
