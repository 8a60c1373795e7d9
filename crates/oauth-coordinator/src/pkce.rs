use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::distributions::{Distribution, Uniform};
use rand::thread_rng;
use sha2::{Digest, Sha256};

const VERIFIER_LEN: usize = 64;
const UNRESERVED: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-._~";

/// RFC 7636 `code_verifier`: 43-128 chars from the unreserved character set.
pub fn generate_verifier() -> String {
    let dist = Uniform::from(0..UNRESERVED.len());
    let mut rng = thread_rng();
    (0..VERIFIER_LEN).map(|_| UNRESERVED[dist.sample(&mut rng)] as char).collect()
}

/// S256 `code_challenge` derived from a verifier.
pub fn challenge_s256(verifier: &str) -> String {
    let digest = Sha256::digest(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(digest)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verifier_uses_only_unreserved_characters() {
        let verifier = generate_verifier();
        assert_eq!(verifier.len(), VERIFIER_LEN);
        assert!(verifier.bytes().all(|b| UNRESERVED.contains(&b)));
    }

    #[test]
    fn challenge_is_deterministic_and_url_safe() {
        let challenge_a = challenge_s256("fixed-verifier-value");
        let challenge_b = challenge_s256("fixed-verifier-value");
        assert_eq!(challenge_a, challenge_b);
        assert!(!challenge_a.contains('+'));
        assert!(!challenge_a.contains('/'));
        assert!(!challenge_a.contains('='));
    }
}
