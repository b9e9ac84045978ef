//! Short random tokens that avoid a set of tokens already in use.
//!
//! Tokens identify listener and subscriber registrations. Generation draws
//! from `[0-9a-z]` and retries until the result is not taken. There is no
//! retry cap: with a tiny length and a nearly exhausted token space the
//! loop can spin for a long time, so keep the length at its default unless
//! registrations are few.

use rand::Rng;
use std::collections::{BTreeSet, HashMap, HashSet};

pub const DEFAULT_TOKEN_LENGTH: usize = 8;

const ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Something that can tell whether a token is already taken.
pub trait TokenPool {
    fn holds(&self, token: &str) -> bool;
}

impl TokenPool for HashSet<String> {
    fn holds(&self, token: &str) -> bool {
        self.contains(token)
    }
}

impl TokenPool for BTreeSet<String> {
    fn holds(&self, token: &str) -> bool {
        self.contains(token)
    }
}

impl<V> TokenPool for HashMap<String, V> {
    fn holds(&self, token: &str) -> bool {
        self.contains_key(token)
    }
}

impl TokenPool for [String] {
    fn holds(&self, token: &str) -> bool {
        self.iter().any(|t| t == token)
    }
}

impl TokenPool for Vec<String> {
    fn holds(&self, token: &str) -> bool {
        self.as_slice().holds(token)
    }
}

/// A token of [`DEFAULT_TOKEN_LENGTH`] not held by `excluded`.
pub fn unique_token<P: TokenPool + ?Sized>(excluded: &P) -> String {
    unique_token_with(excluded, DEFAULT_TOKEN_LENGTH, &mut rand::rng())
}

/// A token of `length` characters (at least one) not held by `excluded`,
/// drawn from `rng`.
pub fn unique_token_with<P, R>(excluded: &P, length: usize, rng: &mut R) -> String
where
    P: TokenPool + ?Sized,
    R: Rng,
{
    let length = length.max(1);
    loop {
        let token: String = (0..length)
            .map(|_| ALPHABET[rng.random_range(0..ALPHABET.len())] as char)
            .collect();
        if !excluded.holds(&token) {
            return token;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_default_shape() {
        let token = unique_token(&HashSet::new());
        assert_eq!(token.len(), DEFAULT_TOKEN_LENGTH);
        assert!(token.bytes().all(|b| ALPHABET.contains(&b)));
    }

    #[test]
    fn test_avoids_excluded_tokens() {
        // Every one-character token except "z" is taken.
        let taken: Vec<String> = ALPHABET[..35].iter().map(|b| (*b as char).to_string()).collect();
        let mut rng = StdRng::seed_from_u64(7);

        for _ in 0..20 {
            assert_eq!(unique_token_with(&taken, 1, &mut rng), "z");
        }
    }

    #[test]
    fn test_zero_length_is_clamped() {
        let token = unique_token_with(&HashSet::new(), 0, &mut rand::rng());
        assert_eq!(token.len(), 1);
    }

    #[test]
    fn test_many_tokens_stay_unique() {
        let mut issued = HashSet::new();
        for _ in 0..2_000 {
            let token = unique_token(&issued);
            assert!(issued.insert(token));
        }
    }

    #[test]
    fn test_seeded_rng_is_reproducible() {
        let a = unique_token_with(&BTreeSet::new(), 12, &mut StdRng::seed_from_u64(42));
        let b = unique_token_with(&BTreeSet::new(), 12, &mut StdRng::seed_from_u64(42));
        assert_eq!(a, b);
    }
}
