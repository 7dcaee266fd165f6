//! Room PIN generation: 6 uniform characters from `[A-Z0-9]`, retried on collision.

use rand::Rng;

use super::types::Pin;

const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const PIN_LEN: usize = 6;
const MAX_ATTEMPTS: usize = 200;

fn random_pin() -> Pin {
    let mut rng = rand::rng();
    let s: String = (0..PIN_LEN)
        .map(|_| {
            let idx = rng.random_range(0..ALPHABET.len());
            ALPHABET[idx] as char
        })
        .collect();
    Pin::normalize(&s)
}

/// Draws PINs until `taken` reports one free, retrying up to [`MAX_ATTEMPTS`] times.
pub fn allocate(taken: impl Fn(&Pin) -> bool) -> Option<Pin> {
    for _ in 0..MAX_ATTEMPTS {
        let candidate = random_pin();
        if !taken(&candidate) {
            return Some(candidate);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn generates_correct_shape() {
        let pin = random_pin();
        assert_eq!(pin.as_str().len(), PIN_LEN);
        assert!(pin.as_str().chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
    }

    #[test]
    fn retries_past_collisions_then_succeeds() {
        let mut seen: HashSet<Pin> = HashSet::new();
        let mut calls = 0usize;
        let result = allocate(|pin| {
            calls += 1;
            if calls < 5 {
                true
            } else {
                seen.insert(pin.clone());
                false
            }
        });
        assert!(result.is_some());
        assert!(calls >= 5);
    }

    #[test]
    fn gives_up_after_max_attempts_when_everything_collides() {
        let result = allocate(|_| true);
        assert!(result.is_none());
    }
}
