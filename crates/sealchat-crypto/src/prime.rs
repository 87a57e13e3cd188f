//! Number-theory primitives for the key engine.

use num_bigint::{BigInt, BigUint, RandBigInt};
use num_integer::Integer;
use num_traits::{One, Zero};
use rand::{CryptoRng, Rng};

use crate::error::CryptoError;

/// Deterministic trial-division primality test using a 6k±1 wheel.
pub fn is_prime(num: &BigUint) -> bool {
    if *num <= BigUint::one() {
        return false;
    }
    if *num <= BigUint::from(3u32) {
        return true;
    }
    if (num % 2u32).is_zero() || (num % 3u32).is_zero() {
        return false;
    }

    let mut i = BigUint::from(5u32);
    while &i * &i <= *num {
        if (num % &i).is_zero() || (num % (&i + 2u32)).is_zero() {
            return false;
        }
        i += 6u32;
    }
    true
}

/// Draw uniformly from `[1, range]` until a prime turns up.
///
/// Fails with [`CryptoError::ExhaustedAttempts`] after `max_tries` misses.
pub fn generate_prime<R>(range: &BigUint, max_tries: u32, rng: &mut R) -> Result<BigUint, CryptoError>
where
    R: Rng + CryptoRng + ?Sized,
{
    if range.is_zero() {
        return Err(CryptoError::ExhaustedAttempts {
            range: range.clone(),
            tries: 0,
        });
    }

    let low = BigUint::one();
    let high = range + 1u32;
    for _ in 0..max_tries {
        let candidate = rng.gen_biguint_range(&low, &high);
        if is_prime(&candidate) {
            return Ok(candidate);
        }
    }
    Err(CryptoError::ExhaustedAttempts {
        range: range.clone(),
        tries: max_tries,
    })
}

/// Greatest common divisor (Euclid). `gcd(a, 0) == a`.
pub fn gcd(a: &BigUint, b: &BigUint) -> BigUint {
    let mut a = a.clone();
    let mut b = b.clone();
    while !b.is_zero() {
        let r = &a % &b;
        a = std::mem::replace(&mut b, r);
    }
    a
}

/// Inverse of `a` modulo `m` via the extended Euclidean algorithm,
/// normalized to `[0, m)`. `None` when `a` and `m` are not coprime.
pub fn mod_inverse(a: &BigUint, m: &BigUint) -> Option<BigUint> {
    if m.is_zero() {
        return None;
    }

    let modulus = BigInt::from(m.clone());
    let (mut old_r, mut r) = (BigInt::from(a.clone()), modulus.clone());
    let (mut old_s, mut s) = (BigInt::one(), BigInt::zero());

    while !r.is_zero() {
        let q = &old_r / &r;
        let next_r = &old_r - &q * &r;
        old_r = std::mem::replace(&mut r, next_r);
        let next_s = &old_s - &q * &s;
        old_s = std::mem::replace(&mut s, next_s);
    }

    if !old_r.is_one() {
        return None;
    }
    old_s.mod_floor(&modulus).to_biguint()
}
