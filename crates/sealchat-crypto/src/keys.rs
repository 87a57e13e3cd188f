//! Key pair generation for the textbook RSA engine.
//!
//! A key pair is generated once per chat session, held only by that
//! session, and dropped with it. The private half never leaves the process.

use num_bigint::BigUint;
use num_traits::One;
use rand::rngs::OsRng;
use rand::{CryptoRng, Rng};
use tracing::debug;

use sealchat_core::config::CryptoConfig;
use sealchat_core::protocol::KeyMaterial;

use crate::error::CryptoError;
use crate::prime::{gcd, generate_prime, mod_inverse};

/// Public exponent and modulus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicKey {
    pub e: BigUint,
    pub n: BigUint,
}

/// Private exponent and modulus.
#[derive(Clone, PartialEq, Eq)]
pub struct PrivateKey {
    pub d: BigUint,
    pub n: BigUint,
}

impl std::fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrivateKey")
            .field("d", &"[REDACTED]")
            .field("n", &self.n)
            .finish()
    }
}

/// A matched public/private key pair.
#[derive(Debug, Clone)]
pub struct KeyPair {
    pub public: PublicKey,
    private: PrivateKey,
}

/// Why a generation round produced no usable key.
#[derive(Debug)]
enum Degenerate {
    PrimeSearch,
    SamePrimes,
    NoExponent,
    NoInverse,
    SmallModulus,
}

impl KeyPair {
    /// Generate a key pair using the OS random source.
    pub fn generate(config: &CryptoConfig) -> Result<Self, CryptoError> {
        Self::generate_with_rng(config, &mut OsRng)
    }

    /// Generate a key pair, widening the prime range after each degenerate
    /// round until `config.max_rounds` is spent.
    pub fn generate_with_rng<R>(config: &CryptoConfig, rng: &mut R) -> Result<Self, CryptoError>
    where
        R: Rng + CryptoRng + ?Sized,
    {
        let mut range = BigUint::from(config.prime_range);
        for round in 1..=config.max_rounds {
            match Self::try_round(&range, config, rng) {
                Ok(pair) => {
                    debug!(
                        round,
                        range = %range,
                        modulus_bits = pair.public.n.bits(),
                        "Key pair generated"
                    );
                    return Ok(pair);
                }
                Err(reason) => {
                    debug!(round, range = %range, ?reason, "Degenerate key round, widening range");
                    range += config.range_step;
                }
            }
        }
        Err(CryptoError::KeyGenerationFailed {
            rounds: config.max_rounds,
            last_range: range,
        })
    }

    fn try_round<R>(range: &BigUint, config: &CryptoConfig, rng: &mut R) -> Result<Self, Degenerate>
    where
        R: Rng + CryptoRng + ?Sized,
    {
        let draw = |rng: &mut R| {
            generate_prime(range, config.max_prime_tries, rng).map_err(|_| Degenerate::PrimeSearch)
        };

        let p = draw(&mut *rng)?;
        let mut q = draw(&mut *rng)?;
        let mut redraws = 0;
        while q == p {
            if redraws == config.max_prime_tries {
                return Err(Degenerate::SamePrimes);
            }
            q = draw(&mut *rng)?;
            redraws += 1;
        }

        let n = &p * &q;
        if n < BigUint::from(config.min_modulus) {
            return Err(Degenerate::SmallModulus);
        }
        let phi = (&p - 1u32) * (&q - 1u32);

        let mut e = BigUint::from(2u32);
        while e < phi && !gcd(&e, &phi).is_one() {
            e += 1u32;
        }
        if e >= phi {
            return Err(Degenerate::NoExponent);
        }

        let d = mod_inverse(&e, &phi).ok_or(Degenerate::NoInverse)?;

        Ok(Self {
            public: PublicKey { e, n: n.clone() },
            private: PrivateKey { d, n },
        })
    }

    pub const fn public_key(&self) -> &PublicKey {
        &self.public
    }

    pub const fn private_key(&self) -> &PrivateKey {
        &self.private
    }
}

/// Generate a key pair from `[1, prime_range]` with default retry settings.
pub fn generate_key_pair(prime_range: u64) -> Result<KeyPair, CryptoError> {
    KeyPair::generate(&CryptoConfig {
        prime_range,
        ..CryptoConfig::default()
    })
}

impl PublicKey {
    /// Wire form: decimal strings.
    pub fn to_material(&self) -> KeyMaterial {
        KeyMaterial {
            e: self.e.to_str_radix(10),
            n: self.n.to_str_radix(10),
        }
    }

    /// Short SHA-256 fingerprint for comparing keys out of band.
    pub fn fingerprint(&self) -> String {
        use sha2::{Digest, Sha256};
        let hash = Sha256::digest(format!("{}:{}", self.e, self.n).as_bytes());
        hash[..8]
            .chunks(2)
            .map(hex::encode)
            .collect::<Vec<_>>()
            .join(":")
    }
}

impl TryFrom<&KeyMaterial> for PublicKey {
    type Error = CryptoError;

    fn try_from(material: &KeyMaterial) -> Result<Self, Self::Error> {
        let parse = |field: &str, value: &str| {
            value
                .parse::<BigUint>()
                .map_err(|e| CryptoError::KeyFormat(format!("{field} {value:?}: {e}")))
        };
        let e = parse("e", &material.e)?;
        let n = parse("n", &material.n)?;
        if n <= BigUint::one() {
            return Err(CryptoError::KeyFormat(format!("modulus {n} is too small")));
        }
        Ok(Self { e, n })
    }
}
