use alloc::vec;

use crate::error::PrimeError;

/// Largest bucket count the table will ever allocate. It is itself prime, so
/// asking for exactly this value skips the sieve.
pub const MAX_PRIME: usize = 1_301_081;

/// Target capacity used when the requested capacity is outside
/// `(1, MAX_PRIME]`.
pub const DEFAULT_CAPACITY: usize = 101;

/// Returns the largest prime `<= n`.
///
/// # Errors
///
/// Returns [`PrimeError::TooSmall`] for `n <= 1` and [`PrimeError::TooLarge`]
/// for `n > MAX_PRIME`.
///
/// # Examples
///
/// ```rust
/// use prime_chain::prime::try_prime_below;
///
/// assert_eq!(try_prime_below(100), Ok(97));
/// assert_eq!(try_prime_below(101), Ok(101));
/// assert!(try_prime_below(1).is_err());
/// ```
pub fn try_prime_below(n: usize) -> Result<usize, PrimeError> {
    if n > MAX_PRIME {
        return Err(PrimeError::TooLarge { requested: n });
    }
    if n == MAX_PRIME {
        return Ok(MAX_PRIME);
    }
    if n <= 1 {
        return Err(PrimeError::TooSmall { requested: n });
    }

    let sieve = sieve(n);
    Ok((3..=n).rev().find(|&i| sieve[i]).unwrap_or(2))
}

/// Returns the largest prime `<= n`, or `0` if `n` is outside `[2, MAX_PRIME]`.
///
/// A `0` result is logged and must be treated as a hard failure; a bucket
/// array of that length is never valid.
pub fn prime_below(n: usize) -> usize {
    match try_prime_below(n) {
        Ok(prime) => prime,
        Err(err) => {
            log::warn!("prime_below({n}): {err}");
            0
        }
    }
}

/// Sieve of Eratosthenes over the closed range `[0, n]`.
fn sieve(n: usize) -> alloc::vec::Vec<bool> {
    let mut is_prime = vec![true; n + 1];
    is_prime[0] = false;
    if n >= 1 {
        is_prime[1] = false;
    }

    let mut i = 2;
    while i * i <= n {
        if is_prime[i] {
            for j in (i * i..=n).step_by(i) {
                is_prime[j] = false;
            }
        }
        i += 1;
    }

    is_prime
}
