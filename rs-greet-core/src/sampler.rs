use rand::Rng;

use crate::error::{GreetError, Result};

/// Exponent used when no skew is given: favours the low end of a range.
pub const DEFAULT_SKEW: f64 = 2.0;

/// Power-law skew applied to a uniform draw.
///
/// A draw `u` uniform in `[0, 1)` is raised to the exponent `p` before being
/// scaled onto the target range (inverse transform), so:
/// - `p > 1` moves probability mass toward the lower bound
/// - `p == 1` keeps the distribution uniform
/// - `p < 1` moves probability mass toward the upper bound
///
/// # Invariants
/// - The exponent is always finite and strictly positive
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Skew(f64);

impl Skew {
	/// Plain uniform sampling.
	pub const UNIFORM: Skew = Skew(1.0);

	/// The default low-biased skew (`p = 2`).
	pub const LOW: Skew = Skew(DEFAULT_SKEW);

	/// Creates a skew from its exponent.
	///
	/// # Errors
	/// Returns `InvalidSkew` if `p` is not a finite number greater than 0.
	pub fn new(p: f64) -> Result<Self> {
		if !p.is_finite() || p <= 0.0 {
			return Err(GreetError::InvalidSkew(p));
		}
		Ok(Self(p))
	}

	/// Creates a skew from a known-good exponent, usable in constants.
	///
	/// # Panics
	/// Panics (at compile time in const contexts) if `p` is not a finite
	/// number greater than 0.
	pub const fn fixed(p: f64) -> Self {
		assert!(p.is_finite() && p > 0.0, "skew exponent must be finite and > 0");
		Self(p)
	}

	/// Returns the exponent.
	pub fn exponent(&self) -> f64 {
		self.0
	}

	/// Draws a skewed offset in `0..len`.
	///
	/// Returns `None` if `len == 0`.
	///
	/// # Notes
	/// - Computes `floor(len * u^p)`.
	/// - The result is clamped to `len - 1` in case floating point rounding
	///   lands exactly on `len` for very large ranges.
	pub fn offset<R: Rng + ?Sized>(&self, rng: &mut R, len: u64) -> Option<u64> {
		if len == 0 {
			return None;
		}
		let u: f64 = rng.random();
		let offset = (len as f64 * u.powf(self.0)).floor() as u64;
		Some(offset.min(len - 1))
	}

	/// Draws a skewed index into a collection of `len` items.
	///
	/// Returns `None` for an empty collection.
	pub fn index<R: Rng + ?Sized>(&self, rng: &mut R, len: usize) -> Option<usize> {
		self.offset(rng, len as u64).map(|offset| offset as usize)
	}

	/// Draws a skewed integer in `[a, b]` (both inclusive) from `rng`.
	///
	/// # Errors
	/// Returns `InvalidRange` if `a > b` or if the range spans the whole
	/// `i64` domain.
	pub fn sample_with<R: Rng + ?Sized>(&self, rng: &mut R, a: i64, b: i64) -> Result<i64> {
		if a > b {
			return Err(GreetError::InvalidRange { a, b });
		}
		let len = b
			.abs_diff(a)
			.checked_add(1)
			.ok_or(GreetError::InvalidRange { a, b })?;

		// `len` > 0, an offset is always produced
		let offset = self.offset(rng, len).unwrap_or(0);
		a.checked_add_unsigned(offset).ok_or(GreetError::InvalidRange { a, b })
	}

	/// Draws a skewed integer in `[a, b]` using the thread-local generator.
	pub fn sample(&self, a: i64, b: i64) -> Result<i64> {
		self.sample_with(&mut rand::rng(), a, b)
	}
}

impl Default for Skew {
	fn default() -> Self {
		Self::LOW
	}
}

impl TryFrom<f64> for Skew {
	type Error = GreetError;

	fn try_from(p: f64) -> Result<Self> {
		Self::new(p)
	}
}

/// Generates a skewed random integer in `[a, b]`.
///
/// Equivalent to `a + floor((b - a + 1) * u^p)` with `u` uniform in `[0, 1)`.
/// See [`Skew`] for the meaning of `p`; [`DEFAULT_SKEW`] is the usual value.
///
/// # Errors
/// - `InvalidSkew` if `p <= 0` or `p` is not finite.
/// - `InvalidRange` if `a > b`.
pub fn skewed_random(a: i64, b: i64, p: f64) -> Result<i64> {
	Skew::new(p)?.sample(a, b)
}

#[cfg(test)]
mod tests {
	use super::*;
	use rand::SeedableRng;
	use rand::rngs::StdRng;

	fn mean(a: i64, b: i64, p: f64, trials: usize) -> f64 {
		let mut rng = StdRng::seed_from_u64(7);
		let skew = Skew::new(p).unwrap();
		let total: i64 = (0..trials)
			.map(|_| skew.sample_with(&mut rng, a, b).unwrap())
			.sum();
		total as f64 / trials as f64
	}

	#[test]
	fn test_stays_in_range() {
		let mut rng = StdRng::seed_from_u64(42);
		for _ in 0..10_000 {
			let a = rng.random_range(-1_000..1_000);
			let b = a + rng.random_range(0..500);
			let p = rng.random_range(0.05..8.0);
			let v = Skew::new(p).unwrap().sample_with(&mut rng, a, b).unwrap();
			assert!(a <= v && v <= b, "{v} not in [{a}, {b}] (p = {p})");
		}
	}

	#[test]
	fn test_uniform_mean() {
		let m = mean(1, 10, 1.0, 100_000);
		assert!((m - 5.5).abs() <= 0.5, "mean {m}");
	}

	#[test]
	fn test_high_exponent_favours_lower_bound() {
		assert!(mean(1, 10, 2.0, 20_000) < 5.5);
		assert!(mean(0, 100, 5.0, 20_000) < 50.0);
	}

	#[test]
	fn test_low_exponent_favours_upper_bound() {
		assert!(mean(1, 10, 0.5, 20_000) > 5.5);
		assert!(mean(-50, 50, 0.2, 20_000) > 0.0);
	}

	#[test]
	fn test_single_value_range() {
		assert_eq!(skewed_random(3, 3, 2.0).unwrap(), 3);
		assert_eq!(skewed_random(-8, -8, 0.1).unwrap(), -8);
	}

	#[test]
	fn test_invalid_skew() {
		assert!(matches!(skewed_random(1, 10, 0.0), Err(GreetError::InvalidSkew(_))));
		assert!(matches!(skewed_random(1, 10, -1.0), Err(GreetError::InvalidSkew(_))));
		assert!(matches!(Skew::new(f64::NAN), Err(GreetError::InvalidSkew(_))));
		assert!(Skew::try_from(f64::INFINITY).is_err());
	}

	#[test]
	fn test_invalid_range() {
		assert!(matches!(
			skewed_random(10, 1, 2.0),
			Err(GreetError::InvalidRange { a: 10, b: 1 })
		));
		assert!(Skew::LOW.sample(i64::MIN, i64::MAX).is_err());
	}

	#[test]
	fn test_index() {
		let mut rng = StdRng::seed_from_u64(1);
		assert_eq!(Skew::LOW.index(&mut rng, 0), None);
		assert_eq!(Skew::LOW.index(&mut rng, 1), Some(0));
		for _ in 0..1_000 {
			assert!(Skew::new(3.5).unwrap().index(&mut rng, 3).unwrap() < 3);
		}
	}

	#[test]
	fn test_default_is_low() {
		assert_eq!(Skew::default().exponent(), DEFAULT_SKEW);
	}
}
