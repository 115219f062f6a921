//! Reconnect delay policy.
//!
//! The delay before reconnect attempt `n` (counting consecutive unclean
//! closures since the last successful open) is
//!
//! ```text
//! min(max_delay, base_delay * growth_factor^n * jitter)
//! ```
//!
//! with `jitter` drawn uniformly from `[jitter_min, jitter_max]`. A policy is
//! only accepted when `growth_factor * jitter_min >= jitter_max`, so the
//! smallest possible delay for attempt `n + 1` is never below the largest
//! possible delay for attempt `n`.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TransportError};

/// Exponential backoff with multiplicative jitter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReconnectPolicy {
	pub base_delay_ms: u64,
	pub max_delay_ms: u64,
	pub growth_factor: f64,
	pub jitter_min: f64,
	pub jitter_max: f64,
}

impl Default for ReconnectPolicy {
	fn default() -> Self {
		Self {
			base_delay_ms: 1_000,
			max_delay_ms: 30_000,
			growth_factor: 2.0,
			jitter_min: 0.8,
			jitter_max: 1.2,
		}
	}
}

impl ReconnectPolicy {
	/// Policy without jitter, mostly useful for deterministic tests.
	pub fn fixed(base: Duration, max: Duration, growth_factor: f64) -> Self {
		Self {
			base_delay_ms: base.as_millis() as u64,
			max_delay_ms: max.as_millis() as u64,
			growth_factor,
			jitter_min: 1.0,
			jitter_max: 1.0,
		}
	}

	pub fn base_delay(&self) -> Duration {
		Duration::from_millis(self.base_delay_ms)
	}

	pub fn max_delay(&self) -> Duration {
		Duration::from_millis(self.max_delay_ms)
	}

	/// Checks the invariants that keep scheduled delays non-decreasing.
	pub fn validate(&self) -> Result<()> {
		if self.base_delay_ms == 0 {
			return Err(TransportError::InvalidPolicy("baseDelayMs must be positive".into()));
		}
		if self.max_delay_ms < self.base_delay_ms {
			return Err(TransportError::InvalidPolicy("maxDelayMs must be >= baseDelayMs".into()));
		}
		if !(self.growth_factor.is_finite() && self.growth_factor >= 1.0) {
			return Err(TransportError::InvalidPolicy("growthFactor must be a finite number >= 1".into()));
		}
		if !(self.jitter_min > 0.0 && self.jitter_min <= self.jitter_max && self.jitter_max.is_finite()) {
			return Err(TransportError::InvalidPolicy("jitter band must satisfy 0 < jitterMin <= jitterMax".into()));
		}
		if self.growth_factor * self.jitter_min < self.jitter_max {
			return Err(TransportError::InvalidPolicy(format!(
				"growthFactor * jitterMin ({}) must be >= jitterMax ({})",
				self.growth_factor * self.jitter_min,
				self.jitter_max
			)));
		}
		Ok(())
	}

	/// Delay for `attempt` with a random jitter sample.
	pub fn delay(&self, attempt: u32) -> Duration {
		let jitter = self.jitter_min + fastrand::f64() * (self.jitter_max - self.jitter_min);
		self.delay_with_jitter(attempt, jitter)
	}

	/// Delay for `attempt` with an explicit jitter multiplier.
	///
	/// `jitter` is clamped into the configured band.
	pub fn delay_with_jitter(&self, attempt: u32, jitter: f64) -> Duration {
		let jitter = jitter.clamp(self.jitter_min, self.jitter_max);
		let max_ms = self.max_delay_ms as f64;
		// powi saturates to +inf for large attempts; min() then caps it.
		let exponent = attempt.min(i32::MAX as u32) as i32;
		let raw_ms = self.base_delay_ms as f64 * self.growth_factor.powi(exponent) * jitter;
		let capped = if raw_ms.is_nan() { max_ms } else { raw_ms.min(max_ms) };
		Duration::from_millis(capped.round() as u64)
	}
}
