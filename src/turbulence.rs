// Bounded stochastic disturbance force
// Copyright © 2025 Hs293Go
//
// Permission is hereby granted, free of charge, to any person obtaining
// a copy of this software and associated documentation files (the "Software"),
// to deal in the Software without restriction, including without limitation
// the rights to use, copy, modify, merge, publish, distribute, sublicense,
// and/or sell copies of the Software, and to permit persons to whom the
// Software is furnished to do so, subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included
// in all copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND,
// EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES
// OF MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT.
// IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM,
// DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION OF CONTRACT,
// TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE
// OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, StandardNormal, Uniform};

use crate::error::ConfigurationError;
use crate::vector::{self, Vector3};

/// Parameters of the turbulence force.
///
/// Each tick a fresh force is drawn with a magnitude uniform in `[0, max_magnitude]` and a
/// direction uniform over the unit sphere of the axes left open by `axis_mask`. The emitted
/// force blends the previous one with the fresh draw, `correlation · previous + (1 −
/// correlation) · fresh`, so it varies smoothly for a correlation close to 1 and never exceeds
/// `max_magnitude`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TurbulenceConfig {
    /// Upper bound on the force magnitude, in newtons.
    /// Defaults to 10.0.
    pub max_magnitude: f64,

    /// Weight of the previous sample in the next one, in [0, 1).
    /// Defaults to 0.9.
    pub correlation: f64,

    /// Per-axis weights applied to the random direction; a zero component removes that axis.
    /// Defaults to (1, 1, 1).
    pub axis_mask: Vector3,

    /// Seed for a reproducible sequence. `None` draws a seed from the OS.
    /// Defaults to `None`.
    pub seed: Option<u64>,

    /// Whether the generator starts enabled. A disabled generator emits zero.
    /// Defaults to false.
    pub enabled: bool,
}

impl Default for TurbulenceConfig {
    fn default() -> Self {
        Self {
            max_magnitude: 10.0,
            correlation: 0.9,
            axis_mask: Vector3::new(1.0, 1.0, 1.0),
            seed: None,
            enabled: false,
        }
    }
}

impl TurbulenceConfig {
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if !self.max_magnitude.is_finite() || self.max_magnitude < 0.0 {
            return Err(ConfigurationError::InvalidTurbulenceMagnitude);
        }
        if !(0.0..1.0).contains(&self.correlation) {
            return Err(ConfigurationError::InvalidTurbulenceCorrelation);
        }
        if !vector::is_finite(&self.axis_mask) || self.axis_mask.iter().any(|c| *c < 0.0) {
            return Err(ConfigurationError::InvalidTurbulenceAxisMask);
        }
        Ok(())
    }
}

/// Source of the turbulence force. Owned by one session; nothing about it is global.
#[derive(Debug, Clone)]
pub struct TurbulenceGenerator {
    config: TurbulenceConfig,
    enabled: bool,
    rng: ChaCha8Rng,
    unit: Uniform<f64>,
    last: Vector3,
}

impl TurbulenceGenerator {
    pub fn new(config: TurbulenceConfig) -> Result<Self, ConfigurationError> {
        config.validate()?;
        let rng = config
            .seed
            .map_or_else(ChaCha8Rng::from_entropy, ChaCha8Rng::seed_from_u64);
        Ok(Self {
            config,
            enabled: config.enabled,
            rng,
            unit: Uniform::new_inclusive(0.0, 1.0),
            last: Vector3::zeros(),
        })
    }

    /// A generator that always emits zero.
    pub fn disabled() -> Self {
        let config = TurbulenceConfig {
            max_magnitude: 0.0,
            seed: Some(0),
            ..TurbulenceConfig::default()
        };
        Self {
            config,
            enabled: false,
            rng: ChaCha8Rng::seed_from_u64(0),
            unit: Uniform::new_inclusive(0.0, 1.0),
            last: Vector3::zeros(),
        }
    }

    pub fn config(&self) -> &TurbulenceConfig {
        &self.config
    }

    pub fn max_magnitude(&self) -> f64 {
        self.config.max_magnitude
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Enables or disables the generator. Disabling also forgets the correlated history.
    pub fn set_enabled(&mut self, enabled: bool) {
        if !enabled {
            self.last = Vector3::zeros();
        }
        self.enabled = enabled;
    }

    /// Restarts the random sequence from `seed` and forgets the correlated history.
    pub fn reseed(&mut self, seed: u64) {
        self.rng = ChaCha8Rng::seed_from_u64(seed);
        self.last = Vector3::zeros();
    }

    /// Returns to the configured state: configured enable flag, configured seed if any, and no
    /// correlated history.
    pub fn reset(&mut self) {
        self.enabled = self.config.enabled;
        if let Some(seed) = self.config.seed {
            self.rng = ChaCha8Rng::seed_from_u64(seed);
        }
        self.last = Vector3::zeros();
    }

    /// Draws the force for the next tick.
    pub fn sample(&mut self) -> Vector3 {
        if !self.enabled || self.config.max_magnitude == 0.0 {
            return Vector3::zeros();
        }
        let magnitude = self.config.max_magnitude * self.unit.sample(&mut self.rng);
        let fresh = self.random_direction() * magnitude;
        let c = self.config.correlation;
        self.last = self.last * c + fresh * (1.0 - c);
        self.last
    }

    /// Gaussian components normalized to unit length are uniform over the sphere; masking
    /// components first keeps the direction uniform over the remaining axes.
    fn random_direction(&mut self) -> Vector3 {
        let raw = Vector3::from_fn(|_, _| StandardNormal.sample(&mut self.rng));
        let masked = raw.component_mul(&self.config.axis_mask);
        let norm = masked.norm();
        if norm <= f64::EPSILON {
            return Vector3::zeros();
        }
        masked / norm
    }
}
