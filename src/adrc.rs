// Per-axis active disturbance rejection control law
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

//! The control law acts on one axis of a double integrator `ẍ = u + d`, where `u` is the
//! commanded acceleration and `d` lumps every acceleration the controller does not model
//! (gravity, turbulence, actuator loss).
//!
//! - The feedback part is PD: `u_fb = kp · e − kd · ė`.
//! - The extended-state observer tracks `d` from the gap between the observed acceleration
//!   `(v_k − v_{k−1}) / Ts` and the last command: `d̂ ← d̂ + β · (residual − d̂)`.
//! - The command is `u = clamp(u_fb − d̂)`.
//!
//! As in a discrete PID, the state of the law lives in a separate [`AdrcContext`], so
//! [`FuncAdrcController::compute`] is pure and several axes can share one controller.

use core::time::Duration;

use num_traits::{clamp, Float};

use crate::error::ConfigurationError;

/// Sample times above this are rejected.
pub const MAX_SAMPLE_TIME: Duration = Duration::from_secs(60);

#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AdrcConfig<F: Float> {
    /// Proportional gain, in 1/s².
    /// Defaults to 16.0.
    kp: F,

    /// Derivative gain, in 1/s.
    /// Defaults to 8.0, which with the default kp gives a critically damped response.
    kd: F,

    /// Observer gain, the fraction of the residual folded into the disturbance estimate each
    /// sample. Must lie in (0, 1].
    /// Defaults to 0.5.
    observer_gain: F,

    /// Sampling time, equal to the simulation tick interval.
    /// Defaults to 30ms.
    sample_time: Duration,

    /// Cached `sample_time` in seconds.
    sample_time_secs: F,

    /// Minimum commanded acceleration.
    /// Defaults to negative infinity, i.e. no limit.
    output_min: F,

    /// Maximum commanded acceleration.
    /// Defaults to positive infinity, i.e. no limit.
    output_max: F,
}

impl<F: Float> Default for AdrcConfig<F> {
    fn default() -> Self {
        let sample_time = Duration::from_millis(30);
        AdrcConfig {
            kp: F::from(16.0).unwrap_or_else(F::one),
            kd: F::from(8.0).unwrap_or_else(F::one),
            observer_gain: F::from(0.5).unwrap_or_else(F::one),
            sample_time,
            sample_time_secs: F::from(sample_time.as_secs_f64()).unwrap_or_else(F::one),
            output_min: F::neg_infinity(),
            output_max: F::infinity(),
        }
    }
}

impl<F: Float> AdrcConfig<F> {
    /// Returns the proportional gain.
    pub fn kp(&self) -> F {
        self.kp
    }

    /// Returns the derivative gain.
    pub fn kd(&self) -> F {
        self.kd
    }

    /// Convenience method that returns the proportional and derivative gains together.
    pub fn gains(&self) -> (F, F) {
        (self.kp, self.kd)
    }

    /// Returns the observer gain.
    pub fn observer_gain(&self) -> F {
        self.observer_gain
    }

    /// Returns the sampling time.
    pub fn sample_time(&self) -> Duration {
        self.sample_time
    }

    /// Returns the sampling time in seconds.
    pub fn sample_time_secs(&self) -> F {
        self.sample_time_secs
    }

    /// Returns the minimum output limit.
    pub fn output_min(&self) -> F {
        self.output_min
    }

    /// Returns the maximum output limit.
    pub fn output_max(&self) -> F {
        self.output_max
    }

    /// Sets the proportional gain.
    ///
    /// # Returns
    /// - `Ok(())` if the gain was set successfully.
    /// - `Err(ConfigurationError::InvalidProportionalGain)` if the gain is not positive or not
    ///   finite. The previous gain is kept.
    pub fn set_kp(&mut self, kp: F) -> Result<(), ConfigurationError> {
        if kp <= F::zero() || !kp.is_finite() {
            return Err(ConfigurationError::InvalidProportionalGain);
        }
        self.kp = kp;
        Ok(())
    }

    /// Sets the derivative gain.
    ///
    /// # Returns
    /// - `Ok(())` if the gain was set successfully.
    /// - `Err(ConfigurationError::InvalidDerivativeGain)` if the gain is negative or not finite.
    pub fn set_kd(&mut self, kd: F) -> Result<(), ConfigurationError> {
        if kd < F::zero() || !kd.is_finite() {
            return Err(ConfigurationError::InvalidDerivativeGain);
        }
        self.kd = kd;
        Ok(())
    }

    /// Convenience method to set the proportional and derivative gains together
    pub fn set_gains(&mut self, kp: F, kd: F) -> Result<(), ConfigurationError> {
        self.set_kp(kp)?;
        self.set_kd(kd)
    }

    /// Sets the observer gain.
    ///
    /// A gain of 1 replaces the estimate with the latest residual every sample; smaller gains
    /// low-pass filter the residual.
    ///
    /// # Returns
    /// - `Err(ConfigurationError::InvalidObserverGain)` if the gain is outside (0, 1].
    pub fn set_observer_gain(&mut self, observer_gain: F) -> Result<(), ConfigurationError> {
        if !(observer_gain > F::zero() && observer_gain <= F::one()) {
            return Err(ConfigurationError::InvalidObserverGain);
        }
        self.observer_gain = observer_gain;
        Ok(())
    }

    /// Sets the sampling time.
    ///
    /// # Returns
    /// - `Err(ConfigurationError::InvalidSampleTime)` if the sample time is zero or longer than
    ///   [`MAX_SAMPLE_TIME`].
    pub fn set_sample_time(&mut self, sample_time: Duration) -> Result<(), ConfigurationError> {
        if sample_time.is_zero() || sample_time > MAX_SAMPLE_TIME {
            return Err(ConfigurationError::InvalidSampleTime);
        }
        let secs =
            F::from(sample_time.as_secs_f64()).ok_or(ConfigurationError::InvalidSampleTime)?;
        self.sample_time = sample_time;
        self.sample_time_secs = secs;
        Ok(())
    }

    /// Sets the minimum and maximum commanded acceleration.
    ///
    /// These limits may be set to infinity to disable clamping.
    ///
    /// # Returns
    /// - `Err(ConfigurationError::InvalidOutputLimits)` if the minimum is not strictly below
    ///   the maximum or either limit is NaN.
    pub fn set_output_limits(&mut self, output_min: F, output_max: F) -> Result<(), ConfigurationError> {
        if output_min >= output_max || output_max.is_nan() || output_min.is_nan() {
            return Err(ConfigurationError::InvalidOutputLimits);
        }
        self.output_min = output_min;
        self.output_max = output_max;
        Ok(())
    }
}

/// Builds an [`AdrcConfig`], deferring validation to [`AdrcConfigBuilder::build`].
#[derive(Copy, Clone, Debug)]
pub struct AdrcConfigBuilder<F: Float> {
    kp: F,
    kd: F,
    observer_gain: F,
    sample_time: Duration,
    output_limits: (F, F),
}

impl<F: Float> Default for AdrcConfigBuilder<F> {
    fn default() -> Self {
        let config = AdrcConfig::<F>::default();
        Self {
            kp: config.kp,
            kd: config.kd,
            observer_gain: config.observer_gain,
            sample_time: config.sample_time,
            output_limits: (config.output_min, config.output_max),
        }
    }
}

impl<F: Float> AdrcConfigBuilder<F> {
    pub fn kp(mut self, kp: F) -> Self {
        self.kp = kp;
        self
    }

    pub fn kd(mut self, kd: F) -> Self {
        self.kd = kd;
        self
    }

    pub fn observer_gain(mut self, observer_gain: F) -> Self {
        self.observer_gain = observer_gain;
        self
    }

    pub fn sample_time(mut self, sample_time: Duration) -> Self {
        self.sample_time = sample_time;
        self
    }

    pub fn output_limits(mut self, output_min: F, output_max: F) -> Self {
        self.output_limits = (output_min, output_max);
        self
    }

    pub fn build(self) -> Result<AdrcConfig<F>, ConfigurationError> {
        let mut config = AdrcConfig::default();
        config.set_kp(self.kp)?;
        config.set_kd(self.kd)?;
        config.set_observer_gain(self.observer_gain)?;
        config.set_sample_time(self.sample_time)?;
        config.set_output_limits(self.output_limits.0, self.output_limits.1)?;
        Ok(config)
    }
}

/// Working variables of one axis.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct AdrcContext<F: Float> {
    estimate: F,
    last_velocity: F,
    last_command: F,
    need_initialize: bool,
}

impl<F: Float> Default for AdrcContext<F> {
    fn default() -> Self {
        Self::new_uninit()
    }
}

impl<F: Float> AdrcContext<F> {
    /// A context with a zero disturbance estimate. The first sample only records the velocity,
    /// since no velocity change can be observed yet.
    pub fn new_uninit() -> Self {
        Self {
            estimate: F::zero(),
            last_velocity: F::zero(),
            last_command: F::zero(),
            need_initialize: true,
        }
    }

    /// The current disturbance estimate, as an acceleration.
    pub fn estimate(&self) -> F {
        self.estimate
    }

    /// The last commanded acceleration.
    pub fn last_command(&self) -> F {
        self.last_command
    }

    pub fn is_initialized(&self) -> bool {
        !self.need_initialize
    }
}

/// A functional implementation of the control law. Holds only configuration; all state is
/// passed in and returned through an [`AdrcContext`].
#[derive(Copy, Clone, Debug)]
pub struct FuncAdrcController<F: Float> {
    config: AdrcConfig<F>,
}

impl<F: Float> FuncAdrcController<F> {
    pub fn new(config: AdrcConfig<F>) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AdrcConfig<F> {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut AdrcConfig<F> {
        &mut self.config
    }

    /// The PD feedback term for a position error and the rate of the controlled point.
    pub fn feedback(&self, error: F, rate: F) -> F {
        self.config.kp * error - self.config.kd * rate
    }

    /// Updates the disturbance estimate from the measured velocity, then returns the command
    /// `feedback − estimate`, clamped to the output limits.
    pub fn compute(&self, mut ctx: AdrcContext<F>, feedback: F, velocity: F) -> (F, AdrcContext<F>) {
        if ctx.need_initialize {
            ctx.need_initialize = false;
        } else {
            let observed = (velocity - ctx.last_velocity) / self.config.sample_time_secs;
            let residual = observed - ctx.last_command;
            ctx.estimate = ctx.estimate + self.config.observer_gain * (residual - ctx.estimate);
        }
        ctx.last_velocity = velocity;

        let output = clamp(
            feedback - ctx.estimate,
            self.config.output_min,
            self.config.output_max,
        );
        ctx.last_command = output;
        (output, ctx)
    }
}
