// Error taxonomy shared by the simulation core
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

use thiserror::Error;

/// Invalid construction parameters. Raised once, when a configuration, body or generator is
/// built, and never recovered from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    /// Mass must be positive and finite.
    #[error("Mass must be positive and finite")]
    InvalidMass,

    /// Arm length must be positive and finite.
    #[error("Arm length must be positive and finite")]
    InvalidArmLength,

    /// Arm angle must lie strictly between 0 and 90 degrees.
    #[error("Arm angle must lie strictly between 0 and 90 degrees")]
    InvalidArmAngle,

    /// Gravity must be a finite vector.
    #[error("Gravity must be finite")]
    InvalidGravity,

    /// Turbulence bound must be non-negative and finite.
    #[error("Turbulence magnitude bound must be non-negative and finite")]
    InvalidTurbulenceMagnitude,

    /// Turbulence correlation must lie in [0, 1).
    #[error("Turbulence correlation must lie in [0, 1)")]
    InvalidTurbulenceCorrelation,

    /// Turbulence axis mask components must be non-negative and finite.
    #[error("Turbulence axis mask must be non-negative and finite")]
    InvalidTurbulenceAxisMask,

    /// Proportional gain must be positive and finite.
    #[error("Proportional gain must be positive and finite")]
    InvalidProportionalGain,

    /// Derivative gain must be non-negative and finite.
    #[error("Derivative gain must be non-negative and finite")]
    InvalidDerivativeGain,

    /// Observer gain must lie in (0, 1].
    #[error("Observer gain must lie in (0, 1]")]
    InvalidObserverGain,

    /// Sample time (tick interval) must be positive and bounded.
    #[error("Sample time must be positive and at most one minute")]
    InvalidSampleTime,

    /// Output limits must be ordered and not NaN.
    #[error("Output minimum must be strictly below output maximum")]
    InvalidOutputLimits,

    /// Actuator time constant must be positive and finite.
    #[error("Actuator time constant must be positive and finite")]
    InvalidActuatorTimeConstant,
}

/// An orientation whose quaternion norm is (nearly) zero or not finite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum OrientationError {
    /// The quaternion cannot be rescaled to unit norm.
    #[error("Orientation is degenerate and cannot be normalized")]
    Degenerate,
}

/// Errors surfaced by the simulation core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SimError {
    /// See [`ConfigurationError`].
    #[error("Invalid configuration: {0}")]
    Configuration(#[from] ConfigurationError),

    /// The solver ran before any target pose was set.
    #[error("No target pose has been set")]
    UninitializedTarget,

    /// An orientation presented for normalization was degenerate.
    #[error("Degenerate orientation")]
    DegenerateOrientation,
}

impl From<OrientationError> for SimError {
    fn from(value: OrientationError) -> Self {
        match value {
            OrientationError::Degenerate => SimError::DegenerateOrientation,
        }
    }
}
