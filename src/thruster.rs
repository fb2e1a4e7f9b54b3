// One actuator of the quadcopter
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

use core::fmt;

use crate::orientation::Orientation;
use crate::vector::Vector3;

/// Position of a thruster in the X planform. The body frame has x forward, y up and z to the
/// right.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ThrusterId {
    FrontRight,
    FrontLeft,
    RearLeft,
    RearRight,
}

impl ThrusterId {
    pub const ALL: [ThrusterId; 4] = [
        ThrusterId::FrontRight,
        ThrusterId::FrontLeft,
        ThrusterId::RearLeft,
        ThrusterId::RearRight,
    ];

    pub fn index(self) -> usize {
        match self {
            ThrusterId::FrontRight => 0,
            ThrusterId::FrontLeft => 1,
            ThrusterId::RearLeft => 2,
            ThrusterId::RearRight => 3,
        }
    }

    /// Body-frame mount offset for an arm of `arm_length` at `arm_angle` radians from the body
    /// x axis.
    pub(crate) fn mount_offset(self, arm_length: f64, arm_angle: f64) -> Vector3 {
        let forward = arm_length * arm_angle.cos();
        let right = arm_length * arm_angle.sin();
        match self {
            ThrusterId::FrontRight => Vector3::new(forward, 0.0, right),
            ThrusterId::FrontLeft => Vector3::new(forward, 0.0, -right),
            ThrusterId::RearLeft => Vector3::new(-forward, 0.0, -right),
            ThrusterId::RearRight => Vector3::new(-forward, 0.0, right),
        }
    }
}

impl fmt::Display for ThrusterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ThrusterId::FrontRight => "front-right",
            ThrusterId::FrontLeft => "front-left",
            ThrusterId::RearLeft => "rear-left",
            ThrusterId::RearRight => "rear-right",
        };
        f.write_str(name)
    }
}

/// Joint angles and rotor thrust that deliver a force, for a tilt-rotor thruster.
///
/// The rotor pushes along body +y. It is first tilted by `inner_degrees` about body z, then by
/// `outer_degrees` about body x, so a body-frame force `f` is reproduced as
/// `Rx(outer) · Rz(inner) · (0, rotor, 0)`. Angles are in degrees; `inner_degrees` lies in
/// [-90, 90] and `outer_degrees` in (-180, 180].
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ThrusterOutput {
    pub outer_degrees: f64,
    pub rotor: f64,
    pub inner_degrees: f64,
}

impl ThrusterOutput {
    /// Decomposes a body-frame force. A zero force leaves both joints at zero.
    pub fn from_body_force(force: &Vector3) -> Self {
        let rotor = force.norm();
        if rotor == 0.0 || !rotor.is_finite() {
            return Self::default();
        }
        let vertical = force.y.hypot(force.z);
        Self {
            outer_degrees: force.z.atan2(force.y).to_degrees(),
            rotor,
            inner_degrees: (-force.x).atan2(vertical).to_degrees(),
        }
    }

    /// The body-frame force these joint angles and rotor thrust deliver.
    pub fn to_body_force(&self) -> Vector3 {
        let (outer, inner) = (self.outer_degrees.to_radians(), self.inner_degrees.to_radians());
        let along = self.rotor * inner.cos();
        Vector3::new(
            -self.rotor * inner.sin(),
            along * outer.cos(),
            along * outer.sin(),
        )
    }
}

/// Kinematic state of one thruster.
///
/// `current_position` is derived from the owning body's pose and is only ever recomputed, never
/// assigned. `target_position` is the one field the controller writes. A disabled thruster
/// delivers zero force whatever it is commanded.
#[derive(Debug, Clone, PartialEq)]
pub struct Thruster {
    id: ThrusterId,
    mount_offset: Vector3,
    current_position: Vector3,
    target_position: Vector3,
    enabled: bool,
    applied_force: Vector3,
    output: ThrusterOutput,
}

impl Thruster {
    pub(crate) fn new(id: ThrusterId, mount_offset: Vector3) -> Self {
        Self {
            id,
            mount_offset,
            current_position: mount_offset,
            target_position: mount_offset,
            enabled: true,
            applied_force: Vector3::zeros(),
            output: ThrusterOutput::default(),
        }
    }

    pub fn id(&self) -> ThrusterId {
        self.id
    }

    /// Body-frame offset from the body center, fixed at construction.
    pub fn mount_offset(&self) -> &Vector3 {
        &self.mount_offset
    }

    pub fn current_position(&self) -> &Vector3 {
        &self.current_position
    }

    pub fn target_position(&self) -> &Vector3 {
        &self.target_position
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// The force delivered on the last tick.
    pub fn applied_force(&self) -> &Vector3 {
        &self.applied_force
    }

    /// Joint angles and rotor thrust for the force delivered on the last tick.
    pub fn output(&self) -> &ThrusterOutput {
        &self.output
    }

    /// World-frame offset from the body center under `orientation`.
    pub fn arm(&self, orientation: &Orientation) -> Vector3 {
        orientation.rotate(&self.mount_offset)
    }

    pub(crate) fn update_position(
        &mut self,
        body_position: &Vector3,
        body_orientation: &Orientation,
    ) {
        self.current_position = body_position + self.arm(body_orientation);
    }

    pub(crate) fn set_target_position(&mut self, target: Vector3) {
        self.target_position = target;
    }

    pub(crate) fn set_enabled(&mut self, enabled: bool) {
        if !enabled {
            self.applied_force = Vector3::zeros();
            self.output = ThrusterOutput::default();
        }
        self.enabled = enabled;
    }

    /// Converts a commanded world-frame force into the delivered one.
    ///
    /// With a response filter `alpha` in (0, 1] the delivered force moves that fraction of the
    /// way from its previous value toward the command each tick; without one it follows the
    /// command exactly. The joint output is recomputed in the frame of `body_orientation`.
    pub(crate) fn actuate(
        &mut self,
        command: &Vector3,
        alpha: Option<f64>,
        body_orientation: &Orientation,
    ) -> Vector3 {
        if !self.enabled {
            self.applied_force = Vector3::zeros();
            self.output = ThrusterOutput::default();
            return self.applied_force;
        }
        self.applied_force = match alpha {
            Some(alpha) => self.applied_force + (command - self.applied_force) * alpha,
            None => *command,
        };
        let body_force = body_orientation.inverse().rotate(&self.applied_force);
        self.output = ThrusterOutput::from_body_force(&body_force);
        self.applied_force
    }

    pub(crate) fn reset(&mut self) {
        self.applied_force = Vector3::zeros();
        self.output = ThrusterOutput::default();
        self.enabled = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_mount_offsets_are_symmetric() {
        let sum: Vector3 = ThrusterId::ALL
            .iter()
            .map(|id| id.mount_offset(0.3, 45f64.to_radians()))
            .sum();
        assert_relative_eq!(sum, Vector3::zeros(), epsilon = 1e-12);
        for id in ThrusterId::ALL {
            assert_relative_eq!(id.mount_offset(0.3, 0.7).norm(), 0.3, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_disabled_thruster_delivers_nothing() {
        let mut thruster = Thruster::new(ThrusterId::RearLeft, Vector3::x());
        thruster.set_enabled(false);
        let command = Vector3::new(1.0, 20.0, -3.0);
        let delivered = thruster.actuate(&command, None, &Orientation::identity());
        assert_eq!(delivered, Vector3::zeros());
        assert_eq!(thruster.applied_force(), &Vector3::zeros());
        assert_eq!(thruster.output(), &ThrusterOutput::default());
    }

    #[test]
    fn test_response_filter_lags_command() {
        let mut thruster = Thruster::new(ThrusterId::FrontLeft, Vector3::x());
        let command = Vector3::new(0.0, 4.0, 0.0);
        let level = Orientation::identity();
        assert_eq!(thruster.actuate(&command, Some(0.5), &level), Vector3::new(0.0, 2.0, 0.0));
        assert_eq!(thruster.actuate(&command, Some(0.5), &level), Vector3::new(0.0, 3.0, 0.0));
        assert_eq!(thruster.actuate(&command, None, &level), command);
    }

    #[test]
    fn test_vertical_force_needs_no_tilt() {
        let output = ThrusterOutput::from_body_force(&Vector3::new(0.0, 7.5, 0.0));
        assert_relative_eq!(output.rotor, 7.5);
        assert_relative_eq!(output.outer_degrees, 0.0);
        assert_relative_eq!(output.inner_degrees, 0.0);
        assert_eq!(ThrusterOutput::from_body_force(&Vector3::zeros()), ThrusterOutput::default());
    }

    #[test]
    fn test_sideways_forces_tilt_one_joint() {
        // Pushing to the right tilts about body x only
        let right = ThrusterOutput::from_body_force(&Vector3::new(0.0, 0.0, 2.0));
        assert_relative_eq!(right.outer_degrees, 90.0, epsilon = 1e-12);
        assert_relative_eq!(right.inner_degrees, 0.0, epsilon = 1e-12);

        // Pushing forward tilts about body z only
        let forward = ThrusterOutput::from_body_force(&Vector3::new(3.0, 3.0, 0.0));
        assert_relative_eq!(forward.outer_degrees, 0.0, epsilon = 1e-12);
        assert_relative_eq!(forward.inner_degrees, -45.0, epsilon = 1e-12);
        assert_relative_eq!(forward.rotor, 18f64.sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn test_output_reproduces_force() {
        for force in [
            Vector3::new(1.0, 20.0, -3.0),
            Vector3::new(-4.0, -2.0, 0.5),
            Vector3::new(0.3, 0.0, -6.0),
        ] {
            let output = ThrusterOutput::from_body_force(&force);
            assert_relative_eq!(output.rotor, force.norm(), epsilon = 1e-12);
            assert_relative_eq!(output.to_body_force(), force, epsilon = 1e-12);
        }
    }

    /// The joint angles are measured in the body frame, not the world frame
    #[test]
    fn test_output_follows_body_orientation() {
        let mut thruster = Thruster::new(ThrusterId::FrontRight, Vector3::x());
        let rolled = Orientation::from_axis_angle(&Vector3::x(), 30f64.to_radians()).unwrap();
        let lift = rolled.rotate(&Vector3::new(0.0, 5.0, 0.0));
        thruster.actuate(&lift, None, &rolled);
        assert_relative_eq!(thruster.output().rotor, 5.0, epsilon = 1e-12);
        assert_relative_eq!(thruster.output().outer_degrees, 0.0, epsilon = 1e-12);
        assert_relative_eq!(thruster.output().inner_degrees, 0.0, epsilon = 1e-12);
    }
}
