// The quadcopter rigid body
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

use tracing::{info, warn};

use crate::error::{ConfigurationError, OrientationError};
use crate::orientation::Orientation;
use crate::thruster::{Thruster, ThrusterId, ThrusterOutput};
use crate::vector::{self, Vector3};

/// A position together with an orientation. Targets travel as one `Pose` so the two halves are
/// never paired from different updates.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Pose {
    pub position: Vector3,
    pub orientation: Orientation,
}

impl Pose {
    pub fn new(position: Vector3, orientation: Orientation) -> Self {
        Self {
            position,
            orientation,
        }
    }

    /// World position of a point fixed at `offset` in the body frame of this pose.
    pub fn transform_point(&self, offset: &Vector3) -> Vector3 {
        self.position + self.orientation.rotate(offset)
    }
}

/// Read-only view of one thruster.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ThrusterState {
    pub id: ThrusterId,
    pub current_position: Vector3,
    pub target_position: Vector3,
    pub enabled: bool,
    pub applied_force: Vector3,
    /// Tilt joints and rotor thrust delivering `applied_force` in the body frame.
    pub output: ThrusterOutput,
}

impl ThrusterState {
    /// Distance between where the thruster is and where the controller wants it.
    pub fn tracking_error(&self) -> f64 {
        vector::distance(&self.current_position, &self.target_position)
    }
}

/// Read-only view of the body: the only state surface the renderer sees.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BodyState {
    pub position: Vector3,
    pub orientation: Orientation,
    pub velocity: Vector3,
    pub angular_velocity: Vector3,
    pub target: Option<Pose>,
    pub thrusters: [ThrusterState; 4],
}

impl BodyState {
    pub fn thruster(&self, id: ThrusterId) -> &ThrusterState {
        &self.thrusters[id.index()]
    }

    /// Distance from the body center to the target position, or `None` without a target.
    pub fn position_error(&self) -> Option<f64> {
        self.target
            .map(|target| vector::distance(&self.position, &target.position))
    }
}

/// Checks the construction parameters of a [`RigidBody`].
pub fn validate_geometry(
    mass: f64,
    arm_length: f64,
    arm_angle_degrees: f64,
) -> Result<(), ConfigurationError> {
    if !mass.is_finite() || mass <= 0.0 {
        return Err(ConfigurationError::InvalidMass);
    }
    if !arm_length.is_finite() || arm_length <= 0.0 {
        return Err(ConfigurationError::InvalidArmLength);
    }
    if !(arm_angle_degrees > 0.0 && arm_angle_degrees < 90.0) {
        return Err(ConfigurationError::InvalidArmAngle);
    }
    Ok(())
}

/// What one integration step did to the body.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepForces {
    /// Sum of external and thruster forces.
    pub net_force: Vector3,
    /// Torque about the body center from the thrusters.
    pub torque: Vector3,
    /// Set if the integrated orientation was degenerate and identity was substituted.
    pub degenerate: Option<OrientationError>,
}

/// The quadcopter: a rigid body carrying four thrusters in an X planform.
///
/// Geometry is fixed at construction. The body does not advance on its own; the session calls
/// [`RigidBody::integrate`] once per tick.
#[derive(Debug, Clone)]
pub struct RigidBody {
    mass: f64,
    arm_length: f64,
    initial_pose: Pose,
    position: Vector3,
    orientation: Orientation,
    velocity: Vector3,
    angular_velocity: Vector3,
    target: Option<Pose>,
    pending_force: Vector3,
    thrusters: [Thruster; 4],
}

impl RigidBody {
    /// Creates a body at rest at `initial_pose`.
    ///
    /// # Arguments
    /// - `mass`: kilograms, positive and finite.
    /// - `arm_length`: distance from the center to each thruster, positive and finite.
    /// - `arm_angle_degrees`: angle between each arm and the body x axis, in (0, 90).
    pub fn new(
        mass: f64,
        arm_length: f64,
        arm_angle_degrees: f64,
        initial_pose: Pose,
    ) -> Result<Self, ConfigurationError> {
        validate_geometry(mass, arm_length, arm_angle_degrees)?;
        let arm_angle = arm_angle_degrees.to_radians();
        let thrusters =
            ThrusterId::ALL.map(|id| Thruster::new(id, id.mount_offset(arm_length, arm_angle)));

        let mut body = Self {
            mass,
            arm_length,
            initial_pose,
            position: initial_pose.position,
            orientation: initial_pose.orientation,
            velocity: Vector3::zeros(),
            angular_velocity: Vector3::zeros(),
            target: None,
            pending_force: Vector3::zeros(),
            thrusters,
        };
        body.update_thruster_positions();
        let targets = body.thrusters.each_ref().map(|t| *t.current_position());
        body.set_thruster_targets(&targets);
        Ok(body)
    }

    pub fn mass(&self) -> f64 {
        self.mass
    }

    pub fn arm_length(&self) -> f64 {
        self.arm_length
    }

    /// Scalar moment of inertia used for the attitude dynamics.
    pub fn moment_of_inertia(&self) -> f64 {
        self.mass * self.arm_length * self.arm_length
    }

    pub fn position(&self) -> &Vector3 {
        &self.position
    }

    pub fn orientation(&self) -> &Orientation {
        &self.orientation
    }

    pub fn pose(&self) -> Pose {
        Pose::new(self.position, self.orientation)
    }

    pub fn velocity(&self) -> &Vector3 {
        &self.velocity
    }

    pub fn angular_velocity(&self) -> &Vector3 {
        &self.angular_velocity
    }

    pub fn target(&self) -> Option<&Pose> {
        self.target.as_ref()
    }

    pub fn thrusters(&self) -> &[Thruster; 4] {
        &self.thrusters
    }

    pub fn thruster(&self, id: ThrusterId) -> &Thruster {
        &self.thrusters[id.index()]
    }

    /// World-frame offsets of the thrusters from the body center.
    pub fn arms(&self) -> [Vector3; 4] {
        self.thrusters.each_ref().map(|t| t.arm(&self.orientation))
    }

    /// World velocity of a point at world offset `arm` from the center.
    pub fn point_velocity(&self, arm: &Vector3) -> Vector3 {
        self.velocity + self.angular_velocity.cross(arm)
    }

    /// Replaces the desired pose. The orientation is already unit-norm by construction.
    pub fn set_target(&mut self, position: Vector3, orientation: Orientation) {
        self.target = Some(Pose::new(position, orientation));
    }

    /// Accumulates an external force for the next integration step.
    pub fn apply_force(&mut self, force: Vector3) {
        self.pending_force += force;
    }

    /// External force accumulated since the last integration step.
    pub fn pending_force(&self) -> &Vector3 {
        &self.pending_force
    }

    pub fn set_thruster_enabled(&mut self, id: ThrusterId, enabled: bool) {
        let thruster = &mut self.thrusters[id.index()];
        if thruster.is_enabled() != enabled {
            info!(thruster = %id, enabled, "Thruster state changed");
        }
        thruster.set_enabled(enabled);
    }

    pub(crate) fn set_thruster_targets(&mut self, targets: &[Vector3; 4]) {
        for (thruster, target) in self.thrusters.iter_mut().zip(targets) {
            thruster.set_target_position(*target);
        }
    }

    /// Advances the body by `dt` seconds with semi-implicit Euler.
    ///
    /// Thruster `i` is commanded `commands[i]`; `response` is the actuator filter fraction, if
    /// any. The accumulated external force is consumed.
    pub fn integrate(
        &mut self,
        commands: &[Vector3; 4],
        response: Option<f64>,
        dt: f64,
    ) -> StepForces {
        let arms = self.arms();
        let orientation = self.orientation;
        let mut net_force = self.pending_force;
        let mut torque = Vector3::zeros();
        for ((thruster, command), arm) in self.thrusters.iter_mut().zip(commands).zip(&arms) {
            let delivered = thruster.actuate(command, response, &orientation);
            net_force += delivered;
            torque += arm.cross(&delivered);
        }
        self.pending_force = Vector3::zeros();

        self.velocity += net_force / self.mass * dt;
        self.position += self.velocity * dt;
        self.angular_velocity += torque / self.moment_of_inertia() * dt;

        let degenerate = match self.orientation.integrate(&self.angular_velocity, dt) {
            Ok(orientation) => {
                self.orientation = orientation;
                None
            }
            Err(err) => {
                warn!(
                    angular_velocity = ?self.angular_velocity,
                    "Orientation degenerated during integration, substituting identity"
                );
                self.orientation = Orientation::identity();
                Some(err)
            }
        };
        self.update_thruster_positions();

        StepForces {
            net_force,
            torque,
            degenerate,
        }
    }

    /// Read-only snapshot of the body and its thrusters.
    pub fn current_state(&self) -> BodyState {
        BodyState {
            position: self.position,
            orientation: self.orientation,
            velocity: self.velocity,
            angular_velocity: self.angular_velocity,
            target: self.target,
            thrusters: self.thrusters.each_ref().map(|t| ThrusterState {
                id: t.id(),
                current_position: *t.current_position(),
                target_position: *t.target_position(),
                enabled: t.is_enabled(),
                applied_force: *t.applied_force(),
                output: *t.output(),
            }),
        }
    }

    /// Returns to the initial pose at rest: no target, no pending force, all thrusters enabled.
    pub fn reset(&mut self) {
        self.position = self.initial_pose.position;
        self.orientation = self.initial_pose.orientation;
        self.velocity = Vector3::zeros();
        self.angular_velocity = Vector3::zeros();
        self.target = None;
        self.pending_force = Vector3::zeros();
        self.thrusters.iter_mut().for_each(Thruster::reset);
        self.update_thruster_positions();
        let targets = self.thrusters.each_ref().map(|t| *t.current_position());
        self.set_thruster_targets(&targets);
    }

    fn update_thruster_positions(&mut self) {
        let (position, orientation) = (self.position, self.orientation);
        for thruster in &mut self.thrusters {
            thruster.update_position(&position, &orientation);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn make_body() -> RigidBody {
        RigidBody::new(1.0, 0.3, 45.0, Pose::default()).unwrap()
    }

    #[test]
    fn test_invalid_geometry_is_rejected() {
        let pose = Pose::default();
        assert_eq!(
            RigidBody::new(-1.0, 0.3, 45.0, pose).map(|_| ()),
            Err(ConfigurationError::InvalidMass)
        );
        assert_eq!(
            RigidBody::new(1.0, -0.3, 45.0, pose).map(|_| ()),
            Err(ConfigurationError::InvalidArmLength)
        );
        assert_eq!(
            RigidBody::new(1.0, 0.3, 90.0, pose).map(|_| ()),
            Err(ConfigurationError::InvalidArmAngle)
        );
    }

    #[test]
    fn test_applied_forces_accumulate_until_integration() {
        let mut body = make_body();
        body.apply_force(Vector3::new(1.0, 0.0, 0.0));
        body.apply_force(Vector3::new(0.0, 2.0, 0.0));
        assert_eq!(body.pending_force(), &Vector3::new(1.0, 2.0, 0.0));

        let forces = body.integrate(&[Vector3::zeros(); 4], None, 0.5);
        assert_eq!(forces.net_force, Vector3::new(1.0, 2.0, 0.0));
        assert_eq!(body.pending_force(), &Vector3::zeros());

        // Semi-implicit Euler: velocity first, then position with the new velocity
        assert_relative_eq!(*body.velocity(), Vector3::new(0.5, 1.0, 0.0));
        assert_relative_eq!(*body.position(), Vector3::new(0.25, 0.5, 0.0));
    }

    #[test]
    fn test_disabled_thruster_adds_no_force_or_torque() {
        let mut body = make_body();
        body.set_thruster_enabled(ThrusterId::FrontRight, false);
        let mut commands = [Vector3::zeros(); 4];
        commands[ThrusterId::FrontRight.index()] = Vector3::new(3.0, 7.0, -2.0);

        let forces = body.integrate(&commands, None, 0.03);
        assert_eq!(forces.net_force, Vector3::zeros());
        assert_eq!(forces.torque, Vector3::zeros());
    }

    #[test]
    fn test_degenerate_attitude_is_replaced_by_identity() {
        let mut body = make_body();
        body.orientation = Orientation::from_axis_angle(&Vector3::y(), 0.5).unwrap();
        body.angular_velocity = Vector3::new(f64::NAN, 0.0, 0.0);

        let forces = body.integrate(&[Vector3::zeros(); 4], None, 0.03);
        assert_eq!(forces.degenerate, Some(OrientationError::Degenerate));
        assert_eq!(body.orientation(), &Orientation::identity());
        for thruster in body.thrusters() {
            assert_eq!(thruster.current_position(), thruster.mount_offset());
        }

        body.angular_velocity = Vector3::zeros();
        let forces = body.integrate(&[Vector3::zeros(); 4], None, 0.03);
        assert_eq!(forces.degenerate, None);
    }

    #[test]
    fn test_thruster_output_is_reported_in_body_frame() {
        let mut body = make_body();
        body.orientation = Orientation::from_axis_angle(&Vector3::z(), 0.4).unwrap();
        let lift = body.orientation.rotate(&Vector3::new(0.0, 3.0, 0.0));
        body.integrate(&[lift; 4], None, 0.03);

        for thruster in body.current_state().thrusters {
            assert_relative_eq!(thruster.applied_force, lift, epsilon = 1e-12);
            assert_relative_eq!(thruster.output.rotor, 3.0, epsilon = 1e-12);
            assert_relative_eq!(thruster.output.inner_degrees, 0.0, epsilon = 1e-9);
            assert_relative_eq!(thruster.output.outer_degrees, 0.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_reset_restores_initial_state() {
        let mut body = make_body();
        body.set_target(Vector3::x(), Orientation::identity());
        body.set_thruster_enabled(ThrusterId::RearLeft, false);
        body.apply_force(Vector3::y());
        body.integrate(&[Vector3::x(); 4], None, 0.1);

        body.reset();
        assert_eq!(body.position(), &Vector3::zeros());
        assert_eq!(body.velocity(), &Vector3::zeros());
        assert!(body.target().is_none());
        assert!(body.thruster(ThrusterId::RearLeft).is_enabled());
    }
}
