// Converts a target pose into per-thruster forces
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

use nalgebra as na;
use tracing::warn;

use crate::adrc::{AdrcConfig, AdrcContext, FuncAdrcController};
use crate::body::{Pose, RigidBody};
use crate::error::SimError;
use crate::vector::Vector3;

/// How a target pose is turned into thruster forces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SolverMode {
    /// Each thruster is driven toward its own target point. Position and attitude correction
    /// are coupled through the per-thruster errors.
    #[default]
    Individual,
    /// One force and one torque are computed at the body center, then split across the
    /// thrusters. Cheaper, and treats the body as a point mass for translation.
    Combined,
}

/// The solver's output for one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThrustCommand {
    /// Force to command at each thruster, in [`ThrusterId::ALL`](crate::thruster::ThrusterId::ALL)
    /// order.
    pub forces: [Vector3; 4],
    /// World position each thruster should occupy.
    pub targets: [Vector3; 4],
    /// Commanded acceleration of the body center, disturbance compensation included.
    pub acceleration: Vector3,
    /// Disturbance acceleration estimate used for this command.
    pub disturbance_estimate: Vector3,
}

impl ThrustCommand {
    pub fn total_force(&self) -> Vector3 {
        self.forces.iter().sum()
    }
}

/// The ADRC controller for the whole body.
///
/// PD feedback acts on thruster points (individual mode) or on the body center and attitude
/// (combined mode). A per-axis extended-state observer estimates the translational disturbance
/// acceleration, gravity and turbulence included, and the estimate is subtracted from every
/// command. Gains are acceleration gains: each thruster's force is `mass / 4` times its
/// acceleration command.
#[derive(Debug, Clone)]
pub struct ThrustVectorSolver {
    mode: SolverMode,
    controller: FuncAdrcController<f64>,
    axes: [AdrcContext<f64>; 3],
}

impl ThrustVectorSolver {
    pub fn new(mode: SolverMode, config: AdrcConfig<f64>) -> Self {
        Self {
            mode,
            controller: FuncAdrcController::new(config),
            axes: [AdrcContext::new_uninit(); 3],
        }
    }

    pub fn mode(&self) -> SolverMode {
        self.mode
    }

    pub fn config(&self) -> &AdrcConfig<f64> {
        self.controller.config()
    }

    /// The current disturbance acceleration estimate.
    pub fn disturbance_estimate(&self) -> Vector3 {
        Vector3::from_fn(|axis, _| self.axes[axis].estimate())
    }

    /// Zeroes the disturbance estimate.
    pub fn reset(&mut self) {
        self.axes = [AdrcContext::new_uninit(); 3];
    }

    /// Computes the thruster forces and targets that move `body` toward its target pose, and
    /// advances the disturbance observer by one sample.
    ///
    /// # Errors
    /// - [`SimError::UninitializedTarget`] if the body has no target. The observer is left
    ///   untouched.
    /// - [`SimError::DegenerateOrientation`] if the target orientation cannot be normalized.
    pub fn solve(&mut self, body: &RigidBody) -> Result<ThrustCommand, SimError> {
        let target = body.target().ok_or(SimError::UninitializedTarget)?;
        let target = Pose::new(target.position, target.orientation.checked()?);

        let targets = body
            .thrusters()
            .each_ref()
            .map(|t| target.transform_point(t.mount_offset()));

        let (forces, acceleration) = match self.mode {
            SolverMode::Individual => self.solve_individual(body, &targets),
            SolverMode::Combined => self.solve_combined(body, &target),
        };

        Ok(ThrustCommand {
            forces,
            targets,
            acceleration,
            disturbance_estimate: self.disturbance_estimate(),
        })
    }

    fn solve_individual(
        &mut self,
        body: &RigidBody,
        targets: &[Vector3; 4],
    ) -> ([Vector3; 4], Vector3) {
        let arms = body.arms();
        let mut feedback = [Vector3::zeros(); 4];
        for (i, thruster) in body.thrusters().iter().enumerate() {
            let error = targets[i] - thruster.current_position();
            let rate = body.point_velocity(&arms[i]);
            feedback[i] = error.zip_map(&rate, |e, r| self.controller.feedback(e, r));
        }

        let mean = feedback.iter().sum::<Vector3>() / 4.0;
        let acceleration = self.compensate(&mean, body.velocity());
        let correction = acceleration - mean;

        let share = body.mass() / 4.0;
        (feedback.map(|f| (f + correction) * share), acceleration)
    }

    fn solve_combined(&mut self, body: &RigidBody, target: &Pose) -> ([Vector3; 4], Vector3) {
        let error = target.position - body.position();
        let feedback = error.zip_map(body.velocity(), |e, r| self.controller.feedback(e, r));
        let acceleration = self.compensate(&feedback, body.velocity());

        let attitude_error = body.orientation().error_vector(&target.orientation);
        let angular_acceleration =
            attitude_error.zip_map(body.angular_velocity(), |e, r| self.controller.feedback(e, r));
        let torque = angular_acceleration * body.moment_of_inertia();

        let arms = body.arms();
        let lever = Self::torque_multiplier(&arms, &torque);
        let share = acceleration * (body.mass() / 4.0);
        (arms.map(|arm| share + lever.cross(&arm)), acceleration)
    }

    /// Finds `λ` such that the forces `λ × arm_i` sum to zero and produce `torque`. These are
    /// the smallest forces that do so, since each is perpendicular to its arm.
    fn torque_multiplier(arms: &[Vector3; 4], torque: &Vector3) -> Vector3 {
        let stiffness: na::Matrix3<f64> = arms
            .iter()
            .map(|r| na::Matrix3::identity() * r.norm_squared() - r * r.transpose())
            .sum();
        match stiffness.try_inverse() {
            Some(inverse) => inverse * torque,
            None => {
                warn!("Thruster arms are collinear, dropping the torque command");
                Vector3::zeros()
            }
        }
    }

    /// Runs the per-axis observer and returns the compensated acceleration command.
    fn compensate(&mut self, feedback: &Vector3, velocity: &Vector3) -> Vector3 {
        let mut command = Vector3::zeros();
        for axis in 0..3 {
            let (output, ctx) =
                self.controller
                    .compute(self.axes[axis], feedback[axis], velocity[axis]);
            command[axis] = output;
            self.axes[axis] = ctx;
        }
        command
    }
}
