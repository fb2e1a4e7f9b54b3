// One simulation run: body, controller, disturbances and the tick procedure
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

//! A [`SimulationSession`] owns everything one run needs and advances it one tick at a time.
//!
//! The session is shared by reference between three parties:
//! - a target producer calling [`SimulationSession::set_target`] at any cadence,
//! - a tick driver calling [`SimulationSession::tick`] (see [`crate::scheduler`]),
//! - readers calling [`SimulationSession::snapshot`].
//!
//! Each tick reads the latest target as one value, so position and orientation always come from
//! the same update. Snapshots are immutable once published; a new tick publishes a new one.

use core::sync::atomic::{AtomicBool, Ordering};
use core::time::Duration;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, info};

use crate::adrc::{AdrcConfig, AdrcConfigBuilder};
use crate::body::{self, BodyState, Pose, RigidBody};
use crate::error::{ConfigurationError, SimError};
use crate::orientation::Orientation;
use crate::solver::{SolverMode, ThrustVectorSolver};
use crate::thruster::ThrusterId;
use crate::time::TickGate;
use crate::turbulence::{TurbulenceConfig, TurbulenceGenerator};
use crate::vector::{self, Vector3};

/// Everything a session is built from. Read once, at construction.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SessionConfig {
    mass: f64,
    arm_length: f64,
    arm_angle_degrees: f64,
    gravity: Vector3,
    tick_interval: Duration,
    solver_mode: SolverMode,
    controller: AdrcConfig<f64>,
    turbulence: TurbulenceConfig,
    actuator_time_constant: Option<f64>,
    initial_pose: Pose,
}

impl Default for SessionConfig {
    fn default() -> Self {
        let builder = SessionConfigBuilder::default();
        Self {
            mass: builder.mass,
            arm_length: builder.arm_length,
            arm_angle_degrees: builder.arm_angle_degrees,
            gravity: builder.gravity,
            tick_interval: builder.tick_interval,
            solver_mode: builder.solver_mode,
            controller: AdrcConfig::default(),
            turbulence: builder.turbulence,
            actuator_time_constant: None,
            initial_pose: Pose::default(),
        }
    }
}

impl SessionConfig {
    pub fn mass(&self) -> f64 {
        self.mass
    }

    pub fn arm_length(&self) -> f64 {
        self.arm_length
    }

    pub fn arm_angle_degrees(&self) -> f64 {
        self.arm_angle_degrees
    }

    pub fn gravity(&self) -> &Vector3 {
        &self.gravity
    }

    /// Simulated time advanced by each tick. Also the controller's sample time.
    pub fn tick_interval(&self) -> Duration {
        self.tick_interval
    }

    pub fn solver_mode(&self) -> SolverMode {
        self.solver_mode
    }

    pub fn controller(&self) -> &AdrcConfig<f64> {
        &self.controller
    }

    pub fn turbulence(&self) -> &TurbulenceConfig {
        &self.turbulence
    }

    pub fn actuator_time_constant(&self) -> Option<f64> {
        self.actuator_time_constant
    }

    pub fn initial_pose(&self) -> &Pose {
        &self.initial_pose
    }

    /// Fraction of the gap between commanded and delivered force closed per tick, or `None` if
    /// thrusters respond instantly.
    pub fn actuator_response(&self) -> Option<f64> {
        let dt = self.tick_interval.as_secs_f64();
        self.actuator_time_constant.map(|tc| dt / (dt + tc))
    }
}

/// Builds a [`SessionConfig`], deferring validation to [`SessionConfigBuilder::build`].
#[derive(Debug, Clone, Copy)]
pub struct SessionConfigBuilder {
    mass: f64,
    arm_length: f64,
    arm_angle_degrees: f64,
    gravity: Vector3,
    tick_interval: Duration,
    solver_mode: SolverMode,
    controller: AdrcConfigBuilder<f64>,
    turbulence: TurbulenceConfig,
    actuator_time_constant: Option<f64>,
    initial_pose: Pose,
}

impl Default for SessionConfigBuilder {
    fn default() -> Self {
        Self {
            mass: 1.0,
            arm_length: 0.3,
            arm_angle_degrees: 45.0,
            gravity: Vector3::new(0.0, -9.81, 0.0),
            tick_interval: Duration::from_millis(30),
            solver_mode: SolverMode::default(),
            controller: AdrcConfigBuilder::default(),
            turbulence: TurbulenceConfig::default(),
            actuator_time_constant: None,
            initial_pose: Pose::default(),
        }
    }
}

impl SessionConfigBuilder {
    pub fn mass(mut self, mass: f64) -> Self {
        self.mass = mass;
        self
    }

    pub fn arm_length(mut self, arm_length: f64) -> Self {
        self.arm_length = arm_length;
        self
    }

    pub fn arm_angle_degrees(mut self, arm_angle_degrees: f64) -> Self {
        self.arm_angle_degrees = arm_angle_degrees;
        self
    }

    pub fn gravity(mut self, gravity: Vector3) -> Self {
        self.gravity = gravity;
        self
    }

    pub fn tick_interval(mut self, tick_interval: Duration) -> Self {
        self.tick_interval = tick_interval;
        self
    }

    pub fn solver_mode(mut self, solver_mode: SolverMode) -> Self {
        self.solver_mode = solver_mode;
        self
    }

    /// Proportional and derivative acceleration gains.
    pub fn gains(mut self, kp: f64, kd: f64) -> Self {
        self.controller = self.controller.kp(kp).kd(kd);
        self
    }

    pub fn observer_gain(mut self, observer_gain: f64) -> Self {
        self.controller = self.controller.observer_gain(observer_gain);
        self
    }

    /// Limits on each axis of the commanded acceleration.
    pub fn output_limits(mut self, output_min: f64, output_max: f64) -> Self {
        self.controller = self.controller.output_limits(output_min, output_max);
        self
    }

    pub fn turbulence(mut self, turbulence: TurbulenceConfig) -> Self {
        self.turbulence = turbulence;
        self
    }

    /// Makes thrusters respond to commands through a first-order lag with this time constant,
    /// in seconds.
    pub fn actuator_time_constant(mut self, time_constant: f64) -> Self {
        self.actuator_time_constant = Some(time_constant);
        self
    }

    pub fn initial_pose(mut self, initial_pose: Pose) -> Self {
        self.initial_pose = initial_pose;
        self
    }

    pub fn build(self) -> Result<SessionConfig, ConfigurationError> {
        body::validate_geometry(self.mass, self.arm_length, self.arm_angle_degrees)?;
        if !vector::is_finite(&self.gravity) {
            return Err(ConfigurationError::InvalidGravity);
        }
        let controller = self.controller.sample_time(self.tick_interval).build()?;
        self.turbulence.validate()?;
        if let Some(tc) = self.actuator_time_constant {
            if !tc.is_finite() || tc <= 0.0 {
                return Err(ConfigurationError::InvalidActuatorTimeConstant);
            }
        }
        Ok(SessionConfig {
            mass: self.mass,
            arm_length: self.arm_length,
            arm_angle_degrees: self.arm_angle_degrees,
            gravity: self.gravity,
            tick_interval: self.tick_interval,
            solver_mode: self.solver_mode,
            controller,
            turbulence: self.turbulence,
            actuator_time_constant: self.actuator_time_constant,
            initial_pose: self.initial_pose,
        })
    }
}

/// Everything published after one tick. Never mutated after publication.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StateSnapshot {
    /// Number of ticks completed since construction or the last restart.
    pub tick: u64,
    /// Simulated time in seconds.
    pub time: f64,
    pub body: BodyState,
    /// Net force applied during the tick, gravity and turbulence included.
    pub net_force: Vector3,
    /// The controller's disturbance acceleration estimate.
    pub disturbance_estimate: Vector3,
    /// Number of ticks on which the body orientation degenerated and was reset to identity.
    pub degenerate_orientation_events: u64,
}

/// Result of asking the session to tick.
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// The tick ran and published this snapshot.
    Completed(Arc<StateSnapshot>),
    /// Another tick was still running, so this one was skipped.
    Dropped,
    /// Less than one tick interval has passed since the previous tick.
    NotDue,
}

#[derive(Debug)]
struct SessionCore {
    body: RigidBody,
    solver: ThrustVectorSolver,
    turbulence: TurbulenceGenerator,
    gate: TickGate<Duration>,
    tick: u64,
    degenerate_events: u64,
}

/// Clears the in-progress flag when the tick ends, whichever way it ends.
struct TickGuard<'a>(&'a AtomicBool);

impl Drop for TickGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// A simulation run. Share it across threads with an `Arc`.
#[derive(Debug)]
pub struct SimulationSession {
    config: SessionConfig,
    target: Mutex<Option<Pose>>,
    core: Mutex<SessionCore>,
    ticking: AtomicBool,
    published: RwLock<Arc<StateSnapshot>>,
}

impl SimulationSession {
    /// Creates a session with the body at rest at the configured initial pose and no target.
    ///
    /// # Errors
    /// Any [`ConfigurationError`] from the body or turbulence parameters. Nothing is created on
    /// failure.
    pub fn new(config: SessionConfig) -> Result<Self, SimError> {
        let body = RigidBody::new(
            config.mass,
            config.arm_length,
            config.arm_angle_degrees,
            config.initial_pose,
        )?;
        let turbulence = TurbulenceGenerator::new(config.turbulence)?;
        let solver = ThrustVectorSolver::new(config.solver_mode, config.controller);
        let initial = Arc::new(StateSnapshot {
            tick: 0,
            time: 0.0,
            body: body.current_state(),
            net_force: Vector3::zeros(),
            disturbance_estimate: Vector3::zeros(),
            degenerate_orientation_events: 0,
        });

        info!(
            mass = config.mass,
            arm_length = config.arm_length,
            mode = ?config.solver_mode,
            tick_interval = ?config.tick_interval,
            turbulence = turbulence.is_enabled(),
            "Simulation session created"
        );

        Ok(Self {
            config,
            target: Mutex::new(None),
            core: Mutex::new(SessionCore {
                body,
                solver,
                turbulence,
                gate: TickGate::new(config.tick_interval),
                tick: 0,
                degenerate_events: 0,
            }),
            ticking: AtomicBool::new(false),
            published: RwLock::new(initial),
        })
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Replaces the target pose. Position and orientation are swapped in together.
    pub fn set_target(&self, position: Vector3, orientation: Orientation) {
        *self.target.lock() = Some(Pose::new(position, orientation));
    }

    /// Sets the target from an angle triple in degrees, applied about world X, then Y, then Z.
    pub fn set_target_euler_degrees(
        &self,
        position: Vector3,
        angles_degrees: Vector3,
    ) -> Result<(), SimError> {
        let orientation = Orientation::from_euler_degrees(&angles_degrees)?;
        self.set_target(position, orientation);
        Ok(())
    }

    /// Sets the target from raw quaternion components, normalized.
    ///
    /// # Errors
    /// [`SimError::DegenerateOrientation`] if the components cannot be normalized. The previous
    /// target is kept.
    pub fn set_target_components(
        &self,
        position: Vector3,
        components: [f64; 4],
    ) -> Result<(), SimError> {
        let [w, x, y, z] = components;
        let orientation = Orientation::from_components(w, x, y, z)?;
        self.set_target(position, orientation);
        Ok(())
    }

    /// The latest target pose, or `None` if none has been set.
    pub fn target(&self) -> Option<Pose> {
        *self.target.lock()
    }

    /// Adds an external force, consumed by the next tick.
    pub fn apply_force(&self, force: Vector3) {
        self.core.lock().body.apply_force(force);
    }

    pub fn set_thruster_enabled(&self, id: ThrusterId, enabled: bool) {
        self.core.lock().body.set_thruster_enabled(id, enabled);
    }

    pub fn set_turbulence_enabled(&self, enabled: bool) {
        self.core.lock().turbulence.set_enabled(enabled);
    }

    pub fn reseed_turbulence(&self, seed: u64) {
        self.core.lock().turbulence.reseed(seed);
    }

    /// The most recently published snapshot.
    pub fn snapshot(&self) -> Arc<StateSnapshot> {
        Arc::clone(&*self.published.read())
    }

    /// Runs one tick of simulated time now, regardless of when the previous tick ran.
    ///
    /// Returns [`TickOutcome::Dropped`] without doing anything if another tick is in progress.
    ///
    /// # Errors
    /// [`SimError::DegenerateOrientation`] if the target orientation is degenerate. The body,
    /// the observer and the turbulence stream are left as they were, and the stored target is
    /// not replaced.
    pub fn tick(&self) -> Result<TickOutcome, SimError> {
        let Some(_guard) = self.try_begin_tick() else {
            return Ok(TickOutcome::Dropped);
        };
        let mut core = self.core.lock();
        self.advance(&mut core)
    }

    /// Runs one tick if at least one tick interval has passed since the previous one.
    ///
    /// `now` is the time since any fixed epoch. A call before the interval has elapsed is a
    /// no-op returning [`TickOutcome::NotDue`]; a late call runs a single tick.
    pub fn tick_at(&self, now: Duration) -> Result<TickOutcome, SimError> {
        let Some(_guard) = self.try_begin_tick() else {
            return Ok(TickOutcome::Dropped);
        };
        let mut core = self.core.lock();
        if !core.gate.poll(now) {
            return Ok(TickOutcome::NotDue);
        }
        self.advance(&mut core)
    }

    /// Puts the body back at its initial pose at rest, clears the target and the disturbance
    /// estimate, and restarts the tick count.
    pub fn restart(&self) {
        let mut core = self.core.lock();
        *self.target.lock() = None;
        core.body.reset();
        core.solver.reset();
        core.turbulence.reset();
        core.gate.reset();
        core.tick = 0;
        core.degenerate_events = 0;
        *self.published.write() = Arc::new(StateSnapshot {
            tick: 0,
            time: 0.0,
            body: core.body.current_state(),
            net_force: Vector3::zeros(),
            disturbance_estimate: Vector3::zeros(),
            degenerate_orientation_events: 0,
        });
        info!("Simulation session restarted");
    }

    fn try_begin_tick(&self) -> Option<TickGuard<'_>> {
        if self
            .ticking
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            debug!("Previous tick still running, dropping this one");
            return None;
        }
        Some(TickGuard(&self.ticking))
    }

    fn advance(&self, core: &mut SessionCore) -> Result<TickOutcome, SimError> {
        let dt = self.config.tick_interval.as_secs_f64();

        let latest = *self.target.lock();
        match latest {
            Some(target) => {
                let orientation = target.orientation.checked()?;
                core.body.set_target(target.position, orientation);
            }
            None if core.body.target().is_none() => {
                debug!("No target set, holding the current pose");
                let hold = core.body.pose();
                core.body.set_target(hold.position, hold.orientation);
            }
            None => {}
        }

        // Nothing below may fail once turbulence has been drawn
        let command = core.solver.solve(&core.body)?;
        let external = self.config.gravity * self.config.mass + core.turbulence.sample();

        core.body.apply_force(external);
        core.body.set_thruster_targets(&command.targets);
        let forces = core
            .body
            .integrate(&command.forces, self.config.actuator_response(), dt);
        if forces.degenerate.is_some() {
            core.degenerate_events += 1;
        }
        core.tick += 1;

        let snapshot = Arc::new(StateSnapshot {
            tick: core.tick,
            time: core.tick as f64 * dt,
            body: core.body.current_state(),
            net_force: forces.net_force,
            disturbance_estimate: command.disturbance_estimate,
            degenerate_orientation_events: core.degenerate_events,
        });
        *self.published.write() = Arc::clone(&snapshot);

        debug!(
            tick = snapshot.tick,
            position = ?snapshot.body.position,
            error = snapshot.body.position_error(),
            "Tick complete"
        );
        Ok(TickOutcome::Completed(snapshot))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_session() -> SimulationSession {
        SimulationSession::new(SessionConfig::default()).unwrap()
    }

    #[test]
    fn test_overlapping_tick_is_dropped() {
        let session = make_session();
        session.ticking.store(true, Ordering::Release);
        assert_eq!(session.tick(), Ok(TickOutcome::Dropped));
        assert_eq!(session.snapshot().tick, 0);

        session.ticking.store(false, Ordering::Release);
        assert!(matches!(session.tick(), Ok(TickOutcome::Completed(_))));
        assert_eq!(session.snapshot().tick, 1);
    }

    #[test]
    fn test_guard_is_released_after_tick() {
        let session = make_session();
        assert!(session.tick().is_ok());
        assert!(!session.ticking.load(Ordering::Acquire));
    }

    #[test]
    fn test_tick_at_gates_on_interval() {
        let session = make_session();
        let ms = Duration::from_millis;
        assert!(matches!(session.tick_at(ms(0)), Ok(TickOutcome::Completed(_))));
        assert_eq!(session.tick_at(ms(10)), Ok(TickOutcome::NotDue));
        assert_eq!(session.tick_at(ms(29)), Ok(TickOutcome::NotDue));
        assert!(matches!(session.tick_at(ms(30)), Ok(TickOutcome::Completed(_))));
        // A long stall runs one tick, not a backlog
        assert!(matches!(session.tick_at(ms(300)), Ok(TickOutcome::Completed(_))));
        assert_eq!(session.tick_at(ms(310)), Ok(TickOutcome::NotDue));
        assert_eq!(session.snapshot().tick, 3);
    }

    #[test]
    fn test_actuator_response_fraction() {
        let config = SessionConfigBuilder::default()
            .tick_interval(Duration::from_millis(30))
            .actuator_time_constant(0.03)
            .build()
            .unwrap();
        assert_eq!(config.actuator_response(), Some(0.5));
        assert_eq!(SessionConfig::default().actuator_response(), None);
    }
}
