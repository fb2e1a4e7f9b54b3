//! # ADRC Quadcopter Simulation
//!
//! This library simulates a quadcopter flown by an Active Disturbance Rejection Controller
//! (ADRC). A rigid body with four thrusters in an X planform is driven tick by tick from its
//! current pose toward a target pose under gravity and stochastic turbulence, while the
//! controller estimates and cancels whatever acceleration it does not model.
//!
//! ## Features
//!
//! - Two ways of solving for thruster forces:
//!   - **Individual**: every thruster tracks its own target point.
//!   - **Combined**: one force and one torque at the body center, split across the thrusters.
//!
//! - An extended-state observer per translational axis, so gravity, turbulence and lost
//!   thrusters are rejected without being modeled.
//!
//! - Thread-safe sessions:
//!   - Targets may be written from any thread at any cadence. Position and orientation are
//!     always read as a pair.
//!   - Each tick publishes an immutable snapshot.
//!   - A tick requested while another runs is dropped, never queued.
//!
//! - Explicit support for **discrete-time** pacing:
//!   - `tick_at` is a no-op if called before one tick interval has elapsed, and never catches
//!     up on missed ticks.
//!   - A cancellable [`scheduler::Scheduler`] drives a session in real time.
//!
//! - Failure injection by disabling thrusters, and seedable turbulence for reproducible runs.
//!
//! ## Usage
//!
//! ### Stepping a session by hand
//!
//! ```rust
//! use quad_adrc::orientation::Orientation;
//! use quad_adrc::session::{SessionConfigBuilder, SimulationSession};
//! use quad_adrc::vector::Vector3;
//!
//! let config = SessionConfigBuilder::default()
//!     .mass(1.2)
//!     .gains(16.0, 8.0)
//!     .build()
//!     .expect("Invalid session config");
//! let session = SimulationSession::new(config).expect("Invalid session");
//!
//! session.set_target(Vector3::new(1.0, -1.0, 1.2), Orientation::identity());
//! for _ in 0..500 {
//!     session.tick().expect("Tick failed");
//! }
//!
//! let snapshot = session.snapshot();
//! assert!(snapshot.body.position_error().unwrap() < 0.05);
//! ```
//!
//! ### Driving a session in real time
//!
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use quad_adrc::scheduler::Scheduler;
//! use quad_adrc::session::{SessionConfig, SimulationSession};
//! use quad_adrc::vector::Vector3;
//!
//! let session = Arc::new(SimulationSession::new(SessionConfig::default()).unwrap());
//! let scheduler = Scheduler::spawn(Arc::clone(&session), None).unwrap();
//!
//! // Targets can be written from any thread while the scheduler ticks
//! session
//!     .set_target_euler_degrees(Vector3::new(0.0, 1.0, 0.0), Vector3::new(0.0, 90.0, 0.0))
//!     .unwrap();
//! std::thread::sleep(Duration::from_millis(100));
//!
//! let report = scheduler.stop();
//! assert_eq!(report.failed, 0);
//! ```
//!
//! ## License
//!
//! MIT

/// Per-axis ADRC control law and its configuration.
pub mod adrc;

/// The rigid body, its poses and its read-only state views.
pub mod body;

pub mod error;

/// Unit-quaternion attitude.
pub mod orientation;

/// Real-time tick driver.
pub mod scheduler;

pub mod session;

/// Conversion of a target pose into thruster forces.
pub mod solver;

pub mod thruster;

/// Clock abstraction and tick pacing.
pub mod time;

/// Bounded stochastic disturbance force.
pub mod turbulence;

pub mod vector;

#[doc = include_str!("../README.md")]
#[cfg(doctest)]
pub struct ReadmeDoctests;
