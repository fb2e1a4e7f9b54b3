//! Flies the quadcopter through a fixed tour of poses in real time and writes the trajectory to
//! a CSV file.
//!
//! Usage: `cargo run --example waypoint_tour -- [output.csv] [--combined] [--calm]`
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

use std::fs::{create_dir_all, File};
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use quad_adrc::scheduler::Scheduler;
use quad_adrc::session::{SessionConfigBuilder, SimulationSession, StateSnapshot};
use quad_adrc::solver::SolverMode;
use quad_adrc::thruster::ThrusterId;
use quad_adrc::turbulence::TurbulenceConfig;
use tracing::info;
use tracing_subscriber::EnvFilter;

struct Waypoint {
    position: [f64; 3],
    /// Degrees about world X, then Y, then Z
    rotation: [f64; 3],
    hold: Duration,
}

const TOUR: [Waypoint; 5] = [
    Waypoint {
        position: [1.0, -1.0, 1.2],
        rotation: [0.0, 0.0, 0.0],
        hold: Duration::from_millis(3000),
    },
    Waypoint {
        position: [-1.0, 0.0, 1.2],
        rotation: [60.0, 0.0, 0.0],
        hold: Duration::from_millis(3000),
    },
    Waypoint {
        position: [1.0, 1.0, -1.2],
        rotation: [0.0, 60.0, 0.0],
        hold: Duration::from_millis(3500),
    },
    Waypoint {
        position: [-1.0, -1.0, -1.2],
        rotation: [0.0, 0.0, 60.0],
        hold: Duration::from_millis(3000),
    },
    Waypoint {
        position: [0.0, 0.0, 0.0],
        rotation: [30.0, 60.0, 90.0],
        hold: Duration::from_millis(3000),
    },
];

/// The rear-left thruster fails while the body holds the third waypoint
const FAILURE_AT: Duration = Duration::from_millis(7000);
const RECORD_PERIOD: Duration = Duration::from_millis(5);

fn make_session(mode: SolverMode, turbulent: bool) -> SimulationSession {
    let config = SessionConfigBuilder::default()
        .solver_mode(mode)
        .turbulence(TurbulenceConfig {
            max_magnitude: 4.0,
            seed: Some(2025),
            enabled: turbulent,
            ..TurbulenceConfig::default()
        })
        .actuator_time_constant(0.01)
        .build()
        .expect("Incorrect constant in example: session config. Notify developer.");
    SimulationSession::new(config)
        .expect("Incorrect constant in example: session config. Notify developer.")
}

/// Writes the tour's targets one after another, like a host UI would.
fn spawn_sequencer(session: Arc<SimulationSession>) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let mut elapsed = Duration::ZERO;
        let mut failed = false;
        for waypoint in &TOUR {
            session
                .set_target_euler_degrees(waypoint.position.into(), waypoint.rotation.into())
                .expect("Incorrect constant in example: waypoint. Notify developer.");
            info!(position = ?waypoint.position, rotation = ?waypoint.rotation, "Target set");

            let mut remaining = waypoint.hold;
            if !failed && elapsed + remaining > FAILURE_AT {
                let before = FAILURE_AT - elapsed;
                thread::sleep(before);
                session.set_thruster_enabled(ThrusterId::RearLeft, false);
                failed = true;
                remaining -= before;
            }
            thread::sleep(remaining);
            elapsed += waypoint.hold;
        }
    })
}

fn write_results(path: &PathBuf, history: &[Arc<StateSnapshot>]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        create_dir_all(parent)?;
    }
    let mut file = BufWriter::new(File::create(path)?);
    write!(
        file,
        "tick,time,x,y,z,qw,qx,qy,qz,tx,ty,tz,error,dx,dy,dz,fx,fy,fz"
    )?;
    for id in ThrusterId::ALL {
        write!(file, ",{id}-outer,{id}-rotor,{id}-inner")?;
    }
    writeln!(file)?;
    for snapshot in history {
        let body = &snapshot.body;
        let target = body.target.map(|t| t.position).unwrap_or(body.position);
        let [qw, qx, qy, qz] = body.orientation.components();
        write!(
            file,
            "{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{}",
            snapshot.tick,
            snapshot.time,
            body.position.x,
            body.position.y,
            body.position.z,
            qw,
            qx,
            qy,
            qz,
            target.x,
            target.y,
            target.z,
            body.position_error().unwrap_or(f64::NAN),
            snapshot.disturbance_estimate.x,
            snapshot.disturbance_estimate.y,
            snapshot.disturbance_estimate.z,
            snapshot.net_force.x,
            snapshot.net_force.y,
            snapshot.net_force.z,
        )?;
        for thruster in &body.thrusters {
            let output = &thruster.output;
            write!(
                file,
                ",{},{},{}",
                output.outer_degrees, output.rotor, output.inner_degrees
            )?;
        }
        writeln!(file)?;
    }
    file.flush()
}

pub fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let mut output = PathBuf::from("output/waypoint_tour.csv");
    let mut mode = SolverMode::Individual;
    let mut turbulent = true;
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--combined" => mode = SolverMode::Combined,
            "--calm" => turbulent = false,
            path => output = PathBuf::from(path),
        }
    }

    let session = Arc::new(make_session(mode, turbulent));
    let tour_length: Duration = TOUR.iter().map(|w| w.hold).sum();
    let scheduler = Scheduler::spawn(Arc::clone(&session), Some(tour_length))
        .expect("Failed to start the scheduler thread");
    let sequencer = spawn_sequencer(Arc::clone(&session));

    let mut history: Vec<Arc<StateSnapshot>> = Vec::new();
    while !scheduler.is_finished() {
        let snapshot = session.snapshot();
        if history.last().map_or(true, |last| last.tick != snapshot.tick) {
            history.push(snapshot);
        }
        thread::sleep(RECORD_PERIOD);
    }

    let report = scheduler.join();
    sequencer.join().expect("Sequencer thread panicked");
    info!(
        completed = report.completed,
        dropped = report.dropped,
        recorded = history.len(),
        "Tour finished"
    );

    println!("Writing results to {}", output.display());
    write_results(&output, &history).expect("Failed to write results");
}
