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


use fixtures::test_session::make_session;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use quad_adrc::orientation::Orientation;
use quad_adrc::scheduler::Scheduler;
use quad_adrc::session::{SessionConfigBuilder, SimulationSession, TickOutcome};
use quad_adrc::solver::SolverMode;
use quad_adrc::vector::Vector3;

/// A reader never sees the position of one update paired with the orientation of another
#[test]
fn test_target_updates_are_atomic() {
    let session = Arc::new(make_session(SolverMode::Individual));
    let turned = Orientation::from_axis_angle(&Vector3::y(), 1.0).unwrap();
    let poses = [
        (Vector3::new(1.0, 0.0, 0.0), turned),
        (Vector3::new(-1.0, 0.0, 0.0), Orientation::identity()),
    ];
    let done = Arc::new(AtomicBool::new(false));

    let writer = {
        let session = Arc::clone(&session);
        let done = Arc::clone(&done);
        thread::spawn(move || {
            let mut k = 0usize;
            while !done.load(Ordering::Relaxed) {
                let (position, orientation) = poses[k % 2];
                session.set_target(position, orientation);
                k += 1;
            }
        })
    };

    let ticker = {
        let session = Arc::clone(&session);
        let done = Arc::clone(&done);
        thread::spawn(move || {
            while !done.load(Ordering::Relaxed) {
                let _ = session.tick();
            }
        })
    };

    for _ in 0..20_000 {
        if let Some(target) = session.target() {
            assert!(poses
                .iter()
                .any(|(p, q)| target.position == *p && target.orientation == *q));
        }
        if let Some(target) = session.snapshot().body.target {
            assert!(poses
                .iter()
                .any(|(p, q)| target.position == *p && target.orientation == *q));
        }
    }
    done.store(true, Ordering::Relaxed);
    writer.join().unwrap();
    ticker.join().unwrap();
}

/// A snapshot handed out before a tick is unchanged by that tick
#[test]
fn test_published_snapshots_are_immutable() {
    let session = make_session(SolverMode::Combined);
    session.set_target(Vector3::new(0.0, 1.0, 0.0), Orientation::identity());
    let before = session.snapshot();
    let copy = *before;
    for _ in 0..10 {
        session.tick().unwrap();
    }
    assert_eq!(*before, copy);
    assert_eq!(session.snapshot().tick, 10);
}

/// Ticks racing from several threads never overlap: each one either completes or is dropped,
/// and the tick counter matches the number completed
#[test]
fn test_racing_ticks_never_overlap() {
    let session = Arc::new(make_session(SolverMode::Individual));
    session.set_target(Vector3::new(0.0, 1.0, 0.0), Orientation::identity());

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let session = Arc::clone(&session);
            thread::spawn(move || {
                let mut completed = 0u64;
                let mut dropped = 0u64;
                for _ in 0..200 {
                    match session.tick() {
                        Ok(TickOutcome::Completed(_)) => completed += 1,
                        Ok(TickOutcome::Dropped) => dropped += 1,
                        other => panic!("Unexpected tick outcome {other:?}"),
                    }
                }
                (completed, dropped)
            })
        })
        .collect();

    let (completed, dropped) = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .fold((0, 0), |(c, d), (c2, d2)| (c + c2, d + d2));
    assert_eq!(completed + dropped, 800);
    assert_eq!(session.snapshot().tick, completed);
}

#[test]
fn test_scheduler_ticks_until_stopped() {
    let config = SessionConfigBuilder::default()
        .tick_interval(Duration::from_millis(5))
        .build()
        .unwrap();
    let session = Arc::new(SimulationSession::new(config).unwrap());
    session.set_target(Vector3::new(0.0, 1.0, 0.0), Orientation::identity());

    let started = std::time::Instant::now();
    let scheduler = Scheduler::spawn(Arc::clone(&session), None).unwrap();
    thread::sleep(Duration::from_millis(100));
    assert!(!scheduler.is_finished());
    let report = scheduler.stop();
    let elapsed_ms = started.elapsed().as_millis() as u64;

    assert!(report.completed > 0);
    assert_eq!(report.failed, 0);
    let ticks = session.snapshot().tick;
    assert_eq!(ticks, report.completed);
    // No catch-up: never more ticks than intervals elapsed, plus the first one
    assert!(ticks <= elapsed_ms / 5 + 1, "{ticks} ticks in {elapsed_ms}ms");

    // Stopped means stopped
    thread::sleep(Duration::from_millis(30));
    assert_eq!(session.snapshot().tick, ticks);
}

#[test]
fn test_scheduler_run_time_ends_run() {
    let config = SessionConfigBuilder::default()
        .tick_interval(Duration::from_millis(5))
        .build()
        .unwrap();
    let session = Arc::new(SimulationSession::new(config).unwrap());
    let scheduler =
        Scheduler::spawn(Arc::clone(&session), Some(Duration::from_millis(50))).unwrap();
    let report = scheduler.join();
    assert!(report.completed > 0);
    assert!(report.completed <= 50 / 5 + 1);
}

/// Stopping a scheduler that waits on a long interval returns promptly
#[test]
fn test_scheduler_stop_interrupts_wait() {
    let config = SessionConfigBuilder::default()
        .tick_interval(Duration::from_secs(30))
        .build()
        .unwrap();
    let session = Arc::new(SimulationSession::new(config).unwrap());
    let scheduler = Scheduler::spawn(Arc::clone(&session), None).unwrap();
    thread::sleep(Duration::from_millis(20));

    let started = std::time::Instant::now();
    let report = scheduler.stop();
    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(report.completed, 1);
}
