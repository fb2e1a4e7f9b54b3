// Fixed-cadence tick driver
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

use core::time::Duration;
use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{bounded, RecvTimeoutError, Sender};
use tracing::{info, warn};

use crate::session::{SimulationSession, TickOutcome};
use crate::time::{InstantLike, StdInstant, TickGate};

/// Tick counts of a finished scheduler run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerReport {
    pub completed: u64,
    pub dropped: u64,
    pub failed: u64,
}

/// Ticks a session on a background thread once per tick interval of wall-clock time.
///
/// A tick that starts late is not made up for; the next one is due one interval after the late
/// start. Stopping interrupts the wait between ticks but never a tick in progress.
#[derive(Debug)]
pub struct Scheduler {
    stop: Sender<()>,
    handle: Option<JoinHandle<SchedulerReport>>,
}

impl Scheduler {
    /// Starts ticking `session`. With a `run_time` the thread stops by itself once that much
    /// wall-clock time has passed.
    pub fn spawn(session: Arc<SimulationSession>, run_time: Option<Duration>) -> io::Result<Self> {
        let (stop, stopped) = bounded::<()>(1);
        let handle = thread::Builder::new()
            .name("quad-adrc-ticker".into())
            .spawn(move || {
                let interval = session.config().tick_interval();
                let mut gate = TickGate::new(interval);
                let mut report = SchedulerReport::default();
                let started = StdInstant::now();
                info!(?interval, ?run_time, "Scheduler started");

                loop {
                    let now = StdInstant::now();
                    let elapsed = now.duration_since(started);
                    if run_time.is_some_and(|limit| elapsed >= limit) {
                        break;
                    }

                    if gate.poll(now) {
                        match session.tick() {
                            Ok(TickOutcome::Completed(_)) => report.completed += 1,
                            Ok(TickOutcome::Dropped) => report.dropped += 1,
                            Ok(TickOutcome::NotDue) => {}
                            Err(err) => {
                                warn!(%err, "Tick failed");
                                report.failed += 1;
                            }
                        }
                    }

                    let now = StdInstant::now();
                    let mut wait = gate.remaining(now);
                    if let Some(limit) = run_time {
                        wait = wait.min(limit.saturating_sub(now.duration_since(started)));
                    }
                    match stopped.recv_timeout(wait) {
                        Err(RecvTimeoutError::Timeout) => {}
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                }

                info!(
                    completed = report.completed,
                    dropped = report.dropped,
                    failed = report.failed,
                    "Scheduler stopped"
                );
                report
            })?;

        Ok(Self {
            stop,
            handle: Some(handle),
        })
    }

    /// Whether the ticking thread has exited.
    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Signals the thread to stop, waits for it and returns its report.
    pub fn stop(mut self) -> SchedulerReport {
        let _ = self.stop.try_send(());
        self.finish()
    }

    /// Waits for a time-limited run to end. Blocks forever if no run time was given.
    pub fn join(mut self) -> SchedulerReport {
        self.finish()
    }

    fn finish(&mut self) -> SchedulerReport {
        match self.handle.take().map(JoinHandle::join) {
            Some(Ok(report)) => report,
            Some(Err(_)) => {
                warn!("Scheduler thread panicked");
                SchedulerReport::default()
            }
            None => SchedulerReport::default(),
        }
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        if self.handle.is_some() {
            let _ = self.stop.try_send(());
            self.finish();
        }
    }
}
