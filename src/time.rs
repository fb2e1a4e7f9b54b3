// Defines a trait for time-like objects and the gate that paces simulation ticks
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

use core::fmt::Debug;
use core::ops::Add;
use core::time::Duration;

/// A trait for time-like objects that can be used to measure elapsed time.
/// The [`TickGate`] uses this trait to measure elapsed time and compare it to the tick interval,
/// letting a tick through only if the elapsed time is at least one interval.
pub trait InstantLike:
    Sized + Add<Duration, Output = Self> + Clone + Copy + Debug + PartialEq<Self> + Send + Sync
{
    /// Returns the amount of time elapsed from another instant to this one, saturating at zero
    #[must_use]
    fn duration_since(&self, earlier: Self) -> Duration;
}

/// Time elapsed since an arbitrary epoch, such as the start of a session.
impl InstantLike for Duration {
    fn duration_since(&self, earlier: Self) -> Duration {
        self.saturating_sub(earlier)
    }
}

/// A convenient wrapper around `std::time::Instant` satisfying the `InstantLike` trait.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StdInstant(pub std::time::Instant);

impl StdInstant {
    pub fn now() -> Self {
        StdInstant(std::time::Instant::now())
    }
}

impl InstantLike for StdInstant {
    fn duration_since(&self, other: Self) -> Duration {
        self.0.saturating_duration_since(other.0)
    }
}

impl Add<Duration> for StdInstant {
    type Output = Self;

    fn add(self, rhs: Duration) -> Self::Output {
        StdInstant(self.0 + rhs)
    }
}

/// Paces ticks at a fixed interval without catch-up.
///
/// A tick is due once one interval has elapsed since the start of the previous tick. Polling
/// before that is a no-op. When a tick starts late, the next one is measured from the late start,
/// so a slow tick delays its successors instead of building a backlog.
#[derive(Debug, Clone, Copy)]
pub struct TickGate<I: InstantLike> {
    interval: Duration,
    last_tick: Option<I>,
}

impl<I: InstantLike> TickGate<I> {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_tick: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// The start time of the last tick let through, or `None` if no tick has run.
    pub fn last_tick(&self) -> Option<I> {
        self.last_tick
    }

    /// Time left until the next tick is due; zero if it is due already.
    pub fn remaining(&self, now: I) -> Duration {
        match self.last_tick {
            None => Duration::ZERO,
            Some(last) => self.interval.saturating_sub(now.duration_since(last)),
        }
    }

    /// Returns `true` and records `now` as the tick start if a tick is due.
    pub fn poll(&mut self, now: I) -> bool {
        if !self.remaining(now).is_zero() {
            return false;
        }
        self.last_tick = Some(now);
        true
    }

    /// Forgets the last tick so the next poll lets a tick through.
    pub fn reset(&mut self) {
        self.last_tick = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(millis: u64) -> Duration {
        Duration::from_millis(millis)
    }

    /// Tests that StdInstant is just one constructor call away from std::time::Instant
    /// and calling duration_since is equivalent to calling the same method on the underlying Instant.
    #[test]
    fn test_std_instant_wrapper() {
        let start = StdInstant::now();
        let end = StdInstant(std::time::Instant::now());
        let result = end.duration_since(start);
        let expected = end.0.duration_since(start.0);
        assert_eq!(result, expected);
    }

    #[test]
    fn test_earlier_instants_saturate_to_zero() {
        assert_eq!(ms(10).duration_since(ms(20)), Duration::ZERO);
        let now = StdInstant::now();
        assert_eq!(now.duration_since(now + Duration::from_secs(1)), Duration::ZERO);
    }

    #[test]
    fn test_gate_lets_first_poll_through() {
        let mut gate = TickGate::new(Duration::from_millis(30));
        assert!(gate.poll(ms(1000)));
        assert_eq!(gate.last_tick(), Some(ms(1000)));
    }

    #[test]
    fn test_gate_is_noop_before_one_interval() {
        let mut gate = TickGate::new(Duration::from_millis(30));
        assert!(gate.poll(ms(0)));
        assert!(!gate.poll(ms(10)));
        assert!(!gate.poll(ms(29)));
        assert_eq!(gate.remaining(ms(29)), Duration::from_millis(1));
        assert!(gate.poll(ms(30)));
    }

    /// A late tick is measured from its own start: one tick runs, and the missed ones are not
    /// replayed
    #[test]
    fn test_gate_does_not_catch_up() {
        let mut gate = TickGate::new(Duration::from_millis(30));
        assert!(gate.poll(ms(0)));

        // Three intervals late
        assert!(gate.poll(ms(100)));
        assert!(!gate.poll(ms(101)));
        assert!(!gate.poll(ms(129)));
        assert!(gate.poll(ms(130)));
    }
}
