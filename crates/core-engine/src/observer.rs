//! Observer hooks invoked by the scheduler between phases.
//!
//! Implementations live outside the engine (CSV reporter, genome dumper,
//! terminal viewer). Methods default to no-ops so an observer implements
//! only the callbacks it cares about. Observers must not block for long
//! and must not draw from the engine's PRNG; they receive shared
//! references only, so the type system already rules out mutation.

use crate::Report;
use core_pond::{Census, Pond};

/// Continue or stop the run; returned by the refresh callback, which is
/// the only cancellation point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Continue,
    Stop,
}

pub trait Observer {
    /// A report boundary was reached. Counters in `report` are zeroed by
    /// the engine after all observers have been called.
    fn on_report(&mut self, clock: u64, report: &Report) {
        let _ = (clock, report);
    }

    /// Frame pacing and input polling. Return [`Control::Stop`] to end
    /// the run.
    fn on_refresh(&mut self, clock: u64, pond: &Pond, census: &Census) -> Control {
        let _ = (clock, pond, census);
        Control::Continue
    }

    /// A dump boundary was reached (also fired once on a `stop_at` exit).
    fn on_dump(&mut self, clock: u64, pond: &Pond) {
        let _ = (clock, pond);
    }
}

/// Forwarding impl so callers can register borrowed observers and keep
/// ownership (a recorder inspected after the run, for instance).
impl<O: Observer + ?Sized> Observer for &mut O {
    fn on_report(&mut self, clock: u64, report: &Report) {
        (**self).on_report(clock, report);
    }

    fn on_refresh(&mut self, clock: u64, pond: &Pond, census: &Census) -> Control {
        (**self).on_refresh(clock, pond, census)
    }

    fn on_dump(&mut self, clock: u64, pond: &Pond) {
        (**self).on_dump(clock, pond);
    }
}

/// Observer that does nothing; useful as a placeholder in tests and
/// benches.
pub struct NoopObserver;

impl Observer for NoopObserver {}
