//! Single-threaded wait-set reactor
//!
//! One cycle:
//!
//! ```text
//! registry counts ──► WaitSet::build ──► clear ──► add (subs, services,
//!                                                  clients, guards)
//!                                                       │
//!                     ◄── TimedOut ──── wait(timeout) ◄─┘
//!                                          │ Ready
//!                                          ▼
//!            for each ready slot, in category order: take ─► callback
//!                                                     (─► send response)
//! ```
//!
//! The wait set and the correlation token are created per cycle and released
//! on every exit path.

mod dispatcher;
mod token;
mod wait_set;

pub use dispatcher::{DispatchSummary, Dispatcher, SpinOutcome};
pub use token::CorrelationToken;
pub use wait_set::{SlotIndex, WaitSet};

use std::time::Duration;

/// Timeout used by [`Dispatcher::run_forever`] unless configured otherwise.
pub const DEFAULT_SPIN_TIMEOUT: Duration = Duration::from_millis(500);
