//! Event routing and in-flight task accounting.
//!
//! ```text
//! gateway ──► webhook task ──► EventRouter::dispatch ──┬──► plugin task (supervised)
//!                                                      ├──► plugin task (supervised)
//!                                                      └──► ...
//! ```
//!
//! Every task above is spawned on the shared [`InFlightTasks`], which the
//! gateway drains on shutdown.

mod inflight;
mod router;

pub use inflight::InFlightTasks;
pub use router::{DispatchError, EventRouter, PluginFailure, run_supervised};
