//! Task queue runner -- submission, draining and flushing.
//!
//! Split into focused submodules:
//! - `core`: TaskQueue handle, constructor, and accessor methods
//! - `submit`: submission protocol (merge, classify, insert, trigger)
//! - `drain`: the serial executor with per-task timeout races
//! - `giveup`: deferred replay of triggers that arrived while busy
//! - `flush`: forcing all pending and delayed work to completion

mod core;
mod drain;
mod flush;
mod giveup;
mod submit;

pub use self::core::TaskQueue;
