//! Core systems for Partscope.
//!
//! This crate provides the foundation the catalog engine is built on:
//!
//! - **Signal/Slot System**: synchronous, ordered change notification
//! - **Property System**: value cells with change detection
//! - **Timers**: cancellable single-shot timers for debouncing
//! - **Record Model**: catalog records and shared immutable record sets
//!
//! # Signal/Slot Example
//!
//! ```
//! use partscope_core::Signal;
//!
//! let selection_changed = Signal::<Option<i64>>::new();
//!
//! let conn_id = selection_changed.connect(|id| {
//!     println!("Selected: {:?}", id);
//! });
//!
//! selection_changed.emit(Some(42));
//! selection_changed.disconnect(conn_id);
//! ```
//!
//! # Record Example
//!
//! ```
//! use partscope_core::{Record, RecordId, RecordSet};
//!
//! let records = RecordSet::new(vec![
//!     Record::new(1, "Brake Caliper Assembly"),
//!     Record::new(2, "Throttle Body"),
//! ]);
//! assert_eq!(records.position_of(&RecordId::Int(2)), Some(1));
//! ```

mod error;
pub mod logging;
pub mod property;
pub mod record;
pub mod signal;
mod timer;

pub use error::{CoreError, Result, TimerError};
pub use logging::PerfSpan;
pub use property::{Property, ReadOnlyProperty};
pub use record::{Category, Record, RecordId, RecordSet, Relationship, Supplier};
pub use signal::{ConnectionGuard, ConnectionId, Signal};
pub use timer::{SingleShotTimer, TimerId};
