//! Value types shared by the store interfaces and the index engine.

pub mod cell;
pub mod clock;
pub mod column;
pub mod mutation;

pub use cell::{Cell, CellKind, LATEST_TIMESTAMP, TimeRange, Timestamp, descending_order};
pub use clock::{Clock, FixedClock, ManualClock, SystemClock};
pub use column::{ColumnReference, Qualifier};
pub use mutation::{Mutation, TimestampBatch};
