//! Domain model: value types describing the target.
//!
//! - **`region`** – [`region::MemoryRegion`] and [`region::MemoryType`], the
//!   address-space layout the agent reports.

pub mod region;
