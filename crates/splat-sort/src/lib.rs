//! Asynchronous depth sorter (§2 component 5, §4.4).
//!
//! Owns the triple-buffered, ref-counted sort-index ring and the dedicated
//! sort thread that keeps it up to date with the latest camera pose and
//! enabled-chunk set, so that render frames never block on sorting.

pub mod sorter;

pub use sorter::{AsyncSorter, SortedIndices};
