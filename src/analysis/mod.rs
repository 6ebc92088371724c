//! Analysis core: stat computation, strategy ranking, and allocation.

pub mod allocator;
pub mod ranker;
pub mod stats;

pub use allocator::allocate;
pub use ranker::{rank, rank_by_name};
pub use stats::compute_stats;
