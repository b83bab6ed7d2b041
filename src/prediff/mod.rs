//! Pre-diff planning: deciding, per matched entry pair, whether to
//! uncompress both sides, one side, or neither, with a typed explanation
//! (§4.4).

pub mod limiter;
pub mod plan;
pub mod planner;

pub use limiter::{apply_limiter, RecompressionBudget, DEFAULT_RECOMPRESSION_LIMIT_BYTES};
pub use plan::{Explanation, PreDiffPlanEntry, UncompressionOption};
pub use planner::{build_plan, DivinationMap};
