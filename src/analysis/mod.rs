pub mod clustering;
pub mod features;
pub mod indicators;
pub mod levels;
pub mod signals;
pub mod swings;

pub use clustering::build_zones;
pub use features::{Rejection, TrendContext};
pub use levels::build_levels;
pub use signals::{compose_signals, Signals};
pub use swings::detect_structure;
