//! Market-structure detectors
//!
//! Each detector is a pure function over a full bar series, returning only
//! the entities still live at the end of the series.
//!
//! # Detectors
//!
//! - **Swing structure**: pivot highs/lows labelled HH/LH/HL/LL
//! - **Fair value gaps**: unfilled three-bar imbalances
//! - **Order blocks**: impulse zones with a Standard/Breaker/Mitigated lifecycle

pub mod helpers;

pub mod fvg;
pub mod order_block;
pub mod structure;

// Re-export all detectors for convenience
pub use fvg::*;
pub use helpers::Session;
pub use order_block::*;
pub use structure::*;
