//! Parameter metadata for configurable detectors
//!
//! This module describes the numeric knobs detectors expose, enabling:
//! - Parameter documentation
//! - Construction from loosely-typed key/value configuration
//! - Range validation before a detector is built
//!
//! # Example
//!
//! ```rust
//! use std::collections::HashMap;
//! use smcd::params::ParameterizedDetector;
//! use smcd::prelude::*;
//!
//! for param in SwingDetector::param_meta() {
//!     println!("{}: {:?} (default: {})", param.name, param.param_type, param.default);
//! }
//!
//! let mut params = HashMap::new();
//! params.insert("swing_lookback", 3.0);
//! let detector = SwingDetector::with_params(&params).unwrap();
//! assert_eq!(detector.lookback.get(), 3);
//! ```

use std::collections::HashMap;

use crate::{AnalysisError, Multiplier, Period, Result};

// ============================================================
// PARAMETER TYPES
// ============================================================

/// Type of parameter value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
  /// Positive integer bar count
  Period,
  /// Finite value > 0
  Multiplier,
}

/// Metadata for a single detector parameter
#[derive(Debug, Clone)]
pub struct ParamMeta {
  /// Parameter name (e.g., "swing_lookback")
  pub name: &'static str,
  pub param_type: ParamType,
  pub default: f64,
  /// Accepted range: (min, max), inclusive
  pub range: (f64, f64),
  pub description: &'static str,
}

impl ParamMeta {
  pub const fn period(name: &'static str, default: f64, range: (f64, f64), description: &'static str) -> Self {
    Self { name, param_type: ParamType::Period, default, range, description }
  }

  pub const fn multiplier(
    name: &'static str,
    default: f64,
    range: (f64, f64),
    description: &'static str,
  ) -> Self {
    Self { name, param_type: ParamType::Multiplier, default, range, description }
  }

  /// Validate a value for this parameter
  pub fn validate(&self, value: f64) -> Result<()> {
    let (min, max) = self.range;
    if value.is_nan() || value < min || value > max {
      return Err(AnalysisError::OutOfRange { field: self.name, value, min, max });
    }
    match self.param_type {
      ParamType::Period => {
        if value.fract() != 0.0 {
          return Err(AnalysisError::InvalidValue("Period must be a positive integer"));
        }
        Ok(())
      },
      ParamType::Multiplier => Ok(()),
    }
  }
}

// ============================================================
// PARAMETERIZED DETECTOR TRAIT
// ============================================================

/// Trait for detectors that can be built from key/value parameters
pub trait ParameterizedDetector: Sized {
  /// Returns metadata for all configurable parameters
  fn param_meta() -> &'static [ParamMeta];

  /// Creates a detector with parameters from a HashMap
  ///
  /// Missing parameters use their default values.
  fn with_params(params: &HashMap<&str, f64>) -> Result<Self>;

  fn detector_id_str() -> &'static str;

  /// Validate every supplied parameter this detector knows about
  fn validate_params(params: &HashMap<&str, f64>) -> Result<()> {
    for meta in Self::param_meta() {
      if let Some(&value) = params.get(meta.name) {
        meta.validate(value)?;
      }
    }
    Ok(())
  }
}

// ============================================================
// PARAMETER VALUE HELPERS
// ============================================================

/// Helper to get a Period from params with default fallback
pub fn get_period(params: &HashMap<&str, f64>, key: &str, default: usize) -> Result<Period> {
  let value = params.get(key).copied().unwrap_or(default as f64);
  if value.is_nan() || value < 1.0 || value.fract() != 0.0 {
    return Err(AnalysisError::InvalidValue("Period must be a positive integer"));
  }
  Period::new(value as usize)
}

/// Helper to get a Multiplier from params with default fallback
pub fn get_multiplier(params: &HashMap<&str, f64>, key: &str, default: f64) -> Result<Multiplier> {
  let value = params.get(key).copied().unwrap_or(default);
  Multiplier::new(value)
}

// ============================================================
// TESTS
// ============================================================
