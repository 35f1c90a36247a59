//! Market-data response boundary
//!
//! Raw provider payloads become a clean, ascending, timestamp-unique bar
//! series here, or a single [`AnalysisError::DataUnavailable`]. Nothing
//! malformed reaches the detectors.

use tracing::warn;

use crate::{AnalysisError, Bar, OHLCExt, Result};

fn unavailable(reason: String) -> AnalysisError {
  warn!(%reason, "market data rejected");
  AnalysisError::DataUnavailable(reason)
}

/// Parse a JSON array of bars (`time` or `timestamp`, `open`, `high`, `low`, `close`).
pub fn parse_bars(json: &str) -> Result<Vec<Bar>> {
  let value: serde_json::Value = serde_json::from_str(json).map_err(|e| unavailable(e.to_string()))?;
  if !value.is_array() {
    return Err(unavailable("response is not a sequence of bars".to_string()));
  }

  let bars: Vec<Bar> = serde_json::from_value(value).map_err(|e| unavailable(e.to_string()))?;
  for (index, bar) in bars.iter().enumerate() {
    bar.validate().map_err(|e| unavailable(format!("bar {index}: {e}")))?;
  }

  Ok(normalize(bars))
}

/// Sort ascending by timestamp and drop duplicates, keeping the last
/// occurrence of each timestamp.
pub fn normalize(mut bars: Vec<Bar>) -> Vec<Bar> {
  bars.sort_by_key(|b| b.timestamp);

  let mut out: Vec<Bar> = Vec::with_capacity(bars.len());
  for bar in bars {
    match out.last_mut() {
      Some(last) if last.timestamp == bar.timestamp => *last = bar,
      _ => out.push(bar),
    }
  }
  out
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_parse_valid_series() {
    let json = r#"[
      {"time": 120, "open": 2.0, "high": 3.0, "low": 1.5, "close": 2.5},
      {"time": 60, "open": 1.0, "high": 2.0, "low": 0.5, "close": 1.5},
      {"timestamp": 120, "open": 2.0, "high": 3.5, "low": 1.5, "close": 3.0}
    ]"#;
    let bars = parse_bars(json).unwrap();
    assert_eq!(bars.len(), 2);
    assert_eq!(bars[0].timestamp, 60);
    assert_eq!(bars[1].timestamp, 120);
    assert_eq!(bars[1].close, 3.0);
  }

  #[test]
  fn test_non_sequence_is_unavailable() {
    let err = parse_bars(r#"{"error": "rate limited"}"#).unwrap_err();
    assert!(matches!(err, AnalysisError::DataUnavailable(_)));
  }

  #[test]
  fn test_malformed_json_is_unavailable() {
    assert!(matches!(parse_bars("[{\"time\": 1,"), Err(AnalysisError::DataUnavailable(_))));
    assert!(matches!(
      parse_bars(r#"[{"time": 1, "open": "x", "high": 1, "low": 1, "close": 1}]"#),
      Err(AnalysisError::DataUnavailable(_))
    ));
  }

  #[test]
  fn test_inverted_bar_is_unavailable() {
    let json = r#"[{"time": 1, "open": 1.0, "high": 0.5, "low": 2.0, "close": 1.0}]"#;
    assert!(matches!(parse_bars(json), Err(AnalysisError::DataUnavailable(_))));
  }

  #[test]
  fn test_empty_sequence_is_ok() {
    assert!(parse_bars("[]").unwrap().is_empty());
  }
}
