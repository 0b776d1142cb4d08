use serde::Deserialize;
use std::time::Duration;

/// Resource limits for [`SafeEvaluator`](crate::SafeEvaluator).
///
/// Deserializes from the camelCase keys used in documents:
///
/// ```
/// use edl_expression::EvaluatorOptions;
///
/// let opts: EvaluatorOptions = serde_json::from_str(r#"{"maxDepth": 5}"#).unwrap();
/// assert_eq!(opts.max_depth, 5);
/// assert_eq!(opts.timeout_ms, 1000);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EvaluatorOptions {
    /// Deepest sub-expression nesting the parser and interpreter accept.
    pub max_depth: usize,
    /// Wall-clock budget for one evaluation, in milliseconds.
    pub timeout_ms: u64,
}

impl Default for EvaluatorOptions {
    fn default() -> Self {
        EvaluatorOptions {
            max_depth: 100,
            timeout_ms: 1000,
        }
    }
}

impl EvaluatorOptions {
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}
