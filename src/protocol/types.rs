//! Typed command results.
//!
//! Only the result shapes the harness reads are modelled; unknown fields
//! are ignored.

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ============================================================================
// Runtime
// ============================================================================

/// Mirror object of a remote JavaScript value.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteObject {
    /// JavaScript type (`object`, `string`, `undefined`, ...).
    #[serde(rename = "type")]
    pub object_type: String,
    /// Object subtype (`null`, `array`, `error`, ...).
    #[serde(default)]
    pub subtype: Option<String>,
    /// Value, when returned by value.
    #[serde(default)]
    pub value: Option<Value>,
    /// String form of values JSON cannot carry (`NaN`, `-0`, bigint).
    #[serde(default)]
    pub unserializable_value: Option<String>,
    /// Human readable description.
    #[serde(default)]
    pub description: Option<String>,
}

/// Details of an exception thrown during evaluation.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExceptionDetails {
    /// Summary text (`Uncaught`, `Uncaught (in promise)`, ...).
    #[serde(default)]
    pub text: String,
    /// Zero-based line number.
    #[serde(default)]
    pub line_number: i64,
    /// Zero-based column number.
    #[serde(default)]
    pub column_number: i64,
    /// Thrown value.
    #[serde(default)]
    pub exception: Option<RemoteObject>,
}

/// Result of `Runtime.evaluate`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluateResult {
    /// Evaluation result.
    pub result: RemoteObject,
    /// Present when the expression threw.
    #[serde(default)]
    pub exception_details: Option<ExceptionDetails>,
}

// ============================================================================
// Profiler
// ============================================================================

/// Result of `Profiler.takePreciseCoverage`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TakePreciseCoverageResult {
    /// Per-script coverage.
    #[serde(default)]
    pub result: Vec<ScriptCoverage>,
    /// Monotonic time of collection, in seconds.
    #[serde(default)]
    pub timestamp: f64,
}

/// Coverage data of one script.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptCoverage {
    /// V8 script ID.
    pub script_id: String,
    /// Script URL (empty for evaluated snippets).
    #[serde(default)]
    pub url: String,
    /// Functions in the script.
    #[serde(default)]
    pub functions: Vec<FunctionCoverage>,
}

/// Coverage data of one function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionCoverage {
    /// Function name (empty for anonymous functions).
    #[serde(default)]
    pub function_name: String,
    /// Ranges, the function range first, then nested blocks in pre-order.
    #[serde(default)]
    pub ranges: Vec<CoverageRange>,
    /// Whether block-level ranges are present.
    #[serde(default)]
    pub is_block_coverage: bool,
}

/// A source range with its execution count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoverageRange {
    /// Start byte offset (inclusive).
    pub start_offset: u32,
    /// End byte offset (exclusive).
    pub end_offset: u32,
    /// Execution count.
    pub count: u64,
}

// ============================================================================
// Tests
// ============================================================================
