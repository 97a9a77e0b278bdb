//! Per-test V8 precise coverage.
//!
//! `Profiler.takePreciseCoverage` resets V8's counters on every call, so
//! the collector folds each take into a cumulative set of executed byte
//! ranges per script. A test's delta is the set difference between the
//! cumulative state after the test and the snapshot taken before it.
//!
//! # Lifecycle
//!
//! 1. [`CoverageCollector::start`] - enable the profiler, start coverage
//! 2. [`CoverageCollector::capture_before`] / [`CoverageCollector::capture_after`] around each test
//! 3. [`CoverageCollector::write_report`] - dump `<label>.json`
//! 4. [`CoverageCollector::stop`] - stop coverage, disable the profiler
//!
//! # Example
//!
//! ```no_run
//! use cdp_harness::{Connection, CoverageCollector};
//!
//! # async fn example(connection: Connection) -> cdp_harness::Result<()> {
//! let mut coverage = CoverageCollector::start(connection, "content").await?;
//!
//! let before = coverage.capture_before().await?;
//! // ... drive the test ...
//! let delta = coverage.capture_after("hints open", &before).await?;
//! println!("{} bytes newly executed", delta.covered_bytes());
//!
//! coverage.write_report("coverage").await?;
//! coverage.stop().await?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::protocol::{Command, ProfilerCommand, ScriptCoverage, TakePreciseCoverageResult};
use crate::transport::Connection;

// ============================================================================
// RangeSet
// ============================================================================

/// Sorted, disjoint, half-open byte ranges.
///
/// Adjacent and overlapping ranges are merged on insert.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct RangeSet {
    ranges: Vec<(u32, u32)>,
}

impl RangeSet {
    /// Creates an empty set.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `[start, end)`.
    pub fn insert(&mut self, start: u32, end: u32) {
        if start >= end {
            return;
        }

        let mut merged = Vec::with_capacity(self.ranges.len() + 1);
        let (mut start, mut end) = (start, end);
        let mut placed = false;

        for &(a, b) in &self.ranges {
            if b < start {
                merged.push((a, b));
            } else if a > end {
                if !placed {
                    merged.push((start, end));
                    placed = true;
                }
                merged.push((a, b));
            } else {
                start = start.min(a);
                end = end.max(b);
            }
        }
        if !placed {
            merged.push((start, end));
        }

        self.ranges = merged;
    }

    /// Removes `[start, end)`.
    pub fn remove(&mut self, start: u32, end: u32) {
        if start >= end {
            return;
        }

        let mut kept = Vec::with_capacity(self.ranges.len() + 1);
        for &(a, b) in &self.ranges {
            if b <= start || a >= end {
                kept.push((a, b));
                continue;
            }
            if a < start {
                kept.push((a, start));
            }
            if b > end {
                kept.push((end, b));
            }
        }

        self.ranges = kept;
    }

    /// Adds every range of `other`.
    pub fn union_with(&mut self, other: &RangeSet) {
        for &(a, b) in &other.ranges {
            self.insert(a, b);
        }
    }

    /// Returns the ranges of `self` not in `other`.
    #[must_use]
    pub fn difference(&self, other: &RangeSet) -> RangeSet {
        let mut result = self.clone();
        for &(a, b) in &other.ranges {
            result.remove(a, b);
        }
        result
    }

    /// Returns `true` if `offset` lies in a range.
    #[must_use]
    pub fn contains(&self, offset: u32) -> bool {
        self.ranges.iter().any(|&(a, b)| a <= offset && offset < b)
    }

    /// Returns the total number of bytes covered.
    #[must_use]
    pub fn len(&self) -> u64 {
        self.ranges
            .iter()
            .map(|&(a, b)| u64::from(b - a))
            .sum()
    }

    /// Returns `true` if no byte is covered.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Returns the ranges in ascending order.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        self.ranges.iter().copied()
    }
}

// ============================================================================
// Snapshots
// ============================================================================

/// Cumulative executed ranges per script URL at one point in time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoverageSnapshot {
    label: String,
    scripts: BTreeMap<String, RangeSet>,
}

impl CoverageSnapshot {
    /// Returns the label of the collector that took the snapshot.
    #[inline]
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Returns the executed ranges of one script.
    #[must_use]
    pub fn script(&self, url: &str) -> Option<&RangeSet> {
        self.scripts.get(url)
    }

    /// Returns the covered script URLs.
    pub fn urls(&self) -> impl Iterator<Item = &str> {
        self.scripts.keys().map(String::as_str)
    }
}

/// Ranges newly executed during one test.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CoverageDelta {
    /// Test name.
    pub test_name: String,
    /// Newly executed ranges per script URL; scripts without new ranges
    /// are omitted.
    pub scripts: BTreeMap<String, RangeSet>,
}

impl CoverageDelta {
    /// Returns the total number of newly executed bytes.
    #[must_use]
    pub fn covered_bytes(&self) -> u64 {
        self.scripts.values().map(RangeSet::len).sum()
    }

    /// Returns `true` if the test executed nothing new.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.scripts.is_empty()
    }
}

/// Aggregate of every delta recorded by a collector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CoverageReport {
    /// Collector label.
    pub label: String,
    /// Per-test deltas, in capture order.
    pub tests: Vec<CoverageDelta>,
    /// Union of all deltas per script URL.
    pub scripts: BTreeMap<String, RangeSet>,
    /// Total bytes in `scripts`.
    pub covered_bytes: u64,
}

// ============================================================================
// CoverageCollector
// ============================================================================

/// Collects precise coverage from one target.
#[derive(Debug)]
pub struct CoverageCollector {
    connection: Connection,
    label: String,
    url_filter: Option<String>,
    cumulative: BTreeMap<String, RangeSet>,
    deltas: Vec<CoverageDelta>,
}

impl CoverageCollector {
    /// Enables the profiler and starts detailed, counted coverage.
    ///
    /// # Errors
    ///
    /// Returns any error from the profiler commands.
    pub async fn start(connection: Connection, label: impl Into<String>) -> Result<Self> {
        let label = label.into();

        connection
            .execute(Command::Profiler(ProfilerCommand::Enable))
            .await?;
        connection
            .execute(Command::Profiler(ProfilerCommand::StartPreciseCoverage {
                call_count: true,
                detailed: true,
            }))
            .await?;

        info!(%label, url = connection.url(), "Coverage started");

        Ok(Self {
            connection,
            label,
            url_filter: None,
            cumulative: BTreeMap::new(),
            deltas: Vec::new(),
        })
    }

    /// Only records scripts whose URL contains `filter`.
    #[inline]
    #[must_use]
    pub fn with_url_filter(mut self, filter: impl Into<String>) -> Self {
        self.url_filter = Some(filter.into());
        self
    }

    /// Returns the collector label.
    #[inline]
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Returns the recorded deltas.
    #[inline]
    #[must_use]
    pub fn deltas(&self) -> &[CoverageDelta] {
        &self.deltas
    }

    /// Takes coverage and returns the cumulative snapshot.
    ///
    /// # Errors
    ///
    /// Returns any error from `Profiler.takePreciseCoverage`.
    pub async fn capture_before(&mut self) -> Result<CoverageSnapshot> {
        self.take().await?;
        Ok(self.snapshot())
    }

    /// Takes coverage and records what was executed since `before`.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidArgument`] if `before` came from another collector
    /// - Any error from `Profiler.takePreciseCoverage`
    pub async fn capture_after(
        &mut self,
        test_name: impl Into<String>,
        before: &CoverageSnapshot,
    ) -> Result<CoverageDelta> {
        if before.label != self.label {
            return Err(Error::invalid_argument(format!(
                "snapshot from collector {:?} passed to collector {:?}",
                before.label, self.label
            )));
        }

        self.take().await?;

        let empty = RangeSet::new();
        let scripts: BTreeMap<String, RangeSet> = self
            .cumulative
            .iter()
            .map(|(url, after)| {
                let before = before.scripts.get(url).unwrap_or(&empty);
                (url.clone(), after.difference(before))
            })
            .filter(|(_, delta)| !delta.is_empty())
            .collect();

        let delta = CoverageDelta {
            test_name: test_name.into(),
            scripts,
        };

        debug!(
            label = %self.label,
            test = %delta.test_name,
            bytes = delta.covered_bytes(),
            "Coverage delta recorded"
        );

        self.deltas.push(delta.clone());
        Ok(delta)
    }

    /// Aggregates every recorded delta.
    #[must_use]
    pub fn report(&self) -> CoverageReport {
        let mut scripts: BTreeMap<String, RangeSet> = BTreeMap::new();
        for delta in &self.deltas {
            for (url, ranges) in &delta.scripts {
                scripts.entry(url.clone()).or_default().union_with(ranges);
            }
        }

        CoverageReport {
            label: self.label.clone(),
            tests: self.deltas.clone(),
            covered_bytes: scripts.values().map(RangeSet::len).sum(),
            scripts,
        }
    }

    /// Writes the report to `<dir>/<label>.json`, creating `dir` if needed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] or [`Error::Json`] on failure.
    pub async fn write_report(&self, dir: impl AsRef<Path>) -> Result<PathBuf> {
        let dir = dir.as_ref();
        tokio::fs::create_dir_all(dir).await?;

        let path = dir.join(format!("{}.json", file_stem(&self.label)));
        let json = serde_json::to_vec_pretty(&self.report())?;
        tokio::fs::write(&path, json).await?;

        info!(path = %path.display(), tests = self.deltas.len(), "Coverage report written");
        Ok(path)
    }

    /// Stops coverage and disables the profiler.
    ///
    /// # Errors
    ///
    /// Returns any error from the profiler commands.
    pub async fn stop(self) -> Result<()> {
        self.connection
            .execute(Command::Profiler(ProfilerCommand::StopPreciseCoverage))
            .await?;
        self.connection
            .execute(Command::Profiler(ProfilerCommand::Disable))
            .await?;
        debug!(label = %self.label, "Coverage stopped");
        Ok(())
    }
}

// ============================================================================
// CoverageCollector - Internal
// ============================================================================

impl CoverageCollector {
    async fn take(&mut self) -> Result<()> {
        let raw = self
            .connection
            .execute(Command::Profiler(ProfilerCommand::TakePreciseCoverage))
            .await?;
        let taken: TakePreciseCoverageResult = serde_json::from_value(raw)?;

        for script in &taken.result {
            if !self.records(script) {
                continue;
            }
            let executed = executed_ranges(script);
            self.cumulative
                .entry(script.url.clone())
                .or_default()
                .union_with(&executed);
        }

        Ok(())
    }

    fn records(&self, script: &ScriptCoverage) -> bool {
        !script.url.is_empty()
            && self
                .url_filter
                .as_deref()
                .is_none_or(|filter| script.url.contains(filter))
    }

    fn snapshot(&self) -> CoverageSnapshot {
        CoverageSnapshot {
            label: self.label.clone(),
            scripts: self.cumulative.clone(),
        }
    }
}

/// Ranges executed in one take.
///
/// Ranges arrive in pre-order, outer before nested, so painting them in
/// order leaves each byte with the count of its innermost range.
fn executed_ranges(script: &ScriptCoverage) -> RangeSet {
    let mut executed = RangeSet::new();
    for function in &script.functions {
        for range in &function.ranges {
            if range.count > 0 {
                executed.insert(range.start_offset, range.end_offset);
            } else {
                executed.remove(range.start_offset, range.end_offset);
            }
        }
    }
    executed
}

fn file_stem(label: &str) -> String {
    label
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use proptest::prelude::*;
    use serde_json::{Value, json};

    use crate::transport::MockTarget;

    fn set(ranges: &[(u32, u32)]) -> RangeSet {
        let mut set = RangeSet::new();
        for &(a, b) in ranges {
            set.insert(a, b);
        }
        set
    }

    fn script(url: &str, ranges: Value) -> Value {
        json!({
            "scriptId": "1",
            "url": url,
            "functions": [{"functionName": "", "isBlockCoverage": true, "ranges": ranges}]
        })
    }

    /// Serves the profiler, answering each take with the next listing.
    async fn profiler_target(takes: Vec<Value>) -> Connection {
        let target = MockTarget::bind().await.expect("bind");
        let url = target.ws_url();
        let mut takes = takes.into_iter();
        let _server = target.serve(move |request| {
            let result = if request.method == "Profiler.takePreciseCoverage" {
                json!({"timestamp": 1.0, "result": takes.next().unwrap_or_else(|| json!([]))})
            } else {
                json!({})
            };
            vec![request.reply(result)]
        });
        Connection::connect(&url).await.expect("connect")
    }

    #[test]
    fn test_insert_merges_overlap_and_adjacency() {
        let ranges = set(&[(10, 20), (30, 40), (20, 25), (35, 50), (0, 5)]);
        assert_eq!(ranges.iter().collect::<Vec<_>>(), vec![(0, 5), (10, 25), (30, 50)]);
        assert_eq!(ranges.len(), 5 + 15 + 20);
    }

    #[test]
    fn test_remove_splits_ranges() {
        let mut ranges = set(&[(0, 100)]);
        ranges.remove(40, 60);
        assert_eq!(ranges.iter().collect::<Vec<_>>(), vec![(0, 40), (60, 100)]);
        assert!(!ranges.contains(50));
        assert!(ranges.contains(60));
    }

    #[test]
    fn test_difference() {
        let after = set(&[(0, 100)]);
        let before = set(&[(0, 40), (60, 100)]);
        assert_eq!(after.difference(&before), set(&[(40, 60)]));
        assert!(before.difference(&after).is_empty());
    }

    #[test]
    fn test_executed_ranges_paints_nested_blocks() {
        let script: ScriptCoverage = serde_json::from_value(script(
            "a.js",
            json!([
                {"startOffset": 0, "endOffset": 100, "count": 1},
                {"startOffset": 40, "endOffset": 60, "count": 0},
                {"startOffset": 45, "endOffset": 50, "count": 2}
            ]),
        ))
        .expect("parse");

        assert_eq!(
            executed_ranges(&script),
            set(&[(0, 40), (45, 50), (60, 100)])
        );
    }

    #[test]
    fn test_file_stem() {
        assert_eq!(file_stem("content page/1"), "content_page_1");
    }

    #[tokio::test]
    async fn test_delta_between_captures() {
        let connection = profiler_target(vec![
            json!([
                script("chrome-extension://x/content.js", json!([
                    {"startOffset": 0, "endOffset": 100, "count": 1},
                    {"startOffset": 40, "endOffset": 60, "count": 0}
                ])),
                script("", json!([{"startOffset": 0, "endOffset": 10, "count": 1}]))
            ]),
            json!([
                script("chrome-extension://x/content.js", json!([
                    {"startOffset": 0, "endOffset": 100, "count": 1}
                ]))
            ]),
        ])
        .await;

        let mut coverage = CoverageCollector::start(connection, "content")
            .await
            .expect("start");

        let before = coverage.capture_before().await.expect("before");
        assert_eq!(before.urls().collect::<Vec<_>>(), vec!["chrome-extension://x/content.js"]);

        let delta = coverage.capture_after("opens hints", &before).await.expect("after");
        assert_eq!(delta.covered_bytes(), 20);
        assert_eq!(
            delta.scripts["chrome-extension://x/content.js"],
            set(&[(40, 60)])
        );

        // Nothing ran since the last take.
        let again = coverage.capture_before().await.expect("again");
        let empty = coverage.capture_after("idle", &again).await.expect("idle");
        assert!(empty.is_empty());

        let report = coverage.report();
        assert_eq!(report.tests.len(), 2);
        assert_eq!(report.covered_bytes, 20);

        coverage.stop().await.expect("stop");
    }

    #[tokio::test]
    async fn test_url_filter() {
        let connection = profiler_target(vec![json!([
            script("chrome-extension://x/content.js", json!([{"startOffset": 0, "endOffset": 10, "count": 1}])),
            script("chrome-extension://x/background.js", json!([{"startOffset": 0, "endOffset": 10, "count": 1}]))
        ])])
        .await;

        let mut coverage = CoverageCollector::start(connection, "content")
            .await
            .expect("start")
            .with_url_filter("content");

        let snapshot = coverage.capture_before().await.expect("capture");
        assert!(snapshot.script("chrome-extension://x/content.js").is_some());
        assert!(snapshot.script("chrome-extension://x/background.js").is_none());
    }

    #[tokio::test]
    async fn test_foreign_snapshot_is_rejected() {
        let connection = profiler_target(Vec::new()).await;
        let mut coverage = CoverageCollector::start(connection, "content")
            .await
            .expect("start");

        let foreign = CoverageSnapshot {
            label: "background".into(),
            scripts: BTreeMap::new(),
        };
        let err = coverage
            .capture_after("x", &foreign)
            .await
            .expect_err("should reject");
        assert!(matches!(err, Error::InvalidArgument { .. }));
    }

    #[tokio::test]
    async fn test_write_report() {
        let connection = profiler_target(Vec::new()).await;
        let coverage = CoverageCollector::start(connection, "content page")
            .await
            .expect("start");
        let dir = tempfile::tempdir().expect("tempdir");

        let path = coverage.write_report(dir.path().join("out")).await.expect("write");

        assert_eq!(path.file_name().and_then(|n| n.to_str()), Some("content_page.json"));
        let written: Value =
            serde_json::from_slice(&std::fs::read(&path).expect("read")).expect("json");
        assert_eq!(written["label"], "content page");
        assert_eq!(written["covered_bytes"], 0);
    }

    proptest! {
        #[test]
        fn difference_is_disjoint_and_bounded(
            a in prop::collection::vec((0u32..500, 1u32..50), 0..12),
            b in prop::collection::vec((0u32..500, 1u32..50), 0..12),
        ) {
            let a = set(&a.iter().map(|&(s, l)| (s, s + l)).collect::<Vec<_>>());
            let b = set(&b.iter().map(|&(s, l)| (s, s + l)).collect::<Vec<_>>());
            let delta = a.difference(&b);

            prop_assert!(delta.len() <= a.len());
            for (start, end) in delta.iter() {
                prop_assert!(start < end);
                prop_assert!(!b.contains(start));
                prop_assert!(a.contains(start));
            }
            let ranges: Vec<_> = delta.iter().collect();
            for pair in ranges.windows(2) {
                prop_assert!(pair[0].1 < pair[1].0);
            }
        }
    }
}
