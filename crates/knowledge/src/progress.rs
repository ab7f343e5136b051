//! Progress reporting for index builds.
//!
//! The builder emits one event per phase transition and one per embedding
//! batch; the CLI renders them on stderr.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

/// Stage of an index build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildPhase {
    Load,
    Chunk,
    Embed,
    Persist,
}

impl fmt::Display for BuildPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BuildPhase::Load => "load",
            BuildPhase::Chunk => "chunk",
            BuildPhase::Embed => "embed",
            BuildPhase::Persist => "persist",
        };
        f.write_str(name)
    }
}

/// Progress event emitted during a build.
#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub phase: BuildPhase,

    /// Units done so far (pages, chunks or batches depending on phase)
    pub current: u64,

    /// Total expected units, if known
    pub total: Option<u64>,

    pub message: String,

    /// Seconds since the reporter was created
    pub elapsed_secs: f64,
}

impl ProgressEvent {
    /// Percentage complete, when the total is known.
    pub fn percentage(&self) -> Option<f64> {
        self.total.map(|t| {
            if t > 0 {
                (self.current as f64 / t as f64) * 100.0
            } else {
                100.0
            }
        })
    }

    /// Format as a single user-facing line.
    pub fn format_simple(&self) -> String {
        let progress = match self.total {
            Some(total) => format!("{}/{}", self.current, total),
            None => self.current.to_string(),
        };
        let pct = self
            .percentage()
            .map(|p| format!(" ({:.0}%)", p))
            .unwrap_or_default();

        format!("[{}] {}{} - {}", self.phase, progress, pct, self.message)
    }
}

/// Callback for progress events.
pub type ProgressCallback = Arc<dyn Fn(ProgressEvent) + Send + Sync>;

/// Emits build progress through an optional callback.
#[derive(Clone)]
pub struct ProgressReporter {
    callback: Option<ProgressCallback>,
    start_time: Instant,
}

impl ProgressReporter {
    pub fn new(callback: ProgressCallback) -> Self {
        Self {
            callback: Some(callback),
            start_time: Instant::now(),
        }
    }

    /// Reporter that only logs.
    pub fn noop() -> Self {
        Self {
            callback: None,
            start_time: Instant::now(),
        }
    }

    fn emit(&self, phase: BuildPhase, current: u64, total: Option<u64>, message: String) {
        let event = ProgressEvent {
            phase,
            current,
            total,
            message,
            elapsed_secs: self.start_time.elapsed().as_secs_f64(),
        };

        tracing::debug!(
            phase = %event.phase,
            current = event.current,
            total = ?event.total,
            elapsed_secs = event.elapsed_secs,
            "{}",
            event.message
        );

        if let Some(callback) = &self.callback {
            callback(event);
        }
    }

    pub fn loaded(&self, documents: u64, pages: u64) {
        self.emit(
            BuildPhase::Load,
            pages,
            None,
            format!("{} pages from {} documents", pages, documents),
        );
    }

    pub fn chunked(&self, chunks: u64) {
        self.emit(BuildPhase::Chunk, chunks, None, format!("{} chunks", chunks));
    }

    pub fn batch_embedded(&self, batch: u64, batches: u64, model: &str) {
        self.emit(
            BuildPhase::Embed,
            batch,
            Some(batches),
            format!("model={}", model),
        );
    }

    pub fn persisted(&self, chunks: u64, index_dir: &str) {
        self.emit(
            BuildPhase::Persist,
            chunks,
            Some(chunks),
            format!("index written to {}", index_dir),
        );
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::noop()
    }
}

impl fmt::Debug for ProgressReporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressReporter")
            .field("callback", &self.callback.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_event_format() {
        let event = ProgressEvent {
            phase: BuildPhase::Embed,
            current: 2,
            total: Some(4),
            message: "model=trigram-v1".to_string(),
            elapsed_secs: 0.0,
        };
        assert_eq!(event.format_simple(), "[embed] 2/4 (50%) - model=trigram-v1");
    }

    #[test]
    fn test_reporter_invokes_callback() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();

        let reporter = ProgressReporter::new(Arc::new(move |event| {
            sink.lock().unwrap().push(event);
        }));

        reporter.loaded(2, 7);
        reporter.batch_embedded(1, 3, "trigram-v1");

        let captured = events.lock().unwrap();
        assert_eq!(captured.len(), 2);
        assert_eq!(captured[0].phase, BuildPhase::Load);
        assert_eq!(captured[0].current, 7);
        assert_eq!(captured[1].total, Some(3));
    }

    #[test]
    fn test_noop_reporter() {
        ProgressReporter::noop().chunked(10);
    }
}
