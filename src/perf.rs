use serde_json::json;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Instant;

#[derive(Clone)]
pub(crate) struct PerfLogger {
    inner: Arc<Mutex<PerfState>>,
}

struct PerfState {
    writer: BufWriter<File>,
    path: PathBuf,
    span_totals: BTreeMap<String, f64>,
    span_counts: BTreeMap<String, u64>,
}

impl PerfLogger {
    pub fn new(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::create(&path)?;
        Ok(Self {
            inner: Arc::new(Mutex::new(PerfState {
                writer: BufWriter::new(file),
                path,
                span_totals: BTreeMap::new(),
                span_counts: BTreeMap::new(),
            })),
        })
    }

    pub fn log_span_ms(&self, name: &str, export: &str, ms: f64) {
        let line = json!({
            "type": "perf.span",
            "name": name,
            "export": export,
            "unit": "ms",
            "ms": (ms * 1000.0).round() / 1000.0,
        });
        if let Ok(mut state) = self.inner.lock() {
            *state.span_totals.entry(name.to_string()).or_insert(0.0) += ms;
            let entry = state.span_counts.entry(name.to_string()).or_insert(0);
            *entry = entry.saturating_add(1);
            let _ = writeln!(state.writer, "{line}");
        }
    }

    pub fn flush(&self) {
        if let Ok(mut state) = self.inner.lock() {
            let _ = state.writer.flush();
        }
    }
}

pub(crate) struct StepTimer<'a> {
    logger: Option<&'a PerfLogger>,
    export: &'a str,
    name: &'static str,
    started: Instant,
}

impl<'a> StepTimer<'a> {
    pub fn start(logger: Option<&'a PerfLogger>, export: &'a str, name: &'static str) -> Self {
        Self {
            logger,
            export,
            name,
            started: Instant::now(),
        }
    }
}

impl Drop for StepTimer<'_> {
    fn drop(&mut self) {
        if let Some(logger) = self.logger {
            let ms = self.started.elapsed().as_secs_f64() * 1000.0;
            logger.log_span_ms(self.name, self.export, ms);
        }
    }
}

impl Drop for PerfState {
    fn drop(&mut self) {
        let _ = self.writer.flush();
        let Ok(file) = File::create(hot_path_for(&self.path)) else {
            return;
        };
        let mut writer = BufWriter::new(file);

        let mut spans: Vec<(&String, &f64)> = self.span_totals.iter().collect();
        spans.sort_by(|a, b| b.1.partial_cmp(a.1).unwrap_or(std::cmp::Ordering::Equal));
        for (rank, (name, ms)) in spans.into_iter().enumerate() {
            let count = *self.span_counts.get(name).unwrap_or(&1);
            let avg = if count == 0 { 0.0 } else { ms / count as f64 };
            let line = json!({
                "type": "perf.hot.span",
                "rank": rank + 1,
                "name": name,
                "unit": "ms",
                "ms": (ms * 1000.0).round() / 1000.0,
                "count": count,
                "avg_ms": (avg * 1000.0).round() / 1000.0,
            });
            let _ = writeln!(writer, "{line}");
        }
    }
}

fn hot_path_for(path: &Path) -> PathBuf {
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("sheetfill_perf.log");
    let stem = file_name
        .rsplit_once('.')
        .map(|(s, _)| s)
        .unwrap_or(file_name);
    path.with_file_name(format!("{stem}_hot.log"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timers_log_spans_and_hot_file_on_drop() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("perf.log");
        {
            let logger = PerfLogger::new(&path).expect("logger");
            {
                let _t = StepTimer::start(Some(&logger), "a.pdf", "fill_text");
            }
            {
                let _t = StepTimer::start(Some(&logger), "b.pdf", "fill_text");
            }
            let _none = StepTimer::start(None, "c.pdf", "serialize");
            logger.flush();
        }
        let spans = std::fs::read_to_string(&path).expect("spans");
        assert_eq!(spans.lines().count(), 2);
        assert!(spans.contains("\"name\":\"fill_text\""));

        let hot = std::fs::read_to_string(dir.path().join("perf_hot.log")).expect("hot");
        let first: serde_json::Value =
            serde_json::from_str(hot.lines().next().expect("line")).expect("json");
        assert_eq!(first["name"], "fill_text");
        assert_eq!(first["count"], 2);
    }

    #[test]
    fn hot_path_keeps_directory() {
        assert_eq!(
            hot_path_for(Path::new("/tmp/run.jsonl")),
            PathBuf::from("/tmp/run_hot.log")
        );
    }
}
