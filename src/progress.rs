use indicatif::{HumanBytes, ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// Receives progress events. Purely observational.
pub trait ProgressSink: Send + Sync {
    fn start(&self, _total_bytes: u64) {}
    fn advance(&self, delta: u64, rate: Option<f64>);
    fn finish(&self) {}
}

#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct ProgressState {
    pub bytes_completed: u64,
    pub last_observed_rate: Option<f64>,
}

/// Shared accumulator handed to every part task.
#[derive(Clone)]
pub struct ProgressTracker {
    state: Arc<Mutex<ProgressState>>,
    sink: Arc<dyn ProgressSink>,
}

impl ProgressTracker {
    pub fn new(sink: Arc<dyn ProgressSink>) -> Self {
        Self {
            state: Arc::new(Mutex::new(ProgressState::default())),
            sink,
        }
    }

    /// Adds `bytes` to the total. With `elapsed`, the part's throughput
    /// becomes the last observed rate; parts skipped on resume pass `None`.
    pub async fn record(&self, bytes: u64, elapsed: Option<Duration>) {
        let mut state = self.state.lock().await;
        state.bytes_completed += bytes;

        let rate = elapsed
            .map(|e| e.as_secs_f64())
            .filter(|secs| *secs > 0.0)
            .map(|secs| bytes as f64 / secs);
        if rate.is_some() {
            state.last_observed_rate = rate;
        }
        self.sink.advance(bytes, rate);
    }

    pub async fn snapshot(&self) -> ProgressState {
        *self.state.lock().await
    }
}

/// Terminal progress bar.
pub struct BarSink {
    pb: ProgressBar,
}

impl BarSink {
    pub fn new() -> Self {
        let pb = ProgressBar::with_draw_target(Some(0), ProgressDrawTarget::stderr_with_hz(5));
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} Downloading Parts [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes:>12}/{total_bytes:<12} {eta:>4} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=>-"),
        );
        Self { pb }
    }
}

impl ProgressSink for BarSink {
    fn start(&self, total_bytes: u64) {
        self.pb.set_length(total_bytes);
    }

    fn advance(&self, delta: u64, rate: Option<f64>) {
        self.pb.inc(delta);
        if let Some(rate) = rate {
            self.pb.set_message(format!("{}/s", HumanBytes(rate as u64)));
        }
    }

    fn finish(&self) {
        self.pb.finish();
    }
}
