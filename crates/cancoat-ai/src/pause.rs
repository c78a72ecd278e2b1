//! Time-based suspension used for retry backoff and inter-record throttling.

use std::time::Duration;

use async_trait::async_trait;

#[async_trait]
pub trait Pause: Send + Sync {
    async fn pause(&self, duration: Duration);
}

/// Sleeps on the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioPause;

#[async_trait]
impl Pause for TokioPause {
    async fn pause(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::{Arc, Mutex};

    use super::*;

    /// Records requested pauses without sleeping.
    #[derive(Clone, Default)]
    pub struct RecordingPause {
        log: Arc<Mutex<Vec<Duration>>>,
    }

    impl RecordingPause {
        pub fn recorded(&self) -> Vec<Duration> {
            self.log.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Pause for RecordingPause {
        async fn pause(&self, duration: Duration) {
            self.log.lock().unwrap().push(duration);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn tokio_pause_advances_clock() {
        let before = tokio::time::Instant::now();
        TokioPause.pause(Duration::from_secs(2)).await;
        assert!(before.elapsed() >= Duration::from_secs(2));
    }
}
