//! Mock implementation of the [`TtsCloner`] trait.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::cloner::{CloneOutcome, CloneRequest, ClonerError, TtsCloner};
use crate::testing::fixtures::write_test_wav;

/// Controllable in-process cloner.
///
/// Records every request, can be scripted to fail specific texts, writes
/// a real (tiny) WAV for successful lines and tracks how many clones ran
/// concurrently, which is what the GPU serialization tests assert on.
pub struct MockCloner {
    requests: Mutex<Vec<CloneRequest>>,
    fail_texts: Mutex<HashMap<String, String>>,
    synth_duration_ms: Mutex<u64>,
    delay: Mutex<Duration>,
    active: AtomicUsize,
    max_active: AtomicUsize,
}

impl Default for MockCloner {
    fn default() -> Self {
        Self::new()
    }
}

impl MockCloner {
    pub fn new() -> Self {
        Self {
            requests: Mutex::new(Vec::new()),
            fail_texts: Mutex::new(HashMap::new()),
            synth_duration_ms: Mutex::new(800),
            delay: Mutex::new(Duration::ZERO),
            active: AtomicUsize::new(0),
            max_active: AtomicUsize::new(0),
        }
    }

    /// All requests seen so far, in call order.
    pub fn requests(&self) -> Vec<CloneRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Script a failure for any request with this exact text.
    pub fn fail_text(&self, text: &str, reason: &str) {
        self.fail_texts
            .lock()
            .unwrap()
            .insert(text.to_string(), reason.to_string());
    }

    /// Length of the WAVs written for successful lines.
    pub fn set_synth_duration_ms(&self, duration_ms: u64) {
        *self.synth_duration_ms.lock().unwrap() = duration_ms;
    }

    /// Artificial per-call latency, for concurrency assertions.
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = delay;
    }

    /// Highest number of clones observed in flight at once.
    pub fn max_concurrency(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TtsCloner for MockCloner {
    fn name(&self) -> &str {
        "mock"
    }

    async fn clone_with_emotion(&self, request: CloneRequest) -> Result<CloneOutcome, ClonerError> {
        self.requests.lock().unwrap().push(request.clone());

        let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(active, Ordering::SeqCst);

        let delay = *self.delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let outcome = {
            let scripted = self.fail_texts.lock().unwrap().get(&request.text).cloned();
            match scripted {
                Some(reason) => Err(ClonerError::Rejected(reason)),
                None => {
                    let duration_ms = *self.synth_duration_ms.lock().unwrap();
                    write_test_wav(&request.output_path, duration_ms);
                    Ok(CloneOutcome { duration_ms })
                }
            }
        };

        self.active.fetch_sub(1, Ordering::SeqCst);
        outcome
    }
}
