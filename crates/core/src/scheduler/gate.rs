//! Process-wide GPU admission gate.

use tokio::sync::{Semaphore, SemaphorePermit};

/// Counting semaphore serializing GPU-bound step entry.
///
/// Coresident cloning invocations reliably exhaust device memory, so the
/// default permit count is one. Waiters are served in FIFO order and the
/// RAII permit releases on every exit path.
pub struct GpuGate {
    semaphore: Semaphore,
    permits: usize,
}

impl GpuGate {
    pub fn new(permits: usize) -> Self {
        Self {
            semaphore: Semaphore::new(permits),
            permits,
        }
    }

    pub fn permits(&self) -> usize {
        self.permits
    }

    /// Number of permits currently free.
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Wait for a permit.
    pub async fn acquire(&self) -> SemaphorePermit<'_> {
        self.semaphore
            .acquire()
            .await
            .expect("gpu gate semaphore closed")
    }
}

impl Default for GpuGate {
    fn default() -> Self {
        Self::new(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_single_permit_serializes_holders() {
        let gate = Arc::new(GpuGate::default());
        assert_eq!(gate.permits(), 1);

        let permit = gate.acquire().await;
        assert_eq!(gate.available(), 0);

        let second = {
            let gate = Arc::clone(&gate);
            tokio::spawn(async move {
                let _permit = gate.acquire().await;
            })
        };

        // The second acquirer can only finish once the permit drops.
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert!(!second.is_finished());

        drop(permit);
        second.await.unwrap();
        assert_eq!(gate.available(), 1);
    }
}
