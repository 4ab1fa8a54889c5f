use std::future::Future;
use std::time::Duration;

use tokio::task::{AbortHandle, JoinHandle};

/// A single pending-write slot.
///
/// Scheduling aborts whatever was pending, so at most one delayed job exists.
/// A job that wakes up must `claim` its sequence number before acting, which
/// guards against an abort that arrives after the timer already fired. A
/// claimed job stays tracked as running until it calls `complete`, so it can
/// still be aborted or awaited.
#[derive(Default)]
pub(crate) struct DebounceSlot {
    pending: Option<Pending>,
    running: Option<Running>,
    next_seq: u64,
}

struct Pending {
    seq: u64,
    handle: JoinHandle<()>,
}

struct Running {
    seq: u64,
    abort: AbortHandle,
    handle: Option<JoinHandle<()>>,
}

impl DebounceSlot {
    /// Replace the pending job with `job(seq)`, run after `delay`.
    pub(crate) fn schedule<F>(&mut self, delay: Duration, job: impl FnOnce(u64) -> F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.cancel();
        let seq = self.next_seq;
        self.next_seq = self.next_seq.wrapping_add(1);
        let job = job(seq);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            job.await;
        });
        self.pending = Some(Pending { seq, handle });
    }

    /// Move the job from pending to running. False means the job was
    /// superseded and must do nothing. An older job still running is aborted;
    /// the newer one carries everything it would have written.
    pub(crate) fn claim(&mut self, seq: u64) -> bool {
        if !self.pending.as_ref().is_some_and(|p| p.seq == seq) {
            return false;
        }
        let Some(Pending { seq, handle }) = self.pending.take() else {
            return false;
        };
        self.abort_running();
        self.running = Some(Running {
            seq,
            abort: handle.abort_handle(),
            handle: Some(handle),
        });
        true
    }

    /// Called by a claimed job once it is done.
    pub(crate) fn complete(&mut self, seq: u64) {
        if self.running.as_ref().is_some_and(|r| r.seq == seq) {
            self.running = None;
        }
    }

    /// Abort the pending job. Returns whether one was pending.
    pub(crate) fn cancel(&mut self) -> bool {
        match self.pending.take() {
            Some(pending) => {
                pending.handle.abort();
                true
            }
            None => false,
        }
    }

    /// Abort both the pending and the running job.
    pub(crate) fn abort_all(&mut self) {
        self.cancel();
        self.abort_running();
    }

    /// Hand out the running job's handle so the caller can wait for it. The
    /// job stays abortable through the slot until it completes.
    pub(crate) fn take_running(&mut self) -> Option<JoinHandle<()>> {
        self.running.as_mut().and_then(|r| r.handle.take())
    }

    /// True while a job waits for its delay or is still running.
    pub(crate) fn is_pending(&self) -> bool {
        self.pending.is_some() || self.running.is_some()
    }

    fn abort_running(&mut self) {
        if let Some(running) = self.running.take() {
            running.abort.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    type Shared = Arc<Mutex<DebounceSlot>>;

    fn schedule_push(slot: &Shared, fired: &Arc<Mutex<Vec<u32>>>, value: u32, work: Duration) {
        let owner = Arc::clone(slot);
        let fired = Arc::clone(fired);
        slot.lock()
            .unwrap()
            .schedule(Duration::from_secs(1), move |seq| async move {
                if !owner.lock().unwrap().claim(seq) {
                    return;
                }
                tokio::time::sleep(work).await;
                fired.lock().unwrap().push(value);
                owner.lock().unwrap().complete(seq);
            });
    }

    #[tokio::test(start_paused = true)]
    async fn rescheduling_runs_only_the_last_job() {
        let slot: Shared = Arc::default();
        let fired = Arc::new(Mutex::new(Vec::new()));

        for value in 1..=3 {
            schedule_push(&slot, &fired, value, Duration::ZERO);
            tokio::time::sleep(Duration::from_millis(300)).await;
        }

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(*fired.lock().unwrap(), vec![3]);
        assert!(!slot.lock().unwrap().is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_prevents_the_job() {
        let mut slot = DebounceSlot::default();
        let fired = Arc::new(Mutex::new(false));
        let flag = Arc::clone(&fired);
        slot.schedule(Duration::from_secs(1), move |_| async move {
            *flag.lock().unwrap() = true;
        });

        assert!(slot.cancel());
        assert!(!slot.cancel());
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(!*fired.lock().unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn claimed_job_stays_abortable() {
        let slot: Shared = Arc::default();
        let fired = Arc::new(Mutex::new(Vec::new()));
        schedule_push(&slot, &fired, 1, Duration::from_secs(5));

        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert!(slot.lock().unwrap().is_pending());
        slot.lock().unwrap().abort_all();

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(fired.lock().unwrap().is_empty());
        assert!(!slot.lock().unwrap().is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn running_job_can_be_awaited() {
        let slot: Shared = Arc::default();
        let fired = Arc::new(Mutex::new(Vec::new()));
        schedule_push(&slot, &fired, 7, Duration::from_secs(5));

        tokio::time::sleep(Duration::from_millis(1500)).await;
        let handle = slot.lock().unwrap().take_running();
        handle.unwrap().await.unwrap();

        assert_eq!(*fired.lock().unwrap(), vec![7]);
        assert!(!slot.lock().unwrap().is_pending());
        assert!(slot.lock().unwrap().take_running().is_none());
    }

    #[test]
    fn stale_sequence_cannot_claim() {
        let mut slot = DebounceSlot::default();
        assert!(!slot.claim(0));
    }
}
