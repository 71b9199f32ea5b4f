//! Auto-advance timers.
//!
//! A scheduler arms a one-shot delay and hands back a handle. When the delay
//! elapses an [`AdvanceTicket`] carrying the round generation is delivered to
//! the session owner, which ignores tickets from superseded rounds.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdvanceTicket {
    pub generation: u64,
}

pub trait AdvanceHandle: Send {
    fn cancel(&mut self);
}

pub trait AdvanceScheduler: Send {
    fn schedule(&mut self, delay: Duration, ticket: AdvanceTicket) -> Box<dyn AdvanceHandle>;
}

/// Spawns a sleeping task per timer and delivers tickets over an mpsc channel.
pub struct TokioScheduler {
    tx: mpsc::UnboundedSender<AdvanceTicket>,
}

impl TokioScheduler {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<AdvanceTicket>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

struct TokioHandle {
    task: Option<JoinHandle<()>>,
}

impl AdvanceHandle for TokioHandle {
    fn cancel(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for TokioHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl AdvanceScheduler for TokioScheduler {
    fn schedule(&mut self, delay: Duration, ticket: AdvanceTicket) -> Box<dyn AdvanceHandle> {
        let tx = self.tx.clone();
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if tx.send(ticket).is_err() {
                tracing::debug!(generation = ticket.generation, "Advance receiver dropped");
            }
        });
        Box::new(TokioHandle { task: Some(task) })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduledAdvance {
    pub delay: Duration,
    pub ticket: AdvanceTicket,
    pub cancelled: bool,
}

/// Records every armed timer; tests fire them by hand.
#[derive(Debug, Clone, Default)]
pub struct ManualScheduler {
    scheduled: Arc<Mutex<Vec<ScheduledAdvance>>>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scheduled(&self) -> Vec<ScheduledAdvance> {
        self.lock().clone()
    }

    /// Tickets armed and not cancelled, oldest first.
    pub fn pending(&self) -> Vec<AdvanceTicket> {
        self.lock()
            .iter()
            .filter(|s| !s.cancelled)
            .map(|s| s.ticket)
            .collect()
    }

    pub fn last(&self) -> Option<ScheduledAdvance> {
        self.lock().last().copied()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<ScheduledAdvance>> {
        self.scheduled
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

struct ManualHandle {
    scheduled: Arc<Mutex<Vec<ScheduledAdvance>>>,
    index: usize,
}

impl AdvanceHandle for ManualHandle {
    fn cancel(&mut self) {
        let mut scheduled = self
            .scheduled
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(entry) = scheduled.get_mut(self.index) {
            entry.cancelled = true;
        }
    }
}

impl AdvanceScheduler for ManualScheduler {
    fn schedule(&mut self, delay: Duration, ticket: AdvanceTicket) -> Box<dyn AdvanceHandle> {
        let mut scheduled = self.lock();
        scheduled.push(ScheduledAdvance {
            delay,
            ticket,
            cancelled: false,
        });
        Box::new(ManualHandle {
            scheduled: Arc::clone(&self.scheduled),
            index: scheduled.len() - 1,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn tokio_timer_delivers_ticket_after_delay() {
        let (mut scheduler, mut rx) = TokioScheduler::new();
        let _handle = scheduler.schedule(Duration::from_millis(1_500), AdvanceTicket { generation: 3 });

        tokio::time::advance(Duration::from_millis(1_499)).await;
        tokio::task::yield_now().await;
        assert!(rx.try_recv().is_err());

        tokio::time::advance(Duration::from_millis(2)).await;
        let ticket = rx.recv().await.unwrap();
        assert_eq!(ticket.generation, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_tokio_timer_never_fires() {
        let (mut scheduler, mut rx) = TokioScheduler::new();
        let mut handle = scheduler.schedule(Duration::from_millis(100), AdvanceTicket { generation: 1 });
        handle.cancel();

        tokio::time::advance(Duration::from_millis(500)).await;
        tokio::task::yield_now().await;
        tokio_test::assert_pending!(tokio_test::task::spawn(rx.recv()).poll());
    }

    #[test]
    fn manual_scheduler_tracks_cancellation() {
        let mut scheduler = ManualScheduler::new();
        let mut first = scheduler.schedule(Duration::from_millis(10), AdvanceTicket { generation: 1 });
        let _second = scheduler.schedule(Duration::from_millis(20), AdvanceTicket { generation: 2 });
        first.cancel();

        assert_eq!(scheduler.pending(), vec![AdvanceTicket { generation: 2 }]);
        assert_eq!(scheduler.scheduled().len(), 2);
        assert_eq!(scheduler.last().map(|s| s.delay), Some(Duration::from_millis(20)));
    }
}
