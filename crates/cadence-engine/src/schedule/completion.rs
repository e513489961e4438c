use std::cell::RefCell;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::sync::oneshot;

use super::frame::Report;

/// Resolves once with the run's final [`Report`].
///
/// Await it, or poll without blocking through [`try_report`](Self::try_report).
/// It never fails: a run that is dropped without terminating still resolves,
/// with [`Termination::Abandoned`](super::Termination::Abandoned).
pub struct Completion {
    rx: RefCell<Option<oneshot::Receiver<Report>>>,
    report: RefCell<Option<Report>>,
}

impl Completion {
    pub(crate) fn channel() -> (oneshot::Sender<Report>, Self) {
        let (tx, rx) = oneshot::channel();
        let completion = Self {
            rx: RefCell::new(Some(rx)),
            report: RefCell::new(None),
        };
        (tx, completion)
    }

    /// The final report, if the run has terminated.
    pub fn try_report(&self) -> Option<Report> {
        if let Some(report) = self.report.borrow().as_ref() {
            return Some(report.clone());
        }

        let mut rx = self.rx.borrow_mut();
        let received = match rx.as_mut()?.try_recv() {
            Ok(report) => report,
            Err(oneshot::error::TryRecvError::Empty) => return None,
            Err(oneshot::error::TryRecvError::Closed) => Report::abandoned(),
        };
        *rx = None;
        *self.report.borrow_mut() = Some(received.clone());
        Some(received)
    }

    pub fn is_resolved(&self) -> bool {
        self.try_report().is_some()
    }
}

impl Future for Completion {
    type Output = Report;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Report> {
        if let Some(report) = self.report.borrow().as_ref() {
            return Poll::Ready(report.clone());
        }

        let mut rx = self.rx.borrow_mut();
        let Some(inner) = rx.as_mut() else {
            return Poll::Ready(Report::abandoned());
        };

        let report = match Pin::new(inner).poll(cx) {
            Poll::Pending => return Poll::Pending,
            Poll::Ready(Ok(report)) => report,
            Poll::Ready(Err(_)) => Report::abandoned(),
        };
        *rx = None;
        *self.report.borrow_mut() = Some(report.clone());
        Poll::Ready(report)
    }
}

impl std::fmt::Debug for Completion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Completion")
            .field("report", &self.report.borrow())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::Termination;

    #[test]
    fn empty_until_sent() {
        let (tx, completion) = Completion::channel();
        assert!(completion.try_report().is_none());

        let report = Report {
            tick: 7,
            termination: Termination::Stopped,
            ..Report::default()
        };
        tx.send(report.clone()).unwrap();

        assert_eq!(completion.try_report(), Some(report.clone()));
        // Cached after the first read.
        assert_eq!(completion.try_report(), Some(report));
    }

    #[test]
    fn dropped_sender_resolves_as_abandoned() {
        let (tx, completion) = Completion::channel();
        drop(tx);
        let report = completion.try_report().unwrap();
        assert_eq!(report.termination, Termination::Abandoned);
    }

    #[tokio::test]
    async fn awaiting_yields_report() {
        let (tx, completion) = Completion::channel();
        tx.send(Report { tick: 3, ..Report::default() }).unwrap();
        assert_eq!(completion.await.tick, 3);
    }
}
