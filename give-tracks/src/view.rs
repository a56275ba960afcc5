//! Pending view window bookkeeping.
//!
//! Fetching and ingesting data for a window happens outside the trees and may
//! be overtaken by a newer window. Every request hands out a [Ticket]; when
//! the work finishes the ticket is checked against the latest request and
//! stale results come back as [Outcome::Cancelled] instead of an error.
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use log::debug;

use give_core::models::Region;

///
/// Shared cancellation flag. Clones observe the same flag.
///
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        CancellationToken::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome<T> {
    Done(T),
    Cancelled,
}

impl<T> Outcome<T> {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Outcome::Cancelled)
    }

    pub fn done(self) -> Option<T> {
        match self {
            Outcome::Done(value) => Some(value),
            Outcome::Cancelled => None,
        }
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Outcome<U> {
        match self {
            Outcome::Done(value) => Outcome::Done(f(value)),
            Outcome::Cancelled => Outcome::Cancelled,
        }
    }
}

///
/// Handle of one window request.
///
#[derive(Debug, Clone)]
pub struct Ticket {
    generation: u64,
    window: Region,
    token: CancellationToken,
}

impl Ticket {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn window(&self) -> &Region {
        &self.window
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Wrap `value`, or drop it if the ticket was superseded meanwhile.
    pub fn guard<T>(&self, value: T) -> Outcome<T> {
        if self.is_cancelled() {
            Outcome::Cancelled
        } else {
            Outcome::Done(value)
        }
    }
}

///
/// The window currently shown plus the one being prepared.
///
#[derive(Debug, Default)]
pub struct ViewWindow {
    current: Option<Region>,
    pending: Option<Ticket>,
    generation: u64,
}

impl ViewWindow {
    pub fn new(current: Option<Region>) -> Self {
        ViewWindow {
            current,
            pending: None,
            generation: 0,
        }
    }

    pub fn current(&self) -> Option<&Region> {
        self.current.as_ref()
    }

    pub fn pending(&self) -> Option<&Region> {
        self.pending.as_ref().map(Ticket::window)
    }

    ///
    /// Start preparing `window`. A request still in flight is cancelled.
    ///
    pub fn request(&mut self, window: Region) -> Ticket {
        self.cancel();
        self.generation += 1;
        let ticket = Ticket {
            generation: self.generation,
            window,
            token: CancellationToken::new(),
        };
        self.pending = Some(ticket.clone());
        ticket
    }

    pub fn is_latest(&self, ticket: &Ticket) -> bool {
        self.pending
            .as_ref()
            .is_some_and(|pending| pending.generation == ticket.generation)
            && !ticket.is_cancelled()
    }

    ///
    /// Finish the request of `ticket`, making its window current. Stale
    /// tickets leave the view untouched.
    ///
    pub fn complete(&mut self, ticket: &Ticket) -> Outcome<Region> {
        if !self.is_latest(ticket) {
            debug!(
                "Dropping stale view window {} (request {})",
                ticket.window, ticket.generation
            );
            return Outcome::Cancelled;
        }
        self.pending = None;
        self.current = Some(ticket.window.clone());
        Outcome::Done(ticket.window.clone())
    }

    /// Abandon the request in flight, if any.
    pub fn cancel(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.token.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;
    use rstest::*;

    fn window(start: u32, end: u32) -> Region {
        Region::new("chr1", start, end)
    }

    #[rstest]
    fn test_latest_request_wins() {
        let mut view = ViewWindow::new(Some(window(0, 100)));
        let first = view.request(window(100, 200));
        let second = view.request(window(200, 300));

        assert!(first.is_cancelled());
        assert_eq!(view.complete(&first), Outcome::Cancelled);
        assert_eq!(view.current(), Some(&window(0, 100)));

        assert_eq!(view.complete(&second), Outcome::Done(window(200, 300)));
        assert_eq!(view.current(), Some(&window(200, 300)));
        assert_eq!(view.pending(), None);
        assert_eq!(view.complete(&second), Outcome::Cancelled);
    }

    #[rstest]
    fn test_token_is_shared() {
        let mut view = ViewWindow::default();
        let ticket = view.request(window(0, 10));
        let worker_token = ticket.token().clone();
        assert_eq!(ticket.guard(5), Outcome::Done(5));

        view.cancel();
        assert!(worker_token.is_cancelled());
        assert_eq!(ticket.guard(5), Outcome::Cancelled);
        assert_eq!(view.complete(&ticket).map(|region| region.len()), Outcome::Cancelled);
    }
}
