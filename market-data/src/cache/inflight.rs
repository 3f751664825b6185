//! In-flight request coalescing

use crate::data::BarSet;
use crate::error::FetchError;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::watch;

/// Outcome shared by every caller of one fetch
pub type FlightResult = Result<BarSet, FetchError>;

type Slot = Option<FlightResult>;

struct Flight {
    id: u64,
    rx: watch::Receiver<Slot>,
}

/// Table of fetches currently running, one per canonical key.
///
/// The first caller for a key becomes the owner and must resolve its
/// [`FlightTicket`]; everyone else joins and waits on a [`FlightHandle`].
#[derive(Default)]
pub struct InFlightCoalescer {
    flights: Mutex<HashMap<String, Flight>>,
    next_id: AtomicU64,
}

/// Result of [`InFlightCoalescer::claim`]
pub enum Claim {
    /// Caller must perform the fetch and resolve the ticket
    Owner(FlightTicket, FlightHandle),
    /// A fetch for this key is already running
    Joined(FlightHandle),
}

impl InFlightCoalescer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Become the owner of `key`, or join the fetch already running for it
    pub fn claim(self: &Arc<Self>, key: &str) -> Claim {
        let mut flights = self.flights.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(flight) = flights.get(key) {
            return Claim::Joined(FlightHandle {
                rx: flight.rx.clone(),
            });
        }

        let (tx, rx) = watch::channel(None);
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        flights.insert(
            key.to_string(),
            Flight {
                id,
                rx: rx.clone(),
            },
        );

        let ticket = FlightTicket {
            key: key.to_string(),
            id,
            tx,
            coalescer: Arc::clone(self),
            resolved: false,
        };
        Claim::Owner(ticket, FlightHandle { rx })
    }

    /// Number of fetches currently running
    pub fn len(&self) -> usize {
        self.flights
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_in_flight(&self, key: &str) -> bool {
        self.flights
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(key)
    }

    /// Forget every running fetch.
    ///
    /// Callers already waiting still receive their owner's result; the next
    /// caller for any key starts a fresh fetch.
    pub fn clear(&self) {
        self.flights
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    fn holds(&self, key: &str, id: u64) -> bool {
        self.flights
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .is_some_and(|f| f.id == id)
    }

    fn release(&self, key: &str, id: u64) {
        let mut flights = self.flights.lock().unwrap_or_else(PoisonError::into_inner);
        if flights.get(key).is_some_and(|f| f.id == id) {
            flights.remove(key);
        }
    }
}

/// Ownership of one running fetch.
///
/// Dropping an unresolved ticket fails all waiters with an internal error
/// and frees the key.
pub struct FlightTicket {
    key: String,
    id: u64,
    tx: watch::Sender<Slot>,
    coalescer: Arc<InFlightCoalescer>,
    resolved: bool,
}

impl FlightTicket {
    pub fn key(&self) -> &str {
        &self.key
    }

    /// False once the key was cleared or taken over by a newer fetch
    pub fn is_current(&self) -> bool {
        self.coalescer.holds(&self.key, self.id)
    }

    /// Free the key and deliver `result` to every waiter
    pub fn resolve(mut self, result: FlightResult) {
        self.finish(result);
    }

    fn finish(&mut self, result: FlightResult) {
        self.coalescer.release(&self.key, self.id);
        self.tx.send_replace(Some(result));
        self.resolved = true;
    }
}

impl Drop for FlightTicket {
    fn drop(&mut self) {
        if !self.resolved {
            self.finish(Err(FetchError::internal(format!(
                "fetch for {} was abandoned before completing",
                self.key
            ))));
        }
    }
}

/// Waits for the outcome of a running fetch
pub struct FlightHandle {
    rx: watch::Receiver<Slot>,
}

impl FlightHandle {
    pub async fn wait(mut self) -> FlightResult {
        match self.rx.wait_for(Option::is_some).await {
            Ok(slot) => match &*slot {
                Some(result) => result.clone(),
                None => Err(FetchError::internal("in-flight result missing")),
            },
            Err(_) => Err(FetchError::internal("in-flight fetch ended without a result")),
        }
    }
}
