//! Orchestration layer of the test session engine.
//!
//! Drives a server-authoritative test session over the ActionCall protocol:
//! every transition is a round trip, the returned context replaces the
//! previous one wholesale, and the time constraint tracker restarts from
//! each new context. Pure structure and countdown logic live in
//! `runner-core`; this crate adds the transport, the item surface seam and
//! the state machine itself.

#![forbid(unsafe_code)]

pub mod delivery;
pub mod error;
pub mod events;
pub mod item;
pub mod session;
pub mod tracker;
pub mod transport;

pub use runner_core::Clock;

pub use delivery::DeliveryNotifier;
pub use error::{ItemServiceError, SessionError, TransportError};
pub use events::{EngineEvent, EventReceiver};
pub use item::{InertItemService, ItemService, ItemServiceFactory, ItemServiceRegistry};
pub use session::{ExitPrompt, TestSession};
pub use tracker::{TimeConstraintTracker, TimerSignal};
pub use transport::{ActionParams, ActionReply, ActionTransport, HttpTransport, TransportConfig};
