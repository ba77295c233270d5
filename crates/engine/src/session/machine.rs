use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use runner_core::model::{
    Action, ItemExitCode, ItemSessionState, MetaData, TestContext, TestExitCode, TestState,
};
use runner_core::time::Clock;

use crate::delivery::DeliveryNotifier;
use crate::error::{SessionError, TransportError};
use crate::events::{self, EngineEvent, EventReceiver, EventSender};
use crate::item::{ItemService, ItemServiceRegistry};
use crate::tracker::{TimeConstraintTracker, TimerSignal};
use crate::transport::{ActionParams, ActionReply, ActionTransport};

/// Counts shown to the candidate before they confirm leaving the test.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitPrompt {
    /// Items not yet completed.
    pub unanswered: u32,
    /// Items already completed.
    pub completed: u32,
}

struct SessionState {
    context: TestContext,
    tracker: TimeConstraintTracker,
    item_service: Arc<dyn ItemService>,
    /// Mutual exclusion for the ActionCall protocol: at most one call is
    /// ever in flight; further transition requests are dropped, not queued.
    in_flight: bool,
    /// Sequence number of the most recently issued call. A reply is applied
    /// only when its sequence is still the latest, so a stale reply can
    /// never overwrite a newer context.
    seq: u64,
    pending_exit: bool,
    closed: bool,
}

/// The session state machine.
///
/// Owns the current [`TestContext`] exclusively: every transition is
/// requested from the remote authority, and on confirmation the returned
/// context replaces the previous one wholesale. The tracker of time
/// constraints is rebuilt from each new context, and the presentation
/// adapter observes everything through the event stream returned by
/// [`TestSession::start`].
pub struct TestSession {
    transport: Arc<dyn ActionTransport>,
    items: ItemServiceRegistry,
    delivery: Arc<dyn DeliveryNotifier>,
    events: EventSender,
    state: Mutex<SessionState>,
}

impl TestSession {
    /// Starts a session from a server-issued context.
    ///
    /// A context already in `Closed` state hands control straight back to
    /// the delivery host (`finish`); otherwise the countdowns start, the
    /// initial item is loaded and an `Updated` event is emitted.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Item` when the context declares an item
    /// service kind no factory was registered for.
    pub async fn start(
        context: TestContext,
        clock: Clock,
        transport: Arc<dyn ActionTransport>,
        items: ItemServiceRegistry,
        delivery: Arc<dyn DeliveryNotifier>,
    ) -> Result<(Self, EventReceiver), SessionError> {
        let (events, receiver) = events::channel();
        let closed = context.state == TestState::Closed;
        let item_service = items.resolve(&context)?;
        let mut tracker = TimeConstraintTracker::new(clock);

        if !closed {
            tracker.rebuild(&context);
        }

        let load_item = !closed
            && context.item_session_state == ItemSessionState::Interacting
            && !context.is_timeout;
        let snapshot = context.clone();

        let session = Self {
            transport,
            items,
            delivery,
            events,
            state: Mutex::new(SessionState {
                context,
                tracker,
                item_service: Arc::clone(&item_service),
                in_flight: false,
                seq: 0,
                pending_exit: false,
                closed,
            }),
        };

        if closed {
            session.emit(EngineEvent::Closed);
            session.delivery.finish();
        } else {
            session.emit(EngineEvent::Updated(Box::new(snapshot)));
            if load_item {
                if let Err(err) = item_service.load().await {
                    warn!(%err, "initial item load failed");
                }
            }
            session.delivery.service_ready();
        }

        Ok((session, receiver))
    }

    //
    // ─── TRANSITION API ────────────────────────────────────────────────────────
    //

    /// Moves to the next item.
    ///
    /// # Errors
    ///
    /// Propagates action call failures; see [`TestSession::jump`].
    pub async fn move_forward(&self) -> Result<(), SessionError> {
        self.dispatch(Action::MoveForward, None, ActionParams::default())
            .await
    }

    /// Moves to the previous item.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::BackwardNotAllowed` when the current context
    /// does not offer backward movement (always the case in linear mode).
    pub async fn move_backward(&self) -> Result<(), SessionError> {
        {
            let state = self.state.lock();
            if !state.closed && !state.context.offers_backward() {
                return Err(SessionError::BackwardNotAllowed);
            }
        }
        self.dispatch(Action::MoveBackward, None, ActionParams::default())
            .await
    }

    /// Skips the current item without answering it.
    ///
    /// # Errors
    ///
    /// Propagates action call failures; see [`TestSession::jump`].
    pub async fn skip(&self) -> Result<(), SessionError> {
        self.dispatch(Action::Skip, None, ActionParams::default())
            .await
    }

    /// Jumps to the item at the given global position.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Closed` after the session terminated,
    /// `SessionError::ActionUnavailable` when the server offers no endpoint
    /// for the action, and transport or item-surface failures otherwise.
    /// A request made while another call is in flight is dropped silently.
    pub async fn jump(&self, position: usize) -> Result<(), SessionError> {
        self.dispatch(
            Action::Jump,
            None,
            ActionParams::default().with_position(position),
        )
        .await
    }

    /// Forced transition after a time constraint ran out. Triggered by the
    /// tracker rather than the candidate: the local context is defensively
    /// flagged as timed out and all countdowns are cancelled before the
    /// round trip, and the call always carries the `TIMEOUT` item exit code.
    ///
    /// # Errors
    ///
    /// Propagates action call failures; see [`TestSession::jump`].
    pub async fn timeout(&self) -> Result<(), SessionError> {
        {
            let mut state = self.state.lock();
            if state.closed {
                return Err(SessionError::Closed);
            }
            state.context.is_timeout = true;
            state.tracker.clear();
        }
        self.dispatch(
            Action::Timeout,
            Some(MetaData::item_exit(ItemExitCode::Timeout)),
            ActionParams::default(),
        )
        .await
    }

    /// Requests to leave the test. This is only the confirmation gate: no
    /// network request happens until [`TestSession::confirm_exit`].
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Closed` after the session terminated.
    pub fn exit(&self) -> Result<ExitPrompt, SessionError> {
        let mut state = self.state.lock();
        if state.closed {
            return Err(SessionError::Closed);
        }
        state.pending_exit = true;
        let progress = state.context.progress();
        Ok(ExitPrompt {
            unanswered: progress.remaining,
            completed: progress.completed,
        })
    }

    /// Withdraws a pending exit request.
    pub fn cancel_exit(&self) {
        self.state.lock().pending_exit = false;
    }

    /// Ends the test session after the candidate confirmed the exit prompt,
    /// recording an `INCOMPLETE` test exit code.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NoPendingExit` unless [`TestSession::exit`]
    /// was called first; otherwise propagates action call failures.
    pub async fn confirm_exit(&self) -> Result<(), SessionError> {
        {
            let mut state = self.state.lock();
            if !state.pending_exit {
                return Err(SessionError::NoPendingExit);
            }
            state.pending_exit = false;
        }
        self.dispatch(
            Action::EndTestSession,
            Some(MetaData::test_exit(TestExitCode::Incomplete)),
            ActionParams::default(),
        )
        .await
    }

    /// Flags an item for later review.
    ///
    /// # Errors
    ///
    /// Always returns `SessionError::Unsupported`: the capability is a
    /// declared placeholder, not a silent no-op.
    pub fn mark_for_review(
        &self,
        _flag: bool,
        _position: usize,
        _item_identifier: &str,
    ) -> Result<(), SessionError> {
        Err(SessionError::Unsupported {
            action: "markForReview",
        })
    }

    /// Stores a candidate comment against the current item. An empty
    /// comment never issues a request.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Closed` after the session terminated,
    /// `SessionError::ActionUnavailable` when the server offers no comment
    /// endpoint, and transport failures otherwise.
    pub async fn store_comment(&self, comment: &str) -> Result<(), SessionError> {
        if comment.is_empty() {
            return Ok(());
        }
        let url = {
            let state = self.state.lock();
            if state.closed {
                return Err(SessionError::Closed);
            }
            state
                .context
                .endpoints
                .url_for(Action::Comment)
                .ok_or(SessionError::ActionUnavailable {
                    action: Action::Comment.name(),
                })?
                .to_string()
        };
        let params = ActionParams::default().with_comment(comment);
        self.transport.post(&url, &params).await?;
        Ok(())
    }

    //
    // ─── TIMERS ────────────────────────────────────────────────────────────────
    //

    /// Advances the countdowns by the elapsed wall-clock time and emits the
    /// resulting timer events. An expired constraint forces the `timeout`
    /// transition.
    ///
    /// Hosts either call this on their own cadence or let
    /// [`TestSession::spawn_ticker`] drive it.
    ///
    /// # Errors
    ///
    /// Propagates failures of the forced timeout call.
    pub async fn tick(&self) -> Result<(), SessionError> {
        let signals = {
            let mut state = self.state.lock();
            if state.closed {
                return Ok(());
            }
            state.tracker.tick()
        };

        let mut expired = false;
        for signal in signals {
            match signal {
                TimerSignal::Display {
                    qti_class,
                    source,
                    remaining,
                } => self.emit(EngineEvent::TimerDisplay {
                    qti_class,
                    source,
                    remaining,
                }),
                TimerSignal::Warning {
                    qti_class,
                    source,
                    remaining,
                } => self.emit(EngineEvent::TimerWarning {
                    qti_class,
                    source,
                    remaining,
                }),
                TimerSignal::Expired { qti_class, source } => {
                    self.emit(EngineEvent::TimerExpired { qti_class, source });
                    expired = true;
                }
            }
        }

        if expired {
            self.timeout().await
        } else {
            Ok(())
        }
    }

    /// Drives [`TestSession::tick`] on a fixed cadence until the session
    /// closes.
    pub fn spawn_ticker(self: &Arc<Self>, period: Duration) -> JoinHandle<()> {
        let session = Arc::clone(self);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                if session.is_closed() {
                    break;
                }
                if let Err(err) = session.tick().await {
                    debug!(%err, "tick failed");
                }
            }
        })
    }

    //
    // ─── SNAPSHOTS ─────────────────────────────────────────────────────────────
    //

    /// A snapshot of the current context.
    #[must_use]
    pub fn context(&self) -> TestContext {
        self.state.lock().context.clone()
    }

    /// True while an action call is in flight.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.state.lock().in_flight
    }

    /// True once the session reached its terminal state.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    /// Whether backward movement is offered from the current context.
    #[must_use]
    pub fn offers_backward(&self) -> bool {
        self.state.lock().context.offers_backward()
    }

    //
    // ─── ACTION CALL PROTOCOL ──────────────────────────────────────────────────
    //

    /// Runs one ActionCall: finalize the current interaction, perform the
    /// single in-flight request, then apply (or discard) the reply.
    async fn dispatch(
        &self,
        action: Action,
        meta: Option<MetaData>,
        mut params: ActionParams,
    ) -> Result<(), SessionError> {
        let (url, seq, item_service) = {
            let mut state = self.state.lock();
            if state.closed {
                return Err(SessionError::Closed);
            }
            if state.in_flight {
                // Excess requests are dropped, not buffered.
                debug!(action = action.name(), "action call already in flight, dropping");
                return Ok(());
            }
            let url = state
                .context
                .endpoints
                .url_for(action)
                .ok_or(SessionError::ActionUnavailable {
                    action: action.name(),
                })?
                .to_string();
            state.in_flight = true;
            state.seq += 1;
            (url, state.seq, Arc::clone(&state.item_service))
        };

        if let Some(meta) = meta {
            params.meta_data = Some(meta);
        }

        self.delivery.loading();

        // No navigation while interaction state may still be in flight.
        if let Err(err) = item_service.kill().await {
            self.release(action, &err.to_string());
            return Err(err.into());
        }

        match self.transport.call(&url, &params).await {
            Ok(ActionReply::Closed) => {
                {
                    let mut state = self.state.lock();
                    state.closed = true;
                    state.in_flight = false;
                    state.tracker.clear();
                }
                self.emit(EngineEvent::Closed);
                self.delivery.finish();
                Ok(())
            }
            Ok(ActionReply::Context(context)) => self.apply(action, seq, *context).await,
            Err(TransportError::Unauthorized) => {
                // Stays disabled: the host redirects or terminates.
                warn!(action = action.name(), "session no longer authorized");
                self.delivery.service_forbidden();
                Err(TransportError::Unauthorized.into())
            }
            Err(err) => {
                // Fail closed on the wire, but hand control back to the
                // candidate for a fresh retry of the same transition.
                self.release(action, &err.to_string());
                Err(err.into())
            }
        }
    }

    /// Applies a confirmed transition: the reply becomes the new context,
    /// the tracker restarts from it and the new item surface is loaded.
    async fn apply(
        &self,
        action: Action,
        seq: u64,
        context: TestContext,
    ) -> Result<(), SessionError> {
        let applied = {
            let mut state = self.state.lock();
            if seq != state.seq {
                warn!(action = action.name(), "discarding stale action reply");
                return Ok(());
            }

            let state = &mut *state;
            match self.items.resolve(&context) {
                Ok(item_service) => {
                    state.closed = context.state == TestState::Closed;
                    state.context = context;
                    state.tracker.rebuild(&state.context);
                    state.item_service = Arc::clone(&item_service);
                    state.in_flight = false;

                    let load_item = !state.closed
                        && state.context.item_session_state == ItemSessionState::Interacting
                        && !state.context.is_timeout;
                    Ok((item_service, load_item, state.context.clone()))
                }
                Err(err) => Err(err),
            }
        };

        let (item_service, load_item, snapshot) = match applied {
            Ok(parts) => parts,
            Err(err) => {
                self.release(action, &err.to_string());
                return Err(err.into());
            }
        };

        let now_closed = snapshot.state == TestState::Closed;
        self.emit(EngineEvent::Updated(Box::new(snapshot)));

        if load_item {
            if let Err(err) = item_service.load().await {
                warn!(%err, "item load failed after transition");
            }
            self.delivery.service_ready();
        }
        self.delivery.unloading();

        // A full context in the terminal state ends the session just like
        // the bare closed sentinel does.
        if now_closed {
            self.emit(EngineEvent::Closed);
            self.delivery.finish();
        }
        Ok(())
    }

    /// Re-enables transitions after a failed call and surfaces the failure.
    fn release(&self, action: Action, reason: &str) {
        self.state.lock().in_flight = false;
        self.emit(EngineEvent::ActionFailed {
            action: action.name(),
            reason: reason.to_string(),
        });
        self.delivery.unloading();
    }

    fn emit(&self, event: EngineEvent) {
        // The adapter may have gone away; the engine does not care.
        let _ = self.events.send(event);
    }
}
