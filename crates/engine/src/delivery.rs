//! Lifecycle signals to the delivery/host authority.

/// Notified of session lifecycle transitions. The host owns what happens
/// next: it drives loaders, redirects on authorization loss and takes over
/// after `finish`.
pub trait DeliveryNotifier: Send + Sync {
    /// A transition started; the host may show a loader.
    fn loading(&self);

    /// A transition finished; the host may hide its loader.
    fn unloading(&self);

    /// The engine is up and an item surface is ready for the candidate.
    fn service_ready(&self);

    /// The remote session is no longer authorized; the host should redirect
    /// or terminate rather than retry.
    fn service_forbidden(&self);

    /// The session reached its terminal state; control passes to the host.
    fn finish(&self);
}
