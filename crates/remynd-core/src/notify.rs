//! Outbound notification capability trait.
//!
//! Fire-and-forget from the engine's perspective: a send either succeeds or
//! fails with a reason. There is no delivery receipt beyond that, and the
//! engine never retries synchronously -- the scheduler's next tick re-finds
//! anything that was not marked delivered.

use remynd_types::error::NotifyError;

/// Trait for message delivery channels.
///
/// Implementations live in remynd-infra (e.g., `TwilioNotifier`); tests
/// substitute recording fakes.
pub trait Notifier: Send + Sync {
    /// Send `message` to the user addressed by `owner`.
    fn send(
        &self,
        owner: &str,
        message: &str,
    ) -> impl std::future::Future<Output = Result<(), NotifyError>> + Send;
}
