//! Session invalidation hook.

// self
use crate::renewal::RenewalFailure;

/// Receives the forced-logout signal raised when a renewal fails.
///
/// Called once per failed renewal, after the credential store has been cleared and before
/// any waiting caller is resumed. Implementations must not block; hand the signal off to
/// whatever owns navigation (a channel, an event bus, a UI store).
pub trait SessionListener
where
	Self: Send + Sync,
{
	/// The session can no longer be renewed; the user has to log in again.
	fn session_invalidated(&self, failure: &RenewalFailure);
}
impl<F> SessionListener for F
where
	F: Fn(&RenewalFailure) + Send + Sync,
{
	fn session_invalidated(&self, failure: &RenewalFailure) {
		self(failure)
	}
}

/// Listener that ignores invalidations.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSessionListener;
impl SessionListener for NoopSessionListener {
	fn session_invalidated(&self, _failure: &RenewalFailure) {}
}
