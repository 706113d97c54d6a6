// crates.io
use tokio::sync::oneshot;
// self
use crate::{
	_prelude::*,
	auth::{CredentialPair, TokenSecret},
	obs::{self, OpKind},
	renewal::RenewalFailure,
	store::{CredentialStore, StoreError},
};

pub(crate) type RenewalOutcome = Result<TokenSecret, RenewalFailure>;

/// Observable phase of a gateway's renewal state machine.
///
/// A failed renewal clears the store and returns straight to `Idle`; the next 401 then fails
/// fast because no refresh token is left, which keeps the session invalidated until the next
/// login without a separate phase.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum RenewalPhase {
	/// No renewal in flight.
	#[default]
	Idle,
	/// Exactly one renewal in flight; further 401s queue behind it.
	Renewing,
}

#[derive(Debug, Default)]
struct RenewalState {
	phase: RenewalPhase,
	// Non-empty only while `phase == Renewing`.
	waiters: VecDeque<oneshot::Sender<RenewalOutcome>>,
	session_epoch: u64,
}

/// What a caller holding a 401 has to do next.
pub(crate) enum Ticket<'a> {
	/// Drive the renewal.
	Lead(Leadership<'a>),
	/// Wait for the in-flight renewal.
	Wait(oneshot::Receiver<RenewalOutcome>),
	/// A renewal already finished after the rejected request was sent; retry with this token.
	Reuse(TokenSecret),
}

/// Instance-owned single-flight coordinator.
///
/// Every method runs inside one `parking_lot` critical section and never awaits, so the
/// check-and-set on the phase cannot interleave with another caller.
#[derive(Debug, Default)]
pub(crate) struct RenewalCoordinator {
	state: Mutex<RenewalState>,
}
impl RenewalCoordinator {
	pub(crate) fn phase(&self) -> RenewalPhase {
		self.state.lock().phase
	}

	/// Decides, atomically, whether the caller leads, waits, or reuses a newer token.
	///
	/// `sent_with` is the access token the rejected request carried.
	pub(crate) fn begin(
		&self,
		store: &dyn CredentialStore,
		sent_with: Option<&TokenSecret>,
	) -> Result<Ticket<'_>, StoreError> {
		let mut state = self.state.lock();

		if state.phase == RenewalPhase::Renewing {
			let (tx, rx) = oneshot::channel();

			state.waiters.push_back(tx);

			return Ok(Ticket::Wait(rx));
		}

		let current = store.get()?;

		match current.as_ref() {
			Some(pair) if sent_with != Some(&pair.access_token) =>
				return Ok(Ticket::Reuse(pair.access_token.clone())),
			_ => {},
		}

		state.phase = RenewalPhase::Renewing;

		obs::record_event(OpKind::Renewal, "renewal_started");

		Ok(Ticket::Lead(Leadership {
			coordinator: self,
			epoch: state.session_epoch,
			current,
			settled: false,
		}))
	}

	/// Runs a session mutation (login, logout) and invalidates any in-flight renewal result.
	pub(crate) fn change_session<R>(&self, mutate: impl FnOnce() -> R) -> R {
		let mut state = self.state.lock();

		state.session_epoch = state.session_epoch.wrapping_add(1);

		mutate()
	}

	/// Takes the queued waiters in arrival order and returns to `Idle`.
	fn drain(&self) -> VecDeque<oneshot::Sender<RenewalOutcome>> {
		let mut state = self.state.lock();

		state.phase = RenewalPhase::Idle;

		std::mem::take(&mut state.waiters)
	}

	/// Resumes every waiter with `outcome`, oldest first.
	fn settle(&self, outcome: &RenewalOutcome) -> usize {
		let waiters = self.drain();
		let woken = waiters.len();

		for waiter in waiters {
			// A closed receiver means that caller was dropped; nothing to resume.
			let _ = waiter.send(outcome.clone());
		}

		woken
	}
}

/// Proof that the holder is the one caller allowed to renew.
///
/// Dropping it without calling [`Leadership::finish`] resumes every waiter with
/// [`RenewalFailure::Abandoned`] so no caller is left parked forever.
pub(crate) struct Leadership<'a> {
	coordinator: &'a RenewalCoordinator,
	epoch: u64,
	current: Option<CredentialPair>,
	settled: bool,
}
impl Leadership<'_> {
	/// Pair that was stored when the renewal started.
	pub(crate) fn current(&self) -> Option<&CredentialPair> {
		self.current.as_ref()
	}

	/// Stores the renewed pair unless the session changed since the renewal started.
	pub(crate) fn commit(
		&self,
		store: &dyn CredentialStore,
		pair: CredentialPair,
	) -> Result<(), RenewalFailure> {
		let state = self.coordinator.state.lock();

		if state.session_epoch != self.epoch {
			return Err(RenewalFailure::SessionChanged);
		}

		store.set(pair).map_err(|e| RenewalFailure::Storage { message: e.to_string() })
	}

	/// Clears the store after a failed renewal; returns `false` (and leaves the store alone)
	/// when the session already changed underneath the renewal.
	pub(crate) fn invalidate(&self, store: &dyn CredentialStore) -> Result<bool, StoreError> {
		let state = self.coordinator.state.lock();

		if state.session_epoch != self.epoch {
			return Ok(false);
		}

		store.clear()?;

		Ok(true)
	}

	/// Resumes every waiter with `outcome` and returns to `Idle`.
	pub(crate) fn finish(mut self, outcome: &RenewalOutcome) -> usize {
		self.settled = true;

		self.coordinator.settle(outcome)
	}
}
impl Drop for Leadership<'_> {
	fn drop(&mut self) {
		if !self.settled {
			obs::record_event(OpKind::Renewal, "renewal_abandoned");
			self.coordinator.settle(&Err(RenewalFailure::Abandoned));
		}
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::store::MemoryStore;

	fn store_with(access: &str) -> MemoryStore {
		MemoryStore::with_pair(CredentialPair::new(access).with_refresh_token("refresh"))
	}

	#[test]
	fn second_caller_waits_while_renewing() {
		let coordinator = RenewalCoordinator::default();
		let store = store_with("stale");
		let stale = TokenSecret::new("stale");
		let leader = coordinator.begin(&store, Some(&stale)).expect("Begin should read store.");

		assert!(matches!(leader, Ticket::Lead(_)));
		assert_eq!(coordinator.phase(), RenewalPhase::Renewing);

		let follower = coordinator.begin(&store, Some(&stale)).expect("Begin should read store.");

		assert!(matches!(follower, Ticket::Wait(_)));

		let Ticket::Lead(leadership) = leader else { unreachable!() };
		let Ticket::Wait(mut rx) = follower else { unreachable!() };
		let woken = leadership.finish(&Ok(TokenSecret::new("fresh")));

		assert_eq!(woken, 1);
		assert_eq!(coordinator.phase(), RenewalPhase::Idle);
		assert_eq!(
			rx.try_recv().expect("Waiter should be resumed."),
			Ok(TokenSecret::new("fresh"))
		);
	}

	#[test]
	fn waiters_are_drained_in_arrival_order() {
		let coordinator = RenewalCoordinator::default();
		let store = store_with("stale");
		let stale = TokenSecret::new("stale");
		let leader = coordinator.begin(&store, Some(&stale)).expect("Begin should read store.");
		let mut receivers = (0..4)
			.map(|_| match coordinator.begin(&store, Some(&stale)) {
				Ok(Ticket::Wait(rx)) => rx,
				_ => panic!("Callers behind the leader must wait."),
			})
			.collect::<Vec<_>>();

		for (position, waiter) in coordinator.drain().into_iter().enumerate() {
			waiter
				.send(Ok(TokenSecret::new(format!("slot-{position}"))))
				.expect("Receiver should still be open.");
		}

		for (position, rx) in receivers.iter_mut().enumerate() {
			assert_eq!(
				rx.try_recv().expect("Every waiter should be resumed."),
				Ok(TokenSecret::new(format!("slot-{position}")))
			);
		}

		let Ticket::Lead(leadership) = leader else { unreachable!() };

		assert_eq!(leadership.finish(&Ok(TokenSecret::new("fresh"))), 0);
		assert_eq!(coordinator.phase(), RenewalPhase::Idle);
	}

	#[test]
	fn newer_stored_token_is_reused_without_renewing() {
		let coordinator = RenewalCoordinator::default();
		let store = store_with("fresh");
		let ticket = coordinator
			.begin(&store, Some(&TokenSecret::new("stale")))
			.expect("Begin should read store.");

		match ticket {
			Ticket::Reuse(token) => assert_eq!(token.expose(), "fresh"),
			_ => panic!("A newer stored token must be reused."),
		}

		assert_eq!(coordinator.phase(), RenewalPhase::Idle);
	}

	#[test]
	fn dropped_leader_releases_waiters() {
		let coordinator = RenewalCoordinator::default();
		let store = store_with("stale");
		let stale = TokenSecret::new("stale");
		let leader = coordinator.begin(&store, Some(&stale)).expect("Begin should read store.");
		let Ticket::Wait(mut rx) =
			coordinator.begin(&store, Some(&stale)).expect("Begin should read store.")
		else {
			panic!("Second caller must wait.");
		};

		drop(leader);

		assert_eq!(coordinator.phase(), RenewalPhase::Idle);
		assert_eq!(
			rx.try_recv().expect("Waiter should be resumed."),
			Err(RenewalFailure::Abandoned)
		);
	}

	#[test]
	fn session_change_blocks_commit_and_invalidate() {
		let coordinator = RenewalCoordinator::default();
		let store = store_with("stale");
		let Ticket::Lead(leadership) = coordinator
			.begin(&store, Some(&TokenSecret::new("stale")))
			.expect("Begin should read store.")
		else {
			panic!("First caller must lead.");
		};

		coordinator.change_session(|| store.clear()).expect("Clearing memory store succeeds.");

		assert_eq!(
			leadership.commit(&store, CredentialPair::new("fresh")),
			Err(RenewalFailure::SessionChanged)
		);
		assert_eq!(leadership.invalidate(&store), Ok(false));
		assert!(store.get().expect("Memory store reads succeed.").is_none());

		leadership.finish(&Err(RenewalFailure::SessionChanged));

		assert_eq!(coordinator.phase(), RenewalPhase::Idle);
	}
}
