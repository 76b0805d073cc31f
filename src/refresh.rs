//! Single-flight token refresh coordination.
//!
//! A [`RefreshCoordinator`] is either idle or refreshing. The first caller that needs a new
//! credential becomes the leader and runs the refresh routine; everyone arriving while the refresh
//! is in flight parks a oneshot waiter and is released, in registration order, with the leader's
//! result. The state returns to idle on every path, including the leader's future being dropped.

mod metrics;

pub use metrics::RefreshMetrics;

// crates.io
use futures::channel::oneshot;
// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	error::RefreshError,
	obs::{self, Operation, OperationSpan, Outcome},
};

type RefreshResult = Result<TokenSecret, RefreshError>;
type Waiter = oneshot::Sender<RefreshResult>;

#[derive(Debug, Default)]
enum RefreshState {
	#[default]
	Idle,
	Refreshing {
		waiters: Vec<Waiter>,
	},
}

/// Per-client refresh state machine.
///
/// The state lives behind a synchronous mutex that is never held across an `.await`, so the
/// coordinator can be shared freely between tasks and threads.
#[derive(Debug, Default)]
pub struct RefreshCoordinator {
	state: Mutex<RefreshState>,
	metrics: Arc<RefreshMetrics>,
}
impl RefreshCoordinator {
	/// Runs `refresh` if no refresh is in flight, otherwise waits for the in-flight one.
	///
	/// `refresh` is invoked at most once per cycle, and only by the leader. It is responsible for
	/// persisting the new credential on success and for any cleanup on failure; the coordinator
	/// only fans the result out to the waiters.
	pub async fn refresh_or_wait<F, Fut>(&self, refresh: F) -> RefreshResult
	where
		F: FnOnce() -> Fut,
		Fut: Future<Output = RefreshResult>,
	{
		let receiver = {
			let mut state = self.state.lock();

			if let RefreshState::Refreshing { waiters } = &mut *state {
				let (sender, receiver) = oneshot::channel();

				waiters.push(sender);

				Some(receiver)
			} else {
				*state = RefreshState::Refreshing { waiters: Vec::new() };

				None
			}
		};

		match receiver {
			Some(receiver) => {
				self.metrics.record_waiter();
				obs::record_outcome(Operation::Refresh, Outcome::Queued);

				receiver.await.unwrap_or(Err(RefreshError::Abandoned))
			},
			None => {
				let span = OperationSpan::new(Operation::Refresh, "refresh_or_wait");

				span.instrument(self.lead(refresh)).await
			},
		}
	}

	/// Returns true while a refresh is in flight.
	pub fn is_refreshing(&self) -> bool {
		matches!(*self.state.lock(), RefreshState::Refreshing { .. })
	}

	/// Number of callers currently parked behind the in-flight refresh.
	pub fn waiting(&self) -> usize {
		match &*self.state.lock() {
			RefreshState::Refreshing { waiters } => waiters.len(),
			RefreshState::Idle => 0,
		}
	}

	/// Counters for this coordinator.
	pub fn metrics(&self) -> &Arc<RefreshMetrics> {
		&self.metrics
	}

	async fn lead<F, Fut>(&self, refresh: F) -> RefreshResult
	where
		F: FnOnce() -> Fut,
		Fut: Future<Output = RefreshResult>,
	{
		let mut cycle = Cycle { coordinator: self, settled: false };

		self.metrics.record_attempt();
		obs::record_outcome(Operation::Refresh, Outcome::Attempt);

		let result = refresh().await;

		cycle.settle(result.clone());

		result
	}

	fn settle(&self, result: RefreshResult) {
		let waiters = match std::mem::take(&mut *self.state.lock()) {
			RefreshState::Refreshing { waiters } => waiters,
			RefreshState::Idle => Vec::new(),
		};

		match &result {
			Ok(_) => {
				self.metrics.record_success();
				obs::record_outcome(Operation::Refresh, Outcome::Success);
			},
			Err(_) => {
				self.metrics.record_failure();
				obs::record_outcome(Operation::Refresh, Outcome::Failure);
			},
		}

		obs::log_refresh_settled(result.is_ok(), waiters.len());

		for waiter in waiters {
			// A waiter whose caller went away has nothing left to resume.
			let _ = waiter.send(result.clone());
		}
	}
}

/// Returns the coordinator to idle exactly once, even if the leader is dropped mid-refresh.
struct Cycle<'a> {
	coordinator: &'a RefreshCoordinator,
	settled: bool,
}
impl Cycle<'_> {
	fn settle(&mut self, result: RefreshResult) {
		self.settled = true;
		self.coordinator.settle(result);
	}
}
impl Drop for Cycle<'_> {
	fn drop(&mut self) {
		if !self.settled {
			self.settle(Err(RefreshError::Abandoned));
		}
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::sync::atomic::{AtomicUsize, Ordering};
	// crates.io
	use futures::{StreamExt, future, stream::FuturesUnordered};
	// self
	use super::*;

	type Task<'a> = Pin<Box<dyn Future<Output = ()> + 'a>>;

	#[tokio::test]
	async fn waiters_resume_in_registration_order_after_single_refresh() {
		let coordinator = RefreshCoordinator::default();
		let calls = AtomicUsize::new(0);
		let order = Mutex::new(Vec::new());
		let (release, gate) = oneshot::channel::<()>();
		let mut tasks = FuturesUnordered::<Task<'_>>::new();

		{
			let (coordinator, calls, order) = (&coordinator, &calls, &order);

			tasks.push(Box::pin(async move {
				let token = coordinator
					.refresh_or_wait(move || async move {
						calls.fetch_add(1, Ordering::SeqCst);
						let _ = gate.await;

						Ok(TokenSecret::new("fresh"))
					})
					.await
					.expect("Leader refresh should succeed.");

				assert_eq!(token.expose(), "fresh");
				order.lock().push(0);
			}));

			for idx in 1..=3 {
				tasks.push(Box::pin(async move {
					let token = coordinator
						.refresh_or_wait(|| async { Err(RefreshError::MissingToken) })
						.await
						.expect("Waiters should receive the leader's token.");

					assert_eq!(token.expose(), "fresh");
					order.lock().push(idx);
				}));
			}

			tasks.push(Box::pin(async move {
				release.send(()).expect("Leader should still be waiting on the gate.");
			}));
		}

		while tasks.next().await.is_some() {}

		assert_eq!(calls.load(Ordering::SeqCst), 1);
		assert_eq!(*order.lock(), vec![0, 1, 2, 3]);
		assert!(!coordinator.is_refreshing());
		assert_eq!(coordinator.metrics().attempts(), 1);
		assert_eq!(coordinator.metrics().successes(), 1);
		assert_eq!(coordinator.metrics().waiters(), 3);
	}

	#[tokio::test]
	async fn failure_rejects_every_waiter_with_the_same_error() {
		let coordinator = RefreshCoordinator::default();
		let failure = RefreshError::Rejected { status: 200, code: Some(-1) };
		let (release, gate) = oneshot::channel::<()>();
		let expected = failure.clone();
		let mut leader = Box::pin(coordinator.refresh_or_wait(move || async move {
			let _ = gate.await;

			Err(failure)
		}));

		assert!(futures::poll!(leader.as_mut()).is_pending());

		let mut waiter = Box::pin(coordinator.refresh_or_wait(|| async { Ok(TokenSecret::new("x")) }));

		assert!(futures::poll!(waiter.as_mut()).is_pending());
		assert_eq!(coordinator.waiting(), 1);

		release.send(()).expect("Leader should still be waiting on the gate.");

		assert_eq!(leader.await, Err(expected.clone()));
		assert_eq!(waiter.await, Err(expected));
		assert!(!coordinator.is_refreshing());
		assert_eq!(coordinator.metrics().failures(), 1);
	}

	#[tokio::test]
	async fn dropping_the_leader_resets_state_and_rejects_waiters() {
		let coordinator = RefreshCoordinator::default();
		let mut leader = Box::pin(coordinator.refresh_or_wait(future::pending));

		assert!(futures::poll!(leader.as_mut()).is_pending());
		assert!(coordinator.is_refreshing());

		let mut waiter =
			Box::pin(coordinator.refresh_or_wait(|| async { Err(RefreshError::MissingToken) }));

		assert!(futures::poll!(waiter.as_mut()).is_pending());

		drop(leader);

		assert!(!coordinator.is_refreshing());
		assert_eq!(waiter.await, Err(RefreshError::Abandoned));
	}

	#[tokio::test]
	async fn a_new_cycle_starts_after_the_previous_one_settles() {
		let coordinator = RefreshCoordinator::default();
		let first = coordinator.refresh_or_wait(|| async { Ok(TokenSecret::new("one")) }).await;
		let second = coordinator.refresh_or_wait(|| async { Ok(TokenSecret::new("two")) }).await;

		assert_eq!(first.map(|t| t.expose().to_owned()), Ok("one".to_owned()));
		assert_eq!(second.map(|t| t.expose().to_owned()), Ok("two".to_owned()));
		assert_eq!(coordinator.metrics().attempts(), 2);
	}
}
