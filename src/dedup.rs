//! In-flight registry that keeps at most one live request per [`RequestKey`].
//!
//! Registering a key that is already present aborts the previous request before the new handle is
//! stored, so a second identical call preempts the first instead of queueing behind it.

// std
use std::sync::atomic::{AtomicU64, Ordering};
// crates.io
use futures::future::{AbortHandle, AbortRegistration};
// self
use crate::{_prelude::*, request::RequestKey};

#[derive(Debug)]
struct Entry {
	ticket: u64,
	handle: AbortHandle,
}

/// Thread-safe map from request identity to the abort handle of the live request.
#[derive(Debug, Default)]
pub struct InFlightRegistry {
	entries: Mutex<HashMap<RequestKey, Entry>>,
	next_ticket: AtomicU64,
}
impl InFlightRegistry {
	/// Registers a new request under `key`, aborting any request already registered there.
	///
	/// The returned guard unregisters the entry when dropped; pair the registration with
	/// [`futures::future::Abortable`] around the transport future.
	pub fn register(self: &Arc<Self>, key: RequestKey) -> (InFlightGuard, AbortRegistration) {
		let ticket = self.next_ticket.fetch_add(1, Ordering::Relaxed);
		let (handle, registration) = AbortHandle::new_pair();
		let previous = self.entries.lock().insert(key.clone(), Entry { ticket, handle });

		if let Some(previous) = previous {
			crate::obs::log_superseded(&key);
			previous.handle.abort();
		}

		(InFlightGuard { registry: Arc::clone(self), key, ticket }, registration)
	}

	/// Removes the entry for `key` if it still belongs to `ticket`.
	///
	/// A request that was superseded no longer owns the slot, so its cleanup leaves the
	/// replacement's entry in place.
	pub fn unregister(&self, key: &RequestKey, ticket: u64) -> bool {
		let mut entries = self.entries.lock();

		match entries.get(key) {
			Some(entry) if entry.ticket == ticket => {
				entries.remove(key);

				true
			},
			_ => false,
		}
	}

	/// Returns true when a request with `key` is currently registered.
	pub fn contains(&self, key: &RequestKey) -> bool {
		self.entries.lock().contains_key(key)
	}

	/// Number of live entries.
	pub fn len(&self) -> usize {
		self.entries.lock().len()
	}

	/// Returns true when nothing is in flight.
	pub fn is_empty(&self) -> bool {
		self.entries.lock().is_empty()
	}
}

/// Unregisters its entry from the [`InFlightRegistry`] on drop.
#[derive(Debug)]
pub struct InFlightGuard {
	registry: Arc<InFlightRegistry>,
	key: RequestKey,
	ticket: u64,
}
impl InFlightGuard {
	/// Key this guard was registered under.
	pub fn key(&self) -> &RequestKey {
		&self.key
	}

	/// Ticket distinguishing this registration from later ones under the same key.
	pub fn ticket(&self) -> u64 {
		self.ticket
	}
}
impl Drop for InFlightGuard {
	fn drop(&mut self) {
		self.registry.unregister(&self.key, self.ticket);
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use futures::future::{Abortable, Aborted, pending};
	// self
	use super::*;
	use crate::request::{Method, RequestDescriptor};

	fn key(path: &str) -> RequestKey {
		RequestDescriptor::new(Method::Get, path).key()
	}

	#[tokio::test]
	async fn registering_duplicate_aborts_previous() {
		let registry = Arc::new(InFlightRegistry::default());
		let (first_guard, first_registration) = registry.register(key("/profile"));
		let first = Abortable::new(pending::<()>(), first_registration);
		let (second_guard, second_registration) = registry.register(key("/profile"));
		let second = Abortable::new(async { 7 }, second_registration);

		assert_eq!(first.await, Err(Aborted));
		assert_eq!(second.await, Ok(7));
		assert_eq!(registry.len(), 1);

		drop(first_guard);

		assert!(
			registry.contains(&key("/profile")),
			"A superseded guard must not remove its replacement."
		);

		drop(second_guard);

		assert!(registry.is_empty());
	}

	#[tokio::test]
	async fn distinct_keys_do_not_interfere() {
		let registry = Arc::new(InFlightRegistry::default());
		let (a, registration_a) = registry.register(key("/a"));
		let (_b, _registration_b) = registry.register(key("/b"));

		assert_eq!(registry.len(), 2);
		assert_eq!(Abortable::new(async { 1 }, registration_a).await, Ok(1));

		drop(a);

		assert!(!registry.contains(&key("/a")));
		assert!(registry.contains(&key("/b")));
	}

	#[test]
	fn stale_ticket_does_not_unregister() {
		let registry = Arc::new(InFlightRegistry::default());
		let (guard, _registration) = registry.register(key("/a"));

		assert!(!registry.unregister(guard.key(), guard.ticket() + 1));
		assert!(registry.unregister(guard.key(), guard.ticket()));
		assert!(registry.is_empty());
	}
}
