//! Navigation collaborator invoked when the client gives up on the current session.

// self
use crate::_prelude::*;

/// Sends the user back to an unauthenticated entry point.
///
/// The client calls [`redirect_to_login`](Navigator::redirect_to_login) exactly once per failed
/// refresh cycle, after the stored credentials have been cleared.
pub trait Navigator
where
	Self: Send + Sync,
{
	/// Navigates to `route` (for example `/pages/login/login`).
	fn redirect_to_login(&self, route: &str);
}

/// Navigator that does nothing; useful for headless callers that inspect [`Error`] instead.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopNavigator;
impl Navigator for NoopNavigator {
	fn redirect_to_login(&self, _route: &str) {}
}

/// Adapts a closure into a [`Navigator`].
pub struct FnNavigator<F>(pub F);
impl<F> Navigator for FnNavigator<F>
where
	F: Fn(&str) + Send + Sync,
{
	fn redirect_to_login(&self, route: &str) {
		(self.0)(route)
	}
}
impl<F> Debug for FnNavigator<F> {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("FnNavigator(..)")
	}
}
