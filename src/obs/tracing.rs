// self
use crate::{
	_prelude::*, envelope::ExpirySignal, obs::Operation, request::RequestKey, store::StoreError,
};

/// Type alias that resolves to an instrumented future when tracing is enabled.
#[cfg(feature = "tracing")]
pub type InstrumentedOperation<F> = tracing::instrument::Instrumented<F>;
/// Passthrough future type when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedOperation<F> = F;

/// A span builder used by client operations.
#[derive(Clone, Debug)]
pub struct OperationSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl OperationSpan {
	/// Creates a new span tagged with the provided operation + stage.
	pub fn new(operation: Operation, stage: &'static str) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span =
				tracing::info_span!("retoken.operation", operation = operation.as_str(), stage);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (operation, stage);

			Self {}
		}
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedOperation<Fut>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			use tracing::Instrument;

			fut.instrument(self.span.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}
}

/// Logs an outbound dispatch. Never logs header values or bodies.
pub fn log_dispatch(method: &str, url: &Url, retried: bool) {
	#[cfg(feature = "tracing")]
	tracing::debug!(method, url = url.as_str(), retried, "dispatching request");
	#[cfg(not(feature = "tracing"))]
	let _ = (method, url, retried);
}

/// Logs that an in-flight request was aborted in favor of an identical one.
pub fn log_superseded(key: &RequestKey) {
	#[cfg(feature = "tracing")]
	tracing::debug!(key = key.as_str(), "superseding identical in-flight request");
	#[cfg(not(feature = "tracing"))]
	let _ = key;
}

/// Logs an auth-expiry signal and whether the request will be replayed.
pub fn log_expired(path: &str, signal: ExpirySignal, will_retry: bool) {
	#[cfg(feature = "tracing")]
	tracing::info!(path, signal = %signal, will_retry, "credential expired");
	#[cfg(not(feature = "tracing"))]
	let _ = (path, signal, will_retry);
}

/// Logs the settlement of a refresh cycle.
pub fn log_refresh_settled(succeeded: bool, waiters: usize) {
	#[cfg(feature = "tracing")]
	{
		if succeeded {
			tracing::info!(waiters, "token refresh succeeded");
		} else {
			tracing::warn!(waiters, "token refresh failed; credentials cleared");
		}
	}
	#[cfg(not(feature = "tracing"))]
	let _ = (succeeded, waiters);
}

/// Logs a failure to clear credentials after a failed refresh.
pub fn log_clear_failed(error: &StoreError) {
	#[cfg(feature = "tracing")]
	tracing::error!(error = %error, "failed to clear stored credentials");
	#[cfg(not(feature = "tracing"))]
	let _ = error;
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[tokio::test]
	async fn instrument_wraps_future() {
		let span = OperationSpan::new(Operation::Refresh, "instrument_wraps_future");
		let value = span.instrument(async { 42 }).await;

		assert_eq!(value, 42);
	}

	#[test]
	fn log_helpers_accept_all_inputs() {
		let url = Url::parse("https://api.example.com/orders").expect("URL fixture should parse.");

		log_dispatch("GET", &url, false);
		log_expired("/orders", ExpirySignal::Code(-101), true);
		log_refresh_settled(false, 3);
		log_clear_failed(&StoreError::Backend { message: "read-only".into() });
	}
}
