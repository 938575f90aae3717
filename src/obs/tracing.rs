// self
use crate::{_prelude::*, auth::ScopeSet, obs::AuthOp};

/// Type alias that resolves to an instrumented future when tracing is enabled.
#[cfg(feature = "tracing")]
pub type InstrumentedOp<F> = tracing::instrument::Instrumented<F>;
/// Passthrough future type when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedOp<F> = F;

/// A span builder used by coordinator operations.
#[derive(Clone, Debug)]
pub struct OpSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl OpSpan {
	/// Creates a new span tagged with the provided operation + stage.
	pub fn new(op: AuthOp, stage: &'static str) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span = tracing::info_span!("delegated_auth.op", op = op.as_str(), stage);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (op, stage);

			Self {}
		}
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedOp<Fut>
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

/// Logs a failure that was absorbed instead of surfaced (storage, introspection, provider).
pub fn warn_swallowed(op: AuthOp, err: &dyn Display) {
	#[cfg(feature = "tracing")]
	{
		tracing::warn!(op = op.as_str(), error = %err, "continuing after non-fatal failure");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (op, err);
	}
}

/// Logs a token that was discarded for lacking scopes, keyed by scope fingerprints.
pub fn warn_scope_mismatch(op: AuthOp, granted: &ScopeSet, required: &ScopeSet) {
	#[cfg(feature = "tracing")]
	{
		tracing::warn!(
			op = op.as_str(),
			granted = %granted.fingerprint(),
			required = %required.fingerprint(),
			missing = granted.missing(required).len(),
			"delegated token lacks required scopes"
		);
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (op, granted, required);
	}
}

/// Emits a debug-level state change for the operation.
pub fn note(op: AuthOp, message: &'static str) {
	#[cfg(feature = "tracing")]
	{
		tracing::debug!(op = op.as_str(), "{message}");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (op, message);
	}
}
