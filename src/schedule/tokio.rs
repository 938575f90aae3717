//! [`TimerDriver`] backed by the tokio runtime.

// self
use crate::{
	_prelude::*,
	schedule::{TimerCallback, TimerDriver, TimerHandle},
};

/// Spawns one sleeping task per timer on a tokio runtime; cancellation aborts the task.
#[derive(Clone, Debug)]
pub struct TokioTimer {
	runtime: ::tokio::runtime::Handle,
}
impl TokioTimer {
	/// Uses the provided runtime handle.
	pub fn new(runtime: ::tokio::runtime::Handle) -> Self {
		Self { runtime }
	}

	/// Uses the runtime the caller is running on, if any.
	pub fn try_current() -> Option<Self> {
		::tokio::runtime::Handle::try_current().ok().map(Self::new)
	}
}
impl TimerDriver for TokioTimer {
	fn schedule(&self, delay: Duration, callback: TimerCallback) -> TimerHandle {
		// Negative delays fire immediately.
		let delay = std::time::Duration::try_from(delay).unwrap_or_default();
		let task = self.runtime.spawn(async move {
			::tokio::time::sleep(delay).await;

			callback();
		});

		TimerHandle::new(move || task.abort())
	}
}
