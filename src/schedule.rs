//! Expiry scheduling for the delegated token.
//!
//! [`ExpiryScheduler::arm`] turns a token's remaining lifetime into a one-shot timer that only
//! flips the refresh flag. It never refreshes on its own: unattended consent pop-ups are
//! blocked by browsers, so renewal is always driven by a caller of
//! [`Coordinator::access_token`](crate::coordinator::Coordinator::access_token) or an explicit
//! user gesture.

pub mod manual;
#[cfg(feature = "tokio")] pub mod tokio;

pub use manual::ManualTimer;
#[cfg(feature = "tokio")] pub use self::tokio::TokioTimer;

// std
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
// self
use crate::_prelude::*;

/// Time before expiry at which a token counts as "expiring".
pub const REFRESH_BUFFER: Duration = Duration::minutes(5);
/// Shortest delay the scheduler will arm.
pub const MIN_DELAY: Duration = Duration::seconds(10);

/// Callback run when a timer fires.
pub type TimerCallback = Box<dyn FnOnce() + Send + 'static>;

/// Source of one-shot timers.
pub trait TimerDriver
where
	Self: Send + Sync,
{
	/// Runs `callback` once after `delay`, unless the returned handle is cancelled first.
	fn schedule(&self, delay: Duration, callback: TimerCallback) -> TimerHandle;
}

/// Cancellation handle for a scheduled timer. Dropping it leaves the timer running.
pub struct TimerHandle {
	cancel: Option<Box<dyn FnOnce() + Send + 'static>>,
}
impl TimerHandle {
	/// Wraps the driver-specific cancellation routine.
	pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
		Self { cancel: Some(Box::new(cancel)) }
	}

	/// Cancels the timer; a no-op if it already fired.
	pub fn cancel(mut self) {
		if let Some(cancel) = self.cancel.take() {
			cancel();
		}
	}
}
impl Debug for TimerHandle {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("TimerHandle(..)")
	}
}

/// Delay before the refresh flag should flip for a token with `remaining` lifetime.
pub fn fire_delay(remaining: Duration, refresh_buffer: Duration, min_delay: Duration) -> Duration {
	(remaining - refresh_buffer).max(min_delay)
}

struct Armed {
	handle: TimerHandle,
	fire_in: Duration,
}

/// One-shot, re-armable timer that raises the refresh flag ahead of token expiry.
pub struct ExpiryScheduler {
	driver: Arc<dyn TimerDriver>,
	refresh_buffer: Duration,
	min_delay: Duration,
	refresh_flag: Arc<AtomicBool>,
	generation: Arc<AtomicU64>,
	armed: Mutex<Option<Armed>>,
}
impl ExpiryScheduler {
	/// Creates a scheduler with the default buffer and minimum delay.
	pub fn new(driver: Arc<dyn TimerDriver>) -> Self {
		Self::with_policy(driver, REFRESH_BUFFER, MIN_DELAY)
	}

	/// Creates a scheduler with an explicit buffer and minimum delay.
	pub fn with_policy(
		driver: Arc<dyn TimerDriver>,
		refresh_buffer: Duration,
		min_delay: Duration,
	) -> Self {
		Self {
			driver,
			refresh_buffer,
			min_delay,
			refresh_flag: Default::default(),
			generation: Default::default(),
			armed: Mutex::new(None),
		}
	}

	/// Cancels any pending timer and arms a new one; returns the delay that was armed.
	pub fn arm(&self, remaining: Duration) -> Duration {
		let fire_in = fire_delay(remaining, self.refresh_buffer, self.min_delay);
		let mut armed = self.armed.lock();

		if let Some(previous) = armed.take() {
			previous.handle.cancel();
		}

		let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
		let current = self.generation.clone();
		let flag = self.refresh_flag.clone();
		let handle = self.driver.schedule(
			fire_in,
			Box::new(move || {
				// A timer whose cancellation raced with its firing must not flag a newer token.
				if current.load(Ordering::SeqCst) == generation {
					flag.store(true, Ordering::SeqCst);
				}
			}),
		);

		*armed = Some(Armed { handle, fire_in });

		fire_in
	}

	/// Cancels the pending timer, if any.
	pub fn disarm(&self) {
		self.generation.fetch_add(1, Ordering::SeqCst);

		if let Some(previous) = self.armed.lock().take() {
			previous.handle.cancel();
		}
	}

	/// Delay passed to the most recent [`arm`](Self::arm), while still armed.
	pub fn armed_for(&self) -> Option<Duration> {
		self.armed.lock().as_ref().map(|armed| armed.fire_in)
	}

	/// Returns true once the timer fired or a caller flagged the token.
	pub fn refresh_needed(&self) -> bool {
		self.refresh_flag.load(Ordering::SeqCst)
	}

	/// Raises the refresh flag (e.g. after an API call was rejected).
	pub fn mark_refresh_needed(&self) {
		self.refresh_flag.store(true, Ordering::SeqCst);
	}

	/// Lowers the refresh flag after a successful acquisition.
	pub fn clear_refresh_flag(&self) {
		self.refresh_flag.store(false, Ordering::SeqCst);
	}

	/// Buffer before expiry at which tokens count as expiring.
	pub fn refresh_buffer(&self) -> Duration {
		self.refresh_buffer
	}
}
impl Debug for ExpiryScheduler {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ExpiryScheduler")
			.field("refresh_buffer", &self.refresh_buffer)
			.field("min_delay", &self.min_delay)
			.field("refresh_needed", &self.refresh_needed())
			.field("armed_for", &self.armed_for())
			.finish()
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn scheduler() -> (ExpiryScheduler, ManualTimer) {
		let timer = ManualTimer::default();

		(ExpiryScheduler::new(Arc::new(timer.clone())), timer)
	}

	#[test]
	fn delay_subtracts_buffer_and_respects_floor() {
		assert_eq!(
			fire_delay(Duration::seconds(3600), REFRESH_BUFFER, MIN_DELAY),
			Duration::milliseconds(3_300_000)
		);
		assert_eq!(fire_delay(Duration::minutes(5), REFRESH_BUFFER, MIN_DELAY), MIN_DELAY);
		assert_eq!(fire_delay(Duration::minutes(-3), REFRESH_BUFFER, MIN_DELAY), MIN_DELAY);
	}

	#[test]
	fn firing_sets_flag_only_after_delay() {
		let (scheduler, timer) = scheduler();
		let armed = scheduler.arm(Duration::hours(1));

		assert_eq!(armed, Duration::minutes(55));
		assert_eq!(scheduler.armed_for(), Some(Duration::minutes(55)));

		timer.advance(Duration::minutes(54));

		assert!(!scheduler.refresh_needed());

		timer.advance(Duration::minutes(1));

		assert!(scheduler.refresh_needed());

		scheduler.clear_refresh_flag();

		assert!(!scheduler.refresh_needed());
	}

	#[test]
	fn rearming_cancels_previous_timer() {
		let (scheduler, timer) = scheduler();

		scheduler.arm(Duration::minutes(6));
		scheduler.arm(Duration::hours(1));

		assert_eq!(timer.pending(), vec![Duration::minutes(55)]);

		timer.advance(Duration::minutes(30));

		assert!(!scheduler.refresh_needed(), "The cancelled short timer must not fire.");
	}

	#[test]
	fn disarm_cancels_and_forgets() {
		let (scheduler, timer) = scheduler();

		scheduler.arm(Duration::minutes(20));
		scheduler.disarm();

		assert_eq!(scheduler.armed_for(), None);
		assert!(timer.pending().is_empty());

		timer.advance(Duration::hours(2));

		assert!(!scheduler.refresh_needed());

		scheduler.disarm();
	}
}
