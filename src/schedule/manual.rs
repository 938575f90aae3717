//! Deterministic [`TimerDriver`] whose clock only moves when told to.

// self
use crate::{
	_prelude::*,
	schedule::{TimerCallback, TimerDriver, TimerHandle},
};

#[derive(Default)]
struct ManualState {
	elapsed: Duration,
	next_id: u64,
	entries: Vec<Entry>,
	history: Vec<Duration>,
}

struct Entry {
	id: u64,
	due: Duration,
	callback: TimerCallback,
}

/// Virtual-time timer for tests and demos.
///
/// Timers fire only from [`advance`](Self::advance), in due order, outside the internal lock.
#[derive(Clone, Default)]
pub struct ManualTimer(Arc<Mutex<ManualState>>);
impl ManualTimer {
	/// Moves the virtual clock forward and fires every timer that became due.
	///
	/// Returns how many callbacks ran.
	pub fn advance(&self, by: Duration) -> usize {
		let due = {
			let mut state = self.0.lock();

			state.elapsed += by;

			let now = state.elapsed;
			let (mut due, live): (Vec<_>, Vec<_>) =
				state.entries.drain(..).partition(|entry| entry.due <= now);

			state.entries = live;
			due.sort_by_key(|entry| (entry.due, entry.id));

			due
		};
		let fired = due.len();

		for entry in due {
			(entry.callback)();
		}

		fired
	}

	/// Remaining delay of every live timer, soonest first.
	pub fn pending(&self) -> Vec<Duration> {
		let state = self.0.lock();
		let mut remaining: Vec<_> =
			state.entries.iter().map(|entry| entry.due - state.elapsed).collect();

		remaining.sort();

		remaining
	}

	/// Delay requested by every `schedule` call so far, in call order.
	pub fn history(&self) -> Vec<Duration> {
		self.0.lock().history.clone()
	}
}
impl TimerDriver for ManualTimer {
	fn schedule(&self, delay: Duration, callback: TimerCallback) -> TimerHandle {
		let id = {
			let mut state = self.0.lock();
			let id = state.next_id;
			let due = state.elapsed + delay;

			state.next_id += 1;
			state.history.push(delay);
			state.entries.push(Entry { id, due, callback });

			id
		};
		let state = self.0.clone();

		TimerHandle::new(move || state.lock().entries.retain(|entry| entry.id != id))
	}
}
impl Debug for ManualTimer {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		let state = self.0.lock();

		f.debug_struct("ManualTimer")
			.field("elapsed", &state.elapsed)
			.field("live", &state.entries.len())
			.finish()
	}
}
