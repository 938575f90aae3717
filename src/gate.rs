//! Boot-time readiness join.
//!
//! The application must neither render protected routes nor treat the user as signed out
//! until two independent inputs have arrived: the identity provider's restored-session
//! notification and the pending-redirect check. [`ReadinessGate`] is an explicit join over
//! those inputs: two monotonic completion flags plus a single-fire continuation list. It opens
//! exactly once, whatever order (or thread) the inputs arrive on, and never closes again.

pub mod mailbox;

pub use mailbox::*;

// std
use std::task::{Context, Poll, Waker};
// self
use crate::_prelude::*;

/// The two inputs the gate joins.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GateInput {
	/// The identity provider reported whatever session it could restore.
	IdentityRestored,
	/// The boot-time pending-redirect check finished (with or without a result).
	RedirectChecked,
}

/// Snapshot of the join flags. Flags only ever move from `false` to `true`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReadinessState {
	/// Restored-session notification arrived.
	pub identity_check_done: bool,
	/// Pending-redirect check finished.
	pub redirect_check_done: bool,
}
impl ReadinessState {
	/// Returns true once both inputs arrived.
	pub fn is_ready(&self) -> bool {
		self.identity_check_done && self.redirect_check_done
	}

	/// Returns true if `input` already arrived.
	pub fn has(&self, input: GateInput) -> bool {
		match input {
			GateInput::IdentityRestored => self.identity_check_done,
			GateInput::RedirectChecked => self.redirect_check_done,
		}
	}

	fn mark(&mut self, input: GateInput) {
		match input {
			GateInput::IdentityRestored => self.identity_check_done = true,
			GateInput::RedirectChecked => self.redirect_check_done = true,
		}
	}
}

type Continuation = Box<dyn FnOnce() + Send + 'static>;

#[derive(Default)]
struct GateInner {
	state: ReadinessState,
	opened: bool,
	wakers: Vec<Waker>,
	continuations: Vec<Continuation>,
}

/// Two-input join that opens exactly once.
///
/// Cloning shares the same gate.
#[derive(Clone, Default)]
pub struct ReadinessGate(Arc<Mutex<GateInner>>);
impl ReadinessGate {
	/// Creates a closed gate.
	pub fn new() -> Self {
		Self::default()
	}

	/// Records `input`; returns true only for the call that opened the gate.
	///
	/// Repeated inputs are ignored. Waiters and continuations run after the internal lock is
	/// released, on the calling thread.
	pub fn complete(&self, input: GateInput) -> bool {
		let (wakers, continuations) = {
			let mut inner = self.0.lock();

			inner.state.mark(input);

			if inner.opened || !inner.state.is_ready() {
				return false;
			}

			inner.opened = true;

			(std::mem::take(&mut inner.wakers), std::mem::take(&mut inner.continuations))
		};

		wakers.into_iter().for_each(Waker::wake);
		continuations.into_iter().for_each(|continuation| continuation());

		true
	}

	/// Shorthand for [`GateInput::IdentityRestored`].
	pub fn identity_restored(&self) -> bool {
		self.complete(GateInput::IdentityRestored)
	}

	/// Shorthand for [`GateInput::RedirectChecked`].
	pub fn redirect_checked(&self) -> bool {
		self.complete(GateInput::RedirectChecked)
	}

	/// Current flags.
	pub fn state(&self) -> ReadinessState {
		self.0.lock().state
	}

	/// Returns true once the gate opened.
	pub fn is_open(&self) -> bool {
		self.0.lock().opened
	}

	/// Future that resolves once the gate opens; resolves immediately afterwards.
	pub fn wait(&self) -> WaitForAuth {
		WaitForAuth { gate: self.clone() }
	}

	/// Runs `continuation` once the gate opens, or right away if it already has.
	pub fn on_open(&self, continuation: impl FnOnce() + Send + 'static) {
		{
			let mut inner = self.0.lock();

			if !inner.opened {
				inner.continuations.push(Box::new(continuation));

				return;
			}
		}

		continuation();
	}
}
impl Debug for ReadinessGate {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		let inner = self.0.lock();

		f.debug_struct("ReadinessGate")
			.field("state", &inner.state)
			.field("opened", &inner.opened)
			.field("waiters", &inner.wakers.len())
			.finish()
	}
}

/// Future returned by [`ReadinessGate::wait`]. Never fails.
#[derive(Debug)]
#[must_use = "futures do nothing unless awaited"]
pub struct WaitForAuth {
	gate: ReadinessGate,
}
impl Future for WaitForAuth {
	type Output = ();

	fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
		let mut inner = self.gate.0.lock();

		if inner.opened {
			return Poll::Ready(());
		}
		if !inner.wakers.iter().any(|waker| waker.will_wake(cx.waker())) {
			inner.wakers.push(cx.waker().clone());
		}

		Poll::Pending
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::sync::atomic::{AtomicUsize, Ordering};
	// self
	use super::*;

	#[test]
	fn opens_once_in_either_order() {
		for order in [
			[GateInput::IdentityRestored, GateInput::RedirectChecked],
			[GateInput::RedirectChecked, GateInput::IdentityRestored],
		] {
			let gate = ReadinessGate::new();
			let runs = Arc::new(AtomicUsize::new(0));
			let counter = runs.clone();

			gate.on_open(move || {
				counter.fetch_add(1, Ordering::SeqCst);
			});

			assert!(!gate.complete(order[0]));
			assert!(!gate.is_open());
			assert!(gate.state().has(order[0]));
			assert!(gate.complete(order[1]));
			assert!(!gate.complete(order[0]), "Repeated inputs must not reopen the gate.");
			assert!(!gate.complete(order[1]));
			assert_eq!(runs.load(Ordering::SeqCst), 1);
		}
	}

	#[test]
	fn repeated_single_input_never_opens() {
		let gate = ReadinessGate::new();

		for _ in 0..3 {
			assert!(!gate.identity_restored());
		}

		assert_eq!(
			gate.state(),
			ReadinessState { identity_check_done: true, redirect_check_done: false }
		);
		assert!(!gate.is_open());
	}

	#[test]
	fn late_continuations_run_immediately() {
		let gate = ReadinessGate::new();

		gate.identity_restored();
		gate.redirect_checked();

		let runs = Arc::new(AtomicUsize::new(0));
		let counter = runs.clone();

		gate.on_open(move || {
			counter.fetch_add(1, Ordering::SeqCst);
		});

		assert_eq!(runs.load(Ordering::SeqCst), 1);
	}

	#[tokio::test]
	async fn waiters_resolve_after_both_inputs() {
		let gate = ReadinessGate::new();
		let waiters: Vec<_> = (0..4).map(|_| tokio::spawn(gate.wait())).collect();

		gate.redirect_checked();
		tokio::task::yield_now().await;

		assert!(waiters.iter().all(|waiter| !waiter.is_finished()));

		gate.identity_restored();

		for waiter in waiters {
			waiter.await.expect("Waiter task should not panic.");
		}

		gate.wait().await;
	}

	#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
	async fn concurrent_inputs_open_exactly_once() {
		for _ in 0..64 {
			let gate = ReadinessGate::new();
			let a = gate.clone();
			let b = gate.clone();
			let (first, second) = tokio::join!(
				tokio::spawn(async move { a.identity_restored() }),
				tokio::spawn(async move { b.redirect_checked() }),
			);
			let openers = [first, second]
				.into_iter()
				.map(|opened| opened.expect("Input task should not panic."))
				.filter(|opened| *opened)
				.count();

			assert_eq!(openers, 1);

			gate.wait().await;
		}
	}
}
