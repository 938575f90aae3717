//! One-slot mailbox that buffers a value until its consumer registers.

// self
use crate::_prelude::*;

type Consumer<T> = Arc<dyn Fn(T) + Send + Sync + 'static>;

/// What happened to a posted value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Delivery {
	/// The registered consumer received it.
	Delivered,
	/// No consumer yet; the value waits in the slot.
	Held,
}

struct MailboxInner<T> {
	held: Option<T>,
	consumer: Option<Consumer<T>>,
}

/// Holds at most one undelivered value and hands each value to the consumer exactly once.
///
/// A value posted before anyone registered is replayed to the first consumer that does;
/// a value posted after registration goes straight through. Posting while a value is still
/// held replaces it, since only the latest result is meaningful.
pub struct Mailbox<T> {
	inner: Mutex<MailboxInner<T>>,
}
impl<T> Mailbox<T>
where
	T: Send + 'static,
{
	/// Creates an empty mailbox with no consumer.
	pub fn new() -> Self {
		Self { inner: Mutex::new(MailboxInner { held: None, consumer: None }) }
	}

	/// Delivers `value` to the consumer, or holds it until one registers.
	pub fn post(&self, value: T) -> Delivery {
		let consumer = {
			let mut inner = self.inner.lock();

			match inner.consumer.clone() {
				Some(consumer) => consumer,
				None => {
					inner.held = Some(value);

					return Delivery::Held;
				},
			}
		};

		consumer(value);

		Delivery::Delivered
	}

	/// Registers (or replaces) the consumer and replays a held value to it.
	pub fn register(&self, consumer: impl Fn(T) + Send + Sync + 'static) -> Delivery {
		let consumer: Consumer<T> = Arc::new(consumer);
		let replay = {
			let mut inner = self.inner.lock();

			inner.consumer = Some(consumer.clone());
			inner.held.take()
		};

		match replay {
			Some(value) => {
				consumer(value);

				Delivery::Delivered
			},
			None => Delivery::Held,
		}
	}

	/// Drops the consumer; later values are held again.
	pub fn unregister(&self) {
		self.inner.lock().consumer = None;
	}

	/// Discards a held value without delivering it.
	pub fn discard(&self) -> Option<T> {
		self.inner.lock().held.take()
	}

	/// Returns true if a value waits for a consumer.
	pub fn is_holding(&self) -> bool {
		self.inner.lock().held.is_some()
	}
}
impl<T> Default for Mailbox<T>
where
	T: Send + 'static,
{
	fn default() -> Self {
		Self::new()
	}
}
impl<T> Debug for Mailbox<T> {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		let inner = self.inner.lock();

		f.debug_struct("Mailbox")
			.field("holding", &inner.held.is_some())
			.field("registered", &inner.consumer.is_some())
			.finish()
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn recorder() -> (Arc<Mutex<Vec<&'static str>>>, impl Fn(&'static str) + Send + Sync + 'static)
	{
		let seen = Arc::new(Mutex::new(Vec::new()));
		let sink = seen.clone();

		(seen, move |value| sink.lock().push(value))
	}

	#[test]
	fn held_value_replays_once_on_registration() {
		let mailbox = Mailbox::new();
		let (seen, consumer) = recorder();

		assert_eq!(mailbox.post("ana"), Delivery::Held);
		assert!(mailbox.is_holding());
		assert_eq!(mailbox.register(consumer), Delivery::Delivered);
		assert!(!mailbox.is_holding());
		assert_eq!(*seen.lock(), vec!["ana"]);
	}

	#[test]
	fn registered_consumer_receives_directly() {
		let mailbox = Mailbox::new();
		let (seen, consumer) = recorder();

		assert_eq!(mailbox.register(consumer), Delivery::Held);
		assert_eq!(mailbox.post("ana"), Delivery::Delivered);
		assert_eq!(mailbox.post("bo"), Delivery::Delivered);
		assert!(!mailbox.is_holding());
		assert_eq!(*seen.lock(), vec!["ana", "bo"]);
	}

	#[test]
	fn reregistering_does_not_duplicate() {
		let mailbox = Mailbox::new();
		let (seen, consumer) = recorder();

		mailbox.post("ana");
		mailbox.register(consumer);

		let (again, second) = recorder();

		assert_eq!(mailbox.register(second), Delivery::Held);
		assert_eq!(*seen.lock(), vec!["ana"]);
		assert!(again.lock().is_empty());
	}

	#[test]
	fn unregister_and_discard() {
		let mailbox = Mailbox::new();
		let (seen, consumer) = recorder();

		mailbox.register(consumer);
		mailbox.unregister();

		assert_eq!(mailbox.post("ana"), Delivery::Held);
		assert_eq!(mailbox.discard(), Some("ana"));
		assert!(seen.lock().is_empty());
	}
}
