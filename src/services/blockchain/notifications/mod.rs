//! Push notification streams.
//!
//! Each subscription runs in its own task and forwards raw references through a
//! bounded channel. Dropping or cancelling the [`NotificationStream`] stops the
//! task and closes the socket; a stream is never restarted.

mod websocket;
mod zmq;

pub use websocket::subscribe_websocket;
pub use zmq::subscribe_zmq;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::{models::ChainReference, services::blockchain::BlockChainError};

/// Capacity of the channel between a socket task and the listener
pub const NOTIFICATION_BUFFER: usize = 1024;

/// Item yielded by a subscription: a reference, or the error that ended it
pub type NotificationItem = Result<ChainReference, BlockChainError>;

/// A cancellable stream of raw references pushed by one node
#[derive(Debug)]
pub struct NotificationStream {
	receiver: mpsc::Receiver<NotificationItem>,
	cancel: CancellationToken,
}

impl NotificationStream {
	pub fn new(receiver: mpsc::Receiver<NotificationItem>, cancel: CancellationToken) -> Self {
		Self { receiver, cancel }
	}

	/// Creates a stream together with the sender and token a producer task needs
	pub fn channel() -> (mpsc::Sender<NotificationItem>, CancellationToken, Self) {
		let (sender, receiver) = mpsc::channel(NOTIFICATION_BUFFER);
		let cancel = CancellationToken::new();
		(sender, cancel.clone(), Self::new(receiver, cancel))
	}

	/// Next item; `None` once the producer has stopped
	pub async fn next(&mut self) -> Option<NotificationItem> {
		self.receiver.recv().await
	}

	pub fn cancel(&self) {
		self.cancel.cancel();
	}

	pub fn is_cancelled(&self) -> bool {
		self.cancel.is_cancelled()
	}
}

impl Drop for NotificationStream {
	fn drop(&mut self) {
		self.cancel.cancel();
	}
}
