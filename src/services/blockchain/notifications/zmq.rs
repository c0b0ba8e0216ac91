//! ZeroMQ subscription for Bitcoin-family nodes (`-zmqpubhashblock`,
//! `-zmqpubhashtx`).

use std::collections::HashMap;
use tracing::{debug, warn};
use zeromq::{Socket, SocketRecv, SubSocket};

use crate::{
	models::ChainReference,
	services::blockchain::{notifications::NotificationStream, BlockChainError},
};

const TOPIC_BLOCK: &str = "hashblock";
const TOPIC_TX: &str = "hashtx";

/// Maps a `[topic, body, sequence]` message to a reference
fn reference_from_frames(topic: &[u8], body: &[u8]) -> Option<ChainReference> {
	let hash = hex::encode(body);
	match topic {
		t if t == TOPIC_BLOCK.as_bytes() => Some(ChainReference::block(hash, None)),
		t if t == TOPIC_TX.as_bytes() => Some(ChainReference::transaction(hash)),
		_ => None,
	}
}

fn endpoint_metadata(endpoint: &str) -> Option<HashMap<String, String>> {
	Some(HashMap::from([(
		"endpoint".to_string(),
		endpoint.to_string(),
	)]))
}

/// Connects a SUB socket to `endpoint` and streams block and transaction hashes
pub async fn subscribe_zmq(endpoint: &str) -> Result<NotificationStream, BlockChainError> {
	let mut socket = SubSocket::new();
	socket.connect(endpoint).await.map_err(|e| {
		BlockChainError::subscription_error(
			format!("Failed to connect ZeroMQ socket: {}", e),
			Some(Box::new(e)),
			endpoint_metadata(endpoint),
		)
	})?;

	for topic in [TOPIC_BLOCK, TOPIC_TX] {
		socket.subscribe(topic).await.map_err(|e| {
			BlockChainError::subscription_error(
				format!("Failed to subscribe to {}: {}", topic, e),
				Some(Box::new(e)),
				endpoint_metadata(endpoint),
			)
		})?;
	}

	let (sender, cancel, stream) = NotificationStream::channel();
	let endpoint = endpoint.to_string();

	tokio::spawn(async move {
		loop {
			tokio::select! {
				_ = cancel.cancelled() => break,
				received = socket.recv() => match received {
					Ok(message) => {
						let frames = message.into_vec();
						let (Some(topic), Some(body)) = (frames.first(), frames.get(1)) else {
							warn!(endpoint = %endpoint, "Ignoring ZeroMQ message with missing frames");
							continue;
						};
						match reference_from_frames(topic, body) {
							Some(reference) => {
								if sender.send(Ok(reference)).await.is_err() {
									break;
								}
							}
							None => debug!(endpoint = %endpoint, "Ignoring ZeroMQ message on unknown topic"),
						}
					}
					Err(e) => {
						let error = BlockChainError::subscription_error(
							format!("ZeroMQ receive failed: {}", e),
							Some(Box::new(e)),
							endpoint_metadata(&endpoint),
						);
						let _ = sender.send(Err(error)).await;
						break;
					}
				}
			}
		}
		debug!(endpoint = %endpoint, "ZeroMQ subscription closed");
	});

	Ok(stream)
}
