//! WebSocket subscription for Ethereum nodes (`eth_subscribe`).

use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, warn};

use crate::{
	models::ChainReference,
	services::blockchain::{notifications::NotificationStream, BlockChainError},
	utils::parse_hex_quantity,
};

const NEW_HEADS_ID: u64 = 1;
const PENDING_TX_ID: u64 = 2;

#[derive(Debug, Serialize)]
struct SubscribeRequest {
	jsonrpc: &'static str,
	method: &'static str,
	params: (&'static str,),
	id: u64,
}

#[derive(Debug, Deserialize)]
struct WsResponse {
	id: Option<u64>,
	result: Option<Value>,
	error: Option<WsError>,
	method: Option<String>,
	params: Option<NotificationParams>,
}

#[derive(Debug, Deserialize)]
struct WsError {
	code: i64,
	message: String,
}

#[derive(Debug, Deserialize)]
struct NotificationParams {
	subscription: String,
	result: Value,
}

/// Maps `eth_subscribe` request ids to the subscription ids the node assigns
#[derive(Debug, Default)]
struct SubscriptionState {
	new_heads: Option<String>,
	pending_tx: Option<String>,
}

enum Frame {
	Reference(ChainReference),
	Error(String),
	Ignored,
}

impl SubscriptionState {
	fn handle_text(&mut self, text: &str) -> Frame {
		let Ok(response) = serde_json::from_str::<WsResponse>(text) else {
			return Frame::Ignored;
		};

		if let Some(error) = response.error {
			return Frame::Error(format!(
				"eth_subscribe failed ({}): {}",
				error.code, error.message
			));
		}

		if let Some(Value::String(subscription)) = response.result {
			match response.id {
				Some(NEW_HEADS_ID) => self.new_heads = Some(subscription),
				Some(PENDING_TX_ID) => self.pending_tx = Some(subscription),
				_ => {}
			}
			return Frame::Ignored;
		}

		if response.method.as_deref() != Some("eth_subscription") {
			return Frame::Ignored;
		}
		let Some(params) = response.params else {
			return Frame::Ignored;
		};

		if Some(&params.subscription) == self.new_heads.as_ref() {
			let hash = params.result.get("hash").and_then(Value::as_str);
			let height = params
				.result
				.get("number")
				.and_then(Value::as_str)
				.and_then(parse_hex_quantity);
			match hash {
				Some(hash) => Frame::Reference(ChainReference::block(hash, height)),
				None => Frame::Ignored,
			}
		} else if Some(&params.subscription) == self.pending_tx.as_ref() {
			match params.result.as_str() {
				Some(hash) => Frame::Reference(ChainReference::transaction(hash)),
				None => Frame::Ignored,
			}
		} else {
			Frame::Ignored
		}
	}
}

fn endpoint_metadata(endpoint: &str) -> Option<HashMap<String, String>> {
	Some(HashMap::from([(
		"endpoint".to_string(),
		endpoint.to_string(),
	)]))
}

fn subscribe_message(id: u64, topic: &'static str) -> Result<Message, BlockChainError> {
	let request = SubscribeRequest {
		jsonrpc: "2.0",
		method: "eth_subscribe",
		params: (topic,),
		id,
	};
	let text = serde_json::to_string(&request).map_err(|e| {
		BlockChainError::request_error(
			format!("Failed to encode eth_subscribe: {}", e),
			Some(Box::new(e)),
			None,
		)
	})?;
	Ok(Message::Text(text.into()))
}

/// Opens a WebSocket to `endpoint` and subscribes to `newHeads` and
/// `newPendingTransactions`
pub async fn subscribe_websocket(endpoint: &str) -> Result<NotificationStream, BlockChainError> {
	let (ws_stream, _) = connect_async(endpoint).await.map_err(|e| {
		BlockChainError::subscription_error(
			format!("Failed to connect WebSocket: {}", e),
			Some(Box::new(e)),
			endpoint_metadata(endpoint),
		)
	})?;
	let (mut write, mut read) = ws_stream.split();

	for (id, topic) in [
		(NEW_HEADS_ID, "newHeads"),
		(PENDING_TX_ID, "newPendingTransactions"),
	] {
		write
			.send(subscribe_message(id, topic)?)
			.await
			.map_err(|e| {
				BlockChainError::subscription_error(
					format!("Failed to send {} subscription: {}", topic, e),
					Some(Box::new(e)),
					endpoint_metadata(endpoint),
				)
			})?;
	}

	let (sender, cancel, stream) = NotificationStream::channel();
	let endpoint = endpoint.to_string();

	tokio::spawn(async move {
		let mut state = SubscriptionState::default();
		let failure = loop {
			tokio::select! {
				_ = cancel.cancelled() => {
					let _ = write.send(Message::Close(None)).await;
					break None;
				}
				message = read.next() => match message {
					Some(Ok(Message::Text(text))) => match state.handle_text(&text) {
						Frame::Reference(reference) => {
							if sender.send(Ok(reference)).await.is_err() {
								break None;
							}
						}
						Frame::Error(message) => break Some(message),
						Frame::Ignored => {}
					},
					Some(Ok(Message::Ping(data))) => {
						let _ = write.send(Message::Pong(data)).await;
					}
					Some(Ok(Message::Close(_))) | None => {
						break Some("WebSocket closed by node".to_string());
					}
					Some(Ok(_)) => {}
					Some(Err(e)) => break Some(format!("WebSocket receive failed: {}", e)),
				}
			}
		};

		if let Some(message) = failure {
			warn!(endpoint = %endpoint, "{}", message);
			let error = BlockChainError::subscription_error(
				message,
				None,
				endpoint_metadata(&endpoint),
			);
			let _ = sender.send(Err(error)).await;
		}
		debug!(endpoint = %endpoint, "WebSocket subscription closed");
	});

	Ok(stream)
}
