use chrono::NaiveDateTime;
use log::{error, warn};

use crate::api::ApiClient;
use crate::error::ApiError;
use crate::models::{AssignmentId, ChatExchange, DeepDiveResult, StepId};

pub const DEEP_DIVE_QUESTION: &str = "Break down this step into sub-steps";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChatScope {
	Assignment(AssignmentId),
	Step {
		assignment: AssignmentId,
		step: StepId,
	},
}

impl ChatScope {
	pub fn assignment_id(self) -> AssignmentId {
		match self {
			ChatScope::Assignment(id) | ChatScope::Step { assignment: id, .. } => id,
		}
	}

	pub fn step_id(self) -> Option<StepId> {
		match self {
			ChatScope::Assignment(_) => None,
			ChatScope::Step { step, .. } => Some(step),
		}
	}

	pub fn title(self) -> &'static str {
		match self {
			ChatScope::Assignment(_) => "Assignment Chat",
			ChatScope::Step { .. } => "Node Chat",
		}
	}

	/// Value remembered under the `activeChat` session key.
	pub fn storage_value(self) -> String {
		match self {
			ChatScope::Assignment(_) => "assignment".into(),
			ChatScope::Step { step, .. } => format!("step:{step}"),
		}
	}

	pub fn restore(assignment: AssignmentId, value: &str) -> Option<Self> {
		match value.split_once(':') {
			None if value == "assignment" => Some(ChatScope::Assignment(assignment)),
			Some(("step", step)) => step.parse().ok().map(|step| ChatScope::Step { assignment, step }),
			_ => None,
		}
	}

	pub async fn history(self, client: &ApiClient) -> Result<Vec<ChatExchange>, ApiError> {
		match self {
			ChatScope::Assignment(id) => client.assignment_chat(id).await,
			ChatScope::Step { step, .. } => client.node_chat(step).await,
		}
	}

	pub async fn post(self, client: &ApiClient, text: &str) -> Result<ChatExchange, ApiError> {
		client
			.post_chat_message(self.assignment_id(), self.step_id(), text)
			.await
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Author {
	User,
	Bot,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ChatMessage {
	pub key: String,
	pub author: Author,
	pub content: String,
	pub timestamp: NaiveDateTime,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ChatPhase {
	#[default]
	Idle,
	Sending,
	DeepDiving,
}

/// Optimistic message awaiting the server's reply.
#[derive(Clone, Debug, PartialEq)]
pub struct PendingSend {
	temp_key: String,
	pub text: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct DeepDiveTicket {
	placeholder_key: String,
}

/// Message list and request phase of one chat panel.
#[derive(Clone, Debug, PartialEq)]
pub struct ChatState {
	pub scope: ChatScope,
	pub messages: Vec<ChatMessage>,
	pub phase: ChatPhase,
	/// Inline error shown outside the message list.
	pub notice: Option<String>,
	next_local: u64,
}

fn exchange_messages(exchange: &ChatExchange) -> impl Iterator<Item = ChatMessage> + '_ {
	let user = (!exchange.user_message.is_empty()).then(|| ChatMessage {
		key: format!("{}-user", exchange.id),
		author: Author::User,
		content: exchange.user_message.clone(),
		timestamp: exchange.timestamp,
	});
	let bot = exchange
		.bot_response
		.as_ref()
		.filter(|r| !r.is_empty())
		.map(|r| ChatMessage {
			key: format!("{}-bot", exchange.id),
			author: Author::Bot,
			content: r.clone(),
			timestamp: exchange.timestamp,
		});
	user.into_iter().chain(bot)
}

impl ChatState {
	pub fn new(scope: ChatScope) -> Self {
		Self {
			scope,
			messages: Vec::new(),
			phase: ChatPhase::Idle,
			notice: None,
			next_local: 0,
		}
	}

	pub fn can_deep_dive(&self) -> bool {
		self.scope.step_id().is_some()
	}

	pub fn load_history(&mut self, exchanges: &[ChatExchange]) {
		self.messages = exchanges.iter().flat_map(exchange_messages).collect();
	}

	fn local_key(&mut self, prefix: &str) -> String {
		self.next_local += 1;
		format!("{prefix}-{}", self.next_local)
	}

	fn push_local(&mut self, prefix: &str, author: Author, content: String, now: NaiveDateTime) -> String {
		let key = self.local_key(prefix);
		self.messages.push(ChatMessage {
			key: key.clone(),
			author,
			content,
			timestamp: now,
		});
		key
	}

	/// Show the user's message immediately; `None` when blank or busy.
	pub fn begin_send(&mut self, text: &str, now: NaiveDateTime) -> Option<PendingSend> {
		let text = text.trim();
		if text.is_empty() || self.phase != ChatPhase::Idle {
			return None;
		}
		self.phase = ChatPhase::Sending;
		self.notice = None;
		let temp_key = self.push_local("pending", Author::User, text.to_string(), now);
		Some(PendingSend {
			temp_key,
			text: text.to_string(),
		})
	}

	/// Swap the optimistic message for the server's exchange, or drop it on failure.
	pub fn finish_send(&mut self, pending: PendingSend, result: Result<ChatExchange, ApiError>) {
		self.messages.retain(|m| m.key != pending.temp_key);
		match result {
			Ok(exchange) => self.messages.extend(exchange_messages(&exchange)),
			Err(err) => {
				error!("chat message failed: {err}");
				self.notice = Some(format!("Message not sent: {}", err.user_message()));
			}
		}
		self.phase = ChatPhase::Idle;
	}

	pub fn begin_deep_dive(&mut self, now: NaiveDateTime) -> Option<DeepDiveTicket> {
		if !self.can_deep_dive() || self.phase != ChatPhase::Idle {
			return None;
		}
		self.phase = ChatPhase::DeepDiving;
		self.notice = None;
		let placeholder_key = self.push_local(
			"deepdive-loading",
			Author::Bot,
			"**Deep Dive Initiated**\nAnalyzing this step...".into(),
			now,
		);
		Some(DeepDiveTicket { placeholder_key })
	}

	/// Replace the placeholder with the outcome; returns whether new steps were created.
	pub fn finish_deep_dive(
		&mut self,
		ticket: DeepDiveTicket,
		result: Result<DeepDiveResult, ApiError>,
		now: NaiveDateTime,
	) -> bool {
		self.messages.retain(|m| m.key != ticket.placeholder_key);
		self.phase = ChatPhase::Idle;
		match result {
			Ok(result) => {
				let content = if result.breakdown_steps.is_empty() {
					"Deep dive completed, but no new sub-steps were suggested.".to_string()
				} else {
					let bullets: Vec<String> = result
						.breakdown_steps
						.iter()
						.map(|s| format!("• {}", s.content))
						.collect();
					format!("Deep dive completed! New sub-steps added:\n{}", bullets.join("\n"))
				};
				self.push_local("deepdive", Author::Bot, content, now);
				true
			}
			Err(err) => {
				warn!("deep dive failed: {err}");
				let content = format!("Deep dive failed. Please try again. {}", err.user_message());
				self.push_local("deepdive-error", Author::Bot, content, now);
				false
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use std::sync::Arc;

	use chrono::NaiveDate;
	use pollster::block_on;

	use super::*;
	use crate::api::MockTransport;
	use crate::models::Step;
	use crate::session::SessionContext;

	fn now() -> NaiveDateTime {
		NaiveDate::from_ymd_opt(2024, 5, 1)
			.and_then(|d| d.and_hms_opt(9, 0, 0))
			.unwrap()
	}

	fn exchange(id: i64, user: &str, bot: Option<&str>) -> ChatExchange {
		ChatExchange {
			id,
			assignment_id: Some(1),
			step_id: None,
			user_message: user.into(),
			bot_response: bot.map(Into::into),
			timestamp: now(),
		}
	}

	fn client(mock: Arc<MockTransport>) -> ApiClient {
		let session = SessionContext::in_memory();
		session.set_token("t");
		ApiClient::new("http://api", mock, session)
	}

	#[test]
	fn active_chat_survives_storage() {
		for scope in [ChatScope::Assignment(3), ChatScope::Step { assignment: 3, step: 12 }] {
			assert_eq!(ChatScope::restore(3, &scope.storage_value()), Some(scope));
		}
		assert_eq!(ChatScope::restore(3, "step:x"), None);
		assert_eq!(ChatScope::restore(3, ""), None);
	}

	#[test]
	fn history_flattens_exchanges_into_messages() {
		let mut state = ChatState::new(ChatScope::Assignment(1));
		state.load_history(&[exchange(1, "hi", Some("hello")), exchange(2, "still there?", None)]);

		let keys: Vec<&str> = state.messages.iter().map(|m| m.key.as_str()).collect();
		assert_eq!(keys, ["1-user", "1-bot", "2-user"]);
	}

	#[test]
	fn successful_send_replaces_optimistic_message() {
		let mut state = ChatState::new(ChatScope::Assignment(1));
		let pending = state.begin_send("  what next? ", now()).unwrap();
		assert_eq!(state.phase, ChatPhase::Sending);
		assert_eq!(state.messages.len(), 1);
		assert!(state.begin_send("again", now()).is_none());

		state.finish_send(pending, Ok(exchange(5, "what next?", Some("Write the intro."))));

		let keys: Vec<&str> = state.messages.iter().map(|m| m.key.as_str()).collect();
		assert_eq!(keys, ["5-user", "5-bot"]);
		assert_eq!(state.phase, ChatPhase::Idle);
	}

	#[test]
	fn failed_send_restores_pre_send_messages() {
		let mock = Arc::new(MockTransport::default().fail("connection reset"));
		let client = client(mock.clone());
		let mut state = ChatState::new(ChatScope::Step {
			assignment: 1,
			step: 7,
		});
		state.load_history(&[exchange(1, "hi", Some("hello"))]);
		let before = state.messages.clone();

		let pending = state.begin_send("help", now()).unwrap();
		let result = block_on(state.scope.post(&client, &pending.text));
		state.finish_send(pending, result);

		assert_eq!(state.messages, before);
		assert_eq!(state.phase, ChatPhase::Idle);
		assert!(state.notice.is_some());
		assert_eq!(mock.sent()[0].url, "http://api/chat");
	}

	#[test]
	fn blank_messages_are_not_sent() {
		let mut state = ChatState::new(ChatScope::Assignment(1));
		assert!(state.begin_send("   ", now()).is_none());
		assert!(state.messages.is_empty());
	}

	#[test]
	fn deep_dive_only_for_step_chats() {
		let mut state = ChatState::new(ChatScope::Assignment(1));
		assert!(state.begin_deep_dive(now()).is_none());
	}

	#[test]
	fn deep_dive_success_lists_new_substeps() {
		let mut state = ChatState::new(ChatScope::Step {
			assignment: 1,
			step: 7,
		});
		let ticket = state.begin_deep_dive(now()).unwrap();
		assert_eq!(state.phase, ChatPhase::DeepDiving);
		assert_eq!(state.messages.len(), 1);
		let step = |id, content: &str| Step {
			id,
			content: content.into(),
			completed: false,
			parent_id: Some(7),
			position_x: 0.0,
			position_y: 0.0,
			deadline: None,
		};

		let refreshed = state.finish_deep_dive(
			ticket,
			Ok(DeepDiveResult {
				breakdown_steps: vec![step(20, "Find sources"), step(21, "Summarise")],
			}),
			now(),
		);

		assert!(refreshed);
		assert_eq!(state.messages.len(), 1);
		assert_eq!(
			state.messages[0].content,
			"Deep dive completed! New sub-steps added:\n• Find sources\n• Summarise"
		);
	}

	#[test]
	fn deep_dive_failure_replaces_placeholder_with_error() {
		let mock = Arc::new(MockTransport::default().reply(500, r#"{"detail":"model timeout"}"#));
		let client = client(mock);
		let mut state = ChatState::new(ChatScope::Step {
			assignment: 1,
			step: 7,
		});

		let ticket = state.begin_deep_dive(now()).unwrap();
		let result = block_on(client.deep_dive(7, DEEP_DIVE_QUESTION));
		let refreshed = state.finish_deep_dive(ticket, result, now());

		assert!(!refreshed);
		assert_eq!(state.messages.len(), 1);
		assert!(state.messages[0].content.contains("model timeout"));
		assert!(state.messages[0].key.starts_with("deepdive-error"));
	}
}
