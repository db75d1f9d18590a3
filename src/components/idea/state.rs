use chrono::NaiveDateTime;
use log::error;

use crate::api::ApiClient;
use crate::error::ApiError;
use crate::models::{IdeaMessage, IdeaReply, IdeaRole, IdeaSession, IdeaSessionId, IdeaTranscript};

/// Sections a spec needs before it is considered complete.
pub const REQUIRED_SECTIONS: [&str; 3] = ["Vision & Outcome", "Core Features", "Tech Stack"];

/// Whether `## name` exists with real content before the next heading.
pub fn section_complete(markdown: &str, name: &str) -> bool {
	let heading = format!("## {}\n", name.to_lowercase());
	let lower = markdown.to_lowercase();
	let Some(start) = lower.find(&heading) else {
		return false;
	};
	let content = lower[start + heading.len()..]
		.split('#')
		.next()
		.unwrap_or_default()
		.trim();
	!content.is_empty() && !content.contains("_todo")
}

/// Message shown optimistically while the assistant answers.
#[derive(Clone, Debug, PartialEq)]
pub struct IdeaSend {
	pub text: String,
	session: Option<IdeaSessionId>,
	restore_len: usize,
}

/// What came back for one send; a session may exist even when the message failed.
#[derive(Clone, Debug, PartialEq)]
pub struct IdeaOutcome {
	pub created: Option<IdeaSession>,
	pub reply: Result<IdeaReply, ApiError>,
}

impl IdeaSend {
	/// Creates the session on the first message, then posts it.
	pub async fn submit(&self, client: &ApiClient) -> IdeaOutcome {
		let (session_id, created) = match &self.session {
			Some(id) => (id.clone(), None),
			None => match client.create_idea_session().await {
				Ok(session) => (session.id.clone(), Some(session)),
				Err(err) => {
					return IdeaOutcome {
						created: None,
						reply: Err(err),
					};
				}
			},
		};
		let reply = client.send_idea_message(&session_id, &self.text).await;
		IdeaOutcome { created, reply }
	}
}

/// Conversation and spec document of the idea being discussed.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct IdeaChatState {
	pub session: Option<IdeaSession>,
	pub messages: Vec<IdeaMessage>,
	pub spec_markdown: String,
	/// Sections the last reply touched.
	pub updated_sections: Vec<String>,
	pub sending: bool,
	pub error: Option<String>,
}

impl IdeaChatState {
	pub fn session_id(&self) -> Option<&str> {
		self.session.as_ref().map(|s| s.id.as_str())
	}

	pub fn open(&mut self, session: IdeaSession, transcript: IdeaTranscript) {
		*self = Self {
			session: Some(session),
			messages: transcript.messages,
			spec_markdown: transcript.spec_markdown,
			..Self::default()
		};
	}

	pub fn begin_send(&mut self, text: &str, now: NaiveDateTime) -> Option<IdeaSend> {
		let text = text.trim();
		if text.is_empty() || self.sending {
			return None;
		}
		let restore_len = self.messages.len();
		self.sending = true;
		self.error = None;
		self.messages.push(IdeaMessage {
			role: IdeaRole::User,
			content: text.to_string(),
			created_at: Some(now),
		});
		Some(IdeaSend {
			text: text.to_string(),
			session: self.session_id().map(str::to_string),
			restore_len,
		})
	}

	/// Applies the reply or rolls the optimistic message back.
	///
	/// Returns the id of a session created by this send.
	pub fn finish_send(
		&mut self,
		send: IdeaSend,
		outcome: IdeaOutcome,
		now: NaiveDateTime,
	) -> Option<IdeaSessionId> {
		self.sending = false;
		let created = outcome.created.map(|session| {
			let id = session.id.clone();
			self.session = Some(session);
			id
		});
		match outcome.reply {
			Ok(reply) => {
				self.messages.push(IdeaMessage {
					role: IdeaRole::Assistant,
					content: reply.assistant_msg,
					created_at: Some(now),
				});
				self.spec_markdown = reply.spec_markdown;
				self.updated_sections = reply.updated_sections;
			}
			Err(err) => {
				error!("idea message failed: {err}");
				self.messages.truncate(send.restore_len);
				self.error = Some("Failed to send message. Please try again.".into());
			}
		}
		created
	}

	pub fn required_sections(&self) -> Vec<(&'static str, bool)> {
		REQUIRED_SECTIONS
			.iter()
			.map(|name| (*name, section_complete(&self.spec_markdown, name)))
			.collect()
	}
}
