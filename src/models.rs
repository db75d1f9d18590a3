use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

pub type AssignmentId = i64;
pub type StepId = i64;

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct Assignment {
	pub id: AssignmentId,
	pub title: String,
	#[serde(default)]
	pub description: Option<String>,
	#[serde(default)]
	pub deadline: Option<String>,
	#[serde(default)]
	pub completed: bool,
	#[serde(default)]
	pub steps: Vec<Step>,
	#[serde(default)]
	pub connections: Vec<Connection>,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct AssignmentSummary {
	pub id: AssignmentId,
	pub title: String,
	#[serde(default)]
	pub description: Option<String>,
	#[serde(default)]
	pub deadline: Option<String>,
	#[serde(default)]
	pub completed: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Step {
	pub id: StepId,
	pub content: String,
	#[serde(default)]
	pub completed: bool,
	#[serde(default)]
	pub parent_id: Option<StepId>,
	pub position_x: f64,
	pub position_y: f64,
	#[serde(default)]
	pub deadline: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct Connection {
	#[serde(default)]
	pub id: Option<i64>,
	pub from_step: StepId,
	pub to_step: StepId,
}

/// How a new step relates to the node it was created from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsertionType {
	/// Sibling placed after the reference.
	After,
	/// New main step next to the reference's chain.
	NewStep,
	/// Child of the reference.
	Substep,
	/// Free-floating node with no reference.
	#[serde(rename = "random")]
	Unattached,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct ChatExchange {
	pub id: i64,
	#[serde(default)]
	pub assignment_id: Option<AssignmentId>,
	#[serde(default)]
	pub step_id: Option<StepId>,
	pub user_message: String,
	#[serde(default)]
	pub bot_response: Option<String>,
	pub timestamp: NaiveDateTime,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct DeepDiveResult {
	#[serde(default)]
	pub breakdown_steps: Vec<Step>,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct CreatedAssignment {
	pub assignment_id: AssignmentId,
	#[serde(default)]
	pub title: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct AuthToken {
	pub access_token: String,
	#[serde(default)]
	pub token_type: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct User {
	pub id: serde_json::Value,
	pub email: String,
	#[serde(default)]
	pub first_name: Option<String>,
	#[serde(default)]
	pub last_name: Option<String>,
}

impl User {
	pub fn display_name(&self) -> String {
		match (&self.first_name, &self.last_name) {
			(Some(first), Some(last)) => format!("{first} {last}"),
			(Some(first), None) => first.clone(),
			_ => self.email.clone(),
		}
	}
}

/// Server-assigned UUID of an idea session.
pub type IdeaSessionId = String;

/// A project-idea conversation that grows a spec document.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct IdeaSession {
	pub id: IdeaSessionId,
	#[serde(default)]
	pub title: Option<String>,
	#[serde(default)]
	pub spec_preview: String,
	pub created_at: NaiveDateTime,
	#[serde(default)]
	pub updated_at: Option<NaiveDateTime>,
}

impl IdeaSession {
	pub fn display_title(&self) -> String {
		match &self.title {
			Some(title) if !title.is_empty() => title.clone(),
			_ => format!("Untitled Idea {}", self.id),
		}
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdeaRole {
	User,
	Assistant,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct IdeaMessage {
	pub role: IdeaRole,
	pub content: String,
	#[serde(default)]
	pub created_at: Option<NaiveDateTime>,
}

/// Messages and current spec of one idea session.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct IdeaTranscript {
	#[serde(default)]
	pub messages: Vec<IdeaMessage>,
	#[serde(default)]
	pub spec_markdown: String,
}

/// Reply to `POST /api/idea/message`.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct IdeaReply {
	pub assistant_msg: String,
	#[serde(default)]
	pub spec_markdown: String,
	#[serde(default)]
	pub updated_sections: Vec<String>,
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct SignupRequest {
	pub email: String,
	pub password: String,
	pub first_name: String,
	pub last_name: String,
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn assignment_payload_decodes_with_nested_steps() {
		let json = r#"{
			"id": 7,
			"title": "Essay",
			"description": null,
			"completed": false,
			"steps": [
				{"id": 1, "content": "Research", "position_x": 0.0, "position_y": 0.0, "completed": false, "parent_id": null},
				{"id": 2, "content": "Sources", "position_x": 10.5, "position_y": 60, "completed": true, "parent_id": 1}
			],
			"connections": [{"id": 3, "from_step": 1, "to_step": 2}]
		}"#;
		let assignment: Assignment = serde_json::from_str(json).unwrap();
		assert_eq!(assignment.steps.len(), 2);
		assert_eq!(assignment.steps[0].parent_id, None);
		assert_eq!(assignment.steps[1].parent_id, Some(1));
		assert_eq!(assignment.connections[0].to_step, 2);
	}

	#[test]
	fn insertion_types_use_backend_names() {
		let names: Vec<String> = [
			InsertionType::After,
			InsertionType::NewStep,
			InsertionType::Substep,
			InsertionType::Unattached,
		]
		.iter()
		.map(|t| serde_json::to_string(t).unwrap())
		.collect();
		assert_eq!(names, ["\"after\"", "\"new_step\"", "\"substep\"", "\"random\""]);
	}

	#[test]
	fn idea_transcript_decodes_roles() {
		let json = r###"{"messages": [
			{"role": "user", "content": "A habit tracker", "created_at": "2024-03-01T12:30:45.5"},
			{"role": "assistant", "content": "Who is it for?", "created_at": "2024-03-01T12:30:47"}
		], "spec_markdown": "## Vision & Outcome\nTrack habits"}"###;
		let transcript: IdeaTranscript = serde_json::from_str(json).unwrap();
		assert_eq!(transcript.messages[0].role, IdeaRole::User);
		assert_eq!(transcript.messages[1].role, IdeaRole::Assistant);
		assert!(transcript.spec_markdown.starts_with("## Vision"));
	}

	#[test]
	fn untitled_idea_sessions_fall_back_to_id() {
		let json = r#"{"id": "5f1c", "title": null, "spec_preview": "", "created_at": "2024-03-01T12:30:45", "updated_at": null}"#;
		let session: IdeaSession = serde_json::from_str(json).unwrap();
		assert_eq!(session.display_title(), "Untitled Idea 5f1c");
	}

	#[test]
	fn chat_timestamps_accept_fractional_seconds() {
		let json = r#"{"id": 4, "assignment_id": 1, "step_id": null, "user_message": "hi",
			"bot_response": "hello", "timestamp": "2024-03-01T12:30:45.123456"}"#;
		let exchange: ChatExchange = serde_json::from_str(json).unwrap();
		assert_eq!(exchange.bot_response.as_deref(), Some("hello"));
	}
}
