use std::sync::Arc;

use log::debug;
use serde::de::DeserializeOwned;
use serde_json::json;

use super::transport::{Body, FetchTransport, FormPart, FormValue, HttpRequest, Method, Transport};
use crate::error::{ApiError, classify_status};
use crate::models::{
	Assignment, AssignmentId, AssignmentSummary, AuthToken, ChatExchange, CreatedAssignment,
	DeepDiveResult, IdeaReply, IdeaSession, IdeaTranscript, InsertionType, SignupRequest, StepId,
	User,
};
use crate::session::SessionContext;

/// File attached to a new assignment.
#[derive(Clone, Debug, PartialEq)]
pub struct Upload {
	pub file_name: String,
	pub content_type: String,
	pub bytes: Vec<u8>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct NewStep {
	pub assignment_id: AssignmentId,
	pub content: String,
	pub reference_node_id: Option<StepId>,
	pub position_x: f64,
	pub position_y: f64,
	pub insertion_type: InsertionType,
}

/// Typed client for the flowde REST backend.
///
/// Every call reads the bearer token from the session at send time. A 401/403
/// on a request that carried a token expires the session before the error is
/// returned; anonymous calls such as login only report it.
#[derive(Clone)]
pub struct ApiClient {
	base_url: Arc<str>,
	transport: Arc<dyn Transport + Send + Sync>,
	session: SessionContext,
}

impl ApiClient {
	pub fn new(
		base_url: &str,
		transport: Arc<dyn Transport + Send + Sync>,
		session: SessionContext,
	) -> Self {
		Self {
			base_url: base_url.trim_end_matches('/').into(),
			transport,
			session,
		}
	}

	pub fn browser(base_url: &str, session: SessionContext) -> Self {
		Self::new(base_url, Arc::new(FetchTransport), session)
	}

	pub fn session(&self) -> &SessionContext {
		&self.session
	}

	async fn execute(&self, method: Method, path: &str, body: Body) -> Result<String, ApiError> {
		let request = HttpRequest {
			method,
			url: format!("{}{}", self.base_url, path),
			bearer: self.session.token(),
			body,
		};
		debug!("{:?} {}", request.method, request.url);
		let authenticated = request.bearer.is_some();
		let response = self.transport.send(request).await?;
		if response.is_success() {
			return Ok(response.body);
		}
		let err = classify_status(response.status, &response.body);
		if err.is_auth_failure() && authenticated {
			self.session.expire();
		}
		Err(err)
	}

	async fn fetch<T: DeserializeOwned>(&self, method: Method, path: &str, body: Body) -> Result<T, ApiError> {
		let text = self.execute(method, path, body).await?;
		serde_json::from_str(&text).map_err(|e| ApiError::Decode(e.to_string()))
	}

	async fn call(&self, method: Method, path: &str, body: Body) -> Result<(), ApiError> {
		self.execute(method, path, body).await.map(|_| ())
	}

	// auth

	pub async fn login(&self, email: &str, password: &str) -> Result<AuthToken, ApiError> {
		let body = json!({ "email": email, "password": password });
		self.fetch(Method::Post, "/login", Body::Json(body)).await
	}

	pub async fn signup(&self, request: &SignupRequest) -> Result<AuthToken, ApiError> {
		let body = serde_json::to_value(request).map_err(|e| ApiError::Decode(e.to_string()))?;
		self.fetch(Method::Post, "/signup", Body::Json(body)).await
	}

	pub async fn google_login(&self, credential: &str) -> Result<AuthToken, ApiError> {
		let form = vec![FormPart::text("token", credential)];
		self.fetch(Method::Post, "/google-login", Body::Form(form)).await
	}

	pub async fn forgot_password(&self, email: &str) -> Result<(), ApiError> {
		let form = vec![FormPart::text("email", email)];
		self.call(Method::Post, "/forgot-password", Body::Form(form)).await
	}

	pub async fn current_user(&self) -> Result<User, ApiError> {
		self.fetch(Method::Get, "/me", Body::Empty).await
	}

	// assignments

	pub async fn list_assignments(&self) -> Result<Vec<AssignmentSummary>, ApiError> {
		self.fetch(Method::Get, "/user/assignments", Body::Empty).await
	}

	pub async fn fetch_assignment(&self, id: AssignmentId) -> Result<Assignment, ApiError> {
		self.fetch(Method::Get, &format!("/assignments/{id}"), Body::Empty).await
	}

	pub async fn create_assignment(&self, input: &str) -> Result<CreatedAssignment, ApiError> {
		let body = json!({ "assignment_input": input });
		self.fetch(Method::Post, "/create-assignment", Body::Json(body)).await
	}

	/// Multipart upload; each attachment is sent under the repeated `files` field.
	pub async fn create_assignment_with_files(
		&self,
		input: &str,
		files: Vec<Upload>,
		pdf_only: bool,
	) -> Result<CreatedAssignment, ApiError> {
		let mut form = vec![FormPart::text("assignment_input", input)];
		if pdf_only {
			form.push(FormPart::text("pdf_only", "true"));
		}
		form.extend(files.into_iter().map(|file| FormPart {
			name: "files".into(),
			value: FormValue::File {
				file_name: file.file_name,
				content_type: file.content_type,
				bytes: file.bytes,
			},
		}));
		self.fetch(Method::Post, "/create-assignment-with-files", Body::Form(form))
			.await
	}

	// steps

	pub async fn update_step_position(&self, id: StepId, x: f64, y: f64) -> Result<(), ApiError> {
		let body = json!({ "position_x": x, "position_y": y });
		self.call(Method::Put, &format!("/steps/{id}/position"), Body::Json(body))
			.await
	}

	pub async fn update_step_content(&self, id: StepId, content: &str) -> Result<(), ApiError> {
		let body = json!({ "content": content });
		self.call(Method::Patch, &format!("/steps/{id}"), Body::Json(body)).await
	}

	pub async fn update_step_completion(&self, id: StepId, completed: bool) -> Result<(), ApiError> {
		let body = json!({ "completed": completed });
		self.call(Method::Patch, &format!("/steps/{id}/completion"), Body::Json(body))
			.await
	}

	pub async fn delete_step(&self, id: StepId) -> Result<(), ApiError> {
		self.call(Method::Delete, &format!("/steps/{id}"), Body::Empty).await
	}

	pub async fn add_step(&self, step: &NewStep) -> Result<(), ApiError> {
		let body = json!({
			"assignment_id": step.assignment_id,
			"content": step.content,
			"reference_node_id": step.reference_node_id,
			"position_x": step.position_x,
			"position_y": step.position_y,
			"insertion_type": step.insertion_type,
		});
		self.call(Method::Post, "/steps", Body::Json(body)).await
	}

	pub async fn add_connection(
		&self,
		assignment_id: AssignmentId,
		from: StepId,
		to: StepId,
	) -> Result<(), ApiError> {
		let body = json!({ "assignment_id": assignment_id, "from_step": from, "to_step": to });
		self.call(Method::Post, "/connections", Body::Json(body)).await
	}

	// chat

	pub async fn assignment_chat(&self, id: AssignmentId) -> Result<Vec<ChatExchange>, ApiError> {
		self.fetch(Method::Get, &format!("/chat/assignment/{id}"), Body::Empty)
			.await
	}

	pub async fn node_chat(&self, id: StepId) -> Result<Vec<ChatExchange>, ApiError> {
		self.fetch(Method::Get, &format!("/chat/node/{id}"), Body::Empty).await
	}

	pub async fn post_chat_message(
		&self,
		assignment_id: AssignmentId,
		step_id: Option<StepId>,
		message: &str,
	) -> Result<ChatExchange, ApiError> {
		let body = json!({
			"assignment_id": assignment_id,
			"step_id": step_id,
			"user_message": message,
		});
		self.fetch(Method::Post, "/chat", Body::Json(body)).await
	}

	pub async fn deep_dive(&self, step_id: StepId, question: &str) -> Result<DeepDiveResult, ApiError> {
		let body = json!({ "question": question });
		self.fetch(Method::Post, &format!("/chat/deepdive/{step_id}"), Body::Json(body))
			.await
	}

	// idea sessions

	pub async fn create_idea_session(&self) -> Result<IdeaSession, ApiError> {
		self.fetch(Method::Post, "/api/idea/sessions", Body::Json(json!({})))
			.await
	}

	/// Newest first.
	pub async fn list_idea_sessions(&self) -> Result<Vec<IdeaSession>, ApiError> {
		self.fetch(Method::Get, "/api/idea/sessions", Body::Empty).await
	}

	pub async fn fetch_idea_session(&self, id: &str) -> Result<IdeaSession, ApiError> {
		self.fetch(Method::Get, &format!("/api/idea/sessions/{id}"), Body::Empty)
			.await
	}

	pub async fn idea_transcript(&self, id: &str) -> Result<IdeaTranscript, ApiError> {
		self.fetch(Method::Get, &format!("/api/idea/sessions/{id}/messages"), Body::Empty)
			.await
	}

	pub async fn send_idea_message(&self, session_id: &str, message: &str) -> Result<IdeaReply, ApiError> {
		let body = json!({ "session_id": session_id, "user_msg": message });
		self.fetch(Method::Post, "/api/idea/message", Body::Json(body)).await
	}
}

#[cfg(test)]
mod tests {
	use pollster::block_on;

	use super::super::transport::mock::MockTransport;
	use super::*;

	fn client_with(mock: Arc<MockTransport>) -> (ApiClient, SessionContext) {
		let session = SessionContext::in_memory();
		session.set_token("tok-1");
		let client = ApiClient::new("http://api.test/", mock, session.clone());
		(client, session)
	}

	#[test]
	fn requests_carry_bearer_token_and_path() {
		let mock = Arc::new(MockTransport::default().reply(200, "{}"));
		let (client, _) = client_with(mock.clone());

		block_on(client.update_step_position(5, 10.0, 20.5)).unwrap();

		let sent = mock.sent();
		assert_eq!(sent[0].method, Method::Put);
		assert_eq!(sent[0].url, "http://api.test/steps/5/position");
		assert_eq!(sent[0].bearer.as_deref(), Some("tok-1"));
		assert_eq!(
			sent[0].body,
			Body::Json(json!({ "position_x": 10.0, "position_y": 20.5 }))
		);
	}

	#[test]
	fn missing_token_sends_unauthenticated_request() {
		let mock = Arc::new(MockTransport::default().reply(200, "[]"));
		let session = SessionContext::in_memory();
		let client = ApiClient::new("http://api.test", mock.clone(), session);

		let list = block_on(client.list_assignments()).unwrap();

		assert!(list.is_empty());
		assert_eq!(mock.sent()[0].bearer, None);
	}

	#[test]
	fn unauthorized_from_any_endpoint_clears_token() {
		for status in [401, 403] {
			let mock = Arc::new(MockTransport::default().reply(status, r#"{"detail":"expired"}"#));
			let (client, session) = client_with(mock);
			session.select_assignment(Some(3));

			let err = block_on(client.node_chat(9)).unwrap_err();

			assert!(err.is_auth_failure());
			assert_eq!(session.token(), None);
			assert_eq!(session.selected_assignment(), None);
		}
	}

	#[test]
	fn rejected_login_reports_detail_without_expiring() {
		let mock = Arc::new(
			MockTransport::default().reply(401, r#"{"detail":"Incorrect email or password"}"#),
		);
		let session = SessionContext::in_memory();
		let events = Arc::new(std::sync::Mutex::new(Vec::new()));
		let sink = events.clone();
		session.subscribe(move |e| sink.lock().unwrap().push(e.clone()));
		let client = ApiClient::new("http://api.test", mock.clone(), session);

		let err = block_on(client.login("a@b.co", "wrong")).unwrap_err();

		assert!(err.is_auth_failure());
		assert_eq!(err.user_message(), "Incorrect email or password");
		assert_eq!(mock.sent()[0].bearer, None);
		assert!(events.lock().unwrap().is_empty());
	}

	#[test]
	fn other_failures_keep_the_session() {
		let mock = Arc::new(
			MockTransport::default()
				.reply(500, r#"{"detail":"boom"}"#)
				.fail("offline"),
		);
		let (client, session) = client_with(mock);

		let server = block_on(client.delete_step(1)).unwrap_err();
		let network = block_on(client.delete_step(1)).unwrap_err();

		assert_eq!(
			server,
			ApiError::Server {
				status: 500,
				detail: "boom".into()
			}
		);
		assert_eq!(network, ApiError::Network("offline".into()));
		assert!(session.is_authenticated());
	}

	#[test]
	fn add_step_serializes_insertion_hint() {
		let mock = Arc::new(MockTransport::default().reply(200, "{}"));
		let (client, _) = client_with(mock.clone());
		let step = NewStep {
			assignment_id: 2,
			content: "Draft intro".into(),
			reference_node_id: None,
			position_x: 40.0,
			position_y: 80.0,
			insertion_type: InsertionType::Unattached,
		};

		block_on(client.add_step(&step)).unwrap();

		let Body::Json(body) = &mock.sent()[0].body else {
			panic!("expected json body");
		};
		assert_eq!(body["insertion_type"], "random");
		assert!(body["reference_node_id"].is_null());
	}

	#[test]
	fn file_upload_repeats_files_field() {
		let mock = Arc::new(MockTransport::default().reply(200, r#"{"assignment_id": 11}"#));
		let (client, _) = client_with(mock.clone());
		let upload = |name: &str| Upload {
			file_name: name.into(),
			content_type: "application/pdf".into(),
			bytes: vec![1, 2, 3],
		};

		let created = block_on(client.create_assignment_with_files(
			"Write a report",
			vec![upload("a.pdf"), upload("b.pdf")],
			true,
		))
		.unwrap();

		assert_eq!(created.assignment_id, 11);
		let Body::Form(parts) = &mock.sent()[0].body else {
			panic!("expected multipart body");
		};
		let names: Vec<&str> = parts.iter().map(|p| p.name.as_str()).collect();
		assert_eq!(names, ["assignment_input", "pdf_only", "files", "files"]);
	}

	#[test]
	fn idea_endpoints_use_session_paths() {
		let session = r#"{"id":"ab12","title":null,"spec_preview":"","created_at":"2024-03-01T10:00:00"}"#;
		let mock = Arc::new(
			MockTransport::default()
				.reply(200, &format!("[{session}]"))
				.reply(200, session)
				.reply(200, r#"{"messages":[],"spec_markdown":""}"#)
				.reply(200, r###"{"assistant_msg":"Tell me more","spec_markdown":"## Core Features"}"###),
		);
		let (client, _) = client_with(mock.clone());

		let listed = block_on(client.list_idea_sessions()).unwrap();
		block_on(client.fetch_idea_session("ab12")).unwrap();
		block_on(client.idea_transcript("ab12")).unwrap();
		let reply = block_on(client.send_idea_message("ab12", "a recipe app")).unwrap();

		assert_eq!(listed[0].id, "ab12");
		assert_eq!(reply.assistant_msg, "Tell me more");
		let urls: Vec<String> = mock.sent().into_iter().map(|r| r.url).collect();
		assert_eq!(
			urls,
			[
				"http://api.test/api/idea/sessions",
				"http://api.test/api/idea/sessions/ab12",
				"http://api.test/api/idea/sessions/ab12/messages",
				"http://api.test/api/idea/message",
			]
		);
		assert_eq!(
			mock.sent()[3].body,
			Body::Json(json!({ "session_id": "ab12", "user_msg": "a recipe app" }))
		);
	}

	#[test]
	fn malformed_body_is_a_decode_error() {
		let mock = Arc::new(MockTransport::default().reply(200, "not json"));
		let (client, _) = client_with(mock);

		let err = block_on(client.fetch_assignment(1)).unwrap_err();

		assert!(matches!(err, ApiError::Decode(_)));
	}
}
