//! Error taxonomy shared by the API client, forms and pages.

use serde::Deserialize;

/// How a failed request should be handled by the caller.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorClass {
	/// 401/403: the session is gone, the app shell sends the user to login.
	Auth,
	/// Rejected before any request was sent.
	Validation,
	/// 404 from the backend.
	NotFound,
	/// Any other non-success status.
	Server,
	/// The request never produced a response.
	Network,
	/// A response arrived but its body did not match the expected shape.
	Decode,
}

/// Error returned by every API operation.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum ApiError {
	/// Backend answered 401 or 403.
	#[error("not authorized ({status}): {detail}")]
	Unauthorized { status: u16, detail: String },

	/// Backend answered 404.
	#[error("not found: {detail}")]
	NotFound { detail: String },

	/// Backend answered with another non-success status.
	#[error("server error ({status}): {detail}")]
	Server { status: u16, detail: String },

	/// Transport failure (offline, CORS, aborted).
	#[error("network error: {0}")]
	Network(String),

	/// Body could not be decoded.
	#[error("unexpected response: {0}")]
	Decode(String),

	/// Local validation rejected the input.
	#[error("{0}")]
	Validation(String),
}

impl ApiError {
	pub fn class(&self) -> ErrorClass {
		match self {
			ApiError::Unauthorized { .. } => ErrorClass::Auth,
			ApiError::NotFound { .. } => ErrorClass::NotFound,
			ApiError::Server { .. } => ErrorClass::Server,
			ApiError::Network(_) => ErrorClass::Network,
			ApiError::Decode(_) => ErrorClass::Decode,
			ApiError::Validation(_) => ErrorClass::Validation,
		}
	}

	pub fn is_auth_failure(&self) -> bool {
		self.class() == ErrorClass::Auth
	}

	/// Message suitable for an inline banner.
	pub fn user_message(&self) -> String {
		match self {
			ApiError::Unauthorized { detail, .. } if !detail.is_empty() && detail != NO_DETAIL => detail.clone(),
			ApiError::Unauthorized { .. } => "Your session has expired. Please log in again.".into(),
			ApiError::NotFound { detail } | ApiError::Server { detail, .. } => detail.clone(),
			ApiError::Network(_) => "Could not reach the server. Please try again.".into(),
			ApiError::Decode(_) => "The server sent an unexpected response.".into(),
			ApiError::Validation(msg) => msg.clone(),
		}
	}
}

const NO_DETAIL: &str = "no details provided";

#[derive(Deserialize)]
struct DetailBody {
	detail: serde_json::Value,
}

/// Pull the backend's `detail` field out of an error body, falling back to the raw text.
pub fn extract_detail(body: &str) -> String {
	match serde_json::from_str::<DetailBody>(body) {
		Ok(DetailBody {
			detail: serde_json::Value::String(s),
		}) => s,
		Ok(DetailBody { detail }) => detail.to_string(),
		Err(_) if body.trim().is_empty() => NO_DETAIL.into(),
		Err(_) => body.trim().to_string(),
	}
}

/// Map a non-success status and its body onto an [`ApiError`].
pub fn classify_status(status: u16, body: &str) -> ApiError {
	let detail = extract_detail(body);
	match status {
		401 | 403 => ApiError::Unauthorized { status, detail },
		404 => ApiError::NotFound { detail },
		_ => ApiError::Server { status, detail },
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn auth_statuses_classify_as_auth() {
		assert_eq!(classify_status(401, "").class(), ErrorClass::Auth);
		assert_eq!(classify_status(403, "").class(), ErrorClass::Auth);
		assert_eq!(classify_status(404, "").class(), ErrorClass::NotFound);
		assert_eq!(classify_status(500, "").class(), ErrorClass::Server);
		assert_eq!(classify_status(422, "").class(), ErrorClass::Server);
	}

	#[test]
	fn detail_is_extracted_from_fastapi_bodies() {
		let err = classify_status(404, r#"{"detail":"No assignments found for this user"}"#);
		assert_eq!(
			err,
			ApiError::NotFound {
				detail: "No assignments found for this user".into()
			}
		);
		assert_eq!(extract_detail("plain failure"), "plain failure");
		assert_eq!(extract_detail(""), "no details provided");
		assert_eq!(extract_detail(r#"{"detail":[1,2]}"#), "[1,2]");
	}

	#[test]
	fn auth_messages_prefer_backend_detail() {
		let bad_login = classify_status(401, r#"{"detail":"Incorrect email or password"}"#);
		assert_eq!(bad_login.user_message(), "Incorrect email or password");

		let bare = classify_status(401, "");
		assert_eq!(
			bare.user_message(),
			"Your session has expired. Please log in again."
		);
	}
}
