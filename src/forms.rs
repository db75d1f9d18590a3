//! Local checks run before a form is submitted; a failing form never reaches the network.

use crate::api::Upload;
use crate::config::AppConfig;
use crate::error::ApiError;
use crate::models::SignupRequest;

pub const MIN_PASSWORD_LEN: usize = 8;

fn invalid(message: impl Into<String>) -> ApiError {
	ApiError::Validation(message.into())
}

pub fn validate_email(email: &str) -> Result<(), ApiError> {
	let email = email.trim();
	let valid = match email.split_once('@') {
		Some((local, domain)) => {
			!local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
		}
		None => false,
	};
	if valid { Ok(()) } else { Err(invalid("Please enter a valid email address")) }
}

pub fn validate_login(email: &str, password: &str) -> Result<(), ApiError> {
	validate_email(email)?;
	if password.is_empty() {
		return Err(invalid("Please enter your password"));
	}
	Ok(())
}

pub fn validate_signup(request: &SignupRequest) -> Result<(), ApiError> {
	if request.first_name.trim().is_empty() || request.last_name.trim().is_empty() {
		return Err(invalid("Please enter your first and last name"));
	}
	validate_email(&request.email)?;
	if request.password.chars().count() < MIN_PASSWORD_LEN {
		return Err(invalid(format!(
			"Password must be at least {MIN_PASSWORD_LEN} characters"
		)));
	}
	Ok(())
}

fn extension(file_name: &str) -> Option<String> {
	file_name
		.rsplit_once('.')
		.map(|(_, ext)| ext.to_ascii_lowercase())
		.filter(|ext| !ext.is_empty())
}

pub fn validate_upload(file_name: &str, size: u64, config: &AppConfig) -> Result<(), ApiError> {
	let accepted = extension(file_name)
		.is_some_and(|ext| config.accepted_upload_extensions.contains(&ext.as_str()));
	if !accepted {
		return Err(invalid(format!(
			"{file_name}: unsupported file type (accepted: {})",
			config.accepted_upload_extensions.join(", ")
		)));
	}
	if size > config.max_upload_bytes {
		return Err(invalid(format!(
			"{file_name} is larger than {} MB",
			config.max_upload_bytes / (1024 * 1024)
		)));
	}
	Ok(())
}

/// A new assignment needs a description, attached files, or both.
pub fn validate_assignment(input: &str, files: &[Upload], config: &AppConfig) -> Result<(), ApiError> {
	if input.trim().is_empty() && files.is_empty() {
		return Err(invalid("Please enter project details"));
	}
	for file in files {
		validate_upload(&file.file_name, file.bytes.len() as u64, config)?;
	}
	Ok(())
}

#[cfg(test)]
mod tests {
	use std::sync::Arc;

	use pollster::block_on;

	use super::*;
	use crate::api::{ApiClient, MockTransport};
	use crate::session::SessionContext;

	fn upload(name: &str, len: usize) -> Upload {
		Upload {
			file_name: name.into(),
			content_type: "application/octet-stream".into(),
			bytes: vec![0; len],
		}
	}

	#[test]
	fn email_shapes() {
		assert!(validate_email("ada@example.com").is_ok());
		assert!(validate_email(" ada@example.com ").is_ok());
		for bad in ["", "ada", "@example.com", "ada@example", "ada@.com", "ada@example."] {
			assert!(validate_email(bad).is_err(), "{bad} accepted");
		}
	}

	#[test]
	fn signup_requires_names_and_password_length() {
		let mut request = SignupRequest {
			email: "ada@example.com".into(),
			password: "correct horse".into(),
			first_name: "Ada".into(),
			last_name: "Lovelace".into(),
		};
		assert!(validate_signup(&request).is_ok());

		request.password = "short".into();
		assert!(matches!(validate_signup(&request), Err(ApiError::Validation(_))));

		request.password = "long enough".into();
		request.last_name = " ".into();
		assert!(validate_signup(&request).is_err());
	}

	#[test]
	fn uploads_checked_against_config() {
		let config = AppConfig {
			max_upload_bytes: 10,
			..AppConfig::default()
		};
		assert!(validate_upload("notes.PDF", 10, &config).is_ok());
		assert!(validate_upload("notes.pdf", 11, &config).is_err());
		assert!(validate_upload("script.exe", 1, &config).is_err());
		assert!(validate_upload("README", 1, &config).is_err());
	}

	#[test]
	fn assignment_needs_text_or_files() {
		let config = AppConfig::default();
		assert!(validate_assignment("  ", &[], &config).is_err());
		assert!(validate_assignment("", &[upload("brief.docx", 3)], &config).is_ok());
		assert!(validate_assignment("Essay", &[upload("brief.zip", 3)], &config).is_err());
	}

	#[test]
	fn rejected_forms_never_touch_the_transport() {
		let mock = Arc::new(MockTransport::default());
		let client = ApiClient::new("http://api", mock.clone(), SessionContext::in_memory());

		let submit_login = |email: &str, password: &str| {
			validate_login(email, password)?;
			block_on(client.login(email, password)).map(|_| ())
		};

		assert!(matches!(submit_login("nope", "pw"), Err(ApiError::Validation(_))));
		assert!(matches!(submit_login("a@b.co", ""), Err(ApiError::Validation(_))));
		assert!(mock.sent().is_empty());
	}
}
