use std::time::Duration;

const DEFAULT_BACKEND_URL: &str = "http://localhost:8000";

/// Runtime settings shared through Leptos context.
#[derive(Clone, Debug, PartialEq)]
pub struct AppConfig {
	pub api_base_url: String,
	pub session_check_interval: Duration,
	pub max_upload_bytes: u64,
	pub accepted_upload_extensions: Vec<&'static str>,
}

impl Default for AppConfig {
	fn default() -> Self {
		Self {
			api_base_url: DEFAULT_BACKEND_URL.into(),
			session_check_interval: Duration::from_secs(60),
			max_upload_bytes: 10 * 1024 * 1024,
			accepted_upload_extensions: vec!["pdf", "docx", "txt", "md"],
		}
	}
}

impl AppConfig {
	/// Settings baked in at build time; `BACKEND_URL` overrides the API origin.
	pub fn from_build_env() -> Self {
		Self::with_backend(option_env!("BACKEND_URL"))
	}

	fn with_backend(url: Option<&str>) -> Self {
		let mut config = Self::default();
		if let Some(url) = url.map(str::trim).filter(|u| !u.is_empty()) {
			config.api_base_url = url.trim_end_matches('/').to_string();
		}
		config
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn backend_override_drops_trailing_slash() {
		assert_eq!(
			AppConfig::with_backend(Some("https://api.flowde.app/")).api_base_url,
			"https://api.flowde.app"
		);
		assert_eq!(AppConfig::with_backend(Some("  ")).api_base_url, DEFAULT_BACKEND_URL);
		assert_eq!(AppConfig::with_backend(None).api_base_url, DEFAULT_BACKEND_URL);
	}
}
