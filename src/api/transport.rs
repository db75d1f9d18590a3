use async_trait::async_trait;
use gloo_net::http::Request;
use wasm_bindgen::JsValue;

use crate::error::ApiError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Method {
	Get,
	Post,
	Put,
	Patch,
	Delete,
}

#[derive(Clone, Debug, PartialEq)]
pub enum FormValue {
	Text(String),
	File {
		file_name: String,
		content_type: String,
		bytes: Vec<u8>,
	},
}

#[derive(Clone, Debug, PartialEq)]
pub struct FormPart {
	pub name: String,
	pub value: FormValue,
}

impl FormPart {
	pub fn text(name: &str, value: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			value: FormValue::Text(value.into()),
		}
	}
}

#[derive(Clone, Debug, PartialEq)]
pub enum Body {
	Empty,
	Json(serde_json::Value),
	Form(Vec<FormPart>),
}

#[derive(Clone, Debug, PartialEq)]
pub struct HttpRequest {
	pub method: Method,
	pub url: String,
	pub bearer: Option<String>,
	pub body: Body,
}

#[derive(Clone, Debug, PartialEq)]
pub struct HttpResponse {
	pub status: u16,
	pub body: String,
}

impl HttpResponse {
	pub fn is_success(&self) -> bool {
		(200..300).contains(&self.status)
	}
}

/// Sends one request and hands back the raw status and body.
///
/// Implementations never interpret status codes; that is the client's job.
#[async_trait(?Send)]
pub trait Transport {
	async fn send(&self, request: HttpRequest) -> Result<HttpResponse, ApiError>;
}

/// Browser `fetch` through gloo-net.
#[derive(Clone, Copy, Debug, Default)]
pub struct FetchTransport;

fn js_error(err: JsValue) -> ApiError {
	ApiError::Network(format!("{err:?}"))
}

fn form_data(parts: &[FormPart]) -> Result<web_sys::FormData, ApiError> {
	let form = web_sys::FormData::new().map_err(js_error)?;
	for part in parts {
		match &part.value {
			FormValue::Text(text) => form.append_with_str(&part.name, text).map_err(js_error)?,
			FormValue::File {
				file_name,
				content_type,
				bytes,
			} => {
				let chunk = js_sys::Uint8Array::from(bytes.as_slice());
				let options = web_sys::BlobPropertyBag::new();
				options.set_type(content_type);
				let blob = web_sys::Blob::new_with_u8_array_sequence_and_options(
					&js_sys::Array::of1(&chunk),
					&options,
				)
				.map_err(js_error)?;
				form.append_with_blob_and_filename(&part.name, &blob, file_name)
					.map_err(js_error)?;
			}
		}
	}
	Ok(form)
}

#[async_trait(?Send)]
impl Transport for FetchTransport {
	async fn send(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
		let mut builder = match request.method {
			Method::Get => Request::get(&request.url),
			Method::Post => Request::post(&request.url),
			Method::Put => Request::put(&request.url),
			Method::Patch => Request::patch(&request.url),
			Method::Delete => Request::delete(&request.url),
		};
		if let Some(token) = &request.bearer {
			builder = builder.header("Authorization", &format!("Bearer {token}"));
		}

		let outgoing = match &request.body {
			Body::Empty => builder.build(),
			Body::Json(value) => builder.json(value),
			Body::Form(parts) => builder.body(form_data(parts)?),
		}
		.map_err(|e| ApiError::Network(e.to_string()))?;

		let response = outgoing
			.send()
			.await
			.map_err(|e| ApiError::Network(e.to_string()))?;
		let status = response.status();
		let body = response
			.text()
			.await
			.map_err(|e| ApiError::Network(e.to_string()))?;
		Ok(HttpResponse { status, body })
	}
}
