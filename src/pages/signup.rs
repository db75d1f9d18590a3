use leptos::ev::SubmitEvent;
use leptos::prelude::*;
use leptos::task::spawn_local;
use leptos_router::hooks::use_navigate;
use log::{info, warn};

use crate::api::ApiClient;
use crate::forms::validate_signup;
use crate::models::SignupRequest;

fn text_input(label: &'static str, kind: &'static str, value: RwSignal<String>) -> impl IntoView {
	view! {
		<label>
			{label}
			<input
				type=kind
				prop:value=move || value.get()
				on:input=move |ev| value.set(event_target_value(&ev))
			/>
		</label>
	}
}

#[component]
pub fn SignupPage() -> impl IntoView {
	let client = expect_context::<ApiClient>();
	let navigate = use_navigate();
	let first_name = RwSignal::new(String::new());
	let last_name = RwSignal::new(String::new());
	let email = RwSignal::new(String::new());
	let password = RwSignal::new(String::new());
	let error: RwSignal<Option<String>> = RwSignal::new(None);
	let loading = RwSignal::new(false);

	let on_submit = move |ev: SubmitEvent| {
		ev.prevent_default();
		let request = SignupRequest {
			email: email.get_untracked().trim().to_string(),
			password: password.get_untracked(),
			first_name: first_name.get_untracked().trim().to_string(),
			last_name: last_name.get_untracked().trim().to_string(),
		};
		if let Err(err) = validate_signup(&request) {
			error.set(Some(err.user_message()));
			return;
		}
		loading.set(true);
		error.set(None);

		let (client, navigate) = (client.clone(), navigate.clone());
		spawn_local(async move {
			match client.signup(&request).await {
				Ok(token) => {
					info!("account created");
					client.session().set_token(&token.access_token);
					navigate("/dashboard", Default::default());
				}
				Err(err) => {
					warn!("signup failed: {err}");
					error.set(Some(err.user_message()));
				}
			}
			loading.set(false);
		});
	};

	view! {
		<div class="auth-page">
			<form class="auth-card" on:submit=on_submit>
				<h1>"Create your account"</h1>
				<div class="name-row">
					{text_input("First name", "text", first_name)}
					{text_input("Last name", "text", last_name)}
				</div>
				{text_input("Email", "email", email)}
				{text_input("Password", "password", password)}
				{move || error.get().map(|e| view! { <div class="auth-error">{e}</div> })}
				<button type="submit" disabled=move || loading.get()>
					{move || if loading.get() { "Creating account..." } else { "Sign up" }}
				</button>
				<p>"Already have an account? " <a href="/login">"Sign in"</a></p>
			</form>
		</div>
	}
}
