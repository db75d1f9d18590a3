use leptos::ev::SubmitEvent;
use leptos::prelude::*;
use leptos::task::spawn_local;
use leptos_router::hooks::use_navigate;
use log::{info, warn};

use crate::api::ApiClient;
use crate::forms::{validate_email, validate_login};

#[component]
pub fn LoginPage() -> impl IntoView {
	let client = expect_context::<ApiClient>();
	let navigate = use_navigate();
	let email = RwSignal::new(String::new());
	let password = RwSignal::new(String::new());
	let error: RwSignal<Option<String>> = RwSignal::new(None);
	let loading = RwSignal::new(false);
	let show_forgot = RwSignal::new(false);

	let login_client = client.clone();
	let on_submit = move |ev: SubmitEvent| {
		ev.prevent_default();
		let (email_val, password_val) = (email.get_untracked(), password.get_untracked());
		if let Err(err) = validate_login(&email_val, &password_val) {
			error.set(Some(err.user_message()));
			return;
		}
		loading.set(true);
		error.set(None);

		let (client, navigate) = (login_client.clone(), navigate.clone());
		spawn_local(async move {
			match client.login(email_val.trim(), &password_val).await {
				Ok(token) => {
					info!("signed in");
					client.session().set_token(&token.access_token);
					navigate("/dashboard", Default::default());
				}
				Err(err) => {
					warn!("login failed: {err}");
					error.set(Some(err.user_message()));
				}
			}
			loading.set(false);
		});
	};

	view! {
		<div class="auth-page">
			<form class="auth-card" on:submit=on_submit>
				<h1>"Welcome back"</h1>
				<label>
					"Email"
					<input
						type="email"
						placeholder="you@example.com"
						prop:value=move || email.get()
						on:input=move |ev| email.set(event_target_value(&ev))
					/>
				</label>
				<label>
					"Password"
					<input
						type="password"
						prop:value=move || password.get()
						on:input=move |ev| password.set(event_target_value(&ev))
					/>
				</label>
				{move || error.get().map(|e| view! { <div class="auth-error">{e}</div> })}
				<button type="submit" disabled=move || loading.get()>
					{move || if loading.get() { "Signing in..." } else { "Sign in" }}
				</button>
				<button type="button" class="link" on:click=move |_| show_forgot.set(true)>
					"Forgot password?"
				</button>
				<p>"No account? " <a href="/signup">"Sign up"</a></p>
			</form>
			<Show when=move || show_forgot.get()>
				<ForgotPassword on_close=move |_: ()| show_forgot.set(false) />
			</Show>
		</div>
	}
}

#[component]
fn ForgotPassword(#[prop(into)] on_close: Callback<()>) -> impl IntoView {
	let client = expect_context::<ApiClient>();
	let email = RwSignal::new(String::new());
	let status: RwSignal<Option<Result<String, String>>> = RwSignal::new(None);
	let sending = RwSignal::new(false);

	let on_submit = move |ev: SubmitEvent| {
		ev.prevent_default();
		let email_val = email.get_untracked();
		if let Err(err) = validate_email(&email_val) {
			status.set(Some(Err(err.user_message())));
			return;
		}
		sending.set(true);
		let client = client.clone();
		spawn_local(async move {
			let outcome = client
				.forgot_password(email_val.trim())
				.await
				.map(|()| "If that address has an account, a reset link is on its way.".to_string())
				.map_err(|err| err.user_message());
			status.set(Some(outcome));
			sending.set(false);
		});
	};

	view! {
		<div class="modal-backdrop">
			<form class="modal" on:submit=on_submit>
				<h2>"Reset password"</h2>
				<input
					type="email"
					placeholder="you@example.com"
					prop:value=move || email.get()
					on:input=move |ev| email.set(event_target_value(&ev))
				/>
				{move || {
					status
						.get()
						.map(|s| match s {
							Ok(msg) => view! { <p class="auth-success">{msg}</p> }.into_any(),
							Err(msg) => view! { <p class="auth-error">{msg}</p> }.into_any(),
						})
				}}
				<div class="modal-actions">
					<button type="submit" disabled=move || sending.get()>
						"Send reset link"
					</button>
					<button type="button" on:click=move |_| on_close.run(())>
						"Close"
					</button>
				</div>
			</form>
		</div>
	}
}
