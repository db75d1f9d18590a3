//! Leptos client-side app wiring and routes.

use leptos::leptos_dom::helpers::set_interval_with_handle;
use leptos::prelude::*;
use leptos::task::spawn_local;
use leptos_meta::*;
use leptos_router::components::*;
use leptos_router::hooks::{use_location, use_navigate};
use leptos_router::path;
use log::{Level, debug, info, warn};

// Modules
pub mod api;
mod components;
pub mod config;
pub mod error;
pub mod forms;
pub mod graph;
pub mod layout;
pub mod models;
mod pages;
pub mod session;

// Top-Level pages
use crate::api::ApiClient;
use crate::config::AppConfig;
use crate::models::User;
use crate::pages::assignment::AssignmentPage;
use crate::pages::dashboard::DashboardPage;
use crate::pages::idea::IdeaPage;
use crate::pages::login::LoginPage;
use crate::pages::not_found::NotFound;
use crate::pages::signup::SignupPage;
use crate::session::{SessionContext, SessionEvent};

/// Profile of the signed-in user, refreshed by the periodic session check.
#[derive(Clone, Copy)]
pub struct CurrentUser(pub RwSignal<Option<User>>);

/// Initialize logging and panic hooks for the WASM target.
pub fn init_logging() {
	let _ = console_log::init_with_level(Level::Debug);
	console_error_panic_hook::set_once();
	info!("Logging initialized");
}

fn is_public(path: &str) -> bool {
	matches!(path, "/login" | "/signup")
}

/// Where the guard sends the user for a given session state and location.
fn guard_redirect(authenticated: bool, path: &str) -> Option<&'static str> {
	match (authenticated, is_public(path)) {
		(false, false) => Some("/login"),
		(true, true) => Some("/dashboard"),
		_ => None,
	}
}

/// Redirects on session changes; the only place that reacts to expiry.
#[component]
fn SessionGuard(authenticated: RwSignal<bool>) -> impl IntoView {
	let navigate = use_navigate();
	let location = use_location();

	Effect::new(move |_| {
		let path = location.pathname.get();
		if let Some(target) = guard_redirect(authenticated.get(), &path) {
			navigate(target, Default::default());
		}
	});
}

fn start_session_check(client: ApiClient, config: &AppConfig, user: RwSignal<Option<User>>) {
	let check = move || {
		if !client.session().is_authenticated() {
			return;
		}
		let client = client.clone();
		spawn_local(async move {
			match client.current_user().await {
				Ok(me) => user.set(Some(me)),
				// auth failures already expired the session inside the client
				Err(err) if err.is_auth_failure() => {}
				Err(err) => debug!("session check skipped: {err}"),
			}
		});
	};
	check();
	match set_interval_with_handle(check, config.session_check_interval) {
		Ok(handle) => on_cleanup(move || handle.clear()),
		Err(err) => warn!("could not schedule session check: {err:?}"),
	}
}

/// App shell: shared context, session handling and routes.
#[component]
pub fn App() -> impl IntoView {
	// Provides context that manages stylesheets, titles, meta tags, etc.
	provide_meta_context();

	let config = AppConfig::from_build_env();
	let session = SessionContext::browser();
	let client = ApiClient::browser(&config.api_base_url, session.clone());
	let authenticated = RwSignal::new(session.is_authenticated());
	let user: RwSignal<Option<User>> = RwSignal::new(None);

	let subscription = session.subscribe(move |event| {
		info!("session event: {event:?}");
		if matches!(event, SessionEvent::SignedOut | SessionEvent::Expired) {
			user.set(None);
		}
		authenticated.set(matches!(event, SessionEvent::SignedIn));
	});
	let cleanup_session = session.clone();
	on_cleanup(move || cleanup_session.unsubscribe(subscription));

	start_session_check(client.clone(), &config, user);

	provide_context(config);
	provide_context(session);
	provide_context(client);
	provide_context(CurrentUser(user));

	view! {
		<Html attr:lang="en" attr:dir="ltr" attr:data-theme="light" />

		// sets the document title
		<Title text="Flowde" />

		// injects metadata in the <head> of the page
		<Meta charset="UTF-8" />
		<Meta name="viewport" content="width=device-width, initial-scale=1.0" />

		<Router>
			<SessionGuard authenticated=authenticated />
			<Routes fallback=|| view! { <NotFound /> }>
				<Route path=path!("/") view=|| view! { <Redirect path="/dashboard" /> } />
				<Route path=path!("/login") view=LoginPage />
				<Route path=path!("/signup") view=SignupPage />
				<Route path=path!("/dashboard") view=DashboardPage />
				<Route path=path!("/assignments/:id") view=AssignmentPage />
				<Route path=path!("/ideas") view=IdeaPage />
				<Route path=path!("/ideas/:id") view=IdeaPage />
			</Routes>
		</Router>
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn only_auth_pages_are_public() {
		assert!(is_public("/login"));
		assert!(is_public("/signup"));
		assert!(!is_public("/dashboard"));
		assert!(!is_public("/assignments/4"));
	}

	#[test]
	fn guard_sends_signed_out_users_to_login() {
		assert_eq!(guard_redirect(false, "/dashboard"), Some("/login"));
		assert_eq!(guard_redirect(false, "/ideas/abc"), Some("/login"));
		assert_eq!(guard_redirect(false, "/login"), None);
		assert_eq!(guard_redirect(false, "/signup"), None);
	}

	#[test]
	fn guard_keeps_signed_in_users_off_auth_pages() {
		assert_eq!(guard_redirect(true, "/login"), Some("/dashboard"));
		assert_eq!(guard_redirect(true, "/signup"), Some("/dashboard"));
		assert_eq!(guard_redirect(true, "/assignments/9"), None);
	}
}
