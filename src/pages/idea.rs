use leptos::prelude::*;
use leptos::task::spawn_local;
use leptos_router::hooks::{use_navigate, use_params_map};
use log::error;

use crate::api::ApiClient;
use crate::components::idea::IdeaChat;
use crate::error::ErrorClass;
use crate::models::{IdeaSession, IdeaSessionId};

fn load_sessions(client: ApiClient, sessions: RwSignal<Vec<IdeaSession>>) {
	spawn_local(async move {
		match client.list_idea_sessions().await {
			Ok(list) => sessions.set(list),
			Err(err) if err.class() == ErrorClass::NotFound => sessions.set(Vec::new()),
			Err(err) => error!("failed to load idea sessions: {err}"),
		}
	});
}

/// Idea sessions list with the conversation for `/ideas` and `/ideas/:id`.
#[component]
pub fn IdeaPage() -> impl IntoView {
	let client = expect_context::<ApiClient>();
	let navigate = use_navigate();
	let params = use_params_map();
	let session_id = Memo::new(move |_| params.with(|p| p.get("id")));
	let sessions: RwSignal<Vec<IdeaSession>> = RwSignal::new(Vec::new());

	load_sessions(client.clone(), sessions);

	let session = client.session().clone();
	Effect::new(move |_| {
		session.select_idea_session(session_id.get().as_deref());
	});

	let created: RwSignal<Option<IdeaSessionId>> = RwSignal::new(None);
	Effect::new(move |_| {
		if let Some(id) = created.get() {
			navigate(&format!("/ideas/{id}"), Default::default());
		}
	});

	let on_created = move |id: IdeaSessionId| {
		load_sessions(client.clone(), sessions);
		created.set(Some(id));
	};

	view! {
		<div class="dashboard">
			<aside class="sidebar">
				<header>
					<h2>"Recent Ideas"</h2>
					<a class="button" href="/ideas">
						"New Idea"
					</a>
				</header>
				<ul class="idea-list">
					<For
						each=move || sessions.get()
						key=|s| s.id.clone()
						children=move |s| {
							let id = s.id.clone();
							let class = move || {
								if session_id.with(|current| current.as_deref() == Some(id.as_str())) {
									"selected"
								} else {
									""
								}
							};
							view! {
								<li class=class>
									<a href=format!("/ideas/{}", s.id)>{s.display_title()}</a>
								</li>
							}
						}
					/>
				</ul>
				<a href="/dashboard">"Projects"</a>
			</aside>
			<main class="dashboard-content">
				<IdeaChat session_id=session_id on_created=on_created />
			</main>
		</div>
	}
}
