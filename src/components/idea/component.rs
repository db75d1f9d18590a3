use chrono::Utc;
use leptos::ev::SubmitEvent;
use leptos::prelude::*;
use leptos::task::spawn_local;
use log::{error, info};

use super::state::IdeaChatState;
use crate::api::ApiClient;
use crate::models::{IdeaMessage, IdeaRole, IdeaSessionId};

fn message_view(message: IdeaMessage) -> impl IntoView {
	let class = match message.role {
		IdeaRole::User => "idea-message user",
		IdeaRole::Assistant => "idea-message assistant",
	};
	view! { <div class=class>{message.content}</div> }
}

/// Conversation about a project idea beside the spec it produces.
///
/// With no `session_id` the first message starts a new session and
/// `on_created` receives its id.
#[component]
pub fn IdeaChat(
	#[prop(into)] session_id: Signal<Option<IdeaSessionId>>,
	#[prop(into)] on_created: Callback<IdeaSessionId>,
) -> impl IntoView {
	let client = expect_context::<ApiClient>();
	let chat = RwSignal::new(IdeaChatState::default());
	let draft = RwSignal::new(String::new());

	let load_client = client.clone();
	Effect::new(move |_| {
		let Some(id) = session_id.get() else {
			chat.set(IdeaChatState::default());
			return;
		};
		// a session created here is already loaded
		if chat.with_untracked(|c| c.session_id() == Some(id.as_str())) {
			return;
		}
		let client = load_client.clone();
		spawn_local(async move {
			let loaded = match client.fetch_idea_session(&id).await {
				Ok(session) => client.idea_transcript(&id).await.map(|t| (session, t)),
				Err(err) => Err(err),
			};
			match loaded {
				Ok((session, transcript)) => chat.update(|c| c.open(session, transcript)),
				Err(err) => {
					error!("failed to load idea session {id}: {err}");
					chat.update(|c| c.error = Some(err.user_message()));
				}
			}
		});
	});

	let on_submit = move |ev: SubmitEvent| {
		ev.prevent_default();
		let text = draft.get_untracked();
		let Some(pending) = chat
			.try_update(|c| c.begin_send(&text, Utc::now().naive_utc()))
			.flatten()
		else {
			return;
		};
		draft.set(String::new());
		let client = client.clone();
		spawn_local(async move {
			let outcome = pending.submit(&client).await;
			let created = chat
				.try_update(|c| c.finish_send(pending, outcome, Utc::now().naive_utc()))
				.flatten();
			if let Some(id) = created {
				info!("started idea session {id}");
				on_created.run(id);
			}
		});
	};

	let sending = move || chat.with(|c| c.sending);
	let is_new = move || chat.with(|c| c.session.is_none() && c.messages.is_empty());

	view! {
		<div class="idea-chat">
			<section class="idea-conversation">
				<header>
					<h2>
						{move || {
							chat.with(|c| {
								c.session
									.as_ref()
									.map(|s| s.display_title())
									.unwrap_or_else(|| "Describe Your Project Idea".into())
							})
						}}
					</h2>
				</header>
				<div class="idea-messages">
					{move || chat.with(|c| c.messages.clone()).into_iter().map(message_view).collect_view()}
					<Show when=sending>
						<div class="idea-message assistant typing">"Processing..."</div>
					</Show>
				</div>
				<form class="idea-input" on:submit=on_submit>
					<textarea
						rows="3"
						placeholder=move || {
							if is_new() {
								"e.g., I want to build a task management app with real-time collaboration..."
							} else {
								"Type your message..."
							}
						}
						prop:value=move || draft.get()
						on:input=move |ev| draft.set(event_target_value(&ev))
					/>
					<button type="submit" disabled=move || sending() || draft.with(|d| d.trim().is_empty())>
						{move || if is_new() { "Get Started" } else { "Send" }}
					</button>
				</form>
				{move || chat.with(|c| c.error.clone()).map(|e| view! { <p class="banner error">{e}</p> })}
			</section>
			<aside class="spec-pane">
				<ul class="spec-sections">
					{move || {
						chat.with(|c| {
							let updated = c.updated_sections.clone();
							c.required_sections()
								.into_iter()
								.map(|(name, done)| {
									let class = match (done, updated.iter().any(|u| u == name)) {
										(_, true) => "updated",
										(true, false) => "complete",
										(false, false) => "missing",
									};
									view! { <li class=class>{name}</li> }
								})
								.collect_view()
						})
					}}
				</ul>
				<pre class="spec-markdown">{move || chat.with(|c| c.spec_markdown.clone())}</pre>
			</aside>
		</div>
	}
}
