use chrono::Utc;
use leptos::ev::{MouseEvent, SubmitEvent};
use leptos::prelude::*;
use leptos::task::spawn_local;
use log::warn;

use super::state::{Author, ChatMessage, ChatPhase, ChatScope, ChatState, DEEP_DIVE_QUESTION};
use crate::api::ApiClient;

fn message_view(message: ChatMessage) -> impl IntoView {
	let class = match message.author {
		Author::User => "chat-message user",
		Author::Bot => "chat-message bot",
	};
	view! {
		<div class=class>
			<div class="chat-content">{message.content}</div>
			<div class="chat-time">{message.timestamp.format("%H:%M").to_string()}</div>
		</div>
	}
}

/// Chat with the assistant about a whole assignment or a single step.
#[component]
pub fn ChatPanel(
	scope: ChatScope,
	/// Runs after a deep dive created new steps.
	#[prop(into)]
	on_deep_dive: Callback<()>,
	#[prop(into)] on_close: Callback<()>,
) -> impl IntoView {
	let client = expect_context::<ApiClient>();
	let chat = RwSignal::new(ChatState::new(scope));
	let draft = RwSignal::new(String::new());

	let history_client = client.clone();
	spawn_local(async move {
		match scope.history(&history_client).await {
			Ok(exchanges) => chat.update(|c| c.load_history(&exchanges)),
			Err(err) => {
				warn!("failed to load chat history: {err}");
				chat.update(|c| c.notice = Some("Could not load chat history.".into()));
			}
		}
	});

	let send_client = client.clone();
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
		let client = send_client.clone();
		spawn_local(async move {
			let result = scope.post(&client, &pending.text).await;
			chat.update(|c| c.finish_send(pending, result));
		});
	};

	let on_deep_dive_click = move |_: MouseEvent| {
		let Some(step) = scope.step_id() else {
			return;
		};
		let Some(ticket) = chat
			.try_update(|c| c.begin_deep_dive(Utc::now().naive_utc()))
			.flatten()
		else {
			return;
		};
		let client = client.clone();
		spawn_local(async move {
			let result = client.deep_dive(step, DEEP_DIVE_QUESTION).await;
			let refreshed = chat
				.try_update(|c| c.finish_deep_dive(ticket, result, Utc::now().naive_utc()))
				.unwrap_or(false);
			if refreshed {
				on_deep_dive.run(());
			}
		});
	};

	let busy = move || chat.with(|c| c.phase != ChatPhase::Idle);

	view! {
		<aside class="chat-panel">
			<header class="chat-header">
				<h3>{scope.title()}</h3>
				<button type="button" on:click=move |_| on_close.run(())>
					"×"
				</button>
			</header>
			<div class="chat-messages">
				<For
					each=move || chat.with(|c| c.messages.clone())
					key=|m| m.key.clone()
					children=message_view
				/>
				<Show when=move || chat.with(|c| c.phase == ChatPhase::Sending)>
					<div class="chat-message bot typing">"…"</div>
				</Show>
			</div>
			{move || chat.with(|c| c.notice.clone()).map(|n| view! { <p class="chat-notice">{n}</p> })}
			<form class="chat-input" on:submit=on_submit>
				<input
					type="text"
					placeholder="Ask about this step"
					prop:value=move || draft.get()
					on:input=move |ev| draft.set(event_target_value(&ev))
				/>
				<button type="submit" disabled=busy>
					"Send"
				</button>
			</form>
			<Show when=move || scope.step_id().is_some()>
				<button type="button" class="deep-dive" disabled=busy on:click=on_deep_dive_click.clone()>
					{move || {
						if chat.with(|c| c.phase == ChatPhase::DeepDiving) {
							"Breaking down…"
						} else {
							"Deep dive"
						}
					}}
				</button>
			</Show>
		</aside>
	}
}
