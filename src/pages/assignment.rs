use leptos::ev::MouseEvent;
use leptos::prelude::*;
use leptos::task::spawn_local;
use leptos_router::hooks::use_params_map;
use log::{error, info};

use crate::api::ApiClient;
use crate::components::chat::{ChatPanel, ChatScope};
use crate::components::flowchart::editor::{
	AdditionContext, Dialog, InsertionMode, NodeEdit, TOOLBAR_ADD_POSITION, apply_edit,
};
use crate::components::flowchart::state::DoubleClick;
use crate::components::flowchart::{AddNodeModal, FlowchartCanvas, NodeEditorModal};
use crate::graph::{FlowGraph, Point};
use crate::layout::reset_layout;
use crate::models::{Assignment, AssignmentId, StepId};
use crate::session::ACTIVE_CHAT_KEY;

/// Flowchart editor for one assignment, with the chat side panel.
#[component]
pub fn AssignmentPage() -> impl IntoView {
	let client = expect_context::<ApiClient>();
	let params = use_params_map();
	let assignment_id = Memo::new(move |_| {
		params.with(|p| p.get("id").and_then(|id| id.parse::<AssignmentId>().ok()))
	});

	let assignment: RwSignal<Option<Assignment>> = RwSignal::new(None);
	let graph = RwSignal::new(FlowGraph::default());
	let reload = RwSignal::new(0u32);
	let banner: RwSignal<Option<String>> = RwSignal::new(None);
	let busy = RwSignal::new(false);
	let is_resetting = RwSignal::new(false);
	let dialog = RwSignal::new(Dialog::Closed);
	let chat: RwSignal<Option<ChatScope>> = RwSignal::new(None);

	let refetch = move || reload.update(|n| *n += 1);

	let fetch_client = client.clone();
	Effect::new(move |_| {
		reload.track();
		let Some(id) = assignment_id.get() else {
			banner.set(Some("Unknown project.".into()));
			return;
		};
		let client = fetch_client.clone();
		spawn_local(async move {
			match client.fetch_assignment(id).await {
				Ok(fetched) => {
					graph.set(FlowGraph::from_assignment(&fetched));
					assignment.set(Some(fetched));
				}
				Err(err) => {
					error!("failed to load assignment {id}: {err}");
					banner.set(Some(err.user_message()));
				}
			}
		});
	});

	let chat_session = client.session().clone();
	Effect::new(move |_| {
		let Some(id) = assignment_id.get() else {
			return;
		};
		chat_session.select_assignment(Some(id));
		let restored = chat_session
			.get(ACTIVE_CHAT_KEY)
			.and_then(|value| ChatScope::restore(id, &value));
		chat.set(restored);
	});

	let chat_session = client.session().clone();
	let open_chat = Callback::new(move |scope: Option<ChatScope>| {
		match scope {
			Some(scope) => chat_session.set(ACTIVE_CHAT_KEY, &scope.storage_value()),
			None => chat_session.remove(ACTIVE_CHAT_KEY),
		}
		chat.set(scope);
	});

	let move_client = client.clone();
	let on_moved = Callback::new(move |(id, position): (StepId, Point)| {
		graph.update_untracked(|g| {
			g.set_position(id, position);
		});
		let client = move_client.clone();
		spawn_local(async move {
			if let Err(err) = client.update_step_position(id, position.x, position.y).await {
				error!("failed to save position of step {id}: {err}");
			}
		});
	});

	let connect_client = client.clone();
	let on_connect = Callback::new(move |(from, to): (StepId, StepId)| {
		let Some(id) = assignment_id.get_untracked() else {
			return;
		};
		let client = connect_client.clone();
		spawn_local(async move {
			match client.add_connection(id, from, to).await {
				Ok(()) => {
					graph.update(|g| {
						g.add_edge(from, to);
					});
					refetch();
				}
				Err(err) => {
					error!("failed to connect {from} -> {to}: {err}");
					banner.set(Some(err.user_message()));
				}
			}
		});
	});

	let on_double_click = Callback::new(move |target: DoubleClick| {
		dialog.set(match target {
			DoubleClick::Node(id) => Dialog::Edit(id),
			DoubleClick::Canvas(at) => Dialog::Add(AdditionContext::unattached(at)),
		});
	});

	let edit_client = client.clone();
	let on_edit = Callback::new(move |edit: NodeEdit| {
		let Dialog::Edit(id) = dialog.get_untracked() else {
			return;
		};
		let Some(node) = graph.with_untracked(|g| g.node(id).cloned()) else {
			return;
		};
		busy.set(true);
		let client = edit_client.clone();
		spawn_local(async move {
			match apply_edit(&client, &node, edit).await {
				Ok(()) => {
					dialog.set(Dialog::Closed);
					refetch();
				}
				Err(err) => {
					error!("failed to edit step {id}: {err}");
					banner.set(Some(err.user_message()));
				}
			}
			busy.set(false);
		});
	});

	let on_insert = Callback::new(move |mode: InsertionMode| {
		let Dialog::Edit(id) = dialog.get_untracked() else {
			return;
		};
		if let Some(node) = graph.with_untracked(|g| g.node(id).cloned()) {
			dialog.set(Dialog::Add(AdditionContext::relative_to(&node, mode)));
		}
	});

	let on_open_chat = Callback::new(move |step: StepId| {
		let Some(assignment) = assignment_id.get_untracked() else {
			return;
		};
		dialog.set(Dialog::Closed);
		open_chat.run(Some(ChatScope::Step { assignment, step }));
	});

	let add_client = client.clone();
	let on_add = Callback::new(move |content: String| {
		let (Dialog::Add(context), Some(id)) = (dialog.get_untracked(), assignment_id.get_untracked()) else {
			return;
		};
		let step = match context.to_new_step(id, &content) {
			Ok(step) => step,
			Err(err) => {
				banner.set(Some(err.user_message()));
				return;
			}
		};
		busy.set(true);
		let client = add_client.clone();
		spawn_local(async move {
			match client.add_step(&step).await {
				Ok(()) => {
					dialog.set(Dialog::Closed);
					refetch();
				}
				Err(err) => {
					error!("failed to add step: {err}");
					banner.set(Some(err.user_message()));
				}
			}
			busy.set(false);
		});
	});

	let on_close = Callback::new(move |()| dialog.set(Dialog::Closed));

	let reset_client = client.clone();
	let on_reset = move |_: MouseEvent| {
		if is_resetting.get_untracked() {
			return;
		}
		is_resetting.set(true);
		let client = reset_client.clone();
		spawn_local(async move {
			let snapshot = graph.get_untracked();
			match reset_layout(&client, &snapshot).await {
				Ok(plan) => info!("layout reset, {} steps moved", plan.len()),
				Err(err) => {
					error!("layout reset stopped: {err}");
					banner.set(Some(format!("Layout reset incomplete: {}", err.user_message())));
				}
			}
			is_resetting.set(false);
			refetch();
		});
	};

	view! {
		<div class="assignment-page">
			<header class="toolbar">
				<a href="/dashboard">"← Projects"</a>
				<h1>{move || assignment.with(|a| a.as_ref().map(|a| a.title.clone()).unwrap_or_default())}</h1>
				<button
					on:click=move |_| dialog.set(Dialog::Add(AdditionContext::unattached(TOOLBAR_ADD_POSITION)))
				>
					"Add Step"
				</button>
				<button disabled=move || is_resetting.get() on:click=on_reset>
					{move || if is_resetting.get() { "Resetting..." } else { "Reset Layout" }}
				</button>
				<button on:click=move |_| {
					if let Some(id) = assignment_id.get_untracked() {
						open_chat.run(Some(ChatScope::Assignment(id)));
					}
				}>"Assignment Chat"</button>
			</header>
			{move || {
				banner
					.get()
					.map(|msg| {
						view! {
							<div class="banner error">
								{msg} <button on:click=move |_| banner.set(None)>"Dismiss"</button>
							</div>
						}
					})
			}}
			<div class="flowchart-area">
				<FlowchartCanvas
					graph=graph
					on_moved=on_moved
					on_connect=on_connect
					on_double_click=on_double_click
				/>
				{move || {
					chat.get()
						.map(|scope| {
							view! {
								<ChatPanel
									scope=scope
									on_deep_dive=move |_: ()| refetch()
									on_close=move |_: ()| open_chat.run(None)
								/>
							}
						})
				}}
			</div>
			{move || match dialog.get() {
				Dialog::Closed => ().into_any(),
				Dialog::Edit(id) => {
					graph
						.with_untracked(|g| g.node(id).cloned())
						.map(|node| {
							view! {
								<NodeEditorModal
									node=node
									busy=busy
									on_edit=on_edit
									on_insert=on_insert
									on_open_chat=on_open_chat
									on_close=on_close
								/>
							}
						})
						.into_any()
				}
				Dialog::Add(context) => {
					view! { <AddNodeModal context=context busy=busy on_submit=on_add on_close=on_close /> }
						.into_any()
				}
			}}
		</div>
	}
}
