use leptos::ev::SubmitEvent;
use leptos::prelude::*;

use super::editor::{AdditionContext, InsertionMode, NodeEdit};
use crate::graph::FlowNode;
use crate::models::{InsertionType, StepId};

fn insertion_label(kind: InsertionType) -> &'static str {
	match kind {
		InsertionType::After => "Add step after",
		InsertionType::NewStep => "Add new main step",
		InsertionType::Substep => "Add substep",
		InsertionType::Unattached => "Add step",
	}
}

#[component]
pub fn NodeEditorModal(
	node: FlowNode,
	#[prop(into)] busy: Signal<bool>,
	#[prop(into)] on_edit: Callback<NodeEdit>,
	#[prop(into)] on_insert: Callback<InsertionMode>,
	#[prop(into)] on_open_chat: Callback<StepId>,
	#[prop(into)] on_close: Callback<()>,
) -> impl IntoView {
	let content = RwSignal::new(node.content.clone());
	let id = node.id;
	let completed = node.completed;

	let on_submit = move |ev: SubmitEvent| {
		ev.prevent_default();
		on_edit.run(NodeEdit::Content(content.get_untracked()));
	};

	view! {
		<div class="modal-backdrop" on:click=move |_| on_close.run(())>
			<div class="modal" on:click=|ev| ev.stop_propagation()>
				<h2>"Edit step"</h2>
				<form on:submit=on_submit>
					<textarea
						rows="4"
						prop:value=move || content.get()
						on:input=move |ev| content.set(event_target_value(&ev))
					/>
					<div class="modal-actions">
						<button type="submit" disabled=move || busy.get()>
							"Save"
						</button>
						<button
							type="button"
							disabled=move || busy.get()
							on:click=move |_| on_edit.run(NodeEdit::ToggleCompletion)
						>
							{if completed { "Mark incomplete" } else { "Mark complete" }}
						</button>
						<button
							type="button"
							class="danger"
							disabled=move || busy.get()
							on:click=move |_| on_edit.run(NodeEdit::Delete)
						>
							"Delete"
						</button>
					</div>
				</form>
				<div class="modal-actions">
					<button type="button" on:click=move |_| on_insert.run(InsertionMode::After)>
						"Add step after"
					</button>
					<button type="button" on:click=move |_| on_insert.run(InsertionMode::NewStep)>
						"Add new main step"
					</button>
					<button type="button" on:click=move |_| on_insert.run(InsertionMode::Substep)>
						"Add substep"
					</button>
				</div>
				<div class="modal-actions">
					<button type="button" on:click=move |_| on_open_chat.run(id)>
						"Open step chat"
					</button>
					<button type="button" on:click=move |_| on_close.run(())>
						"Close"
					</button>
				</div>
			</div>
		</div>
	}
}

#[component]
pub fn AddNodeModal(
	context: AdditionContext,
	#[prop(into)] busy: Signal<bool>,
	#[prop(into)] on_submit: Callback<String>,
	#[prop(into)] on_close: Callback<()>,
) -> impl IntoView {
	let content = RwSignal::new(String::new());
	let title = insertion_label(context.insertion_type);
	let position = format!("({:.0}, {:.0})", context.position.x, context.position.y);

	let submit = move |ev: SubmitEvent| {
		ev.prevent_default();
		on_submit.run(content.get_untracked());
	};

	view! {
		<div class="modal-backdrop" on:click=move |_| on_close.run(())>
			<div class="modal" on:click=|ev| ev.stop_propagation()>
				<h2>{title}</h2>
				<p class="modal-hint">"Position " {position}</p>
				<form on:submit=submit>
					<textarea
						rows="4"
						placeholder="Describe the step"
						prop:value=move || content.get()
						on:input=move |ev| content.set(event_target_value(&ev))
					/>
					<div class="modal-actions">
						<button type="submit" disabled=move || busy.get() || content.get().trim().is_empty()>
							"Create"
						</button>
						<button type="button" on:click=move |_| on_close.run(())>
							"Cancel"
						</button>
					</div>
				</form>
			</div>
		</div>
	}
}
