use leptos::ev::{MouseEvent, SubmitEvent};
use leptos::prelude::*;
use leptos::task::spawn_local;
use leptos_router::hooks::use_navigate;
use log::{error, info, warn};
use wasm_bindgen_futures::JsFuture;
use web_sys::{File, HtmlInputElement};

use crate::CurrentUser;
use crate::api::{ApiClient, Upload};
use crate::config::AppConfig;
use crate::error::{ApiError, ErrorClass};
use crate::forms::{validate_assignment, validate_upload};
use crate::models::AssignmentSummary;

async fn read_upload(file: File) -> Result<Upload, ApiError> {
	let buffer = JsFuture::from(file.array_buffer())
		.await
		.map_err(|_| ApiError::Validation(format!("Could not read {}", file.name())))?;
	Ok(Upload {
		file_name: file.name(),
		content_type: file.type_(),
		bytes: js_sys::Uint8Array::new(&buffer).to_vec(),
	})
}

fn load_assignments(
	client: ApiClient,
	list: RwSignal<Option<Vec<AssignmentSummary>>>,
	load_error: RwSignal<Option<String>>,
) {
	spawn_local(async move {
		match client.list_assignments().await {
			Ok(items) => list.set(Some(items)),
			// the backend answers 404 for a user with no assignments
			Err(err) if err.class() == ErrorClass::NotFound => list.set(Some(Vec::new())),
			Err(err) => {
				error!("failed to load assignments: {err}");
				load_error.set(Some(err.user_message()));
				list.set(Some(Vec::new()));
			}
		}
	});
}

#[component]
pub fn DashboardPage() -> impl IntoView {
	let client = expect_context::<ApiClient>();
	let CurrentUser(user) = expect_context::<CurrentUser>();
	let assignments: RwSignal<Option<Vec<AssignmentSummary>>> = RwSignal::new(None);
	let load_error: RwSignal<Option<String>> = RwSignal::new(None);
	let selected = client.session().selected_assignment();

	load_assignments(client.clone(), assignments, load_error);
	if user.get_untracked().is_none() {
		let client = client.clone();
		spawn_local(async move {
			match client.current_user().await {
				Ok(me) => user.set(Some(me)),
				Err(err) => warn!("could not load profile: {err}"),
			}
		});
	}

	let session = client.session().clone();

	let logout_client = client.clone();
	let on_logout = move |_: MouseEvent| {
		info!("logging out");
		logout_client.session().clear();
	};

	view! {
		<div class="dashboard">
			<aside class="sidebar">
				<header>
					<h2>"Projects"</h2>
					<span class="user-name">
						{move || user.get().map(|u| u.display_name()).unwrap_or_default()}
					</span>
				</header>
				{move || load_error.get().map(|e| view! { <p class="banner error">{e}</p> })}
				{move || {
					let session = session.clone();
					match assignments.get() {
						None => view! { <p class="muted">"Loading..."</p> }.into_any(),
						Some(items) if items.is_empty() => {
							view! { <p class="muted">"No projects yet. Describe one to get started."</p> }
								.into_any()
						}
						Some(items) => {
							view! {
								<ul class="assignment-list">
									{items
										.into_iter()
										.map(|a| {
											let session = session.clone();
											let class = if Some(a.id) == selected { "selected" } else { "" };
											view! {
												<li class=class>
													<a
														href=format!("/assignments/{}", a.id)
														on:click=move |_| session.select_assignment(Some(a.id))
													>
														<span class="title">{a.title}</span>
														{a.deadline.map(|d| view! { <span class="deadline">{d}</span> })}
													</a>
												</li>
											}
										})
										.collect_view()}
								</ul>
							}
								.into_any()
						}
					}
				}}
				<a class="ideas-link" href="/ideas">
					"Ideas"
				</a>
				<button class="logout-button" on:click=on_logout>
					"Logout"
				</button>
			</aside>
			<main class="dashboard-content">
				<NewAssignmentForm />
			</main>
		</div>
	}
}

#[component]
fn NewAssignmentForm() -> impl IntoView {
	let client = expect_context::<ApiClient>();
	let config = expect_context::<AppConfig>();
	let navigate = use_navigate();
	let input = RwSignal::new(String::new());
	let uploads: RwSignal<Vec<Upload>> = RwSignal::new(Vec::new());
	let pdf_only = RwSignal::new(false);
	let error: RwSignal<Option<String>> = RwSignal::new(None);
	let creating = RwSignal::new(false);

	let picker_config = config.clone();
	let on_files = move |ev: leptos::ev::Event| {
		let target: HtmlInputElement = event_target(&ev);
		let Some(list) = target.files() else {
			return;
		};
		let files: Vec<File> = (0..list.length()).filter_map(|i| list.get(i)).collect();
		for file in &files {
			if let Err(err) = validate_upload(&file.name(), file.size() as u64, &picker_config) {
				error.set(Some(err.user_message()));
				target.set_value("");
				return;
			}
		}
		error.set(None);
		spawn_local(async move {
			let mut read = Vec::with_capacity(files.len());
			for file in files {
				match read_upload(file).await {
					Ok(upload) => read.push(upload),
					Err(err) => {
						error.set(Some(err.user_message()));
						return;
					}
				}
			}
			uploads.set(read);
		});
	};

	let on_submit = move |ev: SubmitEvent| {
		ev.prevent_default();
		let text = input.get_untracked();
		let files = uploads.get_untracked();
		if let Err(err) = validate_assignment(&text, &files, &config) {
			error.set(Some(err.user_message()));
			return;
		}
		creating.set(true);
		error.set(None);

		let (client, navigate) = (client.clone(), navigate.clone());
		let pdf_only = pdf_only.get_untracked();
		spawn_local(async move {
			let result = if files.is_empty() {
				client.create_assignment(text.trim()).await
			} else {
				client
					.create_assignment_with_files(text.trim(), files, pdf_only)
					.await
			};
			match result {
				Ok(created) => {
					info!("created assignment {}", created.assignment_id);
					client.session().select_assignment(Some(created.assignment_id));
					navigate(&format!("/assignments/{}", created.assignment_id), Default::default());
				}
				Err(err) => {
					error!("failed to create assignment: {err}");
					error.set(Some(err.user_message()));
				}
			}
			creating.set(false);
		});
	};

	view! {
		<form class="assignment-form" on:submit=on_submit>
			<h1>"What are you working on?"</h1>
			<textarea
				rows="6"
				placeholder="Paste the assignment brief or describe your project"
				prop:value=move || input.get()
				on:input=move |ev| input.set(event_target_value(&ev))
			/>
			<div class="upload-row">
				<input type="file" multiple=true accept=".pdf,.docx,.txt,.md" on:change=on_files />
				<label>
					<input
						type="checkbox"
						prop:checked=move || pdf_only.get()
						on:change=move |ev| pdf_only.set(event_target_checked(&ev))
					/>
					"Use only the attached files"
				</label>
			</div>
			<ul class="upload-list">
				{move || {
					uploads
						.get()
						.into_iter()
						.map(|u| view! { <li>{u.file_name}</li> })
						.collect_view()
				}}
			</ul>
			{move || error.get().map(|e| view! { <p class="banner error">{e}</p> })}
			<button type="submit" disabled=move || creating.get()>
				{move || if creating.get() { "Breaking it down..." } else { "Create project" }}
			</button>
		</form>
	}
}
