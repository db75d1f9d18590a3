//! Auth token and cached selection state, persisted to durable client storage.
//!
//! Components never touch `localStorage` directly; they go through a
//! [`SessionContext`] provided at the app root.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use log::{info, warn};

pub const TOKEN_KEY: &str = "access_token";
pub const SELECTED_ASSIGNMENT_KEY: &str = "selectedAssignment";
pub const ASSIGNMENT_ID_KEY: &str = "assignmentId";
pub const CHAT_STATE_KEY: &str = "chatState";
pub const ACTIVE_CHAT_KEY: &str = "activeChat";
pub const IDEA_SESSION_KEY: &str = "ideaSession";

/// Everything removed when the backend rejects the token.
const SESSION_KEYS: &[&str] = &[
	TOKEN_KEY,
	SELECTED_ASSIGNMENT_KEY,
	ASSIGNMENT_ID_KEY,
	CHAT_STATE_KEY,
	ACTIVE_CHAT_KEY,
	IDEA_SESSION_KEY,
];

/// Durable string key-value storage.
pub trait KeyValueStore: Send + Sync {
	fn get(&self, key: &str) -> Option<String>;
	fn set(&self, key: &str, value: &str);
	fn remove(&self, key: &str);
}

/// Browser `localStorage`; silently degrades to a no-op where storage is unavailable.
#[derive(Clone, Copy, Debug, Default)]
pub struct LocalStorage;

impl LocalStorage {
	fn storage() -> Option<web_sys::Storage> {
		web_sys::window().and_then(|w| w.local_storage().ok().flatten())
	}
}

impl KeyValueStore for LocalStorage {
	fn get(&self, key: &str) -> Option<String> {
		Self::storage().and_then(|s| s.get_item(key).ok().flatten())
	}

	fn set(&self, key: &str, value: &str) {
		if let Some(storage) = Self::storage() {
			if storage.set_item(key, value).is_err() {
				warn!("localStorage rejected write for {key}");
			}
		}
	}

	fn remove(&self, key: &str) {
		if let Some(storage) = Self::storage() {
			let _ = storage.remove_item(key);
		}
	}
}

/// In-process store for tests and non-browser targets.
#[derive(Debug, Default)]
pub struct MemoryStore {
	entries: RwLock<HashMap<String, String>>,
}

impl KeyValueStore for MemoryStore {
	fn get(&self, key: &str) -> Option<String> {
		self.entries.read().ok()?.get(key).cloned()
	}

	fn set(&self, key: &str, value: &str) {
		if let Ok(mut entries) = self.entries.write() {
			entries.insert(key.to_string(), value.to_string());
		}
	}

	fn remove(&self, key: &str) {
		if let Ok(mut entries) = self.entries.write() {
			entries.remove(key);
		}
	}
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionEvent {
	/// A token was stored after login or signup.
	SignedIn,
	/// The user logged out.
	SignedOut,
	/// The backend rejected the token.
	Expired,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener = Arc<dyn Fn(&SessionEvent) + Send + Sync>;

struct SessionInner {
	store: Box<dyn KeyValueStore>,
	listeners: Mutex<Vec<(SubscriptionId, Listener)>>,
	next_id: Mutex<u64>,
}

/// Shared handle over the session; cheap to clone.
#[derive(Clone)]
pub struct SessionContext {
	inner: Arc<SessionInner>,
}

impl std::fmt::Debug for SessionContext {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("SessionContext")
			.field("authenticated", &self.is_authenticated())
			.finish()
	}
}

impl SessionContext {
	pub fn new(store: impl KeyValueStore + 'static) -> Self {
		Self {
			inner: Arc::new(SessionInner {
				store: Box::new(store),
				listeners: Mutex::new(Vec::new()),
				next_id: Mutex::new(0),
			}),
		}
	}

	pub fn browser() -> Self {
		Self::new(LocalStorage)
	}

	pub fn in_memory() -> Self {
		Self::new(MemoryStore::default())
	}

	pub fn token(&self) -> Option<String> {
		self.inner.store.get(TOKEN_KEY).filter(|t| !t.is_empty())
	}

	pub fn is_authenticated(&self) -> bool {
		self.token().is_some()
	}

	pub fn set_token(&self, token: &str) {
		self.inner.store.set(TOKEN_KEY, token);
		self.notify(SessionEvent::SignedIn);
	}

	/// Explicit logout.
	pub fn clear(&self) {
		self.wipe();
		self.notify(SessionEvent::SignedOut);
	}

	/// Called when any request comes back 401/403.
	pub fn expire(&self) {
		info!("session expired, clearing stored credentials");
		self.wipe();
		self.notify(SessionEvent::Expired);
	}

	pub fn get(&self, key: &str) -> Option<String> {
		self.inner.store.get(key)
	}

	pub fn set(&self, key: &str, value: &str) {
		self.inner.store.set(key, value);
	}

	pub fn remove(&self, key: &str) {
		self.inner.store.remove(key);
	}

	pub fn selected_assignment(&self) -> Option<i64> {
		self.get(ASSIGNMENT_ID_KEY)?.parse().ok()
	}

	pub fn select_assignment(&self, id: Option<i64>) {
		match id {
			Some(id) => self.set(ASSIGNMENT_ID_KEY, &id.to_string()),
			None => self.remove(ASSIGNMENT_ID_KEY),
		}
	}

	/// Idea session the user was last working in.
	pub fn idea_session(&self) -> Option<String> {
		self.get(IDEA_SESSION_KEY).filter(|id| !id.is_empty())
	}

	pub fn select_idea_session(&self, id: Option<&str>) {
		match id {
			Some(id) => self.set(IDEA_SESSION_KEY, id),
			None => self.remove(IDEA_SESSION_KEY),
		}
	}

	pub fn subscribe(&self, listener: impl Fn(&SessionEvent) + Send + Sync + 'static) -> SubscriptionId {
		let id = {
			let mut next = self.inner.next_id.lock().unwrap_or_else(|e| e.into_inner());
			*next += 1;
			SubscriptionId(*next)
		};
		self.inner
			.listeners
			.lock()
			.unwrap_or_else(|e| e.into_inner())
			.push((id, Arc::new(listener)));
		id
	}

	pub fn unsubscribe(&self, id: SubscriptionId) {
		self.inner
			.listeners
			.lock()
			.unwrap_or_else(|e| e.into_inner())
			.retain(|(sid, _)| *sid != id);
	}

	fn wipe(&self) {
		for key in SESSION_KEYS {
			self.inner.store.remove(key);
		}
	}

	fn notify(&self, event: SessionEvent) {
		// Snapshot so listeners may subscribe or unsubscribe while being called.
		let listeners: Vec<Listener> = self
			.inner
			.listeners
			.lock()
			.unwrap_or_else(|e| e.into_inner())
			.iter()
			.map(|(_, l)| l.clone())
			.collect();
		for listener in listeners {
			listener(&event);
		}
	}
}
