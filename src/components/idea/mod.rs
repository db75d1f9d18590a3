mod component;
pub mod state;

pub use component::IdeaChat;
