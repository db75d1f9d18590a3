mod component;
pub mod state;

pub use component::ChatPanel;
pub use state::ChatScope;
