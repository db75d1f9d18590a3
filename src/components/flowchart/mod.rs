mod component;
pub mod editor;
mod modals;
mod render;
pub mod state;

pub use component::FlowchartCanvas;
pub use modals::{AddNodeModal, NodeEditorModal};
