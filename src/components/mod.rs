pub mod chat;
pub mod flowchart;
pub mod idea;
