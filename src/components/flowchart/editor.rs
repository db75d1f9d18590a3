//! Dialog state and the API calls behind each editor action.

use log::info;

use crate::api::{ApiClient, NewStep};
use crate::error::ApiError;
use crate::graph::{FlowNode, Point};
use crate::models::{AssignmentId, InsertionType, StepId};

/// Where the "Add Step" toolbar button drops a new node.
pub const TOOLBAR_ADD_POSITION: Point = Point::new(200.0, 200.0);
const AFTER_OFFSET_Y: f64 = 50.0;
const BESIDE_OFFSET_X: f64 = 150.0;

/// Insertion requested from the edit dialog of an existing node.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InsertionMode {
	After,
	NewStep,
	Substep,
}

/// Everything the add dialog needs to create a node.
#[derive(Clone, Debug, PartialEq)]
pub struct AdditionContext {
	pub insertion_type: InsertionType,
	pub reference: Option<StepId>,
	pub position: Point,
}

impl AdditionContext {
	pub fn unattached(position: Point) -> Self {
		Self {
			insertion_type: InsertionType::Unattached,
			reference: None,
			position,
		}
	}

	pub fn relative_to(node: &FlowNode, mode: InsertionMode) -> Self {
		let (insertion_type, position) = match mode {
			InsertionMode::After => (InsertionType::After, node.position.offset(0.0, AFTER_OFFSET_Y)),
			InsertionMode::NewStep => (
				InsertionType::NewStep,
				node.position.offset(BESIDE_OFFSET_X, 0.0),
			),
			InsertionMode::Substep => (
				InsertionType::Substep,
				node.position.offset(BESIDE_OFFSET_X, 0.0),
			),
		};
		Self {
			insertion_type,
			reference: Some(node.id),
			position,
		}
	}

	pub fn to_new_step(&self, assignment_id: AssignmentId, content: &str) -> Result<NewStep, ApiError> {
		let content = content.trim();
		if content.is_empty() {
			return Err(ApiError::Validation("Step content cannot be empty".into()));
		}
		Ok(NewStep {
			assignment_id,
			content: content.to_string(),
			reference_node_id: self.reference,
			position_x: self.position.x,
			position_y: self.position.y,
			insertion_type: self.insertion_type,
		})
	}
}

#[derive(Clone, Debug, Default, PartialEq)]
pub enum Dialog {
	#[default]
	Closed,
	Edit(StepId),
	Add(AdditionContext),
}

/// Mutation requested from the edit dialog.
#[derive(Clone, Debug, PartialEq)]
pub enum NodeEdit {
	Content(String),
	ToggleCompletion,
	Delete,
}

pub async fn apply_edit(client: &ApiClient, node: &FlowNode, edit: NodeEdit) -> Result<(), ApiError> {
	match edit {
		NodeEdit::Content(content) => {
			let content = content.trim();
			if content.is_empty() {
				return Err(ApiError::Validation("Step content cannot be empty".into()));
			}
			client.update_step_content(node.id, content).await
		}
		NodeEdit::ToggleCompletion => client.update_step_completion(node.id, !node.completed).await,
		NodeEdit::Delete => {
			info!("deleting step {}", node.id);
			client.delete_step(node.id).await
		}
	}
}
