//! In-memory step graph derived from the last fetched assignment.

use crate::models::{Assignment, StepId};

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Point {
	pub x: f64,
	pub y: f64,
}

impl Point {
	pub const fn new(x: f64, y: f64) -> Self {
		Self { x, y }
	}

	pub fn offset(self, dx: f64, dy: f64) -> Self {
		Self::new(self.x + dx, self.y + dy)
	}
}

#[derive(Clone, Debug, PartialEq)]
pub struct FlowNode {
	pub id: StepId,
	pub content: String,
	pub completed: bool,
	pub parent_id: Option<StepId>,
	pub deadline: Option<String>,
	pub position: Point,
}

impl FlowNode {
	pub fn is_main(&self) -> bool {
		self.parent_id.is_none()
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FlowEdge {
	pub from: StepId,
	pub to: StepId,
}

/// Relationship between the two ends of an edge, used for styling.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EdgeKind {
	MainToMain,
	MainToOwnSubstep,
	SubstepToSubstep,
	Other,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct FlowGraph {
	pub nodes: Vec<FlowNode>,
	pub edges: Vec<FlowEdge>,
}

impl FlowGraph {
	pub fn from_assignment(assignment: &Assignment) -> Self {
		let nodes = assignment
			.steps
			.iter()
			.map(|step| FlowNode {
				id: step.id,
				content: step.content.clone(),
				completed: step.completed,
				parent_id: step.parent_id,
				deadline: step.deadline.clone(),
				position: Point::new(step.position_x, step.position_y),
			})
			.collect();
		let mut graph = Self {
			nodes,
			edges: Vec::with_capacity(assignment.connections.len()),
		};
		for conn in &assignment.connections {
			graph.add_edge(conn.from_step, conn.to_step);
		}
		graph
	}

	pub fn node(&self, id: StepId) -> Option<&FlowNode> {
		self.nodes.iter().find(|n| n.id == id)
	}

	pub fn set_position(&mut self, id: StepId, position: Point) -> bool {
		match self.nodes.iter_mut().find(|n| n.id == id) {
			Some(node) => {
				node.position = position;
				true
			}
			None => false,
		}
	}

	/// Adds an edge unless it already exists; returns whether it was added.
	pub fn add_edge(&mut self, from: StepId, to: StepId) -> bool {
		let edge = FlowEdge { from, to };
		if self.edges.contains(&edge) {
			return false;
		}
		self.edges.push(edge);
		true
	}

	pub fn edge_kind(&self, edge: &FlowEdge) -> EdgeKind {
		let (Some(from), Some(to)) = (self.node(edge.from), self.node(edge.to)) else {
			return EdgeKind::Other;
		};
		match (from.parent_id, to.parent_id) {
			(None, None) => EdgeKind::MainToMain,
			(None, Some(parent)) if parent == from.id => EdgeKind::MainToOwnSubstep,
			(Some(_), Some(_)) => EdgeKind::SubstepToSubstep,
			_ => EdgeKind::Other,
		}
	}
}


#[cfg(test)]
mod tests {
	use super::fixtures::{graph, node};
	use super::*;
	use crate::models::{Connection, Step};

	#[test]
	fn derives_nodes_and_deduplicated_edges() {
		let step = |id, parent_id| Step {
			id,
			content: format!("s{id}"),
			completed: false,
			parent_id,
			position_x: id as f64,
			position_y: 0.0,
			deadline: None,
		};
		let conn = |from_step, to_step| Connection {
			id: None,
			from_step,
			to_step,
		};
		let assignment = Assignment {
			id: 1,
			title: "t".into(),
			description: None,
			deadline: None,
			completed: false,
			steps: vec![step(1, None), step(2, Some(1))],
			connections: vec![conn(1, 2), conn(1, 2)],
		};

		let graph = FlowGraph::from_assignment(&assignment);

		assert_eq!(graph.nodes.len(), 2);
		assert_eq!(graph.edges, vec![FlowEdge { from: 1, to: 2 }]);
		assert_eq!(graph.node(2).map(|n| n.position), Some(Point::new(2.0, 0.0)));
	}

	#[test]
	fn edge_kinds_follow_hierarchy() {
		let g = graph(
			vec![
				node(1, None, 0.0, 0.0),
				node(2, None, 0.0, 0.0),
				node(3, Some(1), 0.0, 0.0),
				node(4, Some(1), 0.0, 0.0),
			],
			&[(1, 2), (1, 3), (3, 4), (2, 3), (1, 99)],
		);
		let kinds: Vec<EdgeKind> = g.edges.iter().map(|e| g.edge_kind(e)).collect();
		assert_eq!(
			kinds,
			[
				EdgeKind::MainToMain,
				EdgeKind::MainToOwnSubstep,
				EdgeKind::SubstepToSubstep,
				EdgeKind::Other,
				EdgeKind::Other,
			]
		);
	}
}
