use crate::graph::{FlowGraph, Point};
use crate::models::StepId;

pub const NODE_WIDTH: f64 = 240.0;
pub const NODE_HEIGHT: f64 = 100.0;
pub const HANDLE_RADIUS: f64 = 7.0;
pub const HANDLE_HIT_RADIUS: f64 = 12.0;
const DRAG_THRESHOLD: f64 = 3.0;
const FIT_PADDING: f64 = 60.0;

#[derive(Clone, Debug)]
pub struct ViewTransform {
	pub x: f64,
	pub y: f64,
	pub k: f64,
}

impl Default for ViewTransform {
	fn default() -> Self {
		Self { x: 0.0, y: 0.0, k: 1.0 }
	}
}

#[derive(Clone, Debug, Default)]
pub struct DragState {
	pub active: bool,
	pub node: Option<StepId>,
	pub start_x: f64,
	pub start_y: f64,
	pub node_start: Point,
	pub moved: bool,
}

#[derive(Clone, Debug, Default)]
pub struct PanState {
	pub active: bool,
	pub start_x: f64,
	pub start_y: f64,
	pub transform_start_x: f64,
	pub transform_start_y: f64,
}

/// In-progress edge drawn from a node's connector handle.
#[derive(Clone, Debug, Default)]
pub struct ConnectState {
	pub from: Option<StepId>,
	pub cursor: Point,
}

/// Outcome of releasing the pointer.
#[derive(Clone, Debug, PartialEq)]
pub enum Gesture {
	Moved { id: StepId, position: Point },
	Connect { from: StepId, to: StepId },
}

#[derive(Clone, Debug, PartialEq)]
pub enum DoubleClick {
	Node(StepId),
	Canvas(Point),
}

/// Canvas view of the step graph: node positions plus pan/zoom and pointer gestures.
pub struct CanvasState {
	pub graph: FlowGraph,
	pub transform: ViewTransform,
	pub drag: DragState,
	pub pan: PanState,
	pub connect: ConnectState,
	pub hover: Option<StepId>,
	pub width: f64,
	pub height: f64,
}

impl CanvasState {
	pub fn new(graph: FlowGraph, width: f64, height: f64) -> Self {
		let mut state = Self {
			graph,
			transform: ViewTransform::default(),
			drag: DragState::default(),
			pan: PanState::default(),
			connect: ConnectState::default(),
			hover: None,
			width,
			height,
		};
		state.fit_view();
		state
	}

	/// Swap in a re-fetched graph without touching the view.
	pub fn replace_graph(&mut self, graph: FlowGraph) {
		self.graph = graph;
		self.cancel_gestures();
		if self.hover.is_some_and(|id| self.graph.node(id).is_none()) {
			self.hover = None;
		}
	}

	/// Scale and centre so every node is visible; never zooms in past 1:1.
	pub fn fit_view(&mut self) {
		if self.graph.nodes.is_empty() {
			self.transform = ViewTransform::default();
			return;
		}
		let (mut min_x, mut min_y) = (f64::INFINITY, f64::INFINITY);
		let (mut max_x, mut max_y) = (f64::NEG_INFINITY, f64::NEG_INFINITY);
		for node in &self.graph.nodes {
			min_x = min_x.min(node.position.x);
			min_y = min_y.min(node.position.y);
			max_x = max_x.max(node.position.x + NODE_WIDTH);
			max_y = max_y.max(node.position.y + NODE_HEIGHT);
		}
		let (w, h) = (max_x - min_x + 2.0 * FIT_PADDING, max_y - min_y + 2.0 * FIT_PADDING);
		let k = (self.width / w).min(self.height / h).clamp(0.1, 1.0);
		self.transform = ViewTransform {
			x: (self.width - (max_x + min_x) * k) / 2.0,
			y: (self.height - (max_y + min_y) * k) / 2.0,
			k,
		};
	}

	pub fn screen_to_graph(&self, sx: f64, sy: f64) -> Point {
		Point::new(
			(sx - self.transform.x) / self.transform.k,
			(sy - self.transform.y) / self.transform.k,
		)
	}

	/// Topmost node under the pointer (later nodes are drawn on top).
	pub fn node_at_position(&self, sx: f64, sy: f64) -> Option<StepId> {
		let p = self.screen_to_graph(sx, sy);
		self.graph
			.nodes
			.iter()
			.rev()
			.find(|n| {
				p.x >= n.position.x
					&& p.x <= n.position.x + NODE_WIDTH
					&& p.y >= n.position.y
					&& p.y <= n.position.y + NODE_HEIGHT
			})
			.map(|n| n.id)
	}

	/// Connector handle sitting on the bottom edge of each node.
	pub fn handle_position(&self, id: StepId) -> Option<Point> {
		self.graph
			.node(id)
			.map(|n| n.position.offset(NODE_WIDTH / 2.0, NODE_HEIGHT))
	}

	pub fn handle_at_position(&self, sx: f64, sy: f64) -> Option<StepId> {
		let p = self.screen_to_graph(sx, sy);
		// HANDLE_HIT_RADIUS is in screen pixels so handles stay grabbable when zoomed out
		let r = HANDLE_HIT_RADIUS / self.transform.k;
		self.graph.nodes.iter().rev().map(|n| n.id).find(|&id| {
			self.handle_position(id).is_some_and(|h| {
				let (dx, dy) = (h.x - p.x, h.y - p.y);
				(dx * dx + dy * dy).sqrt() <= r
			})
		})
	}

	pub fn pointer_down(&mut self, sx: f64, sy: f64) {
		if let Some(id) = self.handle_at_position(sx, sy) {
			self.connect.from = Some(id);
			self.connect.cursor = self.screen_to_graph(sx, sy);
		} else if let Some(id) = self.node_at_position(sx, sy) {
			let node_start = self.graph.node(id).map(|n| n.position).unwrap_or_default();
			self.drag = DragState {
				active: true,
				node: Some(id),
				start_x: sx,
				start_y: sy,
				node_start,
				moved: false,
			};
		} else {
			self.pan = PanState {
				active: true,
				start_x: sx,
				start_y: sy,
				transform_start_x: self.transform.x,
				transform_start_y: self.transform.y,
			};
		}
	}

	pub fn pointer_move(&mut self, sx: f64, sy: f64) {
		if self.connect.from.is_some() {
			self.connect.cursor = self.screen_to_graph(sx, sy);
			self.hover = self.node_at_position(sx, sy);
			return;
		}
		if !self.drag.active {
			self.hover = self.node_at_position(sx, sy);
		}

		if self.drag.active {
			let Some(id) = self.drag.node else { return };
			let (dx, dy) = (sx - self.drag.start_x, sy - self.drag.start_y);
			if !self.drag.moved && dx.abs().max(dy.abs()) < DRAG_THRESHOLD {
				return;
			}
			self.drag.moved = true;
			let at = self
				.drag
				.node_start
				.offset(dx / self.transform.k, dy / self.transform.k);
			self.graph.set_position(id, at);
		} else if self.pan.active {
			self.transform.x = self.pan.transform_start_x + (sx - self.pan.start_x);
			self.transform.y = self.pan.transform_start_y + (sy - self.pan.start_y);
		}
	}

	pub fn pointer_up(&mut self, sx: f64, sy: f64) -> Option<Gesture> {
		let gesture = if let Some(from) = self.connect.from {
			self.node_at_position(sx, sy)
				.filter(|&to| to != from)
				.map(|to| Gesture::Connect { from, to })
		} else if self.drag.active && self.drag.moved {
			self.drag.node.and_then(|id| {
				self.graph.node(id).map(|n| Gesture::Moved {
					id,
					position: n.position,
				})
			})
		} else {
			None
		};
		self.cancel_gestures();
		gesture
	}

	pub fn pointer_leave(&mut self) {
		self.cancel_gestures();
		self.hover = None;
	}

	pub fn double_click(&self, sx: f64, sy: f64) -> DoubleClick {
		match self.node_at_position(sx, sy) {
			Some(id) => DoubleClick::Node(id),
			None => DoubleClick::Canvas(self.screen_to_graph(sx, sy)),
		}
	}

	pub fn zoom(&mut self, sx: f64, sy: f64, delta_y: f64) {
		let factor = if delta_y > 0.0 { 0.9 } else { 1.1 };
		let new_k = (self.transform.k * factor).clamp(0.1, 4.0);
		let ratio = new_k / self.transform.k;
		self.transform.x = sx - (sx - self.transform.x) * ratio;
		self.transform.y = sy - (sy - self.transform.y) * ratio;
		self.transform.k = new_k;
	}

	pub fn resize(&mut self, width: f64, height: f64) {
		self.width = width;
		self.height = height;
	}

	fn cancel_gestures(&mut self) {
		self.drag = DragState::default();
		self.pan.active = false;
		self.connect = ConnectState::default();
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::graph::fixtures::{graph, node};

	fn canvas() -> CanvasState {
		let g = graph(
			vec![node(1, None, 0.0, 0.0), node(2, None, 400.0, 0.0)],
			&[],
		);
		let mut state = CanvasState::new(g, 1000.0, 800.0);
		state.transform = ViewTransform::default();
		state
	}

	#[test]
	fn drag_reports_final_position_once_moved() {
		let mut s = canvas();
		s.pointer_down(10.0, 10.0);
		s.pointer_move(60.0, 40.0);

		let gesture = s.pointer_up(60.0, 40.0);

		assert_eq!(
			gesture,
			Some(Gesture::Moved {
				id: 1,
				position: Point::new(50.0, 30.0)
			})
		);
		assert!(!s.drag.active);
	}

	#[test]
	fn click_without_movement_is_not_a_drag() {
		let mut s = canvas();
		s.pointer_down(10.0, 10.0);
		s.pointer_move(11.0, 10.0);
		assert_eq!(s.pointer_up(11.0, 10.0), None);
		assert_eq!(s.graph.node(1).unwrap().position, Point::new(0.0, 0.0));
	}

	#[test]
	fn drag_distance_is_scaled_by_zoom() {
		let mut s = canvas();
		s.transform.k = 2.0;
		s.pointer_down(10.0, 10.0);
		s.pointer_move(50.0, 10.0);
		assert_eq!(s.graph.node(1).unwrap().position, Point::new(20.0, 0.0));
	}

	#[test]
	fn connector_drag_onto_other_node_requests_connection() {
		let mut s = canvas();
		let handle = s.handle_position(1).unwrap();
		s.pointer_down(handle.x, handle.y);
		s.pointer_move(450.0, 50.0);

		assert_eq!(s.pointer_up(450.0, 50.0), Some(Gesture::Connect { from: 1, to: 2 }));
	}

	#[test]
	fn connector_released_on_canvas_or_itself_does_nothing() {
		let mut s = canvas();
		let handle = s.handle_position(1).unwrap();
		s.pointer_down(handle.x, handle.y);
		assert_eq!(s.pointer_up(300.0, 600.0), None);

		s.pointer_down(handle.x, handle.y);
		assert_eq!(s.pointer_up(20.0, 20.0), None);
	}

	#[test]
	fn background_drag_pans_the_view() {
		let mut s = canvas();
		s.pointer_down(300.0, 500.0);
		s.pointer_move(320.0, 450.0);
		assert_eq!((s.transform.x, s.transform.y), (20.0, -50.0));
		assert_eq!(s.pointer_up(320.0, 450.0), None);
	}

	#[test]
	fn double_click_distinguishes_nodes_from_canvas() {
		let mut s = canvas();
		s.transform = ViewTransform {
			x: 100.0,
			y: 100.0,
			k: 0.5,
		};
		assert_eq!(s.double_click(110.0, 110.0), DoubleClick::Node(1));
		assert_eq!(
			s.double_click(100.0, 400.0),
			DoubleClick::Canvas(Point::new(0.0, 600.0))
		);
	}

	#[test]
	fn fit_view_keeps_every_node_on_screen() {
		let g = graph(
			vec![node(1, None, -500.0, 0.0), node(2, None, 3000.0, 900.0)],
			&[],
		);
		let s = CanvasState::new(g, 800.0, 600.0);
		for n in &s.graph.nodes {
			let sx = n.position.x * s.transform.k + s.transform.x;
			let ex = (n.position.x + NODE_WIDTH) * s.transform.k + s.transform.x;
			assert!(sx >= 0.0 && ex <= 800.0);
		}
	}
}
