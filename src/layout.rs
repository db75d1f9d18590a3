//! Hierarchical auto-layout for the step graph.
//!
//! Main steps are laid out left to right in their current x order. Each
//! step's substeps are stacked below it in their current y order, except that a
//! first substep which has substeps of its own (a deep-dive root) sits on the
//! parent's row, shifted right. Only the first substep is ever treated as a
//! deep-dive root; later substeps with children are stacked like the rest.

use std::collections::{HashMap, HashSet};

use log::{debug, info};

use crate::api::ApiClient;
use crate::error::ApiError;
use crate::graph::{FlowEdge, FlowGraph, FlowNode, Point};
use crate::models::StepId;

pub const MAIN_ORIGIN: Point = Point::new(150.0, 150.0);
pub const MAIN_GAP: f64 = 400.0;
pub const SUBSTEP_GAP: f64 = 200.0;
pub const SUBSTEP_OFFSET: f64 = 120.0;
pub const DEEP_DIVE_OFFSET: f64 = 160.0;

/// New positions in the order they were assigned.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LayoutPlan {
	positions: Vec<(StepId, Point)>,
}

impl LayoutPlan {
	pub fn get(&self, id: StepId) -> Option<Point> {
		self.positions
			.iter()
			.find_map(|&(node, at)| (node == id).then_some(at))
	}

	pub fn iter(&self) -> impl Iterator<Item = (StepId, Point)> + '_ {
		self.positions.iter().copied()
	}

	pub fn len(&self) -> usize {
		self.positions.len()
	}

	pub fn is_empty(&self) -> bool {
		self.positions.is_empty()
	}

	/// Moves every planned node; nodes outside the plan keep their position.
	pub fn apply(&self, graph: &mut FlowGraph) {
		for (id, at) in self.iter() {
			graph.set_position(id, at);
		}
	}
}

/// Substeps per parent, each list sorted by current y (stable).
struct ChildIndex<'a> {
	children: HashMap<StepId, Vec<&'a FlowNode>>,
}

impl<'a> ChildIndex<'a> {
	fn new(nodes: &'a [FlowNode]) -> Self {
		let mut children: HashMap<StepId, Vec<&'a FlowNode>> = HashMap::new();
		for node in nodes {
			if let Some(parent) = node.parent_id {
				children.entry(parent).or_default().push(node);
			}
		}
		for list in children.values_mut() {
			list.sort_by(|a, b| a.position.y.total_cmp(&b.position.y));
		}
		Self { children }
	}

	fn of(&self, id: StepId) -> &[&'a FlowNode] {
		self.children.get(&id).map(Vec::as_slice).unwrap_or(&[])
	}

	fn first_is_deep_dive(&self, id: StepId) -> bool {
		self.of(id)
			.first()
			.is_some_and(|first| !self.of(first.id).is_empty())
	}
}

fn place_children(index: &ChildIndex<'_>, parent: StepId, origin: Point, plan: &mut LayoutPlan) {
	let deep_dive = index.first_is_deep_dive(parent);
	for (i, child) in index.of(parent).iter().enumerate() {
		let at = match (deep_dive, i) {
			(true, 0) => origin.offset(DEEP_DIVE_OFFSET, 0.0),
			(true, i) => origin.offset(SUBSTEP_OFFSET, i as f64 * SUBSTEP_GAP),
			(false, i) => origin.offset(SUBSTEP_OFFSET, (i + 1) as f64 * SUBSTEP_GAP),
		};
		plan.positions.push((child.id, at));
		place_children(index, child.id, at, plan);
	}
}

/// Compute a fresh position for every step reachable from a main step.
pub fn compute_layout(graph: &FlowGraph) -> LayoutPlan {
	let index = ChildIndex::new(&graph.nodes);
	let mut mains: Vec<&FlowNode> = graph.nodes.iter().filter(|n| n.is_main()).collect();
	mains.sort_by(|a, b| a.position.x.total_cmp(&b.position.x));

	let mut plan = LayoutPlan {
		positions: Vec::with_capacity(graph.nodes.len()),
	};
	let mut x = MAIN_ORIGIN.x;
	for main in mains {
		let origin = Point::new(x, MAIN_ORIGIN.y);
		plan.positions.push((main.id, origin));
		place_children(&index, main.id, origin, &mut plan);
		x += if index.first_is_deep_dive(main.id) {
			MAIN_GAP + DEEP_DIVE_OFFSET / 2.0
		} else {
			MAIN_GAP
		};
	}
	plan
}

/// Lay out the graph and persist each new position, one request per node.
///
/// Requests go out sequentially; the first failure stops the rest and is
/// returned, leaving earlier nodes moved server-side.
pub async fn reset_layout(client: &ApiClient, graph: &FlowGraph) -> Result<LayoutPlan, ApiError> {
	let plan = compute_layout(graph);
	info!("resetting layout for {} nodes", plan.len());
	for (id, at) in plan.iter() {
		client.update_step_position(id, at.x, at.y).await?;
	}
	debug!("layout persisted");
	Ok(plan)
}

/// Order `ids` so that every edge between them points forward.
///
/// Cycles are broken where the walk first re-enters a node; ids with no edges
/// keep their relative walk position.
pub fn topological_order(ids: &[StepId], edges: &[FlowEdge]) -> Vec<StepId> {
	let members: HashSet<StepId> = ids.iter().copied().collect();
	let mut outgoing: HashMap<StepId, Vec<StepId>> = HashMap::new();
	for edge in edges {
		if members.contains(&edge.from) && members.contains(&edge.to) {
			outgoing.entry(edge.from).or_default().push(edge.to);
		}
	}

	fn visit(
		id: StepId,
		outgoing: &HashMap<StepId, Vec<StepId>>,
		visited: &mut HashSet<StepId>,
		active: &mut HashSet<StepId>,
		finished: &mut Vec<StepId>,
	) {
		if visited.contains(&id) || !active.insert(id) {
			return;
		}
		for &next in outgoing.get(&id).into_iter().flatten() {
			visit(next, outgoing, visited, active, finished);
		}
		active.remove(&id);
		visited.insert(id);
		finished.push(id);
	}

	let (mut visited, mut active) = (HashSet::new(), HashSet::new());
	let mut finished = Vec::with_capacity(ids.len());
	for &id in ids {
		visit(id, &outgoing, &mut visited, &mut active, &mut finished);
	}
	finished.reverse();
	finished
}

#[cfg(test)]
mod tests {
	use std::sync::Arc;

	use pollster::block_on;

	use super::*;
	use crate::api::MockTransport;
	use crate::graph::fixtures::{graph, node};
	use crate::session::SessionContext;

	fn at(plan: &LayoutPlan, id: StepId) -> Point {
		plan.get(id).unwrap()
	}

	#[test]
	fn main_steps_advance_left_to_right_in_current_x_order() {
		let g = graph(
			vec![
				node(1, None, 900.0, 10.0),
				node(2, None, -50.0, 300.0),
				node(3, None, 400.0, 0.0),
			],
			&[],
		);

		let plan = compute_layout(&g);

		let order: Vec<StepId> = plan.iter().map(|(id, _)| id).collect();
		assert_eq!(order, [2, 3, 1]);
		let xs: Vec<f64> = plan.iter().map(|(_, p)| p.x).collect();
		assert!(xs.windows(2).all(|w| w[0] < w[1]));
		assert!(plan.iter().all(|(_, p)| p.y == MAIN_ORIGIN.y));
	}

	#[test]
	fn equal_x_keeps_original_order() {
		let g = graph(vec![node(7, None, 0.0, 0.0), node(3, None, 0.0, 0.0)], &[]);
		let order: Vec<StepId> = compute_layout(&g).iter().map(|(id, _)| id).collect();
		assert_eq!(order, [7, 3]);
	}

	#[test]
	fn plain_substeps_stack_below_parent() {
		let g = graph(
			vec![
				node(1, None, 0.0, 0.0),
				node(12, Some(1), 0.0, 90.0),
				node(10, Some(1), 0.0, 10.0),
				node(11, Some(1), 0.0, 50.0),
			],
			&[],
		);

		let plan = compute_layout(&g);

		let main = at(&plan, 1);
		let subs = [at(&plan, 10), at(&plan, 11), at(&plan, 12)];
		for (i, p) in subs.iter().enumerate() {
			assert_eq!(p.x, main.x + SUBSTEP_OFFSET);
			assert_eq!(p.y, main.y + (i + 1) as f64 * SUBSTEP_GAP);
		}
	}

	#[test]
	fn first_substep_with_children_sits_beside_parent() {
		let g = graph(
			vec![
				node(1, None, 0.0, 0.0),
				node(10, Some(1), 0.0, 10.0),
				node(11, Some(1), 0.0, 50.0),
				node(12, Some(1), 0.0, 90.0),
				node(100, Some(10), 0.0, 0.0),
				node(2, None, 100.0, 0.0),
			],
			&[],
		);

		let plan = compute_layout(&g);

		let main = at(&plan, 1);
		assert_eq!(at(&plan, 10), main.offset(DEEP_DIVE_OFFSET, 0.0));
		assert_eq!(at(&plan, 11), main.offset(SUBSTEP_OFFSET, SUBSTEP_GAP));
		assert_eq!(at(&plan, 12), main.offset(SUBSTEP_OFFSET, 2.0 * SUBSTEP_GAP));
		assert_eq!(
			at(&plan, 100),
			at(&plan, 10).offset(SUBSTEP_OFFSET, SUBSTEP_GAP)
		);
		assert_eq!(at(&plan, 2).x, main.x + MAIN_GAP + DEEP_DIVE_OFFSET / 2.0);
	}

	#[test]
	fn layout_of_layout_is_a_fixed_point() {
		let mut g = graph(
			vec![
				node(1, None, 300.0, 0.0),
				node(2, None, 0.0, 0.0),
				node(10, Some(1), 0.0, 40.0),
				node(11, Some(1), 0.0, 20.0),
				node(20, Some(2), 0.0, 0.0),
				node(21, Some(2), 0.0, 5.0),
				node(200, Some(20), 0.0, 0.0),
				node(201, Some(20), 0.0, 1.0),
				node(2000, Some(200), 0.0, 0.0),
			],
			&[(2, 1)],
		);

		let first = compute_layout(&g);
		first.apply(&mut g);
		let second = compute_layout(&g);

		assert_eq!(first, second);
	}

	#[test]
	fn only_the_first_substep_can_be_a_deep_dive_root() {
		// A(0,0) B(500,0); A1(y=10) A2(y=60) with A2 -> A2a.
		let (a, b, a1, a2, a2a) = (1, 2, 11, 12, 121);
		let g = graph(
			vec![
				node(a, None, 0.0, 0.0),
				node(b, None, 500.0, 0.0),
				node(a1, Some(a), 0.0, 10.0),
				node(a2, Some(a), 0.0, 60.0),
				node(a2a, Some(a2), 0.0, 0.0),
			],
			&[(a, b), (a, a1), (a1, a2)],
		);

		let plan = compute_layout(&g);

		assert_eq!(at(&plan, a), MAIN_ORIGIN);
		assert_eq!(at(&plan, b), MAIN_ORIGIN.offset(MAIN_GAP, 0.0));
		assert_eq!(at(&plan, a1), MAIN_ORIGIN.offset(SUBSTEP_OFFSET, SUBSTEP_GAP));
		assert_eq!(
			at(&plan, a2),
			MAIN_ORIGIN.offset(SUBSTEP_OFFSET, 2.0 * SUBSTEP_GAP)
		);
		assert_eq!(at(&plan, a2a), at(&plan, a2).offset(SUBSTEP_OFFSET, SUBSTEP_GAP));
	}

	#[test]
	fn orphaned_substeps_are_left_alone() {
		let mut g = graph(vec![node(1, None, 0.0, 0.0), node(5, Some(42), 7.0, 8.0)], &[]);
		let plan = compute_layout(&g);
		assert_eq!(plan.len(), 1);
		plan.apply(&mut g);
		assert_eq!(g.node(5).unwrap().position, Point::new(7.0, 8.0));
	}

	#[test]
	fn reset_persists_each_node_and_stops_at_first_failure() {
		let g = graph(
			vec![
				node(1, None, 0.0, 0.0),
				node(2, None, 10.0, 0.0),
				node(3, None, 20.0, 0.0),
			],
			&[],
		);
		let mock = Arc::new(
			MockTransport::default()
				.reply(200, "{}")
				.reply(500, r#"{"detail":"db down"}"#)
				.reply(200, "{}"),
		);
		let session = SessionContext::in_memory();
		session.set_token("t");
		let client = ApiClient::new("http://api", mock.clone(), session);

		let err = block_on(reset_layout(&client, &g)).unwrap_err();

		assert_eq!(err.class(), crate::error::ErrorClass::Server);
		let urls: Vec<String> = mock.sent().into_iter().map(|r| r.url).collect();
		assert_eq!(urls, ["http://api/steps/1/position", "http://api/steps/2/position"]);
	}

	#[test]
	fn topological_order_respects_edges() {
		let ids = [1, 2, 3, 4, 5];
		let edges: Vec<FlowEdge> = [(3, 1), (1, 2), (4, 2), (2, 9)]
			.iter()
			.map(|&(from, to)| FlowEdge { from, to })
			.collect();

		let order = topological_order(&ids, &edges);

		assert_eq!(order.len(), ids.len());
		let pos = |id| order.iter().position(|&x| x == id).unwrap();
		assert!(pos(3) < pos(1));
		assert!(pos(1) < pos(2));
		assert!(pos(4) < pos(2));
	}

	#[test]
	fn topological_order_tolerates_cycles() {
		let edges: Vec<FlowEdge> = [(1, 2), (2, 3), (3, 1)]
			.iter()
			.map(|&(from, to)| FlowEdge { from, to })
			.collect();
		let mut order = topological_order(&[1, 2, 3], &edges);
		assert_eq!(order[0], 1);
		order.sort();
		assert_eq!(order, [1, 2, 3]);
	}
}
