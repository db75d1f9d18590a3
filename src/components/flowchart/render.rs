use std::f64::consts::PI;

use wasm_bindgen::JsValue;
use web_sys::CanvasRenderingContext2d;

use super::state::{CanvasState, HANDLE_RADIUS, NODE_HEIGHT, NODE_WIDTH};
use crate::graph::{EdgeKind, FlowNode, Point};

const CORNER_RADIUS: f64 = 10.0;
const LINE_CHARS: usize = 28;
const MAX_LINES: usize = 3;

fn node_colors(node: &FlowNode) -> (&'static str, &'static str) {
	match (node.completed, node.is_main()) {
		(true, _) => ("#14532d", "#4ade80"),
		(false, true) => ("#1e1b4b", "#818cf8"),
		(false, false) => ("#0c2d48", "#38bdf8"),
	}
}

fn edge_style(kind: EdgeKind) -> (&'static str, f64, Option<(f64, f64)>) {
	match kind {
		EdgeKind::MainToMain => ("rgba(129, 140, 248, 0.9)", 2.5, None),
		EdgeKind::MainToOwnSubstep => ("rgba(56, 189, 248, 0.8)", 1.5, Some((6.0, 4.0))),
		EdgeKind::SubstepToSubstep => ("rgba(56, 189, 248, 0.6)", 1.5, None),
		EdgeKind::Other => ("rgba(148, 163, 184, 0.6)", 1.0, Some((2.0, 4.0))),
	}
}

fn center(node: &FlowNode) -> Point {
	node.position.offset(NODE_WIDTH / 2.0, NODE_HEIGHT / 2.0)
}

/// Point where the ray from `from`'s centre towards `toward` leaves the node box.
pub fn border_point(from: Point, toward: Point) -> Point {
	let (dx, dy) = (toward.x - from.x, toward.y - from.y);
	if dx == 0.0 && dy == 0.0 {
		return from;
	}
	let tx = if dx == 0.0 { f64::INFINITY } else { (NODE_WIDTH / 2.0) / dx.abs() };
	let ty = if dy == 0.0 { f64::INFINITY } else { (NODE_HEIGHT / 2.0) / dy.abs() };
	let t = tx.min(ty);
	from.offset(dx * t, dy * t)
}

/// Greedy word wrap; the last line is cut with an ellipsis when content overflows.
pub fn wrap_label(text: &str) -> Vec<String> {
	let mut lines: Vec<String> = Vec::new();
	let mut current = String::new();
	for word in text.split_whitespace() {
		if !current.is_empty() && current.chars().count() + 1 + word.chars().count() > LINE_CHARS {
			lines.push(std::mem::take(&mut current));
		}
		if !current.is_empty() {
			current.push(' ');
		}
		current.push_str(word);
	}
	if !current.is_empty() {
		lines.push(current);
	}
	if lines.len() > MAX_LINES {
		lines.truncate(MAX_LINES);
		let last = &mut lines[MAX_LINES - 1];
		let kept: String = last.chars().take(LINE_CHARS - 1).collect();
		*last = format!("{kept}…");
	}
	lines
}

pub fn render(state: &CanvasState, ctx: &CanvasRenderingContext2d) {
	ctx.set_fill_style_str("#0f172a");
	ctx.fill_rect(0.0, 0.0, state.width, state.height);
	ctx.save();
	let _ = ctx.translate(state.transform.x, state.transform.y);
	let _ = ctx.scale(state.transform.k, state.transform.k);
	draw_edges(state, ctx);
	draw_nodes(state, ctx);
	draw_pending_connection(state, ctx);
	ctx.restore();
}

fn set_dash(ctx: &CanvasRenderingContext2d, dash: Option<(f64, f64)>, k: f64) {
	let pattern = match dash {
		Some((on, off)) => js_sys::Array::of2(&JsValue::from_f64(on / k), &JsValue::from_f64(off / k)),
		None => js_sys::Array::new(),
	};
	let _ = ctx.set_line_dash(&pattern);
}

fn draw_arrow(ctx: &CanvasRenderingContext2d, from: Point, tip: Point, size: f64) {
	let (dx, dy) = (tip.x - from.x, tip.y - from.y);
	let dist = (dx * dx + dy * dy).sqrt();
	if dist < 0.001 {
		return;
	}
	let (ux, uy) = (dx / dist, dy / dist);
	let back = tip.offset(-ux * size, -uy * size);
	let (px, py) = (-uy * size * 0.5, ux * size * 0.5);
	ctx.begin_path();
	ctx.move_to(tip.x, tip.y);
	ctx.line_to(back.x + px, back.y + py);
	ctx.line_to(back.x - px, back.y - py);
	ctx.close_path();
	ctx.fill();
}

fn draw_edges(state: &CanvasState, ctx: &CanvasRenderingContext2d) {
	let k = state.transform.k;
	let arrow_size = 10.0 / k.max(0.5);

	for edge in &state.graph.edges {
		let (Some(from), Some(to)) = (state.graph.node(edge.from), state.graph.node(edge.to)) else {
			continue;
		};
		let (c1, c2) = (center(from), center(to));
		let (start, end) = (border_point(c1, c2), border_point(c2, c1));
		let (color, width, dash) = edge_style(state.graph.edge_kind(edge));

		ctx.set_stroke_style_str(color);
		ctx.set_line_width(width / k.max(0.5));
		set_dash(ctx, dash, k);
		ctx.begin_path();
		ctx.move_to(start.x, start.y);
		ctx.line_to(end.x, end.y);
		ctx.stroke();

		set_dash(ctx, None, k);
		ctx.set_fill_style_str(color);
		draw_arrow(ctx, start, end, arrow_size);
	}
}

fn rounded_rect(ctx: &CanvasRenderingContext2d, x: f64, y: f64, w: f64, h: f64, r: f64) {
	ctx.begin_path();
	ctx.move_to(x + r, y);
	let _ = ctx.arc_to(x + w, y, x + w, y + h, r);
	let _ = ctx.arc_to(x + w, y + h, x, y + h, r);
	let _ = ctx.arc_to(x, y + h, x, y, r);
	let _ = ctx.arc_to(x, y, x + w, y, r);
	ctx.close_path();
}

fn draw_nodes(state: &CanvasState, ctx: &CanvasRenderingContext2d) {
	let k = state.transform.k;

	for node in &state.graph.nodes {
		let Point { x, y } = node.position;
		let (fill, accent) = node_colors(node);
		let hovered = state.hover == Some(node.id) || state.drag.node == Some(node.id);

		rounded_rect(ctx, x, y, NODE_WIDTH, NODE_HEIGHT, CORNER_RADIUS);
		ctx.set_fill_style_str(fill);
		ctx.fill();
		ctx.set_stroke_style_str(if hovered { "white" } else { accent });
		let width = if hovered { 2.5 } else { 1.5 };
		ctx.set_line_width(width / k.max(0.5));
		ctx.stroke();

		ctx.set_fill_style_str("rgba(255, 255, 255, 0.9)");
		ctx.set_font("14px sans-serif");
		let lines = wrap_label(&node.content);
		let top = y + NODE_HEIGHT / 2.0 - (lines.len() as f64 - 1.0) * 9.0 + 5.0;
		for (i, line) in lines.iter().enumerate() {
			let _ = ctx.fill_text(line, x + 12.0, top + i as f64 * 18.0);
		}

		if node.completed {
			ctx.set_fill_style_str(accent);
			ctx.set_font("bold 14px sans-serif");
			let _ = ctx.fill_text("✓", x + NODE_WIDTH - 22.0, y + 20.0);
		}

		if let Some(deadline) = &node.deadline {
			ctx.set_fill_style_str("rgba(255, 255, 255, 0.5)");
			ctx.set_font("11px sans-serif");
			let _ = ctx.fill_text(deadline, x + 12.0, y + 16.0);
		}

		if let Some(handle) = state.handle_position(node.id) {
			ctx.begin_path();
			let _ = ctx.arc(handle.x, handle.y, HANDLE_RADIUS, 0.0, 2.0 * PI);
			ctx.set_fill_style_str(accent);
			ctx.fill();
		}
	}
}

fn draw_pending_connection(state: &CanvasState, ctx: &CanvasRenderingContext2d) {
	let Some(start) = state.connect.from.and_then(|id| state.handle_position(id)) else {
		return;
	};
	let k = state.transform.k;
	let end = state.connect.cursor;

	ctx.set_stroke_style_str("rgba(255, 255, 255, 0.7)");
	ctx.set_line_width(1.5 / k.max(0.5));
	set_dash(ctx, Some((6.0, 4.0)), k);
	ctx.begin_path();
	ctx.move_to(start.x, start.y);
	ctx.line_to(end.x, end.y);
	ctx.stroke();
	set_dash(ctx, None, k);
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn border_point_clips_to_box_edge() {
		let c = Point::new(0.0, 0.0);
		assert_eq!(border_point(c, Point::new(240.0, 0.0)), Point::new(NODE_WIDTH / 2.0, 0.0));
		assert_eq!(border_point(c, Point::new(0.0, -100.0)), Point::new(0.0, -NODE_HEIGHT / 2.0));
		assert_eq!(border_point(c, c), c);
	}

	#[test]
	fn labels_wrap_and_truncate() {
		assert_eq!(wrap_label("Write intro"), ["Write intro"]);

		let long = "word ".repeat(40);
		let lines = wrap_label(&long);
		assert_eq!(lines.len(), MAX_LINES);
		assert!(lines.iter().all(|l| l.chars().count() <= LINE_CHARS));
		assert!(lines[MAX_LINES - 1].ends_with('…'));
	}
}
