// builtins.rs — Built-in delegates (headless reference platform)
//
// `window` is a scope delegate standing in for a host window. Setting one up
// registers the `mouse-motion` node delegate inside it and creates its
// `display` node, whose mandatory `source` input is rendered into the
// window's frame each update. The host feeds pointer positions through
// `set_pointer` and reads presented frames through `frame`.
//
// Preconditions: none.
// Postconditions: a set-up window holds `WindowState`, a `display` node and
//                 a `mouse-motion` delegate member.
// Failure modes: non-positive or oversized window dimensions fail setup.
// Side effects: none beyond world mutation.

use std::rc::Rc;

use tracing::debug;

use crate::delegate::{InputSpec, NodeDelegate, ScopeDelegate};
use crate::node::{Node, NodeCtx};
use crate::registry::{Registry, RegistryError};
use crate::value::{Matrix, Output, OutputDesc, OutputKind, ParamValue, Surface};
use crate::world::{Member, ScopeId, World};

/// Largest accepted window edge, in pixels.
pub const MAX_WINDOW_EDGE: i64 = 8192;

/// Register every built-in delegate.
pub fn install(registry: &mut Registry) -> Result<(), RegistryError> {
    registry.add_scope(window_delegate())
}

// ── Window ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct WindowState {
    pub width: usize,
    pub height: usize,
    pub title: String,
    /// Last pointer position in window pixels, if the pointer is inside.
    pub pointer: Option<(f32, f32)>,
}

pub fn window_delegate() -> ScopeDelegate {
    ScopeDelegate::new("window")
        .with_param("width", ParamValue::Int(640))
        .with_param("height", ParamValue::Int(480))
        .with_param("title", ParamValue::Str("lumen".to_string()))
        .on_setup(window_setup)
        .on_destroy(window_destroy)
}

fn edge(scope: &crate::world::Scope, name: &str) -> Result<usize, String> {
    let value = scope.param(name).and_then(ParamValue::as_int).unwrap_or(0);
    if !(1..=MAX_WINDOW_EDGE).contains(&value) {
        return Err(format!("{name} must be between 1 and {MAX_WINDOW_EDGE}, got {value}"));
    }
    Ok(value as usize)
}

fn window_setup(world: &mut World, id: ScopeId) -> Result<(), String> {
    let scope = world.scope(id).ok_or("window scope vanished")?;
    let width = edge(scope, "width")?;
    let height = edge(scope, "height")?;
    let title = scope
        .param("title")
        .and_then(ParamValue::as_str)
        .unwrap_or_default()
        .to_string();

    if let Some(scope) = world.scope_mut(id) {
        scope.set_state(WindowState {
            width,
            height,
            title,
            pointer: None,
        });
    }

    let motion = world.intern("mouse-motion");
    world
        .insert_member(id, motion, Member::NodeDelegate(shared_mouse_motion()))
        .map_err(|e| e.to_string())?;

    let display = world.intern("display");
    world
        .instantiate_node(id, display, display_delegate().into_shared(), id, Box::default())
        .map_err(|e| e.to_string())?;

    debug!(window = %world.scope_path(id), width, height, "window opened");
    Ok(())
}

fn window_destroy(world: &mut World, id: ScopeId) {
    debug!(window = %world.scope_path(id), "window closed");
    if let Some(scope) = world.scope_mut(id) {
        scope.clear_state();
    }
}

/// Move the pointer of `window`. Returns `false` if `window` is not a window.
pub fn set_pointer(world: &mut World, window: ScopeId, x: f32, y: f32) -> bool {
    let Some(state) = world
        .scope_mut(window)
        .and_then(|s| s.state_mut::<WindowState>())
    else {
        return false;
    };
    let inside = x >= 0.0 && y >= 0.0 && x < state.width as f32 && y < state.height as f32;
    state.pointer = inside.then_some((x, y));
    true
}

/// The frame most recently presented by the window's `display` node.
pub fn frame(world: &World, window: ScopeId) -> Option<&Surface> {
    display_state(world, window).map(|d| &d.frame)
}

/// Number of frames the window's `display` node has presented.
pub fn presented_frames(world: &World, window: ScopeId) -> u64 {
    display_state(world, window).map_or(0, |d| d.presented)
}

fn display_state(world: &World, window: ScopeId) -> Option<&DisplayState> {
    match world.scope(window)?.member("display")? {
        Member::Node(id) => world.node(*id)?.state::<DisplayState>(),
        _ => None,
    }
}

fn window_size(ctx: &NodeCtx<'_>, node: &Node) -> Result<(usize, usize), String> {
    ctx.scope_state::<WindowState>(node.owner)
        .map(|w| (w.width, w.height))
        .ok_or_else(|| format!("'{}' must be created inside a window", node.delegate.name))
}

// ── Display ─────────────────────────────────────────────────────────────────

struct DisplayState {
    frame: Surface,
    presented: u64,
}

fn display_delegate() -> NodeDelegate {
    NodeDelegate::new("display")
        .with_input(InputSpec::mandatory("source"))
        .on_setup(display_setup)
        .on_update(display_update)
}

fn display_setup(node: &mut Node, ctx: &NodeCtx<'_>) -> Result<(), String> {
    let (width, height) = window_size(ctx, node)?;
    node.set_state(DisplayState {
        frame: Surface::new(width, height),
        presented: 0,
    });
    Ok(())
}

fn display_update(node: &mut Node, ctx: &NodeCtx<'_>) {
    let source = ctx.input(node, 0);
    let Some(state) = node.state_mut::<DisplayState>() else {
        return;
    };
    match source {
        Some(Output::Matrix(m)) => blit(&mut state.frame, m.width, m.height, |x, y| gray(m.get(x, y))),
        Some(Output::Surface(s)) => blit(&mut state.frame, s.width, s.height, |x, y| s.get(x, y)),
        None => {}
    }
    state.presented += 1;
}

/// Nearest-neighbour resample of a `src_w` x `src_h` image into `dst`.
fn blit(dst: &mut Surface, src_w: usize, src_h: usize, sample: impl Fn(usize, usize) -> u32) {
    if src_w == 0 || src_h == 0 {
        return;
    }
    for y in 0..dst.height {
        let sy = y * src_h / dst.height;
        for x in 0..dst.width {
            let sx = x * src_w / dst.width;
            dst.pixels[y * dst.width + x] = sample(sx, sy);
        }
    }
}

/// Opaque gray pixel for a value in `[0, 1]`.
fn gray(v: f32) -> u32 {
    let g = (v.clamp(0.0, 1.0) * 255.0).round() as u32;
    (g << 24) | (g << 16) | (g << 8) | 0xff
}

// ── Mouse motion ────────────────────────────────────────────────────────────

/// Fading trail of pointer positions, sized like the window.
pub fn mouse_motion_delegate() -> NodeDelegate {
    NodeDelegate::new("mouse-motion")
        .with_param("decay", ParamValue::Real(0.9))
        .with_param("radius", ParamValue::Int(1))
        .with_output(OutputKind::Matrix, motion_output)
        .on_setup(motion_setup)
        .on_update(motion_update)
}

fn motion_setup(node: &mut Node, ctx: &NodeCtx<'_>) -> Result<(), String> {
    let (width, height) = window_size(ctx, node)?;
    let decay = node.param("decay").and_then(ParamValue::as_real).unwrap_or(0.9);
    if !(0.0..=1.0).contains(&decay) {
        return Err(format!("decay must be within [0, 1], got {decay}"));
    }
    let radius = node.param("radius").and_then(ParamValue::as_int).unwrap_or(1);
    let reach = width.max(height) as i64;
    if !(0..=reach).contains(&radius) {
        return Err(format!("radius must be between 0 and {reach}, got {radius}"));
    }
    node.set_state(Matrix::zeros(width, height));
    node.declare_output(OutputDesc::matrix(width, height));
    Ok(())
}

fn motion_update(node: &mut Node, ctx: &NodeCtx<'_>) {
    let pointer = ctx
        .scope_state::<WindowState>(node.owner)
        .and_then(|w| w.pointer);
    let decay = node.param("decay").and_then(ParamValue::as_real).unwrap_or(0.9) as f32;
    let radius = node.param("radius").and_then(ParamValue::as_int).unwrap_or(1);
    let Some(trail) = node.state_mut::<Matrix>() else {
        return;
    };
    // Params may be edited after setup.
    let radius = radius.clamp(0, trail.width.max(trail.height) as i64);
    trail.data.iter_mut().for_each(|v| *v *= decay);
    if let Some((px, py)) = pointer {
        stamp(trail, px as i64, py as i64, radius);
    }
}

fn stamp(m: &mut Matrix, cx: i64, cy: i64, radius: i64) {
    for y in (cy - radius).max(0)..=(cy + radius).min(m.height as i64 - 1) {
        for x in (cx - radius).max(0)..=(cx + radius).min(m.width as i64 - 1) {
            if (x - cx).pow(2) + (y - cy).pow(2) <= radius * radius {
                m.set(x as usize, y as usize, 1.0);
            }
        }
    }
}

fn motion_output(node: &Node) -> Option<Output<'_>> {
    node.state::<Matrix>().map(Output::Matrix)
}

/// Shared handle registered into each window.
pub fn shared_mouse_motion() -> Rc<NodeDelegate> {
    mouse_motion_delegate().into_shared()
}

// ── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Graph;
    use crate::parser::parse;
    use crate::resolve::apply;

    fn load(source: &str) -> World {
        let mut world = World::new();
        let root = world.root();
        Registry::with_builtins()
            .unwrap()
            .populate(&mut world, root)
            .unwrap();
        let unit = parse(source).unit.expect("parse");
        let result = apply(&mut world, root, &unit);
        assert!(result.is_ok(), "{:#?}", result.diagnostics);
        world
    }

    fn window_id(world: &World, name: &str) -> ScopeId {
        world.resolve_scope(world.root(), &[name]).expect("window")
    }

    #[test]
    fn window_registers_display_and_motion() {
        let world = load("a = window(width=8, height=4, title=\"t\")");
        let a = window_id(&world, "a");
        let scope = world.scope(a).unwrap();
        assert!(matches!(scope.member("display"), Some(Member::Node(_))));
        assert!(matches!(scope.member("mouse-motion"), Some(Member::NodeDelegate(_))));
        let state = scope.state::<WindowState>().unwrap();
        assert_eq!((state.width, state.height), (8, 4));
        assert_eq!(state.title, "t");
    }

    #[test]
    fn bad_dimensions_fail_setup() {
        let mut world = World::new();
        let root = world.root();
        Registry::with_builtins()
            .unwrap()
            .populate(&mut world, root)
            .unwrap();
        let unit = parse("a = window(width=0)").unit.unwrap();
        let result = apply(&mut world, root, &unit);
        assert_eq!(result.diagnostics[0].code, Some(crate::diag::codes::E0209));
        assert!(result.diagnostics[0].message.contains("width must be between"));
        assert_eq!(world.node_count(), 0);
    }

    #[test]
    fn pointer_trail_reaches_the_frame() {
        let mut world = load(
            "a = window(width=8, height=8)\n\
             b = a.mouse-motion(decay=0.5, radius=0)\n\
             a.display.source = b",
        );
        let a = window_id(&world, "a");
        let graph = Graph::build(&mut world).unwrap();

        assert!(set_pointer(&mut world, a, 2.0, 3.0));
        graph.update(&mut world);
        assert_eq!(frame(&world, a).unwrap().get(2, 3), 0xffff_ffff);
        assert_eq!(frame(&world, a).unwrap().get(0, 0), 0x0000_00ff);

        assert!(set_pointer(&mut world, a, -1.0, 0.0));
        graph.update(&mut world);
        assert_eq!(frame(&world, a).unwrap().get(2, 3), gray(0.5));
        assert_eq!(presented_frames(&world, a), 2);
    }

    #[test]
    fn oversized_radius_fails_setup() {
        let mut world = load(
            "a = window(width=8, height=8)\n\
             b = a.mouse-motion(radius=9223372036854775807)\n\
             a.display.source = b",
        );
        let err = Graph::build(&mut world).unwrap_err();
        assert!(err.to_string().contains("radius must be between 0 and 8"), "{err}");
    }

    #[test]
    fn clamped_radius_updates_without_overflow() {
        let mut world = load(
            "a = window(width=8, height=8)\n\
             b = a.mouse-motion(radius=8)\n\
             a.display.source = b",
        );
        let a = window_id(&world, "a");
        let graph = Graph::build(&mut world).unwrap();
        let b = match world.resolve(world.root(), &["b"]).map(|r| r.member) {
            Some(Member::Node(id)) => id,
            _ => panic!("b is not a node"),
        };
        world.node_mut(b).unwrap().params[1] = ParamValue::Int(i64::MAX);

        assert!(set_pointer(&mut world, a, 2.0, 2.0));
        graph.update(&mut world);
        assert_eq!(frame(&world, a).unwrap().get(7, 7), 0xffff_ffff);
    }

    #[test]
    fn set_pointer_needs_a_window() {
        let mut world = World::new();
        let root = world.root();
        assert!(!set_pointer(&mut world, root, 0.0, 0.0));
    }

    #[test]
    fn motion_outside_window_fails_setup() {
        let mut world = World::new();
        let root = world.root();
        let name = world.intern("m");
        world
            .instantiate_node(
                root,
                name,
                shared_mouse_motion(),
                root,
                vec![ParamValue::Real(0.9), ParamValue::Int(1)].into(),
            )
            .unwrap();
        let err = Graph::build(&mut world).unwrap_err();
        assert!(err.to_string().contains("must be created inside a window"));
    }

    #[test]
    fn blit_scales_up() {
        let mut dst = Surface::new(4, 2);
        blit(&mut dst, 2, 1, |x, _| x as u32);
        assert_eq!(dst.pixels, vec![0, 0, 1, 1, 0, 0, 1, 1]);
    }
}
