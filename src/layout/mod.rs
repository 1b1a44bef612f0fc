//! Group-wise node placement.
//!
//! Each configured group is laid out on its own by a [`GraphLayoutEngine`],
//! normalized to the unit square and then projected onto its slot of the
//! shared canvas. The resulting canvas coordinates grow downward on y.

pub mod engine;
pub mod error;

use std::collections::{BTreeMap, HashMap};

use crate::config::{GroupRule, OTHERS_GROUP};
use crate::graph::Graph;

pub use engine::{DagreEngine, GraphLayoutEngine, GraphvizEngine, LayoutProgram};
pub use error::LayoutError;

/// Node name to 2D position.
pub type LayoutMap = BTreeMap<String, [f32; 2]>;

fn bounds<'a, I>(positions: I) -> Option<([f32; 2], [f32; 2])>
where
    I: IntoIterator<Item = &'a [f32; 2]>,
{
    let mut iter = positions.into_iter();
    let first = *iter.next()?;
    let (mut min, mut max) = (first, first);
    for pos in iter {
        for axis in 0..2 {
            min[axis] = min[axis].min(pos[axis]);
            max[axis] = max[axis].max(pos[axis]);
        }
    }
    Some((min, max))
}

/// Rescales positions into `[0, 1]` per axis.
///
/// A degenerate layout, where every position shares its x or its y, is
/// returned unchanged.
pub fn normalize_layout(layout: &mut LayoutMap) {
    let Some((min, max)) = bounds(layout.values()) else {
        return;
    };
    let width = max[0] - min[0];
    let height = max[1] - min[1];
    if width == 0.0 || height == 0.0 {
        return;
    }
    for pos in layout.values_mut() {
        pos[0] = (pos[0] - min[0]) / width;
        pos[1] = (pos[1] - min[1]) / height;
    }
}

/// Moves the midpoint of the bounding box of all placed nodes to the origin.
///
/// Nothing is moved when either midpoint coordinate is already exactly zero.
pub fn align_layout(graph: &mut Graph) {
    let Some((min, max)) = bounds(graph.nodes.values().filter_map(|node| node.pos.as_ref()))
    else {
        return;
    };
    let offset_x = (max[0] + min[0]) / 2.0;
    let offset_y = (max[1] + min[1]) / 2.0;
    if offset_x == 0.0 || offset_y == 0.0 {
        return;
    }
    for pos in graph.nodes.values_mut().filter_map(|node| node.pos.as_mut()) {
        pos[0] -= offset_x;
        pos[1] -= offset_y;
    }
}

/// Lays out the nodes claimed by `rule` and returns their normalized
/// positions. Only edges with both endpoints in the group take part.
pub fn place_node(
    graph: &Graph,
    rule: &GroupRule,
    engine: &dyn GraphLayoutEngine,
) -> Result<LayoutMap, LayoutError> {
    let subgraph = graph.induced_subgraph(|id| rule.matches(id));
    if subgraph.nodes.is_empty() {
        log::debug!("group `{}` matches no node", rule.name);
        return Ok(LayoutMap::new());
    }
    log::debug!(
        "laying out group `{}` ({} nodes, {} edges) with {}",
        rule.name,
        subgraph.node_count(),
        subgraph.edge_count(),
        engine.name()
    );
    let mut layout = engine.layout(&subgraph)?;
    normalize_layout(&mut layout);
    Ok(layout)
}

/// Name under which a node that no group claims is laid out, so the
/// `__others__` group picks it up.
pub fn others_alias(node_id: &str) -> String {
    format!("\"{}{}\"", OTHERS_GROUP, node_id.trim_matches('"'))
}

/// Places every node of `graph` and tags it with its group color.
///
/// Groups are processed in order; a node claimed by several groups ends up
/// with the position and color of the last one.
pub fn place_node_by_group(
    graph: &mut Graph,
    groups: &[GroupRule],
    engine: &dyn GraphLayoutEngine,
) -> Result<(), LayoutError> {
    let mut aliases: HashMap<String, String> = HashMap::new();
    for id in graph.nodes.keys() {
        if !groups.iter().any(|rule| rule.matches(id)) {
            aliases.insert(id.clone(), others_alias(id));
        }
    }

    let fallback = GroupRule::default_others();
    let mut rules: Vec<&GroupRule> = groups.iter().collect();
    if aliases
        .values()
        .any(|alias| !groups.iter().any(|rule| rule.matches(alias)))
    {
        log::warn!(
            "no `{OTHERS_GROUP}` group configured, {} unmatched node(s) use the default one",
            aliases.len()
        );
        rules.push(&fallback);
    }

    graph.relabel(&aliases)?;
    let placed = place_groups(graph, &rules, engine);
    let restore: HashMap<String, String> = aliases
        .into_iter()
        .map(|(id, alias)| (alias, id))
        .collect();
    graph.relabel(&restore)?;
    placed
}

fn place_groups(
    graph: &mut Graph,
    rules: &[&GroupRule],
    engine: &dyn GraphLayoutEngine,
) -> Result<(), LayoutError> {
    for rule in rules {
        let layout = place_node(graph, rule, engine)?;
        let mut placed = 0usize;
        for (id, node) in graph.nodes.iter_mut() {
            if !rule.matches(id) {
                continue;
            }
            let Some(pos) = layout.get(id) else {
                continue;
            };
            // engine y grows upward, the canvas grows downward
            let flipped = [pos[0], 1.0 - pos[1]];
            node.pos = Some(rule.style.project(flipped));
            node.color = Some(rule.style.color);
            placed += 1;
        }
        log::info!("group `{}`: placed {} node(s)", rule.name, placed);
    }
    Ok(())
}
