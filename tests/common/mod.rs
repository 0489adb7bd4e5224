//! Shared reconstruction fixtures for integration tests.
#![allow(dead_code)]

use glam::DVec3;

use morphaug::domain::{Node, NodeId, StructureType, Tree, TreeBuilder};

pub fn node(id: i64, parent: Option<i64>, position: [f64; 3]) -> Node {
    let kind = if parent.is_none() {
        StructureType::Soma
    } else {
        StructureType::BasalDendrite
    };
    Node::new(id, kind, DVec3::from_array(position), 1.0, parent.map(NodeId))
}

pub fn build(nodes: Vec<Node>) -> Tree {
    TreeBuilder::new().build(nodes).expect("valid fixture tree")
}

/// `n` nodes along the x axis, 1 µm apart, id 1 at the origin.
pub fn chain(n: i64) -> Tree {
    build(
        (1..=n)
            .map(|id| {
                let parent = if id == 1 { None } else { Some(id - 1) };
                node(id, parent, [(id - 1) as f64, 0.0, 0.0])
            })
            .collect(),
    )
}

/// Soma with two stems that each bifurcate once.
///
/// ```text
/// 1 ─ 2 ─ 3 ┬ 4 ─ 5
///           └ 6
/// 1 ─ 7 ─ 8 ┬ 9
///           └ 10 ─ 11 ─ 12
/// ```
pub fn two_stems() -> Tree {
    build(vec![
        node(1, None, [0.0, 0.0, 0.0]),
        node(2, Some(1), [1.0, 0.0, 0.0]),
        node(3, Some(2), [2.0, 0.0, 0.0]),
        node(4, Some(3), [3.0, 1.0, 0.0]),
        node(5, Some(4), [4.0, 2.0, 0.0]),
        node(6, Some(3), [3.0, -0.5, 0.0]),
        node(7, Some(1), [-1.0, 0.0, 0.0]),
        node(8, Some(7), [-2.0, 0.0, 0.0]),
        node(9, Some(8), [-2.5, 0.5, 0.0]),
        node(10, Some(8), [-3.0, -1.0, 0.0]),
        node(11, Some(10), [-4.0, -2.0, 0.0]),
        node(12, Some(11), [-5.0, -3.0, 1.0]),
    ])
}

/// Full binary arbor of the given depth: every branch is a 3-node section,
/// lengths vary with the id so weighting has something to rank.
pub fn arbor(depth: u32) -> Tree {
    let mut nodes = vec![node(1, None, [0.0, 0.0, 0.0])];
    grow(&mut nodes, 1, DVec3::X, depth);
    build(nodes)
}

fn grow(nodes: &mut Vec<Node>, mut parent: i64, direction: DVec3, depth: u32) {
    let parent_pos = |nodes: &Vec<Node>, id: i64| {
        nodes
            .iter()
            .find(|n| n.id == NodeId(id))
            .map(|n| n.position)
            .unwrap_or(DVec3::ZERO)
    };
    for _ in 0..3 {
        let id = nodes.len() as i64 + 1;
        let step = 1.0 + (id % 7) as f64;
        let position = parent_pos(nodes, parent) + direction * step;
        nodes.push(node(id, Some(parent), position.to_array()));
        parent = id;
    }
    if depth > 0 {
        let left = (direction + DVec3::Y).normalize();
        let right = (direction - DVec3::Y + DVec3::Z * 0.3).normalize();
        grow(nodes, parent, left, depth - 1);
        grow(nodes, parent, right, depth - 1);
    }
}

pub const SAMPLE_SWC: &str = "\
# sample reconstruction
# n type x y z radius parent
1 1 0.0 0.0 0.0 5.0 -1
2 3 1.0 0.0 0.0 1.0 1
3 3 2.0 0.0 0.0 1.0 2
4 3 3.0 1.0 0.0 0.8 3
5 3 4.0 2.0 0.0 0.6 4
6 3 3.0 -1.0 0.0 0.8 3
7 3 4.0 -2.0 0.0 0.6 6
8 4 -1.0 0.0 0.0 1.0 1
9 4 -2.0 0.0 0.0 1.0 8
10 4 -3.0 1.0 0.0 0.8 9
11 4 -3.0 -1.0 0.0 0.8 9
";
