//! Unit tests for archgraph-core module

use crate::*;
use std::collections::BTreeSet;

fn function(id: &str) -> Node {
    let label = id.rsplit('.').next().unwrap_or(id);
    Node::function(id, label, "system", "core", "core.py", (1, 2))
}

fn graph(ids: &[&str], edges: &[(&str, &str)]) -> GraphData {
    let nodes = ids.iter().map(|id| function(id)).collect();
    let edges = edges.iter().map(|(s, t)| Edge::calls(*s, *t)).collect();
    finalize(nodes, edges, &WeightModel::default())
}

#[test]
fn test_degrees_match_edge_counts() {
    let g = graph(
        &["m.a", "m.b", "m.c"],
        &[("m.a", "m.b"), ("m.a", "m.c"), ("m.b", "m.c"), ("m.c", "os.path.join")],
    );

    for node in &g.nodes {
        let incoming = g.edges.iter().filter(|e| e.target == node.id).count() as u32;
        let outgoing = g.edges.iter().filter(|e| e.source == node.id).count() as u32;
        assert_eq!(node.degree_in, incoming, "degree_in of {}", node.id);
        assert_eq!(node.degree_out, outgoing, "degree_out of {}", node.id);
    }
    assert_eq!(g.stats, GraphStats { total_nodes: 3, total_edges: 4 });
}

#[test]
fn test_dangling_edges_are_kept() {
    let g = graph(&["m.a"], &[("m.a", "requests.get"), ("m.a", "m.missing")]);
    assert_eq!(g.edges.len(), 2);
    assert!(g.node("requests.get").is_none());
    assert_eq!(g.node("m.a").map(|n| n.degree_out), Some(2));
}

#[test]
fn test_isolated_nodes_keep_zero_degree() {
    let g = graph(&["m.a", "m.lonely"], &[("m.a", "m.a")]);
    let lonely = g.node("m.lonely").unwrap();
    assert_eq!((lonely.degree_in, lonely.degree_out), (0, 0));
    // role 0.4*0.4 + subsystem 0.5*0.3, no connectivity
    assert_eq!(lonely.weight, 0.31);
}

#[test]
fn test_max_degree_floor_on_empty_graph() {
    let mut nodes: Vec<Node> = Vec::new();
    assert_eq!(compute_degrees(&mut nodes, &[]), 1);
    let g = finalize(Vec::new(), Vec::new(), &WeightModel::default());
    assert_eq!(g, GraphData::empty());
}

#[test]
fn test_no_diff_without_previous() {
    let current = graph(&["m.a"], &[]);
    assert!(compute_diff(None, &current).is_none());
}

#[test]
fn test_diff_detects_removed_function() {
    let g1 = graph(&["m.a", "m.b"], &[("m.a", "m.b")]);
    let g2 = graph(&["m.a"], &[]);
    let diff = compute_diff(Some(&g1), &g2).unwrap();

    assert_eq!(diff.nodes_removed, vec!["m.b".to_string()]);
    assert!(diff.nodes_added.is_empty());
    assert_eq!(diff.edges_removed, vec![Edge::calls("m.a", "m.b")]);
    assert_eq!(diff.prev_stats.total_nodes, 2);
    assert_eq!(diff.cur_stats.total_nodes, 1);
}

#[test]
fn test_diff_round_trip_reconstructs_current() {
    let g1 = graph(
        &["m.a", "m.b", "m.c"],
        &[("m.a", "m.b"), ("m.b", "m.c"), ("m.b", "m.c")],
    );
    let g2 = graph(
        &["m.a", "m.c", "m.d"],
        &[("m.a", "m.d"), ("m.d", "m.c"), ("m.a", "ext.call")],
    );
    let diff = compute_diff(Some(&g1), &g2).unwrap();

    let added: BTreeSet<_> = diff.nodes_added.iter().collect();
    let removed: BTreeSet<_> = diff.nodes_removed.iter().collect();
    assert!(added.is_disjoint(&removed));

    let mut node_ids = g1.node_ids();
    let mut edges = g1.edge_set();
    diff.apply_to(&mut node_ids, &mut edges);
    assert_eq!(node_ids, g2.node_ids());
    assert_eq!(edges, g2.edge_set());
}

#[test]
fn test_diff_edges_sorted_by_source_then_target() {
    let g1 = graph(&["m.a"], &[]);
    let g2 = graph(
        &["m.a"],
        &[("m.z", "m.a"), ("m.a", "m.y"), ("m.a", "m.b"), ("m.c", "m.a")],
    );
    let diff = compute_diff(Some(&g1), &g2).unwrap();
    let keys: Vec<_> = diff
        .edges_added
        .iter()
        .map(|e| (e.source.as_str(), e.target.as_str()))
        .collect();
    assert_eq!(
        keys,
        vec![("m.a", "m.b"), ("m.a", "m.y"), ("m.c", "m.a"), ("m.z", "m.a")]
    );
}

#[test]
fn test_identical_graphs_produce_empty_diff() {
    let g = graph(&["m.a", "m.b"], &[("m.a", "m.b")]);
    let diff = compute_diff(Some(&g), &g.clone()).unwrap();
    assert!(diff.is_empty());
}

#[test]
fn test_roles_and_subsystems_are_distinct_and_sorted() {
    let mut a = function("m.a");
    a.role = "owner".into();
    a.subsystem = "shifts".into();
    let mut b = function("m.b");
    b.role = "manager".into();
    b.subsystem = "shifts".into();
    let g = finalize(vec![a, b, function("m.c")], Vec::new(), &WeightModel::default());

    assert_eq!(g.roles(), vec!["manager", "owner", "system"]);
    assert_eq!(g.subsystems(), vec!["core", "shifts"]);
}

#[test]
fn test_edge_wire_shape() {
    let edge = Edge::calls("a.b.foo", "x.y.bar");
    assert_eq!(edge.record_id(), "a.b.foo|calls|x.y.bar");
    insta::assert_json_snapshot!(edge, @r#"
    {
      "source": "a.b.foo",
      "target": "x.y.bar",
      "type": "calls"
    }
    "#);
}

#[test]
fn test_node_serializes_every_field() {
    let node = function("app.services.billing.charge");
    let value = serde_json::to_value(&node).unwrap();
    for key in [
        "id", "label", "type", "role", "subsystem", "file", "line_start", "line_end", "weight",
        "degree_in", "degree_out",
    ] {
        assert!(value.get(key).is_some(), "missing {}", key);
    }
    assert_eq!(value["type"], "function");
    let back: Node = serde_json::from_value(value).unwrap();
    assert_eq!(back, node);
}
