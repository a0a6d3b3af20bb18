//! DOT and JSON serializers for the finished graph (§6 "Persisted state" —
//! explicitly delegated to an external serialization collaborator; this is
//! that collaborator's thin implementation).

use aggregator::Graph;
use std::fmt::Write as _;

pub fn to_dot(graph: &Graph) -> String {
    let mut out = String::new();
    out.push_str("digraph calls {\n");
    for node in 0..graph.node_count() {
        let label = graph.canonical(node).unwrap_or("start");
        let shape = if graph.is_final(node) { "doublecircle" } else { "circle" };
        let _ = writeln!(out, "  n{node} [label=\"{label}\", shape={shape}];");
    }
    for node in 0..graph.node_count() {
        for &succ in graph.successors(node) {
            let _ = writeln!(out, "  n{node} -> n{succ};");
        }
    }
    out.push_str("}\n");
    out
}

pub fn to_json(graph: &Graph) -> String {
    let nodes: Vec<serde_json::Value> = (0..graph.node_count())
        .map(|node| {
            serde_json::json!({
                "id": node,
                "canonical": graph.canonical(node),
                "pred": graph.pred(node),
                "final": graph.is_final(node),
            })
        })
        .collect();
    let links: Vec<serde_json::Value> = (0..graph.node_count())
        .flat_map(|node| graph.successors(node).iter().map(move |&succ| (node, succ)))
        .map(|(source, target)| serde_json::json!({ "source": source, "target": target }))
        .collect();
    serde_json::to_string_pretty(&serde_json::json!({ "nodes": nodes, "links": links })).unwrap_or_default()
}
