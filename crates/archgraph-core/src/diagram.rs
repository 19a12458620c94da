//! Mermaid rendering of the call graph

use crate::model::Edge;

/// Edges beyond this count are left out of a rendered diagram.
pub const MERMAID_EDGE_LIMIT: usize = 5000;

/// Left-to-right flowchart with one labelled arrow per edge. Dots in ids are
/// replaced with underscores so they stay valid Mermaid node names.
pub fn mermaid(edges: &[Edge], limit: usize) -> String {
    let mut out = String::from("graph LR");
    for edge in edges.iter().take(limit) {
        out.push_str(&format!(
            "\n  {} -->|{}| {}",
            edge.source.replace('.', "_"),
            edge.edge_type,
            edge.target.replace('.', "_")
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mermaid_lines() {
        let edges = vec![Edge::calls("a.b.foo", "x.y.bar"), Edge::calls("a.b.foo", "a.b.baz")];
        assert_eq!(
            mermaid(&edges, MERMAID_EDGE_LIMIT),
            "graph LR\n  a_b_foo -->|calls| x_y_bar\n  a_b_foo -->|calls| a_b_baz"
        );
        assert_eq!(mermaid(&edges, 1).lines().count(), 2);
        assert_eq!(mermaid(&[], 10), "graph LR");
    }
}
