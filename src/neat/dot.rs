//! Graphviz export of a genome.
//!
//! Nodes are labelled with id and type (plus activation for non-inputs).
//! Edges carry their weight; disabled edges are drawn dotted.

use crate::neat::genome::{Genome, NodeKind};
use std::fmt;

/// Display adapter rendering a genome as a DOT digraph.
#[derive(Debug, Clone, Copy)]
pub struct Dot<'a>(pub &'a Genome);

impl fmt::Display for Dot<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let genome = self.0;
        writeln!(f, "digraph G {{")?;
        writeln!(f, "    rankdir=LR;")?;

        for node in genome.nodes() {
            let shape = match node.kind {
                NodeKind::Input => "box",
                NodeKind::Hidden => "ellipse",
                NodeKind::Output => "doublecircle",
            };
            if node.kind == NodeKind::Input {
                writeln!(
                    f,
                    "    {} [label=\"{} {}\", shape={shape}];",
                    node.id, node.id, node.kind
                )?;
            } else {
                writeln!(
                    f,
                    "    {} [label=\"{} {} {}\", shape={shape}];",
                    node.id, node.id, node.kind, node.activation
                )?;
            }
        }

        for c in genome.connections() {
            let style = if c.enabled { "solid" } else { "dotted" };
            writeln!(
                f,
                "    {} -> {} [label=\"{:.3}\", style={style}];",
                c.from, c.to, c.weight
            )?;
        }

        writeln!(f, "}}")
    }
}

/// Render `genome` as Graphviz DOT source.
#[must_use]
pub fn to_dot(genome: &Genome) -> String {
    Dot(genome).to_string()
}
