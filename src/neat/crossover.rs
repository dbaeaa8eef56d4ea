//! Crossover for neuroevolution.
//!
//! Genes are matched on connection id (innovation number). Matching genes
//! are inherited from either parent at random; genes only one parent has
//! (disjoint or excess) follow the fitter parent, with a coin flip on ties.
//! The child always keeps both parents' input and output nodes, and gets one
//! mutation pass before it is returned.

use crate::neat::genome::{Connection, Genome};
use crate::neat::mutation::{MutationConfig, mutate};
use crate::neat::sequencer::{ConnectionId, NodeId, Sequencer};
use rand::Rng;
use std::collections::BTreeSet;

/// Produce a child from two parents, then mutate it once.
///
/// # Panics
///
/// Panics if an inherited connection names an endpoint its parent does not
/// contain. Well-formed genomes never do.
#[must_use]
pub fn crossover<R: Rng>(
    parent1: &Genome,
    parent2: &Genome,
    config: &MutationConfig,
    seq: &mut Sequencer,
    rng: &mut R,
) -> Genome {
    let mut child = inherit(parent1, parent2, rng);
    mutate(&mut child, config, seq, rng);
    child
}

/// Gene inheritance without the trailing mutation pass.
///
/// # Panics
///
/// See [`crossover`].
#[must_use]
pub fn inherit<R: Rng>(parent1: &Genome, parent2: &Genome, rng: &mut R) -> Genome {
    let mut child = Genome::default();

    let ids: BTreeSet<ConnectionId> = parent1
        .connections
        .keys()
        .chain(parent2.connections.keys())
        .copied()
        .collect();

    for id in ids {
        let chosen = match (parent1.connection(id), parent2.connection(id)) {
            (Some(a), Some(b)) => {
                if rng.gen_bool(0.5) {
                    Some((a, parent1))
                } else {
                    Some((b, parent2))
                }
            }
            (Some(a), None) => {
                prefer(parent1.fitness, parent2.fitness, rng).then_some((a, parent1))
            }
            (None, Some(b)) => {
                prefer(parent2.fitness, parent1.fitness, rng).then_some((b, parent2))
            }
            (None, None) => None,
        };

        if let Some((connection, donor)) = chosen {
            adopt_endpoint(&mut child, donor, connection.from, connection.id);
            adopt_endpoint(&mut child, donor, connection.to, connection.id);
            child.insert_connection(Connection {
                visit_count: 0,
                ..*connection
            });
        }
    }

    // Input/output arity must never shrink, whatever the surviving genes.
    for parent in [parent1, parent2] {
        for &id in &parent.inputs {
            adopt_io(&mut child, parent, id);
            if !child.inputs.contains(&id) {
                child.inputs.push(id);
            }
        }
        for &id in &parent.outputs {
            adopt_io(&mut child, parent, id);
            if !child.outputs.contains(&id) {
                child.outputs.push(id);
            }
        }
    }

    child
}

/// Whether a gene only `own` has should be inherited.
fn prefer<R: Rng>(own: f64, other: f64, rng: &mut R) -> bool {
    if own > other {
        true
    } else if own < other {
        false
    } else {
        rng.gen_bool(0.5)
    }
}

fn adopt_endpoint(child: &mut Genome, donor: &Genome, id: NodeId, connection: ConnectionId) {
    if child.nodes.contains_key(&id) {
        return;
    }
    let node = donor.node(id).unwrap_or_else(|| {
        panic!("connection {connection} references node {id} missing from its parent")
    });
    child.insert_node(node.unlinked());
}

fn adopt_io(child: &mut Genome, parent: &Genome, id: NodeId) {
    if child.nodes.contains_key(&id) {
        return;
    }
    if let Some(node) = parent.node(id) {
        child.insert_node(node.unlinked());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::neat::genome::{IoLayout, NodeKind};
    use crate::neat::mutation::add_node;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    struct Fixture {
        layout: IoLayout,
        seq: Sequencer,
        rng: SmallRng,
    }

    impl Fixture {
        fn new(seed: u64) -> Self {
            let mut seq = Sequencer::new();
            let layout = IoLayout::allocate(5, 1, &mut seq);
            Self {
                layout,
                seq,
                rng: SmallRng::seed_from_u64(seed),
            }
        }

        fn genome(&mut self) -> Genome {
            Genome::minimal(&self.layout, &mut self.rng)
        }

        fn grown(&mut self, splits: usize) -> Genome {
            let mut genome = self.genome();
            for _ in 0..splits {
                add_node(&mut genome, &mut self.seq, &mut self.rng);
            }
            genome
        }
    }

    fn connection_ids(genome: &Genome) -> Vec<ConnectionId> {
        genome.connections().map(|c| c.id).collect()
    }

    #[test]
    fn test_self_crossover_keeps_connection_set() {
        let mut fx = Fixture::new(42);
        let parent = fx.grown(4);

        let child = inherit(&parent, &parent, &mut fx.rng);

        assert_eq!(connection_ids(&child), connection_ids(&parent));
        assert_eq!(child.node_count(), parent.node_count());
        for c in child.connections() {
            assert_eq!(Some(c), parent.connection(c.id));
        }
    }

    #[test]
    fn test_fitter_parent_supplies_disjoint_genes() {
        let mut fx = Fixture::new(7);
        let mut fit = fx.grown(3);
        let mut weak = fx.grown(2);
        fit.set_fitness(10.0);
        weak.set_fitness(1.0);

        let child = inherit(&fit, &weak, &mut fx.rng);

        for c in fit.connections() {
            assert!(child.connection(c.id).is_some(), "missing gene {}", c.id);
        }
        for c in weak.connections() {
            if fit.connection(c.id).is_none() {
                assert!(child.connection(c.id).is_none(), "weak-only gene {} leaked", c.id);
            }
        }
    }

    #[test]
    fn test_matching_genes_come_from_either_parent() {
        let mut fx = Fixture::new(3);
        let a = fx.genome();
        let b = fx.genome();

        let mut from_a = 0;
        let mut from_b = 0;
        for _ in 0..20 {
            let child = inherit(&a, &b, &mut fx.rng);
            for c in child.connections() {
                if Some(c) == a.connection(c.id) {
                    from_a += 1;
                } else if Some(c) == b.connection(c.id) {
                    from_b += 1;
                } else {
                    panic!("gene {} matches neither parent", c.id);
                }
            }
        }
        assert!(from_a > 0 && from_b > 0);
    }

    #[test]
    fn test_io_nodes_survive_when_no_gene_does() {
        let mut fx = Fixture::new(11);
        let a = fx.genome();
        let mut lonely = Genome::default();
        for &id in a.inputs() {
            lonely.insert_node(a.node(id).unwrap().unlinked());
            lonely.inputs.push(id);
        }
        for &id in a.outputs() {
            lonely.insert_node(a.node(id).unwrap().unlinked());
            lonely.outputs.push(id);
        }
        lonely.set_fitness(5.0);

        let child = inherit(&lonely, &a, &mut fx.rng);

        assert_eq!(child.connection_count(), 0);
        assert_eq!(child.inputs(), a.inputs());
        assert_eq!(child.outputs(), a.outputs());
        assert_eq!(child.node(a.outputs()[0]).unwrap().kind, NodeKind::Output);
    }

    #[test]
    fn test_child_edges_are_linked() {
        let mut fx = Fixture::new(19);
        let a = fx.grown(3);
        let b = fx.grown(3);

        let child = inherit(&a, &b, &mut fx.rng);

        for c in child.connections() {
            assert!(child.node(c.from).unwrap().out_edges.contains(&c.id));
            assert!(child.node(c.to).unwrap().in_edges.contains(&c.id));
        }
    }

    #[test]
    fn test_crossover_preserves_arity_and_mints_above_floor() {
        let mut fx = Fixture::new(23);
        let a = fx.grown(2);
        let b = fx.grown(2);
        let floor = fx.seq.peek_connection_id();
        let config = MutationConfig {
            add_node_rate: 1.0,
            ..MutationConfig::default()
        };

        let child = crossover(&a, &b, &config, &mut fx.seq, &mut fx.rng);

        assert_eq!(child.inputs().len(), 5);
        assert_eq!(child.outputs().len(), 1);
        for c in child.connections() {
            let inherited = a.connection(c.id).is_some() || b.connection(c.id).is_some();
            assert!(inherited || c.id >= floor);
        }
        assert!(child.connections().any(|c| c.id >= floor));
    }
}
