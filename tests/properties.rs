//! Randomized checks of the structural algorithms against brute-force
//! reference implementations.

use std::collections::BTreeSet;

use chemgraph::{
    clique::{max_clique, CliqueConstraints, CliqueGraph, MaximalCliques},
    connectivity::{biconnectivity, connected_components},
    isomorphism::{always, has_substructure, MatchMode, Vf2, Vf2Options},
    mcs::{mcs, McsMode, McsOptions},
    utils::induced_subgraph,
    GraphView, SimpleGraph,
};
use quickcheck::{quickcheck, Arbitrary, Gen};

/// A random simple graph with at most 12 nodes. Nodes and edges carry small
/// labels so that matchers have something to reject.
#[derive(Clone, Debug)]
struct SmallGraph {
    nodes: usize,
    edges: Vec<(usize, usize)>,
    node_labels: Vec<u8>,
    edge_labels: Vec<u8>,
}

impl SmallGraph {
    fn build(&self) -> SimpleGraph<(), ()> {
        self.build_without(None, None)
    }

    /// Build the graph, leaving out one node (and its edges) or one edge.
    /// Node identifiers above a removed node shift down by one.
    fn build_without(&self, node: Option<usize>, edge: Option<usize>) -> SimpleGraph<(), ()> {
        let mut g = SimpleGraph::new();
        let id = |v: usize| match node {
            Some(removed) if v > removed => v - 1,
            _ => v,
        };
        for v in 0..self.nodes {
            if Some(v) != node {
                g.add_node(());
            }
        }
        for (i, &(u, v)) in self.edges.iter().enumerate() {
            if Some(i) == edge || Some(u) == node || Some(v) == node {
                continue;
            }
            g.add_edge(id(u), id(v), ()).unwrap();
        }
        g
    }

    fn build_labeled(&self) -> SimpleGraph<u8, u8> {
        let mut g = SimpleGraph::new();
        for &label in &self.node_labels {
            g.add_node(label);
        }
        for (&(u, v), &label) in self.edges.iter().zip(&self.edge_labels) {
            g.add_edge(u, v, label).unwrap();
        }
        g
    }

    fn are_adjacent(&self, u: usize, v: usize) -> bool {
        self.edges.contains(&(u.min(v), u.max(v)))
    }

    /// Keep only the first `n` nodes.
    fn truncate(&self, n: usize) -> SmallGraph {
        let nodes = self.nodes.min(n);
        let (edges, edge_labels) = self
            .edges
            .iter()
            .zip(&self.edge_labels)
            .filter(|((u, v), _)| *u < nodes && *v < nodes)
            .map(|(&edge, &label)| (edge, label))
            .unzip();
        SmallGraph {
            nodes,
            edges,
            node_labels: self.node_labels[..nodes].to_vec(),
            edge_labels,
        }
    }
}

impl Arbitrary for SmallGraph {
    fn arbitrary(g: &mut Gen) -> Self {
        let nodes = usize::arbitrary(g) % 13;
        let density = 1 + u8::arbitrary(g) % 4;
        let mut edges = Vec::new();
        for u in 0..nodes {
            for v in u + 1..nodes {
                if u8::arbitrary(g) % 8 < density {
                    edges.push((u, v));
                }
            }
        }
        let node_labels = (0..nodes).map(|_| u8::arbitrary(g) % 2).collect();
        let edge_labels = edges.iter().map(|_| u8::arbitrary(g) % 2).collect();
        SmallGraph {
            nodes,
            edges,
            node_labels,
            edge_labels,
        }
    }
}

/// Number of connected components, by union-find.
fn union_find_count(nodes: usize, edges: &[(usize, usize)]) -> usize {
    fn find(parent: &mut [usize], x: usize) -> usize {
        let mut root = x;
        while parent[root] != root {
            root = parent[root];
        }
        let mut x = x;
        while parent[x] != root {
            let next = parent[x];
            parent[x] = root;
            x = next;
        }
        root
    }

    let mut parent: Vec<usize> = (0..nodes).collect();
    let mut count = nodes;
    for &(u, v) in edges {
        let (a, b) = (find(&mut parent, u), find(&mut parent, v));
        if a != b {
            parent[a] = b;
            count -= 1;
        }
    }
    count
}

fn component_count(g: &SimpleGraph<(), ()>) -> usize {
    connected_components(g).unwrap().len()
}

fn brute_force_clique_size(g: &SmallGraph) -> usize {
    (0u32..1 << g.nodes)
        .filter(|mask| {
            let members: Vec<usize> = (0..g.nodes).filter(|&v| mask & (1 << v) != 0).collect();
            members
                .iter()
                .enumerate()
                .all(|(i, &u)| members[i + 1..].iter().all(|&v| g.are_adjacent(u, v)))
        })
        .map(|mask| mask.count_ones() as usize)
        .max()
        .unwrap_or(0)
}

fn brute_force_maximal_cliques(g: &SmallGraph) -> BTreeSet<BTreeSet<usize>> {
    let is_clique = |members: &[usize]| {
        members
            .iter()
            .enumerate()
            .all(|(i, &u)| members[i + 1..].iter().all(|&v| g.are_adjacent(u, v)))
    };
    (1u32..1 << g.nodes)
        .map(|mask| -> Vec<usize> { (0..g.nodes).filter(|&v| mask & (1 << v) != 0).collect() })
        .filter(|members| is_clique(members))
        .filter(|members| {
            (0..g.nodes)
                .filter(|v| !members.contains(v))
                .all(|v| !members.iter().all(|&u| g.are_adjacent(u, v)))
        })
        .map(|members| members.into_iter().collect())
        .collect()
}

fn same_label(a: &u8, b: &u8) -> bool {
    a == b
}

quickcheck! {
    fn prop_components_partition_nodes(sg: SmallGraph) -> bool {
        let g = sg.build();
        let components = connected_components(&g).unwrap();
        let mut seen = BTreeSet::new();
        let disjoint = components.iter().flatten().all(|&v| seen.insert(v));
        disjoint
            && seen == g.node_set()
            && components.len() == union_find_count(sg.nodes, &sg.edges)
    }

    fn prop_bridges_are_exactly_disconnecting_edges(sg: SmallGraph) -> bool {
        let g = sg.build();
        let bridges = biconnectivity(&g).unwrap().bridges;
        let before = component_count(&g);
        bridges.is_subset(&g.edge_set())
            && (0..sg.edges.len()).all(|e| {
                let after = component_count(&sg.build_without(None, Some(e)));
                bridges.contains(&e) == (after > before)
            })
    }

    fn prop_cut_vertices_are_exactly_disconnecting_nodes(sg: SmallGraph) -> bool {
        let g = sg.build();
        let cut_vertices = biconnectivity(&g).unwrap().cut_vertices;
        let before = component_count(&g);
        (0..sg.nodes).all(|v| {
            let after = component_count(&sg.build_without(Some(v), None));
            cut_vertices.contains(&v) == (after > before)
        })
    }

    fn prop_every_edge_lies_in_one_block(sg: SmallGraph) -> bool {
        let blocks = biconnectivity(&sg.build()).unwrap().components;
        sg.edges.iter().all(|&(u, v)| {
            blocks
                .iter()
                .filter(|b| b.contains(&u) && b.contains(&v))
                .count()
                == 1
        })
    }

    fn prop_max_clique_matches_brute_force(sg: SmallGraph) -> bool {
        let clique = max_clique(&sg.build()).unwrap();
        let members: Vec<usize> = clique.iter().copied().collect();
        let is_clique = members
            .iter()
            .enumerate()
            .all(|(i, &u)| members[i + 1..].iter().all(|&v| sg.are_adjacent(u, v)));
        is_clique && clique.len() == brute_force_clique_size(&sg)
    }

    fn prop_maximal_cliques_match_brute_force(sg: SmallGraph) -> bool {
        let sg = sg.truncate(9);
        let mut cg = CliqueGraph::with_nodes(sg.nodes);
        for &(u, v) in &sg.edges {
            cg.add_edge(u, v).unwrap();
        }
        let found: Vec<BTreeSet<usize>> =
            MaximalCliques::new(&cg, &CliqueConstraints::default()).collect();
        let distinct: BTreeSet<BTreeSet<usize>> = found.iter().cloned().collect();
        distinct.len() == found.len() && distinct == brute_force_maximal_cliques(&sg)
    }

    fn prop_vf2_mappings_are_valid(target: SmallGraph, size: u8, induced: bool) -> bool {
        let pattern = target.truncate(size as usize % 5).build_labeled();
        let target = target.build_labeled();
        let options = Vf2Options {
            mode: if induced { MatchMode::Induced } else { MatchMode::Subgraph },
            ..Default::default()
        };
        let search = Vf2::new(&pattern, &target, same_label, same_label, options).unwrap();
        let found: Vec<_> = search.take(50).collect();
        // The leading nodes of the target embed into it by the identity.
        !found.is_empty() && found.iter().all(|m| {
            let images: BTreeSet<usize> = m.values().copied().collect();
            let injective = images.len() == m.len() && m.len() == pattern.node_count();
            let labels_kept = m
                .iter()
                .all(|(&u, &v)| pattern.node_attr(u).unwrap() == target.node_attr(v).unwrap());
            let edges_kept = pattern.edge_set().into_iter().all(|e| {
                let (u, v) = pattern.edge_endpoints(e).unwrap();
                target.find_edge(m[&u], m[&v]).is_some_and(|f| {
                    pattern.edge_attr(e).unwrap() == target.edge_attr(f).unwrap()
                })
            });
            let non_edges_kept = !induced
                || m.keys().all(|&u| {
                    m.keys().all(|&v| {
                        u == v
                            || pattern.find_edge(u, v).is_some()
                            || target.find_edge(m[&u], m[&v]).is_none()
                    })
                });
            injective && labels_kept && edges_kept && non_edges_kept
        })
    }

    fn prop_embedded_patterns_are_found(target: SmallGraph, picks: Vec<u8>) -> bool {
        let g = target.build();
        let nodes: BTreeSet<usize> = picks
            .iter()
            .take(5)
            .filter(|_| target.nodes > 0)
            .map(|&p| p as usize % target.nodes)
            .collect();
        let (pattern, _) = induced_subgraph(&g, &nodes).unwrap();
        has_substructure(&pattern, &g, always, always, MatchMode::Induced).unwrap()
            && has_substructure(&pattern, &g, always, always, MatchMode::Subgraph).unwrap()
    }

    fn prop_larger_patterns_are_not_found(target: SmallGraph) -> bool {
        let mut pattern = target.build();
        pattern.add_node(());
        !has_substructure(&pattern, &target.build(), always, always, MatchMode::Subgraph).unwrap()
    }

    fn prop_self_mcs_covers_everything(sg: SmallGraph) -> bool {
        let g = sg.truncate(6).build();
        let nodes = mcs(&g, &g, always, always, &McsOptions::default()).unwrap();
        let small = sg.truncate(5).build();
        let edge_options = McsOptions { mode: McsMode::EdgeInduced, ..Default::default() };
        let edges = mcs(&small, &small, always, always, &edge_options).unwrap();
        let empty = SimpleGraph::<(), ()>::new();
        let none = mcs(&g, &empty, always, always, &McsOptions::default()).unwrap();
        nodes.size() == g.node_count() && edges.size() == small.edge_count() && none.size() == 0
    }
}
