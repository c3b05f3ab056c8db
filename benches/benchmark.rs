use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};

use chemgraph::{
    clique::{max_clique, maximal_cliques},
    connectivity::biconnectivity,
    isomorphism::{molecule_matches, Vf2Options},
    mcs::{molecule_mcs, McsMode, McsOptions},
    molecule::{BondOrder, Element},
    Molecule,
};

/// A chain of `rings` fused benzene-like rings (acene skeleton).
fn acene(rings: usize) -> Molecule {
    let mut mol = Molecule::new();
    let top: Vec<usize> = (0..=2 * rings).map(|_| mol.add_atom(Element::Carbon)).collect();
    let bottom: Vec<usize> = (0..=2 * rings).map(|_| mol.add_atom(Element::Carbon)).collect();
    for row in [&top, &bottom] {
        for pair in row.windows(2) {
            mol.add_bond(pair[0], pair[1], BondOrder::Aromatic).unwrap();
        }
    }
    for i in (0..=2 * rings).step_by(2) {
        mol.add_bond(top[i], bottom[i], BondOrder::Aromatic).unwrap();
    }
    mol
}

pub fn structure(c: &mut Criterion) {
    let mut group = c.benchmark_group("structure");
    for rings in [2, 8, 32] {
        let mol = acene(rings);
        group.bench_with_input(BenchmarkId::new("biconnectivity", rings), &mol, |b, mol| {
            b.iter(|| biconnectivity(mol).unwrap());
        });
        group.bench_with_input(BenchmarkId::new("max_clique", rings), &mol, |b, mol| {
            b.iter(|| max_clique(mol).unwrap());
        });
        group.bench_with_input(BenchmarkId::new("maximal_cliques", rings), &mol, |b, mol| {
            b.iter(|| maximal_cliques(mol).unwrap());
        });
    }
    group.finish();
}

pub fn matching(c: &mut Criterion) {
    let mut group = c.benchmark_group("matching");
    let pattern = acene(1);
    for rings in [2, 8, 32] {
        let target = acene(rings);
        group.bench_with_input(BenchmarkId::new("vf2_all", rings), &target, |b, target| {
            b.iter(|| {
                molecule_matches(&pattern, target, Vf2Options::default())
                    .unwrap()
                    .count()
            });
        });
    }

    let first = acene(1);
    let second = acene(2);
    for mode in [McsMode::NodeInduced, McsMode::EdgeInduced] {
        let options = McsOptions {
            mode,
            ..Default::default()
        };
        group.bench_function(BenchmarkId::new("mcs", format!("{mode:?}")), |b| {
            b.iter(|| molecule_mcs(&first, &second, &options).unwrap());
        });
    }
    group.finish();
}

criterion_group! {
    name = benchmark;
    config = Criterion::default().sample_size(20);
    targets = structure, matching
}
criterion_main!(benchmark);
