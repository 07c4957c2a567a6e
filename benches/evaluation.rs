use aln_datasets::generate;
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use linfa_aln::benchmarks::config;
use linfa_aln::dataset::SampleTable;
use linfa_aln::prelude::*;
use ndarray::Array2;
use ndarray_rand::rand::SeedableRng;
use ndarray_rand::rand_distr::Uniform;
use ndarray_rand::RandomExt;
use rand::rngs::SmallRng;

fn trained_network(max_leaves: usize, rng: &mut SmallRng) -> Aln {
    let records = generate::pyramid_2d(1000, rng);
    let mut aln = Aln::new(3, 2).unwrap();
    for var in 0..2 {
        aln.region_mut()
            .constraint_mut(var)
            .unwrap()
            .set_domain(-1.0, 1.0)
            .unwrap();
    }
    aln.region_mut()
        .constraint_mut(2)
        .unwrap()
        .set_epsilon(0.001)
        .unwrap();
    aln.set_growable(aln.root(), true).unwrap();

    let params = TrainParams::default()
        .max_epochs(100)
        .max_leaves(Some(max_leaves));
    aln.train(&params, &mut SampleTable::new(records.view()), |_| {
        Signal::Continue
    })
    .unwrap();
    aln
}

fn evaluation_bench(c: &mut Criterion) {
    let mut rng = SmallRng::seed_from_u64(42);
    let points = Array2::random_using((1000, 3), Uniform::new(-1.0, 1.0), &mut rng);

    // Controls the size of the network
    let leaf_counts = &[4, 16, 64];

    let mut group = c.benchmark_group("evaluation");
    config::set_default_benchmark_configs(&mut group);

    for &leaves in leaf_counts.iter() {
        let aln = trained_network(leaves, &mut rng);
        let dtree = aln.compile(&DecisionTree::params()).unwrap();

        group.bench_with_input(BenchmarkId::new("network", leaves), &points, |b, p| {
            b.iter(|| aln.predict(p))
        });
        group.bench_with_input(BenchmarkId::new("compiled", leaves), &points, |b, p| {
            b.iter(|| dtree.predict(p))
        });
    }

    group.finish();
}

criterion_group!(benches, evaluation_bench);
criterion_main!(benches);
