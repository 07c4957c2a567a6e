use aln_datasets::generate;
use linfa_aln::dataset::SampleTable;
use linfa_aln::prelude::*;
use ndarray::{Array1, Array2};
use ndarray_rand::rand_distr::Uniform;
use ndarray_rand::RandomExt;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256Plus;

fn trained_pyramid() -> Aln {
    let mut rng = Xoshiro256Plus::seed_from_u64(21);
    let records = generate::pyramid_2d(400, &mut rng);

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
        .set_epsilon(0.02)
        .unwrap();
    aln.set_growable(aln.root(), true).unwrap();

    let params = TrainParams::default()
        .max_epochs(60)
        .split_interval(10)
        .max_leaves(Some(16));
    aln.train(&params, &mut SampleTable::new(records.view()), |_| {
        Signal::Continue
    })
    .unwrap();
    aln
}

fn sample_points(n: usize, seed: u64) -> Array2<f64> {
    let mut rng = Xoshiro256Plus::seed_from_u64(seed);
    let mut points = Array2::random_using((n, 3), Uniform::new_inclusive(-1.0, 1.0), &mut rng);
    points.column_mut(2).fill(0.0);
    points
}

fn assert_close(expected: &Array1<f64>, compiled: &Array1<f64>) {
    for (e, c) in expected.iter().zip(compiled) {
        assert!((e - c).abs() <= 1e-9 * (1.0 + e.abs()), "{} != {}", e, c);
    }
}

#[test]
fn compiled_tree_matches_the_network() {
    let aln = trained_pyramid();
    assert!(aln.num_leaves() > 1);
    let points = sample_points(2000, 1);
    let expected: Array1<f64> = aln.predict(&points);

    for &depth in &[1, 3, 8] {
        let dtree = aln
            .compile(&DecisionTree::params().max_depth(depth))
            .unwrap();
        assert!(dtree.depth() <= depth);
        assert!(dtree.forms().len() <= aln.num_leaves());
        assert_close(&expected, &dtree.predict(&points));
    }
}

#[test]
fn deeper_trees_evaluate_smaller_blocks() {
    let aln = trained_pyramid();
    let flat = aln.compile(&DecisionTree::params().max_depth(1)).unwrap();
    let deep = aln.compile(&DecisionTree::params().max_depth(8)).unwrap();

    let largest = |dtree: &DecisionTree| {
        dtree
            .blocks()
            .iter()
            .map(|b| b.expr().num_forms())
            .max()
            .unwrap()
    };
    assert!(largest(&deep) <= largest(&flat));
    assert_eq!(flat.vars().len(), 3);
    assert_eq!(flat.vars()[0].min, -1.0);
}

#[test]
fn compilation_is_reproducible() {
    let aln = trained_pyramid();
    let params = DecisionTree::params()
        .max_depth(5)
        .with_rng(Xoshiro256Plus::seed_from_u64(3));
    assert_eq!(aln.compile(&params).unwrap(), aln.compile(&params).unwrap());
}

#[test]
fn inversion_then_compilation() {
    // y = 2x + 1, then solve for x
    let mut aln = Aln::new(2, 1).unwrap();
    let records = generate::grid_1d(50, 0.0, 1.0, |x| 2.0 * x + 1.0);
    let params = TrainParams::default().max_epochs(80).learn_rate(0.5);
    aln.train(&params, &mut SampleTable::new(records.view()), |_| {
        Signal::Continue
    })
    .unwrap();

    aln.invert(0).unwrap();
    aln.region_mut()
        .constraint_mut(1)
        .unwrap()
        .set_domain(1.0, 3.0)
        .unwrap();
    aln.region_mut()
        .constraint_mut(0)
        .unwrap()
        .set_domain(0.0, 1.0)
        .unwrap();

    let dtree = aln.compile(&DecisionTree::params()).unwrap();
    let x = ndarray::array![0.0, 2.0];
    assert!((dtree.evaluate(x.view()) - 0.5).abs() < 0.02);
}

#[test]
fn smoothed_network_compiles_with_its_fillets() {
    let records = generate::grid_1d(201, -1.0, 1.0, f64::abs);
    let mut aln = Aln::new(2, 1).unwrap();
    aln.region_mut()
        .constraint_mut(0)
        .unwrap()
        .set_domain(-1.0, 1.0)
        .unwrap();
    aln.region_mut()
        .constraint_mut(1)
        .unwrap()
        .set_epsilon(0.05)
        .unwrap();
    aln.region_mut().set_smoothing_epsilon(0.05).unwrap();
    aln.set_growable(aln.root(), true).unwrap();

    let params = TrainParams::default()
        .max_epochs(300)
        .split_interval(100)
        .learn_rate(0.3);
    aln.train(&params, &mut SampleTable::new(records.view()), |_| {
        Signal::Continue
    })
    .unwrap();
    assert!(aln.num_leaves() > 1);

    let mut grid = records.clone();
    grid.column_mut(1).fill(0.0);
    let expected: Array1<f64> = aln.predict(&grid);
    for &depth in &[1, 4] {
        let dtree = aln
            .compile(&DecisionTree::params().max_depth(depth))
            .unwrap();
        assert_close(&expected, &dtree.predict(&grid));
    }
}
