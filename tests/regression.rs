use aln_datasets::generate;
use linfa_aln::dataset::SampleTable;
use linfa_aln::model::NodeKind;
use linfa_aln::prelude::*;
use ndarray::Array2;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256Plus;

fn train(
    aln: &mut Aln,
    records: &Array2<f64>,
    params: &TrainParams<Xoshiro256Plus>,
) -> TrainReport {
    let mut source = SampleTable::new(records.view());
    aln.train(params, &mut source, |_| Signal::Continue).unwrap()
}

#[test]
fn absolute_value_grows_one_max() {
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
    aln.set_growable(aln.root(), true).unwrap();

    let params = TrainParams::default()
        .max_epochs(300)
        .split_interval(100)
        .learn_rate(0.3);
    let report = train(&mut aln, &records, &params);

    assert_eq!(report.stop, StopReason::AllFrozen);
    assert_eq!(report.splits, 1);
    assert_eq!(aln.num_leaves(), 2);
    let children = match aln.node(aln.root()).kind() {
        NodeKind::MinMax(mm) => {
            assert_eq!(mm.op(), MinMaxOp::Max);
            mm.children()
        }
        NodeKind::Leaf(_) => panic!("root was not split"),
    };

    let a = aln.leaf(children[0]).unwrap();
    let b = aln.leaf(children[1]).unwrap();
    assert!(a.weight(0) * b.weight(0) < 0.0);
    assert!(a.centroid()[0] * b.centroid()[0] < 0.0);
    // the piece with the positive slope lies right of the origin
    let (left, right) = if a.weight(0) < 0.0 { (a, b) } else { (b, a) };
    assert!(left.centroid()[0] < 0.0 && right.centroid()[0] > 0.0);
    // each centroid sits near the middle of its half of the domain
    assert!((a.centroid()[0] + b.centroid()[0]).abs() < 0.1);
    assert!((right.centroid()[0] - 0.5).abs() < 0.15);
    assert!(report.rmse < 0.05);
}

#[test]
fn weights_stay_inside_their_bounds() {
    let mut rng = Xoshiro256Plus::seed_from_u64(8);
    let records = generate::plane(200, &[2.0, -3.0], 0.1, &mut rng);
    let mut aln = Aln::new(3, 2).unwrap();
    aln.region_mut()
        .constraint_mut(0)
        .unwrap()
        .set_weight_bound(-0.5, 0.5)
        .unwrap();
    aln.region_mut()
        .constraint_mut(1)
        .unwrap()
        .set_weight_bound(-1.0, 0.0)
        .unwrap();
    let [left, _] = aln.split_leaf(aln.root(), MinMaxOp::Max).unwrap();
    aln.split_leaf(left, MinMaxOp::Min).unwrap();

    let params = TrainParams::default().max_epochs(40).jitter(true);
    train(&mut aln, &records, &params);

    for (_, lfn) in aln.leaves() {
        assert!(lfn.is_initialized());
        assert!(lfn.weight(0) >= -0.5 && lfn.weight(0) <= 0.5);
        assert!(lfn.weight(1) >= -1.0 && lfn.weight(1) <= 0.0);
        assert_eq!(lfn.weight(2), -1.0);
    }
}

#[test]
fn batch_prediction_follows_a_trained_plane() {
    let mut rng = Xoshiro256Plus::seed_from_u64(9);
    let records = generate::plane(300, &[0.5, -0.25], 0.3, &mut rng);
    let mut aln = Aln::new(3, 2).unwrap();
    let params = TrainParams::default().max_epochs(60).learn_rate(0.5);
    let report = train(&mut aln, &records, &params);
    assert!(report.rmse < 0.01);

    let (predictions, leaves) = aln
        .predict_source(&mut SampleTable::new(records.view()))
        .unwrap();
    assert_eq!(leaves.len(), records.nrows());
    for (prediction, row) in predictions.iter().zip(records.rows()) {
        assert!((prediction - row[2]).abs() < 0.05);
    }

    let predicted = aln.predict(&records);
    assert_eq!(predicted, predictions);
}

#[test]
fn lagged_inputs_are_assembled_from_earlier_rows() {
    // column 0 is a driving signal u, column 1 is y[t] = 0.5 u[t-1] + 0.3 u[t]
    let u = |t: usize| ((t * 37) % 101) as f64 / 100.0;
    let series = Array2::from_shape_fn((200, 2), |(t, j)| {
        if j == 0 {
            u(t)
        } else if t == 0 {
            0.0
        } else {
            0.5 * u(t - 1) + 0.3 * u(t)
        }
    });
    let mut table = SampleTable::new(series.view())
        .with_var_map(vec![VarRef::new(0, 1), VarRef::new(0, 0), VarRef::new(1, 0)])
        .unwrap();

    let mut aln = Aln::new(3, 2).unwrap();
    let params = TrainParams::default().max_epochs(80).learn_rate(0.5);
    let report = aln.train(&params, &mut table, |_| Signal::Continue).unwrap();

    assert!(report.rmse < 0.01);
    let lfn = aln.leaf(aln.root()).unwrap();
    assert!((lfn.weight(0) - 0.5).abs() < 0.05);
    assert!((lfn.weight(1) - 0.3).abs() < 0.05);
}
