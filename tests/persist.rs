#![cfg(feature = "serde")]

use aln_datasets::generate;
use linfa_aln::dataset::SampleTable;
use linfa_aln::prelude::*;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256Plus;
use std::fs::File;
use std::io::{BufReader, BufWriter};

#[test]
fn saved_network_predicts_the_same() {
    let mut rng = Xoshiro256Plus::seed_from_u64(5);
    let records = generate::abs_1d(200, &mut rng);
    let mut aln = Aln::new(2, 1).unwrap();
    aln.region_mut().set_smoothing_epsilon(0.01).unwrap();
    aln.set_growable(aln.root(), true).unwrap();
    let params = TrainParams::default().max_epochs(40);
    aln.train(&params, &mut SampleTable::new(records.view()), |_| {
        Signal::Continue
    })
    .unwrap();

    let path = std::env::temp_dir().join(format!("linfa-aln-{}.json", std::process::id()));
    aln.save(BufWriter::new(File::create(&path).unwrap()))
        .unwrap();
    let restored = Aln::load(BufReader::new(File::open(&path).unwrap())).unwrap();
    std::fs::remove_file(&path).unwrap();

    assert_eq!(restored, aln);
    assert_eq!(restored.predict(&records), aln.predict(&records));
}

#[test]
fn restored_network_keeps_training() {
    let mut rng = Xoshiro256Plus::seed_from_u64(6);
    let records = generate::plane(100, &[1.5], -0.2, &mut rng);
    let mut aln = Aln::new(2, 1).unwrap();
    let params = TrainParams::default().max_epochs(5);
    aln.train(&params, &mut SampleTable::new(records.view()), |_| {
        Signal::Continue
    })
    .unwrap();

    let mut restored = Aln::from_json(&aln.to_json().unwrap()).unwrap();
    let params = TrainParams::default().max_epochs(50).learn_rate(0.5);
    let report = restored
        .train(&params, &mut SampleTable::new(records.view()), |_| {
            Signal::Continue
        })
        .unwrap();
    assert!(report.rmse < 0.01);
}
