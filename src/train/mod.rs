//! Online training of a network
//!
//! Training runs in epochs. Each epoch adapts the pieces to every sample in random order:
//! the error of the network at a sample is passed down the tree, each MIN/MAX node handing
//! it to its active child (both children share it inside a fillet), and the responsible
//! pieces move towards the sample. Periodically the growable leaves are tested on a clean
//! pass over the data and either split or frozen.
mod adapt;
mod algorithm;
mod hyperparams;
mod observer;
mod split;

pub use hyperparams::{TrainParams, TrainValidParams};
pub use observer::{Event, Signal, StopReason, TrainReport};
