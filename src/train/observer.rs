//! Progress notifications and cooperative cancellation of a training run

/// A point in the training loop at which the observer is notified
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Event {
    /// Before the first epoch
    RunStart { max_epochs: usize, n_samples: usize },
    EpochStart { epoch: usize },
    /// Before the vector of `row` is fetched and adapted to
    AdaptStart { epoch: usize, row: usize },
    /// After the network adapted to `row`; `distance` is the error before the adaptation
    AdaptEnd {
        epoch: usize,
        row: usize,
        distance: f64,
    },
    EpochEnd { epoch: usize, rmse: f64 },
    /// After the last epoch, with the reason training stopped
    RunEnd { epochs: usize, stop: StopReason },
}

/// Answer of the observer to an event
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Signal {
    Continue,
    /// Stop the run at this event; the network is left in a consistent state
    Abort,
}

/// Why a training run ended
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StopReason {
    /// The epoch budget was used up
    MaxEpochs,
    /// The epoch RMSE dropped below the requested level
    RmseReached,
    /// Every growable leaf fits its samples and was frozen
    AllFrozen,
    /// The observer asked to stop
    Aborted,
}

/// Summary of a training run
#[derive(Clone, Debug, PartialEq)]
pub struct TrainReport {
    /// Number of epochs completed
    pub epochs: usize,
    /// RMSE of the last completed epoch, `NaN` if none completed
    pub rmse: f64,
    pub stop: StopReason,
    /// Number of growable leaves split during the run
    pub splits: usize,
    /// Number of growable leaves frozen during the run
    pub frozen: usize,
}
