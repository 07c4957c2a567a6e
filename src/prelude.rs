//! linfa-aln prelude.
//!
//! This module contains the most used types, type aliases, traits and
//! functions that you can import easily as a group.
//!

#[doc(no_inline)]
pub use crate::error::{AlnError, Result};

#[doc(no_inline)]
pub use crate::traits::*;

#[doc(no_inline)]
pub use crate::param_guard::ParamGuard;

#[doc(no_inline)]
pub use crate::dataset::{FnSource, SampleSource, SampleTable, VarRef};

#[doc(no_inline)]
pub use crate::model::{Aln, MinMaxOp, Monotonicity, NodeId};

#[doc(no_inline)]
pub use crate::train::{Event, Signal, StopReason, TrainParams, TrainReport};

#[doc(no_inline)]
pub use crate::dtree::{DecisionTree, DtreeParams};
