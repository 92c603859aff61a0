//! Foundational types for the scheduling and step orchestration model.
//!
//! Every type here is `Serialize + Deserialize + Debug + Clone`. Parameter
//! bags use `BTreeMap` so that serialized definitions are stable.

pub mod experiment;
pub mod goals;
pub mod parameters;

pub use experiment::*;
pub use goals::*;
pub use parameters::*;
