//! Column profiling.
//!
//! Classification is a pure function of a column's current contents and is
//! recomputed every time a stage needs it.

mod type_inference;

pub use type_inference::{CategoricalLimits, classify_column};
