//! Feature transformation: imputation, one-hot encoding and scaling.

pub mod categorical;
pub mod numeric;
pub mod preprocessor;

pub use categorical::CategoricalColumn;
pub use numeric::NumericColumn;
pub use preprocessor::{FittedColumns, Preprocessor, PreprocessorState};
