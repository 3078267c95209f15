pub mod prediction;
pub mod staging;
