pub mod calls;
pub mod dataset;
