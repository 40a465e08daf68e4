pub mod capture;
pub mod explorer;
pub mod metrics;
pub mod models;
pub mod pipeline;
pub mod sources;
pub mod storage;
pub mod utils;
