pub mod metrics;
pub mod recovery;
pub mod request_id;
