pub mod jobs;
pub mod queue_job;
pub mod queue_status;
pub mod replicate_callback;
pub mod workers;
