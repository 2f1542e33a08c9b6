//! Pure domain logic shared by the genflow server and listener.
//!
//! No I/O lives here: job type grammar, job status lifecycle, queue payload
//! contract, storage naming, change filters, event names, and the realtime
//! channel wire format.

pub mod change_filter;
pub mod error;
pub mod job_events;
pub mod job_status;
pub mod job_type;
pub mod queue;
pub mod realtime;
pub mod storage;
pub mod types;
