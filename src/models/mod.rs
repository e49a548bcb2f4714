//! Data models for cvharvest.

mod candidate;
mod job;

pub use candidate::{Candidate, ResumeExtraction};
pub use job::{progress_percent, BatchRequest, JobState, JobStatus, RemoteFileRef};
