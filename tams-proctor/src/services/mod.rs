//! Services: backend access, ranking and submission

pub mod backend;
pub mod candidate_fetcher;
pub mod dispatcher;
pub mod ranking;
pub mod rest_backend;

pub use backend::ProctorBackend;
pub use candidate_fetcher::{CandidateFetcher, CandidateList};
pub use dispatcher::SubmissionDispatcher;
pub use ranking::{rank, suggest, Suggestion, Tier};
pub use rest_backend::RestBackend;
