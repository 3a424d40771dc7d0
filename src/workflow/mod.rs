//! Actor-facing operations. Each one validates authorization and phase,
//! funnels every status change through the status machine, and returns an
//! [`Outcome`](crate::domain::Outcome) carrying the notifications to relay.

pub mod editorial;
pub mod poster;
pub mod review;
pub mod submission;

pub use editorial::EditorialWorkflow;
pub use poster::PosterWorkflow;
pub use review::ReviewWorkflow;
pub use submission::{NewSubmission, SubmissionWorkflow};
