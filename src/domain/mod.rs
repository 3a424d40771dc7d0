pub mod error;
pub mod outcome;
pub mod score;
pub mod status;
pub mod submission;

pub use error::WorkflowError;
pub use outcome::{Notification, Outcome};
pub use score::{aggregate, RankingWeights, ScoreSet};
pub use status::{Status, StatusChanged, StatusMachine};
pub use submission::{
    CoAuthor, EditorialDecision, EventTrack, HistoryEntry, HistoryRole, Language, PaymentStatus,
    ReviewerDecision, Submission, SubmissionContent,
};

use uuid::Uuid;

pub type SubmissionId = Uuid;
pub type UserId = Uuid;
