//! The submission entity and its content rules.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::WorkflowError;
use super::score::ScoreSet;
use super::status::Status;
use super::{SubmissionId, UserId};

/// The two conference tracks a submission can belong to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventTrack {
    Enfrute,
    Senco,
}

impl EventTrack {
    pub const ALL: [EventTrack; 2] = [EventTrack::Enfrute, EventTrack::Senco];

    pub fn as_str(self) -> &'static str {
        match self {
            EventTrack::Enfrute => "enfrute",
            EventTrack::Senco => "senco",
        }
    }

    pub fn parse(s: &str) -> Option<EventTrack> {
        match s {
            "enfrute" => Some(EventTrack::Enfrute),
            "senco" => Some(EventTrack::Senco),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            EventTrack::Enfrute => "Enfrute - Congresso Nacional",
            EventTrack::Senco => "Senco - Seminário Catarinense de Olericultura",
        }
    }
}

impl std::fmt::Display for EventTrack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Language {
    Pt,
    En,
    Es,
}

impl Default for Language {
    fn default() -> Self {
        Language::Pt
    }
}

impl Language {
    pub fn as_str(self) -> &'static str {
        match self {
            Language::Pt => "pt",
            Language::En => "en",
            Language::Es => "es",
        }
    }

    pub fn parse(s: &str) -> Option<Language> {
        match s {
            "pt" => Some(Language::Pt),
            "en" => Some(Language::En),
            "es" => Some(Language::Es),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Confirmed,
}

impl PaymentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Confirmed => "confirmed",
        }
    }

    pub fn parse(s: &str) -> Option<PaymentStatus> {
        match s {
            "pending" => Some(PaymentStatus::Pending),
            "confirmed" => Some(PaymentStatus::Confirmed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoAuthor {
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub institution: String,
}

/// Reviewer's recommendation, recorded alongside the scores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewerDecision {
    Approved,
    ApprovedWithConsiderations,
    Rejected,
}

impl ReviewerDecision {
    pub fn as_str(self) -> &'static str {
        match self {
            ReviewerDecision::Approved => "approved",
            ReviewerDecision::ApprovedWithConsiderations => "approved_with_considerations",
            ReviewerDecision::Rejected => "rejected",
        }
    }

    pub fn parse(s: &str) -> Option<ReviewerDecision> {
        match s {
            "approved" => Some(ReviewerDecision::Approved),
            "approved_with_considerations" => Some(ReviewerDecision::ApprovedWithConsiderations),
            "rejected" => Some(ReviewerDecision::Rejected),
            _ => None,
        }
    }
}

/// Editorial decisions and the status each one targets.
///
/// A closed mapping: an unrecognized decision string fails at parse time
/// instead of falling through to some default status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EditorialDecision {
    Approve,
    Reject,
    ReturnToAuthor,
    ApprovedWithConsiderations,
    ReturnToReviewer,
    FitForReview,
    FitForPublication,
}

impl EditorialDecision {
    pub fn target_status(self) -> Status {
        match self {
            EditorialDecision::Approve => Status::Approved,
            EditorialDecision::Reject => Status::Rejected,
            EditorialDecision::ReturnToAuthor => Status::InCorrection,
            EditorialDecision::ApprovedWithConsiderations => Status::ApprovedWithConsiderations,
            EditorialDecision::ReturnToReviewer => Status::UnderReview,
            EditorialDecision::FitForReview => Status::FitForReview,
            EditorialDecision::FitForPublication => Status::FitForPublication,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EditorialDecision::Approve => "approve",
            EditorialDecision::Reject => "reject",
            EditorialDecision::ReturnToAuthor => "return_to_author",
            EditorialDecision::ApprovedWithConsiderations => "approved_with_considerations",
            EditorialDecision::ReturnToReviewer => "return_to_reviewer",
            EditorialDecision::FitForReview => "fit_for_review",
            EditorialDecision::FitForPublication => "fit_for_publication",
        }
    }

    pub fn parse(s: &str) -> Option<EditorialDecision> {
        match s {
            "approve" => Some(EditorialDecision::Approve),
            "reject" => Some(EditorialDecision::Reject),
            "return_to_author" => Some(EditorialDecision::ReturnToAuthor),
            "approved_with_considerations" => Some(EditorialDecision::ApprovedWithConsiderations),
            "return_to_reviewer" => Some(EditorialDecision::ReturnToReviewer),
            "fit_for_review" => Some(EditorialDecision::FitForReview),
            "fit_for_publication" => Some(EditorialDecision::FitForPublication),
            _ => None,
        }
    }
}

impl std::fmt::Display for EditorialDecision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryRole {
    Author,
    Reviewer,
    Editor,
}

/// One entry of the submission's message log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub role: HistoryRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub actor: UserId,
}

/// Author-editable content of a submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionContent {
    pub title: String,
    pub body: String,
    /// Free-text author line as it should appear in print; counted
    /// toward the character bounds.
    #[serde(default)]
    pub authors_text: String,
    #[serde(default)]
    pub language: Language,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub coauthors: Vec<CoAuthor>,
    /// Which co-author presents, by index; `None` means the main author.
    #[serde(default)]
    pub presenting_coauthor: Option<u8>,
}

pub const MIN_CHARS: usize = 3000;
pub const MAX_CHARS: usize = 4000;
pub const MIN_KEYWORDS: usize = 3;
pub const MAX_KEYWORDS: usize = 5;
pub const MAX_AUTHORS: usize = 6;

impl SubmissionContent {
    /// Combined length of title, body and author line, in characters.
    pub fn char_count(&self) -> usize {
        self.title.chars().count() + 1 + self.body.chars().count() + 1
            + self.authors_text.chars().count()
    }

    /// Drop empty keywords and co-authors without a name.
    pub fn normalize(&mut self) {
        self.keywords.retain(|k| !k.trim().is_empty());
        self.coauthors.retain(|c| !c.name.trim().is_empty());
    }

    /// Full content rules, applied to everything except drafts.
    pub fn validate(&self) -> Result<(), WorkflowError> {
        let count = self.char_count();
        if !(MIN_CHARS..=MAX_CHARS).contains(&count) {
            return Err(WorkflowError::Validation(format!(
                "text must be between {} and {} characters (currently {})",
                MIN_CHARS, MAX_CHARS, count
            )));
        }

        if !(MIN_KEYWORDS..=MAX_KEYWORDS).contains(&self.keywords.len()) {
            return Err(WorkflowError::Validation(format!(
                "between {} and {} keywords required",
                MIN_KEYWORDS, MAX_KEYWORDS
            )));
        }

        self.validate_authors()
    }

    /// Author-count bound; applies to drafts as well.
    pub fn validate_authors(&self) -> Result<(), WorkflowError> {
        let total = 1 + self.coauthors.len();
        if total > MAX_AUTHORS {
            return Err(WorkflowError::Validation(format!(
                "at most {} authors per abstract",
                MAX_AUTHORS
            )));
        }
        if let Some(index) = self.presenting_coauthor {
            if usize::from(index) >= self.coauthors.len() {
                return Err(WorkflowError::Validation(
                    "presenting co-author index out of range".into(),
                ));
            }
        }
        Ok(())
    }
}

/// The central entity: one scientific abstract tied to one event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    pub id: SubmissionId,
    pub event: EventTrack,
    pub author: UserId,
    pub content: SubmissionContent,
    pub status: Status,
    pub payment: PaymentStatus,
    pub reviewer: Option<UserId>,
    pub scores: Option<ScoreSet>,
    pub ranking_score: f64,
    pub reviewer_decision: Option<ReviewerDecision>,
    pub reviewer_notes: Option<String>,
    pub editorial_decision: Option<EditorialDecision>,
    pub editorial_notes: Option<String>,
    pub history: Vec<HistoryEntry>,
    /// Host-owned reference to the uploaded poster document.
    pub poster: Option<String>,
    pub selected_for_presentation: bool,
    pub presentation_confirmed: bool,
    pub confirmation_deadline: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Submission {
    pub fn new(
        id: SubmissionId,
        event: EventTrack,
        author: UserId,
        content: SubmissionContent,
        status: Status,
        payment: PaymentStatus,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            event,
            author,
            content,
            status,
            payment,
            reviewer: None,
            scores: None,
            ranking_score: 0.0,
            reviewer_decision: None,
            reviewer_notes: None,
            editorial_decision: None,
            editorial_notes: None,
            history: Vec::new(),
            poster: None,
            selected_for_presentation: false,
            presentation_confirmed: false,
            confirmation_deadline: None,
            created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn content(chars: usize, keywords: usize, coauthors: usize) -> SubmissionContent {
        SubmissionContent {
            title: "T".repeat(40),
            // char_count adds the title, the author line and two separators.
            body: "b".repeat(chars.saturating_sub(40 + 10 + 2)),
            authors_text: "a".repeat(10),
            language: Language::Pt,
            keywords: (0..keywords).map(|i| format!("kw{}", i)).collect(),
            coauthors: (0..coauthors)
                .map(|i| CoAuthor {
                    name: format!("Co Author {}", i),
                    email: String::new(),
                    institution: String::new(),
                })
                .collect(),
            presenting_coauthor: None,
        }
    }

    #[test]
    fn char_bounds_are_inclusive() {
        assert!(content(MIN_CHARS, 3, 0).validate().is_ok());
        assert!(content(MAX_CHARS, 3, 0).validate().is_ok());
        assert!(content(MIN_CHARS - 1, 3, 0).validate().is_err());
        assert!(content(MAX_CHARS + 1, 3, 0).validate().is_err());
    }

    #[test]
    fn keyword_bounds() {
        assert!(content(3500, 2, 0).validate().is_err());
        assert!(content(3500, 3, 0).validate().is_ok());
        assert!(content(3500, 5, 0).validate().is_ok());
        assert!(content(3500, 6, 0).validate().is_err());
    }

    #[test]
    fn author_count_bound_counts_the_main_author() {
        assert!(content(3500, 3, 5).validate().is_ok());
        assert!(content(3500, 3, 6).validate().is_err());
    }

    #[test]
    fn presenting_coauthor_must_exist() {
        let mut c = content(3500, 3, 2);
        c.presenting_coauthor = Some(1);
        assert!(c.validate().is_ok());
        c.presenting_coauthor = Some(2);
        assert!(c.validate().is_err());
    }

    #[test]
    fn normalize_drops_blank_entries() {
        let mut c = content(3500, 3, 1);
        c.keywords.push("   ".into());
        c.coauthors.push(CoAuthor {
            name: "".into(),
            email: "x@y.z".into(),
            institution: String::new(),
        });
        c.normalize();
        assert_eq!(c.keywords.len(), 3);
        assert_eq!(c.coauthors.len(), 1);
    }

    #[test]
    fn editorial_decision_table_is_closed() {
        for (raw, status) in [
            ("approve", Status::Approved),
            ("reject", Status::Rejected),
            ("return_to_author", Status::InCorrection),
            (
                "approved_with_considerations",
                Status::ApprovedWithConsiderations,
            ),
            ("return_to_reviewer", Status::UnderReview),
            ("fit_for_review", Status::FitForReview),
            ("fit_for_publication", Status::FitForPublication),
        ] {
            let decision = EditorialDecision::parse(raw).expect(raw);
            assert_eq!(decision.target_status(), status);
        }
        assert_eq!(EditorialDecision::parse("publish"), None);
    }
}
