//! Notification rendering and dispatch.
//!
//! The core hands over a [`Notification`] and the submission it concerns;
//! this module renders the message body from a tera template and passes it
//! to the delivery side (here: the log; a real deployment points an SMTP
//! relay at the same output). Delivery is fire-and-forget. A failure is
//! logged and never reaches the workflow result.

use tera::{Context, Tera};

use crate::domain::{Notification, Submission};

const TEMPLATES: [(&str, &str); 7] = [
    (
        "new_submission.html",
        include_str!("../../templates/email/new_submission.html"),
    ),
    (
        "assigned_reviewer.html",
        include_str!("../../templates/email/assigned_reviewer.html"),
    ),
    (
        "review_complete.html",
        include_str!("../../templates/email/review_complete.html"),
    ),
    (
        "editorial_decision.html",
        include_str!("../../templates/email/editorial_decision.html"),
    ),
    (
        "returned_to_reviewer.html",
        include_str!("../../templates/email/returned_to_reviewer.html"),
    ),
    (
        "poster_request.html",
        include_str!("../../templates/email/poster_request.html"),
    ),
    (
        "confirmation_needed.html",
        include_str!("../../templates/email/confirmation_needed.html"),
    ),
];

pub struct Notifier {
    tera: Tera,
    dashboard_url: String,
}

impl Notifier {
    pub fn new(dashboard_url: String) -> Result<Self, tera::Error> {
        let mut tera = Tera::default();
        tera.add_raw_templates(TEMPLATES)?;
        Ok(Self {
            tera,
            dashboard_url,
        })
    }

    fn template_and_subject(notification: &Notification) -> (&'static str, String) {
        match notification {
            Notification::NewSubmission { event, .. } => (
                "new_submission.html",
                format!("New abstract submitted to {}", event.label()),
            ),
            Notification::AssignedReviewer { .. } => (
                "assigned_reviewer.html",
                "An abstract was assigned to you for review".to_string(),
            ),
            Notification::ReviewComplete { .. } => (
                "review_complete.html",
                "Review complete, editorial decision needed".to_string(),
            ),
            Notification::EditorialDecision { decision, .. } => (
                "editorial_decision.html",
                format!("Editorial decision on your abstract: {}", decision),
            ),
            Notification::ReturnedToReviewer { .. } => (
                "returned_to_reviewer.html",
                "An abstract was returned for another review round".to_string(),
            ),
            Notification::PosterRequest { .. } => (
                "poster_request.html",
                "Your abstract was approved, please send the poster".to_string(),
            ),
            Notification::ConfirmationNeeded { .. } => (
                "confirmation_needed.html",
                "Presentation slot offered, confirmation needed".to_string(),
            ),
        }
    }

    fn context(&self, notification: &Notification, submission: &Submission) -> Context {
        let mut ctx = Context::new();
        ctx.insert("title", &submission.content.title);
        ctx.insert("event", submission.event.label());
        ctx.insert("submission_id", &submission.id);
        ctx.insert("dashboard_url", &self.dashboard_url);

        match notification {
            Notification::EditorialDecision { decision, notes, .. } => {
                ctx.insert("decision", decision.as_str());
                ctx.insert("notes", notes);
            }
            Notification::ConfirmationNeeded { deadline, .. } => {
                ctx.insert("deadline", &deadline.format("%d/%m/%Y %H:%M UTC").to_string());
            }
            Notification::AssignedReviewer { reviewer, .. } => {
                ctx.insert("reviewer", reviewer);
            }
            _ => {}
        }
        ctx
    }

    /// Render and hand off one notification. Never fails the caller.
    pub fn dispatch(&self, notification: &Notification, submission: &Submission) {
        let (template, subject) = Self::template_and_subject(notification);
        let ctx = self.context(notification, submission);

        match self.tera.render(template, &ctx) {
            Ok(body) => {
                tracing::info!(
                    submission = %submission.id,
                    %subject,
                    body_bytes = body.len(),
                    "notification queued"
                );
            }
            Err(err) => {
                tracing::error!(submission = %submission.id, %err, "notification render failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use uuid::Uuid;

    use super::*;
    use crate::domain::{
        EventTrack, Language, PaymentStatus, Status, Submission, SubmissionContent,
    };

    fn submission() -> Submission {
        Submission::new(
            Uuid::new_v4(),
            EventTrack::Senco,
            Uuid::new_v4(),
            SubmissionContent {
                title: "On the cultivation of onions".into(),
                body: String::new(),
                authors_text: String::new(),
                language: Language::Pt,
                keywords: vec![],
                coauthors: vec![],
                presenting_coauthor: None,
            },
            Status::Approved,
            PaymentStatus::Confirmed,
            Utc::now(),
        )
    }

    #[test]
    fn every_notification_kind_renders() {
        let notifier = Notifier::new("https://example.org/dashboard".into()).unwrap();
        let sub = submission();
        let deadline = Utc::now();

        let all = [
            Notification::NewSubmission {
                submission_id: sub.id,
                event: sub.event,
            },
            Notification::AssignedReviewer {
                submission_id: sub.id,
                reviewer: Uuid::new_v4(),
            },
            Notification::ReviewComplete { submission_id: sub.id },
            Notification::EditorialDecision {
                submission_id: sub.id,
                decision: crate::domain::EditorialDecision::Approve,
                notes: "well done".into(),
            },
            Notification::ReturnedToReviewer { submission_id: sub.id },
            Notification::PosterRequest { submission_id: sub.id },
            Notification::ConfirmationNeeded {
                submission_id: sub.id,
                deadline,
            },
        ];

        for notification in &all {
            let (template, _) = Notifier::template_and_subject(notification);
            let ctx = notifier.context(notification, &sub);
            notifier
                .tera
                .render(template, &ctx)
                .unwrap_or_else(|e| panic!("{} failed: {}", template, e));
        }
    }
}
