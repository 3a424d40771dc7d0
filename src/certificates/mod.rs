//! Certificate eligibility and PDF generation.
//! Uses genpdf - requires Liberation or similar fonts in standard paths.

use std::path::Path;

use genpdf::*;

use crate::domain::{PaymentStatus, Status, Submission};

/// A certificate is only issued for paid, presented (or at least
/// approved) work.
pub fn is_eligible(submission: &Submission) -> bool {
    if submission.payment != PaymentStatus::Confirmed {
        return false;
    }
    matches!(
        submission.status,
        Status::Confirmed | Status::Approved | Status::PosterSubmitted
    )
}

pub fn generate(submission: &Submission, output_path: &Path) -> Result<(), String> {
    if !is_eligible(submission) {
        return Err("submission is not eligible for a certificate".to_string());
    }

    // Try common font paths - genpdf needs actual font files for metrics
    let font_paths = [
        "/usr/share/fonts/truetype/liberation",
        "/usr/share/fonts/TTF",
        "/System/Library/Fonts/Supplemental",
        "/Library/Fonts",
    ];

    let font_family = font_paths
        .iter()
        .find(|p| Path::new(p).exists())
        .and_then(|path| {
            ["LiberationSans", "DejaVuSans", "Arial"]
                .iter()
                .find_map(|name| genpdf::fonts::from_files(*path, name, None).ok())
        })
        .ok_or_else(|| {
            "No suitable fonts found. Install: apt install fonts-liberation".to_string()
        })?;

    let mut doc = genpdf::Document::new(font_family);
    doc.set_title("Certificate of Presentation");

    let mut decorator = genpdf::SimplePageDecorator::new();
    decorator.set_margins(10);
    doc.set_page_decorator(decorator);

    let title_style = genpdf::style::Style::new().with_font_size(24);
    doc.push(genpdf::elements::Paragraph::new("Certificate of Presentation").styled(title_style));
    doc.push(genpdf::elements::Break::new(0.5));

    let mut authors = submission.content.authors_text.clone();
    if authors.is_empty() {
        authors = submission
            .content
            .coauthors
            .iter()
            .map(|c| c.name.as_str())
            .collect::<Vec<_>>()
            .join(", ");
    }
    if !authors.is_empty() {
        doc.push(genpdf::elements::Paragraph::new(&authors));
        doc.push(genpdf::elements::Break::new(0.5));
    }

    doc.push(genpdf::elements::Paragraph::new("presented the work"));

    let title = &submission.content.title;
    let title = if title.chars().count() > 80 {
        format!("{}...", title.chars().take(80).collect::<String>())
    } else {
        title.clone()
    };
    doc.push(genpdf::elements::Paragraph::new(&title));
    doc.push(genpdf::elements::Break::new(0.5));

    doc.push(genpdf::elements::Paragraph::new(submission.event.label()));
    doc.push(genpdf::elements::Break::new(0.5));

    let date = chrono::Utc::now().format("%d/%m/%Y").to_string();
    doc.push(genpdf::elements::Paragraph::new(format!("Date: {}", date)));
    doc.push(genpdf::elements::Paragraph::new(format!(
        "Certificate ID: {}",
        submission.id
    )));

    doc.render_to_file(output_path).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use uuid::Uuid;

    use super::*;
    use crate::domain::{EventTrack, Language, SubmissionContent};

    fn submission(status: Status, payment: PaymentStatus) -> Submission {
        Submission::new(
            Uuid::new_v4(),
            EventTrack::Enfrute,
            Uuid::new_v4(),
            SubmissionContent {
                title: "t".into(),
                body: String::new(),
                authors_text: String::new(),
                language: Language::Pt,
                keywords: vec![],
                coauthors: vec![],
                presenting_coauthor: None,
            },
            status,
            payment,
            Utc::now(),
        )
    }

    #[test]
    fn eligibility_requires_payment_and_a_presentable_status() {
        assert!(is_eligible(&submission(
            Status::Confirmed,
            PaymentStatus::Confirmed
        )));
        assert!(is_eligible(&submission(
            Status::Approved,
            PaymentStatus::Confirmed
        )));
        assert!(is_eligible(&submission(
            Status::PosterSubmitted,
            PaymentStatus::Confirmed
        )));

        assert!(!is_eligible(&submission(
            Status::Confirmed,
            PaymentStatus::Pending
        )));
        assert!(!is_eligible(&submission(
            Status::Submitted,
            PaymentStatus::Confirmed
        )));
        assert!(!is_eligible(&submission(
            Status::Rejected,
            PaymentStatus::Confirmed
        )));
    }
}
