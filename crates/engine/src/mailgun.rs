use async_trait::async_trait;
use shared_types::{AppError, Problem};

use crate::collaborators::{Notifier, ValidationFailureNotice};

// --- Environment helpers ---

fn mailgun_api_key() -> Result<String, AppError> {
    std::env::var("MAILGUN_API_KEY")
        .map_err(|_| AppError::internal("MAILGUN_API_KEY is not configured"))
}

fn mailgun_domain() -> Result<String, AppError> {
    std::env::var("MAILGUN_DOMAIN")
        .map_err(|_| AppError::internal("MAILGUN_DOMAIN is not configured"))
}

fn mailgun_from() -> Result<String, AppError> {
    match std::env::var("MAILGUN_FROM") {
        Ok(v) => Ok(v),
        Err(_) => Ok(format!("Case Intake <noreply@{}>", mailgun_domain()?)),
    }
}

// --- Notifier ---

/// Sends validation-failure notices through the Mailgun HTTP API.
#[derive(Clone)]
pub struct MailgunNotifier {
    client: reqwest::Client,
    subject_prefix: String,
}

impl MailgunNotifier {
    pub fn new(subject_prefix: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            subject_prefix: subject_prefix.into(),
        }
    }

    #[tracing::instrument(skip(self, html_body))]
    pub async fn send_email(&self, to: &str, subject: &str, html_body: &str) -> Result<(), AppError> {
        let domain = mailgun_domain()?;
        let url = format!("https://api.mailgun.net/v3/{}/messages", domain);

        let response = self
            .client
            .post(&url)
            .basic_auth("api", Some(mailgun_api_key()?))
            .form(&[
                ("from", mailgun_from()?),
                ("to", to.to_string()),
                ("subject", subject.to_string()),
                ("html", html_body.to_string()),
            ])
            .send()
            .await
            .map_err(|e| AppError::unavailable(format!("Mailgun request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = format!("Mailgun API error ({}): {}", status, body);
            return Err(if status.is_server_error() || status.as_u16() == 429 {
                AppError::unavailable(message)
            } else {
                AppError::internal(message)
            });
        }

        tracing::info!(to = to, subject = subject, "Email sent successfully");
        Ok(())
    }
}

#[async_trait]
impl Notifier for MailgunNotifier {
    async fn send_validation_failure(
        &self,
        notice: &ValidationFailureNotice,
    ) -> Result<(), AppError> {
        let subject = format!(
            "{} Submission {} failed validation",
            self.subject_prefix, notice.urn
        );
        let html = templates::validation_failure_html(&notice.urn, &notice.problems);
        self.send_email(&notice.recipient, &subject, &html).await
    }
}

// --- Email templates ---

mod templates {
    use super::Problem;
    use shared_types::Scope;

    fn scope_label(problem: &Problem) -> String {
        match problem.scope {
            Scope::Case => "Case".to_string(),
            Scope::Defendant { defendant_id } => format!("Defendant {}", defendant_id),
            Scope::Offence {
                defendant_id,
                offence_sequence,
            } => format!("Defendant {} offence {}", defendant_id, offence_sequence),
        }
    }

    pub fn validation_failure_html(urn: &str, problems: &[Problem]) -> String {
        let rows: String = problems
            .iter()
            .map(|p| {
                let evidence = p
                    .values
                    .iter()
                    .map(|v| format!("{}={}", v.key, v.value))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!(
                    r#"<tr><td style="padding: 6px; border-bottom: 1px solid #ccc;">{}</td><td style="padding: 6px; border-bottom: 1px solid #ccc;">{}</td><td style="padding: 6px; border-bottom: 1px solid #ccc;">{}</td></tr>"#,
                    scope_label(p),
                    p.code,
                    evidence
                )
            })
            .collect();
        format!(
            r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"></head>
<body style="font-family: Arial, sans-serif; padding: 20px;">
  <div style="max-width: 640px; margin: 0 auto;">
    <h1>Submission {urn} needs correction</h1>
    <p>The following problems must be corrected before the case can be created:</p>
    <table style="width: 100%; border-collapse: collapse;">
      <tr><th align="left">Scope</th><th align="left">Problem</th><th align="left">Details</th></tr>
      {rows}
    </table>
  </div>
</body>
</html>"#,
            urn = urn,
            rows = rows
        )
    }
}
