use crate::app::ports::{Notifier, TaskFailure};
use crate::error::Result;
use async_trait::async_trait;
use serde::Serialize;
use tracing::{error, warn};

#[derive(Serialize)]
struct FailureEmail<'a> {
    to: &'a [String],
    subject: String,
    body: String,
}

/// Sends task-failure emails through an HTTP mail relay; without a relay the
/// notification is only logged.
pub struct EmailNotifier {
    recipients: Vec<String>,
    relay_url: Option<String>,
    client: reqwest::Client,
}

impl EmailNotifier {
    pub fn new(recipients: Vec<String>, relay_url: Option<String>) -> Self {
        Self {
            recipients,
            relay_url,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl Notifier for EmailNotifier {
    async fn task_failed(&self, failure: &TaskFailure) -> Result<()> {
        let subject = format!(
            "[{}] task {} failed for {}",
            failure.dag_id, failure.task_id, failure.run_date
        );
        error!(
            dag_id = %failure.dag_id,
            owner = %failure.owner,
            task_id = %failure.task_id,
            run_date = %failure.run_date,
            attempts = failure.attempts,
            recipients = ?self.recipients,
            error = %failure.error,
            "Task failed"
        );

        let Some(url) = &self.relay_url else {
            return Ok(());
        };
        if self.recipients.is_empty() {
            warn!("Mail relay configured without recipients; skipping failure email");
            return Ok(());
        }

        let email = FailureEmail {
            to: &self.recipients,
            subject,
            body: format!(
                "Task {} of {} (owner {}) failed after {} attempt(s).\n\n{}",
                failure.task_id, failure.dag_id, failure.owner, failure.attempts, failure.error
            ),
        };
        self.client
            .post(url)
            .json(&email)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}
