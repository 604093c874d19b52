use std::sync::Arc;

use chrono::Utc;

use super::domain::{
    Application, Decision, Notification, NotificationId, NotificationType, Post, UserId,
};
use super::repository::{EntityRepository, RepositoryError};
use super::store::DocumentStore;

/// Notification dispatch error. The engine logs these and carries on; a lost
/// notification never rolls back the transition that produced it.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("notification sink unavailable: {0}")]
    Sink(#[from] RepositoryError),
}

/// Writes notification records as a side effect of workflow transitions.
/// Strictly best-effort: records are created after the primary write has
/// committed, and delivery beyond the record itself is someone else's job.
pub struct NotificationDispatcher<S> {
    repository: EntityRepository<S>,
}

impl<S: DocumentStore> NotificationDispatcher<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            repository: EntityRepository::new(store),
        }
    }

    pub fn notify(
        &self,
        user: &UserId,
        kind: NotificationType,
        title: &str,
        message: &str,
        related_id: &str,
    ) -> Result<Notification, DispatchError> {
        let notification = Notification {
            id: NotificationId::default(),
            user_id: user.clone(),
            kind,
            title: title.to_string(),
            message: message.to_string(),
            related_id: related_id.to_string(),
            read: false,
            created_at: Utc::now(),
        };
        Ok(self.repository.insert_notification(notification)?)
    }

    /// Tell the post author a new application arrived.
    pub fn application_received(
        &self,
        post: &Post,
        developer_name: &str,
    ) -> Result<Notification, DispatchError> {
        self.notify(
            &post.author_id,
            NotificationType::Application,
            "New Application",
            &format!(
                "{developer_name} applied to your post: {title}",
                title = post.title
            ),
            &post.id.0,
        )
    }

    /// Tell the developer how their application was decided.
    pub fn application_decided(
        &self,
        application: &Application,
        decision: Decision,
    ) -> Result<Notification, DispatchError> {
        let (kind, title, message) = match decision {
            Decision::Accept => (
                NotificationType::ApplicationAccepted,
                "Application Accepted!",
                format!(
                    "Congratulations! Your application for \"{title}\" has been accepted.",
                    title = application.post_title
                ),
            ),
            Decision::Reject => (
                NotificationType::ApplicationRejected,
                "Application Rejected",
                format!(
                    "Your application for \"{title}\" has been rejected.",
                    title = application.post_title
                ),
            ),
        };
        self.notify(
            &application.developer_id,
            kind,
            title,
            &message,
            &application.id.0,
        )
    }
}
