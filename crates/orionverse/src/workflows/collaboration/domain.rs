use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier wrapper for platform users. Identity itself is owned by an
/// external provider; the engine only ever sees the id and a display name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub String);

/// Identifier wrapper for published posts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PostId(pub String);

/// Identifier wrapper for submitted applications.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ApplicationId(pub String);

/// Identifier wrapper for tracked engagements.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProjectId(pub String);

/// Identifier wrapper for notification records.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NotificationId(pub String);

/// The authenticated identity attached to a mutating call. Supplied by the
/// identity layer and trusted as given; every workflow operation that writes
/// takes one so ownership checks happen before any document changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub id: UserId,
    pub name: String,
}

impl Caller {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: UserId(id.into()),
            name: name.into(),
        }
    }
}

/// Category of a published post.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PostType {
    Problem,
    Solution,
    General,
}

impl PostType {
    pub const fn label(self) -> &'static str {
        match self {
            PostType::Problem => "problem",
            PostType::Solution => "solution",
            PostType::General => "general",
        }
    }
}

/// A unit of work published by an author. Immutable after publication except
/// for the denormalized applications counter and, through the edit flow,
/// title/description/tags.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    #[serde(skip)]
    pub id: PostId,
    pub author_id: UserId,
    pub author_name: String,
    pub title: String,
    pub description: String,
    pub post_type: PostType,
    pub tags: Vec<String>,
    pub applications_count: u32,
    pub created_at: DateTime<Utc>,
}

impl Post {
    /// Canonical gating rule: only problem posts take applications.
    pub const fn accepts_applications(&self) -> bool {
        matches!(self.post_type, PostType::Problem)
    }
}

/// Author-supplied content for a new post.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostDraft {
    pub title: String,
    pub description: String,
    pub post_type: PostType,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Partial edit of the author-mutable post fields. Absent fields are left
/// untouched.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostEdit {
    pub title: Option<String>,
    pub description: Option<String>,
    pub tags: Option<Vec<String>>,
}

/// Lifecycle of an application. Both decided states are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApplicationStatus {
    Pending,
    Accepted,
    Rejected,
}

impl ApplicationStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ApplicationStatus::Pending => "pending",
            ApplicationStatus::Accepted => "accepted",
            ApplicationStatus::Rejected => "rejected",
        }
    }

    pub const fn is_decided(self) -> bool {
        !matches!(self, ApplicationStatus::Pending)
    }
}

/// The author's ruling on a pending application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Decision {
    Accept,
    Reject,
}

impl Decision {
    pub const fn status(self) -> ApplicationStatus {
        match self {
            Decision::Accept => ApplicationStatus::Accepted,
            Decision::Reject => ApplicationStatus::Rejected,
        }
    }
}

/// A developer's proposal against exactly one post. The post title and author
/// id are point-in-time snapshots taken when the application is created; a
/// later rename of the post does not rewrite them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    #[serde(skip)]
    pub id: ApplicationId,
    pub post_id: PostId,
    pub post_title: String,
    pub post_author_id: UserId,
    pub developer_id: UserId,
    pub developer_name: String,
    pub proposal: String,
    pub status: ApplicationStatus,
    pub applied_at: DateTime<Utc>,
}

/// Lifecycle of a tracked engagement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProjectStatus {
    Pending,
    InProgress,
    Completed,
    Cancelled,
}

impl ProjectStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ProjectStatus::Pending => "pending",
            ProjectStatus::InProgress => "in_progress",
            ProjectStatus::Completed => "completed",
            ProjectStatus::Cancelled => "cancelled",
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, ProjectStatus::Completed | ProjectStatus::Cancelled)
    }

    /// Legal moves: pending -> in_progress -> completed, with cancellation
    /// available from either non-terminal state.
    pub const fn can_transition_to(self, next: ProjectStatus) -> bool {
        matches!(
            (self, next),
            (ProjectStatus::Pending, ProjectStatus::InProgress)
                | (ProjectStatus::InProgress, ProjectStatus::Completed)
                | (ProjectStatus::Pending, ProjectStatus::Cancelled)
                | (ProjectStatus::InProgress, ProjectStatus::Cancelled)
        )
    }
}

/// The engagement spawned by an accepted application. Post description and
/// the participant names are snapshots taken at acceptance time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingProject {
    #[serde(skip)]
    pub id: ProjectId,
    pub post_id: PostId,
    pub post_title: String,
    pub post_description: String,
    pub author_id: UserId,
    pub author_name: String,
    pub developer_id: UserId,
    pub developer_name: String,
    pub application_id: ApplicationId,
    pub status: ProjectStatus,
    pub accepted_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl PendingProject {
    pub fn involves(&self, user: &UserId) -> bool {
        &self.author_id == user || &self.developer_id == user
    }
}

/// Kind of workflow event a notification describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationType {
    Application,
    ApplicationAccepted,
    ApplicationRejected,
    NewApplication,
    General,
}

impl NotificationType {
    pub const fn label(self) -> &'static str {
        match self {
            NotificationType::Application => "application",
            NotificationType::ApplicationAccepted => "application_accepted",
            NotificationType::ApplicationRejected => "application_rejected",
            NotificationType::NewApplication => "new_application",
            NotificationType::General => "general",
        }
    }
}

/// Best-effort, at-least-once record of a workflow event for one recipient.
/// Only the recipient flips the read flag; records are never deleted by the
/// engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    #[serde(skip)]
    pub id: NotificationId,
    pub user_id: UserId,
    #[serde(rename = "type")]
    pub kind: NotificationType,
    pub title: String,
    pub message: String,
    pub related_id: String,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}
