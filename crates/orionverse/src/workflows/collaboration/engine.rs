use std::sync::Arc;

use chrono::Utc;
use tracing::warn;

use super::dispatch::NotificationDispatcher;
use super::domain::{
    Application, ApplicationId, ApplicationStatus, Caller, Decision, Notification, NotificationId,
    PendingProject, Post, PostDraft, PostEdit, PostId, ProjectId, ProjectStatus, UserId,
};
use super::repository::{EntityRepository, RepositoryError};
use super::store::DocumentStore;

/// The entity a `NotFound` failure refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Post,
    Application,
    Project,
    Notification,
}

impl EntityKind {
    pub const fn label(self) -> &'static str {
        match self {
            EntityKind::Post => "post",
            EntityKind::Application => "application",
            EntityKind::Project => "project",
            EntityKind::Notification => "notification",
        }
    }
}

/// Error raised by the workflow engine. One human-readable message per kind;
/// partial success is never reported as success.
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("{} not found", .0.label())]
    NotFound(EntityKind),
    #[error("you have already applied to this post")]
    DuplicateApplication,
    #[error("this application has already been decided")]
    AlreadyDecided,
    #[error("authors cannot apply to their own posts")]
    SelfApplication,
    #[error("this post does not accept applications")]
    NotAccepting,
    #[error("a title is required")]
    EmptyTitle,
    #[error("a description is required")]
    EmptyDescription,
    #[error("a proposal is required")]
    EmptyProposal,
    #[error("project cannot move from {} to {}", .from.label(), .to.label())]
    InvalidTransition {
        from: ProjectStatus,
        to: ProjectStatus,
    },
    #[error("you are not allowed to perform this action")]
    Unauthorized,
    #[error(transparent)]
    Storage(#[from] RepositoryError),
}

/// The collaboration state machine: posts take applications, accepted
/// applications spawn tracked projects, and every transition fans out
/// best-effort notifications to the parties involved.
///
/// All writes go through store primitives that are atomic on their own, so
/// concurrent actors cannot double-apply, double-decide, or lose counter
/// updates; there is no cross-call locking anywhere in the engine.
pub struct WorkflowEngine<S> {
    repository: EntityRepository<S>,
    dispatcher: NotificationDispatcher<S>,
}

impl<S: DocumentStore> WorkflowEngine<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            repository: EntityRepository::new(store.clone()),
            dispatcher: NotificationDispatcher::new(store),
        }
    }

    /// Publish a new post owned by the caller.
    pub fn publish_post(&self, caller: &Caller, draft: PostDraft) -> Result<Post, WorkflowError> {
        let title = draft.title.trim();
        if title.is_empty() {
            return Err(WorkflowError::EmptyTitle);
        }
        let description = draft.description.trim();
        if description.is_empty() {
            return Err(WorkflowError::EmptyDescription);
        }

        let post = Post {
            id: PostId::default(),
            author_id: caller.id.clone(),
            author_name: caller.name.clone(),
            title: title.to_string(),
            description: description.to_string(),
            post_type: draft.post_type,
            tags: normalize_tags(&draft.tags),
            applications_count: 0,
            created_at: Utc::now(),
        };
        Ok(self.repository.insert_post(post)?)
    }

    /// Edit the author-mutable fields of an existing post.
    pub fn edit_post(
        &self,
        caller: &Caller,
        post_id: &PostId,
        edit: PostEdit,
    ) -> Result<Post, WorkflowError> {
        let mut post = self
            .repository
            .post(post_id)?
            .ok_or(WorkflowError::NotFound(EntityKind::Post))?;
        if post.author_id != caller.id {
            return Err(WorkflowError::Unauthorized);
        }

        let title = edit.title.as_deref().map(str::trim);
        if title.is_some_and(str::is_empty) {
            return Err(WorkflowError::EmptyTitle);
        }
        let description = edit.description.as_deref().map(str::trim);
        if description.is_some_and(str::is_empty) {
            return Err(WorkflowError::EmptyDescription);
        }
        let tags = edit.tags.as_deref().map(normalize_tags);

        self.repository
            .update_post_content(post_id, title, description, tags.as_deref())?;

        if let Some(title) = title {
            post.title = title.to_string();
        }
        if let Some(description) = description {
            post.description = description.to_string();
        }
        if let Some(tags) = tags {
            post.tags = tags;
        }
        Ok(post)
    }

    /// Submit an application against a post on behalf of the caller.
    ///
    /// The application write, the counter move, and the author notification
    /// happen in that order; a failed notification leaves a perfectly valid
    /// application behind.
    pub fn apply(
        &self,
        caller: &Caller,
        post_id: &PostId,
        proposal: &str,
    ) -> Result<Application, WorkflowError> {
        let proposal = proposal.trim();
        if proposal.is_empty() {
            return Err(WorkflowError::EmptyProposal);
        }

        let post = self
            .repository
            .post(post_id)?
            .ok_or(WorkflowError::NotFound(EntityKind::Post))?;
        if !post.accepts_applications() {
            return Err(WorkflowError::NotAccepting);
        }
        if post.author_id == caller.id {
            return Err(WorkflowError::SelfApplication);
        }

        let application = Application {
            id: ApplicationId::default(),
            post_id: post.id.clone(),
            post_title: post.title.clone(),
            post_author_id: post.author_id.clone(),
            developer_id: caller.id.clone(),
            developer_name: caller.name.clone(),
            proposal: proposal.to_string(),
            status: ApplicationStatus::Pending,
            applied_at: Utc::now(),
        };
        let application = match self.repository.insert_application(application) {
            Ok(stored) => stored,
            Err(RepositoryError::Duplicate) => return Err(WorkflowError::DuplicateApplication),
            Err(other) => return Err(other.into()),
        };

        match self.repository.bump_applications_count(post_id, 1) {
            Ok(_) => {}
            Err(RepositoryError::NotFound) => {
                warn!(
                    post_id = %post_id.0,
                    "post vanished before its applications counter could move"
                );
            }
            Err(other) => return Err(other.into()),
        }

        if let Err(err) = self.dispatcher.application_received(&post, &caller.name) {
            warn!(
                post_id = %post_id.0,
                error = %err,
                "could not notify the author about a new application"
            );
        }

        Ok(application)
    }

    /// Accept or reject a pending application. Author-only.
    ///
    /// The status write is conditional on the application still being
    /// pending, so of two racing decisions exactly one lands; the loser gets
    /// `AlreadyDecided` and produces no notification and no project.
    pub fn decide(
        &self,
        caller: &Caller,
        application_id: &ApplicationId,
        decision: Decision,
    ) -> Result<Application, WorkflowError> {
        let mut application = self
            .repository
            .application(application_id)?
            .ok_or(WorkflowError::NotFound(EntityKind::Application))?;
        if application.post_author_id != caller.id {
            return Err(WorkflowError::Unauthorized);
        }
        if application.status.is_decided() {
            return Err(WorkflowError::AlreadyDecided);
        }

        let next = decision.status();
        let applied = match self.repository.transition_application(application_id, next) {
            Ok(applied) => applied,
            Err(RepositoryError::NotFound) => {
                return Err(WorkflowError::NotFound(EntityKind::Application))
            }
            Err(other) => return Err(other.into()),
        };
        if !applied {
            return Err(WorkflowError::AlreadyDecided);
        }
        application.status = next;

        if let Err(err) = self.dispatcher.application_decided(&application, decision) {
            warn!(
                application_id = %application_id.0,
                error = %err,
                "could not notify the developer about the decision"
            );
        }

        if decision == Decision::Accept {
            self.spawn_project(&application)?;
        }

        Ok(application)
    }

    /// Create the tracked engagement for a freshly accepted application. A
    /// missing parent post is logged and tolerated; the application stays
    /// accepted with no project.
    fn spawn_project(&self, application: &Application) -> Result<(), WorkflowError> {
        let post = match self.repository.post(&application.post_id) {
            Ok(Some(post)) => post,
            Ok(None) => {
                warn!(
                    post_id = %application.post_id.0,
                    application_id = %application.id.0,
                    "post deleted before its project could be created"
                );
                return Ok(());
            }
            Err(err) => {
                warn!(
                    post_id = %application.post_id.0,
                    application_id = %application.id.0,
                    error = %err,
                    "could not load the post while creating a project"
                );
                return Ok(());
            }
        };

        let project = PendingProject {
            id: ProjectId::default(),
            post_id: application.post_id.clone(),
            post_title: application.post_title.clone(),
            post_description: post.description,
            author_id: post.author_id,
            author_name: post.author_name,
            developer_id: application.developer_id.clone(),
            developer_name: application.developer_name.clone(),
            application_id: application.id.clone(),
            status: ProjectStatus::Pending,
            accepted_at: Utc::now(),
            completed_at: None,
        };
        self.repository.insert_project(project)?;
        Ok(())
    }

    /// Move a project along its lifecycle. Either participant may drive it.
    ///
    /// The write is conditional on the status the engine just read, so a
    /// concurrent advance loses cleanly instead of clobbering; terminal
    /// states are never left.
    pub fn advance_project(
        &self,
        caller: &Caller,
        project_id: &ProjectId,
        next: ProjectStatus,
    ) -> Result<PendingProject, WorkflowError> {
        let mut project = self
            .repository
            .project(project_id)?
            .ok_or(WorkflowError::NotFound(EntityKind::Project))?;
        if !project.involves(&caller.id) {
            return Err(WorkflowError::Unauthorized);
        }
        if !project.status.can_transition_to(next) {
            return Err(WorkflowError::InvalidTransition {
                from: project.status,
                to: next,
            });
        }

        let completed_at = (next == ProjectStatus::Completed).then(Utc::now);
        let applied =
            self.repository
                .transition_project(project_id, project.status, next, completed_at)?;
        if !applied {
            // Lost a race; report against the state that actually won.
            let fresh = self
                .repository
                .project(project_id)?
                .ok_or(WorkflowError::NotFound(EntityKind::Project))?;
            return Err(WorkflowError::InvalidTransition {
                from: fresh.status,
                to: next,
            });
        }

        project.status = next;
        project.completed_at = completed_at.or(project.completed_at);
        Ok(project)
    }

    /// Flip the read flag on a notification. Recipient-only.
    pub fn mark_notification_read(
        &self,
        caller: &Caller,
        notification_id: &NotificationId,
    ) -> Result<(), WorkflowError> {
        let notification = self
            .repository
            .notification(notification_id)?
            .ok_or(WorkflowError::NotFound(EntityKind::Notification))?;
        if notification.user_id != caller.id {
            return Err(WorkflowError::Unauthorized);
        }
        Ok(self.repository.mark_notification_read(notification_id)?)
    }

    // Read accessors for the presentation layer.

    pub fn post(&self, id: &PostId) -> Result<Post, WorkflowError> {
        self.repository
            .post(id)?
            .ok_or(WorkflowError::NotFound(EntityKind::Post))
    }

    pub fn recent_posts(&self) -> Result<Vec<Post>, WorkflowError> {
        Ok(self.repository.recent_posts()?)
    }

    pub fn posts_by_author(&self, author: &UserId) -> Result<Vec<Post>, WorkflowError> {
        Ok(self.repository.posts_by_author(author)?)
    }

    pub fn applications_for_post(
        &self,
        post_id: &PostId,
    ) -> Result<Vec<Application>, WorkflowError> {
        Ok(self.repository.applications_for_post(post_id)?)
    }

    pub fn applications_by_developer(
        &self,
        developer: &UserId,
    ) -> Result<Vec<Application>, WorkflowError> {
        Ok(self.repository.applications_by_developer(developer)?)
    }

    pub fn projects_for(&self, user: &UserId) -> Result<Vec<PendingProject>, WorkflowError> {
        Ok(self.repository.projects_for(user)?)
    }

    pub fn notifications_for(&self, user: &UserId) -> Result<Vec<Notification>, WorkflowError> {
        Ok(self.repository.notifications_for(user)?)
    }

    pub fn unread_notifications(&self, user: &UserId) -> Result<usize, WorkflowError> {
        Ok(self.repository.unread_count(user)?)
    }
}

fn normalize_tags(tags: &[String]) -> Vec<String> {
    tags.iter()
        .map(|tag| tag.trim())
        .filter(|tag| !tag.is_empty())
        .map(str::to_string)
        .collect()
}
