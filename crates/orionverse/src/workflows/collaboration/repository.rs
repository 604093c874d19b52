use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use super::domain::{
    Application, ApplicationId, ApplicationStatus, Notification, NotificationId, PendingProject,
    Post, PostId, ProjectId, ProjectStatus, UserId,
};
use super::store::{collections, Document, DocumentStore, StoreError};

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record not found")]
    NotFound,
    #[error("record already exists")]
    Duplicate,
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("stored document is corrupt: {0}")]
    Corrupt(String),
}

impl From<StoreError> for RepositoryError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::NotFound => RepositoryError::NotFound,
            StoreError::UniqueConflict => RepositoryError::Duplicate,
            StoreError::Unavailable(reason) => RepositoryError::Unavailable(reason),
            StoreError::Malformed(reason) => RepositoryError::Corrupt(reason),
        }
    }
}

/// Typed accessors over the workflow collections. A thin translation layer:
/// entities in, documents out, and back again. No business validation happens
/// here; the engine owns every invariant.
pub struct EntityRepository<S> {
    store: Arc<S>,
}

impl<S> Clone for EntityRepository<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
        }
    }
}

fn to_doc<T: Serialize>(entity: &T) -> Result<Document, RepositoryError> {
    match serde_json::to_value(entity) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(RepositoryError::Corrupt(
            "entity did not serialize to a document".to_string(),
        )),
        Err(err) => Err(RepositoryError::Corrupt(err.to_string())),
    }
}

fn from_doc<T: DeserializeOwned>(doc: Document) -> Result<T, RepositoryError> {
    serde_json::from_value(Value::Object(doc)).map_err(|err| RepositoryError::Corrupt(err.to_string()))
}

fn field_value<T: Serialize>(value: &T) -> Result<Value, RepositoryError> {
    serde_json::to_value(value).map_err(|err| RepositoryError::Corrupt(err.to_string()))
}

impl<S: DocumentStore> EntityRepository<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    // Posts

    pub fn insert_post(&self, mut post: Post) -> Result<Post, RepositoryError> {
        let doc = to_doc(&post)?;
        let id = self.store.create(collections::POSTS, doc)?;
        post.id = PostId(id);
        Ok(post)
    }

    pub fn post(&self, id: &PostId) -> Result<Option<Post>, RepositoryError> {
        match self.store.get(collections::POSTS, &id.0)? {
            Some(doc) => {
                let mut post: Post = from_doc(doc)?;
                post.id = id.clone();
                Ok(Some(post))
            }
            None => Ok(None),
        }
    }

    pub fn recent_posts(&self) -> Result<Vec<Post>, RepositoryError> {
        let mut posts = self.posts_matching(&[])?;
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(posts)
    }

    pub fn posts_by_author(&self, author: &UserId) -> Result<Vec<Post>, RepositoryError> {
        let mut posts = self.posts_matching(&[("authorId", field_value(author)?)])?;
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(posts)
    }

    fn posts_matching(&self, filters: &[(&str, Value)]) -> Result<Vec<Post>, RepositoryError> {
        self.store
            .query(collections::POSTS, filters)?
            .into_iter()
            .map(|(id, doc)| {
                let mut post: Post = from_doc(doc)?;
                post.id = PostId(id);
                Ok(post)
            })
            .collect()
    }

    pub fn update_post_content(
        &self,
        id: &PostId,
        title: Option<&str>,
        description: Option<&str>,
        tags: Option<&[String]>,
    ) -> Result<(), RepositoryError> {
        let mut changes = Document::new();
        if let Some(title) = title {
            changes.insert("title".to_string(), Value::from(title));
        }
        if let Some(description) = description {
            changes.insert("description".to_string(), Value::from(description));
        }
        if let Some(tags) = tags {
            changes.insert("tags".to_string(), field_value(&tags)?);
        }
        if changes.is_empty() {
            return Ok(());
        }
        Ok(self.store.update(collections::POSTS, &id.0, changes)?)
    }

    /// Atomic move of the denormalized applications counter.
    pub fn bump_applications_count(&self, id: &PostId, delta: i64) -> Result<i64, RepositoryError> {
        Ok(self
            .store
            .increment(collections::POSTS, &id.0, "applicationsCount", delta)?)
    }

    // Applications

    /// Insert honoring the one-application-per-(post, developer) invariant.
    /// The uniqueness check and the write are a single store operation.
    pub fn insert_application(
        &self,
        mut application: Application,
    ) -> Result<Application, RepositoryError> {
        let doc = to_doc(&application)?;
        let id = self
            .store
            .create_unique(collections::APPLICATIONS, doc, &["postId", "developerId"])?;
        application.id = ApplicationId(id);
        Ok(application)
    }

    pub fn application(
        &self,
        id: &ApplicationId,
    ) -> Result<Option<Application>, RepositoryError> {
        match self.store.get(collections::APPLICATIONS, &id.0)? {
            Some(doc) => {
                let mut application: Application = from_doc(doc)?;
                application.id = id.clone();
                Ok(Some(application))
            }
            None => Ok(None),
        }
    }

    pub fn applications_for_post(
        &self,
        post: &PostId,
    ) -> Result<Vec<Application>, RepositoryError> {
        self.applications_matching(&[("postId", field_value(post)?)])
    }

    pub fn applications_by_developer(
        &self,
        developer: &UserId,
    ) -> Result<Vec<Application>, RepositoryError> {
        self.applications_matching(&[("developerId", field_value(developer)?)])
    }

    fn applications_matching(
        &self,
        filters: &[(&str, Value)],
    ) -> Result<Vec<Application>, RepositoryError> {
        let mut applications: Vec<Application> = self
            .store
            .query(collections::APPLICATIONS, filters)?
            .into_iter()
            .map(|(id, doc)| {
                let mut application: Application = from_doc(doc)?;
                application.id = ApplicationId(id);
                Ok(application)
            })
            .collect::<Result<_, RepositoryError>>()?;
        applications.sort_by(|a, b| b.applied_at.cmp(&a.applied_at));
        Ok(applications)
    }

    /// Compare-and-swap the status of a still-pending application. Returns
    /// false when the application was already decided by someone else.
    pub fn transition_application(
        &self,
        id: &ApplicationId,
        next: ApplicationStatus,
    ) -> Result<bool, RepositoryError> {
        let mut changes = Document::new();
        changes.insert("status".to_string(), field_value(&next)?);
        Ok(self.store.update_if(
            collections::APPLICATIONS,
            &id.0,
            &[("status", field_value(&ApplicationStatus::Pending)?)],
            changes,
        )?)
    }

    // Pending projects

    pub fn insert_project(
        &self,
        mut project: PendingProject,
    ) -> Result<PendingProject, RepositoryError> {
        let doc = to_doc(&project)?;
        let id = self.store.create(collections::PENDING_PROJECTS, doc)?;
        project.id = ProjectId(id);
        Ok(project)
    }

    pub fn project(&self, id: &ProjectId) -> Result<Option<PendingProject>, RepositoryError> {
        match self.store.get(collections::PENDING_PROJECTS, &id.0)? {
            Some(doc) => {
                let mut project: PendingProject = from_doc(doc)?;
                project.id = id.clone();
                Ok(Some(project))
            }
            None => Ok(None),
        }
    }

    /// Projects where the user participates as author or developer. The store
    /// only answers equality queries, so this is the union of the two.
    pub fn projects_for(&self, user: &UserId) -> Result<Vec<PendingProject>, RepositoryError> {
        let mut projects = self.projects_matching(&[("developerId", field_value(user)?)])?;
        let authored = self.projects_matching(&[("authorId", field_value(user)?)])?;
        for project in authored {
            if !projects.iter().any(|existing| existing.id == project.id) {
                projects.push(project);
            }
        }
        projects.sort_by(|a, b| b.accepted_at.cmp(&a.accepted_at));
        Ok(projects)
    }

    fn projects_matching(
        &self,
        filters: &[(&str, Value)],
    ) -> Result<Vec<PendingProject>, RepositoryError> {
        self.store
            .query(collections::PENDING_PROJECTS, filters)?
            .into_iter()
            .map(|(id, doc)| {
                let mut project: PendingProject = from_doc(doc)?;
                project.id = ProjectId(id);
                Ok(project)
            })
            .collect()
    }

    /// Compare-and-swap a project status transition, stamping the completion
    /// time when one is supplied. Returns false when the project moved under
    /// the caller.
    pub fn transition_project(
        &self,
        id: &ProjectId,
        expected: ProjectStatus,
        next: ProjectStatus,
        completed_at: Option<DateTime<Utc>>,
    ) -> Result<bool, RepositoryError> {
        let mut changes = Document::new();
        changes.insert("status".to_string(), field_value(&next)?);
        if let Some(completed_at) = completed_at {
            changes.insert("completedAt".to_string(), field_value(&completed_at)?);
        }
        Ok(self.store.update_if(
            collections::PENDING_PROJECTS,
            &id.0,
            &[("status", field_value(&expected)?)],
            changes,
        )?)
    }

    // Notifications

    pub fn insert_notification(
        &self,
        mut notification: Notification,
    ) -> Result<Notification, RepositoryError> {
        let doc = to_doc(&notification)?;
        let id = self.store.create(collections::NOTIFICATIONS, doc)?;
        notification.id = NotificationId(id);
        Ok(notification)
    }

    pub fn notification(
        &self,
        id: &NotificationId,
    ) -> Result<Option<Notification>, RepositoryError> {
        match self.store.get(collections::NOTIFICATIONS, &id.0)? {
            Some(doc) => {
                let mut notification: Notification = from_doc(doc)?;
                notification.id = id.clone();
                Ok(Some(notification))
            }
            None => Ok(None),
        }
    }

    pub fn notifications_for(&self, user: &UserId) -> Result<Vec<Notification>, RepositoryError> {
        let mut notifications: Vec<Notification> = self
            .store
            .query(collections::NOTIFICATIONS, &[("userId", field_value(user)?)])?
            .into_iter()
            .map(|(id, doc)| {
                let mut notification: Notification = from_doc(doc)?;
                notification.id = NotificationId(id);
                Ok(notification)
            })
            .collect::<Result<_, RepositoryError>>()?;
        notifications.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(notifications)
    }

    pub fn unread_count(&self, user: &UserId) -> Result<usize, RepositoryError> {
        Ok(self
            .store
            .query(
                collections::NOTIFICATIONS,
                &[("userId", field_value(user)?), ("read", Value::from(false))],
            )?
            .len())
    }

    pub fn mark_notification_read(&self, id: &NotificationId) -> Result<(), RepositoryError> {
        let mut changes = Document::new();
        changes.insert("read".to_string(), Value::from(true));
        Ok(self
            .store
            .update(collections::NOTIFICATIONS, &id.0, changes)?)
    }
}
