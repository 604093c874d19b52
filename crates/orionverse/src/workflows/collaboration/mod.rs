//! Post, application, and project collaboration workflow.
//!
//! An author publishes a post, developers apply against it, and an accepted
//! application spawns a tracked project. The engine coordinates those three
//! entity types over a document store, holds the invariants that span them,
//! and fans out best-effort notification records as transitions land.

pub mod dispatch;
pub mod domain;
pub mod engine;
pub mod repository;
pub mod router;
pub mod store;

#[cfg(test)]
mod tests;

pub use dispatch::{DispatchError, NotificationDispatcher};
pub use domain::{
    Application, ApplicationId, ApplicationStatus, Caller, Decision, Notification, NotificationId,
    NotificationType, PendingProject, Post, PostDraft, PostEdit, PostId, PostType, ProjectId,
    ProjectStatus, UserId,
};
pub use engine::{EntityKind, WorkflowEngine, WorkflowError};
pub use repository::{EntityRepository, RepositoryError};
pub use router::{
    collaboration_router, ApplicationView, NotificationFeedView, NotificationView, PostView,
    ProjectView,
};
pub use store::{collections, Document, DocumentStore, MemoryStore, StoreError};
