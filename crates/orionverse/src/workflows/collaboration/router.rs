use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::domain::{
    Application, ApplicationId, Caller, Decision, Notification, NotificationId, PendingProject,
    Post, PostDraft, PostEdit, PostId, ProjectId, ProjectStatus,
};
use super::engine::{WorkflowEngine, WorkflowError};
use super::repository::RepositoryError;
use super::store::DocumentStore;

/// Router builder exposing the workflow operations over HTTP. Caller
/// identity arrives as `x-user-id`/`x-user-name` headers stamped by the
/// identity layer in front of this service; the engine trusts them as given.
pub fn collaboration_router<S>(engine: Arc<WorkflowEngine<S>>) -> Router
where
    S: DocumentStore + 'static,
{
    Router::new()
        .route(
            "/api/v1/posts",
            post(publish_post_handler::<S>).get(recent_posts_handler::<S>),
        )
        .route(
            "/api/v1/posts/:post_id",
            get(post_handler::<S>).patch(edit_post_handler::<S>),
        )
        .route(
            "/api/v1/posts/:post_id/applications",
            post(apply_handler::<S>).get(post_applications_handler::<S>),
        )
        .route("/api/v1/applications", get(my_applications_handler::<S>))
        .route(
            "/api/v1/applications/:application_id/decision",
            post(decide_handler::<S>),
        )
        .route("/api/v1/projects", get(my_projects_handler::<S>))
        .route(
            "/api/v1/projects/:project_id/status",
            post(advance_project_handler::<S>),
        )
        .route("/api/v1/notifications", get(notifications_handler::<S>))
        .route(
            "/api/v1/notifications/:notification_id/read",
            post(mark_read_handler::<S>),
        )
        .with_state(engine)
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApplyRequest {
    pub(crate) proposal: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DecisionRequest {
    pub(crate) decision: Decision,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AdvanceRequest {
    pub(crate) status: ProjectStatus,
}

/// Public shape of a post.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostView {
    pub id: String,
    pub author_id: String,
    pub author_name: String,
    pub title: String,
    pub description: String,
    pub post_type: &'static str,
    pub tags: Vec<String>,
    pub applications_count: u32,
    pub accepts_applications: bool,
    pub created_at: DateTime<Utc>,
}

impl From<Post> for PostView {
    fn from(post: Post) -> Self {
        let accepts_applications = post.accepts_applications();
        Self {
            id: post.id.0,
            author_id: post.author_id.0,
            author_name: post.author_name,
            title: post.title,
            description: post.description,
            post_type: post.post_type.label(),
            tags: post.tags,
            applications_count: post.applications_count,
            accepts_applications,
            created_at: post.created_at,
        }
    }
}

/// Public shape of an application.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationView {
    pub id: String,
    pub post_id: String,
    pub post_title: String,
    pub developer_id: String,
    pub developer_name: String,
    pub proposal: String,
    pub status: &'static str,
    pub applied_at: DateTime<Utc>,
}

impl From<Application> for ApplicationView {
    fn from(application: Application) -> Self {
        Self {
            id: application.id.0,
            post_id: application.post_id.0,
            post_title: application.post_title,
            developer_id: application.developer_id.0,
            developer_name: application.developer_name,
            proposal: application.proposal,
            status: application.status.label(),
            applied_at: application.applied_at,
        }
    }
}

/// Public shape of a tracked project.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectView {
    pub id: String,
    pub post_id: String,
    pub post_title: String,
    pub post_description: String,
    pub author_id: String,
    pub author_name: String,
    pub developer_id: String,
    pub developer_name: String,
    pub application_id: String,
    pub status: &'static str,
    pub accepted_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl From<PendingProject> for ProjectView {
    fn from(project: PendingProject) -> Self {
        Self {
            id: project.id.0,
            post_id: project.post_id.0,
            post_title: project.post_title,
            post_description: project.post_description,
            author_id: project.author_id.0,
            author_name: project.author_name,
            developer_id: project.developer_id.0,
            developer_name: project.developer_name,
            application_id: project.application_id.0,
            status: project.status.label(),
            accepted_at: project.accepted_at,
            completed_at: project.completed_at,
        }
    }
}

/// Public shape of a notification record.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationView {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub title: String,
    pub message: String,
    pub related_id: String,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

impl From<Notification> for NotificationView {
    fn from(notification: Notification) -> Self {
        Self {
            id: notification.id.0,
            kind: notification.kind.label(),
            title: notification.title,
            message: notification.message,
            related_id: notification.related_id,
            read: notification.read,
            created_at: notification.created_at,
        }
    }
}

/// Notification listing plus the unread badge count the UI renders.
#[derive(Debug, Serialize)]
pub struct NotificationFeedView {
    pub unread: usize,
    pub notifications: Vec<NotificationView>,
}

pub(crate) fn status_for(error: &WorkflowError) -> StatusCode {
    match error {
        WorkflowError::NotFound(_) => StatusCode::NOT_FOUND,
        WorkflowError::DuplicateApplication | WorkflowError::AlreadyDecided => StatusCode::CONFLICT,
        WorkflowError::Unauthorized => StatusCode::FORBIDDEN,
        WorkflowError::SelfApplication
        | WorkflowError::NotAccepting
        | WorkflowError::EmptyTitle
        | WorkflowError::EmptyDescription
        | WorkflowError::EmptyProposal
        | WorkflowError::InvalidTransition { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        WorkflowError::Storage(RepositoryError::Unavailable(_)) => StatusCode::SERVICE_UNAVAILABLE,
        WorkflowError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(error: WorkflowError) -> Response {
    let payload = json!({ "error": error.to_string() });
    (status_for(&error), Json(payload)).into_response()
}

fn require_caller(headers: &HeaderMap) -> Result<Caller, Response> {
    let id = headers
        .get("x-user-id")
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty());
    let Some(id) = id else {
        let payload = json!({ "error": "missing x-user-id header" });
        return Err((StatusCode::UNAUTHORIZED, Json(payload)).into_response());
    };
    let name = headers
        .get("x-user-name")
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or("Anonymous");
    Ok(Caller::new(id, name))
}

pub(crate) async fn publish_post_handler<S>(
    State(engine): State<Arc<WorkflowEngine<S>>>,
    headers: HeaderMap,
    Json(draft): Json<PostDraft>,
) -> Response
where
    S: DocumentStore + 'static,
{
    let caller = match require_caller(&headers) {
        Ok(caller) => caller,
        Err(response) => return response,
    };
    match engine.publish_post(&caller, draft) {
        Ok(created) => (StatusCode::CREATED, Json(PostView::from(created))).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn recent_posts_handler<S>(
    State(engine): State<Arc<WorkflowEngine<S>>>,
) -> Response
where
    S: DocumentStore + 'static,
{
    match engine.recent_posts() {
        Ok(posts) => {
            let views: Vec<PostView> = posts.into_iter().map(PostView::from).collect();
            (StatusCode::OK, Json(views)).into_response()
        }
        Err(err) => error_response(err),
    }
}

pub(crate) async fn post_handler<S>(
    State(engine): State<Arc<WorkflowEngine<S>>>,
    Path(post_id): Path<String>,
) -> Response
where
    S: DocumentStore + 'static,
{
    match engine.post(&PostId(post_id)) {
        Ok(found) => (StatusCode::OK, Json(PostView::from(found))).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn edit_post_handler<S>(
    State(engine): State<Arc<WorkflowEngine<S>>>,
    Path(post_id): Path<String>,
    headers: HeaderMap,
    Json(edit): Json<PostEdit>,
) -> Response
where
    S: DocumentStore + 'static,
{
    let caller = match require_caller(&headers) {
        Ok(caller) => caller,
        Err(response) => return response,
    };
    match engine.edit_post(&caller, &PostId(post_id), edit) {
        Ok(updated) => (StatusCode::OK, Json(PostView::from(updated))).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn apply_handler<S>(
    State(engine): State<Arc<WorkflowEngine<S>>>,
    Path(post_id): Path<String>,
    headers: HeaderMap,
    Json(request): Json<ApplyRequest>,
) -> Response
where
    S: DocumentStore + 'static,
{
    let caller = match require_caller(&headers) {
        Ok(caller) => caller,
        Err(response) => return response,
    };
    match engine.apply(&caller, &PostId(post_id), &request.proposal) {
        Ok(application) => {
            (StatusCode::CREATED, Json(ApplicationView::from(application))).into_response()
        }
        Err(err) => error_response(err),
    }
}

pub(crate) async fn post_applications_handler<S>(
    State(engine): State<Arc<WorkflowEngine<S>>>,
    Path(post_id): Path<String>,
) -> Response
where
    S: DocumentStore + 'static,
{
    match engine.applications_for_post(&PostId(post_id)) {
        Ok(applications) => {
            let views: Vec<ApplicationView> =
                applications.into_iter().map(ApplicationView::from).collect();
            (StatusCode::OK, Json(views)).into_response()
        }
        Err(err) => error_response(err),
    }
}

pub(crate) async fn my_applications_handler<S>(
    State(engine): State<Arc<WorkflowEngine<S>>>,
    headers: HeaderMap,
) -> Response
where
    S: DocumentStore + 'static,
{
    let caller = match require_caller(&headers) {
        Ok(caller) => caller,
        Err(response) => return response,
    };
    match engine.applications_by_developer(&caller.id) {
        Ok(applications) => {
            let views: Vec<ApplicationView> =
                applications.into_iter().map(ApplicationView::from).collect();
            (StatusCode::OK, Json(views)).into_response()
        }
        Err(err) => error_response(err),
    }
}

pub(crate) async fn decide_handler<S>(
    State(engine): State<Arc<WorkflowEngine<S>>>,
    Path(application_id): Path<String>,
    headers: HeaderMap,
    Json(request): Json<DecisionRequest>,
) -> Response
where
    S: DocumentStore + 'static,
{
    let caller = match require_caller(&headers) {
        Ok(caller) => caller,
        Err(response) => return response,
    };
    match engine.decide(&caller, &ApplicationId(application_id), request.decision) {
        Ok(decided) => (StatusCode::OK, Json(ApplicationView::from(decided))).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn my_projects_handler<S>(
    State(engine): State<Arc<WorkflowEngine<S>>>,
    headers: HeaderMap,
) -> Response
where
    S: DocumentStore + 'static,
{
    let caller = match require_caller(&headers) {
        Ok(caller) => caller,
        Err(response) => return response,
    };
    match engine.projects_for(&caller.id) {
        Ok(projects) => {
            let views: Vec<ProjectView> = projects.into_iter().map(ProjectView::from).collect();
            (StatusCode::OK, Json(views)).into_response()
        }
        Err(err) => error_response(err),
    }
}

pub(crate) async fn advance_project_handler<S>(
    State(engine): State<Arc<WorkflowEngine<S>>>,
    Path(project_id): Path<String>,
    headers: HeaderMap,
    Json(request): Json<AdvanceRequest>,
) -> Response
where
    S: DocumentStore + 'static,
{
    let caller = match require_caller(&headers) {
        Ok(caller) => caller,
        Err(response) => return response,
    };
    match engine.advance_project(&caller, &ProjectId(project_id), request.status) {
        Ok(project) => (StatusCode::OK, Json(ProjectView::from(project))).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn notifications_handler<S>(
    State(engine): State<Arc<WorkflowEngine<S>>>,
    headers: HeaderMap,
) -> Response
where
    S: DocumentStore + 'static,
{
    let caller = match require_caller(&headers) {
        Ok(caller) => caller,
        Err(response) => return response,
    };
    let notifications = match engine.notifications_for(&caller.id) {
        Ok(notifications) => notifications,
        Err(err) => return error_response(err),
    };
    let unread = notifications.iter().filter(|n| !n.read).count();
    let feed = NotificationFeedView {
        unread,
        notifications: notifications
            .into_iter()
            .map(NotificationView::from)
            .collect(),
    };
    (StatusCode::OK, Json(feed)).into_response()
}

pub(crate) async fn mark_read_handler<S>(
    State(engine): State<Arc<WorkflowEngine<S>>>,
    Path(notification_id): Path<String>,
    headers: HeaderMap,
) -> Response
where
    S: DocumentStore + 'static,
{
    let caller = match require_caller(&headers) {
        Ok(caller) => caller,
        Err(response) => return response,
    };
    match engine.mark_notification_read(&caller, &NotificationId(notification_id)) {
        Ok(()) => (StatusCode::OK, Json(json!({ "status": "read" }))).into_response(),
        Err(err) => error_response(err),
    }
}
