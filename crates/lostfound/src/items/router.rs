use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use tracing::warn;

use super::auth::{AuthenticatedModerator, ModeratorCredentials};
use super::domain::{Item, ItemId, ItemStatus, ItemSubmission, PublicItemView};
use super::images::ImageUpload;
use super::repository::{ItemRepository, RepositoryError};
use super::service::LostFoundService;
use super::store::ItemError;

/// Headroom above the image ceiling for the text fields of a multipart body.
const FORM_OVERHEAD_BYTES: usize = 1024 * 1024;

/// Router builder exposing the public, moderator and feed endpoints.
pub fn item_router<R>(service: Arc<LostFoundService<R>>) -> Router
where
    R: ItemRepository + 'static,
{
    let body_limit = service.submissions().policy().max_bytes + FORM_OVERHEAD_BYTES;

    Router::new()
        .route(
            "/api/items",
            get(list_public_handler::<R>).post(submit_handler::<R>),
        )
        .route("/api/items/:item_id", get(item_handler::<R>))
        .route("/api/items/:item_id/claim", put(claim_handler::<R>))
        .route("/api/admin/login", post(login_handler::<R>))
        .route("/api/admin/logout", post(logout_handler::<R>))
        .route("/api/admin/items", get(list_all_handler::<R>))
        .route("/api/admin/items/:item_id/approve", put(approve_handler::<R>))
        .route("/api/admin/items/:item_id/reject", put(reject_handler::<R>))
        .route("/api/admin/items/:item_id/unclaim", put(unclaim_handler::<R>))
        .route("/api/notifications", get(notifications_handler::<R>))
        .route("/uploads/:file_name", get(upload_handler::<R>))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(service)
}

impl IntoResponse for ItemError {
    fn into_response(self) -> Response {
        let (status, payload) = match &self {
            ItemError::Validation(errors) => (
                StatusCode::BAD_REQUEST,
                json!({ "error": "validation failed", "fields": errors }),
            ),
            ItemError::NotFound(_) => (
                StatusCode::NOT_FOUND,
                json!({ "error": self.to_string() }),
            ),
            ItemError::InvalidTransition { from, .. } => (
                StatusCode::CONFLICT,
                json!({ "error": self.to_string(), "status": from.label() }),
            ),
            ItemError::Conflict { current, .. } => (
                StatusCode::CONFLICT,
                json!({ "error": self.to_string(), "status": current.label() }),
            ),
            ItemError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                json!({ "error": "moderator session required" }),
            ),
            ItemError::Storage(_) | ItemError::ImageStorage(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": "internal storage error" }),
            ),
        };
        (status, Json(payload)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> Response {
    let payload = json!({ "error": message.into() });
    (StatusCode::BAD_REQUEST, Json(payload)).into_response()
}

fn authorization(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
}

fn moderator<R>(
    service: &LostFoundService<R>,
    headers: &HeaderMap,
) -> Result<AuthenticatedModerator, ItemError>
where
    R: ItemRepository + 'static,
{
    service.gate().authorize_header(authorization(headers))
}

fn transition_response(message: &str, item: &Item) -> Response {
    let payload = json!({ "message": message, "item": item.record_view() });
    (StatusCode::OK, Json(payload)).into_response()
}

/// Repositories and image stores do synchronous I/O, so their calls run on the
/// blocking pool instead of a runtime worker.
async fn run_blocking<R, T, F>(
    service: Arc<LostFoundService<R>>,
    work: F,
) -> Result<T, ItemError>
where
    R: ItemRepository + 'static,
    T: Send + 'static,
    F: FnOnce(&LostFoundService<R>) -> Result<T, ItemError> + Send + 'static,
{
    tokio::task::spawn_blocking(move || work(&service))
        .await
        .map_err(|err| {
            ItemError::Storage(RepositoryError::Unavailable(format!(
                "task join error: {err}"
            )))
        })?
}


pub(crate) async fn list_public_handler<R>(
    State(service): State<Arc<LostFoundService<R>>>,
) -> Response
where
    R: ItemRepository + 'static,
{
    match run_blocking(service, |service| service.list_approved()).await {
        Ok(items) => {
            let views: Vec<PublicItemView> = items.iter().map(Item::public_view).collect();
            (StatusCode::OK, Json(views)).into_response()
        }
        Err(err) => err.into_response(),
    }
}

async fn read_submission(
    mut multipart: Multipart,
) -> Result<(ItemSubmission, Option<ImageUpload>), Response> {
    let mut submission = ItemSubmission::default();
    let mut image = None;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(err) => return Err(bad_request(format!("malformed form data: {err}"))),
        };
        let name = field.name().unwrap_or_default().to_string();

        if name == "image" {
            let file_name = field.file_name().unwrap_or_default().to_string();
            let content_type = field.content_type().map(str::to_string);
            let bytes = field
                .bytes()
                .await
                .map_err(|err| bad_request(format!("unreadable image: {err}")))?;
            // Browsers send an empty part when no file was chosen.
            if !(file_name.is_empty() && bytes.is_empty()) {
                image = Some(ImageUpload {
                    file_name,
                    content_type,
                    bytes: bytes.to_vec(),
                });
            }
            continue;
        }

        let value = field
            .text()
            .await
            .map_err(|err| bad_request(format!("unreadable field {name}: {err}")))?;
        match name.as_str() {
            "title" => submission.title = value,
            "description" => submission.description = value,
            "category" => submission.category = value,
            "location_found" => submission.location_found = value,
            "date_found" => submission.date_found = value,
            "contact_info" => submission.contact_info = value,
            _ => {}
        }
    }

    Ok((submission, image))
}

pub(crate) async fn submit_handler<R>(
    State(service): State<Arc<LostFoundService<R>>>,
    multipart: Multipart,
) -> Response
where
    R: ItemRepository + 'static,
{
    let (submission, image) = match read_submission(multipart).await {
        Ok(parts) => parts,
        Err(response) => return response,
    };

    let submitted = run_blocking(service, move |service| {
        service.submissions().submit(submission, image)
    })
    .await;
    match submitted {
        Ok(item) => {
            let payload = json!({
                "id": item.id,
                "status": item.status.label(),
                "message": "Item submitted successfully and is pending approval",
            });
            (StatusCode::CREATED, Json(payload)).into_response()
        }
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn item_handler<R>(
    State(service): State<Arc<LostFoundService<R>>>,
    Path(item_id): Path<String>,
    headers: HeaderMap,
) -> Response
where
    R: ItemRepository + 'static,
{
    let id = ItemId(item_id);
    let viewer = moderator(&service, &headers).ok();

    let found = run_blocking(service, move |service| match viewer {
        Some(moderator) => service
            .moderation()
            .get(&moderator, &id)
            .map(|item| Json(item.record_view()).into_response()),
        None => service
            .get_public(&id)
            .map(|item| Json(item.public_view()).into_response()),
    })
    .await;
    found.unwrap_or_else(IntoResponse::into_response)
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ClaimRequest {
    pub claimant_name: String,
    pub claimant_contact: String,
}

pub(crate) async fn claim_handler<R>(
    State(service): State<Arc<LostFoundService<R>>>,
    Path(item_id): Path<String>,
    Json(request): Json<ClaimRequest>,
) -> Response
where
    R: ItemRepository + 'static,
{
    let id = ItemId(item_id);
    let claimed = run_blocking(service, move |service| {
        service
            .claims()
            .claim(&id, &request.claimant_name, &request.claimant_contact)
    })
    .await;
    match claimed {
        Ok(item) => {
            let payload = json!({
                "message": "Item claimed successfully",
                "item": item.public_view(),
            });
            (StatusCode::OK, Json(payload)).into_response()
        }
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn login_handler<R>(
    State(service): State<Arc<LostFoundService<R>>>,
    Json(credentials): Json<ModeratorCredentials>,
) -> Response
where
    R: ItemRepository + 'static,
{
    match run_blocking(service, move |service| service.gate().login(&credentials)).await {
        Ok(grant) => {
            let payload = json!({
                "message": "Login successful",
                "token": grant.token,
                "user": grant.user,
                "expires_at": grant.expires_at,
            });
            (StatusCode::OK, Json(payload)).into_response()
        }
        Err(ItemError::Unauthorized) => {
            let payload = json!({ "error": "Invalid credentials" });
            (StatusCode::UNAUTHORIZED, Json(payload)).into_response()
        }
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn logout_handler<R>(
    State(service): State<Arc<LostFoundService<R>>>,
    headers: HeaderMap,
) -> Response
where
    R: ItemRepository + 'static,
{
    let token = authorization(&headers)
        .map(|raw| raw.strip_prefix("Bearer ").unwrap_or(raw))
        .unwrap_or_default();
    if service.gate().logout(token) {
        StatusCode::NO_CONTENT.into_response()
    } else {
        ItemError::Unauthorized.into_response()
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub status: Option<String>,
}

pub(crate) async fn list_all_handler<R>(
    State(service): State<Arc<LostFoundService<R>>>,
    headers: HeaderMap,
    Query(query): Query<ListQuery>,
) -> Response
where
    R: ItemRepository + 'static,
{
    let moderator = match moderator(&service, &headers) {
        Ok(moderator) => moderator,
        Err(err) => return err.into_response(),
    };
    let status = match query.status.as_deref().map(str::parse::<ItemStatus>) {
        None => None,
        Some(Ok(status)) => Some(status),
        Some(Err(err)) => return bad_request(err.to_string()),
    };

    let listed = run_blocking(service, move |service| {
        service.moderation().list(&moderator, status)
    })
    .await;
    match listed {
        Ok(items) => {
            let views: Vec<_> = items.iter().map(Item::record_view).collect();
            (StatusCode::OK, Json(views)).into_response()
        }
        Err(err) => err.into_response(),
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ApproveRequest {
    pub approved_by: Option<String>,
}

pub(crate) async fn approve_handler<R>(
    State(service): State<Arc<LostFoundService<R>>>,
    Path(item_id): Path<String>,
    headers: HeaderMap,
    body: Option<Json<ApproveRequest>>,
) -> Response
where
    R: ItemRepository + 'static,
{
    let moderator = match moderator(&service, &headers) {
        Ok(moderator) => moderator,
        Err(err) => return err.into_response(),
    };
    let request = body.map(|Json(request)| request).unwrap_or_default();

    let approved = run_blocking(service, move |service| {
        service.moderation().approve(
            &moderator,
            &ItemId(item_id),
            request.approved_by.as_deref(),
        )
    })
    .await;
    match approved {
        Ok(item) => transition_response("Item approved successfully", &item),
        Err(err) => err.into_response(),
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RejectRequest {
    pub reason: Option<String>,
}

pub(crate) async fn reject_handler<R>(
    State(service): State<Arc<LostFoundService<R>>>,
    Path(item_id): Path<String>,
    headers: HeaderMap,
    body: Option<Json<RejectRequest>>,
) -> Response
where
    R: ItemRepository + 'static,
{
    let moderator = match moderator(&service, &headers) {
        Ok(moderator) => moderator,
        Err(err) => return err.into_response(),
    };
    let request = body.map(|Json(request)| request).unwrap_or_default();

    let rejected = run_blocking(service, move |service| {
        service
            .moderation()
            .reject(&moderator, &ItemId(item_id), request.reason.as_deref())
    })
    .await;
    match rejected {
        Ok(item) => transition_response("Item rejected successfully", &item),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn unclaim_handler<R>(
    State(service): State<Arc<LostFoundService<R>>>,
    Path(item_id): Path<String>,
    headers: HeaderMap,
) -> Response
where
    R: ItemRepository + 'static,
{
    let moderator = match moderator(&service, &headers) {
        Ok(moderator) => moderator,
        Err(err) => return err.into_response(),
    };

    let unclaimed = run_blocking(service, move |service| {
        service.claims().unclaim(&moderator, &ItemId(item_id))
    })
    .await;
    match unclaimed {
        Ok(item) => transition_response("Item unclaimed successfully", &item),
        Err(err) => err.into_response(),
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct FeedQuery {
    pub limit: Option<usize>,
}

pub(crate) async fn notifications_handler<R>(
    State(service): State<Arc<LostFoundService<R>>>,
    headers: HeaderMap,
    Query(query): Query<FeedQuery>,
) -> Response
where
    R: ItemRepository + 'static,
{
    match moderator(&service, &headers) {
        Ok(moderator) => {
            let feed = service.recent_notifications(&moderator, query.limit);
            (StatusCode::OK, Json(feed)).into_response()
        }
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn upload_handler<R>(
    State(service): State<Arc<LostFoundService<R>>>,
    Path(file_name): Path<String>,
) -> Response
where
    R: ItemRepository + 'static,
{
    let reference = format!("/uploads/{file_name}");
    let lookup = reference.clone();
    let loaded = run_blocking(service, move |service| {
        service.images().load(&lookup).map_err(ItemError::from)
    })
    .await;
    match loaded {
        Ok(Some(bytes)) => {
            let content_type = mime_guess::from_path(&file_name)
                .first_or_octet_stream()
                .to_string();
            (StatusCode::OK, [(header::CONTENT_TYPE, content_type)], bytes).into_response()
        }
        Ok(None) => StatusCode::NOT_FOUND.into_response(),
        Err(err) => {
            warn!(reference = %reference, error = %err, "failed to read stored image");
            err.into_response()
        }
    }
}
