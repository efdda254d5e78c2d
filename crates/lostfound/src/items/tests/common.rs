use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request};
use axum::response::Response;
use serde_json::Value;

use crate::config::{ModeratorSeed, NotificationConfig};
use crate::items::domain::{Item, ItemId, ItemStatus, ItemSubmission};
use crate::items::images::{DiskImageStore, ImagePolicy, ImageUpload};
use crate::items::lifecycle::Transition;
use crate::items::memory::{
    InMemoryImageStore, InMemoryItemRepository, InMemoryModeratorRepository,
};
use crate::items::repository::{ItemRepository, RepositoryError};
use crate::items::{AuthenticatedModerator, LostFoundService, ModeratorCredentials};
use crate::items::service::ServiceSettings;

pub(super) const BOUNDARY: &str = "lostfound-test-boundary";

pub(super) fn submission() -> ItemSubmission {
    ItemSubmission {
        title: "Blue Backpack".to_string(),
        description: "Navy blue backpack with a laptop sleeve".to_string(),
        category: "Bags & Backpacks".to_string(),
        location_found: "Central Library, 2nd floor".to_string(),
        date_found: "2025-10-01".to_string(),
        contact_info: "finder@example.com".to_string(),
    }
}

pub(super) fn titled(title: &str) -> ItemSubmission {
    ItemSubmission {
        title: title.to_string(),
        ..submission()
    }
}

pub(super) fn png(len: usize) -> ImageUpload {
    ImageUpload {
        file_name: "backpack.png".to_string(),
        content_type: Some("image/png".to_string()),
        bytes: vec![0x89; len],
    }
}

pub(super) fn seed() -> ModeratorSeed {
    ModeratorSeed {
        username: "admin".to_string(),
        email: "admin@lostfound.com".to_string(),
        password: "admin123".to_string(),
        session_ttl_hours: 24,
    }
}

pub(super) fn settings() -> ServiceSettings {
    ServiceSettings {
        image_policy: ImagePolicy { max_bytes: 4 * 1024 },
        notifications: NotificationConfig {
            capacity: 100,
            feed_limit: 5,
        },
        ..ServiceSettings::default()
    }
}

pub(super) struct Harness {
    pub service: Arc<LostFoundService<InMemoryItemRepository>>,
    pub repository: Arc<InMemoryItemRepository>,
    pub images: InMemoryImageStore,
}

pub(super) fn build_service() -> Harness {
    let repository = Arc::new(InMemoryItemRepository::default());
    let images = InMemoryImageStore::default();
    let service = LostFoundService::new(
        repository.clone(),
        Arc::new(InMemoryModeratorRepository::default()),
        Arc::new(images.clone()),
        settings(),
    );
    service.gate().ensure_seeded(&seed()).expect("seed moderator");
    Harness {
        service: Arc::new(service),
        repository,
        images,
    }
}

/// Service whose images land in `root`, so `/uploads/...` references resolve.
pub(super) fn disk_backed_service(
    root: &std::path::Path,
) -> Arc<LostFoundService<InMemoryItemRepository>> {
    let service = LostFoundService::new(
        Arc::new(InMemoryItemRepository::default()),
        Arc::new(InMemoryModeratorRepository::default()),
        Arc::new(DiskImageStore::new(root)),
        settings(),
    );
    service.gate().ensure_seeded(&seed()).expect("seed moderator");
    Arc::new(service)
}

pub(super) fn login_token<R>(service: &LostFoundService<R>) -> String
where
    R: ItemRepository + 'static,
{
    service
        .gate()
        .login(&ModeratorCredentials {
            username: "admin".to_string(),
            password: "admin123".to_string(),
        })
        .expect("login succeeds")
        .token
}

pub(super) fn moderator<R>(service: &LostFoundService<R>) -> AuthenticatedModerator
where
    R: ItemRepository + 'static,
{
    let token = login_token(service);
    service.gate().authorize(&token).expect("token accepted")
}

/// Submits and approves an item, returning it in `approved`.
pub(super) fn approved_item<R>(service: &LostFoundService<R>, title: &str) -> Item
where
    R: ItemRepository + 'static,
{
    let item = service
        .submissions()
        .submit(titled(title), None)
        .expect("submit");
    service
        .moderation()
        .approve(&moderator(service), &item.id, None)
        .expect("approve")
}

pub(super) fn multipart_body(fields: &[(&str, &str)], image: Option<&ImageUpload>) -> Body {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    if let Some(upload) = image {
        body.extend_from_slice(
            format!("--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"image\"; ")
                .as_bytes(),
        );
        body.extend_from_slice(format!("filename=\"{}\"\r\n", upload.file_name).as_bytes());
        // A part without a declared type carries no Content-Type header at all.
        if let Some(content_type) = &upload.content_type {
            body.extend_from_slice(format!("Content-Type: {content_type}\r\n").as_bytes());
        }
        body.extend_from_slice(b"\r\n");
        body.extend_from_slice(&upload.bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    Body::from(body)
}

pub(super) fn submission_fields(submission: &ItemSubmission) -> Vec<(&'static str, String)> {
    vec![
        ("title", submission.title.clone()),
        ("description", submission.description.clone()),
        ("category", submission.category.clone()),
        ("location_found", submission.location_found.clone()),
        ("date_found", submission.date_found.clone()),
        ("contact_info", submission.contact_info.clone()),
    ]
}

pub(super) fn submit_request(
    submission: &ItemSubmission,
    image: Option<&ImageUpload>,
) -> Request<Body> {
    let fields = submission_fields(submission);
    let borrowed: Vec<(&str, &str)> = fields
        .iter()
        .map(|(name, value)| (*name, value.as_str()))
        .collect();
    Request::post("/api/items")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(multipart_body(&borrowed, image))
        .expect("request")
}

pub(super) fn json_request(
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Value,
) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder
        .body(Body::from(serde_json::to_vec(&body).expect("serialize")))
        .expect("request")
}

pub(super) fn get_request(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::get(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::empty()).expect("request")
}

pub(super) async fn read_json(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body readable");
    serde_json::from_slice(&bytes).expect("json body")
}

/// Repository whose every call fails, for storage error paths.
pub(super) struct UnavailableRepository;

impl ItemRepository for UnavailableRepository {
    fn insert(&self, _item: Item) -> Result<Item, RepositoryError> {
        Err(RepositoryError::Unavailable("disk full".to_string()))
    }

    fn fetch(&self, _id: &ItemId) -> Result<Option<Item>, RepositoryError> {
        Err(RepositoryError::Unavailable("disk full".to_string()))
    }

    fn list(&self, _status: Option<ItemStatus>) -> Result<Vec<Item>, RepositoryError> {
        Err(RepositoryError::Unavailable("disk full".to_string()))
    }

    fn transition(&self, _id: &ItemId, _transition: &Transition) -> Result<Item, RepositoryError> {
        Err(RepositoryError::Unavailable("disk full".to_string()))
    }
}

pub(super) fn unavailable_service() -> (
    Arc<LostFoundService<UnavailableRepository>>,
    InMemoryImageStore,
) {
    let images = InMemoryImageStore::default();
    let service = LostFoundService::new(
        Arc::new(UnavailableRepository),
        Arc::new(InMemoryModeratorRepository::default()),
        Arc::new(images.clone()),
        settings(),
    );
    service.gate().ensure_seeded(&seed()).expect("seed moderator");
    (Arc::new(service), images)
}
