use std::time::Duration;

use futures::stream::BoxStream;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use thiserror::Error;
use url::Url;

use crate::builder::{staging::UploadSet, wizard::TemplateBackend};
use crate::notifications::NotificationSource;
use crate::rest_types::{
    AdminUser, ApiResponse, ErrorBody, LoginBody, LoginRequest, LoginResponse, Notification,
    NotificationQuery, Page, Template, TemplateFilters, TemplateRecord, UnreadCount,
    UploadedUrlSet,
};

const SIGNIN_ROUTE: &str = "auth/signin";
const LOGOUT_ROUTE: &str = "auth/logout";
const CURRENT_USER_ROUTE: &str = "users/me";
const TEMPLATES_ROUTE: &str = "templates";
const UPLOAD_TEMPLATE_FILES_ROUTE: &str = "templates/upload";
const CREATE_TEMPLATE_ROUTE: &str = "templates/create";
const NOTIFICATIONS_ROUTE: &str = "notifications";
const UNREAD_COUNT_ROUTE: &str = "notifications/unread-count";
const READ_ALL_ROUTE: &str = "notifications/read-all";

pub const TEMPLATE_PAGE_SIZE: u32 = 12;

#[derive(Debug, Error)]
pub enum ApiError {
    /// The server answered but reported `success: false`.
    #[error("{}", .message.as_deref().unwrap_or("Request was not successful"))]
    Rejected { message: Option<String> },
    #[error("{}{}", .status, .message.as_ref().map(|m| format!(" - {m}")).unwrap_or_default())]
    Status {
        status: StatusCode,
        message: Option<String>,
    },
    #[error("Response carried no data")]
    MissingData,
    #[error(transparent)]
    Transport(#[from] reqwest::Error),
    #[error("Failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("Invalid request URL: {0}")]
    Url(#[from] url::ParseError),
}

impl ApiError {
    pub fn server_message(&self) -> Option<&str> {
        match self {
            ApiError::Rejected { message } | ApiError::Status { message, .. } => {
                message.as_deref().filter(|m| !m.is_empty())
            }
            _ => None,
        }
    }

    /// The message shown to the user: the server's own words when it sent any, the
    /// fallback for a bare rejection, the error itself otherwise.
    pub fn user_message(&self, fallback: &str) -> String {
        if let Some(message) = self.server_message() {
            return message.to_string();
        }
        match self {
            ApiError::Rejected { .. } | ApiError::MissingData => fallback.to_string(),
            other => other.to_string(),
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(
            self,
            ApiError::Status {
                status: StatusCode::UNAUTHORIZED,
                ..
            }
        )
    }
}

impl<T> ApiResponse<T> {
    pub fn into_data(self) -> Result<T, ApiError> {
        if !self.success {
            return Err(ApiError::Rejected {
                message: self.message,
            });
        }
        self.data.ok_or(ApiError::MissingData)
    }

    fn into_acknowledgement(self) -> Result<(), ApiError> {
        if self.success {
            Ok(())
        } else {
            Err(ApiError::Rejected {
                message: self.message,
            })
        }
    }
}

impl<T> ApiResponse<Vec<T>> {
    pub fn into_page(self) -> Result<Page<T>, ApiError> {
        let count = self.count;
        let items = self.into_data()?;
        let count = count.unwrap_or(items.len() as u64);
        Ok(Page { items, count })
    }
}

pub struct AdminClient {
    client: Client,
    base_url: Url,
    auth_token: Option<String>,
}

impl AdminClient {
    pub fn new(
        api_base_url: Url,
        timeout: Duration,
        auth_token: Option<String>,
    ) -> Result<Self, ApiError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: api_base_url,
            auth_token,
        })
    }

    fn request(&self, method: Method, route: &str) -> Result<RequestBuilder, ApiError> {
        let url = self.base_url.join(route)?;
        tracing::debug!(%method, %url, "sending request");
        let builder = self.client.request(method, url);
        Ok(match &self.auth_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        })
    }

    async fn read_body<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorBody>(&body)
                .ok()
                .and_then(|b| b.message);
            tracing::warn!(%status, message = message.as_deref(), "request failed");
            return Err(ApiError::Status { status, message });
        }

        Ok(serde_json::from_str(&body)?)
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<ApiResponse<T>, ApiError> {
        let response = request.send().await?;
        Self::read_body(response).await
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<LoginResponse, ApiError> {
        let request = self.request(Method::POST, SIGNIN_ROUTE)?.json(&LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        });

        let response = request.send().await?;
        match Self::read_body::<LoginBody>(response).await? {
            LoginBody::Wrapped(envelope) => envelope.into_data(),
            LoginBody::Bare(login) => Ok(login),
        }
    }

    pub async fn logout(&self) -> Result<(), ApiError> {
        let request = self.request(Method::POST, LOGOUT_ROUTE)?;
        self.send::<serde_json::Value>(request)
            .await?
            .into_acknowledgement()
    }

    pub async fn current_user(&self) -> Result<AdminUser, ApiError> {
        let request = self.request(Method::GET, CURRENT_USER_ROUTE)?;
        self.send(request).await?.into_data()
    }

    pub async fn upload_template_files(
        &self,
        uploads: &UploadSet,
        both_sides: bool,
    ) -> Result<UploadedUrlSet, ApiError> {
        let mut form = reqwest::multipart::Form::new();
        for (field, file) in uploads.upload_parts(both_sides) {
            let part = reqwest::multipart::Part::bytes(file.contents().to_vec())
                .file_name(file.file_name().to_string())
                .mime_str(file.content_type())?;
            form = form.part(field, part);
        }

        let request = self
            .request(Method::POST, UPLOAD_TEMPLATE_FILES_ROUTE)?
            .multipart(form);
        self.send(request).await?.into_data()
    }

    /// Commits a record. Success is the envelope's `success` flag alone; the echoed template
    /// is decoded best-effort, so an unexpected `data` shape never turns an accepted commit
    /// into a failure.
    pub async fn create_template(
        &self,
        record: &TemplateRecord,
    ) -> Result<Option<Template>, ApiError> {
        let request = self.request(Method::POST, CREATE_TEMPLATE_ROUTE)?.json(record);
        let ApiResponse {
            success,
            message,
            data,
            ..
        } = self.send::<serde_json::Value>(request).await?;
        if !success {
            return Err(ApiError::Rejected { message });
        }

        Ok(data.and_then(|data| {
            serde_json::from_value::<Template>(data)
                .inspect_err(|e| tracing::debug!(error = %e, "created template echo not readable"))
                .ok()
        }))
    }

    pub async fn list_templates(
        &self,
        filters: &TemplateFilters,
    ) -> Result<Page<Template>, ApiError> {
        let request = self.request(Method::GET, TEMPLATES_ROUTE)?.query(filters);
        self.send(request).await?.into_page()
    }

    /// Walks every page of the listing, yielding templates as they arrive.
    pub fn all_templates<'a>(
        &'a self,
        filters: TemplateFilters,
    ) -> BoxStream<'a, Result<Template, ApiError>> {
        let stream = async_stream::try_stream! {
            let mut filters = filters;
            if filters.limit == 0 {
                filters.limit = TEMPLATE_PAGE_SIZE;
            }
            loop {
                let page = self.list_templates(&filters).await?;
                let fetched = page.items.len() as u32;
                for template in page.items {
                    yield template;
                }

                filters.offset += fetched;
                if fetched == 0 || u64::from(filters.offset) >= page.count {
                    break;
                }
            }
        };

        Box::pin(stream)
    }

    pub async fn get_template(&self, id: &str) -> Result<Template, ApiError> {
        let request = self.request(Method::GET, &format!("{TEMPLATES_ROUTE}/{id}"))?;
        self.send(request).await?.into_data()
    }

    pub async fn delete_template(&self, id: &str) -> Result<(), ApiError> {
        let request = self.request(Method::DELETE, &format!("{TEMPLATES_ROUTE}/{id}"))?;
        self.send::<serde_json::Value>(request)
            .await?
            .into_acknowledgement()
    }

    pub async fn list_notifications(
        &self,
        query: NotificationQuery,
    ) -> Result<Vec<Notification>, ApiError> {
        let request = self
            .request(Method::GET, NOTIFICATIONS_ROUTE)?
            .query(&query);
        let envelope: ApiResponse<Vec<Notification>> = self.send(request).await?;
        // An empty inbox comes back without `data`.
        if envelope.success && envelope.data.is_none() {
            return Ok(Vec::new());
        }
        envelope.into_data()
    }

    pub async fn unread_count(&self) -> Result<u64, ApiError> {
        let request = self.request(Method::GET, UNREAD_COUNT_ROUTE)?;
        let count: UnreadCount = self.send(request).await?.into_data()?;
        Ok(count.count)
    }

    pub async fn mark_notification_read(&self, id: &str) -> Result<(), ApiError> {
        let request = self.request(Method::PATCH, &format!("{NOTIFICATIONS_ROUTE}/{id}/read"))?;
        self.send::<serde_json::Value>(request)
            .await?
            .into_acknowledgement()
    }

    pub async fn mark_all_notifications_read(&self) -> Result<(), ApiError> {
        let request = self.request(Method::PATCH, READ_ALL_ROUTE)?;
        self.send::<serde_json::Value>(request)
            .await?
            .into_acknowledgement()
    }

    pub async fn delete_notification(&self, id: &str) -> Result<(), ApiError> {
        let request = self.request(Method::DELETE, &format!("{NOTIFICATIONS_ROUTE}/{id}"))?;
        self.send::<serde_json::Value>(request)
            .await?
            .into_acknowledgement()
    }
}

impl TemplateBackend for AdminClient {
    async fn upload_template_files(
        &self,
        uploads: &UploadSet,
        both_sides: bool,
    ) -> Result<UploadedUrlSet, ApiError> {
        AdminClient::upload_template_files(self, uploads, both_sides).await
    }

    async fn create_template(
        &self,
        record: &TemplateRecord,
    ) -> Result<Option<Template>, ApiError> {
        AdminClient::create_template(self, record).await
    }
}

impl NotificationSource for AdminClient {
    async fn unread_count(&self) -> Result<u64, ApiError> {
        AdminClient::unread_count(self).await
    }

    async fn recent(&self, limit: u32) -> Result<Vec<Notification>, ApiError> {
        self.list_notifications(NotificationQuery {
            limit,
            ..Default::default()
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};
    use tokio::task::JoinHandle;

    use super::*;
    use crate::builder::sizes::SideMode;
    use crate::builder::staging::tests::{pdf, png};
    use crate::builder::staging::{Kind, Side};
    use crate::builder::wizard::{Navigation, TemplateWizard, WizardError, WizardStep};
    use crate::rest_types::{Category, Orientation, Unit};

    const UPLOADED: &str = r#"{"success": true, "data": {
        "frontBlankUrl": "/uploads/fb.png",
        "frontPreviewUrl": "/uploads/fp.png",
        "backBlankUrl": "",
        "backPreviewUrl": null
    }}"#;

    /// Accepts one connection per canned `(status, body)` response, in order, and returns
    /// the raw requests it received.
    async fn serve(responses: Vec<(u16, &'static str)>) -> (Url, JoinHandle<Vec<String>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url =
            Url::parse(&format!("http://{}/api/", listener.local_addr().unwrap())).unwrap();

        let server = tokio::spawn(async move {
            let mut requests = Vec::new();
            for (status, body) in responses {
                let (mut socket, _) = listener.accept().await.unwrap();
                requests.push(read_request(&mut socket).await);

                let reason = StatusCode::from_u16(status)
                    .unwrap()
                    .canonical_reason()
                    .unwrap_or("");
                let response = format!(
                    "HTTP/1.1 {status} {reason}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                    body.len()
                );
                socket.write_all(response.as_bytes()).await.unwrap();
                socket.shutdown().await.unwrap();
            }
            requests
        });

        (base_url, server)
    }

    async fn read_request(socket: &mut TcpStream) -> String {
        let mut raw = Vec::new();
        let mut buf = [0u8; 4096];
        while !request_complete(&raw) {
            let n = socket.read(&mut buf).await.unwrap();
            if n == 0 {
                break;
            }
            raw.extend_from_slice(&buf[..n]);
        }
        String::from_utf8_lossy(&raw).into_owned()
    }

    fn request_complete(raw: &[u8]) -> bool {
        let Some(header_end) = raw.windows(4).position(|w| w == b"\r\n\r\n") else {
            return false;
        };
        let headers = String::from_utf8_lossy(&raw[..header_end]).to_ascii_lowercase();
        let body_len = raw.len() - (header_end + 4);

        if let Some(length) = headers
            .lines()
            .find_map(|line| line.strip_prefix("content-length:"))
        {
            body_len >= length.trim().parse::<usize>().unwrap()
        } else if headers.contains("transfer-encoding: chunked") {
            raw.ends_with(b"0\r\n\r\n")
        } else {
            true
        }
    }

    fn client(base_url: Url) -> AdminClient {
        AdminClient::new(base_url, Duration::from_secs(5), Some("token".to_string())).unwrap()
    }

    fn record() -> TemplateRecord {
        TemplateRecord {
            name: "Staff badge".to_string(),
            category: Category::Employee,
            folder: "Landscape Templates".to_string(),
            template_width: 85.6,
            template_height: 53.98,
            unit: Unit::Mm,
            both_sides: false,
            orientation: Orientation::Landscape,
            front_blank_url: "/uploads/fb.png".to_string(),
            front_preview_url: "/uploads/fp.png".to_string(),
            back_blank_url: None,
            back_preview_url: None,
            tags: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_upload_sends_front_fields_only_for_single_side() {
        let (base_url, server) = serve(vec![(200, UPLOADED)]).await;
        let mut uploads = UploadSet::default();
        uploads.stage(Side::Front, Kind::Blank, png("fb.png")).unwrap();
        uploads.stage(Side::Front, Kind::Preview, pdf("fp.pdf")).unwrap();
        uploads.stage(Side::Back, Kind::Blank, png("bb.png")).unwrap();

        let urls = client(base_url)
            .upload_template_files(&uploads, false)
            .await
            .unwrap();
        assert_eq!(urls.front_preview_url, "/uploads/fp.png");
        assert_eq!(urls.back_blank_url, None);

        let requests = server.await.unwrap();
        let request = &requests[0];
        assert!(request.starts_with("POST /api/templates/upload "));
        assert!(request.to_ascii_lowercase().contains("authorization: bearer token"));
        assert!(request.contains(r#"name="frontBlank"; filename="fb.png""#));
        assert!(request.contains(r#"name="frontPreview"; filename="fp.pdf""#));
        assert!(request.contains("application/pdf"));
        assert!(!request.contains("backBlank"));
        assert!(!request.contains("backPreview"));
    }

    #[tokio::test]
    async fn test_unsuccessful_envelope_is_rejected_with_server_message() {
        let (base_url, server) =
            serve(vec![(200, r#"{"success": false, "message": "disk full"}"#)]).await;
        let mut uploads = UploadSet::default();
        uploads.stage(Side::Front, Kind::Blank, png("fb.png")).unwrap();
        uploads.stage(Side::Front, Kind::Preview, png("fp.png")).unwrap();

        let err = client(base_url)
            .upload_template_files(&uploads, false)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Rejected { .. }));
        assert_eq!(err.user_message("Failed to upload template files"), "disk full");
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_error_status_carries_json_message() {
        let (base_url, server) = serve(vec![
            (413, r#"{"success": false, "message": "File too large"}"#),
            (401, "Unauthorized"),
        ])
        .await;
        let client = client(base_url);

        let err = client.create_template(&record()).await.unwrap_err();
        match &err {
            ApiError::Status { status, message } => {
                assert_eq!(*status, StatusCode::PAYLOAD_TOO_LARGE);
                assert_eq!(message.as_deref(), Some("File too large"));
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert_eq!(err.user_message("Failed to create template"), "File too large");

        // A body that is not JSON still maps to the status.
        let err = client.current_user().await.unwrap_err();
        assert!(err.is_unauthorized());
        assert_eq!(err.server_message(), None);
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_commit_success_does_not_depend_on_echoed_data() {
        let (base_url, server) = serve(vec![
            (200, r#"{"success": true, "message": "Template created"}"#),
            (200, r#"{"success": true, "data": {"id": 42, "name": "Staff badge"}}"#),
            (200, r#"{"success": false}"#),
        ])
        .await;
        let client = client(base_url);

        assert_eq!(client.create_template(&record()).await.unwrap(), None);
        assert_eq!(client.create_template(&record()).await.unwrap(), None);

        let err = client.create_template(&record()).await.unwrap_err();
        assert_eq!(
            err.user_message("Failed to create template"),
            "Failed to create template"
        );

        let requests = server.await.unwrap();
        assert!(requests[0].starts_with("POST /api/templates/create "));
        assert!(requests[0].contains(r#""folder":"Landscape Templates""#));
        assert!(requests[0].contains(r#""backBlankUrl":null"#));
    }

    #[tokio::test]
    async fn test_wizard_commits_once_when_response_has_no_id() {
        // The create endpoint echoes the record it stored, without an id.
        let (base_url, server) = serve(vec![
            (200, UPLOADED),
            (
                200,
                r#"{"success": true, "message": "Template created", "data": {
                    "name": "Staff badge", "category": "EMPLOYEE",
                    "folder": "Landscape Templates", "templateWidth": 85.6,
                    "templateHeight": 53.98, "unit": "mm", "bothSides": false,
                    "orientation": "LANDSCAPE", "frontBlankUrl": "/uploads/fb.png",
                    "frontPreviewUrl": "/uploads/fp.png", "backBlankUrl": null,
                    "backPreviewUrl": null, "tags": []
                }}"#,
            ),
        ])
        .await;
        let client = client(base_url);
        let mut wizard = TemplateWizard::new(&client);

        wizard.dimensions_mut().unwrap().set_sides(SideMode::Single);
        assert_eq!(wizard.next().await, Ok(WizardStep::CollectUploads));
        wizard.stage(Side::Front, Kind::Blank, png("fb.png")).unwrap();
        wizard.stage(Side::Front, Kind::Preview, png("fp.png")).unwrap();
        assert_eq!(wizard.next().await, Ok(WizardStep::SaveModalOpen));

        let form = wizard.save_form_mut().unwrap();
        form.template_name = "Staff badge".to_string();
        form.category = Some(Category::Employee);
        form.orientation = Some(Orientation::Landscape);

        assert_eq!(wizard.save().await, Ok(Navigation::TemplateList));
        assert_eq!(wizard.step(), WizardStep::Committed);
        assert_eq!(wizard.committed(), Some(&record()));
        assert!(wizard.created().is_none());
        assert_eq!(
            wizard.save().await,
            Err(WizardError::WrongStep(WizardStep::Committed))
        );

        assert_eq!(server.await.unwrap().len(), 2);
    }

    #[test]
    fn test_user_message_prefers_server_text() {
        let rejected = ApiError::Rejected {
            message: Some("disk full".to_string()),
        };
        assert_eq!(rejected.user_message("Failed to upload"), "disk full");

        let bare = ApiError::Rejected { message: None };
        assert_eq!(bare.user_message("Failed to upload"), "Failed to upload");

        let empty = ApiError::Rejected {
            message: Some(String::new()),
        };
        assert_eq!(empty.user_message("Failed to upload"), "Failed to upload");

        let status = ApiError::Status {
            status: StatusCode::PAYLOAD_TOO_LARGE,
            message: Some("File too large".to_string()),
        };
        assert_eq!(status.user_message("Failed to upload"), "File too large");

        let status_without_body = ApiError::Status {
            status: StatusCode::BAD_GATEWAY,
            message: None,
        };
        assert_eq!(
            status_without_body.user_message("Failed to upload"),
            "502 Bad Gateway"
        );
    }

    #[test]
    fn test_envelope_into_data() {
        let ok: ApiResponse<UnreadCount> =
            serde_json::from_str(r#"{"success": true, "data": {"count": 3}}"#).unwrap();
        assert_eq!(ok.into_data().unwrap().count, 3);

        let rejected: ApiResponse<UnreadCount> =
            serde_json::from_str(r#"{"success": false, "message": "nope"}"#).unwrap();
        let err = rejected.into_data().unwrap_err();
        assert_eq!(err.server_message(), Some("nope"));

        let missing: ApiResponse<UnreadCount> =
            serde_json::from_str(r#"{"success": true}"#).unwrap();
        assert!(matches!(missing.into_data(), Err(ApiError::MissingData)));
    }

    #[test]
    fn test_envelope_into_page_defaults_count() {
        let envelope: ApiResponse<Vec<u32>> =
            serde_json::from_str(r#"{"success": true, "data": [1, 2, 3]}"#).unwrap();
        let page = envelope.into_page().unwrap();
        assert_eq!(page.items, vec![1, 2, 3]);
        assert_eq!(page.count, 3);

        let envelope: ApiResponse<Vec<u32>> =
            serde_json::from_str(r#"{"success": true, "data": [1], "count": 40}"#).unwrap();
        assert_eq!(envelope.into_page().unwrap().count, 40);
    }

    #[test]
    fn test_request_joins_routes_onto_base() {
        let client = AdminClient::new(
            Url::parse("https://api.example.com/api/").unwrap(),
            Duration::from_secs(5),
            Some("token".to_string()),
        )
        .unwrap();

        let request = client
            .request(Method::POST, UPLOAD_TEMPLATE_FILES_ROUTE)
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(
            request.url().as_str(),
            "https://api.example.com/api/templates/upload"
        );
        assert_eq!(
            request.headers()["authorization"].to_str().unwrap(),
            "Bearer token"
        );
    }
}
