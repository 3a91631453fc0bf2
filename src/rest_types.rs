use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::serde_utils;

/// Standard `{success, message, data}` envelope every endpoint answers with.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default = "Option::default")]
    pub data: Option<T>,
    #[serde(default)]
    pub count: Option<u64>,
}

/// Body of a non-2xx response. Only the message is of interest.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ErrorBody {
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Unit {
    Mm,
    Cm,
    In,
}

impl std::fmt::Display for Unit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Unit::Mm => write!(f, "mm"),
            Unit::Cm => write!(f, "cm"),
            Unit::In => write!(f, "in"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Orientation {
    Landscape,
    Portrait,
}

impl Orientation {
    /// Storage folder the backend files a template under.
    pub fn folder(self) -> &'static str {
        match self {
            Orientation::Landscape => "Landscape Templates",
            Orientation::Portrait => "Portrait Templates",
        }
    }
}

impl std::fmt::Display for Orientation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Orientation::Landscape => write!(f, "Landscape"),
            Orientation::Portrait => write!(f, "Portrait"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Category {
    Employee,
    Student,
    Visitor,
    Membership,
    Custom,
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Category::Employee => write!(f, "Employee ID"),
            Category::Student => write!(f, "Student ID"),
            Category::Visitor => write!(f, "Visitor Pass"),
            Category::Membership => write!(f, "Membership Card"),
            Category::Custom => write!(f, "Custom"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedUrlSet {
    pub front_blank_url: String,
    pub front_preview_url: String,
    #[serde(default, deserialize_with = "serde_utils::empty_string_as_none")]
    pub back_blank_url: Option<String>,
    #[serde(default, deserialize_with = "serde_utils::empty_string_as_none")]
    pub back_preview_url: Option<String>,
}

impl UploadedUrlSet {
    pub fn has_back(&self) -> bool {
        self.back_blank_url.is_some() && self.back_preview_url.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateRecord {
    pub name: String,
    pub category: Category,
    pub folder: String,
    pub template_width: f64,
    pub template_height: f64,
    pub unit: Unit,
    pub both_sides: bool,
    pub orientation: Orientation,
    pub front_blank_url: String,
    pub front_preview_url: String,
    #[serde(default)]
    pub back_blank_url: Option<String>,
    #[serde(default)]
    pub back_preview_url: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    pub id: String,
    #[serde(flatten)]
    pub record: TemplateRecord,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum TemplateSource {
    All,
    MyTemplates,
    Myprintbot,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateFilters {
    pub limit: u32,
    pub offset: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub orientation: Option<Orientation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<TemplateSource>,
}

#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub count: u64,
}

impl<T> Page<T> {
    pub fn total_pages(&self, limit: u32) -> u64 {
        if limit == 0 {
            return 1;
        }
        self.count.div_ceil(u64::from(limit)).max(1)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdminUser {
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub user: AdminUser,
    pub token: String,
}

/// The signin endpoint answers either with the envelope or with the bare payload.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum LoginBody {
    Wrapped(ApiResponse<LoginResponse>),
    Bare(LoginResponse),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub is_read: bool,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationQuery {
    pub limit: u32,
    pub offset: u32,
    pub unread_only: bool,
}

impl Default for NotificationQuery {
    fn default() -> Self {
        Self {
            limit: 50,
            offset: 0,
            unread_only: false,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct UnreadCount {
    #[serde(default)]
    pub count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_record_wire_format() {
        let record = TemplateRecord {
            name: "Staff".to_string(),
            category: Category::Employee,
            folder: Orientation::Landscape.folder().to_string(),
            template_width: 85.6,
            template_height: 53.98,
            unit: Unit::Mm,
            both_sides: false,
            orientation: Orientation::Landscape,
            front_blank_url: "/uploads/fb.png".to_string(),
            front_preview_url: "/uploads/fp.png".to_string(),
            back_blank_url: None,
            back_preview_url: None,
            tags: vec![],
        };

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["templateWidth"], 85.6);
        assert_eq!(value["category"], "EMPLOYEE");
        assert_eq!(value["orientation"], "LANDSCAPE");
        assert_eq!(value["folder"], "Landscape Templates");
        assert_eq!(value["unit"], "mm");
        assert_eq!(value["bothSides"], false);
        assert!(value["backBlankUrl"].is_null());
        assert!(value["backPreviewUrl"].is_null());
        assert_eq!(value["tags"], serde_json::json!([]));
    }

    #[test]
    fn test_failed_envelope_without_data() {
        let json = r#"{"success": false, "message": "disk full"}"#;
        let response: ApiResponse<UploadedUrlSet> = serde_json::from_str(json).unwrap();
        assert!(!response.success);
        assert_eq!(response.message.as_deref(), Some("disk full"));
        assert!(response.data.is_none());
    }

    #[test]
    fn test_login_body_accepts_both_shapes() {
        let wrapped = r#"{"success": true, "data": {"user": {"id": "1", "email": "a@b.co"}, "token": "t"}}"#;
        let bare = r#"{"user": {"id": "1", "email": "a@b.co"}, "token": "t"}"#;

        assert!(matches!(
            serde_json::from_str::<LoginBody>(wrapped).unwrap(),
            LoginBody::Wrapped(_)
        ));
        assert!(matches!(
            serde_json::from_str::<LoginBody>(bare).unwrap(),
            LoginBody::Bare(_)
        ));
    }

    #[test]
    fn test_total_pages() {
        let page: Page<Template> = Page {
            items: vec![],
            count: 25,
        };
        assert_eq!(page.total_pages(12), 3);

        let empty: Page<Template> = Page {
            items: vec![],
            count: 0,
        };
        assert_eq!(empty.total_pages(12), 1);
    }

    #[test]
    fn test_filters_skip_unset_fields() {
        let filters = TemplateFilters {
            limit: 12,
            offset: 24,
            orientation: Some(Orientation::Portrait),
            source: Some(TemplateSource::MyTemplates),
            ..Default::default()
        };
        let value = serde_json::to_value(&filters).unwrap();
        assert_eq!(value["orientation"], "PORTRAIT");
        assert_eq!(value["source"], "my-templates");
        assert!(value.get("category").is_none());
        assert!(value.get("search").is_none());
    }
}
