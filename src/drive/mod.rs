//! Google Drive v3 listing, metadata lookups and breadcrumb resolution.

pub mod breadcrumbs;
pub mod client;
pub mod query;

pub use breadcrumbs::{resolve_path, trail_or_root};
pub use client::DriveClient;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::credentials::Credential;
use crate::error::AppError;

/// Sentinel id Drive accepts for the user's "My Drive" root.
pub const ROOT_ID: &str = "root";

pub const FOLDER_MIME: &str = "application/vnd.google-apps.folder";

/// File or folder metadata as returned by `files.list` / `files.get`.
/// Only the requested fields are populated.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveItem {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub mime_type: String,
    #[serde(default)]
    pub modified_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub thumbnail_link: Option<String>,
    #[serde(default)]
    pub parents: Vec<String>,
}

impl DriveItem {
    pub fn is_folder(&self) -> bool {
        self.mime_type == FOLDER_MIME
    }

    /// Docs, Sheets, etc. have no binary content to download.
    pub fn is_workspace_document(&self) -> bool {
        self.mime_type.starts_with("application/vnd.google-apps.")
    }
}

/// One page of a folder listing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListingPage {
    pub entries: Vec<DriveItem>,
    /// `None` means this was the last page.
    pub next_page_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ListRequest {
    pub folder_id: String,
    pub search: Option<String>,
    /// Opaque continuation token from a previous page.
    pub page_token: Option<String>,
}

/// One breadcrumb.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderNode {
    pub id: String,
    pub name: String,
}

impl FolderNode {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }

    pub fn root() -> Self {
        Self::new(ROOT_ID, breadcrumbs::ROOT_LABEL)
    }
}

/// The two Drive calls the browse flow is built on.
#[async_trait]
pub trait DriveApi: Send + Sync {
    /// List direct, non-trashed children of a folder.
    async fn list(
        &self,
        credential: &Credential,
        request: &ListRequest,
    ) -> Result<ListingPage, AppError>;

    /// Single-item metadata lookup restricted to `fields`.
    async fn get_item(
        &self,
        credential: &Credential,
        item_id: &str,
        fields: &str,
    ) -> Result<DriveItem, AppError>;
}
