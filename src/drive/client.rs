//! Google Drive API client.

use async_trait::async_trait;
use axum::body::Body;
use reqwest::{header, Client, Response};
use serde::Deserialize;
use url::Url;

use super::{query, DriveApi, DriveItem, ListRequest, ListingPage};
use crate::credentials::Credential;
use crate::error::AppError;

/// Google Drive API base URL.
const DRIVE_API_BASE: &str = "https://www.googleapis.com/drive/v3";

/// Entries per listing page.
pub const PAGE_SIZE: u32 = 20;

const LIST_FIELDS: &str =
    "nextPageToken, files(id, name, mimeType, thumbnailLink, modifiedTime, parents)";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileListResponse {
    #[serde(default)]
    files: Vec<DriveItem>,
    #[serde(default)]
    next_page_token: Option<String>,
}

/// Binary content from Drive, streamed through to the browser as it arrives.
#[derive(Debug)]
pub struct Fetched {
    pub file_name: String,
    pub content_type: String,
    /// Forwarded from Drive when it sends one.
    pub content_length: Option<u64>,
    pub body: Body,
}

/// Google Drive API client.
pub struct DriveClient {
    http: Client,
    api_base: String,
}

impl DriveClient {
    pub fn new() -> Result<Self, AppError> {
        Self::with_base_url(DRIVE_API_BASE)
    }

    pub fn with_base_url(api_base: &str) -> Result<Self, AppError> {
        let http = Client::builder()
            .user_agent(concat!("drive-manager/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
        })
    }

    /// `{base}/files[/{id}]` with the id percent-encoded as a single path segment.
    fn files_url(&self, item_id: Option<&str>) -> Result<Url, AppError> {
        let mut url = Url::parse(&self.api_base)
            .map_err(|e| AppError::Internal(format!("Invalid Drive API base: {e}")))?;
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| AppError::Internal("Drive API base cannot be a base URL".into()))?;
            segments.pop_if_empty().push("files");
            if let Some(id) = item_id {
                segments.push(id);
            }
        }
        Ok(url)
    }

    /// Download a file's content. Workspace documents are refused since
    /// they only exist as exports.
    pub async fn download(&self, credential: &Credential, item_id: &str) -> Result<Fetched, AppError> {
        let item = self
            .get_item(credential, item_id, "id, name, mimeType")
            .await?;

        if item.is_folder() || item.is_workspace_document() {
            return Err(AppError::BadRequest(format!(
                "'{}' has no downloadable content",
                item.name
            )));
        }

        let response = self
            .http
            .get(self.files_url(Some(item_id))?)
            .bearer_auth(credential.bearer())
            .query(&[("alt", "media")])
            .send()
            .await
            .map_err(|e| AppError::RemoteApi(format!("Failed to download file: {e}")))?;

        let response = check_status(response).await?;

        let content_type = if item.mime_type.is_empty() {
            "application/octet-stream".to_string()
        } else {
            item.mime_type
        };

        Ok(Fetched {
            file_name: item.name,
            content_type,
            content_length: response.content_length(),
            body: Body::from_stream(response.bytes_stream()),
        })
    }

    /// Fetch the thumbnail image Drive generated for an item.
    pub async fn thumbnail(&self, credential: &Credential, item_id: &str) -> Result<Fetched, AppError> {
        let item = self
            .get_item(credential, item_id, "id, name, thumbnailLink")
            .await?;

        let link = item
            .thumbnail_link
            .ok_or_else(|| AppError::NotFound("thumbnail".into()))?;

        let response = self
            .http
            .get(&link)
            .bearer_auth(credential.bearer())
            .send()
            .await
            .map_err(|e| AppError::RemoteApi(format!("Failed to fetch thumbnail: {e}")))?;

        let response = check_status(response).await?;
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("image/png")
            .to_string();

        Ok(Fetched {
            file_name: item.name,
            content_type,
            content_length: response.content_length(),
            body: Body::from_stream(response.bytes_stream()),
        })
    }
}

#[async_trait]
impl DriveApi for DriveClient {
    async fn list(
        &self,
        credential: &Credential,
        request: &ListRequest,
    ) -> Result<ListingPage, AppError> {
        let filter = query::children_filter(&request.folder_id, request.search.as_deref());
        let page_size = PAGE_SIZE.to_string();

        let mut params = vec![
            ("q", filter.as_str()),
            ("pageSize", page_size.as_str()),
            ("fields", LIST_FIELDS),
        ];
        if let Some(token) = request.page_token.as_deref() {
            params.push(("pageToken", token));
        }

        let response = self
            .http
            .get(self.files_url(None)?)
            .bearer_auth(credential.bearer())
            .query(&params)
            .send()
            .await
            .map_err(|e| AppError::RemoteApi(format!("Failed to list folder: {e}")))?;

        let listing: FileListResponse = parse_json(response).await?;
        Ok(ListingPage {
            entries: listing.files,
            next_page_token: listing.next_page_token.filter(|t| !t.is_empty()),
        })
    }

    async fn get_item(
        &self,
        credential: &Credential,
        item_id: &str,
        fields: &str,
    ) -> Result<DriveItem, AppError> {
        let response = self
            .http
            .get(self.files_url(Some(item_id))?)
            .bearer_auth(credential.bearer())
            .query(&[("fields", fields)])
            .send()
            .await
            .map_err(|e| AppError::RemoteApi(format!("Failed to get file: {e}")))?;

        parse_json(response).await
    }
}

async fn check_status(response: Response) -> Result<Response, AppError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(AppError::RemoteApi(format!("{status} - {body}")))
}

async fn parse_json<T: serde::de::DeserializeOwned>(response: Response) -> Result<T, AppError> {
    check_status(response)
        .await?
        .json()
        .await
        .map_err(|e| AppError::RemoteApi(format!("Failed to parse response: {e}")))
}
