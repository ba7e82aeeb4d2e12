//! The browse flow: credential, one listing call, then the breadcrumb trail.

use crate::credentials::TokenLifecycle;
use crate::drive::{trail_or_root, DriveApi, FolderNode, ListRequest, ListingPage, ROOT_ID};
use crate::error::AppError;

#[derive(Debug, Clone, Default)]
pub struct BrowseRequest {
    pub parent: Option<String>,
    pub search: Option<String>,
    pub page_token: Option<String>,
}

#[derive(Debug, Clone)]
pub struct BrowsePage {
    pub parent: String,
    pub search: Option<String>,
    pub listing: ListingPage,
    pub trail: Vec<FolderNode>,
}

pub async fn load(
    lifecycle: &TokenLifecycle<'_>,
    drive: &dyn DriveApi,
    user_id: i64,
    request: BrowseRequest,
) -> Result<BrowsePage, AppError> {
    let credential = lifecycle.obtain_valid_credential(user_id).await?;

    let parent = request
        .parent
        .filter(|p| !p.is_empty())
        .unwrap_or_else(|| ROOT_ID.to_string());
    let search = request.search.filter(|s| !s.trim().is_empty());

    let listing = drive
        .list(
            &credential,
            &ListRequest {
                folder_id: parent.clone(),
                search: search.clone(),
                page_token: request.page_token.filter(|t| !t.is_empty()),
            },
        )
        .await?;

    let trail = trail_or_root(drive, &credential, &parent).await;

    Ok(BrowsePage {
        parent,
        search,
        listing,
        trail,
    })
}
