//! Breadcrumb resolution: walk parent links from a folder up to "My Drive".

use std::collections::VecDeque;

use tracing::warn;

use super::{DriveApi, FolderNode, ROOT_ID};
use crate::credentials::Credential;
use crate::error::AppError;

/// Display name of the synthetic root crumb.
pub const ROOT_LABEL: &str = "Drive";

/// Upper bound on lookups for one trail. Drive forbids cycles, but a
/// misbehaving API must not keep us walking forever.
pub const MAX_DEPTH: usize = 64;

const CRUMB_FIELDS: &str = "id, name, parents";

fn is_root(id: &str) -> bool {
    id.is_empty() || id == ROOT_ID
}

/// Ordered trail from the root to `start`, inclusive.
///
/// Every looked-up item is prepended, then the walk moves to its first
/// parent. It stops once an item has no parents or its parent is the `root`
/// alias. The synthetic root crumb is always prepended last.
pub async fn resolve_path(
    drive: &dyn DriveApi,
    credential: &Credential,
    start: &str,
) -> Result<Vec<FolderNode>, AppError> {
    let mut trail = VecDeque::new();
    let mut current = start.to_string();

    while !is_root(&current) {
        if trail.len() >= MAX_DEPTH {
            return Err(AppError::RemoteApi(format!(
                "folder {start} is nested deeper than {MAX_DEPTH} levels"
            )));
        }

        let item = drive.get_item(credential, &current, CRUMB_FIELDS).await?;

        // No parent (a shared folder or the concrete root) ends the walk.
        current = item.parents.first().cloned().unwrap_or_default();
        trail.push_front(FolderNode::new(item.id, item.name));
    }

    trail.push_front(FolderNode::root());
    Ok(trail.into())
}

/// [`resolve_path`], degraded to the root crumb alone on any failure.
pub async fn trail_or_root(
    drive: &dyn DriveApi,
    credential: &Credential,
    start: &str,
) -> Vec<FolderNode> {
    match resolve_path(drive, credential, start).await {
        Ok(trail) => trail,
        Err(e) => {
            warn!(folder_id = start, "breadcrumb lookup failed, showing root only: {e}");
            vec![FolderNode::root()]
        }
    }
}
