//! Askama page models. Links are built here so templates stay declarative.

use askama::Template;
use url::form_urlencoded;

use super::browse::BrowsePage;
use crate::drive::{DriveItem, FolderNode, ROOT_ID};

#[derive(Template)]
#[template(path = "login.html")]
pub struct LoginPage<'a> {
    pub error: Option<&'a str>,
}

#[derive(Template)]
#[template(path = "connect.html")]
pub struct ConnectPage<'a> {
    pub consent_url: &'a str,
    /// A token existed but could not be used or renewed.
    pub reconnect: bool,
}

#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorPage<'a> {
    pub status: u16,
    pub message: &'a str,
}

pub struct CrumbLink {
    pub name: String,
    pub href: String,
}

pub struct EntryCard {
    pub name: String,
    pub is_folder: bool,
    pub modified: Option<String>,
    pub open_href: String,
    pub download_href: Option<String>,
    pub thumb_href: Option<String>,
}

#[derive(Template)]
#[template(path = "browse.html")]
pub struct BrowseView {
    pub crumbs: Vec<CrumbLink>,
    pub parent: String,
    pub search: String,
    pub entries: Vec<EntryCard>,
    pub next_href: Option<String>,
}

/// `/?k=v&...` with every value form-encoded.
fn index_href(pairs: &[(&str, &str)]) -> String {
    let query = form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs)
        .finish();
    if query.is_empty() {
        "/".to_string()
    } else {
        format!("/?{query}")
    }
}

fn folder_href(id: &str) -> String {
    if id == ROOT_ID {
        index_href(&[])
    } else {
        index_href(&[("parent", id)])
    }
}

impl From<&FolderNode> for CrumbLink {
    fn from(node: &FolderNode) -> Self {
        Self {
            name: node.name.clone(),
            href: folder_href(&node.id),
        }
    }
}

impl From<&DriveItem> for EntryCard {
    fn from(item: &DriveItem) -> Self {
        let open_href = if item.is_folder() {
            folder_href(&item.id)
        } else {
            format!("https://drive.google.com/file/d/{}/view", item.id)
        };

        let download_href = (!item.is_workspace_document())
            .then(|| index_href(&[("action", "download"), ("id", &item.id)]));
        let thumb_href = item
            .thumbnail_link
            .as_ref()
            .map(|_| index_href(&[("action", "thumb"), ("id", &item.id)]));

        Self {
            name: item.name.clone(),
            is_folder: item.is_folder(),
            modified: item
                .modified_time
                .map(|t| t.format("%Y-%m-%d %H:%M").to_string()),
            open_href,
            download_href,
            thumb_href,
        }
    }
}

impl From<&BrowsePage> for BrowseView {
    fn from(page: &BrowsePage) -> Self {
        let search = page.search.clone().unwrap_or_default();

        let next_href = page.listing.next_page_token.as_deref().map(|token| {
            let mut pairs = vec![("parent", page.parent.as_str())];
            if !search.is_empty() {
                pairs.push(("search", search.as_str()));
            }
            pairs.push(("pageToken", token));
            index_href(&pairs)
        });

        Self {
            crumbs: page.trail.iter().map(CrumbLink::from).collect(),
            parent: page.parent.clone(),
            entries: page.listing.entries.iter().map(EntryCard::from).collect(),
            search,
            next_href,
        }
    }
}
