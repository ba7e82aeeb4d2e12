//! In-memory doubles for the store, OAuth provider and Drive seams.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use url::Url;

use crate::credentials::Credential;
use crate::crypto::CryptoEngine;
use crate::drive::{DriveApi, DriveItem, ListRequest, ListingPage, FOLDER_MIME};
use crate::error::AppError;
use crate::providers::{OAuthProvider, TokenSet};
use crate::store::{CredentialStore, TokenRecord};

pub fn credential(access_token: &str) -> Credential {
    Credential {
        access_token: access_token.into(),
        token_type: "Bearer".into(),
        expires_in: Some(3599),
        scope: None,
        created: Utc::now().timestamp(),
    }
}

pub fn fresh_blob(access_token: &str) -> String {
    credential(access_token).to_blob().unwrap()
}

pub fn expired_blob(access_token: &str) -> String {
    let mut cred = credential(access_token);
    cred.created = (Utc::now() - Duration::hours(2)).timestamp();
    cred.to_blob().unwrap()
}

/// Keys unrelated to `crypto::test_engine`, as after a MASTER_KEY rotation.
pub fn rotated_engine() -> CryptoEngine {
    use base64::Engine as _;
    let key = base64::engine::general_purpose::STANDARD.encode([0x11u8; 32]);
    let secret = base64::engine::general_purpose::STANDARD.encode([0x12u8; 32]);
    CryptoEngine::new(&key, &secret).unwrap()
}

fn token_set(access_token: &str, refresh_token: Option<&str>) -> TokenSet {
    TokenSet {
        access_token: access_token.into(),
        refresh_token: refresh_token.map(Into::into),
        token_type: "Bearer".into(),
        expires_in: Some(3599),
        scope: None,
    }
}

// ── Store ────────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct FakeStore {
    records: Mutex<Vec<TokenRecord>>,
    updates: Mutex<Vec<(i64, String)>>,
}

impl FakeStore {
    pub fn with_record(user_id: i64, record_id: i64, blob: &str, refresh_token: Option<&str>) -> Self {
        let store = Self::default();
        store.records.lock().unwrap().push(TokenRecord {
            id: record_id,
            user_id,
            access_token: blob.into(),
            refresh_token: refresh_token.map(Into::into),
            created_at: Utc::now(),
        });
        store
    }

    /// Every `(record_id, blob)` passed to `update_access_token`.
    pub fn updates(&self) -> Vec<(i64, String)> {
        self.updates.lock().unwrap().clone()
    }

    pub fn latest(&self, user_id: i64) -> Option<TokenRecord> {
        self.records
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.user_id == user_id)
            .max_by_key(|r| r.id)
            .cloned()
    }
}

#[async_trait]
impl CredentialStore for FakeStore {
    async fn get_latest_token(&self, user_id: i64) -> Result<Option<TokenRecord>, AppError> {
        Ok(self.latest(user_id))
    }

    async fn update_access_token(&self, record_id: i64, blob: &str) -> Result<(), AppError> {
        let mut records = self.records.lock().unwrap();
        let record = records
            .iter_mut()
            .find(|r| r.id == record_id)
            .ok_or_else(|| AppError::NotFound("token record".into()))?;
        record.access_token = blob.into();
        self.updates.lock().unwrap().push((record_id, blob.into()));
        Ok(())
    }

    async fn insert_token(
        &self,
        user_id: i64,
        blob: &str,
        refresh_token: Option<&str>,
    ) -> Result<i64, AppError> {
        let mut records = self.records.lock().unwrap();
        let id = records.iter().map(|r| r.id).max().unwrap_or(0) + 1;
        records.push(TokenRecord {
            id,
            user_id,
            access_token: blob.into(),
            refresh_token: refresh_token.filter(|rt| !rt.is_empty()).map(Into::into),
            created_at: Utc::now(),
        });
        Ok(id)
    }
}

// ── OAuth provider ───────────────────────────────────────────────────────────

#[derive(Default)]
pub struct FakeProvider {
    refresh_result: Option<TokenSet>,
    exchange_result: Option<TokenSet>,
    refresh_calls: AtomicUsize,
    exchange_calls: AtomicUsize,
    last_refresh_token: Mutex<Option<String>>,
}

impl FakeProvider {
    pub fn refreshing_to(access_token: &str) -> Self {
        Self {
            refresh_result: Some(token_set(access_token, None)),
            ..Self::default()
        }
    }

    /// Every refresh fails as if the grant had been revoked.
    pub fn rejecting() -> Self {
        Self::default()
    }

    pub fn exchanging_to(access_token: &str, refresh_token: Option<&str>) -> Self {
        Self {
            exchange_result: Some(token_set(access_token, refresh_token)),
            ..Self::default()
        }
    }

    pub fn refresh_calls(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    pub fn exchange_calls(&self) -> usize {
        self.exchange_calls.load(Ordering::SeqCst)
    }

    pub fn last_refresh_token(&self) -> Option<String> {
        self.last_refresh_token.lock().unwrap().clone()
    }

    /// The `state` query parameter of a URL built by [`OAuthProvider::auth_url`].
    pub fn state_from(&self, url: &str) -> Option<String> {
        Url::parse(url)
            .ok()?
            .query_pairs()
            .find(|(k, _)| k == "state")
            .map(|(_, v)| v.into_owned())
    }
}

#[async_trait]
impl OAuthProvider for FakeProvider {
    fn id(&self) -> &str {
        "fake"
    }

    fn default_scopes(&self) -> Vec<String> {
        vec!["drive".into()]
    }

    fn auth_url(&self, scopes: &[String], state: &str, redirect_uri: &str) -> String {
        let scope = scopes.join(" ");
        Url::parse_with_params(
            "https://accounts.example/auth",
            &[
                ("scope", scope.as_str()),
                ("state", state),
                ("redirect_uri", redirect_uri),
            ],
        )
        .unwrap()
        .to_string()
    }

    async fn exchange_code(&self, _code: &str, _redirect_uri: &str) -> Result<TokenSet, AppError> {
        self.exchange_calls.fetch_add(1, Ordering::SeqCst);
        self.exchange_result
            .clone()
            .ok_or_else(|| AppError::ProviderError("invalid_grant".into()))
    }

    async fn refresh_token(&self, refresh_token: &str) -> Result<TokenSet, AppError> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_refresh_token.lock().unwrap() = Some(refresh_token.into());
        self.refresh_result
            .clone()
            .ok_or_else(|| AppError::RefreshFailed("invalid_grant".into()))
    }
}

// ── Drive ────────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct FakeDrive {
    items: HashMap<String, DriveItem>,
    listings: HashMap<String, ListingPage>,
    failing: HashSet<String>,
    get_calls: AtomicUsize,
    list_requests: Mutex<Vec<ListRequest>>,
}

impl FakeDrive {
    pub fn with_folder(mut self, id: &str, name: &str, parents: &[&str]) -> Self {
        self.items.insert(
            id.into(),
            DriveItem {
                id: id.into(),
                name: name.into(),
                mime_type: FOLDER_MIME.into(),
                modified_time: None,
                thumbnail_link: None,
                parents: parents.iter().map(|p| p.to_string()).collect(),
            },
        );
        self
    }

    pub fn with_listing(mut self, folder_id: &str, page: ListingPage) -> Self {
        self.listings.insert(folder_id.into(), page);
        self
    }

    /// Any call touching `id` fails with a remote error.
    pub fn failing_on(mut self, id: &str) -> Self {
        self.failing.insert(id.into());
        self
    }

    pub fn get_calls(&self) -> usize {
        self.get_calls.load(Ordering::SeqCst)
    }

    pub fn list_requests(&self) -> Vec<ListRequest> {
        self.list_requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl DriveApi for FakeDrive {
    async fn list(
        &self,
        _credential: &Credential,
        request: &ListRequest,
    ) -> Result<ListingPage, AppError> {
        self.list_requests.lock().unwrap().push(request.clone());
        if self.failing.contains(&request.folder_id) {
            return Err(AppError::RemoteApi("500 - backend error".into()));
        }
        Ok(self
            .listings
            .get(&request.folder_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn get_item(
        &self,
        _credential: &Credential,
        item_id: &str,
        _fields: &str,
    ) -> Result<DriveItem, AppError> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.contains(item_id) {
            return Err(AppError::RemoteApi("500 - backend error".into()));
        }
        self.items
            .get(item_id)
            .cloned()
            .ok_or_else(|| AppError::RemoteApi(format!("404 - File not found: {item_id}")))
    }
}
