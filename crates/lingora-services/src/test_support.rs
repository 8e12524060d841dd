//! In-memory fakes shared by the coordinator and pipeline tests. They mirror
//! the observable semantics of the real store and cache so tests exercise the
//! consistency paths without Postgres or Redis.

use std::collections::HashMap;
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use lingora_cache::ProfileCache;
use lingora_core::models::{ProfileRecord, ProfileUpdate, ProfileView};
use lingora_core::AppError;
use lingora_db::ProfileStore;

use crate::notify::ChangeNotifier;

/// Notifier with no endpoint configured; change events are dropped.
pub fn test_notifier() -> Arc<ChangeNotifier> {
    Arc::new(ChangeNotifier::new(None).expect("notifier without endpoint"))
}

/// Deterministic PNG payload. The gradient keeps the encoded size above the
/// upload floor without approaching the cap at the dimensions tests use.
pub fn gradient_png(width: u32, height: u32) -> Vec<u8> {
    let image = DynamicImage::ImageRgba8(RgbaImage::from_fn(width, height, |x, y| {
        Rgba([x as u8, y as u8, (x ^ y) as u8, 255])
    }));
    let mut buffer = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
        .unwrap();
    buffer
}

/// Consume one unit from a rigged-failure counter. True while units remain.
fn take_rigged_failure(counter: &AtomicUsize) -> bool {
    counter
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

/// Profile store over a mutex-guarded map.
///
/// The public counters rig the next N calls of an operation to fail, which
/// is how tests drive the retry and compensation paths: `conflicts_remaining`
/// makes `apply_update` report a commit race, `avatar_commit_failures` makes
/// `set_avatar` fail before touching any record.
#[derive(Default)]
pub struct InMemoryProfileStore {
    records: Mutex<HashMap<String, ProfileRecord>>,
    pub conflicts_remaining: AtomicUsize,
    pub avatar_commit_failures: AtomicUsize,
}

impl InMemoryProfileStore {
    pub fn record(&self, owner_id: &str) -> Option<ProfileRecord> {
        self.records.lock().unwrap().get(owner_id).cloned()
    }

    pub fn insert(&self, record: ProfileRecord) {
        self.records
            .lock()
            .unwrap()
            .insert(record.owner_id.clone(), record);
    }
}

#[async_trait]
impl ProfileStore for InMemoryProfileStore {
    async fn fetch(&self, owner_id: &str) -> Result<Option<ProfileRecord>, AppError> {
        Ok(self.record(owner_id))
    }

    async fn fetch_or_create(&self, owner_id: &str) -> Result<ProfileRecord, AppError> {
        let mut records = self.records.lock().unwrap();
        let record = records
            .entry(owner_id.to_string())
            .or_insert_with(|| ProfileRecord::new(owner_id));
        Ok(record.clone())
    }

    async fn apply_update(
        &self,
        owner_id: &str,
        update: &ProfileUpdate,
        actor: &str,
    ) -> Result<ProfileRecord, AppError> {
        if take_rigged_failure(&self.conflicts_remaining) {
            return Err(AppError::ConflictOnCommit);
        }

        let mut records = self.records.lock().unwrap();
        let record = records
            .entry(owner_id.to_string())
            .or_insert_with(|| ProfileRecord::new(owner_id));
        update.apply_to(record);
        record.recompute_search_vector();
        record.mark_updated(actor);
        Ok(record.clone())
    }

    async fn set_avatar(
        &self,
        owner_id: &str,
        key: &str,
        url: &str,
    ) -> Result<(ProfileRecord, Option<String>), AppError> {
        if take_rigged_failure(&self.avatar_commit_failures) {
            return Err(AppError::Internal("avatar commit rigged to fail".to_string()));
        }

        let mut records = self.records.lock().unwrap();
        let record = records
            .entry(owner_id.to_string())
            .or_insert_with(|| ProfileRecord::new(owner_id));
        let previous = record.avatar_key.clone();
        record.avatar_key = Some(key.to_string());
        record.avatar_url = Some(url.to_string());
        record.mark_updated(owner_id);
        Ok((record.clone(), previous))
    }

    async fn current_avatar_key(&self, owner_id: &str) -> Result<Option<String>, AppError> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .get(owner_id)
            .and_then(|record| record.avatar_key.clone()))
    }

    async fn clear_avatar(
        &self,
        owner_id: &str,
        key: &str,
    ) -> Result<Option<ProfileRecord>, AppError> {
        let mut records = self.records.lock().unwrap();
        let record = match records.get_mut(owner_id) {
            Some(record) if record.avatar_key.as_deref() == Some(key) => record,
            _ => return Ok(None),
        };

        record.avatar_key = None;
        record.avatar_url = None;
        record.mark_updated(owner_id);
        Ok(Some(record.clone()))
    }

    async fn clear_document_reference(
        &self,
        owner_id: &str,
        key: &str,
    ) -> Result<Option<ProfileRecord>, AppError> {
        let mut records = self.records.lock().unwrap();
        let record = match records.get_mut(owner_id) {
            Some(record) => record,
            None => return Ok(None),
        };

        let now = Utc::now();
        let mut matched = false;
        for cert in &mut record.certifications {
            if cert.document_key.as_deref() == Some(key) {
                cert.document_key = None;
                cert.updated_at = now;
                matched = true;
            }
        }
        if !matched {
            return Ok(None);
        }

        record.mark_updated(owner_id);
        Ok(Some(record.clone()))
    }
}

/// Cache fake retaining entries in a map, with an accessor for asserting on
/// write-through contents and a counter for the derived-key sweeps.
#[derive(Default)]
pub struct InMemoryProfileCache {
    entries: Mutex<HashMap<String, ProfileView>>,
    pub invalidations: AtomicUsize,
}

impl InMemoryProfileCache {
    pub fn cached(&self, owner_id: &str) -> Option<ProfileView> {
        self.entries.lock().unwrap().get(owner_id).cloned()
    }
}

#[async_trait]
impl ProfileCache for InMemoryProfileCache {
    async fn get(&self, owner_id: &str) -> Option<ProfileView> {
        self.cached(owner_id)
    }

    async fn put(&self, owner_id: &str, view: &ProfileView) {
        self.entries
            .lock()
            .unwrap()
            .insert(owner_id.to_string(), view.clone());
    }

    async fn invalidate(&self, owner_id: &str) {
        self.invalidations.fetch_add(1, Ordering::SeqCst);
        self.entries.lock().unwrap().remove(owner_id);
    }
}

/// Cache that accepts writes and never returns them, standing in for an
/// unreachable backend.
pub struct DropEverythingCache;

#[async_trait]
impl ProfileCache for DropEverythingCache {
    async fn get(&self, _owner_id: &str) -> Option<ProfileView> {
        None
    }

    async fn put(&self, _owner_id: &str, _view: &ProfileView) {}

    async fn invalidate(&self, _owner_id: &str) {}
}
