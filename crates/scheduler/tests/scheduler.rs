use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use weighin_common::error::AppError;
use weighin_common::types::{Notification, NotificationPreference};
use weighin_engine::{NotificationStore, QueueProcessor};
use weighin_notifier::{DispatchError, PushMessage, PushProvider};
use weighin_scheduler::{QueueScheduler, RunGuard};

/// Store with an empty queue that counts fetches.
#[derive(Default)]
struct EmptyStore {
    fetches: AtomicUsize,
}

#[async_trait]
impl NotificationStore for EmptyStore {
    async fn fetch_queued(&self, _limit: i64) -> Result<Vec<Notification>, AppError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        Ok(Vec::new())
    }

    async fn find_preference(
        &self,
        _user_id: Uuid,
    ) -> Result<Option<NotificationPreference>, AppError> {
        Ok(None)
    }

    async fn insert_preference(
        &self,
        preference: &NotificationPreference,
    ) -> Result<NotificationPreference, AppError> {
        Ok(preference.clone())
    }

    async fn mark_dispatched(&self, _ids: &[Uuid], _at: DateTime<Utc>) -> Result<u64, AppError> {
        Ok(0)
    }
}

struct SilentProvider;

#[async_trait]
impl PushProvider for SilentProvider {
    fn name(&self) -> &'static str {
        "silent"
    }

    async fn send(&self, _message: &PushMessage) -> Result<(), DispatchError> {
        Ok(())
    }
}

/// Guard whose availability is fixed; counts releases.
struct FixedGuard {
    available: bool,
    releases: Arc<AtomicUsize>,
}

#[async_trait]
impl RunGuard for FixedGuard {
    async fn try_acquire(&mut self) -> Result<bool, AppError> {
        Ok(self.available)
    }

    async fn release(&mut self) -> Result<(), AppError> {
        self.releases.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

fn scheduler(
    store: Arc<EmptyStore>,
    available: bool,
    releases: Arc<AtomicUsize>,
) -> QueueScheduler<FixedGuard> {
    let processor = QueueProcessor::new(store, Arc::new(SilentProvider));
    QueueScheduler::new(
        processor,
        FixedGuard {
            available,
            releases,
        },
        Duration::from_secs(60),
    )
}

#[tokio::test]
async fn test_run_once_with_lock_processes_and_releases() {
    let store = Arc::new(EmptyStore::default());
    let releases = Arc::new(AtomicUsize::new(0));
    let mut scheduler = scheduler(store.clone(), true, releases.clone());

    let summary = scheduler.run_once().await.unwrap().expect("run should happen");

    assert!(summary.success);
    assert_eq!(summary.total, 0);
    assert_eq!(store.fetches.load(Ordering::SeqCst), 1);
    assert_eq!(releases.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_run_once_skips_when_lock_held() {
    let store = Arc::new(EmptyStore::default());
    let releases = Arc::new(AtomicUsize::new(0));
    let mut scheduler = scheduler(store.clone(), false, releases.clone());

    let result = scheduler.run_once().await.unwrap();

    assert!(result.is_none());
    assert_eq!(store.fetches.load(Ordering::SeqCst), 0);
    assert_eq!(releases.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn test_run_ticks_on_interval() {
    let store = Arc::new(EmptyStore::default());
    let releases = Arc::new(AtomicUsize::new(0));
    let mut scheduler = scheduler(store.clone(), true, releases);

    // Immediate run, then one per 60s
    let _ = tokio::time::timeout(Duration::from_secs(125), scheduler.run()).await;

    assert_eq!(store.fetches.load(Ordering::SeqCst), 3);
}
