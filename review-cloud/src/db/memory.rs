//! In-memory [`Store`] for tests

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use shared::models::{
    DashboardStats, Profile, ProfileUpdate, QrCode, QrCodeUpdate, Tier,
};
use uuid::Uuid;

use super::{
    DbResult, NewQrCode, ScanInfo, Store, SubscriptionRecord, SyncOutcome, SyncWrite,
    qr_codes::RECENT_LIMIT,
};

#[derive(Default)]
pub struct MemoryStore {
    pub customers: Mutex<HashMap<String, Uuid>>,
    pub subscriptions: Mutex<HashMap<String, (SubscriptionRecord, Option<i64>)>>,
    pub profiles: Mutex<HashMap<Uuid, Profile>>,
    pub qr_codes: Mutex<Vec<QrCode>>,
    pub scans: Mutex<Vec<(Uuid, ScanInfo)>>,
    pub webhook_events: Mutex<HashMap<String, String>>,
    /// Make every write fail with a database error
    pub fail_writes: AtomicBool,
    /// Make only subscription placeholder writes fail
    pub fail_placeholders: AtomicBool,
}

fn injected_failure() -> sqlx::Error {
    sqlx::Error::Protocol("injected failure".into())
}

fn non_empty(value: &Option<String>, current: &Option<String>) -> Option<String> {
    match value {
        Some(v) if v.is_empty() => None,
        Some(v) => Some(v.clone()),
        None => current.clone(),
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn check_writes(&self) -> DbResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(injected_failure());
        }
        Ok(())
    }

    fn check_placeholder_writes(&self) -> DbResult<()> {
        self.check_writes()?;
        if self.fail_placeholders.load(Ordering::SeqCst) {
            return Err(injected_failure());
        }
        Ok(())
    }

    fn insert_placeholder(&self, customer_id: &str) {
        self.subscriptions
            .lock()
            .unwrap()
            .entry(customer_id.to_string())
            .or_insert_with(|| (SubscriptionRecord::not_started(customer_id), None));
    }

    /// Seed a profile with default tier fields
    pub fn add_profile(&self, user_id: Uuid, email: &str) {
        let now = Utc::now();
        self.profiles.lock().unwrap().insert(
            user_id,
            Profile {
                id: user_id,
                email: email.to_string(),
                company_name: None,
                google_business_url: None,
                subscription_tier: Tier::Free,
                is_active_subscription: false,
                trial_ends_at: None,
                created_at: now,
                updated_at: now,
            },
        );
    }

    pub fn profile(&self, user_id: Uuid) -> Option<Profile> {
        self.profiles.lock().unwrap().get(&user_id).cloned()
    }

    pub fn subscription(&self, customer_id: &str) -> Option<SubscriptionRecord> {
        self.subscriptions
            .lock()
            .unwrap()
            .get(customer_id)
            .map(|(r, _)| r.clone())
    }

    pub fn last_event_at(&self, customer_id: &str) -> Option<i64> {
        self.subscriptions
            .lock()
            .unwrap()
            .get(customer_id)
            .and_then(|(_, at)| *at)
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn find_user_by_customer(&self, customer_id: &str) -> DbResult<Option<Uuid>> {
        Ok(self.customers.lock().unwrap().get(customer_id).copied())
    }

    async fn find_customer_by_user(&self, user_id: Uuid) -> DbResult<Option<String>> {
        Ok(self
            .customers
            .lock()
            .unwrap()
            .iter()
            .find(|(_, u)| **u == user_id)
            .map(|(c, _)| c.clone()))
    }

    async fn link_customer(
        &self,
        user_id: Uuid,
        customer_id: &str,
        with_placeholder: bool,
    ) -> DbResult<()> {
        // Fail before writing anything, like a rolled back transaction
        if with_placeholder {
            self.check_placeholder_writes()?;
        } else {
            self.check_writes()?;
        }
        let mut customers = self.customers.lock().unwrap();
        if customers.values().any(|u| *u == user_id) || customers.contains_key(customer_id) {
            return Err(sqlx::Error::Protocol("duplicate customer mapping".into()));
        }
        customers.insert(customer_id.to_string(), user_id);
        drop(customers);
        if with_placeholder {
            self.insert_placeholder(customer_id);
        }
        Ok(())
    }

    async fn ensure_subscription_placeholder(&self, customer_id: &str) -> DbResult<()> {
        self.check_placeholder_writes()?;
        self.insert_placeholder(customer_id);
        Ok(())
    }

    async fn get_subscription(&self, customer_id: &str) -> DbResult<Option<SubscriptionRecord>> {
        Ok(self.subscription(customer_id))
    }

    async fn apply_sync(&self, write: &SyncWrite) -> DbResult<SyncOutcome> {
        self.check_writes()?;
        let mut subs = self.subscriptions.lock().unwrap();
        let current = subs.get(&write.record.customer_id);
        if let Some((_, Some(stored))) = current
            && *stored > write.event_at
        {
            return Ok(SyncOutcome::Stale {
                stored_event_at: *stored,
            });
        }
        let previous_status = current.map(|(r, _)| r.status);
        subs.insert(
            write.record.customer_id.clone(),
            (write.record.clone(), Some(write.event_at)),
        );

        if let Some(profile) = self.profiles.lock().unwrap().get_mut(&write.profile.user_id) {
            profile.subscription_tier = write.profile.tier;
            profile.is_active_subscription = write.profile.is_active_subscription;
            if let Some(trial_ends_at) = write.profile.trial_ends_at {
                profile.trial_ends_at = Some(trial_ends_at);
            }
            profile.updated_at = Utc::now();
        }
        Ok(SyncOutcome::Applied { previous_status })
    }

    async fn ensure_profile(&self, user_id: Uuid, email: &str) -> DbResult<Profile> {
        if self.profile(user_id).is_none() {
            self.check_writes()?;
            self.add_profile(user_id, email);
        }
        self.profile(user_id).ok_or(sqlx::Error::RowNotFound)
    }

    async fn update_profile(
        &self,
        user_id: Uuid,
        update: &ProfileUpdate,
    ) -> DbResult<Option<Profile>> {
        self.check_writes()?;
        let mut profiles = self.profiles.lock().unwrap();
        let Some(profile) = profiles.get_mut(&user_id) else {
            return Ok(None);
        };
        profile.company_name = non_empty(&update.company_name, &profile.company_name);
        profile.google_business_url =
            non_empty(&update.google_business_url, &profile.google_business_url);
        profile.updated_at = Utc::now();
        Ok(Some(profile.clone()))
    }

    async fn list_qr_codes(&self, user_id: Uuid) -> DbResult<Vec<QrCode>> {
        let mut codes: Vec<QrCode> = self
            .qr_codes
            .lock()
            .unwrap()
            .iter()
            .filter(|q| q.user_id == user_id)
            .cloned()
            .collect();
        codes.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(codes)
    }

    async fn insert_qr_code(&self, qr: &NewQrCode) -> DbResult<Option<QrCode>> {
        self.check_writes()?;
        let mut codes = self.qr_codes.lock().unwrap();
        if codes.iter().any(|q| q.short_code == qr.short_code) {
            return Ok(None);
        }
        let now = Utc::now();
        let code = QrCode {
            id: qr.id,
            user_id: qr.user_id,
            title: qr.title.clone(),
            google_business_url: qr.google_business_url.clone(),
            short_code: qr.short_code.clone(),
            scan_count: 0,
            fg_color: qr.style.fg_color.clone(),
            bg_color: qr.style.bg_color.clone(),
            logo_url: qr.style.logo_url.clone(),
            created_at: now,
            updated_at: now,
        };
        codes.push(code.clone());
        Ok(Some(code))
    }

    async fn update_qr_code(
        &self,
        user_id: Uuid,
        id: Uuid,
        update: &QrCodeUpdate,
    ) -> DbResult<Option<QrCode>> {
        self.check_writes()?;
        let mut codes = self.qr_codes.lock().unwrap();
        let Some(code) = codes
            .iter_mut()
            .find(|q| q.id == id && q.user_id == user_id)
        else {
            return Ok(None);
        };
        if let Some(title) = &update.title {
            code.title = title.clone();
        }
        if let Some(url) = &update.google_business_url {
            code.google_business_url = url.clone();
        }
        code.fg_color = non_empty(&update.fg_color, &code.fg_color);
        code.bg_color = non_empty(&update.bg_color, &code.bg_color);
        code.logo_url = non_empty(&update.logo_url, &code.logo_url);
        code.updated_at = Utc::now();
        Ok(Some(code.clone()))
    }

    async fn delete_qr_code(&self, user_id: Uuid, id: Uuid) -> DbResult<bool> {
        self.check_writes()?;
        let mut codes = self.qr_codes.lock().unwrap();
        let before = codes.len();
        codes.retain(|q| !(q.id == id && q.user_id == user_id));
        Ok(codes.len() < before)
    }

    async fn dashboard(&self, user_id: Uuid) -> DbResult<DashboardStats> {
        let codes = self.list_qr_codes(user_id).await?;
        Ok(DashboardStats {
            total_codes: codes.len() as i64,
            total_scans: codes.iter().map(|q| q.scan_count).sum(),
            recent: codes.into_iter().take(RECENT_LIMIT as usize).collect(),
        })
    }

    async fn record_scan(&self, short_code: &str, scan: &ScanInfo) -> DbResult<Option<String>> {
        self.check_writes()?;
        let mut codes = self.qr_codes.lock().unwrap();
        let Some(code) = codes.iter_mut().find(|q| q.short_code == short_code) else {
            return Ok(None);
        };
        code.scan_count += 1;
        self.scans.lock().unwrap().push((code.id, scan.clone()));
        Ok(Some(code.google_business_url.clone()))
    }

    async fn record_webhook_event(&self, event_id: &str, event_type: &str) -> DbResult<bool> {
        self.check_writes()?;
        let mut events = self.webhook_events.lock().unwrap();
        if events.contains_key(event_id) {
            return Ok(false);
        }
        events.insert(event_id.to_string(), event_type.to_string());
        Ok(true)
    }

    async fn forget_webhook_event(&self, event_id: &str) -> DbResult<()> {
        self.webhook_events.lock().unwrap().remove(event_id);
        Ok(())
    }
}
