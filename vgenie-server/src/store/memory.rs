//! In-process store
//!
//! Same semantics as the PostgreSQL store (uniqueness, ownership cascades,
//! newest-first listings) over plain maps. Used by tests, when no
//! database URL is configured, and as the fallback half of [`super::ResilientStore`].

use std::cmp::Ordering;
use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;
use vgenie_core::{UsageDecision, ValuationInput, ValuationResult};

use super::{Store, StoreError, StoreMode, StoreResult};
use crate::models::{
    AdminUser, EmailSubscription, FileUpload, NewUser, NewValuation, Paginated, Pagination,
    Session, Stats, SubscribeOutcome, User, Valuation,
};

#[derive(Default)]
struct Inner {
    users: HashMap<Uuid, User>,
    sessions: HashMap<String, Session>,
    valuations: HashMap<Uuid, Valuation>,
    uploads: Vec<FileUpload>,
    /// Keyed by normalized email
    subscriptions: HashMap<String, EmailSubscription>,
    admins: HashMap<Uuid, AdminUser>,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// All valuations, optionally for one user, in listing order
    pub(crate) async fn all_valuations(&self, user_id: Option<Uuid>) -> Vec<Valuation> {
        let inner = self.inner.read().await;
        let mut items: Vec<Valuation> = inner
            .valuations
            .values()
            .filter(|v| user_id.map_or(true, |uid| v.user_id == uid))
            .cloned()
            .collect();
        items.sort_by(valuation_order);
        items
    }

    /// All subscriptions in listing order
    pub(crate) async fn all_subscriptions(&self) -> Vec<EmailSubscription> {
        let inner = self.inner.read().await;
        let mut items: Vec<EmailSubscription> = inner.subscriptions.values().cloned().collect();
        items.sort_by(subscription_order);
        items
    }
}

/// Newest first, ties broken by id
pub(crate) fn valuation_order(a: &Valuation, b: &Valuation) -> Ordering {
    b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id))
}

/// Newest first, ties broken by email
pub(crate) fn subscription_order(a: &EmailSubscription, b: &EmailSubscription) -> Ordering {
    b.created_at.cmp(&a.created_at).then(a.email.cmp(&b.email))
}

#[async_trait]
impl Store for MemoryStore {
    fn mode(&self) -> StoreMode {
        StoreMode::Memory
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }

    async fn create_user(&self, new: NewUser) -> StoreResult<User> {
        let mut inner = self.inner.write().await;
        if inner.users.values().any(|u| u.email == new.email) {
            return Err(StoreError::Conflict {
                resource: "user",
                key: new.email,
            });
        }
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            email: new.email,
            name: new.name,
            password_hash: new.password_hash,
            has_lifetime_access: false,
            lifetime_purchased_at: None,
            valuations_this_period: 0,
            usage_period_start: now,
            created_at: now,
        };
        inner.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn get_user(&self, id: Uuid) -> StoreResult<User> {
        self.inner
            .read()
            .await
            .users
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("user", id))
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let inner = self.inner.read().await;
        Ok(inner.users.values().find(|u| u.email == email).cloned())
    }

    async fn update_password_hash(&self, id: Uuid, password_hash: &str) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        let user = inner
            .users
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("user", id))?;
        user.password_hash = password_hash.to_string();
        Ok(())
    }

    async fn consume_valuation(
        &self,
        id: Uuid,
        limit: u32,
        now: DateTime<Utc>,
    ) -> StoreResult<UsageDecision> {
        let mut inner = self.inner.write().await;
        let user = inner
            .users
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("user", id))?;
        let decision = user.usage().consume(now, limit, user.has_lifetime_access);
        if let UsageDecision::Allowed(usage) = decision {
            user.valuations_this_period = i32::try_from(usage.count).unwrap_or(i32::MAX);
            user.usage_period_start = usage.period_start;
        }
        Ok(decision)
    }

    async fn grant_lifetime_access(&self, id: Uuid, at: DateTime<Utc>) -> StoreResult<bool> {
        let mut inner = self.inner.write().await;
        let user = inner
            .users
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("user", id))?;
        if user.has_lifetime_access {
            return Ok(false);
        }
        user.has_lifetime_access = true;
        user.lifetime_purchased_at = Some(at);
        Ok(true)
    }

    async fn create_session(&self, session: Session) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        inner.sessions.insert(session.token_hash.clone(), session);
        Ok(())
    }

    async fn get_session(&self, token_hash: &str) -> StoreResult<Option<Session>> {
        Ok(self.inner.read().await.sessions.get(token_hash).cloned())
    }

    async fn delete_session(&self, token_hash: &str) -> StoreResult<()> {
        self.inner.write().await.sessions.remove(token_hash);
        Ok(())
    }

    async fn delete_expired_sessions(&self, now: DateTime<Utc>) -> StoreResult<u64> {
        let mut inner = self.inner.write().await;
        let before = inner.sessions.len();
        inner.sessions.retain(|_, s| !s.is_expired(now));
        Ok((before - inner.sessions.len()) as u64)
    }

    async fn insert_valuation(&self, new: NewValuation) -> StoreResult<Valuation> {
        let mut inner = self.inner.write().await;
        if !inner.users.contains_key(&new.user_id) {
            return Err(StoreError::not_found("user", new.user_id));
        }
        let now = Utc::now();
        let valuation = Valuation {
            id: Uuid::new_v4(),
            user_id: new.user_id,
            input: new.input,
            result: new.result,
            is_paid: false,
            payment_intent_id: None,
            created_at: now,
            updated_at: now,
        };
        inner.valuations.insert(valuation.id, valuation.clone());
        Ok(valuation)
    }

    async fn get_valuation(&self, id: Uuid) -> StoreResult<Valuation> {
        self.inner
            .read()
            .await
            .valuations
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("valuation", id))
    }

    async fn list_valuations(
        &self,
        user_id: Option<Uuid>,
        page: Pagination,
    ) -> StoreResult<Paginated<Valuation>> {
        Ok(page.apply(self.all_valuations(user_id).await))
    }

    async fn update_valuation(
        &self,
        id: Uuid,
        input: ValuationInput,
        result: ValuationResult,
    ) -> StoreResult<Valuation> {
        let mut inner = self.inner.write().await;
        let valuation = inner
            .valuations
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("valuation", id))?;
        valuation.input = input;
        valuation.result = result;
        valuation.updated_at = Utc::now();
        Ok(valuation.clone())
    }

    async fn delete_valuation(&self, id: Uuid) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        if inner.valuations.remove(&id).is_none() {
            return Err(StoreError::not_found("valuation", id));
        }
        for upload in inner.uploads.iter_mut().filter(|u| u.valuation_id == Some(id)) {
            upload.valuation_id = None;
        }
        Ok(())
    }

    async fn mark_valuation_paid(&self, id: Uuid, payment_intent_id: &str) -> StoreResult<bool> {
        let mut inner = self.inner.write().await;
        let valuation = inner
            .valuations
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("valuation", id))?;
        if valuation.is_paid {
            return Ok(false);
        }
        valuation.is_paid = true;
        valuation.payment_intent_id = Some(payment_intent_id.to_string());
        valuation.updated_at = Utc::now();
        Ok(true)
    }

    async fn insert_upload(&self, upload: FileUpload) -> StoreResult<FileUpload> {
        let mut inner = self.inner.write().await;
        if let Some(vid) = upload.valuation_id {
            if !inner.valuations.contains_key(&vid) {
                return Err(StoreError::not_found("valuation", vid));
            }
        }
        inner.uploads.push(upload.clone());
        Ok(upload)
    }

    async fn list_uploads(&self, valuation_id: Uuid) -> StoreResult<Vec<FileUpload>> {
        let inner = self.inner.read().await;
        let mut uploads: Vec<FileUpload> = inner
            .uploads
            .iter()
            .filter(|u| u.valuation_id == Some(valuation_id))
            .cloned()
            .collect();
        uploads.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(uploads)
    }

    async fn subscribe(
        &self,
        email: &str,
        source: Option<&str>,
    ) -> StoreResult<(EmailSubscription, SubscribeOutcome)> {
        let mut inner = self.inner.write().await;
        if let Some(existing) = inner.subscriptions.get_mut(email) {
            if existing.subscribed {
                return Ok((existing.clone(), SubscribeOutcome::AlreadySubscribed));
            }
            existing.subscribed = true;
            existing.unsubscribed_at = None;
            if source.is_some() {
                existing.source = source.map(str::to_string);
            }
            return Ok((existing.clone(), SubscribeOutcome::Resubscribed));
        }

        let subscription = EmailSubscription {
            id: Uuid::new_v4(),
            email: email.to_string(),
            source: source.map(str::to_string),
            subscribed: true,
            created_at: Utc::now(),
            unsubscribed_at: None,
        };
        inner
            .subscriptions
            .insert(email.to_string(), subscription.clone());
        Ok((subscription, SubscribeOutcome::Created))
    }

    async fn unsubscribe(&self, email: &str) -> StoreResult<bool> {
        let mut inner = self.inner.write().await;
        match inner.subscriptions.get_mut(email) {
            Some(sub) if sub.subscribed => {
                sub.subscribed = false;
                sub.unsubscribed_at = Some(Utc::now());
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn list_subscriptions(
        &self,
        page: Pagination,
    ) -> StoreResult<Paginated<EmailSubscription>> {
        Ok(page.apply(self.all_subscriptions().await))
    }

    async fn create_admin(&self, email: &str, password_hash: &str) -> StoreResult<AdminUser> {
        let mut inner = self.inner.write().await;
        if inner.admins.values().any(|a| a.email == email) {
            return Err(StoreError::Conflict {
                resource: "admin",
                key: email.to_string(),
            });
        }
        let admin = AdminUser {
            id: Uuid::new_v4(),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            created_at: Utc::now(),
            last_login_at: None,
        };
        inner.admins.insert(admin.id, admin.clone());
        Ok(admin)
    }

    async fn get_admin(&self, id: Uuid) -> StoreResult<AdminUser> {
        self.inner
            .read()
            .await
            .admins
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("admin", id))
    }

    async fn find_admin_by_email(&self, email: &str) -> StoreResult<Option<AdminUser>> {
        let inner = self.inner.read().await;
        Ok(inner.admins.values().find(|a| a.email == email).cloned())
    }

    async fn record_admin_login(&self, id: Uuid, at: DateTime<Utc>) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        let admin = inner
            .admins
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("admin", id))?;
        admin.last_login_at = Some(at);
        Ok(())
    }

    async fn stats(&self) -> StoreResult<Stats> {
        let inner = self.inner.read().await;
        Ok(Stats {
            users: inner.users.len() as i64,
            lifetime_users: inner.users.values().filter(|u| u.has_lifetime_access).count() as i64,
            valuations: inner.valuations.len() as i64,
            paid_valuations: inner.valuations.values().filter(|v| v.is_paid).count() as i64,
            active_subscriptions: inner.subscriptions.values().filter(|s| s.subscribed).count()
                as i64,
            uploads: inner.uploads.len() as i64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vgenie_core::{compute, Addbacks};

    fn new_user(email: &str) -> NewUser {
        NewUser {
            email: email.into(),
            name: None,
            password_hash: "hash".into(),
        }
    }

    fn new_valuation(user_id: Uuid, name: &str) -> NewValuation {
        let input = ValuationInput {
            business_name: name.into(),
            industry: "retail".into(),
            annual_revenue: 500_000.0,
            net_profit: 80_000.0,
            owner_salary: 20_000.0,
            addbacks: Addbacks::default(),
            years_in_business: None,
            revenue_trend: None,
            location: None,
        };
        let result = compute(&input).unwrap();
        NewValuation { user_id, input, result }
    }

    #[tokio::test]
    async fn duplicate_email_conflicts() {
        let store = MemoryStore::new();
        store.create_user(new_user("a@example.com")).await.unwrap();
        let err = store.create_user(new_user("a@example.com")).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict { resource: "user", .. }));
    }

    #[tokio::test]
    async fn valuations_are_listed_per_user_newest_first() {
        let store = MemoryStore::new();
        let alice = store.create_user(new_user("alice@example.com")).await.unwrap();
        let bob = store.create_user(new_user("bob@example.com")).await.unwrap();

        let first = store.insert_valuation(new_valuation(alice.id, "First")).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        let second = store.insert_valuation(new_valuation(alice.id, "Second")).await.unwrap();
        store.insert_valuation(new_valuation(bob.id, "Bob's")).await.unwrap();

        let page = store
            .list_valuations(Some(alice.id), Pagination::default())
            .await
            .unwrap();
        assert_eq!(page.total, 2);
        assert_eq!(page.items[0].id, second.id);
        assert_eq!(page.items[1].id, first.id);

        let all = store.list_valuations(None, Pagination::default()).await.unwrap();
        assert_eq!(all.total, 3);
    }

    #[tokio::test]
    async fn mark_paid_is_idempotent() {
        let store = MemoryStore::new();
        let user = store.create_user(new_user("a@example.com")).await.unwrap();
        let v = store.insert_valuation(new_valuation(user.id, "Shop")).await.unwrap();

        assert!(store.mark_valuation_paid(v.id, "pi_1").await.unwrap());
        assert!(!store.mark_valuation_paid(v.id, "pi_2").await.unwrap());
        let stored = store.get_valuation(v.id).await.unwrap();
        assert_eq!(stored.payment_intent_id.as_deref(), Some("pi_1"));
    }

    #[tokio::test]
    async fn deleting_valuation_detaches_uploads() {
        let store = MemoryStore::new();
        let user = store.create_user(new_user("a@example.com")).await.unwrap();
        let v = store.insert_valuation(new_valuation(user.id, "Shop")).await.unwrap();
        store
            .insert_upload(FileUpload {
                id: Uuid::new_v4(),
                user_id: user.id,
                valuation_id: Some(v.id),
                original_name: "pl.pdf".into(),
                stored_name: "x-pl.pdf".into(),
                content_type: "application/pdf".into(),
                size_bytes: 10,
                created_at: Utc::now(),
            })
            .await
            .unwrap();

        store.delete_valuation(v.id).await.unwrap();
        assert!(store.list_uploads(v.id).await.unwrap().is_empty());
        assert_eq!(store.stats().await.unwrap().uploads, 1);
        assert!(matches!(
            store.delete_valuation(v.id).await,
            Err(StoreError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn subscribe_unsubscribe_cycle() {
        let store = MemoryStore::new();
        let (_, outcome) = store.subscribe("n@example.com", Some("footer")).await.unwrap();
        assert_eq!(outcome, SubscribeOutcome::Created);
        let (_, outcome) = store.subscribe("n@example.com", None).await.unwrap();
        assert_eq!(outcome, SubscribeOutcome::AlreadySubscribed);

        assert!(store.unsubscribe("n@example.com").await.unwrap());
        assert!(!store.unsubscribe("n@example.com").await.unwrap());
        assert!(!store.unsubscribe("other@example.com").await.unwrap());

        let (sub, outcome) = store.subscribe("n@example.com", None).await.unwrap();
        assert_eq!(outcome, SubscribeOutcome::Resubscribed);
        assert_eq!(sub.source.as_deref(), Some("footer"));
        assert_eq!(store.stats().await.unwrap().active_subscriptions, 1);
    }

    #[tokio::test]
    async fn expired_sessions_are_purged() {
        let store = MemoryStore::new();
        let now = Utc::now();
        for (hash, offset) in [("old", -10), ("new", 10)] {
            store
                .create_session(Session {
                    token_hash: hash.into(),
                    kind: crate::models::SessionKind::User,
                    principal_id: Uuid::new_v4(),
                    created_at: now,
                    expires_at: now + chrono::Duration::seconds(offset),
                })
                .await
                .unwrap();
        }
        assert_eq!(store.delete_expired_sessions(now).await.unwrap(), 1);
        assert!(store.get_session("old").await.unwrap().is_none());
        assert!(store.get_session("new").await.unwrap().is_some());
    }
}
