//! Primary store with an in-memory fallback
//!
//! Every call goes to the primary first. When the primary reports itself
//! unavailable (see [`StoreError::is_unavailable`]) the call is served by
//! the memory store instead and the store reports [`StoreMode::Degraded`]
//! until the primary answers again. Lookups that miss on the primary also
//! consult memory, and listings and stats merge in the memory rows, so
//! data written during an outage stays visible.
//!
//! Nothing written to memory is copied back to the primary.

use std::cmp::Ordering as SortOrder;
use std::collections::HashSet;
use std::future::Future;
use std::hash::Hash;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;
use vgenie_core::{UsageDecision, ValuationInput, ValuationResult};

use super::memory::{subscription_order, valuation_order};
use super::{MemoryStore, Store, StoreError, StoreMode, StoreResult};
use crate::models::{
    AdminUser, EmailSubscription, FileUpload, NewUser, NewValuation, Paginated, Pagination,
    Session, Stats, SubscribeOutcome, User, Valuation,
};

pub struct ResilientStore<P> {
    primary: P,
    fallback: MemoryStore,
    degraded: AtomicBool,
}

/// Whether a primary miss should be retried against memory
#[derive(Clone, Copy, PartialEq, Eq)]
enum Miss {
    Final,
    CheckFallback,
}

impl<P: Store> ResilientStore<P> {
    pub fn new(primary: P) -> Self {
        Self {
            primary,
            fallback: MemoryStore::new(),
            degraded: AtomicBool::new(false),
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.degraded.load(Ordering::Relaxed)
    }

    fn mark_healthy(&self) {
        if self.degraded.swap(false, Ordering::Relaxed) {
            tracing::info!("Primary store recovered");
        }
    }

    fn mark_degraded(&self, op: &'static str, err: &StoreError) {
        if !self.degraded.swap(true, Ordering::Relaxed) {
            tracing::error!(op, error = %err, "Primary store unavailable, serving from memory");
        } else {
            tracing::warn!(op, error = %err, "Primary store still unavailable");
        }
    }

    async fn run<T, Fut, F, FFut>(
        &self,
        op: &'static str,
        miss: Miss,
        primary: Fut,
        fallback: F,
    ) -> StoreResult<T>
    where
        Fut: Future<Output = StoreResult<T>>,
        F: FnOnce() -> FFut,
        FFut: Future<Output = StoreResult<T>>,
    {
        match primary.await {
            Ok(value) => {
                self.mark_healthy();
                Ok(value)
            }
            Err(err) if err.is_unavailable() => {
                self.mark_degraded(op, &err);
                fallback().await
            }
            Err(err @ StoreError::NotFound { .. }) if miss == Miss::CheckFallback => {
                self.mark_healthy();
                match fallback().await {
                    Err(StoreError::NotFound { .. }) => Err(err),
                    other => other,
                }
            }
            Err(err) => Err(err),
        }
    }

    async fn run_optional<T, Fut, F, FFut>(
        &self,
        op: &'static str,
        primary: Fut,
        fallback: F,
    ) -> StoreResult<Option<T>>
    where
        Fut: Future<Output = StoreResult<Option<T>>>,
        F: FnOnce() -> FFut,
        FFut: Future<Output = StoreResult<Option<T>>>,
    {
        match primary.await {
            Ok(Some(value)) => {
                self.mark_healthy();
                Ok(Some(value))
            }
            Ok(None) => {
                self.mark_healthy();
                fallback().await
            }
            Err(err) if err.is_unavailable() => {
                self.mark_degraded(op, &err);
                fallback().await
            }
            Err(err) => Err(err),
        }
    }
}

/// Merge rows held in memory into one page of a primary listing.
///
/// `fetch` reads a primary page. With nothing in memory this is a single
/// read; otherwise every primary page up to the requested one is read so
/// the merged slice is exact. Memory rows whose key already came from the
/// primary are dropped.
async fn merge_page<T, K, F, Fut>(
    page: Pagination,
    extra: Vec<T>,
    mut fetch: F,
    order: fn(&T, &T) -> SortOrder,
    key: fn(&T) -> K,
) -> StoreResult<Paginated<T>>
where
    K: Eq + Hash,
    F: FnMut(Pagination) -> Fut,
    Fut: Future<Output = StoreResult<Paginated<T>>>,
{
    if extra.is_empty() {
        return fetch(page).await;
    }

    let mut rows = Vec::new();
    let mut total = 0;
    for n in 1..=page.page {
        let chunk = fetch(Pagination::new(n, page.per_page)).await?;
        total = chunk.total;
        let last = chunk.items.len() < page.per_page as usize;
        rows.extend(chunk.items);
        if last {
            break;
        }
    }

    let mut seen: HashSet<K> = rows.iter().map(key).collect();
    for row in extra {
        if seen.insert(key(&row)) {
            total += 1;
            rows.push(row);
        }
    }
    rows.sort_by(order);

    let items = rows
        .into_iter()
        .skip(page.offset() as usize)
        .take(page.limit() as usize)
        .collect();
    Ok(Paginated {
        items,
        total,
        page: page.page,
        per_page: page.per_page,
    })
}

#[async_trait]
impl<P: Store> Store for ResilientStore<P> {
    fn mode(&self) -> StoreMode {
        if self.is_degraded() {
            StoreMode::Degraded
        } else {
            self.primary.mode()
        }
    }

    async fn ping(&self) -> StoreResult<()> {
        let result = self.primary.ping().await;
        match &result {
            Ok(()) => self.mark_healthy(),
            Err(err) if err.is_unavailable() => self.mark_degraded("ping", err),
            Err(_) => {}
        }
        result
    }

    async fn create_user(&self, new: NewUser) -> StoreResult<User> {
        // An outage-time account must not shadow an existing primary account
        if let Some(existing) = self.fallback.find_user_by_email(&new.email).await? {
            return Err(StoreError::Conflict {
                resource: "user",
                key: existing.email,
            });
        }
        let copy = new.clone();
        self.run(
            "create_user",
            Miss::Final,
            self.primary.create_user(new),
            || self.fallback.create_user(copy),
        )
        .await
    }

    async fn get_user(&self, id: Uuid) -> StoreResult<User> {
        self.run(
            "get_user",
            Miss::CheckFallback,
            self.primary.get_user(id),
            || self.fallback.get_user(id),
        )
        .await
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        self.run_optional(
            "find_user_by_email",
            self.primary.find_user_by_email(email),
            || self.fallback.find_user_by_email(email),
        )
        .await
    }

    async fn update_password_hash(&self, id: Uuid, password_hash: &str) -> StoreResult<()> {
        self.run(
            "update_password_hash",
            Miss::CheckFallback,
            self.primary.update_password_hash(id, password_hash),
            || self.fallback.update_password_hash(id, password_hash),
        )
        .await
    }

    async fn consume_valuation(
        &self,
        id: Uuid,
        limit: u32,
        now: DateTime<Utc>,
    ) -> StoreResult<UsageDecision> {
        self.run(
            "consume_valuation",
            Miss::CheckFallback,
            self.primary.consume_valuation(id, limit, now),
            || self.fallback.consume_valuation(id, limit, now),
        )
        .await
    }

    async fn grant_lifetime_access(&self, id: Uuid, at: DateTime<Utc>) -> StoreResult<bool> {
        self.run(
            "grant_lifetime_access",
            Miss::CheckFallback,
            self.primary.grant_lifetime_access(id, at),
            || self.fallback.grant_lifetime_access(id, at),
        )
        .await
    }

    async fn create_session(&self, session: Session) -> StoreResult<()> {
        let copy = session.clone();
        self.run(
            "create_session",
            Miss::Final,
            self.primary.create_session(session),
            || self.fallback.create_session(copy),
        )
        .await
    }

    async fn get_session(&self, token_hash: &str) -> StoreResult<Option<Session>> {
        self.run_optional(
            "get_session",
            self.primary.get_session(token_hash),
            || self.fallback.get_session(token_hash),
        )
        .await
    }

    async fn delete_session(&self, token_hash: &str) -> StoreResult<()> {
        // Remove from both; a session may live in either
        self.fallback.delete_session(token_hash).await?;
        self.run(
            "delete_session",
            Miss::Final,
            self.primary.delete_session(token_hash),
            || async { Ok(()) },
        )
        .await
    }

    async fn delete_expired_sessions(&self, now: DateTime<Utc>) -> StoreResult<u64> {
        let from_memory = self.fallback.delete_expired_sessions(now).await?;
        let from_primary = self
            .run(
                "delete_expired_sessions",
                Miss::Final,
                self.primary.delete_expired_sessions(now),
                || async { Ok(0) },
            )
            .await?;
        Ok(from_memory + from_primary)
    }

    async fn insert_valuation(&self, new: NewValuation) -> StoreResult<Valuation> {
        let copy = new.clone();
        self.run(
            "insert_valuation",
            Miss::CheckFallback,
            self.primary.insert_valuation(new),
            || self.fallback.insert_valuation(copy),
        )
        .await
    }

    async fn get_valuation(&self, id: Uuid) -> StoreResult<Valuation> {
        self.run(
            "get_valuation",
            Miss::CheckFallback,
            self.primary.get_valuation(id),
            || self.fallback.get_valuation(id),
        )
        .await
    }

    async fn list_valuations(
        &self,
        user_id: Option<Uuid>,
        page: Pagination,
    ) -> StoreResult<Paginated<Valuation>> {
        let extra = self.fallback.all_valuations(user_id).await;
        self.run(
            "list_valuations",
            Miss::Final,
            merge_page(
                page,
                extra,
                |p| self.primary.list_valuations(user_id, p),
                valuation_order,
                |v: &Valuation| v.id,
            ),
            || self.fallback.list_valuations(user_id, page),
        )
        .await
    }

    async fn update_valuation(
        &self,
        id: Uuid,
        input: ValuationInput,
        result: ValuationResult,
    ) -> StoreResult<Valuation> {
        let (input_copy, result_copy) = (input.clone(), result.clone());
        self.run(
            "update_valuation",
            Miss::CheckFallback,
            self.primary.update_valuation(id, input, result),
            || self.fallback.update_valuation(id, input_copy, result_copy),
        )
        .await
    }

    async fn delete_valuation(&self, id: Uuid) -> StoreResult<()> {
        self.run(
            "delete_valuation",
            Miss::CheckFallback,
            self.primary.delete_valuation(id),
            || self.fallback.delete_valuation(id),
        )
        .await
    }

    async fn mark_valuation_paid(&self, id: Uuid, payment_intent_id: &str) -> StoreResult<bool> {
        self.run(
            "mark_valuation_paid",
            Miss::CheckFallback,
            self.primary.mark_valuation_paid(id, payment_intent_id),
            || self.fallback.mark_valuation_paid(id, payment_intent_id),
        )
        .await
    }

    async fn insert_upload(&self, upload: FileUpload) -> StoreResult<FileUpload> {
        let copy = upload.clone();
        self.run(
            "insert_upload",
            Miss::CheckFallback,
            self.primary.insert_upload(upload),
            || self.fallback.insert_upload(copy),
        )
        .await
    }

    async fn list_uploads(&self, valuation_id: Uuid) -> StoreResult<Vec<FileUpload>> {
        let extra = self.fallback.list_uploads(valuation_id).await?;
        let merged = async {
            let mut uploads = self.primary.list_uploads(valuation_id).await?;
            if !extra.is_empty() {
                uploads.extend(extra);
                uploads.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            }
            Ok::<_, StoreError>(uploads)
        };
        self.run(
            "list_uploads",
            Miss::Final,
            merged,
            || self.fallback.list_uploads(valuation_id),
        )
        .await
    }

    async fn subscribe(
        &self,
        email: &str,
        source: Option<&str>,
    ) -> StoreResult<(EmailSubscription, SubscribeOutcome)> {
        self.run(
            "subscribe",
            Miss::Final,
            self.primary.subscribe(email, source),
            || self.fallback.subscribe(email, source),
        )
        .await
    }

    async fn unsubscribe(&self, email: &str) -> StoreResult<bool> {
        let from_memory = self.fallback.unsubscribe(email).await?;
        let from_primary = self
            .run(
                "unsubscribe",
                Miss::Final,
                self.primary.unsubscribe(email),
                || async { Ok(false) },
            )
            .await?;
        Ok(from_memory || from_primary)
    }

    async fn list_subscriptions(
        &self,
        page: Pagination,
    ) -> StoreResult<Paginated<EmailSubscription>> {
        let extra = self.fallback.all_subscriptions().await;
        self.run(
            "list_subscriptions",
            Miss::Final,
            merge_page(
                page,
                extra,
                |p| self.primary.list_subscriptions(p),
                subscription_order,
                |s: &EmailSubscription| s.email.clone(),
            ),
            || self.fallback.list_subscriptions(page),
        )
        .await
    }

    async fn create_admin(&self, email: &str, password_hash: &str) -> StoreResult<AdminUser> {
        // Operators are provisioned from the CLI against the real database
        self.primary.create_admin(email, password_hash).await
    }

    async fn get_admin(&self, id: Uuid) -> StoreResult<AdminUser> {
        self.run(
            "get_admin",
            Miss::Final,
            self.primary.get_admin(id),
            || self.fallback.get_admin(id),
        )
        .await
    }

    async fn find_admin_by_email(&self, email: &str) -> StoreResult<Option<AdminUser>> {
        self.run_optional(
            "find_admin_by_email",
            self.primary.find_admin_by_email(email),
            || self.fallback.find_admin_by_email(email),
        )
        .await
    }

    async fn record_admin_login(&self, id: Uuid, at: DateTime<Utc>) -> StoreResult<()> {
        self.run(
            "record_admin_login",
            Miss::Final,
            self.primary.record_admin_login(id, at),
            || async { Ok(()) },
        )
        .await
    }

    async fn stats(&self) -> StoreResult<Stats> {
        let merged = async {
            let primary = self.primary.stats().await?;
            let memory = self.fallback.stats().await?;
            Ok::<_, StoreError>(Stats {
                users: primary.users + memory.users,
                lifetime_users: primary.lifetime_users + memory.lifetime_users,
                valuations: primary.valuations + memory.valuations,
                paid_valuations: primary.paid_valuations + memory.paid_valuations,
                active_subscriptions: primary.active_subscriptions + memory.active_subscriptions,
                uploads: primary.uploads + memory.uploads,
            })
        };
        self.run("stats", Miss::Final, merged, || self.fallback.stats()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;
    use std::sync::Arc;

    /// Memory store that can be switched into an outage
    struct Flaky {
        inner: MemoryStore,
        down: Arc<AtomicBool>,
    }

    impl Flaky {
        fn check(&self) -> StoreResult<()> {
            if self.down.load(Ordering::SeqCst) {
                Err(StoreError::Sqlx(sqlx::Error::PoolTimedOut))
            } else {
                Ok(())
            }
        }
    }

    macro_rules! flaky {
        ($self:ident . $method:ident ( $($arg:expr),* )) => {{
            $self.check()?;
            $self.inner.$method($($arg),*).await
        }};
    }

    #[async_trait]
    impl Store for Flaky {
        fn mode(&self) -> StoreMode { StoreMode::Database }
        async fn ping(&self) -> StoreResult<()> { self.check() }
        async fn create_user(&self, new: NewUser) -> StoreResult<User> { flaky!(self.create_user(new)) }
        async fn get_user(&self, id: Uuid) -> StoreResult<User> { flaky!(self.get_user(id)) }
        async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> { flaky!(self.find_user_by_email(email)) }
        async fn update_password_hash(&self, id: Uuid, h: &str) -> StoreResult<()> { flaky!(self.update_password_hash(id, h)) }
        async fn consume_valuation(&self, id: Uuid, l: u32, now: DateTime<Utc>) -> StoreResult<UsageDecision> { flaky!(self.consume_valuation(id, l, now)) }
        async fn grant_lifetime_access(&self, id: Uuid, at: DateTime<Utc>) -> StoreResult<bool> { flaky!(self.grant_lifetime_access(id, at)) }
        async fn create_session(&self, s: Session) -> StoreResult<()> { flaky!(self.create_session(s)) }
        async fn get_session(&self, h: &str) -> StoreResult<Option<Session>> { flaky!(self.get_session(h)) }
        async fn delete_session(&self, h: &str) -> StoreResult<()> { flaky!(self.delete_session(h)) }
        async fn delete_expired_sessions(&self, now: DateTime<Utc>) -> StoreResult<u64> { flaky!(self.delete_expired_sessions(now)) }
        async fn insert_valuation(&self, n: NewValuation) -> StoreResult<Valuation> { flaky!(self.insert_valuation(n)) }
        async fn get_valuation(&self, id: Uuid) -> StoreResult<Valuation> { flaky!(self.get_valuation(id)) }
        async fn list_valuations(&self, u: Option<Uuid>, p: Pagination) -> StoreResult<Paginated<Valuation>> { flaky!(self.list_valuations(u, p)) }
        async fn update_valuation(&self, id: Uuid, i: ValuationInput, r: ValuationResult) -> StoreResult<Valuation> { flaky!(self.update_valuation(id, i, r)) }
        async fn delete_valuation(&self, id: Uuid) -> StoreResult<()> { flaky!(self.delete_valuation(id)) }
        async fn mark_valuation_paid(&self, id: Uuid, pi: &str) -> StoreResult<bool> { flaky!(self.mark_valuation_paid(id, pi)) }
        async fn insert_upload(&self, u: FileUpload) -> StoreResult<FileUpload> { flaky!(self.insert_upload(u)) }
        async fn list_uploads(&self, id: Uuid) -> StoreResult<Vec<FileUpload>> { flaky!(self.list_uploads(id)) }
        async fn subscribe(&self, e: &str, s: Option<&str>) -> StoreResult<(EmailSubscription, SubscribeOutcome)> { flaky!(self.subscribe(e, s)) }
        async fn unsubscribe(&self, e: &str) -> StoreResult<bool> { flaky!(self.unsubscribe(e)) }
        async fn list_subscriptions(&self, p: Pagination) -> StoreResult<Paginated<EmailSubscription>> { flaky!(self.list_subscriptions(p)) }
        async fn create_admin(&self, e: &str, h: &str) -> StoreResult<AdminUser> { flaky!(self.create_admin(e, h)) }
        async fn get_admin(&self, id: Uuid) -> StoreResult<AdminUser> { flaky!(self.get_admin(id)) }
        async fn find_admin_by_email(&self, e: &str) -> StoreResult<Option<AdminUser>> { flaky!(self.find_admin_by_email(e)) }
        async fn record_admin_login(&self, id: Uuid, at: DateTime<Utc>) -> StoreResult<()> { flaky!(self.record_admin_login(id, at)) }
        async fn stats(&self) -> StoreResult<Stats> { flaky!(self.stats()) }
    }

    fn setup() -> (ResilientStore<Flaky>, Arc<AtomicBool>) {
        let down = Arc::new(AtomicBool::new(false));
        let store = ResilientStore::new(Flaky {
            inner: MemoryStore::new(),
            down: down.clone(),
        });
        (store, down)
    }

    fn new_user(email: &str) -> NewUser {
        NewUser {
            email: email.into(),
            name: None,
            password_hash: "h".into(),
        }
    }

    #[tokio::test]
    async fn healthy_primary_serves_calls() {
        let (store, _) = setup();
        let user = store.create_user(new_user("a@example.com")).await.unwrap();
        assert_eq!(store.mode(), StoreMode::Database);
        assert_eq!(store.primary.inner.get_user(user.id).await.unwrap().id, user.id);
        assert!(store.fallback.get_user(user.id).await.is_err());
    }

    #[tokio::test]
    async fn outage_falls_back_and_recovers() {
        let (store, down) = setup();
        down.store(true, Ordering::SeqCst);

        let user = store.create_user(new_user("outage@example.com")).await.unwrap();
        assert_eq!(store.mode(), StoreMode::Degraded);
        assert!(store.fallback.get_user(user.id).await.is_ok());

        down.store(false, Ordering::SeqCst);
        // Primary is back but the row only exists in memory
        let found = store.get_user(user.id).await.unwrap();
        assert_eq!(found.email, "outage@example.com");
        assert_eq!(store.mode(), StoreMode::Database);

        let by_email = store.find_user_by_email("outage@example.com").await.unwrap();
        assert!(by_email.is_some());

        // and cannot be registered again on the primary
        let err = store.create_user(new_user("outage@example.com")).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict { .. }));
    }

    #[tokio::test]
    async fn non_connectivity_errors_pass_through() {
        let (store, _) = setup();
        store.create_user(new_user("dup@example.com")).await.unwrap();
        let err = store.create_user(new_user("dup@example.com")).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict { .. }));
        assert_eq!(store.mode(), StoreMode::Database);

        let err = store.get_user(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound { resource: "user", .. }));
    }

    #[tokio::test]
    async fn sessions_created_during_outage_can_be_deleted() {
        let (store, down) = setup();
        down.store(true, Ordering::SeqCst);
        let now = Utc::now();
        store
            .create_session(Session {
                token_hash: "tok".into(),
                kind: crate::models::SessionKind::User,
                principal_id: Uuid::new_v4(),
                created_at: now,
                expires_at: now + chrono::Duration::hours(1),
            })
            .await
            .unwrap();
        down.store(false, Ordering::SeqCst);

        assert!(store.get_session("tok").await.unwrap().is_some());
        store.delete_session("tok").await.unwrap();
        assert!(store.get_session("tok").await.unwrap().is_none());
    }
    fn new_valuation(user_id: Uuid, name: &str) -> NewValuation {
        let input = ValuationInput {
            business_name: name.into(),
            industry: "retail".into(),
            annual_revenue: 500_000.0,
            net_profit: 80_000.0,
            owner_salary: 20_000.0,
            addbacks: vgenie_core::Addbacks::default(),
            years_in_business: None,
            revenue_trend: None,
            location: None,
        };
        let result = vgenie_core::compute(&input).unwrap();
        NewValuation { user_id, input, result }
    }

    /// Distinct creation timestamps keep the listing order deterministic
    async fn tick() {
        tokio::time::sleep(std::time::Duration::from_millis(2)).await;
    }

    #[tokio::test]
    async fn outage_rows_stay_listed_after_recovery() {
        let (store, down) = setup();
        let before = store.create_user(new_user("before@example.com")).await.unwrap();
        for name in ["P1", "P2", "P3"] {
            store.insert_valuation(new_valuation(before.id, name)).await.unwrap();
            tick().await;
        }
        store.subscribe("before@example.com", None).await.unwrap();

        down.store(true, Ordering::SeqCst);
        let during = store.create_user(new_user("during@example.com")).await.unwrap();
        let m1 = store.insert_valuation(new_valuation(during.id, "M1")).await.unwrap();
        tick().await;
        store.insert_valuation(new_valuation(during.id, "M2")).await.unwrap();
        store
            .insert_upload(FileUpload {
                id: Uuid::new_v4(),
                user_id: during.id,
                valuation_id: Some(m1.id),
                original_name: "pl.pdf".into(),
                stored_name: "x-pl.pdf".into(),
                content_type: "application/pdf".into(),
                size_bytes: 10,
                created_at: Utc::now(),
            })
            .await
            .unwrap();
        store.subscribe("during@example.com", None).await.unwrap();
        // Same address again during the outage must not be listed twice
        store.subscribe("before@example.com", None).await.unwrap();
        down.store(false, Ordering::SeqCst);

        let all = store.list_valuations(None, Pagination::new(1, 20)).await.unwrap();
        assert_eq!(store.mode(), StoreMode::Database);
        assert_eq!(all.total, 5);
        let names: Vec<_> = all.items.iter().map(|v| v.input.business_name.as_str()).collect();
        assert_eq!(names, vec!["M2", "M1", "P3", "P2", "P1"]);

        let mine = store.list_valuations(Some(during.id), Pagination::default()).await.unwrap();
        assert_eq!(mine.total, 2);
        let theirs = store.list_valuations(Some(before.id), Pagination::default()).await.unwrap();
        assert_eq!(theirs.total, 3);

        // Later pages slice the merged order
        let second = store.list_valuations(None, Pagination::new(2, 2)).await.unwrap();
        let names: Vec<_> = second.items.iter().map(|v| v.input.business_name.as_str()).collect();
        assert_eq!(names, vec!["P3", "P2"]);
        assert_eq!(second.total_pages(), 3);

        assert_eq!(store.list_uploads(m1.id).await.unwrap().len(), 1);

        let subs = store.list_subscriptions(Pagination::default()).await.unwrap();
        assert_eq!(subs.total, 2);
        assert_eq!(subs.items.len(), 2);

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.users, 2);
        assert_eq!(stats.valuations, 5);
        assert_eq!(stats.uploads, 1);
    }

    #[tokio::test]
    async fn allowance_is_consumed_in_memory_during_outage() {
        let (store, down) = setup();
        down.store(true, Ordering::SeqCst);
        let user = store.create_user(new_user("quota@example.com")).await.unwrap();
        let now = Utc::now();
        for _ in 0..2 {
            assert!(matches!(
                store.consume_valuation(user.id, 2, now).await.unwrap(),
                UsageDecision::Allowed(_)
            ));
        }
        down.store(false, Ordering::SeqCst);
        assert_eq!(
            store.consume_valuation(user.id, 2, now).await.unwrap(),
            UsageDecision::LimitReached { limit: 2 }
        );
    }
}
