//! [`Store`] backed by PostgreSQL

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;
use vgenie_core::{UsageDecision, ValuationInput, ValuationResult};

use super::repos::{AdminRepo, SessionRepo, SubscriptionRepo, UploadRepo, UserRepo, ValuationRepo};
use crate::models::{
    AdminUser, EmailSubscription, FileUpload, NewUser, NewValuation, Paginated, Pagination,
    Session, Stats, SubscribeOutcome, User, Valuation,
};
use crate::store::{Store, StoreMode, StoreResult};

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl Store for PgStore {
    fn mode(&self) -> StoreMode {
        StoreMode::Database
    }

    async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn create_user(&self, new: NewUser) -> StoreResult<User> {
        UserRepo::new(&self.pool).create(new).await
    }

    async fn get_user(&self, id: Uuid) -> StoreResult<User> {
        UserRepo::new(&self.pool).get(id).await
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        UserRepo::new(&self.pool).find_by_email(email).await
    }

    async fn update_password_hash(&self, id: Uuid, password_hash: &str) -> StoreResult<()> {
        UserRepo::new(&self.pool).update_password_hash(id, password_hash).await
    }

    async fn consume_valuation(
        &self,
        id: Uuid,
        limit: u32,
        now: DateTime<Utc>,
    ) -> StoreResult<UsageDecision> {
        UserRepo::new(&self.pool).consume_valuation(id, limit, now).await
    }

    async fn grant_lifetime_access(&self, id: Uuid, at: DateTime<Utc>) -> StoreResult<bool> {
        UserRepo::new(&self.pool).grant_lifetime_access(id, at).await
    }

    async fn create_session(&self, session: Session) -> StoreResult<()> {
        SessionRepo::new(&self.pool).create(&session).await
    }

    async fn get_session(&self, token_hash: &str) -> StoreResult<Option<Session>> {
        SessionRepo::new(&self.pool).get(token_hash).await
    }

    async fn delete_session(&self, token_hash: &str) -> StoreResult<()> {
        SessionRepo::new(&self.pool).delete(token_hash).await
    }

    async fn delete_expired_sessions(&self, now: DateTime<Utc>) -> StoreResult<u64> {
        SessionRepo::new(&self.pool).delete_expired(now).await
    }

    async fn insert_valuation(&self, new: NewValuation) -> StoreResult<Valuation> {
        ValuationRepo::new(&self.pool).insert(new).await
    }

    async fn get_valuation(&self, id: Uuid) -> StoreResult<Valuation> {
        ValuationRepo::new(&self.pool).get(id).await
    }

    async fn list_valuations(
        &self,
        user_id: Option<Uuid>,
        page: Pagination,
    ) -> StoreResult<Paginated<Valuation>> {
        ValuationRepo::new(&self.pool).list(user_id, page).await
    }

    async fn update_valuation(
        &self,
        id: Uuid,
        input: ValuationInput,
        result: ValuationResult,
    ) -> StoreResult<Valuation> {
        ValuationRepo::new(&self.pool).update(id, &input, &result).await
    }

    async fn delete_valuation(&self, id: Uuid) -> StoreResult<()> {
        ValuationRepo::new(&self.pool).delete(id).await
    }

    async fn mark_valuation_paid(&self, id: Uuid, payment_intent_id: &str) -> StoreResult<bool> {
        ValuationRepo::new(&self.pool).mark_paid(id, payment_intent_id).await
    }

    async fn insert_upload(&self, upload: FileUpload) -> StoreResult<FileUpload> {
        UploadRepo::new(&self.pool).insert(&upload).await
    }

    async fn list_uploads(&self, valuation_id: Uuid) -> StoreResult<Vec<FileUpload>> {
        UploadRepo::new(&self.pool).list_for_valuation(valuation_id).await
    }

    async fn subscribe(
        &self,
        email: &str,
        source: Option<&str>,
    ) -> StoreResult<(EmailSubscription, SubscribeOutcome)> {
        SubscriptionRepo::new(&self.pool).subscribe(email, source).await
    }

    async fn unsubscribe(&self, email: &str) -> StoreResult<bool> {
        SubscriptionRepo::new(&self.pool).unsubscribe(email).await
    }

    async fn list_subscriptions(
        &self,
        page: Pagination,
    ) -> StoreResult<Paginated<EmailSubscription>> {
        SubscriptionRepo::new(&self.pool).list(page).await
    }

    async fn create_admin(&self, email: &str, password_hash: &str) -> StoreResult<AdminUser> {
        AdminRepo::new(&self.pool).create(email, password_hash).await
    }

    async fn get_admin(&self, id: Uuid) -> StoreResult<AdminUser> {
        AdminRepo::new(&self.pool).get(id).await
    }

    async fn find_admin_by_email(&self, email: &str) -> StoreResult<Option<AdminUser>> {
        AdminRepo::new(&self.pool).find_by_email(email).await
    }

    async fn record_admin_login(&self, id: Uuid, at: DateTime<Utc>) -> StoreResult<()> {
        AdminRepo::new(&self.pool).record_login(id, at).await
    }

    async fn stats(&self) -> StoreResult<Stats> {
        AdminRepo::new(&self.pool).stats().await
    }
}
