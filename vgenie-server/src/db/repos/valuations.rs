//! Valuation repository
//!
//! Inputs and results are stored as JSONB; the headline range is duplicated
//! into plain columns for admin queries and the `value_low <= value_high`
//! check constraint.

use sqlx::postgres::PgRow;
use sqlx::types::Json;
use sqlx::{PgPool, Row};
use uuid::Uuid;
use vgenie_core::{ValuationInput, ValuationResult};

use super::foreign_key_or;
use crate::models::{NewValuation, Paginated, Pagination, Valuation};
use crate::store::{StoreError, StoreResult};

const COLUMNS: &str = "id, user_id, inputs, result, is_paid, payment_intent_id, created_at, updated_at";

fn valuation_from_row(row: &PgRow) -> Result<Valuation, sqlx::Error> {
    let Json(input): Json<ValuationInput> = row.try_get("inputs")?;
    let Json(result): Json<ValuationResult> = row.try_get("result")?;
    Ok(Valuation {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        input,
        result,
        is_paid: row.try_get("is_paid")?,
        payment_intent_id: row.try_get("payment_intent_id")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

pub struct ValuationRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> ValuationRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert a valuation; an unknown user is `NotFound`
    pub async fn insert(&self, new: NewValuation) -> StoreResult<Valuation> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO valuations
                (user_id, business_name, industry, inputs, result, value_low, value_high)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {}
            "#,
            COLUMNS
        ))
        .bind(new.user_id)
        .bind(&new.input.business_name)
        .bind(&new.input.industry)
        .bind(Json(&new.input))
        .bind(Json(&new.result))
        .bind(new.result.value_low)
        .bind(new.result.value_high)
        .fetch_one(self.pool)
        .await
        .map_err(|e| foreign_key_or(e, "user", new.user_id))?;
        Ok(valuation_from_row(&row)?)
    }

    pub async fn get(&self, id: Uuid) -> StoreResult<Valuation> {
        let row = sqlx::query(&format!("SELECT {} FROM valuations WHERE id = $1", COLUMNS))
            .bind(id)
            .fetch_optional(self.pool)
            .await?
            .ok_or_else(|| StoreError::not_found("valuation", id))?;
        Ok(valuation_from_row(&row)?)
    }

    /// Newest first; `None` lists every user's valuations
    pub async fn list(
        &self,
        user_id: Option<Uuid>,
        page: Pagination,
    ) -> StoreResult<Paginated<Valuation>> {
        // Single query with COUNT(*) OVER() for total
        let rows = sqlx::query(&format!(
            r#"
            SELECT {}, COUNT(*) OVER() AS total
            FROM valuations
            WHERE ($1::uuid IS NULL OR user_id = $1)
            ORDER BY created_at DESC, id DESC
            LIMIT $2 OFFSET $3
            "#,
            COLUMNS
        ))
        .bind(user_id)
        .bind(page.limit() as i64)
        .bind(page.offset() as i64)
        .fetch_all(self.pool)
        .await?;

        let total = match rows.first() {
            Some(row) => row.try_get::<i64, _>("total")?,
            None => self.count(user_id).await?,
        };
        let items = rows
            .iter()
            .map(valuation_from_row)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Paginated {
            items,
            total,
            page: page.page,
            per_page: page.per_page,
        })
    }

    async fn count(&self, user_id: Option<Uuid>) -> StoreResult<i64> {
        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM valuations WHERE ($1::uuid IS NULL OR user_id = $1)")
                .bind(user_id)
                .fetch_one(self.pool)
                .await?;
        Ok(total)
    }

    pub async fn update(
        &self,
        id: Uuid,
        input: &ValuationInput,
        result: &ValuationResult,
    ) -> StoreResult<Valuation> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE valuations
            SET business_name = $2, industry = $3, inputs = $4, result = $5,
                value_low = $6, value_high = $7, updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            COLUMNS
        ))
        .bind(id)
        .bind(&input.business_name)
        .bind(&input.industry)
        .bind(Json(input))
        .bind(Json(result))
        .bind(result.value_low)
        .bind(result.value_high)
        .fetch_optional(self.pool)
        .await?
        .ok_or_else(|| StoreError::not_found("valuation", id))?;
        Ok(valuation_from_row(&row)?)
    }

    /// Uploads are detached by `ON DELETE SET NULL`
    pub async fn delete(&self, id: Uuid) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM valuations WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("valuation", id));
        }
        Ok(())
    }

    /// Returns `false` when the valuation was already paid
    pub async fn mark_paid(&self, id: Uuid, payment_intent_id: &str) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE valuations
            SET is_paid = TRUE, payment_intent_id = $2, updated_at = NOW()
            WHERE id = $1 AND NOT is_paid
            "#,
        )
        .bind(id)
        .bind(payment_intent_id)
        .execute(self.pool)
        .await?;
        if result.rows_affected() == 1 {
            return Ok(true);
        }
        self.get(id).await.map(|_| false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repos::UserRepo;
    use crate::db::create_pool;
    use crate::models::NewUser;
    use vgenie_core::{compute, Addbacks};

    fn input(name: &str) -> ValuationInput {
        ValuationInput {
            business_name: name.into(),
            industry: "landscaping".into(),
            annual_revenue: 400_000.0,
            net_profit: 70_000.0,
            owner_salary: 50_000.0,
            addbacks: Addbacks::default(),
            years_in_business: Some(6),
            revenue_trend: None,
            location: Some("Austin, TX".into()),
        }
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn stores_and_reads_json_columns() {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL required");
        let pool = create_pool(&url).await.expect("pool creation failed");
        crate::db::migrations::run(&pool).await.expect("migrations failed");

        let user = UserRepo::new(&pool)
            .create(NewUser {
                email: format!("{}@example.com", Uuid::new_v4()),
                name: None,
                password_hash: "hash".into(),
            })
            .await
            .unwrap();

        let repo = ValuationRepo::new(&pool);
        let input = input("Green Acres");
        let result = compute(&input).unwrap();
        let stored = repo
            .insert(NewValuation { user_id: user.id, input: input.clone(), result: result.clone() })
            .await
            .unwrap();
        let fetched = repo.get(stored.id).await.unwrap();
        assert_eq!(fetched.input, input);
        assert_eq!(fetched.result, result);

        assert!(repo.mark_paid(stored.id, "pi_1").await.unwrap());
        assert!(!repo.mark_paid(stored.id, "pi_1").await.unwrap());

        let page = repo.list(Some(user.id), Pagination::new(1, 20)).await.unwrap();
        assert_eq!(page.total, 1);

        repo.delete(stored.id).await.unwrap();
        assert!(matches!(repo.get(stored.id).await, Err(StoreError::NotFound { .. })));
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn unknown_user_is_not_found() {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL required");
        let pool = create_pool(&url).await.expect("pool creation failed");
        crate::db::migrations::run(&pool).await.expect("migrations failed");

        let input = input("Ghost");
        let result = compute(&input).unwrap();
        let err = ValuationRepo::new(&pool)
            .insert(NewValuation { user_id: Uuid::new_v4(), input, result })
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { resource: "user", .. }));
    }
}
