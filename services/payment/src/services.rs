use std::sync::Arc;

use axum::extract::FromRef;
use sqlx::PgPool;

use tutorhub_auth::{policy, JwtService};
use tutorhub_common::{AppError, Caller};
use tutorhub_database::{Store, Transaction};
use tutorhub_notifications::Notifier;

use crate::config::AppConfig;
use crate::gateways::PaymentGateway;

#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub store: Arc<dyn Store>,
    pub gateway: Arc<dyn PaymentGateway>,
    pub jwt_service: JwtService,
    pub notifier: Notifier,
    pub config: AppConfig,
}

impl FromRef<AppState> for JwtService {
    fn from_ref(state: &AppState) -> Self {
        state.jwt_service.clone()
    }
}

pub struct TransactionService {
    db_pool: PgPool,
}

impl TransactionService {
    pub fn new(state: &AppState) -> Self {
        Self {
            db_pool: state.db_pool.clone(),
        }
    }

    /// Admins see the whole ledger; everyone else sees their own payments.
    pub async fn list(&self, caller: &Caller) -> Result<Vec<Transaction>, AppError> {
        let transactions = sqlx::query_as::<_, Transaction>(
            r#"
            SELECT * FROM transactions
            WHERE $1 OR user_id = $2
            ORDER BY created_at DESC
            "#,
        )
        .bind(policy::can_view_all_transactions(caller))
        .bind(caller.user_id)
        .fetch_all(&self.db_pool)
        .await?;
        Ok(transactions)
    }
}
