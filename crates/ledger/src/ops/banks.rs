use chrono::Utc;
use sea_orm::{TransactionTrait, prelude::*};
use tracing::info;
use uuid::Uuid;

use crate::{
    Bank, EngineError, ResultEngine, banks,
    util::{optional_text, required_text},
};

use super::{Engine, with_tx};

impl Engine {
    /// Registers a bank account that safe deposits can target.
    pub async fn register_bank(
        &self,
        name: &str,
        account_number: Option<&str>,
    ) -> ResultEngine<Bank> {
        let name = required_text(name, "bank name")?;
        let bank = Bank::new(name, optional_text(account_number), Utc::now());

        with_tx!(self, |db_tx| {
            banks::ActiveModel::from(&bank).insert(&db_tx).await?;
            info!(bank_id = %bank.id, name = %bank.name, "bank registered");
            Ok::<_, EngineError>(())
        })?;
        Ok(bank)
    }

    pub async fn bank(&self, bank_id: Uuid) -> ResultEngine<Bank> {
        let model = banks::Entity::find_by_id(bank_id.to_string())
            .one(&self.database)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("bank {bank_id}")))?;
        Bank::try_from(model)
    }
}
