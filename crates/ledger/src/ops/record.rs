use chrono::Utc;
use sea_orm::{
    ActiveValue, ConnectionTrait, QueryFilter, QueryOrder, QuerySelect, prelude::*,
};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    BankLink, BankTransaction, EngineError, Money, RecordSafeTxCmd, ResultEngine,
    SafeTransaction, SafeTxKind, bank_transactions, banks, safe_transactions, safes,
    util::{optional_text, required_text},
};

use super::{
    Engine, UnitOfWork,
    replay::{Until, replay, require_safe},
};

fn validate_cmd(cmd: &RecordSafeTxCmd) -> ResultEngine<()> {
    if !cmd.amount.is_positive() {
        return Err(EngineError::InvalidArgument(
            "amount must be > 0".to_string(),
        ));
    }
    if cmd.bank.is_some() && cmd.kind != SafeTxKind::BankDeposit {
        return Err(EngineError::InvalidArgument(format!(
            "bank link is only valid on {}, got {}",
            SafeTxKind::BankDeposit,
            cmd.kind
        )));
    }
    Ok(())
}

async fn next_seq<C: ConnectionTrait>(db: &C, safe_id: &str) -> ResultEngine<i64> {
    let last: Option<i64> = safe_transactions::Entity::find()
        .filter(safe_transactions::Column::SafeId.eq(safe_id))
        .order_by_desc(safe_transactions::Column::Seq)
        .select_only()
        .column(safe_transactions::Column::Seq)
        .into_tuple()
        .one(db)
        .await?;
    Ok(last.unwrap_or(0) + 1)
}

/// Writes the bank-side half of a deposit and moves the bank balance.
async fn deposit_to_bank<C: ConnectionTrait>(
    db: &C,
    station_id: &str,
    tx: &SafeTransaction,
    link: &BankLink,
) -> ResultEngine<Uuid> {
    let bank = banks::Entity::find_by_id(link.bank_id.to_string())
        .one(db)
        .await?
        .ok_or_else(|| EngineError::NotFound(format!("bank {}", link.bank_id)))?;

    let bank_tx = BankTransaction {
        id: Uuid::new_v4(),
        bank_id: link.bank_id,
        station_id: station_id.to_string(),
        kind: bank_transactions::DEPOSIT_KIND.to_string(),
        amount: tx.amount,
        description: tx.description.clone(),
        reference_number: optional_text(link.reference_number.as_deref()),
        transaction_date: tx.timestamp,
        created_by: tx.performed_by.clone(),
        safe_transaction_id: Some(tx.id),
        created_at: tx.created_at,
    };
    bank_transactions::ActiveModel::from(&bank_tx)
        .insert(db)
        .await?;

    let balance = Money::new(bank.current_balance_minor)
        .checked_add(tx.amount)
        .ok_or_else(|| EngineError::InvalidArgument("bank balance overflow".to_string()))?;
    let bank_model = banks::ActiveModel {
        id: ActiveValue::Set(bank.id),
        current_balance_minor: ActiveValue::Set(balance.minor()),
        ..Default::default()
    };
    bank_model.update(db).await?;

    Ok(bank_tx.id)
}

impl Engine {
    /// Records one entry in a safe and commits it.
    ///
    /// See [`Engine::record_transaction_in`] for the write itself.
    pub async fn record_transaction(&self, cmd: RecordSafeTxCmd) -> ResultEngine<SafeTransaction> {
        validate_cmd(&cmd)?;
        let mut uow = self.begin_locked(cmd.safe_id).await?;
        let recorded = self.record_transaction_in(&mut uow, cmd).await?;
        uow.commit().await?;
        Ok(recorded)
    }

    /// Records one entry in a safe inside a caller-owned unit of work.
    ///
    /// - `balance_before` is a replay of every entry stamped at or before the
    ///   new timestamp, so backdated entries get a correct snapshot.
    /// - Snapshots of entries already stored are never rewritten; only the
    ///   safe's cached `current_balance` is refreshed by a full replay.
    /// - A `BANK_DEPOSIT` with a [`BankLink`] also writes the bank-side row
    ///   and moves the bank balance.
    ///
    /// The safe stays locked until the unit of work commits or is dropped.
    pub async fn record_transaction_in(
        &self,
        uow: &mut UnitOfWork,
        cmd: RecordSafeTxCmd,
    ) -> ResultEngine<SafeTransaction> {
        validate_cmd(&cmd)?;
        let description = required_text(&cmd.description, "description")?;
        let performed_by = required_text(&cmd.performed_by, "performed by")?;

        self.lock_safe(uow, cmd.safe_id).await?;
        let db = uow.connection();

        let safe = require_safe(db, cmd.safe_id).await?;
        let balance_before = replay(db, &safe, Until::AtOrBefore(cmd.timestamp)).await?;
        let balance_after = cmd.kind.effect().apply(balance_before, cmd.amount)?;

        let mut tx = SafeTransaction {
            id: Uuid::new_v4(),
            safe_id: cmd.safe_id,
            seq: next_seq(db, &safe.id).await?,
            kind: cmd.kind.into(),
            amount: cmd.amount,
            balance_before,
            balance_after,
            timestamp: cmd.timestamp,
            description,
            performed_by,
            refs: cmd.refs,
            bank_transaction_id: None,
            created_at: Utc::now(),
        };

        if let Some(link) = &cmd.bank {
            tx.bank_transaction_id = Some(deposit_to_bank(db, &safe.station_id, &tx, link).await?);
        }

        safe_transactions::ActiveModel::from(&tx).insert(db).await?;

        let current = replay(db, &safe, Until::Everything).await?;
        let safe_model = safes::ActiveModel {
            id: ActiveValue::Set(safe.id.clone()),
            current_balance_minor: ActiveValue::Set(current.minor()),
            ..Default::default()
        };
        safe_model.update(db).await?;

        if balance_after.is_negative() {
            warn!(
                safe_id = %tx.safe_id,
                kind = %tx.kind,
                %balance_after,
                "safe balance goes negative"
            );
        }
        info!(
            safe_id = %tx.safe_id,
            kind = %tx.kind,
            amount = %tx.amount,
            %balance_before,
            %balance_after,
            %current,
            "safe transaction recorded"
        );

        Ok(tx)
    }
}
