use sea_orm::{ActiveValue, QueryFilter, QueryOrder, QuerySelect, prelude::*};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    EngineError, LedgerEffect, Money, ResultEngine, StoredKind, safe_transactions, safes,
    util::{parse_uuid, required_text},
};

use super::{
    Engine,
    replay::{Until, fold_balance, replay, require_safe},
};

/// Cached balance of a safe checked against a full replay.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafeReconciliation {
    pub station_id: String,
    pub safe_id: Uuid,
    pub stored_balance: Money,
    pub calculated_balance: Money,
    /// `calculated_balance - stored_balance`
    pub discrepancy: Money,
    pub is_balanced: bool,
    /// Amount of the latest physical count, or the creation baseline.
    pub last_opening_balance: Money,
    pub total_inflows: Money,
    pub total_outflows: Money,
    pub inflow_count: usize,
    pub outflow_count: usize,
    pub transaction_count: usize,
}

impl Engine {
    /// Compares the safe's cached `current_balance` with a full replay.
    ///
    /// Read only; use [`Engine::refresh_current_balance`] to repair a drifted
    /// cache.
    pub async fn reconcile(&self, station_id: &str) -> ResultEngine<SafeReconciliation> {
        let station_id = required_text(station_id, "station id")?;
        let safe = safes::Entity::find()
            .filter(safes::Column::StationId.eq(station_id.clone()))
            .one(&self.database)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("safe for {station_id}")))?;

        let rows: Vec<(String, i64)> = safe_transactions::Entity::find()
            .filter(safe_transactions::Column::SafeId.eq(safe.id.clone()))
            .order_by_asc(safe_transactions::Column::Timestamp)
            .order_by_asc(safe_transactions::Column::Seq)
            .select_only()
            .column(safe_transactions::Column::Kind)
            .column(safe_transactions::Column::AmountMinor)
            .into_tuple()
            .all(&self.database)
            .await?;

        let stored_balance = Money::new(safe.current_balance_minor);
        let calculated_balance =
            fold_balance(Money::new(safe.opening_balance_minor), rows.iter().cloned())?;

        let mut last_opening_balance = Money::new(safe.opening_balance_minor);
        let (mut total_inflows, mut total_outflows) = (Money::ZERO, Money::ZERO);
        let (mut inflow_count, mut outflow_count) = (0, 0);
        let overflow = || EngineError::InvalidArgument("reconciliation total overflow".to_string());
        for (kind, amount_minor) in &rows {
            let amount = Money::new(*amount_minor);
            match StoredKind::from(kind.as_str()).effect() {
                LedgerEffect::Override => last_opening_balance = amount,
                LedgerEffect::Inflow => {
                    total_inflows = total_inflows.checked_add(amount).ok_or_else(overflow)?;
                    inflow_count += 1;
                }
                LedgerEffect::Outflow => {
                    total_outflows = total_outflows.checked_add(amount).ok_or_else(overflow)?;
                    outflow_count += 1;
                }
            }
        }

        let discrepancy = calculated_balance
            .checked_sub(stored_balance)
            .ok_or_else(overflow)?;
        if !discrepancy.is_zero() {
            warn!(
                station_id = %station_id,
                %stored_balance,
                %calculated_balance,
                %discrepancy,
                "safe cache drifted from history"
            );
        }

        Ok(SafeReconciliation {
            safe_id: parse_uuid(&safe.id, "safe")?,
            station_id,
            stored_balance,
            calculated_balance,
            discrepancy,
            is_balanced: discrepancy.is_zero(),
            last_opening_balance,
            total_inflows,
            total_outflows,
            inflow_count,
            outflow_count,
            transaction_count: rows.len(),
        })
    }

    /// Rewrites the cached `current_balance` from a full replay and returns it.
    ///
    /// Takes the safe's write lock, so it never races a recording.
    pub async fn refresh_current_balance(&self, safe_id: Uuid) -> ResultEngine<Money> {
        let uow = self.begin_locked(safe_id).await?;
        let db = uow.connection();

        let safe = require_safe(db, safe_id).await?;
        let current = replay(db, &safe, Until::Everything).await?;
        if current.minor() != safe.current_balance_minor {
            let model = safes::ActiveModel {
                id: ActiveValue::Set(safe.id.clone()),
                current_balance_minor: ActiveValue::Set(current.minor()),
                ..Default::default()
            };
            model.update(db).await?;
            info!(
                %safe_id,
                stale = %Money::new(safe.current_balance_minor),
                %current,
                "safe balance cache refreshed"
            );
        }
        uow.commit().await?;
        Ok(current)
    }
}
