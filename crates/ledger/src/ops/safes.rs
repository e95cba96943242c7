use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, QueryFilter, TransactionTrait, prelude::*, sea_query::OnConflict};
use tracing::info;
use uuid::Uuid;

use crate::{
    EngineError, Money, RecordSafeTxCmd, ResultEngine, Safe, SafeTransaction, SafeTxKind, safes,
    util::required_text,
};

use super::{Engine, replay::require_safe, with_tx};

impl Engine {
    /// Returns the station's safe, creating it with a zero opening balance
    /// the first time.
    ///
    /// Concurrent calls for the same station converge on a single row: the
    /// insert is skipped on a `station_id` conflict and the winner is read
    /// back.
    pub async fn open_or_get_safe(&self, station_id: &str) -> ResultEngine<Safe> {
        let station_id = required_text(station_id, "station id")?;
        let candidate = Safe::new(station_id.clone(), Money::ZERO, Utc::now());

        with_tx!(self, |db_tx| {
            let inserted = safes::Entity::insert(safes::ActiveModel::from(&candidate))
                .on_conflict(
                    OnConflict::column(safes::Column::StationId)
                        .do_nothing()
                        .to_owned(),
                )
                .exec_without_returning(&db_tx)
                .await?;
            if inserted > 0 {
                info!(station_id = %station_id, safe_id = %candidate.id, "safe created");
            }

            let model = safes::Entity::find()
                .filter(safes::Column::StationId.eq(station_id.clone()))
                .one(&db_tx)
                .await?
                .ok_or_else(|| EngineError::NotFound(format!("safe for {station_id}")))?;
            Safe::try_from(model)
        })
    }

    pub async fn safe(&self, safe_id: Uuid) -> ResultEngine<Safe> {
        Safe::try_from(require_safe(&self.database, safe_id).await?)
    }

    /// The station's safe, if one was ever opened.
    pub async fn safe_for_station(&self, station_id: &str) -> ResultEngine<Option<Safe>> {
        let station_id = required_text(station_id, "station id")?;
        safes::Entity::find()
            .filter(safes::Column::StationId.eq(station_id))
            .one(&self.database)
            .await?
            .map(Safe::try_from)
            .transpose()
    }

    /// Records a physical count of the safe.
    ///
    /// The count is an `OPENING_BALANCE` entry at `counted_at`, so replay
    /// resets to the counted amount from that instant on. The safe's
    /// creation baseline is left untouched.
    pub async fn count_safe(
        &self,
        station_id: &str,
        counted: Money,
        counted_by: &str,
        counted_at: DateTime<Utc>,
    ) -> ResultEngine<SafeTransaction> {
        let safe = self.open_or_get_safe(station_id).await?;
        let counted_by = required_text(counted_by, "counted by")?;

        let mut uow = self.begin_locked(safe.id).await?;
        let cmd = RecordSafeTxCmd::new(
            safe.id,
            SafeTxKind::OpeningBalance,
            counted,
            counted_at,
            counted_by.clone(),
        )
        .description(format!("Safe count by {counted_by}"));
        let recorded = self.record_transaction_in(&mut uow, cmd).await?;

        let stamp = safes::ActiveModel {
            id: ActiveValue::Set(safe.id.to_string()),
            last_counted_at: ActiveValue::Set(Some(counted_at)),
            counted_by: ActiveValue::Set(Some(counted_by)),
            ..Default::default()
        };
        stamp.update(uow.connection()).await?;
        uow.commit().await?;

        info!(station_id = %safe.station_id, amount = %counted, "safe counted");
        Ok(recorded)
    }
}
