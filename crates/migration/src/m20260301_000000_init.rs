//! Initial schema.
//!
//! - `safes`: one cash ledger per station
//! - `safe_transactions`: dated ledger entries with balance snapshots
//! - `banks`: accounts that receive deposits
//! - `bank_transactions`: bank-side rows of safe deposits

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

// ─────────────────────────────────────────────────────────────────────────────
// Table identifiers
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Iden)]
enum Safes {
    Table,
    Id,
    StationId,
    OpeningBalanceMinor,
    CurrentBalanceMinor,
    LastCountedAt,
    CountedBy,
    CreatedAt,
}

#[derive(Iden)]
enum SafeTransactions {
    Table,
    Id,
    SafeId,
    Seq,
    Kind,
    AmountMinor,
    BalanceBeforeMinor,
    BalanceAfterMinor,
    Timestamp,
    Description,
    PerformedBy,
    ShiftId,
    ExpenseId,
    LoanId,
    DepositId,
    ChequeId,
    CreditSaleId,
    BatchId,
    BankTransactionId,
    CreatedAt,
}

#[derive(Iden)]
enum Banks {
    Table,
    Id,
    Name,
    AccountNumber,
    CurrentBalanceMinor,
    CreatedAt,
}

#[derive(Iden)]
enum BankTransactions {
    Table,
    Id,
    BankId,
    StationId,
    Kind,
    AmountMinor,
    Description,
    ReferenceNumber,
    TransactionDate,
    CreatedBy,
    SafeTransactionId,
    CreatedAt,
}

// ─────────────────────────────────────────────────────────────────────────────
// Migration implementation
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // ───────────────────────────────────────────────────────────────────
        // 1. Safes
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Safes::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Safes::Id).string().not_null().primary_key())
                    .col(
                        ColumnDef::new(Safes::StationId)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(Safes::OpeningBalanceMinor)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Safes::CurrentBalanceMinor)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Safes::LastCountedAt).timestamp())
                    .col(ColumnDef::new(Safes::CountedBy).string())
                    .col(ColumnDef::new(Safes::CreatedAt).timestamp().not_null())
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 2. Safe transactions
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(SafeTransactions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SafeTransactions::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(SafeTransactions::SafeId).string().not_null())
                    .col(
                        ColumnDef::new(SafeTransactions::Seq)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(SafeTransactions::Kind).string().not_null())
                    .col(
                        ColumnDef::new(SafeTransactions::AmountMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SafeTransactions::BalanceBeforeMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SafeTransactions::BalanceAfterMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SafeTransactions::Timestamp)
                            .timestamp()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SafeTransactions::Description)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SafeTransactions::PerformedBy)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(SafeTransactions::ShiftId).string())
                    .col(ColumnDef::new(SafeTransactions::ExpenseId).string())
                    .col(ColumnDef::new(SafeTransactions::LoanId).string())
                    .col(ColumnDef::new(SafeTransactions::DepositId).string())
                    .col(ColumnDef::new(SafeTransactions::ChequeId).string())
                    .col(ColumnDef::new(SafeTransactions::CreditSaleId).string())
                    .col(ColumnDef::new(SafeTransactions::BatchId).string())
                    .col(ColumnDef::new(SafeTransactions::BankTransactionId).string())
                    .col(
                        ColumnDef::new(SafeTransactions::CreatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    // No cascade: a safe with history is never deleted.
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-safe_transactions-safe_id")
                            .from(SafeTransactions::Table, SafeTransactions::SafeId)
                            .to(Safes::Table, Safes::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        // Replay order.
        manager
            .create_index(
                Index::create()
                    .name("idx-safe_transactions-safe_id-timestamp-seq")
                    .table(SafeTransactions::Table)
                    .col(SafeTransactions::SafeId)
                    .col(SafeTransactions::Timestamp)
                    .col(SafeTransactions::Seq)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-safe_transactions-safe_id-seq-unique")
                    .table(SafeTransactions::Table)
                    .col(SafeTransactions::SafeId)
                    .col(SafeTransactions::Seq)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 3. Banks
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Banks::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Banks::Id).string().not_null().primary_key())
                    .col(ColumnDef::new(Banks::Name).string().not_null())
                    .col(ColumnDef::new(Banks::AccountNumber).string())
                    .col(
                        ColumnDef::new(Banks::CurrentBalanceMinor)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Banks::CreatedAt).timestamp().not_null())
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 4. Bank transactions
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(BankTransactions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(BankTransactions::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(BankTransactions::BankId).string().not_null())
                    .col(
                        ColumnDef::new(BankTransactions::StationId)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(BankTransactions::Kind).string().not_null())
                    .col(
                        ColumnDef::new(BankTransactions::AmountMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(BankTransactions::Description)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(BankTransactions::ReferenceNumber).string())
                    .col(
                        ColumnDef::new(BankTransactions::TransactionDate)
                            .timestamp()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(BankTransactions::CreatedBy)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(BankTransactions::SafeTransactionId).string())
                    .col(
                        ColumnDef::new(BankTransactions::CreatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-bank_transactions-bank_id")
                            .from(BankTransactions::Table, BankTransactions::BankId)
                            .to(Banks::Table, Banks::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-bank_transactions-bank_id-transaction_date")
                    .table(BankTransactions::Table)
                    .col(BankTransactions::BankId)
                    .col(BankTransactions::TransactionDate)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Drop in reverse order of creation (respecting FK dependencies)
        manager
            .drop_table(Table::drop().table(BankTransactions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Banks::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(SafeTransactions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Safes::Table).to_owned())
            .await?;
        Ok(())
    }
}
