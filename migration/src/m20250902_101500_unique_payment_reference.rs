use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // A payment reference unlocks at most one (user, book) row; unpaid rows stay NULL.
        manager
            .create_index(
                Index::create()
                    .name("idx_reading_progress_payment_reference")
                    .table(ReadingProgress::Table)
                    .col(ReadingProgress::PaymentReference)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_reading_progress_payment_reference")
                    .table(ReadingProgress::Table)
                    .to_owned(),
            )
            .await
    }
}

#[derive(DeriveIden)]
enum ReadingProgress {
    Table,
    PaymentReference,
}
