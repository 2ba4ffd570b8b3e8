use crate::{m20250819_215543_create_user_table::User, m20250820_115913_create_books_table::Books};
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ReadingProgress::Table)
                    .if_not_exists()
                    .col(uuid(ReadingProgress::Id).primary_key())
                    .col(uuid(ReadingProgress::UserId))
                    .col(uuid(ReadingProgress::BookId))
                    .col(integer(ReadingProgress::CurrentPage).default(1))
                    .col(boolean(ReadingProgress::HasPaid).default(false))
                    .col(string_null(ReadingProgress::PaymentReference))
                    .col(timestamp_with_time_zone_null(ReadingProgress::PaidAt))
                    .col(timestamp_with_time_zone(ReadingProgress::LastAccessedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_reading_progress_user_id")
                            .from(ReadingProgress::Table, ReadingProgress::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_reading_progress_book_id")
                            .from(ReadingProgress::Table, ReadingProgress::BookId)
                            .to(Books::Table, Books::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // The upserts in the progress store conflict on this pair.
        manager
            .create_index(
                Index::create()
                    .name("idx_reading_progress_user_book")
                    .table(ReadingProgress::Table)
                    .col(ReadingProgress::UserId)
                    .col(ReadingProgress::BookId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ReadingProgress::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
enum ReadingProgress {
    Table,
    Id,
    UserId,
    BookId,
    CurrentPage,
    HasPaid,
    PaymentReference,
    PaidAt,
    LastAccessedAt,
}
