use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Books::Table)
                    .if_not_exists()
                    .col(uuid(Books::Id).primary_key())
                    .col(string(Books::Title))
                    .col(integer(Books::PageCount))
                    // amount in the smallest currency unit (kobo for NGN)
                    .col(big_integer(Books::PriceMinor))
                    .col(string(Books::Currency).default("NGN"))
                    .col(timestamp_with_time_zone(Books::CreatedAt))
                    .to_owned(),
            )
            .await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Books::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
pub enum Books {
    Table,
    Id,
    Title,
    PageCount,
    PriceMinor,
    Currency,
    CreatedAt,
}
