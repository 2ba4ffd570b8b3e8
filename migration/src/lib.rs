pub use sea_orm_migration::prelude::*;

mod m20250819_215543_create_user_table;
mod m20250820_115221_create_sessions_table;
mod m20250820_115913_create_books_table;
mod m20250821_093012_create_reading_progress_table;
mod m20250902_101500_unique_payment_reference;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250819_215543_create_user_table::Migration),
            Box::new(m20250820_115221_create_sessions_table::Migration),
            Box::new(m20250820_115913_create_books_table::Migration),
            Box::new(m20250821_093012_create_reading_progress_table::Migration),
            Box::new(m20250902_101500_unique_payment_reference::Migration),
        ]
    }
}
