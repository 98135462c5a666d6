pub use sea_orm_migration::prelude::*;

mod m20251016_090000_create_book_content_table;
mod m20251016_091500_create_user_reads_table;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20251016_090000_create_book_content_table::Migration),
            Box::new(m20251016_091500_create_user_reads_table::Migration),
        ]
    }
}
