use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(UserReads::Table)
                    .if_not_exists()
                    .col(uuid(UserReads::Id).primary_key())
                    .col(string(UserReads::UserId))
                    .col(string(UserReads::BookId))
                    .col(string(UserReads::LanguageId))
                    .col(small_integer(UserReads::Progress).default(0))
                    .col(timestamp_with_time_zone(UserReads::UpdatedAt))
                    .to_owned(),
            )
            .await?;

        // Conflict target for progress upserts: one row per user, book and language
        manager
            .create_index(
                Index::create()
                    .name("idx_user_reads_user_book_language")
                    .table(UserReads::Table)
                    .col(UserReads::UserId)
                    .col(UserReads::BookId)
                    .col(UserReads::LanguageId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(UserReads::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
enum UserReads {
    Table,
    Id,
    UserId,
    BookId,
    LanguageId,
    Progress,
    UpdatedAt,
}
