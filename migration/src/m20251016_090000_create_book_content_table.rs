use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(BookContent::Table)
                    .if_not_exists()
                    .col(uuid(BookContent::Id).primary_key())
                    .col(string(BookContent::BookId))
                    .col(string(BookContent::LanguageId))
                    .col(string_null(BookContent::LanguageName))
                    .col(string_null(BookContent::Title))
                    .col(string_null(BookContent::PdfUrl))
                    .col(string_null(BookContent::EpubUrl))
                    .to_owned(),
            )
            .await?;

        // One content row per book translation
        manager
            .create_index(
                Index::create()
                    .name("idx_book_content_book_language")
                    .table(BookContent::Table)
                    .col(BookContent::BookId)
                    .col(BookContent::LanguageId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(BookContent::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
pub enum BookContent {
    Table,
    Id,
    BookId,
    LanguageId,
    LanguageName,
    Title,
    PdfUrl,
    EpubUrl,
}
