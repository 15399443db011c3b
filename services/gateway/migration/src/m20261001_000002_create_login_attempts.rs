use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(LoginAttempts::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(LoginAttempts::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(LoginAttempts::Email).string().not_null())
                    .col(ColumnDef::new(LoginAttempts::CodeHash).string().not_null())
                    .col(
                        ColumnDef::new(LoginAttempts::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(LoginAttempts::ExpiresAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(LoginAttempts::ConsumedAt).timestamp_with_time_zone())
                    .to_owned(),
            )
            .await?;

        // Active-attempt counting filters by email.
        manager
            .create_index(
                Index::create()
                    .table(LoginAttempts::Table)
                    .col(LoginAttempts::Email)
                    .name("idx_login_attempts_email")
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .table(LoginAttempts::Table)
                    .col(LoginAttempts::ExpiresAt)
                    .name("idx_login_attempts_expires_at")
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(LoginAttempts::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum LoginAttempts {
    Table,
    Id,
    Email,
    CodeHash,
    CreatedAt,
    ExpiresAt,
    ConsumedAt,
}
