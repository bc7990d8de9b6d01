use sea_orm_migration::sea_query::extension::postgres::Type;
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Create validation_status enum
        manager
            .create_type(
                Type::create()
                    .as_enum(ValidationStatus::Type)
                    .values([ValidationStatus::Valid, ValidationStatus::Test])
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(IosSubscriptions::Table)
                    .if_not_exists()
                    .col(pk_uuid(IosSubscriptions::Id))
                    .col(uuid(IosSubscriptions::UserId).not_null())
                    .col(uuid(IosSubscriptions::ProfileId).not_null())
                    .col(string(IosSubscriptions::TransactionId).not_null())
                    .col(string(IosSubscriptions::OriginalTransactionId).not_null())
                    .col(string(IosSubscriptions::ProductId).not_null())
                    .col(
                        ColumnDef::new(IosSubscriptions::SubscriptionType)
                            .custom(Alias::new("subscription_type"))
                            .not_null()
                            .default(SimpleExpr::Custom("'none'::subscription_type".to_string())),
                    )
                    .col(timestamp_with_time_zone(IosSubscriptions::PurchaseDate).not_null())
                    .col(timestamp_with_time_zone(IosSubscriptions::ExpiresDate).not_null())
                    .col(boolean(IosSubscriptions::IsActive).default(false).not_null())
                    .col(
                        boolean(IosSubscriptions::AutoRenewStatus)
                            .default(false)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(IosSubscriptions::ValidationStatus)
                            .custom(ValidationStatus::Type)
                            .not_null()
                            .default(SimpleExpr::Custom("'valid'::validation_status".to_string())),
                    )
                    .col(text(IosSubscriptions::ReceiptData).not_null())
                    .col(
                        timestamp_with_time_zone(IosSubscriptions::ReceiptValidatedAt)
                            .default(Expr::current_timestamp())
                            .not_null(),
                    )
                    .col(json_binary_null(IosSubscriptions::RawValidationResponse))
                    .col(
                        timestamp_with_time_zone(IosSubscriptions::CreatedAt)
                            .default(Expr::current_timestamp())
                            .not_null(),
                    )
                    .col(
                        timestamp_with_time_zone(IosSubscriptions::UpdatedAt)
                            .default(Expr::current_timestamp())
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_ios_subscriptions_profile_id")
                            .from(IosSubscriptions::Table, IosSubscriptions::ProfileId)
                            .to(Profiles::Table, Profiles::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Unique index backs the ON CONFLICT upsert
        manager
            .create_index(
                Index::create()
                    .name("idx_ios_subscriptions_transaction_id")
                    .table(IosSubscriptions::Table)
                    .col(IosSubscriptions::TransactionId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Best-active lookup: user + status, newest expiry first
        manager
            .create_index(
                Index::create()
                    .name("idx_ios_subscriptions_user_status_expires")
                    .table(IosSubscriptions::Table)
                    .col(IosSubscriptions::UserId)
                    .col(IosSubscriptions::ValidationStatus)
                    .col(IosSubscriptions::ExpiresDate)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_ios_subscriptions_original_transaction_id")
                    .table(IosSubscriptions::Table)
                    .col(IosSubscriptions::OriginalTransactionId)
                    .to_owned(),
            )
            .await?;

        manager
            .get_connection()
            .execute_unprepared(
                r#"
                CREATE TRIGGER update_ios_subscriptions_updated_at
                BEFORE UPDATE ON ios_subscriptions
                FOR EACH ROW
                EXECUTE FUNCTION update_updated_at_column();
                "#,
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(IosSubscriptions::Table).to_owned())
            .await?;

        manager
            .drop_type(Type::drop().name(ValidationStatus::Type).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
enum ValidationStatus {
    #[sea_orm(iden = "validation_status")]
    Type,
    Valid,
    Test,
}

#[derive(DeriveIden)]
enum Profiles {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum IosSubscriptions {
    Table,
    Id,
    UserId,
    ProfileId,
    TransactionId,
    OriginalTransactionId,
    ProductId,
    SubscriptionType,
    PurchaseDate,
    ExpiresDate,
    IsActive,
    AutoRenewStatus,
    ValidationStatus,
    ReceiptData,
    ReceiptValidatedAt,
    RawValidationResponse,
    CreatedAt,
    UpdatedAt,
}
