use sea_orm_migration::sea_query::extension::postgres::Type;
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Create subscription_type enum
        manager
            .create_type(
                Type::create()
                    .as_enum(SubscriptionType::Type)
                    .values([
                        SubscriptionType::None,
                        SubscriptionType::Monthly,
                        SubscriptionType::Annual,
                        SubscriptionType::Lifetime,
                    ])
                    .to_owned(),
            )
            .await?;

        // Create subscription_source enum
        manager
            .create_type(
                Type::create()
                    .as_enum(SubscriptionSource::Type)
                    .values([
                        SubscriptionSource::AppStore,
                        SubscriptionSource::PaymentProcessor,
                    ])
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Profiles::Table)
                    .if_not_exists()
                    .col(pk_uuid(Profiles::Id))
                    .col(string_null(Profiles::CustomerId))
                    .col(
                        ColumnDef::new(Profiles::Subscription)
                            .custom(SubscriptionType::Type)
                            .not_null()
                            .default(SimpleExpr::Custom("'none'::subscription_type".to_string())),
                    )
                    .col(timestamp_with_time_zone_null(Profiles::SubscriptionExpiration))
                    .col(
                        ColumnDef::new(Profiles::SubscriptionSource)
                            .custom(SubscriptionSource::Type)
                            .null(),
                    )
                    .col(
                        timestamp_with_time_zone(Profiles::CreatedAt)
                            .default(Expr::current_timestamp())
                            .not_null(),
                    )
                    .col(
                        timestamp_with_time_zone(Profiles::UpdatedAt)
                            .default(Expr::current_timestamp())
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // Shared trigger function for updated_at columns
        manager
            .get_connection()
            .execute_unprepared(
                r#"
                CREATE OR REPLACE FUNCTION update_updated_at_column()
                RETURNS TRIGGER AS $$
                BEGIN
                    NEW.updated_at = NOW();
                    RETURN NEW;
                END;
                $$ LANGUAGE plpgsql;
                "#,
            )
            .await?;

        manager
            .get_connection()
            .execute_unprepared(
                r#"
                CREATE TRIGGER update_profiles_updated_at
                BEFORE UPDATE ON profiles
                FOR EACH ROW
                EXECUTE FUNCTION update_updated_at_column();
                "#,
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_profiles_customer_id")
                    .table(Profiles::Table)
                    .col(Profiles::CustomerId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Profiles::Table).to_owned())
            .await?;

        manager
            .get_connection()
            .execute_unprepared("DROP FUNCTION IF EXISTS update_updated_at_column() CASCADE;")
            .await?;

        manager
            .drop_type(Type::drop().name(SubscriptionSource::Type).to_owned())
            .await?;

        manager
            .drop_type(Type::drop().name(SubscriptionType::Type).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
enum SubscriptionType {
    #[sea_orm(iden = "subscription_type")]
    Type,
    None,
    Monthly,
    Annual,
    Lifetime,
}

#[derive(DeriveIden)]
enum SubscriptionSource {
    #[sea_orm(iden = "subscription_source")]
    Type,
    AppStore,
    PaymentProcessor,
}

#[derive(DeriveIden)]
enum Profiles {
    Table,
    Id,
    CustomerId,
    Subscription,
    SubscriptionExpiration,
    SubscriptionSource,
    CreatedAt,
    UpdatedAt,
}
