use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Registered OAuth2 client applications. callback_uri may be blank;
        // the gateway synthesizes and persists a fallback on first use.
        manager
            .create_table(
                Table::create()
                    .table(ClientApps::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ClientApps::ClientId)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(ClientApps::ApplicationName)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(ClientApps::CallbackUri).string())
                    .col(
                        ColumnDef::new(ClientApps::CreatedAt)
                            .big_integer()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // Outstanding device-authorization attempts, keyed by the user code
        // shown on the device. Rows are created by the issuance step and
        // transitioned pending -> used here; an external reaper expires them.
        manager
            .create_table(
                Table::create()
                    .table(DeviceFlows::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(DeviceFlows::UserCode)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(DeviceFlows::ClientId).string().not_null())
                    .col(ColumnDef::new(DeviceFlows::Scope).string().not_null())
                    .col(
                        ColumnDef::new(DeviceFlows::Status)
                            .string()
                            .not_null()
                            .default("pending"),
                    )
                    .col(ColumnDef::new(DeviceFlows::CallbackUri).string())
                    .col(
                        ColumnDef::new(DeviceFlows::CreatedAt)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(DeviceFlows::ExpiresAt)
                            .big_integer()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // Index on client_id for the lazy callback stamp on pending rows
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_device_flows_client_id")
                    .table(DeviceFlows::Table)
                    .col(DeviceFlows::ClientId)
                    .to_owned(),
            )
            .await?;

        // Index on expires_at for the external reaper
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_device_flows_expires_at")
                    .table(DeviceFlows::Table)
                    .col(DeviceFlows::ExpiresAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(DeviceFlows::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ClientApps::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum ClientApps {
    Table,
    ClientId,
    ApplicationName,
    CallbackUri,
    CreatedAt,
}

#[derive(DeriveIden)]
enum DeviceFlows {
    Table,
    UserCode,
    ClientId,
    Scope,
    Status,
    CallbackUri,
    CreatedAt,
    ExpiresAt,
}
