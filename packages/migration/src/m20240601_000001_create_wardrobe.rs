use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(Iden)]
enum Wardrobe {
    Table,
    Id,
    Name,
    Color,
    Size,
    Price,
    Stock,
    CreatedAt,
    UpdatedAt,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Wardrobe::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Wardrobe::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Wardrobe::Name).string().not_null())
                    .col(ColumnDef::new(Wardrobe::Color).string().not_null())
                    .col(ColumnDef::new(Wardrobe::Size).string().not_null())
                    .col(ColumnDef::new(Wardrobe::Price).double().not_null())
                    .col(
                        ColumnDef::new(Wardrobe::Stock)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Wardrobe::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Wardrobe::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // Search filters on color and size.
        manager
            .create_index(
                Index::create()
                    .name("idx_wardrobe_color_size")
                    .table(Wardrobe::Table)
                    .col(Wardrobe::Color)
                    .col(Wardrobe::Size)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Wardrobe::Table).to_owned())
            .await
    }
}
