use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Users
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Users::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Users::FullName).string_len(200).not_null())
                    .col(
                        ColumnDef::new(Users::NationalId)
                            .string_len(20)
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(Users::Email)
                            .string_len(120)
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Users::PasswordHash).string_len(255).not_null())
                    .col(ColumnDef::new(Users::BirthDate).date().not_null())
                    .col(ColumnDef::new(Users::Phone).string_len(20))
                    .col(
                        ColumnDef::new(Users::Role)
                            .string_len(20)
                            .not_null()
                            .default("client"),
                    )
                    .col(ColumnDef::new(Users::CreatedAt).date_time().not_null())
                    .to_owned(),
            )
            .await?;

        // Destinations
        manager
            .create_table(
                Table::create()
                    .table(Destinations::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Destinations::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Destinations::Name).string_len(200).not_null())
                    .col(ColumnDef::new(Destinations::Origin).string_len(200))
                    .col(ColumnDef::new(Destinations::Description).text())
                    .col(ColumnDef::new(Destinations::Activities).text())
                    .col(ColumnDef::new(Destinations::BaseCost).double().not_null())
                    .to_owned(),
            )
            .await?;

        // Packages
        manager
            .create_table(
                Table::create()
                    .table(Packages::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Packages::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Packages::Name).string_len(200).not_null())
                    .col(ColumnDef::new(Packages::Origin).string_len(200))
                    .col(ColumnDef::new(Packages::StartDate).date().not_null())
                    .col(ColumnDef::new(Packages::EndDate).date().not_null())
                    .col(ColumnDef::new(Packages::TotalPrice).double().not_null())
                    .col(
                        ColumnDef::new(Packages::AvailableSeats)
                            .integer()
                            .not_null()
                            .default(20),
                    )
                    .to_owned(),
            )
            .await?;

        // Package <-> Destination join
        manager
            .create_table(
                Table::create()
                    .table(PackageDestinations::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PackageDestinations::PackageId)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PackageDestinations::DestinationId)
                            .integer()
                            .not_null(),
                    )
                    .primary_key(
                        Index::create()
                            .col(PackageDestinations::PackageId)
                            .col(PackageDestinations::DestinationId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_package_destinations_package")
                            .from(PackageDestinations::Table, PackageDestinations::PackageId)
                            .to(Packages::Table, Packages::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_package_destinations_destination")
                            .from(
                                PackageDestinations::Table,
                                PackageDestinations::DestinationId,
                            )
                            .to(Destinations::Table, Destinations::Id)
                            .on_delete(ForeignKeyAction::Restrict)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_package_destinations_destination_id")
                    .table(PackageDestinations::Table)
                    .col(PackageDestinations::DestinationId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(PackageDestinations::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Packages::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Destinations::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
    FullName,
    NationalId,
    Email,
    PasswordHash,
    BirthDate,
    Phone,
    Role,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Destinations {
    Table,
    Id,
    Name,
    Origin,
    Description,
    Activities,
    BaseCost,
}

#[derive(DeriveIden)]
enum Packages {
    Table,
    Id,
    Name,
    Origin,
    StartDate,
    EndDate,
    TotalPrice,
    AvailableSeats,
}

#[derive(DeriveIden)]
enum PackageDestinations {
    Table,
    PackageId,
    DestinationId,
}
