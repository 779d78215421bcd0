use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Reservations::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Reservations::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Reservations::UserId).integer().not_null())
                    .col(ColumnDef::new(Reservations::PackageId).integer().not_null())
                    .col(ColumnDef::new(Reservations::CreatedAt).date_time().not_null())
                    .col(
                        ColumnDef::new(Reservations::Status)
                            .string_len(20)
                            .not_null()
                            .default("confirmed"),
                    )
                    .col(
                        ColumnDef::new(Reservations::PassengerCount)
                            .integer()
                            .not_null()
                            .default(1),
                    )
                    .col(ColumnDef::new(Reservations::ContactPhone).string_len(20))
                    .col(ColumnDef::new(Reservations::Comments).text())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_reservations_user")
                            .from(Reservations::Table, Reservations::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_reservations_package")
                            .from(Reservations::Table, Reservations::PackageId)
                            .to(Packages::Table, Packages::Id)
                            .on_delete(ForeignKeyAction::Restrict)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Travelers::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Travelers::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Travelers::ReservationId).integer().not_null())
                    .col(ColumnDef::new(Travelers::FullName).string_len(200).not_null())
                    .col(ColumnDef::new(Travelers::NationalId).string_len(20).not_null())
                    .col(ColumnDef::new(Travelers::BirthDate).date())
                    .col(ColumnDef::new(Travelers::Phone).string_len(20).not_null())
                    .col(ColumnDef::new(Travelers::Email).string_len(120))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_travelers_reservation")
                            .from(Travelers::Table, Travelers::ReservationId)
                            .to(Reservations::Table, Reservations::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Create indexes
        manager
            .create_index(
                Index::create()
                    .name("idx_reservations_user_id")
                    .table(Reservations::Table)
                    .col(Reservations::UserId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_reservations_package_status")
                    .table(Reservations::Table)
                    .col(Reservations::PackageId)
                    .col(Reservations::Status)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_travelers_reservation_id")
                    .table(Travelers::Table)
                    .col(Travelers::ReservationId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Travelers::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Reservations::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Reservations {
    Table,
    Id,
    UserId,
    PackageId,
    CreatedAt,
    Status,
    PassengerCount,
    ContactPhone,
    Comments,
}

#[derive(DeriveIden)]
enum Travelers {
    Table,
    Id,
    ReservationId,
    FullName,
    NationalId,
    BirthDate,
    Phone,
    Email,
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum Packages {
    Table,
    Id,
}
