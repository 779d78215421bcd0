use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

pub const DEFAULT_AVAILABLE_SEATS: i32 = 20;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Deserialize, Serialize)]
#[sea_orm(table_name = "packages")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
    pub origin: Option<String>,
    pub start_date: Date,
    pub end_date: Date,
    #[sea_orm(column_type = "Double")]
    pub total_price: f64,
    pub available_seats: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::package_destination::Entity")]
    PackageDestinations,
    #[sea_orm(has_many = "super::reservation::Entity")]
    Reservations,
}

impl Related<super::package_destination::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PackageDestinations.def()
    }
}

impl Related<super::reservation::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Reservations.def()
    }
}

impl Related<super::destination::Entity> for Entity {
    fn to() -> RelationDef {
        super::package_destination::Relation::Destination.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::package_destination::Relation::Package.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}
