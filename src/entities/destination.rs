use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Deserialize, Serialize)]
#[sea_orm(table_name = "destinations")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
    pub origin: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,
    /// Comma separated list, split by `activity_list`.
    #[sea_orm(column_type = "Text", nullable)]
    pub activities: Option<String>,
    #[sea_orm(column_type = "Double")]
    pub base_cost: f64,
}

impl Model {
    pub fn activity_list(&self) -> Vec<String> {
        self.activities
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .map(str::to_string)
            .collect()
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::package_destination::Entity")]
    PackageDestinations,
}

impl Related<super::package_destination::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PackageDestinations.def()
    }
}

impl Related<super::package::Entity> for Entity {
    fn to() -> RelationDef {
        super::package_destination::Relation::Package.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::package_destination::Relation::Destination.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}
