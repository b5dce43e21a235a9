use filtercrate::{QueryOptions, Queryable, RelationSpec, Resource};
use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
    pub email: String,
    pub age: i32,
    pub deleted: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::address_entity::Entity")]
    Addresses,
}

impl Related<super::address_entity::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Addresses.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Soft-deleting users resource with bulk operations enabled.
pub struct Users;

impl Queryable for Users {
    type Entity = Entity;
    const RESOURCE_NAME: &'static str = "User";

    fn relation(name: &str) -> Option<RelationSpec> {
        match name {
            "addresses" => Some(RelationSpec::many(
                Relation::Addresses.def(),
                vec!["id", "user_id", "city"],
            )),
            _ => None,
        }
    }

    fn query_options() -> QueryOptions {
        QueryOptions {
            delete_key: Some("deleted".to_string()),
            ..QueryOptions::default()
        }
    }
}

impl Resource for Users {
    type ActiveModelType = ActiveModel;
    const MULTI: bool = true;
}

/// Same table with the defaults: single-record mode and no soft delete column.
pub struct PlainUsers;

impl Queryable for PlainUsers {
    type Entity = Entity;
    const RESOURCE_NAME: &'static str = "User";
}

impl Resource for PlainUsers {
    type ActiveModelType = ActiveModel;
}
