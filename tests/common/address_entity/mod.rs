use filtercrate::{Queryable, RelationSpec, Resource};
use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "addresses")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub user_id: i32,
    pub city: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user_entity::Entity",
        from = "Column::UserId",
        to = "super::user_entity::Column::Id"
    )]
    User,
}

impl Related<super::user_entity::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

pub struct Addresses;

impl Queryable for Addresses {
    type Entity = Entity;
    const RESOURCE_NAME: &'static str = "Address";

    fn relation(name: &str) -> Option<RelationSpec> {
        match name {
            "user" => Some(RelationSpec::one(
                Relation::User.def(),
                vec!["id", "name", "age"],
            )),
            _ => None,
        }
    }
}

impl Resource for Addresses {
    type ActiveModelType = ActiveModel;
    const MULTI: bool = true;
}
