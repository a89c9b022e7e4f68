//! User table for SeaORM.

use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue::NotSet, DeleteMany, Select, Set};

use crate::repository::base::{Persistable, WriteMode};
use domain::User;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub name: String,
    #[sea_orm(unique)]
    pub username: String,
    /// Hashed credential only
    #[sea_orm(column_name = "password")]
    pub credential: String,
    pub roles: String,
    pub email: String,
    pub phone: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub age: i32,
    pub city: Option<String>,
    pub status: String,
    pub created_date: DateTimeUtc,
    pub updated_date: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Persistable for User {
    type Table = Entity;
    type Row = Model;
    type Active = ActiveModel;

    fn from_row(model: Model) -> Self {
        User {
            id: Some(model.id),
            name: model.name,
            username: model.username,
            credential: model.credential,
            roles: model.roles,
            email: model.email,
            phone: model.phone,
            first_name: model.first_name,
            last_name: model.last_name,
            age: model.age,
            city: model.city,
            status: model.status,
            created_date: model.created_date,
            updated_date: model.updated_date,
        }
    }

    fn to_active(&self, id: String, mode: WriteMode) -> ActiveModel {
        ActiveModel {
            id: Set(id),
            name: Set(self.name.clone()),
            username: Set(self.username.clone()),
            credential: Set(self.credential.clone()),
            roles: Set(self.roles.clone()),
            email: Set(self.email.clone()),
            phone: Set(self.phone.clone()),
            first_name: Set(self.first_name.clone()),
            last_name: Set(self.last_name.clone()),
            age: Set(self.age),
            city: Set(self.city.clone()),
            status: Set(self.status.clone()),
            created_date: match mode {
                WriteMode::Insert => Set(self.created_date),
                WriteMode::Update => NotSet,
            },
            updated_date: Set(self.updated_date),
        }
    }

    fn select_by_id(id: &str) -> Select<Entity> {
        Entity::find_by_id(id.to_string())
    }

    fn delete_query(id: &str) -> DeleteMany<Entity> {
        Entity::delete_by_id(id.to_string())
    }

    fn order_column() -> Column {
        Column::CreatedDate
    }

    fn id_column() -> Column {
        Column::Id
    }

    fn stored_secret(&self) -> Option<&str> {
        Some(self.credential.as_str())
    }
}
