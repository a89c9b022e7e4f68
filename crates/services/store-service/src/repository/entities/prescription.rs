//! Prescription table for SeaORM.

use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue::NotSet, DeleteMany, Select, Set};

use crate::repository::base::{Persistable, WriteMode};
use domain::Prescription;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "prescriptions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub patient_id: String,
    pub medication: String,
    pub dosage: String,
    pub instructions: Option<String>,
    pub prescriber: Option<String>,
    pub status: String,
    pub created_date: DateTimeUtc,
    pub updated_date: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Persistable for Prescription {
    type Table = Entity;
    type Row = Model;
    type Active = ActiveModel;

    fn from_row(model: Model) -> Self {
        Prescription {
            id: Some(model.id),
            patient_id: model.patient_id,
            medication: model.medication,
            dosage: model.dosage,
            instructions: model.instructions,
            prescriber: model.prescriber,
            status: model.status,
            created_date: model.created_date,
            updated_date: model.updated_date,
        }
    }

    fn to_active(&self, id: String, mode: WriteMode) -> ActiveModel {
        ActiveModel {
            id: Set(id),
            patient_id: Set(self.patient_id.clone()),
            medication: Set(self.medication.clone()),
            dosage: Set(self.dosage.clone()),
            instructions: Set(self.instructions.clone()),
            prescriber: Set(self.prescriber.clone()),
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
}
