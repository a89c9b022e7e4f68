//! Migration: prescriptions table.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Prescriptions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Prescriptions::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Prescriptions::PatientId).string().not_null())
                    .col(ColumnDef::new(Prescriptions::Medication).string().not_null())
                    .col(ColumnDef::new(Prescriptions::Dosage).string().not_null())
                    .col(ColumnDef::new(Prescriptions::Instructions).text().null())
                    .col(ColumnDef::new(Prescriptions::Prescriber).string().null())
                    .col(ColumnDef::new(Prescriptions::Status).string().not_null())
                    .col(
                        ColumnDef::new(Prescriptions::CreatedDate)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Prescriptions::UpdatedDate)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // Lookups by patient
        manager
            .create_index(
                Index::create()
                    .name("idx_prescriptions_patient_id")
                    .table(Prescriptions::Table)
                    .col(Prescriptions::PatientId)
                    .if_not_exists()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Prescriptions::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Prescriptions {
    Table,
    Id,
    PatientId,
    Medication,
    Dosage,
    Instructions,
    Prescriber,
    Status,
    CreatedDate,
    UpdatedDate,
}
