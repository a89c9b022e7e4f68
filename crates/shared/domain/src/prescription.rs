//! Prescription domain entity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::{is_valid_prescription_status, PRESCRIPTION_STATUS_PENDING};
use crate::entity::{DomainEntity, MergeOutcome, Mergeable};
use crate::error::{DomainError, DomainResult};

/// Medication order issued to a patient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prescription {
    #[serde(default)]
    pub id: Option<String>,
    pub patient_id: String,
    pub medication: String,
    pub dosage: String,
    #[serde(default)]
    pub instructions: Option<String>,
    #[serde(default)]
    pub prescriber: Option<String>,
    #[serde(default = "default_status")]
    pub status: String,
    #[serde(default = "Utc::now")]
    pub created_date: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_date: DateTime<Utc>,
}

fn default_status() -> String {
    PRESCRIPTION_STATUS_PENDING.to_string()
}

impl Prescription {
    /// Create a new pending prescription.
    pub fn new(
        patient_id: impl Into<String>,
        medication: impl Into<String>,
        dosage: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: None,
            patient_id: patient_id.into(),
            medication: medication.into(),
            dosage: dosage.into(),
            instructions: None,
            prescriber: None,
            status: default_status(),
            created_date: now,
            updated_date: now,
        }
    }
}

impl DomainEntity for Prescription {
    const KIND: &'static str = "prescription";

    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn id_slot(&mut self) -> &mut Option<String> {
        &mut self.id
    }

    fn created_date(&self) -> DateTime<Utc> {
        self.created_date
    }

    fn updated_date(&self) -> DateTime<Utc> {
        self.updated_date
    }

    fn set_created_date(&mut self, at: DateTime<Utc>) {
        self.created_date = at;
    }

    fn set_updated_date(&mut self, at: DateTime<Utc>) {
        self.updated_date = at;
    }
}

impl Mergeable for Prescription {
    type Patch = UpdatePrescription;

    fn validate(&self) -> DomainResult<()> {
        if self.patient_id.trim().is_empty() {
            return Err(DomainError::validation("patientId required"));
        }
        if self.medication.trim().is_empty() {
            return Err(DomainError::validation("medication required"));
        }
        if !is_valid_prescription_status(&self.status) {
            return Err(DomainError::validation(format!(
                "Unknown prescription status: {}",
                self.status
            )));
        }
        Ok(())
    }

    fn merge(
        &mut self,
        patch: UpdatePrescription,
        now: DateTime<Utc>,
    ) -> DomainResult<MergeOutcome> {
        if let Some(status) = patch.status.as_deref() {
            if !is_valid_prescription_status(status) {
                return Err(DomainError::validation(format!(
                    "Unknown prescription status: {}",
                    status
                )));
            }
        }

        if let Some(medication) = patch.medication {
            self.medication = medication;
        }
        if let Some(dosage) = patch.dosage {
            self.dosage = dosage;
        }
        if let Some(instructions) = patch.instructions {
            self.instructions = Some(instructions);
        }
        if let Some(prescriber) = patch.prescriber {
            self.prescriber = Some(prescriber);
        }
        if let Some(status) = patch.status {
            self.status = status;
        }

        self.touch(now);
        Ok(MergeOutcome::default())
    }
}

/// Prescription update data transfer object
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePrescription {
    pub medication: Option<String>,
    pub dosage: Option<String>,
    pub instructions: Option<String>,
    pub prescriber: Option<String>,
    pub status: Option<String>,
}

impl UpdatePrescription {
    /// Patch that only moves the lifecycle status
    pub fn status(status: impl Into<String>) -> Self {
        Self {
            status: Some(status.into()),
            ..Default::default()
        }
    }
}
