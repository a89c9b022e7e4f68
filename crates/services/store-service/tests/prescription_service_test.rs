mod support;

use futures::StreamExt;

use common::{AppError, PageRequest};
use domain::{Prescription, UpdatePrescription, PRESCRIPTION_STATUS_DONE, PRESCRIPTION_STATUS_PENDING};
use store_service_lib::service::PrescriptionService;

use crate::support::open_store;

fn prescription(patient: &str, medication: &str) -> Prescription {
    let mut p = Prescription::new(patient, medication, "10mg");
    p.prescriber = Some("dr-house".to_string());
    p
}

#[tokio::test]
async fn test_create_get_update_delete() {
    let store = open_store().await;
    let service = store.prescriptions();

    let created = service.create(prescription("patient-1", "ibuprofen")).await.unwrap();
    let id = created.id.clone().unwrap();
    assert_eq!(created.status, PRESCRIPTION_STATUS_PENDING);

    let fetched = service.get(&id).await.unwrap();
    assert_eq!(fetched.medication, "ibuprofen");
    assert_eq!(fetched.prescriber.as_deref(), Some("dr-house"));

    let updated = service
        .update(
            &id,
            UpdatePrescription {
                dosage: Some("20mg".to_string()),
                instructions: Some("after meals".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.dosage, "20mg");
    assert_eq!(updated.instructions.as_deref(), Some("after meals"));
    assert_eq!(updated.medication, "ibuprofen");
    assert_eq!(updated.created_date, created.created_date);

    service.delete(&id).await.unwrap();
    assert!(matches!(service.get(&id).await, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn test_update_status() {
    let store = open_store().await;
    let service = store.prescriptions();
    let created = service.create(prescription("patient-1", "ibuprofen")).await.unwrap();
    let id = created.id.clone().unwrap();

    let done = service.update_status(&id, PRESCRIPTION_STATUS_DONE).await.unwrap();
    assert_eq!(done.status, PRESCRIPTION_STATUS_DONE);
    assert_eq!(service.get(&id).await.unwrap().status, PRESCRIPTION_STATUS_DONE);
}

#[tokio::test]
async fn test_update_status_rejects_unknown_value() {
    let store = open_store().await;
    let service = store.prescriptions();
    let created = service.create(prescription("patient-1", "ibuprofen")).await.unwrap();
    let id = created.id.clone().unwrap();

    let result = service.update_status(&id, "LOST").await;
    assert!(matches!(result, Err(AppError::Validation(_))));
    assert_eq!(service.get(&id).await.unwrap().status, PRESCRIPTION_STATUS_PENDING);
}

#[tokio::test]
async fn test_update_status_missing_writes_nothing() {
    let store = open_store().await;
    let service = store.prescriptions();

    let result = service.update_status("missing-id", PRESCRIPTION_STATUS_DONE).await;
    assert!(matches!(result, Err(AppError::NotFound(ref id)) if id == "missing-id"));
    assert!(service.list(PageRequest::default()).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_create_rejects_invalid_prescription() {
    let store = open_store().await;
    let service = store.prescriptions();

    let result = service.create(prescription("patient-1", "  ")).await;
    assert!(matches!(result, Err(AppError::Validation(ref m)) if m == "medication required"));

    let mut odd = prescription("patient-1", "ibuprofen");
    odd.status = "LOST".to_string();
    assert!(matches!(service.create(odd).await, Err(AppError::Validation(_))));

    assert!(service.list(PageRequest::default()).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_all_streams_snapshot() {
    let store = open_store().await;
    let service = store.prescriptions();
    for medication in ["a", "b", "c"] {
        service.create(prescription("patient-1", medication)).await.unwrap();
    }

    let stream = service.all().await.unwrap();
    service.create(prescription("patient-2", "late")).await.unwrap();

    let medications: Vec<String> = stream.map(|p| p.medication).collect().await;
    assert_eq!(medications, vec!["a", "b", "c"]);

    let everything: Vec<Prescription> = service.all().await.unwrap().collect().await;
    assert_eq!(everything.len(), 4);
}

#[tokio::test]
async fn test_list_pages() {
    let store = open_store().await;
    let service = store.prescriptions();
    for medication in ["a", "b", "c"] {
        service.create(prescription("patient-1", medication)).await.unwrap();
    }

    let first = service.list(PageRequest::new(0, 2)).await.unwrap();
    let second = service.list(PageRequest::new(1, 2)).await.unwrap();
    assert_eq!(first.len(), 2);
    assert_eq!(second.len(), 1);
    assert_eq!(second[0].medication, "c");
}
