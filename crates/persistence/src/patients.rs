//! Read-only patient history, seeded by the host

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use uuid::Uuid;

use practice_growth_core::{PatientRecord, PatientRepository, Result};

#[derive(Default)]
pub struct InMemoryPatientRepository {
    patients: RwLock<HashMap<Uuid, PatientRecord>>,
}

impl InMemoryPatientRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a patient record
    pub fn upsert(&self, patient: PatientRecord) {
        self.patients.write().insert(patient.id, patient);
    }

    pub fn seed(&self, patients: impl IntoIterator<Item = PatientRecord>) {
        let mut map = self.patients.write();
        for patient in patients {
            map.insert(patient.id, patient);
        }
        tracing::debug!(count = map.len(), "Patient records seeded");
    }
}

#[async_trait]
impl PatientRepository for InMemoryPatientRepository {
    async fn find(&self, practice_id: Uuid, patient_id: Uuid) -> Result<Option<PatientRecord>> {
        Ok(self
            .patients
            .read()
            .get(&patient_id)
            .filter(|p| p.practice_id == practice_id)
            .cloned())
    }

    async fn list(&self, practice_id: Uuid) -> Result<Vec<PatientRecord>> {
        let mut patients: Vec<PatientRecord> = self
            .patients
            .read()
            .values()
            .filter(|p| p.practice_id == practice_id)
            .cloned()
            .collect();
        patients.sort_by_key(|p| p.id);
        Ok(patients)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use practice_growth_core::ContactInfo;

    fn patient(practice_id: Uuid) -> PatientRecord {
        PatientRecord {
            id: Uuid::new_v4(),
            practice_id,
            contact: ContactInfo {
                first_name: "Lee".into(),
                ..Default::default()
            },
            visits: Default::default(),
            lapse: Default::default(),
            engagement: Default::default(),
        }
    }

    #[tokio::test]
    async fn test_list_filters_by_practice() {
        let repo = InMemoryPatientRepository::new();
        let practice = Uuid::new_v4();
        let other = Uuid::new_v4();
        repo.seed(vec![patient(practice), patient(practice), patient(other)]);

        assert_eq!(repo.list(practice).await.unwrap().len(), 2);
        assert_eq!(repo.list(other).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_foreign_patient_is_absent() {
        let repo = InMemoryPatientRepository::new();
        let record = patient(Uuid::new_v4());
        let id = record.id;
        repo.upsert(record);

        assert!(repo.find(Uuid::new_v4(), id).await.unwrap().is_none());
    }
}
