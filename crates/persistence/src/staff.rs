//! Staff directory backed by a host-provided roster

use async_trait::async_trait;
use parking_lot::RwLock;
use uuid::Uuid;

use practice_growth_core::{Error, Result, StaffDirectory, StaffMember};

#[derive(Default)]
pub struct StaticStaffDirectory {
    staff: RwLock<Vec<StaffMember>>,
}

impl StaticStaffDirectory {
    pub fn new(staff: Vec<StaffMember>) -> Self {
        Self {
            staff: RwLock::new(staff),
        }
    }

    pub fn upsert(&self, member: StaffMember) {
        let mut staff = self.staff.write();
        match staff.iter_mut().find(|s| s.id == member.id) {
            Some(existing) => *existing = member,
            None => staff.push(member),
        }
    }
}

#[async_trait]
impl StaffDirectory for StaticStaffDirectory {
    async fn list_staff(&self, practice_id: Uuid) -> Result<Vec<StaffMember>> {
        Ok(self
            .staff
            .read()
            .iter()
            .filter(|s| s.practice_id == practice_id)
            .cloned()
            .collect())
    }

    async fn adjust_open_leads(
        &self,
        practice_id: Uuid,
        staff_id: Uuid,
        delta: i64,
    ) -> Result<()> {
        let mut staff = self.staff.write();
        let member = staff
            .iter_mut()
            .find(|s| s.id == staff_id && s.practice_id == practice_id)
            .ok_or_else(|| Error::not_found("staff member", staff_id))?;
        member.open_leads = (member.open_leads as i64 + delta).clamp(0, u32::MAX as i64) as u32;
        tracing::debug!(staff_id = %staff_id, open_leads = member.open_leads, "Staff load updated");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member(practice_id: Uuid, name: &str) -> StaffMember {
        StaffMember {
            id: Uuid::new_v4(),
            practice_id,
            name: name.into(),
            active: true,
            open_leads: 2,
            conversion_rate: 0.25,
        }
    }

    #[tokio::test]
    async fn test_list_by_practice() {
        let practice = Uuid::new_v4();
        let dir = StaticStaffDirectory::new(vec![
            member(practice, "Kim"),
            member(Uuid::new_v4(), "Ola"),
        ]);
        let staff = dir.list_staff(practice).await.unwrap();
        assert_eq!(staff.len(), 1);
        assert_eq!(staff[0].name, "Kim");
    }

    #[tokio::test]
    async fn test_adjust_open_leads_floors_at_zero() {
        let practice = Uuid::new_v4();
        let kim = member(practice, "Kim");
        let id = kim.id;
        let dir = StaticStaffDirectory::new(vec![kim]);

        dir.adjust_open_leads(practice, id, 1).await.unwrap();
        assert_eq!(dir.list_staff(practice).await.unwrap()[0].open_leads, 3);
        dir.adjust_open_leads(practice, id, -10).await.unwrap();
        assert_eq!(dir.list_staff(practice).await.unwrap()[0].open_leads, 0);
        assert!(dir.adjust_open_leads(practice, Uuid::new_v4(), 1).await.is_err());
        assert!(dir.adjust_open_leads(Uuid::new_v4(), id, 1).await.is_err());
    }
}
