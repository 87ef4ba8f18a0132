use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use std::sync::Mutex;

use ticketpay::core::Result;
use ticketpay::modules::installments::models::{InstallmentSchedule, InstallmentStatus};
use ticketpay::modules::installments::repositories::InstallmentStore;

/// In-memory store with the same compare-and-swap semantics as the MySQL
/// repository, for deterministic tests without a database.
pub struct MemoryStore {
    entries: Mutex<Vec<InstallmentSchedule>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
        }
    }

    pub async fn seed(&self, entries: Vec<InstallmentSchedule>) {
        self.entries.lock().unwrap().extend(entries);
    }

    pub fn snapshot(&self) -> Vec<InstallmentSchedule> {
        self.entries.lock().unwrap().clone()
    }

    pub fn get(&self, order_reference: &str, sequence_number: i32) -> InstallmentSchedule {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .find(|e| e.order_reference == order_reference && e.sequence_number == sequence_number)
            .cloned()
            .expect("entry not found")
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl InstallmentStore for MemoryStore {
    async fn create_schedule(&self, entries: &[InstallmentSchedule]) -> Result<()> {
        self.entries.lock().unwrap().extend_from_slice(entries);
        Ok(())
    }

    async fn find_by_order(&self, order_reference: &str) -> Result<Vec<InstallmentSchedule>> {
        let mut found: Vec<_> = self
            .entries
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.order_reference == order_reference)
            .cloned()
            .collect();
        found.sort_by_key(|e| e.sequence_number);
        Ok(found)
    }

    async fn find_entry(
        &self,
        order_reference: &str,
        sequence_number: i32,
    ) -> Result<Option<InstallmentSchedule>> {
        Ok(self
            .entries
            .lock()
            .unwrap()
            .iter()
            .find(|e| e.order_reference == order_reference && e.sequence_number == sequence_number)
            .cloned())
    }

    async fn find_due(&self, today: NaiveDate) -> Result<Vec<InstallmentSchedule>> {
        let mut found: Vec<_> = self
            .entries
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.status == InstallmentStatus::Scheduled && e.due_date <= today)
            .cloned()
            .collect();
        found.sort_by(|a, b| {
            (a.order_reference.as_str(), a.sequence_number)
                .cmp(&(b.order_reference.as_str(), b.sequence_number))
        });
        Ok(found)
    }

    async fn find_failed_since(&self, cutoff: NaiveDateTime) -> Result<Vec<InstallmentSchedule>> {
        Ok(self
            .entries
            .lock()
            .unwrap()
            .iter()
            .filter(|e| {
                e.status == InstallmentStatus::Failed
                    && e.failed_at.is_some_and(|failed_at| failed_at > cutoff)
            })
            .cloned()
            .collect())
    }

    async fn find_failed_until(&self, cutoff: NaiveDateTime) -> Result<Vec<InstallmentSchedule>> {
        Ok(self
            .entries
            .lock()
            .unwrap()
            .iter()
            .filter(|e| {
                e.status == InstallmentStatus::Failed
                    && e.failed_at.is_some_and(|failed_at| failed_at <= cutoff)
            })
            .cloned()
            .collect())
    }

    async fn claim_attempt(
        &self,
        id: &str,
        expected_status: InstallmentStatus,
        expected_attempts: i32,
    ) -> Result<bool> {
        let mut entries = self.entries.lock().unwrap();
        match entries.iter_mut().find(|e| e.id == id) {
            Some(entry)
                if entry.status == expected_status && entry.attempt_count == expected_attempts =>
            {
                entry.attempt_count += 1;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn update(&self, entry: &InstallmentSchedule) -> Result<()> {
        let mut entries = self.entries.lock().unwrap();
        if let Some(existing) = entries.iter_mut().find(|e| e.id == entry.id) {
            *existing = entry.clone();
        }
        Ok(())
    }

    async fn transition(
        &self,
        entry: &InstallmentSchedule,
        expected_status: InstallmentStatus,
    ) -> Result<bool> {
        let mut entries = self.entries.lock().unwrap();
        match entries.iter_mut().find(|e| e.id == entry.id) {
            Some(existing) if existing.status == expected_status => {
                *existing = entry.clone();
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}
