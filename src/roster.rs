//! The sales board: employee roster plus the weekly sheet.
//!
//! Rules observed by every front-end variant:
//! - names are unique case-insensitively and never permanently reserved
//! - every employee always has a five-day record (zeros when absent)
//! - every mutation rewrites the whole document; a failed save rolls the
//!   in-memory state back to its pre-call snapshot
//!
//! The store never looks at the acting principal. Row gating (admin or
//! the row's owner) lives in the command layer, matching the source.

use crate::error::StoreError;
use crate::store::RosterPersistence;
use crate::types::{DayRecord, Employee, RosterDocument, Weekday};

/// Roster installed on first run when the backing store is empty.
const SEED_EMPLOYEES: &[(&str, &str)] = &[
    ("Anderson", "123"),
    ("Vitoria", "123"),
    ("Jemima", "123"),
    ("Maiany", "123"),
    ("Fernanda", "123"),
    ("Nadia", "123"),
    ("Giovana", "123"),
];

pub struct Roster {
    store: Box<dyn RosterPersistence>,
    doc: RosterDocument,
}

impl Roster {
    /// Load from the persistence collaborator, seeding the default roster
    /// on first run. Employees missing a day record get a zero one.
    pub fn load(store: Box<dyn RosterPersistence>) -> Result<Self, StoreError> {
        let doc = store.load().map_err(StoreError::Persistence)?;
        let mut doc = match doc {
            Some(doc) => doc,
            None => seed_document(),
        };
        ensure_day_records(&mut doc);
        Ok(Roster { store, doc })
    }

    /// Build around an explicit document, skipping the initial load.
    pub fn with_document(store: Box<dyn RosterPersistence>, mut doc: RosterDocument) -> Self {
        ensure_day_records(&mut doc);
        Roster { store, doc }
    }

    /// Fresh seed roster around a store; the fallback when a stored
    /// document cannot be read.
    pub fn seeded(store: Box<dyn RosterPersistence>) -> Self {
        Self::with_document(store, seed_document())
    }

    pub fn document(&self) -> &RosterDocument {
        &self.doc
    }

    /// Current roster in insertion order.
    pub fn employees(&self) -> &[Employee] {
        &self.doc.employees
    }

    /// Case-insensitive lookup.
    pub fn find(&self, name: &str) -> Option<&Employee> {
        let needle = name.to_lowercase();
        self.doc
            .employees
            .iter()
            .find(|e| e.name.to_lowercase() == needle)
    }

    pub fn add_employee(&mut self, name: &str, password: &str) -> Result<(), StoreError> {
        let name = name.trim();
        if name.is_empty() || password.is_empty() {
            return Err(StoreError::Validation(
                "name and password are required".to_string(),
            ));
        }
        if self.find(name).is_some() {
            return Err(StoreError::DuplicateName(name.to_string()));
        }

        let snapshot = self.doc.clone();
        self.doc.employees.push(Employee {
            name: name.to_string(),
            password: password.to_string(),
        });
        self.doc.sheet.insert(name.to_string(), DayRecord::default());
        self.persist_or_rollback(snapshot)
    }

    pub fn remove_employee(&mut self, name: &str) -> Result<(), StoreError> {
        let found = self
            .find(name)
            .ok_or_else(|| StoreError::NotFound(name.to_string()))?;
        let canonical = found.name.clone();

        let snapshot = self.doc.clone();
        self.doc.employees.retain(|e| e.name != canonical);
        self.doc.sheet.remove(&canonical);
        self.persist_or_rollback(snapshot)
    }

    pub fn change_password(&mut self, name: &str, new_password: &str) -> Result<(), StoreError> {
        if new_password.is_empty() {
            return Err(StoreError::Validation(
                "new password is required".to_string(),
            ));
        }
        let canonical = self
            .find(name)
            .map(|e| e.name.clone())
            .ok_or_else(|| StoreError::NotFound(name.to_string()))?;

        let snapshot = self.doc.clone();
        for employee in &mut self.doc.employees {
            if employee.name == canonical {
                employee.password = new_password.to_string();
            }
        }
        self.persist_or_rollback(snapshot)
    }

    /// Overwrite one cell. Negative values are accepted — corrections are
    /// entered as negative amounts in the source sheets.
    pub fn set_cell(&mut self, employee: &str, day: Weekday, value: f64) -> Result<(), StoreError> {
        let canonical = self
            .find(employee)
            .map(|e| e.name.clone())
            .ok_or_else(|| StoreError::NotFound(employee.to_string()))?;

        let snapshot = self.doc.clone();
        self.doc
            .sheet
            .entry(canonical)
            .or_default()
            .set(day, value);
        self.persist_or_rollback(snapshot)
    }

    /// Zero every cell, persisting the cleared sheet. Rolls back on a
    /// failed save like any other mutation.
    pub fn reset_week(&mut self) -> Result<(), StoreError> {
        let snapshot = self.doc.clone();
        for record in self.doc.sheet.values_mut() {
            *record = DayRecord::default();
        }
        self.persist_or_rollback(snapshot)
    }

    pub fn day_record(&self, employee: &str) -> DayRecord {
        self.find(employee)
            .and_then(|e| self.doc.sheet.get(&e.name))
            .cloned()
            .unwrap_or_default()
    }

    /// Sum of the five day values; 0 for an unknown employee.
    pub fn weekly_total(&self, employee: &str) -> f64 {
        self.day_record(employee).total()
    }

    /// Sum of one weekday across the whole roster.
    pub fn column_total(&self, day: Weekday) -> f64 {
        self.doc
            .employees
            .iter()
            .map(|e| {
                self.doc
                    .sheet
                    .get(&e.name)
                    .map(|r| r.get(day))
                    .unwrap_or(0.0)
            })
            .sum()
    }

    /// Sum over everything.
    pub fn grand_total(&self) -> f64 {
        self.doc
            .employees
            .iter()
            .map(|e| self.weekly_total(&e.name))
            .sum()
    }

    /// Per-seller weekly totals, in roster order.
    pub fn seller_totals(&self) -> Vec<crate::types::SellerTotal> {
        self.doc
            .employees
            .iter()
            .map(|e| crate::types::SellerTotal {
                seller: e.name.clone(),
                total: self.weekly_total(&e.name),
            })
            .collect()
    }

    fn persist_or_rollback(&mut self, snapshot: RosterDocument) -> Result<(), StoreError> {
        match self.store.save(&self.doc) {
            Ok(()) => Ok(()),
            Err(e) => {
                self.doc = snapshot;
                Err(StoreError::Persistence(e))
            }
        }
    }
}

fn seed_document() -> RosterDocument {
    let mut doc = RosterDocument::default();
    for (name, password) in SEED_EMPLOYEES {
        doc.employees.push(Employee {
            name: name.to_string(),
            password: password.to_string(),
        });
    }
    doc
}

fn ensure_day_records(doc: &mut RosterDocument) {
    for employee in &doc.employees {
        doc.sheet
            .entry(employee.name.clone())
            .or_insert_with(DayRecord::default);
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::MemoryStore;
    use super::*;

    fn roster() -> Roster {
        Roster::load(Box::new(MemoryStore::new())).unwrap()
    }

    #[test]
    fn test_first_run_seeds_default_roster() {
        let roster = roster();
        assert_eq!(roster.employees().len(), 7);
        assert_eq!(roster.employees()[0].name, "Anderson");
        // Every seeded employee starts at zero.
        assert_eq!(roster.grand_total(), 0.0);
    }

    #[test]
    fn test_reload_does_not_duplicate_seed() {
        let store = MemoryStore::new();
        let mut roster = Roster::load(Box::new(store.handle())).unwrap();
        roster.add_employee("Anna", "pw").unwrap();

        let reloaded = Roster::load(Box::new(store)).unwrap();
        assert_eq!(reloaded.employees().len(), 8);
    }

    #[test]
    fn test_add_employee_rejects_duplicates_case_insensitively() {
        let mut roster = roster();
        assert!(matches!(
            roster.add_employee("anderson", "pw"),
            Err(StoreError::DuplicateName(_))
        ));
        assert!(matches!(
            roster.add_employee("", "pw"),
            Err(StoreError::Validation(_))
        ));
        assert!(matches!(
            roster.add_employee("Anna", ""),
            Err(StoreError::Validation(_))
        ));
    }

    #[test]
    fn test_remove_then_readd_succeeds() {
        let mut roster = roster();
        roster.remove_employee("Vitoria").unwrap();
        assert!(roster.find("Vitoria").is_none());
        assert!(roster.employees().iter().all(|e| e.name != "Vitoria"));

        // Names are not permanently reserved.
        roster.add_employee("Vitoria", "new").unwrap();
        assert!(roster.find("vitoria").is_some());
    }

    #[test]
    fn test_remove_unknown_is_not_found() {
        let mut roster = roster();
        assert!(matches!(
            roster.remove_employee("Nobody"),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn test_set_cell_and_totals_scenario() {
        let store = MemoryStore::new();
        let mut roster = Roster::with_document(Box::new(store), RosterDocument::default());
        roster.add_employee("Anna", "1").unwrap();
        roster.add_employee("Beto", "2").unwrap();

        roster.set_cell("Anna", Weekday::Monday, 10.50).unwrap();
        roster.set_cell("Beto", Weekday::Monday, 5.00).unwrap();

        assert_eq!(roster.column_total(Weekday::Monday), 15.50);
        assert_eq!(roster.weekly_total("Anna"), 10.50);
        assert_eq!(roster.grand_total(), 15.50);
    }

    #[test]
    fn test_grand_total_cross_check_invariant() {
        let mut roster = roster();
        roster.set_cell("Anderson", Weekday::Monday, 10.0).unwrap();
        roster.set_cell("Vitoria", Weekday::Tuesday, -2.5).unwrap();
        roster.set_cell("Jemima", Weekday::Friday, 7.25).unwrap();

        let by_column: f64 = Weekday::ALL.iter().map(|d| roster.column_total(*d)).sum();
        let by_row: f64 = roster
            .employees()
            .iter()
            .map(|e| roster.weekly_total(&e.name))
            .sum();
        assert_eq!(roster.grand_total(), by_column);
        assert_eq!(roster.grand_total(), by_row);
    }

    #[test]
    fn test_set_cell_unknown_employee() {
        let mut roster = roster();
        assert!(matches!(
            roster.set_cell("Nobody", Weekday::Monday, 1.0),
            Err(StoreError::NotFound(_))
        ));
        assert_eq!(roster.weekly_total("Nobody"), 0.0);
    }

    #[test]
    fn test_failed_save_rolls_back_to_snapshot() {
        let store = MemoryStore::new();
        let mut roster = Roster::load(Box::new(store.handle())).unwrap();
        roster.set_cell("Anderson", Weekday::Monday, 50.0).unwrap();

        store.set_failing(true);
        let err = roster.set_cell("Anderson", Weekday::Monday, 99.0);
        assert!(matches!(err, Err(StoreError::Persistence(_))));
        // The optimistic mutation was reverted, not half-kept.
        assert_eq!(roster.day_record("Anderson").monday, 50.0);

        let err = roster.add_employee("Anna", "pw");
        assert!(matches!(err, Err(StoreError::Persistence(_))));
        assert!(roster.find("Anna").is_none());
        assert_eq!(roster.employees().len(), 7);
    }

    #[test]
    fn test_change_password() {
        let mut roster = roster();
        roster.change_password("nadia", "nova").unwrap();
        assert_eq!(roster.find("Nadia").unwrap().password, "nova");
        assert!(matches!(
            roster.change_password("Nobody", "x"),
            Err(StoreError::NotFound(_))
        ));
        assert!(matches!(
            roster.change_password("Nadia", ""),
            Err(StoreError::Validation(_))
        ));
    }

    #[test]
    fn test_reset_week_zeroes_every_cell() {
        let mut roster = roster();
        roster.set_cell("Anderson", Weekday::Monday, 10.0).unwrap();
        roster.set_cell("Giovana", Weekday::Friday, 4.0).unwrap();

        roster.reset_week().unwrap();
        assert_eq!(roster.grand_total(), 0.0);
        for employee in roster.employees() {
            assert_eq!(roster.weekly_total(&employee.name), 0.0);
        }
    }
}
