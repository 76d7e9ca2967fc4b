use crate::models::record::Record;

use super::id_generator::{IdGenerator, UuidIdGenerator};

/// How many draws from an injected generator are tried before falling back
/// to random UUIDs.
const MAX_GENERATOR_ATTEMPTS: usize = 16;

/// Create / update / delete over one ordered collection of records.
///
/// Pure in-memory logic shared by clients and portfolios. Order is insertion
/// order; nothing here sorts.
pub struct CollectionService;

impl CollectionService {
    pub fn new() -> Self {
        Self
    }

    /// Assign a fresh unique id to `record` and append it.
    /// Any id the caller put on the record is overwritten.
    /// Returns the assigned id.
    pub fn add<R: Record>(
        &self,
        records: &mut Vec<R>,
        mut record: R,
        ids: &mut dyn IdGenerator,
    ) -> String {
        let id = Self::fresh_id(records, ids);
        record.assign_id(id.clone());
        records.push(record);
        id
    }

    /// Replace the record with the same id, keeping its position.
    /// Returns `false` (and changes nothing) if no record matches.
    pub fn update<R: Record>(&self, records: &mut [R], record: R) -> bool {
        let idx = match record.id() {
            Some(id) => records.iter().position(|r| r.matches_id(id)),
            None => None,
        };
        match idx {
            Some(idx) => {
                records[idx] = record;
                true
            }
            None => false,
        }
    }

    /// Remove every record with `id`. Returns how many were removed.
    pub fn delete<R: Record>(&self, records: &mut Vec<R>, id: &str) -> usize {
        let before = records.len();
        records.retain(|r| !r.matches_id(id));
        before - records.len()
    }

    /// First record with `id`.
    pub fn find<'a, R: Record>(&self, records: &'a [R], id: &str) -> Option<&'a R> {
        records.iter().find(|r| r.matches_id(id))
    }

    /// Give a fresh id to every record that has none or repeats an earlier
    /// record's id, so the collection satisfies the uniqueness invariant.
    /// Returns how many records were re-identified.
    pub fn repair_identities<R: Record>(&self, records: &mut [R], ids: &mut dyn IdGenerator) -> usize {
        let mut repaired = 0;
        for idx in 0..records.len() {
            let clashes = match records[idx].id() {
                Some(id) if !id.is_empty() => records[..idx].iter().any(|r| r.matches_id(id)),
                _ => true,
            };
            if clashes {
                let id = Self::fresh_id(records, ids);
                records[idx].assign_id(id);
                repaired += 1;
            }
        }
        repaired
    }

    fn fresh_id<R: Record>(records: &[R], ids: &mut dyn IdGenerator) -> String {
        let is_free = |id: &str| !id.is_empty() && !records.iter().any(|r| r.matches_id(id));

        for _ in 0..MAX_GENERATOR_ATTEMPTS {
            let id = ids.next_id();
            if is_free(&id) {
                return id;
            }
            log::debug!("id generator returned taken id '{id}', drawing again");
        }

        log::warn!(
            "id generator produced no free id in {MAX_GENERATOR_ATTEMPTS} attempts, using UUIDs"
        );
        let mut fallback = UuidIdGenerator::new();
        loop {
            let id = fallback.next_id();
            if is_free(&id) {
                return id;
            }
        }
    }
}

impl Default for CollectionService {
    fn default() -> Self {
        Self::new()
    }
}

