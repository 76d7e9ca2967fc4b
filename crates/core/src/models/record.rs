/// Identity access shared by every record kept in a store collection.
///
/// A record with a missing or empty id has no identity yet: saving it
/// takes the creation path, which assigns a fresh id exactly once.
pub trait Record {
    /// The record's id, if one has been assigned.
    fn id(&self) -> Option<&str>;

    /// Overwrite the id. Only the store calls this, at creation time.
    fn assign_id(&mut self, id: String);

    /// `true` if the id is present and non-empty.
    fn has_identity(&self) -> bool {
        self.id().is_some_and(|id| !id.is_empty())
    }

    /// `true` if this record's id equals `id`.
    fn matches_id(&self, id: &str) -> bool {
        self.id() == Some(id)
    }
}
