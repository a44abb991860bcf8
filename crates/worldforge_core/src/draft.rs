//! Client-side drafts with provisional ids.
//!
//! # Responsibility
//! - Mint local ids for entities that have not been saved yet.
//! - Hold an ordered editing collection plus the current selection.
//! - Swap a draft for the server entity in one state transition on save.
//!
//! # Invariants
//! - A `LocalId` can never be confused with a server id; ids are a tagged
//!   union, not a format convention.
//! - `reconcile` rewrites collection membership and selection within one
//!   `&mut self` call.
//! - A failed save leaves the collection exactly as it was.

use crate::model::calendar::{CalendarAggregate, CalendarPayload};
use crate::model::geography::{Geography, NewGeography};
use crate::model::resource::{NamedResource, NewResource, ResourceId};
use std::fmt::{Debug, Display, Formatter};
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_LOCAL_ID: AtomicU64 = AtomicU64::new(1);

/// Provisional id of an entity that has never been saved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LocalId(u64);

impl Display for LocalId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "draft-{}", self.0)
    }
}

/// Mints a process-unique local id.
pub fn mint_draft_id() -> LocalId {
    LocalId(NEXT_LOCAL_ID.fetch_add(1, Ordering::Relaxed))
}

/// Id of an entry in a draft collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityId {
    Local(LocalId),
    Persisted(ResourceId),
}

impl EntityId {
    pub fn is_local(&self) -> bool {
        matches!(self, Self::Local(_))
    }
}

/// Server entity that can start life as a draft.
pub trait DraftEntity: Clone + Debug + PartialEq {
    /// Editable shape held before the first save.
    type Draft: Clone + Debug + PartialEq;

    fn server_id(&self) -> ResourceId;
}

impl DraftEntity for NamedResource {
    type Draft = NewResource;

    fn server_id(&self) -> ResourceId {
        self.id
    }
}

impl DraftEntity for Geography {
    type Draft = NewGeography;

    fn server_id(&self) -> ResourceId {
        self.id
    }
}

impl DraftEntity for CalendarAggregate {
    type Draft = CalendarPayload;

    fn server_id(&self) -> ResourceId {
        self.calendar.id
    }
}

/// One member of a draft collection.
#[derive(Debug, Clone, PartialEq)]
pub enum DraftEntry<T: DraftEntity> {
    Draft { id: LocalId, value: T::Draft },
    Persisted(T),
}

impl<T: DraftEntity> DraftEntry<T> {
    pub fn id(&self) -> EntityId {
        match self {
            Self::Draft { id, .. } => EntityId::Local(*id),
            Self::Persisted(entity) => EntityId::Persisted(entity.server_id()),
        }
    }
}

/// What a save closure is asked to persist.
#[derive(Debug)]
pub enum SaveRequest<'a, T: DraftEntity> {
    /// First save of a draft.
    Create(&'a T::Draft),
    /// Re-save of an already persisted entity.
    Update(&'a T),
}

/// Ordered editing collection with one optional selection.
#[derive(Debug)]
pub struct DraftCollection<T: DraftEntity> {
    entries: Vec<DraftEntry<T>>,
    selected: Option<EntityId>,
}

impl<T: DraftEntity> Default for DraftCollection<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            selected: None,
        }
    }
}

impl<T: DraftEntity> DraftCollection<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from a server listing with nothing selected.
    pub fn from_persisted(items: impl IntoIterator<Item = T>) -> Self {
        Self {
            entries: items.into_iter().map(DraftEntry::Persisted).collect(),
            selected: None,
        }
    }

    pub fn entries(&self) -> &[DraftEntry<T>] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, id: EntityId) -> Option<&DraftEntry<T>> {
        self.entries.iter().find(|entry| entry.id() == id)
    }

    /// Appends a new draft, selects it and returns its local id.
    pub fn create_draft(&mut self, value: T::Draft) -> LocalId {
        let id = mint_draft_id();
        self.entries.push(DraftEntry::Draft { id, value });
        self.selected = Some(EntityId::Local(id));
        id
    }

    pub fn draft_mut(&mut self, local: LocalId) -> Option<&mut T::Draft> {
        self.entries.iter_mut().find_map(|entry| match entry {
            DraftEntry::Draft { id, value } if *id == local => Some(value),
            _ => None,
        })
    }

    pub fn persisted_mut(&mut self, server_id: ResourceId) -> Option<&mut T> {
        self.entries.iter_mut().find_map(|entry| match entry {
            DraftEntry::Persisted(entity) if entity.server_id() == server_id => Some(entity),
            _ => None,
        })
    }

    /// Selects `id` if present. Returns whether the selection changed.
    pub fn select(&mut self, id: EntityId) -> bool {
        if self.get(id).is_none() {
            return false;
        }
        self.selected = Some(id);
        true
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    pub fn selected_id(&self) -> Option<EntityId> {
        self.selected
    }

    pub fn selected(&self) -> Option<&DraftEntry<T>> {
        self.selected.and_then(|id| self.get(id))
    }

    /// Replaces draft `local` with `server` in place, moving the selection.
    ///
    /// Returns `false` and changes nothing when `local` is not a member.
    pub fn reconcile(&mut self, local: LocalId, server: T) -> bool {
        let draft_id = EntityId::Local(local);
        let Some(slot) = self.entries.iter_mut().find(|entry| entry.id() == draft_id) else {
            return false;
        };

        let persisted_id = EntityId::Persisted(server.server_id());
        *slot = DraftEntry::Persisted(server);
        if self.selected == Some(draft_id) {
            self.selected = Some(persisted_id);
        }
        true
    }

    /// Drops a never-saved draft. No persistence call is involved.
    pub fn discard_draft(&mut self, local: LocalId) -> bool {
        let draft_id = EntityId::Local(local);
        let before = self.entries.len();
        self.entries.retain(|entry| entry.id() != draft_id);
        if self.selected == Some(draft_id) {
            self.selected = None;
        }
        self.entries.len() != before
    }

    /// Removes a persisted entry after the server deleted it.
    pub fn remove_persisted(&mut self, server_id: ResourceId) -> bool {
        let target = EntityId::Persisted(server_id);
        let before = self.entries.len();
        self.entries.retain(|entry| entry.id() != target);
        if self.selected == Some(target) {
            self.selected = None;
        }
        self.entries.len() != before
    }

    /// Saves entry `id` through `persist` and folds the result back in.
    ///
    /// Drafts are reconciled to the returned entity; persisted entries are
    /// replaced by it. On error nothing changes and the error is returned.
    /// Returns `Ok(None)` when `id` is not a member.
    pub fn save_with<E>(
        &mut self,
        id: EntityId,
        persist: impl FnOnce(SaveRequest<'_, T>) -> Result<T, E>,
    ) -> Result<Option<ResourceId>, E> {
        let saved = match self.get(id) {
            None => return Ok(None),
            Some(DraftEntry::Draft { value, .. }) => persist(SaveRequest::Create(value))?,
            Some(DraftEntry::Persisted(entity)) => persist(SaveRequest::Update(entity))?,
        };

        let server_id = saved.server_id();
        match id {
            EntityId::Local(local) => {
                self.reconcile(local, saved);
            }
            EntityId::Persisted(previous) => {
                if let Some(slot) = self.persisted_mut(previous) {
                    *slot = saved;
                }
                if self.selected == Some(id) {
                    self.selected = Some(EntityId::Persisted(server_id));
                }
            }
        }
        Ok(Some(server_id))
    }
}

#[cfg(test)]
mod tests {
    use super::{mint_draft_id, DraftCollection, DraftEntry, EntityId, SaveRequest};
    use crate::model::resource::{NamedResource, NewResource};
    use uuid::Uuid;

    fn saved(name: &str) -> NamedResource {
        NamedResource {
            id: Uuid::new_v4(),
            owner_id: "u1".to_string(),
            name: name.to_string(),
            tagline: None,
            data: serde_json::json!({}),
            is_free: false,
            is_published: false,
            created_at: 1,
            updated_at: 1,
        }
    }

    #[test]
    fn minted_ids_are_unique_and_tagged() {
        let first = mint_draft_id();
        let second = mint_draft_id();
        assert_ne!(first, second);
        assert!(EntityId::Local(first).is_local());
        assert!(!EntityId::Persisted(Uuid::new_v4()).is_local());
        assert!(first.to_string().starts_with("draft-"));
    }

    #[test]
    fn reconcile_swaps_membership_and_selection_together() {
        let existing = saved("Longsword");
        let mut items = DraftCollection::from_persisted(vec![existing.clone()]);
        let local = items.create_draft(NewResource::named("Chain Mail"));
        assert_eq!(items.selected_id(), Some(EntityId::Local(local)));

        let server = saved("Chain Mail");
        assert!(items.reconcile(local, server.clone()));

        assert_eq!(items.len(), 2);
        assert_eq!(items.selected_id(), Some(EntityId::Persisted(server.id)));
        assert!(items.get(EntityId::Local(local)).is_none());
        assert_eq!(
            items.entries()[1],
            DraftEntry::Persisted(server.clone()),
            "draft keeps its position"
        );
        assert!(!items.reconcile(local, server), "second reconcile is a no-op");
    }

    #[test]
    fn discard_draft_drops_entry_and_selection() {
        let mut items: DraftCollection<NamedResource> = DraftCollection::new();
        let local = items.create_draft(NewResource::named("Scratch"));
        assert!(items.discard_draft(local));
        assert!(items.is_empty());
        assert_eq!(items.selected_id(), None);
        assert!(!items.discard_draft(local));
    }

    #[test]
    fn failed_save_leaves_draft_untouched() {
        let mut items: DraftCollection<NamedResource> = DraftCollection::new();
        let local = items.create_draft(NewResource::named("Plate"));

        let result: Result<_, &str> =
            items.save_with(EntityId::Local(local), |_| Err("network down"));
        assert_eq!(result, Err("network down"));
        assert_eq!(items.selected_id(), Some(EntityId::Local(local)));
        assert!(matches!(
            items.get(EntityId::Local(local)),
            Some(DraftEntry::Draft { value, .. }) if value.name == "Plate"
        ));
    }

    #[test]
    fn save_with_creates_drafts_and_updates_persisted_entries() {
        let mut items: DraftCollection<NamedResource> = DraftCollection::new();
        let local = items.create_draft(NewResource::named("Plate"));
        if let Some(draft) = items.draft_mut(local) {
            draft.tagline = Some("Heavy".to_string());
        }

        let created = items
            .save_with(EntityId::Local(local), |request| match request {
                SaveRequest::Create(draft) => {
                    let mut row = saved(&draft.name);
                    row.tagline = draft.tagline.clone();
                    Ok::<_, ()>(row)
                }
                SaveRequest::Update(_) => Err(()),
            })
            .expect("create succeeds")
            .expect("entry exists");

        if let Some(row) = items.persisted_mut(created) {
            row.name = "Full Plate".to_string();
        }
        let updated = items
            .save_with(EntityId::Persisted(created), |request| match request {
                SaveRequest::Update(row) => {
                    let mut next = row.clone();
                    next.updated_at = 2;
                    Ok::<_, ()>(next)
                }
                SaveRequest::Create(_) => Err(()),
            })
            .expect("update succeeds");
        assert_eq!(updated, Some(created));

        match items.selected() {
            Some(DraftEntry::Persisted(row)) => {
                assert_eq!(row.name, "Full Plate");
                assert_eq!(row.tagline.as_deref(), Some("Heavy"));
                assert_eq!(row.updated_at, 2);
            }
            other => panic!("unexpected selection: {other:?}"),
        }
    }

    #[test]
    fn save_with_unknown_id_is_a_no_op() {
        let mut items: DraftCollection<NamedResource> = DraftCollection::new();
        let outcome: Result<_, ()> =
            items.save_with(EntityId::Local(mint_draft_id()), |_| panic!("not called"));
        assert_eq!(outcome, Ok(None));
    }

    #[test]
    fn removing_a_deleted_row_clears_its_selection() {
        let kept = saved("Dagger");
        let deleted = saved("Halberd");
        let mut items = DraftCollection::from_persisted(vec![kept.clone(), deleted.clone()]);

        assert!(items.select(EntityId::Persisted(deleted.id)));
        assert!(items.remove_persisted(deleted.id));
        assert_eq!(items.selected_id(), None);
        assert_eq!(items.entries(), &[DraftEntry::Persisted(kept.clone())]);
        assert!(!items.remove_persisted(deleted.id));

        assert!(items.select(EntityId::Persisted(kept.id)));
        assert!(!items.select(EntityId::Persisted(deleted.id)));
        items.clear_selection();
        assert_eq!(items.selected_id(), None);
        assert!(items.selected().is_none());
        assert_eq!(items.len(), 1, "clearing selection keeps entries");
    }
}
