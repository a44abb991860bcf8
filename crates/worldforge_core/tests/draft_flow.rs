use worldforge_core::db::open_db_in_memory;
use worldforge_core::draft::SaveRequest;
use worldforge_core::model::resource::Companion;
use worldforge_core::{
    DraftCollection, DraftEntry, EntityId, NamedResource, NewResource, Principal, ResourcePatch,
    ResourceService, Role, ServiceError, SqliteResourceRepository,
};

#[test]
fn new_companion_flow_reconciles_against_the_store() {
    let conn = open_db_in_memory().unwrap();
    let companions = ResourceService::new(
        SqliteResourceRepository::<Companion>::try_new(&conn).unwrap(),
    );
    let author = Principal::new("alice", Role::WorldBuilder);

    let existing: Vec<NamedResource> = companions
        .list(&author)
        .unwrap()
        .into_iter()
        .map(|row| row.item)
        .collect();
    let mut screen = DraftCollection::from_persisted(existing);

    let local = screen.create_draft(NewResource::named("Wolf"));
    screen.draft_mut(local).unwrap().tagline = Some("Loyal".to_string());

    let save = |screen: &mut DraftCollection<NamedResource>, id: EntityId| {
        screen.save_with(id, |request| match request {
            SaveRequest::Create(draft) => companions.create(&author, draft).map(|row| row.item),
            SaveRequest::Update(row) => companions
                .update(
                    &author,
                    row.id,
                    &ResourcePatch {
                        name: Some(row.name.clone()),
                        tagline: row.tagline.clone(),
                        ..ResourcePatch::default()
                    },
                )
                .map(|row| row.item),
        })
    };

    let server_id = save(&mut screen, EntityId::Local(local))
        .unwrap()
        .unwrap();
    assert_eq!(screen.selected_id(), Some(EntityId::Persisted(server_id)));
    assert!(screen.get(EntityId::Local(local)).is_none());

    screen.persisted_mut(server_id).unwrap().name = "Dire Wolf".to_string();
    save(&mut screen, EntityId::Persisted(server_id)).unwrap();

    let stored = companions.get(&author, server_id).unwrap().item;
    assert_eq!(stored.name, "Dire Wolf");
    assert_eq!(stored.tagline.as_deref(), Some("Loyal"));
    assert!(matches!(screen.selected(), Some(DraftEntry::Persisted(row)) if *row == stored));

    companions.delete(&author, server_id).unwrap();
    assert!(screen.remove_persisted(server_id));
    assert!(screen.is_empty());
    assert_eq!(screen.selected_id(), None);
}

#[test]
fn rejected_first_save_keeps_the_draft_editable() {
    let conn = open_db_in_memory().unwrap();
    let companions = ResourceService::new(
        SqliteResourceRepository::<Companion>::try_new(&conn).unwrap(),
    );
    let author = Principal::new("alice", Role::WorldBuilder);
    let mut screen: DraftCollection<NamedResource> = DraftCollection::new();

    let local = screen.create_draft(NewResource::named("   "));
    let result = screen.save_with(EntityId::Local(local), |request| match request {
        SaveRequest::Create(draft) => companions.create(&author, draft).map(|row| row.item),
        SaveRequest::Update(_) => unreachable!("draft saves always create"),
    });

    assert!(matches!(result, Err(ServiceError::BadRequest(_))));
    assert_eq!(screen.selected_id(), Some(EntityId::Local(local)));
    assert!(companions.list(&author).unwrap().is_empty());

    assert!(screen.discard_draft(local));
    assert!(screen.is_empty());
}
