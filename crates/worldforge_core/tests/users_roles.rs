use worldforge_core::db::open_db_in_memory;
use worldforge_core::{
    Principal, RepoError, Role, ServiceError, SqliteUserRepository, UserRepository, UserService,
};

#[test]
fn resolve_principal_requires_a_known_user() {
    let conn = open_db_in_memory().unwrap();
    let users = UserService::new(SqliteUserRepository::try_new(&conn).unwrap());
    users.register("alice", Role::WorldBuilder).unwrap();

    let resolved = users.resolve_principal(Some(" alice ")).unwrap();
    assert_eq!(resolved, Principal::new("alice", Role::WorldBuilder));

    for missing in [None, Some(""), Some("   "), Some("mallory")] {
        assert!(matches!(
            users.resolve_principal(missing),
            Err(ServiceError::Unauthenticated)
        ));
    }
}

#[test]
fn only_admins_change_roles() {
    let conn = open_db_in_memory().unwrap();
    let users = UserService::new(SqliteUserRepository::try_new(&conn).unwrap());
    let admin = users.register("root", Role::Admin).unwrap();
    let privileged = users.register("bob", Role::Privileged).unwrap();
    users.register("alice", Role::Free).unwrap();

    assert!(matches!(
        users.set_role(&privileged, "alice", Role::Admin),
        Err(ServiceError::Forbidden(_))
    ));

    let promoted = users.set_role(&admin, "alice", Role::WorldDeveloper).unwrap();
    assert_eq!(promoted.role, Role::WorldDeveloper);
    assert_eq!(
        users.resolve_principal(Some("alice")).unwrap().role,
        Role::WorldDeveloper
    );

    assert!(matches!(
        users.set_role(&admin, "ghost", Role::Free),
        Err(ServiceError::NotFound(_))
    ));
}

#[test]
fn operator_assignment_and_listing() {
    let conn = open_db_in_memory().unwrap();
    let users = UserService::new(SqliteUserRepository::try_new(&conn).unwrap());
    let admin = users.register("root", Role::Admin).unwrap();
    let alice = users.register("alice", Role::Free).unwrap();

    users.assign_role("alice", Role::UniverseCreator).unwrap();

    let listed = users.list(&admin).unwrap();
    let ids: Vec<&str> = listed.iter().map(|user| user.id.as_str()).collect();
    assert_eq!(ids, vec!["alice", "root"]);
    assert_eq!(listed[0].role, Role::UniverseCreator);
    assert!(matches!(users.list(&alice), Err(ServiceError::Forbidden(_))));
}

#[test]
fn repository_rejects_blank_and_duplicate_ids() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteUserRepository::try_new(&conn).unwrap();

    assert!(matches!(
        repo.create_user("  ", Role::Free),
        Err(RepoError::Validation(_))
    ));
    repo.create_user("alice", Role::Free).unwrap();
    assert!(matches!(
        repo.create_user("alice", Role::Admin),
        Err(RepoError::Db(_))
    ));
}
