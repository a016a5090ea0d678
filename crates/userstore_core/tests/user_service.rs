use userstore_core::{
    open_db_in_memory, SqliteUserRepository, User, UserPatch, UserRepository, UserService,
};

#[test]
fn register_and_lookup() {
    let conn = open_db_in_memory().unwrap();
    let service = UserService::new(SqliteUserRepository::try_new(&conn).unwrap());

    let user = service.register("Taro", 20).unwrap();
    assert_eq!(service.lookup(user.id).unwrap(), Some(user));
    assert_eq!(service.lookup(12_345).unwrap(), None);
}

#[test]
fn first_and_last_is_none_on_empty_table() {
    let conn = open_db_in_memory().unwrap();
    let service = UserService::new(SqliteUserRepository::try_new(&conn).unwrap());

    assert_eq!(service.first_and_last().unwrap(), None);

    let users = service
        .register_many(vec![User::new("A", 1), User::new("B", 2)])
        .unwrap();
    let (first, last) = service.first_and_last().unwrap().unwrap();
    assert_eq!(first.id, users[0].id);
    assert_eq!(last.id, users[1].id);
}

#[test]
fn rename_set_active_and_patch() {
    let conn = open_db_in_memory().unwrap();
    let service = UserService::new(SqliteUserRepository::try_new(&conn).unwrap());
    let user = service.register("Taro", 20).unwrap();

    assert!(service.set_active(user.id, true).unwrap());
    assert!(service.rename(user.id, "Takashi").unwrap());
    assert!(service
        .apply_patch(user.id, &UserPatch::new().age(21))
        .unwrap());
    assert!(!service.rename(999, "nobody").unwrap());

    let loaded = service.lookup(user.id).unwrap().unwrap();
    assert_eq!(loaded.name, "Takashi");
    assert_eq!(loaded.age, 21);
    assert!(loaded.is_active);

    assert!(service.set_active(user.id, false).unwrap());
    assert!(!service.lookup(user.id).unwrap().unwrap().is_active);
}

#[test]
fn store_and_remove() {
    let conn = open_db_in_memory().unwrap();
    let service = UserService::new(SqliteUserRepository::try_new(&conn).unwrap());

    let mut user = User::new("Hanako", 25);
    assert!(service.store(&mut user).unwrap());
    user.age = 26;
    assert!(service.store(&mut user).unwrap());
    assert_eq!(service.list_active().unwrap(), vec![user.clone()]);

    assert!(service.remove(user.id).unwrap());
    assert!(!service.remove(user.id).unwrap());
    assert!(!service.store(&mut user).unwrap());
    assert!(service.list_active().unwrap().is_empty());
    assert_eq!(
        service
            .repository()
            .count(&Default::default())
            .unwrap(),
        0
    );
}

#[test]
fn user_serializes_with_snake_case_fields() {
    let conn = open_db_in_memory().unwrap();
    let service = UserService::new(SqliteUserRepository::try_new(&conn).unwrap());
    let user = service.register("Taro", 20).unwrap();

    let json = serde_json::to_value(&user).unwrap();
    assert_eq!(json["name"], "Taro");
    assert_eq!(json["age"], 20);
    assert_eq!(json["is_active"], false);
    assert!(json["deleted_at"].is_null());

    let back: User = serde_json::from_value(json).unwrap();
    assert_eq!(back, user);
}
