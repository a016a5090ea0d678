use rusqlite::Connection;
use userstore_core::{
    open_db_in_memory, RepoError, SqliteUserRepository, User, UserField, UserFilter, UserPatch,
    UserQuery, UserRepository,
};

const OLD_TIMESTAMP: i64 = 1_000;

fn setup() -> Connection {
    open_db_in_memory().unwrap()
}

fn insert(repo: &SqliteUserRepository<'_>, name: &str, age: i64, is_active: bool) -> User {
    let mut user = User::new(name, age).active(is_active);
    repo.create(&mut user).unwrap();
    user
}

/// Pushes every timestamp into the past so refreshes are observable.
fn age_timestamps(conn: &Connection) {
    conn.execute(
        "UPDATE users SET created_at = ?1, updated_at = ?1;",
        [OLD_TIMESTAMP],
    )
    .unwrap();
}

#[test]
fn save_without_identity_inserts_new_row() {
    let conn = setup();
    let repo = SqliteUserRepository::try_new(&conn).unwrap();
    insert(&repo, "existing", 10, false);

    let mut user = User::new("new", 22);
    assert_eq!(repo.save(&mut user).unwrap(), 1);
    assert!(user.has_identity());
    assert_eq!(repo.find_all().unwrap().len(), 2);
    assert_eq!(repo.find_by_id(user.id).unwrap(), user);
}

#[test]
fn save_with_identity_rewrites_all_columns() {
    let conn = setup();
    let repo = SqliteUserRepository::try_new(&conn).unwrap();
    let mut user = insert(&repo, "Taro", 20, true);
    insert(&repo, "other", 99, true);
    age_timestamps(&conn);

    user.name = "Jiro".to_string();
    user.age = 0;
    user.is_active = false;
    assert_eq!(repo.save(&mut user).unwrap(), 1);

    assert_eq!(repo.find_all().unwrap().len(), 2);
    let loaded = repo.find_by_id(user.id).unwrap();
    assert_eq!(loaded.name, "Jiro");
    assert_eq!(loaded.age, 0);
    assert!(!loaded.is_active);
    assert_eq!(loaded.created_at, OLD_TIMESTAMP);
    assert!(loaded.updated_at > OLD_TIMESTAMP);
    assert_eq!(loaded.updated_at, user.updated_at);
}

#[test]
fn save_on_deleted_row_affects_nothing() {
    let conn = setup();
    let repo = SqliteUserRepository::try_new(&conn).unwrap();
    let mut user = insert(&repo, "gone", 1, false);
    repo.soft_delete(&UserFilter::by_id(user.id)).unwrap();
    let before = user.updated_at;

    user.name = "revived".to_string();
    assert_eq!(repo.save(&mut user).unwrap(), 0);
    assert_eq!(user.updated_at, before);

    let stored = repo
        .find_one(&UserQuery::new(UserFilter::by_id(user.id)).including_deleted())
        .unwrap();
    assert_eq!(stored.name, "gone");
}

#[test]
fn update_field_changes_only_that_column() {
    let conn = setup();
    let repo = SqliteUserRepository::try_new(&conn).unwrap();
    let target = insert(&repo, "Taro", 20, true);
    let bystander = insert(&repo, "Hanako", 25, true);
    age_timestamps(&conn);

    let changed = repo
        .update_field(&UserFilter::by_id(target.id), UserField::Name("X".to_string()))
        .unwrap();
    assert_eq!(changed, 1);

    let loaded = repo.find_by_id(target.id).unwrap();
    assert_eq!(loaded.name, "X");
    assert_eq!(loaded.age, 20);
    assert!(loaded.is_active);
    assert_eq!(loaded.created_at, OLD_TIMESTAMP);
    assert!(loaded.updated_at > OLD_TIMESTAMP);

    let untouched = repo.find_by_id(bystander.id).unwrap();
    assert_eq!(untouched.name, "Hanako");
    assert_eq!(untouched.updated_at, OLD_TIMESTAMP);
}

#[test]
fn update_field_by_condition_touches_every_match() {
    let conn = setup();
    let repo = SqliteUserRepository::try_new(&conn).unwrap();
    insert(&repo, "a", 1, true);
    insert(&repo, "b", 2, true);
    let inactive = insert(&repo, "c", 3, false);

    let changed = repo
        .update_field(
            &UserFilter::default().with_active(true),
            UserField::Name("hello".to_string()),
        )
        .unwrap();
    assert_eq!(changed, 2);
    assert_eq!(repo.find_by_id(inactive.id).unwrap().name, "c");
}

#[test]
fn update_skips_soft_deleted_rows() {
    let conn = setup();
    let repo = SqliteUserRepository::try_new(&conn).unwrap();
    let user = insert(&repo, "deleted", 5, false);
    repo.soft_delete(&UserFilter::by_id(user.id)).unwrap();

    let changed = repo
        .update_field(&UserFilter::by_id(user.id), UserField::Age(6))
        .unwrap();
    assert_eq!(changed, 0);
}

#[test]
fn update_partial_applies_explicit_zero_values() {
    let conn = setup();
    let repo = SqliteUserRepository::try_new(&conn).unwrap();
    let user = insert(&repo, "Taro", 20, true);
    age_timestamps(&conn);

    let patch = UserPatch::new().age(0).is_active(false);
    assert_eq!(
        repo.update_partial(&UserFilter::by_id(user.id), &patch)
            .unwrap(),
        1
    );

    let loaded = repo.find_by_id(user.id).unwrap();
    assert_eq!(loaded.name, "Taro");
    assert_eq!(loaded.age, 0);
    assert!(!loaded.is_active);
    assert_eq!(loaded.created_at, OLD_TIMESTAMP);
    assert!(loaded.updated_at > OLD_TIMESTAMP);
}

#[test]
fn non_zero_patch_leaves_zero_valued_fields_alone() {
    let conn = setup();
    let repo = SqliteUserRepository::try_new(&conn).unwrap();
    let user = insert(&repo, "Taro", 20, true);

    let mut draft = User::new("Taro", 0);
    draft.is_active = false;
    let patch = UserPatch::non_zero_fields_of(&draft);
    assert_eq!(patch, UserPatch::new().name("Taro"));

    repo.update_partial(&UserFilter::by_id(user.id), &patch)
        .unwrap();
    let loaded = repo.find_by_id(user.id).unwrap();
    assert_eq!(loaded.age, 20);
    assert!(loaded.is_active);
}

#[test]
fn empty_patch_is_rejected() {
    let conn = setup();
    let repo = SqliteUserRepository::try_new(&conn).unwrap();
    let user = insert(&repo, "Taro", 20, true);

    let err = repo
        .update_partial(&UserFilter::by_id(user.id), &UserPatch::new())
        .unwrap_err();
    assert!(matches!(err, RepoError::Validation(_)));
}

#[test]
fn global_updates_require_explicit_all_filter() {
    let conn = setup();
    let repo = SqliteUserRepository::try_new(&conn).unwrap();
    insert(&repo, "a", 1, false);
    insert(&repo, "b", 2, false);

    let patch = UserPatch::new().name("Taro");
    let err = repo
        .update_partial(&UserFilter::default(), &patch)
        .unwrap_err();
    assert!(matches!(err, RepoError::MissingFilter));

    let err = repo
        .update_field(&UserFilter::default(), UserField::Age(1))
        .unwrap_err();
    assert!(matches!(err, RepoError::MissingFilter));

    assert_eq!(repo.update_partial(&UserFilter::all(), &patch).unwrap(), 2);
    assert!(repo
        .find_all()
        .unwrap()
        .iter()
        .all(|user| user.name == "Taro"));
}
