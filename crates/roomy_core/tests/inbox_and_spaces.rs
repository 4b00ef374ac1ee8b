use roomy_core::db::{open_db, open_db_in_memory};
use roomy_core::{
    AccountService, AccountServiceError, CoId, CoStore, InboxItem, InboxItemType, ProfileUpdate,
    SqliteCoStore, StoreError, ValidationError,
};
use rusqlite::Connection;

fn service(conn: &Connection) -> AccountService<SqliteCoStore<'_>> {
    AccountService::new(SqliteCoStore::try_new(conn).expect("store"))
}

#[test]
fn join_space_keeps_order_and_ignores_duplicates() {
    let conn = open_db_in_memory().expect("open db");
    let service = service(&conn);
    let account = service.create_account(None).expect("create account");

    let first = CoId::generate();
    let second = CoId::generate();
    assert!(service.join_space(&account.id, &first).expect("join first"));
    assert!(service.join_space(&account.id, &second).expect("join second"));
    assert!(!service.join_space(&account.id, &first).expect("join again"));

    assert_eq!(
        service.joined_spaces(&account.id).expect("joined"),
        vec![first.clone(), second.clone()]
    );

    assert!(service.leave_space(&account.id, &first).expect("leave"));
    assert!(!service.leave_space(&account.id, &first).expect("leave again"));
    assert_eq!(
        service.joined_spaces(&account.id).expect("joined"),
        vec![second]
    );
}

#[test]
fn join_space_from_two_connections_records_space_once() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("roomy.sqlite3");
    let first_conn = open_db(&path).expect("first connection");
    let second_conn = open_db(&path).expect("second connection");
    let first = service(&first_conn);
    let second = service(&second_conn);

    let account = first.create_account(None).expect("create account");
    let space = CoId::generate();

    assert!(first.join_space(&account.id, &space).expect("first join"));
    assert!(!second.join_space(&account.id, &space).expect("second join"));
    assert_eq!(
        second.joined_spaces(&account.id).expect("joined"),
        vec![space]
    );
}

#[test]
fn inbox_items_arrive_unread_and_can_be_marked() {
    let conn = open_db_in_memory().expect("open db");
    let service = service(&conn);
    let account = service.create_account(None).expect("create account");

    let reply = InboxItem::new("space-1", "msg-1", InboxItemType::Reply);
    let mention =
        InboxItem::new("space-2", "msg-2", InboxItemType::Mention).with_object_id("thread-9");
    let reply_id = service
        .push_inbox_item(&account.id, &reply)
        .expect("push reply");
    let mention_id = service
        .push_inbox_item(&account.id, &mention)
        .expect("push mention");

    let items = service.list_inbox(&account.id).expect("list inbox");
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].id, reply_id);
    assert_eq!(items[0].item, reply);
    assert_eq!(items[1].id, mention_id);
    assert_eq!(items[1].item.object_id.as_deref(), Some("thread-9"));
    assert_eq!(service.unread_count(&account.id).expect("unread"), 2);

    service
        .mark_inbox_item_read(&account.id, &reply_id, true)
        .expect("mark read");
    assert_eq!(service.unread_count(&account.id).expect("unread"), 1);
    let items = service.list_inbox(&account.id).expect("list inbox");
    assert_eq!(items[0].item.read, Some(true));

    service
        .mark_inbox_item_read(&account.id, &reply_id, false)
        .expect("mark unread");
    assert_eq!(service.unread_count(&account.id).expect("unread"), 2);
}

#[test]
fn inbox_item_owner_matches_inbox_group() {
    let conn = open_db_in_memory().expect("open db");
    let service = service(&conn);
    let account = service.create_account(None).expect("create account");

    let item_id = service
        .push_inbox_item(
            &account.id,
            &InboxItem::new("space-1", "msg-1", InboxItemType::Mention),
        )
        .expect("push");

    let store = service.store();
    assert_eq!(
        store.value_owner(&item_id).expect("item owner"),
        store
            .value_owner(&account.profile.roomy_inbox)
            .expect("inbox owner")
    );
}

#[test]
fn marking_item_from_another_inbox_fails() {
    let conn = open_db_in_memory().expect("open db");
    let service = service(&conn);
    let alice = service.create_account(None).expect("alice");
    let bob = service.create_account(None).expect("bob");

    let bobs_item = service
        .push_inbox_item(
            &bob.id,
            &InboxItem::new("space-1", "msg-1", InboxItemType::Reply),
        )
        .expect("push");

    let err = service
        .mark_inbox_item_read(&alice.id, &bobs_item, true)
        .expect_err("foreign item");
    assert!(matches!(err, AccountServiceError::InboxItemNotFound(id) if id == bobs_item));
}

#[test]
fn inbox_item_requires_space_and_message() {
    let conn = open_db_in_memory().expect("open db");
    let service = service(&conn);
    let account = service.create_account(None).expect("create account");

    let err = service
        .push_inbox_item(
            &account.id,
            &InboxItem::new("", "msg-1", InboxItemType::Reply),
        )
        .expect_err("blank space id");
    assert!(matches!(
        err,
        AccountServiceError::Store(StoreError::Validation(ValidationError::BlankField(_)))
    ));
    assert!(service.list_inbox(&account.id).expect("list").is_empty());
}

#[test]
fn last_read_is_per_key_and_overwritable() {
    let conn = open_db_in_memory().expect("open db");
    let service = service(&conn);
    let account = service.create_account(None).expect("create account");

    assert_eq!(
        service.last_read(&account.id, "room-1").expect("read"),
        None
    );
    service
        .set_last_read(&account.id, "room-1", 1_700_000_000_000)
        .expect("set");
    service
        .set_last_read(&account.id, "room-2", 1_700_000_000_500)
        .expect("set");
    service
        .set_last_read(&account.id, "room-1", 1_700_000_001_000)
        .expect("overwrite");

    assert_eq!(
        service.last_read(&account.id, "room-1").expect("read"),
        Some(1_700_000_001_000)
    );
    let entries = service.last_read_entries(&account.id).expect("entries");
    assert_eq!(entries.len(), 2);
    assert_eq!(entries.get("room-2"), Some(&1_700_000_000_500));
}

#[test]
fn profile_update_changes_only_named_fields() {
    let conn = open_db_in_memory().expect("open db");
    let service = service(&conn);
    let account = service.create_account(None).expect("create account");

    let update = ProfileUpdate {
        name: Some("Dana".to_string()),
        description: Some(Some("hello".to_string())),
        ..ProfileUpdate::default()
    };
    let updated = service
        .update_profile(&account.id, &update)
        .expect("update profile");
    assert_eq!(updated.name, "Dana");
    assert_eq!(updated.description.as_deref(), Some("hello"));
    assert_eq!(updated.joined_spaces, account.profile.joined_spaces);

    let clear = ProfileUpdate {
        description: Some(None),
        ..ProfileUpdate::default()
    };
    service
        .update_profile(&account.id, &clear)
        .expect("clear description");

    let reloaded = service.load_account(&account.id, None).expect("reload");
    assert_eq!(reloaded.profile.name, "Dana");
    assert_eq!(reloaded.profile.description, None);
}

#[test]
fn profile_update_rejects_blank_name() {
    let conn = open_db_in_memory().expect("open db");
    let service = service(&conn);
    let account = service.create_account(None).expect("create account");

    let update = ProfileUpdate {
        name: Some(" ".to_string()),
        ..ProfileUpdate::default()
    };
    let err = service
        .update_profile(&account.id, &update)
        .expect_err("blank name");
    assert!(matches!(
        err,
        AccountServiceError::Store(StoreError::Validation(_))
    ));
    let reloaded = service.load_account(&account.id, None).expect("reload");
    assert_eq!(reloaded.profile.name, "Anonymous");
}
