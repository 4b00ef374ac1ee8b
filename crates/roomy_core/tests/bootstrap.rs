use roomy_core::db::open_db_in_memory;
use roomy_core::{
    create_all_accounts_list, create_all_spaces_list, create_space_migration_reference,
    ensure_deployment_ids, BootstrapError, CoStore, CoValueKind, DeploymentIds, DeploymentTarget,
    Principal, Role, SqliteCoStore,
};
use std::collections::HashSet;

#[test]
fn each_bootstrap_call_creates_a_fresh_value() {
    let conn = open_db_in_memory().expect("open db");
    let store = SqliteCoStore::try_new(&conn).expect("store");

    let ids = [
        create_all_spaces_list(&store).expect("spaces"),
        create_all_spaces_list(&store).expect("spaces again"),
        create_all_accounts_list(&store).expect("accounts"),
        create_space_migration_reference(&store).expect("reference"),
    ];
    let unique: HashSet<_> = ids.iter().collect();
    assert_eq!(unique.len(), ids.len());
}

#[test]
fn global_lists_start_empty_and_accept_public_writes() {
    let conn = open_db_in_memory().expect("open db");
    let store = SqliteCoStore::try_new(&conn).expect("store");

    for list in [
        create_all_spaces_list(&store).expect("spaces"),
        create_all_accounts_list(&store).expect("accounts"),
    ] {
        assert_eq!(
            store.value_kind(&list).expect("kind"),
            Some(CoValueKind::IdList)
        );
        assert!(store.list_items(&list).expect("items").is_empty());

        let group = store
            .value_owner(&list)
            .expect("owner")
            .expect("list has owner");
        let members = store.group_members(&group).expect("members");
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].principal, Principal::Everyone);
        assert_eq!(members[0].role, Role::WriteOnly);
    }
}

#[test]
fn migration_reference_is_writable_record() {
    let conn = open_db_in_memory().expect("open db");
    let store = SqliteCoStore::try_new(&conn).expect("store");

    let record = create_space_migration_reference(&store).expect("reference");
    assert_eq!(
        store.value_kind(&record).expect("kind"),
        Some(CoValueKind::StringRecord)
    );
    assert!(store.record_entries(&record).expect("entries").is_empty());

    let group = store
        .value_owner(&record)
        .expect("owner")
        .expect("record has owner");
    let members = store.group_members(&group).expect("members");
    assert!(members
        .iter()
        .any(|member| member.principal == Principal::Everyone && member.role == Role::Writer));
}

#[test]
fn ensure_creates_missing_ids_then_reuses_them() {
    let dir = tempfile::tempdir().expect("tempdir");
    let ids_path = dir.path().join("ids.json");
    let conn = open_db_in_memory().expect("open db");
    let store = SqliteCoStore::try_new(&conn).expect("store");

    let mut ids = DeploymentIds::load(&ids_path).expect("load missing file");
    let first = ensure_deployment_ids(&store, &mut ids).expect("first ensure");
    assert_eq!(first.created.len(), DeploymentTarget::ALL.len());
    assert!(first.reused.is_empty());
    assert!(ids.is_complete());
    ids.save(&ids_path).expect("save ids");

    let mut reloaded = DeploymentIds::load(&ids_path).expect("reload");
    assert_eq!(reloaded, ids);
    let second = ensure_deployment_ids(&store, &mut reloaded).expect("second ensure");
    assert!(second.created.is_empty());
    assert_eq!(second.reused, first.created);
    assert_eq!(reloaded, ids);
}

#[test]
fn ensure_only_fills_gaps() {
    let conn = open_db_in_memory().expect("open db");
    let store = SqliteCoStore::try_new(&conn).expect("store");

    let spaces = create_all_spaces_list(&store).expect("spaces");
    let mut ids = DeploymentIds::default();
    ids.set(DeploymentTarget::AllSpacesList, spaces.clone());

    let report = ensure_deployment_ids(&store, &mut ids).expect("ensure");
    assert_eq!(report.reused, vec![(DeploymentTarget::AllSpacesList, spaces.clone())]);
    let created: Vec<_> = report.created.iter().map(|(target, _)| *target).collect();
    assert_eq!(
        created,
        vec![
            DeploymentTarget::AllAccountsList,
            DeploymentTarget::SpaceMigrationReference
        ]
    );
    assert_eq!(ids.get(DeploymentTarget::AllSpacesList), Some(&spaces));
}

#[test]
fn ensure_rejects_ids_unknown_to_the_store() {
    let conn = open_db_in_memory().expect("open db");
    let store = SqliteCoStore::try_new(&conn).expect("store");

    let mut ids = DeploymentIds::default();
    ids.set(
        DeploymentTarget::AllAccountsList,
        roomy_core::CoId::generate(),
    );

    let err = ensure_deployment_ids(&store, &mut ids).expect_err("dangling id");
    assert!(matches!(
        err,
        BootstrapError::ConfiguredIdMissing {
            target: DeploymentTarget::AllAccountsList,
            ..
        }
    ));
}

#[test]
fn ensure_rejects_ids_of_the_wrong_kind() {
    let conn = open_db_in_memory().expect("open db");
    let store = SqliteCoStore::try_new(&conn).expect("store");

    let record = create_space_migration_reference(&store).expect("reference");
    let mut ids = DeploymentIds::default();
    ids.set(DeploymentTarget::AllSpacesList, record);

    match ensure_deployment_ids(&store, &mut ids) {
        Err(BootstrapError::ConfiguredIdKindMismatch { target, actual, .. }) => {
            assert_eq!(target, DeploymentTarget::AllSpacesList);
            assert_eq!(actual, CoValueKind::StringRecord);
        }
        Err(other) => panic!("unexpected error: {other}"),
        Ok(report) => panic!("mismatched id should be rejected: {report:?}"),
    }
}

#[test]
fn failed_ensure_creates_nothing() {
    let conn = open_db_in_memory().expect("open db");
    let store = SqliteCoStore::try_new(&conn).expect("store");

    let mut ids = DeploymentIds::default();
    ids.set(
        DeploymentTarget::SpaceMigrationReference,
        roomy_core::CoId::generate(),
    );
    let configured = ids.clone();

    for _ in 0..2 {
        ensure_deployment_ids(&store, &mut ids).expect_err("unknown reference id");
        assert_eq!(ids, configured);
    }

    let id_lists: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM co_values WHERE kind = 'id_list';",
            [],
            |row| row.get(0),
        )
        .expect("count id lists");
    assert_eq!(id_lists, 0);
}
