//! Shared constructors for public groups and per-profile lists.

use crate::model::covalue::{CoId, CoValueKind};
use crate::model::group::{Principal, Role};
use crate::repo::co_store::{CoStore, StoreResult};

/// Creates a group granting `role` to everyone.
pub fn public_group<S: CoStore>(store: &S, role: Role) -> StoreResult<CoId> {
    let group = store.create_group()?;
    store.add_member(&group, &Principal::Everyone, role)?;
    Ok(group)
}

/// Creates an empty, publicly readable joined-spaces list.
pub fn create_space_list<S: CoStore>(store: &S) -> StoreResult<CoId> {
    let group = public_group(store, Role::Reader)?;
    store.create_list(CoValueKind::SpaceList, &group, &[])
}

/// Creates an empty inbox everyone may append to but not read.
pub fn create_inbox<S: CoStore>(store: &S) -> StoreResult<CoId> {
    let group = public_group(store, Role::WriteOnly)?;
    store.create_list(CoValueKind::InboxList, &group, &[])
}

/// Creates an empty, publicly readable entity list.
pub fn create_entity_list<S: CoStore>(store: &S) -> StoreResult<CoId> {
    let group = public_group(store, Role::Reader)?;
    store.create_list(CoValueKind::EntityList, &group, &[])
}

#[cfg(test)]
mod tests {
    use super::{create_inbox, create_space_list, public_group};
    use crate::db::open_db_in_memory;
    use crate::model::covalue::CoValueKind;
    use crate::model::group::{GroupMember, Principal, Role};
    use crate::repo::co_store::CoStore;
    use crate::repo::sqlite_store::SqliteCoStore;

    #[test]
    fn public_group_grants_role_to_everyone() {
        let conn = open_db_in_memory().expect("open db");
        let store = SqliteCoStore::try_new(&conn).expect("store");

        let group = public_group(&store, Role::Writer).expect("group");
        assert_eq!(
            store.group_members(&group).expect("members"),
            vec![GroupMember {
                principal: Principal::Everyone,
                role: Role::Writer,
            }]
        );
    }

    #[test]
    fn each_helper_call_returns_a_fresh_empty_list() {
        let conn = open_db_in_memory().expect("open db");
        let store = SqliteCoStore::try_new(&conn).expect("store");

        let first = create_space_list(&store).expect("first list");
        let second = create_space_list(&store).expect("second list");
        assert_ne!(first, second);
        assert_eq!(
            store.value_kind(&first).expect("kind"),
            Some(CoValueKind::SpaceList)
        );
        assert!(store.list_items(&first).expect("items").is_empty());

        let inbox = create_inbox(&store).expect("inbox");
        let owner = store
            .value_owner(&inbox)
            .expect("owner lookup")
            .expect("inbox has owner");
        let members = store.group_members(&owner).expect("members");
        assert_eq!(members[0].role, Role::WriteOnly);
    }
}
