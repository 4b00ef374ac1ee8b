//! SQLite-backed single-replica collaborative store.
//!
//! # Responsibility
//! - Persist groups, role grants and collaborative values in local SQLite.
//! - Keep SQL details inside the store boundary.
//!
//! # Invariants
//! - The connection must be fully migrated before a store is constructed.
//! - List order is `position ASC`; positions only grow.
//! - Account root/profile columns are written only while still `NULL`.
//! - Role grants are recorded, not enforced.

use crate::db::migrations::{current_user_version, latest_version};
use crate::model::account::{ProfileDraft, RoomyAccount, RoomyProfile, RoomyRoot};
use crate::model::covalue::{CoId, CoValueKind};
use crate::model::group::{GroupMember, Principal, Role};
use crate::model::inbox::{InboxItem, InboxItemType};
use crate::model::validation::{require_non_blank, ValidationError};
use crate::repo::co_store::{CoStore, StoreError, StoreResult};
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};
use std::collections::BTreeMap;

const REQUIRED_TABLES: &[&str] = &[
    "co_groups",
    "co_group_members",
    "co_values",
    "co_list_items",
    "co_record_entries",
    "last_read_entries",
    "inbox_items",
    "profiles",
    "roots",
    "accounts",
];

const PROFILE_SELECT_SQL: &str = "SELECT
    p.id,
    v.owner_group,
    p.name,
    p.image_url,
    p.bluesky_handle,
    p.banner_url,
    p.description,
    p.joined_date,
    p.joined_spaces,
    p.roomy_inbox,
    p.new_joined_spaces_test
FROM profiles p
JOIN co_values v ON v.id = p.id";

/// Collaborative store over one borrowed SQLite connection.
pub struct SqliteCoStore<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteCoStore<'conn> {
    /// Wraps a migrated connection.
    ///
    /// # Errors
    /// - `UninitializedConnection` when migrations were not applied.
    /// - `MissingRequiredTable` when the schema is incomplete.
    pub fn try_new(conn: &'conn Connection) -> StoreResult<Self> {
        ensure_store_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl CoStore for SqliteCoStore<'_> {
    fn transaction<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&Self) -> Result<T, E>,
        E: From<StoreError>,
    {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)
            .map_err(StoreError::from)?;
        let value = f(self)?;
        tx.commit().map_err(StoreError::from)?;
        Ok(value)
    }

    fn create_group(&self) -> StoreResult<CoId> {
        let id = CoId::generate();
        self.conn
            .execute("INSERT INTO co_groups (id) VALUES (?1);", [id.as_str()])?;
        Ok(id)
    }

    fn add_member(&self, group: &CoId, principal: &Principal, role: Role) -> StoreResult<()> {
        ensure_group_exists(self.conn, group)?;
        self.conn.execute(
            "INSERT INTO co_group_members (group_id, principal, role)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(group_id, principal) DO UPDATE SET role = excluded.role;",
            params![group.as_str(), principal.to_storage(), role.as_str()],
        )?;
        Ok(())
    }

    fn group_members(&self, group: &CoId) -> StoreResult<Vec<GroupMember>> {
        ensure_group_exists(self.conn, group)?;
        let mut stmt = self.conn.prepare(
            "SELECT principal, role
             FROM co_group_members
             WHERE group_id = ?1
             ORDER BY principal ASC;",
        )?;
        let mut rows = stmt.query([group.as_str()])?;
        let mut members = Vec::new();
        while let Some(row) = rows.next()? {
            let principal_text: String = row.get(0)?;
            let role_text: String = row.get(1)?;
            let principal = Principal::parse(&principal_text).map_err(|_| {
                StoreError::InvalidData(format!(
                    "invalid principal `{principal_text}` in co_group_members.principal"
                ))
            })?;
            let role = Role::parse(&role_text).map_err(|_| {
                StoreError::InvalidData(format!(
                    "invalid role `{role_text}` in co_group_members.role"
                ))
            })?;
            members.push(GroupMember { principal, role });
        }
        Ok(members)
    }

    fn value_kind(&self, id: &CoId) -> StoreResult<Option<CoValueKind>> {
        load_kind(self.conn, id)
    }

    fn value_owner(&self, id: &CoId) -> StoreResult<Option<CoId>> {
        let owner = self
            .conn
            .query_row(
                "SELECT owner_group FROM co_values WHERE id = ?1;",
                [id.as_str()],
                |row| row.get::<_, Option<String>>(0),
            )
            .optional()?
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;
        owner
            .map(|text| parse_id_column(&text, "co_values.owner_group"))
            .transpose()
    }

    fn create_list(&self, kind: CoValueKind, owner: &CoId, items: &[CoId]) -> StoreResult<CoId> {
        if !kind.is_list() {
            return Err(StoreError::UnsupportedKind(kind));
        }
        let id = insert_value(self.conn, kind, Some(owner))?;
        for (position, item) in items.iter().enumerate() {
            self.conn.execute(
                "INSERT INTO co_list_items (list_id, position, item) VALUES (?1, ?2, ?3);",
                params![id.as_str(), position as i64, item.as_str()],
            )?;
        }
        Ok(id)
    }

    fn list_items(&self, list: &CoId) -> StoreResult<Vec<CoId>> {
        require_kind(self.conn, list, "list", CoValueKind::is_list)?;
        let mut stmt = self.conn.prepare(
            "SELECT item
             FROM co_list_items
             WHERE list_id = ?1
             ORDER BY position ASC;",
        )?;
        let mut rows = stmt.query([list.as_str()])?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            let text: String = row.get(0)?;
            items.push(parse_id_column(&text, "co_list_items.item")?);
        }
        Ok(items)
    }

    fn push_list_item(&self, list: &CoId, item: &CoId) -> StoreResult<()> {
        require_kind(self.conn, list, "list", CoValueKind::is_list)?;
        self.conn.execute(
            "INSERT INTO co_list_items (list_id, position, item)
             VALUES (
                ?1,
                (SELECT COALESCE(MAX(position) + 1, 0) FROM co_list_items WHERE list_id = ?1),
                ?2
             );",
            params![list.as_str(), item.as_str()],
        )?;
        touch_value(self.conn, list)
    }

    fn remove_list_item(&self, list: &CoId, item: &CoId) -> StoreResult<bool> {
        require_kind(self.conn, list, "list", CoValueKind::is_list)?;
        let changed = self.conn.execute(
            "DELETE FROM co_list_items
             WHERE list_id = ?1
               AND position = (
                 SELECT MIN(position) FROM co_list_items WHERE list_id = ?1 AND item = ?2
               );",
            params![list.as_str(), item.as_str()],
        )?;
        if changed > 0 {
            touch_value(self.conn, list)?;
        }
        Ok(changed > 0)
    }

    fn create_record(&self, owner: &CoId) -> StoreResult<CoId> {
        insert_value(self.conn, CoValueKind::StringRecord, Some(owner))
    }

    fn record_get(&self, record: &CoId, key: &str) -> StoreResult<Option<String>> {
        require_exact_kind(self.conn, record, CoValueKind::StringRecord)?;
        let value = self
            .conn
            .query_row(
                "SELECT value FROM co_record_entries WHERE record_id = ?1 AND entry_key = ?2;",
                params![record.as_str(), key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    fn record_set(&self, record: &CoId, key: &str, value: &str) -> StoreResult<()> {
        require_non_blank("record key", key)?;
        require_exact_kind(self.conn, record, CoValueKind::StringRecord)?;
        self.conn.execute(
            "INSERT INTO co_record_entries (record_id, entry_key, value)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(record_id, entry_key) DO UPDATE SET value = excluded.value;",
            params![record.as_str(), key, value],
        )?;
        touch_value(self.conn, record)
    }

    fn record_entries(&self, record: &CoId) -> StoreResult<BTreeMap<String, String>> {
        require_exact_kind(self.conn, record, CoValueKind::StringRecord)?;
        let mut stmt = self
            .conn
            .prepare("SELECT entry_key, value FROM co_record_entries WHERE record_id = ?1;")?;
        let entries = stmt
            .query_map([record.as_str()], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<Result<BTreeMap<String, String>, _>>()?;
        Ok(entries)
    }

    fn create_last_read_list(&self, owner: Option<&CoId>) -> StoreResult<CoId> {
        insert_value(self.conn, CoValueKind::LastReadList, owner)
    }

    fn last_read_get(&self, record: &CoId, key: &str) -> StoreResult<Option<i64>> {
        require_exact_kind(self.conn, record, CoValueKind::LastReadList)?;
        let value = self
            .conn
            .query_row(
                "SELECT read_at FROM last_read_entries WHERE record_id = ?1 AND entry_key = ?2;",
                params![record.as_str(), key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    fn last_read_set(&self, record: &CoId, key: &str, read_at: i64) -> StoreResult<()> {
        require_non_blank("last read key", key)?;
        require_exact_kind(self.conn, record, CoValueKind::LastReadList)?;
        self.conn.execute(
            "INSERT INTO last_read_entries (record_id, entry_key, read_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(record_id, entry_key) DO UPDATE SET read_at = excluded.read_at;",
            params![record.as_str(), key, read_at],
        )?;
        touch_value(self.conn, record)
    }

    fn last_read_entries(&self, record: &CoId) -> StoreResult<BTreeMap<String, i64>> {
        require_exact_kind(self.conn, record, CoValueKind::LastReadList)?;
        let mut stmt = self
            .conn
            .prepare("SELECT entry_key, read_at FROM last_read_entries WHERE record_id = ?1;")?;
        let entries = stmt
            .query_map([record.as_str()], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<Result<BTreeMap<String, i64>, _>>()?;
        Ok(entries)
    }

    fn create_inbox_item(&self, owner: &CoId, item: &InboxItem) -> StoreResult<CoId> {
        item.validate()?;
        let id = insert_value(self.conn, CoValueKind::InboxItem, Some(owner))?;
        self.conn.execute(
            "INSERT INTO inbox_items (id, space_id, object_id, message_id, read, type)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
            params![
                id.as_str(),
                item.space_id.as_str(),
                item.object_id.as_deref(),
                item.message_id.as_str(),
                item.read.map(bool_to_int),
                item.kind.as_str(),
            ],
        )?;
        Ok(id)
    }

    fn get_inbox_item(&self, id: &CoId) -> StoreResult<Option<InboxItem>> {
        let mut stmt = self.conn.prepare(
            "SELECT space_id, object_id, message_id, read, type
             FROM inbox_items
             WHERE id = ?1;",
        )?;
        let mut rows = stmt.query([id.as_str()])?;
        match rows.next()? {
            Some(row) => Ok(Some(parse_inbox_item_row(row)?)),
            None => Ok(None),
        }
    }

    fn set_inbox_item_read(&self, id: &CoId, read: bool) -> StoreResult<()> {
        let changed = self.conn.execute(
            "UPDATE inbox_items SET read = ?1 WHERE id = ?2;",
            params![bool_to_int(read), id.as_str()],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound(id.clone()));
        }
        touch_value(self.conn, id)
    }

    fn create_root(&self, last_read: &CoId) -> StoreResult<RoomyRoot> {
        require_exact_kind(self.conn, last_read, CoValueKind::LastReadList)?;
        let id = insert_value(self.conn, CoValueKind::Root, None)?;
        self.conn.execute(
            "INSERT INTO roots (id, last_read) VALUES (?1, ?2);",
            params![id.as_str(), last_read.as_str()],
        )?;
        Ok(RoomyRoot {
            id,
            last_read: last_read.clone(),
        })
    }

    fn get_root(&self, id: &CoId) -> StoreResult<Option<RoomyRoot>> {
        let last_read = self
            .conn
            .query_row(
                "SELECT last_read FROM roots WHERE id = ?1;",
                [id.as_str()],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        last_read
            .map(|text| -> StoreResult<RoomyRoot> {
                Ok(RoomyRoot {
                    id: id.clone(),
                    last_read: parse_id_column(&text, "roots.last_read")?,
                })
            })
            .transpose()
    }

    fn create_profile(&self, owner: &CoId, draft: &ProfileDraft) -> StoreResult<RoomyProfile> {
        draft.validate()?;
        require_exact_kind(self.conn, &draft.joined_spaces, CoValueKind::SpaceList)?;
        require_exact_kind(self.conn, &draft.roomy_inbox, CoValueKind::InboxList)?;
        require_exact_kind(
            self.conn,
            &draft.new_joined_spaces_test,
            CoValueKind::EntityList,
        )?;

        let id = insert_value(self.conn, CoValueKind::Profile, Some(owner))?;
        self.conn.execute(
            "INSERT INTO profiles (
                id,
                name,
                joined_spaces,
                roomy_inbox,
                new_joined_spaces_test
            ) VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                id.as_str(),
                draft.name.as_str(),
                draft.joined_spaces.as_str(),
                draft.roomy_inbox.as_str(),
                draft.new_joined_spaces_test.as_str(),
            ],
        )?;

        Ok(RoomyProfile {
            id,
            owner_group: owner.clone(),
            name: draft.name.clone(),
            image_url: None,
            bluesky_handle: None,
            banner_url: None,
            description: None,
            joined_date: None,
            joined_spaces: draft.joined_spaces.clone(),
            roomy_inbox: draft.roomy_inbox.clone(),
            new_joined_spaces_test: draft.new_joined_spaces_test.clone(),
        })
    }

    fn get_profile(&self, id: &CoId) -> StoreResult<Option<RoomyProfile>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{PROFILE_SELECT_SQL} WHERE p.id = ?1;"))?;
        let mut rows = stmt.query([id.as_str()])?;
        match rows.next()? {
            Some(row) => Ok(Some(parse_profile_row(row)?)),
            None => Ok(None),
        }
    }

    fn update_profile(&self, profile: &RoomyProfile) -> StoreResult<()> {
        require_non_blank("profile name", &profile.name)?;
        let changed = self.conn.execute(
            "UPDATE profiles
             SET
                name = ?1,
                image_url = ?2,
                bluesky_handle = ?3,
                banner_url = ?4,
                description = ?5,
                joined_date = ?6
             WHERE id = ?7;",
            params![
                profile.name.as_str(),
                profile.image_url.as_deref(),
                profile.bluesky_handle.as_deref(),
                profile.banner_url.as_deref(),
                profile.description.as_deref(),
                profile.joined_date,
                profile.id.as_str(),
            ],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound(profile.id.clone()));
        }
        touch_value(self.conn, &profile.id)
    }

    fn create_account(&self) -> StoreResult<RoomyAccount> {
        let id = insert_value(self.conn, CoValueKind::Account, None)?;
        self.conn
            .execute("INSERT INTO accounts (id) VALUES (?1);", [id.as_str()])?;
        Ok(RoomyAccount {
            id,
            profile: None,
            root: None,
        })
    }

    fn get_account(&self, id: &CoId) -> StoreResult<Option<RoomyAccount>> {
        let row = self
            .conn
            .query_row(
                "SELECT profile_id, root_id FROM accounts WHERE id = ?1;",
                [id.as_str()],
                |row| {
                    Ok((
                        row.get::<_, Option<String>>(0)?,
                        row.get::<_, Option<String>>(1)?,
                    ))
                },
            )
            .optional()?;
        let Some((profile, root)) = row else {
            return Ok(None);
        };

        Ok(Some(RoomyAccount {
            id: id.clone(),
            profile: profile
                .map(|text| parse_id_column(&text, "accounts.profile_id"))
                .transpose()?,
            root: root
                .map(|text| parse_id_column(&text, "accounts.root_id"))
                .transpose()?,
        }))
    }

    fn set_account_root(&self, account: &CoId, root: &CoId) -> StoreResult<()> {
        require_exact_kind(self.conn, root, CoValueKind::Root)?;
        let changed = self.conn.execute(
            "UPDATE accounts SET root_id = ?1 WHERE id = ?2 AND root_id IS NULL;",
            params![root.as_str(), account.as_str()],
        )?;
        finish_account_field_write(self.conn, account, "root", changed)
    }

    fn set_account_profile(&self, account: &CoId, profile: &CoId) -> StoreResult<()> {
        require_exact_kind(self.conn, profile, CoValueKind::Profile)?;
        let changed = self.conn.execute(
            "UPDATE accounts SET profile_id = ?1 WHERE id = ?2 AND profile_id IS NULL;",
            params![profile.as_str(), account.as_str()],
        )?;
        finish_account_field_write(self.conn, account, "profile", changed)
    }
}

fn finish_account_field_write(
    conn: &Connection,
    account: &CoId,
    field: &'static str,
    changed: usize,
) -> StoreResult<()> {
    if changed > 0 {
        return touch_value(conn, account);
    }
    match load_kind(conn, account)? {
        Some(CoValueKind::Account) => Err(StoreError::AccountFieldAlreadySet {
            account: account.clone(),
            field,
        }),
        Some(actual) => Err(StoreError::KindMismatch {
            id: account.clone(),
            expected: CoValueKind::Account.as_str(),
            actual,
        }),
        None => Err(StoreError::NotFound(account.clone())),
    }
}

fn insert_value(conn: &Connection, kind: CoValueKind, owner: Option<&CoId>) -> StoreResult<CoId> {
    if let Some(owner) = owner {
        ensure_group_exists(conn, owner)?;
    }
    let id = CoId::generate();
    conn.execute(
        "INSERT INTO co_values (id, kind, owner_group) VALUES (?1, ?2, ?3);",
        params![id.as_str(), kind.as_str(), owner.map(CoId::as_str)],
    )?;
    Ok(id)
}

fn touch_value(conn: &Connection, id: &CoId) -> StoreResult<()> {
    conn.execute(
        "UPDATE co_values
         SET updated_at = (strftime('%s', 'now') * 1000)
         WHERE id = ?1;",
        [id.as_str()],
    )?;
    Ok(())
}

fn ensure_group_exists(conn: &Connection, group: &CoId) -> StoreResult<()> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM co_groups WHERE id = ?1);",
        [group.as_str()],
        |row| row.get(0),
    )?;
    if exists != 1 {
        return Err(StoreError::NotFound(group.clone()));
    }
    Ok(())
}

fn load_kind(conn: &Connection, id: &CoId) -> StoreResult<Option<CoValueKind>> {
    let kind = conn
        .query_row(
            "SELECT kind FROM co_values WHERE id = ?1;",
            [id.as_str()],
            |row| row.get::<_, String>(0),
        )
        .optional()?;
    kind.map(|text| {
        CoValueKind::parse(&text).ok_or_else(|| {
            StoreError::InvalidData(format!("invalid kind `{text}` in co_values.kind"))
        })
    })
    .transpose()
}

fn require_kind(
    conn: &Connection,
    id: &CoId,
    expected: &'static str,
    accepts: impl Fn(CoValueKind) -> bool,
) -> StoreResult<CoValueKind> {
    let actual = load_kind(conn, id)?.ok_or_else(|| StoreError::NotFound(id.clone()))?;
    if !accepts(actual) {
        return Err(StoreError::KindMismatch {
            id: id.clone(),
            expected,
            actual,
        });
    }
    Ok(actual)
}

fn require_exact_kind(conn: &Connection, id: &CoId, expected: CoValueKind) -> StoreResult<()> {
    require_kind(conn, id, expected.as_str(), |actual| actual == expected)?;
    Ok(())
}

fn parse_id_column(text: &str, column: &str) -> StoreResult<CoId> {
    CoId::parse(text)
        .map_err(|_| StoreError::InvalidData(format!("invalid id `{text}` in {column}")))
}

fn parse_inbox_item_row(row: &Row<'_>) -> StoreResult<InboxItem> {
    let type_text: String = row.get("type")?;
    let kind = InboxItemType::parse(&type_text).map_err(|_| {
        StoreError::InvalidData(format!("invalid inbox item type `{type_text}` in inbox_items.type"))
    })?;

    let read = match row.get::<_, Option<i64>>("read")? {
        None => None,
        Some(0) => Some(false),
        Some(1) => Some(true),
        Some(other) => {
            return Err(StoreError::InvalidData(format!(
                "invalid read value `{other}` in inbox_items.read"
            )));
        }
    };

    let item = InboxItem {
        space_id: row.get("space_id")?,
        object_id: row.get("object_id")?,
        message_id: row.get("message_id")?,
        read,
        kind,
    };
    item.validate().map_err(|err: ValidationError| {
        StoreError::InvalidData(format!("persisted inbox item failed validation: {err}"))
    })?;
    Ok(item)
}

fn parse_profile_row(row: &Row<'_>) -> StoreResult<RoomyProfile> {
    let id_text: String = row.get("id")?;
    let owner_text: Option<String> = row.get("owner_group")?;
    let owner_text = owner_text.ok_or_else(|| {
        StoreError::InvalidData(format!("profile `{id_text}` has no owner group"))
    })?;
    let joined_spaces: String = row.get("joined_spaces")?;
    let roomy_inbox: String = row.get("roomy_inbox")?;
    let entity_list: String = row.get("new_joined_spaces_test")?;

    let name: String = row.get("name")?;
    if name.trim().is_empty() {
        return Err(StoreError::InvalidData(format!(
            "profile `{id_text}` has a blank name"
        )));
    }

    Ok(RoomyProfile {
        id: parse_id_column(&id_text, "profiles.id")?,
        owner_group: parse_id_column(&owner_text, "co_values.owner_group")?,
        name,
        image_url: row.get("image_url")?,
        bluesky_handle: row.get("bluesky_handle")?,
        banner_url: row.get("banner_url")?,
        description: row.get("description")?,
        joined_date: row.get("joined_date")?,
        joined_spaces: parse_id_column(&joined_spaces, "profiles.joined_spaces")?,
        roomy_inbox: parse_id_column(&roomy_inbox, "profiles.roomy_inbox")?,
        new_joined_spaces_test: parse_id_column(&entity_list, "profiles.new_joined_spaces_test")?,
    })
}

fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}

fn ensure_store_connection_ready(conn: &Connection) -> StoreResult<()> {
    let expected_version = latest_version();
    let actual_version = current_user_version(conn)?;
    if actual_version != expected_version {
        return Err(StoreError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    for table in REQUIRED_TABLES {
        if !table_exists(conn, table)? {
            return Err(StoreError::MissingRequiredTable(table));
        }
    }
    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> StoreResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}
