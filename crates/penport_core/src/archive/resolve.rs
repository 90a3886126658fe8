//! Lenient resolution of archived references against the destination store.
//!
//! # Invariants
//! - An unresolvable reference is never an error. Identity references
//!   resolve to `None` (field omitted); member references fall back to an
//!   inline snapshot.
//! - Store failures during lookup do propagate.

use crate::archive::document::{MemberFragment, RefId, UserRef};
use crate::model::project::ImportedMember;
use crate::model::template::TemplateId;
use crate::model::user::UserId;
use crate::repo::store::{DestinationStore, MemberDraft, StoreResult};
use log::info;

/// Outcome of resolving one project member.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedMember {
    /// Member backed by an existing destination account.
    Existing(MemberDraft),
    /// Account unknown at the destination; attributes kept verbatim.
    Snapshot(ImportedMember),
}

pub struct ReferenceResolver<'a, S: DestinationStore> {
    store: &'a S,
}

impl<'a, S: DestinationStore> ReferenceResolver<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Resolves a user reference; `field` names the referencing field in logs.
    pub fn user(
        &self,
        reference: Option<&UserRef>,
        field: &'static str,
    ) -> StoreResult<Option<UserId>> {
        let Some(reference) = reference else {
            return Ok(None);
        };
        let source_id = reference.id();
        let Some(user_id) = source_id.as_uuid() else {
            info!(
                "event=reference_skip module=archive status=skip field={field} ref={source_id} reason=foreign_id"
            );
            return Ok(None);
        };
        if self.store.find_user(user_id)?.is_some() {
            return Ok(Some(user_id));
        }
        info!(
            "event=reference_skip module=archive status=skip field={field} ref={source_id} reason=user_absent"
        );
        Ok(None)
    }

    /// Resolves a finding's template reference.
    pub fn template(&self, reference: Option<&RefId>) -> StoreResult<Option<TemplateId>> {
        let Some(source_id) = reference else {
            return Ok(None);
        };
        let Some(template_id) = source_id.as_uuid() else {
            info!(
                "event=reference_skip module=archive status=skip field=template ref={source_id} reason=foreign_id"
            );
            return Ok(None);
        };
        if self.store.template_exists(template_id)? {
            return Ok(Some(template_id));
        }
        info!(
            "event=reference_skip module=archive status=skip field=template ref={source_id} reason=template_absent"
        );
        Ok(None)
    }

    /// Resolves a member to a local account, or keeps its snapshot.
    pub fn member(&self, fragment: &MemberFragment) -> StoreResult<ResolvedMember> {
        if let Some(user_id) = fragment.id.as_ref().and_then(RefId::as_uuid) {
            if self.store.find_user(user_id)?.is_some() {
                return Ok(ResolvedMember::Existing(MemberDraft {
                    user_id,
                    roles: fragment.roles.clone(),
                }));
            }
        }
        info!(
            "event=member_snapshot module=archive status=ok ref={}",
            fragment
                .id
                .as_ref()
                .map_or_else(|| "none".to_string(), RefId::to_string)
        );
        Ok(ResolvedMember::Snapshot(fragment.snapshot()))
    }
}


#[cfg(test)]
mod tests {
    use super::{ReferenceResolver, ResolvedMember};
    use crate::archive::document::{MemberFragment, RefId, UserRef};
    use crate::db::open_db_in_memory;
    use crate::model::user::User;
    use crate::repo::sqlite_store::SqliteArchiveStore;
    use serde_json::json;
    use uuid::Uuid;

    #[test]
    fn user_reference_resolves_existing_and_skips_absent() {
        let conn = open_db_in_memory().expect("open db");
        let store = SqliteArchiveStore::try_new(&conn).expect("store");
        let user = User::new("alice");
        store.create_user(&user).expect("seed user");
        let resolver = ReferenceResolver::new(&store);

        let existing = UserRef::Id(RefId::from(user.id));
        assert_eq!(
            resolver.user(Some(&existing), "assignee").expect("lookup"),
            Some(user.id)
        );

        let absent = UserRef::Object {
            id: RefId::from(Uuid::new_v4()),
        };
        assert_eq!(resolver.user(Some(&absent), "assignee").expect("lookup"), None);

        let foreign = UserRef::Id(RefId::Number(42.into()));
        assert_eq!(resolver.user(Some(&foreign), "assignee").expect("lookup"), None);
        for raw in ["", "../7"] {
            let odd = UserRef::Id(RefId::Text(raw.to_string()));
            assert_eq!(resolver.user(Some(&odd), "assignee").expect("lookup"), None);
        }
        assert_eq!(resolver.user(None, "assignee").expect("lookup"), None);
    }

    #[test]
    fn template_reference_is_skipped_when_absent() {
        let conn = open_db_in_memory().expect("open db");
        let store = SqliteArchiveStore::try_new(&conn).expect("store");
        let resolver = ReferenceResolver::new(&store);
        let missing = RefId::from(Uuid::new_v4());
        assert_eq!(resolver.template(Some(&missing)).expect("lookup"), None);
    }

    #[test]
    fn member_falls_back_to_snapshot() {
        let conn = open_db_in_memory().expect("open db");
        let store = SqliteArchiveStore::try_new(&conn).expect("store");
        let user = User::new("bob");
        store.create_user(&user).expect("seed user");
        let resolver = ReferenceResolver::new(&store);

        let known: MemberFragment =
            serde_json::from_value(json!({"id": user.id.to_string(), "roles": ["lead"]}))
                .expect("member");
        match resolver.member(&known).expect("resolve") {
            ResolvedMember::Existing(draft) => {
                assert_eq!(draft.user_id, user.id);
                assert_eq!(draft.roles, vec!["lead".to_string()]);
            }
            other => panic!("expected existing member, got {other:?}"),
        }

        let unknown: MemberFragment = serde_json::from_value(json!({
            "id": Uuid::new_v4().to_string(),
            "name": "Carol Example",
            "email": "carol@example.com",
            "roles": ["pentester"]
        }))
        .expect("member");
        match resolver.member(&unknown).expect("resolve") {
            ResolvedMember::Snapshot(snapshot) => {
                assert_eq!(snapshot.get("name"), Some(&json!("Carol Example")));
                assert_eq!(snapshot.get("email"), Some(&json!("carol@example.com")));
            }
            other => panic!("expected snapshot, got {other:?}"),
        }
    }
}
