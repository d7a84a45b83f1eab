//! Action linking: attaching actions to paths, milestones and loop items,
//! and the ordering rules within a parent scope.

use chrono::Utc;
use rusqlite::{params, OptionalExtension, Transaction};
use uuid::Uuid;

use crate::entity::{Action, ParentRef};
use crate::error::Result;

use super::action::{action_from_row, ACTION_COLUMNS};
use super::Store;

impl Store {
    /// Attach an action to a path, or to one of its milestones when given.
    /// The action takes the next order slot within the new parent scope.
    pub fn link_action_to_path(
        &self,
        action_id: &Uuid,
        path_id: &Uuid,
        milestone_id: Option<&Uuid>,
    ) -> Result<bool> {
        let tx = self.conn().unchecked_transaction()?;

        if !action_exists(&tx, action_id)? {
            return Ok(false);
        }

        let parent = match milestone_id {
            Some(milestone_id) => {
                // The milestone must belong to the given path.
                let owner: Option<String> = tx
                    .query_row(
                        "SELECT path_id FROM milestones WHERE id = ?1",
                        [milestone_id.to_string()],
                        |row| row.get(0),
                    )
                    .optional()?;
                if owner.as_deref() != Some(path_id.to_string().as_str()) {
                    return Ok(false);
                }
                ParentRef::Milestone(*milestone_id)
            }
            None => {
                let exists: Option<String> = tx
                    .query_row(
                        "SELECT id FROM paths WHERE id = ?1",
                        [path_id.to_string()],
                        |row| row.get(0),
                    )
                    .optional()?;
                if exists.is_none() {
                    return Ok(false);
                }
                ParentRef::Path(*path_id)
            }
        };

        let order = next_order(&tx, &parent)?;
        set_parent(&tx, action_id, Some(parent), order)?;
        tx.commit()?;
        Ok(true)
    }

    /// Detach an action from whatever parent it has; it becomes standalone.
    pub fn unlink_action(&self, action_id: &Uuid) -> Result<bool> {
        let tx = self.conn().unchecked_transaction()?;
        if !action_exists(&tx, action_id)? {
            return Ok(false);
        }
        set_parent(&tx, action_id, None, 0)?;
        tx.commit()?;
        Ok(true)
    }

    /// Reparent and re-sequence in one step. Without an explicit order the
    /// action goes to the end of the new scope.
    pub fn move_action(
        &self,
        action_id: &Uuid,
        new_parent: ParentRef,
        new_order: Option<i64>,
    ) -> Result<bool> {
        let tx = self.conn().unchecked_transaction()?;

        if !action_exists(&tx, action_id)? || !parent_exists(&tx, &new_parent)? {
            return Ok(false);
        }

        let order = match new_order {
            Some(order) => order,
            None => next_order(&tx, &new_parent)?,
        };
        set_parent(&tx, action_id, Some(new_parent), order)?;
        tx.commit()?;
        Ok(true)
    }

    /// Direct children of the path, or of the given milestone
    pub fn get_path_actions(
        &self,
        path_id: &Uuid,
        milestone_id: Option<&Uuid>,
    ) -> Result<Vec<Action>> {
        let (parent_type, parent_id) = match milestone_id {
            Some(milestone_id) => ("milestone", milestone_id.to_string()),
            None => ("path", path_id.to_string()),
        };

        let mut stmt = self.conn().prepare(&format!(
            "SELECT {} FROM actions
             WHERE parent_type = ?1 AND parent_id = ?2
             ORDER BY action_order ASC",
            ACTION_COLUMNS
        ))?;
        let actions = stmt
            .query_map(params![parent_type, parent_id], action_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(actions)
    }
}

fn action_exists(tx: &Transaction, action_id: &Uuid) -> Result<bool> {
    let exists: Option<String> = tx
        .query_row(
            "SELECT id FROM actions WHERE id = ?1",
            [action_id.to_string()],
            |row| row.get(0),
        )
        .optional()?;
    Ok(exists.is_some())
}

fn parent_exists(tx: &Transaction, parent: &ParentRef) -> Result<bool> {
    let (sql, id) = match parent {
        ParentRef::Path(id) => ("SELECT id FROM paths WHERE id = ?1", id),
        ParentRef::Milestone(id) => ("SELECT id FROM milestones WHERE id = ?1", id),
        ParentRef::LoopItem(id) => ("SELECT id FROM loop_items WHERE id = ?1", id),
    };
    let exists: Option<String> = tx
        .query_row(sql, [id.to_string()], |row| row.get(0))
        .optional()?;
    Ok(exists.is_some())
}

/// Max existing order within the parent scope, plus one; 1 for an empty scope
fn next_order(tx: &Transaction, parent: &ParentRef) -> Result<i64> {
    let order = tx.query_row(
        "SELECT COALESCE(MAX(action_order), 0) + 1 FROM actions
         WHERE parent_type = ?1 AND parent_id = ?2",
        params![parent.kind(), parent.id().to_string()],
        |row| row.get(0),
    )?;
    Ok(order)
}

fn set_parent(
    tx: &Transaction,
    action_id: &Uuid,
    parent: Option<ParentRef>,
    order: i64,
) -> Result<()> {
    tx.execute(
        "UPDATE actions SET parent_id = ?1, parent_type = ?2, action_order = ?3, updated_at = ?4
         WHERE id = ?5",
        params![
            parent.map(|p| p.id().to_string()),
            parent.map(|p| p.kind()),
            order,
            Utc::now().to_rfc3339(),
            action_id.to_string(),
        ],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{NewAction, NewMilestone, NewPath};

    fn action(store: &Store, title: &str) -> Action {
        store
            .create_action(NewAction {
                title: title.to_string(),
                ..Default::default()
            })
            .unwrap()
    }

    #[test]
    fn test_link_assigns_sequential_orders() {
        let store = Store::open_in_memory().unwrap();
        let path = store
            .create_path(NewPath {
                title: "P".to_string(),
                ..Default::default()
            })
            .unwrap();
        let milestone = store
            .add_milestone(
                &path.base.id,
                NewMilestone {
                    title: "M".to_string(),
                    ..Default::default()
                },
            )
            .unwrap();

        let mut orders = Vec::new();
        for title in ["a", "b", "c"] {
            let act = action(&store, title);
            assert!(store
                .link_action_to_path(&act.base.id, &path.base.id, Some(&milestone.id))
                .unwrap());
            let fetched = store.get_action(&act.base.id).unwrap().unwrap();
            orders.push(fetched.order);
            assert_eq!(fetched.parent, Some(ParentRef::Milestone(milestone.id)));
        }
        assert_eq!(orders, vec![1, 2, 3]);
    }

    #[test]
    fn test_link_to_milestone_of_other_path_refused() {
        let store = Store::open_in_memory().unwrap();
        let path_a = store
            .create_path(NewPath {
                title: "A".to_string(),
                ..Default::default()
            })
            .unwrap();
        let path_b = store
            .create_path(NewPath {
                title: "B".to_string(),
                ..Default::default()
            })
            .unwrap();
        let milestone_b = store
            .add_milestone(
                &path_b.base.id,
                NewMilestone {
                    title: "MB".to_string(),
                    ..Default::default()
                },
            )
            .unwrap();

        let act = action(&store, "stray");
        let ok = store
            .link_action_to_path(&act.base.id, &path_a.base.id, Some(&milestone_b.id))
            .unwrap();
        assert!(!ok);
        assert!(store.get_action(&act.base.id).unwrap().unwrap().parent.is_none());
    }

    #[test]
    fn test_unlink_makes_action_standalone() {
        let store = Store::open_in_memory().unwrap();
        let path = store
            .create_path(NewPath {
                title: "P".to_string(),
                ..Default::default()
            })
            .unwrap();
        let act = action(&store, "a");
        store
            .link_action_to_path(&act.base.id, &path.base.id, None)
            .unwrap();

        assert!(store.unlink_action(&act.base.id).unwrap());

        let fetched = store.get_action(&act.base.id).unwrap().unwrap();
        assert!(fetched.parent.is_none());
        assert_eq!(fetched.order, 0);
    }

    #[test]
    fn test_move_between_milestones() {
        let store = Store::open_in_memory().unwrap();
        let path = store
            .create_path(NewPath {
                title: "P".to_string(),
                ..Default::default()
            })
            .unwrap();
        let m1 = store
            .add_milestone(
                &path.base.id,
                NewMilestone {
                    title: "M1".to_string(),
                    ..Default::default()
                },
            )
            .unwrap();
        let m2 = store
            .add_milestone(
                &path.base.id,
                NewMilestone {
                    title: "M2".to_string(),
                    ..Default::default()
                },
            )
            .unwrap();

        let act = action(&store, "wanderer");
        store
            .link_action_to_path(&act.base.id, &path.base.id, Some(&m1.id))
            .unwrap();
        store
            .move_action(&act.base.id, ParentRef::Milestone(m2.id), None)
            .unwrap();

        let fetched = store.get_action(&act.base.id).unwrap().unwrap();
        assert_eq!(fetched.parent, Some(ParentRef::Milestone(m2.id)));
        assert_eq!(fetched.order, 1);

        assert!(store
            .get_path_actions(&path.base.id, Some(&m1.id))
            .unwrap()
            .is_empty());
        assert_eq!(
            store
                .get_path_actions(&path.base.id, Some(&m2.id))
                .unwrap()
                .len(),
            1
        );
    }

    #[test]
    fn test_delete_milestone_reparents_actions_to_path() {
        let store = Store::open_in_memory().unwrap();
        let path = store
            .create_path(NewPath {
                title: "Q1 Goals".to_string(),
                ..Default::default()
            })
            .unwrap();
        let kickoff = store
            .add_milestone(
                &path.base.id,
                NewMilestone {
                    title: "Kickoff".to_string(),
                    ..Default::default()
                },
            )
            .unwrap();

        let a = action(&store, "invite team");
        let b = action(&store, "book room");
        store
            .link_action_to_path(&a.base.id, &path.base.id, Some(&kickoff.id))
            .unwrap();
        store
            .link_action_to_path(&b.base.id, &path.base.id, Some(&kickoff.id))
            .unwrap();

        assert!(store.delete_milestone(&kickoff.id).unwrap());

        for id in [&a.base.id, &b.base.id] {
            let fetched = store.get_action(id).unwrap().unwrap();
            assert_eq!(fetched.parent, Some(ParentRef::Path(path.base.id)));
        }
        let path_actions = store.get_path_actions(&path.base.id, None).unwrap();
        assert_eq!(path_actions.len(), 2);
        assert!(store
            .get_path(&path.base.id)
            .unwrap()
            .unwrap()
            .milestones
            .is_empty());
    }

    #[test]
    fn test_delete_path_cascade_end_state() {
        let store = Store::open_in_memory().unwrap();
        let path = store
            .create_path(NewPath {
                title: "Doomed".to_string(),
                ..Default::default()
            })
            .unwrap();
        let milestone = store
            .add_milestone(
                &path.base.id,
                NewMilestone {
                    title: "M".to_string(),
                    ..Default::default()
                },
            )
            .unwrap();

        let direct = action(&store, "direct child");
        let nested = action(&store, "milestone child");
        store
            .link_action_to_path(&direct.base.id, &path.base.id, None)
            .unwrap();
        store
            .link_action_to_path(&nested.base.id, &path.base.id, Some(&milestone.id))
            .unwrap();

        store.delete_path(&path.base.id).unwrap();

        // Neither action is deleted. The direct child is orphaned; the
        // milestone child keeps a path-typed parent pointing at the old path.
        let direct = store.get_action(&direct.base.id).unwrap().unwrap();
        assert!(direct.parent.is_none());

        let nested = store.get_action(&nested.base.id).unwrap().unwrap();
        assert_eq!(nested.parent, Some(ParentRef::Path(path.base.id)));
    }
}
