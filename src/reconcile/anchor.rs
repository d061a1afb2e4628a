//! Anchor reconciler (`spec.md` §4.5): creates/deletes subnamespaces from
//! anchor records.

use crate::error::Result;
use crate::events::{ReconcilerKind, SharedEventBus};
use crate::forest::Forest;
use crate::model::{AnchorState, Condition, ConditionReason, Manager};
use crate::observability::ObservabilityFacade;
use crate::store::{NamespaceObj, ObjectStore};
use std::sync::Arc;
use tracing::Level;

pub struct AnchorReconciler {
    store: Arc<dyn ObjectStore>,
    forest: Forest,
    events: SharedEventBus,
    obs: Arc<dyn ObservabilityFacade>,
}

impl AnchorReconciler {
    pub fn new(store: Arc<dyn ObjectStore>, forest: Forest, events: SharedEventBus, obs: Arc<dyn ObservabilityFacade>) -> Self {
        Self { store, forest, events, obs }
    }

    /// Reconciles the anchor in `owner` naming `child`.
    pub async fn reconcile(&self, owner: &str, child: &str) -> Result<()> {
        let log = self.obs.logger();

        let Some(mut anchor) = self.store.get_anchor_for_child(owner, child).await? else {
            // The anchor is gone. If the forest still shows `child` as a
            // subnamespace owned by `owner`, this is a cascading-deletion
            // request; only honour it if `owner` has cascading deletion
            // enabled (`spec.md` §4.5 "on anchor deletion with cascading
            // deletion enabled, deletes the subnamespace"). This reconciler
            // runs as the privileged HNC controller identity, which bypasses
            // every admission validator (`src/admission/mod.rs`), so the
            // namespace validator's own cascading-deletion guard (S6) is
            // never consulted for this path and the check must happen here.
            let (was_owned, cascading_allowed) = self.forest.with_lock(|g| {
                let was_owned = g.try_get(child).map(|n| n.is_sub && n.parent.as_deref() == Some(owner)).unwrap_or(false);
                let cascading_allowed = g.try_get(owner).map(|n| n.allow_cascading_deletion).unwrap_or(false);
                (was_owned, cascading_allowed)
            });
            if was_owned && cascading_allowed {
                self.store.delete_namespace(child).await?;
                log.log(Level::INFO, "anchor", &format!("deleted subnamespace {child} after anchor removal in {owner}"));
            } else if was_owned {
                log.log(
                    Level::DEBUG,
                    "anchor",
                    &format!("anchor for {child} removed in {owner} but cascading deletion is not enabled; leaving namespace in place"),
                );
            }
            return Ok(());
        };

        let child_ns = self.store.get_namespace(child).await?;
        let owner_ns = self.store.get_namespace(owner).await?;

        let new_status = match (&owner_ns, &child_ns) {
            (None, _) => AnchorState::Missing,
            (Some(owner_obj), _) if !owner_obj.manager.is_internal() => AnchorState::Forbidden,
            (Some(_), None) => {
                let obj = NamespaceObj {
                    name: child.to_string(),
                    manager: Manager::Internal,
                    labels: anchor.labels.clone(),
                    deletion_timestamp_set: false,
                };
                self.store.put_namespace(obj).await?;
                log.log(Level::INFO, "anchor", &format!("created subnamespace {child} owned by {owner}"));
                AnchorState::Ok
            }
            (Some(_), Some(existing)) => {
                let owned_here = self.forest.with_lock(|g| {
                    g.try_get(child).map(|n| n.is_sub && n.parent.as_deref() == Some(owner)).unwrap_or(false)
                });
                if owned_here || existing.labels.get("hnc.example.io/subnamespace-of").map(String::as_str) == Some(owner) {
                    AnchorState::Ok
                } else {
                    AnchorState::Conflict
                }
            }
        };

        let is_missing = new_status == AnchorState::Missing;
        if anchor.status != new_status {
            anchor.status = new_status;
            self.store.put_anchor(anchor).await?;
        }

        self.sync_anchor_missing_condition(owner, is_missing).await?;

        self.events.enqueue(ReconcilerKind::Hierarchy, child.to_string());
        Ok(())
    }

    /// Reflects this anchor's `Missing` state onto `owner`'s hierarchy
    /// document as `ActivitiesHalted {SubnamespaceAnchorMissing}`
    /// (`spec.md` §4.5, §7 structural invariants). Adds or removes the
    /// single condition this reconciler owns, leaving any other condition
    /// already on the document untouched.
    async fn sync_anchor_missing_condition(&self, owner: &str, missing: bool) -> Result<()> {
        let Some(mut doc) = self.store.get_hierarchy(owner).await? else {
            return Ok(());
        };
        let has_condition = doc.status_conditions.iter().any(|c| c.reason == ConditionReason::SubnamespaceAnchorMissing);
        if missing == has_condition {
            return Ok(());
        }
        if missing {
            doc.status_conditions.push(Condition::halted(
                ConditionReason::SubnamespaceAnchorMissing,
                "a subnamespace anchor names an owner that is not observed",
            ));
        } else {
            doc.status_conditions.retain(|c| c.reason != ConditionReason::SubnamespaceAnchorMissing);
        }
        self.store.put_hierarchy(owner, doc).await
    }
}
