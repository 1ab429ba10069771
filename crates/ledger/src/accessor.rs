use std::sync::Arc;

use tracing::info;

use cobra_core::{ClearScope, DispatchContext, Node, NodeRegistration, TaskRecord};

use crate::error::LedgerError;
use crate::keys::{self, SCHEDULER_STATE_KEY};
use crate::store::Ledger;
use crate::transaction::{decode, Transaction};

// ── Transaction-scoped record access ──────────────────────────

impl Transaction<'_> {
    /// All nodes in ID order. Every returned record joins the read set.
    pub fn load_nodes(&mut self) -> Result<Vec<Node>, LedgerError> {
        let (start, end) = keys::node_range();
        Ok(self
            .scan_json::<Node>(&start, &end)?
            .into_iter()
            .map(|(_, node)| node)
            .collect())
    }

    /// Current dispatch context, or the initial one when none was persisted.
    pub fn load_context(&mut self) -> Result<DispatchContext, LedgerError> {
        Ok(self
            .get_json::<DispatchContext>(SCHEDULER_STATE_KEY)?
            .unwrap_or_default())
    }

    pub fn store_node(&mut self, node: &Node) -> Result<(), LedgerError> {
        self.put_json(&keys::node_key(&node.node_id), node)
    }

    pub fn store_task(&mut self, task: &TaskRecord) -> Result<(), LedgerError> {
        self.put_json(&keys::task_key(&task.task_id), task)
    }

    pub fn store_context(&mut self, ctx: &DispatchContext) -> Result<(), LedgerError> {
        self.put_json(SCHEDULER_STATE_KEY, ctx)
    }
}

// ── Node ledger ───────────────────────────────────────────────

/// Typed access to node, task and scheduler-state records.
#[derive(Clone)]
pub struct NodeLedger {
    ledger: Arc<dyn Ledger>,
}

impl NodeLedger {
    pub fn new(ledger: Arc<dyn Ledger>) -> Self {
        Self { ledger }
    }

    pub fn raw(&self) -> &dyn Ledger {
        self.ledger.as_ref()
    }

    pub fn begin(&self) -> Transaction<'_> {
        Transaction::begin(self.ledger.as_ref())
    }

    pub fn list_nodes(&self) -> Result<Vec<Node>, LedgerError> {
        let (start, end) = keys::node_range();
        self.scan_decoded(&start, &end)
    }

    pub fn list_tasks(&self) -> Result<Vec<TaskRecord>, LedgerError> {
        let (start, end) = keys::task_range();
        self.scan_decoded(&start, &end)
    }

    pub fn get_node(&self, node_id: &str) -> Result<Option<Node>, LedgerError> {
        let key = keys::node_key(node_id);
        match self.ledger.get(&key)? {
            Some(entry) => decode(&key, &entry.value).map(Some),
            None => Ok(None),
        }
    }

    pub fn context(&self) -> Result<DispatchContext, LedgerError> {
        match self.ledger.get(SCHEDULER_STATE_KEY)? {
            Some(entry) => decode(SCHEDULER_STATE_KEY, &entry.value),
            None => Ok(DispatchContext::default()),
        }
    }

    /// Validate a registration and write the node, replacing any node with
    /// the same ID.
    pub fn register(&self, registration: NodeRegistration) -> Result<Node, LedgerError> {
        let node = registration.into_node()?;
        let mut tx = self.begin();
        tx.store_node(&node)?;
        tx.commit()?;
        info!(
            node_id = %node.node_id,
            class = %node.class,
            status = %node.status,
            "Registered node"
        );
        Ok(node)
    }

    /// Remove every record in the scope's key families. `All` also drops the
    /// dispatch context. Returns the number of records removed.
    pub fn clear(&self, scope: ClearScope) -> Result<usize, LedgerError> {
        let mut removed = 0;
        if scope.includes_tasks() {
            let (start, end) = keys::task_range();
            removed += self.ledger.delete_range(&start, &end)?;
        }
        if scope.includes_nodes() {
            let (start, end) = keys::node_range();
            removed += self.ledger.delete_range(&start, &end)?;
        }
        if scope == ClearScope::All && self.ledger.get(SCHEDULER_STATE_KEY)?.is_some() {
            self.ledger.delete(SCHEDULER_STATE_KEY)?;
            removed += 1;
        }
        info!(?scope, removed, "Cleared ledger records");
        Ok(removed)
    }

    fn scan_decoded<T: serde::de::DeserializeOwned>(
        &self,
        start: &str,
        end: &str,
    ) -> Result<Vec<T>, LedgerError> {
        self.ledger
            .range_scan(start, end)?
            .into_iter()
            .map(|(key, entry)| decode(&key, &entry.value))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryLedger;
    use cobra_core::{NodeClass, TaskStatus, TaskType};

    fn ledger() -> NodeLedger {
        NodeLedger::new(Arc::new(MemoryLedger::new()))
    }

    #[test]
    fn register_normalizes_and_lists_in_id_order() {
        let nl = ledger();
        nl.register(NodeRegistration::new("12", NodeClass::Uav, 10.0, 50.0))
            .unwrap();
        nl.register(NodeRegistration::new("3", NodeClass::Edge, 100.0, 50.0))
            .unwrap();

        let ids: Vec<String> = nl.list_nodes().unwrap().into_iter().map(|n| n.node_id).collect();
        assert_eq!(ids, vec!["0003", "0012"]);
        assert!(nl.get_node("0012").unwrap().unwrap().is_uav());
        assert!(nl.get_node("0099").unwrap().is_none());
    }

    #[test]
    fn invalid_registration_writes_nothing() {
        let nl = ledger();
        let err = nl
            .register(NodeRegistration::new("abc", NodeClass::Edge, 100.0, 0.0))
            .unwrap_err();
        assert!(matches!(err, LedgerError::Core(_)));
        assert_eq!(nl.raw().sequence().unwrap(), 0);
    }

    #[test]
    fn context_defaults_when_absent() {
        let nl = ledger();
        assert_eq!(nl.context().unwrap(), DispatchContext::default());

        let mut tx = nl.begin();
        let mut ctx = tx.load_context().unwrap();
        ctx.uav_burst_remaining = 5;
        tx.store_context(&ctx).unwrap();
        tx.commit().unwrap();
        assert_eq!(nl.context().unwrap().uav_burst_remaining, 5);
    }

    #[test]
    fn clear_scopes_touch_only_their_families() {
        let nl = ledger();
        nl.register(NodeRegistration::new("1", NodeClass::Edge, 100.0, 50.0))
            .unwrap();
        let mut tx = nl.begin();
        let task = TaskRecord {
            task_id: tx.id().to_string(),
            node_id: "0001".into(),
            payload: "p".into(),
            task_type: TaskType::UC,
            energy_cost: 0.5,
            compute_cost: 0.9,
            status: TaskStatus::Completed,
        };
        tx.store_task(&task).unwrap();
        tx.store_context(&DispatchContext::default()).unwrap();
        tx.commit().unwrap();

        assert_eq!(nl.clear(ClearScope::Tasks).unwrap(), 1);
        assert!(nl.list_tasks().unwrap().is_empty());
        assert_eq!(nl.list_nodes().unwrap().len(), 1);
        assert!(nl.raw().get(SCHEDULER_STATE_KEY).unwrap().is_some());

        assert_eq!(nl.clear(ClearScope::Nodes).unwrap(), 1);
        assert!(nl.list_nodes().unwrap().is_empty());
        assert!(nl.raw().get(SCHEDULER_STATE_KEY).unwrap().is_some());

        assert_eq!(nl.clear(ClearScope::All).unwrap(), 1);
        assert!(nl.raw().get(SCHEDULER_STATE_KEY).unwrap().is_none());
    }
}
