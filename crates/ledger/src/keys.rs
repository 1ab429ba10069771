//! Ledger key scheme.
//!
//! Node records live under `D{id}`, task records under `T{tx_id}` and the
//! dispatch context under a single fixed key. All keys sort byte-wise.

pub const NODE_PREFIX: &str = "D";
pub const TASK_PREFIX: &str = "T";
pub const SCHEDULER_STATE_KEY: &str = "SCHEDULER_STATE";

pub fn node_key(node_id: &str) -> String {
    format!("{}{}", NODE_PREFIX, node_id)
}

pub fn task_key(tx_id: &str) -> String {
    format!("{}{}", TASK_PREFIX, tx_id)
}

/// Half-open `[start, end)` range covering every key with the given prefix.
pub fn prefix_range(prefix: &str) -> (String, String) {
    let mut end = prefix.as_bytes().to_vec();
    while let Some(last) = end.pop() {
        if last < u8::MAX {
            end.push(last + 1);
            break;
        }
    }
    let end = String::from_utf8(end).unwrap_or_default();
    (prefix.to_string(), end)
}

pub fn node_range() -> (String, String) {
    prefix_range(NODE_PREFIX)
}

pub fn task_range() -> (String, String) {
    prefix_range(TASK_PREFIX)
}
