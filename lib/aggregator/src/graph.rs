use crate::canon::Canonicalization;
use scheduler::Call;
use std::collections::HashMap;

/// One entry in the aggregator (§3 "Graph node"). Node 0 is the synthetic
/// start and carries no call.
pub struct Node {
    pub call: Option<Call>,
    pub canonical: Option<String>,
    pub successors: Vec<usize>,
    pub pred: usize,
    pub is_final: bool,
}

/// The merged call graph plus the bookkeeping the jump detector needs
/// (§4.5, design notes "Graph without back-pointers" and
/// "Friend-class intrusion"). `nodes` is append/pop-only: the jump
/// detector's only way to remove a node is to pop the tail, so indices of
/// every node that survives never change.
pub struct Graph {
    canonicalization: Canonicalization,
    pub(crate) subroutine_size: usize,
    nodes: Vec<Node>,
    current_node: usize,
    pub(crate) inserted_nodes: Vec<usize>,
    pub(crate) windows: HashMap<String, Vec<usize>>,
}

impl Graph {
    pub fn new(canonicalization: Canonicalization, subroutine_size: usize) -> Graph {
        let start = Node { call: None, canonical: None, successors: Vec::new(), pred: 0, is_final: false };
        Graph {
            canonicalization,
            subroutine_size,
            nodes: vec![start],
            current_node: 0,
            inserted_nodes: Vec::new(),
            windows: HashMap::new(),
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn current_node(&self) -> usize {
        self.current_node
    }

    pub fn pred(&self, node: usize) -> usize {
        self.nodes[node].pred
    }

    pub fn successors(&self, node: usize) -> &[usize] {
        &self.nodes[node].successors
    }

    pub fn is_final(&self, node: usize) -> bool {
        self.nodes[node].is_final
    }

    pub fn canonical(&self, node: usize) -> Option<&str> {
        self.nodes[node].canonical.as_deref()
    }

    /// Insertion algorithm (§4.5 "Insertion"). Moves `current_node` and,
    /// when a new node was allocated, runs the jump detector over it.
    pub fn insert_call(&mut self, call: Call) {
        let canonical = self.canonicalization.apply(&call);
        let existing = self.nodes[self.current_node]
            .successors
            .iter()
            .copied()
            .find(|&s| self.nodes[s].canonical.as_deref() == Some(canonical.as_str()));

        if let Some(next) = existing {
            self.current_node = next;
            return;
        }

        let new_index = self.nodes.len();
        self.nodes.push(Node { call: Some(call), canonical: Some(canonical), successors: Vec::new(), pred: self.current_node, is_final: false });
        self.nodes[self.current_node].successors.push(new_index);
        self.current_node = new_index;
        self.inserted_nodes.push(new_index);

        if self.subroutine_size >= 2 {
            crate::jump::detect(self);
        }
    }

    /// §4.5 "End of run".
    pub fn end_run(&mut self) {
        self.nodes[self.current_node].is_final = true;
        self.current_node = 0;
        self.inserted_nodes.clear();
    }

    // --- the four "friend-class" mutations the jump detector needs ---

    pub(crate) fn set_current_node(&mut self, node: usize) {
        self.current_node = node;
    }

    pub(crate) fn get_predecessor(&self, node: usize) -> usize {
        self.nodes[node].pred
    }

    /// Pops the highest-indexed node. Only ever valid when that node is the
    /// one the jump detector is currently unwinding — the jump detector
    /// always calls this tail-first, matching the order nodes were pushed.
    pub(crate) fn delete_last_node(&mut self) -> usize {
        let idx = self.nodes.len() - 1;
        self.nodes.pop();
        idx
    }

    pub(crate) fn pop_inserted(&mut self) -> Option<usize> {
        self.inserted_nodes.pop()
    }

    /// Replaces the last successor edge out of `node` with `target`.
    pub(crate) fn set_last_successor(&mut self, node: usize, target: usize) {
        let successors = &mut self.nodes[node].successors;
        match successors.last_mut() {
            Some(last) => *last = target,
            None => successors.push(target),
        }
    }
}
