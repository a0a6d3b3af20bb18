use crate::graph::Graph;

/// Runs after every node insertion (§4.5 "Jump detection"). Collapses a
/// repeated N-node tail into a back-edge when the preconditions hold; a
/// miss leaves the graph with the literal tail, per spec's "strictly
/// best-effort" note.
pub fn detect(graph: &mut Graph) {
    let n = graph.subroutine_size;
    let Some(window) = window_ending_at(graph, graph.current_node(), n) else {
        return;
    };
    let key = window_string(graph, &window);

    let Some(jump_dest) = graph.windows.get(&key).cloned() else {
        graph.windows.insert(key, window);
        return;
    };

    if !window_is_this_runs_tail(graph, &window) {
        return;
    }
    if window[0] < jump_dest[0] + n {
        return;
    }

    // Unwind the tail from the most-recently-inserted node back to the
    // anchor that preceded it, popping in lockstep with `inserted_nodes`.
    // Before each node is deleted, patch the one hash-table entry (if any)
    // recorded for the trace that currently ends at it, so a later lookup
    // never finds a value pointing at a node index that's about to be
    // reused for something unrelated.
    for i in 0..n {
        let doomed = graph.current_node();
        patch_trace_ending_at(graph, doomed, n, i, &jump_dest);

        let anchor = graph.get_predecessor(doomed);
        graph.delete_last_node();
        let popped = graph.pop_inserted();
        debug_assert!(popped.is_some());
        graph.set_current_node(anchor);
    }

    let anchor = graph.current_node();
    graph.set_last_successor(anchor, jump_dest[0]);
    graph.set_current_node(jump_dest[n - 1]);
    log::trace!("collapsed a {n}-node tail into a back-edge to node {}", jump_dest[0]);
}

fn window_ending_at(graph: &Graph, end: usize, n: usize) -> Option<Vec<usize>> {
    let mut window = vec![end];
    let mut cur = end;
    for _ in 1..n {
        cur = graph.pred(cur);
        if cur == 0 {
            return None;
        }
        window.push(cur);
    }
    window.reverse();
    Some(window)
}

fn window_string(graph: &Graph, window: &[usize]) -> String {
    window.iter().map(|&i| graph.canonical(i).unwrap_or_default()).collect::<Vec<_>>().join(";")
}

fn window_is_this_runs_tail(graph: &Graph, window: &[usize]) -> bool {
    let n = window.len();
    if graph.inserted_nodes.len() < n {
        return false;
    }
    &graph.inserted_nodes[graph.inserted_nodes.len() - n..] == window
}

/// Step 4, applied once per unwind step rather than as a single pass over
/// the whole table: recompute the N-node trace ending at `node` (the node
/// about to be deleted this iteration) and, if the table still holds exactly
/// that trace under its own canonical key, overwrite its tail from `start`
/// onward with the matching prefix of `jump_dest`. The exact-match guard
/// keeps this from clobbering an unrelated entry that merely shares the
/// canonical key (a different, still-valid occurrence of the same trace).
fn patch_trace_ending_at(graph: &mut Graph, node: usize, n: usize, start: usize, jump_dest: &[usize]) {
    let Some(window) = window_ending_at(graph, node, n) else {
        return;
    };
    let key = window_string(graph, &window);
    let Some(stored) = graph.windows.get(&key) else {
        return;
    };
    if stored.as_slice() != window.as_slice() {
        return;
    }
    let k = n - start;
    let mut patched = window[..start].to_vec();
    patched.extend_from_slice(&jump_dest[..k]);
    graph.windows.insert(key, patched);
}
