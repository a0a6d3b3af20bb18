//! Merges runs into a deterministic call graph and delegates to the jump
//! detector after each node insertion (§4.5).

mod canon;
mod graph;
mod jump;

pub use canon::Canonicalization;
pub use graph::Graph;

use scheduler::Run;

impl Graph {
    /// Feeds every call of `run` through [`Graph::insert_call`], then closes
    /// out the run (§4.5 "End of run").
    pub fn absorb(&mut self, run: &Run) {
        for call in &run.calls {
            self.insert_call(call.clone());
        }
        self.end_run();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use catalog::Function;
    use scheduler::Call;

    fn run_of(calls: Vec<(Function, &str)>) -> Run {
        Run { calls: calls.into_iter().map(|(f, p)| Call::new(f, vec![p.to_string()])).collect(), depth: 0 }
    }

    // scenario 1 from spec.md §8: baseline open("x")/close(fd), then four
    // error-tail runs, all collapsing onto the same `open` node under
    // name-only canonicalization.
    #[test]
    fn name_only_collapses_error_tails_onto_one_open_node() {
        let mut graph = Graph::new(Canonicalization::NameOnly, 1);
        graph.absorb(&run_of(vec![(Function::Open, "\"x\""), (Function::Close, "3")]));
        for _ in 0..4 {
            graph.absorb(&run_of(vec![(Function::Open, "\"x\"")]));
        }

        assert_eq!(graph.node_count(), 3); // start, open, close
        let open_node = graph.successors(0)[0];
        assert_eq!(graph.canonical(open_node), Some("open"));
        // both the close-bearing tail and the four bare error tails end on
        // this same open node, each marking it final exactly once in effect
        assert!(graph.is_final(open_node));
        assert_eq!(graph.successors(open_node).len(), 1); // only the close edge
    }

    // scenario 2: base-parameter canonicalization keeps open("a") and
    // open("b") as two distinct nodes in sequence.
    #[test]
    fn base_parameter_keeps_opens_on_different_paths_distinct() {
        let mut graph = Graph::new(Canonicalization::BaseParameter, 1);
        graph.absorb(&run_of(vec![(Function::Open, "\"a\""), (Function::Open, "\"b\"")]));

        assert_eq!(graph.node_count(), 3);
        let first = graph.successors(0)[0];
        assert_eq!(graph.canonical(first), Some("open(\"a\")"));
        let second = graph.successors(first)[0];
        assert_eq!(graph.canonical(second), Some("open(\"b\")"));
        assert_ne!(first, second);
    }

    // link's base parameter is its second argument (the new name), not the
    // first: two links sharing an `old` but differing in `new` must stay
    // distinct, and two links sharing `new` but differing in `old` must
    // collapse onto the same node.
    #[test]
    fn base_parameter_distinguishes_link_by_its_second_argument() {
        let mut graph = Graph::new(Canonicalization::BaseParameter, 1);
        let link = |old: &str, new: &str| Call::new(Function::Link, vec![old.to_string(), new.to_string()]);

        graph.absorb(&Run { calls: vec![link("a", "x")], depth: 0 });
        graph.absorb(&Run { calls: vec![link("a", "y")], depth: 0 });
        graph.absorb(&Run { calls: vec![link("b", "x")], depth: 0 });

        assert_eq!(graph.successors(0).len(), 2, "link(_, x) and link(_, y) must be distinct nodes");
        let canonicals: std::collections::HashSet<_> = graph.successors(0).iter().map(|&n| graph.canonical(n)).collect();
        assert_eq!(canonicals, std::collections::HashSet::from([Some("link(,x)"), Some("link(,y)")]));
    }

    // scenario 3: read/write/read/write/read/write, N=3, collapses the
    // repeated tail into a two-node loop via a back-edge.
    #[test]
    fn jump_detector_collapses_a_repeated_read_write_tail() {
        let mut graph = Graph::new(Canonicalization::NameOnly, 3);
        graph.absorb(&run_of(vec![
            (Function::Read, "3"),
            (Function::Write, "3"),
            (Function::Read, "3"),
            (Function::Write, "3"),
            (Function::Read, "3"),
            (Function::Write, "3"),
        ]));

        // start + read + write + one more read/write pair before the
        // back-edge collapses the rest: exactly 4 real nodes survive.
        assert_eq!(graph.node_count(), 4);

        let read1 = graph.successors(0)[0];
        assert_eq!(graph.canonical(read1), Some("read"));
        let write1 = graph.successors(read1)[0];
        assert_eq!(graph.canonical(write1), Some("write"));

        // P1: no surviving node's pred was disturbed by the rewrite.
        assert_eq!(graph.pred(write1), read1);
        assert_eq!(graph.pred(read1), 0);
    }

    // a table entry recorded for a trace ending partway through an earlier
    // collapse's doomed tail (not the tail as a whole) must be patched, not
    // left stale: the nodes that collapse frees up get reused by whatever
    // the graph builds next, so a stale entry can end up pointing at an
    // unrelated node instead of simply going out of bounds.
    #[test]
    fn a_later_jump_does_not_land_on_a_node_index_freed_by_an_earlier_collapse() {
        let mut graph = Graph::new(Canonicalization::NameOnly, 2);

        // read,write,open,close,read,write: the trailing read;write repeats
        // the leading one and collapses, popping two nodes. This also
        // records "close;read" in the table, pointing at the surviving
        // read node — the entry the later collapse below must still find
        // correctly patched.
        graph.absorb(&run_of(vec![
            (Function::Read, "1"),
            (Function::Write, "1"),
            (Function::Open, "\"c\""),
            (Function::Close, "1"),
            (Function::Read, "1"),
            (Function::Write, "1"),
        ]));

        // stat,mkdir advance past the two node indices the collapse above
        // just freed; close,read then re-creates a fresh close->read pair
        // whose window hits that same "close;read" table key. A stale
        // entry there would resolve to whatever run 2 happened to place at
        // the freed index (here, the `stat` node) instead of a real `read`.
        graph.absorb(&run_of(vec![
            (Function::Stat, "\"a\""),
            (Function::Mkdir, "\"b\""),
            (Function::Close, "1"),
            (Function::Read, "1"),
        ]));

        let read_node = graph.successors(0)[0];
        assert_eq!(graph.canonical(read_node), Some("read"));
        assert!(graph.is_final(read_node), "run 2's collapse should land back on the original read node");
    }

    // P2: two runs sharing a prefix never produce duplicate successor
    // edges for the same canonical call.
    #[test]
    fn no_duplicate_successors_for_the_same_canonical_call() {
        let mut graph = Graph::new(Canonicalization::NameOnly, 1);
        graph.absorb(&run_of(vec![(Function::Open, "\"x\""), (Function::Close, "3")]));
        graph.absorb(&run_of(vec![(Function::Open, "\"x\""), (Function::Read, "3")]));

        let open_node = graph.successors(0)[0];
        let canon_set: std::collections::HashSet<_> =
            graph.successors(open_node).iter().map(|&s| graph.canonical(s)).collect();
        assert_eq!(canon_set.len(), graph.successors(open_node).len());
    }
}
