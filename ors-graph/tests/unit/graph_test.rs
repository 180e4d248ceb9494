use super::*;

fn create_simple_graph() -> (StarGraph, Vec<ArcIndex>) {
    let mut graph = StarGraph::with_capacities(3, 3);
    graph.add_nodes(3);
    let arcs = vec![graph.add_arc(0, 1), graph.add_arc(1, 2), graph.add_arc(0, 2)];
    (graph, arcs)
}

#[test]
fn can_add_nodes_and_arcs() {
    let (graph, arcs) = create_simple_graph();

    assert_eq!(graph.num_nodes(), 3);
    assert_eq!(graph.num_arcs(), 3);
    assert_eq!(arcs, vec![1, 2, 3]);
    assert!(arcs.iter().all(|&arc| graph.is_arc_valid(arc) && graph.is_direct(arc)));
}

#[test]
fn can_resolve_arc_endpoints() {
    let (graph, _) = create_simple_graph();

    assert_eq!(graph.tail(1), 0);
    assert_eq!(graph.head(1), 1);
    assert_eq!(graph.tail(-1), 1);
    assert_eq!(graph.head(-1), 0);
}

#[test]
fn can_keep_opposite_involution() {
    let (graph, arcs) = create_simple_graph();

    for arc in arcs {
        assert_eq!(graph.opposite(graph.opposite(arc)), arc);
        assert_eq!(graph.head(arc), graph.tail(graph.opposite(arc)));
        assert_eq!(graph.tail(arc), graph.head(graph.opposite(arc)));
        assert!(!graph.is_direct(graph.opposite(arc)));
    }
}

#[test]
fn can_iterate_incident_arcs_in_both_directions() {
    let (graph, _) = create_simple_graph();

    assert_eq!(graph.incident_arcs(0), &[1, 3]);
    assert_eq!(graph.incident_arcs(1), &[-1, 2]);
    assert_eq!(graph.incident_arcs(2), &[-2, -3]);
}

#[test]
fn can_reject_invalid_arcs() {
    let (graph, _) = create_simple_graph();

    assert!(!graph.is_arc_valid(0));
    assert!(!graph.is_arc_valid(4));
    assert!(!graph.is_arc_valid(-4));
    assert!(graph.is_arc_valid(-3));
}

parameterized_test! {can_store_signed_arc_values, (arc, value), {
    can_store_signed_arc_values_impl(arc, value);
}}

can_store_signed_arc_values! {
    case_01_direct: (1, 5),
    case_02_reverse: (-1, 7),
    case_03_last: (3, 11),
    case_04_last_reverse: (-3, 13),
}

fn can_store_signed_arc_values_impl(arc: ArcIndex, value: i64) {
    let mut values = SignedArcVec::new(3, 0);

    values.set(arc, value);
    values.add(arc, 1);

    assert_eq!(values.get(arc), value + 1);
    assert_eq!(values.get(-arc), 0);
}
