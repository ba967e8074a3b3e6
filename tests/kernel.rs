//! End-to-end scenarios for `launch`, exercising the six cases spelled out
//! for the kernel's testable properties.

use dataflow_kernel::*;
use std::cell::RefCell;
use std::rc::Rc;

fn incr_node(graph: &mut Graph, next: Vec<NodeId>) -> NodeId {
    graph.insert_node(|id| {
        let seq = vec![
            Step::mov(Mov { from: MovFrom::Stack, to: MovTo::Stack, soft_read: false }),
            Step::compute(Compute {
                func: Some(Rc::new(|v, _, _, _| match v {
                    Value::Number(n) => Value::Number(n + 1.0),
                    other => other,
                })),
                safe: true,
                pure: true,
                filter: false,
            }),
        ];
        Node { next, ..Node::new(id, seq, vec![]) }
    })
}

fn double_node(graph: &mut Graph, next: Vec<NodeId>) -> NodeId {
    graph.insert_node(|id| {
        let seq = vec![Step::compute(Compute {
            func: Some(Rc::new(|v, _, _, _| match v {
                Value::Number(n) => Value::Number(n * 2.0),
                other => other,
            })),
            safe: true,
            pure: true,
            filter: false,
        })];
        Node { next, ..Node::new(id, seq, vec![]) }
    })
}

fn sink_node(graph: &mut Graph, sink: Rc<RefCell<Vec<Value>>>) -> NodeId {
    graph.insert_node(move |id| {
        let seq = vec![Step::compute(Compute {
            func: Some(Rc::new(move |v, _, _, _| {
                sink.borrow_mut().push(v.clone());
                v
            })),
            safe: true,
            pure: true,
            filter: false,
        })];
        Node::new(id, seq, vec![])
    })
}

#[test]
fn straight_line_execution_propagates_through_two_nodes() {
    let mut kernel = Kernel::new();
    let observed = Rc::new(RefCell::new(Vec::new()));
    let n2 = sink_node(&mut kernel.graph, observed.clone());
    let n2 = double_node(&mut kernel.graph, vec![n2]);
    let n1 = incr_node(&mut kernel.graph, vec![n2]);

    let unit = UnitId(0);
    kernel.graph.bind_unit(unit, n1);
    launch_unit(&mut kernel, unit, Value::Number(3.0));

    assert_eq!(*observed.borrow(), vec![Value::Number(8.0)]);
}

#[test]
fn filter_skip_stops_the_node_before_its_successor_runs() {
    let mut kernel = Kernel::new();
    let observed = Rc::new(RefCell::new(Vec::new()));
    let m = sink_node(&mut kernel.graph, observed.clone());

    let n = kernel.graph.insert_node(|id| {
        let seq = vec![
            Step::compute(Compute {
                func: Some(Rc::new(|v, _, _, _| match v {
                    Value::Number(n) => Value::Bool(n > 0.0),
                    _ => Value::Bool(false),
                })),
                safe: true,
                pure: true,
                filter: true,
            }),
            Step::compute(Compute {
                func: Some(Rc::new(|v, _, _, _| match v {
                    Value::Number(n) => Value::Number(n + 1.0),
                    other => other,
                })),
                safe: true,
                pure: true,
                filter: false,
            }),
        ];
        Node { next: vec![m], ..Node::new(id, seq, vec![]) }
    });

    let unit = UnitId(0);
    kernel.graph.bind_unit(unit, n);

    launch_unit(&mut kernel, unit, Value::Number(-1.0));
    assert!(observed.borrow().is_empty());

    launch_unit(&mut kernel, unit, Value::Number(1.0));
    assert_eq!(*observed.borrow(), vec![Value::Number(2.0)]);
}

#[test]
fn barrier_collapses_two_arrivals_into_one_execution() {
    let mut kernel = Kernel::new();
    let runs = Rc::new(RefCell::new(0));
    let runs_clone = runs.clone();

    let j = kernel.graph.insert_node(move |id| {
        let seq = vec![Step::compute(Compute {
            func: Some(Rc::new(move |v, _, _, _| {
                *runs_clone.borrow_mut() += 1;
                v
            })),
            safe: true,
            pure: true,
            filter: false,
        })
        .with_order(Order { priority: PriorityTag::Barrier, barrier_id: Some(7) })];
        Node::new(id, seq, vec![])
    });

    let a = kernel.graph.insert_node(|id| Node { next: vec![j], ..Node::new(id, vec![], vec![]) });
    let b = kernel.graph.insert_node(|id| Node { next: vec![j], ..Node::new(id, vec![], vec![]) });

    let unit_a = UnitId(0);
    let unit_b = UnitId(1);
    kernel.graph.bind_unit(unit_a, a);
    kernel.graph.bind_unit(unit_b, b);

    launch(
        &mut kernel,
        &[unit_a, unit_b],
        &[Value::Number(1.0), Value::Number(2.0)],
        LaunchConfig::default(),
    );

    assert_eq!(*runs.borrow(), 1);
}

#[test]
fn sampler_priority_orders_by_graph_compile_id_not_arrival_order() {
    let mut kernel = Kernel::new();
    let order = Rc::new(RefCell::new(Vec::new()));

    let mut sampler_node = |graph: &mut Graph, tag: &'static str, barrier_id: u64| {
        let order = order.clone();
        graph.insert_node(move |id| {
            let seq = vec![Step::compute(Compute {
                func: Some(Rc::new(move |v, _, _, _| {
                    order.borrow_mut().push(tag);
                    v
                })),
                safe: true,
                pure: true,
                filter: false,
            })
            .with_order(Order { priority: PriorityTag::Sampler, barrier_id: Some(barrier_id) })];
            Node::new(id, seq, vec![])
        })
    };

    let x = sampler_node(&mut kernel.graph, "x", 10);
    let y = sampler_node(&mut kernel.graph, "y", 3);

    let unit_x = UnitId(0);
    let unit_y = UnitId(1);
    kernel.graph.bind_unit(unit_x, x);
    kernel.graph.bind_unit(unit_y, y);

    launch(
        &mut kernel,
        &[unit_x, unit_y],
        &[Value::Null, Value::Null],
        LaunchConfig::default(),
    );

    assert_eq!(*order.borrow(), vec!["y", "x"]);
}

#[test]
fn scope_isolation_materializes_a_derived_value_only_under_the_scope() {
    let mut kernel = Kernel::new();
    let r0 = kernel.graph.alloc_ref_id();
    kernel.graph.insert_ref(StateRef::new(r0, Value::Number(5.0)));

    let r = kernel.graph.alloc_ref_id();
    let mut derived = StateRef::new(r, Value::Number(0.0));
    derived.before = Some(Rc::new(vec![BeforeCmd::Map { from: Some(r0), func: None }]));
    kernel.graph.insert_ref(derived);

    let observed_scoped = Rc::new(RefCell::new(Vec::new()));
    let observed_bare = Rc::new(RefCell::new(Vec::new()));

    let scope = Scope::new(false);

    let scoped_sink = observed_scoped.clone();
    let n_scoped = kernel.graph.insert_node(move |id| {
        let seq = vec![
            Step::mov(Mov { from: MovFrom::Store(r), to: MovTo::Stack, soft_read: false }),
            Step::compute(Compute {
                func: Some(Rc::new(move |v, _, _, _| {
                    scoped_sink.borrow_mut().push(v.clone());
                    v
                })),
                safe: true,
                pure: true,
                filter: false,
            }),
        ];
        Node::new(id, seq, vec![])
    });

    let bare_sink = observed_bare.clone();
    let n_bare = kernel.graph.insert_node(move |id| {
        let seq = vec![
            Step::mov(Mov { from: MovFrom::Store(r), to: MovTo::Stack, soft_read: false }),
            Step::compute(Compute {
                func: Some(Rc::new(move |v, _, _, _| {
                    bare_sink.borrow_mut().push(v.clone());
                    v
                })),
                safe: true,
                pure: true,
                filter: false,
            }),
        ];
        Node::new(id, seq, vec![])
    });

    let unit_scoped = UnitId(0);
    let unit_bare = UnitId(1);
    kernel.graph.bind_unit(unit_scoped, n_scoped);
    kernel.graph.bind_unit(unit_bare, n_bare);

    launch(
        &mut kernel,
        &[unit_scoped],
        &[Value::Null],
        LaunchConfig { fork_page: Some(scope), ..Default::default() },
    );
    launch_unit(&mut kernel, unit_bare, Value::Null);

    assert_eq!(*observed_scoped.borrow(), vec![Value::Number(5.0)]);
    assert_eq!(*observed_bare.borrow(), vec![Value::Number(0.0)]);
}

#[test]
fn reentrant_defer_joins_the_outer_drain_instead_of_starting_a_new_one() {
    let mut kernel = Kernel::new();
    let order = Rc::new(RefCell::new(Vec::new()));

    let order_clone = order.clone();
    let m = kernel.graph.insert_node(move |id| {
        let order = order_clone.clone();
        let seq = vec![Step::compute(Compute {
            func: Some(Rc::new(move |v, _, _, _| {
                order.borrow_mut().push("m");
                v
            })),
            safe: true,
            pure: true,
            filter: false,
        })];
        Node::new(id, seq, vec![])
    });

    let order_clone = order.clone();
    let n = kernel.graph.insert_node(move |id| {
        let order = order_clone.clone();
        let seq = vec![Step::compute(Compute {
            func: Some(Rc::new(move |v, _, _, queue| {
                order.borrow_mut().push("n");
                launch_reentrant(queue, m, Value::Null);
                v
            })),
            safe: true,
            pure: true,
            filter: false,
        })];
        Node::new(id, seq, vec![])
    });

    let unit_n = UnitId(0);
    kernel.graph.bind_unit(unit_n, n);
    launch_unit(&mut kernel, unit_n, Value::Null);

    assert_eq!(*order.borrow(), vec!["n", "m"]);
    assert!(kernel.is_root());
}
