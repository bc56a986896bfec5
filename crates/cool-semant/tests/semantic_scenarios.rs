use cool_common::{sym, Symbol};
use cool_semant::ast::{
    Attribute, BinaryOp, Branch, Class, Expr, Feature, Formal, Method, Program, UntypedExprs,
    Visitor,
};
use cool_semant::semantic::InheritanceGraph;
use cool_semant::{analyze, Halt, HaltStage};

// ============================================================================
// Helpers
// ============================================================================

fn method(name: &str, formals: Vec<Formal>, ret: &str, body: Expr, line: u32) -> Feature {
    Feature::Method(Method::new(name, formals, ret, body, line))
}

fn attr(name: &str, ty: &str, line: u32) -> Feature {
    Feature::Attribute(Attribute::new(name, ty, Expr::no_expr(), line))
}

fn class(name: &str, parent: &str, features: Vec<Feature>, line: u32) -> Class {
    Class::new(name, parent, features, "test.cl", line)
}

/// `class Main { main(): Object { body } }`
fn main_with(body: Expr) -> Class {
    class("Main", "Object", vec![method("main", vec![], "Object", body, 2)], 1)
}

fn trivial_main() -> Class {
    main_with(Expr::int(0, 2))
}

fn halt_messages(halt: &Halt) -> Vec<String> {
    halt.diagnostics
        .diagnostics()
        .iter()
        .map(|d| d.to_string())
        .collect()
}

fn method_body<'a>(program: &'a Program, class: &str, method: &str) -> &'a Expr {
    let class = program
        .classes
        .iter()
        .find(|c| c.name == Symbol::intern(class))
        .expect("class present");
    &class
        .find_method(Symbol::intern(method))
        .expect("method present")
        .body
}

fn type_of(expr: &Expr) -> &'static str {
    expr.static_type().expect("expression typed").as_str()
}

// ============================================================================
// Scenarios
// ============================================================================

#[test]
fn self_type_return_takes_receiver_type() {
    // class A { copyself(): SELF_TYPE { self } };
    // class B inherits A {};
    // class Main { main(): Object { (new B).copyself() } };
    let a = class(
        "A",
        "Object",
        vec![method("copyself", vec![], "SELF_TYPE", Expr::self_ref(2), 2)],
        1,
    );
    let b = class("B", "A", vec![], 4);
    let main = main_with(Expr::dispatch(Expr::new_object("B", 7), "copyself", vec![], 7));

    let program = analyze(Program {
        classes: vec![a, b, main],
    })
    .expect("program is well typed")
    .into_program();

    assert_eq!(type_of(method_body(&program, "Main", "main")), "B");
    assert_eq!(type_of(method_body(&program, "A", "copyself")), "SELF_TYPE");
}

#[test]
fn plain_return_type_is_not_specialized() {
    let a = class(
        "A",
        "Object",
        vec![method("f", vec![], "A", Expr::new_object("A", 2), 2)],
        1,
    );
    let b = class("B", "A", vec![], 4);
    let main = main_with(Expr::dispatch(Expr::new_object("B", 7), "f", vec![], 7));

    let program = analyze(Program {
        classes: vec![a, b, main],
    })
    .unwrap()
    .into_program();
    assert_eq!(type_of(method_body(&program, "Main", "main")), "A");
}

#[test]
fn argument_mismatch_reports_once_and_types_as_object() {
    // class C { x: Int; m(y: Int): Int { x + y } };
    let c = class(
        "C",
        "Object",
        vec![
            attr("x", "Int", 2),
            method(
                "m",
                vec![Formal::new("y", "Int", 3)],
                "Int",
                Expr::binary(BinaryOp::Add, Expr::object("x", 3), Expr::object("y", 3), 3),
                3,
            ),
        ],
        1,
    );
    let main = main_with(Expr::dispatch(
        Expr::new_object("C", 6),
        "m",
        vec![Expr::boolean(true, 6)],
        6,
    ));
    let classes = vec![c, main];

    let halt = analyze(Program {
        classes: classes.clone(),
    })
    .unwrap_err();
    assert_eq!(halt.stage, HaltStage::Semantic);
    assert_eq!(
        halt_messages(&halt),
        vec!["test.cl:6: In call of method m, type Bool of parameter y does not conform to declared type Int."]
    );

    // Run the type pass on its own to inspect the decorated call.
    let graph = InheritanceGraph::build(classes);
    graph.validate().unwrap();
    let _ = cool_semant::semantic::resolver::Resolver::new(&graph).resolve();
    let main = graph.find(sym::MAIN).unwrap().class();
    let body = &main.find_method(sym::MAIN_METHOD).unwrap().body;
    assert_eq!(type_of(body), "Object");
}

#[test]
fn inheriting_from_int_halts_before_type_checking() {
    // The method body would be a type error, but it must never be checked.
    let d = class(
        "D",
        "Int",
        vec![method("f", vec![], "Int", Expr::string("s", 2), 2)],
        1,
    );
    let halt = analyze(Program {
        classes: vec![d, trivial_main()],
    })
    .unwrap_err();
    assert_eq!(halt.stage, HaltStage::Hierarchy);
    assert_eq!(
        halt_messages(&halt),
        vec!["test.cl:1: Class D cannot inherit from basic class Int."]
    );
}

#[test]
fn mutual_inheritance_reports_both_classes() {
    let e = class("E", "F", vec![], 1);
    let f = class("F", "E", vec![], 2);
    let halt = analyze(Program {
        classes: vec![e, f, trivial_main()],
    })
    .unwrap_err();
    assert_eq!(halt.stage, HaltStage::Hierarchy);
    let msgs = halt_messages(&halt);
    assert_eq!(msgs.len(), 2, "{:?}", msgs);
    assert!(msgs[0].contains("Class E, or an ancestor of E, is involved in an inheritance cycle."));
    assert!(msgs[1].contains("Class F, or an ancestor of F, is involved in an inheritance cycle."));
}

#[test]
fn duplicate_case_branch_reported_once() {
    // case (new Object) of i : Int => 1; j : Int => 2; s : String => "s"; esac
    let case = Expr::case(
        Expr::new_object("Object", 3),
        vec![
            Branch::new("i", "Int", Expr::int(1, 4), 4),
            Branch::new("j", "Int", Expr::int(2, 5), 5),
            Branch::new("s", "String", Expr::string("s", 6), 6),
        ],
        3,
    );
    let classes = vec![main_with(case)];

    let halt = analyze(Program {
        classes: classes.clone(),
    })
    .unwrap_err();
    assert_eq!(
        halt_messages(&halt),
        vec!["test.cl:5: Duplicate branch Int in case statement."]
    );

    let graph = InheritanceGraph::build(classes);
    graph.validate().unwrap();
    let _ = cool_semant::semantic::resolver::Resolver::new(&graph).resolve();
    let main = graph.find(sym::MAIN).unwrap().class();
    let body = &main.find_method(sym::MAIN_METHOD).unwrap().body;
    assert_eq!(type_of(body), "Object");
}

#[test]
fn missing_main_halts_with_no_other_errors() {
    let halt = analyze(Program {
        classes: vec![class("A", "Object", vec![], 1)],
    })
    .unwrap_err();
    assert_eq!(halt.stage, HaltStage::Semantic);
    assert_eq!(halt_messages(&halt), vec!["Class Main is not defined."]);
    assert_eq!(
        halt.to_string(),
        "Compilation halted due to static semantic errors."
    );
}

// ============================================================================
// Properties of a successful run
// ============================================================================

fn larger_program() -> Vec<Class> {
    // class Counter inherits IO {
    //   n: Int;
    //   bump(by: Int): SELF_TYPE { { n <- n + by; out_int(n); self; } };
    // };
    // class Main {
    //   main(): Object {
    //     let c : Counter <- new Counter in
    //       if isvoid c then 0 else c.bump(1).bump(2) fi
    //   };
    // };
    let counter = class(
        "Counter",
        "IO",
        vec![
            attr("n", "Int", 2),
            method(
                "bump",
                vec![Formal::new("by", "Int", 3)],
                "SELF_TYPE",
                Expr::block(
                    vec![
                        Expr::assign(
                            "n",
                            Expr::binary(BinaryOp::Add, Expr::object("n", 4), Expr::object("by", 4), 4),
                            4,
                        ),
                        Expr::dispatch(Expr::self_ref(5), "out_int", vec![Expr::object("n", 5)], 5),
                        Expr::self_ref(6),
                    ],
                    3,
                ),
                3,
            ),
        ],
        1,
    );
    let bumped = Expr::dispatch(
        Expr::dispatch(Expr::object("c", 13), "bump", vec![Expr::int(1, 13)], 13),
        "bump",
        vec![Expr::int(2, 13)],
        13,
    );
    let body = Expr::let_in(
        "c",
        "Counter",
        Expr::new_object("Counter", 12),
        Expr::cond(
            Expr::is_void(Expr::object("c", 13), 13),
            Expr::int(0, 13),
            bumped,
            13,
        ),
        12,
    );
    vec![counter, main_with(body)]
}

#[test]
fn every_expression_is_decorated() {
    let program = analyze(Program {
        classes: larger_program(),
    })
    .expect("program is well typed")
    .into_program();

    let mut untyped = UntypedExprs::default();
    untyped.visit_program(&program);
    assert!(untyped.lines.is_empty(), "untyped at {:?}", untyped.lines);

    // if isvoid c then 0 else c.bump(1).bump(2) fi : join(Int, Counter)
    assert_eq!(type_of(method_body(&program, "Main", "main")), "Object");
    assert_eq!(type_of(method_body(&program, "Counter", "bump")), "SELF_TYPE");
}

#[test]
fn tags_are_stable_across_revalidation() {
    let analysis = analyze(Program {
        classes: larger_program(),
    })
    .unwrap();
    let graph = analysis.graph();
    assert!(graph.validate().is_ok());
    assert_eq!(analysis.tags(), &graph.assign_tags());
    assert_eq!(graph.assign_tags(), graph.assign_tags());

    let tags = analysis.tags();
    assert_eq!(tags.get(sym::OBJECT), Some(0));
    // Counter sits under IO, so it follows IO directly in pre-order.
    let io = tags.get(sym::IO).unwrap();
    assert_eq!(tags.get(Symbol::intern("Counter")), Some(io + 1));
    assert_eq!(tags.len(), 7);
}

#[test]
fn decorated_tree_survives_json() {
    let program = analyze(Program {
        classes: larger_program(),
    })
    .unwrap()
    .into_program();

    let json = serde_json::to_string(&program).unwrap();
    let back: Program = serde_json::from_str(&json).unwrap();
    assert_eq!(back.classes.len(), 2);
    assert_eq!(type_of(method_body(&back, "Main", "main")), "Object");

    // An undecorated tree from the parser has no types and still loads.
    let raw = serde_json::to_string(&Program {
        classes: larger_program(),
    })
    .unwrap();
    let parsed: Program = serde_json::from_str(&raw).unwrap();
    assert!(method_body(&parsed, "Main", "main").static_type().is_none());
    assert!(analyze(parsed).is_ok());
}

#[test]
fn separate_runs_do_not_share_state() {
    let first = analyze(Program {
        classes: vec![class("Lonely", "Object", vec![attr("x", "Int", 2)], 1)],
    });
    assert!(first.is_err());

    let second = analyze(Program {
        classes: vec![class("Other", "Object", vec![attr("x", "Int", 2)], 1), trivial_main()],
    });
    assert!(second.is_ok());
}
