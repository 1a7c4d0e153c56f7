use mate_core::ast::{ClassDef, Expression, MethodDef};
use mate_interpreter::config::{EnvironmentStorage, VmConfig};
use mate_interpreter::error::MateError;
use mate_interpreter::frame::ExecutionLevel;
use mate_interpreter::invokable::Return;
use mate_interpreter::universe::Universe;
use mate_interpreter::value::Value;
use mate_interpreter::SOMRef;

use mate_interpreter::class::Class;

fn setup_universe(config: VmConfig) -> Universe {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut universe = Universe::new(config);
    universe
        .define_class(&cell_class())
        .expect("could not define 'Cell'");
    universe
}

fn send(universe: &mut Universe, selector: &str, receiver: Value, args: Vec<Value>) -> Value {
    match universe.send(selector, receiver, args, Value::Nil, ExecutionLevel::Base) {
        Return::Local(value) => value,
        ret => panic!("'#{}' did not return locally: {:?}", selector, ret),
    }
}

fn unary(signature: &str, exprs: Vec<Expression>) -> MethodDef {
    MethodDef::new(signature, &[], &[], exprs)
}

fn lookup_class(universe: &mut Universe, name: &str) -> SOMRef<Class> {
    let symbol = universe.intern_symbol(name);
    match universe.lookup_global(symbol) {
        Some(Value::Class(class)) => class,
        _ => panic!("'{}' is not a class", name),
    }
}

/// `Cell = ( | value | set: v = ( value := v ) get = ( ^ value ) ... )`
fn cell_class() -> ClassDef {
    ClassDef::new("Cell")
        .with_instance_locals(&["value"])
        .with_instance_method(MethodDef::new(
            "set:",
            &["v"],
            &[],
            vec![Expression::exit(Expression::assign(
                "value",
                Expression::reference("v"),
            ))],
        ))
        .with_instance_method(unary(
            "get",
            vec![Expression::exit(Expression::reference("value"))],
        ))
        .with_instance_method(MethodDef::new(
            "identity:",
            &["x"],
            &[],
            vec![Expression::exit(Expression::reference("x"))],
        ))
        .with_instance_method(MethodDef::new(
            "setWith:in:",
            &["v", "environment"],
            &[],
            vec![
                Expression::send(
                    Expression::block(
                        &[],
                        &[],
                        vec![Expression::send(
                            Expression::reference("self"),
                            "set:",
                            vec![Expression::reference("v")],
                        )],
                    ),
                    "valueWithEnvironment:",
                    vec![Expression::reference("environment")],
                ),
                Expression::exit(Expression::reference("value")),
            ],
        ))
}

fn new_cell(universe: &mut Universe) -> Value {
    let class = lookup_class(universe, "Cell");
    universe.instantiate(&class)
}

/// Define a meta-object class with the given meta-methods, and answer one of its instances.
fn metaobject(universe: &mut Universe, name: &str, methods: Vec<MethodDef>) -> Value {
    let defn = methods
        .into_iter()
        .fold(ClassDef::new(name), |defn, method| defn.with_instance_method(method));
    let class = universe.define_class(&defn).expect("could not define meta-object class");
    universe.instantiate(&class)
}

/// Answer a fresh environment with `metaobject` in the slot set through `setter`.
fn new_environment(universe: &mut Universe, setter: &str, metaobject: Value) -> Value {
    let class = universe.environment_class();
    let environment = universe.instantiate(&class);
    send(universe, setter, environment.clone(), vec![metaobject]);
    environment
}

/// `write: index value: value = ( self instVarAt: index put: <stored>. ^ <stored> )`
fn storing(stored: i64) -> MethodDef {
    MethodDef::new(
        "write:value:",
        &["index", "value"],
        &[],
        vec![
            Expression::send(
                Expression::reference("self"),
                "instVarAt:put:",
                vec![Expression::reference("index"), Expression::integer(stored)],
            ),
            Expression::exit(Expression::integer(stored)),
        ],
    )
}

#[test]
fn global_write_interception_can_be_removed() {
    let mut universe = setup_universe(VmConfig::default());
    let zeroing = metaobject(&mut universe, "Zeroing", vec![storing(0)]);
    let environment = new_environment(&mut universe, "semantics:", zeroing);
    let cell = new_cell(&mut universe);

    assert_eq!(send(&mut universe, "set:", cell.clone(), vec![Value::Integer(5)]), Value::Integer(5));

    let environment_class = Value::Class(universe.environment_class());
    send(&mut universe, "global:", environment_class.clone(), vec![environment.clone()]);
    assert_eq!(send(&mut universe, "global", environment_class.clone(), vec![]), environment);

    for value in 1..=3 {
        let answer = send(&mut universe, "set:", cell.clone(), vec![Value::Integer(value)]);
        assert_eq!(answer, Value::Integer(0));
        assert_eq!(universe.read_field(&cell, 0).unwrap(), Value::Integer(0));
    }

    send(&mut universe, "global:", environment_class, vec![Value::Nil]);
    send(&mut universe, "set:", cell.clone(), vec![Value::Integer(7)]);
    assert_eq!(universe.read_field(&cell, 0).unwrap(), Value::Integer(7));
    assert_eq!(send(&mut universe, "get", cell, vec![]), Value::Integer(7));
}

#[test]
fn unoptimized_checks_behave_the_same() {
    let mut universe = setup_universe(VmConfig::default().with_optimized_semantic_checks(false));
    let zeroing = metaobject(&mut universe, "Zeroing", vec![storing(0)]);
    let environment = new_environment(&mut universe, "semantics:", zeroing);
    let cell = new_cell(&mut universe);

    universe.install_global_environment(environment);
    send(&mut universe, "set:", cell.clone(), vec![Value::Integer(5)]);
    assert_eq!(universe.read_field(&cell, 0).unwrap(), Value::Integer(0));

    universe.install_global_environment(Value::Nil);
    send(&mut universe, "set:", cell.clone(), vec![Value::Integer(5)]);
    assert_eq!(universe.read_field(&cell, 0).unwrap(), Value::Integer(5));
}

#[test]
fn global_interception_takes_precedence_over_objects() {
    let mut universe = setup_universe(VmConfig::default());

    // counts its own invocations in a class-side variable
    let nines = ClassDef::new("Nines")
        .with_static_locals(&["calls"])
        .with_static_method(unary(
            "reset",
            vec![Expression::assign("calls", Expression::integer(0))],
        ))
        .with_static_method(unary(
            "bump",
            vec![Expression::assign(
                "calls",
                Expression::binary("+", Expression::reference("calls"), Expression::integer(1)),
            )],
        ))
        .with_instance_method(MethodDef::new(
            "write:value:",
            &["index", "value"],
            &[],
            vec![
                Expression::send(Expression::reference("Nines"), "bump", vec![]),
                Expression::send(
                    Expression::reference("self"),
                    "instVarAt:put:",
                    vec![Expression::reference("index"), Expression::integer(99)],
                ),
                Expression::exit(Expression::integer(99)),
            ],
        ));
    let nines = universe.define_class(&nines).unwrap();
    let nines_class = Value::Class(nines.clone());
    send(&mut universe, "reset", nines_class.clone(), vec![]);
    let nines = universe.instantiate(&nines);

    let zeroing = metaobject(&mut universe, "Zeroing", vec![storing(0)]);
    let global = new_environment(&mut universe, "semantics:", zeroing);
    let local = new_environment(&mut universe, "semantics:", nines);

    let cell = new_cell(&mut universe);
    send(&mut universe, "installEnvironment:", cell.clone(), vec![local.clone()]);
    assert_eq!(send(&mut universe, "environment", cell.clone(), vec![]), local);

    send(&mut universe, "set:", cell.clone(), vec![Value::Integer(5)]);
    assert_eq!(universe.read_field(&cell, 0).unwrap(), Value::Integer(99));
    assert_eq!(universe.read_field(&nines_class, 0).unwrap(), Value::Integer(1));

    universe.install_global_environment(global);
    send(&mut universe, "set:", cell.clone(), vec![Value::Integer(5)]);
    assert_eq!(universe.read_field(&cell, 0).unwrap(), Value::Integer(0));
    assert_eq!(universe.read_field(&nines_class, 0).unwrap(), Value::Integer(1));

    // other cells are not affected by the object-level environment
    universe.install_global_environment(Value::Nil);
    let other = new_cell(&mut universe);
    send(&mut universe, "set:", other.clone(), vec![Value::Integer(5)]);
    assert_eq!(universe.read_field(&other, 0).unwrap(), Value::Integer(5));
}

#[test]
fn meta_level_code_is_not_intercepted() {
    let mut universe = setup_universe(VmConfig::default());

    // writes through the intercepted object's own setter, which would recurse forever at base level
    let reentrant = metaobject(
        &mut universe,
        "Reentrant",
        vec![MethodDef::new(
            "write:value:",
            &["index", "value"],
            &[],
            vec![Expression::exit(Expression::send(
                Expression::reference("self"),
                "set:",
                vec![Expression::binary(
                    "+",
                    Expression::reference("value"),
                    Expression::integer(1),
                )],
            ))],
        )],
    );
    let environment = new_environment(&mut universe, "semantics:", reentrant);
    let cell = new_cell(&mut universe);
    send(&mut universe, "installEnvironment:", cell.clone(), vec![environment]);

    let answer = send(&mut universe, "set:", cell.clone(), vec![Value::Integer(5)]);
    assert_eq!(answer, Value::Integer(6));
    assert_eq!(universe.read_field(&cell, 0).unwrap(), Value::Integer(6));

    let answer = universe.send(
        "set:",
        cell.clone(),
        vec![Value::Integer(1)],
        Value::Nil,
        ExecutionLevel::Meta,
    );
    assert!(matches!(answer, Return::Local(Value::Integer(1))));
    assert_eq!(universe.read_field(&cell, 0).unwrap(), Value::Integer(1));
}

#[test]
fn field_reads_receive_one_based_indices() {
    let mut universe = setup_universe(VmConfig::default());
    let indexer = metaobject(
        &mut universe,
        "Indexer",
        vec![MethodDef::new(
            "read:",
            &["index"],
            &[],
            vec![Expression::exit(Expression::binary(
                "*",
                Expression::reference("index"),
                Expression::integer(10),
            ))],
        )],
    );
    let environment = new_environment(&mut universe, "semantics:", indexer);
    let cell = new_cell(&mut universe);
    send(&mut universe, "set:", cell.clone(), vec![Value::Integer(3)]);
    send(&mut universe, "installEnvironment:", cell.clone(), vec![environment]);

    assert_eq!(send(&mut universe, "get", cell.clone(), vec![]), Value::Integer(10));
    assert_eq!(universe.read_field(&cell, 0).unwrap(), Value::Integer(3));
}

#[test]
fn layout_metaobjects_intercept_primitive_field_access() {
    let mut universe = setup_universe(VmConfig::default());
    let zeroing = metaobject(&mut universe, "Zeroing", vec![storing(0)]);
    let environment = new_environment(&mut universe, "layout:", zeroing);
    let cell = new_cell(&mut universe);
    send(&mut universe, "installEnvironment:", cell.clone(), vec![environment]);

    send(&mut universe, "instVarAt:put:", cell.clone(), vec![Value::Integer(1), Value::Integer(8)]);
    assert_eq!(universe.read_field(&cell, 0).unwrap(), Value::Integer(0));

    // compiled field writes go through the layout-level accessor too
    send(&mut universe, "set:", cell.clone(), vec![Value::Integer(8)]);
    assert_eq!(universe.read_field(&cell, 0).unwrap(), Value::Integer(0));
}

#[test]
fn environment_changes_reach_cached_decisions() {
    let mut universe = setup_universe(VmConfig::default());
    let zeroing = metaobject(&mut universe, "Zeroing", vec![storing(0)]);
    let environment = new_environment(&mut universe, "semantics:", zeroing.clone());
    let cell = new_cell(&mut universe);
    send(&mut universe, "installEnvironment:", cell.clone(), vec![environment.clone()]);

    send(&mut universe, "set:", cell.clone(), vec![Value::Integer(4)]);
    assert_eq!(universe.read_field(&cell, 0).unwrap(), Value::Integer(0));

    send(&mut universe, "semantics:", environment.clone(), vec![Value::Nil]);
    send(&mut universe, "set:", cell.clone(), vec![Value::Integer(4)]);
    assert_eq!(universe.read_field(&cell, 0).unwrap(), Value::Integer(4));

    send(&mut universe, "semantics:", environment.clone(), vec![zeroing]);
    send(&mut universe, "set:", cell.clone(), vec![Value::Integer(4)]);
    assert_eq!(universe.read_field(&cell, 0).unwrap(), Value::Integer(0));

    send(&mut universe, "installEnvironment:", cell.clone(), vec![Value::Nil]);
    send(&mut universe, "set:", cell.clone(), vec![Value::Integer(4)]);
    assert_eq!(universe.read_field(&cell, 0).unwrap(), Value::Integer(4));
}

#[test]
fn environments_can_live_in_objects() {
    let config = VmConfig::default().with_environment_storage(EnvironmentStorage::InObject);
    let mut universe = setup_universe(config);
    let zeroing = metaobject(&mut universe, "Zeroing", vec![storing(0)]);
    let environment = new_environment(&mut universe, "semantics:", zeroing);

    let cell_class = Value::Class(lookup_class(&mut universe, "Cell"));
    let cell = send(&mut universe, "basicNew:", cell_class, vec![environment.clone()]);
    let plain = new_cell(&mut universe);
    assert_eq!(send(&mut universe, "environment", cell.clone(), vec![]), environment);

    for _ in 0..3 {
        send(&mut universe, "set:", cell.clone(), vec![Value::Integer(5)]);
        send(&mut universe, "set:", plain.clone(), vec![Value::Integer(5)]);
        assert_eq!(universe.read_field(&cell, 0).unwrap(), Value::Integer(0));
        assert_eq!(universe.read_field(&plain, 0).unwrap(), Value::Integer(5));
    }
}

#[test]
fn activation_environments_follow_sends() {
    let mut universe = setup_universe(VmConfig::default());
    let zeroing = metaobject(&mut universe, "Zeroing", vec![storing(0)]);
    let environment = new_environment(&mut universe, "semantics:", zeroing);
    let cell = new_cell(&mut universe);

    let answer = send(
        &mut universe,
        "setWith:in:",
        cell.clone(),
        vec![Value::Integer(5), environment.clone()],
    );
    assert_eq!(answer, Value::Integer(0));

    let answer = send(
        &mut universe,
        "setWith:in:",
        cell.clone(),
        vec![Value::Integer(5), Value::Nil],
    );
    assert_eq!(answer, Value::Integer(5));

    // an environment handed to `send` applies to the activation it creates
    universe.send(
        "set:",
        cell.clone(),
        vec![Value::Integer(9)],
        environment,
        ExecutionLevel::Base,
    );
    assert_eq!(universe.read_field(&cell, 0).unwrap(), Value::Integer(0));
}

#[test]
fn returns_and_arguments_can_be_intercepted() {
    let mut universe = setup_universe(VmConfig::default());
    let doubler = metaobject(
        &mut universe,
        "Doubler",
        vec![MethodDef::new(
            "return:",
            &["value"],
            &[],
            vec![Expression::exit(Expression::binary(
                "*",
                Expression::reference("value"),
                Expression::integer(2),
            ))],
        )],
    );
    let environment = new_environment(&mut universe, "semantics:", doubler);
    let cell = new_cell(&mut universe);
    send(&mut universe, "set:", cell.clone(), vec![Value::Integer(21)]);
    send(&mut universe, "installEnvironment:", cell.clone(), vec![environment]);
    assert_eq!(send(&mut universe, "get", cell, vec![]), Value::Integer(42));

    let indexer = metaobject(
        &mut universe,
        "ArgumentIndexer",
        vec![MethodDef::new(
            "localArgument:inFrame:",
            &["index", "args"],
            &[],
            vec![Expression::exit(Expression::reference("index"))],
        )],
    );
    let environment = new_environment(&mut universe, "semantics:", indexer);
    let cell = new_cell(&mut universe);
    send(&mut universe, "installEnvironment:", cell.clone(), vec![environment]);
    assert_eq!(
        send(&mut universe, "identity:", cell, vec![Value::Integer(99)]),
        Value::Integer(1)
    );
}

#[test]
fn message_lookup_and_activation_can_be_redirected() {
    let mut universe = setup_universe(VmConfig::default());
    let target = ClassDef::new("Target")
        .with_instance_method(unary("original", vec![Expression::exit(Expression::integer(1))]))
        .with_instance_method(unary("other", vec![Expression::exit(Expression::integer(2))]))
        .with_instance_method(MethodDef::new(
            "echo:",
            &["x"],
            &[],
            vec![Expression::exit(Expression::reference("x"))],
        ));
    let target = universe.define_class(&target).unwrap();

    let redirector = metaobject(
        &mut universe,
        "Redirector",
        vec![MethodDef::new(
            "find:since:",
            &["selector", "class"],
            &[],
            vec![Expression::exit(Expression::send(
                Expression::reference("class"),
                "lookup:",
                vec![Expression::symbol("other")],
            ))],
        )],
    );
    let environment = new_environment(&mut universe, "message:", redirector);
    let redirected = universe.instantiate(&target);
    send(&mut universe, "installEnvironment:", redirected.clone(), vec![environment]);
    assert_eq!(send(&mut universe, "original", redirected, vec![]), Value::Integer(2));

    let rewriter = metaobject(
        &mut universe,
        "Rewriter",
        vec![MethodDef::new(
            "activate:withArguments:",
            &["method", "args"],
            &[],
            vec![
                Expression::send(
                    Expression::reference("args"),
                    "at:put:",
                    vec![Expression::integer(2), Expression::integer(100)],
                ),
                Expression::exit(Expression::reference("args")),
            ],
        )],
    );
    let environment = new_environment(&mut universe, "message:", rewriter);
    let rewritten = universe.instantiate(&target);
    send(&mut universe, "installEnvironment:", rewritten.clone(), vec![environment]);
    assert_eq!(
        send(&mut universe, "echo:", rewritten.clone(), vec![Value::Integer(5)]),
        Value::Integer(100)
    );
    assert_eq!(send(&mut universe, "original", rewritten, vec![]), Value::Integer(1));
}

#[test]
fn lookup_answers_are_validated() {
    let mut universe = setup_universe(VmConfig::default());
    let target = ClassDef::new("Target")
        .with_instance_method(unary("original", vec![Expression::exit(Expression::integer(1))]));
    let target = universe.define_class(&target).unwrap();

    let hiding = metaobject(
        &mut universe,
        "Hiding",
        vec![MethodDef::new(
            "find:since:",
            &["selector", "class"],
            &[],
            vec![Expression::exit(Expression::reference("nil"))],
        )],
    );
    let environment = new_environment(&mut universe, "message:", hiding);
    let hidden = universe.instantiate(&target);
    send(&mut universe, "installEnvironment:", hidden.clone(), vec![environment]);
    let ret = universe.send("original", hidden, vec![], Value::Nil, ExecutionLevel::Base);
    assert!(matches!(ret, Return::Exception(MateError::MessageNotUnderstood { .. })));

    let confused = metaobject(
        &mut universe,
        "Confused",
        vec![MethodDef::new(
            "find:since:",
            &["selector", "class"],
            &[],
            vec![Expression::exit(Expression::integer(3))],
        )],
    );
    let environment = new_environment(&mut universe, "message:", confused);
    let object = universe.instantiate(&target);
    send(&mut universe, "installEnvironment:", object.clone(), vec![environment]);
    let ret = universe.send("original", object, vec![], Value::Nil, ExecutionLevel::Base);
    assert!(matches!(
        ret,
        Return::Exception(MateError::InvalidReflectiveAnswer { .. })
    ));
}

#[test]
fn meta_method_failures_propagate() {
    let mut universe = setup_universe(VmConfig::default());
    let failing = metaobject(
        &mut universe,
        "Failing",
        vec![MethodDef::new(
            "write:value:",
            &["index", "value"],
            &[],
            vec![Expression::send(Expression::reference("self"), "explode", vec![])],
        )],
    );
    let environment = new_environment(&mut universe, "semantics:", failing);
    let cell = new_cell(&mut universe);
    send(&mut universe, "installEnvironment:", cell.clone(), vec![environment]);

    let ret = universe.send("set:", cell, vec![Value::Integer(1)], Value::Nil, ExecutionLevel::Base);
    match ret {
        Return::Exception(MateError::MessageNotUnderstood { class, selector }) => {
            assert_eq!(class, "Cell");
            assert_eq!(selector, "explode");
        }
        ret => panic!("expected the meta-method's failure, got {:?}", ret),
    }
}

#[test]
fn reflection_can_be_switched_off() {
    let mut universe = setup_universe(VmConfig::default());
    let zeroing = metaobject(&mut universe, "Zeroing", vec![storing(0)]);
    let environment = new_environment(&mut universe, "semantics:", zeroing);
    let cell = new_cell(&mut universe);
    universe.install_global_environment(environment);

    universe.set_reflection_active(false);
    send(&mut universe, "set:", cell.clone(), vec![Value::Integer(5)]);
    assert_eq!(universe.read_field(&cell, 0).unwrap(), Value::Integer(5));

    universe.set_reflection_active(true);
    send(&mut universe, "set:", cell.clone(), vec![Value::Integer(5)]);
    assert_eq!(universe.read_field(&cell, 0).unwrap(), Value::Integer(0));

    // nodes compiled without reflection never consult environments
    let mut universe = setup_universe(VmConfig::default().with_reflection(false));
    let zeroing = metaobject(&mut universe, "Zeroing", vec![storing(0)]);
    let environment = new_environment(&mut universe, "semantics:", zeroing);
    let cell = new_cell(&mut universe);
    universe.install_global_environment(environment);
    send(&mut universe, "set:", cell.clone(), vec![Value::Integer(5)]);
    assert_eq!(universe.read_field(&cell, 0).unwrap(), Value::Integer(5));
}

#[test]
fn only_environments_act_as_environments() {
    let mut universe = setup_universe(VmConfig::default());
    let zeroing = metaobject(&mut universe, "Zeroing", vec![storing(0)]);

    // a plain object whose first field happens to hold a meta-object
    let impostor = new_cell(&mut universe);
    universe.write_field(&impostor, 0, zeroing.clone()).unwrap();
    let cell = new_cell(&mut universe);
    send(&mut universe, "installEnvironment:", cell.clone(), vec![impostor]);
    send(&mut universe, "set:", cell.clone(), vec![Value::Integer(5)]);
    assert_eq!(universe.read_field(&cell, 0).unwrap(), Value::Integer(5));

    let tracing = ClassDef::new("TracingEnvironment").with_super_class("Environment");
    let tracing = universe.define_class(&tracing).unwrap();
    let environment = universe.instantiate(&tracing);
    send(&mut universe, "semantics:", environment.clone(), vec![zeroing]);
    let cell = new_cell(&mut universe);
    send(&mut universe, "installEnvironment:", cell.clone(), vec![environment]);
    send(&mut universe, "set:", cell.clone(), vec![Value::Integer(5)]);
    assert_eq!(universe.read_field(&cell, 0).unwrap(), Value::Integer(0));
}
