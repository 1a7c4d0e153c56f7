use mate_core::ast::{ClassDef, Expression, MethodDef};
use mate_interpreter::config::VmConfig;
use mate_interpreter::dispatch::{CallSite, DispatchKind};
use mate_interpreter::error::MateError;
use mate_interpreter::frame::{Context, ExecutionLevel};
use mate_interpreter::invokable::Return;
use mate_interpreter::universe::Universe;
use mate_interpreter::value::Value;

fn setup_universe(config: VmConfig) -> Universe {
    let _ = env_logger::builder().is_test(true).try_init();
    Universe::new(config)
}

fn send(universe: &mut Universe, selector: &str, receiver: Value, args: Vec<Value>) -> Return {
    universe.send(selector, receiver, args, Value::Nil, ExecutionLevel::Base)
}

fn expect_value(ret: Return) -> Value {
    match ret {
        Return::Local(value) => value,
        ret => panic!("expected a local return, got {:?}", ret),
    }
}

fn unary(signature: &str, exprs: Vec<Expression>) -> MethodDef {
    MethodDef::new(signature, &[], &[], exprs)
}

/// Defines `Tagged0`, `Tagged1`, ... each answering its own number to `tag`.
fn define_tagged_classes(universe: &mut Universe, count: usize) -> Vec<Value> {
    (0..count)
        .map(|idx| {
            let defn = ClassDef::new(format!("Tagged{}", idx)).with_instance_method(unary(
                "tag",
                vec![Expression::exit(Expression::integer(idx as i64))],
            ));
            let class = universe.define_class(&defn).expect("could not define class");
            universe.instantiate(&class)
        })
        .collect()
}

fn counter_class() -> ClassDef {
    ClassDef::new("Counter")
        .with_instance_locals(&["n"])
        .with_instance_method(unary(
            "initialize",
            vec![Expression::assign("n", Expression::integer(0))],
        ))
        .with_instance_method(unary(
            "inc",
            vec![Expression::assign(
                "n",
                Expression::binary("+", Expression::reference("n"), Expression::integer(1)),
            )],
        ))
        .with_instance_method(MethodDef::new(
            "run:",
            &["times"],
            &[],
            vec![
                Expression::send(
                    Expression::integer(1),
                    "to:do:",
                    vec![
                        Expression::reference("times"),
                        Expression::block(
                            &["i"],
                            &[],
                            vec![Expression::send(Expression::reference("self"), "inc", vec![])],
                        ),
                    ],
                ),
                Expression::exit(Expression::reference("n")),
            ],
        ))
}

#[test]
fn counter_increments_across_specialization() {
    for config in vec![
        VmConfig::default(),
        VmConfig::default().with_dispatch_warmup(0),
        VmConfig::default().with_reflection(false),
    ] {
        let mut universe = setup_universe(config);
        let class = universe
            .define_class(&counter_class())
            .expect("could not define 'Counter'");
        let counter = universe.instantiate(&class);

        expect_value(send(&mut universe, "initialize", counter.clone(), vec![]));
        let result = expect_value(send(
            &mut universe,
            "run:",
            counter.clone(),
            vec![Value::Integer(10)],
        ));

        assert_eq!(result, Value::Integer(10));
        assert_eq!(universe.read_field(&counter, 0).unwrap(), Value::Integer(10));
    }
}

#[test]
fn call_site_goes_through_every_state() {
    let mut universe = setup_universe(VmConfig::default());
    let receivers = define_tagged_classes(&mut universe, 7);
    let tag = universe.intern_symbol("tag");
    let site = CallSite::new(tag);
    let context = Context::base();

    let dispatch = |universe: &mut Universe, idx: usize| {
        let ret = site.dispatch(universe, vec![receivers[idx].clone()], &context);
        assert_eq!(expect_value(ret), Value::Integer(idx as i64));
        site.kind()
    };

    for _ in 0..5 {
        assert_eq!(dispatch(&mut universe, 0), DispatchKind::Uninitialized);
    }
    assert_eq!(dispatch(&mut universe, 0), DispatchKind::Cached(1));
    assert_eq!(dispatch(&mut universe, 0), DispatchKind::Cached(1));
    for idx in 1..6 {
        assert_eq!(dispatch(&mut universe, idx), DispatchKind::Cached(idx + 1));
    }
    for idx in 0..6 {
        assert_eq!(dispatch(&mut universe, idx), DispatchKind::Cached(6));
    }
    assert_eq!(dispatch(&mut universe, 6), DispatchKind::Megamorphic);
    for idx in 0..7 {
        assert_eq!(dispatch(&mut universe, idx), DispatchKind::Megamorphic);
    }
}

#[test]
fn chain_length_is_bounded() {
    let config = VmConfig::default()
        .with_dispatch_warmup(0)
        .with_inline_cache_size(3);
    let mut universe = setup_universe(config);
    let mut receivers = define_tagged_classes(&mut universe, 4);

    let tag = |value| vec![Expression::exit(Expression::integer(value))];
    let true_class = universe.true_class();
    let false_class = universe.false_class();
    let integer_class = universe.integer_class();
    universe.add_method(&true_class, &unary("tag", tag(100))).unwrap();
    universe.add_method(&false_class, &unary("tag", tag(200))).unwrap();
    universe.add_method(&integer_class, &unary("tag", tag(300))).unwrap();

    receivers.push(Value::Boolean(true));
    receivers.push(Value::Boolean(false));
    receivers.push(Value::Integer(42));
    let expected = [0, 1, 2, 3, 100, 200, 300];

    let site = CallSite::new(universe.intern_symbol("tag"));
    let mut longest = 0;
    for _ in 0..3 {
        for (receiver, expected) in receivers.iter().zip(expected.iter()) {
            let ret = site.dispatch(&mut universe, vec![receiver.clone()], &Context::base());
            assert_eq!(expect_value(ret), Value::Integer(*expected));
            if let DispatchKind::Cached(len) = site.kind() {
                longest = longest.max(len);
            }
        }
    }

    assert_eq!(longest, 3);
    assert_eq!(site.kind(), DispatchKind::Megamorphic);
}

#[test]
fn booleans_are_told_apart() {
    let mut universe = setup_universe(VmConfig::default().with_dispatch_warmup(0));
    let true_class = universe.true_class();
    let false_class = universe.false_class();
    universe
        .add_method(&true_class, &unary("tag", vec![Expression::exit(Expression::integer(1))]))
        .unwrap();
    universe
        .add_method(&false_class, &unary("tag", vec![Expression::exit(Expression::integer(0))]))
        .unwrap();

    let site = CallSite::new(universe.intern_symbol("tag"));
    for value in [true, false, true, false].iter().copied() {
        let ret = site.dispatch(&mut universe, vec![Value::Boolean(value)], &Context::base());
        assert_eq!(expect_value(ret), Value::Integer(value as i64));
    }
    assert_eq!(site.kind(), DispatchKind::Cached(2));
}

#[test]
fn unknown_selectors_reach_does_not_understand() {
    let mut universe = setup_universe(VmConfig::default());
    let ghost = ClassDef::new("Ghost")
        .with_instance_method(MethodDef::new(
            "doesNotUnderstand:arguments:",
            &["selector", "args"],
            &[],
            vec![Expression::exit(Expression::reference("selector"))],
        ))
        .with_instance_method(MethodDef::new(
            "poke:",
            &["other"],
            &[],
            vec![Expression::exit(Expression::send(
                Expression::reference("other"),
                "frobnicate:with:",
                vec![Expression::integer(1), Expression::integer(2)],
            ))],
        ));
    let ghost = universe.define_class(&ghost).expect("could not define 'Ghost'");
    let ghost = universe.instantiate(&ghost);
    let selector = Value::Symbol(universe.intern_symbol("frobnicate:with:"));

    // the same call site, cold then cached
    for _ in 0..10 {
        let ret = send(&mut universe, "poke:", ghost.clone(), vec![ghost.clone()]);
        assert_eq!(expect_value(ret), selector);
    }

    let ret = send(&mut universe, "poke:", ghost.clone(), vec![Value::Integer(3)]);
    match ret {
        Return::Exception(MateError::MessageNotUnderstood { class, selector }) => {
            assert_eq!(class, "Integer");
            assert_eq!(selector, "frobnicate:with:");
        }
        ret => panic!("expected a message-not-understood error, got {:?}", ret),
    }
}

#[test]
fn does_not_understand_receives_reified_arguments() {
    let mut universe = setup_universe(VmConfig::default());
    let recorder = ClassDef::new("Recorder").with_instance_method(MethodDef::new(
        "doesNotUnderstand:arguments:",
        &["selector", "args"],
        &[],
        vec![Expression::exit(Expression::send(
            Expression::reference("args"),
            "at:",
            vec![Expression::integer(2)],
        ))],
    ));
    let recorder = universe.define_class(&recorder).unwrap();
    let recorder = universe.instantiate(&recorder);

    let ret = send(
        &mut universe,
        "record:and:",
        recorder,
        vec![Value::Integer(1), Value::Integer(2)],
    );
    assert_eq!(expect_value(ret), Value::Integer(2));
}

#[test]
fn super_sends_start_from_the_lexical_superclass() {
    let mut universe = setup_universe(VmConfig::default());
    let base = ClassDef::new("Base").with_instance_method(unary(
        "describe",
        vec![Expression::exit(Expression::integer(1))],
    ));
    let derived = ClassDef::new("Derived")
        .with_super_class("Base")
        .with_instance_method(unary(
            "describe",
            vec![Expression::exit(Expression::binary(
                "+",
                Expression::send(Expression::reference("super"), "describe", vec![]),
                Expression::integer(10),
            ))],
        ))
        .with_instance_method(unary(
            "broken",
            vec![Expression::exit(Expression::send(
                Expression::reference("super"),
                "missing",
                vec![],
            ))],
        ));
    universe.define_class(&base).unwrap();
    let derived = universe.define_class(&derived).unwrap();
    let object = universe.instantiate(&derived);

    for _ in 0..3 {
        let ret = send(&mut universe, "describe", object.clone(), vec![]);
        assert_eq!(expect_value(ret), Value::Integer(11));
    }

    match send(&mut universe, "broken", object, vec![]) {
        Return::Exception(MateError::SuperLookupFailure { class, selector }) => {
            assert_eq!(class, "Base");
            assert_eq!(selector, "missing");
        }
        ret => panic!("expected a super lookup failure, got {:?}", ret),
    }
}

#[test]
fn block_sends_evaluate_the_block() {
    let mut universe = setup_universe(VmConfig::default().with_dispatch_warmup(0));
    let adder = ClassDef::new("Adder").with_instance_method(MethodDef::new(
        "apply:to:",
        &["block", "value"],
        &[],
        vec![Expression::exit(Expression::send(
            Expression::reference("block"),
            "value:",
            vec![Expression::reference("value")],
        ))],
    ))
    .with_instance_method(unary(
        "run",
        vec![Expression::exit(Expression::binary(
            "+",
            Expression::send(
                Expression::reference("self"),
                "apply:to:",
                vec![
                    Expression::block(
                        &["x"],
                        &[],
                        vec![Expression::binary(
                            "*",
                            Expression::reference("x"),
                            Expression::integer(2),
                        )],
                    ),
                    Expression::integer(20),
                ],
            ),
            Expression::send(
                Expression::reference("self"),
                "apply:to:",
                vec![
                    Expression::block(
                        &["x"],
                        &[],
                        vec![Expression::binary(
                            "+",
                            Expression::reference("x"),
                            Expression::integer(1),
                        )],
                    ),
                    Expression::integer(1),
                ],
            ),
        ))],
    ));
    let adder = universe.define_class(&adder).unwrap();
    let adder = universe.instantiate(&adder);

    for _ in 0..3 {
        let ret = send(&mut universe, "run", adder.clone(), vec![]);
        assert_eq!(expect_value(ret), Value::Integer(42));
    }
}

#[test]
fn redefined_methods_reach_warm_call_sites() {
    let mut universe = setup_universe(VmConfig::default().with_dispatch_warmup(0));
    let tagged = ClassDef::new("Tagged")
        .with_instance_method(unary("tag", vec![Expression::exit(Expression::integer(1))]))
        .with_instance_method(unary(
            "callTag",
            vec![Expression::exit(Expression::send(
                Expression::reference("self"),
                "tag",
                vec![],
            ))],
        ));
    let tagged = universe.define_class(&tagged).unwrap();
    let object = universe.instantiate(&tagged);

    let site = CallSite::new(universe.intern_symbol("tag"));
    for _ in 0..3 {
        let ret = send(&mut universe, "callTag", object.clone(), vec![]);
        assert_eq!(expect_value(ret), Value::Integer(1));
        let ret = site.dispatch(&mut universe, vec![object.clone()], &Context::base());
        assert_eq!(expect_value(ret), Value::Integer(1));
    }
    assert_eq!(site.kind(), DispatchKind::Cached(1));

    universe
        .add_method(&tagged, &unary("tag", vec![Expression::exit(Expression::integer(2))]))
        .unwrap();

    let ret = send(&mut universe, "tag", object.clone(), vec![]);
    assert_eq!(expect_value(ret), Value::Integer(2));
    let ret = send(&mut universe, "callTag", object.clone(), vec![]);
    assert_eq!(expect_value(ret), Value::Integer(2));
    let ret = site.dispatch(&mut universe, vec![object], &Context::base());
    assert_eq!(expect_value(ret), Value::Integer(2));
    assert_eq!(site.kind(), DispatchKind::Cached(1));
}

#[test]
fn redefined_methods_reach_resolved_super_sends() {
    let mut universe = setup_universe(VmConfig::default());
    let base = ClassDef::new("Base").with_instance_method(unary(
        "describe",
        vec![Expression::exit(Expression::integer(1))],
    ));
    let derived = ClassDef::new("Derived")
        .with_super_class("Base")
        .with_instance_method(unary(
            "describe",
            vec![Expression::exit(Expression::binary(
                "+",
                Expression::send(Expression::reference("super"), "describe", vec![]),
                Expression::integer(10),
            ))],
        ));
    let base = universe.define_class(&base).unwrap();
    let derived = universe.define_class(&derived).unwrap();
    let object = universe.instantiate(&derived);

    for _ in 0..3 {
        let ret = send(&mut universe, "describe", object.clone(), vec![]);
        assert_eq!(expect_value(ret), Value::Integer(11));
    }

    universe
        .add_method(&base, &unary("describe", vec![Expression::exit(Expression::integer(5))]))
        .unwrap();
    let ret = send(&mut universe, "describe", object, vec![]);
    assert_eq!(expect_value(ret), Value::Integer(15));
}
