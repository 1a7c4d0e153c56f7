use mate_core::ast::{ClassDef, Expression, MethodDef};
use mate_interpreter::config::VmConfig;
use mate_interpreter::error::MateError;
use mate_interpreter::frame::ExecutionLevel;
use mate_interpreter::invokable::Return;
use mate_interpreter::universe::Universe;
use mate_interpreter::value::Value;

fn setup_universe() -> Universe {
    let _ = env_logger::builder().is_test(true).try_init();
    Universe::new(VmConfig::default())
}

fn send(universe: &mut Universe, selector: &str, receiver: Value, args: Vec<Value>) -> Value {
    match universe.send(selector, receiver, args, Value::Nil, ExecutionLevel::Base) {
        Return::Local(value) => value,
        ret => panic!("'#{}' did not return locally: {:?}", selector, ret),
    }
}

fn point_class() -> ClassDef {
    ClassDef::new("Point")
        .with_instance_locals(&["x"])
        .with_instance_method(MethodDef::new(
            "x",
            &[],
            &[],
            vec![Expression::exit(Expression::reference("x"))],
        ))
        .with_instance_method(MethodDef::new(
            "x:",
            &["value"],
            &[],
            vec![Expression::assign("x", Expression::reference("value"))],
        ))
}

#[test]
fn fields_survive_layout_migration() {
    let mut universe = setup_universe();
    let point = universe.define_class(&point_class()).unwrap();
    let first = universe.instantiate(&point);
    let second = universe.instantiate(&point);

    for _ in 0..3 {
        send(&mut universe, "x:", first.clone(), vec![Value::Integer(3)]);
        assert_eq!(send(&mut universe, "x", first.clone(), vec![]), Value::Integer(3));
    }
    assert_eq!(universe.read_field(&second, 0).unwrap(), Value::Nil);

    let y = universe.define_field(&point, "y").unwrap();
    assert_eq!(y, 1);

    match &first {
        Value::Instance(instance) => {
            assert!(!instance.borrow().layout().is_valid());
            assert!(instance.borrow_mut().update_layout());
            assert!(!instance.borrow_mut().update_layout());
            assert!(instance.borrow().layout().is_valid());
        }
        value => panic!("expected an instance, got {:?}", value),
    }

    assert_eq!(universe.read_field(&first, 0).unwrap(), Value::Integer(3));
    assert_eq!(universe.read_field(&first, y).unwrap(), Value::Nil);
    assert_eq!(send(&mut universe, "x", first.clone(), vec![]), Value::Integer(3));

    // `second` never migrated explicitly: its first access does it
    universe.write_field(&second, y, Value::Integer(4)).unwrap();
    universe.write_field(&second, 0, Value::Integer(5)).unwrap();
    assert_eq!(universe.read_field(&second, y).unwrap(), Value::Integer(4));
    assert_eq!(send(&mut universe, "x", second.clone(), vec![]), Value::Integer(5));

    let fresh = universe.instantiate(&point);
    assert_eq!(universe.read_field(&fresh, y).unwrap(), Value::Nil);
    universe.write_field(&fresh, y, Value::Integer(6)).unwrap();
    assert_eq!(universe.read_field(&fresh, y).unwrap(), Value::Integer(6));
}

#[test]
fn field_round_trip_through_primitives() {
    let mut universe = setup_universe();
    let point = universe.define_class(&point_class()).unwrap();
    let object = universe.instantiate(&point);

    send(&mut universe, "instVarAt:put:", object.clone(), vec![Value::Integer(1), Value::Integer(7)]);
    assert_eq!(universe.read_field(&object, 0).unwrap(), Value::Integer(7));
    assert_eq!(
        send(&mut universe, "instVarAt:", object.clone(), vec![Value::Integer(1)]),
        Value::Integer(7)
    );

    let ret = universe.send(
        "instVarAt:",
        object,
        vec![Value::Integer(0)],
        Value::Nil,
        ExecutionLevel::Base,
    );
    assert!(matches!(ret, Return::Exception(_)));
}

#[test]
fn fields_cannot_be_added_below_subclasses() {
    let mut universe = setup_universe();
    let point = universe.define_class(&point_class()).unwrap();
    assert!(universe.define_field(&point, "x").is_err());

    let colored = ClassDef::new("ColoredPoint")
        .with_super_class("Point")
        .with_instance_locals(&["color"]);
    let colored = universe.define_class(&colored).unwrap();
    assert_eq!(colored.borrow().fields.len(), 2);

    assert!(universe.define_field(&point, "y").is_err());
    assert_eq!(universe.define_field(&colored, "alpha").unwrap(), 2);
}

#[test]
fn accessors_keep_working_across_many_layouts() {
    let mut universe = setup_universe();
    let defn = ClassDef::new("Bag")
        .with_instance_locals(&["a", "b", "c"])
        .with_instance_method(MethodDef::new(
            "a",
            &[],
            &[],
            vec![Expression::exit(Expression::reference("a"))],
        ))
        .with_instance_method(MethodDef::new(
            "a:",
            &["value"],
            &[],
            vec![Expression::assign("a", Expression::reference("value"))],
        ));
    let bag = universe.define_class(&defn).unwrap();

    // objects defining their fields in different orders end up with different layouts
    let mut bags = Vec::new();
    for idx in 0..10 {
        let object = universe.instantiate(&bag);
        if idx % 2 == 0 {
            universe.write_field(&object, 2, Value::Integer(0)).unwrap();
        }
        if idx % 3 == 0 {
            universe.write_field(&object, 1, Value::Integer(0)).unwrap();
        }
        send(&mut universe, "a:", object.clone(), vec![Value::Integer(idx)]);
        bags.push(object);
    }

    for (idx, object) in bags.iter().enumerate() {
        assert_eq!(
            send(&mut universe, "a", object.clone(), vec![]),
            Value::Integer(idx as i64)
        );
    }
}

#[test]
fn fields_are_bounded_by_the_class_definition() {
    let mut universe = setup_universe();
    let point = universe.define_class(&point_class()).unwrap();
    let object = universe.instantiate(&point);

    let ret = universe.send(
        "instVarAt:put:",
        object.clone(),
        vec![Value::Integer(2), Value::Integer(9)],
        Value::Nil,
        ExecutionLevel::Base,
    );
    assert!(matches!(ret, Return::Exception(MateError::Primitive { .. })));
    let ret = universe.send(
        "instVarAt:",
        object.clone(),
        vec![Value::Integer(2)],
        Value::Nil,
        ExecutionLevel::Base,
    );
    assert!(matches!(ret, Return::Exception(MateError::Primitive { .. })));

    match universe.write_field(&object, 1, Value::Integer(9)) {
        Err(MateError::FieldOutOfBounds { class, index, count }) => {
            assert_eq!(class, "Point");
            assert_eq!(index, 1);
            assert_eq!(count, 1);
        }
        ret => panic!("expected an out-of-bounds error, got {:?}", ret),
    }
    assert!(universe.read_field(&object, 1).is_err());
    assert!(universe.read_field(&Value::Integer(3), 0).is_err());

    // the refused writes left nothing behind for the new field to pick up
    let y = universe.define_field(&point, "y").unwrap();
    assert_eq!(y, 1);
    assert_eq!(universe.read_field(&object, y).unwrap(), Value::Nil);
    assert_eq!(
        send(&mut universe, "instVarAt:", object.clone(), vec![Value::Integer(2)]),
        Value::Nil
    );

    send(&mut universe, "instVarAt:put:", object.clone(), vec![Value::Integer(2), Value::Integer(9)]);
    assert_eq!(universe.read_field(&object, y).unwrap(), Value::Integer(9));
}
