use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use num_bigint::BigInt;

use crate::block::Block;
use crate::class::Class;
use crate::instance::Instance;
use crate::interner::Interned;
use crate::method::Method;
use crate::universe::Universe;
use crate::SOMRef;

/// Anything a variable, a field or an argument slot can hold.
///
/// `Nil` doubles as "no environment" wherever an environment is expected.
#[derive(Clone)]
pub enum Value {
    Nil,
    Boolean(bool),
    Integer(i64),
    /// Result of an `Integer` operation overflowing `i64`.
    BigInteger(BigInt),
    Double(f64),
    Symbol(Interned),
    String(Rc<String>),
    Array(SOMRef<Vec<Self>>),
    Block(Rc<Block>),
    Instance(SOMRef<Instance>),
    Class(SOMRef<Class>),
    /// A method or primitive, as answered by `lookup:` or a `find:since:` meta-method.
    Invokable(Rc<Method>),
}

impl Value {
    pub fn array(values: Vec<Self>) -> Self {
        Self::Array(Rc::new(RefCell::new(values)))
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Self::Nil)
    }

    pub fn class(&self, universe: &Universe) -> SOMRef<Class> {
        match self {
            Self::Nil => universe.nil_class(),
            Self::Boolean(true) => universe.true_class(),
            Self::Boolean(false) => universe.false_class(),
            Self::Integer(_) | Self::BigInteger(_) => universe.integer_class(),
            Self::Double(_) => universe.double_class(),
            Self::Symbol(_) => universe.symbol_class(),
            Self::String(_) => universe.string_class(),
            Self::Array(_) => universe.array_class(),
            Self::Block(block) => block.class(universe),
            Self::Instance(instance) => instance.borrow().class(),
            Self::Class(class) => class.borrow().class(),
            Self::Invokable(invokable) => invokable.class(universe),
        }
    }

    /// Plain, unintercepted method lookup starting from this value's class.
    pub fn lookup_method(&self, universe: &Universe, signature: Interned) -> Option<Rc<Method>> {
        self.class(universe).borrow().lookup_method(signature)
    }

    /// A short, human-readable rendering, used in error reports.
    pub fn describe(&self, universe: &Universe) -> String {
        match self {
            Self::Nil => String::from("nil"),
            Self::Boolean(value) => value.to_string(),
            Self::Integer(value) => value.to_string(),
            Self::BigInteger(value) => value.to_string(),
            Self::Double(value) => value.to_string(),
            Self::Symbol(symbol) => format!("#{}", universe.lookup_symbol(*symbol)),
            Self::String(string) => format!("'{}'", string),
            Self::Array(values) => {
                let values = values.borrow();
                let parts: Vec<_> = values.iter().map(|value| value.describe(universe)).collect();
                format!("#({})", parts.join(" "))
            }
            Self::Block(block) => format!("a Block{}", block.nb_parameters() + 1),
            Self::Instance(instance) => format!("a {}", instance.borrow().class().borrow().name()),
            Self::Class(class) => class.borrow().name().to_string(),
            Self::Invokable(invokable) => invokable.qualified_name(),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Nil, Self::Nil) => true,
            (Self::Boolean(a), Self::Boolean(b)) => a == b,
            (Self::Integer(a), Self::Integer(b)) => a == b,
            (Self::Double(a), Self::Double(b)) => a == b,
            (Self::Integer(i), Self::Double(d)) | (Self::Double(d), Self::Integer(i)) => {
                (*i as f64) == *d
            }
            (Self::BigInteger(a), Self::BigInteger(b)) => a == b,
            (Self::BigInteger(big), Self::Integer(i))
            | (Self::Integer(i), Self::BigInteger(big)) => *big == BigInt::from(*i),
            (Self::Symbol(a), Self::Symbol(b)) => a == b,
            // everything else compares by identity
            (Self::String(a), Self::String(b)) => Rc::ptr_eq(a, b),
            (Self::Array(a), Self::Array(b)) => Rc::ptr_eq(a, b),
            (Self::Block(a), Self::Block(b)) => Rc::ptr_eq(a, b),
            (Self::Instance(a), Self::Instance(b)) => Rc::ptr_eq(a, b),
            (Self::Class(a), Self::Class(b)) => Rc::ptr_eq(a, b),
            (Self::Invokable(a), Self::Invokable(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

/// Formats a shared cell without panicking when it is already mutably borrowed.
fn debug_cell<T: fmt::Debug>(
    f: &mut fmt::Formatter<'_>,
    name: &str,
    cell: &RefCell<T>,
) -> fmt::Result {
    match cell.try_borrow() {
        Ok(inner) => f.debug_tuple(name).field(&*inner).finish(),
        Err(_) => write!(f, "{}(<borrowed>)", name),
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Nil => f.write_str("Nil"),
            Self::Boolean(value) => write!(f, "Boolean({})", value),
            Self::Integer(value) => write!(f, "Integer({})", value),
            Self::BigInteger(value) => write!(f, "BigInteger({})", value),
            Self::Double(value) => write!(f, "Double({})", value),
            Self::Symbol(symbol) => write!(f, "Symbol({:?})", symbol),
            Self::String(string) => write!(f, "String({:?})", string),
            Self::Array(values) => debug_cell(f, "Array", values),
            Self::Block(block) => fmt::Debug::fmt(block, f),
            Self::Instance(instance) => debug_cell(f, "Instance", instance),
            Self::Class(class) => match class.try_borrow() {
                Ok(class) => write!(f, "Class({})", class.name()),
                Err(_) => f.write_str("Class(<borrowed>)"),
            },
            Self::Invokable(invokable) => write!(f, "Invokable({})", invokable.qualified_name()),
        }
    }
}
