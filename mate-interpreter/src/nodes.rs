//!
//! The executable tree methods and blocks are compiled into.
//!
//! Nodes own their caches (dispatch chains, field accessors, semantic checks), so the tree
//! specializes itself in place as it runs. Every interceptable operation carries an optional
//! [`SemanticCheck`], absent when the universe was configured without reflection.
//!

use std::rc::Rc;

use num_bigint::BigInt;

use crate::dispatch::{CallSite, SuperCallSite};
use crate::fields::{FieldReader, FieldWriter};
use crate::interner::Interned;
use crate::reflection::dispatch::MessageInterception;
use crate::reflection::semantics::SemanticCheck;

/// The compiled body of a method.
#[derive(Debug)]
pub struct MethodBody {
    pub nb_locals: usize,
    pub body: Body,
    /// Intercepts the value the method returns.
    pub return_check: Option<SemanticCheck>,
}

/// The compiled body of a block expression, shared by all closures created from it.
#[derive(Debug)]
pub struct BlockBody {
    pub nb_parameters: usize,
    pub nb_locals: usize,
    pub body: Body,
}

/// A sequence of expressions, evaluating to the last one's value.
#[derive(Debug, Default)]
pub struct Body {
    pub exprs: Vec<Expression>,
}

/// A compile-time constant.
#[derive(Debug, Clone)]
pub enum Literal {
    Nil,
    Boolean(bool),
    Integer(i64),
    BigInteger(BigInt),
    Double(f64),
    Symbol(Interned),
    String(Rc<String>),
    /// A fresh array is created on each evaluation.
    Array(Vec<Literal>),
}

/// An executable expression.
#[derive(Debug)]
pub enum Expression {
    Literal(Literal),
    /// Read a global binding, failing if it is unknown.
    GlobalRead(Interned),
    Argument(ArgumentRead),
    LocalRead(LocalRead),
    LocalWrite(LocalWrite),
    FieldRead(FieldRead),
    FieldWrite(FieldWrite),
    Message(MessageSend),
    SuperMessage(SuperMessageSend),
    /// Return from the enclosing method activation.
    Exit(Box<Expression>),
    /// Create a closure over the current activation.
    Block(Rc<BlockBody>),
    Sequence(Body),
}

/// Read an argument of the activation `context_level` lexical levels up.
///
/// Index 0 is the receiver (or the block itself, for block activations).
#[derive(Debug)]
pub struct ArgumentRead {
    pub index: usize,
    pub context_level: usize,
    pub check: Option<SemanticCheck>,
}

#[derive(Debug)]
pub struct LocalRead {
    pub index: usize,
    pub context_level: usize,
    pub check: Option<SemanticCheck>,
}

#[derive(Debug)]
pub struct LocalWrite {
    pub index: usize,
    pub context_level: usize,
    pub value: Box<Expression>,
    pub check: Option<SemanticCheck>,
}

/// Read a field of `self`, first through the executor check, then through the layout-level accessor.
#[derive(Debug)]
pub struct FieldRead {
    pub reader: FieldReader,
    pub check: Option<SemanticCheck>,
}

#[derive(Debug)]
pub struct FieldWrite {
    pub writer: FieldWriter,
    pub value: Box<Expression>,
    pub check: Option<SemanticCheck>,
}

#[derive(Debug)]
pub struct MessageSend {
    pub receiver: Box<Expression>,
    pub values: Vec<Expression>,
    pub call_site: CallSite,
    pub interception: Option<MessageInterception>,
}

/// A send to `super`: the receiver is `self`, the lookup starts from the lexical holder's superclass.
#[derive(Debug)]
pub struct SuperMessageSend {
    pub values: Vec<Expression>,
    pub call_site: SuperCallSite,
    pub interception: Option<MessageInterception>,
}
