//! Name-based definitions handed to the interpreter.
//!
//! Nothing here is resolved yet: bindings are plain strings until the interpreter compiles them.

/// A class, with its instance side and its class side.
///
/// ```text
/// Tracer = Object (
///   | log |
///   write: index value: value = ( log := index. ^ value )
///   ----
///   | installed |
///   install = ( installed := true )
/// )
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ClassDef {
    pub name: String,
    /// `None` means `Object`.
    pub super_class: Option<String>,
    pub instance_locals: Vec<String>,
    pub instance_methods: Vec<MethodDef>,
    pub static_locals: Vec<String>,
    pub static_methods: Vec<MethodDef>,
}

/// How a method names its parameters.
///
/// ```text
/// inc = ( n := n + 1 )                          "unary"
/// read: index = ( ^ self instVarAt: index )     "keyword"
/// + other = ( ^ self add: other )               "operator"
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum MethodKind {
    Unary,
    Positional { parameters: Vec<String> },
    Operator { rhs: String },
}

impl MethodKind {
    /// The number of parameters, not counting the receiver.
    pub fn arity(&self) -> usize {
        match self {
            Self::Unary => 0,
            Self::Positional { parameters } => parameters.len(),
            Self::Operator { .. } => 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MethodDef {
    pub kind: MethodKind,
    /// Full selector, eg. `write:value:`.
    pub signature: String,
    pub body: MethodBody,
}

/// ```text
/// basicNew: environment = primitive
/// find: selector since: class = ( |found| found := class lookup: selector. ^ found )
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum MethodBody {
    /// Provided by the interpreter's primitive tables.
    Primitive,
    Body { locals: Vec<String>, body: Body },
}

/// Statements of a method, block or parenthesized term.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Body {
    pub exprs: Vec<Expression>,
}

/// ```text
/// counter                              "reference"
/// counter := 10                        "assignment"
/// counter incrementBy: 5               "send"
/// counter <= 5                         "binary send"
/// ^ counter                            "return"
/// 'foo'                                "literal"
/// [ :value | counter incrementBy: value ]
/// ( counter get )                      "term"
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Reference(String),
    Assignment(String, Box<Expression>),
    Message(Message),
    BinaryOp(BinaryOp),
    Exit(Box<Expression>),
    Literal(Literal),
    Block(Block),
    Term(Term),
}

/// A keyword or unary send, eg. `environment semantics: tracer`.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub receiver: Box<Expression>,
    pub signature: String,
    /// Arguments, receiver excluded.
    pub values: Vec<Expression>,
}

/// A binary send, eg. `n + 1`.
#[derive(Debug, Clone, PartialEq)]
pub struct BinaryOp {
    pub op: String,
    pub lhs: Box<Expression>,
    pub rhs: Box<Expression>,
}

/// `[ :value | |serialized| serialized := value asString. serialized ]`
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub parameters: Vec<String>,
    pub locals: Vec<String>,
    pub body: Body,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Term {
    pub body: Body,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Symbol(String),
    String(String),
    Double(f64),
    Integer(i64),
    /// Digits of an integer too large for `i64`.
    BigInteger(String),
    Array(Vec<Literal>),
}
