//!
//! This is the node compiler for the Mate interpreter.
//!
//! It resolves every name to an argument, local, field or global binding once,
//! and lays out the executable tree, attaching interception checks when reflection is enabled.
//!
use std::cell::RefCell;
use std::rc::Rc;

use indexmap::{IndexMap, IndexSet};
use num_bigint::BigInt;

use mate_core::ast;

use crate::class::Class;
use crate::config::VmConfig;
use crate::dispatch::{CallSite, SuperCallSite};
use crate::error::MateError;
use crate::fields::{FieldReader, FieldWriter};
use crate::interner::{Interned, Interner};
use crate::method::{Method, MethodKind};
use crate::nodes::{
    ArgumentRead, BlockBody, Body, Expression, FieldRead, FieldWrite, Literal, LocalRead,
    LocalWrite, MessageSend, MethodBody, SuperMessageSend,
};
use crate::primitives;
use crate::reflection::dispatch::MessageInterception;
use crate::reflection::semantics::SemanticCheck;
use crate::reflection::ReflectiveOp;
use crate::value::Value;
use crate::SOMRef;

/// The name the block itself is bound to, as argument 0 of its activations.
const BLOCK_SELF: &str = "$block";

enum FoundVar {
    Local(usize, usize),
    Argument(usize, usize),
    Field(usize),
}

trait GenCtxt {
    fn find_var(&mut self, name: &str) -> Option<FoundVar>;
    fn intern_symbol(&mut self, name: &str) -> Interned;
    fn config(&self) -> &VmConfig;

    /// A check for `op`, if nodes are compiled with reflection.
    fn check(&self, op: ReflectiveOp) -> Option<SemanticCheck> {
        if self.config().reflection_enabled {
            Some(SemanticCheck::new(op))
        } else {
            None
        }
    }

    fn interception(&self) -> Option<MessageInterception> {
        if self.config().reflection_enabled {
            Some(MessageInterception::new())
        } else {
            None
        }
    }
}

struct BlockGenCtxt<'a> {
    pub outer: &'a mut dyn GenCtxt,
    pub args: IndexSet<String>,
    pub locals: IndexSet<String>,
}

impl GenCtxt for BlockGenCtxt<'_> {
    fn find_var(&mut self, name: &str) -> Option<FoundVar> {
        let name = match name {
            "super" => "self",
            name => name,
        };
        (self.locals.get_index_of(name))
            .map(|idx| FoundVar::Local(0, idx))
            .or_else(|| (self.args.get_index_of(name)).map(|idx| FoundVar::Argument(0, idx)))
            .or_else(|| {
                self.outer.find_var(name).map(|found| match found {
                    FoundVar::Local(up_idx, idx) => FoundVar::Local(up_idx + 1, idx),
                    FoundVar::Argument(up_idx, idx) => FoundVar::Argument(up_idx + 1, idx),
                    FoundVar::Field(idx) => FoundVar::Field(idx),
                })
            })
    }

    fn intern_symbol(&mut self, name: &str) -> Interned {
        self.outer.intern_symbol(name)
    }

    fn config(&self) -> &VmConfig {
        self.outer.config()
    }
}

struct ClassGenCtxt<'a> {
    pub fields: IndexSet<Interned>,
    pub interner: &'a mut Interner,
    pub config: &'a VmConfig,
}

impl GenCtxt for ClassGenCtxt<'_> {
    fn find_var(&mut self, name: &str) -> Option<FoundVar> {
        let name = self.interner.get(name)?;
        self.fields.get_index_of(&name).map(FoundVar::Field)
    }

    fn intern_symbol(&mut self, name: &str) -> Interned {
        self.interner.intern(name)
    }

    fn config(&self) -> &VmConfig {
        self.config
    }
}

trait Compile {
    type Output;

    fn compile(&self, ctxt: &mut dyn GenCtxt) -> Result<Self::Output, MateError>;
}

impl Compile for ast::Body {
    type Output = Body;

    fn compile(&self, ctxt: &mut dyn GenCtxt) -> Result<Body, MateError> {
        let exprs = self
            .exprs
            .iter()
            .map(|expr| expr.compile(ctxt))
            .collect::<Result<_, _>>()?;
        Ok(Body { exprs })
    }
}

impl Compile for ast::Expression {
    type Output = Expression;

    fn compile(&self, ctxt: &mut dyn GenCtxt) -> Result<Expression, MateError> {
        match self {
            ast::Expression::Reference(name) => Ok(compile_reference(ctxt, name)),
            ast::Expression::Assignment(name, expr) => {
                let value = Box::new(expr.compile(ctxt)?);
                match ctxt.find_var(name.as_str()) {
                    Some(FoundVar::Local(up_idx, idx)) => Ok(Expression::LocalWrite(LocalWrite {
                        index: idx,
                        context_level: up_idx,
                        value,
                        check: ctxt.check(ReflectiveOp::ExecutorWriteLocal),
                    })),
                    Some(FoundVar::Field(idx)) => Ok(Expression::FieldWrite(FieldWrite {
                        writer: FieldWriter::new(idx, ctxt.check(ReflectiveOp::LayoutWriteField)),
                        value,
                        check: ctxt.check(ReflectiveOp::ExecutorWriteField),
                    })),
                    Some(FoundVar::Argument(..)) => Err(MateError::InvalidAssignment(name.clone())),
                    None => Err(MateError::UndefinedVariable(name.clone())),
                }
            }
            ast::Expression::Message(message) => {
                compile_send(ctxt, &message.receiver, &message.signature, &message.values)
            }
            ast::Expression::BinaryOp(op) => {
                compile_send(ctxt, &op.lhs, &op.op, std::slice::from_ref(op.rhs.as_ref()))
            }
            ast::Expression::Exit(expr) => Ok(Expression::Exit(Box::new(expr.compile(ctxt)?))),
            ast::Expression::Literal(literal) => Ok(Expression::Literal(literal.compile(ctxt)?)),
            ast::Expression::Block(block) => Ok(Expression::Block(Rc::new(block.compile(ctxt)?))),
            ast::Expression::Term(term) => Ok(Expression::Sequence(term.body.compile(ctxt)?)),
        }
    }
}

fn compile_reference(ctxt: &mut dyn GenCtxt, name: &str) -> Expression {
    match ctxt.find_var(name) {
        Some(FoundVar::Local(up_idx, idx)) => Expression::LocalRead(LocalRead {
            index: idx,
            context_level: up_idx,
            check: ctxt.check(ReflectiveOp::ExecutorReadLocal),
        }),
        Some(FoundVar::Argument(up_idx, idx)) => {
            let op = ReflectiveOp::argument_read(up_idx, name == "super");
            Expression::Argument(ArgumentRead {
                index: idx,
                context_level: up_idx,
                check: ctxt.check(op),
            })
        }
        Some(FoundVar::Field(idx)) => Expression::FieldRead(FieldRead {
            reader: FieldReader::new(idx, ctxt.check(ReflectiveOp::LayoutReadField)),
            check: ctxt.check(ReflectiveOp::ExecutorReadField),
        }),
        None => match name {
            "nil" => Expression::Literal(Literal::Nil),
            "true" => Expression::Literal(Literal::Boolean(true)),
            "false" => Expression::Literal(Literal::Boolean(false)),
            name => Expression::GlobalRead(ctxt.intern_symbol(name)),
        },
    }
}

fn compile_send(
    ctxt: &mut dyn GenCtxt,
    receiver: &ast::Expression,
    signature: &str,
    values: &[ast::Expression],
) -> Result<Expression, MateError> {
    let values = values
        .iter()
        .map(|value| value.compile(ctxt))
        .collect::<Result<Vec<_>, _>>()?;
    let selector = ctxt.intern_symbol(signature);
    match receiver {
        ast::Expression::Reference(name) if name == "super" => {
            Ok(Expression::SuperMessage(SuperMessageSend {
                values,
                call_site: SuperCallSite::new(selector),
                interception: ctxt.interception(),
            }))
        }
        receiver => Ok(Expression::Message(MessageSend {
            receiver: Box::new(receiver.compile(ctxt)?),
            values,
            call_site: CallSite::new(selector),
            interception: ctxt.interception(),
        })),
    }
}

impl Compile for ast::Literal {
    type Output = Literal;

    fn compile(&self, ctxt: &mut dyn GenCtxt) -> Result<Literal, MateError> {
        let literal = match self {
            ast::Literal::Symbol(value) => Literal::Symbol(ctxt.intern_symbol(value)),
            ast::Literal::String(value) => Literal::String(Rc::new(value.clone())),
            ast::Literal::Double(value) => Literal::Double(*value),
            ast::Literal::Integer(value) => Literal::Integer(*value),
            ast::Literal::BigInteger(value) => match value.parse::<BigInt>() {
                Ok(value) => Literal::BigInteger(value),
                Err(_) => return Err(MateError::InvalidLiteral(value.clone())),
            },
            ast::Literal::Array(values) => Literal::Array(
                values
                    .iter()
                    .map(|value| value.compile(ctxt))
                    .collect::<Result<_, _>>()?,
            ),
        };
        Ok(literal)
    }
}

impl Compile for ast::Block {
    type Output = BlockBody;

    fn compile(&self, outer: &mut dyn GenCtxt) -> Result<BlockBody, MateError> {
        if self.parameters.len() > 2 {
            return Err(MateError::UnsupportedBlockArity(self.parameters.len()));
        }
        let mut ctxt = BlockGenCtxt {
            outer,
            args: std::iter::once(BLOCK_SELF.to_string())
                .chain(self.parameters.iter().cloned())
                .collect(),
            locals: self.locals.iter().cloned().collect(),
        };
        let body = self.body.compile(&mut ctxt)?;
        Ok(BlockBody {
            nb_parameters: self.parameters.len(),
            nb_locals: ctxt.locals.len(),
            body,
        })
    }
}

fn compile_method(outer: &mut dyn GenCtxt, defn: &ast::MethodDef) -> Result<Method, MateError> {
    let kind = match &defn.body {
        ast::MethodBody::Primitive => MethodKind::NotImplemented(defn.signature.clone()),
        ast::MethodBody::Body { locals, body } => {
            let args = match &defn.kind {
                ast::MethodKind::Unary => vec![],
                ast::MethodKind::Positional { parameters } => parameters.clone(),
                ast::MethodKind::Operator { rhs } => vec![rhs.clone()],
            };
            let mut ctxt = BlockGenCtxt {
                outer,
                args: std::iter::once(String::from("self")).chain(args).collect(),
                locals: locals.iter().cloned().collect(),
            };
            let body = body.compile(&mut ctxt)?;
            MethodKind::Defined(MethodBody {
                nb_locals: ctxt.locals.len(),
                body,
                return_check: ctxt.check(ReflectiveOp::ExecutorReturn),
            })
        }
    };
    Ok(Method {
        kind,
        holder: Default::default(),
        signature: defn.signature.clone(),
    })
}

/// Compile a method for `class`, resolving field names against that class' fields.
pub fn compile_method_for(
    interner: &mut Interner,
    config: &VmConfig,
    class: &SOMRef<Class>,
    defn: &ast::MethodDef,
) -> Result<Method, MateError> {
    let fields = class.borrow().fields.clone();
    let mut ctxt = ClassGenCtxt {
        fields,
        interner,
        config,
    };
    let mut method = compile_method(&mut ctxt, defn)?;
    method.holder = Rc::downgrade(class);
    Ok(method)
}

fn install_methods(
    interner: &mut Interner,
    class: &SOMRef<Class>,
    methods: Vec<Method>,
    primitives: Option<&'static [(&'static str, primitives::PrimitiveFn)]>,
) -> IndexMap<Interned, Rc<Method>> {
    let mut installed = IndexMap::new();
    for mut method in methods {
        method.holder = Rc::downgrade(class);
        let signature = interner.intern(method.signature.as_str());
        installed.insert(signature, Rc::new(method));
    }
    for &(signature, primitive) in primitives.unwrap_or(&[]) {
        let method = Method {
            signature: signature.to_string(),
            kind: MethodKind::Primitive(primitive),
            holder: Rc::downgrade(class),
        };
        installed.insert(interner.intern(signature), Rc::new(method));
    }
    installed
}

/// Compile a class definition into a class (the returned one) and its metaclass.
///
/// Superclass links are left to the caller; `super_class` only provides the inherited fields.
pub fn compile_class(
    interner: &mut Interner,
    config: &VmConfig,
    defn: &ast::ClassDef,
    super_class: Option<&SOMRef<Class>>,
) -> Result<SOMRef<Class>, MateError> {
    let mut static_fields = IndexSet::new();
    let mut instance_fields = IndexSet::new();
    if let Some(super_class) = super_class {
        static_fields.extend(super_class.borrow().class().borrow().fields.iter().copied());
        instance_fields.extend(super_class.borrow().fields.iter().copied());
    }
    static_fields.extend(defn.static_locals.iter().map(|name| interner.intern(name)));
    instance_fields.extend(defn.instance_locals.iter().map(|name| interner.intern(name)));

    let static_class = Rc::new(RefCell::new(Class::new(format!("{} class", defn.name), true)));
    let static_methods = {
        let mut ctxt = ClassGenCtxt {
            fields: static_fields.clone(),
            interner: &mut *interner,
            config,
        };
        defn.static_methods
            .iter()
            .map(|method| compile_method(&mut ctxt, method))
            .collect::<Result<Vec<_>, _>>()?
    };
    let static_methods = install_methods(
        interner,
        &static_class,
        static_methods,
        primitives::get_class_primitives(&defn.name),
    );

    let instance_class = Rc::new(RefCell::new(Class::new(defn.name.clone(), false)));
    let instance_methods = {
        let mut ctxt = ClassGenCtxt {
            fields: instance_fields.clone(),
            interner: &mut *interner,
            config,
        };
        defn.instance_methods
            .iter()
            .map(|method| compile_method(&mut ctxt, method))
            .collect::<Result<Vec<_>, _>>()?
    };
    let instance_methods = install_methods(
        interner,
        &instance_class,
        instance_methods,
        primitives::get_instance_primitives(&defn.name),
    );

    let mut static_class_mut = static_class.borrow_mut();
    static_class_mut.fields = static_fields.clone();
    static_class_mut.methods = static_methods;
    drop(static_class_mut);

    let mut instance_class_mut = instance_class.borrow_mut();
    instance_class_mut.set_class_owned(&static_class);
    instance_class_mut.fields = instance_fields;
    instance_class_mut.locals = static_fields
        .into_iter()
        .map(|name| (name, Value::Nil))
        .collect();
    instance_class_mut.methods = instance_methods;
    drop(instance_class_mut);

    Ok(instance_class)
}
