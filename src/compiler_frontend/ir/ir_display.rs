//! IR Display
//!
//! Renders values, instructions and types in a textual SIL-like form.
//! Used by the CLI report and by the IR / name inference logs.

use crate::compiler_frontend::ir::ir_nodes::{
    InstKind, IrFunction, IrInstruction, IrModule, StoreQualifier, ValueDef, ValueId,
};
use crate::compiler_frontend::ir::ir_types::IrType;
use std::fmt::{Display, Formatter, Result as FmtResult};

const MAX_TYPE_RENDER_DEPTH: usize = 24;

pub struct TypeDisplay<'a> {
    pub module: &'a IrModule,
    pub ty: &'a IrType,
}

impl Display for TypeDisplay<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write_type(f, self.module, self.ty, 0)
    }
}

fn write_type(f: &mut Formatter<'_>, module: &IrModule, ty: &IrType, depth: usize) -> FmtResult {
    if depth > MAX_TYPE_RENDER_DEPTH {
        return write!(f, "...");
    }

    match ty {
        IrType::Named(name) => write!(f, "{}", module.resolve(*name)),
        IrType::Tuple(elements) => {
            write!(f, "(")?;
            for (index, element) in elements.iter().enumerate() {
                if index > 0 {
                    write!(f, ", ")?;
                }
                write_type(f, module, element, depth + 1)?;
            }
            write!(f, ")")
        }
        IrType::Struct(decl) => write!(f, "{}", module.decl_name(Some(*decl))),
        IrType::Function { has_self_param } => {
            if *has_self_param {
                write!(f, "@method fn")
            } else {
                write!(f, "fn")
            }
        }
        IrType::RawPointer => write!(f, "Builtin.RawPointer"),
        IrType::Address(inner) => {
            write!(f, "*")?;
            write_type(f, module, inner, depth + 1)
        }
        IrType::Box(inner) => {
            write!(f, "{{ var ")?;
            write_type(f, module, inner, depth + 1)?;
            write!(f, " }}")
        }
        IrType::Token => write!(f, "!CoroutineToken"),
    }
}

pub struct InstructionDisplay<'a> {
    pub module: &'a IrModule,
    pub function: &'a IrFunction,
    pub inst: &'a IrInstruction,
}

impl Display for InstructionDisplay<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let module = self.module;
        let inst = self.inst;

        if !inst.results.is_empty() {
            let results = inst
                .results
                .iter()
                .map(ValueId::to_string)
                .collect::<Vec<_>>();
            if results.len() == 1 {
                write!(f, "{} = ", results[0])?;
            } else {
                write!(f, "({}) = ", results.join(", "))?;
            }
        }

        write!(f, "{}", inst.kind.opcode())?;

        match &inst.kind {
            InstKind::AllocStack { decl, debug_var } | InstKind::AllocBox { decl, debug_var } => {
                if let Some(var) = debug_var {
                    write!(f, " var \"{}\"", module.resolve(var.name))?;
                }
                if decl.is_some() {
                    write!(f, " decl '{}'", module.decl_name(*decl))?;
                }
            }
            InstKind::GlobalAddr { global } => {
                write!(f, " @{}", module.decl_name(Some(*global)))?;
            }
            InstKind::StructExtract { operand, field }
            | InstKind::StructElementAddr { operand, field }
            | InstKind::RefElementAddr { operand, field } => {
                write!(f, " {operand}, #{}", module.decl_name(Some(*field)))?;
            }
            InstKind::TupleExtract { operand, index }
            | InstKind::TupleElementAddr { operand, index } => {
                write!(f, " {operand}, {index}")?;
            }
            InstKind::Store {
                src,
                dest,
                qualifier,
            } => {
                let qualifier = match qualifier {
                    StoreQualifier::Unqualified => "",
                    StoreQualifier::Init => "[init] ",
                    StoreQualifier::Assign => "[assign] ",
                    StoreQualifier::Trivial => "[trivial] ",
                };
                write!(f, " {src} to {qualifier}{dest}")?;
            }
            InstKind::CopyAddr {
                src,
                dest,
                is_init_of_dest,
            } => {
                let init = if *is_init_of_dest { "[init] " } else { "" };
                write!(f, " {src} to {init}{dest}")?;
            }
            InstKind::FunctionRef { function } => match module.function(*function) {
                Some(callee) => write!(f, " @{}", module.resolve(callee.name))?,
                None => write!(f, " @<unknown function>")?,
            },
            InstKind::Method { member } => {
                write!(f, " #{}", module.decl_name(*member))?;
            }
            InstKind::Apply { callee, arguments }
            | InstKind::BeginApply { callee, arguments }
            | InstKind::PartialApply { callee, arguments } => {
                let arguments = arguments
                    .iter()
                    .map(ValueId::to_string)
                    .collect::<Vec<_>>();
                write!(f, " {callee}({})", arguments.join(", "))?;
            }
            InstKind::DebugValue { operand, var } => {
                write!(f, " {operand}, var \"{}\"", module.resolve(var.name))?;
            }
            InstKind::Opaque { name, operands } => {
                let operands = operands.iter().map(ValueId::to_string).collect::<Vec<_>>();
                write!(f, " \"{}\"({})", module.resolve(*name), operands.join(", "))?;
            }
            InstKind::OpenExistentialAddr { operand }
            | InstKind::DestructureTuple { operand }
            | InstKind::DestructureStruct { operand }
            | InstKind::Forward { operand, .. }
            | InstKind::PointerToAddress { operand }
            | InstKind::AddressToPointer { operand }
            | InstKind::LifetimeEnd { operand, .. }
            | InstKind::Return { operand } => {
                write!(f, " {operand}")?;
            }
        }

        if let Some(result) = inst.result() {
            if let Some(ty) = self.function.value_type(result) {
                write!(f, " : $")?;
                write_type(f, module, ty, 0)?;
            }
        }

        Ok(())
    }
}

/// A value rendered as its defining instruction, or as an argument line.
pub struct ValueDisplay<'a> {
    pub module: &'a IrModule,
    pub function: &'a IrFunction,
    pub value: ValueId,
}

impl Display for ValueDisplay<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let Some(value) = self.function.value(self.value) else {
            return write!(f, "{} <undefined>", self.value);
        };

        match value.def {
            ValueDef::Result { inst, .. } => match self.function.instruction(inst) {
                Some(inst) => write!(
                    f,
                    "{}",
                    InstructionDisplay {
                        module: self.module,
                        function: self.function,
                        inst,
                    }
                ),
                None => write!(f, "{} <undefined>", self.value),
            },
            ValueDef::Argument { index, decl } => {
                write!(f, "{} = argument {index}", self.value)?;
                if decl.is_some() {
                    write!(f, " '{}'", self.module.decl_name(decl))?;
                }
                write!(f, " : $")?;
                write_type(f, self.module, &value.ty, 0)
            }
        }
    }
}

/// The whole function body, one instruction per line, grouped by block.
pub struct FunctionDisplay<'a> {
    pub module: &'a IrModule,
    pub function: &'a IrFunction,
}

impl Display for FunctionDisplay<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let arguments = self
            .function
            .arguments
            .iter()
            .map(ValueId::to_string)
            .collect::<Vec<_>>();
        writeln!(
            f,
            "fn @{}({}) {{",
            self.module.resolve(self.function.name),
            arguments.join(", ")
        )?;

        for block in &self.function.blocks {
            writeln!(f, "{}:", block.id)?;
            for inst in &block.instructions {
                if let Some(inst) = self.function.instruction(*inst) {
                    writeln!(
                        f,
                        "  {}",
                        InstructionDisplay {
                            module: self.module,
                            function: self.function,
                            inst,
                        }
                    )?;
                }
            }
        }

        write!(f, "}}")
    }
}

impl IrModule {
    pub fn display_value<'a>(&'a self, function: &'a IrFunction, value: ValueId) -> ValueDisplay<'a> {
        ValueDisplay {
            module: self,
            function,
            value,
        }
    }

    pub fn display_type<'a>(&'a self, ty: &'a IrType) -> TypeDisplay<'a> {
        TypeDisplay { module: self, ty }
    }

    pub fn display_function<'a>(&'a self, function: &'a IrFunction) -> FunctionDisplay<'a> {
        FunctionDisplay {
            module: self,
            function,
        }
    }
}
