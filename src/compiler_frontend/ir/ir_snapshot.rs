//! JSON snapshots of an IR module.
//!
//! A snapshot lists declarations, functions (arguments and blocks of instructions) and the
//! values to query. Values, declarations and functions are referred to by label. Labels are
//! only meaningful inside the snapshot; once lowered, everything is addressed by ID.
//!
//! Struct fields are declared inline with their struct and are labelled `Struct.field`.

use crate::compiler_frontend::compiler_errors::{CompilerError, ErrorMetaDataKey, ErrorType};
use crate::compiler_frontend::ir::ir_builder::{FunctionBuilder, FunctionSignature, ModuleBuilder};
use crate::compiler_frontend::ir::ir_declarations::DeclKind;
use crate::compiler_frontend::ir::ir_nodes::{
    DeclId, ForwardKind, FunctionId, IrModule, LifetimeEndKind, StoreQualifier, ValueId, ValueRef,
};
use crate::compiler_frontend::ir::ir_types::IrType;
use crate::{ir_log, return_snapshot_error};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct IrSnapshot {
    #[serde(default)]
    pub declarations: Vec<SnapshotDeclaration>,
    #[serde(default)]
    pub functions: Vec<SnapshotFunction>,
    #[serde(default)]
    pub queries: Vec<SnapshotQuery>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SnapshotDeclaration {
    pub name: String,

    /// Defaults to `name`.
    #[serde(default)]
    pub label: Option<String>,

    #[serde(flatten)]
    pub kind: SnapshotDeclKind,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SnapshotDeclKind {
    Variable,
    Parameter,
    Global { ty: SnapshotType },
    Field { ty: SnapshotType },
    Struct { fields: Vec<SnapshotField> },
    Accessor { storage: String },
    Function,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SnapshotField {
    pub name: String,
    pub ty: SnapshotType,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotType {
    Named(String),
    Tuple(Vec<SnapshotType>),
    Struct(String),
    Function {
        #[serde(default)]
        has_self_param: bool,
    },
    RawPointer,
    Address(Box<SnapshotType>),
    Box(Box<SnapshotType>),
    Token,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SnapshotFunction {
    pub name: String,
    #[serde(default)]
    pub decl_context: Option<String>,
    #[serde(default)]
    pub is_thunk: bool,
    #[serde(default)]
    pub has_self_param: bool,
    #[serde(default)]
    pub arguments: Vec<SnapshotArgument>,
    #[serde(default)]
    pub blocks: Vec<SnapshotBlock>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SnapshotArgument {
    pub value: String,
    pub ty: SnapshotType,
    #[serde(default)]
    pub decl: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SnapshotBlock {
    pub instructions: Vec<SnapshotInstruction>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SingleOperand {
    pub result: String,
    pub operand: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct OperandOnly {
    pub operand: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotStoreQualifier {
    #[default]
    Unqualified,
    Init,
    Assign,
    Trivial,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum SnapshotInstruction {
    AllocStack {
        result: String,
        ty: SnapshotType,
        #[serde(default)]
        decl: Option<String>,
        #[serde(default)]
        debug_name: Option<String>,
    },
    AllocBox {
        result: String,
        ty: SnapshotType,
        #[serde(default)]
        decl: Option<String>,
        #[serde(default)]
        debug_name: Option<String>,
    },
    GlobalAddr {
        result: String,
        global: String,
    },
    StructExtract {
        result: String,
        operand: String,
        field: String,
    },
    StructElementAddr {
        result: String,
        operand: String,
        field: String,
    },
    TupleExtract {
        result: String,
        operand: String,
        index: usize,
    },
    TupleElementAddr {
        result: String,
        operand: String,
        index: usize,
    },
    RefElementAddr {
        result: String,
        operand: String,
        field: String,
    },
    OpenExistentialAddr {
        result: String,
        operand: String,
        ty: SnapshotType,
    },
    DestructureTuple {
        results: Vec<String>,
        operand: String,
    },
    DestructureStruct {
        results: Vec<String>,
        operand: String,
    },
    Store {
        src: String,
        dest: String,
        #[serde(default)]
        qualifier: SnapshotStoreQualifier,
    },
    CopyAddr {
        src: String,
        dest: String,
        #[serde(default)]
        init: bool,
    },

    BeginBorrow(SingleOperand),
    Load(SingleOperand),
    LoadBorrow(SingleOperand),
    BeginAccess(SingleOperand),
    MarkUnresolvedNonCopyableValue(SingleOperand),
    ProjectBox(SingleOperand),
    CopyValue(SingleOperand),
    ConvertFunction(SingleOperand),
    MarkUninitialized(SingleOperand),
    #[serde(rename = "copyable_to_moveonlywrapper_addr")]
    CopyableToMoveOnlyWrapperAddr(SingleOperand),
    #[serde(rename = "moveonlywrapper_to_copyable_addr")]
    MoveOnlyWrapperToCopyableAddr(SingleOperand),

    FunctionRef {
        result: String,
        function: String,
    },
    Method {
        result: String,
        #[serde(default)]
        member: Option<String>,
        #[serde(default)]
        has_self_param: bool,
    },
    Apply {
        result: String,
        callee: String,
        #[serde(default)]
        arguments: Vec<String>,
        ty: SnapshotType,
    },
    /// `results` are the yielded values followed by the coroutine token.
    BeginApply {
        results: Vec<String>,
        callee: String,
        #[serde(default)]
        arguments: Vec<String>,
        #[serde(default)]
        yield_types: Vec<SnapshotType>,
    },
    PartialApply {
        result: String,
        callee: String,
        #[serde(default)]
        arguments: Vec<String>,
    },
    PointerToAddress {
        result: String,
        operand: String,
        ty: SnapshotType,
    },
    AddressToPointer(SingleOperand),
    DebugValue {
        operand: String,
        name: String,
    },

    EndAccess(OperandOnly),
    EndBorrow(OperandOnly),
    DestroyAddr(OperandOnly),
    DestroyValue(OperandOnly),
    DeallocStack(OperandOnly),
    DeallocBox(OperandOnly),
    Return(OperandOnly),

    Opaque {
        name: String,
        #[serde(default)]
        operands: Vec<String>,
        #[serde(default)]
        results: Vec<String>,
        #[serde(default)]
        result_types: Vec<SnapshotType>,
    },
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SnapshotQuery {
    pub function: String,
    pub value: String,
}

/// A lowered snapshot: the module plus the resolved queries, in snapshot order.
#[derive(Debug, Clone)]
pub struct LoadedSnapshot {
    pub module: IrModule,
    pub queries: Vec<ValueRef>,
}

pub fn parse_snapshot(json: &str) -> Result<IrSnapshot, CompilerError> {
    serde_json::from_str(json).map_err(|error| {
        CompilerError::new(format!("Could not parse IR snapshot: {error}"), ErrorType::Snapshot)
            .with_metadata(ErrorMetaDataKey::CompilationStage, "Snapshot Parsing")
    })
}

pub fn load_snapshot(json: &str) -> Result<LoadedSnapshot, CompilerError> {
    parse_snapshot(json)?.lower()
}

pub fn load_snapshot_file(path: &Path) -> Result<LoadedSnapshot, CompilerError> {
    let json = fs::read_to_string(path)
        .map_err(|error| CompilerError::file_error(path, format!("Could not read snapshot: {error}")))?;

    load_snapshot(&json).map_err(|error| error.with_file_path(path))
}

impl IrSnapshot {
    pub fn lower(&self) -> Result<LoadedSnapshot, CompilerError> {
        SnapshotLowering::default().lower(self)
    }
}

#[derive(Default)]
struct SnapshotLowering {
    builder: ModuleBuilder,
    decls_by_label: FxHashMap<String, DeclId>,
    functions_by_name: FxHashMap<String, FunctionId>,
    values_by_function: FxHashMap<FunctionId, FxHashMap<String, ValueId>>,
}

impl SnapshotLowering {
    fn lower(mut self, snapshot: &IrSnapshot) -> Result<LoadedSnapshot, CompilerError> {
        for declaration in &snapshot.declarations {
            self.lower_declaration(declaration)?;
        }

        // Declare every function first so bodies can reference functions defined later.
        for function in &snapshot.functions {
            self.declare_function(function)?;
        }

        for function in &snapshot.functions {
            self.lower_function_body(function)?;
        }

        let mut queries = Vec::with_capacity(snapshot.queries.len());
        for query in &snapshot.queries {
            let Some(function) = self.functions_by_name.get(&query.function).copied() else {
                return_snapshot_error!(format!("Query names unknown function '{}'", query.function), {
                    FunctionName => &query.function,
                });
            };

            let value = self.lookup_value(function, &query.value, &query.function)?;
            queries.push(ValueRef { function, value });
        }

        ir_log!(format!(
            "[IR] Lowered snapshot: declarations={} functions={} queries={}",
            snapshot.declarations.len(),
            snapshot.functions.len(),
            queries.len()
        ));

        Ok(LoadedSnapshot {
            module: self.builder.finish(),
            queries,
        })
    }

    fn lower_declaration(&mut self, declaration: &SnapshotDeclaration) -> Result<(), CompilerError> {
        let label = declaration
            .label
            .clone()
            .unwrap_or_else(|| declaration.name.clone());

        if self.decls_by_label.contains_key(&label) {
            return_snapshot_error!(format!("Declaration label '{label}' is used twice"), {
                DeclarationName => &label,
            });
        }

        let id = match &declaration.kind {
            SnapshotDeclKind::Variable => self.builder.declare(&declaration.name, DeclKind::Variable),
            SnapshotDeclKind::Parameter => self.builder.declare(&declaration.name, DeclKind::Parameter),
            SnapshotDeclKind::Function => self.builder.declare(&declaration.name, DeclKind::Function),
            SnapshotDeclKind::Global { ty } => {
                let ty = self.lower_type(ty)?;
                self.builder.declare(&declaration.name, DeclKind::Global { ty })
            }
            SnapshotDeclKind::Field { ty } => {
                let ty = self.lower_type(ty)?;
                self.builder.declare(&declaration.name, DeclKind::Field { ty })
            }
            SnapshotDeclKind::Accessor { storage } => {
                let storage = self.lookup_decl(storage)?;
                self.builder.declare(&declaration.name, DeclKind::Accessor { storage })
            }
            SnapshotDeclKind::Struct { fields } => {
                let mut lowered_fields = Vec::with_capacity(fields.len());
                for field in fields {
                    lowered_fields.push((field.name.as_str(), self.lower_type(&field.ty)?));
                }

                let (struct_decl, field_decls) = self
                    .builder
                    .declare_struct(&declaration.name, &lowered_fields);

                for (field, field_decl) in fields.iter().zip(field_decls) {
                    self.decls_by_label
                        .insert(format!("{label}.{}", field.name), field_decl);
                }

                struct_decl
            }
        };

        self.decls_by_label.insert(label, id);
        Ok(())
    }

    fn declare_function(&mut self, function: &SnapshotFunction) -> Result<(), CompilerError> {
        if self.functions_by_name.contains_key(&function.name) {
            return_snapshot_error!(format!("Function '{}' is defined twice", function.name), {
                FunctionName => &function.name,
            });
        }

        let decl_context = match &function.decl_context {
            Some(label) => Some(self.lookup_decl(label)?),
            None => None,
        };

        let id = self.builder.declare_function(
            &function.name,
            FunctionSignature {
                decl_context,
                is_thunk: function.is_thunk,
                has_self_param: function.has_self_param,
            },
        );

        self.functions_by_name.insert(function.name.clone(), id);
        Ok(())
    }

    fn lower_function_body(&mut self, function: &SnapshotFunction) -> Result<(), CompilerError> {
        let id = self.functions_by_name[&function.name];

        // Functions without blocks stay declarations (external callees, thunks).
        if function.blocks.is_empty() && function.arguments.is_empty() {
            return Ok(());
        }

        let mut argument_types = Vec::with_capacity(function.arguments.len());
        for argument in &function.arguments {
            let decl = match &argument.decl {
                Some(label) => Some(self.lookup_decl(label)?),
                None => None,
            };
            argument_types.push((argument.value.as_str(), self.lower_type(&argument.ty)?, decl));
        }

        let mut context = BodyContext {
            function_name: &function.name,
            decls_by_label: &self.decls_by_label,
            functions_by_name: &self.functions_by_name,
            values: FxHashMap::default(),
        };

        let mut body = self.builder.function_builder(id)?;

        for (label, ty, decl) in argument_types {
            let value = body.add_argument(ty, decl);
            context.define(label, value)?;
        }

        for (block_index, block) in function.blocks.iter().enumerate() {
            if block_index > 0 {
                let block_id = body.create_block();
                body.set_block(block_id)?;
            }

            for instruction in &block.instructions {
                context.lower_instruction(&mut body, instruction)?;
            }
        }

        body.finish();
        self.values_by_function.insert(id, context.values);
        Ok(())
    }

    fn lookup_decl(&self, label: &str) -> Result<DeclId, CompilerError> {
        match self.decls_by_label.get(label) {
            Some(id) => Ok(*id),
            None => {
                return_snapshot_error!(format!("Unknown declaration '{label}'"), {
                    DeclarationName => label,
                });
            }
        }
    }

    fn lookup_value(&self, function: FunctionId, label: &str, function_name: &str) -> Result<ValueId, CompilerError> {
        let value = self
            .values_by_function
            .get(&function)
            .and_then(|values| values.get(label))
            .copied();

        match value {
            Some(value) => Ok(value),
            None => {
                return_snapshot_error!(format!("Unknown value '{label}' in function '{function_name}'"), {
                    ValueName => label,
                    FunctionName => function_name,
                });
            }
        }
    }

    fn lower_type(&mut self, ty: &SnapshotType) -> Result<IrType, CompilerError> {
        lower_type(&mut self.builder, &self.decls_by_label, ty)
    }
}

fn lower_type(
    builder: &mut ModuleBuilder,
    decls_by_label: &FxHashMap<String, DeclId>,
    ty: &SnapshotType,
) -> Result<IrType, CompilerError> {
    let lowered = match ty {
        SnapshotType::Named(name) => builder.named_type(name),
        SnapshotType::Tuple(elements) => {
            let mut lowered_elements = Vec::with_capacity(elements.len());
            for element in elements {
                lowered_elements.push(lower_type(builder, decls_by_label, element)?);
            }
            IrType::Tuple(lowered_elements)
        }
        SnapshotType::Struct(label) => match decls_by_label.get(label) {
            Some(decl) => IrType::Struct(*decl),
            None => {
                return_snapshot_error!(format!("Unknown struct '{label}'"), {
                    DeclarationName => label,
                });
            }
        },
        SnapshotType::Function { has_self_param } => IrType::Function {
            has_self_param: *has_self_param,
        },
        SnapshotType::RawPointer => IrType::RawPointer,
        SnapshotType::Address(inner) => {
            IrType::address_of(lower_type(builder, decls_by_label, inner)?)
        }
        SnapshotType::Box(inner) => IrType::Box(Box::new(lower_type(builder, decls_by_label, inner)?)),
        SnapshotType::Token => IrType::Token,
    };

    Ok(lowered)
}

/// Label resolution while one function body is being lowered.
struct BodyContext<'s> {
    function_name: &'s str,
    decls_by_label: &'s FxHashMap<String, DeclId>,
    functions_by_name: &'s FxHashMap<String, FunctionId>,
    values: FxHashMap<String, ValueId>,
}

impl BodyContext<'_> {
    fn define(&mut self, label: &str, value: ValueId) -> Result<(), CompilerError> {
        if self.values.insert(label.to_owned(), value).is_some() {
            return_snapshot_error!(format!("Value '{label}' is defined twice in '{}'", self.function_name), {
                ValueName => label,
                FunctionName => self.function_name,
            });
        }
        Ok(())
    }

    fn define_all(&mut self, labels: &[String], values: &[ValueId]) -> Result<(), CompilerError> {
        if labels.len() != values.len() {
            return_snapshot_error!(
                format!(
                    "Instruction in '{}' produces {} results but {} labels were given",
                    self.function_name,
                    values.len(),
                    labels.len()
                ),
                {
                    FunctionName => self.function_name,
                }
            );
        }

        for (label, value) in labels.iter().zip(values) {
            self.define(label, *value)?;
        }
        Ok(())
    }

    fn value(&self, label: &str) -> Result<ValueId, CompilerError> {
        match self.values.get(label) {
            Some(value) => Ok(*value),
            None => {
                return_snapshot_error!(format!("Unknown value '{label}' in '{}'", self.function_name), {
                    ValueName => label,
                    FunctionName => self.function_name,
                    PrimarySuggestion => "Values must be defined before they are used",
                });
            }
        }
    }

    fn values(&self, labels: &[String]) -> Result<Vec<ValueId>, CompilerError> {
        labels.iter().map(|label| self.value(label)).collect()
    }

    fn decl(&self, label: &str) -> Result<DeclId, CompilerError> {
        match self.decls_by_label.get(label) {
            Some(decl) => Ok(*decl),
            None => {
                return_snapshot_error!(format!("Unknown declaration '{label}' in '{}'", self.function_name), {
                    DeclarationName => label,
                    FunctionName => self.function_name,
                });
            }
        }
    }

    fn optional_decl(&self, label: &Option<String>) -> Result<Option<DeclId>, CompilerError> {
        match label {
            Some(label) => Ok(Some(self.decl(label)?)),
            None => Ok(None),
        }
    }

    fn forward(
        &mut self,
        body: &mut FunctionBuilder<'_>,
        kind: ForwardKind,
        operand: &SingleOperand,
    ) -> Result<(), CompilerError> {
        let value = body.forward(kind, self.value(&operand.operand)?)?;
        self.define(&operand.result, value)
    }

    fn lifetime_end(
        &mut self,
        body: &mut FunctionBuilder<'_>,
        kind: LifetimeEndKind,
        operand: &OperandOnly,
    ) -> Result<(), CompilerError> {
        body.lifetime_end(kind, self.value(&operand.operand)?)?;
        Ok(())
    }

    fn lower_type(&self, body: &mut FunctionBuilder<'_>, ty: &SnapshotType) -> Result<IrType, CompilerError> {
        lower_type(body.module_builder(), self.decls_by_label, ty)
    }

    fn lower_instruction(
        &mut self,
        body: &mut FunctionBuilder<'_>,
        instruction: &SnapshotInstruction,
    ) -> Result<(), CompilerError> {
        match instruction {
            SnapshotInstruction::AllocStack {
                result,
                ty,
                decl,
                debug_name,
            } => {
                let ty = self.lower_type(body, ty)?;
                let decl = self.optional_decl(decl)?;
                let value = body.alloc_stack(ty, decl, debug_name.as_deref())?;
                self.define(result, value)
            }
            SnapshotInstruction::AllocBox {
                result,
                ty,
                decl,
                debug_name,
            } => {
                let ty = self.lower_type(body, ty)?;
                let decl = self.optional_decl(decl)?;
                let value = body.alloc_box(ty, decl, debug_name.as_deref())?;
                self.define(result, value)
            }
            SnapshotInstruction::GlobalAddr { result, global } => {
                let value = body.global_addr(self.decl(global)?)?;
                self.define(result, value)
            }
            SnapshotInstruction::StructExtract {
                result,
                operand,
                field,
            } => {
                let value = body.struct_extract(self.value(operand)?, self.decl(field)?)?;
                self.define(result, value)
            }
            SnapshotInstruction::StructElementAddr {
                result,
                operand,
                field,
            } => {
                let value = body.struct_element_addr(self.value(operand)?, self.decl(field)?)?;
                self.define(result, value)
            }
            SnapshotInstruction::TupleExtract {
                result,
                operand,
                index,
            } => {
                let value = body.tuple_extract(self.value(operand)?, *index)?;
                self.define(result, value)
            }
            SnapshotInstruction::TupleElementAddr {
                result,
                operand,
                index,
            } => {
                let value = body.tuple_element_addr(self.value(operand)?, *index)?;
                self.define(result, value)
            }
            SnapshotInstruction::RefElementAddr {
                result,
                operand,
                field,
            } => {
                let value = body.ref_element_addr(self.value(operand)?, self.decl(field)?)?;
                self.define(result, value)
            }
            SnapshotInstruction::OpenExistentialAddr {
                result,
                operand,
                ty,
            } => {
                let ty = self.lower_type(body, ty)?;
                let value = body.open_existential_addr(self.value(operand)?, ty)?;
                self.define(result, value)
            }
            SnapshotInstruction::DestructureTuple { results, operand } => {
                let values = body.destructure_tuple(self.value(operand)?)?;
                self.define_all(results, &values)
            }
            SnapshotInstruction::DestructureStruct { results, operand } => {
                let values = body.destructure_struct(self.value(operand)?)?;
                self.define_all(results, &values)
            }
            SnapshotInstruction::Store {
                src,
                dest,
                qualifier,
            } => {
                let qualifier = match qualifier {
                    SnapshotStoreQualifier::Unqualified => StoreQualifier::Unqualified,
                    SnapshotStoreQualifier::Init => StoreQualifier::Init,
                    SnapshotStoreQualifier::Assign => StoreQualifier::Assign,
                    SnapshotStoreQualifier::Trivial => StoreQualifier::Trivial,
                };
                body.store(self.value(src)?, self.value(dest)?, qualifier)?;
                Ok(())
            }
            SnapshotInstruction::CopyAddr { src, dest, init } => {
                body.copy_addr(self.value(src)?, self.value(dest)?, *init)?;
                Ok(())
            }

            SnapshotInstruction::BeginBorrow(operand) => {
                self.forward(body, ForwardKind::BeginBorrow, operand)
            }
            SnapshotInstruction::Load(operand) => self.forward(body, ForwardKind::Load, operand),
            SnapshotInstruction::LoadBorrow(operand) => {
                self.forward(body, ForwardKind::LoadBorrow, operand)
            }
            SnapshotInstruction::BeginAccess(operand) => {
                self.forward(body, ForwardKind::BeginAccess, operand)
            }
            SnapshotInstruction::MarkUnresolvedNonCopyableValue(operand) => {
                self.forward(body, ForwardKind::MarkUnresolvedNonCopyableValue, operand)
            }
            SnapshotInstruction::ProjectBox(operand) => {
                self.forward(body, ForwardKind::ProjectBox, operand)
            }
            SnapshotInstruction::CopyValue(operand) => {
                self.forward(body, ForwardKind::CopyValue, operand)
            }
            SnapshotInstruction::ConvertFunction(operand) => {
                self.forward(body, ForwardKind::ConvertFunction, operand)
            }
            SnapshotInstruction::MarkUninitialized(operand) => {
                self.forward(body, ForwardKind::MarkUninitialized, operand)
            }
            SnapshotInstruction::CopyableToMoveOnlyWrapperAddr(operand) => {
                self.forward(body, ForwardKind::CopyableToMoveOnlyWrapperAddr, operand)
            }
            SnapshotInstruction::MoveOnlyWrapperToCopyableAddr(operand) => {
                self.forward(body, ForwardKind::MoveOnlyWrapperToCopyableAddr, operand)
            }

            SnapshotInstruction::FunctionRef { result, function } => {
                let Some(function_id) = self.functions_by_name.get(function).copied() else {
                    return_snapshot_error!(format!("Unknown function '{function}'"), {
                        FunctionName => function,
                    });
                };
                let value = body.function_ref(function_id)?;
                self.define(result, value)
            }
            SnapshotInstruction::Method {
                result,
                member,
                has_self_param,
            } => {
                let member = self.optional_decl(member)?;
                let value = body.method(member, *has_self_param)?;
                self.define(result, value)
            }
            SnapshotInstruction::Apply {
                result,
                callee,
                arguments,
                ty,
            } => {
                let ty = self.lower_type(body, ty)?;
                let value = body.apply(self.value(callee)?, self.values(arguments)?, ty)?;
                self.define(result, value)
            }
            SnapshotInstruction::BeginApply {
                results,
                callee,
                arguments,
                yield_types,
            } => {
                let mut lowered_yields = Vec::with_capacity(yield_types.len());
                for ty in yield_types {
                    lowered_yields.push(self.lower_type(body, ty)?);
                }
                let values = body.begin_apply(self.value(callee)?, self.values(arguments)?, lowered_yields)?;
                self.define_all(results, &values)
            }
            SnapshotInstruction::PartialApply {
                result,
                callee,
                arguments,
            } => {
                let value = body.partial_apply(self.value(callee)?, self.values(arguments)?)?;
                self.define(result, value)
            }
            SnapshotInstruction::PointerToAddress {
                result,
                operand,
                ty,
            } => {
                let ty = self.lower_type(body, ty)?;
                let value = body.pointer_to_address(self.value(operand)?, ty)?;
                self.define(result, value)
            }
            SnapshotInstruction::AddressToPointer(operand) => {
                let value = body.address_to_pointer(self.value(&operand.operand)?)?;
                self.define(&operand.result, value)
            }
            SnapshotInstruction::DebugValue { operand, name } => {
                body.debug_value(self.value(operand)?, name)?;
                Ok(())
            }

            SnapshotInstruction::EndAccess(operand) => {
                self.lifetime_end(body, LifetimeEndKind::EndAccess, operand)
            }
            SnapshotInstruction::EndBorrow(operand) => {
                self.lifetime_end(body, LifetimeEndKind::EndBorrow, operand)
            }
            SnapshotInstruction::DestroyAddr(operand) => {
                self.lifetime_end(body, LifetimeEndKind::DestroyAddr, operand)
            }
            SnapshotInstruction::DestroyValue(operand) => {
                self.lifetime_end(body, LifetimeEndKind::DestroyValue, operand)
            }
            SnapshotInstruction::DeallocStack(operand) => {
                self.lifetime_end(body, LifetimeEndKind::DeallocStack, operand)
            }
            SnapshotInstruction::DeallocBox(operand) => {
                self.lifetime_end(body, LifetimeEndKind::DeallocBox, operand)
            }
            SnapshotInstruction::Return(operand) => {
                body.return_value(self.value(&operand.operand)?)?;
                Ok(())
            }

            SnapshotInstruction::Opaque {
                name,
                operands,
                results,
                result_types,
            } => {
                let mut lowered_types = Vec::with_capacity(result_types.len());
                for ty in result_types {
                    lowered_types.push(self.lower_type(body, ty)?);
                }
                let values = body.opaque(name, self.values(operands)?, lowered_types)?;
                self.define_all(results, &values)
            }
        }
    }
}
