//! ============================================================
//!                         IR Nodes
//! ============================================================
//! A typed, SSA-form intermediate representation.
//!  - Every value is defined exactly once, by an instruction result or a function argument
//!  - Every value knows its uses, so forward scans from an address are cheap
//!  - Instructions live in basic blocks in program order
//!  - All nodes are addressed by stable IDs into per-function arenas
//!
//! The graph is built once through the builders and is read-only afterwards.
//! Analyses borrow it and never mutate it.

use crate::compiler_frontend::ir::ir_declarations::DeclarationTable;
use crate::compiler_frontend::ir::ir_types::IrType;
use crate::compiler_frontend::string_interning::{StringId, StringTable};
use std::fmt::{Display, Formatter, Result as FmtResult};

// ============================================================
// Stable IDs
// ============================================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ValueId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FunctionId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeclId(pub u32);

impl Display for ValueId {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "%{}", self.0)
    }
}

impl Display for InstId {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "inst{}", self.0)
    }
}

impl Display for BlockId {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "bb{}", self.0)
    }
}

impl Display for FunctionId {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "fn{}", self.0)
    }
}

impl Display for DeclId {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "decl{}", self.0)
    }
}

// ============================================================
// Module
// ============================================================
#[derive(Debug, Clone, Default)]
pub struct IrModule {
    pub functions: Vec<IrFunction>,
    pub declarations: DeclarationTable,
    pub string_table: StringTable,
}

impl IrModule {
    pub fn function(&self, id: FunctionId) -> Option<&IrFunction> {
        self.functions.get(id.0 as usize)
    }

    pub fn function_by_name(&self, name: &str) -> Option<&IrFunction> {
        let name = self.string_table.get_existing(name)?;
        self.functions.iter().find(|function| function.name == name)
    }

    /// User facing name of an optional declaration, `<unknown decl>` when there is none.
    pub fn decl_name(&self, decl: Option<DeclId>) -> &str {
        self.declarations.display_name(decl, &self.string_table)
    }

    pub fn resolve(&self, id: StringId) -> &str {
        self.string_table.resolve(id)
    }
}

// ============================================================
// Functions
// ============================================================
#[derive(Debug, Clone)]
pub struct IrFunction {
    pub id: FunctionId,
    pub name: StringId,

    /// The declaration this function was emitted for (accessor, method, free function).
    /// Compiler generated code such as thunks may have none.
    pub decl_context: Option<DeclId>,

    /// Compiler generated reabstraction / conversion thunk.
    pub is_thunk: bool,
    pub has_self_param: bool,

    pub arguments: Vec<ValueId>,
    pub blocks: Vec<IrBlock>,
    pub instructions: Vec<IrInstruction>,
    pub values: Vec<IrValue>,
}

impl IrFunction {
    pub fn value(&self, id: ValueId) -> Option<&IrValue> {
        self.values.get(id.0 as usize)
    }

    pub fn instruction(&self, id: InstId) -> Option<&IrInstruction> {
        self.instructions.get(id.0 as usize)
    }

    pub fn block(&self, id: BlockId) -> Option<&IrBlock> {
        self.blocks.get(id.0 as usize)
    }

    pub fn is_declaration_only(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn value_type(&self, id: ValueId) -> Option<&IrType> {
        self.value(id).map(|value| &value.ty)
    }

    /// The instruction producing `id`, or None for function arguments.
    pub fn defining_instruction(&self, id: ValueId) -> Option<&IrInstruction> {
        match self.value(id)?.def {
            ValueDef::Result { inst, .. } => self.instruction(inst),
            ValueDef::Argument { .. } => None,
        }
    }

    pub fn uses(&self, id: ValueId) -> &[Operand] {
        match self.value(id) {
            Some(value) => &value.uses,
            None => &[],
        }
    }

    /// The users of `id`, one entry per operand (a user reading the value twice appears twice).
    pub fn users(&self, id: ValueId) -> impl Iterator<Item = &IrInstruction> {
        self.uses(id)
            .iter()
            .filter_map(|operand| self.instruction(operand.user))
    }

    /// Index of `id` among the results of its defining instruction.
    pub fn result_index(&self, id: ValueId) -> Option<usize> {
        match self.value(id)?.def {
            ValueDef::Result { index, .. } => Some(index),
            ValueDef::Argument { .. } => None,
        }
    }

    /// The instructions of `start`'s block in program order, beginning with `start` itself.
    pub fn instructions_from(&self, start: InstId) -> impl Iterator<Item = &IrInstruction> {
        let block_instructions = self
            .instruction(start)
            .and_then(|inst| self.block(inst.block))
            .map(|block| block.instructions.as_slice())
            .unwrap_or(&[]);

        let position = block_instructions
            .iter()
            .position(|id| *id == start)
            .unwrap_or(block_instructions.len());

        block_instructions[position..]
            .iter()
            .filter_map(|id| self.instruction(*id))
    }
}

// ============================================================
// Blocks
// ============================================================
#[derive(Debug, Clone)]
pub struct IrBlock {
    pub id: BlockId,

    /// Instructions in program order.
    pub instructions: Vec<InstId>,
}

// ============================================================
// Values
// ============================================================
#[derive(Debug, Clone)]
pub struct IrValue {
    pub id: ValueId,
    pub ty: IrType,
    pub def: ValueDef,
    pub uses: Vec<Operand>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueDef {
    Argument { index: usize, decl: Option<DeclId> },
    Result { inst: InstId, index: usize },
}

/// An edge from an instruction to one of the values it reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Operand {
    pub user: InstId,
    pub operand_index: usize,
}

// ============================================================
// Instructions
// ============================================================
#[derive(Debug, Clone)]
pub struct IrInstruction {
    pub id: InstId,
    pub block: BlockId,
    pub kind: InstKind,
    pub results: Vec<ValueId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DebugVariable {
    pub name: StringId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreQualifier {
    Unqualified,
    Init,
    Assign,
    Trivial,
}

impl StoreQualifier {
    /// Everything except `assign` establishes the first value of the destination.
    pub fn is_initialization(self) -> bool {
        self != StoreQualifier::Assign
    }
}

/// Single operand instructions that name inference looks straight through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForwardKind {
    BeginBorrow,
    Load,
    LoadBorrow,
    BeginAccess,
    MarkUnresolvedNonCopyableValue,
    ProjectBox,
    CopyValue,
    ConvertFunction,
    MarkUninitialized,
    CopyableToMoveOnlyWrapperAddr,
    MoveOnlyWrapperToCopyableAddr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifetimeEndKind {
    EndAccess,
    EndBorrow,
    DestroyAddr,
    DestroyValue,
    DeallocStack,
    DeallocBox,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstKind {
    // Allocations
    AllocStack {
        decl: Option<DeclId>,
        debug_var: Option<DebugVariable>,
    },
    AllocBox {
        decl: Option<DeclId>,
        debug_var: Option<DebugVariable>,
    },
    GlobalAddr {
        global: DeclId,
    },

    // Projections
    StructExtract {
        operand: ValueId,
        field: DeclId,
    },
    StructElementAddr {
        operand: ValueId,
        field: DeclId,
    },
    TupleExtract {
        operand: ValueId,
        index: usize,
    },
    TupleElementAddr {
        operand: ValueId,
        index: usize,
    },
    RefElementAddr {
        operand: ValueId,
        field: DeclId,
    },
    OpenExistentialAddr {
        operand: ValueId,
    },

    // Destructures (one result per element)
    DestructureTuple {
        operand: ValueId,
    },
    DestructureStruct {
        operand: ValueId,
    },

    // Writes
    Store {
        src: ValueId,
        dest: ValueId,
        qualifier: StoreQualifier,
    },
    CopyAddr {
        src: ValueId,
        dest: ValueId,
        is_init_of_dest: bool,
    },

    Forward {
        kind: ForwardKind,
        operand: ValueId,
    },

    // Callees and calls
    FunctionRef {
        function: FunctionId,
    },
    Method {
        member: Option<DeclId>,
    },
    Apply {
        callee: ValueId,
        arguments: Vec<ValueId>,
    },
    BeginApply {
        callee: ValueId,
        arguments: Vec<ValueId>,
    },
    PartialApply {
        callee: ValueId,
        arguments: Vec<ValueId>,
    },

    // Raw pointers
    PointerToAddress {
        operand: ValueId,
    },
    AddressToPointer {
        operand: ValueId,
    },

    DebugValue {
        operand: ValueId,
        var: DebugVariable,
    },

    LifetimeEnd {
        kind: LifetimeEndKind,
        operand: ValueId,
    },

    Return {
        operand: ValueId,
    },

    /// Anything the analyses have no model for.
    Opaque {
        name: StringId,
        operands: Vec<ValueId>,
    },
}

/// The callee and arguments of an `apply` or `begin_apply`.
#[derive(Debug, Clone, Copy)]
pub struct FullApplySite<'a> {
    pub callee: ValueId,
    pub arguments: &'a [ValueId],
}

impl FullApplySite<'_> {
    /// By convention the receiver of a method is passed last.
    pub fn self_argument(&self) -> Option<ValueId> {
        self.arguments.last().copied()
    }
}

impl InstKind {
    /// Operands in a fixed order: sources before destinations, callee before arguments.
    pub fn operands(&self) -> Vec<ValueId> {
        match self {
            InstKind::AllocStack { .. }
            | InstKind::AllocBox { .. }
            | InstKind::GlobalAddr { .. }
            | InstKind::FunctionRef { .. }
            | InstKind::Method { .. } => Vec::new(),

            InstKind::StructExtract { operand, .. }
            | InstKind::StructElementAddr { operand, .. }
            | InstKind::TupleExtract { operand, .. }
            | InstKind::TupleElementAddr { operand, .. }
            | InstKind::RefElementAddr { operand, .. }
            | InstKind::OpenExistentialAddr { operand }
            | InstKind::DestructureTuple { operand }
            | InstKind::DestructureStruct { operand }
            | InstKind::Forward { operand, .. }
            | InstKind::PointerToAddress { operand }
            | InstKind::AddressToPointer { operand }
            | InstKind::DebugValue { operand, .. }
            | InstKind::LifetimeEnd { operand, .. }
            | InstKind::Return { operand } => vec![*operand],

            InstKind::Store { src, dest, .. } | InstKind::CopyAddr { src, dest, .. } => {
                vec![*src, *dest]
            }

            InstKind::Apply { callee, arguments }
            | InstKind::BeginApply { callee, arguments }
            | InstKind::PartialApply { callee, arguments } => {
                let mut operands = Vec::with_capacity(arguments.len() + 1);
                operands.push(*callee);
                operands.extend(arguments.iter().copied());
                operands
            }

            InstKind::Opaque { operands, .. } => operands.clone(),
        }
    }

    pub fn full_apply_site(&self) -> Option<FullApplySite<'_>> {
        match self {
            InstKind::Apply { callee, arguments } | InstKind::BeginApply { callee, arguments } => {
                Some(FullApplySite {
                    callee: *callee,
                    arguments,
                })
            }
            _ => None,
        }
    }

    pub fn is_allocation(&self) -> bool {
        matches!(self, InstKind::AllocStack { .. } | InstKind::AllocBox { .. })
    }

    pub fn may_write_to_memory(&self) -> bool {
        match self {
            InstKind::Store { .. }
            | InstKind::CopyAddr { .. }
            | InstKind::Apply { .. }
            | InstKind::BeginApply { .. }
            | InstKind::Opaque { .. } => true,

            InstKind::LifetimeEnd { kind, .. } => matches!(
                kind,
                LifetimeEndKind::DestroyAddr
                    | LifetimeEndKind::DestroyValue
                    | LifetimeEndKind::DeallocStack
                    | LifetimeEndKind::DeallocBox
            ),

            _ => false,
        }
    }

    /// Name of the debug variable this instruction introduces, if any.
    pub fn debug_variable(&self) -> Option<&DebugVariable> {
        match self {
            InstKind::AllocStack { debug_var, .. } | InstKind::AllocBox { debug_var, .. } => {
                debug_var.as_ref()
            }
            InstKind::DebugValue { var, .. } => Some(var),
            _ => None,
        }
    }

    pub fn opcode(&self) -> &'static str {
        match self {
            InstKind::AllocStack { .. } => "alloc_stack",
            InstKind::AllocBox { .. } => "alloc_box",
            InstKind::GlobalAddr { .. } => "global_addr",
            InstKind::StructExtract { .. } => "struct_extract",
            InstKind::StructElementAddr { .. } => "struct_element_addr",
            InstKind::TupleExtract { .. } => "tuple_extract",
            InstKind::TupleElementAddr { .. } => "tuple_element_addr",
            InstKind::RefElementAddr { .. } => "ref_element_addr",
            InstKind::OpenExistentialAddr { .. } => "open_existential_addr",
            InstKind::DestructureTuple { .. } => "destructure_tuple",
            InstKind::DestructureStruct { .. } => "destructure_struct",
            InstKind::Store { .. } => "store",
            InstKind::CopyAddr { .. } => "copy_addr",
            InstKind::Forward { kind, .. } => kind.opcode(),
            InstKind::FunctionRef { .. } => "function_ref",
            InstKind::Method { .. } => "method",
            InstKind::Apply { .. } => "apply",
            InstKind::BeginApply { .. } => "begin_apply",
            InstKind::PartialApply { .. } => "partial_apply",
            InstKind::PointerToAddress { .. } => "pointer_to_address",
            InstKind::AddressToPointer { .. } => "address_to_pointer",
            InstKind::DebugValue { .. } => "debug_value",
            InstKind::LifetimeEnd { kind, .. } => kind.opcode(),
            InstKind::Return { .. } => "return",
            InstKind::Opaque { .. } => "opaque",
        }
    }
}

impl ForwardKind {
    pub const ALL: [ForwardKind; 11] = [
        ForwardKind::BeginBorrow,
        ForwardKind::Load,
        ForwardKind::LoadBorrow,
        ForwardKind::BeginAccess,
        ForwardKind::MarkUnresolvedNonCopyableValue,
        ForwardKind::ProjectBox,
        ForwardKind::CopyValue,
        ForwardKind::ConvertFunction,
        ForwardKind::MarkUninitialized,
        ForwardKind::CopyableToMoveOnlyWrapperAddr,
        ForwardKind::MoveOnlyWrapperToCopyableAddr,
    ];

    pub fn opcode(self) -> &'static str {
        match self {
            ForwardKind::BeginBorrow => "begin_borrow",
            ForwardKind::Load => "load",
            ForwardKind::LoadBorrow => "load_borrow",
            ForwardKind::BeginAccess => "begin_access",
            ForwardKind::MarkUnresolvedNonCopyableValue => "mark_unresolved_non_copyable_value",
            ForwardKind::ProjectBox => "project_box",
            ForwardKind::CopyValue => "copy_value",
            ForwardKind::ConvertFunction => "convert_function",
            ForwardKind::MarkUninitialized => "mark_uninitialized",
            ForwardKind::CopyableToMoveOnlyWrapperAddr => "copyable_to_moveonlywrapper_addr",
            ForwardKind::MoveOnlyWrapperToCopyableAddr => "moveonlywrapper_to_copyable_addr",
        }
    }

    pub fn from_opcode(opcode: &str) -> Option<ForwardKind> {
        ForwardKind::ALL
            .into_iter()
            .find(|kind| kind.opcode() == opcode)
    }

    /// Reads through an address rather than forwarding it.
    pub fn is_memory_read(self) -> bool {
        matches!(self, ForwardKind::Load | ForwardKind::LoadBorrow)
    }
}

impl LifetimeEndKind {
    pub const ALL: [LifetimeEndKind; 6] = [
        LifetimeEndKind::EndAccess,
        LifetimeEndKind::EndBorrow,
        LifetimeEndKind::DestroyAddr,
        LifetimeEndKind::DestroyValue,
        LifetimeEndKind::DeallocStack,
        LifetimeEndKind::DeallocBox,
    ];

    pub fn opcode(self) -> &'static str {
        match self {
            LifetimeEndKind::EndAccess => "end_access",
            LifetimeEndKind::EndBorrow => "end_borrow",
            LifetimeEndKind::DestroyAddr => "destroy_addr",
            LifetimeEndKind::DestroyValue => "destroy_value",
            LifetimeEndKind::DeallocStack => "dealloc_stack",
            LifetimeEndKind::DeallocBox => "dealloc_box",
        }
    }

    pub fn from_opcode(opcode: &str) -> Option<LifetimeEndKind> {
        LifetimeEndKind::ALL
            .into_iter()
            .find(|kind| kind.opcode() == opcode)
    }
}

impl IrInstruction {
    /// The single result of a single value instruction.
    pub fn result(&self) -> Option<ValueId> {
        match self.results.as_slice() {
            [result] => Some(*result),
            _ => None,
        }
    }
}

/// A value of a specific function. Queries against a module are phrased in these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ValueRef {
    pub function: FunctionId,
    pub value: ValueId,
}
