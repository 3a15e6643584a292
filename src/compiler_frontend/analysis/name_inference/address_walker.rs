//! Finds every instruction that may write through an address.
//!
//! The walk follows the address through operations that produce another address into the
//! same memory (projections, accesses, borrows, wrapper conversions, box projections) and
//! classifies every other use as a leaf. A use that is neither stops the walk with
//! `AddressUseKind::Unknown`, since writes behind it could not be seen.

use crate::compiler_frontend::ir::ir_nodes::{
    ForwardKind, InstId, InstKind, IrFunction, IrInstruction, ValueId,
};
use crate::name_log;
use rustc_hash::FxHashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) enum AddressUseKind {
    NonEscaping,

    /// The address was converted to a raw pointer. Still a known use.
    PointerEscape,

    Unknown,
}

impl AddressUseKind {
    fn merge(self, other: AddressUseKind) -> AddressUseKind {
        self.max(other)
    }
}

#[derive(Debug, Clone)]
pub(crate) struct AddressWalk {
    pub kind: AddressUseKind,

    /// Leaf users that may write to memory, keyed by instruction.
    pub writes: FxHashSet<InstId>,
}

enum UseClass {
    /// The user produces another address into the same memory.
    Transitive(ValueId),
    Leaf,
    PointerEscape,
    Unknown,
}

pub(crate) fn walk_address_uses(function: &IrFunction, address: ValueId) -> AddressWalk {
    let mut walk = AddressWalk {
        kind: AddressUseKind::NonEscaping,
        writes: FxHashSet::default(),
    };

    let mut visited = FxHashSet::default();
    let mut worklist = vec![address];

    while let Some(current) = worklist.pop() {
        if !visited.insert(current) {
            continue;
        }

        for user in function.users(current) {
            match classify_use(user) {
                UseClass::Transitive(result) => worklist.push(result),
                UseClass::Leaf => {
                    if user.kind.may_write_to_memory() {
                        walk.writes.insert(user.id);
                    }
                }
                UseClass::PointerEscape => {
                    walk.kind = walk.kind.merge(AddressUseKind::PointerEscape);
                }
                UseClass::Unknown => {
                    name_log!(Yellow "Unknown address use: ", user.kind.opcode());
                    walk.kind = AddressUseKind::Unknown;
                    return walk;
                }
            }
        }
    }

    walk
}

/// The write set of an allocation, or None when some use could not be understood.
pub(crate) fn find_address_writes(function: &IrFunction, address: ValueId) -> Option<FxHashSet<InstId>> {
    let walk = walk_address_uses(function, address);
    match walk.kind {
        AddressUseKind::Unknown => None,
        AddressUseKind::NonEscaping | AddressUseKind::PointerEscape => Some(walk.writes),
    }
}

fn classify_use(user: &IrInstruction) -> UseClass {
    match &user.kind {
        InstKind::TupleElementAddr { .. }
        | InstKind::StructElementAddr { .. }
        | InstKind::OpenExistentialAddr { .. } => transitive(user),

        InstKind::Forward { kind, .. } => {
            if kind.is_memory_read() {
                UseClass::Leaf
            } else if matches!(kind, ForwardKind::ConvertFunction) {
                UseClass::Unknown
            } else {
                transitive(user)
            }
        }

        InstKind::Store { .. }
        | InstKind::CopyAddr { .. }
        | InstKind::LifetimeEnd { .. }
        | InstKind::DebugValue { .. }
        | InstKind::Apply { .. }
        | InstKind::BeginApply { .. }
        | InstKind::PartialApply { .. } => UseClass::Leaf,

        InstKind::AddressToPointer { .. } => UseClass::PointerEscape,

        InstKind::AllocStack { .. }
        | InstKind::AllocBox { .. }
        | InstKind::GlobalAddr { .. }
        | InstKind::StructExtract { .. }
        | InstKind::TupleExtract { .. }
        | InstKind::RefElementAddr { .. }
        | InstKind::DestructureTuple { .. }
        | InstKind::DestructureStruct { .. }
        | InstKind::FunctionRef { .. }
        | InstKind::Method { .. }
        | InstKind::PointerToAddress { .. }
        | InstKind::Return { .. }
        | InstKind::Opaque { .. } => UseClass::Unknown,
    }
}

fn transitive(user: &IrInstruction) -> UseClass {
    match user.result() {
        Some(result) => UseClass::Transitive(result),
        None => UseClass::Unknown,
    }
}
