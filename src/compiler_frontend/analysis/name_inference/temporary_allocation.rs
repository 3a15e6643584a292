//! Recovers the value a nameless temporary allocation was initialised from.
//!
//! Only the initialisation patterns produced for temporaries are recognised:
//! a whole value copied or stored into the allocation, or a tuple filled element by element
//! from one destructured value or from the matching elements of one other tuple address.

use crate::compiler_frontend::analysis::name_inference::address_walker::find_address_writes;
use crate::compiler_frontend::ir::ir_nodes::{InstId, InstKind, IrFunction, IrInstruction, ValueDef, ValueId};
use crate::compiler_frontend::ir::ir_types::IrType;
use crate::name_log;
use rustc_hash::FxHashSet;

/// Where the elements of a tuple temporary come from. Sources are never mixed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TupleSource {
    /// `copy_addr [init]` from `tuple_element_addr` projections of this address.
    RootAddress(ValueId),

    /// `store` of the results of this `destructure_tuple`.
    Destructure { inst: InstId, operand: ValueId },
}

/// The value that fully initialises `alloc`, or None if it cannot be determined.
///
/// `alloc` must be an `alloc_stack` or `alloc_box` instruction.
pub(crate) fn root_value_for_temporary_allocation(
    function: &IrFunction,
    alloc: &IrInstruction,
) -> Option<ValueId> {
    if !alloc.kind.is_allocation() {
        return None;
    }

    let address = alloc.result()?;
    let writes = find_address_writes(function, address)?;

    let element_count = match allocated_type(function, address)? {
        IrType::Tuple(elements) => Some(elements.len()),
        _ => None,
    };

    let root = match element_count {
        Some(element_count) => root_for_tuple(function, alloc, address, &writes, element_count),
        None => root_for_non_tuple(function, alloc, address, &writes),
    };

    name_log!(Dark Magenta "Temporary ", address, " initialised from ", format!("{root:?}"));
    root
}

fn allocated_type(function: &IrFunction, address: ValueId) -> Option<&IrType> {
    match function.value_type(address)? {
        IrType::Address(inner) | IrType::Box(inner) => Some(inner),
        _ => None,
    }
}

/// The first write decides. Later writes are never examined.
fn root_for_non_tuple(
    function: &IrFunction,
    alloc: &IrInstruction,
    address: ValueId,
    writes: &FxHashSet<InstId>,
) -> Option<ValueId> {
    let first_write = function
        .instructions_from(alloc.id)
        .find(|inst| writes.contains(&inst.id))?;

    match &first_write.kind {
        InstKind::CopyAddr {
            src,
            dest,
            is_init_of_dest: true,
        } if *dest == address => Some(*src),

        InstKind::Store {
            src,
            dest,
            qualifier,
        } if *dest == address && qualifier.is_initialization() => Some(*src),

        _ => None,
    }
}

fn root_for_tuple(
    function: &IrFunction,
    alloc: &IrInstruction,
    address: ValueId,
    writes: &FxHashSet<InstId>,
    element_count: usize,
) -> Option<ValueId> {
    if element_count == 0 {
        return None;
    }

    let mut covered = vec![false; element_count];
    let mut remaining = element_count;
    let mut source: Option<TupleSource> = None;

    for inst in function.instructions_from(alloc.id) {
        if !writes.contains(&inst.id) {
            continue;
        }

        let (index, write_source) = match &inst.kind {
            InstKind::CopyAddr {
                src,
                dest,
                is_init_of_dest: true,
            } => {
                let Some(index) = element_of(function, *dest, address) else {
                    break;
                };
                let Some((root, src_index)) = tuple_element_projection(function, *src) else {
                    break;
                };
                if src_index != index {
                    return None;
                }
                (index, TupleSource::RootAddress(root))
            }

            InstKind::Store {
                src,
                dest,
                qualifier,
            } if qualifier.is_initialization() => {
                let Some(index) = element_of(function, *dest, address) else {
                    break;
                };
                let Some((destructure, operand, result_index)) = destructure_tuple_result(function, *src)
                else {
                    break;
                };
                if result_index != index {
                    return None;
                }
                (
                    index,
                    TupleSource::Destructure {
                        inst: destructure,
                        operand,
                    },
                )
            }

            _ => break,
        };

        match source {
            None => source = Some(write_source),
            Some(existing) if existing == write_source => {}
            Some(_) => return None,
        }

        match covered.get_mut(index) {
            Some(slot) if !*slot => *slot = true,
            _ => return None,
        }

        remaining -= 1;
        if remaining == 0 {
            break;
        }
    }

    if remaining != 0 {
        return None;
    }

    match source? {
        TupleSource::RootAddress(root) => Some(root),
        TupleSource::Destructure { operand, .. } => Some(operand),
    }
}

/// Index of `value` if it is `tuple_element_addr` of `tuple_address`.
fn element_of(function: &IrFunction, value: ValueId, tuple_address: ValueId) -> Option<usize> {
    match &function.defining_instruction(value)?.kind {
        InstKind::TupleElementAddr { operand, index } if *operand == tuple_address => Some(*index),
        _ => None,
    }
}

fn tuple_element_projection(function: &IrFunction, value: ValueId) -> Option<(ValueId, usize)> {
    match &function.defining_instruction(value)?.kind {
        InstKind::TupleElementAddr { operand, index } => Some((*operand, *index)),
        _ => None,
    }
}

fn destructure_tuple_result(function: &IrFunction, value: ValueId) -> Option<(InstId, ValueId, usize)> {
    let ValueDef::Result { inst, index } = function.value(value)?.def else {
        return None;
    };

    match &function.instruction(inst)?.kind {
        InstKind::DestructureTuple { operand } => Some((inst, *operand, index)),
        _ => None,
    }
}
