//! The backward walk from a value to the value its name comes from.
//!
//! `step` applies the first matching rule to a single value. Rules, in order:
//!  1. allocations carrying a declaration or a named debug variable are roots,
//!     nameless allocations continue from the value that initialised them
//!  2. `global_addr` is a root
//!  3. `open_existential_addr` is looked through
//!  4. field and tuple projections push themselves and continue from their operand
//!  5. destructure results push themselves and continue from the destructured value
//!  6. function arguments with a declaration are roots
//!  7. values yielded by a read/modify coroutine continue from the accessor's receiver
//!  8. the same for any call, when inferring through all accessors
//!  9. addressor results (`pointer_to_address` of a call) continue from the receiver
//! 10. a conversion thunk wrapping a single function value is looked through
//! 11. a value with a named `debug_value` use is a root
//! 12. single operand forwarding instructions are looked through
//!
//! Anything else has no name.

use crate::compiler_frontend::analysis::name_inference::InferenceOptions;
use crate::compiler_frontend::analysis::name_inference::name_path::PathComponent;
use crate::compiler_frontend::analysis::name_inference::temporary_allocation::root_value_for_temporary_allocation;
use crate::compiler_frontend::ir::ir_nodes::{
    ForwardKind, InstKind, IrFunction, IrInstruction, IrModule, ValueDef, ValueId,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WalkStep {
    Continue {
        next: ValueId,
        component: Option<PathComponent>,
    },
    Root {
        root: ValueId,
        component: PathComponent,
    },
    Stop,
}

impl WalkStep {
    fn look_through(next: ValueId) -> WalkStep {
        WalkStep::Continue {
            next,
            component: None,
        }
    }

    fn push_and_continue(next: ValueId, component: PathComponent) -> WalkStep {
        WalkStep::Continue {
            next,
            component: Some(component),
        }
    }
}

pub(crate) fn step(
    module: &IrModule,
    function: &IrFunction,
    value: ValueId,
    options: InferenceOptions,
) -> WalkStep {
    let Some(ir_value) = function.value(value) else {
        return WalkStep::Stop;
    };

    let defining = match ir_value.def {
        ValueDef::Argument { decl, .. } => {
            // Rule 6. Undeclared arguments can still be named by a debug_value use.
            if decl.is_some() {
                return WalkStep::Root {
                    root: value,
                    component: PathComponent::Value(value),
                };
            }
            None
        }
        ValueDef::Result { inst, .. } => function.instruction(inst),
    };

    if let Some(inst) = defining {
        if let Some(step) = step_through_definition(module, function, inst, value) {
            return step;
        }

        if let Some(step) = step_through_accessor(module, function, inst, value, options) {
            return step;
        }
    }

    if let Some(debug_value) = function.users(value).find(|user| match &user.kind {
        InstKind::DebugValue { var, .. } => !module.resolve(var.name).is_empty(),
        _ => false,
    }) {
        return WalkStep::Root {
            root: value,
            component: PathComponent::Instruction(debug_value.id),
        };
    }

    match defining.map(|inst| &inst.kind) {
        Some(InstKind::Forward { operand, .. }) => WalkStep::look_through(*operand),
        _ => WalkStep::Stop,
    }
}

/// Rules 1 to 5.
fn step_through_definition(
    module: &IrModule,
    function: &IrFunction,
    inst: &IrInstruction,
    value: ValueId,
) -> Option<WalkStep> {
    let component = PathComponent::Instruction(inst.id);

    let step = match &inst.kind {
        InstKind::AllocStack { decl, debug_var } | InstKind::AllocBox { decl, debug_var } => {
            let has_debug_name = debug_var
                .as_ref()
                .is_some_and(|var| !module.resolve(var.name).is_empty());
            if decl.is_some() || has_debug_name {
                WalkStep::Root {
                    root: value,
                    component,
                }
            } else {
                match root_value_for_temporary_allocation(function, inst) {
                    Some(initial_value) => WalkStep::look_through(initial_value),
                    None => WalkStep::Stop,
                }
            }
        }

        InstKind::GlobalAddr { .. } => WalkStep::Root {
            root: value,
            component,
        },

        InstKind::OpenExistentialAddr { operand } => WalkStep::look_through(*operand),

        InstKind::RefElementAddr { operand, .. }
        | InstKind::StructExtract { operand, .. }
        | InstKind::TupleExtract { operand, .. }
        | InstKind::StructElementAddr { operand, .. }
        | InstKind::TupleElementAddr { operand, .. } => WalkStep::push_and_continue(*operand, component),

        InstKind::DestructureTuple { operand } | InstKind::DestructureStruct { operand } => {
            WalkStep::push_and_continue(*operand, PathComponent::Value(value))
        }

        _ => return None,
    };

    Some(step)
}

/// Rules 7 to 10.
fn step_through_accessor(
    module: &IrModule,
    function: &IrFunction,
    inst: &IrInstruction,
    value: ValueId,
    options: InferenceOptions,
) -> Option<WalkStep> {
    if matches!(inst.kind, InstKind::BeginApply { .. }) {
        if let Some(step) = receiver_of_call(function, inst) {
            return Some(step);
        }
    }

    if options.contains(InferenceOptions::INFER_SELF_THROUGH_ALL_ACCESSORS) {
        if let Some(step) = receiver_of_call(function, inst) {
            return Some(step);
        }
    }

    if let Some(addressor) = addressor_call(function, value) {
        if let Some(step) = receiver_of_call(function, addressor) {
            return Some(step);
        }
    }

    if let InstKind::PartialApply { callee, arguments } = &inst.kind {
        if let [argument] = arguments.as_slice() {
            let is_thunk = match function.defining_instruction(*callee).map(|callee| &callee.kind) {
                Some(InstKind::FunctionRef { function: callee }) => {
                    module.function(*callee).is_some_and(|callee| callee.is_thunk)
                }
                _ => false,
            };

            let wraps_function = function
                .value_type(*argument)
                .is_some_and(|ty| ty.is_function());

            if is_thunk && wraps_function {
                return Some(WalkStep::look_through(*argument));
            }
        }
    }

    None
}

/// For a full apply site whose callee is a `function_ref` or `method` with a self parameter,
/// pushes the callee and continues from the receiver.
fn receiver_of_call(function: &IrFunction, call: &IrInstruction) -> Option<WalkStep> {
    let site = call.kind.full_apply_site()?;
    let callee = function.defining_instruction(site.callee)?;

    if !matches!(callee.kind, InstKind::FunctionRef { .. } | InstKind::Method { .. }) {
        return None;
    }

    if !function.value_type(site.callee)?.has_self_param() {
        return None;
    }

    let receiver = site.self_argument()?;
    Some(WalkStep::push_and_continue(
        receiver,
        PathComponent::Instruction(callee.id),
    ))
}

/// The `apply` of an addressor producing `value`, looking through access markers.
/// Addressors return either the raw pointer or a struct wrapping it.
fn addressor_call(function: &IrFunction, value: ValueId) -> Option<&IrInstruction> {
    let address = strip_access_markers(function, value);
    let InstKind::PointerToAddress { operand: pointer } = &function.defining_instruction(address)?.kind else {
        return None;
    };

    let pointer_source = function.defining_instruction(*pointer)?;
    let call = match &pointer_source.kind {
        InstKind::StructExtract { operand, .. } => function.defining_instruction(*operand)?,
        _ => pointer_source,
    };

    match call.kind {
        InstKind::Apply { .. } => Some(call),
        _ => None,
    }
}

fn strip_access_markers(function: &IrFunction, mut value: ValueId) -> ValueId {
    while let Some(InstKind::Forward {
        kind: ForwardKind::BeginAccess,
        operand,
    }) = function.defining_instruction(value).map(|inst| &inst.kind)
    {
        value = *operand;
    }
    value
}

