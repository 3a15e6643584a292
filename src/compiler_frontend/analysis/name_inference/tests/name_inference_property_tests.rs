#![cfg(test)]

use super::test_support::{
    all_scenarios, build_function, function, infer, infer_permissive, parameter, tuple_of_ints,
};
use crate::compiler_frontend::analysis::name_inference::{
    InferenceOptions, VariableNameInferrer, infer_names,
};
use crate::compiler_frontend::compiler_errors::CompilerError;
use crate::compiler_frontend::ir::ir_builder::{FunctionBuilder, ModuleBuilder};
use crate::compiler_frontend::ir::ir_nodes::{ForwardKind, ValueId, ValueRef};
use crate::compiler_frontend::ir::ir_types::IrType;
use proptest::prelude::*;

const TRANSPARENT_FORWARDS: [ForwardKind; 7] = [
    ForwardKind::BeginBorrow,
    ForwardKind::BeginAccess,
    ForwardKind::CopyValue,
    ForwardKind::MarkUninitialized,
    ForwardKind::MarkUnresolvedNonCopyableValue,
    ForwardKind::CopyableToMoveOnlyWrapperAddr,
    ForwardKind::MoveOnlyWrapperToCopyableAddr,
];

fn forward_chain() -> impl Strategy<Value = Vec<ForwardKind>> {
    prop::collection::vec(prop::sample::select(TRANSPARENT_FORWARDS.to_vec()), 0..4)
}

fn forward_all(
    body: &mut FunctionBuilder<'_>,
    mut value: ValueId,
    kinds: &[ForwardKind],
) -> Result<ValueId, CompilerError> {
    for kind in kinds {
        value = body.forward(*kind, value)?;
    }
    Ok(value)
}

/// `self.inner.1` with the given forwarding chains after the receiver, the struct_extract
/// and the tuple_extract.
fn projection_with_forwards(
    after_receiver: &[ForwardKind],
    after_field: &[ForwardKind],
    after_element: &[ForwardKind],
) -> (Option<String>, Option<ValueId>, ValueId) {
    let mut builder = ModuleBuilder::new();
    let pair = tuple_of_ints(&mut builder, 2);
    let (outer, fields) = builder.declare_struct("Outer", &[("inner", pair)]);
    let self_decl = parameter(&mut builder, "self");

    let mut receiver = None;
    let (function_id, query) = build_function(&mut builder, "forwarded", |body| {
        let argument = body.add_argument(IrType::Struct(outer), Some(self_decl));
        receiver = Some(argument);

        let forwarded = forward_all(body, argument, after_receiver)?;
        let inner = body.struct_extract(forwarded, fields[0])?;
        let forwarded = forward_all(body, inner, after_field)?;
        let element = body.tuple_extract(forwarded, 1)?;
        forward_all(body, element, after_element)
    });

    let module = builder.finish();
    let result = infer(&module, function_id, query);
    let receiver = receiver.expect("receiver should be recorded");
    (result.name, result.root, receiver)
}

/// Whether copying the elements at `writes`, in order, initialises every element exactly once
/// before the first repeated element.
fn covers_each_element_once(element_count: usize, writes: &[usize]) -> bool {
    let mut covered = vec![false; element_count];
    let mut remaining = element_count;

    for index in writes {
        if covered[*index] {
            return false;
        }
        covered[*index] = true;
        remaining -= 1;
        if remaining == 0 {
            return true;
        }
    }

    false
}

fn resolve_tuple_copies(element_count: usize, writes: &[usize]) -> (Option<ValueId>, ValueId) {
    let mut builder = ModuleBuilder::new();
    let tuple = tuple_of_ints(&mut builder, element_count);

    let mut source = None;
    let (function_id, temporary) = build_function(&mut builder, "copy_elements", |body| {
        let root = body.add_argument(IrType::address_of(tuple.clone()), None);
        source = Some(root);

        let temporary = body.alloc_stack(tuple.clone(), None, None)?;
        for index in writes {
            let src = body.tuple_element_addr(root, *index)?;
            let dest = body.tuple_element_addr(temporary, *index)?;
            body.copy_addr(src, dest, true)?;
        }
        Ok(temporary)
    });

    let module = builder.finish();
    let resolved = VariableNameInferrer::new(&module, function(&module, function_id), InferenceOptions::NONE)
        .root_value_for_temporary_allocation(temporary);
    (resolved, source.expect("source should be recorded"))
}

proptest! {
    #[test]
    fn forwarding_instructions_never_change_the_name(
        after_receiver in forward_chain(),
        after_field in forward_chain(),
        after_element in forward_chain(),
    ) {
        let (name, root, receiver) = projection_with_forwards(&after_receiver, &after_field, &after_element);

        prop_assert_eq!(name.as_deref(), Some("self.inner.1"));
        prop_assert_eq!(root, Some(receiver));
    }

    #[test]
    fn tuple_temporary_resolves_only_when_every_element_is_written_once(
        (element_count, writes) in (1usize..5).prop_flat_map(|count| {
            (Just(count), prop::collection::vec(0..count, 0..8))
        })
    ) {
        let (resolved, source) = resolve_tuple_copies(element_count, &writes);

        if covers_each_element_once(element_count, &writes) {
            prop_assert_eq!(resolved, Some(source));
        } else {
            prop_assert_eq!(resolved, None);
        }
    }
}

#[test]
fn parallel_and_sequential_queries_agree() {
    for scenario in all_scenarios() {
        let queries = vec![
            ValueRef {
                function: scenario.function,
                value: scenario.query,
            };
            16
        ];

        let sequential = infer_names(&scenario.module, &queries, InferenceOptions::NONE, false);
        for _ in 0..4 {
            let parallel = infer_names(&scenario.module, &queries, InferenceOptions::NONE, true);
            assert_eq!(parallel, sequential, "results differ for {}", scenario.label);
        }

        for result in sequential {
            assert_eq!(result.query.value, scenario.query);
            assert_eq!(result.name.as_deref(), scenario.expected_name, "name of {}", scenario.label);
            assert_eq!(result.root, scenario.expected_root, "root of {}", scenario.label);
        }
    }
}

#[test]
fn inferring_through_all_accessors_keeps_existing_names() {
    for scenario in all_scenarios() {
        let default = infer(&scenario.module, scenario.function, scenario.query);
        let permissive = infer_permissive(&scenario.module, scenario.function, scenario.query);

        if default.name.is_some() {
            assert_eq!(permissive, default, "permissive inference changed {}", scenario.label);
        }
    }
}

#[test]
fn option_bits_combine() {
    let combined = InferenceOptions::NONE.union(InferenceOptions::INFER_SELF_THROUGH_ALL_ACCESSORS);

    assert!(combined.contains(InferenceOptions::INFER_SELF_THROUGH_ALL_ACCESSORS));
    assert!(!InferenceOptions::NONE.contains(InferenceOptions::INFER_SELF_THROUGH_ALL_ACCESSORS));
    assert!(InferenceOptions::default().contains(InferenceOptions::NONE));
    assert_eq!(combined.bits(), 0b1);
}
