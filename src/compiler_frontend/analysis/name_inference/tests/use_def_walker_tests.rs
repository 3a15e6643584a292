#![cfg(test)]

use super::test_support::{
    Scenario, build_function, coroutine_accessor, function, getter_call, infer, infer_permissive,
    int_type, method_declaration, mixed_tuple, nested_projection, opaque_value, parameter,
    temporary_from_argument, tuple_from_destructure, tuple_from_root_address, tuple_of_ints,
};
use crate::compiler_frontend::analysis::name_inference::use_def_walker::{WalkStep, step};
use crate::compiler_frontend::analysis::name_inference::{
    InferenceOptions, PathComponent, VariableNameInferrer,
};
use crate::compiler_frontend::ir::ir_builder::{FunctionSignature, ModuleBuilder};
use crate::compiler_frontend::ir::ir_declarations::DeclKind;
use crate::compiler_frontend::ir::ir_nodes::{ForwardKind, StoreQualifier, ValueId};
use crate::compiler_frontend::ir::ir_types::IrType;

fn assert_scenario(scenario: &Scenario) {
    let result = infer(&scenario.module, scenario.function, scenario.query);
    assert_eq!(
        result.name.as_deref(),
        scenario.expected_name,
        "unexpected name for {}",
        scenario.label
    );
    assert_eq!(
        result.root, scenario.expected_root,
        "unexpected root for {}",
        scenario.label
    );
}

#[test]
fn temporary_initialised_from_argument_is_named_after_the_argument() {
    assert_scenario(&temporary_from_argument());
}

#[test]
fn projections_render_root_to_leaf() {
    assert_scenario(&nested_projection());
}

#[test]
fn tuple_temporaries_are_named_after_their_single_source() {
    assert_scenario(&tuple_from_root_address());
    assert_scenario(&tuple_from_destructure());
}

#[test]
fn tuple_with_mixed_sources_has_no_name() {
    assert_scenario(&mixed_tuple());
}

#[test]
fn failed_inference_leaves_the_output_untouched() {
    let scenario = opaque_value();
    let function = function(&scenario.module, scenario.function);
    let inferrer = VariableNameInferrer::new(&scenario.module, function, InferenceOptions::NONE);

    let mut output = String::from("prefix:");
    let (root, consumed) = inferrer.infer_root_and_path(scenario.query, &mut output);

    assert_eq!(root, None);
    assert!(!consumed);
    assert_eq!(output, "prefix:");
}

#[test]
fn successful_inference_appends_to_the_output() {
    let scenario = nested_projection();
    let function = function(&scenario.module, scenario.function);
    let inferrer = VariableNameInferrer::new(&scenario.module, function, InferenceOptions::NONE);

    let mut output = String::from("use of ");
    let (root, consumed) = inferrer.infer_root_and_path(scenario.query, &mut output);

    assert_eq!(root, scenario.expected_root);
    assert!(consumed);
    assert_eq!(output, "use of self.inner.1");
}

#[test]
fn debug_info_providing_value_returns_the_unrendered_path() {
    let scenario = nested_projection();
    let function = function(&scenario.module, scenario.function);
    let inferrer = VariableNameInferrer::new(&scenario.module, function, InferenceOptions::NONE);

    let (root, path) = inferrer
        .find_debug_info_providing_value(scenario.query)
        .expect("nested projection should have a root");

    assert_eq!(Some(root), scenario.expected_root);
    assert_eq!(path.len(), 3);
    assert_eq!(
        path.root_to_leaf().next(),
        Some(&PathComponent::Value(root))
    );
}

#[test]
fn projection_step_pushes_itself_and_continues_from_its_operand() {
    let scenario = nested_projection();
    let function = function(&scenario.module, scenario.function);
    let tuple_extract = function
        .defining_instruction(scenario.query)
        .expect("query should be a tuple_extract result");
    let operand = tuple_extract.kind.operands()[0];

    assert_eq!(
        step(&scenario.module, function, scenario.query, InferenceOptions::NONE),
        WalkStep::Continue {
            next: operand,
            component: Some(PathComponent::Instruction(tuple_extract.id)),
        }
    );
}

#[test]
fn unknown_instruction_stops_the_walk() {
    let scenario = opaque_value();
    let function = function(&scenario.module, scenario.function);

    assert_eq!(
        step(&scenario.module, function, scenario.query, InferenceOptions::NONE),
        WalkStep::Stop
    );
}

#[test]
fn global_address_is_a_root() {
    let mut builder = ModuleBuilder::new();
    let int = int_type(&mut builder);
    let counter = builder.declare("counter", DeclKind::Global { ty: int });

    let mut global = None;
    let (function_id, query) = build_function(&mut builder, "read_global", |body| {
        let address = body.global_addr(counter)?;
        global = Some(address);
        body.load(address)
    });

    let module = builder.finish();
    let result = infer(&module, function_id, query);

    assert_eq!(result.name.as_deref(), Some("counter"));
    assert_eq!(result.root, global);
}

#[test]
fn declared_allocation_is_a_root() {
    let mut builder = ModuleBuilder::new();
    let int = int_type(&mut builder);
    let local = builder.declare("local", DeclKind::Variable);

    let mut allocation = None;
    let (function_id, query) = build_function(&mut builder, "declared", |body| {
        let address = body.alloc_stack(int.clone(), Some(local), None)?;
        allocation = Some(address);
        body.load(address)
    });

    let module = builder.finish();
    let result = infer(&module, function_id, query);

    assert_eq!(result.name.as_deref(), Some("local"));
    assert_eq!(result.root, allocation);
}

#[test]
fn debug_variable_name_wins_over_the_declaration() {
    let mut builder = ModuleBuilder::new();
    let int = int_type(&mut builder);
    let local = builder.declare("local", DeclKind::Variable);

    let (function_id, query) = build_function(&mut builder, "renamed", |body| {
        let address = body.alloc_stack(int.clone(), Some(local), Some("shadow"))?;
        body.load(address)
    });

    let module = builder.finish();
    assert_eq!(
        infer(&module, function_id, query).name.as_deref(),
        Some("shadow")
    );
}

#[test]
fn allocation_with_empty_debug_name_is_treated_as_a_temporary() {
    let mut builder = ModuleBuilder::new();
    let int = int_type(&mut builder);
    let value_decl = parameter(&mut builder, "value");

    let mut argument = None;
    let (function_id, query) = build_function(&mut builder, "unnamed_debug_var", |body| {
        let value = body.add_argument(int.clone(), Some(value_decl));
        argument = Some(value);
        let address = body.alloc_stack(int.clone(), None, Some(""))?;
        body.store(value, address, StoreQualifier::Init)?;
        body.load(address)
    });

    let module = builder.finish();
    let result = infer(&module, function_id, query);

    assert_eq!(result.name.as_deref(), Some("value"));
    assert_eq!(result.root, argument);
}

#[test]
fn class_field_address_is_named_after_the_field() {
    let mut builder = ModuleBuilder::new();
    let int = int_type(&mut builder);
    let node = builder.named_type("Node");
    let next = builder.declare("next", DeclKind::Field { ty: int });
    let node_decl = parameter(&mut builder, "node");

    let (function_id, query) = build_function(&mut builder, "read_next", |body| {
        let instance = body.add_argument(node.clone(), Some(node_decl));
        let field = body.ref_element_addr(instance, next)?;
        body.load(field)
    });

    let module = builder.finish();
    assert_eq!(
        infer(&module, function_id, query).name.as_deref(),
        Some("node.next")
    );
}

#[test]
fn struct_element_address_is_named_after_the_field() {
    let mut builder = ModuleBuilder::new();
    let int = int_type(&mut builder);
    let (point, fields) = builder.declare_struct("Point", &[("x", int.clone()), ("y", int)]);
    let self_decl = parameter(&mut builder, "self");

    let (function_id, query) = build_function(&mut builder, "read_x", |body| {
        let receiver = body.add_argument(IrType::address_of(IrType::Struct(point)), Some(self_decl));
        let x = body.struct_element_addr(receiver, fields[0])?;
        body.load(x)
    });

    let module = builder.finish();
    assert_eq!(
        infer(&module, function_id, query).name.as_deref(),
        Some("self.x")
    );
}

#[test]
fn destructure_results_are_named_by_field_or_index() {
    let mut builder = ModuleBuilder::new();
    let int = int_type(&mut builder);
    let pair = tuple_of_ints(&mut builder, 2);
    let (point, _) = builder.declare_struct("Point", &[("x", int.clone()), ("y", int)]);
    let point_decl = parameter(&mut builder, "point");
    let pair_decl = parameter(&mut builder, "pair");

    let mut tuple_element = None;
    let (function_id, struct_field) = build_function(&mut builder, "split", |body| {
        let point_value = body.add_argument(IrType::Struct(point), Some(point_decl));
        let pair_value = body.add_argument(pair.clone(), Some(pair_decl));

        let pair_elements = body.destructure_tuple(pair_value)?;
        tuple_element = Some(pair_elements[1]);

        let point_fields = body.destructure_struct(point_value)?;
        Ok(point_fields[1])
    });

    let module = builder.finish();
    let tuple_element = tuple_element.expect("tuple element should be recorded");

    assert_eq!(
        infer(&module, function_id, struct_field).name.as_deref(),
        Some("point.y")
    );
    assert_eq!(
        infer(&module, function_id, tuple_element).name.as_deref(),
        Some("pair.1")
    );
}

#[test]
fn opened_existential_is_looked_through() {
    let mut builder = ModuleBuilder::new();
    let existential = builder.named_type("any Shape");
    let opened = builder.named_type("@opened Shape");
    let shape_decl = parameter(&mut builder, "shape");

    let (function_id, query) = build_function(&mut builder, "open", |body| {
        let shape = body.add_argument(IrType::address_of(existential.clone()), Some(shape_decl));
        let opened_address = body.open_existential_addr(shape, opened.clone())?;
        body.load(opened_address)
    });

    let module = builder.finish();
    assert_eq!(
        infer(&module, function_id, query).name.as_deref(),
        Some("shape")
    );
}

#[test]
fn debug_value_use_names_a_value() {
    let mut builder = ModuleBuilder::new();
    let int = int_type(&mut builder);

    let mut produced = None;
    let (function_id, query) = build_function(&mut builder, "debug_named", |body| {
        let value = body.opaque("compute", Vec::new(), vec![int.clone()])?[0];
        produced = Some(value);
        body.debug_value(value, "total")?;
        body.forward(ForwardKind::CopyValue, value)
    });

    let module = builder.finish();
    let result = infer(&module, function_id, query);

    assert_eq!(result.name.as_deref(), Some("total"));
    assert_eq!(result.root, produced);
}

#[test]
fn empty_debug_value_name_is_not_a_root() {
    let mut builder = ModuleBuilder::new();
    let int = int_type(&mut builder);

    let (function_id, query) = build_function(&mut builder, "debug_unnamed", |body| {
        let value = body.opaque("compute", Vec::new(), vec![int.clone()])?[0];
        body.debug_value(value, "")?;
        body.forward(ForwardKind::CopyValue, value)
    });

    let module = builder.finish();
    let result = infer(&module, function_id, query);

    assert_eq!(result.name, None);
    assert_eq!(result.root, None);
}

#[test]
fn named_debug_value_after_an_empty_one_is_used() {
    let mut builder = ModuleBuilder::new();
    let int = int_type(&mut builder);

    let mut produced = None;
    let (function_id, query) = build_function(&mut builder, "debug_second", |body| {
        let value = body.opaque("compute", Vec::new(), vec![int.clone()])?[0];
        produced = Some(value);
        body.debug_value(value, "")?;
        body.debug_value(value, "total")?;
        body.forward(ForwardKind::CopyValue, value)
    });

    let module = builder.finish();
    let result = infer(&module, function_id, query);

    assert_eq!(result.name.as_deref(), Some("total"));
    assert_eq!(result.root, produced);
}

#[test]
fn debug_value_use_wins_over_forwarding() {
    let mut builder = ModuleBuilder::new();
    let int = int_type(&mut builder);
    let local = builder.declare("local", DeclKind::Variable);

    let mut loaded = None;
    let (function_id, query) = build_function(&mut builder, "debug_load", |body| {
        let address = body.alloc_stack(int.clone(), Some(local), None)?;
        let value = body.load(address)?;
        loaded = Some(value);
        body.debug_value(value, "snapshot")?;
        Ok(value)
    });

    let module = builder.finish();
    let result = infer(&module, function_id, query);

    assert_eq!(result.name.as_deref(), Some("snapshot"));
    assert_eq!(result.root, loaded);
}

#[test]
fn undeclared_argument_has_no_name() {
    let mut builder = ModuleBuilder::new();
    let int = int_type(&mut builder);

    let (function_id, query) = build_function(&mut builder, "anonymous", |body| {
        Ok(body.add_argument(int.clone(), None))
    });

    let module = builder.finish();
    let result = infer(&module, function_id, query);

    assert_eq!(result.name, None);
    assert_eq!(result.root, None);
}

#[test]
fn coroutine_accessor_continues_from_the_receiver() {
    assert_scenario(&coroutine_accessor());
}

#[test]
fn dynamically_dispatched_accessor_uses_the_member_name() {
    let mut builder = ModuleBuilder::new();
    let int = int_type(&mut builder);
    let buffer = builder.named_type("Buffer");
    let size = builder.declare("size", DeclKind::Field { ty: int.clone() });
    let accessor = builder.declare("read", DeclKind::Accessor { storage: size });
    let self_decl = parameter(&mut builder, "self");

    let (function_id, query) = build_function(&mut builder, "read_size", |body| {
        let receiver = body.add_argument(buffer.clone(), Some(self_decl));
        let callee = body.method(Some(accessor), true)?;
        let results = body.begin_apply(callee, vec![receiver], vec![int.clone()])?;
        Ok(results[0])
    });

    let module = builder.finish();
    assert_eq!(
        infer(&module, function_id, query).name.as_deref(),
        Some("self.size")
    );
}

#[test]
fn coroutine_without_self_parameter_has_no_name() {
    let mut builder = ModuleBuilder::new();
    let int = int_type(&mut builder);
    let producer = builder.declare_function("produce", FunctionSignature::default());
    let value_decl = parameter(&mut builder, "value");

    let (function_id, query) = build_function(&mut builder, "yield_value", |body| {
        let argument = body.add_argument(int.clone(), Some(value_decl));
        let callee = body.function_ref(producer)?;
        let results = body.begin_apply(callee, vec![argument], vec![int.clone()])?;
        Ok(results[0])
    });

    let module = builder.finish();
    assert_eq!(infer(&module, function_id, query).name, None);
}

#[test]
fn callee_without_declaration_context_renders_unknown() {
    let mut builder = ModuleBuilder::new();
    let int = int_type(&mut builder);
    let counter = builder.named_type("Counter");
    let modify = method_declaration(&mut builder, "anonymous_modify", None);
    let self_decl = parameter(&mut builder, "self");

    let (function_id, query) = build_function(&mut builder, "bump", |body| {
        let receiver = body.add_argument(counter.clone(), Some(self_decl));
        let callee = body.function_ref(modify)?;
        let results = body.begin_apply(callee, vec![receiver], vec![IrType::address_of(int.clone())])?;
        Ok(results[0])
    });

    let module = builder.finish();
    assert_eq!(
        infer(&module, function_id, query).name.as_deref(),
        Some("self.<unknown decl>")
    );
}

#[test]
fn plain_getter_is_only_named_when_inferring_through_all_accessors() {
    let scenario = getter_call();
    let default = infer(&scenario.module, scenario.function, scenario.query);
    let permissive = infer_permissive(&scenario.module, scenario.function, scenario.query);

    assert_eq!(default.name, None);
    assert_eq!(permissive.name.as_deref(), Some("self.value"));
    assert!(permissive.root.is_some());
}

#[test]
fn addressor_result_continues_from_the_receiver() {
    let mut builder = ModuleBuilder::new();
    let int = int_type(&mut builder);
    let storage = builder.named_type("Storage");
    let buffer = builder.declare("buffer", DeclKind::Field { ty: int.clone() });
    let accessor = builder.declare("unsafeAddress", DeclKind::Accessor { storage: buffer });
    let addressor = method_declaration(&mut builder, "Storage.buffer.unsafeAddress", Some(accessor));
    let self_decl = parameter(&mut builder, "self");

    let mut receiver_value = None;
    let (function_id, query) = build_function(&mut builder, "read_buffer", |body| {
        let receiver = body.add_argument(storage.clone(), Some(self_decl));
        receiver_value = Some(receiver);

        let callee = body.function_ref(addressor)?;
        let pointer = body.apply(callee, vec![receiver], IrType::RawPointer)?;
        let address = body.pointer_to_address(pointer, int.clone())?;
        let access = body.begin_access(address)?;
        body.load(access)
    });

    let module = builder.finish();
    let result = infer(&module, function_id, query);

    assert_eq!(result.name.as_deref(), Some("self.buffer"));
    assert_eq!(result.root, receiver_value);
}

#[test]
fn addressor_returning_a_wrapped_pointer_is_recognised() {
    let mut builder = ModuleBuilder::new();
    let int = int_type(&mut builder);
    let storage = builder.named_type("Storage");
    let (unsafe_pointer, pointer_fields) =
        builder.declare_struct("UnsafePointer", &[("_rawValue", IrType::RawPointer)]);
    let buffer = builder.declare("buffer", DeclKind::Field { ty: int.clone() });
    let accessor = builder.declare("unsafeMutableAddress", DeclKind::Accessor { storage: buffer });
    let addressor = method_declaration(&mut builder, "Storage.buffer.unsafeMutableAddress", Some(accessor));
    let self_decl = parameter(&mut builder, "self");

    let (function_id, query) = build_function(&mut builder, "write_buffer", |body| {
        let receiver = body.add_argument(storage.clone(), Some(self_decl));
        let callee = body.function_ref(addressor)?;
        let wrapped = body.apply(callee, vec![receiver], IrType::Struct(unsafe_pointer))?;
        let raw = body.struct_extract(wrapped, pointer_fields[0])?;
        body.pointer_to_address(raw, int.clone())
    });

    let module = builder.finish();
    assert_eq!(
        infer(&module, function_id, query).name.as_deref(),
        Some("self.buffer")
    );
}

#[test]
fn conversion_thunk_is_looked_through() {
    let mut builder = ModuleBuilder::new();
    let thunk = builder.declare_function(
        "reabstraction_thunk",
        FunctionSignature {
            decl_context: None,
            is_thunk: true,
            has_self_param: false,
        },
    );
    let helper = builder.declare_function("helper", FunctionSignature::default());
    let callback_decl = parameter(&mut builder, "callback");
    let function_type = IrType::Function {
        has_self_param: false,
    };

    let mut wrapped_by_helper = None;
    let (function_id, query) = build_function(&mut builder, "convert", |body| {
        let callback = body.add_argument(function_type.clone(), Some(callback_decl));

        let helper_ref = body.function_ref(helper)?;
        wrapped_by_helper = Some(body.partial_apply(helper_ref, vec![callback])?);

        let thunk_ref = body.function_ref(thunk)?;
        body.partial_apply(thunk_ref, vec![callback])
    });

    let module = builder.finish();
    let wrapped_by_helper = wrapped_by_helper.expect("helper closure should be recorded");

    assert_eq!(
        infer(&module, function_id, query).name.as_deref(),
        Some("callback")
    );
    assert_eq!(infer(&module, function_id, wrapped_by_helper).name, None);
}

fn thunk_signature() -> FunctionSignature {
    FunctionSignature {
        decl_context: None,
        is_thunk: true,
        has_self_param: false,
    }
}

#[test]
fn thunk_with_two_function_arguments_is_not_looked_through() {
    let mut builder = ModuleBuilder::new();
    let thunk = builder.declare_function("reabstraction_thunk", thunk_signature());
    let first_decl = parameter(&mut builder, "first");
    let second_decl = parameter(&mut builder, "second");
    let function_type = IrType::Function {
        has_self_param: false,
    };

    let (function_id, query) = build_function(&mut builder, "convert_pair", |body| {
        let first = body.add_argument(function_type.clone(), Some(first_decl));
        let second = body.add_argument(function_type.clone(), Some(second_decl));
        let thunk_ref = body.function_ref(thunk)?;
        body.partial_apply(thunk_ref, vec![first, second])
    });

    let module = builder.finish();
    let result = infer(&module, function_id, query);

    assert_eq!(result.name, None);
    assert_eq!(result.root, None);
}

#[test]
fn thunk_over_a_non_function_argument_is_not_looked_through() {
    let mut builder = ModuleBuilder::new();
    let int = int_type(&mut builder);
    let thunk = builder.declare_function("reabstraction_thunk", thunk_signature());
    let count_decl = parameter(&mut builder, "count");

    let (function_id, query) = build_function(&mut builder, "convert_int", |body| {
        let count = body.add_argument(int.clone(), Some(count_decl));
        let thunk_ref = body.function_ref(thunk)?;
        body.partial_apply(thunk_ref, vec![count])
    });

    let module = builder.finish();
    let result = infer(&module, function_id, query);

    assert_eq!(result.name, None);
    assert_eq!(result.root, None);
}

#[test]
fn temporary_initialised_from_itself_terminates() {
    let mut builder = ModuleBuilder::new();
    let int = int_type(&mut builder);

    let (function_id, query) = build_function(&mut builder, "self_initialising", |body| {
        let temporary = body.alloc_stack(int.clone(), None, None)?;
        let loaded = body.load(temporary)?;
        body.store(loaded, temporary, StoreQualifier::Init)?;
        Ok(loaded)
    });

    let module = builder.finish();
    let result = infer(&module, function_id, query);

    assert_eq!(result.name, None);
    assert_eq!(result.root, None);
}

#[test]
fn queries_against_unknown_values_have_no_name() {
    let scenario = nested_projection();
    let result = infer(&scenario.module, scenario.function, ValueId(999));

    assert_eq!(result.name, None);
    assert_eq!(result.root, None);
}
