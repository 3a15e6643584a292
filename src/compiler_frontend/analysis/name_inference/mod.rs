//! ============================================================
//!                     Variable Name Inference
//! ============================================================
//! Recovers a source level name such as `self.inner.1` for an IR value,
//! so diagnostics can talk about the variable a value came from.
//!
//! The walk goes from the queried value back through its definitions until it reaches
//! a value that carries a name (a declared variable, argument, global or debug variable).
//! Every field, tuple element or accessor passed on the way becomes one component of the
//! name path. Nameless temporaries are resolved to the value that initialised them.
//!
//! Inference is best effort. When no rule applies the query has no name and nothing is
//! written to the output.

mod address_walker;
mod name_path;
mod temporary_allocation;
mod use_def_walker;

pub use name_path::{NamePathRenderer, PathComponent, VariableNamePath};

use crate::compiler_frontend::analysis::name_inference::use_def_walker::{WalkStep, step};
use crate::compiler_frontend::ir::ir_nodes::{FunctionId, IrFunction, IrModule, ValueId, ValueRef};
use crate::name_log;
use rayon::prelude::*;
use rustc_hash::FxHashSet;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct InferenceOptions(u8);

impl InferenceOptions {
    pub const NONE: Self = Self(0);

    /// Look through every call whose callee has a self parameter, not only coroutine accessors.
    pub const INFER_SELF_THROUGH_ALL_ACCESSORS: Self = Self(0b1);

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub fn contains(self, other: Self) -> bool {
        (self.0 & other.0) == other.0
    }

    pub fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }
}

/// Name inference over one function.
pub struct VariableNameInferrer<'a> {
    module: &'a IrModule,
    function: &'a IrFunction,
    options: InferenceOptions,
}

impl<'a> VariableNameInferrer<'a> {
    pub fn new(module: &'a IrModule, function: &'a IrFunction, options: InferenceOptions) -> Self {
        Self {
            module,
            function,
            options,
        }
    }

    /// Walks back from `value` and, on success, appends the rendered name to `output`.
    ///
    /// Returns the root value and whether a name path was consumed into `output`.
    /// On failure `output` is left untouched.
    pub fn infer_root_and_path(&self, value: ValueId, output: &mut String) -> (Option<ValueId>, bool) {
        let Some((root, mut path)) = self.find_debug_info_providing_value(value) else {
            return (None, false);
        };

        let consumed = !path.is_empty();
        NamePathRenderer::new(self.module, self.function).drain(&mut path, output);
        (Some(root), consumed)
    }

    pub fn infer_name(&self, value: ValueId) -> Option<String> {
        let mut name = String::new();
        match self.infer_root_and_path(value, &mut name) {
            (Some(_), _) => Some(name),
            (None, _) => None,
        }
    }

    /// The root value and the path leading from it to `value`, without rendering.
    pub fn find_debug_info_providing_value(&self, value: ValueId) -> Option<(ValueId, VariableNamePath)> {
        let mut path = VariableNamePath::new();
        let mut visited = FxHashSet::default();
        let mut current = value;

        loop {
            if !visited.insert(current) {
                name_log!(Red "Name inference revisited ", current, ", giving up");
                return None;
            }

            match step(self.module, self.function, current, self.options) {
                WalkStep::Continue { next, component } => {
                    if let Some(component) = component {
                        path.push(component);
                    }
                    current = next;
                }
                WalkStep::Root { root, component } => {
                    path.push(component);
                    name_log!(Green "Found root ", root, " for ", value);
                    return Some((root, path));
                }
                WalkStep::Stop => {
                    name_log!(Yellow "No name for ", value, ", stopped at ", current);
                    return None;
                }
            }
        }
    }

    /// The value that initialised a nameless temporary allocation.
    /// `alloc` is the result of an `alloc_stack` or `alloc_box`.
    pub fn root_value_for_temporary_allocation(&self, alloc: ValueId) -> Option<ValueId> {
        let inst = self.function.defining_instruction(alloc)?;
        temporary_allocation::root_value_for_temporary_allocation(self.function, inst)
    }
}

/// The outcome of one query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InferredName {
    pub query: ValueRef,
    pub name: Option<String>,
    pub root: Option<ValueId>,
}

pub fn infer_variable_name(
    module: &IrModule,
    function: FunctionId,
    value: ValueId,
    options: InferenceOptions,
) -> InferredName {
    let query = ValueRef { function, value };
    let Some(ir_function) = module.function(function) else {
        return InferredName {
            query,
            name: None,
            root: None,
        };
    };

    let inferrer = VariableNameInferrer::new(module, ir_function, options);
    let mut name = String::new();
    let (root, _) = inferrer.infer_root_and_path(value, &mut name);

    InferredName {
        query,
        name: root.map(|_| name),
        root,
    }
}

/// Runs independent queries against one module. Results keep the order of `queries`.
pub fn infer_names(
    module: &IrModule,
    queries: &[ValueRef],
    options: InferenceOptions,
    parallel: bool,
) -> Vec<InferredName> {
    if parallel {
        queries
            .par_iter()
            .map(|query| infer_variable_name(module, query.function, query.value, options))
            .collect()
    } else {
        queries
            .iter()
            .map(|query| infer_variable_name(module, query.function, query.value, options))
            .collect()
    }
}

#[cfg(test)]
mod tests;
