use crate::compiler_frontend::ir::ir_declarations::UNKNOWN_DECL_NAME;
use crate::compiler_frontend::ir::ir_nodes::{
    DeclId, InstId, InstKind, IrFunction, IrModule, ValueDef, ValueId,
};
use crate::compiler_frontend::ir::ir_types::IrType;
use std::fmt::Write as _;

/// One step of an access path.
///
/// Instructions name fields, tuple elements, variables and accessors.
/// Values are used for function arguments and destructure results,
/// where the result index carries the meaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PathComponent {
    Instruction(InstId),
    Value(ValueId),
}

/// Components collected while walking from a use back to its root.
/// The first pushed component is the outermost access, so rendering pops from the back.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VariableNamePath {
    components: Vec<PathComponent>,
}

impl VariableNamePath {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, component: PathComponent) {
        self.components.push(component);
    }

    pub fn pop(&mut self) -> Option<PathComponent> {
        self.components.pop()
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Root first, the order the components are rendered in.
    pub fn root_to_leaf(&self) -> impl Iterator<Item = &PathComponent> {
        self.components.iter().rev()
    }
}

pub struct NamePathRenderer<'a> {
    module: &'a IrModule,
    function: &'a IrFunction,
}

impl<'a> NamePathRenderer<'a> {
    pub fn new(module: &'a IrModule, function: &'a IrFunction) -> Self {
        Self { module, function }
    }

    /// Empties `path`, appending the fragments joined by `.` to `output`.
    pub fn drain(&self, path: &mut VariableNamePath, output: &mut String) {
        let mut first = true;
        while let Some(component) = path.pop() {
            if !first {
                output.push('.');
            }
            first = false;
            self.render_component(component, output);
        }
    }

    pub fn render_component(&self, component: PathComponent, output: &mut String) {
        match component {
            PathComponent::Instruction(inst) => self.render_instruction(inst, output),
            PathComponent::Value(value) => self.render_value(value, output),
        }
    }

    fn render_instruction(&self, inst: InstId, output: &mut String) {
        let Some(inst) = self.function.instruction(inst) else {
            output.push_str(UNKNOWN_DECL_NAME);
            return;
        };

        match &inst.kind {
            InstKind::DebugValue { var, .. } => output.push_str(self.module.resolve(var.name)),

            InstKind::AllocStack { decl, debug_var } | InstKind::AllocBox { decl, debug_var } => {
                let debug_name = debug_var
                    .as_ref()
                    .map(|var| self.module.resolve(var.name))
                    .filter(|name| !name.is_empty());

                match debug_name {
                    Some(name) => output.push_str(name),
                    None => output.push_str(self.module.decl_name(*decl)),
                }
            }

            InstKind::GlobalAddr { global: field }
            | InstKind::RefElementAddr { field, .. }
            | InstKind::StructExtract { field, .. }
            | InstKind::StructElementAddr { field, .. } => {
                output.push_str(self.module.decl_name(Some(*field)));
            }

            InstKind::TupleExtract { index, .. } | InstKind::TupleElementAddr { index, .. } => {
                let _ = write!(output, "{index}");
            }

            InstKind::FunctionRef { function } => {
                let decl_context = self
                    .module
                    .function(*function)
                    .and_then(|callee| callee.decl_context);
                output.push_str(self.module.decl_name(decl_context));
            }

            InstKind::Method { member } => output.push_str(self.module.decl_name(*member)),

            _ => output.push_str(UNKNOWN_DECL_NAME),
        }
    }

    fn render_value(&self, value: ValueId, output: &mut String) {
        let Some(ir_value) = self.function.value(value) else {
            output.push_str(UNKNOWN_DECL_NAME);
            return;
        };

        match ir_value.def {
            ValueDef::Argument { decl, .. } => output.push_str(self.module.decl_name(decl)),

            ValueDef::Result { inst, index } => {
                let kind = self.function.instruction(inst).map(|inst| &inst.kind);
                match kind {
                    Some(InstKind::DestructureTuple { .. }) => {
                        let _ = write!(output, "{index}");
                    }
                    Some(InstKind::DestructureStruct { operand }) => {
                        let field = self.destructured_field(*operand, index);
                        output.push_str(self.module.decl_name(field));
                    }
                    _ => output.push_str(UNKNOWN_DECL_NAME),
                }
            }
        }
    }

    fn destructured_field(&self, operand: ValueId, index: usize) -> Option<DeclId> {
        let IrType::Struct(struct_decl) = self.function.value_type(operand)? else {
            return None;
        };

        self.module.declarations.stored_property(*struct_decl, index)
    }
}
