//! Variable name inference for diagnostics over an SSA IR.
//!
//! Given a value inside a function, the analysis walks back through its definitions and
//! reconstructs the source level access path it came from, such as `self.inner.1`.

pub(crate) mod compiler_frontend;
pub(crate) mod projects;

pub use compiler_frontend::analysis::name_inference::{
    InferenceOptions, InferredName, NamePathRenderer, PathComponent, VariableNameInferrer,
    VariableNamePath, infer_names, infer_variable_name,
};
pub use compiler_frontend::compiler_errors::{CompilerError, ErrorMetaDataKey, ErrorType, error_type_to_str};
pub use compiler_frontend::display_messages::{print_compiler_errors, print_formatted_error};
pub use compiler_frontend::ir::ir_builder::{FunctionBuilder, FunctionSignature, ModuleBuilder};
pub use compiler_frontend::ir::ir_declarations::{DeclKind, Declaration, DeclarationTable, UNKNOWN_DECL_NAME};
pub use compiler_frontend::ir::ir_nodes::{
    BlockId, DebugVariable, DeclId, ForwardKind, FullApplySite, FunctionId, InstId, InstKind, IrBlock,
    IrFunction, IrInstruction, IrModule, IrValue, LifetimeEndKind, Operand, StoreQualifier, ValueDef,
    ValueId, ValueRef,
};
pub use compiler_frontend::ir::ir_snapshot::{
    IrSnapshot, LoadedSnapshot, load_snapshot, load_snapshot_file, parse_snapshot,
};
pub use compiler_frontend::ir::ir_types::IrType;
pub use compiler_frontend::string_interning::{StringId, StringTable};
pub use projects::cli::start_cli;
pub use projects::settings::{CONFIG_FILE_NAME, Config};
