use std::collections::HashMap;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, Eq, Hash, PartialEq)]
pub enum ErrorMetaDataKey {
    CompilationStage,
    ValueName,
    FunctionName,
    DeclarationName,

    // Optional suggestions
    PrimarySuggestion,
    AlternativeSuggestion,

    // Data type information
    ExpectedType,
    FoundType,
}

#[derive(Debug, Clone)]
pub struct CompilerError {
    pub msg: String,

    // File the error came from, when there is one.
    // IR construction errors have no source file.
    pub scope: Option<PathBuf>,
    pub error_type: ErrorType,

    // For creating more structured and detailed error messages
    pub metadata: HashMap<ErrorMetaDataKey, String>,
}

impl CompilerError {
    pub fn new(msg: impl Into<String>, error_type: ErrorType) -> CompilerError {
        CompilerError {
            msg: msg.into(),
            scope: None,
            error_type,
            metadata: HashMap::new(),
        }
    }

    pub fn with_file_path(mut self, file_path: impl Into<PathBuf>) -> Self {
        self.scope = Some(file_path.into());
        self
    }

    pub fn with_error_type(mut self, error_type: ErrorType) -> Self {
        self.error_type = error_type;
        self
    }

    pub fn with_metadata(mut self, key: ErrorMetaDataKey, value: impl Into<String>) -> Self {
        self.metadata.insert(key, value.into());
        self
    }

    pub fn new_metadata_entry(&mut self, key: ErrorMetaDataKey, value: impl Into<String>) {
        self.metadata.insert(key, value.into());
    }

    pub fn metadata_value(&self, key: ErrorMetaDataKey) -> Option<&str> {
        self.metadata.get(&key).map(String::as_str)
    }

    /// Create a compiler error (internal bug, not user's fault)
    pub fn compiler_error(msg: impl Into<String>) -> Self {
        CompilerError::new(msg, ErrorType::Compiler)
    }

    /// Create a file system error for a path that could not be read
    pub fn file_error(path: &Path, msg: impl Into<String>) -> Self {
        CompilerError::new(msg, ErrorType::File).with_file_path(path)
    }

    /// Create an error for a config file that could not be understood
    pub fn config_error(path: &Path, msg: impl Into<String>) -> Self {
        CompilerError::new(msg, ErrorType::Config).with_file_path(path)
    }
}

impl Display for CompilerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}: {}", error_type_to_str(&self.error_type), self.msg)
    }
}

impl std::error::Error for CompilerError {}

// Adds more information to the CompilerError
// So it knows which stage of the tool produced it
#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum ErrorType {
    File,
    Config,
    Snapshot,
    IrConstruction,
    Compiler,
}

pub fn error_type_to_str(e_type: &ErrorType) -> &'static str {
    match e_type {
        ErrorType::File => "File Error",
        ErrorType::Config => "Malformed Config",
        ErrorType::Snapshot => "Malformed IR Snapshot",
        ErrorType::IrConstruction => "Invalid IR",
        ErrorType::Compiler => "Compiler Bug",
    }
}

/// Returns a new CompilerError for IR that cannot be constructed.
///
/// These come from builders being handed operands or field identities
/// that do not fit the instruction being created.
///
/// Usage:
/// `return_ir_error!("message", {
///     ValueName => "%3",
///     CompilationStage => "IR Construction",
/// })`;
#[macro_export]
macro_rules! return_ir_error {
    ($msg:expr, { $( $key:ident => $value:expr ),* $(,)? }) => {
        return Err($crate::compiler_frontend::compiler_errors::CompilerError {
            msg: $msg.into(),
            scope: None,
            error_type: $crate::compiler_frontend::compiler_errors::ErrorType::IrConstruction,
            metadata: {
                let mut map = std::collections::HashMap::new();
                $( map.insert($crate::compiler_frontend::compiler_errors::ErrorMetaDataKey::$key, String::from($value)); )*
                map
            },
        })
    };
    ($msg:expr) => {
        return Err($crate::compiler_frontend::compiler_errors::CompilerError {
            msg: $msg.into(),
            scope: None,
            error_type: $crate::compiler_frontend::compiler_errors::ErrorType::IrConstruction,
            metadata: std::collections::HashMap::new(),
        })
    };
}

/// Returns a new CompilerError for snapshot documents that reference
/// labels, declarations or functions that do not exist.
///
/// Usage:
/// `return_snapshot_error!("Unknown value label", { ValueName => label })`;
#[macro_export]
macro_rules! return_snapshot_error {
    ($msg:expr, { $( $key:ident => $value:expr ),* $(,)? }) => {
        return Err($crate::compiler_frontend::compiler_errors::CompilerError {
            msg: $msg.into(),
            scope: None,
            error_type: $crate::compiler_frontend::compiler_errors::ErrorType::Snapshot,
            metadata: {
                let mut map = std::collections::HashMap::new();
                $( map.insert($crate::compiler_frontend::compiler_errors::ErrorMetaDataKey::$key, String::from($value)); )*
                map
            },
        })
    };
    ($msg:expr) => {
        return Err($crate::compiler_frontend::compiler_errors::CompilerError {
            msg: $msg.into(),
            scope: None,
            error_type: $crate::compiler_frontend::compiler_errors::ErrorType::Snapshot,
            metadata: std::collections::HashMap::new(),
        })
    };
}
