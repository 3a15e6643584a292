use crate::compiler_frontend::compiler_errors::{CompilerError, ErrorMetaDataKey, ErrorType};
use saying::say;
use std::env;
use std::path::{Path, PathBuf};

fn normalize_display_path(path: &Path) -> PathBuf {
    let path_string = path.to_string_lossy();
    if let Some(stripped) = path_string.strip_prefix(r"\\?\") {
        return PathBuf::from(stripped);
    }

    path.to_path_buf()
}

fn relative_display_path(scope: &Path) -> String {
    let normalized_scope = normalize_display_path(scope);

    match env::current_dir() {
        Ok(dir) => {
            let normalized_dir = normalize_display_path(&dir);
            normalized_scope
                .strip_prefix(&normalized_dir)
                .unwrap_or(&normalized_scope)
                .to_string_lossy()
                .to_string()
        }
        Err(_) => normalized_scope.to_string_lossy().to_string(),
    }
}

pub fn print_compiler_errors(errors: Vec<CompilerError>) {
    for err in errors {
        print_formatted_error(err);
    }
}

pub fn print_formatted_error(e: CompilerError) {
    let relative_dir = match &e.scope {
        Some(scope) => relative_display_path(scope),
        None => String::new(),
    };

    match e.error_type {
        ErrorType::File => {
            say!(Yellow "🏚 Can't find/read file or directory: ", relative_dir);
            say!(e.msg);
            return;
        }

        ErrorType::Config => {
            if !relative_dir.is_empty() {
                say!("\n (-_-)  🔥🔥 ", Dark Magenta relative_dir, " 🔥🔥  <(^~^)/ ");
            }
            say!(Yellow "CONFIG FILE ISSUE - ");
            say!(Dark Yellow "Malformed config file, something inside it doesn't make sense");
        }

        ErrorType::Snapshot => {
            if !relative_dir.is_empty() {
                say!("\n(ಠ_ಠ) ", Dark Magenta relative_dir);
            }
            say!(Red "IR Snapshot");
        }

        ErrorType::IrConstruction => {
            if !relative_dir.is_empty() {
                say!("\n(╯°□°)╯  🔥🔥 ", Dark Magenta relative_dir, " 🔥🔥  Σ(°△°;) ");
            }
            say!(Red "Invalid IR");
        }

        ErrorType::Compiler => {
            say!(Yellow "COMPILER BUG - ");
            say!(Dark Yellow "name inference developer skill issue (not your fault)");
        }
    }

    say!(Red e.msg);

    for key in [
        ErrorMetaDataKey::CompilationStage,
        ErrorMetaDataKey::FunctionName,
        ErrorMetaDataKey::ValueName,
        ErrorMetaDataKey::DeclarationName,
        ErrorMetaDataKey::ExpectedType,
        ErrorMetaDataKey::FoundType,
        ErrorMetaDataKey::PrimarySuggestion,
        ErrorMetaDataKey::AlternativeSuggestion,
    ] {
        if let Some(value) = e.metadata_value(key) {
            let label = format!("  {key:?}: ");
            say!(Dark Magenta label, value);
        }
    }
}
