use std::path::Path;
use std::process;

use structmap_codegen::TypeKey;
use structmap_core::{FileSystemProvider, ModuleLoader};

use crate::{go_env, report_error, OutputFormat};

pub(crate) fn cmd_inspect(
    module: &str,
    type_name: &str,
    root: &Path,
    output: OutputFormat,
    quiet: bool,
) {
    let loader = match ModuleLoader::discover_with(FileSystemProvider, root, go_env()) {
        Ok(l) => l,
        Err(e) => {
            let msg = format!("error locating Go module at '{}': {}", root.display(), e);
            report_error(&msg, output, quiet);
            process::exit(1);
        }
    };

    let module = if module == "." { "" } else { module };
    let key = TypeKey::new(module, type_name);
    match structmap_codegen::inspect(Box::new(loader), &key) {
        Ok(fields) => match serde_json::to_string_pretty(&fields) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                report_error(&format!("error encoding fields: {}", e), output, quiet);
                process::exit(1);
            }
        },
        Err(e) => {
            report_error(&e.to_string(), output, quiet);
            process::exit(1);
        }
    }
}
