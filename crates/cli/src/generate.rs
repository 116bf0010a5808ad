use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{self, Command, Stdio};

use structmap_codegen::{load_conversions, Config, Generator};
use structmap_core::{FileSystemProvider, ModuleLoader};

use crate::{go_env, init_tracing, report_error, OutputFormat};

pub(crate) struct GenerateOptions<'a> {
    pub config: &'a Path,
    pub conversions: Option<&'a Path>,
    pub root: &'a Path,
    pub stdout: bool,
    pub gofmt: bool,
    pub verbose: bool,
    pub output: OutputFormat,
    pub quiet: bool,
}

pub(crate) fn cmd_generate(opts: GenerateOptions<'_>) {
    let text = read_or_exit(opts.config, opts.output, opts.quiet);
    let config = match Config::from_yaml(&text) {
        Ok(c) => c,
        Err(e) => {
            let msg = format!("error in '{}': {}", opts.config.display(), e);
            report_error(&msg, opts.output, opts.quiet);
            process::exit(1);
        }
    };

    let level = if opts.verbose {
        "debug"
    } else if config.debug {
        "info"
    } else {
        "warn"
    };
    init_tracing(level);

    let conversions = match opts.conversions {
        Some(path) => {
            let text = read_or_exit(path, opts.output, opts.quiet);
            match load_conversions(&text) {
                Ok(c) => c,
                Err(e) => {
                    let msg = format!("error in '{}': {}", path.display(), e);
                    report_error(&msg, opts.output, opts.quiet);
                    process::exit(1);
                }
            }
        }
        None => Vec::new(),
    };

    let loader = match ModuleLoader::discover_with(FileSystemProvider, opts.root, go_env()) {
        Ok(l) => l,
        Err(e) => {
            let msg = format!("error locating Go module at '{}': {}", opts.root.display(), e);
            report_error(&msg, opts.output, opts.quiet);
            process::exit(1);
        }
    };
    tracing::debug!(
        module = %loader.module().module_path,
        mappings = config.mappings.len(),
        conversions = conversions.len(),
        "starting generation"
    );

    let out_path: PathBuf = Path::new(&config.out_file_path).join(&config.out_file_name);
    let function_count = config.mappings.len();
    let debug = config.debug;
    let mut generator = Generator::new(config, conversions, Box::new(loader));
    let code = match generator.generate() {
        Ok(code) => code,
        Err(e) => {
            report_error(&format!("generation failed: {}", e), opts.output, opts.quiet);
            process::exit(1);
        }
    };

    if debug {
        tracing::info!("generated code:\n{}", code);
    }

    let code = if opts.gofmt {
        match gofmt(&code) {
            Ok(formatted) => formatted,
            Err(msg) => {
                report_error(&format!("gofmt failed: {}", msg), opts.output, opts.quiet);
                process::exit(1);
            }
        }
    } else {
        code
    };

    if opts.stdout {
        print!("{}", code);
        return;
    }

    if let Some(parent) = out_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        if let Err(e) = std::fs::create_dir_all(parent) {
            let msg = format!("error creating '{}': {}", parent.display(), e);
            report_error(&msg, opts.output, opts.quiet);
            process::exit(1);
        }
    }
    if let Err(e) = std::fs::write(&out_path, &code) {
        let msg = format!("error writing '{}': {}", out_path.display(), e);
        report_error(&msg, opts.output, opts.quiet);
        process::exit(1);
    }

    if !opts.quiet {
        match opts.output {
            OutputFormat::Text => {
                println!(
                    "Generated {} mapping function(s) in {}",
                    function_count,
                    out_path.display()
                );
            }
            OutputFormat::Json => {
                let summary = serde_json::json!({
                    "output": out_path.display().to_string(),
                    "functions": function_count,
                });
                println!("{}", summary);
            }
        }
    }
}

fn read_or_exit(path: &Path, output: OutputFormat, quiet: bool) -> String {
    match std::fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) => {
            let msg = format!("error reading '{}': {}", path.display(), e);
            report_error(&msg, output, quiet);
            process::exit(1);
        }
    }
}

/// Run `gofmt` over `code`, returning its stdout.
fn gofmt(code: &str) -> Result<String, String> {
    let mut child = Command::new("gofmt")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| format!("cannot run gofmt: {}", e))?;

    let mut stdin = child
        .stdin
        .take()
        .ok_or_else(|| "gofmt stdin unavailable".to_string())?;
    let input = code.to_string();
    let writer = std::thread::spawn(move || stdin.write_all(input.as_bytes()));

    let result = child
        .wait_with_output()
        .map_err(|e| format!("gofmt did not finish: {}", e))?;
    writer
        .join()
        .map_err(|_| "gofmt writer thread panicked".to_string())?
        .map_err(|e| format!("cannot write to gofmt: {}", e))?;

    if !result.status.success() {
        return Err(String::from_utf8_lossy(&result.stderr).trim().to_string());
    }
    String::from_utf8(result.stdout).map_err(|e| format!("gofmt produced invalid UTF-8: {}", e))
}
