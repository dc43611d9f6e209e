use std::ffi::OsString;
use std::io::{self, Write};

use serde::Serialize;
use sqlfront::{
    CompileOptions, Diagnostic, FrontError, Range, TableDescriptor, compile, import, load_schema,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Check,
    Clean,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CliOptions {
    command: Option<Command>,
    path: Option<String>,
    schema_path: Option<String>,
    json: bool,
    compile: CompileOptions,
    show_help: bool,
}

#[derive(Debug, Serialize)]
struct CheckReport<'a> {
    file: &'a str,
    errors: usize,
    warnings: usize,
    diagnostics: &'a [Diagnostic],
    statements: Vec<Range>,
    hints: Vec<Range>,
}

fn main() {
    let mut stdout = io::stdout();
    let mut stderr = io::stderr();

    let exit_code = run(std::env::args_os(), &mut stdout, &mut stderr);
    if exit_code != 0 {
        std::process::exit(exit_code);
    }
}

fn run<I, W, E>(args: I, out: &mut W, err: &mut E) -> i32
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
{
    let options = match parse_args(args) {
        Ok(options) => options,
        Err(message) => {
            let _ = writeln!(err, "error: {message}");
            let _ = write_usage(err);
            return 2;
        }
    };

    if options.show_help {
        if write_usage(out).is_err() {
            return 1;
        }
        return 0;
    }

    let (Some(command), Some(path)) = (options.command, options.path.as_deref()) else {
        return report_error(err, &FrontError::Usage(String::from("missing command")));
    };

    let source = match std::fs::read_to_string(path) {
        Ok(source) => source,
        Err(error) => {
            let _ = writeln!(err, "error: failed reading SQL input `{path}`: {error}");
            return 1;
        }
    };

    let schema = match options.schema_path.as_deref().map(read_schema).transpose() {
        Ok(schema) => schema,
        Err(error) => return report_error(err, &error),
    };

    match command {
        Command::Check => run_check(path, &source, schema.as_deref(), &options, out, err),
        Command::Clean => run_clean(&source, schema.as_deref(), out, err),
    }
}

fn read_schema(path: &str) -> sqlfront::Result<Vec<TableDescriptor>> {
    let text = std::fs::read_to_string(path)?;
    load_schema(&text)
}

fn run_check<W, E>(
    path: &str,
    source: &str,
    schema: Option<&[TableDescriptor]>,
    options: &CliOptions,
    out: &mut W,
    err: &mut E,
) -> i32
where
    W: Write,
    E: Write,
{
    let compilation = compile(source, schema, &options.compile);
    let diagnostics = compilation.diagnostics();
    let errors = diagnostics.iter().filter(|d| d.is_error()).count();
    let warnings = diagnostics.len() - errors;

    let written = if options.json {
        let report = CheckReport {
            file: path,
            errors,
            warnings,
            diagnostics,
            statements: compilation.statement_ranges(),
            hints: compilation.hints().iter().map(|h| h.range).collect(),
        };
        match serde_json::to_string_pretty(&report) {
            Ok(json) => writeln!(out, "{json}"),
            Err(error) => {
                let _ = writeln!(err, "error: failed to render check report: {error}");
                return 1;
            }
        }
    } else {
        write_diagnostics(out, diagnostics)
            .and_then(|()| writeln!(out, "{errors} error(s), {warnings} warning(s)"))
    };
    if let Err(error) = written {
        let _ = writeln!(err, "error: failed writing output: {error}");
        return 1;
    }

    if schema.is_none() {
        let _ = writeln!(err, "note: no --schema given; names were not resolved");
    }
    i32::from(errors > 0)
}

fn write_diagnostics<W>(out: &mut W, diagnostics: &[Diagnostic]) -> io::Result<()>
where
    W: Write,
{
    for diagnostic in diagnostics {
        writeln!(out, "{diagnostic}")?;
    }
    Ok(())
}

fn run_clean<W, E>(
    source: &str,
    schema: Option<&[TableDescriptor]>,
    out: &mut W,
    err: &mut E,
) -> i32
where
    W: Write,
    E: Write,
{
    let statements = match import::normalize(source, schema.unwrap_or_default()) {
        Ok(statements) => statements,
        Err(error) => return report_error(err, &error),
    };
    for statement in &statements {
        if writeln!(out, "{statement};").is_err() {
            return 1;
        }
    }
    0
}

fn report_error<E>(err: &mut E, error: &FrontError) -> i32
where
    E: Write,
{
    let _ = writeln!(err, "error: {error}");
    if let Some(suggestion) = error.suggestion() {
        let _ = writeln!(err, "hint: {suggestion}");
    }
    error.exit_code()
}

fn parse_args<I>(args: I) -> Result<CliOptions, String>
where
    I: IntoIterator<Item = OsString>,
{
    let mut iter = args.into_iter();
    let _argv0 = iter.next();

    let mut command: Option<Command> = None;
    let mut path: Option<String> = None;
    let mut schema_path: Option<String> = None;
    let mut json = false;
    let mut compile = CompileOptions::default();
    let mut show_help = false;

    while let Some(argument) = iter.next() {
        let arg = argument.to_string_lossy();
        let arg_str = arg.as_ref();

        match arg_str {
            "-h" | "--help" => {
                show_help = true;
            }
            "--json" => {
                json = true;
            }
            "--no-hints" => {
                compile.emit_hints = false;
            }
            "--schema" => {
                if schema_path.is_some() {
                    return Err(String::from("`--schema` may only be provided once"));
                }
                let next = iter
                    .next()
                    .ok_or_else(|| String::from("missing JSON file path for `--schema`"))?;
                schema_path = Some(next.to_string_lossy().into_owned());
            }
            "--dedup-window" => {
                let next = iter
                    .next()
                    .ok_or_else(|| String::from("missing integer argument for `--dedup-window`"))?;
                compile.dedup_window =
                    parse_u32_option(next.to_string_lossy().as_ref(), "--dedup-window")?;
            }
            _ => {
                if let Some(value) = arg_str.strip_prefix("--schema=") {
                    if schema_path.is_some() {
                        return Err(String::from("`--schema` may only be provided once"));
                    }
                    schema_path = Some(value.to_owned());
                    continue;
                }

                if let Some(value) = arg_str.strip_prefix("--dedup-window=") {
                    compile.dedup_window = parse_u32_option(value, "--dedup-window")?;
                    continue;
                }

                if arg_str.starts_with('-') {
                    return Err(format!("unknown option `{arg_str}`"));
                }

                if command.is_none() {
                    command = Some(match arg_str {
                        "check" => Command::Check,
                        "clean" => Command::Clean,
                        other => return Err(format!("unknown command `{other}`")),
                    });
                    continue;
                }

                if path.is_some() {
                    return Err(String::from(
                        "too many positional arguments; expected one SQL file",
                    ));
                }
                path = Some(arg_str.to_owned());
            }
        }
    }

    if !show_help {
        if command.is_none() {
            return Err(String::from("missing command; expected `check` or `clean`"));
        }
        if path.is_none() {
            return Err(String::from("missing SQL file argument"));
        }
    }
    if json && command == Some(Command::Clean) {
        return Err(String::from("`--json` only applies to `check`"));
    }

    Ok(CliOptions {
        command,
        path,
        schema_path,
        json,
        compile,
        show_help,
    })
}

fn parse_u32_option(value: &str, flag: &str) -> Result<u32, String> {
    value
        .parse::<u32>()
        .map_err(|_| format!("invalid integer for `{flag}`: `{value}`"))
}

fn write_usage<W>(out: &mut W) -> io::Result<()>
where
    W: Write,
{
    writeln!(
        out,
        "Usage: sqlfront check FILE [--schema SCHEMA.json] [--json] [--dedup-window N] [--no-hints]\n\
         \x20      sqlfront clean FILE [--schema SCHEMA.json]\n\
         \n\
         check prints one line per diagnostic and exits 1 when any is an error.\n\
         clean prints the canonical text of every statement, each ending in `;`.\n\
         \n\
         Examples:\n\
         \n\
         sqlfront check queries.sql --schema schema.json\n\
         sqlfront check queries.sql --json\n\
         sqlfront clean dump.sql\n",
    )
}
