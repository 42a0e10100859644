use std::{path::PathBuf, process::ExitCode};

use anyhow::{bail, Context};
use camino::Utf8PathBuf;
use clap::Parser;
use foxlift::{translate, TranslateOptions};
use foxlift_foundation::source::{decode_latin1, SourceFile, SourceFileId, SourceFileSet};
use foxlift_lexer::Lexer;
use foxlift_preprocessor::loader::FileSystemLoader;
use tracing::{error, info, info_span, metadata::LevelFilter};
use tracing_subscriber::{prelude::*, EnvFilter};

/// Translate a Visual FoxPro program into Python.
#[derive(Debug, Parser)]
#[clap(version)]
pub struct Args {
    /// FoxPro program (`.prg`) to translate.
    input: Utf8PathBuf,

    /// Where to write the Python program.
    output: Utf8PathBuf,

    /// Define a preprocessor macro before the first line, like `#DEFINE NAME TEXT`.
    #[clap(short = 'D', long = "define", value_name = "NAME=TEXT")]
    definitions: Vec<String>,

    /// Print the tokens of the input file.
    #[clap(long)]
    dump_tokens: bool,

    /// Print the program text after preprocessing.
    #[clap(long)]
    dump_preprocessed: bool,

    /// Output a performance trace (in Chrome trace event format) to the specified path. https://profiler.firefox.com/
    #[clap(long)]
    trace: Option<PathBuf>,
}

fn parse_definition(definition: &str) -> anyhow::Result<(&str, &str)> {
    match definition.split_once('=') {
        Some((name, text)) if !name.trim().is_empty() => Ok((name.trim(), text)),
        _ => bail!("definition {definition:?} is not of the form NAME=TEXT"),
    }
}

fn dump_tokens(files: &SourceFileSet, file: SourceFileId) {
    let _span = info_span!("dump_tokens").entered();
    // A lexing error is reported by the translation that follows.
    if let Ok(tokens) = Lexer::new(file, files.source(file)).lex() {
        for (index, token) in tokens.iter().enumerate() {
            let (line, column) = files
                .line_column(file, token.span.start)
                .unwrap_or_default();
            println!(
                "[@{index},{}:{}={:?},<{:?}>,{line}:{column},{:?}]",
                token.span.start, token.span.end, token.text, token.kind, token.channel
            );
        }
    }
}

pub fn fallible_main(args: Args) -> anyhow::Result<()> {
    let _span = info_span!("foxlift_main").entered();

    let source = std::fs::read(&args.input)
        .with_context(|| format!("cannot read source file at {:?}", args.input))?;
    let mut files = SourceFileSet::new();
    let file = files.add(SourceFile::new(
        args.input.to_string(),
        decode_latin1(&source).into(),
    ));

    if args.dump_tokens {
        dump_tokens(&files, file);
    }

    let mut options = TranslateOptions::default();
    for definition in &args.definitions {
        let (name, text) = parse_definition(definition)?;
        if let Err(diagnostic) = options.definitions.define_text(&mut files, name, text) {
            _ = diagnostic.emit_to_stderr(&files);
            bail!("invalid definition of {name}");
        }
    }

    let translation = match translate(&mut files, &FileSystemLoader, file, &options) {
        Ok(translation) => translation,
        Err(diagnostic) => {
            _ = diagnostic.emit_to_stderr(&files);
            bail!("translation of {} failed", args.input);
        }
    };

    if args.dump_preprocessed {
        print!("{}", translation.preprocessed);
    }

    std::fs::write(&args.output, &translation.python)
        .with_context(|| format!("cannot write output file at {:?}", args.output))?;
    info!(output = %args.output, "translation written");

    Ok(())
}

/// Ctrl-C ends the program quietly and successfully. The output file is written in one go at the
/// very end, so an interrupted run leaves nothing behind.
#[cfg(unix)]
fn exit_quietly_on_interrupt() {
    extern "C" fn exit_quietly(_: libc::c_int) {
        // SAFETY: `_exit` is async-signal-safe.
        unsafe { libc::_exit(0) }
    }

    // SAFETY: the handler only calls async-signal-safe functions.
    unsafe {
        libc::signal(
            libc::SIGINT,
            exit_quietly as *const () as libc::sighandler_t,
        );
    }
}

#[cfg(not(unix))]
fn exit_quietly_on_interrupt() {}

fn main() -> ExitCode {
    let args = Args::parse();

    let mut chrome_trace = args.trace.as_ref().map(|trace_path| {
        let (chrome_trace, guard) = tracing_chrome::ChromeLayerBuilder::new()
            .file(trace_path)
            .include_args(true)
            .build();
        (Some(chrome_trace), guard)
    });

    let subscriber = tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .without_time()
                .with_writer(std::io::stderr)
                .with_filter(
                    EnvFilter::builder()
                        .with_default_directive(LevelFilter::WARN.into())
                        .from_env_lossy(),
                ),
        )
        .with(chrome_trace.as_mut().and_then(|(ct, _)| ct.take()));

    tracing::subscriber::set_global_default(subscriber)
        .expect("cannot set default tracing subscriber");

    exit_quietly_on_interrupt();

    match fallible_main(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            error!("{error:?}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn command_line_is_well_formed() {
        Args::command().debug_assert();
    }

    #[test]
    fn definitions_split_at_the_first_equals_sign() {
        assert_eq!(parse_definition("DEBUG=.T.").unwrap(), ("DEBUG", ".T."));
        assert_eq!(parse_definition("EXPR=a = b").unwrap(), ("EXPR", "a = b"));
        assert_eq!(parse_definition(" EMPTY =").unwrap(), ("EMPTY", ""));
        assert!(parse_definition("DEBUG").is_err());
        assert!(parse_definition("=1").is_err());
    }

    #[test]
    fn arguments() {
        let args = Args::parse_from([
            "foxlift",
            "main.prg",
            "main.py",
            "-D",
            "DEBUG=.T.",
            "--define",
            "LEVEL=2",
            "--dump-preprocessed",
        ]);
        assert_eq!(args.input, "main.prg");
        assert_eq!(args.output, "main.py");
        assert_eq!(args.definitions, ["DEBUG=.T.", "LEVEL=2"]);
        assert!(args.dump_preprocessed);
        assert!(!args.dump_tokens);
    }
}
