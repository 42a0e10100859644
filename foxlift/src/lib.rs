//! Translator from Visual FoxPro 9 programs to Python 3 source using the `vfpfunc` runtime.
//!
//! A file goes through four stages: the preprocessor expands it (includes, macros and
//! conditional compilation), the expanded text is lexed and parsed again, and the resulting tree
//! is translated into Python. Each stage stops at its first error.

use foxlift_foundation::{
    errors::Diagnostic,
    source::{SourceFile, SourceFileId, SourceFileSet},
};
use foxlift_lexer::Lexer;
use foxlift_preprocessor::{loader::IncludeLoader, tokens_to_source, Definitions};
use tracing::info_span;

#[derive(Debug, Clone, Default)]
pub struct TranslateOptions {
    /// Macros defined before the first line of the program.
    pub definitions: Definitions,
}

#[derive(Debug, Clone)]
pub struct Translation {
    /// The program text after preprocessing, which is what the parser saw.
    pub preprocessed: String,
    pub python: String,
}

/// Translates `file`, which must be registered in `files`. The preprocessed text is registered
/// too, as `<filename> (preprocessed)`; diagnostics from parsing and translation point into it.
pub fn translate(
    files: &mut SourceFileSet,
    loader: &dyn IncludeLoader,
    file: SourceFileId,
    options: &TranslateOptions,
) -> Result<Translation, Diagnostic> {
    let _span = info_span!("foxlift", file = %files.get(file).filename).entered();

    let (tokens, _) = foxlift_preprocessor::preprocess(files, loader, file, &options.definitions)?;
    let preprocessed = tokens_to_source(&tokens);

    let filename = format!("{} (preprocessed)", files.get(file).filename);
    let expanded = files.add(SourceFile::new(filename, preprocessed.as_str().into()));
    let tokens = Lexer::new(expanded, &preprocessed).lex()?;
    let program = foxlift_syntax::parse_program(expanded, tokens)?;
    let python = foxlift_codegen::translate_program(expanded, &program)?;

    Ok(Translation {
        preprocessed,
        python,
    })
}

#[cfg(test)]
mod tests {
    use foxlift_preprocessor::loader::MemoryLoader;
    use indoc::indoc;
    use similar_asserts::assert_eq;

    use super::*;

    fn run(
        loader: &MemoryLoader,
        options: &TranslateOptions,
        files: &mut SourceFileSet,
        source: &str,
    ) -> Result<Translation, Diagnostic> {
        let file = files.add(SourceFile::new("main.prg".into(), source.into()));
        translate(files, loader, file, options)
    }

    #[test]
    fn included_macros_reach_the_program() {
        let loader = MemoryLoader::new().with_file(
            "consts.h",
            indoc! {"
                #DEFINE GREETING 'Hello'
                #DEFINE MAXLEN 10
            "},
        );
        let translation = run(
            &loader,
            &TranslateOptions::default(),
            &mut SourceFileSet::new(),
            indoc! {r#"
                #INCLUDE consts.h
                * Greets the user
                LOCAL cName
                cName = GREETING + "!"
                ? cName
                DO CASE
                CASE LEN(cName) > MAXLEN
                    ? LEFT(cName, MAXLEN)
                OTHERWISE
                    ? cName
                ENDCASE
            "#},
        )
        .unwrap();
        assert_eq!(
            translation.python,
            indoc! {"
                import sys

                import vfpfunc

                def main(argv):
                    # Greets the user
                    vfpfunc.addlocalvar('cname')
                    cname = 'Hello!'
                    print(cname)
                    if len(cname) > 10:
                        print(cname[:10])
                    else:
                        print(cname)

                if __name__ == '__main__':
                    main(sys.argv)
            "}
        );
    }

    #[test]
    fn seeded_definitions_drive_conditionals() {
        let mut files = SourceFileSet::new();
        let mut options = TranslateOptions::default();
        options
            .definitions
            .define_text(&mut files, "DEBUG", ".T.")
            .unwrap();
        let translation = run(
            &MemoryLoader::new(),
            &options,
            &mut files,
            indoc! {"
                #IF DEBUG
                ? 'debug build'
                #ELSE
                ? 'release build'
                #ENDIF
            "},
        )
        .unwrap();
        assert_eq!(translation.preprocessed, "? 'debug build'\n");
        assert_eq!(
            translation.python,
            indoc! {"
                import sys

                def main(argv):
                    print('debug build')

                if __name__ == '__main__':
                    main(sys.argv)
            "}
        );
    }

    #[test]
    fn parse_errors_point_into_the_preprocessed_text() {
        let mut files = SourceFileSet::new();
        let error = run(
            &MemoryLoader::new(),
            &TranslateOptions::default(),
            &mut files,
            "IF x\n  ? 1\n",
        )
        .unwrap_err();
        assert_eq!(error.message, "`ENDIF` expected");
        assert_eq!(
            files.get(error.source_file).filename,
            "main.prg (preprocessed)"
        );
    }
}
