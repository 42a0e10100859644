//! Translation of parsed FoxPro programs into Python source using the `vfpfunc` runtime.
//!
//! [`Translator`] walks the syntax tree once and produces a nested [`ir::Statement`] list, which
//! [`format::render`] turns into text. Expressions lower to [`value::Value`]s, which keep track of
//! whether they are still constants that can be folded at translation time.

pub mod builtins;
mod class;
mod expr;
pub mod format;
pub mod imports;
pub mod ir;
mod program;
pub mod scope;
mod stmt;
pub mod value;

use foxlift_foundation::{
    errors::{Diagnostic, Label},
    source::{SourceFile, SourceFileId, SourceFileSet, Spanned},
};
use foxlift_lexer::Lexer;
use foxlift_syntax::cst;
use imports::{Imports, RUNTIME};
use scope::{Binding, Resolution, Scope};
use tracing::info_span;
use value::Value;

pub type TranslateResult<T> = Result<T, Diagnostic>;

/// State of one translation unit.
pub struct Translator {
    file: SourceFileId,
    pub imports: Imports,
    /// Names declared in the function being translated; `None` at class level.
    scope: Option<Scope>,
}

impl Translator {
    pub fn new(file: SourceFileId) -> Self {
        Self {
            file,
            imports: Imports::new(),
            scope: None,
        }
    }

    fn error(
        &self,
        span: &impl Spanned,
        message: impl Into<String>,
        label: impl Into<String>,
    ) -> Diagnostic {
        Diagnostic::error(self.file, message).with_label(Label::primary(span, label.into()))
    }

    fn resolve(&mut self, name: &str) -> Resolution {
        let resolution = scope::resolve(self.scope.as_ref(), name);
        // Undeclared names are left as plain Python names; they only mark the runtime as needed.
        if resolution == Resolution::Undeclared {
            self.imports.add(RUNTIME);
        }
        resolution
    }

    fn declare(&mut self, name: &str, binding: Binding) {
        if let Some(scope) = &mut self.scope {
            scope.declare(name, binding);
        }
    }
}

/// Translates a whole program into Python source text.
pub fn translate_program(file: SourceFileId, program: &cst::Program) -> TranslateResult<String> {
    let statements = {
        let _span = info_span!("translate").entered();
        Translator::new(file).program(program)?
    };
    Ok(format::render(&statements))
}

/// Lowers a single parsed expression outside of any function.
pub fn lower_expression(file: SourceFileId, expr: &cst::Expr) -> TranslateResult<Value> {
    Translator::new(file).expr(expr)
}

/// Lowers an expression whose value should be known at translation time, as in `#IF`.
/// Comparisons and boolean operators on constants are evaluated; anything else lowers as usual.
pub fn evaluate_expression(file: SourceFileId, expr: &cst::Expr) -> TranslateResult<Value> {
    Translator::new(file).folded_expr(expr)
}

/// Lexes, parses and lowers an expression given as source text. The text is registered in
/// `files` so that diagnostics can point into it.
pub fn translate_expression(files: &mut SourceFileSet, source: &str) -> TranslateResult<Value> {
    let file = files.add(SourceFile::new("<expression>".into(), source.into()));
    let tokens = Lexer::new(file, source).lex()?;
    let expr = foxlift_syntax::parse_expr(file, tokens)?;
    lower_expression(file, &expr)
}

#[cfg(test)]
mod tests {
    use foxlift_foundation::source::{SourceFile, SourceFileSet};
    use foxlift_lexer::Lexer;
    use indoc::indoc;
    use similar_asserts::assert_eq;

    use super::*;

    fn translate(source: &str) -> TranslateResult<String> {
        let mut files = SourceFileSet::new();
        let file = files.add(SourceFile::new("test.prg".into(), source.into()));
        let tokens = Lexer::new(file, source).lex()?;
        let program = foxlift_syntax::parse_program(file, tokens)?;
        translate_program(file, &program)
    }

    fn expression(source: &str) -> String {
        let mut files = SourceFileSet::new();
        translate_expression(&mut files, source)
            .map(|value| value.to_string())
            .unwrap_or_else(|diagnostic| panic!("{}", diagnostic.render(&files)))
    }

    #[test]
    fn addition_of_numbers_is_not_folded() {
        assert_eq!(
            translate("x = 1 + 2\n").unwrap(),
            indoc! {"
                import sys

                import vfpfunc

                def main(argv):
                    x = (1 + 2)

                if __name__ == '__main__':
                    main(sys.argv)
            "}
        );
    }

    #[test]
    fn concatenated_strings_are_folded() {
        assert_eq!(
            translate("? \"A\" + \"B\"\n").unwrap(),
            indoc! {"
                import sys

                def main(argv):
                    print('AB')

                if __name__ == '__main__':
                    main(sys.argv)
            "}
        );
    }

    #[test]
    fn expressions() {
        assert_eq!(expression("1.5 * 2 - x"), "((1.5 * 2) - x)");
        assert_eq!(expression("1.5 * (2 - x)"), "(1.5 * ((2 - x)))");
        assert_eq!(expression("2 ^ 10"), "(2 ** 10)");
        assert_eq!(expression("a = 1 .OR. b # 2"), "a == 1 or b != 2");
        assert_eq!(expression("x > 3.0"), "x > 3");
        assert_eq!(expression("'a' $ name"), "('a' in name)");
        assert_eq!(expression(".NOT. done"), "not done");
        assert_eq!(expression("-5"), "-5");
        assert_eq!(expression("-x"), "-x");
        assert_eq!(expression("('text')"), "('text')");
        assert_eq!(expression("1e"), "1.0");
        assert_eq!(expression("0x1F"), "31");
        assert_eq!(expression(".T."), "True");
        assert_eq!(expression(".NULL."), "None");
        assert_eq!(expression("{ / / }"), "None");
        assert_eq!(expression("This.Caption"), "self.caption");
        assert_eq!(expression("THISFORM.Release()"), "self.parentform.release()");
        assert_eq!(expression("obj.items[1]"), "obj.items(1)");
    }

    #[test]
    fn operands_keep_the_grouping_of_the_source() {
        assert_eq!(expression("-2 ^ 2"), "((-2) ** 2)");
        assert_eq!(expression("-x ^ 2"), "((-x) ** 2)");
        assert_eq!(expression("2 ^ -x"), "(2 ** -x)");
        assert_eq!(expression("a = .NOT. b"), "a == (not b)");
        assert_eq!(expression("1 + .NOT. b"), "(1 + (not b))");
        assert_eq!(expression("- .NOT. b"), "-(not b)");
        assert_eq!(expression("a = b = c"), "(a == b) == c");
        assert_eq!(expression(".NOT. a = b"), "not a == b");
        assert_eq!(expression("x .AND. .NOT. y"), "x and not y");
    }

    #[test]
    fn negated_comparison_in_a_condition() {
        assert_eq!(
            translate("IF a = .NOT. b
  ? 1
ENDIF
").unwrap(),
            indoc! {"
                import sys

                import vfpfunc

                def main(argv):
                    if a == (not b):
                        print(1)

                if __name__ == '__main__':
                    main(sys.argv)
            "}
        );
    }

    fn evaluate(source: &str) -> Value {
        let mut files = SourceFileSet::new();
        let file = files.add(SourceFile::new("test.prg".into(), source.into()));
        let tokens = Lexer::new(file, source).lex().unwrap();
        let expr = foxlift_syntax::parse_expr(file, tokens).unwrap();
        evaluate_expression(file, &expr).unwrap()
    }

    #[test]
    fn constant_conditions_are_evaluated() {
        assert_eq!(evaluate("2 > 1"), Value::bool(true));
        assert_eq!(evaluate("3 >= 3.5"), Value::bool(false));
        assert_eq!(evaluate("'abc' = 'abc' .AND. .NOT. .F."), Value::bool(true));
        assert_eq!(evaluate("(1 = 2) .OR. 'b' < 'a'"), Value::bool(false));
        assert_eq!(evaluate("'b' $ 'abc'"), Value::bool(true));
        assert_eq!(evaluate(".T. = 1"), Value::bool(true));
        assert_eq!(evaluate("1 = 'a'"), Value::bool(false));
        assert_eq!(evaluate("1 < 'a'").to_string(), "1 < 'a'");
        assert_eq!(evaluate("x > 1").to_string(), "x > 1");
        assert_eq!(evaluate("1 + 2").to_string(), "(1 + 2)");
    }

    #[test]
    fn calls_dispatch_through_the_builtin_table() {
        assert_eq!(expression("chr(65)"), "'A'");
        assert_eq!(expression("IIF(x, 'y', 'n')"), "('y' if x else 'n')");
        assert_eq!(expression("MessageBox('hi')"), "vfpfunc.messagebox('hi')");
        assert_eq!(expression("MyFunc(1, 2)"), "myfunc(1, 2)");
    }

    #[test]
    fn dated_literals_are_rejected() {
        let mut files = SourceFileSet::new();
        let error = translate_expression(&mut files, "{^2020-01-01}").unwrap_err();
        assert_eq!(
            error.message,
            "date literals other than the empty date are not supported"
        );
    }

    #[test]
    fn reserved_class_names_are_rejected() {
        let error = translate("DEFINE CLASS Form AS custom\nENDDEFINE\n").unwrap_err();
        assert_eq!(error.message, "`form` is a reserved class name");
    }

    #[test]
    fn shared_and_exclusive_cannot_be_combined() {
        let error = translate("USE customers SHARED EXCLUSIVE\n").unwrap_err();
        assert_eq!(error.message, "`SHARED` and `EXCLUSIVE` cannot be combined");
    }
}
