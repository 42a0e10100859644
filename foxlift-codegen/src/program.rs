use foxlift_syntax::cst::Program;
use tracing::debug;

use crate::{ir::Statement, scope::Scope, TranslateResult, Translator};

impl Translator {
    /// Translates a whole program: imports, then classes and procedures, then a `main` wrapper
    /// around the top-level statements if there are any.
    pub(crate) fn program(&mut self, program: &Program) -> TranslateResult<Vec<Statement>> {
        let mut main = vec![];
        if !program.lines.is_empty() {
            self.scope = Some(Scope::new());
            let body = self.lines(&program.lines);
            self.scope = None;
            self.imports.add("sys");
            main = vec![
                Statement::line("def main(argv):"),
                Statement::Block(body?),
                Statement::Blank,
                Statement::line("if __name__ == '__main__':"),
                Statement::Block(vec![Statement::line("main(sys.argv)")]),
            ];
        }

        let mut definitions = vec![];
        for class in &program.classes {
            debug!(class = %class.name.text, "translating class");
            definitions.extend(self.class(class)?);
            definitions.push(Statement::Blank);
        }
        for func in &program.functions {
            let function = self.function(func)?;
            debug!(function = %function.name, "translating procedure");
            definitions.push(function.header());
            definitions.push(Statement::Block(function.body));
            definitions.push(Statement::Blank);
        }

        let mut statements = self.imports.statements();
        statements.extend(definitions);
        statements.extend(main);
        Ok(statements)
    }
}
