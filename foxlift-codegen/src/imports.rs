use indexmap::IndexSet;
use tracing::debug;

use crate::ir::Statement;

/// Standard library modules, in the order they are imported.
const STDLIB: &[&str] = &["sys", "os", "math", "datetime"];

/// Runtime support module every translated program leans on.
pub const RUNTIME: &str = "vfpfunc";

/// Modules the generated program needs, in discovery order.
#[derive(Debug, Clone, Default)]
pub struct Imports {
    modules: IndexSet<String>,
}

impl Imports {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, module: &str) {
        if !self.modules.contains(module) {
            debug!(module, "import discovered");
            self.modules.insert(module.to_owned());
        }
    }

    pub fn contains(&self, module: &str) -> bool {
        self.modules.contains(module)
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// `import` lines: the standard library first, then a blank line, then everything else in the
    /// order it was discovered. A blank line follows the last import.
    pub fn statements(&self) -> Vec<Statement> {
        let stdlib = STDLIB
            .iter()
            .filter(|module| self.modules.contains(**module));
        let others: Vec<_> = self
            .modules
            .iter()
            .filter(|module| !STDLIB.contains(&module.as_str()))
            .collect();

        let mut statements: Vec<_> = stdlib
            .map(|module| Statement::line(format_args!("import {module}")))
            .collect();
        if !statements.is_empty() && !others.is_empty() {
            statements.push(Statement::Blank);
        }
        statements.extend(
            others
                .into_iter()
                .map(|module| Statement::line(format_args!("import {module}"))),
        );
        if !statements.is_empty() {
            statements.push(Statement::Blank);
        }
        statements
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(imports: &Imports) -> Vec<String> {
        imports
            .statements()
            .into_iter()
            .map(|statement| match statement {
                Statement::Line(line) => line,
                _ => String::new(),
            })
            .collect()
    }

    #[test]
    fn stdlib_comes_first() {
        let mut imports = Imports::new();
        imports.add(RUNTIME);
        imports.add("mylib");
        imports.add("math");
        imports.add("sys");
        imports.add(RUNTIME);
        assert_eq!(
            lines(&imports),
            [
                "import sys",
                "import math",
                "",
                "import vfpfunc",
                "import mylib",
                ""
            ]
        );
    }

    #[test]
    fn no_separator_without_both_groups() {
        let mut imports = Imports::new();
        imports.add("os");
        assert_eq!(lines(&imports), ["import os", ""]);

        let mut imports = Imports::new();
        imports.add(RUNTIME);
        assert_eq!(lines(&imports), ["import vfpfunc", ""]);

        assert!(Imports::new().statements().is_empty());
    }
}
