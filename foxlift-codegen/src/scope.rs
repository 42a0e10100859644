use std::collections::HashMap;

use foxlift_foundation::ident::CaseInsensitive;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Binding {
    /// Parameters and `LOCAL` declarations.
    Local,
    /// `PRIVATE` declarations, visible to called procedures at run time.
    Private,
}

/// Names declared inside the function or method being translated.
#[derive(Debug, Clone, Default)]
pub struct Scope {
    names: HashMap<CaseInsensitive<String>, Binding>,
}

/// How a name used in code resolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Outside of any function body; names are plain module-level bindings.
    Module,
    Declared(Binding),
    /// Used inside a function body without a declaration. Such names live in the runtime's
    /// variable registry, but the generated code still refers to them directly.
    Undeclared,
}

impl Scope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn declare(&mut self, name: &str, binding: Binding) {
        self.names
            .insert(CaseInsensitive::new(name.to_owned()), binding);
    }

    pub fn lookup(&self, name: &str) -> Option<Binding> {
        self.names.get(CaseInsensitive::new_ref(name)).copied()
    }
}

pub fn resolve(scope: Option<&Scope>, name: &str) -> Resolution {
    match scope {
        None => Resolution::Module,
        Some(scope) => match scope.lookup(name) {
            Some(binding) => Resolution::Declared(binding),
            None => Resolution::Undeclared,
        },
    }
}
