use foxlift_syntax::cst::{ClassDef, ClassStmt, FuncDef, Ident};
use indexmap::IndexMap;

use crate::{
    imports::RUNTIME,
    ir::Statement,
    scope::{Binding, Scope},
    stmt::lower_comment,
    TranslateResult, Translator,
};

/// FoxPro base classes with a Python counterpart.
const BASE_CLASSES: &[(&str, &str)] = &[
    ("custom", "object"),
    ("form", "vfpfunc.Form"),
    ("label", "vfpfunc.Label"),
    ("textbox", "vfpfunc.Textbox"),
    ("checkbox", "vfpfunc.Checkbox"),
    ("spinner", "vfpfunc.Spinner"),
    ("shape", "vfpfunc.Shape"),
    ("commandbutton", "vfpfunc.CommandButton"),
];

fn base_class(name: &str) -> Option<&'static str> {
    BASE_CLASSES
        .iter()
        .find(|(class, _)| class.eq_ignore_ascii_case(name))
        .map(|(_, python)| *python)
}

/// A translated procedure, before it is placed at module or class level.
pub(crate) struct Function {
    pub name: String,
    pub parameters: Vec<String>,
    pub body: Vec<Statement>,
}

impl Function {
    pub fn header(&self) -> Statement {
        Statement::line(format_args!(
            "def {}({}):",
            self.name,
            self.parameters.join(", ")
        ))
    }
}

impl Translator {
    /// Translates a procedure body, bracketed by the runtime's dynamic scope calls. Parameters are
    /// local to the body.
    pub(crate) fn function(&mut self, func: &FuncDef) -> TranslateResult<Function> {
        let name = func
            .name
            .iter()
            .map(Ident::lowercase)
            .collect::<Vec<_>>()
            .join(".");
        let parameters: Vec<_> = func
            .parameters
            .iter()
            .map(|parameter| parameter.name.lowercase())
            .collect();

        let mut scope = Scope::new();
        for parameter in &parameters {
            scope.declare(parameter, Binding::Local);
        }
        let enclosing = self.scope.replace(scope);
        let lines = self.lines(&func.body);
        self.scope = enclosing;

        self.imports.add(RUNTIME);
        let mut body = vec![Statement::line(format_args!("{RUNTIME}.pushscope()"))];
        body.extend(lines?);
        body.push(Statement::line(format_args!("{RUNTIME}.popscope()")));
        Ok(Function {
            name,
            parameters,
            body,
        })
    }

    /// The Python class implementing a FoxPro class name.
    fn class_name(&mut self, name: String) -> String {
        match base_class(&name) {
            Some(python) => {
                if python.starts_with(RUNTIME) {
                    self.imports.add(RUNTIME);
                }
                python.to_owned()
            }
            None => name,
        }
    }

    /// Translates a class definition.
    ///
    /// Property assignments and `ADD OBJECT` become part of `__init__`, ahead of the body of an
    /// explicit `Init` method. Event handlers of contained objects (`PROCEDURE cmdOk.Click`) are
    /// defined inside `__init__` too and attached to the object there.
    pub(crate) fn class(&mut self, class: &ClassDef) -> TranslateResult<Vec<Statement>> {
        let name = class.name.lowercase();
        if base_class(&name).is_some() {
            return Err(self.error(
                &class.name,
                format!("`{name}` is a reserved class name"),
                "a built-in class already has this name",
            ));
        }
        let parent = match &class.parent {
            Some(parent) => parent.lowercase(),
            None => "custom".into(),
        };
        let parent = self.class_name(parent);

        let enclosing = self.scope.take();
        let mut setup = vec![];
        let mut methods = IndexMap::new();
        for stmt in &class.stmts {
            match stmt {
                ClassStmt::Comment(comment) => setup.push(lower_comment(comment)),
                ClassStmt::Assign { target, value, .. } => {
                    let target = self.id_attr(target)?;
                    let value = self.expr(value)?;
                    setup.push(Statement::line(format_args!("self.{target} = {value}")));
                }
                ClassStmt::AddObject {
                    name,
                    class,
                    properties,
                    ..
                } => {
                    let name = name.lowercase();
                    let class = self.class_name(class.lowercase());
                    let mut arguments = vec![];
                    for (property, value) in properties {
                        let value = self.expr(value)?;
                        arguments.push(format!("{}={value}", property.lowercase()));
                    }
                    setup.push(Statement::line(format_args!(
                        "self.{name} = {class}({})",
                        arguments.join(", ")
                    )));
                    setup.push(Statement::line(format_args!("self.add_object(self.{name})")));
                }
                ClassStmt::Method(func) => {
                    let mut method = self.function(func)?;
                    if method.name == "init" {
                        method.name = "__init__".into();
                    }
                    method.parameters.insert(0, "self".into());
                    methods.insert(method.name.clone(), method);
                }
            }
        }
        self.scope = enclosing;

        methods.retain(|name, method| {
            if !name.contains('.') {
                return true;
            }
            let local = name.replace('.', "_");
            setup.push(Statement::line(format_args!(
                "def {local}({}):",
                method.parameters.join(", ")
            )));
            setup.push(Statement::Block(std::mem::take(&mut method.body)));
            setup.push(Statement::line(format_args!("self.{name} = {local}")));
            false
        });

        let super_init = Statement::line(format_args!("super({name}, self).__init__()"));
        match methods.get_mut("__init__") {
            Some(init) => {
                let body = std::mem::take(&mut init.body);
                init.body = [super_init].into_iter().chain(setup).chain(body).collect();
            }
            None => {
                methods.insert(
                    "__init__".into(),
                    Function {
                        name: "__init__".into(),
                        parameters: vec!["self".into()],
                        body: [super_init].into_iter().chain(setup).collect(),
                    },
                );
            }
        }

        let mut members = vec![];
        for method in methods.into_values() {
            members.push(method.header());
            members.push(Statement::Block(method.body));
        }
        Ok(vec![
            Statement::line(format_args!("class {name}({parent}):")),
            Statement::Block(members),
        ])
    }
}

#[cfg(test)]
mod tests {
    use foxlift_foundation::source::{SourceFile, SourceFileSet};
    use foxlift_lexer::Lexer;
    use indoc::indoc;
    use similar_asserts::assert_eq;

    use crate::{format::render, Translator};

    fn class(source: &str) -> String {
        let mut files = SourceFileSet::new();
        let file = files.add(SourceFile::new("test.prg".into(), source.into()));
        let tokens = Lexer::new(file, source).lex().unwrap();
        let program = foxlift_syntax::parse_program(file, tokens).unwrap();
        let mut translator = Translator::new(file);
        let statements = translator.class(&program.classes[0]).unwrap();
        render(&statements)
    }

    #[test]
    fn constructor_runs_setup_before_init_body() {
        assert_eq!(
            class(indoc! {"
                DEFINE CLASS MyForm AS Form
                    Caption = 'Hello'
                    ADD OBJECT cmdOk AS CommandButton WITH Caption = 'OK', Left = 10
                    PROCEDURE cmdOk.Click
                        ThisForm.Release()
                    ENDPROC
                    PROCEDURE Init(cTitle)
                        This.Caption = cTitle
                    ENDPROC
                    PROCEDURE Show
                    ENDPROC
                ENDDEFINE
            "}),
            indoc! {"
                class myform(vfpfunc.Form):
                    def __init__(self, ctitle):
                        super(myform, self).__init__()
                        self.caption = 'Hello'
                        self.cmdok = vfpfunc.CommandButton(caption='OK', left=10)
                        self.add_object(self.cmdok)
                        def cmdok_click(self):
                            vfpfunc.pushscope()
                            self.parentform.release()
                            vfpfunc.popscope()
                        self.cmdok.click = cmdok_click
                        vfpfunc.pushscope()
                        self.caption = ctitle
                        vfpfunc.popscope()
                    def show(self):
                        vfpfunc.pushscope()
                        pass
                        vfpfunc.popscope()
            "}
        );
    }

    #[test]
    fn implicit_constructor_is_added_last() {
        assert_eq!(
            class(indoc! {"
                DEFINE CLASS counter
                    * starts at zero
                    count = 0
                    FUNCTION increment
                        This.count = This.count + 1
                    ENDFUNC
                ENDDEFINE
            "}),
            indoc! {"
                class counter(object):
                    def increment(self):
                        vfpfunc.pushscope()
                        self.count = (self.count + 1)
                        vfpfunc.popscope()
                    def __init__(self):
                        super(counter, self).__init__()
                        # starts at zero
                        self.count = 0
            "}
        );
    }
}
