use foxlift_syntax::cst::{
    CaseClause, ClearTarget, Comment, DeclScope, DirectoryAction, Expr, FieldDef, GoRecord, Ident,
    ReleaseTarget, ReplaceScope, SetArg, SpecialExpr, Stmt, StmtKind, TableKind, WaitClauses,
};

use crate::{
    imports::RUNTIME,
    ir::{ensure_not_empty, Statement},
    scope::Binding,
    value::{to_int, Constant, Value},
    TranslateResult, Translator,
};

impl Translator {
    /// Lowers the statements of a block, which must not end up empty in Python.
    pub(crate) fn lines(&mut self, stmts: &[Stmt]) -> TranslateResult<Vec<Statement>> {
        let mut block = vec![];
        for stmt in stmts {
            block.extend(self.stmt(stmt)?);
        }
        ensure_not_empty(&mut block);
        Ok(block)
    }

    pub(crate) fn stmt(&mut self, stmt: &Stmt) -> TranslateResult<Vec<Statement>> {
        Ok(match &stmt.kind {
            StmtKind::Comment(comment) => vec![lower_comment(comment)],
            StmtKind::Print { args } => {
                let args = self.exprs(args)?;
                vec![Statement::line(Value::call("print", &args))]
            }

            StmtKind::If {
                condition,
                then,
                otherwise,
            } => {
                let condition = self.expr(condition)?;
                let mut statements = vec![
                    Statement::line(format_args!("if {condition}:")),
                    Statement::Block(self.lines(then)?),
                ];
                if let Some(otherwise) = otherwise {
                    statements.push(Statement::line("else:"));
                    statements.push(Statement::Block(self.lines(otherwise)?));
                }
                statements
            }
            StmtKind::Case { clauses, otherwise } => self.case(clauses, otherwise.as_deref())?,
            StmtKind::For {
                variable,
                start,
                stop,
                step,
                body,
            } => self.for_range(variable, start, stop, step.as_ref(), body)?,
            StmtKind::ForEach {
                variable,
                iterable,
                body,
            } => {
                let variable = self.id_attr(variable)?;
                let iterable = self.expr(iterable)?;
                vec![
                    Statement::line(format_args!("for {variable} in {iterable}:")),
                    Statement::Block(self.lines(body)?),
                ]
            }
            StmtKind::While { condition, body } => {
                let condition = self.expr(condition)?;
                vec![
                    Statement::line(format_args!("while {condition}:")),
                    Statement::Block(self.lines(body)?),
                ]
            }
            StmtKind::Exit => vec![Statement::line("break")],
            StmtKind::Loop => vec![Statement::line("continue")],

            StmtKind::Declare { scope, names } => {
                let names: Vec<_> = names.iter().map(|param| param.name.lowercase()).collect();
                match scope {
                    DeclScope::Private => {
                        for name in &names {
                            self.declare(name, Binding::Private);
                        }
                        vec![Statement::line(format_args!(
                            "# PRIVATE {}",
                            names.join(", ")
                        ))]
                    }
                    DeclScope::Public | DeclScope::Local => {
                        let function = if *scope == DeclScope::Public {
                            "addpublicvar"
                        } else {
                            for name in &names {
                                self.declare(name, Binding::Local);
                            }
                            "addlocalvar"
                        };
                        names
                            .into_iter()
                            .map(|name| self.runtime_call(function, &[Value::text(name)]))
                            .collect()
                    }
                }
            }
            StmtKind::Dimension { name, dimensions } => {
                let mut dimensions = self.exprs(dimensions)?;
                let dimensions = if dimensions.len() == 1 {
                    dimensions.remove(0)
                } else {
                    Value::list(dimensions)
                };
                vec![self.runtime_call("addarray", &[Value::text(name.lowercase()), dimensions])]
            }

            StmtKind::Store { value, targets } => {
                let value = self.expr(value)?;
                let mut line = String::new();
                for target in targets {
                    line.push_str(&self.id_attr(target)?.to_string());
                    line.push_str(" = ");
                }
                line.push_str(&value.to_string());
                vec![Statement::Line(line)]
            }
            StmtKind::Assign { target, value } => {
                let target = self.id_attr(target)?;
                let value = self.expr(value)?;
                vec![Statement::line(format_args!("{target} = {value}"))]
            }
            StmtKind::Return { value } => match value {
                Some(value) => {
                    let value = self.expr(value)?;
                    vec![Statement::line(format_args!("return {value}"))]
                }
                None => vec![Statement::line("return")],
            },

            StmtKind::Directory { action, path } => {
                let path = self.special_expr(path)?;
                let function = match action {
                    DirectoryAction::Make => "os.mkdir",
                    DirectoryAction::Remove => "os.rmdir",
                };
                self.imports.add("os");
                vec![Statement::line(Value::call(function, &[path]))]
            }
            StmtKind::DeleteFile { path, recycle } => {
                let path = match path {
                    Some(path) => self.special_expr(path)?,
                    None => Value::NONE,
                };
                if *recycle {
                    vec![self.runtime_call("delete_file", &[path, Value::bool(true)])]
                } else {
                    self.imports.add("os");
                    vec![Statement::line(Value::call("os.remove", &[path]))]
                }
            }
            StmtKind::Quit => vec![self.runtime_call("quit", &[])],
            StmtKind::Clear(target) => {
                let (function, args) = match target {
                    ClearTarget::Screen => ("clear", vec![]),
                    ClearTarget::All => ("clearall", vec![]),
                    ClearTarget::Dlls(dlls) => ("cleardlls", self.exprs(dlls)?),
                    ClearTarget::Macros => ("clearmacros", vec![]),
                    ClearTarget::Events => ("clearevents", vec![]),
                };
                vec![self.runtime_call(function, &args)]
            }
            StmtKind::OnError { handler } => {
                self.imports.add(RUNTIME);
                let handler = match handler {
                    Some(handler) => match self.stmt(handler)?.as_slice() {
                        [Statement::Line(line)] => format!("lambda: {line}"),
                        _ => {
                            return Err(self.error(
                                &handler.span,
                                "`ON ERROR` handler must be a single-line command",
                                "this command does not fit in a lambda",
                            ))
                        }
                    },
                    None => "None".into(),
                };
                vec![Statement::line(format_args!(
                    "{RUNTIME}.error_func = {handler}"
                ))]
            }
            StmtKind::Release(target) => match target {
                ReleaseTarget::All => vec![self.runtime_call("release", &[])],
                ReleaseTarget::Names(names) => names
                    .iter()
                    .map(|name| self.runtime_call("release", &[Value::text(name.lowercase())]))
                    .collect(),
            },
            StmtKind::Wait(clauses) => vec![self.wait(clauses)?],

            StmtKind::CreateTable {
                kind,
                name,
                free,
                fields,
            } => {
                let name = self.special_expr(name)?;
                let fields = self.field_definitions(fields)?;
                let function = match kind {
                    TableKind::Table => "db.create_table",
                    TableKind::Dbf => "db.create_dbf",
                };
                let free = Value::text(if *free { "free" } else { "" });
                vec![self.runtime_call(function, &[name, Value::text(fields), free])]
            }
            StmtKind::Select { table } => {
                let table = self.special_expr(table)?;
                vec![self.runtime_call("db.select", &[table])]
            }
            StmtKind::Go { record, area } => {
                let area = match area {
                    Some(area) => self.id_attr(area)?,
                    None => Value::NONE,
                };
                let record = match record {
                    GoRecord::Top => Value::int(0),
                    GoRecord::Bottom => Value::int(-1),
                    GoRecord::Record(record) => self.expr(record)?,
                };
                vec![self.runtime_call("db.goto", &[area, record])]
            }
            StmtKind::Use {
                table,
                area,
                shared,
                exclusive,
            } => {
                let mode = match (*shared, *exclusive) {
                    (true, true) => {
                        return Err(self.error(
                            &stmt.span,
                            "`SHARED` and `EXCLUSIVE` cannot be combined",
                            "a table is opened either shared or exclusively",
                        ))
                    }
                    (true, false) => Value::text("shared"),
                    (false, true) => Value::text("exclusive"),
                    (false, false) => Value::NONE,
                };
                let table = match table {
                    Some(table) => self.special_expr(table)?,
                    None => Value::NONE,
                };
                let area = match area {
                    Some(area) => match self.expr(area)? {
                        float @ Value::Const(Constant::Float(_)) => to_int(float),
                        area => area,
                    },
                    None => Value::NONE,
                };
                vec![self.runtime_call("db.use", &[table, area, mode])]
            }
            StmtKind::Append { blank, table } => {
                let table = match table {
                    Some(table) => self.id_attr(table)?,
                    None => Value::NONE,
                };
                vec![self.runtime_call("db.append", &[table, Value::bool(!blank)])]
            }
            StmtKind::Replace {
                field,
                value,
                scope,
            } => {
                let value = self.expr(value)?;
                let scope = match scope {
                    None => Value::NONE,
                    Some(ReplaceScope::All) => Value::text("all"),
                    Some(ReplaceScope::Rest) => Value::text("rest"),
                    Some(ReplaceScope::Next(count)) => {
                        Value::list(vec![Value::text("next"), self.expr(count)?])
                    }
                    Some(ReplaceScope::Record(record)) => {
                        Value::list(vec![Value::text("record"), self.expr(record)?])
                    }
                };
                let field = self.id_attr(field)?.to_string();
                let (table, field) = match field.rsplit_once('.') {
                    Some((table, field)) => (Value::text(table), Value::text(field)),
                    None => (Value::NONE, Value::text(field)),
                };
                vec![self.runtime_call("db.replace", &[table, field, value, scope])]
            }
            StmtKind::ReportForm { form } => {
                let form = self.special_expr(form)?;
                vec![self.runtime_call("report_form", &[form])]
            }
            StmtKind::Set { setting, args } => vec![self.set(setting, args)?],

            StmtKind::Do {
                target,
                library,
                args,
            } => {
                let target = self.id_attr(target)?;
                let args = self.exprs(args)?;
                let function = match library {
                    Some(library) => {
                        let module = self.library(library)?;
                        format!("{module}.{target}")
                    }
                    None => target.to_string(),
                };
                vec![Statement::line(Value::call(function, &args))]
            }
            StmtKind::Expr(expr) => vec![Statement::line(self.expr(expr)?)],
        })
    }

    /// A call into the runtime module, as a statement of its own.
    fn runtime_call(&mut self, function: &str, args: &[Value]) -> Statement {
        self.imports.add(RUNTIME);
        Statement::line(Value::call(format_args!("{RUNTIME}.{function}"), args))
    }

    fn case(
        &mut self,
        clauses: &[CaseClause],
        otherwise: Option<&[Stmt]>,
    ) -> TranslateResult<Vec<Statement>> {
        let mut statements = vec![];
        let mut branches = 0;
        for clause in clauses {
            match clause {
                CaseClause::Comment(comment) => statements.push(lower_comment(comment)),
                CaseClause::Case { condition, body } => {
                    let condition = self.expr(condition)?;
                    let keyword = if branches == 0 { "if" } else { "elif" };
                    statements.push(Statement::line(format_args!("{keyword} {condition}:")));
                    statements.push(Statement::Block(self.lines(body)?));
                    branches += 1;
                }
            }
        }

        match (branches, otherwise) {
            // Without any CASE the OTHERWISE body always runs.
            (0, otherwise) => {
                let body = match otherwise {
                    Some(otherwise) => self.lines(otherwise)?,
                    None => vec![Statement::line("pass")],
                };
                statements.push(Statement::line("if True:"));
                statements.push(Statement::Block(body));
            }
            (_, Some(otherwise)) => {
                statements.push(Statement::line("else:"));
                statements.push(Statement::Block(self.lines(otherwise)?));
            }
            (_, None) => (),
        }
        Ok(statements)
    }

    /// `FOR` counts up to and including its stop value.
    fn for_range(
        &mut self,
        variable: &foxlift_syntax::cst::IdAttr,
        start: &Expr,
        stop: &Expr,
        step: Option<&Expr>,
        body: &[Stmt],
    ) -> TranslateResult<Vec<Statement>> {
        let variable = self.id_attr(variable)?;
        let mut range = vec![to_int(self.expr(start)?)];
        range.push(match to_int(self.expr(stop)?) {
            Value::Const(Constant::Int(stop)) => Value::int(stop.saturating_add(1)),
            stop => Value::code(format!("{stop} + 1")),
        });
        if let Some(step) = step {
            range.push(to_int(self.expr(step)?));
        }
        Ok(vec![
            Statement::line(format_args!(
                "for {variable} in {}:",
                Value::call("range", &range)
            )),
            Statement::Block(self.lines(body)?),
        ])
    }

    fn wait(&mut self, clauses: &WaitClauses) -> TranslateResult<Statement> {
        let message = match &clauses.message {
            Some(message) => self.expr(message)?,
            None => Value::text(""),
        };
        let to = match &clauses.to {
            Some(to) => self.expr(to)?,
            None => Value::NONE,
        };
        let window = match &clauses.window {
            Some(Some((row, column))) => Value::list(vec![self.expr(row)?, self.expr(column)?]),
            Some(None) => Value::list(vec![Value::int(-1), Value::int(-1)]),
            None => Value::list(vec![]),
        };
        let timeout = match &clauses.timeout {
            Some(timeout) => self.expr(timeout)?,
            None => Value::int(-1),
        };
        self.imports.add(RUNTIME);
        Ok(Statement::line(format_args!(
            "{RUNTIME}.wait({message}, to={to}, window={window}, nowait={}, noclear={}, timeout={timeout})",
            Value::bool(clauses.nowait),
            Value::bool(clauses.noclear),
        )))
    }

    /// `name type(width, precision)` entries joined with `; `, as the runtime's table
    /// functions expect them.
    fn field_definitions(&mut self, fields: &[FieldDef]) -> TranslateResult<String> {
        let mut definitions = vec![];
        for field in fields {
            let mut definition = format!("{} {}", field.name.lowercase(), field.ty.lowercase());
            if !field.size.is_empty() {
                let mut sizes = vec![];
                for size in &field.size {
                    let value = self.expr(size)?;
                    let Some(number) = value.as_number() else {
                        return Err(self.error(
                            size,
                            "field size must be a constant number",
                            "this is only known at run time",
                        ));
                    };
                    sizes.push((number.trunc() as i64).to_string());
                }
                definition.push_str(&format!("({})", sizes.join(", ")));
            }
            definitions.push(definition);
        }
        Ok(definitions.join("; "))
    }

    fn set(&mut self, setting: &Ident, args: &[SetArg]) -> TranslateResult<Statement> {
        let word = setting.lowercase();
        let mut values = vec![Value::text(word.as_str())];
        if word == "printer" {
            let has = |keyword: &str| {
                args.iter()
                    .any(|arg| matches!(arg, SetArg::Keyword(ident) if ident.is(keyword)))
            };
            let operand = args.iter().find_map(|arg| match arg {
                SetArg::Value(value) => Some(value),
                SetArg::Keyword(_) => None,
            });
            if has("on") {
                values.push(Value::int(1));
                if has("prompt") {
                    values.push(Value::bool(true));
                }
            } else if has("off") {
                values.push(Value::int(0));
            } else if has("to") {
                if has("default") {
                    values.push(Value::list(vec![Value::text("Default"), Value::NONE]));
                } else if let Some(operand) = operand {
                    let kind = if has("name") { "Name" } else { "File" };
                    let operand = self.special_expr(operand)?;
                    values.push(Value::list(vec![Value::text(kind), operand]));
                    if kind == "File" {
                        values.push(Value::bool(has("additive")));
                    }
                }
            }
        } else {
            for arg in args {
                values.push(match arg {
                    SetArg::Keyword(keyword) => Value::text(keyword.lowercase()),
                    SetArg::Value(value) => self.special_expr(value)?,
                });
            }
        }
        Ok(self.runtime_call("set", &values))
    }

    /// Module providing the procedure of `DO ... IN library`. Named libraries are imported.
    fn library(&mut self, library: &SpecialExpr) -> TranslateResult<String> {
        let library = self.special_expr(library)?;
        Ok(match library.as_text() {
            Some(name) => {
                let module = if name.to_ascii_lowercase().ends_with(".app") {
                    &name[..name.len() - 4]
                } else {
                    name
                };
                self.imports.add(module);
                module.to_owned()
            }
            None => library.to_string(),
        })
    }
}

/// Python comment for a FoxPro line comment: the `*` markers on both ends become `#`.
pub(crate) fn lower_comment(comment: &Comment) -> Statement {
    let line = comment.text.lines().next().unwrap_or_default().trim();
    if line.is_empty() {
        return Statement::Blank;
    }
    let line = line.strip_prefix("&&").unwrap_or(line);

    let body = line.trim_start_matches('*');
    let leading = line.len() - body.len();
    let trimmed = body.trim_end_matches('*');
    let trailing = body.len() - trimmed.len();
    if leading == 0 {
        let trimmed = match trimmed.get(..4) {
            Some(note) if note.eq_ignore_ascii_case("note") => &trimmed[4..],
            _ => trimmed,
        };
        return Statement::line(format_args!("#{trimmed}{}", "#".repeat(trailing)));
    }
    Statement::line(format_args!(
        "{}{trimmed}{}",
        "#".repeat(leading),
        "#".repeat(trailing)
    ))
}

#[cfg(test)]
mod tests {
    use foxlift_foundation::source::{SourceFile, SourceFileSet};
    use foxlift_lexer::Lexer;
    use indoc::indoc;
    use similar_asserts::assert_eq;

    use super::*;
    use crate::format::render;

    /// Translates statements as the body of `main`, returning just the body.
    fn body(source: &str) -> String {
        let mut files = SourceFileSet::new();
        let file = files.add(SourceFile::new("test.prg".into(), source.into()));
        let result = Lexer::new(file, source)
            .lex()
            .and_then(|tokens| foxlift_syntax::parse_program(file, tokens))
            .and_then(|program| {
                let mut translator = Translator::new(file);
                translator.scope = Some(crate::scope::Scope::new());
                translator.lines(&program.lines)
            });
        match result {
            Ok(statements) => render(&statements),
            Err(diagnostic) => panic!("{}", diagnostic.render(&files)),
        }
    }

    fn comment(text: &str) -> Statement {
        lower_comment(&Comment {
            text: text.into(),
            span: Default::default(),
        })
    }

    #[test]
    fn comments() {
        assert_eq!(comment("* hello\n"), Statement::line("# hello"));
        assert_eq!(comment("** box **\n"), Statement::line("## box ##"));
        assert_eq!(comment("*\n"), Statement::line("#"));
        assert_eq!(comment("   \n"), Statement::Blank);
        assert_eq!(comment("NOTE old style\n"), Statement::line("# old style"));
        assert_eq!(comment("* first;\n* second\n"), Statement::line("# first;"));
    }

    #[test]
    fn conditionals() {
        assert_eq!(
            body(indoc! {"
                IF x = 1
                    ? 'one'
                ELSE
                    * nothing to do
                ENDIF
            "}),
            indoc! {"
                if x == 1:
                    print('one')
                else:
                    # nothing to do
                    pass
            "}
        );
    }

    #[test]
    fn do_case() {
        assert_eq!(
            body(indoc! {"
                DO CASE
                * first
                CASE n < 0
                    sign = -1
                CASE n > 0
                    sign = 1
                OTHERWISE
                    sign = 0
                ENDCASE
            "}),
            indoc! {"
                # first
                if n < 0:
                    sign = -1
                elif n > 0:
                    sign = 1
                else:
                    sign = 0
            "}
        );
    }

    #[test]
    fn do_case_without_cases() {
        assert_eq!(
            body("DO CASE\nOTHERWISE\n  x = 1\nENDCASE\n"),
            "if True:\n    x = 1\n"
        );
        assert_eq!(body("DO CASE\nENDCASE\n"), "if True:\n    pass\n");
    }

    #[test]
    fn loops() {
        assert_eq!(
            body(indoc! {"
                FOR i = 1 TO 5
                    ? i
                ENDFOR
                FOR i = 1 TO 10 STEP 2
                NEXT i
                FOR i = 0 TO n - 1
                ENDFOR
                FOR EACH item IN items
                    LOOP
                ENDFOR
                DO WHILE .T.
                    EXIT
                ENDDO
            "}),
            indoc! {"
                for i in range(1, 6):
                    print(i)
                for i in range(1, 11, 2):
                    pass
                for i in range(0, int((n - 1)) + 1):
                    pass
                for item in items:
                    continue
                while True:
                    break
            "}
        );
    }

    #[test]
    fn declarations() {
        assert_eq!(
            body(indoc! {"
                PUBLIC gnCount
                LOCAL a, b AS String
                PRIVATE c
                DIMENSION arr(3, 4)
                DECLARE other[10]
                STORE 0 TO a, b
            "}),
            indoc! {"
                vfpfunc.addpublicvar('gncount')
                vfpfunc.addlocalvar('a')
                vfpfunc.addlocalvar('b')
                # PRIVATE c
                vfpfunc.addarray('arr', [3, 4])
                vfpfunc.addarray('other', 10)
                a = b = 0
            "}
        );
    }

    #[test]
    fn files_and_directories() {
        assert_eq!(
            body(indoc! {"
                MD backup
                RD (cDir)
                DELETE FILE 'old.txt'
                DELETE FILE temp.dbf RECYCLE
            "}),
            indoc! {"
                os.mkdir('backup')
                os.rmdir(cdir)
                os.remove('old.txt')
                vfpfunc.delete_file('temp.dbf', True)
            "}
        );
    }

    #[test]
    fn environment_commands() {
        assert_eq!(
            body(indoc! {"
                CLEAR
                CLEAR ALL
                CLEAR DLLS 'a', 'b'
                ON ERROR DO handler
                ON ERROR
                RELEASE x, y
                RELEASE ALL
                WAIT WINDOW 'Busy' NOWAIT
                WAIT TO key TIMEOUT 5
                QUIT
            "}),
            indoc! {"
                vfpfunc.clear()
                vfpfunc.clearall()
                vfpfunc.cleardlls('a', 'b')
                vfpfunc.error_func = lambda: handler()
                vfpfunc.error_func = None
                vfpfunc.release('x')
                vfpfunc.release('y')
                vfpfunc.release()
                vfpfunc.wait('Busy', to=None, window=[-1, -1], nowait=True, noclear=False, timeout=-1)
                vfpfunc.wait('', to=key, window=[], nowait=False, noclear=False, timeout=5)
                vfpfunc.quit()
            "}
        );
    }

    #[test]
    fn table_commands() {
        assert_eq!(
            body(indoc! {"
                CREATE TABLE people FREE (name C(20), age N(3), price N(10, 2), born D)
                SELECT people
                USE people IN 2.0 EXCLUSIVE
                GO TOP
                GO 5 IN people
                APPEND BLANK
                REPLACE people.age WITH 30 NEXT 1
                REPLACE name WITH 'x' ALL
                REPORT FORM summary
            "}),
            indoc! {"
                vfpfunc.db.create_table('people', 'name c(20); age n(3); price n(10, 2); born d', 'free')
                vfpfunc.db.select('people')
                vfpfunc.db.use('people', 2, 'exclusive')
                vfpfunc.db.goto(None, 0)
                vfpfunc.db.goto(people, 5)
                vfpfunc.db.append(None, False)
                vfpfunc.db.replace('people', 'age', 30, ['next', 1])
                vfpfunc.db.replace(None, 'name', 'x', 'all')
                vfpfunc.report_form('summary')
            "}
        );
    }

    #[test]
    fn set_commands() {
        assert_eq!(
            body(indoc! {"
                SET PRINTER ON PROMPT
                SET PRINTER OFF
                SET PRINTER TO DEFAULT
                SET PRINTER TO NAME 'Laser'
                SET PRINTER TO out.txt ADDITIVE
                SET EXACT ON
            "}),
            indoc! {"
                vfpfunc.set('printer', 1, True)
                vfpfunc.set('printer', 0)
                vfpfunc.set('printer', ['Default', None])
                vfpfunc.set('printer', ['Name', 'Laser'])
                vfpfunc.set('printer', ['File', 'out.txt'], True)
                vfpfunc.set('exact', 'on')
            "}
        );
    }

    #[test]
    fn do_procedures() {
        assert_eq!(
            body(indoc! {"
                DO setup
                DO report WITH 1, 'x'
                DO main IN tools.app
            "}),
            indoc! {"
                setup()
                report(1, 'x')
                tools.main()
            "}
        );
    }

    #[test]
    fn non_constant_field_size_is_an_error() {
        let mut files = SourceFileSet::new();
        let source = "CREATE TABLE t (a C(n))\n";
        let file = files.add(SourceFile::new("test.prg".into(), source.into()));
        let tokens = Lexer::new(file, source).lex().unwrap();
        let program = foxlift_syntax::parse_program(file, tokens).unwrap();
        let error = Translator::new(file).lines(&program.lines).unwrap_err();
        assert_eq!(error.message, "field size must be a constant number");
    }
}
