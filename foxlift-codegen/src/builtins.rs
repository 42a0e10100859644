//! FoxPro functions with a dedicated translation.
//!
//! A rule sees the already lowered arguments and either produces the translated call or declines
//! with `None`, in which case the call is translated like any other function call.

use crate::{
    imports::{Imports, RUNTIME},
    value::{to_int, Value},
};

type Rule = fn(&mut Imports, &[Value]) -> Option<Value>;

static BUILTINS: &[(&str, Rule)] = &[
    ("abs", |_, args| Some(Value::call("abs", args))),
    ("alltrim", |_, args| method(args, "strip")),
    ("asc", asc),
    ("ceiling", |imports, args| math(imports, "ceil", args)),
    ("chr", chr),
    ("date", date),
    ("file", |imports, args| {
        imports.add("os");
        Some(Value::call("os.path.isfile", args))
    }),
    ("iif", |_, args| match args {
        [condition, if_true, if_false] => Some(Value::code(format!(
            "({if_true} if {condition} else {if_false})"
        ))),
        _ => None,
    }),
    ("left", |_, args| match args {
        [text, length] => Some(Value::code(format!(
            "{text}[:{}]",
            to_int(length.clone())
        ))),
        _ => None,
    }),
    ("len", |_, args| Some(Value::call("len", args))),
    ("lower", |_, args| method(args, "lower")),
    ("ltrim", |_, args| method(args, "lstrip")),
    ("round", |_, args| Some(Value::call("round", args))),
    ("rtrim", |_, args| method(args, "rstrip")),
    ("space", space),
    ("sqrt", |imports, args| math(imports, "sqrt", args)),
    ("str", |imports, args| runtime(imports, "num_to_str", args)),
    ("strtran", |_, args| match args {
        [text, search, replacement] => Some(Value::call(
            format_args!("{text}.replace"),
            &[search.clone(), replacement.clone()],
        )),
        _ => None,
    }),
    ("trim", |_, args| method(args, "rstrip")),
    ("upper", |_, args| method(args, "upper")),
    ("used", |imports, args| runtime(imports, "used", args)),
];

/// Functions the runtime module exports under their FoxPro name.
const RUNTIME_FUNCTIONS: &[&str] = &[
    "addarray",
    "addlocalvar",
    "addpublicvar",
    "clear",
    "clearall",
    "cleardlls",
    "clearevents",
    "clearmacros",
    "createobject",
    "delete_file",
    "messagebox",
    "num_to_str",
    "popscope",
    "pushscope",
    "quit",
    "release",
    "report_form",
    "seconds",
    "set",
    "used",
    "wait",
];

/// Applies the dedicated rule for `name`, if there is one and it accepts the arguments.
pub fn translate_call(imports: &mut Imports, name: &str, args: &[Value]) -> Option<Value> {
    let (_, rule) = BUILTINS
        .iter()
        .find(|(builtin, _)| builtin.eq_ignore_ascii_case(name))?;
    rule(imports, args)
}

pub fn is_runtime_function(name: &str) -> bool {
    RUNTIME_FUNCTIONS
        .iter()
        .any(|function| function.eq_ignore_ascii_case(name))
}

fn method(args: &[Value], method: &str) -> Option<Value> {
    match args {
        [receiver] => Some(Value::code(format!("{receiver}.{method}()"))),
        _ => None,
    }
}

fn math(imports: &mut Imports, function: &str, args: &[Value]) -> Option<Value> {
    match args {
        [_] => {
            imports.add("math");
            Some(Value::call(format_args!("math.{function}"), args))
        }
        _ => None,
    }
}

fn runtime(imports: &mut Imports, function: &str, args: &[Value]) -> Option<Value> {
    imports.add(RUNTIME);
    Some(Value::call(format_args!("{RUNTIME}.{function}"), args))
}

fn chr(_: &mut Imports, args: &[Value]) -> Option<Value> {
    let [code] = args else { return None };
    let code = code.as_number()?;
    if code < 0.0 || code.fract() != 0.0 || code > f64::from(u32::MAX) {
        return None;
    }
    let c = char::from_u32(code as u32)?;
    Some(Value::text(c))
}

/// Longest run of spaces written out as a literal.
const MAX_FOLDED_SPACES: f64 = 1024.0;

fn space(_: &mut Imports, args: &[Value]) -> Option<Value> {
    let [count] = args else { return None };
    match count.as_number() {
        Some(number) if number <= MAX_FOLDED_SPACES => {
            Some(Value::text(" ".repeat(number.max(0.0) as usize)))
        }
        _ => Some(Value::code(format!("(' ' * {})", to_int(count.clone())))),
    }
}

fn asc(_: &mut Imports, args: &[Value]) -> Option<Value> {
    let [text] = args else { return None };
    let first = text.as_text()?.chars().next()?;
    Some(Value::int(i64::from(u32::from(first))))
}

fn date(imports: &mut Imports, args: &[Value]) -> Option<Value> {
    if !args.is_empty() {
        return None;
    }
    imports.add("datetime");
    Some(Value::code("datetime.datetime.now().date()"))
}
