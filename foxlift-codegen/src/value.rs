//! Results of lowering expressions.
//!
//! An expression lowers either to a constant known at translation time or to a fragment of
//! Python code. Constants are quoted and escaped when spliced into code; code is spliced verbatim.

use std::fmt::{self, Write};

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Const(Constant),
    Code(Code),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Constant {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    List(Vec<Value>),
}

/// Text that is already valid Python.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Code(pub String);

impl Value {
    pub const NONE: Value = Value::Const(Constant::None);

    pub fn code(code: impl Into<String>) -> Self {
        Self::Code(Code(code.into()))
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self::Const(Constant::Text(text.into()))
    }

    pub fn int(value: i64) -> Self {
        Self::Const(Constant::Int(value))
    }

    pub fn bool(value: bool) -> Self {
        Self::Const(Constant::Bool(value))
    }

    pub fn list(values: Vec<Value>) -> Self {
        Self::Const(Constant::List(values))
    }

    /// `function(args...)`.
    pub fn call(function: impl fmt::Display, args: &[Value]) -> Self {
        Self::code(format!("{function}({})", join(args)))
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Const(Constant::Text(text)) => Some(text),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match *self {
            Value::Const(Constant::Int(int)) => Some(int as f64),
            Value::Const(Constant::Float(float)) => Some(float),
            _ => None,
        }
    }

    pub fn is_code(&self) -> bool {
        matches!(self, Value::Code(_))
    }

    /// Python truthiness of a constant. `None` for code, whose value is only known at run time.
    pub fn truthiness(&self) -> Option<bool> {
        match self {
            Value::Const(constant) => Some(match constant {
                Constant::None => false,
                Constant::Bool(value) => *value,
                Constant::Int(value) => *value != 0,
                Constant::Float(value) => *value != 0.0,
                Constant::Text(text) => !text.is_empty(),
                Constant::List(values) => !values.is_empty(),
            }),
            Value::Code(_) => None,
        }
    }
}

/// Coerces a value to a Python `int`: constants are truncated now, anything else at run time.
pub fn to_int(value: Value) -> Value {
    match value {
        Value::Const(Constant::Int(_)) => value,
        Value::Const(Constant::Float(float)) => Value::int(float.trunc() as i64),
        other => Value::call("int", &[other]),
    }
}

impl From<Constant> for Value {
    fn from(constant: Constant) -> Self {
        Self::Const(constant)
    }
}

/// Comma-separated representations, as in an argument list.
pub fn join(values: &[Value]) -> String {
    let mut out = String::new();
    for (i, value) in values.iter().enumerate() {
        if i != 0 {
            out.push_str(", ");
        }
        _ = write!(out, "{value}");
    }
    out
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Const(constant) => constant.fmt(f),
            Value::Code(code) => code.fmt(f),
        }
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Formats the constant the way Python's `repr` does.
impl fmt::Display for Constant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constant::None => f.write_str("None"),
            Constant::Bool(true) => f.write_str("True"),
            Constant::Bool(false) => f.write_str("False"),
            Constant::Int(value) => write!(f, "{value}"),
            Constant::Float(value) => f.write_str(&float_repr(*value)),
            Constant::Text(text) => f.write_str(&text_repr(text)),
            Constant::List(values) => write!(f, "[{}]", join(values)),
        }
    }
}

fn float_repr(value: f64) -> String {
    if value.is_nan() {
        return "nan".into();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.into();
    }

    let scientific = format!("{value:e}");
    let Some((mantissa, exponent)) = scientific.split_once('e') else {
        return scientific;
    };
    let exponent: i32 = exponent.parse().unwrap_or_default();
    if (-4..16).contains(&exponent) {
        let fixed = value.to_string();
        if fixed.contains('.') {
            fixed
        } else {
            fixed + ".0"
        }
    } else {
        let sign = if exponent < 0 { '-' } else { '+' };
        format!("{mantissa}e{sign}{:02}", exponent.abs())
    }
}

fn text_repr(text: &str) -> String {
    let quote = if text.contains('\'') && !text.contains('"') {
        '"'
    } else {
        '\''
    };
    let mut out = String::with_capacity(text.len() + 2);
    out.push(quote);
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c if c.is_control() => {
                let code = u32::from(c);
                _ = match code {
                    0..=0xff => write!(out, "\\x{code:02x}"),
                    0x100..=0xffff => write!(out, "\\u{code:04x}"),
                    _ => write!(out, "\\U{code:08x}"),
                };
            }
            c => out.push(c),
        }
    }
    out.push(quote);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn float(value: f64) -> String {
        Constant::Float(value).to_string()
    }

    #[test]
    fn floats_print_like_python() {
        assert_eq!(float(1.0), "1.0");
        assert_eq!(float(2.5), "2.5");
        assert_eq!(float(-0.0), "-0.0");
        assert_eq!(float(0.0001), "0.0001");
        assert_eq!(float(0.00001), "1e-05");
        assert_eq!(float(1.5e-5), "1.5e-05");
        assert_eq!(float(1e15), "1000000000000000.0");
        assert_eq!(float(1e16), "1e+16");
        assert_eq!(float(1.25e20), "1.25e+20");
    }

    #[test]
    fn strings_pick_quotes_like_python() {
        assert_eq!(Value::text("abc").to_string(), "'abc'");
        assert_eq!(Value::text("it's").to_string(), "\"it's\"");
        assert_eq!(Value::text("'\"").to_string(), "'\\'\"'");
        assert_eq!(Value::text("a\\b\n").to_string(), "'a\\\\b\\n'");
        assert_eq!(Value::text("\u{1}").to_string(), "'\\x01'");
        assert_eq!(Value::text("é").to_string(), "'é'");
    }

    #[test]
    fn code_is_spliced_verbatim() {
        let call = Value::call(
            "f",
            &[
                Value::code("x"),
                Value::text("x"),
                Value::NONE,
                Value::list(vec![Value::bool(true), Value::int(-1)]),
            ],
        );
        assert_eq!(call.to_string(), "f(x, 'x', None, [True, -1])");
    }

    #[test]
    fn truthiness_follows_python() {
        assert_eq!(Value::text("").truthiness(), Some(false));
        assert_eq!(Value::int(2).truthiness(), Some(true));
        assert_eq!(Value::Const(Constant::Float(0.0)).truthiness(), Some(false));
        assert_eq!(Value::NONE.truthiness(), Some(false));
        assert_eq!(Value::code("x").truthiness(), None);
    }
}
