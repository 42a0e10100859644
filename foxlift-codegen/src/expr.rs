use foxlift_syntax::cst::{BinaryOp, Expr, IdAttr, Ident, Lit, SpecialExpr, Trailer, UnaryOp};

use crate::{
    builtins,
    imports::RUNTIME,
    value::{self, Constant, Value},
    TranslateResult, Translator,
};

impl Translator {
    pub(crate) fn expr(&mut self, expr: &Expr) -> TranslateResult<Value> {
        match expr {
            Expr::Lit(lit) => self.lit(lit),
            Expr::IdAttr(id_attr) => self.id_attr(id_attr),
            Expr::Paren { inner, .. } => {
                let inner = self.expr(inner)?;
                Ok(Value::code(format!("({inner})")))
            }
            Expr::Trailed { atom, trailers, .. } => {
                let atom = self.expr(atom)?;
                let trailers = self.trailers(trailers)?;
                Ok(Value::code(format!("{atom}{trailers}")))
            }
            Expr::Unary {
                operator, operand, ..
            } => self.unary(*operator, operand),
            Expr::Binary {
                left,
                operator,
                right,
                ..
            } => self.binary(left, *operator, right),
        }
    }

    pub(crate) fn exprs(&mut self, exprs: &[Expr]) -> TranslateResult<Vec<Value>> {
        exprs.iter().map(|expr| self.expr(expr)).collect()
    }

    /// File and table names may be written bare, in which case they are taken as text.
    pub(crate) fn special_expr(&mut self, special: &SpecialExpr) -> TranslateResult<Value> {
        match special {
            SpecialExpr::Expr(expr) => self.expr(expr),
            SpecialExpr::Path { text, .. } => Ok(Value::text(text.clone())),
        }
    }

    fn lit(&mut self, lit: &Lit) -> TranslateResult<Value> {
        Ok(match lit {
            Lit::Number { text, span } => number(text).ok_or_else(|| {
                self.error(span, "number out of range", "this number cannot be represented")
            })?,
            Lit::String { value, .. } => Value::text(value.clone()),
            Lit::Bool { value, .. } => Value::bool(*value),
            Lit::Null { .. } => Value::NONE,
            Lit::Date { text, span } => {
                let inner = text.trim_start_matches('{').trim_end_matches('}');
                if inner
                    .chars()
                    .all(|c| matches!(c, ' ' | '/' | '-' | '.' | ':' | '^'))
                {
                    Value::NONE
                } else {
                    return Err(self.error(
                        span,
                        "date literals other than the empty date are not supported",
                        "only `{ / / }` can be translated",
                    ));
                }
            }
        })
    }

    pub(crate) fn id_attr(&mut self, id_attr: &IdAttr) -> TranslateResult<Value> {
        if let [Trailer::Args { args, .. }] = id_attr.trailers.as_slice() {
            let args = self.exprs(args)?;
            return Ok(self.call(&id_attr.ident.lowercase(), &args));
        }
        let name = self.name(&id_attr.ident);
        let trailers = self.trailers(&id_attr.trailers)?;
        Ok(Value::code(format!("{name}{trailers}")))
    }

    /// The Python spelling of a name used in code.
    fn name(&mut self, ident: &Ident) -> String {
        let name = ident.lowercase();
        self.resolve(&name);
        match name.as_str() {
            "this" => "self".into(),
            "thisform" => "self.parentform".into(),
            _ => name,
        }
    }

    fn call(&mut self, name: &str, args: &[Value]) -> Value {
        if let Some(value) = builtins::translate_call(&mut self.imports, name, args) {
            return value;
        }
        if builtins::is_runtime_function(name) {
            self.imports.add(RUNTIME);
            return Value::call(format_args!("{RUNTIME}.{name}"), args);
        }
        Value::call(name, args)
    }

    fn trailers(&mut self, trailers: &[Trailer]) -> TranslateResult<String> {
        let mut out = String::new();
        for trailer in trailers {
            match trailer {
                Trailer::Args { args, .. } => {
                    let args = self.exprs(args)?;
                    out.push('(');
                    out.push_str(&value::join(&args));
                    out.push(')');
                }
                Trailer::Member(ident) => {
                    out.push('.');
                    out.push_str(&ident.lowercase());
                }
            }
        }
        Ok(out)
    }

    fn unary(&mut self, operator: UnaryOp, operand: &Expr) -> TranslateResult<Value> {
        let bare = binds_loosely(operand);
        let operand = self.expr(operand)?;
        Ok(match (operator, operand) {
            (UnaryOp::Not, operand) => Value::code(format!("not {operand}")),
            (UnaryOp::Neg, Value::Const(Constant::Int(int))) if int != i64::MIN => Value::int(-int),
            (UnaryOp::Neg, Value::Const(Constant::Float(float))) => {
                Value::Const(Constant::Float(-float))
            }
            (UnaryOp::Plus, operand) if operand.as_number().is_some() => operand,
            (UnaryOp::Neg, operand) => Value::code(format!("-{}", parenthesize(operand, bare))),
            (UnaryOp::Plus, operand) => Value::code(format!("+{}", parenthesize(operand, bare))),
        })
    }

    fn binary(&mut self, left: &Expr, operator: BinaryOp, right: &Expr) -> TranslateResult<Value> {
        let loose_operands = !matches!(operator, BinaryOp::Or | BinaryOp::And);
        // Python's `-x ** 2` is `-(x ** 2)`.
        let signed_base = operator == BinaryOp::Pow && matches!(left, Expr::Unary { .. });
        let bare_left = (loose_operands && binds_loosely(left)) || signed_base;
        let bare_right = loose_operands && binds_loosely(right);

        let left = self.expr(left)?;
        let right = self.expr(right)?;

        if operator == BinaryOp::Add {
            if let (Some(left), Some(right)) = (left.as_text(), right.as_text()) {
                return Ok(Value::text(format!("{left}{right}")));
            }
        }

        let negative_base =
            operator == BinaryOp::Pow && left.as_number().is_some_and(|base| base < 0.0);
        let left = parenthesize(left, bare_left || negative_base);
        let mut right = parenthesize(right, bare_right);

        let symbol = match operator {
            BinaryOp::Or => "or",
            BinaryOp::And => "and",
            BinaryOp::Assign | BinaryOp::Equal => "==",
            BinaryOp::NotEqual => "!=",
            BinaryOp::Less => "<",
            BinaryOp::Greater => ">",
            BinaryOp::LessEqual => "<=",
            BinaryOp::GreaterEqual => ">=",
            BinaryOp::Contains => return Ok(Value::code(format!("({left} in {right})"))),
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
            BinaryOp::Pow => "**",
        };

        if operator.is_comparison() {
            if let Value::Const(Constant::Float(float)) = right {
                if float.is_finite() && float.fract() == 0.0 {
                    right = Value::int(float as i64);
                }
            }
            Ok(Value::code(format!("{left} {symbol} {right}")))
        } else {
            Ok(Value::code(format!("({left} {symbol} {right})")))
        }
    }
}

impl Translator {
    /// Lowers an expression like [`Translator::expr`], but also evaluates comparisons, `$`,
    /// `.AND.`, `.OR.` and `.NOT.` whose operands are constants.
    pub(crate) fn folded_expr(&mut self, expr: &Expr) -> TranslateResult<Value> {
        match expr {
            Expr::Paren { inner, .. } => {
                let inner = self.folded_expr(inner)?;
                if inner.is_code() {
                    return self.expr(expr);
                }
                Ok(inner)
            }
            Expr::Unary {
                operator: UnaryOp::Not,
                operand,
                ..
            } => match self.folded_expr(operand)?.truthiness() {
                Some(truth) => Ok(Value::bool(!truth)),
                None => self.expr(expr),
            },
            Expr::Binary {
                left,
                operator,
                right,
                ..
            } if operator.is_comparison() || *operator == BinaryOp::Contains => {
                let left_value = self.folded_expr(left)?;
                let right_value = self.folded_expr(right)?;
                match fold_comparison(*operator, left_value, right_value) {
                    Some(value) => Ok(value),
                    None => self.expr(expr),
                }
            }
            _ => self.expr(expr),
        }
    }
}

/// Evaluates a comparison, `$` or boolean operator on constants the way Python would. `None` when
/// an operand is code or Python would raise an error.
fn fold_comparison(operator: BinaryOp, left: Value, right: Value) -> Option<Value> {
    if left.is_code() || right.is_code() {
        return None;
    }
    match operator {
        BinaryOp::Or => Some(if left.truthiness()? { left } else { right }),
        BinaryOp::And => Some(if left.truthiness()? { right } else { left }),
        BinaryOp::Contains => Some(Value::bool(right.as_text()?.contains(left.as_text()?))),
        _ => {
            let ordering = match (&left, &right) {
                (Value::Const(Constant::Text(a)), Value::Const(Constant::Text(b))) => {
                    Some(a.cmp(b))
                }
                (Value::Const(Constant::Int(a)), Value::Const(Constant::Int(b))) => {
                    Some(a.cmp(b))
                }
                _ => match (number_or_bool(&left), number_or_bool(&right)) {
                    (Some(a), Some(b)) => a.partial_cmp(&b),
                    _ => None,
                },
            };
            let result = match (operator, ordering) {
                (BinaryOp::Assign | BinaryOp::Equal, Some(ordering)) => ordering.is_eq(),
                (BinaryOp::NotEqual, Some(ordering)) => ordering.is_ne(),
                // Values of different kinds are never equal, but cannot be ordered.
                (BinaryOp::Assign | BinaryOp::Equal, None) => left == right,
                (BinaryOp::NotEqual, None) => left != right,
                (BinaryOp::Less, Some(ordering)) => ordering.is_lt(),
                (BinaryOp::Greater, Some(ordering)) => ordering.is_gt(),
                (BinaryOp::LessEqual, Some(ordering)) => ordering.is_le(),
                (BinaryOp::GreaterEqual, Some(ordering)) => ordering.is_ge(),
                _ => return None,
            };
            Some(Value::bool(result))
        }
    }
}

/// Python treats `True` and `False` as the numbers 1 and 0 in comparisons.
fn number_or_bool(value: &Value) -> Option<f64> {
    match value {
        Value::Const(Constant::Bool(value)) => Some(f64::from(u8::from(*value))),
        value => value.as_number(),
    }
}

/// Whether `expr` lowers to Python that is not wrapped in parentheses and binds more loosely than
/// arithmetic: `not x`, comparisons, and `and`/`or`.
fn binds_loosely(expr: &Expr) -> bool {
    match expr {
        Expr::Unary { operator, .. } => *operator == UnaryOp::Not,
        Expr::Binary { operator, .. } => operator.is_comparison(),
        _ => false,
    }
}

fn parenthesize(value: Value, wrap: bool) -> Value {
    if wrap {
        Value::code(format!("({value})"))
    } else {
        value
    }
}

/// Integers stay integers; anything with a fraction or an exponent is a float. A dangling exponent
/// marker, as in `1e`, reads as `1e0`.
fn number(text: &str) -> Option<Value> {
    let text = text.to_ascii_lowercase();
    if let Some(hex) = text.strip_prefix("0x") {
        return i64::from_str_radix(hex, 16).ok().map(Value::int);
    }
    let float = |text: &str| {
        text.parse::<f64>()
            .ok()
            .map(|float| Value::Const(Constant::Float(float)))
    };
    if text.ends_with('e') {
        float(&format!("{text}0"))
    } else if text.contains(['.', 'e']) {
        float(&text)
    } else {
        text.parse::<i64>().ok().map(Value::int).or_else(|| float(&text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers() {
        assert_eq!(number("42"), Some(Value::int(42)));
        assert_eq!(number("0XfF"), Some(Value::int(255)));
        assert_eq!(number(".5"), Some(Value::Const(Constant::Float(0.5))));
        assert_eq!(number("2E"), Some(Value::Const(Constant::Float(2.0))));
        assert_eq!(number("1e-2"), Some(Value::Const(Constant::Float(0.01))));
        assert_eq!(
            number("99999999999999999999"),
            Some(Value::Const(Constant::Float(1e20)))
        );
    }
}
