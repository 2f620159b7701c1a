//! `ifdef`, `ifndef`, `ifeval` and `endif` directives.
use crate::{attributes::AttributeTable, model::ConditionalKind};

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Condition {
    /// `a,b` is satisfied when any name is set, `a+b` when all are.
    Attributes { names: Vec<String>, all: bool },
    Eval(Ifeval),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Ifeval {
    left: String,
    operator: Operator,
    right: String,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Operator {
    Equal,
    NotEqual,
    LessThan,
    GreaterThan,
    LessThanOrEqual,
    GreaterThanOrEqual,
}

#[derive(Debug, Clone, PartialEq, PartialOrd)]
enum EvalValue {
    String(String),
    Number(f64),
    Boolean(bool),
}

/// A parsed opening directive.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Conditional {
    pub(crate) kind: ConditionalKind,
    /// The raw text between `::` and `[`, or the expression for `ifeval`.
    pub(crate) target: String,
    pub(crate) condition: Condition,
    /// Content of the single-line form `ifdef::name[content]`.
    pub(crate) content: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Endif {
    pub(crate) target: String,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Directive {
    Open(Conditional),
    Endif(Endif),
}

peg::parser! {
    grammar conditional_parser() for str {
        pub(crate) rule directive() -> Directive
            = c:conditional() { Directive::Open(c) }
            / e:endif() { Directive::Endif(e) }

        rule endif() -> Endif
            = "endif::" target:$(name_match()?) "[]" ![_] {
                Endif { target: target.to_string() }
            }

        rule conditional() -> Conditional
            = "ifdef::" target:$(attributes()) "[" content:content()? "]" ![_] {?
                let (names, all) = attributes_of(target).ok_or("attribute names")?;
                Ok(Conditional {
                    kind: ConditionalKind::Ifdef,
                    target: target.to_string(),
                    condition: Condition::Attributes { names, all },
                    content,
                })
            }
            / "ifndef::" target:$(attributes()) "[" content:content()? "]" ![_] {?
                let (names, all) = attributes_of(target).ok_or("attribute names")?;
                Ok(Conditional {
                    kind: ConditionalKind::Ifndef,
                    target: target.to_string(),
                    condition: Condition::Attributes { names, all },
                    content,
                })
            }
            / "ifeval::[" expression:$(eval_value() operator() eval_value()) "]" ![_] {?
                let ifeval = conditional_parser::ifeval_expression(expression).map_err(|_| "expression")?;
                Ok(Conditional {
                    kind: ConditionalKind::Ifeval,
                    target: expression.trim().to_string(),
                    condition: Condition::Eval(ifeval),
                    content: None,
                })
            }

        pub(crate) rule ifeval_expression() -> Ifeval
            = left:eval_value() operator:operator() right:eval_value() {
                Ifeval { left, operator, right }
            }

        rule attributes()
            = name_match() ++ ("," / "+")

        rule eval_value() -> String
            = n:$((!operator() ![']'] [_])+) { n.trim().to_string() }

        rule operator() -> Operator
            = "==" { Operator::Equal }
            / "!=" { Operator::NotEqual }
            / "<=" { Operator::LessThanOrEqual }
            / ">=" { Operator::GreaterThanOrEqual }
            / "<" { Operator::LessThan }
            / ">" { Operator::GreaterThan }

        rule name_match() = (!['[' | ',' | '+' | ' '] [_])+

        rule content() -> String
            = c:$((!("]" ![_]) [_])+) { c.to_string() }
    }
}

fn attributes_of(target: &str) -> Option<(Vec<String>, bool)> {
    let all = target.contains('+');
    if all && target.contains(',') {
        return None;
    }
    let separator = if all { '+' } else { ',' };
    let names = target
        .split(separator)
        .map(|name| name.trim().to_lowercase())
        .collect();
    Some((names, all))
}

/// Whether `line` has the shape of a conditional directive, escaped or not.
pub(crate) fn is_directive_line(line: &str) -> bool {
    let line = line.strip_prefix('\\').unwrap_or(line);
    ["ifdef::", "ifndef::", "ifeval::", "endif::"]
        .iter()
        .any(|prefix| line.starts_with(prefix))
        && line.ends_with(']')
}

pub(crate) fn parse_directive(line: &str) -> Option<Directive> {
    conditional_parser::directive(line)
        .map_err(|error| tracing::debug!(%error, line, "not a valid conditional directive"))
        .ok()
}

impl Conditional {
    /// Evaluates the condition against the current table. `Err` carries a message for
    /// an `ifeval` that compares values of different types.
    pub(crate) fn evaluate(&self, attributes: &mut AttributeTable) -> Result<bool, String> {
        match &self.condition {
            Condition::Attributes { names, all } => {
                let result = if *all {
                    names.iter().all(|name| attributes.is_set(name))
                } else {
                    names.iter().any(|name| attributes.is_set(name))
                };
                Ok(match self.kind {
                    ConditionalKind::Ifndef => !result,
                    ConditionalKind::Ifdef | ConditionalKind::Ifeval | ConditionalKind::Endif => {
                        result
                    }
                })
            }
            Condition::Eval(ifeval) => ifeval.evaluate(attributes),
        }
    }
}

impl Endif {
    /// An `endif` with a target only closes the conditional opened with the same
    /// target.
    pub(crate) fn closes(&self, conditional: &Conditional) -> bool {
        self.target.is_empty() || self.target == conditional.target
    }
}

impl Ifeval {
    fn evaluate(&self, attributes: &mut AttributeTable) -> Result<bool, String> {
        let left = EvalValue::convert(&self.left, attributes);
        let right = EvalValue::convert(&self.right, attributes);
        match (&left, &right) {
            (EvalValue::Number(_), EvalValue::Number(_))
            | (EvalValue::Boolean(_), EvalValue::Boolean(_))
            | (EvalValue::String(_), EvalValue::String(_)) => {}
            _ => {
                return Err(format!(
                    "cannot compare {left:?} with {right:?} in ifeval directive"
                ));
            }
        }
        Ok(match self.operator {
            Operator::Equal => left == right,
            Operator::NotEqual => left != right,
            Operator::LessThan => left < right,
            Operator::GreaterThan => left > right,
            Operator::LessThanOrEqual => left <= right,
            Operator::GreaterThanOrEqual => left >= right,
        })
    }
}

impl EvalValue {
    fn convert(raw: &str, attributes: &mut AttributeTable) -> Self {
        let substituted = attributes.substitute(raw).text.unwrap_or_default();
        let s = substituted.trim();
        s.parse::<bool>()
            .map(EvalValue::Boolean)
            .or_else(|_| s.parse::<f64>().map(EvalValue::Number))
            .or_else(|_| evalexpr::eval_float(s).map(EvalValue::Number))
            .or_else(|_| {
                #[allow(clippy::cast_precision_loss)]
                evalexpr::eval_int(s)
                    .map(|v| v as f64)
                    .map(EvalValue::Number)
            })
            .unwrap_or_else(|_| EvalValue::String(strip_quotes(s).to_string()))
    }
}

fn strip_quotes(s: &str) -> &str {
    for quote in ['\'', '"'] {
        if let Some(inner) = s.strip_prefix(quote).and_then(|s| s.strip_suffix(quote)) {
            return inner;
        }
    }
    s
}
