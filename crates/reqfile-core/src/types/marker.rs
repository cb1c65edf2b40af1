//! Environment markers (`python_version < '3.0'`, `sys_platform == "win32" and extra == "docs"`).
//!
//! A [`Marker`] keeps the text exactly as written next to the parsed
//! [`MarkerTree`], so manifests can be echoed back unchanged while still being
//! evaluated against a [`MarkerEnvironment`].

use super::environment::{MarkerEnvironment, MarkerVariable};
use super::name::normalize;
use super::specifier::VersionSpecifier;
use super::version::Version;
use crate::error::{ReqError, ReqResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::trace;

/// Parsed marker together with its source text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Marker {
    text: String,
    tree: MarkerTree,
}

/// Boolean expression tree of a marker
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkerTree {
    Expression {
        lhs: MarkerValue,
        op: MarkerOperator,
        rhs: MarkerValue,
    },
    And(Vec<MarkerTree>),
    Or(Vec<MarkerTree>),
}

/// Operand of a marker comparison
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkerValue {
    Variable(MarkerVariable),
    Literal(String),
}

/// Marker comparison operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerOperator {
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    Compatible,
    ArbitraryEqual,
    In,
    NotIn,
}

impl Marker {
    pub fn parse(input: &str) -> ReqResult<Self> {
        let text = input.trim();
        Ok(Self {
            text: text.to_string(),
            tree: MarkerTree::parse(text)?,
        })
    }

    /// The marker exactly as written (trimmed)
    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn tree(&self) -> &MarkerTree {
        &self.tree
    }

    /// Evaluate against `env` with the given requested extras
    pub fn evaluate(&self, env: &MarkerEnvironment, extras: &[String]) -> ReqResult<bool> {
        self.tree.evaluate(env, extras).map_err(|e| match e {
            ReqError::MarkerEvaluation { reason, .. } => ReqError::MarkerEvaluation {
                marker: self.text.clone(),
                reason,
            },
            other => other,
        })
    }
}

impl MarkerTree {
    pub fn parse(input: &str) -> ReqResult<Self> {
        let tokens = tokenize(input)?;
        let mut parser = MarkerParser {
            input,
            tokens,
            pos: 0,
        };
        let tree = parser.parse_or()?;
        if parser.pos != parser.tokens.len() {
            return Err(parser.error(format!(
                "unexpected '{}'",
                parser.tokens[parser.pos]
            )));
        }
        Ok(tree)
    }

    pub fn evaluate(&self, env: &MarkerEnvironment, extras: &[String]) -> ReqResult<bool> {
        match self {
            MarkerTree::And(children) => {
                for child in children {
                    if !child.evaluate(env, extras)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            },
            MarkerTree::Or(children) => {
                for child in children {
                    if child.evaluate(env, extras)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            },
            MarkerTree::Expression { lhs, op, rhs } => evaluate_expression(lhs, *op, rhs, env, extras),
        }
    }

    /// Every variable referenced by the tree
    pub fn variables(&self) -> Vec<MarkerVariable> {
        let mut vars = Vec::new();
        self.collect_variables(&mut vars);
        vars
    }

    fn collect_variables(&self, vars: &mut Vec<MarkerVariable>) {
        match self {
            MarkerTree::And(children) | MarkerTree::Or(children) => {
                for child in children {
                    child.collect_variables(vars);
                }
            },
            MarkerTree::Expression { lhs, rhs, .. } => {
                for value in [lhs, rhs] {
                    if let MarkerValue::Variable(var) = value {
                        if !vars.contains(var) {
                            vars.push(*var);
                        }
                    }
                }
            },
        }
    }
}

fn evaluate_expression(
    lhs: &MarkerValue,
    op: MarkerOperator,
    rhs: &MarkerValue,
    env: &MarkerEnvironment,
    extras: &[String],
) -> ReqResult<bool> {
    // extra comparisons are decided against every requested extra
    match (lhs, rhs) {
        (MarkerValue::Variable(MarkerVariable::Extra), MarkerValue::Literal(name))
        | (MarkerValue::Literal(name), MarkerValue::Variable(MarkerVariable::Extra)) => {
            let wanted = normalize(name);
            let requested = extras.iter().any(|extra| normalize(extra) == wanted);
            return match op {
                MarkerOperator::Equal => Ok(requested),
                MarkerOperator::NotEqual => Ok(!requested),
                _ => Err(evaluation_error(format!(
                    "'extra' only supports == and !=, not '{}'",
                    op
                ))),
            };
        },
        _ => {},
    }

    let left = resolve_value(lhs, env)?;
    let right = resolve_value(rhs, env)?;

    if let Some(result) = compare_versions(left, op, right) {
        return Ok(result);
    }

    trace!(left, right, op = %op, "comparing as strings");
    match op {
        MarkerOperator::Equal => Ok(left == right),
        MarkerOperator::NotEqual => Ok(left != right),
        MarkerOperator::Less => Ok(left < right),
        MarkerOperator::LessEqual => Ok(left <= right),
        MarkerOperator::Greater => Ok(left > right),
        MarkerOperator::GreaterEqual => Ok(left >= right),
        MarkerOperator::ArbitraryEqual => Ok(left.eq_ignore_ascii_case(right)),
        MarkerOperator::Compatible => Err(evaluation_error(format!(
            "'~=' needs versions on both sides, got '{}' and '{}'",
            left, right
        ))),
        MarkerOperator::In => Ok(right.contains(left)),
        MarkerOperator::NotIn => Ok(!right.contains(left)),
    }
}

/// PEP 440 comparison when `right` forms a valid specifier and `left` a valid
/// version; `in`/`not in` never form a specifier
fn compare_versions(left: &str, op: MarkerOperator, right: &str) -> Option<bool> {
    let spec = VersionSpecifier::parse(&format!("{}{}", op, right)).ok()?;
    let version = Version::parse(left).ok()?;
    Some(spec.contains(&version))
}

fn resolve_value<'a>(value: &'a MarkerValue, env: &'a MarkerEnvironment) -> ReqResult<&'a str> {
    match value {
        MarkerValue::Literal(s) => Ok(s),
        MarkerValue::Variable(var) => env
            .get(*var)
            .ok_or_else(|| evaluation_error(format!("'{}' has no value here", var))),
    }
}

fn evaluation_error(reason: String) -> ReqError {
    ReqError::MarkerEvaluation {
        marker: String::new(),
        reason,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    LParen,
    RParen,
    Str(String),
    Ident(String),
    Op(MarkerOperator),
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::LParen => f.write_str("("),
            Token::RParen => f.write_str(")"),
            Token::Str(s) => write!(f, "\"{}\"", s),
            Token::Ident(s) => f.write_str(s),
            Token::Op(op) => write!(f, "{}", op),
        }
    }
}

fn tokenize(input: &str) -> ReqResult<Vec<Token>> {
    let invalid = |reason: String| ReqError::InvalidMarker {
        input: input.to_string(),
        reason,
    };

    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            c if c.is_whitespace() => i += 1,
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            },
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            },
            '\'' | '"' => {
                let end = chars[i + 1..]
                    .iter()
                    .position(|&ch| ch == c)
                    .ok_or_else(|| invalid("unterminated string".to_string()))?;
                tokens.push(Token::Str(chars[i + 1..i + 1 + end].iter().collect()));
                i += end + 2;
            },
            '=' | '!' | '<' | '>' | '~' => {
                let rest: String = chars[i..chars.len().min(i + 3)].iter().collect();
                let (op, len) = if rest.starts_with("===") {
                    (MarkerOperator::ArbitraryEqual, 3)
                } else if rest.starts_with("==") {
                    (MarkerOperator::Equal, 2)
                } else if rest.starts_with("!=") {
                    (MarkerOperator::NotEqual, 2)
                } else if rest.starts_with("<=") {
                    (MarkerOperator::LessEqual, 2)
                } else if rest.starts_with(">=") {
                    (MarkerOperator::GreaterEqual, 2)
                } else if rest.starts_with("~=") {
                    (MarkerOperator::Compatible, 2)
                } else if c == '<' {
                    (MarkerOperator::Less, 1)
                } else if c == '>' {
                    (MarkerOperator::Greater, 1)
                } else {
                    return Err(invalid(format!("unknown operator starting at '{}'", rest)));
                };
                tokens.push(Token::Op(op));
                i += len;
            },
            c if c.is_ascii_alphanumeric() || c == '_' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_alphanumeric() || matches!(chars[i], '_' | '.')) {
                    i += 1;
                }
                tokens.push(Token::Ident(chars[start..i].iter().collect()));
            },
            other => return Err(invalid(format!("unexpected character '{}'", other))),
        }
    }

    Ok(tokens)
}

struct MarkerParser<'a> {
    input: &'a str,
    tokens: Vec<Token>,
    pos: usize,
}

impl<'a> MarkerParser<'a> {
    fn error(&self, reason: String) -> ReqError {
        ReqError::InvalidMarker {
            input: self.input.to_string(),
            reason,
        }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        if matches!(self.peek(), Some(Token::Ident(word)) if word == keyword) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn parse_or(&mut self) -> ReqResult<MarkerTree> {
        let mut children = vec![self.parse_and()?];
        while self.eat_keyword("or") {
            children.push(self.parse_and()?);
        }
        Ok(if children.len() == 1 {
            children.remove(0)
        } else {
            MarkerTree::Or(children)
        })
    }

    fn parse_and(&mut self) -> ReqResult<MarkerTree> {
        let mut children = vec![self.parse_atom()?];
        while self.eat_keyword("and") {
            children.push(self.parse_atom()?);
        }
        Ok(if children.len() == 1 {
            children.remove(0)
        } else {
            MarkerTree::And(children)
        })
    }

    fn parse_atom(&mut self) -> ReqResult<MarkerTree> {
        if self.peek() == Some(&Token::LParen) {
            self.pos += 1;
            let inner = self.parse_or()?;
            return match self.next() {
                Some(Token::RParen) => Ok(inner),
                _ => Err(self.error("missing closing parenthesis".to_string())),
            };
        }

        let lhs = self.parse_value()?;
        let op = self.parse_operator()?;
        let rhs = self.parse_value()?;

        if matches!((&lhs, &rhs), (MarkerValue::Literal(_), MarkerValue::Literal(_))) {
            return Err(self.error("a comparison needs at least one marker variable".to_string()));
        }

        Ok(MarkerTree::Expression { lhs, op, rhs })
    }

    fn parse_value(&mut self) -> ReqResult<MarkerValue> {
        match self.next() {
            Some(Token::Str(s)) => Ok(MarkerValue::Literal(s)),
            Some(Token::Ident(name)) => {
                let var = name
                    .parse::<MarkerVariable>()
                    .map_err(|_| self.error(format!("unknown marker variable '{}'", name)))?;
                Ok(MarkerValue::Variable(var))
            },
            Some(other) => Err(self.error(format!("expected a variable or string, found '{}'", other))),
            None => Err(self.error("unexpected end of marker".to_string())),
        }
    }

    fn parse_operator(&mut self) -> ReqResult<MarkerOperator> {
        match self.next() {
            Some(Token::Op(op)) => Ok(op),
            Some(Token::Ident(word)) if word == "in" => Ok(MarkerOperator::In),
            Some(Token::Ident(word)) if word == "not" => {
                if self.eat_keyword("in") {
                    Ok(MarkerOperator::NotIn)
                } else {
                    Err(self.error("expected 'in' after 'not'".to_string()))
                }
            },
            Some(other) => Err(self.error(format!("expected a comparison operator, found '{}'", other))),
            None => Err(self.error("unexpected end of marker".to_string())),
        }
    }
}

impl fmt::Display for MarkerOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MarkerOperator::Equal => "==",
            MarkerOperator::NotEqual => "!=",
            MarkerOperator::Less => "<",
            MarkerOperator::LessEqual => "<=",
            MarkerOperator::Greater => ">",
            MarkerOperator::GreaterEqual => ">=",
            MarkerOperator::Compatible => "~=",
            MarkerOperator::ArbitraryEqual => "===",
            MarkerOperator::In => "in",
            MarkerOperator::NotIn => "not in",
        })
    }
}

impl fmt::Display for MarkerValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MarkerValue::Variable(var) => write!(f, "{}", var),
            MarkerValue::Literal(s) if s.contains('"') => write!(f, "'{}'", s),
            MarkerValue::Literal(s) => write!(f, "\"{}\"", s),
        }
    }
}

impl fmt::Display for MarkerTree {
    /// Canonical form: double quotes, single spaces, `or` groups parenthesized inside `and`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MarkerTree::Expression { lhs, op, rhs } => write!(f, "{} {} {}", lhs, op, rhs),
            MarkerTree::And(children) => {
                let parts: Vec<String> = children
                    .iter()
                    .map(|child| match child {
                        MarkerTree::Or(_) => format!("({})", child),
                        _ => child.to_string(),
                    })
                    .collect();
                f.write_str(&parts.join(" and "))
            },
            MarkerTree::Or(children) => {
                let parts: Vec<String> = children.iter().map(ToString::to_string).collect();
                f.write_str(&parts.join(" or "))
            },
        }
    }
}

impl fmt::Display for Marker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl FromStr for Marker {
    type Err = ReqError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Marker::parse(s)
    }
}

impl TryFrom<String> for Marker {
    type Error = ReqError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Marker::parse(&value)
    }
}

impl From<Marker> for String {
    fn from(marker: Marker) -> Self {
        marker.text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(marker: &str, env: &MarkerEnvironment) -> bool {
        Marker::parse(marker).unwrap().evaluate(env, &[]).unwrap()
    }

    fn python(version: &str) -> MarkerEnvironment {
        let mut env = MarkerEnvironment::default();
        env.set_python_version(version).unwrap();
        env
    }

    #[test]
    fn test_legacy_python_gate() {
        let marker = "python_version < '3.0'";
        assert!(eval(marker, &python("2.7")));
        assert!(!eval(marker, &python("3.12")));
    }

    #[test]
    fn test_keeps_source_text() {
        let marker = Marker::parse("  python_version < '3.0' ").unwrap();
        assert_eq!(marker.as_str(), "python_version < '3.0'");
        assert_eq!(marker.tree().to_string(), "python_version < \"3.0\"");
    }

    #[test]
    fn test_version_comparison_is_numeric() {
        // "3.10" < "3.9" as strings, but not as versions
        assert!(eval("python_version >= '3.9'", &python("3.10")));
        assert!(!eval("python_full_version < '3.10.1'", &python("3.10.2")));
    }

    #[test]
    fn test_and_or_precedence() {
        let env = MarkerEnvironment::default().with_platform("win32");
        assert!(eval("sys_platform == 'linux' or sys_platform == 'win32' and os_name == 'nt'", &env));
        assert!(!eval("(sys_platform == 'linux' or sys_platform == 'win32') and os_name == 'posix'", &env));

        let tree = MarkerTree::parse("a_var == '1' or b == '2'");
        assert!(tree.is_err());
    }

    #[test]
    fn test_in_and_not_in() {
        let env = MarkerEnvironment::default();
        assert!(eval("'linux' in sys_platform", &env));
        assert!(eval("platform_machine not in 'arm64 aarch64'", &env));
        assert!(!eval("platform_machine in 'arm64 aarch64'", &env));
    }

    #[test]
    fn test_reversed_operands() {
        assert!(eval("'3.0' > python_version", &python("2.7")));
    }

    #[test]
    fn test_extra_uses_requested_extras() {
        let marker = Marker::parse("extra == 'Fuzzy_Match'").unwrap();
        let env = MarkerEnvironment::default();

        assert!(!marker.evaluate(&env, &[]).unwrap());
        assert!(marker.evaluate(&env, &["fuzzy-match".to_string()]).unwrap());

        let negated = Marker::parse("extra != 'docs'").unwrap();
        assert!(negated.evaluate(&env, &[]).unwrap());
    }

    #[test]
    fn test_string_fallback() {
        let env = MarkerEnvironment::default();
        assert!(eval("platform_python_implementation == 'CPython'", &env));
        assert!(eval("implementation_name != 'pypy'", &env));

        let err = Marker::parse("os_name ~= 'posix'")
            .unwrap()
            .evaluate(&env, &[])
            .unwrap_err();
        assert!(matches!(err, ReqError::MarkerEvaluation { ref marker, .. } if marker == "os_name ~= 'posix'"));
    }

    #[test]
    fn test_parse_errors() {
        assert!(Marker::parse("").is_err());
        assert!(Marker::parse("python_version").is_err());
        assert!(Marker::parse("python_version < ").is_err());
        assert!(Marker::parse("python_version < '3.0").is_err());
        assert!(Marker::parse("(python_version < '3.0'").is_err());
        assert!(Marker::parse("'a' == 'b'").is_err());
        assert!(Marker::parse("python_version <> '3.0'").is_err());
        assert!(Marker::parse("os_name not 'nt'").is_err());
    }

    #[test]
    fn test_variables() {
        let tree = MarkerTree::parse("python_version < '3' and (os_name == 'nt' or python_version > '2')").unwrap();
        assert_eq!(
            tree.variables(),
            vec![MarkerVariable::PythonVersion, MarkerVariable::OsName]
        );
    }
}
