// Statement interpreter
// The minimal expression language both adapters feed the bridges with:
// literals, identifiers, member access, calls, assignment, dir/print.
// Full language hosting belongs to the embedding application.

use std::cell::RefCell;
use std::collections::HashMap;

use crate::bridge::{get_member, ObjectBridge};
use crate::error::{ShellError, ShellResult};
use crate::value::{Value, ValueMap};

/// Surface differences between the two script flavors.
pub struct Dialect {
    pub name: &'static str,
    pub null_keyword: &'static str,
    pub true_keyword: &'static str,
    pub false_keyword: &'static str,
    pub undefined_keyword: Option<&'static str>,
    /// Object literals may use unquoted keys (JavaScript style).
    pub bare_object_keys: bool,
    /// dir() reports sorted names (Python style).
    pub sorted_dir: bool,
}

pub const JS_DIALECT: Dialect = Dialect {
    name: "JavaScript",
    null_keyword: "null",
    true_keyword: "true",
    false_keyword: "false",
    undefined_keyword: Some("undefined"),
    bare_object_keys: true,
    sorted_dir: false,
};

pub const PY_DIALECT: Dialect = Dialect {
    name: "Python",
    null_keyword: "None",
    true_keyword: "True",
    false_keyword: "False",
    undefined_keyword: None,
    bare_object_keys: false,
    sorted_dir: true,
};

pub struct Interpreter<'a> {
    pub dialect: &'a Dialect,
    pub describe: &'a dyn Fn(&Value) -> String,
    pub output: &'a RefCell<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Str(String),
    Num(Value),
    Punct(char),
}

impl<'a> Interpreter<'a> {
    /// Evaluates one statement: `name = expr` or an expression.
    pub fn evaluate(
        &self,
        globals: &mut HashMap<String, Value>,
        text: &str,
    ) -> ShellResult<Value> {
        let mut tokens = tokenize(text)?;
        if tokens.last() == Some(&Token::Punct(';')) {
            tokens.pop();
        }
        if tokens.is_empty() {
            return Ok(Value::Undefined);
        }

        // Assignment: leading identifier, a single '=', anything after.
        if tokens.len() > 2 && tokens[1] == Token::Punct('=') {
            if let Token::Ident(name) = tokens[0].clone() {
                let mut pos = 2;
                let value = self.expression(globals, &tokens, &mut pos)?;
                self.expect_end(&tokens, pos)?;
                globals.insert(name, value.clone());
                return Ok(value);
            }
        }

        let mut pos = 0;
        let value = self.expression(globals, &tokens, &mut pos)?;
        self.expect_end(&tokens, pos)?;
        Ok(value)
    }

    fn expect_end(&self, tokens: &[Token], pos: usize) -> ShellResult<()> {
        if pos != tokens.len() {
            return Err(ShellError::Internal(format!(
                "{}: unexpected input after expression",
                self.dialect.name
            )));
        }
        Ok(())
    }

    fn expression(
        &self,
        globals: &mut HashMap<String, Value>,
        tokens: &[Token],
        pos: &mut usize,
    ) -> ShellResult<Value> {
        let primary = self.primary(globals, tokens, pos)?;
        self.postfix(globals, tokens, pos, primary)
    }

    fn primary(
        &self,
        globals: &mut HashMap<String, Value>,
        tokens: &[Token],
        pos: &mut usize,
    ) -> ShellResult<Prim> {
        let token = tokens
            .get(*pos)
            .ok_or_else(|| self.syntax("unexpected end of input"))?
            .clone();
        *pos += 1;
        match token {
            Token::Num(value) => Ok(Prim::Value(value)),
            Token::Str(text) => Ok(Prim::Value(Value::String(text))),
            Token::Ident(word) => {
                if word == self.dialect.null_keyword {
                    Ok(Prim::Value(Value::Null))
                } else if word == self.dialect.true_keyword {
                    Ok(Prim::Value(Value::Bool(true)))
                } else if word == self.dialect.false_keyword {
                    Ok(Prim::Value(Value::Bool(false)))
                } else if Some(word.as_str()) == self.dialect.undefined_keyword {
                    Ok(Prim::Value(Value::Undefined))
                } else {
                    Ok(Prim::Name(word))
                }
            }
            Token::Punct('-') => {
                // Unary minus over a numeric literal.
                match tokens.get(*pos) {
                    Some(Token::Num(Value::Integer(i))) => {
                        *pos += 1;
                        Ok(Prim::Value(Value::Integer(-i)))
                    }
                    Some(Token::Num(Value::Float(f))) => {
                        *pos += 1;
                        Ok(Prim::Value(Value::Float(-f)))
                    }
                    _ => Err(self.syntax("expected a number after '-'")),
                }
            }
            Token::Punct('(') => {
                let value = self.expression(globals, tokens, pos)?;
                self.expect(tokens, pos, ')')?;
                Ok(Prim::Value(value))
            }
            Token::Punct('[') => {
                let mut items = Vec::new();
                if tokens.get(*pos) == Some(&Token::Punct(']')) {
                    *pos += 1;
                    return Ok(Prim::Value(Value::array_from(items)));
                }
                loop {
                    items.push(self.expression(globals, tokens, pos)?);
                    match tokens.get(*pos) {
                        Some(Token::Punct(',')) => *pos += 1,
                        Some(Token::Punct(']')) => {
                            *pos += 1;
                            break;
                        }
                        _ => return Err(self.syntax("expected ',' or ']'")),
                    }
                }
                Ok(Prim::Value(Value::array_from(items)))
            }
            Token::Punct('{') => {
                let mut map = ValueMap::new();
                if tokens.get(*pos) == Some(&Token::Punct('}')) {
                    *pos += 1;
                    return Ok(Prim::Value(Value::map_from(map)));
                }
                loop {
                    let key = match tokens.get(*pos).cloned() {
                        Some(Token::Str(key)) => key,
                        Some(Token::Ident(key)) if self.dialect.bare_object_keys => key,
                        _ => return Err(self.syntax("expected an object key")),
                    };
                    *pos += 1;
                    self.expect(tokens, pos, ':')?;
                    let value = self.expression(globals, tokens, pos)?;
                    map.insert(key, value);
                    match tokens.get(*pos) {
                        Some(Token::Punct(',')) => *pos += 1,
                        Some(Token::Punct('}')) => {
                            *pos += 1;
                            break;
                        }
                        _ => return Err(self.syntax("expected ',' or '}'")),
                    }
                }
                Ok(Prim::Value(Value::map_from(map)))
            }
            Token::Punct(c) => Err(self.syntax(&format!("unexpected '{}'", c))),
        }
    }

    fn postfix(
        &self,
        globals: &mut HashMap<String, Value>,
        tokens: &[Token],
        pos: &mut usize,
        primary: Prim,
    ) -> ShellResult<Value> {
        let mut current = primary;
        loop {
            match tokens.get(*pos) {
                Some(Token::Punct('.')) => {
                    *pos += 1;
                    let member = match tokens.get(*pos).cloned() {
                        Some(Token::Ident(name)) => name,
                        _ => return Err(self.syntax("expected a member name after '.'")),
                    };
                    *pos += 1;
                    let target = self.resolve(globals, current)?;
                    let object = target.as_object().map_err(|_| {
                        ShellError::TypeMismatch(format!(
                            "{}: {} has no members",
                            self.dialect.name,
                            target.type_name()
                        ))
                    })?;
                    current = Prim::Value(get_member(&object, &member)?);
                }
                Some(Token::Punct('(')) => {
                    *pos += 1;
                    let mut args = Vec::new();
                    if tokens.get(*pos) == Some(&Token::Punct(')')) {
                        *pos += 1;
                    } else {
                        loop {
                            args.push(self.expression(globals, tokens, pos)?);
                            match tokens.get(*pos) {
                                Some(Token::Punct(',')) => *pos += 1,
                                Some(Token::Punct(')')) => {
                                    *pos += 1;
                                    break;
                                }
                                _ => return Err(self.syntax("expected ',' or ')'")),
                            }
                        }
                    }
                    current = Prim::Value(self.invoke(globals, current, args)?);
                }
                Some(Token::Punct('[')) => {
                    *pos += 1;
                    let index = self.expression(globals, tokens, pos)?;
                    self.expect(tokens, pos, ']')?;
                    let target = self.resolve(globals, current)?;
                    current = Prim::Value(index_value(&target, &index)?);
                }
                _ => break,
            }
        }
        self.resolve(globals, current)
    }

    fn invoke(
        &self,
        globals: &mut HashMap<String, Value>,
        callee: Prim,
        args: Vec<Value>,
    ) -> ShellResult<Value> {
        // Builtins are plain names, never shadowed by globals.
        if let Prim::Name(name) = &callee {
            match name.as_str() {
                "dir" => return self.builtin_dir(&args),
                "print" => {
                    let parts: Vec<String> =
                        args.iter().map(|value| (self.describe)(value)).collect();
                    self.output.borrow_mut().push(parts.join(" "));
                    return Ok(Value::Undefined);
                }
                _ => {}
            }
        }
        let target = self.resolve(globals, callee)?;
        let function = target.as_function().map_err(|_| {
            ShellError::TypeMismatch(format!(
                "{}: {} is not callable",
                self.dialect.name,
                target.type_name()
            ))
        })?;
        function.invoke(args)
    }

    fn builtin_dir(&self, args: &[Value]) -> ShellResult<Value> {
        if args.len() != 1 {
            return Err(ShellError::argument_count("dir", 1, args.len()));
        }
        let mut names: Vec<String> = match &args[0] {
            Value::Object(object) => object.members().into_iter().map(|m| m.name).collect(),
            Value::Map(map) => map.borrow().keys().map(|k| k.to_string()).collect(),
            other => {
                return Err(ShellError::argument(
                    "dir",
                    format!("Argument #1 is expected to be an object, got {}", other.type_name()),
                ))
            }
        };
        if self.dialect.sorted_dir {
            names.sort();
        }
        Ok(Value::array_from(
            names.into_iter().map(Value::String).collect(),
        ))
    }

    fn resolve(&self, globals: &HashMap<String, Value>, prim: Prim) -> ShellResult<Value> {
        match prim {
            Prim::Value(value) => Ok(value),
            Prim::Name(name) => globals.get(&name).cloned().ok_or_else(|| {
                ShellError::Internal(format!(
                    "{}: The name '{}' is not defined",
                    self.dialect.name, name
                ))
            }),
        }
    }

    fn expect(&self, tokens: &[Token], pos: &mut usize, punct: char) -> ShellResult<()> {
        if tokens.get(*pos) == Some(&Token::Punct(punct)) {
            *pos += 1;
            Ok(())
        } else {
            Err(self.syntax(&format!("expected '{}'", punct)))
        }
    }

    fn syntax(&self, message: &str) -> ShellError {
        ShellError::Internal(format!("{}: syntax error, {}", self.dialect.name, message))
    }
}

enum Prim {
    Value(Value),
    Name(String),
}

fn index_value(target: &Value, index: &Value) -> ShellResult<Value> {
    match (target, index) {
        (Value::Array(items), Value::Integer(i)) => {
            let items = items.borrow();
            let i = usize::try_from(*i)
                .map_err(|_| ShellError::ArgumentError("Index out of range".to_string()))?;
            items
                .get(i)
                .cloned()
                .ok_or_else(|| ShellError::ArgumentError("Index out of range".to_string()))
        }
        (Value::Map(map), Value::String(key)) => {
            Ok(map.borrow().get(key).cloned().unwrap_or(Value::Undefined))
        }
        _ => Err(ShellError::TypeMismatch(format!(
            "Cannot index {} with {}",
            target.type_name(),
            index.type_name()
        ))),
    }
}

fn tokenize(text: &str) -> ShellResult<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = text.chars().peekable();
    while let Some(&c) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let mut word = String::new();
                while let Some(&n) = chars.peek() {
                    if n.is_ascii_alphanumeric() || n == '_' {
                        word.push(n);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Token::Ident(word));
            }
            c if c.is_ascii_digit() => {
                let mut number = String::new();
                let mut is_float = false;
                while let Some(&n) = chars.peek() {
                    if n.is_ascii_digit() {
                        number.push(n);
                        chars.next();
                    } else if n == '.' || n == 'e' || n == 'E' {
                        is_float = true;
                        number.push(n);
                        chars.next();
                        if (n == 'e' || n == 'E') && matches!(chars.peek(), Some('+') | Some('-'))
                        {
                            number.push(chars.next().unwrap_or('+'));
                        }
                    } else {
                        break;
                    }
                }
                let value = if is_float {
                    Value::Float(number.parse().map_err(|_| {
                        ShellError::Internal(format!("Invalid number literal '{}'", number))
                    })?)
                } else if let Ok(i) = number.parse::<i64>() {
                    Value::Integer(i)
                } else if let Ok(u) = number.parse::<u64>() {
                    Value::UInteger(u)
                } else {
                    return Err(ShellError::Internal(format!(
                        "Invalid number literal '{}'",
                        number
                    )));
                };
                tokens.push(Token::Num(value));
            }
            '\'' | '"' => {
                let quote = c;
                chars.next();
                let mut out = String::new();
                loop {
                    match chars.next() {
                        None => {
                            return Err(ShellError::Internal(
                                "Unterminated string literal".to_string(),
                            ))
                        }
                        Some(c) if c == quote => break,
                        Some('\\') => match chars.next() {
                            Some('n') => out.push('\n'),
                            Some('t') => out.push('\t'),
                            Some('r') => out.push('\r'),
                            Some('\\') => out.push('\\'),
                            Some(c) => out.push(c),
                            None => {
                                return Err(ShellError::Internal(
                                    "Unterminated string literal".to_string(),
                                ))
                            }
                        },
                        Some(c) => out.push(c),
                    }
                }
                tokens.push(Token::Str(out));
            }
            '.' | ',' | '(' | ')' | '[' | ']' | '{' | '}' | ':' | '=' | ';' | '-' => {
                chars.next();
                tokens.push(Token::Punct(c));
            }
            other => {
                return Err(ShellError::Internal(format!(
                    "Unexpected character '{}'",
                    other
                )))
            }
        }
    }
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(dialect: &Dialect, globals: &mut HashMap<String, Value>, text: &str) -> Value {
        let output = RefCell::new(Vec::new());
        let describe = |v: &Value| v.descr();
        let interp = Interpreter {
            dialect,
            describe: &describe,
            output: &output,
        };
        interp.evaluate(globals, text).unwrap()
    }

    #[test]
    fn test_literals() {
        let mut globals = HashMap::new();
        assert_eq!(run(&JS_DIALECT, &mut globals, "42"), Value::Integer(42));
        assert_eq!(run(&JS_DIALECT, &mut globals, "-7"), Value::Integer(-7));
        assert_eq!(run(&JS_DIALECT, &mut globals, "1.5"), Value::Float(1.5));
        assert_eq!(run(&JS_DIALECT, &mut globals, "'text'"), Value::from("text"));
        assert_eq!(run(&JS_DIALECT, &mut globals, "null"), Value::Null);
        assert_eq!(run(&JS_DIALECT, &mut globals, "undefined"), Value::Undefined);
        assert_eq!(run(&PY_DIALECT, &mut globals, "None"), Value::Null);
        assert_eq!(run(&PY_DIALECT, &mut globals, "True"), Value::Bool(true));
    }

    #[test]
    fn test_containers_and_assignment() {
        let mut globals = HashMap::new();
        let value = run(&JS_DIALECT, &mut globals, "data = [1, 'two', {a: 3}]");
        assert_eq!(value.descr(), "[1,\"two\",{\"a\": 3}]");
        assert!(globals.contains_key("data"));
        assert_eq!(
            run(&JS_DIALECT, &mut globals, "data[2]['a']"),
            Value::Integer(3)
        );
    }

    #[test]
    fn test_python_requires_quoted_keys() {
        let mut globals = HashMap::new();
        let value = run(&PY_DIALECT, &mut globals, "{'host': 'h', 'port': 33060}");
        assert_eq!(value.descr(), "{\"host\": \"h\", \"port\": 33060}");

        let output = RefCell::new(Vec::new());
        let describe = |v: &Value| v.descr();
        let interp = Interpreter {
            dialect: &PY_DIALECT,
            describe: &describe,
            output: &output,
        };
        assert!(interp
            .evaluate(&mut globals, "{host: 'h'}")
            .is_err());
    }

    #[test]
    fn test_undefined_name() {
        let mut globals = HashMap::new();
        let output = RefCell::new(Vec::new());
        let describe = |v: &Value| v.descr();
        let interp = Interpreter {
            dialect: &JS_DIALECT,
            describe: &describe,
            output: &output,
        };
        let err = interp.evaluate(&mut globals, "missing").unwrap_err();
        assert!(err.to_string().contains("'missing' is not defined"));
    }

    #[test]
    fn test_print_collects_output() {
        let mut globals = HashMap::new();
        let output = RefCell::new(Vec::new());
        let describe = |v: &Value| v.descr();
        let interp = Interpreter {
            dialect: &JS_DIALECT,
            describe: &describe,
            output: &output,
        };
        interp.evaluate(&mut globals, "print('a', 1)").unwrap();
        assert_eq!(output.borrow().as_slice(), &["\"a\" 1".to_string()]);
    }
}
