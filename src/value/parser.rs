// Canonical text parser
// Reads the descr form back into a Value: JSON syntax plus `undefined`.

use std::str::Chars;

use crate::error::{ShellError, ShellResult};
use crate::value::{Value, ValueMap};

/// Parses a canonical value description. The whole input must be consumed.
pub fn parse(text: &str) -> ShellResult<Value> {
    let mut parser = Parser::new(text);
    let value = parser.parse_value()?;
    parser.skip_spaces();
    if parser.peek().is_some() {
        return Err(parser.error("unexpected trailing characters"));
    }
    Ok(value)
}

struct Parser<'a> {
    chars: Chars<'a>,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            chars: text.chars(),
            pos: 0,
        }
    }

    fn error(&self, message: &str) -> ShellError {
        ShellError::TypeMismatch(format!(
            "Error parsing value at offset {}: {}",
            self.pos, message
        ))
    }

    fn peek(&self) -> Option<char> {
        self.chars.clone().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.chars.next()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn skip_spaces(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_ascii_whitespace()) {
            self.bump();
        }
    }

    fn expect(&mut self, expected: char) -> ShellResult<()> {
        match self.bump() {
            Some(c) if c == expected => Ok(()),
            Some(c) => Err(self.error(&format!("expected '{}', found '{}'", expected, c))),
            None => Err(self.error(&format!("expected '{}', found end of input", expected))),
        }
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        let mut probe = self.chars.clone();
        for expected in keyword.chars() {
            if probe.next() != Some(expected) {
                return false;
            }
        }
        for _ in 0..keyword.len() {
            self.bump();
        }
        true
    }

    fn parse_value(&mut self) -> ShellResult<Value> {
        self.skip_spaces();
        match self.peek() {
            Some('{') => self.parse_map(),
            Some('[') => self.parse_array(),
            Some('"') => Ok(Value::String(self.parse_string()?)),
            Some('t') | Some('f') => self.parse_bool(),
            Some('n') if self.eat_keyword("null") => Ok(Value::Null),
            Some('u') if self.eat_keyword("undefined") => Ok(Value::Undefined),
            Some(c) if c == '-' || c.is_ascii_digit() => self.parse_number(),
            Some(c) => Err(self.error(&format!("unexpected character '{}'", c))),
            None => Err(self.error("unexpected end of input")),
        }
    }

    fn parse_bool(&mut self) -> ShellResult<Value> {
        if self.eat_keyword("true") {
            Ok(Value::Bool(true))
        } else if self.eat_keyword("false") {
            Ok(Value::Bool(false))
        } else {
            Err(self.error("invalid literal"))
        }
    }

    fn parse_map(&mut self) -> ShellResult<Value> {
        self.expect('{')?;
        let mut map = ValueMap::new();
        self.skip_spaces();
        if self.peek() == Some('}') {
            self.bump();
            return Ok(Value::map_from(map));
        }
        loop {
            self.skip_spaces();
            let key = self.parse_string()?;
            self.skip_spaces();
            self.expect(':')?;
            let value = self.parse_value()?;
            map.insert(key, value);
            self.skip_spaces();
            match self.bump() {
                Some(',') => continue,
                Some('}') => break,
                _ => return Err(self.error("expected ',' or '}' in map")),
            }
        }
        Ok(Value::map_from(map))
    }

    fn parse_array(&mut self) -> ShellResult<Value> {
        self.expect('[')?;
        let mut items = Vec::new();
        self.skip_spaces();
        if self.peek() == Some(']') {
            self.bump();
            return Ok(Value::array_from(items));
        }
        loop {
            items.push(self.parse_value()?);
            self.skip_spaces();
            match self.bump() {
                Some(',') => continue,
                Some(']') => break,
                _ => return Err(self.error("expected ',' or ']' in array")),
            }
        }
        Ok(Value::array_from(items))
    }

    fn parse_string(&mut self) -> ShellResult<String> {
        self.expect('"')?;
        let mut out = String::new();
        loop {
            match self.bump() {
                None => return Err(self.error("unterminated string")),
                Some('"') => break,
                Some('\\') => match self.bump() {
                    Some('"') => out.push('"'),
                    Some('\\') => out.push('\\'),
                    Some('/') => out.push('/'),
                    Some('n') => out.push('\n'),
                    Some('r') => out.push('\r'),
                    Some('t') => out.push('\t'),
                    Some('b') => out.push('\u{0008}'),
                    Some('f') => out.push('\u{000C}'),
                    Some('u') => out.push(self.parse_unicode_escape()?),
                    _ => return Err(self.error("invalid escape sequence")),
                },
                Some(c) => out.push(c),
            }
        }
        Ok(out)
    }

    fn parse_unicode_escape(&mut self) -> ShellResult<char> {
        let mut code = 0u32;
        for _ in 0..4 {
            let digit = self
                .bump()
                .and_then(|c| c.to_digit(16))
                .ok_or_else(|| self.error("invalid unicode escape"))?;
            code = code * 16 + digit;
        }
        char::from_u32(code).ok_or_else(|| self.error("invalid unicode escape"))
    }

    fn parse_number(&mut self) -> ShellResult<Value> {
        let mut text = String::new();
        let mut is_float = false;
        if self.peek() == Some('-') {
            text.push('-');
            self.bump();
        }
        while let Some(c) = self.peek() {
            match c {
                '0'..='9' => {
                    text.push(c);
                    self.bump();
                }
                '.' | 'e' | 'E' | '+' | '-' => {
                    is_float = true;
                    text.push(c);
                    self.bump();
                }
                _ => break,
            }
        }
        if is_float {
            let f: f64 = text
                .parse()
                .map_err(|_| self.error("invalid float literal"))?;
            return Ok(Value::Float(f));
        }
        // Integers prefer the signed variant; values past i64 stay unsigned,
        // and anything wider falls back to Float.
        if let Ok(i) = text.parse::<i64>() {
            Ok(Value::Integer(i))
        } else if let Ok(u) = text.parse::<u64>() {
            Ok(Value::UInteger(u))
        } else {
            let f: f64 = text
                .parse()
                .map_err(|_| self.error("invalid number literal"))?;
            Ok(Value::Float(f))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(v: Value) {
        let text = v.descr();
        let parsed = parse(&text).unwrap();
        assert_eq!(parsed, v, "round trip failed for {}", text);
    }

    #[test]
    fn test_round_trip_scalars() {
        round_trip(Value::Null);
        round_trip(Value::Undefined);
        round_trip(Value::Bool(true));
        round_trip(Value::Bool(false));
        round_trip(Value::Integer(-42));
        round_trip(Value::Integer(i64::MAX));
        round_trip(Value::UInteger(u64::MAX));
        round_trip(Value::Float(1.5));
        round_trip(Value::Float(-0.25));
        round_trip(Value::Float(5.0));
        round_trip(Value::Float(1e16));
        round_trip(Value::Float(-2.5e17));
        round_trip(Value::Float(1e300));
        round_trip(Value::String("plain".into()));
        round_trip(Value::String("esc \"quote\" and \\ tab\t".into()));
    }

    #[test]
    fn test_round_trip_containers() {
        let mut map = ValueMap::new();
        map.insert("sample", Value::Integer(1));
        map.insert("name", Value::from("first"));
        map.insert(
            "nested",
            Value::array_from(vec![Value::Null, Value::Bool(false), Value::Float(2.5)]),
        );
        round_trip(Value::map_from(map));
        round_trip(Value::array_from(vec![]));
        round_trip(Value::new_map());
    }

    #[test]
    fn test_parse_known_shapes() {
        let v = parse("{\"sample\": 1}").unwrap();
        let map = v.as_map().unwrap();
        assert_eq!(map.borrow().get("sample").unwrap().as_int().unwrap(), 1);

        let v = parse("[3,\"third\"]").unwrap();
        let arr = v.as_array().unwrap();
        assert_eq!(arr.borrow().len(), 2);
    }

    #[test]
    fn test_number_variants() {
        assert_eq!(parse("7").unwrap().value_type().name(), "Integer");
        assert_eq!(parse("9223372036854775808").unwrap().value_type().name(), "UInteger");
        assert_eq!(parse("7.0").unwrap().value_type().name(), "Float");
        assert_eq!(parse("1e3").unwrap().value_type().name(), "Float");
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse("{").is_err());
        assert!(parse("[1,").is_err());
        assert!(parse("\"open").is_err());
        assert!(parse("1 2").is_err());
        assert!(parse("nope").is_err());
    }
}
