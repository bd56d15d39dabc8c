// CRUD builder plumbing
// Chain order is data: every method registers the set of methods it may
// follow, and the last successful call selects what is currently legal.
// Bind bookkeeping lives here too.

pub mod collection;
pub mod table;

use crate::bridge::Member;
use crate::error::{ShellError, ShellResult};
use crate::value::Value;

/// Legal-call-order table of one builder chain.
pub struct DynamicFunctions {
    registered: Vec<(String, Vec<String>)>,
    last: String,
}

impl DynamicFunctions {
    pub fn new() -> Self {
        Self {
            registered: Vec::new(),
            last: String::new(),
        }
    }

    /// Registers `name` as legal right after any of `after` ("" is the
    /// initial state).
    pub fn register(&mut self, name: &str, after: &[&str]) {
        self.registered.push((
            name.to_string(),
            after.iter().map(|s| s.to_string()).collect(),
        ));
    }

    /// Records a successful call; the enabled set follows from it.
    pub fn update(&mut self, source: &str) {
        self.last = source.to_string();
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.registered.iter().any(|(n, _)| n == name)
    }

    pub fn is_enabled(&self, name: &str) -> bool {
        self.registered
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, after)| after.iter().any(|a| a == &self.last))
            .unwrap_or(false)
    }

    /// Currently legal methods, in registration order.
    pub fn enabled_members(&self) -> Vec<Member> {
        self.registered
            .iter()
            .filter(|(name, _)| self.is_enabled(name))
            .map(|(name, _)| Member::method(name.clone()))
            .collect()
    }

    /// Gate for `call`: unknown names are unknown members, known but
    /// currently illegal names are an order violation.
    pub fn check_call(&self, class_name: &str, name: &str) -> ShellResult<()> {
        if !self.is_registered(name) {
            return Err(ShellError::unknown_member(class_name, name));
        }
        if !self.is_enabled(name) {
            return Err(ShellError::InvalidCallOrder(format!(
                "{}.{}: Invalid chaining of method {}",
                class_name, name, name
            )));
        }
        Ok(())
    }
}

impl Default for DynamicFunctions {
    fn default() -> Self {
        Self::new()
    }
}

/// Declared `:name` placeholders and the values bound so far.
#[derive(Default)]
pub struct BindLedger {
    declared: Vec<String>,
    bound: Vec<(String, Value)>,
}

impl BindLedger {
    /// Collects the placeholders of a filter or condition string.
    pub fn declare_from(&mut self, text: &str) {
        for name in scan_placeholders(text) {
            if !self.declared.contains(&name) {
                self.declared.push(name);
            }
        }
    }

    pub fn bind(&mut self, api: &str, name: &str, value: Value) -> ShellResult<()> {
        if !self.declared.iter().any(|n| n == name) {
            return Err(ShellError::argument(
                api,
                format!("Unable to bind value for unexisting placeholder: {}", name),
            ));
        }
        match self.bound.iter_mut().find(|(n, _)| n == name) {
            Some(slot) => slot.1 = value,
            None => self.bound.push((name.to_string(), value)),
        }
        Ok(())
    }

    /// Every declared placeholder must be bound before execution.
    pub fn ensure_all_bound(&self, api: &str) -> ShellResult<()> {
        let missing: Vec<&str> = self
            .declared
            .iter()
            .filter(|name| !self.bound.iter().any(|(n, _)| n == *name))
            .map(|name| name.as_str())
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(ShellError::UnboundParameter(format!(
                "{}: Missing value bindings for the following placeholders: {}",
                api,
                missing.join(", ")
            )))
        }
    }

    pub fn bound_values(&self) -> Vec<(String, Value)> {
        self.bound.clone()
    }
}

/// `:name` markers outside quoted runs, in order of appearance.
pub fn scan_placeholders(text: &str) -> Vec<String> {
    let mut names = Vec::new();
    let mut chars = text.chars().peekable();
    let mut quote: Option<char> = None;
    while let Some(c) = chars.next() {
        match quote {
            Some(q) => {
                if c == q {
                    quote = None;
                }
            }
            None if c == '\'' || c == '"' || c == '`' => quote = Some(c),
            None if c == ':' => {
                let mut name = String::new();
                while let Some(n) = chars.peek() {
                    if n.is_ascii_alphanumeric() || *n == '_' {
                        name.push(*n);
                        chars.next();
                    } else {
                        break;
                    }
                }
                if !name.is_empty() && !names.contains(&name) {
                    names.push(name);
                }
            }
            None => {}
        }
    }
    names
}

/// Accepts either one array of strings or any number of plain strings;
/// used by `fields`, `sort`, `orderBy` and friends.
pub fn string_list_args(api: &str, args: &[Value]) -> ShellResult<Vec<String>> {
    if args.len() == 1 {
        if let Value::Array(items) = &args[0] {
            let mut out = Vec::new();
            for (index, item) in items.borrow().iter().enumerate() {
                match item {
                    Value::String(s) => out.push(s.clone()),
                    _ => {
                        return Err(ShellError::argument(
                            api,
                            format!("Element #{} is expected to be a string", index + 1),
                        ))
                    }
                }
            }
            return Ok(out);
        }
    }
    let mut out = Vec::new();
    for (index, arg) in args.iter().enumerate() {
        match arg {
            Value::String(s) => out.push(s.clone()),
            _ => return Err(ShellError::argument_kind(api, index + 1, "string")),
        }
    }
    Ok(out)
}
