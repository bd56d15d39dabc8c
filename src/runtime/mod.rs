// Script runtimes
// One adapter per embedded language. Adapters marshal between their
// native value model and the shell value, install the module surface and
// route bridge errors into the language's error shape.

pub mod interp;
pub mod js;
pub mod python;

use std::fmt;

use crate::error::ShellError;
use crate::value::{BridgeRef, Value};

pub use js::JsRuntime;
pub use python::PyRuntime;

/// Shell input modes. Only one runtime is active at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Sql,
    JavaScript,
    Python,
}

impl Mode {
    pub fn name(&self) -> &'static str {
        match self {
            Mode::Sql => "sql",
            Mode::JavaScript => "js",
            Mode::Python => "py",
        }
    }
}

/// A shell error carried into a runtime: the kind tag survives so callers
/// can match on it the way native code matches on an exception class.
#[derive(Debug, Clone)]
pub struct ScriptError {
    pub kind: String,
    pub message: String,
}

impl ScriptError {
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
        }
    }
}

impl From<ShellError> for ScriptError {
    fn from(error: ShellError) -> Self {
        Self {
            kind: error.kind().to_string(),
            message: error.to_string(),
        }
    }
}

impl fmt::Display for ScriptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for ScriptError {}

/// The uniform runtime surface the shell drives.
pub trait ScriptRuntime {
    fn mode(&self) -> Mode;

    /// Exposes a module bridge as a global of the runtime.
    fn install_module(&mut self, name: &str, module: BridgeRef);

    /// Runs one statement and returns its value.
    fn evaluate(&mut self, text: &str) -> Result<Value, ScriptError>;

    /// Language-flavored textual form of a value.
    fn describe(&self, value: &Value) -> String;

    /// Drains the text printed by the statement(s) evaluated so far.
    fn take_output(&mut self) -> Vec<String>;
}
