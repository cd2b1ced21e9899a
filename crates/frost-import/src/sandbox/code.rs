//! Sandbox code objects.
//!
//! A frozen payload for the sandbox is a JSON array of statements:
//!
//! ```json
//! [
//!   {"op": "assign", "name": "answer", "value": 42},
//!   {"op": "import", "module": "pkgs.sub", "alias": "sub"},
//!   {"op": "read_resource", "package": "pkgs", "resource": "data.bin", "target": "blob"},
//!   {"op": "raise", "message": "unsupported platform"}
//! ]
//! ```

use std::fmt;

use serde::Deserialize;

/// A value bound in a module namespace.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// JSON `null`
    None,
    /// Boolean
    Bool(bool),
    /// Integer
    Int(i64),
    /// Floating point
    Float(f64),
    /// String
    Str(String),
    /// Bytes read from a resource
    #[serde(skip_deserializing)]
    Bytes(Vec<u8>),
    /// Reference to a module by its registered name
    #[serde(skip_deserializing)]
    Module(String),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::None => write!(f, "None"),
            Value::Bool(true) => write!(f, "True"),
            Value::Bool(false) => write!(f, "False"),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::Str(s) => write!(f, "{:?}", s),
            Value::Bytes(b) => write!(f, "b\"{}\"", b.escape_ascii()),
            Value::Module(name) => write!(f, "<module '{}'>", name),
        }
    }
}

/// One statement of module code.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Stmt {
    /// Bind a literal.
    Assign {
        /// Attribute name
        name: String,
        /// Literal value
        value: Value,
    },

    /// Import a module and bind it. Without an alias a dotted import binds
    /// its top-level package.
    Import {
        /// Module to import
        module: String,
        /// Name to bind the module itself to
        #[serde(default)]
        alias: Option<String>,
    },

    /// Read a package resource into a bytes value.
    ReadResource {
        /// Package owning the resource
        package: String,
        /// Resource name inside the package
        resource: String,
        /// Attribute to bind the bytes to
        target: String,
    },

    /// Abort module execution with an error.
    Raise {
        /// Error message
        message: String,
    },
}

/// A deserialized code object: the statements of one module body.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SandboxCode {
    /// Statements in execution order
    pub stmts: Vec<Stmt>,
}

impl SandboxCode {
    /// Parse a JSON statement list.
    pub fn parse(payload: &[u8]) -> Result<Self, String> {
        let stmts: Vec<Stmt> = serde_json::from_slice(payload).map_err(|e| e.to_string())?;
        Ok(Self { stmts })
    }
}
