//! JSON scalar coercion
//!
//! Every leaf value is rendered to the canonical string form the store
//! expects before any rule sees it:
//!
//! | JSON      | Rendered          |
//! |-----------|-------------------|
//! | `true`    | `1`               |
//! | `42`      | `42`              |
//! | `230.456` | `230.46`          |
//! | `"EATON"` | `EATON`           |
//! | `null`, `{}`, `[]` | no value, path skipped |

use nm2_store::numfmt::{fixed2, i64_to_string, u64_to_string};
use serde_json::Value;

/// A terminal JSON value
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Scalar<'a> {
    Bool(bool),
    Int(i64),
    UInt(u64),
    Double(f64),
    Str(&'a str),
}

impl<'a> Scalar<'a> {
    /// `None` for null, objects and arrays
    pub fn from_json(value: &'a Value) -> Option<Self> {
        match value {
            Value::Bool(b) => Some(Scalar::Bool(*b)),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Some(Scalar::Int(i))
                } else if let Some(u) = n.as_u64() {
                    Some(Scalar::UInt(u))
                } else {
                    n.as_f64().map(Scalar::Double)
                }
            },
            Value::String(s) => Some(Scalar::Str(s.as_str())),
            Value::Null | Value::Array(_) | Value::Object(_) => None,
        }
    }

    pub fn render(&self) -> String {
        match self {
            Scalar::Bool(b) => i64_to_string(i64::from(*b)),
            Scalar::Int(i) => i64_to_string(*i),
            Scalar::UInt(u) => u64_to_string(*u),
            Scalar::Double(d) => fixed2(*d),
            Scalar::Str(s) => (*s).to_string(),
        }
    }
}

/// Render a JSON value, `None` when it is not a scalar
pub fn coerce(value: &Value) -> Option<String> {
    Scalar::from_json(value).map(|s| s.render())
}
