// Value narrowing for table operations
// Table CRUD arguments accept scalars and expression bridges only; the
// dynamic value is narrowed here before it reaches a driver.

use crate::bridge::Expression;
use crate::error::{ShellError, ShellResult};
use crate::value::Value;

/// A typed column or expression value accepted by a table operation.
#[derive(Debug, Clone, PartialEq)]
pub enum TableValue {
    Null,
    Bool(bool),
    String(String),
    SInt64(i64),
    UInt64(u64),
    Double(f64),
    /// Server-side expression text, sent unquoted.
    Expression(String),
}

/// Narrows a shell value to a `TableValue`.
///
/// Objects are accepted only when they are `Expression` bridges carrying
/// non-empty text; everything non-scalar fails.
pub fn map_table_value(source: &Value) -> ShellResult<TableValue> {
    match source {
        Value::Null => Ok(TableValue::Null),
        Value::Bool(b) => Ok(TableValue::Bool(*b)),
        Value::String(s) => Ok(TableValue::String(s.clone())),
        Value::Integer(i) => Ok(TableValue::SInt64(*i)),
        Value::UInteger(u) => Ok(TableValue::UInt64(*u)),
        Value::Float(f) => Ok(TableValue::Double(*f)),
        Value::Object(object) => match Expression::from_bridge(object) {
            Some(expression) if !expression.data().is_empty() => {
                Ok(TableValue::Expression(expression.data().to_string()))
            }
            Some(_) => Err(ShellError::ArgumentError(
                "Expressions can not be empty.".to_string(),
            )),
            None => Err(unsupported(source)),
        },
        Value::Undefined
        | Value::Array(_)
        | Value::Map(_)
        | Value::MapRef(_)
        | Value::Function(_) => Err(unsupported(source)),
    }
}

fn unsupported(source: &Value) -> ShellError {
    ShellError::ArgumentError(format!("Unsupported value received: {}", source.descr()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::Expression;

    #[test]
    fn test_scalar_mapping() {
        assert_eq!(map_table_value(&Value::Null).unwrap(), TableValue::Null);
        assert_eq!(
            map_table_value(&Value::Bool(true)).unwrap(),
            TableValue::Bool(true)
        );
        assert_eq!(
            map_table_value(&Value::Integer(-3)).unwrap(),
            TableValue::SInt64(-3)
        );
        assert_eq!(
            map_table_value(&Value::UInteger(9)).unwrap(),
            TableValue::UInt64(9)
        );
        assert_eq!(
            map_table_value(&Value::Float(1.5)).unwrap(),
            TableValue::Double(1.5)
        );
        assert_eq!(
            map_table_value(&Value::from("txt")).unwrap(),
            TableValue::String("txt".to_string())
        );
    }

    #[test]
    fn test_expression_mapping() {
        let expr = Expression::create(vec![Value::from("5+6")]).unwrap();
        assert_eq!(
            map_table_value(&expr).unwrap(),
            TableValue::Expression("5+6".to_string())
        );

        let empty = Expression::create(vec![Value::from("")]).unwrap();
        let err = map_table_value(&empty).unwrap_err();
        assert_eq!(err.to_string(), "Expressions can not be empty.");
    }

    #[test]
    fn test_unsupported_variants() {
        for value in [
            Value::Undefined,
            Value::new_array(),
            Value::new_map(),
        ] {
            let err = map_table_value(&value).unwrap_err();
            assert_eq!(err.kind(), "ArgumentError");
            assert_eq!(
                err.to_string(),
                format!("Unsupported value received: {}", value.descr())
            );
        }
    }
}
