use std::error::Error;

use bytes::BytesMut;
use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use tokio_postgres::types::{IsNull, ToSql, Type, to_sql_checked};
use uuid::Uuid;

use crate::param::Value;

type BoxError = Box<dyn Error + Sync + Send>;

/// Values convert to whatever type the server inferred for the parameter,
/// so `@id` can bind an `INT4` column from a `Value::Int`.
impl ToSql for Value {
    fn to_sql(&self, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
        match self {
            Value::Null => Ok(IsNull::Yes),
            Value::Bool(b) => match *ty {
                Type::BOOL => b.to_sql(ty, out),
                Type::TEXT | Type::VARCHAR | Type::BPCHAR => b.to_string().to_sql(ty, out),
                _ => Err(mismatch(self, ty)),
            },
            Value::Int(i) => int_to_sql(*i, ty, out),
            Value::Float(f) => match *ty {
                Type::FLOAT4 => (*f as f32).to_sql(ty, out),
                Type::FLOAT8 => f.to_sql(ty, out),
                Type::TEXT | Type::VARCHAR | Type::BPCHAR => f.to_string().to_sql(ty, out),
                _ => Err(mismatch(self, ty)),
            },
            Value::Text(s) => match *ty {
                Type::TEXT | Type::VARCHAR | Type::BPCHAR | Type::NAME => s.to_sql(ty, out),
                Type::JSON | Type::JSONB => serde_json::from_str::<JsonValue>(s)?.to_sql(ty, out),
                Type::UUID => Uuid::parse_str(s)?.to_sql(ty, out),
                _ => Err(mismatch(self, ty)),
            },
            Value::Bytes(b) => match *ty {
                Type::BYTEA => b.to_sql(ty, out),
                _ => Err(mismatch(self, ty)),
            },
            Value::Timestamp(ts) => match *ty {
                Type::TIMESTAMPTZ => DateTime::<Utc>::from_naive_utc_and_offset(*ts, Utc).to_sql(ty, out),
                Type::DATE => ts.date().to_sql(ty, out),
                Type::TIMESTAMP => ts.to_sql(ty, out),
                _ => Err(mismatch(self, ty)),
            },
            Value::Json(j) => match *ty {
                Type::JSON | Type::JSONB => j.to_sql(ty, out),
                Type::TEXT | Type::VARCHAR => j.to_string().to_sql(ty, out),
                _ => Err(mismatch(self, ty)),
            },
            Value::Uuid(u) => match *ty {
                Type::UUID => u.to_sql(ty, out),
                Type::TEXT | Type::VARCHAR | Type::BPCHAR => u.to_string().to_sql(ty, out),
                _ => Err(mismatch(self, ty)),
            },
        }
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }

    to_sql_checked!();
}

fn int_to_sql(i: i64, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
    match *ty {
        Type::INT2 => i16::try_from(i)?.to_sql(ty, out),
        Type::INT4 => i32::try_from(i)?.to_sql(ty, out),
        Type::INT8 => i.to_sql(ty, out),
        Type::OID => u32::try_from(i)?.to_sql(ty, out),
        Type::FLOAT4 => (i as f32).to_sql(ty, out),
        Type::FLOAT8 => (i as f64).to_sql(ty, out),
        Type::BOOL => (i != 0).to_sql(ty, out),
        Type::TEXT | Type::VARCHAR | Type::BPCHAR => i.to_string().to_sql(ty, out),
        _ => Err(mismatch(&Value::Int(i), ty)),
    }
}

fn mismatch(value: &Value, ty: &Type) -> BoxError {
    format!("cannot bind {} parameter to column type {}", value.type_name(), ty).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn encode(value: &Value, ty: &Type) -> Result<Vec<u8>, BoxError> {
        let mut out = BytesMut::new();
        match value.to_sql_checked(ty, &mut out)? {
            IsNull::Yes => Ok(Vec::new()),
            IsNull::No => Ok(out.to_vec()),
        }
    }

    #[test]
    fn ints_narrow_to_the_column_type() {
        assert_eq!(encode(&Value::Int(7), &Type::INT4).unwrap(), 7i32.to_be_bytes());
        assert_eq!(encode(&Value::Int(7), &Type::INT2).unwrap(), 7i16.to_be_bytes());
        assert_eq!(encode(&Value::Int(7), &Type::INT8).unwrap(), 7i64.to_be_bytes());
        assert!(encode(&Value::Int(i64::from(i32::MAX) + 1), &Type::INT4).is_err());
    }

    #[test]
    fn null_binds_to_anything() {
        assert!(encode(&Value::Null, &Type::INT4).unwrap().is_empty());
        assert!(encode(&Value::Null, &Type::JSONB).unwrap().is_empty());
    }

    #[test]
    fn text_parses_into_structured_types() {
        let id = "67e55044-10b1-426f-9247-bb680e5fe0c8";
        let bytes = encode(&Value::Text(id.into()), &Type::UUID).unwrap();
        assert_eq!(bytes, Uuid::parse_str(id).unwrap().as_bytes());

        let json = encode(&Value::Text("{\"a\":1}".into()), &Type::JSONB).unwrap();
        assert_eq!(json[0], 1);
        assert!(encode(&Value::Text("not json".into()), &Type::JSON).is_err());
    }

    #[test]
    fn timestamps_follow_the_column_type() {
        let ts = NaiveDate::from_ymd_opt(2000, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 1)
            .unwrap();
        let naive = encode(&Value::Timestamp(ts), &Type::TIMESTAMP).unwrap();
        let utc = encode(&Value::Timestamp(ts), &Type::TIMESTAMPTZ).unwrap();
        assert_eq!(naive, 1_000_000i64.to_be_bytes());
        assert_eq!(naive, utc);
        assert_eq!(encode(&Value::Timestamp(ts), &Type::DATE).unwrap(), 0i32.to_be_bytes());
    }

    #[test]
    fn mismatched_types_are_errors() {
        let err = encode(&Value::Bool(true), &Type::INT4).unwrap_err();
        assert_eq!(err.to_string(), "cannot bind bool parameter to column type int4");
        assert!(encode(&Value::Float(1.5), &Type::INT8).is_err());

        let err = encode(&Value::Text("1234".into()), &Type::INT4).unwrap_err();
        assert_eq!(err.to_string(), "cannot bind text parameter to column type int4");
        assert!(encode(&Value::Text("1.5".into()), &Type::FLOAT8).is_err());
        assert!(encode(&Value::Bytes(vec![0, 0, 0, 1]), &Type::INT4).is_err());
        assert!(encode(&Value::Bytes(vec![1]), &Type::TEXT).is_err());
        assert!(encode(&Value::Json(serde_json::json!(5)), &Type::INT8).is_err());
        assert!(encode(&Value::Uuid(Uuid::nil()), &Type::BYTEA).is_err());
    }

    #[test]
    fn compatible_types_still_bind() {
        assert_eq!(encode(&Value::Text("abc".into()), &Type::VARCHAR).unwrap(), b"abc");
        assert_eq!(encode(&Value::Bytes(vec![1, 2]), &Type::BYTEA).unwrap(), [1, 2]);
        let json = Value::Json(serde_json::json!({"a": 1}));
        assert_eq!(encode(&json, &Type::TEXT).unwrap(), b"{\"a\":1}");
        assert_eq!(encode(&json, &Type::JSONB).unwrap()[0], 1);
    }
}
