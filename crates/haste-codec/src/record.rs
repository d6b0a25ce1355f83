use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map as JsonMap, Number, Value as JsonValue};

use haste_types::{ProtoId, Value};

use crate::error::{CodecError, CodecResult};

/// Distinguishing prefix of an encoded Proto reference.
///
/// The token is the prefix followed by the referenced object's full
/// identifier, e.g. `PROTOREF#:Book-7f3a`. The full identifier (not the bare
/// uid) keeps tokens unambiguous across tags.
pub const REF_PREFIX: &str = "PROTOREF#:";

/// The transport shape of one persisted Proto.
///
/// Exactly four top-level fields; `parents` holds identifiers in the
/// object's parent order and `slots` holds encoded values keyed by slot
/// name. `parents` and `slots` may be omitted in a record body (older
/// records do this) and default to empty; unknown fields are rejected.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProtoRecord {
    pub tag: String,
    pub uid: String,
    #[serde(default)]
    pub parents: Vec<String>,
    #[serde(default)]
    pub slots: JsonMap<String, JsonValue>,
}

impl ProtoRecord {
    /// Build a record from an identifier, parent list, and named slot values.
    pub fn new<'a, I>(id: &ProtoId, parents: &[ProtoId], slots: I) -> CodecResult<Self>
    where
        I: IntoIterator<Item = (&'a str, &'a Value)>,
    {
        let mut encoded = JsonMap::new();
        for (name, value) in slots {
            encoded.insert(name.to_string(), encode_value(value)?);
        }
        Ok(Self {
            tag: id.tag().to_string(),
            uid: id.uid().to_string(),
            parents: parents.iter().map(ToString::to_string).collect(),
            slots: encoded,
        })
    }

    /// The identifier this record names.
    pub fn identifier(&self) -> CodecResult<ProtoId> {
        ProtoId::new(&self.tag, &self.uid)
            .map_err(|e| CodecError::Malformed(e.to_string()))
    }

    /// Parent identifiers, in the object's parent order.
    pub fn parent_ids(&self) -> CodecResult<Vec<ProtoId>> {
        self.parents
            .iter()
            .map(|raw| {
                ProtoId::parse(raw).map_err(|e| {
                    CodecError::Malformed(format!("parent entry {raw:?}: {e}"))
                })
            })
            .collect()
    }

    /// Decode every slot value, preserving slot order.
    pub fn decode_slots(&self) -> CodecResult<IndexMap<String, Value>> {
        let mut slots = IndexMap::with_capacity(self.slots.len());
        for (name, raw) in &self.slots {
            let value = decode_value(raw).map_err(|e| {
                CodecError::Malformed(format!("slot {name:?}: {e}"))
            })?;
            slots.insert(name.clone(), value);
        }
        Ok(slots)
    }
}

/// Encode a slot value into its wire form.
///
/// Fails only for non-finite floats, which have no JSON representation.
pub fn encode_value(value: &Value) -> CodecResult<JsonValue> {
    let encoded = match value {
        Value::Null => JsonValue::Null,
        Value::Bool(b) => JsonValue::Bool(*b),
        Value::Int(n) => JsonValue::Number((*n).into()),
        Value::Float(x) => {
            let Some(number) = Number::from_f64(*x) else {
                return Err(CodecError::Encode(format!(
                    "float {x} has no JSON representation"
                )));
            };
            JsonValue::Number(number)
        }
        Value::Str(s) => JsonValue::String(s.clone()),
        Value::Seq(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                out.push(encode_value(item)?);
            }
            JsonValue::Array(out)
        }
        Value::Map(entries) => {
            let mut out = JsonMap::new();
            for (key, entry) in entries {
                out.insert(key.clone(), encode_value(entry)?);
            }
            JsonValue::Object(out)
        }
        Value::Ref(id) => JsonValue::String(format!("{REF_PREFIX}{id}")),
    };
    Ok(encoded)
}

/// Decode a wire value back into a slot value.
///
/// Any string carrying [`REF_PREFIX`] decodes as a reference; the remainder
/// of the token must parse as an identifier.
pub fn decode_value(raw: &JsonValue) -> CodecResult<Value> {
    let decoded = match raw {
        JsonValue::Null => Value::Null,
        JsonValue::Bool(b) => Value::Bool(*b),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Int(i)
            } else if let Some(x) = n.as_f64() {
                Value::Float(x)
            } else {
                return Err(CodecError::Malformed(format!(
                    "unrepresentable number {n}"
                )));
            }
        }
        JsonValue::String(s) => match s.strip_prefix(REF_PREFIX) {
            Some(token) => {
                let id = ProtoId::parse(token).map_err(|e| {
                    CodecError::Malformed(format!("reference token {s:?}: {e}"))
                })?;
                Value::Ref(id)
            }
            None => Value::Str(s.clone()),
        },
        JsonValue::Array(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                out.push(decode_value(item)?);
            }
            Value::Seq(out)
        }
        JsonValue::Object(entries) => {
            let mut out = IndexMap::with_capacity(entries.len());
            for (key, entry) in entries {
                out.insert(key.clone(), decode_value(entry)?);
            }
            Value::Map(out)
        }
    };
    Ok(decoded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn id(tag: &str, uid: &str) -> ProtoId {
        ProtoId::new(tag, uid).unwrap()
    }

    #[test]
    fn reference_encodes_as_prefixed_identifier() {
        let encoded = encode_value(&Value::Ref(id("Book", "7f3a"))).unwrap();
        assert_eq!(encoded, JsonValue::String("PROTOREF#:Book-7f3a".into()));
    }

    #[test]
    fn reference_token_decodes_to_ref() {
        let raw = JsonValue::String("PROTOREF#:Book-7f3a".into());
        assert_eq!(decode_value(&raw).unwrap(), Value::Ref(id("Book", "7f3a")));
    }

    #[test]
    fn plain_string_decodes_to_str() {
        let raw = JsonValue::String("Mindstorms".into());
        assert_eq!(decode_value(&raw).unwrap(), Value::Str("Mindstorms".into()));
    }

    #[test]
    fn malformed_reference_token_is_rejected() {
        let raw = JsonValue::String("PROTOREF#:nodash".into());
        assert!(matches!(
            decode_value(&raw),
            Err(CodecError::Malformed(_))
        ));
    }

    #[test]
    fn numbers_split_into_int_and_float() {
        assert_eq!(
            decode_value(&serde_json::json!(3)).unwrap(),
            Value::Int(3)
        );
        assert_eq!(
            decode_value(&serde_json::json!(3.5)).unwrap(),
            Value::Float(3.5)
        );
        // Beyond i64 range, numbers fall back to float.
        assert_eq!(
            decode_value(&serde_json::json!(u64::MAX)).unwrap(),
            Value::Float(u64::MAX as f64)
        );
    }

    #[test]
    fn non_finite_float_has_no_encoding() {
        assert!(matches!(
            encode_value(&Value::Float(f64::NAN)),
            Err(CodecError::Encode(_))
        ));
        assert!(matches!(
            encode_value(&Value::Float(f64::INFINITY)),
            Err(CodecError::Encode(_))
        ));
    }

    #[test]
    fn nested_shapes_roundtrip() {
        let mut entries = IndexMap::new();
        entries.insert("owner".to_string(), Value::Ref(id("Person", "2")));
        entries.insert("count".to_string(), Value::Int(2));
        let value = Value::Seq(vec![
            Value::Str("a".into()),
            Value::Map(entries),
            Value::Seq(vec![Value::Null, Value::Bool(true)]),
        ]);
        let wire = encode_value(&value).unwrap();
        assert_eq!(decode_value(&wire).unwrap(), value);
    }

    #[test]
    fn record_serializes_exactly_four_fields_in_order() {
        let record = ProtoRecord::new(
            &id("Book", "1"),
            &[id("Object", "1")],
            [("title", &Value::Str("Mindstorms".into()))],
        )
        .unwrap();
        let json = serde_json::to_value(&record).unwrap();
        let object = json.as_object().unwrap();
        let keys: Vec<&str> = object.keys().map(String::as_str).collect();
        assert_eq!(keys, ["tag", "uid", "parents", "slots"]);
    }

    #[test]
    fn record_tolerates_missing_parents_and_slots() {
        let record: ProtoRecord =
            serde_json::from_str(r#"{"tag":"Object","uid":"1"}"#).unwrap();
        assert!(record.parents.is_empty());
        assert!(record.slots.is_empty());
        assert_eq!(record.identifier().unwrap(), ProtoId::root());
    }

    #[test]
    fn record_rejects_unknown_fields() {
        let result: Result<ProtoRecord, _> = serde_json::from_str(
            r#"{"tag":"Object","uid":"1","parents":[],"slots":{},"extra":0}"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn record_slot_order_is_preserved() {
        let z = Value::Int(1);
        let a = Value::Int(2);
        let record = ProtoRecord::new(
            &id("Book", "1"),
            &[],
            [("zebra", &z), ("aardvark", &a)],
        )
        .unwrap();
        let bytes = serde_json::to_vec(&record).unwrap();
        let back: ProtoRecord = serde_json::from_slice(&bytes).unwrap();
        let keys: Vec<&str> = back.slots.keys().map(String::as_str).collect();
        assert_eq!(keys, ["zebra", "aardvark"]);
    }

    #[test]
    fn parent_ids_parse_in_order() {
        let record = ProtoRecord::new(
            &id("Book", "9"),
            &[id("Object", "1"), id("Media", "4")],
            std::iter::empty(),
        )
        .unwrap();
        assert_eq!(
            record.parent_ids().unwrap(),
            vec![id("Object", "1"), id("Media", "4")]
        );
    }

    #[test]
    fn malformed_parent_entry_is_rejected() {
        let record: ProtoRecord = serde_json::from_str(
            r#"{"tag":"Book","uid":"1","parents":["nodash"],"slots":{}}"#,
        )
        .unwrap();
        assert!(matches!(
            record.parent_ids(),
            Err(CodecError::Malformed(_))
        ));
    }

    fn value_strategy() -> impl Strategy<Value = Value> {
        let leaf = prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::Bool),
            any::<i64>().prop_map(Value::Int),
            (-1.0e9..1.0e9f64).prop_map(Value::Float),
            "[a-z ]{0,12}".prop_map(Value::Str),
            ("[A-Z][a-z]{0,5}", "[a-z0-9]{1,8}")
                .prop_map(|(tag, uid)| Value::Ref(ProtoId::new(&tag, &uid).unwrap())),
        ];
        leaf.prop_recursive(3, 24, 4, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Seq),
                prop::collection::vec(("[a-z]{1,6}", inner), 0..4).prop_map(|pairs| {
                    Value::Map(pairs.into_iter().collect())
                }),
            ]
        })
    }

    proptest! {
        #[test]
        fn any_value_roundtrips_through_wire(value in value_strategy()) {
            let wire = encode_value(&value).unwrap();
            let back = decode_value(&wire).unwrap();
            prop_assert_eq!(back, value);
        }
    }
}
