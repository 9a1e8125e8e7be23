//! EIP-712 Type Encoding
//!
//! Implements `encodeType`, `typeHash`, `encodeData` and `hashStruct`.

use super::types::*;
use super::value::TypedValue;
use crate::utils::crypto::keccak256;
use std::collections::{BTreeSet, HashSet};

/// Encode a type string for a struct type.
///
/// Format: `Primary(t1 n1,...)` followed by every referenced struct type
/// in lexicographic order, each formatted the same way.
pub fn encode_type(schema: &TypeSchema, type_name: &str) -> Result<String, Eip712Error> {
    let fields = schema.fields(type_name)?;
    let dependencies = collect_dependencies(schema, type_name)?;

    let mut result = format_type_string(type_name, fields);
    for dep in dependencies {
        result.push_str(&format_type_string(dep, schema.fields(dep)?));
    }

    Ok(result)
}

/// Format a single type string
fn format_type_string(type_name: &str, fields: &[TypedDataField]) -> String {
    let field_strs: Vec<String> = fields
        .iter()
        .map(|f| format!("{} {}", f.type_name, f.name))
        .collect();

    format!("{}({})", type_name, field_strs.join(","))
}

/// One type on the current path and the index of its next unvisited field
struct Frame<'a> {
    type_name: &'a str,
    fields: &'a [TypedDataField],
    next: usize,
}

/// Every struct type reachable from `root`, excluding `root` itself.
///
/// Depth-first over an explicit frame stack. Reaching a type that is still
/// on the stack is a cycle. Every field type met on the way must resolve.
pub fn collect_dependencies<'a>(
    schema: &'a TypeSchema,
    root: &'a str,
) -> Result<BTreeSet<&'a str>, Eip712Error> {
    let mut found = BTreeSet::new();
    let mut on_path = HashSet::new();
    let mut stack = vec![Frame {
        type_name: root,
        fields: schema.fields(root)?,
        next: 0,
    }];
    on_path.insert(root);

    while let Some(frame) = stack.last_mut() {
        let fields = frame.fields;
        let Some(field) = fields.get(frame.next) else {
            on_path.remove(frame.type_name);
            stack.pop();
            continue;
        };
        frame.next += 1;

        if FieldType::parse(&field.type_name, schema)?.struct_name().is_none() {
            continue;
        }
        let referenced = get_base_type(&field.type_name);

        if on_path.contains(referenced) {
            let mut cycle: Vec<&str> = stack.iter().map(|frame| frame.type_name).collect();
            cycle.push(referenced);
            return Err(Eip712Error::CyclicType(cycle.join(" -> ")));
        }

        if found.insert(referenced) {
            stack.push(Frame {
                type_name: referenced,
                fields: schema.fields(referenced)?,
                next: 0,
            });
            on_path.insert(referenced);
        }
    }

    Ok(found)
}

/// Get the base type from a potentially array type
/// e.g., "Person[]" -> "Person", "uint256[10]" -> "uint256"
pub fn get_base_type(type_name: &str) -> &str {
    match type_name.find('[') {
        Some(bracket_pos) => &type_name[..bracket_pos],
        None => type_name,
    }
}

/// Calculate the type hash for a struct type
///
/// typeHash = keccak256(encodeType(typeOf(s)))
pub fn type_hash(schema: &TypeSchema, type_name: &str) -> Result<Digest, Eip712Error> {
    let encoded = encode_type(schema, type_name)?;
    Ok(keccak256(encoded.as_bytes()))
}

/// Encode one value of a declared type as its 32-byte word.
///
/// Atomic values are padded in place; `bytes`, `string`, arrays and
/// structs contribute a hash.
pub fn encode_value(
    schema: &TypeSchema,
    type_name: &str,
    value: &serde_json::Value,
) -> Result<[u8; 32], Eip712Error> {
    let field_type = FieldType::parse(type_name, schema)?;
    TypedValue::from_json(schema, &field_type, value)?.encode_word(schema)
}

/// `typeHash || encodeData(s)`, the bytes `hash_struct` hashes
pub fn encode_data(
    schema: &TypeSchema,
    type_name: &str,
    value: &serde_json::Value,
) -> Result<Vec<u8>, Eip712Error> {
    TypedValue::from_struct_json(schema, type_name, value)?.encode_data(schema)
}

/// Hash a struct according to EIP-712
///
/// hashStruct(s) = keccak256(typeHash || encodeData(s))
pub fn hash_struct(
    schema: &TypeSchema,
    type_name: &str,
    value: &serde_json::Value,
) -> Result<Digest, Eip712Error> {
    Ok(keccak256(&encode_data(schema, type_name, value)?))
}

#[cfg(test)]
mod encoder_tests {
    use super::*;
    use serde_json::json;

    fn mail_schema() -> TypeSchema {
        TypeSchema::new()
            .with_type(
                "Mail",
                vec![
                    TypedDataField::new("from", "Person"),
                    TypedDataField::new("to", "Person"),
                    TypedDataField::new("contents", "string"),
                ],
            )
            .with_type(
                "Person",
                vec![
                    TypedDataField::new("name", "string"),
                    TypedDataField::new("wallet", "address"),
                ],
            )
    }

    #[test]
    fn test_encode_type_simple() {
        let encoded = encode_type(&mail_schema(), "Person").unwrap();
        assert_eq!(encoded, "Person(string name,address wallet)");
    }

    #[test]
    fn test_encode_type_with_dependencies() {
        let encoded = encode_type(&mail_schema(), "Mail").unwrap();
        assert_eq!(
            encoded,
            "Mail(Person from,Person to,string contents)Person(string name,address wallet)"
        );
    }

    #[test]
    fn test_type_hash_mail() {
        let hash = type_hash(&mail_schema(), "Mail").unwrap();
        assert_eq!(
            hex::encode(hash),
            "a0cedeb2dc280ba39b857546d74f5549c3a1d7bdc2dd96bf881f76108e23dac2"
        );
    }

    #[test]
    fn test_dependencies_sorted_and_deduplicated() {
        let schema = TypeSchema::new()
            .with_type(
                "Order",
                vec![
                    TypedDataField::new("zone", "Zone"),
                    TypedDataField::new("items", "Item[]"),
                    TypedDataField::new("backup", "Item"),
                ],
            )
            .with_type(
                "Zone",
                vec![
                    TypedDataField::new("owner", "Account"),
                    TypedDataField::new("item", "Item"),
                ],
            )
            .with_type("Item", vec![TypedDataField::new("id", "uint256")])
            .with_type("Account", vec![TypedDataField::new("addr", "address")]);

        let encoded = encode_type(&schema, "Order").unwrap();
        assert_eq!(
            encoded,
            "Order(Zone zone,Item[] items,Item backup)\
             Account(address addr)\
             Item(uint256 id)\
             Zone(Account owner,Item item)"
        );
    }

    #[test]
    fn test_unknown_field_type() {
        let schema =
            TypeSchema::new().with_type("Mail", vec![TypedDataField::new("from", "Person")]);
        assert_eq!(
            encode_type(&schema, "Mail"),
            Err(Eip712Error::UnknownType("Person".to_string()))
        );
        assert_eq!(
            encode_type(&schema, "Ghost"),
            Err(Eip712Error::UnknownType("Ghost".to_string()))
        );
    }

    #[test]
    fn test_cycle_is_rejected() {
        let schema = TypeSchema::new()
            .with_type("A", vec![TypedDataField::new("b", "B")])
            .with_type("B", vec![TypedDataField::new("c", "C[]")])
            .with_type("C", vec![TypedDataField::new("a", "A")]);

        match encode_type(&schema, "A") {
            Err(Eip712Error::CyclicType(cycle)) => assert_eq!(cycle, "A -> B -> C -> A"),
            other => panic!("expected a cycle error, got {:?}", other),
        }
    }

    #[test]
    fn test_self_reference_is_rejected() {
        let schema = TypeSchema::new().with_type("Node", vec![TypedDataField::new("next", "Node")]);
        assert!(matches!(
            encode_type(&schema, "Node"),
            Err(Eip712Error::CyclicType(_))
        ));
    }

    #[test]
    fn test_shared_dependency_is_not_a_cycle() {
        let schema = TypeSchema::new()
            .with_type(
                "Pair",
                vec![
                    TypedDataField::new("left", "Leaf"),
                    TypedDataField::new("right", "Leaf"),
                ],
            )
            .with_type("Leaf", vec![TypedDataField::new("v", "bool")]);
        assert_eq!(
            encode_type(&schema, "Pair").unwrap(),
            "Pair(Leaf left,Leaf right)Leaf(bool v)"
        );
    }

    #[test]
    fn test_nested_struct_is_hashed_not_inlined() {
        let schema = mail_schema();
        let person = json!({
            "name": "Cow",
            "wallet": "0xCD2a3d9F938E13CD947Ec05AbC7FE734Df8DD826"
        });
        let word = encode_value(&schema, "Person", &person).unwrap();
        assert_eq!(word, hash_struct(&schema, "Person", &person).unwrap());
    }

    #[test]
    fn test_encode_data_layout() {
        let schema = mail_schema();
        let person = json!({
            "name": "Cow",
            "wallet": "0xCD2a3d9F938E13CD947Ec05AbC7FE734Df8DD826"
        });
        let encoded = encode_data(&schema, "Person", &person).unwrap();
        assert_eq!(encoded.len(), 96);
        assert_eq!(&encoded[..32], &type_hash(&schema, "Person").unwrap());
        assert_eq!(&encoded[32..64], &keccak256(b"Cow"));
        assert_eq!(encoded[76], 0xcd);
    }

    #[test]
    fn test_long_reference_chain() {
        let depth = 10_000;
        let mut schema = TypeSchema::new();
        for i in 0..depth {
            let next = TypedDataField::new("next", format!("T{}", i + 1));
            schema.insert(format!("T{}", i), vec![next]);
        }
        schema.insert(format!("T{}", depth), vec![TypedDataField::new("v", "uint256")]);

        let dependencies = collect_dependencies(&schema, "T0").unwrap();
        assert_eq!(dependencies.len(), depth);
        assert!(!dependencies.contains("T0"));

        let encoded = encode_type(&schema, "T0").unwrap();
        assert!(encoded.starts_with("T0(T1 next)T1(T2 next)T10(T11 next)T100(T101 next)"));
        assert!(encoded.contains("T10000(uint256 v)"));
        assert!(encoded.ends_with("T9999(T10000 next)"));
    }

    #[test]
    fn test_cycle_at_the_end_of_a_long_chain() {
        let depth = 10_000;
        let mut schema = TypeSchema::new();
        for i in 0..depth {
            let next = TypedDataField::new("next", format!("T{}", i + 1));
            schema.insert(format!("T{}", i), vec![next]);
        }
        let back = TypedDataField::new("back", "T5000[]");
        schema.insert(format!("T{}", depth), vec![back]);

        match encode_type(&schema, "T0") {
            Err(Eip712Error::CyclicType(cycle)) => {
                assert!(cycle.starts_with("T0 -> T1 -> "));
                assert!(cycle.ends_with(&format!("T{} -> T5000", depth)));
            }
            other => panic!("expected a cycle error, got {:?}", other),
        }
    }

    #[test]
    fn test_get_base_type() {
        assert_eq!(get_base_type("Person[]"), "Person");
        assert_eq!(get_base_type("uint256[10]"), "uint256");
        assert_eq!(get_base_type("address"), "address");
    }
}
