//! EIP-712类型化数据的规范化
//! 托管后端要求载荷只包含从primaryType可达的类型子集，
//! 且必须带上完整的EIP712Domain类型定义

use std::collections::BTreeSet;

use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::error::ProviderError;

/// EIP712Domain成员的规范顺序
const DOMAIN_FIELDS: [(&str, &str); 5] = [
    ("name", "string"),
    ("version", "string"),
    ("chainId", "uint256"),
    ("verifyingContract", "address"),
    ("salt", "bytes32"),
];

/// eth_signTypedData载荷的外层结构
#[derive(Debug, Clone, Deserialize)]
pub struct TypedDataPayload {
    pub types: Map<String, Value>,
    pub domain: Map<String, Value>,
    #[serde(rename = "primaryType")]
    pub primary_type: String,
    pub message: Value,
}

/// 裸类型名：剥掉数组后缀，如 `Person[]` → `Person`
fn base_type(type_name: &str) -> &str {
    match type_name.find('[') {
        Some(idx) => &type_name[..idx],
        None => type_name,
    }
}

/// 从primaryType出发收集可达的自定义类型
fn reachable_types(
    types: &Map<String, Value>,
    primary_type: &str,
) -> Result<BTreeSet<String>, ProviderError> {
    let mut visited = BTreeSet::new();
    let mut stack = vec![primary_type.to_string()];

    while let Some(name) = stack.pop() {
        if !visited.insert(name.clone()) {
            continue;
        }
        let fields = types.get(&name).and_then(Value::as_array).ok_or_else(|| {
            ProviderError::new(format!("Typed data is missing type definition: {}", name))
        })?;
        for field in fields {
            let field_type = field
                .get("type")
                .and_then(Value::as_str)
                .ok_or_else(|| ProviderError::new("Typed data field has no type"))?;
            let base = base_type(field_type);
            if types.contains_key(base) && !visited.contains(base) {
                stack.push(base.to_string());
            }
        }
    }

    Ok(visited)
}

/// 构造托管后端期望的规范化载荷
/// 类型表裁剪到primaryType可达子集，并按domain中实际出现的字段
/// 以规范顺序合成EIP712Domain定义
pub fn canonicalize(payload: &TypedDataPayload) -> Result<Value, ProviderError> {
    let reachable = reachable_types(&payload.types, &payload.primary_type)?;

    let mut types = Map::new();
    let domain_members: Vec<Value> = DOMAIN_FIELDS
        .iter()
        .filter(|(name, _)| payload.domain.contains_key(*name))
        .map(|(name, type_name)| json!({ "name": name, "type": type_name }))
        .collect();
    types.insert("EIP712Domain".to_string(), Value::Array(domain_members));

    for name in &reachable {
        if name == "EIP712Domain" {
            continue;
        }
        if let Some(fields) = payload.types.get(name) {
            types.insert(name.clone(), fields.clone());
        }
    }

    Ok(json!({
        "types": types,
        "domain": payload.domain,
        "primaryType": payload.primary_type,
        "message": payload.message,
    }))
}

/// 方法参数中的类型化数据：JSON字符串或已解析的对象均可
pub fn parse_typed_data(raw: &Value) -> Result<TypedDataPayload, ProviderError> {
    let parsed = match raw {
        Value::String(s) => serde_json::from_str(s)
            .map_err(|e| ProviderError::new(format!("Invalid typed data: {}", e)))?,
        other => serde_json::from_value(other.clone())
            .map_err(|e| ProviderError::new(format!("Invalid typed data: {}", e)))?,
    };
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload() -> TypedDataPayload {
        parse_typed_data(&json!({
            "types": {
                "EIP712Domain": [
                    { "name": "version", "type": "string" },
                    { "name": "name", "type": "string" }
                ],
                "Mail": [
                    { "name": "from", "type": "Person" },
                    { "name": "to", "type": "Person[]" },
                    { "name": "contents", "type": "string" }
                ],
                "Person": [
                    { "name": "name", "type": "string" },
                    { "name": "wallet", "type": "address" }
                ],
                "Unused": [
                    { "name": "junk", "type": "uint256" }
                ]
            },
            "domain": {
                "name": "Mail Dapp",
                "version": "1",
                "chainId": 1,
                "verifyingContract": "0xCcCCccccCCCCcCCCCCCcCcCccCcCCCcCcccccccC"
            },
            "primaryType": "Mail",
            "message": { "contents": "hi" }
        }))
        .unwrap()
    }

    #[test]
    fn test_unreachable_types_are_dropped() {
        let canonical = canonicalize(&payload()).unwrap();
        let types = canonical["types"].as_object().unwrap();
        assert!(types.contains_key("Mail"));
        assert!(types.contains_key("Person"));
        assert!(!types.contains_key("Unused"));
    }

    #[test]
    fn test_array_member_types_are_reachable() {
        // Person只通过Person[]字段可达，也必须保留
        let canonical = canonicalize(&payload()).unwrap();
        assert!(canonical["types"]["Person"].is_array());
    }

    #[test]
    fn test_domain_members_follow_canonical_order() {
        let canonical = canonicalize(&payload()).unwrap();
        let members: Vec<&str> = canonical["types"]["EIP712Domain"]
            .as_array()
            .unwrap()
            .iter()
            .map(|m| m["name"].as_str().unwrap())
            .collect();
        // 载荷里原本version在name前，规范化后按固定顺序输出
        assert_eq!(members, vec!["name", "version", "chainId", "verifyingContract"]);
    }

    #[test]
    fn test_absent_domain_fields_are_omitted() {
        let mut p = payload();
        p.domain.remove("verifyingContract");
        let canonical = canonicalize(&p).unwrap();
        let members: Vec<&str> = canonical["types"]["EIP712Domain"]
            .as_array()
            .unwrap()
            .iter()
            .map(|m| m["name"].as_str().unwrap())
            .collect();
        assert_eq!(members, vec!["name", "version", "chainId"]);
    }

    #[test]
    fn test_accepts_json_string_input() {
        let raw = json!({
            "types": { "Ping": [] },
            "domain": {},
            "primaryType": "Ping",
            "message": {}
        });
        let as_string = Value::String(raw.to_string());
        let parsed = parse_typed_data(&as_string).unwrap();
        assert_eq!(parsed.primary_type, "Ping");
    }

    #[test]
    fn test_missing_type_definition_rejected() {
        let raw = json!({
            "types": {},
            "domain": {},
            "primaryType": "Ghost",
            "message": {}
        });
        let parsed = parse_typed_data(&raw).unwrap();
        let err = canonicalize(&parsed).unwrap_err();
        assert!(err.message.contains("Ghost"));
    }
}
