use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

/// 一条抓取结果
///
/// 字段名集合由平台决定；值为字符串或 null，另可包含嵌套列表（posts / videos / comments）。
/// 始终包含 `link` 字段。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    fields: Map<String, JsonValue>,
}

impl Record {
    pub fn new(link: impl Into<String>) -> Self {
        let mut fields = Map::new();
        fields.insert("link".to_string(), JsonValue::String(link.into()));
        Self { fields }
    }

    pub fn link(&self) -> Option<&str> {
        self.fields.get("link").and_then(JsonValue::as_str)
    }

    /// 写入一个字符串字段，`None` 写为 null（键始终存在）
    pub fn set_field(&mut self, name: &str, value: Option<String>) {
        let value = value.map(JsonValue::String).unwrap_or(JsonValue::Null);
        self.fields.insert(name.to_string(), value);
    }

    /// 写入嵌套列表
    pub fn set_list(&mut self, name: &str, items: Vec<JsonValue>) {
        self.fields.insert(name.to_string(), JsonValue::Array(items));
    }

    /// 读取字符串字段（null 或缺失时为 `None`）
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(JsonValue::as_str)
    }

    pub fn get(&self, name: &str) -> Option<&JsonValue> {
        self.fields.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn into_value(self) -> JsonValue {
        JsonValue::Object(self.fields)
    }
}

impl From<Record> for JsonValue {
    fn from(record: Record) -> Self {
        record.into_value()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn missing_values_are_null_not_absent() {
        let mut record = Record::new("https://example.com");
        record.set_field("bio", None);
        assert!(record.contains("bio"));
        assert_eq!(record.get("bio"), Some(&JsonValue::Null));
        assert_eq!(record.field("bio"), None);
    }

    #[test]
    fn serializes_as_flat_object_with_link_first() {
        let mut record = Record::new("https://example.com/a");
        record.set_field("name", Some("Alice".to_string()));
        record.set_list("posts", vec![json!({"content": "hi"})]);
        let text = serde_json::to_string(&record).unwrap();
        assert_eq!(
            text,
            r#"{"link":"https://example.com/a","name":"Alice","posts":[{"content":"hi"}]}"#
        );
    }
}
