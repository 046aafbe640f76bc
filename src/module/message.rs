//! 模块间消息
//!
//! 由外部插件发来的消息，在加载完成后按加载顺序投递给模块。

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 外部插件发来的消息
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterModMessage {
    /// 发送方标识
    pub sender: String,
    /// 消息键
    pub key: String,
    /// 消息内容
    #[serde(default)]
    pub value: Value,
}

impl InterModMessage {
    /// 创建消息
    pub fn new(sender: impl Into<String>, key: impl Into<String>, value: Value) -> Self {
        Self {
            sender: sender.into(),
            key: key.into(),
            value,
        }
    }

    /// 值为字符串时返回其内容
    pub fn as_str(&self) -> Option<&str> {
        self.value.as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_message_from_json() {
        let message: InterModMessage =
            serde_json::from_value(json!({ "sender": "addon", "key": "blacklist" })).unwrap();
        assert_eq!(message.sender, "addon");
        assert!(message.value.is_null());
    }

    #[test]
    fn test_message_string_value() {
        let message = InterModMessage::new("addon", "register", json!("ore:copper"));
        assert_eq!(message.as_str(), Some("ore:copper"));
    }
}
