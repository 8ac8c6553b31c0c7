//! 快取值的序列化
//!
//! 值以位元組存入 Redis；鍵與雜湊欄位是純字串，不經過這裡。

use crate::config::types::CodecKind;
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

/// 序列化錯誤
#[derive(Error, Debug)]
pub enum CodecError {
    /// 序列化錯誤
    #[error("數據序列化錯誤 ({codec}): {message}")]
    Serialization { codec: &'static str, message: String },

    /// 反序列化錯誤
    #[error("數據反序列化錯誤 ({codec}): {message}")]
    Deserialization { codec: &'static str, message: String },
}

/// 值編解碼器
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Codec {
    /// serde_json，可讀且能被其他語言的客戶端解析
    #[default]
    Json,
    /// bincode 標準配置，體積較小；不支援 `serde_json::Value` 之類的自描述類型
    Bincode,
}

impl From<CodecKind> for Codec {
    fn from(kind: CodecKind) -> Self {
        match kind {
            CodecKind::Json => Codec::Json,
            CodecKind::Bincode => Codec::Bincode,
        }
    }
}

impl Codec {
    pub fn name(&self) -> &'static str {
        match self {
            Codec::Json => "json",
            Codec::Bincode => "bincode",
        }
    }

    /// 把值編碼為位元組
    pub fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>, CodecError> {
        let result = match self {
            Codec::Json => serde_json::to_vec(value).map_err(|e| e.to_string()),
            Codec::Bincode => bincode::serde::encode_to_vec(value, bincode::config::standard())
                .map_err(|e| e.to_string()),
        };
        result.map_err(|message| CodecError::Serialization {
            codec: self.name(),
            message,
        })
    }

    /// 從位元組解碼值
    pub fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T, CodecError> {
        let result = match self {
            Codec::Json => serde_json::from_slice(bytes).map_err(|e| e.to_string()),
            Codec::Bincode => {
                bincode::serde::decode_from_slice(bytes, bincode::config::standard())
                    .map(|(value, _)| value)
                    .map_err(|e| e.to_string())
            }
        };
        result.map_err(|message| CodecError::Deserialization {
            codec: self.name(),
            message,
        })
    }
}
