//! 鍵命名空間與 SCAN 樣式

/// 鍵命名空間
///
/// 所有鍵都以前綴存入 Redis；前綴為空時鍵原樣存放。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyNamespace {
    prefix: String,
}

impl KeyNamespace {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// 生成帶前綴的完整鍵
    pub fn key<K: AsRef<str>>(&self, key: K) -> String {
        let key = key.as_ref();
        let mut full = String::with_capacity(self.prefix.len() + key.len());
        full.push_str(&self.prefix);
        full.push_str(key);
        full
    }

    /// 去掉前綴；不屬於此命名空間的鍵返回 None
    pub fn strip<'a>(&self, full_key: &'a str) -> Option<&'a str> {
        full_key.strip_prefix(self.prefix.as_str())
    }

    /// 生成「名稱包含 `fragment`」的 SCAN MATCH 樣式
    ///
    /// `fragment` 視為字面子字串，其中的 glob 特殊字元會被轉義。
    pub fn contains_pattern(&self, fragment: &str) -> String {
        let mut pattern = escape_glob(&self.prefix);
        pattern.push('*');
        pattern.push_str(&escape_glob(fragment));
        if !fragment.is_empty() {
            pattern.push('*');
        }
        pattern
    }
}

/// 轉義 Redis glob 特殊字元 `* ? [ ] \`
pub fn escape_glob(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        if matches!(ch, '*' | '?' | '[' | ']' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}
