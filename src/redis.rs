//! Redis快取外觀模組
//!
//! 此模組提供連接池管理、值編解碼，以及建立在其上的快取外觀：
//! 鍵值存取、雜湊欄位操作、鍵樣式掃描與過期時間控制。

pub mod codec;
pub mod keys;
pub mod metrics;
pub mod operations;
pub mod pool;

#[cfg(test)]
pub mod test_config;

pub use codec::{Codec, CodecError};
pub use keys::KeyNamespace;
pub use operations::*;
pub use pool::*;
