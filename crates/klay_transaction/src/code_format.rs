use core::fmt;

use alloy_rlp::{RlpDecodableWrapper, RlpEncodableWrapper};

/// The format of deployed contract code.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, RlpDecodableWrapper, RlpEncodableWrapper,
)]
pub struct CodeFormat(u8);

impl CodeFormat {
    /// EVM bytecode
    pub const EVM: CodeFormat = CodeFormat(0);

    /// Whether the format is supported. Only EVM bytecode is.
    pub fn is_valid(self) -> bool {
        self == Self::EVM
    }
}

impl From<u8> for CodeFormat {
    fn from(value: u8) -> Self {
        Self(value)
    }
}

impl From<CodeFormat> for u8 {
    fn from(value: CodeFormat) -> Self {
        value.0
    }
}

impl fmt::Display for CodeFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Self::EVM {
            f.write_str("CodeFormatEVM")
        } else {
            f.write_str("UndefinedCodeFormat")
        }
    }
}
