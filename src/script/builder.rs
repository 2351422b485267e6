/*

    Script builder module.

*/

use super::Script;

#[derive(Debug, Clone, Default)]
pub struct Builder {
    pub code: Vec<u8>
}

impl Builder {
    /// Return a new instance of self
    pub fn new() -> Self  {
        Self { code: Vec::new() }
    }

    /// Push an opcode into self
    pub fn push_opcode(mut self, opcode: Opcode) -> Self {
        self.code.push(opcode.into_u8());
        self
    }

    //Push a slice into the code without a length prefix
    pub fn push_slice(mut self, slice: &[u8]) -> Self {
        self.code.extend_from_slice(slice);
        self
    }

    /**
        Push data onto the stack using the smallest push opcode for its length.
    */
    pub fn push_data(mut self, data: &[u8]) -> Self {
        let len = data.len();
        if len < opcodes::OP_PUSHDATA1.into_u8() as usize {
            self.code.push(len as u8);
        } else if len <= 0xff {
            self.code.push(opcodes::OP_PUSHDATA1.into_u8());
            self.code.push(len as u8);
        } else if len <= 0xffff {
            self.code.push(opcodes::OP_PUSHDATA2.into_u8());
            self.code.extend_from_slice(&(len as u16).to_le_bytes());
        } else {
            self.code.push(opcodes::OP_PUSHDATA4.into_u8());
            self.code.extend_from_slice(&(len as u32).to_le_bytes());
        }
        self.code.extend_from_slice(data);
        self
    }

    /// Push a small integer (0 to 16) as OP_0 or OP_1..OP_16
    pub fn push_int(self, n: u8) -> Self {
        self.push_opcode(Opcode::small_int(n))
    }

    /// Convert self into a script
    pub fn into_script(self) -> Script {
        Script::new(self.code)
    }
}


#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Opcode {
    code: u8
}

impl Opcode {
    pub fn into_u8(self) -> u8 {
        self.code
    }

    /// OP_0 for zero, OP_1 to OP_16 otherwise. Values above 16 saturate.
    pub fn small_int(n: u8) -> Self {
        match n {
            0 => opcodes::OP_0,
            n => Self { code: opcodes::OP_1.code + n.min(16) - 1 }
        }
    }

    /// Inverse of small_int
    pub fn to_small_int(self) -> Option<u8> {
        match self.code {
            0x00 => Some(0),
            c @ 0x51..=0x60 => Some(c - 0x50),
            _ => None
        }
    }
}

impl From<u8> for Opcode {
    fn from(code: u8) -> Self {
        Self { code }
    }
}

// Opcode constants
pub mod opcodes {
    use super::Opcode;

    /// Push an empty array onto the stack
    pub const OP_0: Opcode = Opcode {code: 0x00};
    /// Push the next 20 bytes as an array onto the stack
    pub const OP_PUSHBYTES_20: Opcode = Opcode {code: 0x14};
    /// Push the next 32 bytes as an array onto the stack
    pub const OP_PUSHBYTES_32: Opcode = Opcode {code: 0x20};
    /// Read the next byte as N and push the next N bytes
    pub const OP_PUSHDATA1: Opcode = Opcode {code: 0x4c};
    /// Read the next 2 bytes as N and push the next N bytes
    pub const OP_PUSHDATA2: Opcode = Opcode {code: 0x4d};
    /// Read the next 4 bytes as N and push the next N bytes
    pub const OP_PUSHDATA4: Opcode = Opcode {code: 0x4e};
    /// Push the number 1, also witness version 1
    pub const OP_1: Opcode = Opcode {code: 0x51};
    /// Push the number 16
    pub const OP_16: Opcode = Opcode {code: 0x60};
    /// Duplicate the top stack item
    pub const OP_DUP: Opcode = Opcode {code: 0x76};
    /// Pop two items and push 1 if they are equal
    pub const OP_EQUAL: Opcode = Opcode {code: 0x87};
    /// OP_EQUAL followed by OP_VERIFY
    pub const OP_EQUALVERIFY: Opcode = Opcode {code: 0x88};
    /// RIPEMD160(SHA256(top item))
    pub const OP_HASH160: Opcode = Opcode {code: 0xa9};
    /// Check a signature against a public key
    pub const OP_CHECKSIG: Opcode = Opcode {code: 0xac};
    /// Check m signatures against n public keys
    pub const OP_CHECKMULTISIG: Opcode = Opcode {code: 0xae};
}
