/*
    Output descriptors and accounts.

    An output is a chain of script expressions wrapped around a key.
    On the wire every expression is a CBOR tag, outermost first, and
    the key sits under the innermost one:

        wpkh(hdkey)     -> 404(303({...}))
        wsh(multi(...)) -> 401(406({1: threshold, 2: [keys]}))
*/

use crate::{
    cbor::Value,
    urtypes::{
        checksum::add_checksum, fingerprint_from, fingerprint_value, keys::{CryptoECKey, CryptoHDKey}, required,
        untag, RegistryError, RegistryItem, RegistryType, CRYPTO_ACCOUNT, CRYPTO_ECKEY, CRYPTO_HDKEY,
        CRYPTO_OUTPUT,
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScriptExpression {
    Addr,
    Sh,
    Wsh,
    Pk,
    Pkh,
    Wpkh,
    Combo,
    Multi,
    SortedMulti,
    Raw,
    Tr,
    Cosigner,
}

impl ScriptExpression {
    pub fn tag(self) -> u64 {
        match self {
            ScriptExpression::Addr => 307,
            ScriptExpression::Sh => 400,
            ScriptExpression::Wsh => 401,
            ScriptExpression::Pk => 402,
            ScriptExpression::Pkh => 403,
            ScriptExpression::Wpkh => 404,
            ScriptExpression::Combo => 405,
            ScriptExpression::Multi => 406,
            ScriptExpression::SortedMulti => 407,
            ScriptExpression::Raw => 408,
            ScriptExpression::Tr => 409,
            ScriptExpression::Cosigner => 410,
        }
    }

    pub fn from_tag(tag: u64) -> Option<Self> {
        Some(match tag {
            307 => ScriptExpression::Addr,
            400 => ScriptExpression::Sh,
            401 => ScriptExpression::Wsh,
            402 => ScriptExpression::Pk,
            403 => ScriptExpression::Pkh,
            404 => ScriptExpression::Wpkh,
            405 => ScriptExpression::Combo,
            406 => ScriptExpression::Multi,
            407 => ScriptExpression::SortedMulti,
            408 => ScriptExpression::Raw,
            409 => ScriptExpression::Tr,
            410 => ScriptExpression::Cosigner,
            _ => return None,
        })
    }

    /// Name of the expression in descriptor text.
    pub fn expression(self) -> &'static str {
        match self {
            ScriptExpression::Addr => "addr",
            ScriptExpression::Sh => "sh",
            ScriptExpression::Wsh => "wsh",
            ScriptExpression::Pk => "pk",
            ScriptExpression::Pkh => "pkh",
            ScriptExpression::Wpkh => "wpkh",
            ScriptExpression::Combo => "combo",
            ScriptExpression::Multi => "multi",
            ScriptExpression::SortedMulti => "sortedmulti",
            ScriptExpression::Raw => "raw",
            ScriptExpression::Tr => "tr",
            ScriptExpression::Cosigner => "cosigner",
        }
    }

    pub fn is_multi(self) -> bool {
        matches!(self, ScriptExpression::Multi | ScriptExpression::SortedMulti)
    }
}

/**
    Keys of a multisig expression. Has no tag of its own, the multi or
    sortedmulti expression tags the map directly. Plain keys are listed
    before HD keys.
*/
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultiKey {
    pub threshold: u64,
    pub ec_keys: Vec<CryptoECKey>,
    pub hd_keys: Vec<CryptoHDKey>,
}

impl MultiKey {
    pub fn to_value(&self) -> Value {
        let keys = self
            .ec_keys
            .iter()
            .map(|k| k.to_tagged_value())
            .chain(self.hd_keys.iter().map(|k| k.to_tagged_value()))
            .collect();
        Value::Map(vec![
            (Value::Unsigned(1), Value::Unsigned(self.threshold)),
            (Value::Unsigned(2), Value::Array(keys)),
        ])
    }

    pub fn from_value(value: &Value) -> Result<Self, RegistryError> {
        let threshold = required(value, 1, "multi-key")?.as_u64()?;
        let mut ec_keys = vec![];
        let mut hd_keys = vec![];
        for key in required(value, 2, "multi-key")?.as_array()? {
            match key.as_tag()? {
                (tag, _) if tag == CRYPTO_HDKEY.tag => hd_keys.push(CryptoHDKey::from_value(key)?),
                (tag, _) if tag == CRYPTO_ECKEY.tag => ec_keys.push(CryptoECKey::from_value(key)?),
                (found, _) => return Err(RegistryError::UnexpectedTag { expected: CRYPTO_HDKEY.tag, found }),
            }
        }
        Ok(Self { threshold, ec_keys, hd_keys })
    }

    fn descriptor_keys(&self) -> Result<Vec<String>, RegistryError> {
        let mut keys: Vec<String> = self.ec_keys.iter().map(|k| k.descriptor_key()).collect();
        for key in &self.hd_keys {
            keys.push(key.descriptor_key()?);
        }
        Ok(keys)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputKey {
    EC(CryptoECKey),
    HD(CryptoHDKey),
    Multi(MultiKey),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CryptoOutput {
    pub script_expressions: Vec<ScriptExpression>,
    pub key: OutputKey,
}

impl CryptoOutput {
    pub fn new(script_expressions: Vec<ScriptExpression>, key: OutputKey) -> Self {
        Self { script_expressions, key }
    }

    pub fn hd_key(&self) -> Option<&CryptoHDKey> {
        match &self.key {
            OutputKey::HD(k) => Some(k),
            _ => None,
        }
    }

    pub fn ec_key(&self) -> Option<&CryptoECKey> {
        match &self.key {
            OutputKey::EC(k) => Some(k),
            _ => None,
        }
    }

    pub fn multi_key(&self) -> Option<&MultiKey> {
        match &self.key {
            OutputKey::Multi(k) => Some(k),
            _ => None,
        }
    }

    /// Descriptor text such as `wpkh([73c5da0a/84'/0'/0']xpub.../0/*)`.
    pub fn descriptor(&self, include_checksum: bool) -> Result<String, RegistryError> {
        let mut out = String::new();
        for expression in &self.script_expressions {
            out.push_str(expression.expression());
            out.push('(');
        }
        let keys = match &self.key {
            OutputKey::EC(k) => vec![k.descriptor_key()],
            OutputKey::HD(k) => vec![k.descriptor_key()?],
            OutputKey::Multi(m) => {
                out.push_str(&format!("{},", m.threshold));
                m.descriptor_keys()?
            }
        };
        out.push_str(&keys.join(","));
        out.push_str(&")".repeat(self.script_expressions.len()));

        if include_checksum {
            return add_checksum(&out);
        }
        Ok(out)
    }
}

impl RegistryItem for CryptoOutput {
    const REGISTRY_TYPE: RegistryType = CRYPTO_OUTPUT;

    fn to_value(&self) -> Value {
        let mut item = match &self.key {
            OutputKey::EC(k) => k.to_tagged_value(),
            OutputKey::HD(k) => k.to_tagged_value(),
            OutputKey::Multi(m) => m.to_value(),
        };
        for expression in self.script_expressions.iter().rev() {
            item = Value::Tag(expression.tag(), Box::new(item));
        }
        item
    }

    fn from_value(value: &Value) -> Result<Self, RegistryError> {
        //The expression tags stand in for the output tag, which is optional
        let mut item = match value {
            Value::Tag(tag, inner) if *tag == CRYPTO_OUTPUT.tag => &**inner,
            other => other,
        };
        let mut script_expressions = vec![];
        while let Value::Tag(tag, inner) = item {
            match ScriptExpression::from_tag(*tag) {
                Some(expression) => {
                    script_expressions.push(expression);
                    item = &**inner;
                }
                None => break,
            }
        }

        let key = match (script_expressions.last(), item) {
            (Some(last), _) if last.is_multi() => OutputKey::Multi(MultiKey::from_value(item)?),
            (_, Value::Tag(tag, _)) if *tag == CRYPTO_HDKEY.tag => OutputKey::HD(CryptoHDKey::from_value(item)?),
            (_, Value::Tag(tag, _)) if *tag == CRYPTO_ECKEY.tag => OutputKey::EC(CryptoECKey::from_value(item)?),
            (_, Value::Tag(tag, _)) => return Err(RegistryError::UnknownScriptExpression(*tag)),
            _ => OutputKey::EC(CryptoECKey::from_value(item)?),
        };
        Ok(Self { script_expressions, key })
    }
}

/// Output descriptors of one account, keyed by the master fingerprint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CryptoAccount {
    pub master_fingerprint: [u8; 4],
    pub outputs: Vec<CryptoOutput>,
}

impl RegistryItem for CryptoAccount {
    const REGISTRY_TYPE: RegistryType = CRYPTO_ACCOUNT;

    fn to_value(&self) -> Value {
        Value::Map(vec![
            (Value::Unsigned(1), fingerprint_value(&self.master_fingerprint)),
            (Value::Unsigned(2), Value::Array(self.outputs.iter().map(|o| o.to_value()).collect())),
        ])
    }

    fn from_value(value: &Value) -> Result<Self, RegistryError> {
        let value = untag(value, CRYPTO_ACCOUNT.tag)?;
        let master_fingerprint = fingerprint_from(required(value, 1, "crypto-account")?)?;
        let outputs = match value.get(2)? {
            Some(list) => list.as_array()?.iter().map(CryptoOutput::from_value).collect::<Result<_, _>>()?,
            None => vec![],
        };
        Ok(Self { master_fingerprint, outputs })
    }
}
