/*
    Key material registry items: coin info, key paths, plain EC keys
    and HD keys.
*/

use std::fmt;

use crate::{
    cbor::Value,
    encoding::{base58::Base58, VersionPrefix},
    hdwallet::{ChildOptions, HDKey, Path, Xpub, HARDENED},
    network::Network,
    urtypes::{
        fingerprint_from, fingerprint_value, required, untag, RegistryError, RegistryItem, RegistryType,
        CRYPTO_COIN_INFO, CRYPTO_ECKEY, CRYPTO_HDKEY, CRYPTO_KEYPATH,
    },
};

/// Coin and network a key is meant for. Zero is bitcoin mainnet on both counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CryptoCoinInfo {
    pub coin_type: u64,
    pub network: u64,
}

impl CryptoCoinInfo {
    pub fn bitcoin(network: Network) -> Self {
        let network = match network {
            Network::Mainnet => 0,
            _ => 1,
        };
        Self { coin_type: 0, network }
    }

    pub fn is_mainnet(&self) -> bool {
        self.network == 0
    }
}

impl RegistryItem for CryptoCoinInfo {
    const REGISTRY_TYPE: RegistryType = CRYPTO_COIN_INFO;

    fn to_value(&self) -> Value {
        let mut map = vec![];
        if self.coin_type != 0 {
            map.push((Value::Unsigned(1), Value::Unsigned(self.coin_type)));
        }
        if self.network != 0 {
            map.push((Value::Unsigned(2), Value::Unsigned(self.network)));
        }
        Value::Map(map)
    }

    fn from_value(value: &Value) -> Result<Self, RegistryError> {
        let value = untag(value, CRYPTO_COIN_INFO.tag)?;
        let coin_type = value.get(1)?.map(Value::as_u64).transpose()?.unwrap_or(0);
        let network = value.get(2)?.map(Value::as_u64).transpose()?.unwrap_or(0);
        Ok(Self { coin_type, network })
    }
}

/// One step of a key path. A wildcard stands for every index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathComponent {
    Index { index: u32, hardened: bool },
    Wildcard { hardened: bool },
}

impl PathComponent {
    /// Index without the hardened bit, which the flag carries instead.
    pub fn new(index: u32, hardened: bool) -> Result<Self, RegistryError> {
        if index & HARDENED != 0 {
            return Err(RegistryError::InvalidField(format!("path index {index:#x} has the top bit set")));
        }
        Ok(PathComponent::Index { index, hardened })
    }

    pub fn is_hardened(&self) -> bool {
        match self {
            PathComponent::Index { hardened, .. } | PathComponent::Wildcard { hardened } => *hardened,
        }
    }

    pub fn is_wildcard(&self) -> bool {
        matches!(self, PathComponent::Wildcard { .. })
    }
}

impl From<ChildOptions> for PathComponent {
    fn from(child: ChildOptions) -> Self {
        match child {
            ChildOptions::Normal(index) => PathComponent::Index { index, hardened: false },
            ChildOptions::Hardened(index) => PathComponent::Index { index, hardened: true },
        }
    }
}

impl fmt::Display for PathComponent {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            PathComponent::Index { index, .. } => write!(f, "{}", index)?,
            PathComponent::Wildcard { .. } => write!(f, "*")?,
        }
        if self.is_hardened() {
            write!(f, "'")?;
        }
        Ok(())
    }
}

/// A derivation path plus, optionally, the fingerprint of the key it starts from.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CryptoKeypath {
    pub components: Vec<PathComponent>,
    pub source_fingerprint: Option<[u8; 4]>,
    pub depth: Option<u8>,
}

impl CryptoKeypath {
    pub fn new(components: Vec<PathComponent>, source_fingerprint: Option<[u8; 4]>, depth: Option<u8>) -> Self {
        Self { components, source_fingerprint, depth }
    }

    pub fn from_path(path: &Path, source_fingerprint: Option<[u8; 4]>) -> Self {
        Self {
            components: path.children.iter().map(|c| PathComponent::from(*c)).collect(),
            source_fingerprint,
            depth: None,
        }
    }

    /// The concrete path, `None` when a component is a wildcard.
    pub fn to_path(&self) -> Option<Path> {
        let mut children = vec![];
        for component in &self.components {
            match component {
                PathComponent::Index { index, hardened: true } => children.push(ChildOptions::Hardened(*index)),
                PathComponent::Index { index, hardened: false } => children.push(ChildOptions::Normal(*index)),
                PathComponent::Wildcard { .. } => return None,
            }
        }
        Some(Path { children })
    }

    /// Descriptor form of the path: `84'/1'/0'`, empty for no components.
    pub fn path(&self) -> String {
        self.components.iter().map(|c| c.to_string()).collect::<Vec<_>>().join("/")
    }
}

impl RegistryItem for CryptoKeypath {
    const REGISTRY_TYPE: RegistryType = CRYPTO_KEYPATH;

    fn to_value(&self) -> Value {
        let mut components = vec![];
        for component in &self.components {
            match component {
                PathComponent::Index { index, .. } => components.push(Value::Unsigned(*index as u64)),
                PathComponent::Wildcard { .. } => components.push(Value::Array(vec![])),
            }
            components.push(Value::Bool(component.is_hardened()));
        }

        let mut map = vec![(Value::Unsigned(1), Value::Array(components))];
        if let Some(fp) = &self.source_fingerprint {
            map.push((Value::Unsigned(2), fingerprint_value(fp)));
        }
        if let Some(depth) = self.depth {
            map.push((Value::Unsigned(3), Value::Unsigned(depth as u64)));
        }
        Value::Map(map)
    }

    fn from_value(value: &Value) -> Result<Self, RegistryError> {
        let value = untag(value, CRYPTO_KEYPATH.tag)?;
        let items = required(value, 1, "crypto-keypath")?.as_array()?;
        if items.len() % 2 != 0 {
            return Err(RegistryError::InvalidField("key path components come in pairs".to_string()));
        }

        let mut components = vec![];
        for pair in items.chunks(2) {
            let hardened = pair[1].as_bool()?;
            components.push(match &pair[0] {
                Value::Array(_) => PathComponent::Wildcard { hardened },
                index => {
                    let index = index.as_u64()?;
                    let index = u32::try_from(index)
                        .map_err(|_| RegistryError::InvalidField(format!("path index {index} out of range")))?;
                    PathComponent::new(index, hardened)?
                }
            });
        }

        let source_fingerprint = value.get(2)?.map(fingerprint_from).transpose()?;
        let depth = match value.get(3)? {
            Some(d) => {
                let d = d.as_u64()?;
                Some(u8::try_from(d).map_err(|_| RegistryError::InvalidField(format!("depth {d} out of range")))?)
            }
            None => None,
        };
        Ok(Self { components, source_fingerprint, depth })
    }
}

/// A bare public or private key.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CryptoECKey {
    pub curve: Option<u64>,
    pub private: Option<bool>,
    pub data: Vec<u8>,
}

impl CryptoECKey {
    pub fn new(data: Vec<u8>) -> Self {
        Self { curve: None, private: None, data }
    }

    pub fn descriptor_key(&self) -> String {
        hex::encode(&self.data)
    }
}

impl RegistryItem for CryptoECKey {
    const REGISTRY_TYPE: RegistryType = CRYPTO_ECKEY;

    fn to_value(&self) -> Value {
        let mut map = vec![];
        if let Some(curve) = self.curve {
            map.push((Value::Unsigned(1), Value::Unsigned(curve)));
        }
        if let Some(private) = self.private {
            map.push((Value::Unsigned(2), Value::Bool(private)));
        }
        map.push((Value::Unsigned(3), Value::Bytes(self.data.clone())));
        Value::Map(map)
    }

    fn from_value(value: &Value) -> Result<Self, RegistryError> {
        let value = untag(value, CRYPTO_ECKEY.tag)?;
        Ok(Self {
            curve: value.get(1)?.map(Value::as_u64).transpose()?,
            private: value.get(2)?.map(Value::as_bool).transpose()?,
            data: required(value, 3, "crypto-eckey")?.as_bytes()?.to_vec(),
        })
    }
}

/**
    A node of a key tree together with where it came from and which
    of its children are meant.

    A master key only carries its key and chain code. Every other key
    may describe its origin path from the master, the children a
    descriptor derives below it, and the network it belongs to.
*/
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CryptoHDKey {
    pub master: bool,
    pub private: Option<bool>,
    pub key: Vec<u8>,
    pub chain_code: Option<[u8; 32]>,
    pub use_info: Option<CryptoCoinInfo>,
    pub origin: Option<CryptoKeypath>,
    pub children: Option<CryptoKeypath>,
    pub parent_fingerprint: Option<[u8; 4]>,
    pub name: Option<String>,
    pub note: Option<String>,
}

impl CryptoHDKey {
    /**
        Describes an account level public key. `origin` is the path from
        the master key whose fingerprint is `master_fingerprint`.
    */
    pub fn from_xpub(xpub: &Xpub, master_fingerprint: [u8; 4], origin: &Path, network: Network) -> Self {
        let mut origin = CryptoKeypath::from_path(origin, Some(master_fingerprint));
        origin.depth = Some(xpub.depth);
        Self {
            key: xpub.sec().to_vec(),
            chain_code: Some(xpub.chain_code()),
            use_info: Some(CryptoCoinInfo::bitcoin(network)),
            origin: Some(origin),
            parent_fingerprint: Some(xpub.parent_fingerprint),
            ..Default::default()
        }
    }

    pub fn with_children(mut self, children: CryptoKeypath) -> Self {
        self.children = Some(children);
        self
    }

    fn is_mainnet(&self) -> bool {
        self.use_info.map_or(true, |info| info.is_mainnet())
    }

    /**
        Rebuilds the Base58 extended key. With `include_derivation_path`
        the key is wrapped in its `[fingerprint/origin]` prefix and
        `/children` suffix the way descriptors write it.

        The prefix is left out when the origin is a single step whose
        source fingerprint already stands in as the parent fingerprint.
    */
    pub fn bip32_key(&self, include_derivation_path: bool) -> Result<String, RegistryError> {
        let key: Vec<u8> = match self.key.len() {
            33 => self.key.clone(),
            32 => [&[0u8][..], &self.key].concat(),
            n => return Err(RegistryError::InvalidField(format!("hd key of {n} bytes"))),
        };
        let private = self.master || self.private.unwrap_or(false);
        let version = match (private, self.is_mainnet()) {
            (true, true) => VersionPrefix::Xprv,
            (true, false) => VersionPrefix::Tprv,
            (false, true) => VersionPrefix::Xpub,
            (false, false) => VersionPrefix::Tpub,
        };

        let mut parent_fingerprint = [0u8; 4];
        let mut depth = 0u8;
        let mut index = 0u32;
        let mut source_is_parent = false;
        if !self.master {
            if let Some(fp) = self.parent_fingerprint {
                parent_fingerprint = fp;
            }
            if let Some(origin) = &self.origin {
                depth = origin.depth.unwrap_or(origin.components.len() as u8);
                if let Some(last) = origin.components.last() {
                    index = match last {
                        PathComponent::Index { index, .. } => *index,
                        PathComponent::Wildcard { .. } => 0,
                    };
                    if last.is_hardened() {
                        index |= HARDENED;
                    }
                    if let (None, Some(fp), 1) =
                        (self.parent_fingerprint, origin.source_fingerprint, origin.components.len())
                    {
                        parent_fingerprint = fp;
                        source_is_parent = true;
                    }
                }
            }
        }

        let mut payload = Vec::with_capacity(78);
        payload.extend_from_slice(&version.to_bytes());
        payload.push(depth);
        payload.extend_from_slice(&parent_fingerprint);
        payload.extend_from_slice(&index.to_be_bytes());
        payload.extend_from_slice(&self.chain_code.unwrap_or([0u8; 32]));
        payload.extend_from_slice(&key);
        let encoded = Base58::new(None, &payload).check_encode();
        if !include_derivation_path {
            return Ok(encoded);
        }

        let mut out = String::new();
        if let Some(origin) = &self.origin {
            if let (Some(fp), false, false) = (origin.source_fingerprint, origin.components.is_empty(), source_is_parent) {
                out.push_str(&format!("[{}/{}]", hex::encode(fp), origin.path()));
            }
        }
        out.push_str(&encoded);
        if let Some(children) = &self.children {
            if !children.components.is_empty() {
                out.push('/');
                out.push_str(&children.path());
            }
        }
        Ok(out)
    }

    pub fn descriptor_key(&self) -> Result<String, RegistryError> {
        self.bip32_key(true)
    }

    /// Parses the rebuilt extended key back into a key tree node.
    pub fn to_hdkey(&self) -> Result<HDKey, RegistryError> {
        Ok(self.bip32_key(false)?.parse()?)
    }
}

fn optional_text(value: &Value, key: u64) -> Result<Option<String>, RegistryError> {
    Ok(value.get(key)?.map(Value::as_text).transpose()?.map(str::to_string))
}

impl RegistryItem for CryptoHDKey {
    const REGISTRY_TYPE: RegistryType = CRYPTO_HDKEY;

    fn to_value(&self) -> Value {
        let mut map = vec![];
        let mut put = |key: u64, value: Value| map.push((Value::Unsigned(key), value));
        if self.master {
            put(1, Value::Bool(true));
            put(3, Value::Bytes(self.key.clone()));
            put(4, Value::Bytes(self.chain_code.unwrap_or([0u8; 32]).to_vec()));
            return Value::Map(map);
        }

        if let Some(private) = self.private {
            put(2, Value::Bool(private));
        }
        put(3, Value::Bytes(self.key.clone()));
        if let Some(chain_code) = &self.chain_code {
            put(4, Value::Bytes(chain_code.to_vec()));
        }
        if let Some(info) = &self.use_info {
            put(5, info.to_tagged_value());
        }
        if let Some(origin) = &self.origin {
            put(6, origin.to_tagged_value());
        }
        if let Some(children) = &self.children {
            put(7, children.to_tagged_value());
        }
        if let Some(fp) = &self.parent_fingerprint {
            put(8, fingerprint_value(fp));
        }
        if let Some(name) = &self.name {
            put(9, Value::Text(name.clone()));
        }
        if let Some(note) = &self.note {
            put(10, Value::Text(note.clone()));
        }
        Value::Map(map)
    }

    fn from_value(value: &Value) -> Result<Self, RegistryError> {
        let value = untag(value, CRYPTO_HDKEY.tag)?;
        let chain_code = match value.get(4)? {
            Some(c) => {
                let bytes = c.as_bytes()?;
                let chain_code: [u8; 32] = bytes
                    .try_into()
                    .map_err(|_| RegistryError::InvalidField(format!("chain code of {} bytes", bytes.len())))?;
                Some(chain_code)
            }
            None => None,
        };

        Ok(Self {
            master: value.get(1)?.map(Value::as_bool).transpose()?.unwrap_or(false),
            private: value.get(2)?.map(Value::as_bool).transpose()?,
            key: required(value, 3, "crypto-hdkey")?.as_bytes()?.to_vec(),
            chain_code,
            use_info: value.get(5)?.map(CryptoCoinInfo::from_value).transpose()?,
            origin: value.get(6)?.map(CryptoKeypath::from_value).transpose()?,
            children: value.get(7)?.map(CryptoKeypath::from_value).transpose()?,
            parent_fingerprint: value.get(8)?.map(fingerprint_from).transpose()?,
            name: optional_text(value, 9)?,
            note: optional_text(value, 10)?,
        })
    }
}
