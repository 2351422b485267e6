/*
    This module helps with parsing deriveration paths passed in as strings
    or index lists into a vector of ChildOptions that can be used to derive a child key.
*/

use std::{fmt, str::FromStr};

use crate::hdwallet::{ChildOptions, HDWError};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Path {
    pub children: Vec<ChildOptions>,
}

impl Path {
    pub fn empty() -> Self {
        Self { children: vec![] }
    }

    pub fn from_indices(indices: &[u32]) -> Self {
        Self {
            children: indices.iter().map(|i| ChildOptions::from_index(*i)).collect(),
        }
    }

    /// Raw indices with the hardened bit folded in.
    pub fn to_indices(&self) -> Vec<u32> {
        self.children.iter().map(|c| c.index()).collect()
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }
}

impl FromStr for Path {
    type Err = HDWError;

    /**
        Parses "m/84h/0h/0h/0/0" style paths.
        Hardened segments end in h, H or '. The "m" prefix and a trailing slash are optional.
    */
    fn from_str(path: &str) -> Result<Self, Self::Err> {
        let trimmed = path.trim();
        let trimmed = trimmed.strip_suffix('/').unwrap_or(trimmed);
        let trimmed = match trimmed.strip_prefix('m') {
            Some(rest) => rest.strip_prefix('/').unwrap_or(rest),
            None => trimmed,
        };
        if trimmed.is_empty() {
            return Ok(Self::empty());
        }

        let mut children = vec![];
        for segment in trimmed.split('/') {
            let (number, hardened) = match segment.strip_suffix(&['h', 'H', '\''][..]) {
                Some(n) => (n, true),
                None => (segment, false),
            };
            let index: u32 = number.parse().map_err(|_| HDWError::BadPath(path.to_string()))?;
            if hardened && index >= super::ckd::HARDENED {
                return Err(HDWError::BadPath(path.to_string()));
            }

            children.push(if hardened {
                ChildOptions::Hardened(index)
            } else {
                ChildOptions::from_index(index)
            });
        }

        Ok(Self { children })
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "m")?;
        for child in &self.children {
            match ChildOptions::from_index(child.index()) {
                ChildOptions::Normal(x) => write!(f, "/{}", x)?,
                ChildOptions::Hardened(x) => write!(f, "/{}h", x)?,
            }
        }
        Ok(())
    }
}

/**
    Anything that can name a derivation path.
    Strings are parsed, index lists are taken as is.
*/
pub trait IntoPath {
    fn into_path(self) -> Result<Path, HDWError>;
}

impl IntoPath for &str {
    fn into_path(self) -> Result<Path, HDWError> {
        self.parse()
    }
}

impl IntoPath for &String {
    fn into_path(self) -> Result<Path, HDWError> {
        self.parse()
    }
}

impl IntoPath for &[u32] {
    fn into_path(self) -> Result<Path, HDWError> {
        Ok(Path::from_indices(self))
    }
}

impl<const N: usize> IntoPath for [u32; N] {
    fn into_path(self) -> Result<Path, HDWError> {
        Ok(Path::from_indices(&self))
    }
}

impl IntoPath for Vec<u32> {
    fn into_path(self) -> Result<Path, HDWError> {
        Ok(Path::from_indices(&self))
    }
}

impl IntoPath for Path {
    fn into_path(self) -> Result<Path, HDWError> {
        Ok(self)
    }
}

impl IntoPath for &Path {
    fn into_path(self) -> Result<Path, HDWError> {
        Ok(self.clone())
    }
}
