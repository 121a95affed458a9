//! The identifier of a storage node in the cluster.

use snafu::{OptionExt, ResultExt, Snafu};
use std::{
    fmt,
    num::{NonZeroU32, ParseIntError},
    str::FromStr,
};

/// Errors raised when constructing a [`NodeId`].
#[derive(Debug, Snafu)]
pub enum Error {
    /// Node ids start at 1; 0 is reserved as "unset".
    #[snafu(display("The node ID cannot be set to 0"))]
    ValueMayNotBeZero,

    /// The string form was not an unsigned integer.
    #[snafu(display("Could not parse {} as a non-zero 32-bit unsigned integer", value))]
    UnableToParse {
        /// The underlying integer parse error.
        source: ParseIntError,
        /// The offending input.
        value: String,
    },
}

/// The identifier of a storage node hosting tablet replicas.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(NonZeroU32);

impl NodeId {
    /// Wrap an already-validated non-zero id.
    pub fn new(id: NonZeroU32) -> Self {
        Self(id)
    }

    /// The id as a plain integer.
    pub fn get_u32(&self) -> u32 {
        self.0.get()
    }
}

impl FromStr for NodeId {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let id: u32 = value.parse().context(UnableToParseSnafu { value })?;
        Self::try_from(id)
    }
}

impl TryFrom<u32> for NodeId {
    type Error = Error;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        NonZeroU32::new(value)
            .map(Self)
            .context(ValueMayNotBeZeroSnafu)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
