use anyhow::{anyhow, Result};
use itertools::{Itertools, Position};

pub mod id_gen;

// Inspired by the version in sqlparser-rs; surprising there isn't one in the
// stdlib / Itertools.
/// Returns the only element of an Iterator, or an error if it has more than one element.
pub trait IntoOnly
where
    Self: IntoIterator,
{
    fn into_only(self) -> Result<Self::Item>;
}

impl<T, I> IntoOnly for I
where
    I: IntoIterator<Item = T>,
{
    fn into_only(self) -> Result<T> {
        match self.into_iter().with_position().next() {
            Some((Position::Only, item)) => Ok(item),
            Some((Position::First, _)) => Err(anyhow!("expected only one element, but found more")),
            None => Err(anyhow!("expected one element, but found none")),
            _ => unreachable!(),
        }
    }
}
