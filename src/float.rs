//! Floating point bound shared by every numeric type in the crate

use ndarray::ScalarOperand;
use num_traits::{FromPrimitive, NumAssignOps, NumCast};
use std::fmt;
use std::iter::Sum;
use std::str::FromStr;

/// Floating point numbers
///
/// This trait bound multiplexes to the most common assumption of floating point number and
/// implement them for 32bit and 64bit floating points. They are used in the observations of a
/// dataset and in every statistic derived from a fit. `FromStr` is required so that statistics
/// can be read back from a ledger.
pub trait Float:
    FromPrimitive
    + num_traits::Float
    + PartialOrd
    + Sync
    + Send
    + Default
    + fmt::Display
    + fmt::Debug
    + FromStr
    + Sum
    + NumAssignOps
    + ScalarOperand
    + approx::AbsDiffEq<Epsilon = Self>
    + 'static
{
    fn cast<T: NumCast>(x: T) -> Self {
        NumCast::from(x).unwrap()
    }
}

impl Float for f32 {}

impl Float for f64 {}
