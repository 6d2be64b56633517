//! A single read/write/execute triplet
//!
//! Each flag is a state-tagged cell. Reading the numeric digit freezes
//! all three flags; later mutation is rejected.

use crate::error::{CopySpecError, Result};
use crate::properties::{PropertySource, PropertyVisitor};
use std::cell::Cell;
use std::fmt;

/// State of one permission flag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlagCell {
    /// Never assigned
    #[default]
    Unset,
    /// Assigned and still mutable
    Set(bool),
    /// Finalized, no further mutation allowed
    Frozen(bool),
}

impl FlagCell {
    /// Current value; unset flags read as `false`
    pub fn value(self) -> bool {
        match self {
            Self::Unset => false,
            Self::Set(v) | Self::Frozen(v) => v,
        }
    }

    /// Value if the flag was ever assigned
    pub fn get(self) -> Option<bool> {
        match self {
            Self::Unset => None,
            Self::Set(v) | Self::Frozen(v) => Some(v),
        }
    }

    fn frozen(self) -> Self {
        Self::Frozen(self.value())
    }

    fn is_frozen(self) -> bool {
        matches!(self, Self::Frozen(_))
    }
}

/// Which slot of a triplet a flag occupies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionFlag {
    /// `r`, bit 2
    Read,
    /// `w`, bit 1
    Write,
    /// `x`, bit 0
    Execute,
}

impl PermissionFlag {
    const ALL: [PermissionFlag; 3] = [Self::Read, Self::Write, Self::Execute];

    fn symbol(self) -> char {
        match self {
            Self::Read => 'r',
            Self::Write => 'w',
            Self::Execute => 'x',
        }
    }

    fn bit(self) -> u32 {
        match self {
            Self::Read => 4,
            Self::Write => 2,
            Self::Execute => 1,
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::Read => "READ",
            Self::Write => "WRITE",
            Self::Execute => "EXECUTE",
        }
    }

    fn property_name(self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Write => "write",
            Self::Execute => "execute",
        }
    }

    fn parse(self, symbol: char) -> Result<bool> {
        if symbol == self.symbol() {
            Ok(true)
        } else if symbol == '-' {
            Ok(false)
        } else {
            Err(CopySpecError::invalid_input(format!(
                "'{}' is not a valid Unix permission {} flag, must be '{}' or '-'.",
                symbol,
                self.label(),
                self.symbol()
            )))
        }
    }
}

/// Read/write/execute permission for one of user, group or other
///
/// Flags live in [`Cell`]s so that [`to_numeric`](Self::to_numeric) can
/// freeze through a shared reference. This makes the type `!Sync`: a value
/// belongs to the single thread processing its copy detail.
#[derive(Debug, Clone, Default)]
pub struct PermissionValue {
    read: Cell<FlagCell>,
    write: Cell<FlagCell>,
    execute: Cell<FlagCell>,
}

impl PermissionValue {
    /// Build from a single octal digit (0-7)
    pub fn from_numeric(digit: u32) -> Result<Self> {
        let mut value = Self::default();
        value.set_numeric(digit)?;
        Ok(value)
    }

    /// Build from a 3-character `[r-][w-][x-]` string
    pub fn from_symbolic(symbolic: &str) -> Result<Self> {
        let mut value = Self::default();
        value.set_symbolic(symbolic)?;
        Ok(value)
    }

    /// Overwrite all three flags from an octal digit
    pub fn set_numeric(&mut self, digit: u32) -> Result<()> {
        if digit > 7 {
            return Err(CopySpecError::invalid_input(format!(
                "{} is not a valid Unix permission digit, must be between 0 and 7.",
                digit
            )));
        }
        self.ensure_mutable()?;
        for flag in PermissionFlag::ALL {
            self.cell(flag).set(FlagCell::Set(digit & flag.bit() != 0));
        }
        Ok(())
    }

    /// Overwrite all three flags from a symbolic triplet
    pub fn set_symbolic(&mut self, symbolic: &str) -> Result<()> {
        let chars: Vec<char> = symbolic.chars().collect();
        if chars.len() != 3 {
            return Err(CopySpecError::invalid_input(format!(
                "'{}' is not a valid Unix permission triplet, must be exactly 3 characters.",
                symbolic
            )));
        }
        // parse everything first so a bad slot leaves the value untouched
        let read = PermissionFlag::Read.parse(chars[0])?;
        let write = PermissionFlag::Write.parse(chars[1])?;
        let execute = PermissionFlag::Execute.parse(chars[2])?;
        self.ensure_mutable()?;
        self.read.set(FlagCell::Set(read));
        self.write.set(FlagCell::Set(write));
        self.execute.set(FlagCell::Set(execute));
        Ok(())
    }

    /// Set the read flag
    pub fn set_read(&mut self, value: bool) -> Result<()> {
        self.set_flag(PermissionFlag::Read, value)
    }

    /// Set the write flag
    pub fn set_write(&mut self, value: bool) -> Result<()> {
        self.set_flag(PermissionFlag::Write, value)
    }

    /// Set the execute flag
    pub fn set_execute(&mut self, value: bool) -> Result<()> {
        self.set_flag(PermissionFlag::Execute, value)
    }

    /// Read flag (unset reads as `false`)
    pub fn read(&self) -> bool {
        self.read.get().value()
    }

    /// Write flag (unset reads as `false`)
    pub fn write(&self) -> bool {
        self.write.get().value()
    }

    /// Execute flag (unset reads as `false`)
    pub fn execute(&self) -> bool {
        self.execute.get().value()
    }

    /// Raw state of one flag
    pub fn flag(&self, flag: PermissionFlag) -> FlagCell {
        self.cell(flag).get()
    }

    /// Finalize the flags and return the octal digit
    pub fn to_numeric(&self) -> u32 {
        self.freeze();
        self.digit()
    }

    /// Render as `[r-][w-][x-]` without freezing
    pub fn to_symbolic(&self) -> String {
        PermissionFlag::ALL
            .iter()
            .map(|&flag| {
                if self.flag(flag).value() {
                    flag.symbol()
                } else {
                    '-'
                }
            })
            .collect()
    }

    /// Lock all flags against further mutation
    pub fn freeze(&self) {
        for flag in PermissionFlag::ALL {
            let cell = self.cell(flag);
            cell.set(cell.get().frozen());
        }
    }

    /// Whether the value has been finalized
    pub fn is_frozen(&self) -> bool {
        PermissionFlag::ALL
            .iter()
            .any(|&flag| self.flag(flag).is_frozen())
    }

    pub(crate) fn digit(&self) -> u32 {
        PermissionFlag::ALL
            .iter()
            .filter(|&&flag| self.flag(flag).value())
            .map(|&flag| flag.bit())
            .sum()
    }

    fn cell(&self, flag: PermissionFlag) -> &Cell<FlagCell> {
        match flag {
            PermissionFlag::Read => &self.read,
            PermissionFlag::Write => &self.write,
            PermissionFlag::Execute => &self.execute,
        }
    }

    fn set_flag(&mut self, flag: PermissionFlag, value: bool) -> Result<()> {
        self.ensure_mutable()?;
        self.cell(flag).set(FlagCell::Set(value));
        Ok(())
    }

    fn ensure_mutable(&self) -> Result<()> {
        if self.is_frozen() {
            return Err(CopySpecError::PermissionFrozen(format!(
                "permission '{}' was already finalized and cannot be changed",
                self.to_symbolic()
            )));
        }
        Ok(())
    }
}

impl PartialEq for PermissionValue {
    fn eq(&self, other: &Self) -> bool {
        self.digit() == other.digit()
    }
}

impl Eq for PermissionValue {}

impl fmt::Display for PermissionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_symbolic())
    }
}

impl PropertySource for PermissionValue {
    fn visit_properties(&self, visitor: &mut dyn PropertyVisitor) {
        for flag in PermissionFlag::ALL {
            visitor.visit_leaf(flag.property_name(), self.flag(flag).get());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_numeric_bits() {
        let value = PermissionValue::from_numeric(5).unwrap();
        assert!(value.read());
        assert!(!value.write());
        assert!(value.execute());
        assert_eq!(value.to_symbolic(), "r-x");
    }

    #[test]
    fn test_numeric_round_trip_all_digits() {
        for digit in 0..=7 {
            assert_eq!(PermissionValue::from_numeric(digit).unwrap().to_numeric(), digit);
        }
    }

    #[test]
    fn test_digit_out_of_range() {
        assert!(matches!(
            PermissionValue::from_numeric(8),
            Err(CopySpecError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_symbolic_names_offending_slot() {
        let err = PermissionValue::from_symbolic("rwz").unwrap_err();
        let message = err.to_string();
        assert!(message.contains("EXECUTE"));
        assert!(message.contains("'x' or '-'"));

        let err = PermissionValue::from_symbolic("xw-").unwrap_err();
        assert!(err.to_string().contains("READ"));
    }

    #[test]
    fn test_symbolic_wrong_length() {
        assert!(PermissionValue::from_symbolic("rw").is_err());
        assert!(PermissionValue::from_symbolic("rwxr").is_err());
    }

    #[test]
    fn test_to_numeric_freezes() {
        let mut value = PermissionValue::from_numeric(6).unwrap();
        assert!(!value.is_frozen());
        value.set_execute(true).unwrap();
        assert_eq!(value.to_numeric(), 7);
        assert!(value.is_frozen());

        let err = value.set_write(false).unwrap_err();
        assert!(matches!(err, CopySpecError::PermissionFrozen(_)));
        assert!(value.set_numeric(0).is_err());
        assert_eq!(value.to_numeric(), 7);
    }

    #[test]
    fn test_to_symbolic_does_not_freeze() {
        let value = PermissionValue::from_numeric(4).unwrap();
        assert_eq!(value.to_symbolic(), "r--");
        assert!(!value.is_frozen());
    }

    #[test]
    fn test_unset_flags_freeze_as_false() {
        let mut value = PermissionValue::default();
        assert_eq!(value.flag(PermissionFlag::Read), FlagCell::Unset);
        value.set_read(true).unwrap();
        assert_eq!(value.to_numeric(), 4);
        assert_eq!(value.flag(PermissionFlag::Write), FlagCell::Frozen(false));
    }

    #[test]
    fn test_failed_symbolic_leaves_value_untouched() {
        let mut value = PermissionValue::from_numeric(7).unwrap();
        assert!(value.set_symbolic("r-q").is_err());
        assert_eq!(value.to_symbolic(), "rwx");
    }
}
