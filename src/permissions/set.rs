//! User/group/other permission sets
//!
//! Handles the two textual encodings of a Unix mode: the 3-digit octal
//! form (`"644"`) and the 9-character symbolic form (`"rw-r--r--"`).

use crate::error::{CopySpecError, Result};
use crate::permissions::PermissionValue;
use crate::properties::{PropertySource, PropertyVisitor};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Default mode for regular files when nothing else applies
pub const DEFAULT_FILE_MODE: u32 = 0o644;

/// Default mode for directories when nothing else applies
pub const DEFAULT_DIR_MODE: u32 = 0o755;

/// Platform default modes, injected wherever a fallback is needed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformModes {
    /// Mode for regular files
    pub file_mode: u32,
    /// Mode for directories
    pub dir_mode: u32,
}

impl Default for PlatformModes {
    fn default() -> Self {
        Self {
            file_mode: DEFAULT_FILE_MODE,
            dir_mode: DEFAULT_DIR_MODE,
        }
    }
}

impl PlatformModes {
    /// Default mode for an element of the given kind
    pub fn default_mode(&self, is_directory: bool) -> u32 {
        if is_directory {
            self.dir_mode
        } else {
            self.file_mode
        }
    }
}

/// Unix permissions for user, group and other
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionSet {
    user: PermissionValue,
    group: PermissionValue,
    other: PermissionValue,
}

impl PermissionSet {
    /// Build from a numeric mode in `0..=0o777`
    pub fn from_numeric(mode: u32) -> Result<Self> {
        check_mode(mode)?;
        Ok(Self {
            user: PermissionValue::from_numeric(user_digit(mode))?,
            group: PermissionValue::from_numeric(group_digit(mode))?,
            other: PermissionValue::from_numeric(other_digit(mode))?,
        })
    }

    /// Build from a 9-character symbolic mode
    pub fn from_symbolic(symbolic: &str) -> Result<Self> {
        let (user, group, other) = split_symbolic(symbolic)?;
        Ok(Self {
            user: PermissionValue::from_symbolic(user)?,
            group: PermissionValue::from_symbolic(group)?,
            other: PermissionValue::from_symbolic(other)?,
        })
    }

    /// Platform default for a file or directory
    pub fn default_for(is_directory: bool, modes: &PlatformModes) -> Result<Self> {
        Self::from_numeric(modes.default_mode(is_directory))
    }

    /// Build from either notation, see [`unix`](Self::unix)
    pub fn parse_unix(text: &str) -> Result<Self> {
        let mut set = Self::from_numeric(0)?;
        set.unix(text)?;
        Ok(set)
    }

    /// Overwrite from either notation
    ///
    /// The text is trimmed; 3 characters are read as octal, 9 as symbolic.
    /// Empty text stands for a missing value.
    pub fn unix(&mut self, text: &str) -> Result<()> {
        self.apply_unix(text).map_err(|cause| {
            let reason = match cause {
                CopySpecError::InvalidInput(reason) => reason,
                other => return other,
            };
            let shown = if text.is_empty() {
                "Empty".to_string()
            } else {
                format!("'{}'", text)
            };
            CopySpecError::invalid_input(format!(
                "{} isn't a proper Unix permission. {}",
                shown, reason
            ))
        })
    }

    fn apply_unix(&mut self, text: &str) -> Result<()> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(CopySpecError::invalid_input("A value must be specified."));
        }
        match trimmed.chars().count() {
            3 => self.set_numeric(parse_octal(trimmed)?),
            9 => self.set_symbolic(trimmed),
            _ => Err(CopySpecError::invalid_input(
                "Trimmed length must be either 3 (for numeric notation) or 9 (for symbolic notation).",
            )),
        }
    }

    /// Overwrite all triplets from a numeric mode
    pub fn set_numeric(&mut self, mode: u32) -> Result<()> {
        check_mode(mode)?;
        self.ensure_mutable()?;
        self.user.set_numeric(user_digit(mode))?;
        self.group.set_numeric(group_digit(mode))?;
        self.other.set_numeric(other_digit(mode))
    }

    /// Overwrite all triplets from a symbolic mode
    pub fn set_symbolic(&mut self, symbolic: &str) -> Result<()> {
        let (user, group, other) = split_symbolic(symbolic)?;
        // validate before touching anything
        let parsed = Self::from_symbolic(&format!("{}{}{}", user, group, other))?;
        self.ensure_mutable()?;
        self.user.set_numeric(parsed.user.digit())?;
        self.group.set_numeric(parsed.group.digit())?;
        self.other.set_numeric(parsed.other.digit())
    }

    /// Finalize every triplet and return `64*user + 8*group + other`
    pub fn to_numeric(&self) -> u32 {
        64 * self.user.to_numeric() + 8 * self.group.to_numeric() + self.other.to_numeric()
    }

    /// Nine-character symbolic form, without freezing
    pub fn to_symbolic(&self) -> String {
        format!(
            "{}{}{}",
            self.user.to_symbolic(),
            self.group.to_symbolic(),
            self.other.to_symbolic()
        )
    }

    /// Zero-padded three-digit octal form, without freezing
    pub fn to_octal_string(&self) -> String {
        format!(
            "{}{}{}",
            self.user.digit(),
            self.group.digit(),
            self.other.digit()
        )
    }

    /// Freeze without reading the numeric value
    pub fn freeze(&self) {
        self.user.freeze();
        self.group.freeze();
        self.other.freeze();
    }

    /// Whether any triplet has been finalized
    pub fn is_frozen(&self) -> bool {
        self.user.is_frozen() || self.group.is_frozen() || self.other.is_frozen()
    }

    /// User triplet
    pub fn user(&self) -> &PermissionValue {
        &self.user
    }

    /// Group triplet
    pub fn group(&self) -> &PermissionValue {
        &self.group
    }

    /// Other triplet
    pub fn other(&self) -> &PermissionValue {
        &self.other
    }

    /// Mutable user triplet
    pub fn user_mut(&mut self) -> &mut PermissionValue {
        &mut self.user
    }

    /// Mutable group triplet
    pub fn group_mut(&mut self) -> &mut PermissionValue {
        &mut self.group
    }

    /// Mutable other triplet
    pub fn other_mut(&mut self) -> &mut PermissionValue {
        &mut self.other
    }

    /// Apply the same configuration to user, group and other
    pub fn all<F>(&mut self, mut configure: F) -> Result<()>
    where
        F: FnMut(&mut PermissionValue) -> Result<()>,
    {
        configure(&mut self.user)?;
        configure(&mut self.group)?;
        configure(&mut self.other)
    }

    fn ensure_mutable(&self) -> Result<()> {
        if self.is_frozen() {
            return Err(CopySpecError::PermissionFrozen(format!(
                "permissions '{}' were already finalized and cannot be changed",
                self.to_symbolic()
            )));
        }
        Ok(())
    }
}

impl fmt::Display for PermissionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_symbolic())
    }
}

impl FromStr for PermissionSet {
    type Err = CopySpecError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse_unix(s)
    }
}

impl PropertySource for PermissionSet {
    fn visit_properties(&self, visitor: &mut dyn PropertyVisitor) {
        visitor.visit_nested("user", &self.user);
        visitor.visit_nested("group", &self.group);
        visitor.visit_nested("other", &self.other);
    }
}

fn check_mode(mode: u32) -> Result<()> {
    if mode > 0o777 {
        return Err(CopySpecError::invalid_input(format!(
            "{:o} is not a valid Unix permission, must be between 000 and 777.",
            mode
        )));
    }
    Ok(())
}

fn user_digit(mode: u32) -> u32 {
    (mode & 0o700) >> 6
}

fn group_digit(mode: u32) -> u32 {
    (mode & 0o070) >> 3
}

fn other_digit(mode: u32) -> u32 {
    mode & 0o007
}

fn parse_octal(text: &str) -> Result<u32> {
    if !text.chars().all(|c| ('0'..='7').contains(&c)) {
        return Err(CopySpecError::invalid_input("Can't be parsed as octal number."));
    }
    u32::from_str_radix(text, 8)
        .map_err(|_| CopySpecError::invalid_input("Can't be parsed as octal number."))
}

fn split_symbolic(symbolic: &str) -> Result<(&str, &str, &str)> {
    if symbolic.chars().count() != 9 || !symbolic.is_ascii() {
        return Err(CopySpecError::invalid_input(format!(
            "'{}' is not a valid symbolic Unix permission, must be exactly 9 characters.",
            symbolic
        )));
    }
    Ok((&symbolic[0..3], &symbolic[3..6], &symbolic[6..9]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_numeric_layout() {
        let set = PermissionSet::from_numeric(0o754).unwrap();
        assert_eq!(set.user().to_symbolic(), "rwx");
        assert_eq!(set.group().to_symbolic(), "r-x");
        assert_eq!(set.other().to_symbolic(), "r--");
        assert_eq!(set.to_numeric(), 0o754);
    }

    #[test]
    fn test_unix_numeric_and_symbolic_agree() {
        let expected = PermissionSet::from_numeric(0o644).unwrap();
        assert_eq!(PermissionSet::parse_unix("644").unwrap(), expected);
        assert_eq!(PermissionSet::parse_unix("rw-r--r--").unwrap(), expected);
        assert_eq!(PermissionSet::parse_unix("  644 ").unwrap(), expected);
        assert_eq!("rw-r--r--".parse::<PermissionSet>().unwrap(), expected);
    }

    #[test]
    fn test_unix_rejects_bad_text() {
        for bad in ["abc", "", "   ", "12", "1234", "rw-r--r-", "888", "+64", "rw-r--r-q"] {
            let err = PermissionSet::parse_unix(bad).unwrap_err();
            assert!(
                matches!(err, CopySpecError::InvalidInput(_)),
                "expected InvalidInput for {:?}",
                bad
            );
        }
    }

    #[test]
    fn test_unix_error_messages() {
        let err = PermissionSet::parse_unix("abc").unwrap_err().to_string();
        assert!(err.contains("'abc' isn't a proper Unix permission."));
        assert!(err.contains("octal"));

        let err = PermissionSet::parse_unix("").unwrap_err().to_string();
        assert!(err.contains("A value must be specified."));

        let err = PermissionSet::parse_unix("12").unwrap_err().to_string();
        assert!(err.contains("Trimmed length must be either 3"));

        let err = PermissionSet::parse_unix("rwxrwxrwz").unwrap_err().to_string();
        assert!(err.contains("EXECUTE"));
    }

    #[test]
    fn test_out_of_range_numeric() {
        assert!(PermissionSet::from_numeric(0o1000).is_err());
        assert!(PermissionSet::from_numeric(0o777).is_ok());
    }

    #[test]
    fn test_freeze_blocks_unix() {
        let mut set = PermissionSet::from_numeric(0o600).unwrap();
        set.unix("640").unwrap();
        assert_eq!(set.to_numeric(), 0o640);
        let err = set.unix("777").unwrap_err();
        assert!(matches!(err, CopySpecError::PermissionFrozen(_)));
        assert!(set.user_mut().set_execute(true).is_err());
        assert_eq!(set.to_numeric(), 0o640);
    }

    #[test]
    fn test_all_configurator() {
        let mut set = PermissionSet::from_numeric(0o644).unwrap();
        set.all(|value| value.set_execute(true)).unwrap();
        assert_eq!(set.to_numeric(), 0o755);
    }

    #[test]
    fn test_default_for_kind() {
        let modes = PlatformModes::default();
        assert_eq!(PermissionSet::default_for(true, &modes).unwrap().to_numeric(), 0o755);
        assert_eq!(PermissionSet::default_for(false, &modes).unwrap().to_numeric(), 0o644);

        let custom = PlatformModes {
            file_mode: 0o600,
            dir_mode: 0o700,
        };
        assert_eq!(PermissionSet::default_for(true, &custom).unwrap().to_numeric(), 0o700);
    }

    #[test]
    fn test_octal_string_is_padded() {
        let set = PermissionSet::from_numeric(0o7).unwrap();
        assert_eq!(set.to_octal_string(), "007");
        assert!(!set.is_frozen());
    }

    proptest! {
        #[test]
        fn prop_numeric_round_trip(mode in 0u32..=0o777) {
            prop_assert_eq!(PermissionSet::from_numeric(mode).unwrap().to_numeric(), mode);
        }

        #[test]
        fn prop_symbolic_round_trip(symbolic in "[r-][w-][x-][r-][w-][x-][r-][w-][x-]") {
            let set = PermissionSet::from_symbolic(&symbolic).unwrap();
            prop_assert_eq!(set.to_symbolic(), symbolic.clone());
            let reparsed = PermissionSet::parse_unix(&set.to_octal_string()).unwrap();
            prop_assert_eq!(reparsed.to_symbolic(), symbolic);
        }
    }
}
