//! Accumulating input validation.
//!
//! Collects every violation instead of stopping at the first, so a client
//! gets the complete list in one round trip.

use crate::{Error, Result};

#[derive(Debug, Default)]
pub struct Violations(Vec<String>);

impl Violations {
  /// Record `"{field} is required"` when `value` is blank.
  pub fn require(&mut self, field: &str, value: &str) -> &mut Self {
    if value.trim().is_empty() {
      self.0.push(format!("{field} is required"));
    }
    self
  }

  /// Record `message` when `ok` is false.
  pub fn check(&mut self, ok: bool, message: impl Into<String>) -> &mut Self {
    if !ok {
      self.0.push(message.into());
    }
    self
  }

  pub fn finish(self) -> Result<()> {
    if self.0.is_empty() { Ok(()) } else { Err(Error::Validation(self.0)) }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn empty_is_ok() {
    assert!(Violations::default().finish().is_ok());
  }

  #[test]
  fn whitespace_counts_as_blank() {
    let mut v = Violations::default();
    v.require("Title", "   ").check(false, "Category is required");
    let Err(Error::Validation(messages)) = v.finish() else {
      panic!("expected a validation error");
    };
    assert_eq!(messages, ["Title is required", "Category is required"]);
  }
}
