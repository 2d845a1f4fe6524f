//! Function and command codes, and the permission set a caller holds.
//!
//! A permission is a `(function, command)` pair. Function codes double as the
//! ids of the seeded rows in the `functions` table.

use std::collections::HashSet;

use strum::{AsRefStr, Display, EnumIter, EnumString};

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, AsRefStr, Display, EnumIter, EnumString,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum FunctionCode {
  Dashboard,
  Content,
  ContentCategory,
  ContentKnowledgebase,
  ContentComment,
  ContentReport,
  System,
  SystemUser,
  SystemRole,
  SystemFunction,
  SystemPermission,
}

impl FunctionCode {
  pub fn display_name(self) -> &'static str {
    match self {
      Self::Dashboard => "Dashboard",
      Self::Content => "Content",
      Self::ContentCategory => "Categories",
      Self::ContentKnowledgebase => "Knowledge bases",
      Self::ContentComment => "Comments",
      Self::ContentReport => "Reports",
      Self::System => "System",
      Self::SystemUser => "Users",
      Self::SystemRole => "Roles",
      Self::SystemFunction => "Functions",
      Self::SystemPermission => "Permissions",
    }
  }

  pub fn url(self) -> &'static str {
    match self {
      Self::Dashboard => "/",
      Self::Content => "/contents",
      Self::ContentCategory => "/contents/categories",
      Self::ContentKnowledgebase => "/contents/knowledge-bases",
      Self::ContentComment => "/contents/comments",
      Self::ContentReport => "/contents/reports",
      Self::System => "/systems",
      Self::SystemUser => "/systems/users",
      Self::SystemRole => "/systems/roles",
      Self::SystemFunction => "/systems/functions",
      Self::SystemPermission => "/systems/permissions",
    }
  }

  pub fn parent(self) -> Option<Self> {
    match self {
      Self::ContentCategory
      | Self::ContentKnowledgebase
      | Self::ContentComment
      | Self::ContentReport => Some(Self::Content),
      Self::SystemUser | Self::SystemRole | Self::SystemFunction | Self::SystemPermission => {
        Some(Self::System)
      }
      Self::Dashboard | Self::Content | Self::System => None,
    }
  }
}

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, AsRefStr, Display, EnumIter, EnumString,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum CommandCode {
  View,
  Create,
  Update,
  Delete,
  Approve,
}

impl CommandCode {
  pub fn display_name(self) -> &'static str {
    match self {
      Self::View => "View",
      Self::Create => "Create",
      Self::Update => "Update",
      Self::Delete => "Delete",
      Self::Approve => "Approve",
    }
  }
}

/// A capability that must be held before a handler runs.
///
/// Implemented by zero-sized marker types so the requirement is part of the
/// handler signature.
pub trait Capability: Send + Sync + 'static {
  const FUNCTION: FunctionCode;
  const COMMAND: CommandCode;
}

/// The `(function id, command id)` pairs granted to a user through roles.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PermissionSet(HashSet<(String, String)>);

impl PermissionSet {
  pub fn allows(&self, function: FunctionCode, command: CommandCode) -> bool {
    self
      .0
      .contains(&(function.as_ref().to_owned(), command.as_ref().to_owned()))
  }

  pub fn len(&self) -> usize { self.0.len() }

  pub fn is_empty(&self) -> bool { self.0.is_empty() }
}

impl FromIterator<(String, String)> for PermissionSet {
  fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
    Self(iter.into_iter().collect())
  }
}

#[cfg(test)]
mod tests {
  use std::str::FromStr;

  use super::*;

  #[test]
  fn codes_use_screaming_snake_case() {
    assert_eq!(FunctionCode::ContentKnowledgebase.as_ref(), "CONTENT_KNOWLEDGEBASE");
    assert_eq!(FunctionCode::SystemFunction.to_string(), "SYSTEM_FUNCTION");
    assert_eq!(CommandCode::from_str("DELETE").unwrap(), CommandCode::Delete);
  }

  #[test]
  fn permission_set_lookup() {
    let set: PermissionSet = [("CONTENT_COMMENT".to_string(), "VIEW".to_string())]
      .into_iter()
      .collect();
    assert!(set.allows(FunctionCode::ContentComment, CommandCode::View));
    assert!(!set.allows(FunctionCode::ContentComment, CommandCode::Delete));
    assert!(!set.allows(FunctionCode::ContentReport, CommandCode::View));
  }

  #[test]
  fn parents_are_top_level() {
    use strum::IntoEnumIterator;
    for code in FunctionCode::iter() {
      if let Some(parent) = code.parent() {
        assert!(parent.parent().is_none(), "{code} has a nested parent");
      }
    }
  }
}
