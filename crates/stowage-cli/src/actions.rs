//! Action identifiers accepted by the action API

use crate::error::ApiError;
use std::str::FromStr;
use strum::{AsRefStr, Display, EnumIter, EnumString};

/// Operations selectable through `?action=`
#[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr, Display, EnumIter, EnumString)]
#[strum(serialize_all = "camelCase")]
pub enum Action {
    GetDefaultConfig,
    TestConnection,
    List,
    CreateFolder,
    GetUploadUrl,
    GetDownloadUrl,
    Delete,
    DeleteFolder,
}

impl Action {
    /// Parse the `action` query parameter
    pub fn parse(value: Option<&str>) -> Result<Self, ApiError> {
        let value = value.unwrap_or_default();
        Self::from_str(value).map_err(|_| ApiError::InvalidAction(value.to_string()))
    }

    /// Whether the action talks to the backend
    pub fn needs_backend(&self) -> bool {
        !matches!(self, Self::GetDefaultConfig)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use strum::IntoEnumIterator;

    #[rstest]
    #[case("getDefaultConfig", Action::GetDefaultConfig)]
    #[case("testConnection", Action::TestConnection)]
    #[case("list", Action::List)]
    #[case("createFolder", Action::CreateFolder)]
    #[case("getUploadUrl", Action::GetUploadUrl)]
    #[case("getDownloadUrl", Action::GetDownloadUrl)]
    #[case("delete", Action::Delete)]
    #[case("deleteFolder", Action::DeleteFolder)]
    fn test_parse(#[case] raw: &str, #[case] expected: Action) {
        assert_eq!(Action::parse(Some(raw)).unwrap(), expected);
        assert_eq!(expected.to_string(), raw);
    }

    #[rstest]
    #[case(None)]
    #[case(Some(""))]
    #[case(Some("List"))]
    #[case(Some("upload"))]
    fn test_invalid(#[case] raw: Option<&str>) {
        assert!(matches!(Action::parse(raw), Err(ApiError::InvalidAction(_))));
    }

    #[test]
    fn test_only_default_config_skips_backend() {
        let local: Vec<Action> = Action::iter().filter(|a| !a.needs_backend()).collect();
        assert_eq!(local, vec![Action::GetDefaultConfig]);
    }
}
