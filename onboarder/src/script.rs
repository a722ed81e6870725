//! Adoption script: the configuration lines pushed to every device.
//!
//! For Mist this is the outbound-ssh stanza the org hands out, which makes
//! the switch dial home once committed. The session client treats it as an
//! opaque ordered list.

use std::path::Path;

use crate::error::OnboardError;

/// Ordered configuration commands applied to each device.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdoptionScript {
    commands: Vec<String>,
}

impl AdoptionScript {
    /// Build a script from explicit commands, dropping blank ones.
    pub fn new<I, S>(commands: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            commands: commands
                .into_iter()
                .map(Into::into)
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty())
                .collect(),
        }
    }

    /// Split newline-separated text into commands.
    ///
    /// Lines starting with `#` are comments.
    pub fn from_text(text: &str) -> Self {
        Self::new(
            text.lines()
                .map(str::trim)
                .filter(|line| !line.starts_with('#')),
        )
    }

    /// Read a script file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, OnboardError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| OnboardError::ScriptFile {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_text(&text).non_empty()
    }

    /// Reject an empty script; committing nothing would adopt nothing.
    pub fn non_empty(self) -> Result<Self, OnboardError> {
        if self.commands.is_empty() {
            Err(OnboardError::EmptyScript)
        } else {
            Ok(self)
        }
    }

    /// The commands in order.
    pub fn commands(&self) -> &[String] {
        &self.commands
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_text_splits_and_trims() {
        let script = AdoptionScript::from_text(
            "set system services ssh protocol-version v2\r\n\
             \n\
             # comment\n\
             set system services outbound-ssh client mist device-id 5c5b35000001\n",
        );
        assert_eq!(
            script.commands(),
            &[
                "set system services ssh protocol-version v2".to_string(),
                "set system services outbound-ssh client mist device-id 5c5b35000001".to_string(),
            ]
        );
    }

    #[test]
    fn test_empty_script_rejected() {
        assert!(matches!(
            AdoptionScript::from_text("\n\n").non_empty(),
            Err(OnboardError::EmptyScript)
        ));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            AdoptionScript::from_file("/nonexistent/onboarder/commands.txt"),
            Err(OnboardError::ScriptFile { .. })
        ));
    }
}
