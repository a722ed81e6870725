//! Platform definitions.
//!
//! A platform describes a device family: its prompt patterns and privilege
//! levels, the output that signals a failed command, and vendor hooks for
//! cleaning up command output.

mod definition;
mod privilege_level;
pub mod vendors;

pub use definition::PlatformDefinition;
pub use privilege_level::PrivilegeLevel;

/// Trait for vendor-specific output handling.
pub trait VendorBehavior: Send + Sync {
    /// Normalize command output (strip command echo and trailing prompt).
    fn normalize_output(&self, raw: &str, command: &str) -> String {
        default_normalize(raw, command)
    }
}

/// Default vendor behavior.
pub struct DefaultBehavior;

impl VendorBehavior for DefaultBehavior {}

/// Strip the echoed command from the start and the prompt line from the end.
pub fn default_normalize(raw: &str, command: &str) -> String {
    let raw = raw.replace('\r', "");

    // The echo may be preceded by the remains of the previous prompt line
    let output = match raw.find(command) {
        Some(pos) if !command.is_empty() && !raw[..pos].contains('\n') => {
            &raw[pos + command.len()..]
        }
        _ => raw.as_str(),
    };
    let output = output.trim_start_matches('\n');

    match output.rfind('\n') {
        Some(pos) => output[..pos].to_string(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_normalize_strips_echo_and_prompt() {
        let raw = "show version\r\nModel: ex2300-c-12p\r\nJunos: 21.4R3\r\nadmin@ex2300> ";
        assert_eq!(
            default_normalize(raw, "show version"),
            "Model: ex2300-c-12p\nJunos: 21.4R3"
        );
    }

    #[test]
    fn test_default_normalize_no_output() {
        let raw = "set cli screen-length 0\r\nScreen length set to 0\r\n\r\nadmin@ex2300> ";
        assert_eq!(
            default_normalize(raw, "set cli screen-length 0"),
            "Screen length set to 0\n"
        );

        let raw = "configure\r\nadmin@ex2300# ";
        assert_eq!(default_normalize(raw, "configure"), "");
    }
}
