//! Juniper JUNOS platform definition.
//!
//! Privilege levels:
//! - `exec` - Operational mode with `>` prompt
//! - `configuration` - Configuration mode with `#` prompt
//! - `shell` - Unix shell with `%` or `$` prompt, where a `root` login lands
//!
//! # Prompt Examples
//!
//! ```text
//! admin@ex2300>              # exec mode
//! {master:0}                 # virtual chassis indicator (separate line)
//! admin@ex2300>              # exec prompt on next line
//! [edit]
//! admin@ex2300#              # configuration mode
//! root@ex2300:RE:0%          # shell after a root login
//! ```
//!
//! # Privilege Graph
//!
//! ```text
//! ┌───────┐  cli          ┌──────┐  configure   ┌───────────────┐
//! │ shell ├───────────────► exec ├──────────────► configuration │
//! │  %/$  │  start shell  │  >   │  exit conf.  │      #        │
//! └───────┘◄──────────────┴──────┘◄─────────────┴───────────────┘
//! ```

use std::sync::Arc;

use regex::Regex;

use crate::platform::{PlatformDefinition, PrivilegeLevel, VendorBehavior, default_normalize};

/// Platform name for Juniper JUNOS.
pub const PLATFORM_NAME: &str = "juniper_junos";

/// Operational command that lists the chassis serial number.
pub const SERIAL_COMMAND: &str = "show chassis hardware";

/// Create the Juniper JUNOS platform definition.
///
/// Every prompt pattern is anchored to the end of the text (`\z`) so a
/// prompt-like line in the middle of command output never ends a read.
pub fn platform() -> PlatformDefinition {
    // Exec (operational) mode - ">" prompt
    let exec = PrivilegeLevel::new("exec", r"(?m)^[\w\-@()/:\.]{1,63}>\s?\z").unwrap();

    // Configuration mode - "#" prompt
    let configuration = PrivilegeLevel::new("configuration", r"(?m)^[\w\-@()/:\.]{1,63}#\s?\z")
        .unwrap()
        .with_parent("exec")
        .with_escalate("configure")
        .with_deescalate("exit configuration-mode");

    // Unix shell - "%" or "$" prompt; leaving it for the CLI is `cli`
    let shell = PrivilegeLevel::new("shell", r"(?m)^[\w\-@()/:\.~]*[%$]\s?\z")
        .unwrap()
        .with_parent("exec")
        .with_escalate("start shell")
        .with_deescalate("cli");

    PlatformDefinition::new(PLATFORM_NAME)
        .with_privilege(exec)
        .with_privilege(configuration)
        .with_privilege(shell)
        .with_default_privilege("exec")
        .with_failure_pattern("unknown command")
        .with_failure_pattern("syntax error")
        .with_failure_pattern("error:")
        .with_failure_pattern("missing argument")
        .with_failure_pattern("is ambiguous")
        .with_failure_pattern("No valid completions")
        .with_failure_pattern("missing mandatory argument")
        .with_failure_pattern("invalid numeric value")
        .with_on_open_command("set cli screen-length 0")
        .with_on_open_command("set cli screen-width 511")
        .with_terminal_size(511, 24)
        .with_behavior(Arc::new(JuniperBehavior))
}

/// Juniper JUNOS-specific behavior.
pub struct JuniperBehavior;

impl VendorBehavior for JuniperBehavior {
    fn normalize_output(&self, raw: &str, command: &str) -> String {
        // Drop [edit ...] context and {master:0} chassis lines
        default_normalize(raw, command)
            .lines()
            .filter(|line| {
                let trimmed = line.trim();
                !trimmed.starts_with("[edit") && !is_chassis_indicator(trimmed)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn is_chassis_indicator(line: &str) -> bool {
    line.starts_with('{') && line.ends_with('}') && !line.contains(' ')
}

/// Extract the chassis serial number from `show chassis hardware` output.
///
/// ```text
/// Item             Version  Part number  Serial number     Description
/// Chassis                                JW3619260218      EX2300-C-12P
/// ```
///
/// On a virtual chassis the first `Chassis` line wins.
pub fn parse_chassis_serial(output: &str) -> Option<String> {
    let line = Regex::new(r"(?m)^Chassis\s+(\S+)").unwrap();
    line.captures(output)
        .and_then(|caps| caps.get(1))
        .map(|serial| serial.as_str().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_juniper_platform() {
        let platform = platform();
        assert_eq!(platform.name, "juniper_junos");
        assert_eq!(platform.privilege_levels.len(), 3);
        assert!(platform.privilege_levels.contains_key("exec"));
        assert!(platform.privilege_levels.contains_key("configuration"));
        assert!(platform.privilege_levels.contains_key("shell"));
        assert_eq!(platform.default_privilege, "exec");
    }

    #[test]
    fn test_exec_prompt_match() {
        let platform = platform();
        let exec = platform.privilege_levels.get("exec").unwrap();

        assert!(exec.pattern.is_match(b"admin@ex2300>"));
        assert!(exec.pattern.is_match(b"admin@ex2300> "));
        assert!(exec.pattern.is_match(b"super_user@sw-access-01.lab> "));
        assert!(exec.pattern.is_match(b"{master:0}\r\nadmin@ex2300> "));
        assert!(exec.pattern.is_match(b"some output\r\nadmin@ex2300> "));

        assert!(!exec.pattern.is_match(b"admin@ex2300# "));
        assert!(!exec.pattern.is_match(b"root@ex2300:RE:0% "));
        // Prompt-looking text followed by more output is not a prompt
        assert!(!exec.pattern.is_match(b"admin@ex2300> \r\nmore output"));
    }

    #[test]
    fn test_configuration_prompt_match() {
        let platform = platform();
        let config = platform.privilege_levels.get("configuration").unwrap();

        assert!(config.pattern.is_match(b"admin@ex2300#"));
        assert!(config.pattern.is_match(b"[edit]\r\nadmin@ex2300# "));
        assert!(config.pattern.is_match(b"{master:0}[edit]\r\nadmin@ex2300# "));

        assert!(!config.pattern.is_match(b"admin@ex2300> "));
    }

    #[test]
    fn test_shell_prompt_match() {
        let platform = platform();
        let shell = platform.privilege_levels.get("shell").unwrap();

        assert!(shell.pattern.is_match(b"root@ex2300:RE:0% "));
        assert!(shell.pattern.is_match(b"% "));
        assert!(shell.pattern.is_match(b"$ "));
        assert!(!shell.pattern.is_match(b"admin@ex2300> "));
    }

    #[test]
    fn test_combined_prompt_pattern() {
        let pattern = platform().combined_prompt_pattern().unwrap();
        assert!(pattern.is_match(b"\r\nadmin@ex2300> "));
        assert!(pattern.is_match(b"\r\n[edit]\r\nadmin@ex2300# "));
        assert!(pattern.is_match(b"\r\nroot@ex2300:RE:0% "));
        assert!(!pattern.is_match(b"Chassis  JW3619260218  EX2300-C-12P\r\n"));
    }

    #[test]
    fn test_privilege_graph() {
        let platform = platform();

        let exec = platform.privilege_levels.get("exec").unwrap();
        assert!(exec.previous_priv.is_none());

        let config = platform.privilege_levels.get("configuration").unwrap();
        assert_eq!(config.previous_priv, Some("exec".to_string()));
        assert_eq!(config.escalate_command, Some("configure".to_string()));
        assert_eq!(
            config.deescalate_command,
            Some("exit configuration-mode".to_string())
        );

        let shell = platform.privilege_levels.get("shell").unwrap();
        assert_eq!(shell.deescalate_command, Some("cli".to_string()));
    }

    #[test]
    fn test_normalize_output() {
        let behavior = JuniperBehavior;

        let raw = "set system host-name ex-01\r\n\r\n[edit]\r\nadmin@ex2300# ";
        assert_eq!(behavior.normalize_output(raw, "set system host-name ex-01"), "");

        let raw = "show chassis hardware\r\n{master:0}\r\nHardware inventory:\r\nadmin@ex2300> ";
        assert_eq!(
            behavior.normalize_output(raw, "show chassis hardware"),
            "Hardware inventory:"
        );
    }

    #[test]
    fn test_failed_when_contains() {
        let platform = platform();
        assert_eq!(
            platform.find_failure("                 ^\r\nsyntax error."),
            Some("syntax error")
        );
        assert_eq!(
            platform.find_failure("error: configuration check-out failed"),
            Some("error:")
        );
        assert_eq!(platform.find_failure("commit complete"), None);
    }

    #[test]
    fn test_parse_chassis_serial() {
        let output = "\
Hardware inventory:
Item             Version  Part number  Serial number     Description
Chassis                                JW3619260218      EX2300-C-12P
Routing Engine 0 REV 11   650-083836   JW3619260218      RE-EX2300-C-12P
FPC 0            REV 11   650-083836   JW3619260218      EX2300-C-12P";
        assert_eq!(parse_chassis_serial(output), Some("JW3619260218".to_string()));
    }

    #[test]
    fn test_parse_chassis_serial_missing() {
        assert_eq!(parse_chassis_serial("error: command is not valid"), None);
    }
}
