//! Credential CSV loading.
//!
//! The input has a header row naming at least `ip`, `username` and
//! `password`, then one device per row:
//!
//! ```text
//! ip,username,password
//! 192.168.0.2,super_user,MyPassw0rd!
//! 192.168.0.3,super_user,MyPassw0rd!
//! ```
//!
//! Loading is all-or-nothing: any bad row fails the whole file, since a
//! partially trusted device list is worse than none.

use std::collections::HashMap;
use std::fmt;
use std::fs::File;
use std::io;
use std::net::IpAddr;
use std::path::Path;

use secrecy::SecretString;

use crate::error::InputError;

const IP: &str = "ip";
const USERNAME: &str = "username";
const PASSWORD: &str = "password";

/// One device to onboard.
pub struct CredentialRecord {
    /// Management address of the device.
    pub ip: IpAddr,

    /// SSH login.
    pub username: String,

    /// SSH password. Never logged.
    pub password: SecretString,

    /// 1-based line in the source file.
    pub row: u64,
}

impl fmt::Debug for CredentialRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialRecord")
            .field("ip", &self.ip)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("row", &self.row)
            .finish()
    }
}

/// Positions of the required columns in the header.
struct Columns {
    ip: usize,
    username: usize,
    password: usize,
    width: usize,
}

impl Columns {
    fn locate(headers: &csv::StringRecord) -> Result<Self, InputError> {
        if headers.iter().all(|h| h.trim().is_empty()) {
            return Err(InputError::MalformedInput {
                message: format!("missing header row (expected {IP},{USERNAME},{PASSWORD})"),
            });
        }

        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(name))
        };

        match (find(IP), find(USERNAME), find(PASSWORD)) {
            (Some(ip), Some(username), Some(password)) => Ok(Self {
                ip,
                username,
                password,
                width: headers.len(),
            }),
            (ip, username, password) => {
                let missing: Vec<&str> = [(IP, ip), (USERNAME, username), (PASSWORD, password)]
                    .into_iter()
                    .filter(|(_, pos)| pos.is_none())
                    .map(|(name, _)| name)
                    .collect();
                Err(InputError::MalformedInput {
                    message: format!("missing required column(s): {}", missing.join(", ")),
                })
            }
        }
    }
}

/// Load credential records from a CSV file.
pub fn load_path(path: impl AsRef<Path>) -> Result<Vec<CredentialRecord>, InputError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| InputError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    load(file)
}

/// Load credential records from any CSV source, in file order.
pub fn load<R: io::Read>(source: R) -> Result<Vec<CredentialRecord>, InputError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(source);

    let headers = reader
        .headers()
        .map_err(|e| InputError::MalformedInput {
            message: format!("unreadable header: {e}"),
        })?
        .clone();
    let columns = Columns::locate(&headers)?;

    let mut records = Vec::new();
    let mut seen: HashMap<IpAddr, u64> = HashMap::new();

    for (idx, result) in reader.records().enumerate() {
        // Header is line 1
        let fallback_row = idx as u64 + 2;

        let row = result.map_err(|e| InputError::InvalidRow {
            row: e.position().map_or(fallback_row, |p| p.line()),
            message: e.to_string(),
        })?;
        let line = row.position().map_or(fallback_row, |p| p.line());

        let record = parse_row(&row, &columns, line)?;

        if let Some(first) = seen.insert(record.ip, line) {
            return Err(InputError::InvalidRow {
                row: line,
                message: format!("duplicate ip {} (first seen on row {first})", record.ip),
            });
        }

        records.push(record);
    }

    Ok(records)
}

fn parse_row(
    row: &csv::StringRecord,
    columns: &Columns,
    line: u64,
) -> Result<CredentialRecord, InputError> {
    if row.len() != columns.width {
        return Err(InputError::InvalidRow {
            row: line,
            message: format!("expected {} fields, found {}", columns.width, row.len()),
        });
    }

    // Passwords are kept verbatim; only blank detection ignores whitespace
    let field = |pos: usize, name: &str| -> Result<String, InputError> {
        match row.get(pos) {
            Some(value) if !value.trim().is_empty() => Ok(value.to_string()),
            _ => Err(InputError::InvalidRow {
                row: line,
                message: format!("empty {name}"),
            }),
        }
    };

    let ip_field = field(columns.ip, IP)?;
    let ip_text = ip_field.trim();
    let ip = ip_text.parse::<IpAddr>().map_err(|_| InputError::InvalidRow {
        row: line,
        message: format!("'{ip_text}' is not a valid IP address"),
    })?;

    Ok(CredentialRecord {
        ip,
        username: field(columns.username, USERNAME)?.trim().to_string(),
        password: SecretString::from(field(columns.password, PASSWORD)?),
        row: line,
    })
}
