//! Node creation form with Preset and Custom tabs

use ztsan_pipeline::CreateOptions;
use ztsan_types::{
    AuthCredentials, BehaviorMetrics, CustomNodeSpec, DeviceInfo, DeviceType, HealthMetrics,
    NetworkInfo, NodeSpec, Preset, ThreatLevel,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormTab {
    Preset,
    Custom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Ip,
    Preset,
    Hostname,
    OsType,
    OsVersion,
    DeviceType,
    MacAddress,
    AntivirusActive,
    AntivirusUpdated,
    FirewallEnabled,
    OsPatched,
    DiskEncrypted,
    Port,
    ThreatLevel,
    FilesAccessed,
    DataTransferred,
    LoginAttempts,
    FailedAuthAttempts,
    Username,
    MfaEnabled,
    CalculateTrust,
}

const PRESET_FIELDS: &[Field] = &[Field::Ip, Field::Preset, Field::CalculateTrust];

const CUSTOM_FIELDS: &[Field] = &[
    Field::Ip,
    Field::Hostname,
    Field::OsType,
    Field::OsVersion,
    Field::DeviceType,
    Field::MacAddress,
    Field::AntivirusActive,
    Field::AntivirusUpdated,
    Field::FirewallEnabled,
    Field::OsPatched,
    Field::DiskEncrypted,
    Field::Port,
    Field::ThreatLevel,
    Field::FilesAccessed,
    Field::DataTransferred,
    Field::LoginAttempts,
    Field::FailedAuthAttempts,
    Field::Username,
    Field::MfaEnabled,
    Field::CalculateTrust,
];

enum FieldKind {
    Text,
    Digits,
    Toggle,
    Cycle,
}

impl Field {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Ip => "IP address",
            Self::Preset => "Preset",
            Self::Hostname => "Hostname",
            Self::OsType => "OS type",
            Self::OsVersion => "OS version",
            Self::DeviceType => "Device type",
            Self::MacAddress => "MAC address",
            Self::AntivirusActive => "Antivirus active",
            Self::AntivirusUpdated => "Antivirus updated",
            Self::FirewallEnabled => "Firewall enabled",
            Self::OsPatched => "OS patched",
            Self::DiskEncrypted => "Disk encrypted",
            Self::Port => "Port",
            Self::ThreatLevel => "Threat level",
            Self::FilesAccessed => "Files accessed",
            Self::DataTransferred => "Data transferred (MB)",
            Self::LoginAttempts => "Login attempts",
            Self::FailedAuthAttempts => "Failed auth attempts",
            Self::Username => "Username",
            Self::MfaEnabled => "MFA enabled",
            Self::CalculateTrust => "Calculate trust after create",
        }
    }

    fn kind(&self) -> FieldKind {
        match self {
            Self::Ip | Self::Hostname | Self::OsType | Self::OsVersion | Self::MacAddress
            | Self::Username => FieldKind::Text,
            Self::Port
            | Self::FilesAccessed
            | Self::DataTransferred
            | Self::LoginAttempts
            | Self::FailedAuthAttempts => FieldKind::Digits,
            Self::Preset | Self::DeviceType | Self::ThreatLevel => FieldKind::Cycle,
            Self::AntivirusActive
            | Self::AntivirusUpdated
            | Self::FirewallEnabled
            | Self::OsPatched
            | Self::DiskEncrypted
            | Self::MfaEnabled
            | Self::CalculateTrust => FieldKind::Toggle,
        }
    }
}

/// Editable form state
///
/// Numeric fields hold their raw text until [`NodeForm::build`].
#[derive(Debug, Clone)]
pub struct NodeForm {
    pub tab: FormTab,
    focus: usize,
    ip: String,
    preset: Preset,
    calculate_trust: bool,
    hostname: String,
    os_type: String,
    os_version: String,
    device_type: DeviceType,
    mac_address: String,
    health: HealthMetrics,
    port: String,
    threat_level: ThreatLevel,
    files_accessed: String,
    data_transferred: String,
    login_attempts: String,
    failed_auth_attempts: String,
    username: String,
    mfa_enabled: bool,
}

impl Default for NodeForm {
    fn default() -> Self {
        Self {
            tab: FormTab::Preset,
            focus: 0,
            ip: String::new(),
            preset: Preset::Healthy,
            calculate_trust: true,
            hostname: String::new(),
            os_type: String::new(),
            os_version: String::new(),
            device_type: DeviceType::Desktop,
            mac_address: String::new(),
            health: HealthMetrics::default(),
            port: String::new(),
            threat_level: ThreatLevel::None,
            files_accessed: "0".to_string(),
            data_transferred: "0".to_string(),
            login_attempts: "0".to_string(),
            failed_auth_attempts: "0".to_string(),
            username: String::new(),
            mfa_enabled: false,
        }
    }
}

impl NodeForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fields(&self) -> &'static [Field] {
        match self.tab {
            FormTab::Preset => PRESET_FIELDS,
            FormTab::Custom => CUSTOM_FIELDS,
        }
    }

    pub fn focused(&self) -> Field {
        let fields = self.fields();
        fields[self.focus.min(fields.len() - 1)]
    }

    /// Switch tabs; the IP and trust choice carry over
    pub fn switch_tab(&mut self) {
        self.tab = match self.tab {
            FormTab::Preset => FormTab::Custom,
            FormTab::Custom => FormTab::Preset,
        };
        self.focus = 0;
    }

    pub fn focus_next(&mut self) {
        self.focus = (self.focus + 1) % self.fields().len();
    }

    pub fn focus_prev(&mut self) {
        let len = self.fields().len();
        self.focus = (self.focus + len - 1) % len;
    }

    /// Type a character into the focused field
    ///
    /// Space toggles or cycles non-text fields; digit fields ignore anything
    /// that is not a digit.
    pub fn input(&mut self, c: char) {
        let field = self.focused();
        match field.kind() {
            FieldKind::Toggle | FieldKind::Cycle if c == ' ' => self.activate(),
            FieldKind::Toggle | FieldKind::Cycle => {}
            FieldKind::Digits if !c.is_ascii_digit() => {}
            FieldKind::Text if c.is_whitespace() => {}
            FieldKind::Text | FieldKind::Digits => {
                if let Some(text) = self.text_mut(field) {
                    text.push(c);
                }
            }
        }
    }

    pub fn backspace(&mut self) {
        let field = self.focused();
        if let Some(text) = self.text_mut(field) {
            text.pop();
        }
    }

    /// Toggle or cycle the focused field
    pub fn activate(&mut self) {
        match self.focused() {
            Field::Preset => self.preset = self.preset.next(),
            Field::DeviceType => self.device_type = self.device_type.next(),
            Field::ThreatLevel => self.threat_level = self.threat_level.next(),
            Field::AntivirusActive => flip(&mut self.health.antivirus_active),
            Field::AntivirusUpdated => flip(&mut self.health.antivirus_updated),
            Field::FirewallEnabled => flip(&mut self.health.firewall_enabled),
            Field::OsPatched => flip(&mut self.health.os_patched),
            Field::DiskEncrypted => flip(&mut self.health.disk_encrypted),
            Field::MfaEnabled => flip(&mut self.mfa_enabled),
            Field::CalculateTrust => flip(&mut self.calculate_trust),
            _ => {}
        }
    }

    /// Display value of a field
    pub fn value(&self, field: Field) -> String {
        match field {
            Field::Ip => self.ip.clone(),
            Field::Preset => self.preset.label().to_string(),
            Field::Hostname => self.hostname.clone(),
            Field::OsType => self.os_type.clone(),
            Field::OsVersion => self.os_version.clone(),
            Field::DeviceType => self.device_type.as_str().to_string(),
            Field::MacAddress => self.mac_address.clone(),
            Field::AntivirusActive => check(self.health.antivirus_active),
            Field::AntivirusUpdated => check(self.health.antivirus_updated),
            Field::FirewallEnabled => check(self.health.firewall_enabled),
            Field::OsPatched => check(self.health.os_patched),
            Field::DiskEncrypted => check(self.health.disk_encrypted),
            Field::Port => self.port.clone(),
            Field::ThreatLevel => self.threat_level.as_str().to_string(),
            Field::FilesAccessed => self.files_accessed.clone(),
            Field::DataTransferred => self.data_transferred.clone(),
            Field::LoginAttempts => self.login_attempts.clone(),
            Field::FailedAuthAttempts => self.failed_auth_attempts.clone(),
            Field::Username => self.username.clone(),
            Field::MfaEnabled => check(self.mfa_enabled),
            Field::CalculateTrust => check(self.calculate_trust),
        }
    }

    /// Payload for the active tab
    ///
    /// IP validation is left to the dispatcher; this only rejects numbers
    /// that do not fit their field.
    pub fn build(&self) -> Result<(NodeSpec, CreateOptions), String> {
        let options = CreateOptions {
            calculate_trust: self.calculate_trust,
        };
        let ip = self.ip.trim().to_string();

        let spec = match self.tab {
            FormTab::Preset => NodeSpec::preset(ip, self.preset),
            FormTab::Custom => CustomNodeSpec {
                ip,
                device_info: Some(DeviceInfo {
                    os_type: or_unknown(&self.os_type),
                    os_version: or_unknown(&self.os_version),
                    device_type: self.device_type,
                    hostname: non_empty(&self.hostname),
                    mac_address: non_empty(&self.mac_address),
                }),
                health_metrics: Some(self.health),
                network_info: Some(NetworkInfo {
                    port: parse_optional(Field::Port, &self.port)?,
                    threat_level: self.threat_level,
                }),
                behavior_metrics: Some(BehaviorMetrics {
                    files_accessed: parse_number(Field::FilesAccessed, &self.files_accessed)?,
                    data_transferred: parse_number(Field::DataTransferred, &self.data_transferred)?,
                    login_attempts: parse_number(Field::LoginAttempts, &self.login_attempts)?,
                    failed_auth_attempts: parse_number(
                        Field::FailedAuthAttempts,
                        &self.failed_auth_attempts,
                    )?,
                }),
                auth_credentials: Some(AuthCredentials {
                    username: non_empty(&self.username),
                    mfa_enabled: self.mfa_enabled,
                }),
            }
            .into(),
        };
        Ok((spec, options))
    }

    fn text_mut(&mut self, field: Field) -> Option<&mut String> {
        match field {
            Field::Ip => Some(&mut self.ip),
            Field::Hostname => Some(&mut self.hostname),
            Field::OsType => Some(&mut self.os_type),
            Field::OsVersion => Some(&mut self.os_version),
            Field::MacAddress => Some(&mut self.mac_address),
            Field::Port => Some(&mut self.port),
            Field::FilesAccessed => Some(&mut self.files_accessed),
            Field::DataTransferred => Some(&mut self.data_transferred),
            Field::LoginAttempts => Some(&mut self.login_attempts),
            Field::FailedAuthAttempts => Some(&mut self.failed_auth_attempts),
            Field::Username => Some(&mut self.username),
            _ => None,
        }
    }
}

fn flip(value: &mut bool) {
    *value = !*value;
}

fn check(value: bool) -> String {
    let mark = if value { "[x]" } else { "[ ]" };
    mark.to_string()
}

fn non_empty(text: &str) -> Option<String> {
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn or_unknown(text: &str) -> String {
    non_empty(text).unwrap_or_else(|| "unknown".to_string())
}

fn parse_number<T: std::str::FromStr + Default>(field: Field, text: &str) -> Result<T, String> {
    match text.trim() {
        "" => Ok(T::default()),
        raw => raw
            .parse()
            .map_err(|_| format!("{} is out of range", field.label())),
    }
}

fn parse_optional<T: std::str::FromStr + Default>(field: Field, text: &str) -> Result<Option<T>, String> {
    if text.trim().is_empty() {
        return Ok(None);
    }
    parse_number(field, text).map(Some)
}
