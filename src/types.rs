//! Audit record types for the a3s-audit pipeline
//!
//! All types use camelCase JSON serialization for wire compatibility.
//! Each record maps onto one relational table (see [`LogKind::table_name`]).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Tenant assigned when a producer does not know the caller's tenant
pub const DEFAULT_TENANT_ID: &str = "1";

/// The four kinds of audit record the pipeline carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogKind {
    Operation,
    DataChange,
    Login,
    Access,
}

impl LogKind {
    /// All kinds, in declaration order
    pub const ALL: [LogKind; 4] = [
        LogKind::Operation,
        LogKind::DataChange,
        LogKind::Login,
        LogKind::Access,
    ];

    /// Short identifier used in diagnostics
    pub fn as_str(&self) -> &'static str {
        match self {
            LogKind::Operation => "operation",
            LogKind::DataChange => "data_change",
            LogKind::Login => "login",
            LogKind::Access => "access",
        }
    }

    /// Relational table the kind is persisted into
    pub fn table_name(&self) -> &'static str {
        match self {
            LogKind::Operation => "sys_operation_log",
            LogKind::DataChange => "sys_data_change_log",
            LogKind::Login => "sys_login_log",
            LogKind::Access => "sys_access_log",
        }
    }
}

impl fmt::Display for LogKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Client metadata extracted from an incoming request
///
/// Shared by operation and login records so both can be analysed the same way.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientInfo {
    pub ip: String,
    pub user_agent: String,
    pub browser: String,
    pub browser_version: String,
    pub os: String,
    pub os_version: String,
    pub device_type: String,
    pub language: String,
    pub platform: String,
}

/// One audited API operation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationLog {
    /// Trace id, also the record's primary key
    pub trace_id: String,
    pub user_id: String,
    pub user_account: String,
    pub tenant_id: String,

    pub method: String,
    pub path: String,
    pub status: u16,
    /// Request latency in milliseconds
    pub latency_ms: u64,

    pub client_ip: String,
    pub user_agent: String,
    pub browser: String,
    pub browser_version: String,
    pub os: String,
    pub os_version: String,
    pub device_type: String,
    pub language: String,
    pub platform: String,

    pub error_message: String,
    /// Module that produced the record
    pub source: String,
    pub remark: String,
    pub create_at: DateTime<Utc>,
}

impl OperationLog {
    /// Create an operation record stamped with the current time
    ///
    /// An empty `tenant_id` falls back to [`DEFAULT_TENANT_ID`].
    pub fn new(
        trace_id: impl Into<String>,
        user_id: impl Into<String>,
        tenant_id: impl Into<String>,
        method: impl Into<String>,
        path: impl Into<String>,
        status: u16,
        latency_ms: u64,
    ) -> Self {
        Self {
            trace_id: trace_id.into(),
            user_id: user_id.into(),
            tenant_id: tenant_or_default(tenant_id.into()),
            method: method.into(),
            path: path.into(),
            status,
            latency_ms,
            create_at: Utc::now(),
            ..Default::default()
        }
    }

    /// Copy client metadata into the record
    pub fn with_client(mut self, client: &ClientInfo) -> Self {
        self.client_ip = client.ip.clone();
        self.user_agent = client.user_agent.clone();
        self.browser = client.browser.clone();
        self.browser_version = client.browser_version.clone();
        self.os = client.os.clone();
        self.os_version = client.os_version.clone();
        self.device_type = client.device_type.clone();
        self.language = client.language.clone();
        self.platform = client.platform.clone();
        self
    }

    pub fn with_user_account(mut self, account: impl Into<String>) -> Self {
        self.user_account = account.into();
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    pub fn with_error(mut self, message: impl Into<String>) -> Self {
        self.error_message = message.into();
        self
    }

    pub fn with_remark(mut self, remark: impl Into<String>) -> Self {
        self.remark = remark.into();
        self
    }

    /// Whether the audited request failed (HTTP status >= 400)
    pub fn is_error(&self) -> bool {
        self.status >= 400
    }
}

/// Action recorded by a data change log
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DataAction {
    #[default]
    Create,
    Update,
    Delete,
}

/// Before/after images of one changed record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataChangeLog {
    /// Unique record identifier (dcl-<uuid>)
    pub id: String,
    /// Links the change to its operation log
    pub trace_id: String,
    pub model_id: String,
    pub record_id: String,
    pub action: DataAction,
    /// Serialized JSON image before the change (empty on create)
    pub before_data: String,
    /// Serialized JSON image after the change (empty on delete)
    pub after_data: String,
    pub create_by: String,
    pub source: String,
    pub remark: String,
    pub create_at: DateTime<Utc>,
}

impl DataChangeLog {
    /// Create a data change record with auto-generated id and timestamp
    pub fn new(
        trace_id: impl Into<String>,
        model_id: impl Into<String>,
        record_id: impl Into<String>,
        action: DataAction,
        create_by: impl Into<String>,
    ) -> Self {
        Self {
            id: format!("dcl-{}", uuid::Uuid::new_v4()),
            trace_id: trace_id.into(),
            model_id: model_id.into(),
            record_id: record_id.into(),
            action,
            create_by: create_by.into(),
            create_at: Utc::now(),
            ..Default::default()
        }
    }

    /// Attach before/after images; `Value::Null` leaves the side empty
    pub fn with_images(mut self, before: serde_json::Value, after: serde_json::Value) -> Self {
        self.before_data = image_string(before);
        self.after_data = image_string(after);
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    pub fn with_remark(mut self, remark: impl Into<String>) -> Self {
        self.remark = remark.into();
        self
    }
}

fn image_string(value: serde_json::Value) -> String {
    if value.is_null() {
        String::new()
    } else {
        value.to_string()
    }
}

/// Outcome of a login attempt
///
/// Stored as a small integer code in relational sinks (see [`LoginStatus::code`]).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoginStatus {
    #[default]
    Fail,
    Success,
    Logout,
}

impl LoginStatus {
    pub fn code(&self) -> u8 {
        match self {
            LoginStatus::Fail => 0,
            LoginStatus::Success => 1,
            LoginStatus::Logout => 2,
        }
    }
}

/// One login, failed login or logout
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginLog {
    /// Unique record identifier (login-<uuid>)
    pub id: String,
    pub user_id: String,
    pub account: String,
    pub login_status: LoginStatus,

    pub browser: String,
    pub browser_version: String,
    /// Layout engine (e.g. Blink, Gecko)
    pub browser_engine: String,
    pub language: String,
    pub user_agent: String,

    pub os: String,
    pub os_version: String,
    pub os_arch: String,

    pub device_type: String,
    pub device_model: String,
    pub screen_resolution: String,

    pub client_ip: String,
    /// Country/city resolved from the client IP
    pub ip_location: String,
    pub timezone: String,

    pub platform: String,
    pub error_message: String,
    pub remark: String,
    pub create_at: DateTime<Utc>,
}

impl LoginLog {
    /// Create a login record with auto-generated id and timestamp
    pub fn new(
        user_id: impl Into<String>,
        account: impl Into<String>,
        login_status: LoginStatus,
    ) -> Self {
        Self {
            id: format!("login-{}", uuid::Uuid::new_v4()),
            user_id: user_id.into(),
            account: account.into(),
            login_status,
            create_at: Utc::now(),
            ..Default::default()
        }
    }

    /// Copy client metadata into the record
    pub fn with_client(mut self, client: &ClientInfo) -> Self {
        self.client_ip = client.ip.clone();
        self.user_agent = client.user_agent.clone();
        self.browser = client.browser.clone();
        self.browser_version = client.browser_version.clone();
        self.os = client.os.clone();
        self.os_version = client.os_version.clone();
        self.device_type = client.device_type.clone();
        self.language = client.language.clone();
        self.platform = client.platform.clone();
        self
    }

    pub fn with_location(mut self, ip_location: impl Into<String>, timezone: impl Into<String>) -> Self {
        self.ip_location = ip_location.into();
        self.timezone = timezone.into();
        self
    }

    pub fn with_error(mut self, message: impl Into<String>) -> Self {
        self.error_message = message.into();
        self
    }

    pub fn with_remark(mut self, remark: impl Into<String>) -> Self {
        self.remark = remark.into();
        self
    }
}

/// One HTTP access, recorded for every request regardless of authentication
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessLog {
    /// Unique record identifier (acc-<uuid>)
    pub id: String,
    pub trace_id: String,
    pub user_id: String,
    pub tenant_id: String,

    pub method: String,
    pub path: String,
    pub query_string: String,
    pub status: u16,
    /// Request latency in milliseconds
    pub latency_ms: u64,

    pub client_ip: String,
    pub user_agent: String,
    pub referer: String,
    /// Request body size in bytes
    pub request_size: u64,
    /// Response body size in bytes
    pub response_size: u64,

    pub country: String,
    pub province: String,
    pub city: String,
    pub isp: String,

    pub create_at: DateTime<Utc>,
}

impl AccessLog {
    /// Create an access record with auto-generated id and timestamp
    pub fn new(
        trace_id: impl Into<String>,
        method: impl Into<String>,
        path: impl Into<String>,
        status: u16,
        latency_ms: u64,
    ) -> Self {
        Self {
            id: format!("acc-{}", uuid::Uuid::new_v4()),
            trace_id: trace_id.into(),
            method: method.into(),
            path: path.into(),
            status,
            latency_ms,
            create_at: Utc::now(),
            ..Default::default()
        }
    }

    /// Set the caller identity; an empty tenant falls back to [`DEFAULT_TENANT_ID`]
    pub fn with_caller(mut self, user_id: impl Into<String>, tenant_id: impl Into<String>) -> Self {
        self.user_id = user_id.into();
        self.tenant_id = tenant_or_default(tenant_id.into());
        self
    }

    pub fn with_sizes(mut self, request_size: u64, response_size: u64) -> Self {
        self.request_size = request_size;
        self.response_size = response_size;
        self
    }

    pub fn with_geo(
        mut self,
        country: impl Into<String>,
        province: impl Into<String>,
        city: impl Into<String>,
        isp: impl Into<String>,
    ) -> Self {
        self.country = country.into();
        self.province = province.into();
        self.city = city.into();
        self.isp = isp.into();
        self
    }
}

fn tenant_or_default(tenant_id: String) -> String {
    if tenant_id.is_empty() {
        DEFAULT_TENANT_ID.to_string()
    } else {
        tenant_id
    }
}

/// A single audit record awaiting persistence
///
/// Exactly one payload, matching the variant. Entries are moved into the
/// pipeline on push and never handed back to the producer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "record")]
pub enum LogEntry {
    Operation(OperationLog),
    DataChange(DataChangeLog),
    Login(LoginLog),
    Access(AccessLog),
}

impl LogEntry {
    /// The entry's kind tag
    pub fn kind(&self) -> LogKind {
        match self {
            LogEntry::Operation(_) => LogKind::Operation,
            LogEntry::DataChange(_) => LogKind::DataChange,
            LogEntry::Login(_) => LogKind::Login,
            LogEntry::Access(_) => LogKind::Access,
        }
    }

    /// Trace id carried by the payload, if the kind has one
    pub fn trace_id(&self) -> Option<&str> {
        match self {
            LogEntry::Operation(log) => Some(&log.trace_id),
            LogEntry::DataChange(log) => Some(&log.trace_id),
            LogEntry::Access(log) => Some(&log.trace_id),
            LogEntry::Login(_) => None,
        }
    }
}

impl From<OperationLog> for LogEntry {
    fn from(log: OperationLog) -> Self {
        LogEntry::Operation(log)
    }
}

impl From<DataChangeLog> for LogEntry {
    fn from(log: DataChangeLog) -> Self {
        LogEntry::DataChange(log)
    }
}

impl From<LoginLog> for LogEntry {
    fn from(log: LoginLog) -> Self {
        LogEntry::Login(log)
    }
}

impl From<AccessLog> for LogEntry {
    fn from(log: AccessLog) -> Self {
        LogEntry::Access(log)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_kind_matches_payload() {
        let op: LogEntry = OperationLog::new("t-1", "u-1", "", "GET", "/api/users", 200, 12).into();
        let dc: LogEntry = DataChangeLog::new("t-1", "user", "42", DataAction::Update, "u-1").into();
        let login: LogEntry = LoginLog::new("u-1", "alice", LoginStatus::Success).into();
        let access: LogEntry = AccessLog::new("t-2", "GET", "/", 200, 3).into();

        assert_eq!(op.kind(), LogKind::Operation);
        assert_eq!(dc.kind(), LogKind::DataChange);
        assert_eq!(login.kind(), LogKind::Login);
        assert_eq!(access.kind(), LogKind::Access);
    }

    #[test]
    fn test_empty_tenant_defaults() {
        let op = OperationLog::new("t-1", "u-1", "", "GET", "/", 200, 1);
        assert_eq!(op.tenant_id, DEFAULT_TENANT_ID);

        let op = OperationLog::new("t-1", "u-1", "tenant-9", "GET", "/", 200, 1);
        assert_eq!(op.tenant_id, "tenant-9");

        let access = AccessLog::new("t-1", "GET", "/", 200, 1).with_caller("u-1", "");
        assert_eq!(access.tenant_id, DEFAULT_TENANT_ID);
    }

    #[test]
    fn test_ids_are_prefixed_and_unique() {
        let a = LoginLog::new("u", "a", LoginStatus::Fail);
        let b = LoginLog::new("u", "a", LoginStatus::Fail);
        assert!(a.id.starts_with("login-"));
        assert_ne!(a.id, b.id);
        assert!(AccessLog::new("t", "GET", "/", 200, 0).id.starts_with("acc-"));
        assert!(DataChangeLog::new("t", "m", "r", DataAction::Create, "u")
            .id
            .starts_with("dcl-"));
    }

    #[test]
    fn test_data_change_images() {
        let log = DataChangeLog::new("t-1", "user", "42", DataAction::Update, "admin").with_images(
            serde_json::json!({"name": "old"}),
            serde_json::json!({"name": "new"}),
        );
        assert_eq!(log.before_data, r#"{"name":"old"}"#);
        assert_eq!(log.after_data, r#"{"name":"new"}"#);

        let created = DataChangeLog::new("t-1", "user", "43", DataAction::Create, "admin")
            .with_images(serde_json::Value::Null, serde_json::json!({"name": "x"}));
        assert!(created.before_data.is_empty());
    }

    #[test]
    fn test_client_info_copied() {
        let client = ClientInfo {
            ip: "10.0.0.1".to_string(),
            browser: "Firefox".to_string(),
            os: "Linux".to_string(),
            ..Default::default()
        };
        let op = OperationLog::new("t", "u", "1", "POST", "/x", 500, 9)
            .with_client(&client)
            .with_error("boom");
        assert_eq!(op.client_ip, "10.0.0.1");
        assert_eq!(op.browser, "Firefox");
        assert!(op.is_error());

        let login = LoginLog::new("u", "a", LoginStatus::Success).with_client(&client);
        assert_eq!(login.os, "Linux");
    }

    #[test]
    fn test_login_status_codes() {
        assert_eq!(LoginStatus::Fail.code(), 0);
        assert_eq!(LoginStatus::Success.code(), 1);
        assert_eq!(LoginStatus::Logout.code(), 2);
    }

    #[test]
    fn test_entry_serialization_tagged() {
        let entry: LogEntry = LoginLog::new("u-1", "alice", LoginStatus::Logout).into();
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["kind"], "login");
        assert_eq!(json["record"]["account"], "alice");
        assert_eq!(json["record"]["loginStatus"], "logout");

        let back: LogEntry = serde_json::from_value(json).unwrap();
        assert_eq!(back, entry);
    }

    #[test]
    fn test_table_names() {
        let names: Vec<_> = LogKind::ALL.iter().map(|k| k.table_name()).collect();
        assert_eq!(
            names,
            vec!["sys_operation_log", "sys_data_change_log", "sys_login_log", "sys_access_log"]
        );
    }
}
