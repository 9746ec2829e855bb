//! Default TOML config template with inline documentation comments.

/// Generate the default TOML config content with comments.
pub(crate) fn default_config_toml() -> &'static str {
    r##"# Campus presence configuration
# Schema version 1
# Only override what you want to change -- missing fields use defaults.

[presence]
# Broker endpoint. http(s) endpoints are mapped to <url>/websocket,
# ws(s) URLs are used as-is. CAMPUS_WS_URL overrides this value.
# ws_url = "http://localhost:8881/ws-chat"
# connect_timeout_secs = 15      # 1-120
# heartbeat_outgoing_ms = 10000  # 0 disables, max 120000
# heartbeat_incoming_ms = 10000  # 0 disables, max 120000
# event_buffer = 256             # 1-65536

[logging]
# level = "info"   # trace, debug, info, warn, error
"##
}
