/// The default TOML config content with comments.
pub fn default_config_toml() -> &'static str {
    r##"# Wallet bridge configuration
# Schema version 1
# Only override what you want to change -- missing fields use defaults.

[wallet]
# url = "https://app.obsidion.xyz"
# popup_path = "/sign"
# frame_path = "/frame"     # empty string disables the hidden frame
# window_name = "Smart Wallet"

[popup]
# width = 420               # 100-4000
# height = 540              # 100-4000

[timing]
# ping_interval_ms = 100        # 10-10000
# liveness_interval_ms = 100    # 10-10000
# idle_disconnect_ms = 1000     # 0-60000

[routing]
# frame_methods = ["aztec_accounts", "aztec_call"]
# final_methods = ["aztec_requestAccounts", "aztec_sendTransaction", "wallet_watchAssets"]
# default_channel = "popup"

[logging]
# level = "info"
"##
}
