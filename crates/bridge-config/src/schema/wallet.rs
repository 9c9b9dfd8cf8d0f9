use serde::{Deserialize, Serialize};

/// Where the wallet lives and which pages back each channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WalletConfig {
    /// Base URL of the wallet web app.
    pub url: String,
    /// Path of the page opened in the confirmation popup.
    pub popup_path: String,
    /// Path of the page loaded in the hidden frame. Empty disables the frame.
    pub frame_path: String,
    /// Target name passed to the window-opening primitive.
    pub window_name: String,
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            url: "https://app.obsidion.xyz".into(),
            popup_path: "/sign".into(),
            frame_path: "/frame".into(),
            window_name: "Smart Wallet".into(),
        }
    }
}

impl WalletConfig {
    pub fn popup_url(&self) -> String {
        join_url(&self.url, &self.popup_path)
    }

    /// `None` when the frame channel is disabled.
    pub fn frame_url(&self) -> Option<String> {
        if self.frame_path.is_empty() {
            None
        } else {
            Some(join_url(&self.url, &self.frame_path))
        }
    }
}

fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_without_double_slashes() {
        let config = WalletConfig {
            url: "https://wallet.example/".into(),
            popup_path: "/sign".into(),
            ..Default::default()
        };
        assert_eq!(config.popup_url(), "https://wallet.example/sign");
        assert_eq!(config.frame_url().as_deref(), Some("https://wallet.example/frame"));
    }

    #[test]
    fn empty_frame_path_disables_frame() {
        let config = WalletConfig {
            frame_path: String::new(),
            ..Default::default()
        };
        assert_eq!(config.frame_url(), None);
    }
}
