//! Client-side handler for tool-server notifications.
//!
//! Implements rmcp's `ClientHandler` to log server-initiated notifications
//! and to signal the registry when a server's tool/resource/prompt list
//! changes, so the catalog can be refreshed.

use rmcp::{
    model::{
        CancelledNotificationParam, ClientInfo, LoggingLevel, LoggingMessageNotificationParam,
        ProgressNotificationParam, ResourceUpdatedNotificationParam,
    },
    service::NotificationContext,
    ClientHandler, RoleClient,
};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Sent to the registry whenever a server reports its capabilities changed.
#[derive(Debug, Clone)]
pub struct RefreshRequest {
    pub server_name: String,
}

#[derive(Clone)]
pub struct ToolFleetClientHandler {
    server_name: std::sync::Arc<str>,
    client_info: ClientInfo,
    refresh_tx: Option<mpsc::Sender<RefreshRequest>>,
}

impl ToolFleetClientHandler {
    pub fn new(server_name: impl AsRef<str>) -> Self {
        let mut client_info = ClientInfo::default();
        client_info.client_info.name = "toolfleet".to_string();
        client_info.client_info.version = env!("CARGO_PKG_VERSION").to_string();

        Self {
            server_name: std::sync::Arc::from(server_name.as_ref()),
            client_info,
            refresh_tx: None,
        }
    }

    #[must_use]
    pub fn with_refresh_channel(mut self, tx: mpsc::Sender<RefreshRequest>) -> Self {
        self.refresh_tx = Some(tx);
        self
    }

    pub fn server_name(&self) -> &str {
        &self.server_name
    }

    fn send_refresh(&self) {
        if let Some(tx) = &self.refresh_tx {
            if let Err(e) = tx.try_send(RefreshRequest {
                server_name: self.server_name.to_string(),
            }) {
                warn!(server_name = %self.server_name, error = %e, "failed to send refresh request");
            }
        }
    }
}

impl ClientHandler for ToolFleetClientHandler {
    async fn on_cancelled(
        &self,
        params: CancelledNotificationParam,
        _context: NotificationContext<RoleClient>,
    ) {
        info!(
            server_name = %self.server_name,
            request_id = %params.request_id,
            reason = ?params.reason,
            "tool server cancelled request"
        );
    }

    async fn on_progress(
        &self,
        params: ProgressNotificationParam,
        _context: NotificationContext<RoleClient>,
    ) {
        debug!(
            server_name = %self.server_name,
            token = ?params.progress_token,
            progress = %params.progress,
            total = ?params.total,
            "tool server progress"
        );
    }

    async fn on_resource_updated(
        &self,
        params: ResourceUpdatedNotificationParam,
        _context: NotificationContext<RoleClient>,
    ) {
        info!(server_name = %self.server_name, uri = %params.uri, "tool server resource updated");
    }

    async fn on_resource_list_changed(&self, _context: NotificationContext<RoleClient>) {
        info!(server_name = %self.server_name, "tool server resource list changed");
        self.send_refresh();
    }

    async fn on_tool_list_changed(&self, _context: NotificationContext<RoleClient>) {
        info!(server_name = %self.server_name, "tool server tool list changed");
        self.send_refresh();
    }

    async fn on_prompt_list_changed(&self, _context: NotificationContext<RoleClient>) {
        info!(server_name = %self.server_name, "tool server prompt list changed");
        self.send_refresh();
    }

    fn get_info(&self) -> ClientInfo {
        self.client_info.clone()
    }

    async fn on_logging_message(
        &self,
        params: LoggingMessageNotificationParam,
        _context: NotificationContext<RoleClient>,
    ) {
        let logger = params.logger.as_deref().unwrap_or("tool-server");
        match params.level {
            LoggingLevel::Emergency | LoggingLevel::Alert | LoggingLevel::Critical => {
                error!(server_name = %self.server_name, logger = %logger, level = ?params.level, "{}", params.data);
            }
            LoggingLevel::Error => {
                error!(server_name = %self.server_name, logger = %logger, "{}", params.data);
            }
            LoggingLevel::Warning => {
                warn!(server_name = %self.server_name, logger = %logger, "{}", params.data);
            }
            LoggingLevel::Notice | LoggingLevel::Info => {
                info!(server_name = %self.server_name, logger = %logger, "{}", params.data);
            }
            LoggingLevel::Debug => {
                debug!(server_name = %self.server_name, logger = %logger, "{}", params.data);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handler_carries_server_name_and_client_info() {
        let handler = ToolFleetClientHandler::new("brave");
        assert_eq!(handler.server_name(), "brave");
        assert_eq!(handler.get_info().client_info.name, "toolfleet");
    }

    #[tokio::test]
    async fn refresh_channel_receives_signal_on_tool_list_change() {
        let (tx, mut rx) = mpsc::channel(4);
        let handler = ToolFleetClientHandler::new("brave").with_refresh_channel(tx);
        handler.send_refresh();
        let req = rx.recv().await.expect("refresh request");
        assert_eq!(req.server_name, "brave");
    }
}
