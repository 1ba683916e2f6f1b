use crate::coordinator::TrackingCoordinator;
use crate::subscription::protocol::{ClientMessage, ErrorMessage};
use crate::subscription::registry::{order_topic, SubscriptionRegistry};
use crate::update::PositionUpdate;
use axum::extract::ws::{Message, WebSocket};
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use uuid::Uuid;

/// What this connection is allowed to do.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionRole {
    /// May emit location updates (delivery driver client)
    Agent,
    /// May only track orders (customer client)
    Observer,
}

/// Manages a single WebSocket connection: inbound messages from the client
/// and outbound fan-out payloads from the registry.
pub struct ConnectionManager {
    /// Authenticated principal; doubles as the agent id for agent roles
    principal: String,
    role: ConnectionRole,
    /// Registry membership identity for this connection
    observer_id: Uuid,
    registry: Arc<SubscriptionRegistry>,
    coordinator: Arc<TrackingCoordinator>,
}

impl ConnectionManager {
    pub fn new(
        principal: String,
        role: ConnectionRole,
        registry: Arc<SubscriptionRegistry>,
        coordinator: Arc<TrackingCoordinator>,
    ) -> Self {
        Self {
            principal,
            role,
            observer_id: Uuid::new_v4(),
            registry,
            coordinator,
        }
    }

    /// Handle WebSocket connection lifecycle
    pub async fn handle(self, mut socket: WebSocket) {
        info!(principal = %self.principal, role = ?self.role, "Tracking connection established");

        // Fan-out payloads for topics this connection observes arrive here
        let (tx, mut rx) = mpsc::unbounded_channel::<String>();

        loop {
            tokio::select! {
                // Handle incoming client messages
                msg = socket.recv() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            if let Err(e) = self.handle_client_message(&mut socket, &tx, &text).await {
                                error!(error = %e, "Error handling client message");
                            }
                        }
                        Some(Ok(Message::Close(_))) | None => {
                            info!(principal = %self.principal, "Client disconnected");
                            break;
                        }
                        Some(Ok(Message::Ping(data))) => {
                            if let Err(e) = socket.send(Message::Pong(data)).await {
                                error!(error = %e, "Failed to send pong");
                                break;
                            }
                        }
                        Some(Ok(_)) => {
                            // Ignore binary, pong messages
                        }
                        Some(Err(e)) => {
                            warn!(error = %e, "WebSocket error");
                            break;
                        }
                    }
                }

                // Deliver broadcast payloads for tracked orders
                Some(payload) = rx.recv() => {
                    if let Err(e) = socket.send(Message::Text(payload)).await {
                        error!(error = %e, "Failed to deliver broadcast payload");
                        break;
                    }
                }
            }
        }

        // Release registry membership promptly on disconnect
        self.registry.leave_all(&self.observer_id);
        info!(principal = %self.principal, "Tracking connection closed");
    }

    async fn handle_client_message(
        &self,
        socket: &mut WebSocket,
        tx: &mpsc::UnboundedSender<String>,
        text: &str,
    ) -> anyhow::Result<()> {
        let msg: ClientMessage = match serde_json::from_str(text) {
            Ok(msg) => msg,
            Err(e) => {
                return self
                    .send_error(socket, format!("malformed message: {}", e))
                    .await;
            }
        };

        match msg {
            ClientMessage::LocationUpdate {
                latitude,
                longitude,
                order_id,
                observed_at,
            } => {
                if self.role != ConnectionRole::Agent {
                    return self
                        .send_error(socket, "only agent connections may report locations".into())
                        .await;
                }

                let update = PositionUpdate {
                    agent_id: self.principal.clone(),
                    latitude,
                    longitude,
                    observed_at: observed_at.unwrap_or_else(Utc::now),
                    order_id,
                };

                if let Err(e) = self.coordinator.handle_update(update).await {
                    return self.send_error(socket, e.to_string()).await;
                }
            }
            ClientMessage::TrackOrder { order_id } => {
                info!(principal = %self.principal, order_id = %order_id, "Tracking order");
                self.registry
                    .join(&order_topic(&order_id), self.observer_id, tx.clone());
            }
            ClientMessage::UntrackOrder { order_id } => {
                self.registry.leave(&order_topic(&order_id), &self.observer_id);
            }
        }

        Ok(())
    }

    async fn send_error(&self, socket: &mut WebSocket, error: String) -> anyhow::Result<()> {
        let msg = ErrorMessage::new(error);
        let json = serde_json::to_string(&msg)?;
        socket.send(Message::Text(json)).await?;
        Ok(())
    }
}
