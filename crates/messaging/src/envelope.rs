//! Command envelope and wire form.

use chrono::{DateTime, Utc};
use common::{CausationId, CommandId, CorrelationId, TenantId};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// A command payload belonging to a bounded context's closed command set.
pub trait CommandPayload: Serialize + DeserializeOwned + Send + Sync {
    /// Returns the command type tag carried in message metadata.
    fn command_type(&self) -> &'static str;
}

/// Envelope wrapping a command with cross-cutting metadata.
///
/// The command ID doubles as the consumer-side idempotency key; the
/// correlation ID ties together every message of one business transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandEnvelope<C> {
    /// Identity of this command message.
    pub command_id: CommandId,

    /// Identifier of the business transaction this command belongs to.
    pub correlation_id: CorrelationId,

    /// Identifier of the message that triggered this command.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub causation_id: Option<CausationId>,

    /// Tenant the command is scoped to, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<TenantId>,

    /// When the command was issued.
    pub issued_at: DateTime<Utc>,

    /// The command payload.
    pub command: C,
}

impl<C: CommandPayload> CommandEnvelope<C> {
    /// Creates an envelope builder for the given command.
    pub fn builder(command: C) -> CommandEnvelopeBuilder<C> {
        CommandEnvelopeBuilder {
            command_id: None,
            correlation_id: None,
            causation_id: None,
            tenant_id: None,
            command,
        }
    }

    /// Wraps a command with a fresh command ID and correlation ID.
    pub fn wrap(command: C) -> Self {
        Self::builder(command).build()
    }

    /// Serializes this envelope into its wire form.
    pub fn into_message(self) -> Result<CommandMessage> {
        CommandMessage::encode(&self)
    }
}

/// Builder for command envelopes.
#[derive(Debug)]
pub struct CommandEnvelopeBuilder<C> {
    command_id: Option<CommandId>,
    correlation_id: Option<CorrelationId>,
    causation_id: Option<CausationId>,
    tenant_id: Option<TenantId>,
    command: C,
}

impl<C: CommandPayload> CommandEnvelopeBuilder<C> {
    /// Sets the command ID. If not set, a new ID is generated.
    pub fn command_id(mut self, id: CommandId) -> Self {
        self.command_id = Some(id);
        self
    }

    /// Sets the correlation ID. If not set, a new ID is generated.
    pub fn correlation_id(mut self, id: CorrelationId) -> Self {
        self.correlation_id = Some(id);
        self
    }

    /// Sets the causation ID.
    pub fn causation_id(mut self, id: CausationId) -> Self {
        self.causation_id = Some(id);
        self
    }

    /// Sets the tenant ID.
    pub fn tenant_id(mut self, id: TenantId) -> Self {
        self.tenant_id = Some(id);
        self
    }

    /// Builds the envelope.
    pub fn build(self) -> CommandEnvelope<C> {
        CommandEnvelope {
            command_id: self.command_id.unwrap_or_default(),
            correlation_id: self.correlation_id.unwrap_or_default(),
            causation_id: self.causation_id,
            tenant_id: self.tenant_id,
            issued_at: Utc::now(),
            command: self.command,
        }
    }
}

/// Wire form of a command: routing metadata plus a JSON body whose
/// `command` field holds the payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandMessage {
    /// Command type tag, used for observability and dead-letter triage.
    pub command_type: String,

    /// Correlation identity, duplicated from the envelope for routing.
    pub correlation_id: CorrelationId,

    /// The serialized [`CommandEnvelope`].
    pub body: serde_json::Value,
}

impl CommandMessage {
    /// Encodes a typed envelope into its wire form.
    pub fn encode<C: CommandPayload>(envelope: &CommandEnvelope<C>) -> Result<Self> {
        Ok(Self {
            command_type: envelope.command.command_type().to_string(),
            correlation_id: envelope.correlation_id,
            body: serde_json::to_value(envelope)?,
        })
    }

    /// Decodes the body back into a typed envelope.
    pub fn decode<C: CommandPayload>(&self) -> Result<CommandEnvelope<C>> {
        Ok(serde_json::from_value(self.body.clone())?)
    }
}
