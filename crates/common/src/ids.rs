use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Namespace used to derive order IDs from checkout idempotency keys.
const IDEMPOTENCY_NAMESPACE: Uuid = Uuid::from_bytes([
    0x8f, 0x2a, 0x1d, 0x4c, 0x6b, 0x3e, 0x47, 0x91, 0xb5, 0x0d, 0x9e, 0x7f, 0x21, 0x48, 0xa3,
    0x5c,
]);

macro_rules! uuid_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Creates a new random identifier.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Creates an identifier from an existing UUID.
            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Returns the underlying UUID.
            pub fn as_uuid(&self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

uuid_id! {
    /// Unique identifier for an order and the checkout transaction that creates it.
    OrderId
}

uuid_id! {
    /// Unique identifier for a shopping cart.
    CartId
}

uuid_id! {
    /// Unique identifier for a customer.
    CustomerId
}

uuid_id! {
    /// Identity of a command message, used as its idempotency key by consumers.
    CommandId
}

uuid_id! {
    /// Identity of an event message.
    EventId
}

uuid_id! {
    /// Identifier shared by every message belonging to one business transaction.
    CorrelationId
}

uuid_id! {
    /// Identifier of the message that triggered the current message.
    CausationId
}

impl OrderId {
    /// Derives a stable order ID from a checkout idempotency key.
    ///
    /// Two checkout submissions carrying the same key resolve to the same
    /// order ID, so at most one order can ever exist for that key.
    pub fn for_idempotency_key(key: &str) -> Self {
        Self(Uuid::new_v5(&IDEMPOTENCY_NAMESPACE, key.as_bytes()))
    }
}

impl From<OrderId> for CorrelationId {
    fn from(id: OrderId) -> Self {
        Self(id.0)
    }
}

impl From<CommandId> for CausationId {
    fn from(id: CommandId) -> Self {
        Self(id.0)
    }
}

impl From<EventId> for CausationId {
    fn from(id: EventId) -> Self {
        Self(id.0)
    }
}

/// Product identifier (SKU).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(String);

impl ProductId {
    /// Creates a new product ID from a string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the product ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ProductId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for ProductId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ProductId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl AsRef<str> for ProductId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Anonymous session token identifying a guest's cart.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GuestToken(String);

impl GuestToken {
    /// Creates a guest token from a string.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Returns the token as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for GuestToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for GuestToken {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for GuestToken {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Tenant identifier for multi-tenant deployments.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenantId(String);

impl TenantId {
    /// Creates a tenant ID from a string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the tenant ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TenantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_id_new_creates_unique_ids() {
        let id1 = OrderId::new();
        let id2 = OrderId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn order_id_from_uuid_preserves_value() {
        let uuid = Uuid::new_v4();
        let id = OrderId::from_uuid(uuid);
        assert_eq!(id.as_uuid(), uuid);
    }

    #[test]
    fn order_id_for_idempotency_key_is_stable() {
        let a = OrderId::for_idempotency_key("checkout-abc");
        let b = OrderId::for_idempotency_key("checkout-abc");
        let c = OrderId::for_idempotency_key("checkout-xyz");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn id_serialization_roundtrip() {
        let id = CommandId::new();
        let json = serde_json::to_string(&id).unwrap();
        let deserialized: CommandId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, deserialized);
    }

    #[test]
    fn product_id_string_conversion() {
        let id = ProductId::new("SKU-001");
        assert_eq!(id.as_str(), "SKU-001");

        let id2: ProductId = "SKU-002".into();
        assert_eq!(id2.as_str(), "SKU-002");
    }

    #[test]
    fn guest_token_display() {
        let token = GuestToken::new("guest-42");
        assert_eq!(token.to_string(), "guest-42");
    }

    #[test]
    fn causation_from_command_and_event() {
        let command_id = CommandId::new();
        let event_id = EventId::new();
        assert_eq!(
            CausationId::from(command_id).as_uuid(),
            command_id.as_uuid()
        );
        assert_eq!(CausationId::from(event_id).as_uuid(), event_id.as_uuid());
    }
}
