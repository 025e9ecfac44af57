//! Queue names and topic routing key matching.

/// Logical command queue names, one per bounded context.
pub mod queues {
    /// Cart context commands.
    pub const CART_COMMANDS: &str = "cart.commands";
    /// Product catalog context commands.
    pub const CATALOG_COMMANDS: &str = "catalog.commands";
    /// Inventory context commands.
    pub const INVENTORY_COMMANDS: &str = "inventory.commands";
    /// Order context commands.
    pub const ORDER_COMMANDS: &str = "order.commands";
    /// Checkout context commands.
    pub const CHECKOUT_COMMANDS: &str = "checkout.commands";
}

/// Returns true if a routing key matches a binding pattern.
///
/// Patterns use AMQP topic semantics: segments are dot-separated, `*`
/// matches exactly one segment, `#` matches zero or more segments.
pub fn topic_matches(pattern: &str, routing_key: &str) -> bool {
    let pattern: Vec<&str> = pattern.split('.').collect();
    let key: Vec<&str> = routing_key.split('.').collect();
    matches_segments(&pattern, &key)
}

fn matches_segments(pattern: &[&str], key: &[&str]) -> bool {
    match pattern.split_first() {
        None => key.is_empty(),
        Some((&"#", rest)) => {
            // `#` may absorb any number of leading segments.
            (0..=key.len()).any(|n| matches_segments(rest, &key[n..]))
        }
        Some((&"*", rest)) => match key.split_first() {
            Some((_, key_rest)) => matches_segments(rest, key_rest),
            None => false,
        },
        Some((segment, rest)) => match key.split_first() {
            Some((head, key_rest)) => segment == head && matches_segments(rest, key_rest),
            None => false,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_match() {
        assert!(topic_matches("order.OrderCreated", "order.OrderCreated"));
        assert!(!topic_matches("order.OrderCreated", "order.CheckoutCompleted"));
    }

    #[test]
    fn star_matches_one_segment() {
        assert!(topic_matches("*.OrderCreated", "order.OrderCreated"));
        assert!(!topic_matches("*.OrderCreated", "order.sub.OrderCreated"));
        assert!(!topic_matches("order.*", "order"));
    }

    #[test]
    fn hash_matches_zero_or_more() {
        assert!(topic_matches("order.#", "order.OrderCreated"));
        assert!(topic_matches("order.#", "order"));
        assert!(topic_matches("#", "anything.at.all"));
        assert!(topic_matches("order.#.Created", "order.sub.Created"));
        assert!(!topic_matches("order.#", "cart.CartCleared"));
    }

    #[test]
    fn queue_names_are_per_context() {
        assert_eq!(queues::CART_COMMANDS, "cart.commands");
        assert_eq!(queues::INVENTORY_COMMANDS, "inventory.commands");
    }
}
