//! Exchanges and routing.
//!
//! An exchange holds its bindings and answers one question: which queues
//! does a routing key reach. Duplicate bindings are a no-op.

use crate::pubsub::queue::ExchangeKind;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Binding {
    pub queue: String,
    pub routing_key: String,
}

#[derive(Debug)]
pub struct Exchange {
    pub name: String,
    pub kind: ExchangeKind,
    pub durable: bool,
    pub bindings: Vec<Binding>,
}

impl Exchange {
    pub fn new(name: &str, kind: ExchangeKind, durable: bool) -> Self {
        Self {
            name: name.to_string(),
            kind,
            durable,
            bindings: Vec::new(),
        }
    }

    /// Add a binding. Binding the same queue and key twice has no effect.
    pub fn bind(&mut self, queue: &str, routing_key: &str) {
        let binding = Binding {
            queue: queue.to_string(),
            routing_key: routing_key.to_string(),
        };
        if !self.bindings.contains(&binding) {
            self.bindings.push(binding);
        }
    }

    /// Drop every binding that targets `queue`.
    pub fn unbind_queue(&mut self, queue: &str) {
        self.bindings.retain(|b| b.queue != queue);
    }

    /// Queues reached by `routing_key`, each listed once, in binding order.
    pub fn route(&self, routing_key: &str) -> Vec<String> {
        let mut targets: Vec<String> = Vec::new();
        for binding in &self.bindings {
            let matched = match self.kind {
                ExchangeKind::Fanout => true,
                ExchangeKind::Direct => binding.routing_key == routing_key,
                ExchangeKind::Topic => topic_matches(&binding.routing_key, routing_key),
            };
            if matched && !targets.contains(&binding.queue) {
                targets.push(binding.queue.clone());
            }
        }
        targets
    }
}

/// Matches a dot-delimited routing key against a topic pattern where `*`
/// stands for exactly one word and `#` for zero or more words.
pub fn topic_matches(pattern: &str, routing_key: &str) -> bool {
    let pattern: Vec<&str> = pattern.split('.').collect();
    let key: Vec<&str> = routing_key.split('.').collect();
    match_words(&pattern, &key)
}

fn match_words(pattern: &[&str], key: &[&str]) -> bool {
    match pattern.split_first() {
        None => key.is_empty(),
        Some((&"#", rest)) => (0..=key.len()).any(|skip| match_words(rest, &key[skip..])),
        Some((&word, rest)) => match key.split_first() {
            Some((&first, key_rest)) => (word == "*" || word == first) && match_words(rest, key_rest),
            None => false,
        },
    }
}
