//! Immutable resource identifiers.

use crate::status::{invalid_argument, Status};

/// A topic is named by its project and its own id within that project.
///
/// Equality and rendering are by both fields; a `Topic` never carries
/// anything that could go stale (no cached existence, no handle to a
/// connection).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Topic {
    project_id: String,
    topic_id: String,
}

impl Topic {
    pub fn new(project_id: impl Into<String>, topic_id: impl Into<String>) -> Result<Self, Status> {
        let project_id = project_id.into();
        let topic_id = topic_id.into();
        if project_id.is_empty() {
            return Err(invalid_argument("project_id must not be empty"));
        }
        if topic_id.is_empty() {
            return Err(invalid_argument("topic_id must not be empty"));
        }
        Ok(Self { project_id, topic_id })
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    pub fn topic_id(&self) -> &str {
        &self.topic_id
    }

    /// Renders the wire form `projects/{project}/topics/{topic}`.
    pub fn fully_qualified_name(&self) -> String {
        format!("projects/{}/topics/{}", self.project_id, self.topic_id)
    }
}

impl std::fmt::Display for Topic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.fully_qualified_name())
    }
}

/// A subscription is named by its project and its own id within that project.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Subscription {
    project_id: String,
    subscription_id: String,
}

impl Subscription {
    pub fn new(project_id: impl Into<String>, subscription_id: impl Into<String>) -> Result<Self, Status> {
        let project_id = project_id.into();
        let subscription_id = subscription_id.into();
        if project_id.is_empty() {
            return Err(invalid_argument("project_id must not be empty"));
        }
        if subscription_id.is_empty() {
            return Err(invalid_argument("subscription_id must not be empty"));
        }
        Ok(Self {
            project_id,
            subscription_id,
        })
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    pub fn subscription_id(&self) -> &str {
        &self.subscription_id
    }

    /// Renders the wire form `projects/{project}/subscriptions/{subscription}`.
    pub fn fully_qualified_name(&self) -> String {
        format!("projects/{}/subscriptions/{}", self.project_id, self.subscription_id)
    }
}

impl std::fmt::Display for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.fully_qualified_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_full_name() {
        let topic = Topic::new("proj", "orders").unwrap();
        assert_eq!(topic.fully_qualified_name(), "projects/proj/topics/orders");
        let sub = Subscription::new("proj", "orders-worker").unwrap();
        assert_eq!(sub.fully_qualified_name(), "projects/proj/subscriptions/orders-worker");
    }

    #[test]
    fn rejects_empty_fields() {
        assert!(Topic::new("", "orders").is_err());
        assert!(Topic::new("proj", "").is_err());
        assert!(Subscription::new("", "x").is_err());
        assert!(Subscription::new("proj", "").is_err());
    }

    #[test]
    fn equality_is_by_both_fields() {
        assert_eq!(Topic::new("a", "b").unwrap(), Topic::new("a", "b").unwrap());
        assert_ne!(Topic::new("a", "b").unwrap(), Topic::new("a", "c").unwrap());
    }
}
