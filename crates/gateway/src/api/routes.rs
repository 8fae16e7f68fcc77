//! Capability route table: the HTTP surface derived from the client.
//!
//! Built exactly once, after the client is ready.  A capability gets a
//! `POST /<name>` route when it is callable, its name does not start with
//! `_`, and the name is usable as a single path segment.

use std::collections::HashSet;

use mb_domain::capability::CapabilityDescriptor;
use mb_domain::trace::TraceEvent;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteDescriptor {
    pub path: String,
    pub capability: CapabilityDescriptor,
}

#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: Vec<RouteDescriptor>,
    skipped: Vec<String>,
}

impl RouteTable {
    pub fn build(capabilities: Vec<CapabilityDescriptor>) -> Self {
        let mut seen = HashSet::new();
        let mut table = Self::default();

        for cap in capabilities {
            if !cap.is_exposed() {
                table.skipped.push(cap.name);
                continue;
            }
            if !is_path_segment(&cap.name) {
                tracing::warn!(capability = %cap.name, "capability name is not routable, skipping");
                table.skipped.push(cap.name);
                continue;
            }
            if !seen.insert(cap.name.clone()) {
                tracing::warn!(capability = %cap.name, "duplicate capability, keeping the first");
                continue;
            }
            table.routes.push(RouteDescriptor {
                path: format!("/{}", cap.name),
                capability: cap,
            });
        }

        TraceEvent::RouteTableBuilt {
            exposed: table.routes.len(),
            skipped: table.skipped.len(),
        }
        .emit();
        table
    }

    pub fn routes(&self) -> &[RouteDescriptor] {
        &self.routes
    }

    /// Names that were advertised but not exposed.
    pub fn skipped(&self) -> &[String] {
        &self.skipped
    }

    pub fn get(&self, name: &str) -> Option<&RouteDescriptor> {
        self.routes.iter().find(|r| r.capability.name == name)
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

/// Letters, digits, `_`, `-`, `.`; anything else would be read as routing
/// syntax (`:param`, `*wildcard`) or split the path.
fn is_path_segment(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
}
