//! # Version Gate
//!
//! Decides, per message kind and client protocol version, whether a packet
//! needs to be rebuilt for that client and which handler rebuilds it.
//!
//! Rules are registered up front and the gate is then shared read-mostly
//! across connection workers. A dispatch with no matching rule returns
//! `Ok(None)`, meaning the packet goes out unchanged.

use crate::error::constants::{ERR_GATE_READ_LOCK, ERR_GATE_WRITE_LOCK};
use crate::error::{ProtocolError, Result};
use crate::protocol::versions::ProtocolRange;
use crate::utils::metrics::{GateMetrics, Timer};
use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::{debug, instrument};

type HandlerFn<C, T> = dyn Fn(&C) -> Result<T> + Send + Sync + 'static;

struct Rule<C, T> {
    range: ProtocolRange,
    handler: Box<HandlerFn<C, T>>,
}

/// Registry of rebuild handlers keyed by message kind and version range.
///
/// `C` is whatever the handler needs to see (usually the packet being sent),
/// `T` is the rebuilt packet.
pub struct VersionGate<C, T> {
    rules: Arc<RwLock<HashMap<Cow<'static, str>, Vec<Rule<C, T>>>>>,
    metrics: Arc<GateMetrics>,
}

impl<C, T> Clone for VersionGate<C, T> {
    fn clone(&self) -> Self {
        Self {
            rules: Arc::clone(&self.rules),
            metrics: Arc::clone(&self.metrics),
        }
    }
}

impl<C, T> Default for VersionGate<C, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C, T> VersionGate<C, T> {
    pub fn new() -> Self {
        Self {
            rules: Arc::new(RwLock::new(HashMap::new())),
            metrics: Arc::new(GateMetrics::new()),
        }
    }

    /// Register `handler` for `kind` on every version in `range`.
    ///
    /// Ranges for the same kind may not overlap; a version always resolves to
    /// at most one handler.
    pub fn register<F>(
        &self,
        kind: impl Into<Cow<'static, str>>,
        range: ProtocolRange,
        handler: F,
    ) -> Result<()>
    where
        F: Fn(&C) -> Result<T> + Send + Sync + 'static,
    {
        let kind = kind.into();
        let mut rules = self
            .rules
            .write()
            .map_err(|_| ProtocolError::ConfigError(ERR_GATE_WRITE_LOCK.to_string()))?;

        let entry = rules.entry(kind).or_default();
        if let Some(existing) = entry.iter().find(|rule| rule.range.overlaps(&range)) {
            return Err(ProtocolError::ConfigError(format!(
                "Version range {range} overlaps registered range {}",
                existing.range
            )));
        }

        entry.push(Rule {
            range,
            handler: Box::new(handler),
        });
        Ok(())
    }

    /// Whether any rule for `kind` covers `version`
    pub fn is_gated(&self, version: i32, kind: &str) -> Result<bool> {
        let rules = self
            .rules
            .read()
            .map_err(|_| ProtocolError::ConfigError(ERR_GATE_READ_LOCK.to_string()))?;

        Ok(rules
            .get(kind)
            .is_some_and(|list| list.iter().any(|rule| rule.range.contains(version))))
    }

    /// Run the handler registered for `kind` at `version`, if any.
    #[instrument(level = "debug", skip(self, context))]
    pub fn dispatch(&self, version: i32, kind: &str, context: &C) -> Result<Option<T>> {
        let _timer = Timer::start("gate_dispatch");
        self.metrics.dispatch();

        let rules = self
            .rules
            .read()
            .map_err(|_| ProtocolError::ConfigError(ERR_GATE_READ_LOCK.to_string()))?;

        let Some(rule) = rules
            .get(kind)
            .and_then(|list| list.iter().find(|rule| rule.range.contains(version)))
        else {
            self.metrics.miss();
            return Ok(None);
        };

        match (rule.handler)(context) {
            Ok(packet) => {
                self.metrics.success();
                Ok(Some(packet))
            }
            Err(e) => {
                debug!(error = %e, range = %rule.range, "Gate handler failed");
                self.metrics.failure(e.is_decode_fault());
                Err(e)
            }
        }
    }

    pub fn metrics(&self) -> &GateMetrics {
        &self.metrics
    }
}
