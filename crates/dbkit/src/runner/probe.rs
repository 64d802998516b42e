use std::sync::Arc;
use std::time::Instant;

use crate::error::DbResult;
use crate::monitor::{MonitorConfig, QueryContext, QueryOutcome, StatsCollector};
use crate::param::Params;

/// Collector plus configuration, cloned into every statement the runner issues.
#[derive(Clone, Default)]
pub(crate) struct Monitor {
    collector: Option<Arc<dyn StatsCollector>>,
    config: MonitorConfig,
}

impl Monitor {
    pub(crate) fn set_collector(&mut self, collector: Arc<dyn StatsCollector>) {
        self.collector = Some(collector);
    }

    pub(crate) fn set_config(&mut self, config: MonitorConfig) {
        self.config = config;
    }

    pub(crate) fn config(&self) -> &MonitorConfig {
        &self.config
    }

    /// Emit `on_query_start` and return a probe that reports completion.
    ///
    /// `None` when monitoring is disabled or no collector is installed.
    pub(crate) fn start(&self, sql: &str, params: &Params, tag: &'static str) -> Option<Probe> {
        if !self.config.monitoring_enabled {
            return None;
        }
        let collector = self.collector.as_ref()?;
        let ctx = QueryContext::new(sql, params.len()).with_tag(tag);
        collector.on_query_start(&ctx);
        Some(Probe {
            collector: Arc::clone(collector),
            ctx,
            config: self.config.clone(),
            started: Instant::now(),
        })
    }
}

impl std::fmt::Debug for Monitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Monitor")
            .field("collector", &self.collector.is_some())
            .field("config", &self.config)
            .finish()
    }
}

/// One in-flight statement being timed.
pub(crate) struct Probe {
    collector: Arc<dyn StatsCollector>,
    ctx: QueryContext,
    config: MonitorConfig,
    started: Instant,
}

impl Probe {
    pub(crate) fn finish(self, outcome: &QueryOutcome) {
        let elapsed = self.started.elapsed();
        if self.config.is_slow(elapsed) {
            self.collector.on_slow_query(&self.ctx, elapsed);
        }
        self.collector.on_query_complete(&self.ctx, elapsed, outcome);
    }
}

/// Report `result` through `probe`, if any.
pub(crate) fn report<T>(
    probe: Option<Probe>,
    result: &DbResult<T>,
    on_ok: impl FnOnce(&T) -> QueryOutcome,
) {
    let Some(probe) = probe else {
        return;
    };
    let outcome = match result {
        Ok(value) => on_ok(value),
        Err(e) => QueryOutcome::error(e.to_string()),
    };
    probe.finish(&outcome);
}
