//! Pull-metrics exporter
//!
//! Mirrors profile samples into a private `prometheus::Registry` and renders
//! the text exposition format. Gauges are set to the current reading;
//! counters only ever receive the non-negative delta reported by the
//! [`CounterLedger`].

use crate::counters::{CounterLedger, series_key};
use crate::engine::{Sample, SampleKind};
use crate::error::Result;
use prometheus::{CounterVec, Encoder, GaugeVec, Opts, Registry, TextEncoder};
use std::collections::{HashMap, HashSet};
use tracing::debug;

#[derive(Clone)]
enum Family {
    Gauge(GaugeVec),
    Counter(CounterVec),
}

pub struct MetricsExporter {
    registry: Registry,
    families: HashMap<&'static str, Family>,
    ledger: CounterLedger,
}

impl MetricsExporter {
    /// Fresh registry. On Linux the process collector (CPU, memory, file
    /// descriptors of the simulator itself) is registered up front.
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        #[cfg(target_os = "linux")]
        registry.register(Box::new(
            prometheus::process_collector::ProcessCollector::for_self(),
        ))?;

        Ok(Self {
            registry,
            families: HashMap::new(),
            ledger: CounterLedger::new(),
        })
    }

    /// Fold `samples` into the registry and encode everything.
    pub fn render(&mut self, samples: &[Sample]) -> Result<String> {
        self.observe(samples)?;
        self.encode()
    }

    pub fn observe(&mut self, samples: &[Sample]) -> Result<()> {
        let mut seen: HashSet<&'static str> = HashSet::new();

        for sample in samples {
            seen.insert(sample.name);
            let label_value = sample.label.as_ref().map(|(_, v)| v.as_str());
            let values: Vec<&str> = label_value.into_iter().collect();

            match self.family(sample)? {
                Family::Gauge(vec) => {
                    vec.get_metric_with_label_values(values.as_slice())?
                        .set(sample.value);
                }
                Family::Counter(vec) => {
                    let counter = vec.get_metric_with_label_values(values.as_slice())?;
                    let delta = self
                        .ledger
                        .advance(&series_key(sample.name, label_value), sample.value);
                    if delta > 0.0 {
                        counter.inc_by(delta);
                    }
                }
            }
        }

        // A gauge that stopped reporting (an unset optional field) must not
        // keep exposing its last value.
        for (name, family) in &self.families {
            if let Family::Gauge(vec) = family {
                if !seen.contains(name) {
                    vec.reset();
                }
            }
        }

        Ok(())
    }

    pub fn encode(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }

    fn family(&mut self, sample: &Sample) -> Result<Family> {
        if let Some(family) = self.families.get(sample.name) {
            return Ok(family.clone());
        }

        let opts = Opts::new(sample.name, sample.help);
        let label_names: Vec<&str> = sample.label.iter().map(|(k, _)| *k).collect();
        let family = match sample.kind {
            SampleKind::Gauge => {
                let vec = GaugeVec::new(opts, label_names.as_slice())?;
                self.registry.register(Box::new(vec.clone()))?;
                Family::Gauge(vec)
            }
            SampleKind::Counter => {
                let vec = CounterVec::new(opts, label_names.as_slice())?;
                self.registry.register(Box::new(vec.clone()))?;
                Family::Counter(vec)
            }
        };
        debug!(metric = sample.name, "registered metric family");
        self.families.insert(sample.name, family.clone());
        Ok(family)
    }
}
