use prometheus::{
    Counter, CounterVec, Encoder, GaugeVec, Histogram, HistogramOpts, Opts, Registry, TextEncoder,
};

/// 监控引擎自身的运行指标
pub struct MonitorMetrics {
    // 循环指标
    cycles_total: Counter,
    cycle_errors_total: Counter,
    cycle_duration: Histogram,

    // 采样指标
    sample_failures_total: CounterVec,
    metric_value: GaugeVec,

    // 通知指标
    alerts_dispatched_total: CounterVec,
    sink_failures_total: CounterVec,

    registry: Registry,
}

impl MonitorMetrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let cycles_total = Counter::new("hwmon_cycles_total", "Total number of monitor cycles")?;
        registry.register(Box::new(cycles_total.clone()))?;

        let cycle_errors_total = Counter::new(
            "hwmon_cycle_errors_total",
            "Total number of monitor cycles that failed",
        )?;
        registry.register(Box::new(cycle_errors_total.clone()))?;

        let cycle_duration = Histogram::with_opts(
            HistogramOpts::new("hwmon_cycle_duration_seconds", "Monitor cycle duration")
                .buckets(vec![0.01, 0.05, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0]),
        )?;
        registry.register(Box::new(cycle_duration.clone()))?;

        let sample_failures_total = CounterVec::new(
            Opts::new("hwmon_sample_failures_total", "Total number of failed samples"),
            &["metric"],
        )?;
        registry.register(Box::new(sample_failures_total.clone()))?;

        let metric_value = GaugeVec::new(
            Opts::new("hwmon_metric_value", "Last sampled value per metric"),
            &["metric"],
        )?;
        registry.register(Box::new(metric_value.clone()))?;

        let alerts_dispatched_total = CounterVec::new(
            Opts::new("hwmon_alerts_dispatched_total", "Total number of dispatched alerts"),
            &["metric", "status"],
        )?;
        registry.register(Box::new(alerts_dispatched_total.clone()))?;

        let sink_failures_total = CounterVec::new(
            Opts::new("hwmon_sink_failures_total", "Total number of failed sink deliveries"),
            &["sink"],
        )?;
        registry.register(Box::new(sink_failures_total.clone()))?;

        Ok(Self {
            cycles_total,
            cycle_errors_total,
            cycle_duration,
            sample_failures_total,
            metric_value,
            alerts_dispatched_total,
            sink_failures_total,
            registry,
        })
    }

    pub fn record_cycle(&self, duration_secs: f64) {
        self.cycles_total.inc();
        self.cycle_duration.observe(duration_secs);
    }

    pub fn record_cycle_error(&self) {
        self.cycle_errors_total.inc();
    }

    pub fn record_sample(&self, metric: &str, value: f64) {
        self.metric_value.with_label_values(&[metric]).set(value);
    }

    pub fn record_sample_failure(&self, metric: &str) {
        self.sample_failures_total.with_label_values(&[metric]).inc();
    }

    pub fn record_alert(&self, metric: &str, status: &str) {
        self.alerts_dispatched_total
            .with_label_values(&[metric, status])
            .inc();
    }

    pub fn record_sink_failure(&self, sink: &str) {
        self.sink_failures_total.with_label_values(&[sink]).inc();
    }

    pub fn cycles(&self) -> f64 {
        self.cycles_total.get()
    }

    pub fn cycle_errors(&self) -> f64 {
        self.cycle_errors_total.get()
    }

    pub fn sink_failures(&self, sink: &str) -> f64 {
        self.sink_failures_total.with_label_values(&[sink]).get()
    }

    /// 导出 Prometheus 文本格式
    pub fn export(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}
