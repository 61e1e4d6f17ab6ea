//! Generation metrics, cost computation and process-wide usage accounting.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::model::ModelDescriptor;

/// Token usage and timings reported for one generation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatGenerateMetrics {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub t_in: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub t_cache_read: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub t_cache_write: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub t_out: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub t_out_reasoning: Option<u32>,
    /// Time to first token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dt_start_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dt_all_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub costs: Option<ChatGenerateCosts>,
}

impl ChatGenerateMetrics {
    /// Input tokens including cache reads and writes.
    pub fn total_input_tokens(&self) -> u64 {
        [self.t_in, self.t_cache_read, self.t_cache_write]
            .iter()
            .map(|t| u64::from(t.unwrap_or(0)))
            .sum()
    }

    pub fn total_output_tokens(&self) -> u64 {
        u64::from(self.t_out.unwrap_or(0))
    }
}

/// Chat pricing in USD per million tokens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatPricing {
    pub input: f64,
    pub output: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_read: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_write: Option<f64>,
}

impl ChatPricing {
    pub fn new(input: f64, output: f64) -> Self {
        Self {
            input,
            output,
            cache_read: None,
            cache_write: None,
        }
    }
}

/// Derived costs in USD.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatGenerateCosts {
    pub c_in: f64,
    pub c_out: f64,
    pub c_total: f64,
    /// What cache reads saved compared to uncached input.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub c_cache_savings: Option<f64>,
}

const PER_MILLION: f64 = 1_000_000.0;

/// Compute costs from metrics and a pricing table entry.
///
/// Returns `None` when either is missing or the token counts are incomplete.
pub fn compute_chat_generation_costs(
    metrics: Option<&ChatGenerateMetrics>,
    pricing: Option<&ChatPricing>,
) -> Option<ChatGenerateCosts> {
    let metrics = metrics?;
    let pricing = pricing?;
    let t_in = f64::from(metrics.t_in?);
    let t_out = f64::from(metrics.t_out?);

    let t_cache_read = f64::from(metrics.t_cache_read.unwrap_or(0));
    let t_cache_write = f64::from(metrics.t_cache_write.unwrap_or(0));
    let cache_read_price = pricing.cache_read.unwrap_or(pricing.input);
    let cache_write_price = pricing.cache_write.unwrap_or(pricing.input);

    let c_in = (t_in * pricing.input
        + t_cache_read * cache_read_price
        + t_cache_write * cache_write_price)
        / PER_MILLION;
    let c_out = t_out * pricing.output / PER_MILLION;

    let c_cache_savings = (t_cache_read > 0.0)
        .then(|| (t_cache_read * (pricing.input - cache_read_price) / PER_MILLION).max(0.0));

    Some(ChatGenerateCosts {
        c_in,
        c_out,
        c_total: c_in + c_out,
        c_cache_savings,
    })
}

/// Receives the totals of every successfully completed generation.
pub trait MetricsSink: Send + Sync {
    fn add_chat_generate(
        &self,
        costs: &ChatGenerateCosts,
        model: &ModelDescriptor,
        input_tokens: u64,
        output_tokens: u64,
    );
}

/// Lock-free process-wide usage counter.
///
/// Cost is kept in nano-dollars so it can be accumulated atomically.
#[derive(Debug, Default)]
pub struct UsageCounter {
    generations: AtomicU64,
    input_tokens: AtomicU64,
    output_tokens: AtomicU64,
    cost_nano_usd: AtomicU64,
}

/// A point-in-time view of a [`UsageCounter`].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct UsageTotals {
    pub generations: u64,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub cost_usd: f64,
}

impl UsageCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> UsageTotals {
        UsageTotals {
            generations: self.generations.load(Ordering::Relaxed),
            input_tokens: self.input_tokens.load(Ordering::Relaxed),
            output_tokens: self.output_tokens.load(Ordering::Relaxed),
            cost_usd: self.cost_nano_usd.load(Ordering::Relaxed) as f64 / 1e9,
        }
    }
}

impl MetricsSink for UsageCounter {
    fn add_chat_generate(
        &self,
        costs: &ChatGenerateCosts,
        model: &ModelDescriptor,
        input_tokens: u64,
        output_tokens: u64,
    ) {
        let nano_usd = (costs.c_total.max(0.0) * 1e9).round() as u64;
        self.generations.fetch_add(1, Ordering::Relaxed);
        self.input_tokens.fetch_add(input_tokens, Ordering::Relaxed);
        self.output_tokens.fetch_add(output_tokens, Ordering::Relaxed);
        self.cost_nano_usd.fetch_add(nano_usd, Ordering::Relaxed);
        tracing::debug!(
            model = %model.id,
            input_tokens,
            output_tokens,
            cost_usd = costs.c_total,
            "recorded chat generation usage"
        );
    }
}
