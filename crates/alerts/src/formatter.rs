use std::collections::BTreeMap;

use chrono::FixedOffset;
use serde::{Deserialize, Serialize};

use stockwatch_inventory::{BalanceComparison, Snapshot, Unit};

use crate::change::ChangeKind;
use crate::classifier::AlertEvent;
use crate::error::ConfigError;
use crate::render;

/// Message rendering options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormatterConfig {
    /// Upper bound for one payload's text, in bytes.
    pub max_payload_bytes: usize,
    /// Append the full list of current quantities after the changes.
    pub include_current_levels: bool,
    /// Offset used for the "Updated at" footer.
    pub utc_offset_seconds: i32,
    pub zone_label: String,
}

impl Default for FormatterConfig {
    fn default() -> Self {
        Self {
            max_payload_bytes: 4000,
            include_current_levels: true,
            utc_offset_seconds: 3600,
            zone_label: "WAT".to_string(),
        }
    }
}

/// Per-stream inputs to rendering.
#[derive(Debug, Clone, Copy)]
pub struct RenderContext<'a> {
    pub title: &'a str,
    pub current: &'a Snapshot,
    /// Render piece counts as bags of this size in the current levels section.
    pub pieces_per_bag: Option<u32>,
    pub balance: Option<&'a BalanceComparison>,
}

impl<'a> RenderContext<'a> {
    pub fn new(title: &'a str, current: &'a Snapshot) -> Self {
        Self {
            title,
            current,
            pieces_per_bag: None,
            balance: None,
        }
    }

    pub fn with_bags(mut self, pieces_per_bag: Option<u32>) -> Self {
        self.pieces_per_bag = pieces_per_bag;
        self
    }

    pub fn with_balance(mut self, balance: Option<&'a BalanceComparison>) -> Self {
        self.balance = balance;
        self
    }
}

/// One webhook message. Serializes as `{"text": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessagePayload {
    pub text: String,
}

impl MessagePayload {
    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

struct Section {
    heading: String,
    lines: Vec<String>,
}

fn block(heading: &str, lines: &[String]) -> String {
    format!("*{heading}:*\n{}", lines.join("\n"))
}

/// Renders alert events into size-bounded chat payloads.
#[derive(Debug, Clone)]
pub struct Formatter {
    config: FormatterConfig,
    offset: FixedOffset,
}

impl Formatter {
    pub fn new(config: FormatterConfig) -> Result<Self, ConfigError> {
        if config.max_payload_bytes == 0 {
            return Err(ConfigError::InvalidMaxPayload);
        }
        let offset = FixedOffset::east_opt(config.utc_offset_seconds)
            .ok_or(ConfigError::InvalidUtcOffset(config.utc_offset_seconds))?;
        Ok(Self { config, offset })
    }

    pub fn config(&self) -> &FormatterConfig {
        &self.config
    }

    /// Offset used for local timestamps.
    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    /// Render `events` into zero or more payloads.
    ///
    /// No events, no payloads. Otherwise everything goes into one message
    /// unless it exceeds `max_payload_bytes`, in which case it is split
    /// between sections first and between item lines second. An item line is
    /// never split.
    pub fn format(&self, events: &[AlertEvent], ctx: &RenderContext<'_>) -> Vec<MessagePayload> {
        if events.is_empty() {
            return Vec::new();
        }

        let sections = self.sections(events, ctx);
        let blocks: Vec<String> = sections.iter().map(|s| block(&s.heading, &s.lines)).collect();
        let footer = self.footer(ctx.current);

        let single = assemble(&header(ctx.title, None), &blocks, Some(&footer));
        if single.len() <= self.config.max_payload_bytes {
            return vec![MessagePayload { text: single }];
        }

        let reserve = header(ctx.title, Some((9999, 9999))).len() + footer.len() + 4;
        let budget = self.config.max_payload_bytes.saturating_sub(reserve);

        let pieces: Vec<String> = sections
            .iter()
            .flat_map(|section| split_section(section, budget))
            .collect();
        let parts = pack(pieces, budget);

        let total = parts.len();
        parts
            .iter()
            .enumerate()
            .map(|(i, part)| {
                let counter = (total > 1).then_some((i + 1, total));
                let last = i + 1 == total;
                MessagePayload {
                    text: assemble(&header(ctx.title, counter), part, last.then_some(footer.as_str())),
                }
            })
            .collect()
    }

    fn sections(&self, events: &[AlertEvent], ctx: &RenderContext<'_>) -> Vec<Section> {
        let mut groups: BTreeMap<ChangeKind, Vec<String>> = BTreeMap::new();
        for event in events {
            groups.entry(event.category).or_default().push(event.line.clone());
        }

        let mut sections: Vec<Section> = groups
            .into_iter()
            .map(|(kind, lines)| Section {
                heading: heading(kind).to_string(),
                lines,
            })
            .collect();

        if self.config.include_current_levels && !ctx.current.is_empty() {
            let lines = ctx
                .current
                .items()
                .map(|item| {
                    let value = item.quantity().value();
                    let text = match ctx.pieces_per_bag {
                        Some(per_bag) => render::bagged(value, item.unit(), per_bag),
                        None => render::quantity(value, item.unit()),
                    };
                    format!("• {}: {text}", item.key())
                })
                .collect();
            sections.push(Section {
                heading: "Current Levels".to_string(),
                lines,
            });
        }

        // An empty sheet has nothing to reconcile.
        if let Some(balance) = ctx.balance.filter(|b| b.sheet_total > 0.0) {
            sections.push(balance_section(balance));
        }

        sections
    }

    fn footer(&self, current: &Snapshot) -> String {
        let local = current.taken_at().with_timezone(&self.offset);
        format!(
            "_Updated at: {} {}_",
            local.format("%Y-%m-%d %I:%M:%S %p"),
            self.config.zone_label
        )
    }
}

fn heading(kind: ChangeKind) -> &'static str {
    match kind {
        ChangeKind::QuantityChanged => "Quantity Changes",
        ChangeKind::Added => "New Items",
        ChangeKind::Removed => "Removed Items",
        ChangeKind::AttributeChanged => "Attribute Changes",
        ChangeKind::Unchanged => "Unchanged",
    }
}

fn balance_section(balance: &BalanceComparison) -> Section {
    let lines = if balance.matches() {
        vec![format!("✅ Stock balance matches inventory records ({})", balance.period)]
    } else {
        let diff = balance.difference();
        vec![
            format!("⚠️ Stock balance discrepancy detected ({}):", balance.period),
            format!(
                "• Specification Sheet Total: {}",
                render::quantity(balance.sheet_total, Unit::Pieces)
            ),
            format!(
                "• Inventory Records Total: {}",
                render::quantity(balance.records_total, Unit::Pieces)
            ),
            format!(
                "• Difference: {} {} in specification sheet",
                render::quantity(diff.abs(), Unit::Pieces),
                if diff > 0.0 { "more" } else { "less" }
            ),
        ]
    };
    Section {
        heading: "Stock Balance Comparison".to_string(),
        lines,
    }
}

fn header(title: &str, counter: Option<(usize, usize)>) -> String {
    match counter {
        Some((i, n)) => format!("🔔 *{title} Changes Detected* ({i}/{n})"),
        None => format!("🔔 *{title} Changes Detected*"),
    }
}

fn assemble(header: &str, blocks: &[String], footer: Option<&str>) -> String {
    let mut text = String::from(header);
    for b in blocks {
        text.push_str("\n\n");
        text.push_str(b);
    }
    if let Some(footer) = footer {
        text.push_str("\n\n");
        text.push_str(footer);
    }
    text
}

/// Split one section into blocks no larger than `budget`, between lines.
///
/// A single line larger than the budget becomes its own (oversize) block.
fn split_section(section: &Section, budget: usize) -> Vec<String> {
    let whole = block(&section.heading, &section.lines);
    if whole.len() <= budget {
        return vec![whole];
    }

    let cont = format!("{} (cont.)", section.heading);
    let mut out = Vec::new();
    let mut lines: Vec<String> = Vec::new();

    for line in &section.lines {
        let heading = if out.is_empty() { &section.heading } else { &cont };
        let mut candidate = lines.clone();
        candidate.push(line.clone());
        if lines.is_empty() || block(heading, &candidate).len() <= budget {
            lines = candidate;
        } else {
            out.push(block(heading, &lines));
            lines = vec![line.clone()];
        }
    }
    if !lines.is_empty() {
        let heading = if out.is_empty() { &section.heading } else { &cont };
        out.push(block(heading, &lines));
    }
    out
}

/// Greedily pack blocks into parts whose joined size stays within `budget`.
fn pack(pieces: Vec<String>, budget: usize) -> Vec<Vec<String>> {
    let mut parts: Vec<Vec<String>> = Vec::new();
    let mut current: Vec<String> = Vec::new();
    let mut size = 0;

    for piece in pieces {
        let added = if current.is_empty() { piece.len() } else { piece.len() + 2 };
        if !current.is_empty() && size + added > budget {
            parts.push(std::mem::take(&mut current));
            size = 0;
        }
        size += if current.is_empty() { piece.len() } else { piece.len() + 2 };
        current.push(piece);
    }
    if !current.is_empty() {
        parts.push(current);
    }
    parts
}
