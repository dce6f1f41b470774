//! Human-readable rendering of quantities and change records.

use stockwatch_inventory::{Item, Unit};

use crate::change::{ChangeKind, ChangeRecord};

/// Render a quantity with its unit: `1,240 pieces`, `1 piece`, `12.50 kg`.
pub fn quantity(value: f64, unit: Unit) -> String {
    match unit {
        Unit::Kilograms => format!("{} kg", grouped(value, 2)),
        Unit::Pieces => {
            let noun = if value == 1.0 { "piece" } else { "pieces" };
            let decimals = if value.fract() == 0.0 { 0 } else { 2 };
            format!("{} {noun}", grouped(value, decimals))
        }
    }
}

/// Render a piece count as bags plus loose pieces: `62 bags, 1 piece`.
///
/// Falls back to [`quantity`] for weights and fractional counts.
pub fn bagged(value: f64, unit: Unit, per_bag: u32) -> String {
    if unit != Unit::Pieces || value.fract() != 0.0 || per_bag == 0 {
        return quantity(value, unit);
    }
    let total = value as u64;
    let bags = total / u64::from(per_bag);
    let loose = total % u64::from(per_bag);

    let bags_text = if bags == 1 {
        "1 bag".to_string()
    } else {
        format!("{} bags", grouped(bags as f64, 0))
    };
    let loose_text = if loose == 1 {
        "1 piece".to_string()
    } else {
        format!("{loose} pieces")
    };

    match (bags, loose) {
        (0, _) => loose_text,
        (_, 0) => bags_text,
        _ => format!("{bags_text}, {loose_text}"),
    }
}

/// Fixed-point formatting with `,` thousands separators.
pub fn grouped(value: f64, decimals: usize) -> String {
    let text = format!("{:.*}", decimals, value.abs());
    let (int_part, frac_part) = match text.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (text.as_str(), None),
    };

    let mut out = String::with_capacity(text.len() + int_part.len() / 3 + 1);
    if value < 0.0 && text.chars().any(|c| c.is_ascii_digit() && c != '0') {
        out.push('-');
    }
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    if let Some(frac) = frac_part {
        out.push('.');
        out.push_str(frac);
    }
    out
}

/// One bullet line describing a change record.
pub fn describe(record: &ChangeRecord) -> String {
    let key = &record.key;
    match (record.kind, &record.previous, &record.current) {
        (ChangeKind::QuantityChanged, Some(prev), Some(cur)) => {
            let delta = record
                .delta
                .unwrap_or(cur.quantity().value() - prev.quantity().value());
            let direction = if delta < 0.0 { "decreased" } else { "increased" };
            format!(
                "• {key}: {} → {} ({direction} by {})",
                quantity(prev.quantity().value(), prev.unit()),
                quantity(cur.quantity().value(), cur.unit()),
                quantity(delta.abs(), cur.unit()),
            )
        }
        (ChangeKind::Added, _, Some(cur)) => {
            format!("• {key}: {}{}", quantity(cur.quantity().value(), cur.unit()), attributes(cur))
        }
        (ChangeKind::Removed, Some(prev), _) => {
            format!("• {key} (was {})", quantity(prev.quantity().value(), prev.unit()))
        }
        (ChangeKind::AttributeChanged, Some(prev), Some(cur)) => {
            format!("• {key}: {}", attribute_changes(prev, cur).join("; "))
        }
        (_, _, Some(item)) | (_, Some(item), None) => {
            format!("• {key}: {}", quantity(item.quantity().value(), item.unit()))
        }
        (_, None, None) => format!("• {key}"),
    }
}

fn attributes(item: &Item) -> String {
    if item.attributes().is_empty() {
        return String::new();
    }
    let parts: Vec<String> = item
        .attributes()
        .iter()
        .map(|(name, value)| format!("{name}: {value}"))
        .collect();
    format!(" [{}]", parts.join(", "))
}

fn attribute_changes(prev: &Item, cur: &Item) -> Vec<String> {
    let mut changes = Vec::new();
    if prev.unit() != cur.unit() {
        changes.push(format!("unit: {} → {}", unit_name(prev.unit()), unit_name(cur.unit())));
    }

    let names: std::collections::BTreeSet<&String> =
        prev.attributes().keys().chain(cur.attributes().keys()).collect();
    for name in names {
        let old = prev.attributes().get(name);
        let new = cur.attributes().get(name);
        if old != new {
            changes.push(format!(
                "{name}: {} → {}",
                old.map(String::as_str).unwrap_or("—"),
                new.map(String::as_str).unwrap_or("—"),
            ));
        }
    }
    changes
}

fn unit_name(unit: Unit) -> &'static str {
    match unit {
        Unit::Pieces => "pieces",
        Unit::Kilograms => "kg",
    }
}
