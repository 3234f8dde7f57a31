//! Custom Askama template filters.

#![allow(clippy::unnecessary_wraps)]

use std::fmt::Display;

use siddha_clinic_core::{BadgeVariant, ConsultationStatus, InquiryStatus, Price, StockStatus};

/// Returns the current year.
///
/// Usage in templates: `{{ ""|current_year }}`
#[allow(clippy::unnecessary_wraps)]
#[askama::filter_fn]
pub fn current_year(_value: impl Display, _env: &dyn askama::Values) -> askama::Result<i32> {
    use chrono::Datelike;
    Ok(chrono::Utc::now().year())
}

/// Formats a raw amount as rupees. Text that is not an amount passes through.
///
/// Usage in templates: `{{ draft.price|rupees }}`
#[allow(clippy::unnecessary_wraps)]
#[askama::filter_fn]
pub fn rupees(value: impl Display, _env: &dyn askama::Values) -> askama::Result<String> {
    Ok(format_rupees(&value.to_string()))
}

/// CSS classes for a status badge.
///
/// Usage in templates: `<span class="{{ row.status|badge }}">`
#[allow(clippy::unnecessary_wraps)]
#[askama::filter_fn]
pub fn badge(status: impl Display, _env: &dyn askama::Values) -> askama::Result<String> {
    Ok(badge_class(&status.to_string()))
}

fn format_rupees(raw: &str) -> String {
    Price::parse(raw).map_or_else(|_| raw.to_string(), |price| price.to_string())
}

fn badge_class(status: &str) -> String {
    let consultation = ConsultationStatus::from(status.to_string());
    let inquiry = InquiryStatus::from(status.to_string());
    let stock = StockStatus::from(status.to_string());

    let variant = if consultation.is_known() {
        consultation.badge()
    } else if inquiry.is_known() {
        inquiry.badge()
    } else if stock.is_known() {
        stock.badge()
    } else {
        BadgeVariant::Default
    };
    format!("badge badge-{}", variant.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_rupees() {
        assert_eq!(format_rupees("1250"), "₹1,250");
        assert_eq!(format_rupees("n/a"), "n/a");
    }

    #[test]
    fn test_badge_class() {
        assert_eq!(badge_class("Cancelled"), "badge badge-destructive");
        assert_eq!(badge_class("Replied"), "badge badge-secondary");
        assert_eq!(badge_class("Out of Stock"), "badge badge-destructive");
        assert_eq!(badge_class("Rescheduled"), "badge badge-default");
    }
}
