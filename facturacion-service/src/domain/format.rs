//! Display formatting for printed invoices.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

/// Invoice number as printed: the id zero-padded to four digits.
pub fn invoice_number(id: i64) -> String {
    format!("{:04}", id)
}

/// Colombian peso amount: `$` prefix, `.` thousands separator and `,` before
/// cents. Cents are omitted when zero.
pub fn format_cop(amount: Decimal) -> String {
    let rounded = amount.round_dp(2);
    let negative = rounded < Decimal::ZERO;
    let abs = rounded.abs();
    let integer = abs.trunc();
    let cents = ((abs - integer) * Decimal::ONE_HUNDRED)
        .round()
        .to_u32()
        .unwrap_or(0);

    let digits = integer.normalize().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }

    let sign = if negative { "-" } else { "" };
    if cents == 0 {
        format!("{}${}", sign, grouped)
    } else {
        format!("{}${},{:02}", sign, grouped, cents)
    }
}

/// Quantity without trailing zeros (`2`, `1.5`).
pub fn format_quantity(cantidad: Decimal) -> String {
    cantidad.normalize().to_string()
}
