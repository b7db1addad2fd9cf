use eod_ledger::Micros;

/// Render micros as `<symbol>1,234,567.89`; negatives as `-<symbol>...`.
///
/// Rounded to two decimals, half away from zero.
pub fn fmt_money(v: Micros, symbol: &str) -> String {
    let raw = v.raw() as i128;
    let neg = raw < 0;
    let abs = raw.unsigned_abs();

    // micros -> cents, half away from zero
    let cents = (abs + 5_000) / 10_000;
    let units = cents / 100;
    let frac = cents % 100;

    let digits = units.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    let sign = if neg && cents > 0 { "-" } else { "" };
    format!("{sign}{symbol}{grouped}.{frac:02}")
}
