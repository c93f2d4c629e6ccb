pub fn format_pp(pp: f64) -> String {
    format!("{:.2}", pp)
}

/// Always carries the sign, so gains and losses read the same way.
pub fn format_signed(delta: f64) -> String {
    format!("{:+.2}", delta)
}

// A lower rank number is better: moving from #120 to #117 is a climb of 3.
pub fn format_rank_delta(delta: i64) -> String {
    match delta {
        0 => String::new(),
        d if d < 0 => format!("▲{}", -d),
        d => format!("▼{}", d),
    }
}
