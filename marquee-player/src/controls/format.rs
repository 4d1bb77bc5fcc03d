/// `m:ss` below an hour, `h:mm:ss` above. Unknown or negative times render
/// as `0:00`.
pub fn format_time(seconds: f64) -> String {
    let total_seconds = if seconds.is_finite() && seconds > 0.0 {
        seconds as u64
    } else {
        0
    };
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let secs = total_seconds % 60;

    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, secs)
    } else {
        format!("{}:{:02}", minutes, secs)
    }
}

/// Speed label such as `1x`, `1.25x` or `0.5x`
pub fn format_rate(rate: f64) -> String {
    let rounded = (rate * 100.0).round() / 100.0;
    format!("{rounded}x")
}

/// Played fraction of a click at `x` on a bar `width` wide
pub fn fraction_at(x: f64, width: f64) -> Option<f64> {
    if !x.is_finite() || !width.is_finite() || width <= 0.0 {
        return None;
    }
    Some((x / width).clamp(0.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn times_switch_to_hours_past_sixty_minutes() {
        assert_eq!(format_time(0.0), "0:00");
        assert_eq!(format_time(65.9), "1:05");
        assert_eq!(format_time(3599.0), "59:59");
        assert_eq!(format_time(3600.0), "1:00:00");
        assert_eq!(format_time(7384.0), "2:03:04");
        assert_eq!(format_time(f64::NAN), "0:00");
        assert_eq!(format_time(-3.0), "0:00");
    }

    #[test]
    fn rates_drop_trailing_zeros() {
        assert_eq!(format_rate(1.0), "1x");
        assert_eq!(format_rate(1.25), "1.25x");
        assert_eq!(format_rate(0.5), "0.5x");
    }

    #[test]
    fn clicks_outside_the_bar_clamp() {
        assert_eq!(fraction_at(50.0, 200.0), Some(0.25));
        assert_eq!(fraction_at(-4.0, 200.0), Some(0.0));
        assert_eq!(fraction_at(260.0, 200.0), Some(1.0));
        assert_eq!(fraction_at(10.0, 0.0), None);
    }
}
