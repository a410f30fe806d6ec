//! Kubernetes-style resource quantity formatting and parsing.

/// Format millicores: `<n>m` for <1000, else `%.2f` cores.
pub fn format_cpu(millicores: f64) -> String {
    if millicores < 1000.0 {
        format!("{}m", millicores.round() as i64)
    } else {
        format!("{:.2}", millicores / 1000.0)
    }
}

const KI: f64 = 1024.0;
const MI: f64 = KI * 1024.0;
const GI: f64 = MI * 1024.0;

/// Format memory bytes using the largest unit in {Gi, Mi, Ki, bytes} that
/// divides the value evenly; falls back to Mi (not necessarily whole) if
/// none divide evenly.
pub fn format_memory(bytes: f64) -> String {
    let rounded = bytes.round();
    if rounded > 0.0 && rounded % GI == 0.0 {
        return format!("{}Gi", (rounded / GI) as i64);
    }
    if rounded > 0.0 && rounded % MI == 0.0 {
        return format!("{}Mi", (rounded / MI) as i64);
    }
    if rounded > 0.0 && rounded % KI == 0.0 {
        return format!("{}Ki", (rounded / KI) as i64);
    }
    if rounded == 0.0 {
        return "0".to_string();
    }
    format!("{:.2}Mi", bytes / MI)
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum QuantityParseError {
    #[error("empty quantity string")]
    Empty,
    #[error("invalid numeric component in '{0}'")]
    InvalidNumber(String),
    #[error("unrecognized unit suffix in '{0}'")]
    UnknownUnit(String),
}

/// Parse a CPU quantity string (`500m`, `0.5`, `1`) into millicores.
pub fn parse_cpu(s: &str) -> Result<f64, QuantityParseError> {
    let s = s.trim();
    if s.is_empty() {
        return Err(QuantityParseError::Empty);
    }
    if let Some(stripped) = s.strip_suffix('m') {
        return stripped.parse::<f64>().map_err(|_| QuantityParseError::InvalidNumber(s.to_string()));
    }
    s.parse::<f64>()
        .map(|cores| cores * 1000.0)
        .map_err(|_| QuantityParseError::InvalidNumber(s.to_string()))
}

/// Parse a memory quantity string (`512Mi`, `1Gi`, `2048Ki`, raw bytes)
/// into bytes.
pub fn parse_memory(s: &str) -> Result<f64, QuantityParseError> {
    let s = s.trim();
    if s.is_empty() {
        return Err(QuantityParseError::Empty);
    }
    let (number, multiplier) = if let Some(n) = s.strip_suffix("Gi") {
        (n, GI)
    } else if let Some(n) = s.strip_suffix("Mi") {
        (n, MI)
    } else if let Some(n) = s.strip_suffix("Ki") {
        (n, KI)
    } else if let Some(n) = s.strip_suffix('G') {
        (n, 1_000_000_000.0)
    } else if let Some(n) = s.strip_suffix('M') {
        (n, 1_000_000.0)
    } else if let Some(n) = s.strip_suffix('K') {
        (n, 1_000.0)
    } else {
        (s, 1.0)
    };
    number
        .parse::<f64>()
        .map(|v| v * multiplier)
        .map_err(|_| QuantityParseError::InvalidNumber(s.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_cpu_under_and_over_one_core() {
        assert_eq!(format_cpu(500.0), "500m");
        assert_eq!(format_cpu(1500.0), "1.50");
    }

    #[test]
    fn formats_memory_largest_evenly_dividing_unit() {
        assert_eq!(format_memory(GI), "1Gi");
        assert_eq!(format_memory(512.0 * MI), "512Mi");
        assert_eq!(format_memory(2.0 * KI), "2Ki");
    }

    #[test]
    fn parses_round_trip() {
        assert!((parse_cpu("500m").unwrap() - 500.0).abs() < 1e-9);
        assert!((parse_cpu("1.5").unwrap() - 1500.0).abs() < 1e-9);
        assert!((parse_memory("512Mi").unwrap() - 512.0 * MI).abs() < 1e-6);
        assert!((parse_memory("1Gi").unwrap() - GI).abs() < 1e-6);
    }

    #[test]
    fn rejects_empty_and_invalid() {
        assert_eq!(parse_cpu(""), Err(QuantityParseError::Empty));
        assert!(parse_cpu("abc").is_err());
    }
}
