use chrono::{DateTime, NaiveDateTime, Utc};

const TIMESTAMP_FORMAT: &str = "%d/%m/%Y %H:%M";
const BYTE_ORDER_MARK: char = '\u{feff}';

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedLogLine<'a> {
    pub instant: DateTime<Utc>,
    pub body: &'a str,
}

pub fn parse_log_line(line: &str) -> Option<ParsedLogLine<'_>> {
    let trimmed_line = line.trim_start_matches(BYTE_ORDER_MARK).trim();
    if trimmed_line.is_empty() {
        return None;
    }

    let envelope = trimmed_line.strip_prefix('(')?;
    let (raw_timestamp, remainder) = envelope.split_once(')')?;
    let instant = parse_log_timestamp(raw_timestamp)?;

    let body = remainder.trim();
    if body.is_empty() {
        return None;
    }

    Some(ParsedLogLine { instant, body })
}

// Server clocks write local-looking timestamps; they are treated as UTC
// regardless of server locale. Day/month/hour/minute may be unpadded.
pub fn parse_log_timestamp(raw_timestamp: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(raw_timestamp.trim(), TIMESTAMP_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::{parse_log_line, parse_log_timestamp};
    use chrono::{TimeZone, Utc};

    #[test]
    fn parses_envelope_with_padded_fields() {
        let parsed = parse_log_line("(05/06/2024 14:30) Player died (Bob)")
            .expect("Expected envelope line to parse");

        assert_eq!(
            parsed.instant,
            Utc.with_ymd_and_hms(2024, 6, 5, 14, 30, 0).unwrap()
        );
        assert_eq!(parsed.body, "Player died (Bob)");
    }

    #[test]
    fn parses_envelope_with_unpadded_fields() {
        let parsed = parse_log_line("(5/6/2024 9:05) Bob gained admin access!")
            .expect("Expected unpadded envelope line to parse");

        assert_eq!(
            parsed.instant,
            Utc.with_ymd_and_hms(2024, 6, 5, 9, 5, 0).unwrap()
        );
        assert_eq!(parsed.body, "Bob gained admin access!");
    }

    #[test]
    fn strips_byte_order_marker_and_whitespace() {
        let parsed = parse_log_line("\u{feff}  (05/06/2024 14:30) Bob took 5 damage from BP_Bear_C  ")
            .expect("Expected BOM-prefixed line to parse");

        assert_eq!(parsed.body, "Bob took 5 damage from BP_Bear_C");
    }

    #[test]
    fn rejects_lines_outside_the_envelope() {
        assert!(parse_log_line("").is_none());
        assert!(parse_log_line("LogWorld: Bringing World up for play").is_none());
        assert!(parse_log_line("(not a timestamp) Player died (Bob)").is_none());
        assert!(parse_log_line("(05/06/2024 14:30)").is_none(), "Envelope without a body carries no event");
    }

    #[test]
    fn reparsing_is_deterministic() {
        let line = "(17/03/2024 23:59) Ann(76561198000000042) finished building Construction_Wall_Wood_C_12";
        let first = parse_log_line(line).expect("Expected line to parse");
        let second = parse_log_line(line).expect("Expected line to re-parse");

        assert_eq!(first, second);
    }

    #[test]
    fn rejects_out_of_range_dates() {
        assert!(parse_log_timestamp("32/01/2024 10:00").is_none());
        assert!(parse_log_timestamp("01/13/2024 10:00").is_none());
        assert!(parse_log_timestamp("01/01/2024 24:01").is_none());
    }
}
