//! Handoff helpers: human-readable summaries and keyword matching.

use chrono::Duration;

/// Characters of transcript kept in a handoff summary
pub const TRANSCRIPT_TAIL_CHARS: usize = 500;

/// Inputs for [`build_summary`]
#[derive(Debug, Clone)]
pub struct SummaryInput<'a> {
    pub phone_number: &'a str,
    pub bot_duration: Duration,
    pub reason: &'a str,
    pub transcript: &'a str,
}

/// Summary handed to the human agent receiving a transfer.
pub fn build_summary(input: &SummaryInput<'_>) -> String {
    let mut summary = format!(
        "Caller: {}\nTime with assistant: {}\nTransfer reason: {}",
        input.phone_number,
        format_duration(input.bot_duration),
        input.reason
    );

    let tail = transcript_tail(input.transcript, TRANSCRIPT_TAIL_CHARS);
    if tail.is_empty() {
        summary.push_str("\nTranscript: (not available)");
    } else {
        summary.push_str("\nRecent conversation:\n");
        summary.push_str(&tail);
    }
    summary
}

/// `1m 05s` style duration; negative durations render as zero.
pub fn format_duration(duration: Duration) -> String {
    let total = duration.num_seconds().max(0);
    let (minutes, seconds) = (total / 60, total % 60);
    if minutes > 0 {
        format!("{}m {:02}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}

/// Last `max_chars` characters of `transcript`, prefixed with `…` when cut.
pub fn transcript_tail(transcript: &str, max_chars: usize) -> String {
    let trimmed = transcript.trim();
    let count = trimmed.chars().count();
    if count <= max_chars {
        return trimmed.to_string();
    }
    let tail: String = trimmed.chars().skip(count - max_chars).collect();
    format!("…{}", tail)
}

/// Lowercase and strip Spanish acute accents for keyword comparison.
pub fn normalize_for_matching(text: &str) -> String {
    text.chars()
        .flat_map(char::to_lowercase)
        .map(|c| match c {
            'á' => 'a',
            'é' => 'e',
            'í' => 'i',
            'ó' => 'o',
            'ú' | 'ü' => 'u',
            other => other,
        })
        .collect()
}

/// First configured keyword that appears in `text`.
pub fn find_keyword<'a>(text: &str, keywords: &'a [String]) -> Option<&'a str> {
    let haystack = normalize_for_matching(text);
    keywords
        .iter()
        .map(String::as_str)
        .find(|keyword| {
            let needle = normalize_for_matching(keyword.trim());
            !needle.is_empty() && haystack.contains(&needle)
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_contains_all_parts() {
        let summary = build_summary(&SummaryInput {
            phone_number: "+573001112233",
            bot_duration: Duration::seconds(125),
            reason: "max duration exceeded",
            transcript: "Caller: hola\nAgent: buenas tardes",
        });

        assert!(summary.contains("+573001112233"));
        assert!(summary.contains("2m 05s"));
        assert!(summary.contains("max duration exceeded"));
        assert!(summary.contains("Agent: buenas tardes"));
    }

    #[test]
    fn test_summary_without_transcript() {
        let summary = build_summary(&SummaryInput {
            phone_number: "3001112233",
            bot_duration: Duration::seconds(9),
            reason: "manual transfer",
            transcript: "  ",
        });
        assert!(summary.contains("9s"));
        assert!(summary.contains("(not available)"));
    }

    #[test]
    fn test_transcript_tail_is_char_safe() {
        let tail = transcript_tail("ñañañaña", 3);
        assert_eq!(tail, "…aña");
        assert_eq!(transcript_tail("corto", 10), "corto");
    }

    #[test]
    fn test_keyword_matching_ignores_case_and_accents() {
        let keywords = vec!["asesor".to_string(), "reclamación".to_string()];
        assert_eq!(find_keyword("Quiero hablar con un ASESOR", &keywords), Some("asesor"));
        assert_eq!(find_keyword("tengo una reclamacion", &keywords), Some("reclamación"));
        assert_eq!(find_keyword("solo una consulta", &keywords), None);
    }

    #[test]
    fn test_blank_keywords_never_match() {
        let keywords = vec!["  ".to_string()];
        assert_eq!(find_keyword("cualquier cosa", &keywords), None);
    }
}
