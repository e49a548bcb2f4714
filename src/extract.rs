//! Field extraction from resume text.
//!
//! Pure functions that pull contact fields out of plain text using
//! layered heuristics: explicit links first, keyword-adjacent matches
//! second, bare pattern matches last. No I/O happens here, which keeps
//! the whole module unit-testable with string fixtures.

use std::sync::LazyLock;

use regex::Regex;

/// Country code prepended to bare 10-digit numbers before validation.
const DEFAULT_COUNTRY_PREFIX: &str = "+91";

static MAILTO_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"mailto:\s*([A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,})").unwrap()
});

static KEYWORD_EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?:email|e-mail|mail)[\s:]*.*?(?:href=["'])?(?:mailto:)?([A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,})"#)
        .unwrap()
});

static BARE_EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b").unwrap()
});

static PHONE_PUNCT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[\s\-\(\)\.]").unwrap());

static DIGIT_RUN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d{7,15}").unwrap());

static LEADING_PHONE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\+?\d").unwrap());

static LINKEDIN_HREF_RES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        Regex::new(r#"href=["'](https?://(?:www\.)?linkedin\.com/in/[a-zA-Z0-9\-]+)["']"#).unwrap(),
        Regex::new(r#"href=["'](linkedin\.com/in/[a-zA-Z0-9\-]+)["']"#).unwrap(),
    ]
});

static LINKEDIN_KEYWORD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?:linkedin|linked\s*in)[\s:]*.*?(?:href=["'])?(https?://(?:www\.)?linkedin\.com/in/[a-zA-Z0-9\-]+)"#)
        .unwrap()
});

static LINKEDIN_PROFILE_RES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        Regex::new(r"https?://(?:www\.)?linkedin\.com/in/([a-zA-Z0-9\-]+)").unwrap(),
        Regex::new(r"linkedin\.com/in/([a-zA-Z0-9\-]+)").unwrap(),
        Regex::new(r"www\.linkedin\.com/in/([a-zA-Z0-9\-]+)").unwrap(),
        Regex::new(r"linkedin\.com/profile/view\?id=([a-zA-Z0-9\-]+)").unwrap(),
    ]
});

static LINKEDIN_LOOSE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"https?://(?:www\.)?linkedin\.com/in/[a-zA-Z0-9\-]+").unwrap());

// GitHub usernames: alphanumeric plus hyphen, at most 39 chars.
static GITHUB_HREF_RES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        Regex::new(r#"href=["'](https?://(?:www\.)?github\.com/[A-Za-z0-9-]{1,39})["']"#).unwrap(),
        Regex::new(r#"href=["'](github\.com/[A-Za-z0-9-]{1,39})["']"#).unwrap(),
    ]
});

static GITHUB_KEYWORD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?:github|git\s*hub)[\s:]*.*?(?:href=["'])?(https?://(?:www\.)?github\.com/[A-Za-z0-9-]{1,39})"#)
        .unwrap()
});

static GITHUB_PROFILE_RES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        Regex::new(r"https?://(?:www\.)?github\.com/([A-Za-z0-9-]{1,39})").unwrap(),
        Regex::new(r"github\.com/([A-Za-z0-9-]{1,39})").unwrap(),
        Regex::new(r"www\.github\.com/([A-Za-z0-9-]{1,39})").unwrap(),
    ]
});

static GITHUB_LOOSE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"https?://(?:www\.)?github\.com/[A-Za-z0-9-]{1,39}").unwrap());

/// Extract an email address from resume text.
///
/// Strategies in priority order:
/// 1. `mailto:` links (covers HTML `href="mailto:..."` exports)
/// 2. An address near an "email" / "e-mail" / "mail" label
/// 3. The first bare address anywhere in the text
pub fn extract_email(text: &str) -> Option<String> {
    if let Some(captures) = MAILTO_RE.captures(text) {
        if let Some(address) = captures.get(1) {
            return Some(address.as_str().to_lowercase());
        }
    }

    if let Some(captures) = KEYWORD_EMAIL_RE.captures(text) {
        if let Some(address) = captures.get(1) {
            return Some(address.as_str().to_lowercase());
        }
    }

    BARE_EMAIL_RE.find(text).map(|m| m.as_str().to_lowercase())
}

/// Normalize text containing a phone number into E.164 form.
///
/// Tries a strict parse of the whole input first. Failing that, strips
/// punctuation and scans for digit runs: a 10-digit run gets the default
/// country code, longer runs get a bare `+`. The first candidate that
/// survives validation wins.
pub fn normalize_phone(text: &str) -> Option<String> {
    if let Some(formatted) = validate_and_format(text) {
        return Some(formatted);
    }

    let stripped = PHONE_PUNCT_RE.replace_all(text, "");
    for run in DIGIT_RUN_RE.find_iter(&stripped) {
        let digits = run.as_str();
        let candidate = if digits.len() == 10 {
            format!("{DEFAULT_COUNTRY_PREFIX}{digits}")
        } else if digits.len() > 10 {
            format!("+{digits}")
        } else {
            digits.to_string()
        };

        if let Some(formatted) = validate_and_format(&candidate) {
            return Some(formatted);
        }
    }

    None
}

/// Extract a LinkedIn profile URL, normalized to `https://www.linkedin.com`.
pub fn extract_linkedin(text: &str) -> Option<String> {
    for regex in LINKEDIN_HREF_RES.iter() {
        if let Some(captures) = regex.captures(text) {
            let mut url = captures.get(1)?.as_str().to_string();
            if !url.to_ascii_lowercase().starts_with("http") {
                url = format!("https://www.{url}");
            }
            return Some(url);
        }
    }

    if let Some(captures) = LINKEDIN_KEYWORD_RE.captures(text) {
        return captures.get(1).map(|m| m.as_str().to_string());
    }

    for regex in LINKEDIN_PROFILE_RES.iter() {
        if let Some(captures) = regex.captures(text) {
            if let Some(username) = captures.get(1) {
                return Some(format!("https://www.linkedin.com/in/{}", username.as_str()));
            }
        }
    }

    LINKEDIN_LOOSE_RE.find(text).map(|m| m.as_str().to_string())
}

/// Extract a GitHub profile URL, normalized to `https://github.com`.
pub fn extract_github(text: &str) -> Option<String> {
    for regex in GITHUB_HREF_RES.iter() {
        if let Some(captures) = regex.captures(text) {
            let mut url = captures.get(1)?.as_str().to_string();
            if !url.to_ascii_lowercase().starts_with("http") {
                url = format!("https://{url}");
            }
            return Some(url);
        }
    }

    if let Some(captures) = GITHUB_KEYWORD_RE.captures(text) {
        return captures.get(1).map(|m| m.as_str().to_string());
    }

    for regex in GITHUB_PROFILE_RES.iter() {
        if let Some(captures) = regex.captures(text) {
            if let Some(username) = captures.get(1) {
                return Some(format!("https://github.com/{}", username.as_str()));
            }
        }
    }

    GITHUB_LOOSE_RE.find(text).map(|m| m.as_str().to_string())
}

/// Guess the candidate's name from the top of the document.
///
/// Candidate lines are the first 30 lines, plus the line above any of
/// the first 50 lines that mentions a contact keyword (resumes commonly
/// put the name directly above the contact block). A line qualifies when
/// it is 2-4 words, every word capitalized, at most 50 chars, and looks
/// like neither an email nor a phone number.
pub fn guess_name(text: &str) -> Option<String> {
    let lines: Vec<&str> = text.lines().collect();
    let mut candidates: Vec<&str> = lines.iter().take(30).copied().collect();

    let contact_keywords = ["email", "phone", "contact", "mobile", "tel"];
    for i in 0..lines.len().min(50) {
        let lowered = lines[i].to_lowercase();
        if contact_keywords.iter().any(|k| lowered.contains(k)) && i > 0 {
            candidates.push(lines[i - 1]);
        }
    }

    for raw in candidates {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }
        if line.contains('@') || line.len() > 50 || LEADING_PHONE_RE.is_match(line) {
            continue;
        }

        let words: Vec<&str> = line.split_whitespace().collect();
        if words.len() < 2 || words.len() > 4 {
            continue;
        }

        let all_capitalized = words
            .iter()
            .all(|w| w.chars().next().map(|c| c.is_uppercase()).unwrap_or(false));
        if all_capitalized {
            return Some(line.to_string());
        }
    }

    None
}

/// Extract every contact field in one pass.
///
/// Returns `(email, phone, linked_in, git_hub)`.
pub fn extract_fields(
    text: &str,
) -> (
    Option<String>,
    Option<String>,
    Option<String>,
    Option<String>,
) {
    (
        extract_email(text),
        normalize_phone(text),
        extract_linkedin(text),
        extract_github(text),
    )
}

/// Score how complete an extraction is.
///
/// Weighted sum: email 0.40, phone 0.25, name 0.15, LinkedIn 0.10,
/// GitHub 0.05, plus 0.05 when the text came straight out of the
/// document rather than through OCR. Clamped to 1.0; blank strings
/// count as absent.
pub fn score_confidence(
    name: Option<&str>,
    email: Option<&str>,
    phone: Option<&str>,
    linked_in: Option<&str>,
    git_hub: Option<&str>,
    ocr_used: bool,
) -> f64 {
    let mut score: f64 = 0.0;

    if email.is_some_and(|v| !v.trim().is_empty()) {
        score += 0.4;
    }
    if phone.is_some_and(|v| !v.trim().is_empty()) {
        score += 0.25;
    }
    if name.is_some_and(|v| !v.trim().is_empty()) {
        score += 0.15;
    }
    if linked_in.is_some_and(|v| !v.trim().is_empty()) {
        score += 0.1;
    }
    if git_hub.is_some_and(|v| !v.trim().is_empty()) {
        score += 0.05;
    }
    if !ocr_used {
        score += 0.05;
    }

    score.min(1.0)
}

fn validate_and_format(input: &str) -> Option<String> {
    let parsed = phonenumber::parse(None, input).ok()?;
    if !phonenumber::is_valid(&parsed) {
        return None;
    }
    Some(parsed.format().mode(phonenumber::Mode::E164).to_string())
}
