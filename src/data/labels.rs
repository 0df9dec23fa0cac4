//! Ground-truth label parsing for stored records.
//!
//! Clinical metadata arrives as free text ("80%", "3+", "阴性", "nan"...).
//! Every parser maps it to `1` (positive), `0` (negative) or
//! [`MISSING_LABEL`] when no ground truth can be read.

/// Sentinel for "no ground truth"; excluded from loss and metrics.
pub const MISSING_LABEL: i8 = -1;

/// Ki67 proliferation index threshold (percent) for "high".
pub const KI67_HIGH_THRESHOLD: f64 = 14.0;

/// Normalise a raw cell; `None` when the cell carries no value.
fn clean(value: Option<&str>) -> Option<String> {
    let s = value?.trim().to_lowercase();
    match s.as_str() {
        "" | "nan" | "none" | "null" => None,
        _ => Some(s),
    }
}

/// First run of ASCII digits directly followed by `%`.
fn percent_value(s: &str) -> Option<f64> {
    let bytes = s.as_bytes();
    for (pos, &b) in bytes.iter().enumerate() {
        if b != b'%' {
            continue;
        }
        let start = bytes[..pos]
            .iter()
            .rposition(|c| !c.is_ascii_digit())
            .map_or(0, |p| p + 1);
        if start < pos {
            return s[start..pos].parse().ok();
        }
    }
    None
}

/// First run of ASCII digits anywhere in the text.
fn first_number(s: &str) -> Option<f64> {
    let start = s.find(|c: char| c.is_ascii_digit())?;
    let end = s[start..]
        .find(|c: char| !c.is_ascii_digit())
        .map_or(s.len(), |off| start + off);
    s[start..end].parse().ok()
}

/// Diagnosis text → `Some(1)` malignant, `Some(0)` benign, `None` unlabeled.
pub fn parse_diagnosis(value: Option<&str>) -> Option<u8> {
    let s = clean(value)?;
    match s.as_str() {
        "malignant" | "1" | "恶性" => Some(1),
        "benign" | "0" | "良性" => Some(0),
        _ => None,
    }
}

/// ER / PR status. Explicit negative wins over explicit positive; a
/// percentage of at least 1% counts as positive.
pub fn parse_er_pr(value: Option<&str>) -> i8 {
    let Some(s) = clean(value) else {
        return MISSING_LABEL;
    };
    if ["-", "阴性", "negative"].iter().any(|k| s.contains(k)) {
        return 0;
    }
    if ["+", "阳性", "positive"].iter().any(|k| s.contains(k)) {
        return 1;
    }
    match percent_value(&s) {
        Some(v) if v >= 1.0 => 1,
        Some(_) => 0,
        None => MISSING_LABEL,
    }
}

/// HER2 IHC score: `3+` positive, `0`/`1+` negative, `2+` equivocal (missing
/// for binary training unless resolved upstream).
pub fn parse_her2(value: Option<&str>) -> i8 {
    let Some(s) = clean(value) else {
        return MISSING_LABEL;
    };
    if s.contains("3+") || s.contains("positive") || s.contains("阳性") {
        return 1;
    }
    if s.contains('0') || s.contains("1+") || s.contains("negative") || s.contains("阴性") {
        return 0;
    }
    MISSING_LABEL
}

/// Ki67 index: high (`1`) at or above [`KI67_HIGH_THRESHOLD`].
pub fn parse_ki67(value: Option<&str>) -> i8 {
    let Some(s) = clean(value) else {
        return MISSING_LABEL;
    };
    match first_number(&s) {
        Some(v) if v >= KI67_HIGH_THRESHOLD => 1,
        Some(_) => 0,
        None => MISSING_LABEL,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn er_pr_statuses() {
        assert_eq!(parse_er_pr(Some("80%")), 1);
        assert_eq!(parse_er_pr(Some("0%")), 0);
        assert_eq!(parse_er_pr(Some("Positive")), 1);
        assert_eq!(parse_er_pr(Some("阴性")), 0);
        assert_eq!(parse_er_pr(Some("-")), 0);
        assert_eq!(parse_er_pr(Some("++")), 1);
        assert_eq!(parse_er_pr(Some("NaN")), MISSING_LABEL);
        assert_eq!(parse_er_pr(None), MISSING_LABEL);
        assert_eq!(parse_er_pr(Some("unclear")), MISSING_LABEL);
    }

    #[test]
    fn her2_scores() {
        assert_eq!(parse_her2(Some("3+")), 1);
        assert_eq!(parse_her2(Some("1+")), 0);
        assert_eq!(parse_her2(Some("0")), 0);
        assert_eq!(parse_her2(Some("2+")), MISSING_LABEL);
        assert_eq!(parse_her2(Some("")), MISSING_LABEL);
    }

    #[test]
    fn ki67_threshold() {
        assert_eq!(parse_ki67(Some("30%")), 1);
        assert_eq!(parse_ki67(Some("14")), 1);
        assert_eq!(parse_ki67(Some("5%")), 0);
        assert_eq!(parse_ki67(Some("high")), MISSING_LABEL);
    }

    #[test]
    fn diagnosis_text() {
        assert_eq!(parse_diagnosis(Some("Malignant")), Some(1));
        assert_eq!(parse_diagnosis(Some(" benign ")), Some(0));
        assert_eq!(parse_diagnosis(Some("恶性")), Some(1));
        assert_eq!(parse_diagnosis(Some("pending")), None);
        assert_eq!(parse_diagnosis(None), None);
    }
}
