//! The ordered detector battery run against a single page of HTML.
//!
//! Markup is parsed once into a [`Page`] view; every detector is a plain
//! function over that view. `html5ever` accepts any byte soup, so evaluation
//! cannot fail and never needs per-detector isolation.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Node, Selector};

use crate::lexicon::{find_poison_terms, is_social_href};
use crate::types::{Severity, Signal};

const MIN_TITLE_CHARS: usize = 10;
const MAX_TITLE_CHARS: usize = 70;
const LINK_STUFFING_MIN_LINKS: usize = 10;
const LINK_STUFFING_MIN_CHARS_PER_LINK: f64 = 150.0;
const THIN_CONTENT_MIN_RATIO: f64 = 0.1;
const EMPTY_LINKS_MAX: usize = 5;
const HEAVY_PAGE_BYTES: usize = 250_000;
const SCRIPT_TAGS_MAX: usize = 30;
const INLINE_STYLES_MAX: usize = 20;
const MISSING_ALT_MAX: usize = 5;

static TRACKING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)googletagmanager\.com|google-analytics\.com|['"]GTM-[A-Z0-9]+['"]"#)
        .expect("valid regex")
});
static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[a-zA-Z0-9._-]+@[a-zA-Z0-9._-]+\.[a-zA-Z0-9_-]+").expect("valid regex")
});
static OBFUSCATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"eval\(|unescape\(|String\.fromCharCode").expect("valid regex")
});

static BODY: LazyLock<Selector> = LazyLock::new(|| selector("body"));
static HTML_ROOT: LazyLock<Selector> = LazyLock::new(|| selector("html"));
static TITLE: LazyLock<Selector> = LazyLock::new(|| selector("title"));
static META: LazyLock<Selector> = LazyLock::new(|| selector("meta"));
static LINK_REL: LazyLock<Selector> = LazyLock::new(|| selector("link[rel]"));
static ANCHOR: LazyLock<Selector> = LazyLock::new(|| selector("a"));
static ANCHOR_HREF: LazyLock<Selector> = LazyLock::new(|| selector("a[href]"));
static H1: LazyLock<Selector> = LazyLock::new(|| selector("h1"));
static IFRAME: LazyLock<Selector> = LazyLock::new(|| selector("iframe"));
static PLUGIN: LazyLock<Selector> = LazyLock::new(|| selector("embed, object"));
static SCRIPT: LazyLock<Selector> = LazyLock::new(|| selector("script"));
static STYLED: LazyLock<Selector> = LazyLock::new(|| selector("[style]"));
static IMG: LazyLock<Selector> = LazyLock::new(|| selector("img"));

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("valid selector")
}

/// Parsed view of one page shared by all detectors.
pub(crate) struct Page<'a> {
    raw: &'a str,
    document: Html,
    body_text: String,
    body_lower: String,
    script_text: String,
}

impl<'a> Page<'a> {
    pub(crate) fn parse(raw: &'a str) -> Self {
        let document = Html::parse_document(raw);
        let body_text = document
            .select(&BODY)
            .next()
            .map(visible_text)
            .unwrap_or_default();
        let body_lower = body_text.to_lowercase();
        let script_text = document
            .select(&SCRIPT)
            .flat_map(|el| el.text())
            .collect::<String>();

        Self {
            raw,
            document,
            body_text,
            body_lower,
            script_text,
        }
    }

    fn count(&self, sel: &Selector) -> usize {
        self.document.select(sel).count()
    }

    fn has_meta_named(&self, name: &str) -> bool {
        self.document.select(&META).any(|el| {
            el.value()
                .attr("name")
                .is_some_and(|n| n.trim().eq_ignore_ascii_case(name))
        })
    }

    fn has_meta_http_equiv(&self, value: &str) -> bool {
        self.document.select(&META).any(|el| {
            el.value()
                .attr("http-equiv")
                .is_some_and(|v| v.trim().eq_ignore_ascii_case(value))
        })
    }

    fn has_link_rel(&self, pred: impl Fn(&str) -> bool) -> bool {
        self.document.select(&LINK_REL).any(|el| {
            el.value()
                .attr("rel")
                .is_some_and(|rel| {
                    rel.split_whitespace()
                        .any(|t| pred(&t.to_ascii_lowercase()))
                })
        })
    }

    fn hrefs(&self) -> impl Iterator<Item = &str> {
        self.document
            .select(&ANCHOR_HREF)
            .filter_map(|el| el.value().attr("href"))
            .map(str::trim)
    }

    fn any_anchor_text_contains(&self, needle: &str) -> bool {
        self.document.select(&ANCHOR).any(|el| {
            el.text()
                .collect::<String>()
                .to_lowercase()
                .contains(needle)
        })
    }

    fn text_chars(&self) -> usize {
        self.body_text.chars().count()
    }
}

/// Collects the whitespace-normalized text of `root`, skipping anything
/// inside `script`, `style`, `noscript` or `template`. One pre-order pass.
fn visible_text(root: ElementRef<'_>) -> String {
    let mut words: Vec<&str> = Vec::new();
    let mut stack = vec![*root];
    while let Some(node) = stack.pop() {
        match node.value() {
            Node::Text(text) => words.extend(text.split_whitespace()),
            Node::Element(el)
                if matches!(el.name(), "script" | "style" | "noscript" | "template") => {}
            _ => stack.extend(node.children().rev()),
        }
    }
    words.join(" ")
}

/// Outcome of one detector. Evidence, when present, replaces the detector's
/// static description.
struct Finding {
    detected: bool,
    evidence: Option<String>,
}

impl Finding {
    fn flag(detected: bool) -> Self {
        Self {
            detected,
            evidence: None,
        }
    }

    fn with_evidence(detected: bool, evidence: impl FnOnce() -> String) -> Self {
        Self {
            detected,
            evidence: detected.then(evidence),
        }
    }
}

struct Detector {
    id: &'static str,
    name: &'static str,
    severity: Severity,
    description: &'static str,
    check: fn(&Page<'_>) -> Finding,
}

impl Detector {
    fn evaluate(&self, page: &Page<'_>) -> Signal {
        let finding = (self.check)(page);
        Signal {
            id: self.id.to_owned(),
            name: self.name.to_owned(),
            detected: finding.detected,
            severity: self.severity,
            description: finding
                .evidence
                .unwrap_or_else(|| self.description.to_owned()),
        }
    }
}

static DETECTORS: &[Detector] = &[
    Detector {
        id: "gtm_missing",
        name: "Missing Tracking",
        severity: Severity::Medium,
        description: "No Google Tag Manager or Google Analytics tag found.",
        check: |p| Finding::flag(!TRACKING_RE.is_match(p.raw)),
    },
    Detector {
        id: "insecure_links",
        name: "Insecure Links",
        severity: Severity::High,
        description: "Links pointing to non-HTTPS destinations.",
        check: insecure_links,
    },
    Detector {
        id: "no_email",
        name: "No Contact Email",
        severity: Severity::Medium,
        description: "No contact email address found on the page.",
        check: |p| Finding::flag(!EMAIL_RE.is_match(p.raw)),
    },
    Detector {
        id: "meta_keywords",
        name: "Meta Keywords",
        severity: Severity::Low,
        description: "Uses the deprecated meta keywords tag, a common spam pattern.",
        check: |p| Finding::flag(p.has_meta_named("keywords")),
    },
    Detector {
        id: "bad_title",
        name: "Title Quality",
        severity: Severity::Low,
        description: "Title is missing, too short or too long.",
        check: bad_title,
    },
    Detector {
        id: "link_stuffing",
        name: "Link Stuffing",
        severity: Severity::High,
        description: "High ratio of outbound links to visible text.",
        check: link_stuffing,
    },
    Detector {
        id: "poison_words",
        name: "Poison Content",
        severity: Severity::Critical,
        description: "No suspicious terms found.",
        check: poison_words,
    },
    Detector {
        id: "no_favicon",
        name: "No Favicon",
        severity: Severity::Low,
        description: "No favicon declared.",
        check: |p| Finding::flag(!p.has_link_rel(|rel| rel.contains("icon"))),
    },
    Detector {
        id: "no_social",
        name: "No Social Trust",
        severity: Severity::Low,
        description: "No links to social media profiles.",
        check: |p| Finding::flag(!p.hrefs().any(is_social_href)),
    },
    Detector {
        id: "no_description",
        name: "No Meta Description",
        severity: Severity::Medium,
        description: "Missing meta description tag.",
        check: |p| Finding::flag(!p.has_meta_named("description")),
    },
    Detector {
        id: "no_viewport",
        name: "Mobile Compatibility",
        severity: Severity::High,
        description: "Missing viewport meta tag; the page is not mobile-friendly.",
        check: |p| Finding::flag(!p.has_meta_named("viewport")),
    },
    Detector {
        id: "no_canonical",
        name: "Duplicate Content Risk",
        severity: Severity::Low,
        description: "No canonical URL declared.",
        check: |p| Finding::flag(!p.has_link_rel(|rel| rel == "canonical")),
    },
    Detector {
        id: "no_h1",
        name: "Missing H1",
        severity: Severity::Medium,
        description: "No H1 heading found.",
        check: |p| Finding::flag(p.count(&H1) == 0),
    },
    Detector {
        id: "multiple_h1",
        name: "Multiple H1s",
        severity: Severity::Low,
        description: "More than one H1 heading found.",
        check: |p| Finding::flag(p.count(&H1) > 1),
    },
    Detector {
        id: "no_lang",
        name: "Missing Lang Attribute",
        severity: Severity::Low,
        description: "The html element declares no language.",
        check: no_lang,
    },
    Detector {
        id: "iframe_detected",
        name: "Hidden iFrames",
        severity: Severity::Medium,
        description: "Page embeds iframes, which can hide third-party content.",
        check: |p| Finding::flag(p.count(&IFRAME) > 0),
    },
    Detector {
        id: "flash_content",
        name: "Legacy Flash Content",
        severity: Severity::Medium,
        description: "Uses embed or object plugins such as Flash.",
        check: |p| Finding::flag(p.count(&PLUGIN) > 0),
    },
    Detector {
        id: "meta_refresh",
        name: "Auto-Redirects",
        severity: Severity::High,
        description: "Uses meta refresh to redirect visitors.",
        check: |p| Finding::flag(p.has_meta_http_equiv("refresh")),
    },
    Detector {
        id: "obfuscated_js",
        name: "Obfuscated Scripts",
        severity: Severity::Critical,
        description: "Inline scripts use eval, unescape or String.fromCharCode.",
        check: |p| Finding::flag(OBFUSCATION_RE.is_match(&p.script_text)),
    },
    Detector {
        id: "thin_content",
        name: "Thin Content",
        severity: Severity::High,
        description: "Visible text is under 10% of the page markup.",
        check: thin_content,
    },
    Detector {
        id: "empty_links",
        name: "Empty Links",
        severity: Severity::Low,
        description: "Many links lead nowhere.",
        check: empty_links,
    },
    Detector {
        id: "heavy_page",
        name: "Bloated Code",
        severity: Severity::Medium,
        description: "Page markup exceeds 250 KB.",
        check: |p| Finding::flag(p.raw.len() > HEAVY_PAGE_BYTES),
    },
    Detector {
        id: "no_privacy",
        name: "No Privacy Policy",
        severity: Severity::Medium,
        description: "No privacy policy found.",
        check: |p| {
            Finding::flag(
                !(p.body_lower.contains("privacy policy") || p.any_anchor_text_contains("privacy")),
            )
        },
    },
    Detector {
        id: "no_terms",
        name: "No Terms of Service",
        severity: Severity::Medium,
        description: "No terms of service found.",
        check: |p| {
            Finding::flag(
                !(p.body_lower.contains("terms of") || p.any_anchor_text_contains("terms")),
            )
        },
    },
    Detector {
        id: "script_bloat",
        name: "Script Overloading",
        severity: Severity::Low,
        description: "More than 30 script tags.",
        check: script_bloat,
    },
    Detector {
        id: "inline_styles",
        name: "Inline Style Usage",
        severity: Severity::Low,
        description: "More than 20 elements carry inline styles.",
        check: |p| Finding::flag(p.count(&STYLED) > INLINE_STYLES_MAX),
    },
    Detector {
        id: "missing_alt",
        name: "Missing Image Alt",
        severity: Severity::Low,
        description: "More than 5 images lack alt text.",
        check: missing_alt,
    },
];

fn insecure_links(page: &Page<'_>) -> Finding {
    let insecure = page
        .hrefs()
        .filter(|href| href.to_ascii_lowercase().starts_with("http://"))
        .count();
    Finding::with_evidence(insecure > 0, || {
        format!("Found {insecure} link(s) pointing to non-HTTPS destinations.")
    })
}

fn bad_title(page: &Page<'_>) -> Finding {
    let title = page
        .document
        .select(&TITLE)
        .next()
        .map(|el| el.text().collect::<String>())
        .unwrap_or_default();
    let len = title.trim().chars().count();
    Finding::with_evidence(!(MIN_TITLE_CHARS..=MAX_TITLE_CHARS).contains(&len), || {
        format!(
            "Title is {len} characters long; expected {MIN_TITLE_CHARS}-{MAX_TITLE_CHARS}."
        )
    })
}

#[allow(clippy::cast_precision_loss)]
fn link_stuffing(page: &Page<'_>) -> Finding {
    let outbound = page
        .hrefs()
        .filter(|href| {
            let lower = href.to_ascii_lowercase();
            lower.starts_with("http://") || lower.starts_with("https://")
        })
        .count();
    let stuffed = outbound > LINK_STUFFING_MIN_LINKS
        && (page.text_chars() as f64 / outbound as f64) < LINK_STUFFING_MIN_CHARS_PER_LINK;
    Finding::with_evidence(stuffed, || {
        format!(
            "{outbound} outbound links against {} characters of visible text.",
            page.text_chars()
        )
    })
}

fn poison_words(page: &Page<'_>) -> Finding {
    let hits = find_poison_terms(&page.body_lower);
    Finding::with_evidence(!hits.is_empty(), || {
        format!("Found suspicious terms: {}", hits.join(", "))
    })
}

fn no_lang(page: &Page<'_>) -> Finding {
    let declared = page
        .document
        .select(&HTML_ROOT)
        .next()
        .and_then(|el| el.value().attr("lang"))
        .is_some_and(|lang| !lang.trim().is_empty());
    Finding::flag(!declared)
}

#[allow(clippy::cast_precision_loss)]
fn thin_content(page: &Page<'_>) -> Finding {
    let ratio = if page.raw.is_empty() {
        0.0
    } else {
        page.body_text.len() as f64 / page.raw.len() as f64
    };
    Finding::flag(ratio < THIN_CONTENT_MIN_RATIO)
}

fn empty_links(page: &Page<'_>) -> Finding {
    let empty = page
        .hrefs()
        .filter(|href| {
            let lower = href.to_ascii_lowercase();
            matches!(
                lower.as_str(),
                "" | "#" | "javascript:void(0)" | "javascript:void(0);"
            )
        })
        .count();
    Finding::with_evidence(empty > EMPTY_LINKS_MAX, || {
        format!("Found {empty} links that lead nowhere.")
    })
}

fn script_bloat(page: &Page<'_>) -> Finding {
    let scripts = page.count(&SCRIPT);
    Finding::with_evidence(scripts > SCRIPT_TAGS_MAX, || {
        format!("Page loads {scripts} script tags.")
    })
}

fn missing_alt(page: &Page<'_>) -> Finding {
    let missing = page
        .document
        .select(&IMG)
        .filter(|img| img.value().attr("alt").is_none())
        .count();
    Finding::with_evidence(missing > MISSING_ALT_MAX, || {
        format!("{missing} images have no alt text.")
    })
}

/// Runs every detector against `html` and returns one [`Signal`] per detector,
/// in evaluation order.
///
/// Pure and deterministic: identical markup always yields identical signals.
/// Malformed or empty markup is parsed leniently; empty markup trips every
/// absence-type detector.
#[must_use]
pub fn detect(html: &str) -> Vec<Signal> {
    let page = Page::parse(html);
    let signals: Vec<Signal> = DETECTORS.iter().map(|d| d.evaluate(&page)).collect();
    tracing::debug!(
        bytes = html.len(),
        detected = signals.iter().filter(|s| s.detected).count(),
        "evaluated page signals"
    );
    signals
}

/// Number of detectors in the battery.
#[must_use]
pub fn detector_count() -> usize {
    DETECTORS.len()
}

#[cfg(test)]
#[path = "detector_test.rs"]
mod tests;
